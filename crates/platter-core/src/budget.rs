//! Budget rules — running balance, menu filtering and payment confirmation
//!
//! Menus arrive as arbitrary JSON trees whose numeric leaves are prices
//! (`{"menu": {"pizzas": {"Large Pizza": 16.99}}}` or a flat
//! `{"Pizza": 10.0}`). The balance only moves when a restaurant reports a
//! paid order.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// A menu item dropped because it costs more than the balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedItem {
    pub name: String,
    pub price: f64,
}

/// A menu pruned to what the balance can pay for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetFilter {
    pub balance: f64,
    pub menu: Value,
    pub excluded: Vec<ExcludedItem>,
}

/// A restaurant's confirmation that an order was paid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    pub total: f64,
    #[serde(default)]
    pub order_status: Option<String>,
}

impl PaymentConfirmation {
    /// Look for a paid order anywhere in a remote reply.
    ///
    /// Accepts the restaurant payment shape `{"final_order": {...}}` as well
    /// as a bare order object, nested at any depth or serialized as a JSON
    /// string inside a text part.
    pub fn find(reply: &Value) -> Option<Self> {
        match reply {
            Value::Object(map) => {
                if let Some(confirmation) = Self::from_order(map) {
                    return Some(confirmation);
                }
                map.values().find_map(Self::find)
            }
            Value::Array(items) => items.iter().find_map(Self::find),
            Value::String(text) => serde_json::from_str::<Value>(text)
                .ok()
                .filter(|v| v.is_object() || v.is_array())
                .and_then(|v| Self::find(&v)),
            _ => None,
        }
    }

    fn from_order(order: &Map<String, Value>) -> Option<Self> {
        let paid = order
            .get("payment_status")
            .and_then(|v| v.as_str())
            .is_some_and(|s| s.eq_ignore_ascii_case("paid"));
        if !paid {
            return None;
        }
        let total = order.get("total").and_then(|v| v.as_f64())?;
        Some(Self {
            total,
            order_status: order
                .get("order_status")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
    }
}

/// Running balance shared by every conversation of the process
pub struct Wallet {
    balance: RwLock<f64>,
}

impl Wallet {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: RwLock::new(initial_balance),
        }
    }

    /// Current balance
    pub async fn balance(&self) -> f64 {
        *self.balance.read().await
    }

    /// Drop every priced item the current balance cannot cover.
    ///
    /// Categories left with no entries are dropped too. The balance
    /// itself is not touched.
    pub async fn filter_menu(&self, menu: &Value) -> BudgetFilter {
        let balance = self.balance().await;
        let mut excluded = Vec::new();
        let menu = prune(menu, balance, &mut excluded).unwrap_or(Value::Object(Map::new()));
        debug!(
            "Budget filter at ${:.2}: {} item(s) excluded",
            balance,
            excluded.len()
        );
        BudgetFilter {
            balance,
            menu,
            excluded,
        }
    }

    /// Subtract a confirmed payment and return the new balance
    pub async fn confirm_payment(&self, payment: &PaymentConfirmation) -> Result<f64> {
        if !payment.total.is_finite() || payment.total < 0.0 {
            bail!("Invalid payment total: {}", payment.total);
        }
        let mut balance = self.balance.write().await;
        if payment.total > *balance {
            warn!(
                "Payment of ${:.2} exceeds balance ${:.2}",
                payment.total, *balance
            );
        }
        *balance = round_cents(*balance - payment.total);
        info!(
            "Payment of ${:.2} confirmed, balance now ${:.2}",
            payment.total, *balance
        );
        Ok(*balance)
    }
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}

/// Returns `None` when every entry of a priced subtree was excluded.
/// Descriptive siblings (names, notes) keep their subtree alive.
fn prune(node: &Value, balance: f64, excluded: &mut Vec<ExcludedItem>) -> Option<Value> {
    let Value::Object(map) = node else {
        return Some(node.clone());
    };

    let mut kept = Map::new();
    let mut had_items = false;
    for (name, value) in map {
        match value {
            Value::Number(n) => {
                had_items = true;
                let price = n.as_f64().unwrap_or(f64::INFINITY);
                if price <= balance {
                    kept.insert(name.clone(), value.clone());
                } else {
                    excluded.push(ExcludedItem {
                        name: name.clone(),
                        price,
                    });
                }
            }
            Value::Object(_) => {
                had_items = true;
                if let Some(child) = prune(value, balance, excluded) {
                    kept.insert(name.clone(), child);
                }
            }
            other => {
                kept.insert(name.clone(), other.clone());
            }
        }
    }

    if had_items && kept.is_empty() {
        None
    } else {
        Some(Value::Object(kept))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_item_over_balance_excluded() {
        let wallet = Wallet::new(20.0);
        let filtered = wallet
            .filter_menu(&json!({"Family Feast": 25.0, "Garlic Bread": 4.99}))
            .await;

        assert_eq!(filtered.menu, json!({"Garlic Bread": 4.99}));
        assert_eq!(
            filtered.excluded,
            vec![ExcludedItem {
                name: "Family Feast".to_string(),
                price: 25.0
            }]
        );
        assert_eq!(wallet.balance().await, 20.0);
    }

    #[tokio::test]
    async fn test_item_at_balance_kept() {
        let wallet = Wallet::new(10.0);
        let filtered = wallet.filter_menu(&json!({"Pizza": 10.0})).await;
        assert_eq!(filtered.menu, json!({"Pizza": 10.0}));
        assert!(filtered.excluded.is_empty());
    }

    #[tokio::test]
    async fn test_nested_categories_pruned() {
        let wallet = Wallet::new(15.0);
        let menu = json!({
            "menu": {
                "pizzas": {"Large Pizza": 16.99, "Extra-Large Pizza": 19.99},
                "sides": {"Garlic Bread": 4.99, "Calzone": 8.99},
            }
        });
        let filtered = wallet.filter_menu(&menu).await;

        assert_eq!(
            filtered.menu,
            json!({"menu": {"sides": {"Garlic Bread": 4.99, "Calzone": 8.99}}})
        );
        assert_eq!(filtered.excluded.len(), 2);
    }

    #[tokio::test]
    async fn test_nothing_affordable() {
        let wallet = Wallet::new(1.0);
        let filtered = wallet.filter_menu(&json!({"Pizza": 10.0})).await;
        assert_eq!(filtered.menu, json!({}));
        assert_eq!(filtered.excluded.len(), 1);
    }

    #[tokio::test]
    async fn test_non_price_fields_survive() {
        let wallet = Wallet::new(5.0);
        let filtered = wallet
            .filter_menu(&json!({"restaurant": "Luigi's", "Water": 1.5}))
            .await;
        assert_eq!(filtered.menu["restaurant"], "Luigi's");
        assert_eq!(filtered.menu["Water"], 1.5);
    }

    #[tokio::test]
    async fn test_descriptive_fields_kept_when_all_items_excluded() {
        let wallet = Wallet::new(5.0);
        let filtered = wallet
            .filter_menu(&json!({
                "restaurant": "Luigi's",
                "Pizza": 30.0,
                "desserts": {"category": "Sweets", "Tiramisu": 9.0},
                "drinks": {"Wine": 12.0}
            }))
            .await;
        assert_eq!(
            filtered.menu,
            json!({"restaurant": "Luigi's", "desserts": {"category": "Sweets"}})
        );
        assert_eq!(filtered.excluded.len(), 3);
    }

    #[tokio::test]
    async fn test_confirm_payment_subtracts() {
        let wallet = Wallet::new(50.0);
        let balance = wallet
            .confirm_payment(&PaymentConfirmation {
                total: 18.35,
                order_status: Some("confirmed".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(balance, 31.65);
        assert_eq!(wallet.balance().await, 31.65);
    }

    #[tokio::test]
    async fn test_confirm_payment_rejects_negative() {
        let wallet = Wallet::new(50.0);
        let result = wallet
            .confirm_payment(&PaymentConfirmation {
                total: -5.0,
                order_status: None,
            })
            .await;
        assert!(result.is_err());
        assert_eq!(wallet.balance().await, 50.0);
    }

    #[test]
    fn test_find_final_order() {
        let reply = json!({
            "confirmation_message": "Payment of $27.00 via debit confirmed. Your order is placed!",
            "final_order": {"payment_status": "paid", "order_status": "confirmed", "total": 27.0}
        });
        let payment = PaymentConfirmation::find(&reply).unwrap();
        assert_eq!(payment.total, 27.0);
        assert_eq!(payment.order_status.as_deref(), Some("confirmed"));
    }

    #[test]
    fn test_find_in_text_part() {
        let reply = json!([
            "Your order is placed!",
            "{\"final_order\": {\"payment_status\": \"paid\", \"total\": 12.5}}"
        ]);
        assert_eq!(PaymentConfirmation::find(&reply).unwrap().total, 12.5);
    }

    #[test]
    fn test_pending_payment_ignored() {
        let reply = json!({"billing_summary": {"payment_status": "pending", "total": 27.0}});
        assert!(PaymentConfirmation::find(&reply).is_none());
        assert!(PaymentConfirmation::find(&json!("Payment confirmed!")).is_none());
    }
}
