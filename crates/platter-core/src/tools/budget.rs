//! Budget tools — get_balance, filter_menu

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde_json::Value;

use crate::budget::Wallet;
use crate::tools::{ToolHandler, json_schema};

/// Tool: report the running balance
pub struct GetBalanceTool {
    wallet: Arc<Wallet>,
}

impl GetBalanceTool {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl ToolHandler for GetBalanceTool {
    fn name(&self) -> &str {
        "get_balance"
    }

    fn description(&self) -> &str {
        "Get the user's remaining food budget in dollars."
    }

    fn input_schema(&self) -> Value {
        json_schema(serde_json::json!({}), vec![])
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        let balance = self.wallet.balance().await;
        Ok(serde_json::json!({ "balance": balance }).to_string())
    }
}

/// Tool: prune a restaurant menu to what the balance can pay for
pub struct FilterMenuTool {
    wallet: Arc<Wallet>,
}

impl FilterMenuTool {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }
}

#[async_trait]
impl ToolHandler for FilterMenuTool {
    fn name(&self) -> &str {
        "filter_menu"
    }

    fn description(&self) -> &str {
        "Remove menu items that cost more than the remaining budget. \
         Call this before presenting menu options to the user."
    }

    fn input_schema(&self) -> Value {
        json_schema(
            serde_json::json!({
                "menu": {
                    "type": "object",
                    "description": "Menu as returned by a restaurant agent (item name -> price, optionally grouped by category)"
                }
            }),
            vec!["menu"],
        )
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let menu = input
            .get("menu")
            .filter(|m| m.is_object())
            .ok_or_else(|| anyhow!("Missing 'menu' parameter"))?;

        let filtered = self.wallet.filter_menu(menu).await;
        serde_json::to_string(&filtered).map_err(|e| anyhow!("Failed to serialize menu: {}", e))
    }
}
