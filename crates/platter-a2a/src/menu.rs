//! Menu reply parsing
//!
//! Restaurant agents answer the full-menu request either with a JSON object
//! (sometimes wrapped in a markdown code fence) or with prose.

use regex::Regex;
use serde_json::{Value, json};

/// Outbound text that asks an agent for its complete menu
pub const FULL_MENU_REQUEST: &str = "Send me your full menu.";

#[derive(Debug, Clone, PartialEq)]
pub enum MenuReply {
    /// A JSON object, categories or items mapped to prices
    Structured(Value),
    /// Prose the agent sent instead of JSON
    Freeform(String),
    /// The reply had no content to show
    Error(String),
}

impl MenuReply {
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    /// JSON form handed back to the planner
    pub fn to_value(&self) -> Value {
        match self {
            Self::Structured(menu) => json!({ "menu": menu }),
            Self::Freeform(text) => json!({ "menu_description": text }),
            Self::Error(reason) => json!({ "error": reason }),
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if let Ok(fence) = Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```$") {
        if let Some(inner) = fence.captures(trimmed).and_then(|c| c.get(1)) {
            return inner.as_str().trim();
        }
    }
    trimmed
}

/// Interpret the parts of a reply to [`FULL_MENU_REQUEST`].
///
/// A data part holding an object wins outright. Otherwise the text parts are
/// joined, a surrounding code fence is dropped, and the result must parse as
/// a JSON object to count as structured.
pub fn parse_menu_reply(parts: &[Value]) -> MenuReply {
    if let Some(object) = parts.iter().find(|p| p.is_object()) {
        return MenuReply::Structured(object.clone());
    }

    let text = parts
        .iter()
        .filter_map(Value::as_str)
        .collect::<Vec<_>>()
        .join("\n");
    let text = text.trim();
    if text.is_empty() {
        return MenuReply::Error("The agent sent no menu content".to_string());
    }

    match serde_json::from_str::<Value>(strip_code_fence(text)) {
        Ok(menu) if menu.is_object() => MenuReply::Structured(menu),
        _ => MenuReply::Freeform(text.to_string()),
    }
}
