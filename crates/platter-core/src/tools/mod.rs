//! Planner-facing capabilities
//!
//! Everything the planner can do is a named [`ToolHandler`]. A [`ToolRegistry`]
//! is built from a fixed allow-list: handlers outside it are refused at
//! registration, and names outside it are refused at execution.

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

pub mod budget;

pub use budget::{FilterMenuTool, GetBalanceTool};

/// What the planner is shown for one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Runs tools by name on behalf of the planner
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String>;
    fn list_tools(&self) -> Vec<ToolDefinition>;
}

/// One planner capability
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<String>;

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

pub struct ToolRegistry {
    allowed: BTreeSet<String>,
    // BTreeMap keeps list_tools in name order
    handlers: BTreeMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn with_allow_list(names: &[&str]) -> Self {
        Self {
            allowed: names.iter().map(|n| n.to_string()).collect(),
            handlers: BTreeMap::new(),
        }
    }

    /// Add a handler. A name outside the allow-list is an error; a name
    /// already registered is replaced.
    pub fn register(&mut self, handler: Arc<dyn ToolHandler>) -> Result<()> {
        let name = handler.name().to_string();
        if !self.allowed.contains(&name) {
            bail!("Refusing to register '{}': not on the allow-list", name);
        }
        if self.handlers.insert(name.clone(), handler).is_some() {
            debug!("Replaced tool handler: {}", name);
        } else {
            debug!("Registered tool: {}", name);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Allow-listed names that have no handler yet
    pub fn missing(&self) -> Vec<&str> {
        self.allowed
            .iter()
            .filter(|name| !self.handlers.contains_key(name.as_str()))
            .map(String::as_str)
            .collect()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, tool_name: &str, input: Value) -> Result<String> {
        if !self.allowed.contains(tool_name) {
            bail!("Tool '{}' is not on the allow-list", tool_name);
        }
        let Some(handler) = self.handlers.get(tool_name) else {
            bail!("Unknown tool: {}", tool_name);
        };

        debug!("Executing tool {} with input {}", tool_name, input);
        handler
            .execute(input)
            .await
            .inspect_err(|e| warn!("Tool {} failed: {:#}", tool_name, e))
    }

    fn list_tools(&self) -> Vec<ToolDefinition> {
        self.handlers.values().map(|h| h.definition()).collect()
    }
}

/// Object schema with the given properties and required keys
pub fn json_schema(properties: Value, required: Vec<&str>) -> Value {
    serde_json::json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Pull a required string argument out of a tool input object
pub fn required_str<'a>(input: &'a Value, key: &str) -> Result<&'a str> {
    input
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow!("Missing '{}' parameter", key))
}
