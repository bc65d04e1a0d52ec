//! Remote agent tools — list_remote_agents, send_message, send_delivery_details

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use platter_core::ToolHandler;
use platter_core::tools::required_str;
use serde_json::{Value, json};
use tracing::debug;

use crate::dispatch::DispatchReply;
use crate::health::HealthMonitor;
use crate::host::{DeliveryProfile, Relay};
use crate::policy::TurnOutcome;

fn relay_result(reply: &DispatchReply, outcome: &TurnOutcome) -> String {
    json!({
        "agent": reply.agent,
        "task_id": reply.task_id,
        "status": reply.status,
        "result": outcome,
    })
    .to_string()
}

/// Tool: list every known restaurant agent and whether it is reachable
pub struct ListRemoteAgentsTool {
    monitor: Arc<HealthMonitor>,
}

impl ListRemoteAgentsTool {
    pub fn new(monitor: Arc<HealthMonitor>) -> Self {
        Self { monitor }
    }
}

#[async_trait]
impl ToolHandler for ListRemoteAgentsTool {
    fn name(&self) -> &str {
        "list_remote_agents"
    }

    fn description(&self) -> &str {
        "List the restaurant agents available for delegation, with their \
         descriptions, skills and whether they are currently reachable."
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    async fn execute(&self, _input: Value) -> Result<String> {
        self.monitor.ensure_started().await;
        let agents = self.monitor.registry().list();
        debug!("Listing {} remote agent(s)", agents.len());
        Ok(serde_json::to_string(&agents)?)
    }
}

/// Tool: relay one message to a named restaurant agent
pub struct SendMessageTool {
    relay: Arc<Relay>,
}

impl SendMessageTool {
    pub fn new(relay: Arc<Relay>) -> Self {
        Self { relay }
    }
}

#[async_trait]
impl ToolHandler for SendMessageTool {
    fn name(&self) -> &str {
        "send_message"
    }

    fn description(&self) -> &str {
        "Send a message to a restaurant agent and return its reply. \
         Use the exact text 'Send me your full menu.' to request a menu."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "conversation_id": {
                    "type": "string",
                    "description": "Conversation the message belongs to"
                },
                "agent_name": {
                    "type": "string",
                    "description": "Name of the restaurant agent, as listed by list_remote_agents"
                },
                "task": {
                    "type": "string",
                    "description": "Text to send to the agent"
                }
            },
            "required": ["conversation_id", "agent_name", "task"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let conversation_id = required_str(&input, "conversation_id")?;
        let agent_name = required_str(&input, "agent_name")?;
        let task = required_str(&input, "task")?;
        if task.trim().is_empty() {
            bail!("'task' must not be empty");
        }

        let (reply, outcome) = self.relay.send(conversation_id, agent_name, task).await?;
        Ok(relay_result(&reply, &outcome))
    }
}

/// Tool: send the configured delivery profile to an agent
pub struct SendDeliveryDetailsTool {
    relay: Arc<Relay>,
    profile: DeliveryProfile,
}

impl SendDeliveryDetailsTool {
    pub fn new(relay: Arc<Relay>, profile: DeliveryProfile) -> Self {
        Self { relay, profile }
    }
}

#[async_trait]
impl ToolHandler for SendDeliveryDetailsTool {
    fn name(&self) -> &str {
        "send_delivery_details"
    }

    fn description(&self) -> &str {
        "Send the user's saved delivery name, address and phone number to a \
         restaurant agent that asked for them."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "conversation_id": {"type": "string"},
                "agent_name": {"type": "string"}
            },
            "required": ["conversation_id", "agent_name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String> {
        let conversation_id = required_str(&input, "conversation_id")?;
        let agent_name = required_str(&input, "agent_name")?;
        if !self.profile.is_complete() {
            bail!("No delivery details are configured");
        }

        let (reply, outcome) = self
            .relay
            .send(conversation_id, agent_name, &self.profile.message())
            .await?;
        Ok(relay_result(&reply, &outcome))
    }
}
