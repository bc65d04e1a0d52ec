//! Task dispatcher — relays one piece of text to one remote agent

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::A2aError;
use crate::health::HealthMonitor;
use crate::menu::{FULL_MENU_REQUEST, MenuReply, parse_menu_reply};
use crate::protocol::{Message, MessageSendConfiguration, MessageSendParams, TaskState};
use crate::registry::AgentRegistry;
use crate::session::ConversationSession;
use crate::sink::{LogRecord, MessageLogSink};

/// Content extracted from a remote agent's answer
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyPayload {
    /// The response carried no task
    Empty,
    Parts(Vec<Value>),
    /// Answer to [`FULL_MENU_REQUEST`]
    Menu(MenuReply),
}

impl ReplyPayload {
    pub fn to_value(&self) -> Value {
        match self {
            Self::Empty => Value::Array(Vec::new()),
            Self::Parts(parts) => Value::Array(parts.clone()),
            Self::Menu(menu) => menu.to_value(),
        }
    }

    /// Text parts joined by newlines, for relaying an agent's words as-is
    pub fn text(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Parts(parts) => parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
            Self::Menu(MenuReply::Freeform(text)) => text.clone(),
            Self::Menu(MenuReply::Error(reason)) => reason.clone(),
            Self::Menu(MenuReply::Structured(menu)) => menu.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReply {
    pub agent: String,
    pub task_id: Option<String>,
    pub status: TaskState,
    pub payload: ReplyPayload,
}

#[derive(Serialize)]
struct ReplyView<'a> {
    agent: &'a str,
    task_id: Option<&'a str>,
    status: TaskState,
    payload: Value,
}

impl DispatchReply {
    fn empty(agent: &str) -> Self {
        Self {
            agent: agent.to_string(),
            task_id: None,
            status: TaskState::Unknown,
            payload: ReplyPayload::Empty,
        }
    }

    /// JSON form returned from the `send_message` tool
    pub fn to_value(&self) -> Value {
        serde_json::to_value(ReplyView {
            agent: &self.agent,
            task_id: self.task_id.as_deref(),
            status: self.status,
            payload: self.payload.to_value(),
        })
        .unwrap_or(Value::Null)
    }
}

pub struct TaskDispatcher {
    registry: Arc<AgentRegistry>,
    sink: MessageLogSink,
    sender_name: String,
    monitor: Option<Arc<HealthMonitor>>,
}

impl TaskDispatcher {
    pub fn new(registry: Arc<AgentRegistry>, sink: MessageLogSink, sender_name: &str) -> Self {
        Self {
            registry,
            sink,
            sender_name: sender_name.to_string(),
            monitor: None,
        }
    }

    /// Wake `monitor` for an early re-check whenever a dispatch hits a
    /// transport failure
    pub fn with_monitor(mut self, monitor: Arc<HealthMonitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Send `text` to `agent_name` within `session` and wait for the reply.
    ///
    /// Disconnected agents are still attempted; only unregistered names fail
    /// without touching the network.
    pub async fn dispatch(
        &self,
        session: &mut ConversationSession,
        agent_name: &str,
        text: &str,
    ) -> Result<DispatchReply, A2aError> {
        let connection = self.registry.require(agent_name)?;

        session.active_agent = Some(agent_name.to_string());
        let continuity = session.get_or_create(agent_name);

        let mut message = Message::user_text(text, &continuity.context_id, &continuity.task_id);
        message.metadata = Some(json!({ "conversation_id": session.session_id }));
        let params = MessageSendParams {
            message,
            configuration: Some(MessageSendConfiguration::default()),
        };

        self.sink
            .record(LogRecord::new(&self.sender_name, agent_name, text));
        debug!(
            "Dispatching to '{}' (context {}, task {})",
            agent_name, continuity.context_id, continuity.task_id
        );

        let response = match connection.send(params).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Dispatch to '{}' failed: {}", agent_name, e);
                // Liveness is the monitor's call; just ask it to look now
                if let Some(monitor) = self.monitor.as_ref().filter(|_| e.is_retryable()) {
                    monitor.wake();
                }
                return Err(e);
            }
        };

        let Some(task) = response.into_task() else {
            warn!("Agent '{}' returned no task", agent_name);
            let reply = DispatchReply::empty(agent_name);
            self.log_inbound(agent_name, &reply);
            return Ok(reply);
        };

        session.record_task_id(agent_name, task.id.as_deref());

        let parts = task.latest_parts();
        let payload = if text == FULL_MENU_REQUEST {
            ReplyPayload::Menu(parse_menu_reply(&parts))
        } else {
            ReplyPayload::Parts(parts)
        };

        let reply = DispatchReply {
            agent: agent_name.to_string(),
            task_id: task.id,
            status: task.status.state,
            payload,
        };
        debug!("Agent '{}' replied with status {}", agent_name, reply.status);
        self.log_inbound(agent_name, &reply);
        Ok(reply)
    }

    fn log_inbound(&self, agent_name: &str, reply: &DispatchReply) {
        self.sink.record(LogRecord::new(
            agent_name,
            &self.sender_name,
            reply.payload.to_value(),
        ));
    }
}
