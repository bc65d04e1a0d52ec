//! A2A (Agent-to-Agent) protocol types
//!
//! Wire shapes for agent cards (`/.well-known/agent.json`) and the JSON-RPC
//! `message/send` method, in the camelCase form restaurant agents speak.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Path of the agent card relative to an agent's base address
pub const AGENT_CARD_PATH: &str = "/.well-known/agent.json";

/// JSON-RPC method used to relay a message to a remote agent
pub const MESSAGE_SEND: &str = "message/send";

pub const TASK_KIND: &str = "task";
pub const MESSAGE_KIND: &str = "message";

/// Content types the orchestrator accepts from restaurant agents
pub const ACCEPTED_OUTPUT_MODES: &[&str] = &["text", "text/plain", "application/json"];

/// Agent Card — a remote agent's self-description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCard {
    pub name: String,
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub capabilities: AgentCapabilities,
    #[serde(default)]
    pub skills: Vec<AgentSkill>,
    #[serde(default = "default_modes")]
    pub default_input_modes: Vec<String>,
    #[serde(default = "default_modes")]
    pub default_output_modes: Vec<String>,
}

fn default_modes() -> Vec<String> {
    vec!["text".to_string()]
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentCapabilities {
    #[serde(default)]
    pub streaming: bool,
    #[serde(default)]
    pub push_notifications: bool,
}

/// A capability advertised on an agent card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// One piece of message or artifact content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Part {
    Text { text: String },
    Data { data: Value },
    File { file: Value },
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Normalized JSON form: text parts become strings, data parts their value.
    /// File parts carry no relayable content.
    pub fn to_value(&self) -> Option<Value> {
        match self {
            Self::Text { text } => Some(Value::String(text.clone())),
            Self::Data { data } => Some(data.clone()),
            Self::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(default = "message_kind")]
    pub kind: String,
    pub role: Role,
    pub parts: Vec<Part>,
    pub message_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

fn message_kind() -> String {
    MESSAGE_KIND.to_string()
}

impl Message {
    /// A single-text user message with a fresh message id
    pub fn user_text(text: &str, context_id: &str, task_id: &str) -> Self {
        Self {
            kind: message_kind(),
            role: Role::User,
            parts: vec![Part::text(text)],
            message_id: uuid::Uuid::new_v4().to_string(),
            context_id: Some(context_id.to_string()),
            task_id: Some(task_id.to_string()),
            metadata: None,
        }
    }
}

/// Task lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    Submitted,
    Working,
    #[serde(alias = "input_required")]
    InputRequired,
    Completed,
    #[serde(alias = "cancelled")]
    Canceled,
    Failed,
    Rejected,
    #[serde(alias = "auth_required")]
    AuthRequired,
    Unknown,
}

impl TaskState {
    /// The remote side will not do more work on this task
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Canceled | Self::Failed | Self::Rejected
        )
    }
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Submitted => write!(f, "submitted"),
            Self::Working => write!(f, "working"),
            Self::InputRequired => write!(f, "input-required"),
            Self::Completed => write!(f, "completed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Failed => write!(f, "failed"),
            Self::Rejected => write!(f, "rejected"),
            Self::AuthRequired => write!(f, "auth-required"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Structured output attached to a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    #[serde(default)]
    pub artifact_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub parts: Vec<Part>,
}

/// Task result returned by `message/send`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default = "task_kind")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_id: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<Artifact>,
}

fn task_kind() -> String {
    TASK_KIND.to_string()
}

impl Task {
    /// Normalized content of the most recent artifact, falling back to the
    /// status message when the task carries no artifact
    pub fn latest_parts(&self) -> Vec<Value> {
        let parts = match self.artifacts.last() {
            Some(artifact) => &artifact.parts,
            None => match &self.status.message {
                Some(message) => &message.parts,
                None => return Vec::new(),
            },
        };
        parts.iter().filter_map(Part::to_value).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendConfiguration {
    #[serde(default)]
    pub accepted_output_modes: Vec<String>,
    #[serde(default = "default_blocking")]
    pub blocking: bool,
}

fn default_blocking() -> bool {
    true
}

impl Default for MessageSendConfiguration {
    fn default() -> Self {
        Self {
            accepted_output_modes: ACCEPTED_OUTPUT_MODES.iter().map(|m| m.to_string()).collect(),
            blocking: true,
        }
    }
}

/// Parameters of a `message/send` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSendParams {
    pub message: Message,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<MessageSendConfiguration>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest<P> {
    pub jsonrpc: String,
    pub id: String,
    pub method: String,
    pub params: P,
}

impl<P> JsonRpcRequest<P> {
    pub fn new(method: &str, params: P) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            method: method.to_string(),
            params,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Raw JSON-RPC response envelope; success and error shapes share it
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// The task carried by a success response.
    ///
    /// `None` for error responses, a missing result, a result of another
    /// kind (such as a direct `message`), or a task that does not parse.
    pub fn into_task(self) -> Option<Task> {
        if self.error.is_some() {
            return None;
        }
        let result = self.result?;
        let kind = result
            .get("kind")
            .and_then(|k| k.as_str())
            .unwrap_or(TASK_KIND);
        if kind != TASK_KIND {
            return None;
        }
        serde_json::from_value(result).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_card_defaults() {
        let json = r#"{"name":"Luigi's Pizza Bot","description":"Pizza","url":"http://localhost:10003"}"#;
        let card: AgentCard = serde_json::from_str(json).unwrap();
        assert_eq!(card.name, "Luigi's Pizza Bot");
        assert!(card.skills.is_empty());
        assert_eq!(card.default_input_modes, vec!["text".to_string()]);
    }

    #[test]
    fn test_agent_card_missing_name_rejected() {
        let json = r#"{"description":"Pizza","url":"http://localhost:10003"}"#;
        assert!(serde_json::from_str::<AgentCard>(json).is_err());
    }

    #[test]
    fn test_agent_card_camel_case() {
        let json = json!({
            "name": "GoldenDragonBot",
            "description": "Chinese food",
            "url": "http://localhost:10004",
            "defaultOutputModes": ["text", "text/plain"],
            "capabilities": {"streaming": false, "pushNotifications": false},
            "skills": [{"id": "view-menu", "name": "View Full Menu", "tags": ["menu"]}]
        });
        let card: AgentCard = serde_json::from_value(json).unwrap();
        assert_eq!(card.default_output_modes.len(), 2);
        assert_eq!(card.skills[0].id, "view-menu");
    }

    #[test]
    fn test_user_message_serialization() {
        let msg = Message::user_text("hi", "ctx-1", "task-1");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["kind"], "message");
        assert_eq!(json["role"], "user");
        assert_eq!(json["parts"][0], json!({"kind": "text", "text": "hi"}));
        assert_eq!(json["contextId"], "ctx-1");
        assert_eq!(json["taskId"], "task-1");
        assert!(json["messageId"].is_string());
        assert!(json.get("metadata").is_none());
    }

    #[test]
    fn test_task_state_wire_names() {
        assert_eq!(
            serde_json::to_value(TaskState::InputRequired).unwrap(),
            "input-required"
        );
        let state: TaskState = serde_json::from_value(json!("input_required")).unwrap();
        assert_eq!(state, TaskState::InputRequired);
        assert_eq!(TaskState::Canceled.to_string(), "canceled");
        assert!(TaskState::Failed.is_terminal());
        assert!(!TaskState::InputRequired.is_terminal());
    }

    #[test]
    fn test_latest_parts_prefers_last_artifact() {
        let task: Task = serde_json::from_value(json!({
            "kind": "task",
            "id": "t-1",
            "contextId": "c-1",
            "status": {"state": "completed"},
            "artifacts": [
                {"artifactId": "a1", "parts": [{"kind": "text", "text": "old"}]},
                {"artifactId": "a2", "parts": [
                    {"kind": "text", "text": "new"},
                    {"kind": "data", "data": {"total": 12.5}}
                ]}
            ]
        }))
        .unwrap();
        assert_eq!(task.latest_parts(), vec![json!("new"), json!({"total": 12.5})]);
    }

    #[test]
    fn test_latest_parts_falls_back_to_status_message() {
        let task: Task = serde_json::from_value(json!({
            "id": "t-1",
            "status": {
                "state": "input-required",
                "message": {
                    "role": "agent",
                    "messageId": "m-1",
                    "parts": [{"kind": "text", "text": "Pickup or delivery?"}]
                }
            }
        }))
        .unwrap();
        assert_eq!(task.latest_parts(), vec![json!("Pickup or delivery?")]);
    }

    #[test]
    fn test_into_task_rejects_error_and_message_results() {
        let error: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0", "id": "1",
            "error": {"code": -32001, "message": "Task not found"}
        }))
        .unwrap();
        assert!(error.into_task().is_none());

        let message = JsonRpcResponse::success(
            None,
            json!({"kind": "message", "role": "agent", "messageId": "m", "parts": []}),
        );
        assert!(message.into_task().is_none());

        assert!(JsonRpcResponse::default().into_task().is_none());
    }

    #[test]
    fn test_into_task_success() {
        let response = JsonRpcResponse::success(
            Some(json!("1")),
            json!({"kind": "task", "id": "t-9", "contextId": "c", "status": {"state": "working"}}),
        );
        let task = response.into_task().unwrap();
        assert_eq!(task.id.as_deref(), Some("t-9"));
        assert_eq!(task.status.state, TaskState::Working);
    }

    #[test]
    fn test_request_envelope() {
        let params = MessageSendParams {
            message: Message::user_text("hello", "c", "t"),
            configuration: Some(MessageSendConfiguration::default()),
        };
        let req = JsonRpcRequest::new(MESSAGE_SEND, params);
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["jsonrpc"], "2.0");
        assert_eq!(json["method"], "message/send");
        assert_eq!(json["params"]["configuration"]["blocking"], true);
        assert_eq!(json["params"]["configuration"]["acceptedOutputModes"][0], "text");
    }
}
