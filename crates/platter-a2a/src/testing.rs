//! In-memory transport used by unit tests

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::client::AgentTransport;
use crate::error::A2aError;
use crate::protocol::*;

pub fn card(name: &str, url: &str) -> AgentCard {
    AgentCard {
        name: name.to_string(),
        description: format!("{} restaurant", name),
        url: url.to_string(),
        version: "1.0.0".to_string(),
        capabilities: AgentCapabilities::default(),
        skills: vec![],
        default_input_modes: vec!["text".to_string()],
        default_output_modes: vec!["text".to_string()],
    }
}

/// A `message/send` success envelope carrying one task
pub fn task_reply(task_id: &str, state: TaskState, text: &str) -> JsonRpcResponse {
    JsonRpcResponse::success(
        Some(json!("1")),
        json!({
            "kind": "task",
            "id": task_id,
            "contextId": "remote-context",
            "status": {"state": state},
            "artifacts": [{"artifactId": "a-1", "parts": [{"kind": "text", "text": text}]}]
        }),
    )
}

pub fn data_reply(task_id: &str, state: TaskState, data: Value) -> JsonRpcResponse {
    JsonRpcResponse::success(
        Some(json!("1")),
        json!({
            "kind": "task",
            "id": task_id,
            "status": {"state": state},
            "artifacts": [{"artifactId": "a-1", "parts": [{"kind": "data", "data": data}]}]
        }),
    )
}

/// Scripted transport: cards per address, queued replies per address.
///
/// With no queued reply, `send_message` completes the task it was sent,
/// echoing the outbound task id.
#[derive(Default)]
pub struct FakeTransport {
    cards: Mutex<HashMap<String, Result<AgentCard, A2aError>>>,
    replies: Mutex<HashMap<String, VecDeque<Result<JsonRpcResponse, A2aError>>>>,
    sent: Mutex<Vec<(String, MessageSendParams)>>,
    card_fetches: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_card(self, address: &str, card: AgentCard) -> Self {
        self.set_card(address, Ok(card));
        self
    }

    pub fn set_card(&self, address: &str, card: Result<AgentCard, A2aError>) {
        self.cards.lock().unwrap().insert(address.to_string(), card);
    }

    pub fn push_reply(&self, address: &str, reply: Result<JsonRpcResponse, A2aError>) {
        self.replies
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_default()
            .push_back(reply);
    }

    pub fn sent(&self) -> Vec<(String, MessageSendParams)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn card_fetches(&self) -> usize {
        self.card_fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentTransport for FakeTransport {
    async fn fetch_agent_card(&self, base_url: &str) -> Result<AgentCard, A2aError> {
        self.card_fetches.fetch_add(1, Ordering::SeqCst);
        self.cards
            .lock()
            .unwrap()
            .get(base_url)
            .cloned()
            .unwrap_or_else(|| Err(A2aError::unreachable(base_url, "connection refused")))
    }

    async fn send_message(
        &self,
        endpoint: &str,
        params: MessageSendParams,
    ) -> Result<JsonRpcResponse, A2aError> {
        let echo_id = params.message.task_id.clone().unwrap_or_default();
        self.sent
            .lock()
            .unwrap()
            .push((endpoint.to_string(), params));
        let queued = self
            .replies
            .lock()
            .unwrap()
            .get_mut(endpoint)
            .and_then(|q| q.pop_front());
        queued.unwrap_or_else(|| Ok(task_reply(&echo_id, TaskState::Completed, "ok")))
    }
}
