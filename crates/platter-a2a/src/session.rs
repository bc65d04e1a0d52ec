//! Conversation sessions — per-agent context/task continuity
//!
//! Each end-user conversation keeps one [`RestaurantSession`] per remote
//! agent. The context id is allocated once and never changes; the task id
//! follows whatever the remote agent last echoed back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::policy::TurnOutcome;

/// Continuity identifiers for one (conversation, agent) pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestaurantSession {
    pub context_id: String,
    pub task_id: String,
}

impl RestaurantSession {
    fn fresh() -> Self {
        Self {
            context_id: uuid::Uuid::new_v4().to_string(),
            task_id: uuid::Uuid::new_v4().to_string(),
        }
    }
}

/// Coarse conversation phase, advanced by the tools the planner invokes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Greeting,
    Discovery,
    Planning,
    Executing,
    Consolidating,
    Closing,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Greeting => "greeting",
            Self::Discovery => "discovery",
            Self::Planning => "planning",
            Self::Executing => "executing",
            Self::Consolidating => "consolidating",
            Self::Closing => "closing",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone)]
pub struct ConversationSession {
    pub session_id: String,
    pub active_agent: Option<String>,
    pub phase: Phase,
    pub session_active: bool,
    pub created_at: DateTime<Utc>,
    agents: HashMap<String, RestaurantSession>,
    /// Outcomes recorded since the current user turn began
    outcomes: Vec<TurnOutcome>,
    /// (agent, task id) pairs whose payment was already applied
    settled: HashSet<(String, String)>,
}

impl ConversationSession {
    pub fn new(session_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            active_agent: None,
            phase: Phase::Greeting,
            session_active: false,
            created_at: Utc::now(),
            agents: HashMap::new(),
            outcomes: Vec::new(),
            settled: HashSet::new(),
        }
    }

    /// Existing continuity record for `agent_name`, or a fresh one
    pub fn get_or_create(&mut self, agent_name: &str) -> RestaurantSession {
        self.agents
            .entry(agent_name.to_string())
            .or_insert_with(|| {
                debug!(
                    "Conversation {}: new context for agent '{}'",
                    self.session_id, agent_name
                );
                RestaurantSession::fresh()
            })
            .clone()
    }

    /// Overwrite the stored task id after a dispatch.
    /// `None` (the response carried no identifier) leaves it unchanged.
    pub fn record_task_id(&mut self, agent_name: &str, new_task_id: Option<&str>) {
        let Some(task_id) = new_task_id.filter(|id| !id.is_empty()) else {
            return;
        };
        let record = self
            .agents
            .entry(agent_name.to_string())
            .or_insert_with(RestaurantSession::fresh);
        if record.task_id != task_id {
            debug!(
                "Conversation {}: agent '{}' task id {} -> {}",
                self.session_id, agent_name, record.task_id, task_id
            );
            record.task_id = task_id.to_string();
        }
    }

    /// Mark the conversation active at the start of a user turn and clear
    /// the previous turn's outcomes
    pub fn begin_turn(&mut self) {
        if !self.session_active {
            self.session_active = true;
        }
        self.outcomes.clear();
    }

    pub fn push_outcome(&mut self, outcome: TurnOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[TurnOutcome] {
        &self.outcomes
    }

    pub fn last_outcome(&self) -> Option<&TurnOutcome> {
        self.outcomes.last()
    }

    /// Returns false if this task's payment was already applied
    pub fn settle(&mut self, agent_name: &str, task_id: &str) -> bool {
        self.settled
            .insert((agent_name.to_string(), task_id.to_string()))
    }
}

/// All live conversations of the process
#[derive(Default)]
pub struct ConversationStore {
    sessions: RwLock<HashMap<String, Arc<Mutex<ConversationSession>>>>,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get_or_create(&self, conversation_id: &str) -> Arc<Mutex<ConversationSession>> {
        if let Some(existing) = self.sessions.read().await.get(conversation_id) {
            return Arc::clone(existing);
        }
        let mut sessions = self.sessions.write().await;
        Arc::clone(sessions.entry(conversation_id.to_string()).or_insert_with(|| {
            info!("Started conversation {}", conversation_id);
            Arc::new(Mutex::new(ConversationSession::new(conversation_id)))
        }))
    }

    /// Discard a finished conversation
    pub async fn remove(&self, conversation_id: &str) -> bool {
        self.sessions.write().await.remove(conversation_id).is_some()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
