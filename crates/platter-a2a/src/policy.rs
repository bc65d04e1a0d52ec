//! Orchestration policy — what a remote agent's reply means for the turn
//!
//! Interpretation advances the conversation phase, applies budget rules
//! (menu filtering and payment confirmation) and records a [`TurnOutcome`]
//! on the session for the orchestrator to consolidate.

use std::sync::Arc;

use platter_core::{PaymentConfirmation, Wallet};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};

use crate::dispatch::{DispatchReply, ReplyPayload};
use crate::error::A2aError;
use crate::menu::MenuReply;
use crate::protocol::TaskState;
use crate::session::{ConversationSession, Phase};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The agent asked a question only the user can answer
    NeedsInput { agent: String, prompt: String },
    Completed {
        agent: String,
        task_id: Option<String>,
        content: Value,
    },
    InProgress { agent: String, status: TaskState },
    /// The agent answered without a task (error envelope, empty result)
    NoReply { agent: String },
    /// Failed, rejected or canceled on the remote side
    Failed {
        agent: String,
        task_id: Option<String>,
        canceled: bool,
    },
}

impl TurnOutcome {
    pub fn agent(&self) -> &str {
        match self {
            Self::NeedsInput { agent, .. }
            | Self::Completed { agent, .. }
            | Self::InProgress { agent, .. }
            | Self::NoReply { agent }
            | Self::Failed { agent, .. } => agent,
        }
    }

    /// No further work is expected on this sub-task
    pub fn is_closed(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Failed { .. } | Self::NoReply { .. }
        )
    }

    /// Error form of a failed outcome
    pub fn error(&self) -> Option<A2aError> {
        let (agent, task_id, canceled) = match self {
            Self::Failed {
                agent,
                task_id,
                canceled,
            } => (agent, task_id, canceled),
            Self::NoReply { agent } => {
                return Some(A2aError::Protocol(format!(
                    "Agent '{}' answered without a task",
                    agent
                )));
            }
            _ => return None,
        };
        let task_id = task_id.clone().unwrap_or_else(|| "(none)".to_string());
        Some(if *canceled {
            A2aError::RemoteTaskCanceled {
                agent: agent.clone(),
                task_id,
            }
        } else {
            A2aError::RemoteTaskFailed {
                agent: agent.clone(),
                task_id,
            }
        })
    }

    /// What the user should read for this outcome
    pub fn message(&self) -> String {
        match self {
            Self::NeedsInput { prompt, .. } => prompt.clone(),
            Self::Completed { agent, content, .. } => {
                let text = content_text(content);
                if text.is_empty() {
                    format!("{} has completed the request.", agent)
                } else {
                    text
                }
            }
            Self::InProgress { agent, status } => {
                format!("{} is still working on it (status: {}).", agent, status)
            }
            Self::NoReply { agent } => format!(
                "Sorry, {} didn't send back an answer I could use. Would you like to try again?",
                agent
            ),
            Self::Failed {
                agent, canceled, ..
            } => {
                if *canceled {
                    format!(
                        "Sorry, {} canceled that request. Would you like to try something else?",
                        agent
                    )
                } else {
                    format!(
                        "Sorry, {} wasn't able to finish that request. Would you like to try another restaurant?",
                        agent
                    )
                }
            }
        }
    }
}

fn content_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(parts) if parts.iter().all(Value::is_string) => parts
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_default(),
    }
}

/// Conversational wording for a dispatch that never produced a reply
pub fn apology_for(error: &A2aError) -> String {
    match error {
        A2aError::UnknownAgent { name, known } if known.is_empty() => format!(
            "Sorry, I don't know a restaurant called {}, and none are available right now.",
            name
        ),
        A2aError::UnknownAgent { name, known } => format!(
            "Sorry, I don't know a restaurant called {}. I can reach: {}.",
            name, known
        ),
        A2aError::UnreachableEndpoint { .. } => {
            "Sorry, that restaurant isn't answering right now. Please try again in a moment."
                .to_string()
        }
        other => format!("Sorry, something went wrong: {}", other),
    }
}

pub struct OrchestrationPolicy {
    wallet: Arc<Wallet>,
}

impl OrchestrationPolicy {
    pub fn new(wallet: Arc<Wallet>) -> Self {
        Self { wallet }
    }

    pub fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    /// Interpret one dispatch reply and record the outcome on `session`
    pub async fn interpret(
        &self,
        session: &mut ConversationSession,
        reply: &DispatchReply,
    ) -> TurnOutcome {
        session.session_active =
            !(reply.status.is_terminal() || reply.status == TaskState::Unknown);

        let agent = reply.agent.clone();
        let outcome = match reply.status {
            TaskState::InputRequired => TurnOutcome::NeedsInput {
                agent,
                prompt: reply.payload.text(),
            },
            TaskState::Completed => {
                let content = self.completed_content(session, reply).await;
                TurnOutcome::Completed {
                    agent,
                    task_id: reply.task_id.clone(),
                    content,
                }
            }
            TaskState::Canceled | TaskState::Failed | TaskState::Rejected => {
                let outcome = TurnOutcome::Failed {
                    agent,
                    task_id: reply.task_id.clone(),
                    canceled: reply.status == TaskState::Canceled,
                };
                if let Some(e) = outcome.error() {
                    warn!("{}", e);
                }
                outcome
            }
            TaskState::Unknown => {
                let outcome = TurnOutcome::NoReply { agent };
                if let Some(e) = outcome.error() {
                    warn!("{}", e);
                }
                outcome
            }
            TaskState::Submitted | TaskState::Working | TaskState::AuthRequired => {
                TurnOutcome::InProgress {
                    agent,
                    status: reply.status,
                }
            }
        };

        session.phase = match &outcome {
            TurnOutcome::Completed { .. } => Phase::Consolidating,
            _ => Phase::Executing,
        };
        session.push_outcome(outcome.clone());
        outcome
    }

    async fn completed_content(&self, session: &mut ConversationSession, reply: &DispatchReply) -> Value {
        if let ReplyPayload::Menu(MenuReply::Structured(menu)) = &reply.payload {
            let filtered = self.wallet.filter_menu(menu).await;
            return json!({
                "menu": filtered.menu,
                "excluded": filtered.excluded,
                "balance": filtered.balance,
            });
        }

        let content = reply.payload.to_value();
        if let Some(payment) = PaymentConfirmation::find(&content) {
            // Without a task id there is nothing to deduplicate on
            let fresh = match reply.task_id.as_deref() {
                Some(task_id) => session.settle(&reply.agent, task_id),
                None => true,
            };
            if !fresh {
                info!(
                    "Payment for '{}' task {} already applied",
                    reply.agent,
                    reply.task_id.as_deref().unwrap_or_default()
                );
            } else if let Err(e) = self.wallet.confirm_payment(&payment).await {
                warn!("Ignoring payment from '{}': {}", reply.agent, e);
            }
        }
        content
    }
}

/// Combine the outcomes of the current turn into one reply for the user.
///
/// A pending question from any agent takes precedence and is relayed on its
/// own; otherwise every outcome contributes in order. Moves the conversation
/// to `closing` once every sub-task of the turn is closed.
pub fn consolidate(session: &mut ConversationSession) -> String {
    let outcomes = session.outcomes();
    if outcomes.is_empty() {
        return String::new();
    }

    if let Some(question) = outcomes
        .iter()
        .rev()
        .find(|o| matches!(o, TurnOutcome::NeedsInput { .. }))
    {
        return question.message();
    }

    let all_closed = outcomes.iter().all(TurnOutcome::is_closed);
    let text = outcomes
        .iter()
        .map(TurnOutcome::message)
        .collect::<Vec<_>>()
        .join("\n\n");
    if all_closed {
        session.phase = Phase::Closing;
    }
    text
}
