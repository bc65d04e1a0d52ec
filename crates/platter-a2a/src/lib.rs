//! A2A (Agent-to-Agent) orchestration for Platter
//!
//! Discovers restaurant agents from their agent cards, keeps their liveness
//! current, and relays conversation turns to them over JSON-RPC
//! `message/send`, keeping one context per (conversation, agent).

pub mod client;
pub mod connection;
pub mod dispatch;
pub mod error;
pub mod health;
pub mod host;
pub mod menu;
pub mod policy;
pub mod protocol;
pub mod registry;
pub mod session;
pub mod sink;
pub mod tool;

#[cfg(test)]
mod testing;

pub use client::{A2aClient, AgentTransport, ClientConfig};
pub use dispatch::{DispatchReply, ReplyPayload, TaskDispatcher};
pub use error::A2aError;
pub use health::{CycleReport, HealthMonitor};
pub use host::{
    ALLOWED_TOOLS, DeliveryProfile, MAX_STEPS, Orchestrator, OrchestratorConfig, PlanRequest,
    PlanStep, Planner, RELAY_HELP, RelayPlanner,
};
pub use menu::{FULL_MENU_REQUEST, MenuReply, parse_menu_reply};
pub use policy::{OrchestrationPolicy, TurnOutcome};
pub use protocol::{AgentCard, TaskState};
pub use registry::{AgentRegistry, AgentSummary};
pub use session::{ConversationSession, ConversationStore, Phase, RestaurantSession};
pub use sink::{LogRecord, MessageLogSink};
pub use tool::{ListRemoteAgentsTool, SendDeliveryDetailsTool, SendMessageTool};
