//! Orchestrator — runs one user turn against the remote restaurant agents
//!
//! A [`Planner`] decides the next step (call a tool, consolidate, or answer
//! directly); the orchestrator executes tool calls through an allow-listed
//! [`ToolRegistry`] and stops early when a remote agent needs user input.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use platter_core::{ToolDefinition, ToolExecutor, ToolHandler, ToolRegistry, Wallet};
use platter_core::tools::{FilterMenuTool, GetBalanceTool};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::client::AgentTransport;
use crate::dispatch::{DispatchReply, TaskDispatcher};
use crate::error::A2aError;
use crate::health::HealthMonitor;
use crate::menu::FULL_MENU_REQUEST;
use crate::policy::{OrchestrationPolicy, TurnOutcome, apology_for, consolidate};
use crate::registry::{AgentRegistry, AgentSummary};
use crate::session::{ConversationStore, Phase};
use crate::sink::MessageLogSink;
use crate::tool::{ListRemoteAgentsTool, SendDeliveryDetailsTool, SendMessageTool};

/// Upper bound on planner steps within one user turn
pub const MAX_STEPS: usize = 8;

/// Tool names the orchestrator will ever execute
pub const ALLOWED_TOOLS: &[&str] = &[
    "list_remote_agents",
    "send_message",
    "get_balance",
    "filter_menu",
    "send_delivery_details",
];

/// Details sent to a restaurant when the user asks for delivery
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
}

impl DeliveryProfile {
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.address.trim().is_empty()
            && !self.phone.trim().is_empty()
    }

    pub fn message(&self) -> String {
        format!(
            "Please deliver to:\nName: {}\nAddress: {}\nPhone: {}",
            self.name, self.address, self.phone
        )
    }
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub name: String,
    pub remote_agents: Vec<String>,
    pub health_interval: Duration,
    pub delivery: DeliveryProfile,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            name: "Alex Helper Bot".to_string(),
            remote_agents: Vec::new(),
            health_interval: Duration::from_secs(30),
            delivery: DeliveryProfile::default(),
        }
    }
}

/// One executed step, fed back to the planner
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub tool: String,
    pub input: Value,
    pub output: String,
    pub ok: bool,
}

/// Everything the planner sees when choosing the next step
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub conversation_id: String,
    pub user_text: String,
    pub phase: Phase,
    pub active_agent: Option<String>,
    pub agents: Vec<AgentSummary>,
    pub tools: Vec<ToolDefinition>,
    pub history: Vec<StepRecord>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanStep {
    Call { tool: String, input: Value },
    /// Answer with the consolidated outcomes of this turn
    Consolidate,
    Reply(String),
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn next_step(&self, request: &PlanRequest) -> Result<PlanStep>;
}

/// Dispatch plus interpretation under one conversation lock
pub struct Relay {
    dispatcher: TaskDispatcher,
    policy: OrchestrationPolicy,
    conversations: Arc<ConversationStore>,
    monitor: Arc<HealthMonitor>,
}

impl Relay {
    pub fn new(
        dispatcher: TaskDispatcher,
        policy: OrchestrationPolicy,
        conversations: Arc<ConversationStore>,
        monitor: Arc<HealthMonitor>,
    ) -> Self {
        Self {
            dispatcher,
            policy,
            conversations,
            monitor,
        }
    }

    pub async fn send(
        &self,
        conversation_id: &str,
        agent_name: &str,
        text: &str,
    ) -> Result<(DispatchReply, TurnOutcome), A2aError> {
        self.monitor.ensure_started().await;
        let conversation = self.conversations.get_or_create(conversation_id).await;
        let mut session = conversation.lock().await;
        let reply = self.dispatcher.dispatch(&mut session, agent_name, text).await?;
        let outcome = self.policy.interpret(&mut session, &reply).await;
        Ok((reply, outcome))
    }
}

pub struct Orchestrator {
    name: String,
    monitor: Arc<HealthMonitor>,
    conversations: Arc<ConversationStore>,
    wallet: Arc<Wallet>,
    tools: ToolRegistry,
    planner: Arc<dyn Planner>,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        transport: Arc<dyn AgentTransport>,
        wallet: Arc<Wallet>,
        sink: MessageLogSink,
        planner: Arc<dyn Planner>,
    ) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        let monitor = Arc::new(HealthMonitor::new(
            config.remote_agents.clone(),
            config.health_interval,
            transport,
            Arc::clone(&registry),
        ));
        let conversations = Arc::new(ConversationStore::new());

        let dispatcher = TaskDispatcher::new(Arc::clone(&registry), sink, &config.name)
            .with_monitor(Arc::clone(&monitor));
        let relay = Arc::new(Relay::new(
            dispatcher,
            OrchestrationPolicy::new(Arc::clone(&wallet)),
            Arc::clone(&conversations),
            Arc::clone(&monitor),
        ));

        let handlers: [Arc<dyn ToolHandler>; 5] = [
            Arc::new(ListRemoteAgentsTool::new(Arc::clone(&monitor))),
            Arc::new(SendMessageTool::new(Arc::clone(&relay))),
            Arc::new(GetBalanceTool::new(Arc::clone(&wallet))),
            Arc::new(FilterMenuTool::new(Arc::clone(&wallet))),
            Arc::new(SendDeliveryDetailsTool::new(relay, config.delivery.clone())),
        ];
        let mut tools = ToolRegistry::with_allow_list(ALLOWED_TOOLS);
        for handler in handlers {
            if let Err(e) = tools.register(handler) {
                warn!("{:#}", e);
            }
        }
        let missing = tools.missing();
        if !missing.is_empty() {
            warn!("No handler for allowed tool(s): {}", missing.join(", "));
        }
        info!(
            "Orchestrator '{}' ready with {} tool(s) and {} remote address(es)",
            config.name,
            tools.len(),
            config.remote_agents.len()
        );

        Self {
            name: config.name,
            monitor,
            conversations,
            wallet,
            tools,
            planner,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        self.monitor.registry()
    }

    pub fn monitor(&self) -> &Arc<HealthMonitor> {
        &self.monitor
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn wallet(&self) -> &Arc<Wallet> {
        &self.wallet
    }

    /// Execute one tool by name, exactly as the planner would
    pub async fn call_tool(&self, name: &str, input: Value) -> Result<String> {
        self.tools.execute(name, input).await
    }

    /// Forget a conversation and every restaurant context it held.
    /// Returns false if it was never started.
    pub async fn end_conversation(&self, conversation_id: &str) -> bool {
        let removed = self.conversations.remove(conversation_id).await;
        if removed {
            info!(
                "Ended conversation {} ({} still open)",
                conversation_id,
                self.conversations.count().await
            );
        }
        removed
    }

    /// Run one user turn and return what the user should read
    pub async fn handle_turn(&self, conversation_id: &str, user_text: &str) -> Result<String> {
        self.monitor.ensure_started().await;
        let conversation = self.conversations.get_or_create(conversation_id).await;
        conversation.lock().await.begin_turn();

        let mut history: Vec<StepRecord> = Vec::new();
        for step in 0..MAX_STEPS {
            let request = {
                let session = conversation.lock().await;
                PlanRequest {
                    conversation_id: conversation_id.to_string(),
                    user_text: user_text.to_string(),
                    phase: session.phase,
                    active_agent: session.active_agent.clone(),
                    agents: self.registry().list(),
                    tools: self.tools.list_tools(),
                    history: history.clone(),
                }
            };

            let (tool, input) = match self.planner.next_step(&request).await? {
                PlanStep::Reply(text) => return Ok(text),
                PlanStep::Consolidate => {
                    return Ok(consolidate(&mut *conversation.lock().await));
                }
                PlanStep::Call { tool, input } => (tool, input),
            };
            debug!("Turn step {}: {}", step + 1, tool);

            let outcomes_before = {
                let mut session = conversation.lock().await;
                if let Some(phase) = phase_for_tool(&tool) {
                    session.phase = phase;
                }
                session.outcomes().len()
            };

            let record = match self.tools.execute(&tool, input.clone()).await {
                Ok(output) => StepRecord {
                    tool,
                    input,
                    output,
                    ok: true,
                },
                Err(e) => {
                    let output = match e.downcast_ref::<A2aError>() {
                        Some(a2a) => apology_for(a2a),
                        None => format!("Error: {:#}", e),
                    };
                    StepRecord {
                        tool,
                        input,
                        output,
                        ok: false,
                    }
                }
            };
            history.push(record);

            let session = conversation.lock().await;
            if session.outcomes().len() > outcomes_before {
                if let Some(question) = session
                    .last_outcome()
                    .filter(|o| matches!(o, TurnOutcome::NeedsInput { .. }))
                {
                    debug!("'{}' needs user input, ending turn", question.agent());
                    return Ok(question.message());
                }
            }
        }

        warn!(
            "Turn for conversation {} hit the {}-step limit",
            conversation_id, MAX_STEPS
        );
        let summary = consolidate(&mut *conversation.lock().await);
        if summary.is_empty() {
            Ok("Sorry, I couldn't finish that request. Could you rephrase it?".to_string())
        } else {
            Ok(summary)
        }
    }
}

fn phase_for_tool(tool: &str) -> Option<Phase> {
    match tool {
        "list_remote_agents" => Some(Phase::Discovery),
        "get_balance" | "filter_menu" => Some(Phase::Planning),
        "send_message" | "send_delivery_details" => Some(Phase::Executing),
        _ => None,
    }
}

/// Console planner: maps short commands onto tool calls and relays
/// anything else to the agent the conversation is already talking to.
///
/// Commands: `agents`, `send <agent> <text>`, `menu <agent>`, `balance`,
/// `deliver <agent>`.
#[derive(Debug, Default)]
pub struct RelayPlanner;

pub const RELAY_HELP: &str = "Commands: agents | send <agent> <text> | menu <agent> | balance | deliver <agent>";

/// Split `rest` into a known agent name and the remaining text, preferring
/// the longest matching name since names may contain spaces
fn split_agent<'a>(rest: &'a str, agents: &[AgentSummary]) -> Option<(String, &'a str)> {
    let rest = rest.trim_start();
    agents
        .iter()
        .filter(|a| {
            rest.starts_with(a.name.as_str())
                && rest[a.name.len()..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
        })
        .max_by_key(|a| a.name.len())
        .map(|a| (a.name.clone(), rest[a.name.len()..].trim()))
        .or_else(|| {
            let mut words = rest.splitn(2, char::is_whitespace);
            let name = words.next().filter(|w| !w.is_empty())?;
            Some((name.to_string(), words.next().unwrap_or("").trim()))
        })
}

impl RelayPlanner {
    fn first_step(request: &PlanRequest) -> PlanStep {
        let text = request.user_text.trim();
        let (command, rest) = match text.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest),
            None => (text, ""),
        };
        let conversation_id = request.conversation_id.as_str();

        let send = |agent: &str, task: &str| PlanStep::Call {
            tool: "send_message".to_string(),
            input: json!({
                "conversation_id": conversation_id,
                "agent_name": agent,
                "task": task,
            }),
        };

        match command.to_ascii_lowercase().as_str() {
            "agents" => PlanStep::Call {
                tool: "list_remote_agents".to_string(),
                input: json!({}),
            },
            "balance" => PlanStep::Call {
                tool: "get_balance".to_string(),
                input: json!({}),
            },
            "menu" => match split_agent(rest, &request.agents) {
                Some((agent, _)) => send(&agent, FULL_MENU_REQUEST),
                None => PlanStep::Reply(RELAY_HELP.to_string()),
            },
            "deliver" => match split_agent(rest, &request.agents) {
                Some((agent, _)) => PlanStep::Call {
                    tool: "send_delivery_details".to_string(),
                    input: json!({"conversation_id": conversation_id, "agent_name": agent}),
                },
                None => PlanStep::Reply(RELAY_HELP.to_string()),
            },
            "send" => match split_agent(rest, &request.agents) {
                Some((agent, task)) if !task.is_empty() => send(&agent, task),
                _ => PlanStep::Reply(RELAY_HELP.to_string()),
            },
            _ => match &request.active_agent {
                Some(agent) if !text.is_empty() => send(agent, text),
                _ => PlanStep::Reply(RELAY_HELP.to_string()),
            },
        }
    }
}

#[async_trait]
impl Planner for RelayPlanner {
    async fn next_step(&self, request: &PlanRequest) -> Result<PlanStep> {
        let Some(last) = request.history.last() else {
            return Ok(Self::first_step(request));
        };
        if !last.ok {
            return Ok(PlanStep::Reply(last.output.clone()));
        }
        Ok(match last.tool.as_str() {
            "send_message" | "send_delivery_details" => PlanStep::Consolidate,
            "list_remote_agents" => {
                PlanStep::Reply(format_agents(&request.agents))
            }
            _ => PlanStep::Reply(last.output.clone()),
        })
    }
}

fn format_agents(agents: &[AgentSummary]) -> String {
    if agents.is_empty() {
        return "No restaurant agents are available right now.".to_string();
    }
    agents
        .iter()
        .map(|a| {
            format!(
                "- {} ({}){}",
                a.name,
                a.description,
                if a.connected { "" } else { " [offline]" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{JsonRpcResponse, TaskState};
    use crate::testing::{FakeTransport, card, task_reply};
    use std::sync::Mutex;

    const A: &str = "http://localhost:10003";
    const B: &str = "http://localhost:10004";

    /// Replays a fixed list of steps, recording every request it sees
    struct ScriptedPlanner {
        steps: Mutex<Vec<PlanStep>>,
        seen: Mutex<Vec<PlanRequest>>,
    }

    impl ScriptedPlanner {
        fn new(steps: Vec<PlanStep>) -> Self {
            let mut steps = steps;
            steps.reverse();
            Self {
                steps: Mutex::new(steps),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Planner for ScriptedPlanner {
        async fn next_step(&self, request: &PlanRequest) -> Result<PlanStep> {
            self.seen.lock().unwrap().push(request.clone());
            Ok(self
                .steps
                .lock()
                .unwrap()
                .pop()
                .unwrap_or(PlanStep::Reply("done".to_string())))
        }
    }

    fn orchestrator(transport: Arc<FakeTransport>, planner: Arc<dyn Planner>) -> Orchestrator {
        let config = OrchestratorConfig {
            remote_agents: vec![A.to_string(), B.to_string()],
            health_interval: Duration::from_secs(3600),
            delivery: DeliveryProfile {
                name: "Sam".to_string(),
                address: "1 Main St".to_string(),
                phone: "555-0100".to_string(),
            },
            ..Default::default()
        };
        Orchestrator::new(
            config,
            transport,
            Arc::new(Wallet::new(50.0)),
            MessageLogSink::disabled(),
            planner,
        )
    }

    fn send_step(agent: &str, task: &str) -> PlanStep {
        PlanStep::Call {
            tool: "send_message".to_string(),
            input: json!({"conversation_id": "conv-1", "agent_name": agent, "task": task}),
        }
    }

    #[tokio::test]
    async fn test_relay_planner_menu_round_trip() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        transport.push_reply(A, Ok(task_reply("t-1", TaskState::Completed, r#"{"Pizza": 10.0}"#)));
        let orch = orchestrator(Arc::clone(&transport), Arc::new(RelayPlanner));

        let answer = orch.handle_turn("conv-1", "menu A").await.unwrap();
        assert!(answer.contains("Pizza"));
        assert_eq!(transport.sent()[0].1.message.parts[0].to_value(), Some(json!(FULL_MENU_REQUEST)));
    }

    #[tokio::test]
    async fn test_input_required_ends_turn_early() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        transport.push_reply(A, Ok(task_reply("t-1", TaskState::InputRequired, "What size?")));
        let planner = Arc::new(ScriptedPlanner::new(vec![
            send_step("A", "One pizza"),
            send_step("A", "should not be sent"),
        ]));
        let orch = orchestrator(Arc::clone(&transport), planner);

        let answer = orch.handle_turn("conv-1", "Order a pizza").await.unwrap();
        assert_eq!(answer, "What size?");
        assert_eq!(transport.sent().len(), 1);

        let conversation = orch.conversations().get_or_create("conv-1").await;
        assert!(conversation.lock().await.session_active);
    }

    #[tokio::test]
    async fn test_error_envelope_is_apology() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let error: JsonRpcResponse = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": "1",
            "error": {"code": -32001, "message": "Task not found"}
        }))
        .unwrap();
        transport.push_reply(A, Ok(error));
        let orch = orchestrator(Arc::clone(&transport), Arc::new(RelayPlanner));

        let answer = orch.handle_turn("conv-1", "send A hello").await.unwrap();
        assert!(answer.starts_with("Sorry, A"), "{}", answer);
        assert!(!answer.contains("still working"));

        let conversation = orch.conversations().get_or_create("conv-1").await;
        let session = conversation.lock().await;
        assert!(!session.session_active);
        assert_eq!(session.phase, Phase::Closing);
    }

    #[tokio::test]
    async fn test_end_conversation_starts_fresh_context() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let orch = orchestrator(Arc::clone(&transport), Arc::new(RelayPlanner));

        orch.handle_turn("conv-1", "send A One pizza").await.unwrap();
        assert!(orch.end_conversation("conv-1").await);
        assert!(!orch.end_conversation("conv-1").await);
        assert_eq!(orch.conversations().count().await, 0);

        orch.handle_turn("conv-1", "send A One pizza").await.unwrap();
        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_ne!(sent[0].1.message.context_id, sent[1].1.message.context_id);
    }

    #[tokio::test]
    async fn test_follow_up_goes_to_active_agent() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        transport.push_reply(A, Ok(task_reply("t-1", TaskState::InputRequired, "What size?")));
        let orch = orchestrator(Arc::clone(&transport), Arc::new(RelayPlanner));

        orch.handle_turn("conv-1", "send A One pizza").await.unwrap();
        let answer = orch.handle_turn("conv-1", "Large").await.unwrap();
        assert_eq!(answer, "ok");

        let sent = transport.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].1.message.task_id.as_deref(), Some("t-1"));
        assert_eq!(sent[0].1.message.context_id, sent[1].1.message.context_id);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_conversational() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let orch = orchestrator(Arc::clone(&transport), Arc::new(RelayPlanner));

        let answer = orch.handle_turn("conv-1", "send B hello").await.unwrap();
        assert_eq!(answer, "Sorry, I don't know a restaurant called B. I can reach: A.");
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_step_limit() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let steps = (0..MAX_STEPS + 2)
            .map(|_| PlanStep::Call {
                tool: "get_balance".to_string(),
                input: json!({}),
            })
            .collect();
        let planner = Arc::new(ScriptedPlanner::new(steps));
        let orch = orchestrator(transport, Arc::clone(&planner) as Arc<dyn Planner>);

        let answer = orch.handle_turn("conv-1", "loop").await.unwrap();
        assert!(answer.starts_with("Sorry"));
        assert_eq!(planner.seen.lock().unwrap().len(), MAX_STEPS);
    }

    #[tokio::test]
    async fn test_disallowed_tool_reported_to_planner() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let planner = Arc::new(ScriptedPlanner::new(vec![PlanStep::Call {
            tool: "delete_everything".to_string(),
            input: json!({}),
        }]));
        let orch = orchestrator(transport, Arc::clone(&planner) as Arc<dyn Planner>);

        assert_eq!(orch.handle_turn("conv-1", "x").await.unwrap(), "done");
        let seen = planner.seen.lock().unwrap();
        let record = &seen[1].history[0];
        assert!(!record.ok);
        assert!(record.output.contains("not on the allow-list"));
    }

    #[tokio::test]
    async fn test_phase_tracks_tools() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let planner = Arc::new(ScriptedPlanner::new(vec![PlanStep::Call {
            tool: "list_remote_agents".to_string(),
            input: json!({}),
        }]));
        let orch = orchestrator(transport, Arc::clone(&planner) as Arc<dyn Planner>);
        orch.handle_turn("conv-1", "who is there?").await.unwrap();

        let seen = planner.seen.lock().unwrap();
        assert_eq!(seen[0].phase, Phase::Greeting);
        assert_eq!(seen[1].phase, Phase::Discovery);
        assert_eq!(seen[1].agents.len(), 1);
    }

    #[tokio::test]
    async fn test_deliver_sends_profile() {
        let transport = Arc::new(FakeTransport::new().with_card(A, card("A", A)));
        let orch = orchestrator(Arc::clone(&transport), Arc::new(RelayPlanner));

        orch.handle_turn("conv-1", "deliver A").await.unwrap();
        let sent = transport.sent();
        let text = sent[0].1.message.parts[0].to_value().unwrap();
        assert!(text.as_str().unwrap().contains("1 Main St"));
    }

    #[test]
    fn test_split_agent_prefers_longest_name() {
        let agents = vec![
            AgentSummary {
                name: "Luigi".to_string(),
                description: String::new(),
                connected: true,
                skills: vec![],
            },
            AgentSummary {
                name: "Luigi's Pizza Bot".to_string(),
                description: String::new(),
                connected: true,
                skills: vec![],
            },
        ];
        assert_eq!(
            split_agent("Luigi's Pizza Bot two slices", &agents),
            Some(("Luigi's Pizza Bot".to_string(), "two slices"))
        );
        assert_eq!(
            split_agent("Luigi hi", &agents),
            Some(("Luigi".to_string(), "hi"))
        );
        assert_eq!(
            split_agent("Nobody hi", &agents),
            Some(("Nobody".to_string(), "hi"))
        );
        assert_eq!(split_agent("", &agents), None);
    }

    #[test]
    fn test_delivery_profile_complete() {
        assert!(!DeliveryProfile::default().is_complete());
    }
}
