//! Remote agent connection — one resolved card bound to one transport

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

use crate::client::AgentTransport;
use crate::error::A2aError;
use crate::protocol::{AgentCard, JsonRpcResponse, MessageSendParams};

/// Outbound handle for a single remote agent.
///
/// Messages go to the address the card was resolved from; the card's own
/// `url` is informational. The connection never re-resolves itself, only
/// the health monitor flips `connected`.
pub struct RemoteAgentConnection {
    address: String,
    card: AgentCard,
    transport: Arc<dyn AgentTransport>,
    connected: AtomicBool,
}

impl RemoteAgentConnection {
    pub fn new(address: &str, card: AgentCard, transport: Arc<dyn AgentTransport>) -> Self {
        Self {
            address: address.trim_end_matches('/').to_string(),
            card,
            transport,
            connected: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.card.name
    }

    pub fn card(&self) -> &AgentCard {
        &self.card
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::AcqRel);
        if was != connected {
            debug!(
                "Agent '{}' is now {}",
                self.card.name,
                if connected { "connected" } else { "disconnected" }
            );
        }
    }

    /// Relay one `message/send` call
    pub async fn send(&self, params: MessageSendParams) -> Result<JsonRpcResponse, A2aError> {
        self.transport.send_message(&self.address, params).await
    }
}

impl std::fmt::Debug for RemoteAgentConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteAgentConnection")
            .field("name", &self.card.name)
            .field("address", &self.address)
            .field("connected", &self.is_connected())
            .finish()
    }
}
