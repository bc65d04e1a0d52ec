//! Agent registry — known remote agents keyed by card name
//!
//! Entries are only ever added or replaced, never removed. Liveness lives on
//! each connection as an atomic flag.

use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use tracing::{info, warn};

use crate::client::AgentTransport;
use crate::connection::RemoteAgentConnection;
use crate::error::A2aError;
use crate::protocol::AgentCard;

/// What `list_remote_agents` reports for one agent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentSummary {
    pub name: String,
    pub description: String,
    pub connected: bool,
    pub skills: Vec<String>,
}

#[derive(Default)]
pub struct AgentRegistry {
    connections: DashMap<String, Arc<RemoteAgentConnection>>,
    /// Base address → card name, for addresses that resolved at least once
    addresses: DashMap<String, String>,
}

fn normalize_address(address: &str) -> String {
    address.trim().trim_end_matches('/').to_string()
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<RemoteAgentConnection>> {
        self.connections.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a connection, failing with `UnknownAgent` when absent
    pub fn require(&self, name: &str) -> Result<Arc<RemoteAgentConnection>, A2aError> {
        self.get(name).ok_or_else(|| A2aError::UnknownAgent {
            name: name.to_string(),
            known: self.names().join(", "),
        })
    }

    /// Name registered for a base address, if it ever resolved
    pub fn name_for_address(&self, address: &str) -> Option<String> {
        self.addresses
            .get(&normalize_address(address))
            .map(|entry| entry.value().clone())
    }

    /// Registered agent names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.connections.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    pub fn connected_count(&self) -> usize {
        self.connections
            .iter()
            .filter(|e| e.value().is_connected())
            .count()
    }

    /// Summaries of every known agent, sorted by name
    pub fn list(&self) -> Vec<AgentSummary> {
        let mut agents: Vec<AgentSummary> = self
            .connections
            .iter()
            .map(|entry| {
                let conn = entry.value();
                AgentSummary {
                    name: conn.name().to_string(),
                    description: conn.card().description.clone(),
                    connected: conn.is_connected(),
                    skills: conn.card().skills.iter().map(|s| s.name.clone()).collect(),
                }
            })
            .collect();
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        agents
    }

    /// Apply a successful card resolution for `address`.
    ///
    /// A new address registers a fresh connection; a known address with an
    /// unchanged card is just marked connected; a changed card replaces the
    /// connection wholesale.
    pub fn record_success(
        &self,
        address: &str,
        card: AgentCard,
        transport: Arc<dyn AgentTransport>,
    ) {
        let address = normalize_address(address);
        let previous_name = self.addresses.get(&address).map(|e| e.value().clone());

        if let Some(old_name) = previous_name.as_deref().filter(|n| *n != card.name) {
            warn!(
                "Agent at {} renamed from '{}' to '{}'",
                address, old_name, card.name
            );
            if let Some(old) = self.get(old_name) {
                old.set_connected(false);
            }
        }

        if let Some(existing) = self.get(&card.name) {
            if existing.address() == address && *existing.card() == card {
                existing.set_connected(true);
                return;
            }
        }

        let name = card.name.clone();
        let is_new = !self.connections.contains_key(&name);
        self.connections.insert(
            name.clone(),
            Arc::new(RemoteAgentConnection::new(&address, card, transport)),
        );
        self.addresses.insert(address.clone(), name.clone());

        if is_new {
            info!("Registered remote agent '{}' at {}", name, address);
        } else {
            info!("Refreshed agent card for '{}' at {}", name, address);
        }
    }

    /// Apply a failed resolution: mark the address's connection disconnected.
    /// Addresses that never resolved stay absent.
    pub fn record_failure(&self, address: &str) {
        if let Some(conn) = self
            .name_for_address(address)
            .and_then(|name| self.get(&name))
        {
            conn.set_connected(false);
        }
    }
}
