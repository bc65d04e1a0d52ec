//! Error taxonomy for remote agent discovery and task relay

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum A2aError {
    /// Network, DNS, timeout or HTTP-level failure talking to an agent
    #[error("Agent endpoint {url} is unreachable: {reason}")]
    UnreachableEndpoint { url: String, reason: String },

    /// The agent card was fetched but is not a usable descriptor
    #[error("Malformed agent card from {url}: {reason}")]
    MalformedDescriptor { url: String, reason: String },

    #[error("Agent '{name}' not found. Known agents: {known}")]
    UnknownAgent { name: String, known: String },

    #[error("Agent '{agent}' task {task_id} failed")]
    RemoteTaskFailed { agent: String, task_id: String },

    #[error("Agent '{agent}' task {task_id} was canceled")]
    RemoteTaskCanceled { agent: String, task_id: String },

    #[error("A2A protocol error: {0}")]
    Protocol(String),
}

impl A2aError {
    pub(crate) fn unreachable(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::UnreachableEndpoint {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::MalformedDescriptor {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the next health-check cycle may clear this condition
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::UnreachableEndpoint { .. } | Self::MalformedDescriptor { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_agent_display() {
        let err = A2aError::UnknownAgent {
            name: "B".to_string(),
            known: "A".to_string(),
        };
        assert_eq!(err.to_string(), "Agent 'B' not found. Known agents: A");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_unreachable_is_retryable() {
        let err = A2aError::unreachable("http://localhost:10004", "connection refused");
        assert!(err.is_retryable());
        assert!(err.to_string().contains("localhost:10004"));
    }
}
