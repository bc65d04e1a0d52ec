//! A2A client — resolves agent cards and relays messages to remote agents

use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::error::A2aError;
use crate::protocol::*;

/// Outbound side of the protocol: card resolution and `message/send`.
///
/// Implemented over HTTP by [`A2aClient`]; tests substitute in-memory fakes.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    /// Fetch and validate the agent card published under `base_url`
    async fn fetch_agent_card(&self, base_url: &str) -> Result<AgentCard, A2aError>;

    /// Send a message to the agent at `endpoint`.
    ///
    /// Only transport failures are errors. Any HTTP response is returned as
    /// an envelope; a body that is not JSON-RPC comes back empty.
    async fn send_message(
        &self,
        endpoint: &str,
        params: MessageSendParams,
    ) -> Result<JsonRpcResponse, A2aError>;
}

/// Fixed timeouts applied to every outbound call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// HTTP implementation of [`AgentTransport`]
#[derive(Clone)]
pub struct A2aClient {
    http: Client,
}

impl A2aClient {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http })
    }
}

/// `<base>/.well-known/agent.json` without doubling slashes
pub fn agent_card_url(base_url: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), AGENT_CARD_PATH)
}

fn validate_card(url: &str, card: &AgentCard) -> Result<(), A2aError> {
    if card.name.trim().is_empty() {
        return Err(A2aError::malformed(url, "agent card has an empty name"));
    }
    if card.url.trim().is_empty() {
        return Err(A2aError::malformed(url, "agent card has an empty url"));
    }
    Ok(())
}

#[async_trait]
impl AgentTransport for A2aClient {
    async fn fetch_agent_card(&self, base_url: &str) -> Result<AgentCard, A2aError> {
        let url = agent_card_url(base_url);
        debug!("Fetching agent card from {}", url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| A2aError::unreachable(&url, e))?;

        if !resp.status().is_success() {
            return Err(A2aError::unreachable(
                &url,
                format!("HTTP {}", resp.status()),
            ));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| A2aError::unreachable(&url, e))?;
        let card: AgentCard =
            serde_json::from_str(&body).map_err(|e| A2aError::malformed(&url, e))?;
        validate_card(&url, &card)?;

        info!(
            "Fetched agent card: {} ({} skills)",
            card.name,
            card.skills.len()
        );
        Ok(card)
    }

    async fn send_message(
        &self,
        endpoint: &str,
        params: MessageSendParams,
    ) -> Result<JsonRpcResponse, A2aError> {
        let request = JsonRpcRequest::new(MESSAGE_SEND, params);
        debug!("Sending {} {} to {}", MESSAGE_SEND, request.id, endpoint);

        let resp = self
            .http
            .post(endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| A2aError::unreachable(endpoint, e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| A2aError::unreachable(endpoint, e))?;

        match serde_json::from_str::<JsonRpcResponse>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(e) => {
                warn!(
                    "Unparseable reply from {} (HTTP {}): {}",
                    endpoint, status, e
                );
                Ok(JsonRpcResponse::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = A2aClient::new(ClientConfig::default());
        assert!(client.is_ok());
    }

    #[test]
    fn test_agent_card_url_trailing_slash() {
        assert_eq!(
            agent_card_url("http://localhost:10003/"),
            "http://localhost:10003/.well-known/agent.json"
        );
        assert_eq!(
            agent_card_url("http://localhost:10003"),
            "http://localhost:10003/.well-known/agent.json"
        );
    }

    #[test]
    fn test_validate_card_empty_name() {
        let card = AgentCard {
            name: " ".to_string(),
            description: "d".to_string(),
            url: "http://x".to_string(),
            version: String::new(),
            capabilities: AgentCapabilities::default(),
            skills: vec![],
            default_input_modes: vec![],
            default_output_modes: vec![],
        };
        let err = validate_card("http://x", &card).unwrap_err();
        assert!(matches!(err, A2aError::MalformedDescriptor { .. }));
    }

    #[tokio::test]
    async fn test_fetch_agent_card_connection_refused() {
        let client = A2aClient::new(ClientConfig::default()).unwrap();
        let result = client.fetch_agent_card("http://127.0.0.1:1").await;
        assert!(matches!(
            result,
            Err(A2aError::UnreachableEndpoint { .. })
        ));
    }

    #[tokio::test]
    async fn test_send_message_connection_refused() {
        let client = A2aClient::new(ClientConfig::default()).unwrap();
        let params = MessageSendParams {
            message: Message::user_text("hello", "c", "t"),
            configuration: None,
        };
        let result = client.send_message("http://127.0.0.1:1", params).await;
        assert!(matches!(
            result,
            Err(A2aError::UnreachableEndpoint { .. })
        ));
    }
}
