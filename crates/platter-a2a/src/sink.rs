//! Observability sink — mirrors every relayed message to the monitor service
//!
//! Delivery is fire-and-forget: a missing or unavailable monitor never
//! changes what the caller sees.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

const LOG_TIMEOUT: Duration = Duration::from_secs(5);

/// One relayed message as the monitor stores it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub sender: String,
    pub receiver: String,
    pub message: Value,
}

impl LogRecord {
    pub fn new(sender: &str, receiver: &str, message: impl Into<Value>) -> Self {
        Self {
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct MessageLogSink {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl MessageLogSink {
    /// `monitor_url` is the monitor's base address; `None` disables the sink
    pub fn new(monitor_url: Option<&str>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(LOG_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            endpoint: monitor_url.map(|url| format!("{}/log", url.trim_end_matches('/'))),
        }
    }

    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.endpoint.is_some()
    }

    /// Queue a record for delivery without waiting for it
    pub fn record(&self, record: LogRecord) {
        if self.endpoint.is_none() {
            return;
        }
        let sink = self.clone();
        tokio::spawn(async move {
            if let Err(e) = sink.post(&record).await {
                warn!(
                    "Failed to log message {} -> {}: {:#}",
                    record.sender, record.receiver, e
                );
            }
        });
    }

    /// Deliver a record and wait for the monitor's answer
    pub async fn post(&self, record: &LogRecord) -> Result<()> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(());
        };
        let response = self
            .client
            .post(endpoint)
            .json(record)
            .send()
            .await
            .with_context(|| format!("Failed to reach monitor at {}", endpoint))?;

        let status = response.status();
        if !status.is_success() {
            bail!("Monitor rejected log record ({})", status);
        }
        debug!("Logged message {} -> {}", record.sender, record.receiver);
        Ok(())
    }
}
