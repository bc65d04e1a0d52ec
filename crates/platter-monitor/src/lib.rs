//! Message monitor — an in-memory, append-only log of relayed messages
//!
//! `POST /log` accepts `{sender, receiver, message}`; `GET /messages` returns
//! everything received so far, in arrival order.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

pub const DEFAULT_PORT: u16 = 10111;

const INVALID_FORMAT: &str = "Invalid message format. Required fields: sender, receiver, message";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorRecord {
    pub sender: String,
    pub receiver: String,
    pub message: Value,
    pub received_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct MonitorState {
    records: RwLock<Vec<MonitorRecord>>,
}

impl MonitorState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<MonitorRecord> {
        self.records.read().await.clone()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[derive(Debug)]
enum LogError {
    Invalid(String),
}

impl IntoResponse for LogError {
    fn into_response(self) -> Response {
        let LogError::Invalid(reason) = self;
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "reason": reason})),
        )
            .into_response()
    }
}

fn field<'a>(value: &'a Value, name: &str) -> Option<&'a Value> {
    value.get(name).filter(|v| !v.is_null())
}

fn parse_record(body: &[u8]) -> Result<MonitorRecord, LogError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| LogError::Invalid(format!("Body is not JSON: {}", e)))?;
    let (Some(sender), Some(receiver), Some(message)) = (
        field(&value, "sender"),
        field(&value, "receiver"),
        field(&value, "message"),
    )
    else {
        return Err(LogError::Invalid(INVALID_FORMAT.to_string()));
    };
    let as_name = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    Ok(MonitorRecord {
        sender: as_name(sender),
        receiver: as_name(receiver),
        message: message.clone(),
        received_at: Utc::now(),
    })
}

async fn log_message(
    State(state): State<Arc<MonitorState>>,
    body: Bytes,
) -> Result<Json<Value>, LogError> {
    let record = parse_record(&body).inspect_err(|LogError::Invalid(reason)| {
        error!("Rejected log record: {}", reason);
    })?;
    info!(
        "Received message from {} to {}: {}",
        record.sender, record.receiver, record.message
    );
    state.records.write().await.push(record);
    Ok(Json(json!({"status": "success"})))
}

async fn list_messages(State(state): State<Arc<MonitorState>>) -> Json<Vec<MonitorRecord>> {
    Json(state.records().await)
}

pub fn router(state: Arc<MonitorState>) -> Router {
    Router::new()
        .route("/log", post(log_message))
        .route("/messages", get(list_messages))
        .route("/health", get(|| async { "OK" }))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `addr` and serve until the process exits
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind monitor to {}", addr))?;
    info!("Message monitor listening at http://{}", addr);
    axum::serve(listener, router(Arc::new(MonitorState::new())))
        .await
        .context("Monitor server failed")
}
