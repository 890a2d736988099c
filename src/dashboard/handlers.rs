//! HTTP request handlers for the dashboard API.

use super::page::INDEX_HTML;
use crate::pipeline::{LogEntry, Pipeline, RunState, StatsSnapshot};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub type DashboardState = Arc<Pipeline>;

/// Reply to every command endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommandResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_speed: Option<u8>,
}

impl CommandResponse {
    fn ok() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    fn rejected(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            new_speed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: StatsSnapshot,
    pub state: RunState,
    pub speed_level: u8,
    pub target_rate: f64,
    pub host: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLine {
    pub line: String,
    #[serde(flatten)]
    pub entry: LogEntry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogResponse {
    pub output: Vec<LogLine>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdjustSpeedRequest {
    #[serde(default)]
    pub change: i32,
}

/// Handler for `GET /`.
pub async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// Handler for `GET /health`.
pub async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Handler for `GET /api/stats`.
pub async fn stats_handler(State(pipeline): State<DashboardState>) -> impl IntoResponse {
    let speed = pipeline.run_config().speed_level;
    Json(StatsResponse {
        stats: pipeline.get_stats(),
        state: pipeline.state(),
        speed_level: speed.get(),
        target_rate: speed.target_rate(),
        host: pipeline.host().to_string(),
    })
}

/// Handler for `GET /api/log`.
pub async fn log_handler(State(pipeline): State<DashboardState>) -> impl IntoResponse {
    let output = pipeline
        .get_log()
        .into_iter()
        .map(|entry| LogLine {
            line: entry.render(),
            entry,
        })
        .collect();
    Json(LogResponse { output })
}

/// Handler for `POST /api/start`.
pub async fn start_handler(State(pipeline): State<DashboardState>) -> impl IntoResponse {
    if pipeline.start().await {
        Json(CommandResponse::ok())
    } else {
        Json(CommandResponse::rejected("Already running"))
    }
}

/// Handler for `POST /api/stop`.
pub async fn stop_handler(State(pipeline): State<DashboardState>) -> impl IntoResponse {
    if pipeline.stop().await {
        Json(CommandResponse::ok())
    } else {
        Json(CommandResponse::rejected("Not running"))
    }
}

/// Handler for `POST /api/clear`.
pub async fn clear_handler(State(pipeline): State<DashboardState>) -> impl IntoResponse {
    pipeline.clear_log();
    Json(CommandResponse::ok())
}

/// Handler for `POST /api/speed`.
pub async fn speed_handler(
    State(pipeline): State<DashboardState>,
    Json(request): Json<AdjustSpeedRequest>,
) -> impl IntoResponse {
    match pipeline.adjust_speed(request.change) {
        Ok(level) => Json(CommandResponse {
            success: true,
            message: None,
            new_speed: Some(level.get()),
        }),
        Err(e) => Json(CommandResponse::rejected(e.to_string())),
    }
}

/// Handler for `GET /api/export` - the primary store as a download.
pub async fn export_handler(State(pipeline): State<DashboardState>) -> impl IntoResponse {
    match pipeline.export_persisted_records().await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=solana_wallets_export.txt",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "Failed to export records");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)).into_response()
        }
    }
}
