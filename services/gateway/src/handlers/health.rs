use axum::{extract::State, Json};
use chrono::{SecondsFormat, Utc};

use crate::models::{HealthResponse, ReadinessResponse};
use crate::state::AppState;

fn health(status: &'static str) -> HealthResponse {
    HealthResponse {
        status,
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        version: etl_engine::SERVICE_VERSION,
    }
}

pub async fn healthz() -> Json<HealthResponse> {
    Json(health("healthy"))
}

pub async fn readyz(State(state): State<AppState>) -> Json<ReadinessResponse> {
    let store = state.service.store();
    Json(ReadinessResponse {
        health: health("ready"),
        records: store.len(),
        last_ingestion: store
            .last_ingestion_time()
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true)),
    })
}
