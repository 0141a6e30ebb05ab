use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::error::AppError;
use crate::models::{non_blank, optional_date, IngestParams, IngestResponse};
use crate::state::AppState;

pub async fn run_ingestion(
    State(state): State<AppState>,
    params: Result<Query<IngestParams>, QueryRejection>,
) -> Result<Json<IngestResponse>, AppError> {
    let Query(params) = params?;
    let since = optional_date(non_blank(&params.since), "since")?;

    // Client disconnects drop this future and cancel the run.
    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let summary = state.service.run_ingestion(since, &cancel).await?;

    Ok(Json(IngestResponse {
        message: "Ingestion completed successfully",
        since,
        summary,
    }))
}
