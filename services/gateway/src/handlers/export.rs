use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};

use crate::error::AppError;
use crate::models::{required_date, ExportParams, ExportResponse};
use crate::state::AppState;

pub async fn run_export(
    State(state): State<AppState>,
    params: Result<Query<ExportParams>, QueryRejection>,
) -> Result<Json<ExportResponse>, AppError> {
    let Query(params) = params?;
    let date = required_date(&params.date, "date")?;

    let cancel = state.shutdown.child_token();
    let _guard = cancel.clone().drop_guard();

    let summary = state.service.run_export(date, &cancel).await?;

    Ok(Json(ExportResponse {
        message: "Export completed successfully",
        summary,
    }))
}
