use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use etl_engine::store::{Page, QueryPage};

use crate::error::AppError;
use crate::models::{
    date_range, page, required_str, ChannelMetricsParams, FunnelMetricsParams, MetricsResponse,
};
use crate::state::AppState;

fn respond(result: QueryPage, page: Page) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        count: result.records.len(),
        data: result.records,
        total: result.total,
        limit: page.limit,
        offset: page.offset,
    })
}

pub async fn channel(
    State(state): State<AppState>,
    params: Result<Query<ChannelMetricsParams>, QueryRejection>,
) -> Result<Json<MetricsResponse>, AppError> {
    let Query(params) = params?;
    let range = date_range(&params.from, &params.to)?;
    let channel = required_str(&params.channel, "channel")?;
    let window = page(params.limit, params.offset);

    let result = state.service.query_channel(range, channel, window);
    Ok(respond(result, window))
}

pub async fn funnel(
    State(state): State<AppState>,
    params: Result<Query<FunnelMetricsParams>, QueryRejection>,
) -> Result<Json<MetricsResponse>, AppError> {
    let Query(params) = params?;
    let range = date_range(&params.from, &params.to)?;
    let utm_campaign = required_str(&params.utm_campaign, "utm_campaign")?;
    let window = page(params.limit, params.offset);

    let result = state.service.query_funnel(range, utm_campaign, window);
    Ok(respond(result, window))
}
