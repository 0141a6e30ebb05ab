use chrono::NaiveDate;
use etl_engine::service::{ExportSummary, IngestionSummary};
use etl_engine::store::Page;
use serde::{Deserialize, Serialize};
use types::dates::{parse_date, DateRange};
use types::record::TransformedRecord;

use crate::error::AppError;

pub const DEFAULT_LIMIT: usize = 100;
pub const MAX_LIMIT: usize = 1000;

// ---- Requests ----

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestParams {
    pub since: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChannelMetricsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub channel: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FunnelMetricsParams {
    pub from: Option<String>,
    pub to: Option<String>,
    pub utm_campaign: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportParams {
    pub date: Option<String>,
}

/// Blank query values count as absent.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn required_str<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    non_blank(value)
        .ok_or_else(|| AppError::BadRequest(format!("missing required parameter `{name}`")))
}

pub fn required_date(value: &Option<String>, name: &str) -> Result<NaiveDate, AppError> {
    let raw = required_str(value, name)?;
    parse_date(raw).map_err(|err| AppError::BadRequest(format!("`{name}`: {err}")))
}

pub fn optional_date(value: Option<&str>, name: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(|raw| {
            parse_date(raw).map_err(|err| AppError::BadRequest(format!("`{name}`: {err}")))
        })
        .transpose()
}

/// An inverted range is accepted and matches nothing.
pub fn date_range(from: &Option<String>, to: &Option<String>) -> Result<DateRange, AppError> {
    Ok(DateRange::new(
        required_date(from, "from")?,
        required_date(to, "to")?,
    ))
}

/// Resolve the page window: a missing or zero limit takes the default,
/// larger limits are capped.
pub fn page(limit: Option<usize>, offset: Option<usize>) -> Page {
    let limit = match limit {
        None | Some(0) => DEFAULT_LIMIT,
        Some(l) => l.min(MAX_LIMIT),
    };
    Page::new(limit, offset.unwrap_or(0))
}

// ---- Responses ----

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub version: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    #[serde(flatten)]
    pub health: HealthResponse,
    pub records: usize,
    pub last_ingestion: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub message: &'static str,
    pub since: Option<NaiveDate>,
    #[serde(flatten)]
    pub summary: IngestionSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsResponse {
    pub data: Vec<TransformedRecord>,
    pub count: usize,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub message: &'static str,
    #[serde(flatten)]
    pub summary: ExportSummary,
}
