use std::time::Duration;

use clap::Parser;
use etl_engine::config::{EngineConfig, FetchConfig};
use rust_decimal::Decimal;

/// Campaign performance ETL gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "gateway", version, about)]
pub struct Cli {
    /// Ads source endpoint
    #[arg(long, env = "ADS_API_URL")]
    pub ads_api_url: Option<String>,

    /// CRM source endpoint
    #[arg(long, env = "CRM_API_URL")]
    pub crm_api_url: Option<String>,

    /// Export sink endpoint
    #[arg(long, env = "SINK_URL")]
    pub sink_url: Option<String>,

    /// Shared secret for export signatures
    #[arg(long, env = "SINK_SECRET", hide_env_values = true)]
    pub sink_secret: Option<String>,

    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Log filter, e.g. `info` or `gateway=debug,etl_engine=debug`
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "HTTP_TIMEOUT_SECS", default_value_t = 30)]
    pub http_timeout_secs: u64,

    #[arg(long, env = "MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,

    #[arg(long, env = "RETRY_DELAY_MS", default_value_t = 1000)]
    pub retry_delay_ms: u64,

    /// Share of clicks counted as leads
    #[arg(long, env = "LEAD_CONVERSION_RATE", default_value = "0.10")]
    pub lead_conversion_rate: Decimal,
}

impl Cli {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ads_api_url: self.ads_api_url.clone(),
            crm_api_url: self.crm_api_url.clone(),
            sink_url: self.sink_url.clone(),
            sink_secret: self.sink_secret.clone(),
            fetch: FetchConfig {
                timeout: Duration::from_secs(self.http_timeout_secs),
                max_retries: self.max_retries,
                retry_delay: Duration::from_millis(self.retry_delay_ms),
            },
            lead_conversion_rate: self.lead_conversion_rate,
        }
    }
}
