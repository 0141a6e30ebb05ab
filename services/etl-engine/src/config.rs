//! Engine configuration
//!
//! Built by the gateway from CLI flags / environment variables; `Default`
//! gives the production defaults with no upstream URLs configured.

use std::time::Duration;

use rust_decimal::Decimal;

use crate::error::ConfigError;

/// Default share of clicks assumed to become leads.
pub const DEFAULT_LEAD_CONVERSION_RATE: Decimal = Decimal::from_parts(10, 0, 0, false, 2);
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Retry and timeout settings for outbound HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    /// Per-attempt request timeout.
    pub timeout: Duration,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Base backoff; the wait before retry `n` is `retry_delay * n`.
    pub retry_delay: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_HTTP_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub ads_api_url: Option<String>,
    pub crm_api_url: Option<String>,
    pub sink_url: Option<String>,
    pub sink_secret: Option<String>,
    pub fetch: FetchConfig,
    pub lead_conversion_rate: Decimal,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ads_api_url: None,
            crm_api_url: None,
            sink_url: None,
            sink_secret: None,
            fetch: FetchConfig::default(),
            lead_conversion_rate: DEFAULT_LEAD_CONVERSION_RATE,
        }
    }
}

/// Source URLs required by an ingestion run.
#[derive(Debug, Clone, Copy)]
pub struct SourceUrls<'a> {
    pub ads: &'a str,
    pub crm: &'a str,
}

/// Sink settings required by an export run.
#[derive(Debug, Clone, Copy)]
pub struct SinkSettings<'a> {
    pub url: &'a str,
    pub secret: &'a str,
}

fn required<'a>(value: &'a Option<String>, name: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::Missing { name }),
    }
}

impl EngineConfig {
    pub fn sources(&self) -> Result<SourceUrls<'_>, ConfigError> {
        Ok(SourceUrls {
            ads: required(&self.ads_api_url, "ADS_API_URL")?,
            crm: required(&self.crm_api_url, "CRM_API_URL")?,
        })
    }

    pub fn sink(&self) -> Result<SinkSettings<'_>, ConfigError> {
        Ok(SinkSettings {
            url: required(&self.sink_url, "SINK_URL")?,
            secret: required(&self.sink_secret, "SINK_SECRET")?,
        })
    }

    /// Check values that would make every run fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lead_conversion_rate < Decimal::ZERO || self.lead_conversion_rate > Decimal::ONE {
            return Err(ConfigError::Invalid {
                name: "LEAD_CONVERSION_RATE",
                reason: format!("{} is outside [0, 1]", self.lead_conversion_rate),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.lead_conversion_rate, Decimal::from_str_exact("0.10").unwrap());
        assert_eq!(cfg.fetch.max_retries, 3);
        assert_eq!(cfg.fetch.timeout, Duration::from_secs(30));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_sources() {
        let cfg = EngineConfig {
            ads_api_url: Some("http://ads".to_string()),
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.sources().unwrap_err(),
            ConfigError::Missing { name: "CRM_API_URL" }
        );
    }

    #[test]
    fn test_blank_value_counts_as_missing() {
        let cfg = EngineConfig {
            sink_url: Some("http://sink".to_string()),
            sink_secret: Some("   ".to_string()),
            ..EngineConfig::default()
        };
        assert_eq!(
            cfg.sink().unwrap_err(),
            ConfigError::Missing { name: "SINK_SECRET" }
        );
    }

    #[test]
    fn test_rate_out_of_range() {
        let cfg = EngineConfig {
            lead_conversion_rate: Decimal::from(2),
            ..EngineConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { .. })));
    }
}
