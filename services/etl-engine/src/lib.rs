//! Campaign Performance ETL Engine
//!
//! Pulls ad-spend records and CRM opportunities from two upstream sources,
//! reconciles them through UTM matching, derives funnel metrics, keeps the
//! results in a concurrent queryable store, and exports signed per-campaign
//! aggregates to a downstream sink.
//!
//! # Architecture
//!
//! ```text
//!   Ads source        CRM source
//!       │                 │
//!   ┌───▼─────────────────▼───┐
//!   │      FetchClient        │  ← timeout, retry/backoff, 4xx short-circuit
//!   └───────────┬─────────────┘
//!               │
//!   ┌───────────▼─────────────┐
//!   │    TransformEngine      │  ← date floor, per-record skip on bad dates
//!   │  ┌────────┐ ┌────────┐  │
//!   │  │Matcher │ │Metrics │  │
//!   │  └────────┘ └────────┘  │
//!   └───────────┬─────────────┘
//!               │
//!   ┌───────────▼─────────────┐
//!   │     InMemoryStore       │  ← RwLock, ingestion markers
//!   └─────┬─────────────┬─────┘
//!         │             │
//!    API queries   ┌────▼────────┐
//!                  │Consolidator │
//!                  └────┬────────┘
//!                  ┌────▼────────┐
//!                  │  Exporter   │  ← HMAC-SHA256 signed POSTs
//!                  └─────────────┘
//! ```

pub mod config;
pub mod consolidate;
pub mod error;
pub mod export;
pub mod fetch;
pub mod matcher;
pub mod metrics;
pub mod service;
pub mod signing;
pub mod store;
pub mod transform;

pub use config::EngineConfig;
pub use error::{ConfigError, EngineError, ExportError, FetchError};
pub use service::EtlService;

// Library version
pub const SERVICE_VERSION: &str = "1.0.0";
