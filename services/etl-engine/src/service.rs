//! Pipeline service
//!
//! `EtlService` owns the configuration, the fetch client, the transform
//! engine and a shared record store. It is cheap to clone and safe to share
//! between request handlers; every network-bound call takes the caller's
//! cancellation token.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn, Span};
use types::dates::{format_date, DateRange};
use types::envelope::{decode_ads, decode_crm};
use types::ids::RunId;

use crate::config::EngineConfig;
use crate::consolidate::consolidate;
use crate::error::EngineError;
use crate::export::Exporter;
use crate::fetch::FetchClient;
use crate::metrics::MetricsCalculator;
use crate::store::{QueryPage, RecordFilter, RecordStore, Page};
use crate::transform::TransformEngine;

/// What one ingestion run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestionSummary {
    pub run_id: RunId,
    /// Records appended to the store.
    pub records: usize,
    pub skipped_before_since: usize,
    /// Raw date literals of ad records skipped as unparseable.
    pub malformed_dates: Vec<String>,
    /// Dates that already had records before this run appended more.
    pub reingested_dates: Vec<NaiveDate>,
}

/// What one export run did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExportSummary {
    pub run_id: RunId,
    pub date: NaiveDate,
    /// Consolidated records delivered to the sink.
    pub exported: usize,
    /// Stored records that fed the consolidation.
    pub source_records: usize,
}

#[derive(Clone)]
pub struct EtlService {
    config: Arc<EngineConfig>,
    store: Arc<dyn RecordStore>,
    client: FetchClient,
    engine: TransformEngine,
}

impl EtlService {
    /// Build a service over `store`.
    ///
    /// Source and sink URLs are checked per run, so a service with neither
    /// configured still starts and answers queries.
    pub fn new(config: EngineConfig, store: Arc<dyn RecordStore>) -> Result<Self, EngineError> {
        config.validate()?;
        let client = FetchClient::new(&config.fetch)?;
        let engine = TransformEngine::new(MetricsCalculator::new(config.lead_conversion_rate));
        Ok(Self {
            config: Arc::new(config),
            store,
            client,
            engine,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Fetch both sources, transform and append the result.
    ///
    /// Re-ingesting a date appends duplicates; the summary lists such dates
    /// in `reingested_dates`.
    #[instrument(skip(self, cancel), fields(run_id = tracing::field::Empty))]
    pub async fn run_ingestion(
        &self,
        since: Option<NaiveDate>,
        cancel: &CancellationToken,
    ) -> Result<IngestionSummary, EngineError> {
        let run_id = RunId::new();
        Span::current().record("run_id", tracing::field::display(&run_id));

        let sources = self.config.sources()?;
        info!(since = since.map(format_date), "Starting data ingestion");

        let ads_body = self.client.get(sources.ads, cancel).await?;
        let ads = decode_ads(&ads_body)?;

        let crm_body = self.client.get(sources.crm, cancel).await?;
        let opportunities = decode_crm(&crm_body)?;

        let outcome = self.engine.transform(&ads, &opportunities, since);
        let records = outcome.records.len();
        let receipt = self.store.append(outcome.records);

        if !receipt.reingested.is_empty() {
            warn!(
                dates = ?receipt.reingested,
                "Dates re-ingested; stored records for them are now duplicated"
            );
        }

        info!(
            ads = ads.len(),
            opportunities = opportunities.len(),
            records_processed = records,
            skipped_before_since = outcome.skipped_before_since,
            malformed = outcome.malformed_dates.len(),
            "Data ingestion completed"
        );

        Ok(IngestionSummary {
            run_id,
            records,
            skipped_before_since: outcome.skipped_before_since,
            malformed_dates: outcome.malformed_dates,
            reingested_dates: receipt.reingested,
        })
    }

    /// Records in `range` for one channel.
    pub fn query_channel(&self, range: DateRange, channel: &str, page: Page) -> QueryPage {
        self.store.query(range, &RecordFilter::all().channel(channel), page)
    }

    /// Records in `range` for funnel views.
    ///
    /// Transformed records do not carry UTM fields, so `_utm_campaign` is
    /// accepted but not applied: every record in the range is returned.
    pub fn query_funnel(&self, range: DateRange, _utm_campaign: &str, page: Page) -> QueryPage {
        self.store.query(range, &RecordFilter::all(), page)
    }

    /// Consolidate the records stored for `date` and deliver them to the sink.
    #[instrument(skip(self, cancel), fields(run_id = tracing::field::Empty))]
    pub async fn run_export(
        &self,
        date: NaiveDate,
        cancel: &CancellationToken,
    ) -> Result<ExportSummary, EngineError> {
        let run_id = RunId::new();
        Span::current().record("run_id", tracing::field::display(&run_id));

        let sink = self.config.sink()?;
        let exporter = Exporter::new(self.client.clone(), sink)?;

        let stored = self
            .store
            .query(DateRange::single(date), &RecordFilter::all(), Page::all());
        let consolidated = consolidate(&stored.records);
        info!(
            source_records = stored.total,
            consolidated = consolidated.len(),
            "Starting data export"
        );

        let exported = exporter.export_all(&consolidated, cancel).await?;
        info!(records_exported = exported, "Data export completed");

        Ok(ExportSummary {
            run_id,
            date,
            exported,
            source_records: stored.total,
        })
    }

    pub fn was_ingested(&self, date: NaiveDate) -> bool {
        self.store.was_ingested(date)
    }

    pub fn last_ingestion_time(&self) -> Option<DateTime<Utc>> {
        self.store.last_ingestion_time()
    }
}
