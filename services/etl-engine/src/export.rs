//! Signed delivery of consolidated records to the downstream sink
//!
//! Each record is POSTed as JSON with an `X-Signature: sha256=<hex>` header.
//! Deliveries run sequentially in consolidation order; the first failure
//! aborts the rest. Delivery is at-least-once: a rerun resends records the
//! sink may already have accepted.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use types::record::ConsolidatedRecord;

use crate::config::SinkSettings;
use crate::error::{ExportError, FetchError};
use crate::fetch::FetchClient;
use crate::signing::{RecordSigner, SigningError, SIGNATURE_HEADER};

enum SendError {
    Signing(SigningError),
    Fetch(FetchError),
}

impl SendError {
    fn into_export(self, record: &ConsolidatedRecord, delivered: usize) -> ExportError {
        match self {
            SendError::Signing(err) => ExportError::Signing(err.to_string()),
            SendError::Fetch(source) => ExportError::Delivery {
                channel: record.record.channel.clone(),
                campaign_id: record.record.campaign_id.to_string(),
                delivered,
                source,
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct Exporter {
    client: FetchClient,
    sink_url: String,
    signer: RecordSigner,
}

impl Exporter {
    pub fn new(client: FetchClient, sink: SinkSettings<'_>) -> Result<Self, ExportError> {
        let signer =
            RecordSigner::new(sink.secret).map_err(|err| ExportError::Signing(err.to_string()))?;
        Ok(Self {
            client,
            sink_url: sink.url.to_string(),
            signer,
        })
    }

    pub fn signer(&self) -> &RecordSigner {
        &self.signer
    }

    async fn send(
        &self,
        record: &ConsolidatedRecord,
        cancel: &CancellationToken,
    ) -> Result<(), SendError> {
        let signature = self
            .signer
            .header_value(&record.record)
            .map_err(SendError::Signing)?;

        self.client
            .post_json(
                &self.sink_url,
                record,
                &[(SIGNATURE_HEADER, signature.as_str())],
                cancel,
            )
            .await
            .map_err(SendError::Fetch)?;

        debug!(
            channel = %record.record.channel,
            campaign_id = %record.record.campaign_id,
            "Record exported"
        );
        Ok(())
    }

    /// Sign and deliver a single record.
    pub async fn export_one(
        &self,
        record: &ConsolidatedRecord,
        cancel: &CancellationToken,
    ) -> Result<(), ExportError> {
        self.send(record, cancel)
            .await
            .map_err(|err| err.into_export(record, 0))
    }

    /// Deliver `records` in order, stopping at the first failure.
    ///
    /// Returns the number delivered.
    pub async fn export_all(
        &self,
        records: &[ConsolidatedRecord],
        cancel: &CancellationToken,
    ) -> Result<usize, ExportError> {
        for (delivered, record) in records.iter().enumerate() {
            self.send(record, cancel)
                .await
                .map_err(|err| err.into_export(record, delivered))?;
        }

        info!(records = records.len(), sink = %self.sink_url, "Export delivered");
        Ok(records.len())
    }
}
