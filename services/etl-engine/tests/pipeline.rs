//! End-to-end pipeline tests
//!
//! Drives `EtlService` against mock ads, CRM and sink servers:
//! - Ingestion with and without a date floor
//! - Re-ingestion duplicates and marker reporting
//! - Upstream failures and payload errors
//! - Consolidated, signed export

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use etl_engine::config::{EngineConfig, FetchConfig};
use etl_engine::signing::{RecordSigner, SIGNATURE_HEADER};
use etl_engine::store::{InMemoryStore, Page, RecordStore};
use etl_engine::{EngineError, EtlService, FetchError};
use httpmock::prelude::*;
use rust_decimal::Decimal;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use types::dates::{parse_date, DateRange};
use types::errors::PayloadError;

fn day(s: &str) -> NaiveDate {
    parse_date(s).unwrap()
}

fn ads_document() -> serde_json::Value {
    json!({
        "external": {
            "ads": {
                "performance": [
                    {
                        "date": "2025-01-01",
                        "campaign_id": "C-1001",
                        "channel": "google_ads",
                        "clicks": 1000,
                        "impressions": 50000,
                        "cost": 250.0,
                        "utm_campaign": "back_to_school",
                        "utm_source": "google",
                        "utm_medium": "cpc"
                    },
                    {
                        "date": "2025-01-01",
                        "campaign_id": "C-1001",
                        "channel": "google_ads",
                        "clicks": 0,
                        "impressions": 1200,
                        "cost": 0.0,
                        "utm_campaign": "back_to_school",
                        "utm_source": "google",
                        "utm_medium": "cpc"
                    },
                    {
                        "date": "2025-01-02",
                        "campaign_id": "C-2002",
                        "channel": "facebook_ads",
                        "clicks": 400,
                        "impressions": 9000,
                        "cost": 80.0,
                        "utm_campaign": "Winter_Sale",
                        "utm_source": "facebook",
                        "utm_medium": "social"
                    },
                    {
                        "date": "2025/01/03",
                        "campaign_id": "C-3003",
                        "channel": "google_ads",
                        "clicks": 10,
                        "impressions": 100,
                        "cost": 1.0,
                        "utm_campaign": "x",
                        "utm_source": "google",
                        "utm_medium": "cpc"
                    }
                ]
            }
        }
    })
}

fn crm_document() -> serde_json::Value {
    json!({
        "external": {
            "crm": {
                "opportunities": [
                    {
                        "opportunity_id": "O-9001",
                        "contact_email": "a@example.com",
                        "stage": "closed_won",
                        "amount": 5000.0,
                        "created_at": "2025-01-02T10:00:00Z",
                        "utm_campaign": "BACK_TO_SCHOOL",
                        "utm_source": " google ",
                        "utm_medium": "CPC"
                    },
                    {
                        "opportunity_id": "O-9002",
                        "contact_email": "b@example.com",
                        "stage": "proposal",
                        "amount": 3000.0,
                        "created_at": "2025-01-02T11:00:00Z",
                        "utm_campaign": "back_to_school",
                        "utm_source": "google",
                        "utm_medium": "cpc"
                    },
                    {
                        "opportunity_id": "O-9003",
                        "contact_email": "c@example.com",
                        "stage": "negotiation",
                        "amount": 900.0,
                        "utm_campaign": "winter_sale",
                        "utm_source": "",
                        "utm_medium": ""
                    }
                ]
            }
        }
    })
}

struct Upstreams {
    server: MockServer,
}

impl Upstreams {
    async fn start() -> Self {
        Self {
            server: MockServer::start_async().await,
        }
    }

    async fn serve(&self, path: &'static str, body: serde_json::Value) {
        self.server
            .mock_async(move |when, then| {
                when.method(GET).path(path);
                then.status(200).json_body(body);
            })
            .await;
    }

    fn config(&self) -> EngineConfig {
        EngineConfig {
            ads_api_url: Some(self.server.url("/ads")),
            crm_api_url: Some(self.server.url("/crm")),
            sink_url: Some(self.server.url("/sink")),
            sink_secret: Some("sink-secret".to_string()),
            fetch: FetchConfig {
                timeout: Duration::from_secs(5),
                max_retries: 1,
                retry_delay: Duration::from_millis(1),
            },
            ..EngineConfig::default()
        }
    }

    fn service(&self) -> EtlService {
        EtlService::new(self.config(), Arc::new(InMemoryStore::new())).unwrap()
    }
}

fn january() -> DateRange {
    DateRange::new(day("2025-01-01"), day("2025-01-31"))
}

#[tokio::test]
async fn test_full_ingestion() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();

    let summary = service
        .run_ingestion(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.records, 3);
    assert_eq!(summary.malformed_dates, vec!["2025/01/03".to_string()]);
    assert!(summary.reingested_dates.is_empty());

    let page = service.query_channel(january(), "google_ads", Page::all());
    assert_eq!(page.total, 2);

    let first = &page.records[0];
    assert_eq!(first.leads, 100);
    assert_eq!(first.opportunities, 2);
    assert_eq!(first.closed_won, 1);
    assert_eq!(first.revenue, Decimal::from(5000));
    assert_eq!(first.cpc, Decimal::from_str_exact("0.25").unwrap());
    assert_eq!(first.roas, Decimal::from(20));

    // Zero clicks and zero cost never divide.
    let idle = &page.records[1];
    assert_eq!(idle.leads, 0);
    assert_eq!(idle.cpc, Decimal::ZERO);
    assert_eq!(idle.roas, Decimal::ZERO);

    // Campaign-only fallback, unknown stage contributes no revenue.
    let facebook = service.query_channel(january(), "facebook_ads", Page::all());
    assert_eq!(facebook.records[0].opportunities, 1);
    assert_eq!(facebook.records[0].closed_won, 0);
    assert_eq!(facebook.records[0].revenue, Decimal::ZERO);

    assert!(service.was_ingested(day("2025-01-01")));
    assert!(service.was_ingested(day("2025-01-02")));
    assert!(!service.was_ingested(day("2025-01-03")));
    assert!(service.last_ingestion_time().is_some());
}

#[tokio::test]
async fn test_since_floor_limits_ingestion() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();

    let summary = service
        .run_ingestion(Some(day("2025-01-02")), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.records, 1);
    assert_eq!(summary.skipped_before_since, 2);
    assert!(!service.was_ingested(day("2025-01-01")));
    assert!(service.was_ingested(day("2025-01-02")));
}

#[tokio::test]
async fn test_reingestion_duplicates_records() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();
    let cancel = CancellationToken::new();

    service.run_ingestion(None, &cancel).await.unwrap();
    let second = service.run_ingestion(None, &cancel).await.unwrap();

    assert_eq!(second.reingested_dates, vec![day("2025-01-01"), day("2025-01-02")]);
    assert_eq!(service.store().len(), 6);
}

#[tokio::test]
async fn test_concurrent_ingestions_both_append() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();
    let cancel = CancellationToken::new();

    let (first, second) = tokio::join!(
        service.run_ingestion(None, &cancel),
        service.run_ingestion(None, &cancel)
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.records, 3);
    assert_eq!(second.records, 3);
    assert_eq!(service.store().len(), 6);
    // Appends are serialized: exactly one run lands on already-ingested dates.
    assert_ne!(
        first.reingested_dates.is_empty(),
        second.reingested_dates.is_empty()
    );
}

#[tokio::test]
async fn test_missing_sections_ingest_nothing() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", json!({"external": {}})).await;
    upstreams.serve("/crm", json!({"external": {}})).await;
    let service = upstreams.service();

    let summary = service
        .run_ingestion(None, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.records, 0);
    assert!(service.store().is_empty());
    assert!(service.last_ingestion_time().is_some());
}

#[tokio::test]
async fn test_malformed_document_fails_whole_batch() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", json!({"data": []})).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();

    let err = service
        .run_ingestion(None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Payload(PayloadError::Malformed { source_name: "ads", .. })
    ));
    assert!(service.store().is_empty());
    assert!(service.last_ingestion_time().is_none());
}

#[tokio::test]
async fn test_upstream_outage_exhausts_retries() {
    let upstreams = Upstreams::start().await;
    let ads = upstreams
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/ads");
            then.status(502);
        })
        .await;
    let service = upstreams.service();

    let err = service
        .run_ingestion(None, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Fetch(FetchError::Exhausted { attempts: 2, .. })
    ));
    ads.assert_hits_async(2).await;
}

#[tokio::test]
async fn test_cancelled_ingestion_stores_nothing() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = service.run_ingestion(None, &cancel).await.unwrap_err();
    assert!(matches!(err, EngineError::Fetch(ref e) if e.is_cancelled()));
    assert!(service.store().is_empty());
}

#[tokio::test]
async fn test_export_consolidates_and_signs() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    let service = upstreams.service();
    let cancel = CancellationToken::new();
    service.run_ingestion(None, &cancel).await.unwrap();

    // Two google_ads rows for C-1001 on 2025-01-01 fold into one bucket.
    let stored = service
        .store()
        .query(DateRange::single(day("2025-01-01")), &Default::default(), Page::all());
    let bucket = etl_engine::consolidate::consolidate(&stored.records);
    assert_eq!(bucket.len(), 1);
    assert_eq!(bucket[0].record.impressions, 51200);
    assert_eq!(bucket[0].source_records, 2);

    let signature = RecordSigner::new("sink-secret")
        .unwrap()
        .header_value(&bucket[0].record)
        .unwrap();
    let sink = upstreams
        .server
        .mock_async(move |when, then| {
            when.method(POST)
                .path("/sink")
                .header(SIGNATURE_HEADER, signature.as_str())
                .json_body_partial(r#"{"campaign_id":"C-1001","clicks":1000,"source_records":2}"#);
            then.status(200);
        })
        .await;

    let summary = service
        .run_export(day("2025-01-01"), &cancel)
        .await
        .unwrap();
    assert_eq!(summary.exported, 1);
    assert_eq!(summary.source_records, 2);
    sink.assert_hits_async(1).await;
}

#[tokio::test]
async fn test_export_of_empty_date_delivers_nothing() {
    let upstreams = Upstreams::start().await;
    let sink = upstreams
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/sink");
            then.status(200);
        })
        .await;
    let service = upstreams.service();

    let summary = service
        .run_export(day("2025-06-01"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(summary.exported, 0);
    sink.assert_hits_async(0).await;
}

#[tokio::test]
async fn test_sink_rejection_surfaces_delivery_error() {
    let upstreams = Upstreams::start().await;
    upstreams.serve("/ads", ads_document()).await;
    upstreams.serve("/crm", crm_document()).await;
    upstreams
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/sink");
            then.status(401).body("bad signature");
        })
        .await;
    let service = upstreams.service();
    let cancel = CancellationToken::new();
    service.run_ingestion(None, &cancel).await.unwrap();

    let err = service.run_export(day("2025-01-01"), &cancel).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Export(etl_engine::ExportError::Delivery { delivered: 0, .. })
    ));
}
