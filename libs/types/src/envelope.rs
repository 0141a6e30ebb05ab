//! Upstream document envelope
//!
//! Both sources wrap their data as `{ "external": { "ads": ... } }` or
//! `{ "external": { "crm": ... } }`. A document without its section decodes
//! to an empty batch; a document that is not a JSON object with `external`
//! is a whole-batch failure.

use serde::Deserialize;

use crate::ads::{AdRecord, AdsSection};
use crate::crm::{CrmSection, Opportunity};
use crate::errors::PayloadError;

#[derive(Debug, Deserialize)]
struct Envelope {
    external: External,
}

#[derive(Debug, Default, Deserialize)]
struct External {
    #[serde(default)]
    ads: Option<AdsSection>,
    #[serde(default)]
    crm: Option<CrmSection>,
}

fn decode_envelope(source_name: &'static str, body: &[u8]) -> Result<External, PayloadError> {
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|inner| PayloadError::Json { source_name, inner })?;

    if value.get("external").is_none() {
        return Err(PayloadError::Malformed {
            source_name,
            reason: "missing top-level \"external\" object".to_string(),
        });
    }

    let envelope: Envelope =
        serde_json::from_value(value).map_err(|inner| PayloadError::Json { source_name, inner })?;
    Ok(envelope.external)
}

/// Decode the ads source document into its performance records.
pub fn decode_ads(body: &[u8]) -> Result<Vec<AdRecord>, PayloadError> {
    let external = decode_envelope("ads", body)?;
    Ok(external.ads.unwrap_or_default().performance)
}

/// Decode the CRM source document into its opportunities.
pub fn decode_crm(body: &[u8]) -> Result<Vec<Opportunity>, PayloadError> {
    let external = decode_envelope("crm", body)?;
    Ok(external.crm.unwrap_or_default().opportunities)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ads_document() {
        let body = br#"{"external":{"ads":{"performance":[
            {"date":"2025-01-01","campaign_id":"C-1001","channel":"google_ads",
             "clicks":1000,"impressions":50000,"cost":250.0,
             "utm_campaign":"back_to_school","utm_source":"google","utm_medium":"cpc"}
        ]}}}"#;
        let ads = decode_ads(body).unwrap();
        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].channel, "google_ads");
    }

    #[test]
    fn test_decode_crm_document() {
        let body = br#"{"external":{"crm":{"opportunities":[
            {"opportunity_id":"O-9001","contact_email":"a@example.com","stage":"closed_won",
             "amount":5000,"created_at":"2025-01-02T10:00:00Z",
             "utm_campaign":"back_to_school","utm_source":"google","utm_medium":"cpc"}
        ]}}}"#;
        let opps = decode_crm(body).unwrap();
        assert_eq!(opps.len(), 1);
        assert!(opps[0].stage.is_closed_won());
    }

    #[test]
    fn test_missing_section_is_empty_batch() {
        assert!(decode_ads(br#"{"external":{}}"#).unwrap().is_empty());
        assert!(decode_crm(br#"{"external":{"ads":{"performance":[]}}}"#)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_missing_external_is_malformed() {
        let err = decode_ads(br#"{"ads":{"performance":[]}}"#).unwrap_err();
        assert!(matches!(err, PayloadError::Malformed { source_name: "ads", .. }));
    }

    #[test]
    fn test_negative_amount_fails_document() {
        let body = br#"{"external":{"crm":{"opportunities":[
            {"opportunity_id":"O-1","stage":"closed_won","amount":-5000}
        ]}}}"#;
        let err = decode_crm(body).unwrap_err();
        assert!(matches!(err, PayloadError::Json { source_name: "crm", .. }));
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        let err = decode_crm(b"not json").unwrap_err();
        assert!(matches!(err, PayloadError::Json { source_name: "crm", .. }));
    }
}
