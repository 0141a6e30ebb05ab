//! Transform engine
//!
//! Turns one ads batch and one CRM batch into transformed records:
//! builds a single opportunity index, applies the optional date floor, then
//! matches and computes metrics per ad record, preserving input order.
//!
//! Per-record problems never fail the batch. A record whose date does not
//! parse is skipped and reported in `TransformOutcome::malformed_dates`.

use chrono::NaiveDate;
use tracing::{debug, warn};
use types::ads::AdRecord;
use types::crm::Opportunity;
use types::dates::parse_date;
use types::record::TransformedRecord;

use crate::matcher::OpportunityIndex;
use crate::metrics::MetricsCalculator;

/// Result of transforming one batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformOutcome {
    /// One record per accepted ad record, in input order.
    pub records: Vec<TransformedRecord>,
    /// Ad records dropped because they are dated before the floor.
    pub skipped_before_since: usize,
    /// Raw date literals of ad records dropped for an unparseable date.
    pub malformed_dates: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransformEngine {
    calculator: MetricsCalculator,
}

impl TransformEngine {
    pub fn new(calculator: MetricsCalculator) -> Self {
        Self { calculator }
    }

    pub fn calculator(&self) -> &MetricsCalculator {
        &self.calculator
    }

    /// Transform a batch.
    ///
    /// With `since` set, ad records dated strictly before it are skipped.
    pub fn transform(
        &self,
        ads: &[AdRecord],
        opportunities: &[Opportunity],
        since: Option<NaiveDate>,
    ) -> TransformOutcome {
        let index = OpportunityIndex::build(opportunities);
        let mut outcome = TransformOutcome {
            records: Vec::with_capacity(ads.len()),
            ..TransformOutcome::default()
        };

        for ad in ads {
            let date = match parse_date(&ad.date) {
                Ok(date) => date,
                Err(err) => {
                    warn!(
                        date = %ad.date,
                        campaign_id = %ad.campaign_id,
                        channel = %ad.channel,
                        error = %err,
                        "Invalid date in ads data, skipping record"
                    );
                    outcome.malformed_dates.push(ad.date.clone());
                    continue;
                }
            };

            if since.is_some_and(|floor| date < floor) {
                outcome.skipped_before_since += 1;
                continue;
            }

            let matched: &[&Opportunity] = match index.resolve_with_tier(ad) {
                Some((tier, opps)) => {
                    debug!(
                        campaign_id = %ad.campaign_id,
                        tier = tier.as_str(),
                        matched = opps.len(),
                        "Matched opportunities"
                    );
                    opps
                }
                None => &[],
            };

            let metrics = self.calculator.compute(ad, matched);
            outcome.records.push(TransformedRecord::from_parts(ad, metrics));
        }

        debug!(
            ads = ads.len(),
            opportunities = opportunities.len(),
            utm_keys = index.key_count(),
            emitted = outcome.records.len(),
            skipped_before_since = outcome.skipped_before_since,
            malformed = outcome.malformed_dates.len(),
            "Batch transformed"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::crm::Stage;
    use types::ids::{CampaignId, OpportunityId};

    fn ad(date: &str, campaign_id: &str, clicks: u64, cost: i64) -> AdRecord {
        AdRecord {
            date: date.to_string(),
            campaign_id: CampaignId::new(campaign_id),
            channel: "google_ads".to_string(),
            clicks,
            impressions: 50000,
            cost: Decimal::from(cost),
            utm_campaign: "back_to_school".to_string(),
            utm_source: "google".to_string(),
            utm_medium: "cpc".to_string(),
        }
    }

    fn opp(id: &str, stage: Stage, amount: i64) -> Opportunity {
        Opportunity {
            opportunity_id: OpportunityId::new(id),
            contact_email: String::new(),
            stage,
            amount: Decimal::from(amount),
            created_at: None,
            utm_campaign: "back_to_school".to_string(),
            utm_source: "google".to_string(),
            utm_medium: "cpc".to_string(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_basic_transformation() {
        let ads = vec![ad("2025-01-01", "C-1001", 1000, 250)];
        let opps = vec![
            opp("O-9001", Stage::ClosedWon, 5000),
            opp("O-9002", Stage::Proposal, 3000),
        ];

        let outcome = TransformEngine::default().transform(&ads, &opps, None);
        assert_eq!(outcome.records.len(), 1);

        let rec = &outcome.records[0];
        assert_eq!(rec.date, "2025-01-01");
        assert_eq!(rec.campaign_id.as_str(), "C-1001");
        assert_eq!(rec.leads, 100);
        assert_eq!(rec.opportunities, 2);
        assert_eq!(rec.closed_won, 1);
        assert_eq!(rec.revenue, Decimal::from(5000));
        assert_eq!(rec.roas, Decimal::from(20));
    }

    #[test]
    fn test_since_floor_is_inclusive() {
        let ads = vec![
            ad("2024-12-31", "C-1", 10, 1),
            ad("2025-01-01", "C-2", 10, 1),
            ad("2025-01-02", "C-3", 10, 1),
        ];

        let outcome = TransformEngine::default().transform(&ads, &[], Some(day("2025-01-01")));
        let kept: Vec<_> = outcome.records.iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(kept, vec!["C-2", "C-3"]);
        assert_eq!(outcome.skipped_before_since, 1);
    }

    #[test]
    fn test_malformed_date_skipped_not_fatal() {
        let ads = vec![
            ad("2025-01-01", "C-1", 10, 1),
            ad("01/02/2025", "C-2", 10, 1),
            ad("2025-01-03", "C-3", 10, 1),
        ];

        let outcome = TransformEngine::default().transform(&ads, &[], Some(day("2025-01-01")));
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.malformed_dates, vec!["01/02/2025".to_string()]);
    }

    #[test]
    fn test_malformed_date_skipped_without_floor() {
        let ads = vec![ad("not-a-date", "C-1", 10, 1)];
        let outcome = TransformEngine::default().transform(&ads, &[], None);
        assert!(outcome.records.is_empty());
        assert_eq!(outcome.malformed_dates.len(), 1);
    }

    #[test]
    fn test_preserves_input_order() {
        let ads = vec![
            ad("2025-01-03", "C-3", 10, 1),
            ad("2025-01-01", "C-1", 10, 1),
            ad("2025-01-02", "C-2", 10, 1),
        ];
        let outcome = TransformEngine::default().transform(&ads, &[], None);
        let order: Vec<_> = outcome.records.iter().map(|r| r.campaign_id.as_str()).collect();
        assert_eq!(order, vec!["C-3", "C-1", "C-2"]);
    }

    #[test]
    fn test_shared_opportunities_credit_every_matching_ad() {
        // Two ads with the same UTM triple are both credited with the same
        // opportunities; attribution is single-touch per ad, not split.
        let ads = vec![ad("2025-01-01", "C-1", 100, 10), ad("2025-01-02", "C-1", 100, 10)];
        let opps = vec![opp("O-1", Stage::ClosedWon, 100)];
        let outcome = TransformEngine::default().transform(&ads, &opps, None);
        assert!(outcome.records.iter().all(|r| r.closed_won == 1));
    }

    #[test]
    fn test_empty_batch() {
        let outcome = TransformEngine::default().transform(&[], &[], None);
        assert_eq!(outcome, TransformOutcome::default());
    }
}
