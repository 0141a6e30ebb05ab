//! Consolidation of stored records for export
//!
//! Groups records by (channel, campaign id), sums the base counters, and
//! derives every ratio again from the sums. Ratios are never averaged:
//! averaging per-record CPCs would weight a 10-click record the same as a
//! 10 000-click one.
//!
//! Sums saturate at the type's maximum.
//!
//! Output is sorted by (channel, campaign id) so exports are deterministic.

use std::collections::BTreeMap;

use types::ids::CampaignId;
use types::record::{ConsolidatedRecord, TransformedRecord};

use crate::metrics::FunnelCounters;

fn counters_of(record: &TransformedRecord) -> FunnelCounters {
    FunnelCounters {
        clicks: record.clicks,
        cost: record.cost,
        leads: record.leads,
        opportunities: record.opportunities,
        closed_won: record.closed_won,
        revenue: record.revenue,
    }
}

/// Start a bucket from a single record.
///
/// The bucket takes the record's identity (date, channel, campaign id).
pub fn seed(record: &TransformedRecord) -> ConsolidatedRecord {
    let metrics = counters_of(record).derive();
    ConsolidatedRecord {
        record: record.clone().with_metrics(metrics),
        source_records: 1,
    }
}

/// Fold one more record into an existing bucket.
///
/// The caller is responsible for only merging records of the same
/// (channel, campaign id).
pub fn merge(bucket: &ConsolidatedRecord, record: &TransformedRecord) -> ConsolidatedRecord {
    let current = &bucket.record;
    let counters = FunnelCounters {
        clicks: current.clicks.saturating_add(record.clicks),
        cost: current.cost.saturating_add(record.cost),
        leads: current.leads.saturating_add(record.leads),
        opportunities: current.opportunities.saturating_add(record.opportunities),
        closed_won: current.closed_won.saturating_add(record.closed_won),
        revenue: current.revenue.saturating_add(record.revenue),
    };

    let mut merged = current.clone();
    merged.clicks = counters.clicks;
    merged.impressions = current.impressions.saturating_add(record.impressions);
    merged.cost = counters.cost;

    ConsolidatedRecord {
        record: merged.with_metrics(counters.derive()),
        source_records: bucket.source_records.saturating_add(1),
    }
}

/// Consolidate `records` into one bucket per (channel, campaign id).
pub fn consolidate(records: &[TransformedRecord]) -> Vec<ConsolidatedRecord> {
    let mut buckets: BTreeMap<(String, CampaignId), ConsolidatedRecord> = BTreeMap::new();

    for record in records {
        let key = (record.channel.clone(), record.campaign_id.clone());
        let next = match buckets.get(&key) {
            Some(bucket) => merge(bucket, record),
            None => seed(record),
        };
        buckets.insert(key, next);
    }

    buckets.into_values().collect()
}
