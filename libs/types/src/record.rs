//! Transformed and consolidated records
//!
//! A `TransformedRecord` is produced once per ad record and never edited.
//! Consolidation builds new `ConsolidatedRecord`s instead of mutating stored
//! ones.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ads::AdRecord;
use crate::ids::CampaignId;

/// Funnel and efficiency metrics derived for one record or bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub leads: u64,
    pub opportunities: u64,
    pub closed_won: u64,
    pub revenue: Decimal,
    pub cpc: Decimal,
    pub cpa: Decimal,
    pub cvr_lead_to_opp: Decimal,
    pub cvr_opp_to_won: Decimal,
    pub roas: Decimal,
}

/// One ad record joined with its matched opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformedRecord {
    pub date: String,
    pub channel: String,
    pub campaign_id: CampaignId,
    pub clicks: u64,
    pub impressions: u64,
    pub cost: Decimal,
    pub leads: u64,
    pub opportunities: u64,
    pub closed_won: u64,
    pub revenue: Decimal,
    pub cpc: Decimal,
    pub cpa: Decimal,
    pub cvr_lead_to_opp: Decimal,
    pub cvr_opp_to_won: Decimal,
    pub roas: Decimal,
}

impl TransformedRecord {
    /// Combine an ad record's identity and counters with derived metrics.
    pub fn from_parts(ad: &AdRecord, metrics: Metrics) -> Self {
        Self {
            date: ad.date.clone(),
            channel: ad.channel.clone(),
            campaign_id: ad.campaign_id.clone(),
            clicks: ad.clicks,
            impressions: ad.impressions,
            cost: ad.cost,
            leads: metrics.leads,
            opportunities: metrics.opportunities,
            closed_won: metrics.closed_won,
            revenue: metrics.revenue,
            cpc: metrics.cpc,
            cpa: metrics.cpa,
            cvr_lead_to_opp: metrics.cvr_lead_to_opp,
            cvr_opp_to_won: metrics.cvr_opp_to_won,
            roas: metrics.roas,
        }
    }

    /// Derived metrics carried by this record.
    pub fn metrics(&self) -> Metrics {
        Metrics {
            leads: self.leads,
            opportunities: self.opportunities,
            closed_won: self.closed_won,
            revenue: self.revenue,
            cpc: self.cpc,
            cpa: self.cpa,
            cvr_lead_to_opp: self.cvr_lead_to_opp,
            cvr_opp_to_won: self.cvr_opp_to_won,
            roas: self.roas,
        }
    }

    /// Replace the derived metrics, keeping identity and ad counters.
    pub fn with_metrics(mut self, metrics: Metrics) -> Self {
        self.leads = metrics.leads;
        self.opportunities = metrics.opportunities;
        self.closed_won = metrics.closed_won;
        self.revenue = metrics.revenue;
        self.cpc = metrics.cpc;
        self.cpa = metrics.cpa;
        self.cvr_lead_to_opp = metrics.cvr_lead_to_opp;
        self.cvr_opp_to_won = metrics.cvr_opp_to_won;
        self.roas = metrics.roas;
        self
    }
}

/// Per-(channel, campaign) aggregate for one export date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConsolidatedRecord {
    #[serde(flatten)]
    pub record: TransformedRecord,
    /// Number of stored records folded into this bucket.
    pub source_records: u64,
}

impl ConsolidatedRecord {
    /// Grouping key: (channel, campaign id).
    pub fn key(&self) -> (&str, &CampaignId) {
        (&self.record.channel, &self.record.campaign_id)
    }
}
