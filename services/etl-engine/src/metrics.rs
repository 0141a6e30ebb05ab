//! Funnel metrics calculator
//!
//! Derives per-record metrics from an ad record and the opportunities the
//! matcher attributed to it. Uses `Decimal` for all money and ratio
//! arithmetic.
//!
//! Leads are not observed: they are estimated as
//! `floor(clicks * lead_conversion_rate)`. This is a known approximation.
//!
//! Every ratio is guarded: a zero denominator yields 0, never an error.
//! Counter and money sums saturate instead of overflowing.
//! Ratios are always recomputed from base counters (see `FunnelCounters`),
//! including when the consolidator re-aggregates records.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use types::ads::AdRecord;
use types::crm::Opportunity;
use types::record::Metrics;

use crate::config::DEFAULT_LEAD_CONVERSION_RATE;

/// `numerator / denominator`, or 0 when the denominator is 0.
pub fn guarded_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator.is_zero() {
        return Decimal::ZERO;
    }
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}

/// Base counters from which every ratio is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunnelCounters {
    pub clicks: u64,
    pub cost: Decimal,
    pub leads: u64,
    pub opportunities: u64,
    pub closed_won: u64,
    pub revenue: Decimal,
}

impl FunnelCounters {
    /// Derive the full metric set from these counters.
    pub fn derive(&self) -> Metrics {
        let clicks = Decimal::from(self.clicks);
        let leads = Decimal::from(self.leads);
        let opportunities = Decimal::from(self.opportunities);
        let closed_won = Decimal::from(self.closed_won);

        Metrics {
            leads: self.leads,
            opportunities: self.opportunities,
            closed_won: self.closed_won,
            revenue: self.revenue,
            cpc: guarded_div(self.cost, clicks),
            cpa: guarded_div(self.cost, leads),
            cvr_lead_to_opp: guarded_div(opportunities, leads),
            cvr_opp_to_won: guarded_div(closed_won, opportunities),
            roas: guarded_div(self.revenue, self.cost),
        }
    }
}

/// Computes per-record metrics with a fixed lead conversion rate.
#[derive(Debug, Clone, Copy)]
pub struct MetricsCalculator {
    lead_conversion_rate: Decimal,
}

impl Default for MetricsCalculator {
    fn default() -> Self {
        Self::new(DEFAULT_LEAD_CONVERSION_RATE)
    }
}

impl MetricsCalculator {
    pub fn new(lead_conversion_rate: Decimal) -> Self {
        Self { lead_conversion_rate }
    }

    pub fn lead_conversion_rate(&self) -> Decimal {
        self.lead_conversion_rate
    }

    /// Estimated leads for a click count.
    pub fn estimate_leads(&self, clicks: u64) -> u64 {
        Decimal::from(clicks)
            .saturating_mul(self.lead_conversion_rate)
            .floor()
            .to_u64()
            .unwrap_or(0)
    }

    /// Compute metrics for one ad record and its matched opportunities.
    pub fn compute(&self, ad: &AdRecord, opportunities: &[&Opportunity]) -> Metrics {
        let mut counters = FunnelCounters {
            clicks: ad.clicks,
            cost: ad.cost,
            leads: self.estimate_leads(ad.clicks),
            ..FunnelCounters::default()
        };

        for opp in opportunities {
            counters.opportunities = counters.opportunities.saturating_add(1);
            if opp.stage.is_closed_won() {
                counters.closed_won = counters.closed_won.saturating_add(1);
            }
            counters.revenue = counters.revenue.saturating_add(opp.won_amount());
        }

        counters.derive()
    }
}
