//! UTM matcher
//!
//! Indexes CRM opportunities by normalized UTM triple and resolves an ad
//! record to the opportunities it is credited with.
//!
//! Resolution tries three tiers in order and the first non-empty tier wins:
//!
//! 1. Exact: (campaign, source, medium)
//! 2. Campaign-only: (campaign, "", "")
//! 3. Source-only: ("", source, "")
//!
//! There is no scoring. A campaign-only hit is taken even when the
//! opportunities' real source/medium differ from the ad's.

use std::collections::HashMap;

use types::ads::AdRecord;
use types::crm::Opportunity;
use types::utm::{UtmKey, UtmTagged};

/// Which resolution tier produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchTier {
    Exact,
    CampaignOnly,
    SourceOnly,
}

impl MatchTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchTier::Exact => "exact",
            MatchTier::CampaignOnly => "campaign_only",
            MatchTier::SourceOnly => "source_only",
        }
    }
}

/// Opportunities grouped by their normalized UTM key.
///
/// Borrows the CRM batch for the duration of one transform call.
#[derive(Debug, Default)]
pub struct OpportunityIndex<'a> {
    by_key: HashMap<UtmKey, Vec<&'a Opportunity>>,
}

impl<'a> OpportunityIndex<'a> {
    /// Group `opportunities` by normalized UTM triple.
    ///
    /// Several opportunities may share a key; batch order is kept within a key.
    pub fn build(opportunities: &'a [Opportunity]) -> Self {
        let mut by_key: HashMap<UtmKey, Vec<&'a Opportunity>> = HashMap::new();
        for opp in opportunities {
            by_key.entry(opp.utm_key()).or_default().push(opp);
        }
        Self { by_key }
    }

    /// Number of distinct keys.
    pub fn key_count(&self) -> usize {
        self.by_key.len()
    }

    fn lookup(&self, key: &UtmKey) -> Option<&[&'a Opportunity]> {
        self.by_key
            .get(key)
            .map(Vec::as_slice)
            .filter(|opps| !opps.is_empty())
    }

    /// Resolve an ad record, reporting the tier that matched.
    pub fn resolve_with_tier(&self, ad: &AdRecord) -> Option<(MatchTier, &[&'a Opportunity])> {
        let tiers = [
            (MatchTier::Exact, ad.utm_key()),
            (MatchTier::CampaignOnly, UtmKey::campaign_only(&ad.utm_campaign)),
            (MatchTier::SourceOnly, UtmKey::source_only(&ad.utm_source)),
        ];

        tiers
            .into_iter()
            .find_map(|(tier, key)| self.lookup(&key).map(|opps| (tier, opps)))
    }

    /// Resolve an ad record to its opportunities (empty when nothing matches).
    pub fn resolve(&self, ad: &AdRecord) -> &[&'a Opportunity] {
        self.resolve_with_tier(ad)
            .map(|(_, opps)| opps)
            .unwrap_or(&[])
    }
}
