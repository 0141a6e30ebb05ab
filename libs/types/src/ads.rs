//! Ad performance records
//!
//! One record per (date, channel, campaign) as reported by the ads source.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::CampaignId;
use crate::money::non_negative;
use crate::utm::UtmTagged;

/// Daily ad performance for one campaign on one channel.
///
/// `date` is kept as the raw upstream literal; it is parsed when the record
/// is filtered so that one malformed date only drops that record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdRecord {
    pub date: String,
    pub campaign_id: CampaignId,
    pub channel: String,
    #[serde(default)]
    pub clicks: u64,
    #[serde(default)]
    pub impressions: u64,
    #[serde(default, deserialize_with = "non_negative")]
    pub cost: Decimal,
    #[serde(default)]
    pub utm_campaign: String,
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_medium: String,
}

impl UtmTagged for AdRecord {
    fn utm_campaign(&self) -> &str {
        &self.utm_campaign
    }

    fn utm_source(&self) -> &str {
        &self.utm_source
    }

    fn utm_medium(&self) -> &str {
        &self.utm_medium
    }
}

/// `external.ads` section of the ads source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdsSection {
    #[serde(default)]
    pub performance: Vec<AdRecord>,
}
