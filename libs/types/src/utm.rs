//! UTM parameter normalization
//!
//! Ads and CRM systems disagree on casing and padding of UTM tags, so every
//! comparison happens on the normalized form: surrounding whitespace trimmed,
//! then lowercased. `UtmKey` can only be built through normalizing
//! constructors, which makes derived `Eq`/`Hash` operate on normalized text.

use serde::Serialize;
use std::fmt;

/// Normalize a single UTM value (trim + lowercase).
pub fn normalize_utm(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Normalized (campaign, source, medium) triple.
///
/// Partial keys (empty source and/or medium) are lookup shapes used by the
/// matcher's fallback tiers. A full key built from an ad record is never
/// stored as a partial key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UtmKey {
    campaign: String,
    source: String,
    medium: String,
}

impl UtmKey {
    /// Build a key from raw (un-normalized) UTM values.
    pub fn new(campaign: &str, source: &str, medium: &str) -> Self {
        Self {
            campaign: normalize_utm(campaign),
            source: normalize_utm(source),
            medium: normalize_utm(medium),
        }
    }

    /// Campaign-only lookup shape: (campaign, "", "").
    pub fn campaign_only(campaign: &str) -> Self {
        Self::new(campaign, "", "")
    }

    /// Source-only lookup shape: ("", source, "").
    pub fn source_only(source: &str) -> Self {
        Self::new("", source, "")
    }

    pub fn campaign(&self) -> &str {
        &self.campaign
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn medium(&self) -> &str {
        &self.medium
    }
}

impl fmt::Display for UtmKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.campaign, self.source, self.medium)
    }
}

/// Records that carry the three UTM tags.
pub trait UtmTagged {
    fn utm_campaign(&self) -> &str;
    fn utm_source(&self) -> &str;
    fn utm_medium(&self) -> &str;

    /// Full normalized key for this record.
    fn utm_key(&self) -> UtmKey {
        UtmKey::new(self.utm_campaign(), self.utm_source(), self.utm_medium())
    }
}
