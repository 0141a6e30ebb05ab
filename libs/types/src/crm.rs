//! CRM opportunity records
//!
//! Opportunities carry the UTM tags captured when the contact first arrived,
//! which is what lets them be attributed back to ad spend.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::OpportunityId;
use crate::money::non_negative;
use crate::utm::UtmTagged;

/// Opportunity pipeline stage
///
/// Only `ClosedWon` contributes revenue. Stages the CRM reports that are not
/// part of the known funnel are preserved as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Lead,
    Qualified,
    Proposal,
    ClosedWon,
    Other(String),
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Lead => "lead",
            Stage::Qualified => "qualified",
            Stage::Proposal => "proposal",
            Stage::ClosedWon => "closed_won",
            Stage::Other(s) => s,
        }
    }

    pub fn is_closed_won(&self) -> bool {
        matches!(self, Stage::ClosedWon)
    }
}

impl From<String> for Stage {
    fn from(s: String) -> Self {
        // Stage names are matched exactly; "Closed_Won" is not a win.
        match s.as_str() {
            "lead" => Stage::Lead,
            "qualified" => Stage::Qualified,
            "proposal" => Stage::Proposal,
            "closed_won" => Stage::ClosedWon,
            _ => Stage::Other(s),
        }
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A CRM opportunity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_id: OpportunityId,
    #[serde(default)]
    pub contact_email: String,
    pub stage: Stage,
    #[serde(default, deserialize_with = "non_negative")]
    pub amount: Decimal,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub utm_campaign: String,
    #[serde(default)]
    pub utm_source: String,
    #[serde(default)]
    pub utm_medium: String,
}

impl Opportunity {
    /// Amount that counts as revenue (zero unless closed-won).
    pub fn won_amount(&self) -> Decimal {
        if self.stage.is_closed_won() {
            self.amount
        } else {
            Decimal::ZERO
        }
    }
}

impl UtmTagged for Opportunity {
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

/// `external.crm` section of the CRM source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrmSection {
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}
