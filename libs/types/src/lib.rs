//! Types library for the campaign performance ETL
//!
//! This library provides the record definitions shared by the engine and the
//! gateway: raw ad-spend and CRM records as they arrive from upstream, the
//! normalized UTM key used to join them, and the transformed records served
//! to API readers and exported to the sink.
//!
//! # Modules
//! - `ids`: Identifiers (RunId, CampaignId, OpportunityId)
//! - `dates`: `YYYY-MM-DD` parsing and inclusive date ranges
//! - `utm`: UTM normalization and the composite lookup key
//! - `ads`: Ad performance records
//! - `crm`: Opportunity records and stages
//! - `money`: Non-negative cost and amount decoding
//! - `envelope`: Decoding of the upstream `external` documents
//! - `record`: Derived metrics, transformed and consolidated records
//! - `errors`: Error taxonomy

// Public modules
pub mod ids;
pub mod dates;
pub mod utm;
pub mod ads;
pub mod crm;
pub mod money;
pub mod envelope;
pub mod record;
pub mod errors;

// Library version constant
pub const LIB_VERSION: &str = "1.0.0";

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::ads::*;
    pub use crate::crm::*;
    pub use crate::dates::*;
    pub use crate::envelope::*;
    pub use crate::errors::*;
    pub use crate::ids::*;
    pub use crate::record::*;
    pub use crate::utm::*;
}
