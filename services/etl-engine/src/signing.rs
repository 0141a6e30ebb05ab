//! Export signing
//!
//! Every consolidated record sent to the sink carries an HMAC-SHA256
//! signature over a canonical, field-ordered text encoding of the record.
//! The canonical form below is a frozen wire contract: the sink recomputes
//! it independently, so field order, separators and decimal places must not
//! change.
//!
//! ```text
//! date|channel|campaign_id|clicks|impressions|cost|leads|opportunities|
//! closed_won|revenue|cpc|cpa|cvr_lead_to_opp|cvr_opp_to_won|roas
//! ```
//!
//! Money (`cost`, `revenue`) is written with 2 decimal places, ratios with 3,
//! both rounded half away from zero. Counters are plain integers.

use hmac::{Hmac, Mac};
use rust_decimal::{Decimal, RoundingStrategy};
use sha2::Sha256;
use types::record::TransformedRecord;

type HmacSha256 = Hmac<Sha256>;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Header carrying the signature on sink deliveries.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Prefix of the header value, naming the MAC algorithm.
pub const SIGNATURE_SCHEME: &str = "sha256=";

const FIELD_SEPARATOR: char = '|';
const MONEY_DP: u32 = 2;
const RATIO_DP: u32 = 3;

// ---------------------------------------------------------------------------
// Canonical encoding
// ---------------------------------------------------------------------------

fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Canonical byte encoding of a record for signing.
pub fn canonical_bytes(record: &TransformedRecord) -> Vec<u8> {
    let fields = [
        record.date.clone(),
        record.channel.clone(),
        record.campaign_id.to_string(),
        record.clicks.to_string(),
        record.impressions.to_string(),
        fixed(record.cost, MONEY_DP),
        record.leads.to_string(),
        record.opportunities.to_string(),
        record.closed_won.to_string(),
        fixed(record.revenue, MONEY_DP),
        fixed(record.cpc, RATIO_DP),
        fixed(record.cpa, RATIO_DP),
        fixed(record.cvr_lead_to_opp, RATIO_DP),
        fixed(record.cvr_opp_to_won, RATIO_DP),
        fixed(record.roas, RATIO_DP),
    ];
    fields.join(&FIELD_SEPARATOR.to_string()).into_bytes()
}

// ---------------------------------------------------------------------------
// Signing / Verification
// ---------------------------------------------------------------------------

/// Signs records with the shared sink secret.
#[derive(Clone)]
pub struct RecordSigner {
    secret: Vec<u8>,
}

impl std::fmt::Debug for RecordSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordSigner").field("secret", &"<redacted>").finish()
    }
}

impl RecordSigner {
    /// Create a signer; an empty secret is rejected.
    pub fn new(secret: impl AsRef<[u8]>) -> Result<Self, SigningError> {
        let secret = secret.as_ref();
        if secret.is_empty() {
            return Err(SigningError::EmptySecret);
        }
        Ok(Self {
            secret: secret.to_vec(),
        })
    }

    fn mac(&self, record: &TransformedRecord) -> Result<HmacSha256, SigningError> {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .map_err(|err| SigningError::InvalidKey(err.to_string()))?;
        mac.update(&canonical_bytes(record));
        Ok(mac)
    }

    /// Lowercase hex HMAC-SHA256 of the record's canonical bytes.
    pub fn sign(&self, record: &TransformedRecord) -> Result<String, SigningError> {
        Ok(hex::encode(self.mac(record)?.finalize().into_bytes()))
    }

    /// Header value for a delivery: `sha256=<hex>`.
    pub fn header_value(&self, record: &TransformedRecord) -> Result<String, SigningError> {
        Ok(format!("{SIGNATURE_SCHEME}{}", self.sign(record)?))
    }

    /// Check a hex signature (with or without the `sha256=` prefix).
    ///
    /// The comparison is constant time.
    pub fn verify(&self, record: &TransformedRecord, signature: &str) -> Result<(), SigningError> {
        let hex_sig = signature.strip_prefix(SIGNATURE_SCHEME).unwrap_or(signature);
        let expected = hex::decode(hex_sig).map_err(|_| SigningError::InvalidSignature)?;
        self.mac(record)?
            .verify_slice(&expected)
            .map_err(|_| SigningError::VerificationFailed)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Signing module errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SigningError {
    #[error("Signing secret is empty")]
    EmptySecret,

    #[error("Invalid signing key: {0}")]
    InvalidKey(String),

    #[error("Invalid signature encoding")]
    InvalidSignature,

    #[error("Signature verification failed")]
    VerificationFailed,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
