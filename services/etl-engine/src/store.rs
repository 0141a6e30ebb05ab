//! Transformed record store
//!
//! Holds every transformed record in insertion order together with the
//! per-date ingestion markers. One `RwLock` guards both, so an `append` and
//! its marker updates are observed atomically; queries share the read lock.
//!
//! The store does not deduplicate. Re-ingesting a date appends a second copy
//! of its records. `AppendReceipt::reingested` and `was_ingested` let callers
//! detect this; rejecting is left to them.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;
use tracing::{debug, warn};
use types::dates::{parse_date, DateRange};
use types::ids::CampaignId;
use types::record::TransformedRecord;

/// Exact-value filters applied on top of the date range.
///
/// `None` fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub channel: Option<String>,
    pub campaign_id: Option<CampaignId>,
}

impl RecordFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn channel(mut self, channel: impl Into<String>) -> Self {
        self.channel = Some(channel.into());
        self
    }

    pub fn campaign_id(mut self, campaign_id: impl Into<CampaignId>) -> Self {
        self.campaign_id = Some(campaign_id.into());
        self
    }

    pub fn matches(&self, record: &TransformedRecord) -> bool {
        self.channel.as_ref().map_or(true, |c| &record.channel == c)
            && self
                .campaign_id
                .as_ref()
                .map_or(true, |id| &record.campaign_id == id)
    }
}

/// Offset/limit window over a filtered result.
///
/// `limit == 0` means every remaining record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: usize,
    pub offset: usize,
}

impl Page {
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// The whole result, unpaginated.
    pub fn all() -> Self {
        Self::default()
    }
}

/// One page of query results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryPage {
    pub records: Vec<TransformedRecord>,
    /// Number of records matching range and filters before pagination.
    pub total: usize,
}

/// What an append did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppendReceipt {
    pub appended: usize,
    /// Distinct dates stamped with a fresh marker, ascending.
    pub dates: Vec<NaiveDate>,
    /// Subset of `dates` that already carried a marker before this append.
    pub reingested: Vec<NaiveDate>,
}

/// Repository of transformed records and ingestion markers.
pub trait RecordStore: Send + Sync {
    /// Append `records`, stamping a marker at `at` for each distinct date
    /// and recording `at` as the last ingestion time.
    fn append_at(&self, records: Vec<TransformedRecord>, at: DateTime<Utc>) -> AppendReceipt;

    /// Append `records` stamped with the current time.
    fn append(&self, records: Vec<TransformedRecord>) -> AppendReceipt {
        self.append_at(records, Utc::now())
    }

    /// Records dated within `range` that match `filter`, in insertion order,
    /// sliced by `page`. Records with an unparseable date never match.
    fn query(&self, range: DateRange, filter: &RecordFilter, page: Page) -> QueryPage;

    fn was_ingested(&self, date: NaiveDate) -> bool;

    /// When `date` was last ingested.
    fn ingested_at(&self, date: NaiveDate) -> Option<DateTime<Utc>>;

    /// Time of the most recent append, `None` if there never was one.
    fn last_ingestion_time(&self) -> Option<DateTime<Utc>>;

    /// Total records held.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    records: Vec<TransformedRecord>,
    markers: HashMap<NaiveDate, DateTime<Utc>>,
    last_ingestion: Option<DateTime<Utc>>,
}

/// Process-local store; contents do not survive a restart.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryStore {
    fn append_at(&self, records: Vec<TransformedRecord>, at: DateTime<Utc>) -> AppendReceipt {
        let mut dates = BTreeSet::new();
        for record in &records {
            match parse_date(&record.date) {
                Ok(date) => {
                    dates.insert(date);
                }
                Err(err) => warn!(
                    date = %record.date,
                    error = %err,
                    "Stored record has no valid date; no ingestion marker stamped"
                ),
            }
        }

        let mut inner = self.inner.write();
        let reingested: Vec<NaiveDate> = dates
            .iter()
            .filter(|d| inner.markers.contains_key(*d))
            .copied()
            .collect();
        for date in &dates {
            inner.markers.insert(*date, at);
        }
        let appended = records.len();
        inner.records.extend(records);
        inner.last_ingestion = Some(at);
        let total = inner.records.len();
        drop(inner);

        debug!(appended, total, dates = dates.len(), "Records appended");

        AppendReceipt {
            appended,
            dates: dates.into_iter().collect(),
            reingested,
        }
    }

    fn query(&self, range: DateRange, filter: &RecordFilter, page: Page) -> QueryPage {
        let inner = self.inner.read();

        let matching: Vec<&TransformedRecord> = inner
            .records
            .iter()
            .filter(|r| parse_date(&r.date).is_ok_and(|d| range.contains(d)))
            .filter(|r| filter.matches(r))
            .collect();

        let total = matching.len();
        let limit = if page.limit == 0 { usize::MAX } else { page.limit };
        let records = matching
            .into_iter()
            .skip(page.offset)
            .take(limit)
            .cloned()
            .collect();

        QueryPage { records, total }
    }

    fn was_ingested(&self, date: NaiveDate) -> bool {
        self.inner.read().markers.contains_key(&date)
    }

    fn ingested_at(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        self.inner.read().markers.get(&date).copied()
    }

    fn last_ingestion_time(&self) -> Option<DateTime<Utc>> {
        self.inner.read().last_ingestion
    }

    fn len(&self) -> usize {
        self.inner.read().records.len()
    }
}
