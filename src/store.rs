//! The store operations consumed by the copier.
//!
//! Documents are ordered by a string key. Keys compare as raw bytes, which is how mongodb
//! compares strings without a collation.
use crate::error::StoreResult;
use bson::Document;
use std::fmt;

/// Lazily fetched documents of one key range, not restartable.
pub type DocStream<'a> = Box<dyn Iterator<Item = StoreResult<Document>> + 'a>;

/// Half open key range `[start_key, end_key)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KeyRange {
    /// inclusive lower bound, `""` is below every key.
    pub start_key: String,
    /// exclusive upper bound.
    pub end_key: String,
}

impl KeyRange {
    /// create range `[start_key, end_key)`.
    pub fn new(start_key: impl Into<String>, end_key: impl Into<String>) -> Self {
        KeyRange {
            start_key: start_key.into(),
            end_key: end_key.into(),
        }
    }

    /// A range with `start_key >= end_key` holds no key.
    pub fn is_empty(&self) -> bool {
        self.start_key >= self.end_key
    }

    /// true when `start_key <= key < end_key` by byte order.
    pub fn contains(&self, key: &str) -> bool {
        self.start_key.as_str() <= key && key < self.end_key.as_str()
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}, {:?})", self.start_key, self.end_key)
    }
}

/// Read side of a copy.
pub trait Source {
    /// count documents which have a string key.
    fn count(&self, coll: &str) -> StoreResult<u64>;

    /// key of the document `offset` positions after the first key `>= start_key`, in ascending
    /// key order.  Returns None when there are not enough documents.
    fn find_key_at_offset(&self, coll: &str, start_key: &str, offset: u64)
        -> StoreResult<Option<String>>;

    /// greatest key in `coll`, None when it's empty.
    fn find_max_key(&self, coll: &str) -> StoreResult<Option<String>>;

    /// stream documents whose key falls in `range`, ascending by key.
    ///
    /// `batch_size` is how many documents are fetched per round trip.
    fn stream_range(&self, coll: &str, range: &KeyRange, batch_size: usize)
        -> StoreResult<DocStream<'_>>;
}

/// Write side of a copy.
pub trait Destination {
    /// insert `docs` in one batch, `docs` is never empty.
    fn insert_batch(&self, coll: &str, docs: Vec<Document>) -> StoreResult<()>;
}
