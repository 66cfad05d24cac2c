//! An in-process key ordered store.
//!
//! It implements both [Source] and [Destination] and keeps every collection in a `BTreeMap`, so
//! keys are ordered by bytes just like mongodb strings.  Faults can be injected to exercise
//! failure handling, and insert batch sizes are recorded for inspection.
//!
//! Streams behave like a mongodb cursor: documents are fetched `batch_size` at a time, each
//! fetch resumes after the last key returned, and the store is only locked during a fetch.
use crate::error::{StoreError, StoreResult};
use crate::store::{Destination, DocStream, KeyRange, Source};
use crate::DEFAULT_KEY_FIELD;
use bson::Document;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::ops::Bound;
use std::sync::{Mutex, MutexGuard};

/// Ordered in-process document store, usable as both side of a copy.
#[derive(Debug)]
pub struct MemoryStore {
    key_field: String,
    inner: Mutex<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    colls: HashMap<String, BTreeMap<String, Document>>,
    insert_log: HashMap<String, Vec<usize>>,
    faults: Faults,
}

#[derive(Debug, Default)]
struct Faults {
    count: bool,
    find_key: bool,
    max_key: bool,
    count_override: Option<u64>,
    insert_keys: HashSet<String>,
    stream_keys: HashSet<String>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        MemoryStore::new()
    }
}

impl MemoryStore {
    /// create an empty store keyed by `_id`.
    pub fn new() -> Self {
        MemoryStore::with_key_field(DEFAULT_KEY_FIELD)
    }

    /// create an empty store keyed by the string field `key_field`.
    pub fn with_key_field(key_field: impl Into<String>) -> Self {
        MemoryStore {
            key_field: key_field.into(),
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Put `docs` into `coll` without recording an insert batch.
    pub fn seed(&self, coll: &str, docs: Vec<Document>) -> StoreResult<()> {
        let mut inner = self.lock();
        let target = inner.colls.entry(coll.to_string()).or_default();
        for doc in docs {
            let key = self.key_of(&doc)?;
            target.insert(key, doc);
        }
        Ok(())
    }

    /// All documents of `coll`, ascending by key.
    pub fn documents(&self, coll: &str) -> Vec<Document> {
        self.lock()
            .colls
            .get(coll)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default()
    }

    /// All keys of `coll`, ascending.
    pub fn keys(&self, coll: &str) -> Vec<String> {
        self.lock()
            .colls
            .get(coll)
            .map(|docs| docs.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Size of every batch inserted into `coll` through [Destination::insert_batch], in call order.
    pub fn insert_batches(&self, coll: &str) -> Vec<usize> {
        self.lock()
            .insert_log
            .get(coll)
            .cloned()
            .unwrap_or_default()
    }

    /// make every `count` call fail.
    pub fn fail_count(&self) {
        self.lock().faults.count = true;
    }

    /// make every `find_key_at_offset` call fail.
    pub fn fail_find_key(&self) {
        self.lock().faults.find_key = true;
    }

    /// make every `find_max_key` call fail.
    pub fn fail_max_key(&self) {
        self.lock().faults.max_key = true;
    }

    /// make `count` report `count` documents no matter what the collection holds, like a
    /// collection which shrinks right after it was counted.
    pub fn override_count(&self, count: u64) {
        self.lock().faults.count_override = Some(count);
    }

    /// make any insert batch which contains `key` fail, nothing of that batch is written.
    pub fn fail_insert_containing(&self, key: impl Into<String>) {
        self.lock().faults.insert_keys.insert(key.into());
    }

    /// make a stream fail when it reaches `key`, documents before it are still yielded.
    pub fn fail_stream_at(&self, key: impl Into<String>) {
        self.lock().faults.stream_keys.insert(key.into());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // a panicking test thread must not hide the data from the asserting one.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn key_of(&self, doc: &Document) -> StoreResult<String> {
        doc.get_str(&self.key_field)
            .map(|key| key.to_string())
            .map_err(|detail| StoreError::KeyAccess {
                field: self.key_field.clone(),
                detail,
            })
    }
}

impl Source for MemoryStore {
    fn count(&self, coll: &str) -> StoreResult<u64> {
        let inner = self.lock();
        if inner.faults.count {
            return Err(StoreError::Fault(format!("count on {} refused", coll)));
        }
        if let Some(count) = inner.faults.count_override {
            return Ok(count);
        }
        Ok(inner.colls.get(coll).map_or(0, |docs| docs.len() as u64))
    }

    fn find_key_at_offset(
        &self,
        coll: &str,
        start_key: &str,
        offset: u64,
    ) -> StoreResult<Option<String>> {
        let inner = self.lock();
        if inner.faults.find_key {
            return Err(StoreError::Fault(format!("find key in {} refused", coll)));
        }
        let docs = match inner.colls.get(coll) {
            Some(docs) => docs,
            None => return Ok(None),
        };
        let offset = usize::try_from(offset).unwrap_or(usize::MAX);
        Ok(docs
            .range::<str, _>((Bound::Included(start_key), Bound::Unbounded))
            .nth(offset)
            .map(|(key, _)| key.clone()))
    }

    fn find_max_key(&self, coll: &str) -> StoreResult<Option<String>> {
        let inner = self.lock();
        if inner.faults.max_key {
            return Err(StoreError::Fault(format!("find max key in {} refused", coll)));
        }
        Ok(inner
            .colls
            .get(coll)
            .and_then(|docs| docs.keys().next_back().cloned()))
    }

    fn stream_range(
        &self,
        coll: &str,
        range: &KeyRange,
        batch_size: usize,
    ) -> StoreResult<DocStream<'_>> {
        Ok(Box::new(MemoryCursor {
            store: self,
            coll: coll.to_string(),
            range: range.clone(),
            batch_size: batch_size.max(1),
            last_key: None,
            fetched: VecDeque::new(),
            exhausted: range.is_empty(),
        }))
    }
}

/// Lazy stream over one key range of a [MemoryStore].
struct MemoryCursor<'a> {
    store: &'a MemoryStore,
    coll: String,
    range: KeyRange,
    batch_size: usize,
    /// greatest key yielded so far, the next fetch starts right after it.
    last_key: Option<String>,
    fetched: VecDeque<StoreResult<Document>>,
    exhausted: bool,
}

impl MemoryCursor<'_> {
    fn fetch_next_batch(&mut self) {
        let store = self.store;
        let inner = store.lock();
        let docs = match inner.colls.get(&self.coll) {
            Some(docs) => docs,
            None => {
                self.exhausted = true;
                return;
            }
        };
        let lower = match &self.last_key {
            Some(key) => Bound::Excluded(key.as_str()),
            None => Bound::Included(self.range.start_key.as_str()),
        };
        let upper = Bound::Excluded(self.range.end_key.as_str());

        let mut taken = 0;
        for (key, doc) in docs.range::<str, _>((lower, upper)) {
            if taken == self.batch_size {
                return;
            }
            if inner.faults.stream_keys.contains(key) {
                self.fetched.push_back(Err(StoreError::Fault(format!(
                    "stream of {} broken at key {:?}",
                    self.coll, key
                ))));
                self.exhausted = true;
                return;
            }
            self.fetched.push_back(Ok(doc.clone()));
            self.last_key = Some(key.clone());
            taken += 1;
        }
        self.exhausted = true;
    }
}

impl Iterator for MemoryCursor<'_> {
    type Item = StoreResult<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fetched.is_empty() && !self.exhausted {
            self.fetch_next_batch();
        }
        self.fetched.pop_front()
    }
}

impl Destination for MemoryStore {
    fn insert_batch(&self, coll: &str, docs: Vec<Document>) -> StoreResult<()> {
        let keys = docs
            .iter()
            .map(|doc| self.key_of(doc))
            .collect::<StoreResult<Vec<String>>>()?;

        let mut inner = self.lock();
        if let Some(key) = keys.iter().find(|k| inner.faults.insert_keys.contains(*k)) {
            return Err(StoreError::Fault(format!(
                "insert into {} refused for key {:?}",
                coll, key
            )));
        }

        let existing = inner.colls.get(coll);
        let mut seen = HashSet::with_capacity(keys.len());
        for key in keys.iter() {
            let duplicated = !seen.insert(key) || existing.map_or(false, |d| d.contains_key(key));
            if duplicated {
                return Err(StoreError::Fault(format!(
                    "duplicate key {:?} in {}",
                    key, coll
                )));
            }
        }

        let batch_len = docs.len();
        let target = inner.colls.entry(coll.to_string()).or_default();
        for (key, doc) in keys.into_iter().zip(docs) {
            target.insert(key, doc);
        }
        inner
            .insert_log
            .entry(coll.to_string())
            .or_default()
            .push(batch_len);
        Ok(())
    }
}
