use crate::error::{StoreError, StoreResult};
use crate::store::{Destination, DocStream, KeyRange, Source};
use bson::{doc, Document};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::sync::{Collection, Database};

/// [Source] and [Destination] on top of a mongodb database.
///
/// Only documents whose key field holds a string take part in a copy, other documents are not
/// counted and never match a key range.
#[derive(Clone, Debug)]
pub struct MongoStore {
    db: Database,
    key_field: String,
}

impl MongoStore {
    /// create a store over `db`, documents are keyed by the string field `key_field`.
    pub fn new(db: Database, key_field: impl Into<String>) -> Self {
        MongoStore {
            db,
            key_field: key_field.into(),
        }
    }

    fn coll(&self, name: &str) -> Collection<Document> {
        self.db.collection(name)
    }

    fn key_of(&self, doc: &Document) -> StoreResult<String> {
        doc.get_str(&self.key_field)
            .map(|key| key.to_string())
            .map_err(|detail| StoreError::KeyAccess {
                field: self.key_field.clone(),
                detail,
            })
    }

    fn find_one_key(
        &self,
        coll: &str,
        filter: Document,
        ascending: bool,
        skip: u64,
    ) -> StoreResult<Option<String>> {
        let key = self.key_field.as_str();
        let direction = if ascending { 1 } else { -1 };
        let options = FindOneOptions::builder()
            .sort(doc! {key: direction})
            .skip(skip)
            .projection(doc! {key: 1})
            .build();
        self.coll(coll)
            .find_one(filter, options)?
            .map(|doc| self.key_of(&doc))
            .transpose()
    }
}

impl Source for MongoStore {
    fn count(&self, coll: &str) -> StoreResult<u64> {
        let key = self.key_field.as_str();
        Ok(self
            .coll(coll)
            .count_documents(doc! {key: {"$type": "string"}}, None)?)
    }

    fn find_key_at_offset(
        &self,
        coll: &str,
        start_key: &str,
        offset: u64,
    ) -> StoreResult<Option<String>> {
        let key = self.key_field.as_str();
        self.find_one_key(coll, doc! {key: {"$gte": start_key}}, true, offset)
    }

    fn find_max_key(&self, coll: &str) -> StoreResult<Option<String>> {
        let key = self.key_field.as_str();
        self.find_one_key(coll, doc! {key: {"$type": "string"}}, false, 0)
    }

    fn stream_range(
        &self,
        coll: &str,
        range: &KeyRange,
        batch_size: usize,
    ) -> StoreResult<DocStream<'_>> {
        let key = self.key_field.as_str();
        let options = FindOptions::builder()
            .sort(doc! {key: 1})
            .batch_size(u32::try_from(batch_size).unwrap_or(u32::MAX))
            .build();
        let cursor = self.coll(coll).find(
            doc! {key: {"$gte": range.start_key.as_str(), "$lt": range.end_key.as_str()}},
            options,
        )?;
        Ok(Box::new(cursor.map(|doc| doc.map_err(StoreError::from))))
    }
}

impl Destination for MongoStore {
    fn insert_batch(&self, coll: &str, docs: Vec<Document>) -> StoreResult<()> {
        self.coll(coll).insert_many(docs, None)?;
        Ok(())
    }
}
