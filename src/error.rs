//! Errors of the store, partition, copy and run layers.
use bson::document::ValueAccessError;
use mongodb::error::Error as MongoError;
use std::fmt;
use std::result::Result as StdResult;
use thiserror::Error;

/// Failure reported by a [Source](crate::store::Source) or [Destination](crate::store::Destination).
#[derive(Error, Debug)]
pub enum StoreError {
    /// The mongodb driver failed.
    #[error("Mongodb operation error")]
    MongoError(#[from] MongoError),
    /// A document has no string value at the key field.
    #[error("Read key field {field:?} from document failed, detailed: {detail:?}")]
    KeyAccess {
        /// name of the key field.
        field: String,
        /// why the value could not be read.
        detail: ValueAccessError,
    },
    /// Injected or internal failure of an in-process store.
    #[error("Store fault: {0}")]
    Fault(String),
}

/// Result of a store operation.
pub type StoreResult<T> = StdResult<T, StoreError>;

/// Which partitioning query failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionOp {
    /// counting the documents.
    Count,
    /// looking up a boundary between two ranges.
    BoundaryKey,
    /// looking up the greatest key.
    MaxKey,
}

impl fmt::Display for PartitionOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PartitionOp::Count => "count",
            PartitionOp::BoundaryKey => "boundary key",
            PartitionOp::MaxKey => "max key",
        };
        f.write_str(name)
    }
}

/// Splitting a collection into key ranges failed, no range is returned.
#[derive(Error, Debug)]
pub enum PartitionError {
    /// Asked for zero ranges.
    #[error("Worker count must be at least 1")]
    InvalidWorkerCount,
    /// A query against the source failed.
    #[error("Partition query `{op}` failed")]
    Query {
        /// the failed query.
        op: PartitionOp,
        /// store failure.
        #[source]
        source: StoreError,
    },
    /// The collection changed between the count and a later key lookup.
    #[error("Partition query `{op}` found no document, the collection shrank while partitioning")]
    MissingKey {
        /// the query which found nothing.
        op: PartitionOp,
    },
}

/// Which step of a partition copy failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyOp {
    /// reading documents from the source.
    Stream,
    /// inserting a batch into the destination.
    Insert,
}

impl fmt::Display for CopyOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CopyOp::Stream => f.write_str("stream"),
            CopyOp::Insert => f.write_str("insert"),
        }
    }
}

/// A worker stopped before its whole range was copied.
#[derive(Error, Debug)]
#[error("Copy partition {partition} failed during {op}")]
pub struct CopyError {
    /// index of the failed range.
    pub partition: usize,
    /// the failed step.
    pub op: CopyOp,
    /// store failure.
    #[source]
    pub source: StoreError,
}

/// Failure of a whole copy run.
#[derive(Error, Debug)]
pub enum RunError {
    /// The job parameters are unusable.
    #[error("Invalid copy job: {0}")]
    InvalidJob(&'static str),
    /// No copy was started because partitioning failed.
    #[error("Partition source collection failed")]
    Partition(#[from] PartitionError),
    /// The worker thread pool could not be created.
    #[error("Build copy worker pool failed")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    /// Some partitions failed, `documents_copied` only counts the succeeded ones.
    #[error("{} of {partitions} partitions failed, {documents_copied} documents copied by the others", .failures.len())]
    PartialCopy {
        /// number of ranges the run was split into.
        partitions: usize,
        /// documents copied by the succeeded ranges.
        documents_copied: u64,
        /// one entry per failed range.
        failures: Vec<CopyError>,
    },
    /// Could not create a client for a mongodb instance.
    #[error("Connect to mongodb {host:?} failed, detailed: {detail:?}")]
    Connect {
        /// `host:port` of the instance.
        host: String,
        /// driver error.
        detail: MongoError,
    },
    /// The user may not read the source database.
    #[error("Check permission for database {db:?} failed, host: {host:?}, detailed: {detail:?}")]
    PermissionError {
        /// `host:port` of the instance.
        host: String,
        /// database name.
        db: String,
        /// driver error.
        detail: MongoError,
    },
    /// The destination collection could not be recreated.
    #[error("Provision destination collection {coll:?} failed, detailed: {detail:?}")]
    Provision {
        /// collection name.
        coll: String,
        /// driver error.
        detail: MongoError,
    },
    /// The configuration file is not valid toml for [CopyConf](crate::CopyConf).
    #[error("Parse configuration file failed")]
    Config(#[from] toml::de::Error),
    /// The configuration file could not be read.
    #[error("Read configuration file failed")]
    Io(#[from] std::io::Error),
}

/// Result of a copy run or one of its setup steps.
pub type Result<T> = StdResult<T, RunError>;
