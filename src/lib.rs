//! Mongo copy lib, which copies every document of one mongodb collection into a freshly created
//! collection of another mongodb instance, using several worker threads.
//!
//! The collection's key space is split into contiguous half open [KeyRange]s, one per worker,
//! then every worker streams its range from the source and inserts it into the destination in
//! fixed size batches.
//!
//! # Example:
//! ```no_run
//! use mongo_copy::{copier, Connection, ConnSettings, CopyJob};
//!
//! let src = Connection::new(&ConnSettings::default()).unwrap();
//! let dst = Connection::new(&ConnSettings { port: 27018, ..ConnSettings::default() }).unwrap();
//! dst.recreate_collection().unwrap();
//!
//! let job = CopyJob::new("docs", "docs", 4, 1000);
//! let summary = copier::run(&src.store("_id"), &dst.store("_id"), &job).unwrap();
//! println!("{}", summary);
//! ```

#![warn(missing_docs)]

#[doc(hidden)]
pub mod blocking;
pub mod config;
#[doc(hidden)]
pub mod error;
pub mod memory;
pub mod store;

/// mongodb internal database for admin.
const ADMIN_DB_NAME: &str = "admin";

/// default field used as document key.
pub const DEFAULT_KEY_FIELD: &str = "_id";
/// appended to the greatest key to get an exclusive upper bound above every key.
pub const KEY_SENTINEL_SUFFIX: &str = "_";

pub use blocking::copier;
pub use blocking::copier::{CopyJob, CopySummary, WorkerResult};
pub use blocking::{Connection, MongoStore};
pub use config::{ConnSettings, CopyConf, CopyOptions};
pub use error::{
    CopyError, CopyOp, PartitionError, PartitionOp, Result, RunError, StoreError, StoreResult,
};
pub use memory::MemoryStore;
pub use store::{Destination, KeyRange, Source};
