//! Parallel range copy.
//!
//! [run] splits the source collection into contiguous key ranges with
//! [compute_partitions](partition::compute_partitions), copies every range on its own thread with
//! [copy_range](worker::copy_range), and folds the per range [WorkerResult]s into a [CopySummary].
#[doc(hidden)]
pub mod coordinator;
#[doc(hidden)]
pub mod partition;
#[doc(hidden)]
pub mod worker;

use crate::config::CopyConf;
use crate::error::{Result, RunError};
use std::fmt;

pub use coordinator::run;
pub use partition::{compute_partitions, sentinel_after};
pub use worker::copy_range;

/// What to copy and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyJob {
    /// source collection name.
    pub src_coll: String,
    /// destination collection name.
    pub dst_coll: String,
    /// how many key ranges to split the source collection into, one worker thread per range.
    pub num_workers: usize,
    /// documents per insert batch.
    pub batch_size: usize,
}

impl CopyJob {
    /// create a job copying `src_coll` into `dst_coll`.
    pub fn new(
        src_coll: impl Into<String>,
        dst_coll: impl Into<String>,
        num_workers: usize,
        batch_size: usize,
    ) -> Self {
        CopyJob {
            src_coll: src_coll.into(),
            dst_coll: dst_coll.into(),
            num_workers,
            batch_size,
        }
    }

    /// build a job from collections and tuning options in `conf`.
    pub fn from_conf(conf: &CopyConf) -> Self {
        CopyJob::new(
            conf.src.coll.clone(),
            conf.dst.coll.clone(),
            conf.copy.threads,
            conf.copy.batch_size,
        )
    }

    /// reject a job with no worker or an empty batch.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(RunError::InvalidJob("worker count must be at least 1"));
        }
        if self.batch_size == 0 {
            return Err(RunError::InvalidJob("batch size must be at least 1"));
        }
        Ok(())
    }
}

/// Outcome of one successfully copied key range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerResult {
    /// wall clock time the worker spent on its range.
    pub elapsed_millis: u64,
    /// documents inserted into the destination.
    pub documents_copied: u64,
}

/// Throughput of a fully successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct CopySummary {
    /// documents copied by all workers.
    pub total_documents: u64,
    /// workers run concurrently, so the slowest one is the copy time.
    pub max_elapsed_millis: u64,
    /// zero when the copy took no measurable time.
    pub throughput_per_second: f64,
    /// how many key ranges were copied.
    pub partitions: usize,
    /// time spent on splitting the collection, before any copy started.
    pub partition_millis: u64,
}

impl CopySummary {
    /// aggregate the results of every worker of a run.
    pub fn new(results: &[WorkerResult], partition_millis: u64) -> Self {
        let total_documents = results.iter().map(|r| r.documents_copied).sum();
        let max_elapsed_millis = results
            .iter()
            .map(|r| r.elapsed_millis)
            .max()
            .unwrap_or(0);
        let throughput_per_second = if max_elapsed_millis == 0 {
            0.0
        } else {
            total_documents as f64 * 1000.0 / max_elapsed_millis as f64
        };
        CopySummary {
            total_documents,
            max_elapsed_millis,
            throughput_per_second,
            partitions: results.len(),
            partition_millis,
        }
    }
}

impl fmt::Display for CopySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Work partitioned into {} ranges in {}ms",
            self.partitions, self.partition_millis
        )?;
        writeln!(f, "Total docs copied: {}", self.total_documents)?;
        writeln!(f, "Total copy time: {}ms", self.max_elapsed_millis)?;
        write!(f, "Docs copied per second: {:.0}", self.throughput_per_second)
    }
}
