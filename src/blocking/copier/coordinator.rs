use super::partition::compute_partitions;
use super::worker::copy_range;
use super::{CopyJob, CopySummary, WorkerResult};
use crate::error::{CopyError, Result, RunError};
use crate::store::{Destination, Source};
use rayon::ThreadPoolBuilder;
use std::result::Result as StdResult;
use std::time::Instant;
use tracing::{error, info, warn};

type WorkerOutcome = StdResult<WorkerResult, CopyError>;

/// Copy the whole `job.src_coll` collection of `source` into `job.dst_coll` of `destination`.
///
/// All key ranges are computed before any worker starts.  Then one worker per range runs on a
/// dedicated thread pool, and the call returns after every worker has finished, even when some
/// of them failed.  The summary is only produced when every range was copied, otherwise
/// [RunError::PartialCopy] names each failed range.
pub fn run<S, D>(source: &S, destination: &D, job: &CopyJob) -> Result<CopySummary>
where
    S: Source + Sync + ?Sized,
    D: Destination + Sync + ?Sized,
{
    job.validate()?;
    let cpus = num_cpus::get();
    if job.num_workers > cpus {
        warn!(
            num_workers = job.num_workers,
            cpus, "More copy workers than cpus, workers will share cores."
        );
    }

    info!(
        src_coll = %job.src_coll,
        num_workers = job.num_workers,
        "Partitioning work to workers..."
    );
    let partition_start = Instant::now();
    let ranges = compute_partitions(source, &job.src_coll, job.num_workers)?;
    let partition_millis =
        u64::try_from(partition_start.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        partitions = ranges.len(),
        partition_millis, "Work partitioned."
    );

    let pool = ThreadPoolBuilder::new()
        .num_threads(ranges.len())
        .thread_name(|i| format!("copy-worker-{}", i))
        .build()?;

    // one slot per range, written only by the worker which owns that range.
    let mut slots: Vec<Option<WorkerOutcome>> = ranges.iter().map(|_| None).collect();
    info!(dst_coll = %job.dst_coll, batch_size = job.batch_size, "Copying data...");
    pool.scope(|s| {
        for (partition, (range, slot)) in ranges.iter().zip(slots.iter_mut()).enumerate() {
            s.spawn(move |_| {
                let outcome = copy_range(source, destination, job, partition, range);
                if let Err(e) = &outcome {
                    error!(partition, %range, error = ?e, "Copy partition failed.");
                }
                *slot = Some(outcome);
            });
        }
    });

    // the scope has joined every worker, so every slot is filled.
    let outcomes: Vec<WorkerOutcome> = slots.into_iter().flatten().collect();
    let summary = summarize(outcomes, partition_millis)?;
    info!(
        total_documents = summary.total_documents,
        max_elapsed_millis = summary.max_elapsed_millis,
        throughput_per_second = summary.throughput_per_second,
        "Copy complete."
    );
    Ok(summary)
}

/// Fold per range outcomes, a single failed range fails the whole run.
pub(crate) fn summarize(
    outcomes: Vec<WorkerOutcome>,
    partition_millis: u64,
) -> Result<CopySummary> {
    let partitions = outcomes.len();
    let mut results = Vec::with_capacity(partitions);
    let mut failures = vec![];
    for outcome in outcomes {
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => failures.push(e),
        }
    }

    if !failures.is_empty() {
        return Err(RunError::PartialCopy {
            partitions,
            documents_copied: results.iter().map(|r| r.documents_copied).sum(),
            failures,
        });
    }
    Ok(CopySummary::new(&results, partition_millis))
}
