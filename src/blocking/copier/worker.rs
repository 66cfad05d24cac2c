use super::{CopyJob, WorkerResult};
use crate::error::{CopyError, CopyOp, StoreError};
use crate::store::{Destination, KeyRange, Source};
use std::time::Instant;
use tracing::{debug, info};

/// upper bound of documents reserved up front for a batch buffer, larger batches grow on demand.
const MAX_BUFFER_PREALLOC: usize = 4096;

/// Copy every document of `range` from `job.src_coll` to `job.dst_coll`.
///
/// Documents are inserted in the order the source yields them, `job.batch_size` at a time, and
/// a final partial batch is flushed after the stream ends.  The first failed read or insert
/// stops the copy, batches inserted before that stay in the destination.
pub fn copy_range<S, D>(
    source: &S,
    destination: &D,
    job: &CopyJob,
    partition: usize,
    range: &KeyRange,
) -> Result<WorkerResult, CopyError>
where
    S: Source + ?Sized,
    D: Destination + ?Sized,
{
    let start_time = Instant::now();
    let batch_size = job.batch_size;
    debug!(partition, %range, batch_size, "Copy partition begin.");

    let cursor = source
        .stream_range(&job.src_coll, range, batch_size)
        .map_err(copy_error(partition, CopyOp::Stream))?;

    let mut documents_copied: u64 = 0;
    let capacity = batch_size.min(MAX_BUFFER_PREALLOC);
    let mut buffer = Vec::with_capacity(capacity);
    for doc in cursor {
        buffer.push(doc.map_err(copy_error(partition, CopyOp::Stream))?);
        if buffer.len() == batch_size {
            let mut data_to_write = Vec::with_capacity(capacity);
            std::mem::swap(&mut buffer, &mut data_to_write);
            destination
                .insert_batch(&job.dst_coll, data_to_write)
                .map_err(copy_error(partition, CopyOp::Insert))?;
            documents_copied += batch_size as u64;
        }
    }

    if !buffer.is_empty() {
        let remain = buffer.len() as u64;
        destination
            .insert_batch(&job.dst_coll, buffer)
            .map_err(copy_error(partition, CopyOp::Insert))?;
        documents_copied += remain;
    }

    let elapsed_millis = u64::try_from(start_time.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        partition,
        documents_copied, elapsed_millis, "Copy partition complete."
    );
    Ok(WorkerResult {
        elapsed_millis,
        documents_copied,
    })
}

fn copy_error(partition: usize, op: CopyOp) -> impl FnOnce(StoreError) -> CopyError {
    move |source| CopyError {
        partition,
        op,
        source,
    }
}
