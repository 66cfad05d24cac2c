use crate::error::{PartitionError, PartitionOp, StoreError};
use crate::store::{KeyRange, Source};
use crate::KEY_SENTINEL_SUFFIX;
use tracing::{debug, info};

/// exclusive upper bound right above `max_key`.
///
/// Under byte ordering a string is always less than any longer string it prefixes, so nothing
/// `<= max_key` reaches the returned bound.
pub fn sentinel_after(max_key: &str) -> String {
    let mut bound = String::with_capacity(max_key.len() + KEY_SENTINEL_SUFFIX.len());
    bound.push_str(max_key);
    bound.push_str(KEY_SENTINEL_SUFFIX);
    bound
}

/// split `coll` into contiguous key ranges for `num_workers` workers.
///
/// The first range starts at `""` and the last one ends right above the greatest key, adjacent
/// ranges share their boundary key.  When the collection holds no more documents than
/// `num_workers` a single range is returned, an empty collection gives the empty range `["", "")`.
///
/// Boundaries are found one after another, each lookup skips forward from the previous
/// boundary, so the whole split scans the collection about once.
pub fn compute_partitions<S>(
    source: &S,
    coll: &str,
    num_workers: usize,
) -> Result<Vec<KeyRange>, PartitionError>
where
    S: Source + ?Sized,
{
    if num_workers == 0 {
        return Err(PartitionError::InvalidWorkerCount);
    }

    let total = source.count(coll).map_err(query_error(PartitionOp::Count))?;
    info!(%coll, total, "Documents found in collection.");
    if total == 0 {
        return Ok(vec![KeyRange::default()]);
    }

    let workers = num_workers as u64;
    let mut ranges = if total > workers {
        vec![KeyRange::default(); num_workers]
    } else {
        vec![KeyRange::default()]
    };

    if total > workers {
        let docs_per_worker = total / workers;
        for i in 1..num_workers {
            let key = source
                .find_key_at_offset(coll, &ranges[i - 1].start_key, docs_per_worker)
                .map_err(query_error(PartitionOp::BoundaryKey))?
                .ok_or(PartitionError::MissingKey {
                    op: PartitionOp::BoundaryKey,
                })?;
            debug!(partition = i, boundary = %key, "Found partition boundary.");
            ranges[i - 1].end_key = key.clone();
            ranges[i].start_key = key;
        }
    }

    let max_key = source
        .find_max_key(coll)
        .map_err(query_error(PartitionOp::MaxKey))?
        .ok_or(PartitionError::MissingKey {
            op: PartitionOp::MaxKey,
        })?;
    if let Some(last) = ranges.last_mut() {
        last.end_key = sentinel_after(&max_key);
    }
    Ok(ranges)
}

fn query_error(op: PartitionOp) -> impl FnOnce(StoreError) -> PartitionError {
    move |source| PartitionError::Query { op, source }
}
