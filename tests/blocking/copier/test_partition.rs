use bson::{doc, Document};
use mongo_copy::copier::compute_partitions;
use mongo_copy::{KeyRange, MemoryStore, PartitionError, PartitionOp};

fn store_with(count: usize) -> MemoryStore {
    let store = MemoryStore::new();
    // uneven key lengths, so boundaries are not just fixed width counters.
    let docs: Vec<Document> = (0..count)
        .map(|i| doc! {"_id": format!("{}-{}", i % 7, i), "v": i as i64})
        .collect();
    store.seed("coll", docs).unwrap();
    store
}

fn keys_in(all_keys: &[String], range: &KeyRange) -> Vec<String> {
    all_keys
        .iter()
        .filter(|k| range.contains(k))
        .cloned()
        .collect()
}

#[test]
fn test_partitions_are_contiguous_and_cover_every_key() {
    for count in [0usize, 1, 2, 3, 5, 10, 17, 64, 101] {
        for num_workers in 1..=9usize {
            let store = store_with(count);
            let all_keys = store.keys("coll");
            let ranges = compute_partitions(&store, "coll", num_workers).unwrap();

            let expected_len = if count > num_workers {
                num_workers
            } else {
                1
            };
            assert_eq!(
                ranges.len(),
                expected_len,
                "count {} workers {}",
                count,
                num_workers
            );
            assert_eq!(ranges[0].start_key, "");
            for pair in ranges.windows(2) {
                assert_eq!(pair[0].end_key, pair[1].start_key);
                assert!(pair[0].start_key < pair[0].end_key);
            }
            let last = ranges.last().unwrap();
            assert!(all_keys.iter().all(|k| k.as_str() < last.end_key.as_str()));

            // every key falls in exactly one range.
            let mut joined: Vec<String> = ranges
                .iter()
                .flat_map(|r| keys_in(&all_keys, r))
                .collect();
            assert_eq!(joined, all_keys);
            joined.dedup();
            assert_eq!(joined.len(), all_keys.len());
        }
    }
}

#[test]
fn test_partitions_are_balanced() {
    let store = store_with(100);
    let all_keys = store.keys("coll");
    let ranges = compute_partitions(&store, "coll", 4).unwrap();
    let sizes: Vec<usize> = ranges.iter().map(|r| keys_in(&all_keys, r).len()).collect();
    assert_eq!(sizes, vec![25, 25, 25, 25]);

    // the last worker takes the remainder.
    let store = store_with(10);
    let all_keys = store.keys("coll");
    let ranges = compute_partitions(&store, "coll", 3).unwrap();
    let sizes: Vec<usize> = ranges.iter().map(|r| keys_in(&all_keys, r).len()).collect();
    assert_eq!(sizes, vec![3, 3, 4]);
}

#[test]
fn test_partition_count_failure() {
    let store = store_with(10);
    store.fail_count();
    assert!(matches!(
        compute_partitions(&store, "coll", 2),
        Err(PartitionError::Query { .. })
    ));
}

#[test]
fn test_partition_lookup_failures() {
    let store = store_with(50);
    store.fail_find_key();
    match compute_partitions(&store, "coll", 4) {
        Err(PartitionError::Query { op, .. }) => assert_eq!(op, PartitionOp::BoundaryKey),
        other => panic!("partition should fail on boundary lookup, got {:?}", other),
    }

    let store = store_with(50);
    store.fail_max_key();
    match compute_partitions(&store, "coll", 4) {
        Err(PartitionError::Query { op, .. }) => assert_eq!(op, PartitionOp::MaxKey),
        other => panic!("partition should fail on max key lookup, got {:?}", other),
    }
}

#[test]
fn test_partition_collection_shrank() {
    // counted 150 documents, only 50 remain when boundaries are looked up.
    let store = store_with(50);
    store.override_count(150);
    match compute_partitions(&store, "coll", 2) {
        Err(PartitionError::MissingKey { op }) => assert_eq!(op, PartitionOp::BoundaryKey),
        other => panic!("partition should find no boundary, got {:?}", other),
    }

    let store = store_with(0);
    store.override_count(1);
    match compute_partitions(&store, "coll", 1) {
        Err(PartitionError::MissingKey { op }) => assert_eq!(op, PartitionOp::MaxKey),
        other => panic!("partition should find no max key, got {:?}", other),
    }
}
