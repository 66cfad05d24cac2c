use bson::{doc, Document};
use mongo_copy::{copier, CopyJob, CopyOp, MemoryStore, RunError};

fn letter_docs() -> Vec<Document> {
    ('a'..='j')
        .map(|c| {
            let pos = (c as u32 - 'a' as u32) as i64;
            doc! {"_id": c.to_string(), "letter": c.to_string(), "pos": pos}
        })
        .collect()
}

#[test]
fn test_copy_ten_docs_two_workers() {
    let source = MemoryStore::new();
    source.seed("docs", letter_docs()).unwrap();
    let destination = MemoryStore::new();

    let ranges = copier::compute_partitions(&source, "docs", 2).unwrap();
    assert_eq!(ranges[0].end_key, "f");
    assert_eq!(ranges[1].end_key, "j_");

    let job = CopyJob::new("docs", "docs_copy", 2, 3);
    let summary = copier::run(&source, &destination, &job).unwrap();
    assert_eq!(summary.total_documents, 10);
    assert_eq!(summary.partitions, 2);
    assert_eq!(destination.documents("docs_copy"), letter_docs());

    // each range holds 5 documents: batches of 3 and 2.
    let mut batches = destination.insert_batches("docs_copy");
    batches.sort_unstable();
    assert_eq!(batches, vec![2, 2, 3, 3]);
}

#[test]
fn test_copy_empty_collection() {
    let source = MemoryStore::new();
    let destination = MemoryStore::new();
    let job = CopyJob::new("docs", "docs", 4, 50);
    let summary = copier::run(&source, &destination, &job).unwrap();
    assert_eq!(summary.total_documents, 0);
    assert_eq!(summary.partitions, 1);
    assert_eq!(summary.throughput_per_second, 0.0);
    assert!(destination.insert_batches("docs").is_empty());
}

#[test]
fn test_copy_one_partition_fails() {
    let source = MemoryStore::new();
    let docs: Vec<Document> = (0..40)
        .map(|i| doc! {"_id": format!("k{:02}", i), "n": i})
        .collect();
    source.seed("docs", docs).unwrap();
    let destination = MemoryStore::new();
    // partition 2 covers k20..k29.
    destination.fail_insert_containing("k25");

    let job = CopyJob::new("docs", "docs", 4, 100);
    match copier::run(&source, &destination, &job) {
        Err(RunError::PartialCopy {
            partitions,
            documents_copied,
            failures,
        }) => {
            assert_eq!(partitions, 4);
            assert_eq!(documents_copied, 30);
            assert_eq!(failures.len(), 1);
            assert_eq!(failures[0].partition, 2);
            assert_eq!(failures[0].op, CopyOp::Insert);
        }
        other => panic!("copy should fail partially, got {:?}", other),
    }

    // the siblings still ran to completion.
    let copied = destination.keys("docs");
    assert_eq!(copied.len(), 30);
    assert!(copied.iter().all(|k| !k.starts_with("k2")));
}

#[test]
fn test_copy_more_workers_than_docs() {
    let source = MemoryStore::new();
    source
        .seed("docs", vec![doc! {"_id": "x"}, doc! {"_id": "y"}])
        .unwrap();
    let destination = MemoryStore::new();
    let job = CopyJob::new("docs", "docs", 8, 1);
    let summary = copier::run(&source, &destination, &job).unwrap();
    assert_eq!(summary.partitions, 1);
    assert_eq!(summary.total_documents, 2);
    assert_eq!(destination.insert_batches("docs"), vec![1, 1]);
}

#[test]
fn test_copy_unbounded_batch_size() {
    let source = MemoryStore::new();
    source
        .seed("docs", vec![doc! {"_id": "x"}, doc! {"_id": "y"}])
        .unwrap();
    let destination = MemoryStore::new();
    let job = CopyJob::new("docs", "docs", 1, usize::MAX);
    let summary = copier::run(&source, &destination, &job).unwrap();
    assert_eq!(summary.total_documents, 2);
    assert_eq!(destination.insert_batches("docs"), vec![2]);
}

#[test]
fn test_copy_many_workers() {
    let source = MemoryStore::new();
    let docs: Vec<Document> = (0..1000)
        .map(|i| doc! {"_id": format!("doc-{}", i), "n": i})
        .collect();
    source.seed("docs", docs).unwrap();
    let destination = MemoryStore::new();
    let job = CopyJob::new("docs", "docs", 7, 33);
    let summary = copier::run(&source, &destination, &job).unwrap();
    assert_eq!(summary.total_documents, 1000);
    assert_eq!(summary.partitions, 7);
    assert_eq!(destination.documents("docs"), source.documents("docs"));
}

#[test]
fn test_copy_partition_failure_aborts_before_copy() {
    let source = MemoryStore::new();
    source.seed("docs", letter_docs()).unwrap();
    source.fail_count();
    let destination = MemoryStore::new();
    let job = CopyJob::new("docs", "docs", 2, 3);
    assert!(matches!(
        copier::run(&source, &destination, &job),
        Err(RunError::Partition(_))
    ));
    assert!(destination.insert_batches("docs").is_empty());
}

#[test]
fn test_copy_invalid_job() {
    let source = MemoryStore::new();
    let destination = MemoryStore::new();
    assert!(matches!(
        copier::run(&source, &destination, &CopyJob::new("a", "a", 0, 1)),
        Err(RunError::InvalidJob(_))
    ));
    assert!(matches!(
        copier::run(&source, &destination, &CopyJob::new("a", "a", 1, 0)),
        Err(RunError::InvalidJob(_))
    ));
}
