//! These tests need two running mongodb servers, run them with `cargo test -- --ignored`.
use bson::{doc, Document};
use mongo_copy::{copier, Connection, ConnSettings, CopyJob, Source};

struct Context {
    source: Connection,
    target: Connection,
}

fn settings_from(uri_env: Option<&str>, default_port: u16, db: &str) -> ConnSettings {
    let (host, port) = match uri_env.and_then(|addr| addr.split_once(':')) {
        Some((host, port)) => (host.to_string(), port.parse().unwrap()),
        None => ("localhost".to_string(), default_port),
    };
    ConnSettings {
        host,
        port,
        db: db.to_string(),
        coll: "copy_test".to_string(),
        ..ConnSettings::default()
    }
}

impl Context {
    fn new() -> Self {
        let source = Connection::new(&settings_from(
            option_env!("COPY_TEST_SOURCE"),
            27017,
            "copy_test_source",
        ))
        .unwrap();
        let target = Connection::new(&settings_from(
            option_env!("COPY_TEST_TARGET"),
            27018,
            "copy_test_target",
        ))
        .unwrap();
        Self { source, target }
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.source.get_db().drop(None).unwrap();
        self.target.get_db().drop(None).unwrap();
    }
}

#[test]
#[ignore]
fn test_mongo_copy_collection() {
    let context = Context::new();
    let source_coll = context.source.get_coll();
    let docs: Vec<Document> = (0..20000)
        .map(|i| doc! {"_id": format!("doc{:05}", i), "a": 3})
        .collect();
    source_coll.insert_many(docs, None).unwrap();
    // documents without string key are outside of the key space.
    source_coll.insert_one(doc! {"a": 4}, None).unwrap();

    context.target.recreate_collection().unwrap();
    let job = CopyJob::new("copy_test", "copy_test", 4, 1000);
    let summary = copier::run(
        &context.source.store("_id"),
        &context.target.store("_id"),
        &job,
    )
    .unwrap();

    assert_eq!(summary.total_documents, 20000);
    let target_coll = context.target.get_coll();
    assert_eq!(target_coll.count_documents(None, None).unwrap(), 20000);
    for d in target_coll.find(None, None).unwrap() {
        let mut item = d.unwrap();
        assert!(item.get_str("_id").unwrap().starts_with("doc"));
        item.remove("_id");
        assert_eq!(item, doc! {"a": 3});
    }
}

#[test]
#[ignore]
fn test_mongo_store_key_queries() {
    let context = Context::new();
    let source_coll = context.source.get_coll();
    let docs: Vec<Document> = ["b", "a", "d", "c"]
        .iter()
        .map(|k| doc! {"_id": *k})
        .collect();
    source_coll.insert_many(docs, None).unwrap();

    let store = context.source.store("_id");
    assert_eq!(store.count("copy_test").unwrap(), 4);
    assert_eq!(
        store.find_key_at_offset("copy_test", "b", 1).unwrap(),
        Some("c".to_string())
    );
    assert_eq!(store.find_key_at_offset("copy_test", "b", 5).unwrap(), None);
    assert_eq!(
        store.find_max_key("copy_test").unwrap(),
        Some("d".to_string())
    );
}

#[test]
#[ignore]
fn test_mongo_recreate_collection() {
    let context = Context::new();
    let target_coll = context.target.get_coll();
    target_coll.insert_one(doc! {"_id": "old"}, None).unwrap();
    context.target.check_permission().unwrap();

    context.target.recreate_collection().unwrap();
    assert_eq!(target_coll.count_documents(None, None).unwrap(), 0);
}
