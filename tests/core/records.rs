use qrforge::core::records::{NewRecord, RecordStore, SqliteRecordStore};
use std::path::Path;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn record(data: &str, path: &str) -> NewRecord {
    NewRecord::now(data, "standard", Path::new(path))
}

#[test]
fn sqlite_find_by_data_is_exact_match() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteRecordStore::open(tmp.path()).expect("open store");

    store.insert(&record("Hello", "a.png")).expect("insert");

    assert!(store.find_by_data("Hello").unwrap().is_some());
    assert!(store.find_by_data("hello").unwrap().is_none());
    assert!(store.find_by_data("Hello ").unwrap().is_none());
}

#[test]
fn sqlite_plain_insert_rejects_duplicate_data() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteRecordStore::open(tmp.path()).expect("open store");

    store.insert(&record("dup", "a.png")).expect("first insert");
    let err = store.insert(&record("dup", "b.png")).unwrap_err();
    assert!(err.to_string().contains("UNIQUE"), "{err}");
}

#[test]
fn sqlite_find_or_insert_reports_existing_record() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteRecordStore::open(tmp.path()).expect("open store");

    let first = store.find_or_insert(&record("abc", "first.png")).unwrap();
    let second = store.find_or_insert(&record("abc", "second.png")).unwrap();

    assert!(first.inserted);
    assert!(!second.inserted);
    assert_eq!(second.record.id, first.record.id);
    assert_eq!(second.record.artifact_path, "first.png");
}

#[test]
fn sqlite_records_survive_reopen() {
    let tmp = TempDir::new().expect("tempdir");
    {
        let store = SqliteRecordStore::open(tmp.path()).expect("open store");
        store.insert(&record("persisted", "p.png")).unwrap();
    }
    let reopened = SqliteRecordStore::open(tmp.path()).expect("reopen store");
    let found = reopened.find_by_data("persisted").unwrap().expect("record");
    assert_eq!(found.artifact_path, "p.png");
    assert!(found.created_at.ends_with('Z'));
}

#[test]
fn sqlite_concurrent_claims_on_same_data_yield_one_record() {
    let tmp = TempDir::new().expect("tempdir");
    let store = Arc::new(SqliteRecordStore::open(tmp.path()).expect("open store"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .find_or_insert(&record("contended", &format!("{i}.png")))
                    .expect("claim")
            })
        })
        .collect();
    let claims: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(claims.iter().filter(|c| c.inserted).count(), 1);
    let winner = &claims.iter().find(|c| c.inserted).unwrap().record;
    assert!(claims.iter().all(|c| c.record == *winner));
    assert_eq!(store.list_recent(100).unwrap().len(), 1);
}

#[test]
fn sqlite_list_recent_respects_limit_and_order() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteRecordStore::open(tmp.path()).expect("open store");
    for d in ["a", "b", "c", "d"] {
        store.insert(&record(d, "x.png")).unwrap();
    }
    let recent = store.list_recent(3).unwrap();
    let data: Vec<&str> = recent.iter().map(|r| r.data.as_str()).collect();
    assert_eq!(data, vec!["d", "c", "b"]);
}

#[test]
fn sqlite_replayed_claim_returns_the_stored_record() {
    let tmp = TempDir::new().expect("tempdir");
    let store = SqliteRecordStore::open(tmp.path()).expect("open store");
    let claim = record("replayed", "mine.png");

    let first = store.find_or_insert(&claim).unwrap();
    let replay = store.find_or_insert(&claim).unwrap();

    assert!(first.inserted);
    assert!(!replay.inserted);
    assert_eq!(replay.record, first.record);
    assert_eq!(replay.record.artifact_path, "mine.png");
    assert_eq!(store.list_recent(10).unwrap().len(), 1);
}
