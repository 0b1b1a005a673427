use super::*;
use dk_core::{compute_checksum, ScriptFile};
use dk_db::DuckDbStore;
use std::path::PathBuf;

fn loaded(name: &str, body: &str) -> LoadedScript {
    LoadedScript {
        file: ScriptFile {
            name: ScriptName::new(name),
            path: PathBuf::from(name),
            order: 0,
        },
        body: body.to_string(),
        checksum: compute_checksum(body),
    }
}

#[tokio::test]
async fn test_missing_collection_is_empty() {
    let store = DuckDbStore::in_memory("app").unwrap();
    let ledger = Ledger::new(&store, "appliedUpdates", "name");
    assert!(ledger.list_applied().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_then_list() {
    let store = DuckDbStore::in_memory("app").unwrap();
    let ledger = Ledger::new(&store, "appliedUpdates", "name");

    ledger
        .record_applied(&loaded("002.js", "b\n"), Utc::now())
        .await
        .unwrap();
    ledger
        .record_applied(&loaded("001.js", "a\n"), Utc::now())
        .await
        .unwrap();

    let applied: Vec<String> = ledger
        .list_applied()
        .await
        .unwrap()
        .into_iter()
        .map(|name| name.to_string())
        .collect();
    assert_eq!(applied, vec!["001.js", "002.js"]);
}

#[tokio::test]
async fn test_custom_identity_field() {
    let store = DuckDbStore::in_memory("app").unwrap();
    let ledger = Ledger::new(&store, "migrations", "script");
    ledger
        .record_applied(&loaded("001.js", "a\n"), Utc::now())
        .await
        .unwrap();

    assert!(ledger
        .list_applied()
        .await
        .unwrap()
        .contains(&ScriptName::new("001.js")));

    // A ledger reading a different field sees no names
    let other = Ledger::new(&store, "migrations", "name");
    assert!(other.list_applied().await.unwrap().is_empty());
}
