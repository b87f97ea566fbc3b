//! Persistence-boundary tests for the scope-keyed pattern stores.

use anyhow::Result;
use querypatterns::storage::{open_store, JsonFileStore, PatternStore};
use serde_json::json;

#[test]
fn test_json_file_store_roundtrip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonFileStore::open(dir.path())?;

    let summaries = vec![
        json!({"table": "prod.sales.orders", "total_queries": 3}),
        json!({"table": "prod.sales.customers", "total_queries": 1}),
    ];
    store.save_summaries("bigquery/prod", &summaries)?;

    let loaded = store.load_summaries("bigquery/prod")?;
    assert_eq!(loaded, summaries);
    Ok(())
}

#[test]
fn test_json_file_store_survives_reopen() -> Result<()> {
    let dir = tempfile::tempdir()?;
    {
        let store = JsonFileStore::open(dir.path())?;
        store.save_summaries("scope-a", &[json!({"table": "t"})])?;
    }
    let reopened = JsonFileStore::open(dir.path())?;
    assert_eq!(reopened.load_summaries("scope-a")?.len(), 1);
    assert_eq!(reopened.list_scopes()?, vec!["scope-a"]);
    Ok(())
}

#[test]
fn test_json_file_store_save_replaces() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonFileStore::open(dir.path())?;
    store.save_summaries("s", &[json!({"table": "a"}), json!({"table": "b"})])?;
    store.save_summaries("s", &[json!({"table": "c"})])?;

    let loaded = store.load_summaries("s")?;
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0]["table"], "c");
    Ok(())
}

#[test]
fn test_unknown_scope_loads_empty() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let store = JsonFileStore::open(dir.path())?;
    assert!(store.load_summaries("missing")?.is_empty());
    Ok(())
}

#[test]
fn test_open_store_factory() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("patterns");

    let file_backed = open_store(Some(path.to_str().unwrap()))?;
    file_backed.save_summaries("s", &[json!({"table": "t"})])?;
    assert!(path.exists());

    let memory = open_store(None)?;
    memory.save_summaries("s", &[json!({"table": "t"})])?;
    assert_eq!(memory.load_summaries("s")?.len(), 1);
    Ok(())
}
