// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn memory_set_get_remove() -> anyhow::Result<()> {
    let storage = MemoryStorage::new();
    assert_eq!(storage.get("k"), None);
    storage.set("k", "v")?;
    assert_eq!(storage.get("k").as_deref(), Some("v"));
    storage.remove("k")?;
    assert_eq!(storage.get("k"), None);
    // Removing again is fine.
    storage.remove("k")?;
    assert!(storage.is_empty());
    Ok(())
}

#[test]
fn memory_quota_rejects_oversized_writes() -> anyhow::Result<()> {
    let storage = MemoryStorage::with_quota(8);
    storage.set("a", "1234")?;
    let err = storage.set("b", "123456").err();
    assert!(err.is_some_and(|e| e.to_string().contains("quota exceeded")));
    assert_eq!(storage.get("b"), None);
    // Overwriting an existing key only counts the new value.
    storage.set("a", "1234567")?;
    assert_eq!(storage.len(), 1);
    Ok(())
}

#[test]
fn file_storage_survives_reopen() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("nested/session.json");

    let storage = FileStorage::open(&path);
    storage.set("folio.access_token", "abc")?;
    storage.set("folio.user", r#"{"id":1}"#)?;
    storage.remove("folio.user")?;
    drop(storage);

    let reopened = FileStorage::open(&path);
    assert_eq!(reopened.get("folio.access_token").as_deref(), Some("abc"));
    assert_eq!(reopened.get("folio.user"), None);
    Ok(())
}

#[test]
fn file_storage_leaves_no_temp_files() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");
    let storage = FileStorage::open(&path);
    for i in 0..5 {
        storage.set("k", &i.to_string())?;
    }
    let names: Vec<String> = std::fs::read_dir(dir.path())?
        .filter_map(|e| e.ok())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["session.json".to_owned()]);
    Ok(())
}

#[test]
fn corrupt_file_starts_empty() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("session.json");
    std::fs::write(&path, "{not json")?;

    let storage = FileStorage::open(&path);
    assert_eq!(storage.get("folio.access_token"), None);

    // The next write replaces the corrupt contents.
    storage.set("k", "v")?;
    let contents = std::fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&contents)?;
    assert_eq!(parsed["k"], "v");
    Ok(())
}

#[test]
fn failed_write_keeps_previous_state() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    // Parent "directory" is a regular file, so every save fails.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "")?;
    let storage = FileStorage::open(blocker.join("session.json"));

    assert!(storage.set("k", "v").is_err());
    assert_eq!(storage.get("k"), None);
    Ok(())
}
