#[cfg(test)]
mod tests {
    use super::super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn temp_store() -> (TempDir, JsonFileStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("nested").join("state.json")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_file_reads_defaults() {
        let (_dir, store) = temp_store();
        assert!(store.get("enabled", true));
        assert_eq!(store.get_value("enabled").unwrap(), None);
    }

    #[test]
    fn test_set_then_get_across_instances() {
        let (dir, store) = temp_store();
        store.set("pollFrequency", &250u64).unwrap();
        store
            .set("bannedCommands", &vec!["rm -rf /".to_string()])
            .unwrap();

        let reopened = JsonFileStore::open(dir.path().join("nested").join("state.json")).unwrap();
        assert_eq!(reopened.get("pollFrequency", 1000u64), 250);
        assert_eq!(
            reopened.get::<Vec<String>>("bannedCommands", Vec::new()),
            vec!["rm -rf /".to_string()]
        );
    }

    #[test]
    fn test_malformed_entry_falls_back_to_default() {
        let (_dir, store) = temp_store();
        store.set_value("pollFrequency", json!("fast")).unwrap();
        assert_eq!(store.get("pollFrequency", 1000u64), 1000);
    }

    #[test]
    fn test_corrupt_file_starts_fresh() {
        let (_dir, store) = temp_store();
        fs::write(store.path(), "not json").unwrap();
        assert!(!store.get("enabled", false));

        store.set("enabled", &true).unwrap();
        assert!(store.get("enabled", false));
    }

    #[test]
    fn test_update_sees_and_keeps_other_keys() {
        let (_dir, store) = temp_store();
        store.set("enabled", &true).unwrap();

        store
            .update(&mut |map| {
                assert_eq!(map.get("enabled"), Some(&json!(true)));
                map.insert("lock.cursor".into(), json!({"ownerId": "a"}));
                Ok(())
            })
            .unwrap();

        assert!(store.get("enabled", false));
        assert!(store.get_value("lock.cursor").unwrap().is_some());
    }

    #[test]
    fn test_failed_update_leaves_memory_store_untouched() {
        let store = MemoryStore::new();
        store.set("enabled", &true).unwrap();

        let result = store.update(&mut |map| {
            map.insert("enabled".into(), json!(false));
            anyhow::bail!("abort")
        });

        assert!(result.is_err());
        assert!(store.get("enabled", false));
    }
}
