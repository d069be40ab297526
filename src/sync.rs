use crate::config::Config;
use crate::logging;
use crate::models::{ReadingPosition, RemoteEntry};
use crate::remote::RemoteStore;
use crate::settings::{KeyBindingOverrides, ReadingSettings};
use crate::state::State;
use eyre::Result;
use serde::{Deserialize, Serialize};

/// Progress and settings blobs kept at the root of the share. Both are
/// opaque to the store; the core only ever moves JSON through it.
pub const PROGRESS_BLOB: &str = "davread-progress.json";
pub const CONFIG_BLOB: &str = "davread-config.json";

/// Reconcile two position lists. The later timestamp wins per file; ties
/// keep the existing copy so nothing is rewritten needlessly. Existing
/// order is preserved and unseen files are appended.
pub fn merge_positions(
    existing: &[ReadingPosition],
    incoming: &[ReadingPosition],
) -> Vec<ReadingPosition> {
    let mut merged: Vec<ReadingPosition> = existing.to_vec();
    for position in incoming {
        match merged.iter_mut().find(|p| p.file_name == position.file_name) {
            Some(current) => {
                if position.timestamp > current.timestamp {
                    *current = position.clone();
                }
            }
            None => merged.push(position.clone()),
        }
    }
    merged
}

/// Positions stored on the remote, or an empty list when the blob is
/// missing or unreadable. Sync must not fail just because no progress has
/// ever been uploaded.
pub fn fetch_remote_positions(store: &dyn RemoteStore) -> Vec<ReadingPosition> {
    match store.get(PROGRESS_BLOB) {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(positions) => positions,
            Err(err) => {
                logging::warn(format!("remote progress blob unreadable: {err}"));
                Vec::new()
            }
        },
        Err(err) => {
            logging::debug(format!("no remote progress blob: {err}"));
            Vec::new()
        }
    }
}

/// Two-way progress sync: pull the remote blob into the local store, then
/// push the merged view back. Returns how many remote rows changed local
/// state.
pub fn sync_progress(store: &dyn RemoteStore, state: &State) -> Result<usize> {
    let remote = fetch_remote_positions(store);
    let applied = state.import_positions(&remote)?;

    let local = state.all_positions()?;
    let merged = merge_positions(&remote, &local);
    store.put(PROGRESS_BLOB, serde_json::to_string_pretty(&merged)?.as_bytes())?;

    logging::info(format!(
        "progress synced: {} records ({} pulled)",
        merged.len(),
        applied
    ));
    Ok(applied)
}

/// The settings document shared between devices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RemoteSettingsBlob {
    pub reading: ReadingSettings,
    pub key_bindings: KeyBindingOverrides,
}

pub fn fetch_remote_settings(store: &dyn RemoteStore) -> Option<RemoteSettingsBlob> {
    let bytes = store.get(CONFIG_BLOB).ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(blob) => Some(blob),
        Err(err) => {
            logging::warn(format!("remote settings blob unreadable: {err}"));
            None
        }
    }
}

pub fn upload_settings(store: &dyn RemoteStore, config: &Config) -> Result<()> {
    let blob = RemoteSettingsBlob {
        reading: config.reading.clone(),
        key_bindings: config.key_bindings.clone(),
    };
    store.put(CONFIG_BLOB, serde_json::to_string_pretty(&blob)?.as_bytes())?;
    Ok(())
}

/// Readable documents on the share. Filters out the sync blobs and, as the
/// legacy tool did, surfaces a file nested inside a same-named collection
/// (a quirk of some WebDAV servers) as if it were the file itself.
pub fn list_documents(store: &dyn RemoteStore, path: &str) -> Result<Vec<RemoteEntry>> {
    let mut documents = Vec::new();
    for entry in store.list(path)? {
        if entry.name == PROGRESS_BLOB || entry.name == CONFIG_BLOB {
            continue;
        }
        if !entry.is_dir {
            documents.push(entry);
            continue;
        }
        match store.list(&entry.path) {
            Ok(children) => {
                if let Some(nested) = children
                    .into_iter()
                    .find(|c| !c.is_dir && c.name == entry.name)
                {
                    documents.push(nested);
                }
            }
            Err(err) => {
                logging::debug(format!("skipping unreadable collection {}: {err}", entry.path));
            }
        }
    }
    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use std::cell::RefCell;
    use std::collections::HashMap;

    fn position(file: &str, index: usize, age_secs: i64) -> ReadingPosition {
        ReadingPosition {
            file_name: file.to_string(),
            chapter_title: format!("chapter-{index}"),
            chapter_index: index,
            timestamp: Utc::now() - Duration::seconds(age_secs),
        }
    }

    #[test]
    fn test_merge_later_timestamp_wins() {
        let existing = vec![position("a.txt", 1, 60)];
        let incoming = vec![position("a.txt", 2, 0)];
        let merged = merge_positions(&existing, &incoming);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].chapter_index, 2);
    }

    #[test]
    fn test_merge_tie_keeps_existing() {
        let shared = position("a.txt", 1, 30);
        let mut incoming = shared.clone();
        incoming.chapter_index = 9;
        let merged = merge_positions(&[shared.clone()], &[incoming]);
        assert_eq!(merged[0].chapter_index, 1);
    }

    #[test]
    fn test_merge_preserves_order_and_appends() {
        let existing = vec![position("a.txt", 1, 60), position("b.txt", 2, 50)];
        let incoming = vec![position("c.txt", 3, 0), position("a.txt", 7, 0)];
        let merged = merge_positions(&existing, &incoming);
        let names: Vec<&str> = merged.iter().map(|p| p.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(merged[0].chapter_index, 7);
    }

    /// In-memory store used to exercise sync without a network.
    struct MockStore {
        files: RefCell<HashMap<String, Vec<u8>>>,
        listings: HashMap<String, Vec<RemoteEntry>>,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                files: RefCell::new(HashMap::new()),
                listings: HashMap::new(),
            }
        }

        fn with_blob(self, name: &str, positions: &[ReadingPosition]) -> Self {
            self.files.borrow_mut().insert(
                name.to_string(),
                serde_json::to_vec(positions).unwrap(),
            );
            self
        }
    }

    impl RemoteStore for MockStore {
        fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
            Ok(self.listings.get(path).cloned().unwrap_or_default())
        }

        fn get(&self, path: &str) -> Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| eyre::eyre!("not found: {path}"))
        }

        fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_string(), bytes.to_vec());
            Ok(())
        }

        fn delete(&self, path: &str) -> Result<()> {
            self.files.borrow_mut().remove(path);
            Ok(())
        }
    }

    fn entry(name: &str, path: &str, is_dir: bool) -> RemoteEntry {
        RemoteEntry {
            name: name.to_string(),
            path: path.to_string(),
            size: 0,
            last_modified: None,
            is_dir,
        }
    }

    #[test]
    fn test_sync_progress_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = State::open(&dir.path().join("positions.db")).unwrap();
        state.upsert_position(&position("local.txt", 4, 10)).unwrap();

        let store = MockStore::new().with_blob(
            PROGRESS_BLOB,
            &[position("remote.txt", 2, 5), position("local.txt", 1, 600)],
        );

        let applied = sync_progress(&store, &state).unwrap();
        // Only the unseen remote file lands locally; the stale record for
        // local.txt is ignored.
        assert_eq!(applied, 1);
        assert_eq!(state.get_position("local.txt").unwrap().unwrap().chapter_index, 4);
        assert_eq!(state.get_position("remote.txt").unwrap().unwrap().chapter_index, 2);

        let uploaded: Vec<ReadingPosition> =
            serde_json::from_slice(&store.get(PROGRESS_BLOB).unwrap()).unwrap();
        assert_eq!(uploaded.len(), 2);
        let local = uploaded.iter().find(|p| p.file_name == "local.txt").unwrap();
        assert_eq!(local.chapter_index, 4);
    }

    #[test]
    fn test_sync_progress_without_remote_blob() {
        let dir = tempfile::TempDir::new().unwrap();
        let state = State::open(&dir.path().join("positions.db")).unwrap();
        state.upsert_position(&position("only.txt", 3, 0)).unwrap();

        let store = MockStore::new();
        assert_eq!(sync_progress(&store, &state).unwrap(), 0);

        let uploaded: Vec<ReadingPosition> =
            serde_json::from_slice(&store.get(PROGRESS_BLOB).unwrap()).unwrap();
        assert_eq!(uploaded.len(), 1);
    }

    #[test]
    fn test_list_documents_filters_blobs_and_resolves_nested_files() {
        let mut store = MockStore::new();
        store.listings.insert(
            "/".to_string(),
            vec![
                entry("novel.txt", "/dav/novel.txt", false),
                entry(PROGRESS_BLOB, &format!("/dav/{PROGRESS_BLOB}"), false),
                entry(CONFIG_BLOB, &format!("/dav/{CONFIG_BLOB}"), false),
                entry("boxed.txt", "/dav/boxed.txt", true),
                entry("empty-dir", "/dav/empty-dir", true),
            ],
        );
        store.listings.insert(
            "/dav/boxed.txt".to_string(),
            vec![entry("boxed.txt", "/dav/boxed.txt/boxed.txt", false)],
        );

        let documents = list_documents(&store, "/").unwrap();
        let names: Vec<&str> = documents.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["novel.txt", "boxed.txt"]);
        assert_eq!(documents[1].path, "/dav/boxed.txt/boxed.txt");
    }

    #[test]
    fn test_settings_blob_round_trip() {
        let store = MockStore::new();
        let dir = tempfile::TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path().join("config.json")).unwrap();
        config.reading.lines_per_page = 33;
        upload_settings(&store, &config).unwrap();

        let blob = fetch_remote_settings(&store).unwrap();
        assert_eq!(blob.reading.lines_per_page, 33);
    }
}
