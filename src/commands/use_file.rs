use crate::config::{self, Config, CurrentSelection};
use crate::logging;
use crate::remote::RemoteStore;
use crate::sync::list_documents;
use eyre::{Result, WrapErr};
use std::fs;
use std::time::SystemTime;

pub fn run(config: &Config, reference: &str) -> Result<()> {
    let store = super::store_from(config)?;
    let documents = list_documents(&store, "/")?;
    let Some(document) = super::resolve_entry(&documents, reference) else {
        eyre::bail!("No file matching \"{reference}\"; see `davread list`");
    };

    let cache = config::cache_dir()?;
    fs::create_dir_all(&cache)?;
    let local_path = cache.join(&document.name);

    if cached_copy_is_current(&local_path, document.last_modified) {
        println!("Cached copy of {} is up to date.", document.name);
    } else {
        println!("Downloading {}...", document.name);
        let bytes = store
            .get(&document.path)
            .wrap_err_with(|| format!("Could not download {}", document.name))?;
        fs::write(&local_path, &bytes)?;
        logging::info(format!("cached {} bytes at {}", bytes.len(), local_path.display()));
    }

    config::write_current_selection(&CurrentSelection {
        file_name: document.name.clone(),
        local_path: local_path.clone(),
    })?;
    println!("Selected {}; run `davread look` to start reading.", document.name);
    Ok(())
}

fn cached_copy_is_current(
    local_path: &std::path::Path,
    remote_modified: Option<chrono::DateTime<chrono::Utc>>,
) -> bool {
    let Some(remote_modified) = remote_modified else {
        return false;
    };
    let Ok(metadata) = fs::metadata(local_path) else {
        return false;
    };
    let Ok(local_modified) = metadata.modified() else {
        return false;
    };
    local_modified >= SystemTime::from(remote_modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tempfile::TempDir;

    #[test]
    fn test_missing_cache_is_stale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.txt");
        assert!(!cached_copy_is_current(&path, Some(Utc::now())));
    }

    #[test]
    fn test_unknown_remote_mtime_forces_download() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.txt");
        fs::write(&path, "text").unwrap();
        assert!(!cached_copy_is_current(&path, None));
    }

    #[test]
    fn test_fresh_cache_is_current() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.txt");
        fs::write(&path, "text").unwrap();
        let old_remote = Utc::now() - Duration::hours(1);
        assert!(cached_copy_is_current(&path, Some(old_remote)));
    }

    #[test]
    fn test_newer_remote_invalidates_cache() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("book.txt");
        fs::write(&path, "text").unwrap();
        let future_remote = Utc::now() + Duration::hours(1);
        assert!(!cached_copy_is_current(&path, Some(future_remote)));
    }
}
