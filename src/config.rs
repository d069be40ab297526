use crate::settings::{KeyBindingOverrides, ReadingSettings};
use chrono::{DateTime, Utc};
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

pub const CACHE_DIR_NAME: &str = ".davread-cache";
const CURRENT_FILE_NAME: &str = "current.json";

/// WebDAV connection values. How these are stored is deliberately plain;
/// hardening the credential format is out of scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ConfigFile {
    remote: Option<RemoteConfig>,
    reading: ReadingSettings,
    key_bindings: KeyBindingOverrides,
    last_sync: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub remote: Option<RemoteConfig>,
    pub reading: ReadingSettings,
    pub key_bindings: KeyBindingOverrides,
    pub last_sync: Option<DateTime<Utc>>,
    filepath: PathBuf,
}

impl Config {
    pub fn load() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        Self::load_from(prefix.join("config.json"))
    }

    /// Load configuration from a specific path. A missing file is seeded
    /// with defaults so the user has something to edit.
    pub fn load_from(filepath: PathBuf) -> Result<Self> {
        let file = if filepath.exists() {
            let config_str = fs::read_to_string(&filepath)?;
            serde_json::from_str::<ConfigFile>(&config_str).unwrap_or_else(|err| {
                crate::logging::warn(format!(
                    "could not parse {}: {err}; using defaults",
                    filepath.display()
                ));
                ConfigFile::default()
            })
        } else {
            let initial = ConfigFile::default();
            if let Some(parent) = filepath.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&filepath, serde_json::to_string_pretty(&initial)?)?;
            initial
        };

        Ok(Self {
            remote: file.remote,
            reading: file.reading,
            key_bindings: file.key_bindings,
            last_sync: file.last_sync,
            filepath,
        })
    }

    pub fn save(&self) -> Result<()> {
        let file = ConfigFile {
            remote: self.remote.clone(),
            reading: self.reading.clone(),
            key_bindings: self.key_bindings.clone(),
            last_sync: self.last_sync,
        };
        if let Some(parent) = self.filepath.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.filepath, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    pub fn filepath(&self) -> &Path {
        &self.filepath
    }
}

pub fn get_app_data_prefix() -> Result<PathBuf> {
    if let Some(config_home) = std::env::var_os("XDG_CONFIG_HOME") {
        let path = PathBuf::from(config_home).join("davread");
        return Ok(path);
    } else if let Some(home) = std::env::var_os("HOME") {
        let path = PathBuf::from(home.clone()).join(".config").join("davread");
        if path.exists() {
            return Ok(path);
        } else {
            return Ok(PathBuf::from(home).join(".davread"));
        }
    } else if let Some(user_profile) = std::env::var_os("USERPROFILE") {
        return Ok(PathBuf::from(user_profile).join(".davread"));
    }

    Err(eyre::eyre!(
        "Could not determine application data directory"
    ))
}

/// Per-directory cache of downloaded documents, as the legacy tool kept
/// it: a dot-directory next to wherever the reader is invoked.
pub fn cache_dir() -> Result<PathBuf> {
    Ok(std::env::current_dir()?.join(CACHE_DIR_NAME))
}

/// The file selected with `davread use`, pointing at its cached copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSelection {
    pub file_name: String,
    pub local_path: PathBuf,
}

pub fn read_current_selection() -> Result<Option<CurrentSelection>> {
    let path = cache_dir()?.join(CURRENT_FILE_NAME);
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&raw).ok())
}

pub fn write_current_selection(selection: &CurrentSelection) -> Result<()> {
    let dir = cache_dir()?;
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join(CURRENT_FILE_NAME),
        serde_json::to_string_pretty(selection)?,
    )?;
    Ok(())
}
