use crate::config::Config;
use crate::remote::RemoteStore;
use eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;

pub fn run(config: &Config, path: &Path) -> Result<()> {
    let store = super::store_from(config)?;
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        eyre::bail!("Not a file path: {}", path.display());
    };

    let bytes =
        fs::read(path).wrap_err_with(|| format!("Could not read {}", path.display()))?;
    println!("Uploading {name} ({} bytes)...", bytes.len());
    store.put(name, &bytes)?;
    println!("Uploaded {name}.");
    Ok(())
}
