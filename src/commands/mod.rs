pub mod config;
pub mod delete;
pub mod list;
pub mod look;
pub mod review;
pub mod settings;
pub mod upload;
pub mod use_file;

use crate::config::Config;
use crate::models::RemoteEntry;
use crate::remote::WebDavStore;
use eyre::Result;

/// Build a store from the configured connection, or explain how to get one.
pub fn store_from(config: &Config) -> Result<WebDavStore> {
    let Some(remote) = &config.remote else {
        eyre::bail!("No WebDAV connection configured; run `davread config` first");
    };
    WebDavStore::new(remote)
}

/// Resolve a user-supplied file reference: either a 1-based number from
/// `davread list` or an exact file name.
pub fn resolve_entry<'a>(documents: &'a [RemoteEntry], reference: &str) -> Option<&'a RemoteEntry> {
    if let Ok(number) = reference.parse::<usize>()
        && number >= 1
    {
        return documents.get(number - 1);
    }
    documents.iter().find(|d| d.name == reference)
}
