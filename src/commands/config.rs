use crate::config::{Config, RemoteConfig};
use crate::logging;
use crate::remote::{RemoteStore, WebDavStore};
use eyre::Result;

pub fn run(
    config: &mut Config,
    url: Option<String>,
    username: Option<String>,
    password: Option<String>,
    show: bool,
) -> Result<()> {
    let setting_values = url.is_some() || username.is_some() || password.is_some();

    if show || !setting_values {
        match &config.remote {
            Some(remote) => {
                println!("url:      {}", remote.url);
                println!("username: {}", remote.username);
                println!("password: {}", "*".repeat(remote.password.chars().count()));
            }
            None => println!("No WebDAV connection configured."),
        }
        return Ok(());
    }

    let mut remote = config.remote.clone().unwrap_or(RemoteConfig {
        url: String::new(),
        username: String::new(),
        password: String::new(),
    });
    if let Some(url) = url {
        remote.url = url.trim_end_matches('/').to_string();
    }
    if let Some(username) = username {
        remote.username = username;
    }
    if let Some(password) = password {
        remote.password = password;
    }

    if remote.url.is_empty() {
        eyre::bail!("A share URL is required; pass --url");
    }

    config.remote = Some(remote.clone());
    config.save()?;
    println!("Connection saved.");

    // Best-effort verification; a failure here is advice, not an error.
    match WebDavStore::new(&remote).and_then(|s| s.list("/")) {
        Ok(entries) => println!("Connected; {} entries at the share root.", entries.len()),
        Err(err) => logging::warn(format!("could not verify connection: {err}")),
    }

    Ok(())
}
