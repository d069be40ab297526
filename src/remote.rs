use crate::config::RemoteConfig;
use crate::models::RemoteEntry;
use chrono::{DateTime, Utc};
use eyre::{Result, WrapErr};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::{Method, StatusCode};
use std::time::Duration;

/// The storage collaborator the core talks to. Everything network-shaped
/// lives behind this trait; the reading core itself never sees a URL.
pub trait RemoteStore {
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>>;
    fn get(&self, path: &str) -> Result<Vec<u8>>;
    fn put(&self, path: &str, bytes: &[u8]) -> Result<()>;
    fn delete(&self, path: &str) -> Result<()>;
}

const PROPFIND_BODY: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<d:propfind xmlns:d="DAV:">
  <d:prop>
    <d:resourcetype/>
    <d:getcontentlength/>
    <d:getlastmodified/>
  </d:prop>
</d:propfind>"#;

/// WebDAV implementation over blocking reqwest with basic auth.
pub struct WebDavStore {
    base_url: String,
    base_path: String,
    username: String,
    password: String,
    client: Client,
}

impl WebDavStore {
    pub fn new(config: &RemoteConfig) -> Result<Self> {
        let base_url = config.url.trim_end_matches('/').to_string();
        let parsed = reqwest::Url::parse(&base_url)
            .wrap_err_with(|| format!("Invalid WebDAV url: {}", config.url))?;
        let base_path = parsed.path().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            base_url,
            base_path,
            username: config.username.clone(),
            password: config.password.clone(),
            client,
        })
    }

    fn url_for(&self, path: &str) -> String {
        let trimmed = path.trim_start_matches('/');
        if trimmed.is_empty() {
            format!("{}/", self.base_url)
        } else {
            format!("{}/{}", self.base_url, trimmed)
        }
    }

    fn request(&self, method: Method, path: &str) -> reqwest::blocking::RequestBuilder {
        self.client
            .request(method, self.url_for(path))
            .basic_auth(&self.username, Some(&self.password))
    }

    fn ensure_success(response: reqwest::blocking::Response, what: &str) -> Result<reqwest::blocking::Response> {
        let status = response.status();
        if status.is_success() || status == StatusCode::MULTI_STATUS {
            Ok(response)
        } else {
            Err(eyre::eyre!("{what} failed with status {status}"))
        }
    }

    /// Create every missing collection on the way to `path`'s parent.
    /// Existing collections answer 405, which is fine to ignore.
    fn ensure_collections(&self, path: &str) {
        let trimmed = path.trim_matches('/');
        let Some((parents, _file)) = trimmed.rsplit_once('/') else {
            return;
        };
        let mut current = String::new();
        for part in parents.split('/').filter(|p| !p.is_empty()) {
            current.push('/');
            current.push_str(part);
            let result = self
                .request(Method::from_bytes(b"MKCOL").unwrap(), &current)
                .send();
            if let Err(err) = result {
                crate::logging::debug(format!("MKCOL {current}: {err}"));
            }
        }
    }
}

impl RemoteStore for WebDavStore {
    fn list(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let response = self
            .request(Method::from_bytes(b"PROPFIND").unwrap(), path)
            .header("Depth", "1")
            .header("Content-Type", "application/xml")
            .body(PROPFIND_BODY)
            .send()
            .wrap_err("PROPFIND request failed")?;
        let response = Self::ensure_success(response, "Listing")?;
        let body = response.text()?;

        let target = normalize_path(&format!("{}/{}", self.base_path, path.trim_matches('/')));
        Ok(parse_multistatus(&body, &target, &self.base_path))
    }

    fn get(&self, path: &str) -> Result<Vec<u8>> {
        let response = self
            .request(Method::GET, path)
            .send()
            .wrap_err("GET request failed")?;
        let response = Self::ensure_success(response, "Download")?;
        Ok(response.bytes()?.to_vec())
    }

    fn put(&self, path: &str, bytes: &[u8]) -> Result<()> {
        self.ensure_collections(path);
        let response = self
            .request(Method::PUT, path)
            .body(bytes.to_vec())
            .send()
            .wrap_err("PUT request failed")?;
        Self::ensure_success(response, "Upload")?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        let response = self
            .request(Method::DELETE, path)
            .send()
            .wrap_err("DELETE request failed")?;
        Self::ensure_success(response, "Delete")?;
        Ok(())
    }
}

/// Minimal multistatus parsing: href, collection flag, size and
/// modification time per response element. The entry matching the request
/// target itself is dropped, and entry paths are made relative to the
/// share's base path so they can be passed straight back to the store.
fn parse_multistatus(xml: &str, target: &str, base_path: &str) -> Vec<RemoteEntry> {
    let response_re = Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?response[\s>](.*?)</(?:[a-z0-9_-]+:)?response>").unwrap();
    let href_re = Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?href[^>]*>(.*?)</(?:[a-z0-9_-]+:)?href>").unwrap();
    let collection_re = Regex::new(r"(?i)<(?:[a-z0-9_-]+:)?collection\s*/?>").unwrap();
    let length_re = Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?getcontentlength[^>]*>(\d+)<").unwrap();
    let modified_re =
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?getlastmodified[^>]*>(.*?)</(?:[a-z0-9_-]+:)?getlastmodified>").unwrap();

    let mut entries = Vec::new();
    for caps in response_re.captures_iter(xml) {
        let block = &caps[1];
        let Some(href_caps) = href_re.captures(block) else {
            continue;
        };
        let href = percent_decode(href_caps[1].trim());
        let normalized = normalize_path(&href);
        if normalized == target {
            continue;
        }

        let name = normalized
            .rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or("")
            .to_string();
        if name.is_empty() {
            continue;
        }

        let relative = match normalized.strip_prefix(base_path) {
            Some(rest) if !base_path.is_empty() => normalize_path(rest),
            _ => normalized.clone(),
        };

        let is_dir = collection_re.is_match(block);
        let size = length_re
            .captures(block)
            .and_then(|c| c[1].parse::<u64>().ok())
            .unwrap_or(0);
        let last_modified = modified_re.captures(block).and_then(|c| {
            DateTime::parse_from_rfc2822(c[1].trim())
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        });

        entries.push(RemoteEntry {
            name,
            path: relative,
            size,
            last_modified,
            is_dir,
        });
    }
    entries
}

fn normalize_path(path: &str) -> String {
    // Hrefs may be absolute URLs or server-absolute paths.
    let path = match path.find("://") {
        Some(scheme_end) => match path[scheme_end + 3..].find('/') {
            Some(slash) => &path[scheme_end + 3 + slash..],
            None => "/",
        },
        None => path,
    };
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 3 <= bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}
