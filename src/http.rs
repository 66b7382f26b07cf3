//! HTTP client utilities
//!
//! Provides reqwest clients configured with timeouts, JSON headers and a
//! cookie jar that survives between CLI invocations.

use crate::error::AppError;
use crate::session::store::write_private_file;
use chrono::Utc;
use cookie::Cookie;
use reqwest::cookie::CookieStore;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, warn};
use url::{Host, Url};

/// Build a reqwest Client with the given timeout. With a `jar`, cookies are
/// sent and stored through it; without one the client is credential-less.
/// System proxy env vars are honored by reqwest itself.
pub fn client_with_timeout(timeout: Duration, jar: Option<Arc<PersistentCookieJar>>) -> Result<Client, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let mut builder = Client::builder().timeout(timeout).default_headers(headers);
    if let Some(jar) = jar {
        builder = builder.cookie_provider(jar);
    }
    builder
        .user_agent(concat!("conduit/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))
}

/// A cookie as remembered between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct StoredCookie {
    value: String,
    #[serde(default = "root_path")]
    path: String,
    #[serde(default)]
    secure: bool,
    /// Unix seconds; `None` when the server set neither Expires nor Max-Age
    #[serde(default)]
    expires_at: Option<i64>,
}

impl StoredCookie {
    fn is_live(&self, now: i64) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }

    /// Path and Secure matching for an outgoing request
    fn applies_to(&self, url: &Url) -> bool {
        if self.secure && url.scheme() != "https" && !is_loopback(url) {
            return false;
        }
        path_matches(&self.path, url.path())
    }
}

fn root_path() -> String {
    "/".to_string()
}

/// Cookies keyed by host, then by name
type CookieMap = BTreeMap<String, BTreeMap<String, StoredCookie>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CookieFile {
    #[serde(default)]
    hosts: CookieMap,
}

/// Cookie store persisted as JSON, so the refresh cookie set at login is
/// still there for the next command
#[derive(Debug)]
pub struct PersistentCookieJar {
    path: Option<PathBuf>,
    cookies: RwLock<CookieMap>,
}

impl PersistentCookieJar {
    /// Jar that never touches the disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            cookies: RwLock::new(CookieMap::new()),
        }
    }

    /// Load the jar at `path`; a missing or unreadable file gives an empty jar
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let cookies = read_cookie_file(&path).unwrap_or_default();
        Self {
            path: Some(path),
            cookies: RwLock::new(cookies),
        }
    }

    /// Value of cookie `name` stored for `host`, unless it has expired
    pub fn get(&self, host: &str, name: &str) -> Option<String> {
        let now = Utc::now().timestamp();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .and_then(|cookies| cookies.get(name))
            .filter(|cookie| cookie.is_live(now))
            .map(|cookie| cookie.value.clone())
    }

    pub fn is_empty(&self) -> bool {
        let now = Utc::now().timestamp();
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(|cookies| cookies.values().all(|cookie| !cookie.is_live(now)))
    }

    /// Forget every cookie, on disk too
    pub fn clear(&self) {
        self.cookies.write().unwrap_or_else(PoisonError::into_inner).clear();
        if let Some(path) = &self.path {
            if path.exists() {
                if let Err(e) = fs::remove_file(path) {
                    warn!("Failed to remove cookie file {}: {}", path.display(), e);
                }
            }
        }
    }

    fn save(&self, cookies: &CookieMap) {
        let Some(path) = &self.path else {
            return;
        };
        let file = CookieFile { hosts: cookies.clone() };
        let result = serde_json::to_string_pretty(&file)
            .map_err(AppError::from)
            .and_then(|contents| write_private_file(path, &contents));
        if let Err(e) = result {
            warn!("Failed to save cookies: {}", e);
        }
    }
}

impl CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let Some(host) = url.host_str() else {
            return;
        };
        let now = Utc::now().timestamp();

        let mut cookies = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        let mut changed = false;
        for header in cookie_headers {
            let Some(update) = header.to_str().ok().and_then(|h| parse_set_cookie(h, url, now)) else {
                continue;
            };
            let host_cookies = cookies.entry(host.to_string()).or_default();
            match update {
                CookieUpdate::Remove(name) => {
                    debug!(host, name = %name, "Cookie removed");
                    changed |= host_cookies.remove(&name).is_some();
                }
                CookieUpdate::Store(name, cookie) => {
                    debug!(host, name = %name, "Cookie stored");
                    host_cookies.insert(name, cookie);
                    changed = true;
                }
            }
        }
        for host_cookies in cookies.values_mut() {
            let before = host_cookies.len();
            host_cookies.retain(|_, cookie| cookie.is_live(now));
            changed |= host_cookies.len() != before;
        }
        cookies.retain(|_, host_cookies| !host_cookies.is_empty());

        if changed {
            self.save(&cookies);
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let host = url.host_str()?;
        let now = Utc::now().timestamp();
        let cookies = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        let header = cookies
            .get(host)?
            .iter()
            .filter(|(_, cookie)| cookie.is_live(now) && cookie.applies_to(url))
            .map(|(name, cookie)| format!("{}={}", name, cookie.value))
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CookieUpdate {
    Store(String, StoredCookie),
    /// Empty value, non-positive Max-Age or an Expires in the past
    Remove(String),
}

fn parse_set_cookie(header: &str, url: &Url, now: i64) -> Option<CookieUpdate> {
    let cookie = Cookie::parse(header).ok()?;
    let name = cookie.name().trim().to_string();
    if name.is_empty() {
        return None;
    }
    let value = cookie.value().trim_matches('"');

    // Max-Age takes precedence over Expires
    let expires_at = match cookie.max_age() {
        Some(max_age) => Some(now.saturating_add(max_age.whole_seconds())),
        None => cookie.expires_datetime().map(|at| at.unix_timestamp()),
    };
    if value.is_empty() || expires_at.map_or(false, |at| at <= now) {
        return Some(CookieUpdate::Remove(name));
    }

    let path = cookie
        .path()
        .filter(|path| path.starts_with('/'))
        .map(str::to_string)
        .unwrap_or_else(|| default_path(url.path()));

    Some(CookieUpdate::Store(
        name,
        StoredCookie {
            value: value.to_string(),
            path,
            secure: cookie.secure().unwrap_or(false),
            expires_at,
        },
    ))
}

/// Directory of the request path, as used when Set-Cookie has no Path
fn default_path(request_path: &str) -> String {
    match request_path.rfind('/') {
        Some(0) | None => root_path(),
        Some(index) => request_path[..index].to_string(),
    }
}

fn path_matches(cookie_path: &str, request_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/') || request_path[cookie_path.len()..].starts_with('/'))
}

fn is_loopback(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => domain == "localhost",
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        None => false,
    }
}

fn read_cookie_file(path: &Path) -> Option<CookieMap> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str::<CookieFile>(&contents) {
        Ok(file) => Some(file.hosts),
        Err(e) => {
            warn!("Ignoring unreadable cookie file {}: {}", path.display(), e);
            None
        }
    }
}
