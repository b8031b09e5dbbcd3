//! Session credentials for the assistant service
//!
//! Cookies are captured by a browser login outside this crate and saved as
//! a JSON list of cookie objects. This module only reads them back.

use crate::config::Environment;
use crate::error::{RouterError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Opaque cookie jar attached to every network call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    cookies: BTreeMap<String, String>,
}

impl Credentials {
    pub fn new(cookies: BTreeMap<String, String>) -> Self {
        Self { cookies }
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// `Cookie` request header value
    pub fn cookie_header(&self) -> String {
        self.cookies
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Credentials {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Current credentials for `environment`
    async fn load(&self, environment: Environment) -> Result<Credentials>;

    /// Obtain fresh credentials after the service rejected the current ones
    async fn refresh(&self, environment: Environment) -> Result<Credentials>;
}

#[derive(Deserialize)]
struct StoredCookie {
    name: String,
    value: String,
}

/// Reads browser-exported cookies from `<dir>/.cx-assistant-cookies-<env>.json`.
#[derive(Debug, Clone)]
pub struct FileCredentialProvider {
    dir: PathBuf,
}

impl FileCredentialProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn cookie_path(&self, environment: Environment) -> PathBuf {
        self.dir
            .join(format!(".cx-assistant-cookies-{}.json", environment.as_str()))
    }

    fn read(&self, path: &Path) -> Result<Credentials> {
        if !path.exists() {
            return Err(RouterError::Credentials(format!(
                "No saved session at {}; log in with a browser first",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let cookies: Vec<StoredCookie> = serde_json::from_str(&raw).map_err(|e| {
            RouterError::Credentials(format!("Malformed cookie file {}: {}", path.display(), e))
        })?;
        Ok(cookies.into_iter().map(|c| (c.name, c.value)).collect())
    }
}

#[async_trait]
impl CredentialProvider for FileCredentialProvider {
    async fn load(&self, environment: Environment) -> Result<Credentials> {
        let credentials = self.read(&self.cookie_path(environment))?;
        tracing::debug!("Loaded {} session cookies for {}", credentials.cookies.len(), environment);
        Ok(credentials)
    }

    async fn refresh(&self, environment: Environment) -> Result<Credentials> {
        // Browser login writes the file; re-reading picks up a new session.
        tracing::info!("Re-reading session cookies for {}", environment);
        self.read(&self.cookie_path(environment))
    }
}
