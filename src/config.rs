//! Runtime configuration
//!
//! Values come from the process environment (a `.env` file is loaded by the
//! binary before this runs).

use crate::error::{RouterError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MATCH_THRESHOLD: u8 = 50;

/// Assistant deployment a request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Stage,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Production => "production",
            Environment::Stage => "stage",
        }
    }

    pub fn default_host(&self) -> &'static str {
        match self {
            Environment::Production => "https://cxassistant.cisco.com",
            Environment::Stage => "https://cxassistant-stage.cisco.com",
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Production
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "production" | "prod" => Ok(Environment::Production),
            "stage" | "staging" => Ok(Environment::Stage),
            other => Err(RouterError::Config(format!(
                "Unknown environment '{}' (expected 'production' or 'stage')",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub catalog_path: PathBuf,
    /// Minimum question match score on a 0-100 scale
    pub match_threshold: u8,
    pub lookup_timeout: Duration,
    pub search_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub cookies_dir: PathBuf,
    pub production_host: String,
    pub stage_host: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("catalog.json"),
            match_threshold: DEFAULT_MATCH_THRESHOLD,
            lookup_timeout: Duration::from_secs(60),
            search_timeout: Duration::from_secs(30),
            dispatch_timeout: Duration::from_secs(120),
            cookies_dir: home_dir(),
            production_host: Environment::Production.default_host().to_string(),
            stage_host: Environment::Stage.default_host().to_string(),
        }
    }
}

impl RouterConfig {
    /// Build configuration from `CX_*` environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let catalog_path = std::env::var("CX_CATALOG_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.catalog_path);

        let match_threshold = match std::env::var("CX_MATCH_THRESHOLD") {
            Ok(raw) => {
                let value: u8 = raw.trim().parse().map_err(|_| {
                    RouterError::Config(format!("CX_MATCH_THRESHOLD must be 0-100, got '{}'", raw))
                })?;
                if value > 100 {
                    return Err(RouterError::Config(format!(
                        "CX_MATCH_THRESHOLD must be 0-100, got {}",
                        value
                    )));
                }
                value
            }
            Err(_) => defaults.match_threshold,
        };

        let cookies_dir = std::env::var("CX_COOKIES_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.cookies_dir);

        Ok(Self {
            catalog_path,
            match_threshold,
            lookup_timeout: secs_var("CX_LOOKUP_TIMEOUT_SECS", defaults.lookup_timeout)?,
            search_timeout: secs_var("CX_SEARCH_TIMEOUT_SECS", defaults.search_timeout)?,
            dispatch_timeout: secs_var("CX_DISPATCH_TIMEOUT_SECS", defaults.dispatch_timeout)?,
            cookies_dir,
            production_host: std::env::var("CX_PRODUCTION_HOST")
                .unwrap_or(defaults.production_host),
            stage_host: std::env::var("CX_STAGE_HOST").unwrap_or(defaults.stage_host),
        })
    }

    pub fn host(&self, environment: Environment) -> &str {
        let host = match environment {
            Environment::Production => &self.production_host,
            Environment::Stage => &self.stage_host,
        };
        host.trim_end_matches('/')
    }
}

fn secs_var(name: &str, default: Duration) -> Result<Duration> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| RouterError::Config(format!("{} must be a whole number of seconds, got '{}'", name, raw))),
        Err(_) => Ok(default),
    }
}

fn home_dir() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parsing() {
        assert_eq!("production".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Stage".parse::<Environment>().unwrap(), Environment::Stage);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn test_host_strips_trailing_slash() {
        let config = RouterConfig {
            stage_host: "http://localhost:9000/".to_string(),
            ..RouterConfig::default()
        };
        assert_eq!(config.host(Environment::Stage), "http://localhost:9000");
        assert_eq!(config.host(Environment::Production), "https://cxassistant.cisco.com");
    }
}
