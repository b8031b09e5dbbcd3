//! Remote option lookups
//!
//! The gateway trait is the seam between resolution logic and the HTTP
//! lookup endpoints. Failures never surface as errors here; they come back
//! as [`LookupOutcome::Failed`] so the resolver can treat a failed lookup
//! like an empty one.

pub mod gateway;
pub mod parse;
pub mod tables;

use crate::config::Environment;
use crate::credentials::Credentials;
use crate::params::Candidate;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

pub use gateway::HttpLookupGateway;
pub use tables::{find_product_in, lookup_endpoint, resolve_static};

/// Request body sent to a lookup endpoint.
pub type LookupBody = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupEndpoint {
    pub path: &'static str,
    pub method: HttpMethod,
}

/// One entry of a remote option list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOption {
    pub label: String,
    pub value: String,
    /// Only set for deployment lists
    pub is_primary: bool,
}

impl LookupOption {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            is_primary: false,
        }
    }

    pub fn primary(mut self) -> Self {
        self.is_primary = true;
        self
    }

    pub fn to_candidate(&self) -> Candidate {
        Candidate::new(self.label.clone(), self.value.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    Transport(String),
    Status(u16),
    Malformed(String),
}

impl fmt::Display for LookupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LookupFailure::Transport(e) => write!(f, "transport error: {}", e),
            LookupFailure::Status(code) => write!(f, "HTTP {}", code),
            LookupFailure::Malformed(e) => write!(f, "malformed response: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Options(Vec<LookupOption>),
    Failed(LookupFailure),
}

impl LookupOutcome {
    /// Options on success, empty on failure
    pub fn options(&self) -> &[LookupOption] {
        match self {
            LookupOutcome::Options(opts) => opts,
            LookupOutcome::Failed(_) => &[],
        }
    }

    pub fn failure(&self) -> Option<&LookupFailure> {
        match self {
            LookupOutcome::Failed(f) => Some(f),
            LookupOutcome::Options(_) => None,
        }
    }
}

#[async_trait]
pub trait LookupGateway: Send + Sync {
    /// Fetch the option list behind `endpoint`. `context_id` is the backend
    /// question id the lookup is made on behalf of.
    async fn fetch_options(
        &self,
        environment: Environment,
        endpoint: LookupEndpoint,
        context_id: &str,
        body: &LookupBody,
        credentials: &Credentials,
    ) -> LookupOutcome;

    /// Search the customer directory by name, CAV BU id or SAV id.
    async fn search_customers(
        &self,
        environment: Environment,
        context_id: &str,
        search_text: &str,
        credentials: &Credentials,
    ) -> LookupOutcome;
}

/// Match a user hint against remote options: exact label/value first, then
/// containment either way. For deployment lists a hint mentioning "primary"
/// selects the primary deployment before anything else.
pub fn match_hint<'a>(
    options: &'a [LookupOption],
    hint: &str,
    deployments: bool,
) -> Option<&'a LookupOption> {
    let t = hint.trim().to_lowercase();
    if t.is_empty() {
        return None;
    }

    if deployments && t.contains("primary") {
        if let Some(opt) = options.iter().find(|o| o.is_primary) {
            return Some(opt);
        }
    }

    options
        .iter()
        .find(|o| t == o.value.to_lowercase() || t == o.label.to_lowercase())
        .or_else(|| {
            options
                .iter()
                .find(|o| tables::overlaps(&o.label, &t) || tables::overlaps(&o.value, &t))
        })
}

/// Pick a default option without user input. Deployments prefer the primary
/// one (flagged, or labelled "primary"); everything else takes the first
/// option in the order the endpoint returned them.
pub fn auto_select(options: &[LookupOption], prefer_primary: bool) -> Option<&LookupOption> {
    if prefer_primary {
        let primary = options.iter().find(|o| o.is_primary).or_else(|| {
            options
                .iter()
                .find(|o| o.label.to_lowercase().contains("primary"))
        });
        if primary.is_some() {
            return primary;
        }
    }
    options.first()
}
