//! Rule-based parameter extraction
//!
//! Every parameter is extracted independently of the others, by the
//! strategy its [`ParamKind`] selects. Extraction is pure: the same message
//! and definitions always produce the same result.

use crate::catalog::ParameterDefinition;
use crate::lookup::{find_product_in, resolve_static};
use crate::params::{Candidate, ExtractedParameters, Extraction, ParamKind};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

lazy_static! {
    static ref DEAL_ID: Regex = Regex::new(r"(?i)\bD-\d+\b").unwrap();
    static ref OPPORTUNITY_ID: Regex = Regex::new(r"\b\d{8,}\b").unwrap();
    static ref ACCOUNT_ID: Regex = Regex::new(r"\b([A-Z0-9]{6,})\b").unwrap();
    static ref CUSTOMER_ID: Regex = Regex::new(r"\b(\d{5,6})\b").unwrap();
    static ref CUSTOMER_TEXT: Regex =
        Regex::new(r"(?i)\b(?:for|of)\s+([A-Za-z][^\n,?]+)").unwrap();
    static ref CUSTOMER_SUFFIX: Regex =
        Regex::new(r"(?i)\s+(?:CAV BU|product|deal|service)\s*$").unwrap();
    static ref DEPLOYMENT_HINT: Regex = Regex::new(r"(?i)\bdeployment\s+(\S+)").unwrap();
    static ref FEATURE_HINT: Regex = Regex::new(r"(?i)\bfeature\s+([A-Za-z][^\n,?]*)").unwrap();
}

const OUTCOME_KEYWORDS: &[&str] = &[
    "secure access",
    "secure network",
    "secure endpoint",
    "network automation",
    "network visibility",
    "collaboration",
    "data center",
    "cloud security",
    "threat defense",
];

/// Extract every parameter in `defs` from `message`.
pub fn extract_parameters(message: &str, defs: &[ParameterDefinition]) -> ExtractedParameters {
    defs.iter()
        .map(|def| {
            let extraction = extract_one(message, def);
            debug!("Extracted '{}': {:?}", def.name, extraction);
            (def.name.clone(), extraction)
        })
        .collect()
}

fn extract_one(message: &str, def: &ParameterDefinition) -> Extraction {
    let found = match ParamKind::of(def) {
        ParamKind::DealId => DEAL_ID
            .find(message)
            .map(|m| Extraction::Resolved(Candidate::same(m.as_str().to_uppercase()))),
        ParamKind::OpportunityId => identifier(&OPPORTUNITY_ID, message),
        ParamKind::AccountId => identifier(&ACCOUNT_ID, message),
        ParamKind::Customer => extract_customer(message),
        ParamKind::Product => find_product_in(message).map(Extraction::Resolved),
        ParamKind::StaticSelect => extract_static(message, def).map(Extraction::Resolved),
        ParamKind::Deployment => Some(remote_hint(deployment_hint(message))),
        ParamKind::Outcome => Some(remote_hint(outcome_hint(message))),
        ParamKind::Feature => Some(remote_hint(feature_hint(message))),
        ParamKind::Remote => Some(Extraction::AutoResolve),
        ParamKind::Unsupported => {
            debug!("No extraction strategy for parameter '{}'", def.name);
            None
        }
    };
    found.unwrap_or(Extraction::Missing)
}

fn identifier(re: &Regex, message: &str) -> Option<Extraction> {
    re.find(message)
        .map(|m| Extraction::Resolved(Candidate::same(m.as_str())))
}

fn remote_hint(hint: Option<String>) -> Extraction {
    match hint {
        Some(hint) => Extraction::NeedsResolution(Candidate::same(hint)),
        None => Extraction::AutoResolve,
    }
}

/// A bare 5-6 digit CAV BU id is taken as-is. Otherwise the text after
/// "for"/"of" is a name to confirm against the customer directory.
fn extract_customer(message: &str) -> Option<Extraction> {
    let numeric = CUSTOMER_ID.find_iter(message).find(|m| {
        // Digits of an id like D-12345 belong to that id
        !message[..m.start()].ends_with('-')
    });
    if let Some(m) = numeric {
        return Some(Extraction::Resolved(Candidate::same(m.as_str())));
    }

    let caps = CUSTOMER_TEXT.captures(message)?;
    let raw = caps.get(1)?.as_str().trim();
    let name = CUSTOMER_SUFFIX.replace(raw, "");
    let name = name.trim().trim_end_matches('.').trim();
    if name.is_empty() {
        return None;
    }
    Some(Extraction::NeedsResolution(Candidate::same(name)))
}

/// Catalog-declared options first, then the global table for this name.
fn extract_static(message: &str, def: &ParameterDefinition) -> Option<Candidate> {
    let lower = message.to_lowercase();
    let mentioned = |text: &str| {
        let text = text.to_lowercase();
        !text.is_empty() && lower.contains(&text)
    };

    def.options
        .iter()
        .find(|opt| mentioned(&opt.value) || mentioned(&opt.label))
        .map(|opt| Candidate::new(opt.label.clone(), opt.value.clone()))
        .or_else(|| resolve_static(&def.name, message))
}

fn deployment_hint(message: &str) -> Option<String> {
    if message.to_lowercase().contains("primary") {
        return Some("primary".to_string());
    }
    DEPLOYMENT_HINT
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
}

fn outcome_hint(message: &str) -> Option<String> {
    let lower = message.to_lowercase();
    OUTCOME_KEYWORDS
        .iter()
        .find(|kw| lower.contains(*kw))
        .map(|kw| kw.to_string())
}

fn feature_hint(message: &str) -> Option<String> {
    FEATURE_HINT
        .captures(message)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|hint| !hint.is_empty())
}
