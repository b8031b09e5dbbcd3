//! Parameter values flowing from extraction through resolution to the
//! outbound request.

use crate::catalog::{ParamSubtype, ParameterDefinition};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value sent to the backend: a single string or, for `multiple`
/// parameters, a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Single(String),
    Many(Vec<String>),
}

impl ParamValue {
    pub fn into_many(self) -> Self {
        match self {
            ParamValue::Single(v) => ParamValue::Many(vec![v]),
            many => many,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ParamValue::Single(v) => serde_json::Value::String(v.clone()),
            ParamValue::Many(vs) => serde_json::Value::from(vs.clone()),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Single(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Single(v)
    }
}

/// A parameter ready to be placed in the outbound request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedParameter {
    pub label: String,
    pub value: ParamValue,
    #[serde(default)]
    pub hidden: bool,
}

impl ResolvedParameter {
    pub fn new(label: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            hidden: false,
        }
    }
}

/// Final parameter map, keyed by parameter name.
pub type ParameterMap = BTreeMap<String, ResolvedParameter>;

/// Display label plus backend value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub label: String,
    pub value: String,
}

impl Candidate {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }

    /// Label and value are the same text
    pub fn same(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            label: text.clone(),
            value: text,
        }
    }
}

/// Outcome of extracting one parameter from the user message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Nothing found; the request cannot proceed without it
    Missing,
    /// Fully determined locally
    Resolved(Candidate),
    /// Raw text that must be confirmed against a remote list
    NeedsResolution(Candidate),
    /// No hint in the message; pick a default from the remote list
    AutoResolve,
}

impl Extraction {
    pub fn is_missing(&self) -> bool {
        matches!(self, Extraction::Missing)
    }

    pub fn candidate(&self) -> Option<&Candidate> {
        match self {
            Extraction::Resolved(c) | Extraction::NeedsResolution(c) => Some(c),
            Extraction::Missing | Extraction::AutoResolve => None,
        }
    }
}

/// Per-parameter extraction results in parameter-definition order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedParameters {
    entries: Vec<(String, Extraction)>,
}

impl ExtractedParameters {
    pub fn insert(&mut self, name: impl Into<String>, extraction: Extraction) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = extraction,
            None => self.entries.push((name, extraction)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Extraction> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, e)| e)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Extraction)> {
        self.entries.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn missing(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, e)| e.is_missing())
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, Extraction)> for ExtractedParameters {
    fn from_iter<I: IntoIterator<Item = (String, Extraction)>>(iter: I) -> Self {
        let mut out = Self::default();
        for (name, extraction) in iter {
            out.insert(name, extraction);
        }
        out
    }
}

/// Closed set of extraction strategies. Chosen from the parameter's name
/// first and its declared subtype second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    DealId,
    OpportunityId,
    AccountId,
    Customer,
    Product,
    StaticSelect,
    Deployment,
    Outcome,
    Feature,
    /// Remote-select parameter with no hint heuristic
    Remote,
    /// No strategy applies
    Unsupported,
}

impl ParamKind {
    pub fn of(def: &ParameterDefinition) -> Self {
        match def.name.as_str() {
            "dealId" => return ParamKind::DealId,
            "opportunityId" => return ParamKind::OpportunityId,
            "accountId" => return ParamKind::AccountId,
            "customerName" => return ParamKind::Customer,
            "productName" => return ParamKind::Product,
            _ => {}
        }
        if crate::lookup::tables::has_static_options(&def.name) || def.subtype == ParamSubtype::Static
        {
            return ParamKind::StaticSelect;
        }
        if def.subtype == ParamSubtype::Remote {
            return match def.name.as_str() {
                n if is_deployment_param(n) => ParamKind::Deployment,
                n if is_outcome_param(n) => ParamKind::Outcome,
                "featureName" => ParamKind::Feature,
                _ => ParamKind::Remote,
            };
        }
        ParamKind::Unsupported
    }
}

pub fn is_deployment_param(name: &str) -> bool {
    matches!(name, "deployment" | "deploymentList")
}

pub fn is_outcome_param(name: &str) -> bool {
    matches!(name, "outcome" | "outcomes")
}
