//! Dependency-ordered resolution of extracted parameters against the remote
//! lookup endpoints.
//!
//! Parameters are resolved one at a time in
//! [`RESOLVE_ORDER`](crate::lookup::tables::RESOLVE_ORDER) so that a
//! lookup can be filtered by values resolved before it (deployments by
//! customer and product, outcomes by deployment). A failure resolving one
//! parameter only marks that parameter unresolved.

use crate::catalog::QuestionDefinition;
use crate::config::Environment;
use crate::credentials::Credentials;
use crate::error::{Result, RouterError};
use crate::lookup::tables::{fallback_dependencies, fallback_field_name, resolve_rank};
use crate::lookup::{
    auto_select, lookup_endpoint, match_hint, LookupBody, LookupGateway, LookupOption,
    LookupOutcome,
};
use crate::params::{
    is_deployment_param, is_outcome_param, Candidate, ExtractedParameters, Extraction,
    ParamValue, ParameterMap, ResolvedParameter,
};
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

lazy_static! {
    static ref TRANSFORM_VALUE_FIELD: Regex = Regex::new(r"'value'\s*:\s*\$\.(\w+)").unwrap();
}

const OUTCOME_SUMMARY: &str = "OUTCOME_SUMMARY";

/// Result of resolving one question's parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    pub parameters: ParameterMap,
    /// Names that were missing or could not be confirmed, in resolution order
    pub unresolved: Vec<String>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.unresolved.is_empty()
    }
}

pub struct RemoteResolver {
    gateway: Arc<dyn LookupGateway>,
    lookup_timeout: Duration,
}

impl RemoteResolver {
    pub fn new(gateway: Arc<dyn LookupGateway>, lookup_timeout: Duration) -> Self {
        Self {
            gateway,
            lookup_timeout,
        }
    }

    pub async fn resolve(
        &self,
        environment: Environment,
        question: &QuestionDefinition,
        extracted: &ExtractedParameters,
        credentials: &Credentials,
    ) -> Resolution {
        let mut ordered: Vec<(&str, &Extraction)> = extracted.iter().collect();
        ordered.sort_by_key(|(name, _)| resolve_rank(name));

        let mut resolution = Resolution::default();
        for (name, extraction) in ordered {
            if extraction.is_missing() {
                debug!("Parameter '{}' is missing", name);
                resolution.unresolved.push(name.to_string());
                continue;
            }

            let attempt = tokio::time::timeout(
                self.lookup_timeout,
                self.resolve_one(
                    environment,
                    question,
                    name,
                    extraction,
                    &resolution.parameters,
                    credentials,
                ),
            )
            .await
            .unwrap_or_else(|_| Err(RouterError::LookupTimeout(name.to_string())));

            match attempt {
                Ok(candidate) => {
                    let resolved = finalize(question, name, candidate);
                    info!("Resolved '{}' to '{}'", name, resolved.label);
                    resolution.parameters.insert(name.to_string(), resolved);
                }
                Err(e) => {
                    warn!("Could not resolve '{}': {}", name, e);
                    resolution.unresolved.push(name.to_string());
                }
            }
        }
        resolution
    }

    async fn resolve_one(
        &self,
        environment: Environment,
        question: &QuestionDefinition,
        name: &str,
        extraction: &Extraction,
        resolved: &ParameterMap,
        credentials: &Credentials,
    ) -> Result<Candidate> {
        let deployments = is_deployment_param(name);
        match extraction {
            Extraction::Missing => Err(lookup_error(name, "no value found in the message")),

            Extraction::NeedsResolution(hint) if name == "customerName" => {
                let outcome = self
                    .gateway
                    .search_customers(
                        environment,
                        &question.backend_question_id,
                        &hint.label,
                        credentials,
                    )
                    .await;
                let options = into_options(name, outcome)?;
                options
                    .first()
                    .map(LookupOption::to_candidate)
                    .ok_or_else(|| lookup_error(name, format!("no customer matches '{}'", hint.label)))
            }

            Extraction::AutoResolve => {
                let options = self
                    .fetch(environment, question, name, resolved, credentials)
                    .await?;
                auto_select(&options, deployments)
                    .map(LookupOption::to_candidate)
                    .ok_or_else(|| lookup_error(name, "no options to choose from"))
            }

            Extraction::NeedsResolution(hint) => {
                let options = self
                    .fetch(environment, question, name, resolved, credentials)
                    .await?;
                match_hint(&options, &hint.label, deployments)
                    .or_else(|| {
                        if is_outcome_param(name) {
                            debug!("No outcome matches '{}', auto-selecting", hint.label);
                            auto_select(&options, false)
                        } else {
                            None
                        }
                    })
                    .map(LookupOption::to_candidate)
                    .ok_or_else(|| lookup_error(name, format!("no option matches '{}'", hint.label)))
            }

            Extraction::Resolved(candidate) => {
                let remote = question.parameter(name).map_or(false, |d| d.is_remote());
                if !remote || lookup_endpoint(&question.agent, name).is_none() {
                    return Ok(candidate.clone());
                }
                let hint = if candidate.label.is_empty() {
                    &candidate.value
                } else {
                    &candidate.label
                };
                let options = self
                    .fetch(environment, question, name, resolved, credentials)
                    .await?;
                match_hint(&options, hint, deployments)
                    .map(LookupOption::to_candidate)
                    .ok_or_else(|| lookup_error(name, format!("no option matches '{}'", hint)))
            }
        }
    }

    /// Fetch the full option list for `name`, filtered by its dependencies.
    async fn fetch(
        &self,
        environment: Environment,
        question: &QuestionDefinition,
        name: &str,
        resolved: &ParameterMap,
        credentials: &Credentials,
    ) -> Result<Vec<LookupOption>> {
        let endpoint = lookup_endpoint(&question.agent, name).ok_or_else(|| {
            lookup_error(
                name,
                format!("no lookup endpoint for agent '{}'", question.agent),
            )
        })?;
        let body = build_dependency_body(question, resolved, name).unwrap_or_default();
        debug!("Fetching options for '{}' from {} with {:?}", name, endpoint.path, body);

        let outcome = self
            .gateway
            .fetch_options(
                environment,
                endpoint,
                &question.backend_question_id,
                &body,
                credentials,
            )
            .await;
        into_options(name, outcome)
    }
}

fn lookup_error(name: &str, message: impl Into<String>) -> RouterError {
    RouterError::Lookup {
        param: name.to_string(),
        message: message.into(),
    }
}

fn into_options(name: &str, outcome: LookupOutcome) -> Result<Vec<LookupOption>> {
    match outcome {
        LookupOutcome::Options(options) if options.is_empty() => {
            Err(lookup_error(name, "lookup returned no options"))
        }
        LookupOutcome::Options(options) => Ok(options),
        LookupOutcome::Failed(failure) => Err(lookup_error(name, failure.to_string())),
    }
}

/// Some questions send the outcome summary text as the parameter value
/// instead of the outcome id; their result transform says so.
pub fn uses_summary_as_value(question: &QuestionDefinition, name: &str) -> bool {
    question
        .parameter(name)
        .and_then(|d| d.api.as_ref())
        .and_then(|api| api.transform.as_deref())
        .and_then(|t| TRANSFORM_VALUE_FIELD.captures(t))
        .and_then(|c| c.get(1))
        .map_or(false, |m| m.as_str() == OUTCOME_SUMMARY)
}

fn finalize(question: &QuestionDefinition, name: &str, candidate: Candidate) -> ResolvedParameter {
    let Candidate { label, value } = candidate;
    let value = if is_outcome_param(name) && uses_summary_as_value(question, name) {
        label.clone()
    } else {
        value
    };

    let mut resolved = ResolvedParameter::new(label, value);
    if question.parameter(name).map_or(false, |d| d.multiple) {
        resolved.value = resolved.value.into_many();
    }
    resolved
}

/// Value already resolved for `source`, reading across the
/// `deployment`/`deploymentList` pair when only one of them is present.
fn resolved_value<'a>(resolved: &'a ParameterMap, source: &str) -> Option<&'a ParamValue> {
    resolved
        .get(source)
        .or_else(|| match source {
            "deploymentList" => resolved.get("deployment"),
            "deployment" => resolved.get("deploymentList"),
            _ => None,
        })
        .map(|p| &p.value)
}

/// Request body for `name`'s lookup, built from parameters resolved so far.
///
/// Explicit API bindings on the parameter definition take precedence; each
/// body field is either a constant or copied from a resolved parameter. When
/// the binding yields nothing, the fixed fallback dependency rules apply.
/// Returns `None` when there is nothing to send.
pub fn build_dependency_body(
    question: &QuestionDefinition,
    resolved: &ParameterMap,
    name: &str,
) -> Option<LookupBody> {
    let mut body = LookupBody::new();

    if let Some(api) = question.parameter(name).and_then(|d| d.api.as_ref()) {
        for (key, field) in &api.params {
            if let Some(constant) = &field.value {
                body.insert(key.clone(), constant.clone());
                continue;
            }
            let Some(source) = field.field_name.as_deref() else {
                continue;
            };
            let Some(value) = resolved_value(resolved, source) else {
                continue;
            };
            let value = if field.wants_array() || key == "deploymentList" {
                value.clone().into_many()
            } else {
                value.clone()
            };
            body.insert(key.clone(), value.to_json());
        }
        if !body.is_empty() {
            return Some(body);
        }
    }

    for dep in fallback_dependencies(name) {
        let value = match *dep {
            "deploymentList" => resolved_value(resolved, dep).map(|v| v.clone().into_many()),
            _ => resolved.get(*dep).map(|p| p.value.clone()),
        };
        if let Some(value) = value {
            body.insert(fallback_field_name(name, dep).to_string(), value.to_json());
        }
    }

    if body.is_empty() {
        None
    } else {
        Some(body)
    }
}
