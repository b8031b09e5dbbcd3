//! Message routing without any network: match a question, extract its
//! parameters and report what is missing.

use crate::catalog::QuestionDefinition;
use crate::extractor::extract_parameters;
use crate::fuzzy_matcher::QuestionMatcher;
use crate::params::ExtractedParameters;
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref PARAM_EXAMPLES: HashMap<&'static str, &'static str> = [
        ("dealId", "D-12345"),
        ("customerName", "Acme Corp or CAV BU ID like 104461"),
        ("productName", "Duo, Umbrella, ISE, Secure Firewall, etc."),
        ("accountId", "your Splunk account ID"),
        ("service", "Advanced Services or Technical Services"),
        ("deployment", "the deployment name"),
        ("featureName", "the feature name"),
        ("outcome", "the adoption outcome"),
        ("outcomes", "one or more adoption outcomes"),
        ("timeframe", "current quarter, last quarter, last 3 quarters, or 1 year"),
        ("tacSentimentTimePeriod", "current quarter, last quarter, or previous 2 quarters"),
        ("subscriptionTimeframe", "0-90 days, 91-180 days, or 181-360 days"),
        ("region", "Americas, EMEAR, or APJC"),
        ("comparison", "region, market segment, or industry vertical"),
        ("forecastStatuses", "Commit, Upside, or Most Likely"),
        ("metricType", "feature adoption metrics or usage/scale metrics"),
        ("opportunityId", "the opportunity ID number"),
        ("fiscalQuarter", "a fiscal quarter"),
        ("fiscalQuarters", "one or more fiscal quarters"),
        ("businessEntity", "a business entity"),
        ("stages", "one or more deal stages"),
        ("riskFactor", "a risk factor name"),
        ("renewalProgramLead", "a renewal program lead"),
        ("consumptionValue", "an EA consumption value range"),
        ("pmg", "a product mapping group"),
        ("vertical", "an industry vertical"),
        ("marketSegment", "a market segment"),
        ("deploymentList", "a deployment for the plan"),
    ]
    .into_iter()
    .collect();
}

pub fn param_example(name: &str) -> &'static str {
    PARAM_EXAMPLES.get(name).copied().unwrap_or("a valid value")
}

/// User-facing message naming each missing parameter with an example value.
pub fn build_routing_error(question: &QuestionDefinition, missing: &[String]) -> String {
    let mut lines = vec![
        format!("Found question: '{}'", question.label),
        "Missing required parameters:".to_string(),
    ];
    for name in missing {
        lines.push(format!("  - {}: e.g. {}", name, param_example(name)));
    }
    lines.push(String::new());
    lines.push("Please include these values in your question and try again.".to_string());
    lines.join("\n")
}

/// Outcome of routing a message locally.
#[derive(Debug, Clone)]
pub enum Route<'a> {
    /// Nothing in the catalog scored above the threshold
    NoMatch,
    /// Matched, but some parameters could not be extracted
    Incomplete {
        question: &'a QuestionDefinition,
        missing: Vec<String>,
    },
    /// Matched with every parameter extracted or pending remote resolution
    Ready {
        question: &'a QuestionDefinition,
        score: f64,
        extracted: ExtractedParameters,
    },
}

/// Match `message` against the catalog and extract the question's parameters.
pub fn route<'a>(matcher: &QuestionMatcher<'a>, message: &str, threshold: u8) -> Route<'a> {
    let Some(found) = matcher.find_best(message, threshold) else {
        return Route::NoMatch;
    };
    let question = found.question;

    let extracted = extract_parameters(message, &question.parameters);
    let missing = extracted.missing();
    if !missing.is_empty() {
        tracing::info!(
            "Question '{}' is missing parameters: {}",
            question.id,
            missing.join(", ")
        );
        return Route::Incomplete { question, missing };
    }

    Route::Ready {
        question,
        score: found.score,
        extracted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    fn catalog() -> Catalog {
        Catalog::from_json_str(
            r#"{"questions": [
                {"id": "risk", "label": "Summarize the renewal risk of a deal",
                 "questionTemplate": "What is the renewal risk for deal {dealId}?",
                 "agent": "renewals", "backendQuestionId": "q2",
                 "parameters": [{"name": "dealId"}]},
                {"id": "tac", "label": "TAC sentiment for a customer",
                 "questionTemplate": "TAC case sentiment for {customerName} over {tacSentimentTimePeriod}",
                 "agent": "renewals", "backendQuestionId": "sentimentQ3",
                 "parameters": [{"name": "customerName", "subtype": "remote"},
                                {"name": "tacSentimentTimePeriod", "subtype": "static"},
                                {"name": "mystery"}]}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn test_build_routing_error() {
        let catalog = catalog();
        let question = catalog.get("risk").unwrap();
        let message = build_routing_error(
            question,
            &["dealId".to_string(), "somethingElse".to_string()],
        );
        assert_eq!(
            message,
            "Found question: 'Summarize the renewal risk of a deal'\n\
             Missing required parameters:\n  \
             - dealId: e.g. D-12345\n  \
             - somethingElse: e.g. a valid value\n\
             \n\
             Please include these values in your question and try again."
        );
    }

    #[test]
    fn test_route_ready() {
        let catalog = catalog();
        let matcher = QuestionMatcher::new(&catalog);
        match route(&matcher, "What is the renewal risk for deal d-12345?", 50) {
            Route::Ready {
                question, extracted, ..
            } => {
                assert_eq!(question.agent, "renewals");
                assert_eq!(
                    extracted.get("dealId").unwrap().candidate().unwrap().value,
                    "D-12345"
                );
            }
            other => panic!("unexpected route {:?}", other),
        }
    }

    #[test]
    fn test_route_incomplete_and_no_match() {
        let catalog = catalog();
        let matcher = QuestionMatcher::new(&catalog);
        match route(&matcher, "TAC sentiment for a customer", 50) {
            Route::Incomplete { question, missing } => {
                assert_eq!(question.id, "tac");
                assert_eq!(missing, vec!["tacSentimentTimePeriod", "mystery"]);
            }
            other => panic!("unexpected route {:?}", other),
        }
        assert!(matches!(
            route(&matcher, "zzzz qqqq xxxx", 90),
            Route::NoMatch
        ));
    }
}
