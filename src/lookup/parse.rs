//! Normalization of the lookup endpoints' response shapes into
//! [`LookupOption`] lists.

use crate::lookup::LookupOption;
use serde_json::Value;

const ATTRIBUTE_KEYS: [&str; 2] = ["customer_market_segment", "customer_industry_vertical"];

/// Convert a lookup response body into options.
///
/// Handles the deployment list's `deploymentList` array, the customer
/// attribute object, and plain `results`/`data` arrays. Anything else
/// yields an empty list.
pub fn parse_options(data: &Value) -> Vec<LookupOption> {
    if let Some(deployments) = data.get("deploymentList") {
        return deployments
            .as_array()
            .map(|list| parse_deployment_list(list))
            .unwrap_or_default();
    }

    let results = data.get("results").or_else(|| data.get("data"));
    match results {
        Some(Value::Array(items)) => items.iter().map(normalize_item).collect(),
        Some(Value::Object(obj)) => {
            let attrs = obj.get("attributes").and_then(Value::as_object);
            attrs
                .and_then(|attrs| {
                    ATTRIBUTE_KEYS
                        .iter()
                        .find_map(|key| attrs.get(*key).and_then(Value::as_array))
                })
                .map(|values| {
                    values
                        .iter()
                        .map(|v| {
                            let text = display(v);
                            LookupOption::new(text.clone(), text)
                        })
                        .collect()
                })
                .unwrap_or_default()
        }
        _ => Vec::new(),
    }
}

/// Customer search returns `results` as strings or label/value objects.
pub fn parse_customer_results(data: &Value) -> Vec<LookupOption> {
    match data.get("results") {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::Object(obj) => LookupOption::new(
                    obj.get("label").map(display).unwrap_or_else(|| item.to_string()),
                    obj.get("value").map(display).unwrap_or_else(|| item.to_string()),
                ),
                other => {
                    let text = display(other);
                    LookupOption::new(text.clone(), text)
                }
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// First present, non-empty field among `keys`
fn first_field(obj: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .filter(|v| !v.is_null())
        .map(display)
        .find(|s| !s.is_empty())
}

fn normalize_item(item: &Value) -> LookupOption {
    let Value::Object(obj) = item else {
        let text = display(item);
        return LookupOption::new(text.clone(), text);
    };
    let fallback = item.to_string();
    let label = first_field(obj, &["label", "OUTCOME_SUMMARY", "name"])
        .unwrap_or_else(|| fallback.clone());
    let value = first_field(obj, &["value", "OUTCOME_ID", "OUTCOME_SUMMARY", "name"])
        .unwrap_or(fallback);
    LookupOption::new(label, value)
}

fn truthy(v: Option<&Value>) -> bool {
    match v {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"),
        Some(Value::Number(n)) => n.as_i64() == Some(1),
        _ => false,
    }
}

/// Deployment entries carry `deploymentName`, `partyName`, `city` and
/// `isPrimaryFlag`; they are labelled `name | party | city`.
fn parse_deployment_list(list: &[Value]) -> Vec<LookupOption> {
    list.iter()
        .filter_map(Value::as_object)
        .map(|dep| {
            let field = |k: &str| dep.get(k).and_then(Value::as_str).unwrap_or("").to_string();
            let name = field("deploymentName");
            let is_primary = truthy(dep.get("isPrimaryFlag"));
            let mut label = format!("{} | {} | {}", name, field("partyName"), field("city"));
            if is_primary {
                label = format!("[Primary] {}", label);
            }
            LookupOption {
                label,
                value: name,
                is_primary,
            }
        })
        .collect()
}
