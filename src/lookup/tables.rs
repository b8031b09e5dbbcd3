//! Fixed lookup tables: products, static select options, lookup endpoints
//! and fallback dependency rules.

use crate::lookup::{HttpMethod, LookupEndpoint};
use crate::params::Candidate;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

/// API key -> display label, in catalog order.
pub const PRODUCTS: &[(&str, &str)] = &[
    ("COLLAB", "Collaboration"),
    ("CROSSWORK_CLOUD", "Crosswork Cloud"),
    ("CROSSWORK_NETWORK_CONTROLLER", "Crosswork Network Controller"),
    ("DEFENSE_ORCHESTRATOR", "Defense Orchestrator"),
    ("DUO", "Duo"),
    ("ENTERPRISE_SWITCHING", "Enterprise Switching"),
    ("EPP", "Endpoint Protection Platform (EPP)"),
    ("EVOLVED_PROGRAMMABLE_NETWORK_MANAGER", "Evolved Programmable Network Manager"),
    ("INTERSIGHT", "Intersight"),
    ("IOS_XR_FLEXIBLE_CONSUMPTION_MODEL", "IOS XR Flexible Consumption Model"),
    ("ISE", "Identity Services Engine (ISE)"),
    ("NETWORK_SERVICE_ORCHESTRATOR", "Network Service Orchestrator"),
    ("NX3K", "Nexus 3k"),
    ("NX9K", "Nexus 9k"),
    ("SAN", "Storage Area Network (SAN)"),
    ("SD-WAN", "Software-Defined Wide Area Network (SDWAN)"),
    ("SECURE_CLIENT", "Secure Client"),
    ("SECURE_EMAIL", "Secure Email"),
    ("SECURE_FIREWALL", "Secure Firewall"),
    ("SECURE_MALWARE_ANALYTICS", "Secure Malware Analytics"),
    ("SECURE_WEB_APPLIANCE", "Secure Web Appliance"),
    ("UMBRELLA", "Umbrella"),
    ("VULNERABILITY_MANAGEMENT", "Vulnerability Management"),
    ("WIRELESS", "Wireless"),
];

/// Short names users type for products, matched as whole words.
pub const PRODUCT_ALIASES: &[(&str, &str)] = &[
    ("duo", "DUO"),
    ("umbrella", "UMBRELLA"),
    ("ise", "ISE"),
    ("intersight", "INTERSIGHT"),
    ("wireless", "WIRELESS"),
    ("collab", "COLLAB"),
    ("sd-wan", "SD-WAN"),
    ("sdwan", "SD-WAN"),
    ("firewall", "SECURE_FIREWALL"),
    ("epp", "EPP"),
    ("nexus 9k", "NX9K"),
    ("nexus 3k", "NX3K"),
    ("san", "SAN"),
];

pub fn product_label(key: &str) -> Option<&'static str> {
    PRODUCTS.iter().find(|(k, _)| *k == key).map(|(_, l)| *l)
}

fn product(key: &str, label: &str) -> Candidate {
    Candidate::new(label, key)
}

lazy_static! {
    static ref STATIC_OPTIONS: HashMap<&'static str, Vec<Candidate>> = {
        let opts = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(label, value)| Candidate::new(*label, *value))
                .collect::<Vec<_>>()
        };
        let mut m = HashMap::new();
        m.insert(
            "service",
            opts(&[
                ("Advanced Services", "advanced services"),
                ("Technical Services", "technical services"),
            ]),
        );
        m.insert(
            "tacSentimentTimePeriod",
            opts(&[
                ("Current quarter", "current quarter"),
                ("Last quarter", "last quarter"),
                ("Previous 2 quarters", "last 2 quarters"),
            ]),
        );
        m.insert(
            "timeframe",
            opts(&[
                ("Current quarter", "current quarter"),
                ("Last quarter", "last quarter"),
                ("Last 3 quarters", "last 3 quarters"),
                ("1 year", "1 year"),
            ]),
        );
        m.insert(
            "subscriptionTimeframe",
            opts(&[
                ("0-90 days", "0-90 days"),
                ("91-180 days", "91-180 days"),
                ("181-360 days", "181-360 days"),
            ]),
        );
        m.insert(
            "comparison",
            opts(&[
                ("Region", "region"),
                ("Market Segment", "market segment"),
                ("Industry Vertical", "industry vertical"),
            ]),
        );
        m.insert(
            "region",
            opts(&[("Americas", "Americas"), ("EMEAR", "EMEAR"), ("APJC", "APJC")]),
        );
        m.insert(
            "forecastStatuses",
            opts(&[("Commit", "Commit"), ("Upside", "Upside"), ("Most Likely", "Most Likely")]),
        );
        m.insert(
            "metricType",
            opts(&[
                ("Feature adoption metrics", "AdoptionMetrics"),
                ("Usage/scale metrics", "UsageMetrics"),
            ]),
        );
        m
    };
}

pub fn has_static_options(param_name: &str) -> bool {
    STATIC_OPTIONS.contains_key(param_name)
}

pub fn static_options(param_name: &str) -> &'static [Candidate] {
    STATIC_OPTIONS
        .get(param_name)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Match text against the global static options for `param_name`: exact
/// first, then containment either way, checking value before label.
pub fn resolve_static(param_name: &str, text: &str) -> Option<Candidate> {
    let options = static_options(param_name);
    let t = text.trim().to_lowercase();
    if options.is_empty() || t.is_empty() {
        return None;
    }

    let exact = options.iter().find(|opt| {
        t == opt.value.to_lowercase() || t == opt.label.to_lowercase()
    });
    if exact.is_some() {
        return exact.cloned();
    }

    options
        .iter()
        .find(|opt| overlaps(&opt.value, &t) || overlaps(&opt.label, &t))
        .cloned()
}

/// Containment either way, ignoring empty fields. `needle` is lowercase.
pub(crate) fn overlaps(field: &str, needle: &str) -> bool {
    let f = field.to_lowercase();
    !f.is_empty() && (f.contains(needle) || needle.contains(&f))
}

const fn post(path: &'static str) -> LookupEndpoint {
    LookupEndpoint {
        path,
        method: HttpMethod::Post,
    }
}

const fn get(path: &'static str) -> LookupEndpoint {
    LookupEndpoint {
        path,
        method: HttpMethod::Get,
    }
}

pub const CUSTOMER_SEARCH_PATH: &str = "/api/renewals/customer_search";

const RENEWALS_ENDPOINTS: &[(&str, LookupEndpoint)] = &[
    ("productName", post("/api/renewals/get_product_name_list")),
    ("businessEntity", post("/api/renewals/get_business_entity_list")),
    ("businessEntities", post("/api/renewals/get_business_entity_list")),
    ("subBusinessEntity", post("/api/renewals/get_sub_business_entity_list")),
    ("subBusinessEntities", post("/api/renewals/get_sub_business_entity_list")),
    (
        "subBusinessServiceCategoryMultiSelect",
        post("/api/renewals/get_sub_business_entity_list"),
    ),
    ("metricName", post("/api/renewals/get_metric_name_list")),
    ("metrics", post("/api/renewals/get_metric_name_list")),
    ("marketSegment", post("/api/renewals/get_customer_attributes")),
    ("vertical", post("/api/renewals/get_customer_attributes")),
    ("pmg", post("/api/renewals/get_product_mapping_group_list")),
    ("fiscalQuarter", post("/api/renewals/get_fy_qtr_list")),
    ("fiscalQuarters", post("/api/renewals/get_fy_qtr_list")),
    ("riskFactor", get("/api/renewals/get_risk_factor_list")),
    ("stages", get("/api/renewals/get_stage_name_list")),
    ("consumptionValue", get("/api/renewals/get_ea_consumption_suite_value_range")),
    ("renewalProgramLead", get("/api/renewals/get_renewal_program_lead_list")),
    ("summaryCategory", get("/api/renewals/summary_category")),
    ("serviceOffer", post("/api/renewals/get_business_entity_list")),
    ("legacyServiceOffer", post("/api/renewals/get_business_entity_list")),
];

const ADOPTION_ENDPOINTS: &[(&str, LookupEndpoint)] = &[
    ("productName", post("/api/adoption/getProductNameList")),
    ("deployment", post("/api/adoption/getDeploymentList/v3")),
    ("deploymentList", post("/api/adoption/getDeploymentList/v3")),
    ("featureName", post("/api/adoption/getFeatureNameList")),
    ("outcome", post("/api/adoption/getOutcomeList/v3")),
    ("outcomes", post("/api/adoption/getOutcomeList/v3")),
];

/// Lookup endpoint for a parameter, chosen by the question's agent.
pub fn lookup_endpoint(agent: &str, param_name: &str) -> Option<LookupEndpoint> {
    let table = if agent == "adoption" {
        ADOPTION_ENDPOINTS
    } else {
        RENEWALS_ENDPOINTS
    };
    table
        .iter()
        .find(|(name, _)| *name == param_name)
        .map(|(_, endpoint)| *endpoint)
}

/// Prerequisite parameters used when the catalog declares no API binding.
pub fn fallback_dependencies(param_name: &str) -> &'static [&'static str] {
    match param_name {
        "deployment" | "deploymentList" | "featureName" | "metrics" => {
            &["customerName", "productName"]
        }
        "outcome" | "outcomes" => &["customerName", "productName", "deploymentList"],
        "marketSegment"
        | "vertical"
        | "subBusinessEntity"
        | "subBusinessEntities"
        | "subBusinessServiceCategoryMultiSelect" => &["customerName"],
        _ => &[],
    }
}

/// Body field name for a prerequisite in the fallback rules.
pub fn fallback_field_name<'a>(param_name: &str, dependency: &'a str) -> &'a str {
    match (param_name, dependency) {
        ("outcome" | "outcomes", "deploymentList") => "deployment",
        (
            "subBusinessEntity" | "subBusinessEntities" | "subBusinessServiceCategoryMultiSelect",
            "customerName",
        ) => "customer_hierarchy",
        ("subBusinessEntities", "businessEntities") => "business_entity",
        _ => dependency,
    }
}

/// Parameter names in resolution order. Later lookups are filtered by
/// values resolved earlier in this list.
pub const RESOLVE_ORDER: &[&str] = &[
    "customerName",
    "productName",
    "businessEntity",
    "businessEntities",
    "subBusinessEntity",
    "subBusinessEntities",
    "subBusinessServiceCategoryMultiSelect",
    "marketSegment",
    "vertical",
    "deployment",
    "deploymentList",
    "outcome",
    "outcomes",
    "featureName",
    "metrics",
];

pub fn resolve_rank(param_name: &str) -> usize {
    RESOLVE_ORDER
        .iter()
        .position(|n| *n == param_name)
        .unwrap_or(RESOLVE_ORDER.len())
}

lazy_static! {
    static ref ALIAS_PATTERNS: Vec<(Regex, &'static str)> = PRODUCT_ALIASES
        .iter()
        .filter_map(|(alias, key)| {
            Regex::new(&format!(r"\b{}\b", regex::escape(alias)))
                .ok()
                .map(|re| (re, *key))
        })
        .collect();
    static ref KEY_PATTERNS: Vec<(Regex, Regex, &'static str)> = PRODUCTS
        .iter()
        .filter_map(|(key, _)| {
            let exact = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(key))).ok()?;
            let spaced = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&key.replace('_', " ")))).ok()?;
            Some((exact, spaced, *key))
        })
        .collect();
}

fn labelled_product(key: &str) -> Option<Candidate> {
    product_label(key).map(|label| product(key, label))
}

/// Find a product mentioned anywhere in a message. Strategies in priority
/// order: API key as a word, key with spaces as a phrase, full label as a
/// substring, then short alias as a word.
pub fn find_product_in(message: &str) -> Option<Candidate> {
    let lower = message.to_lowercase();

    KEY_PATTERNS
        .iter()
        .find(|(exact, _, _)| exact.is_match(message))
        .or_else(|| KEY_PATTERNS.iter().find(|(_, spaced, _)| spaced.is_match(message)))
        .and_then(|(_, _, key)| labelled_product(key))
        .or_else(|| {
            PRODUCTS
                .iter()
                .find(|(_, label)| lower.contains(&label.to_lowercase()))
                .map(|(k, l)| product(k, l))
        })
        .or_else(|| {
            ALIAS_PATTERNS
                .iter()
                .find(|(re, _)| re.is_match(&lower))
                .and_then(|(_, key)| labelled_product(key))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_table_is_complete() {
        assert_eq!(PRODUCTS.len(), 24);
        for (_, key) in PRODUCT_ALIASES {
            assert!(product_label(key).is_some(), "alias target {} missing", key);
        }
    }

    #[test]
    fn test_resolve_static() {
        assert_eq!(
            resolve_static("service", "Advanced Services"),
            Some(Candidate::new("Advanced Services", "advanced services"))
        );
        assert_eq!(
            resolve_static("metricType", "usage"),
            Some(Candidate::new("Usage/scale metrics", "UsageMetrics"))
        );
        assert_eq!(
            resolve_static("comparison", "market segment"),
            Some(Candidate::new("Market Segment", "market segment"))
        );
        assert_eq!(resolve_static("region", "Antarctica"), None);
        assert_eq!(resolve_static("nonexistent_param", "anything"), None);
    }

    #[test]
    fn test_every_static_option_resolves_by_label() {
        for name in [
            "service",
            "tacSentimentTimePeriod",
            "timeframe",
            "subscriptionTimeframe",
            "comparison",
            "region",
            "forecastStatuses",
            "metricType",
        ] {
            for opt in static_options(name) {
                assert_eq!(resolve_static(name, &opt.label).unwrap().value, opt.value);
            }
        }
    }

    #[test]
    fn test_endpoint_tables_by_agent() {
        let deployment = lookup_endpoint("adoption", "deployment").unwrap();
        assert_eq!(deployment.path, "/api/adoption/getDeploymentList/v3");
        assert!(lookup_endpoint("renewals", "deployment").is_none());
        assert_eq!(
            lookup_endpoint("renewals", "stages").unwrap().method,
            HttpMethod::Get
        );
    }

    #[test]
    fn test_resolve_rank_sorts_unlisted_last() {
        assert!(resolve_rank("customerName") < resolve_rank("deployment"));
        assert!(resolve_rank("deployment") < resolve_rank("outcomes"));
        assert_eq!(resolve_rank("dealId"), RESOLVE_ORDER.len());
    }

    #[test]
    fn test_fallback_field_names() {
        assert_eq!(fallback_field_name("outcomes", "deploymentList"), "deployment");
        assert_eq!(
            fallback_field_name("subBusinessEntities", "businessEntities"),
            "business_entity"
        );
        assert_eq!(fallback_field_name("deployment", "customerName"), "customerName");
    }
}
