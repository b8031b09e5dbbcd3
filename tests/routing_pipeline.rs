// End-to-end routing: match, extract and resolve against a stub lookup gateway

use async_trait::async_trait;
use cx_router::credentials::Credentials;
use cx_router::lookup::{LookupBody, LookupEndpoint, LookupGateway, LookupOption, LookupOutcome};
use cx_router::params::ParamValue;
use cx_router::routing::route;
use cx_router::{Catalog, Environment, QuestionMatcher, RemoteResolver, Route};
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/catalog.json");

#[derive(Default)]
struct StubGateway {
    options: HashMap<&'static str, Vec<LookupOption>>,
    customers: Vec<LookupOption>,
    calls: Mutex<Vec<(String, LookupBody)>>,
}

impl StubGateway {
    fn with(mut self, path: &'static str, options: Vec<LookupOption>) -> Self {
        self.options.insert(path, options);
        self
    }

    fn body_for(&self, path: &str) -> Option<LookupBody> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, body)| body.clone())
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LookupGateway for StubGateway {
    async fn fetch_options(
        &self,
        _environment: Environment,
        endpoint: LookupEndpoint,
        _context_id: &str,
        body: &LookupBody,
        _credentials: &Credentials,
    ) -> LookupOutcome {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.path.to_string(), body.clone()));
        LookupOutcome::Options(self.options.get(endpoint.path).cloned().unwrap_or_default())
    }

    async fn search_customers(
        &self,
        _environment: Environment,
        _context_id: &str,
        _search_text: &str,
        _credentials: &Credentials,
    ) -> LookupOutcome {
        self.calls
            .lock()
            .unwrap()
            .push(("customer_search".to_string(), LookupBody::new()));
        LookupOutcome::Options(self.customers.clone())
    }
}

const PRODUCTS: &str = "/api/adoption/getProductNameList";
const DEPLOYMENTS: &str = "/api/adoption/getDeploymentList/v3";
const OUTCOMES: &str = "/api/adoption/getOutcomeList/v3";

fn catalog() -> Catalog {
    Catalog::load(FIXTURE).expect("fixture catalog loads")
}

async fn run(
    catalog: &Catalog,
    gateway: Arc<StubGateway>,
    message: &str,
) -> (String, cx_router::Resolution) {
    let matcher = QuestionMatcher::new(catalog);
    let (question, extracted) = match route(&matcher, message, 50) {
        Route::Ready {
            question, extracted, ..
        } => (question, extracted),
        other => panic!("message did not route: {:?}", other),
    };
    let resolver = RemoteResolver::new(gateway, Duration::from_secs(5));
    let resolution = resolver
        .resolve(Environment::Stage, question, &extracted, &Credentials::default())
        .await;
    (question.id.clone(), resolution)
}

#[test]
fn test_every_label_routes_to_its_question() {
    let catalog = catalog();
    let matcher = QuestionMatcher::new(&catalog);
    for question in catalog.questions() {
        let found = matcher.find_best(&question.label, 90).expect("label matches");
        assert_eq!(found.question.id, question.id);
    }
}

#[test]
fn test_followups_use_followup_labels_and_skip_unknown_ids() {
    let catalog = catalog();
    let risk = catalog.get("renewal-risk").unwrap();
    let followups = catalog.followups(risk);
    assert_eq!(followups.len(), 1);
    assert_eq!(followups[0].id, "deal-products");
    assert_eq!(followups[0].label, "Show the products on this deal");

    let sentiment = catalog.get("customer-sentiment").unwrap();
    assert_eq!(catalog.followups(sentiment)[0].label, "Renewal risk for this deal");
    assert!(catalog
        .followups(catalog.get("regional-pipeline").unwrap())
        .is_empty());
}

#[tokio::test]
async fn test_renewal_risk_for_deal() {
    let catalog = catalog();
    let gateway = Arc::new(StubGateway::default());
    let (id, resolution) = run(
        &catalog,
        gateway.clone(),
        "What is the renewal risk for deal D-12345?",
    )
    .await;

    assert_eq!(id, "renewal-risk");
    assert_eq!(catalog.get(&id).unwrap().agent, "renewals");
    assert!(resolution.unresolved.is_empty());
    let deal = &resolution.parameters["dealId"];
    assert_eq!(deal.label, "D-12345");
    assert_eq!(deal.value, ParamValue::from("D-12345"));
    assert_eq!(gateway.call_count(), 0);
}

#[tokio::test]
async fn test_sentiment_with_unknown_customer() {
    let catalog = catalog();
    let gateway = Arc::new(StubGateway::default());
    let (id, resolution) = run(
        &catalog,
        gateway.clone(),
        "Analyze customer sentiment for Acme Corp",
    )
    .await;

    assert_eq!(id, "customer-sentiment");
    assert!(resolution.parameters.is_empty());
    assert_eq!(resolution.unresolved, vec!["customerName"]);
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn test_deployment_auto_select_falls_back_to_first() {
    let catalog = catalog();
    let gateway = Arc::new(
        StubGateway::default()
            .with(PRODUCTS, vec![LookupOption::new("Duo", "DUO")])
            .with(
                DEPLOYMENTS,
                vec![
                    LookupOption::new("west | Acme | Austin", "west"),
                    LookupOption::new("east | Acme | Boston", "east"),
                ],
            ),
    );
    let (id, resolution) = run(
        &catalog,
        gateway.clone(),
        "Show adoption level for 104461 Duo deployment",
    )
    .await;

    assert_eq!(id, "deployment-adoption");
    assert!(resolution.unresolved.is_empty(), "{:?}", resolution.unresolved);
    assert_eq!(resolution.parameters["deployment"].value, ParamValue::from("west"));

    // Deployment lookup runs after, and is filtered by, customer and product
    let body = gateway.body_for(DEPLOYMENTS).expect("deployment lookup made");
    assert_eq!(body.get("customerName"), Some(&json!("104461")));
    assert_eq!(body.get("productName"), Some(&json!("DUO")));
}

#[tokio::test]
async fn test_primary_deployment_hint() {
    let catalog = catalog();
    let gateway = Arc::new(
        StubGateway::default()
            .with(PRODUCTS, vec![LookupOption::new("Duo", "DUO")])
            .with(
                DEPLOYMENTS,
                vec![
                    LookupOption::new("west | Acme | Austin", "west"),
                    LookupOption::new("[Primary] north | Acme | Oslo", "north").primary(),
                ],
            ),
    );
    let (_, resolution) = run(
        &catalog,
        gateway,
        "Show adoption level for 104461 Duo primary deployment",
    )
    .await;

    assert_eq!(resolution.parameters["deployment"].value, ParamValue::from("north"));
    assert_eq!(
        resolution.parameters["deployment"].label,
        "[Primary] north | Acme | Oslo"
    );
}

#[tokio::test]
async fn test_outcome_gaps_chain() {
    let catalog = catalog();
    let gateway = Arc::new(
        StubGateway::default()
            .with(PRODUCTS, vec![LookupOption::new("Duo", "DUO")])
            .with(
                DEPLOYMENTS,
                vec![
                    LookupOption::new("west | Acme | Austin", "west"),
                    LookupOption::new("[Primary] north | Acme | Oslo", "north").primary(),
                ],
            )
            .with(
                OUTCOMES,
                vec![
                    LookupOption::new("Network visibility", "OC-1"),
                    LookupOption::new("Secure Access for remote users", "OC-3"),
                ],
            ),
    );
    let (id, resolution) = run(
        &catalog,
        gateway.clone(),
        "What are the adoption gaps for secure access at 104461 on Duo?",
    )
    .await;

    assert_eq!(id, "outcome-gaps");
    assert!(resolution.unresolved.is_empty(), "{:?}", resolution.unresolved);
    assert_eq!(
        resolution.parameters["deploymentList"].value,
        ParamValue::Many(vec!["north".to_string()])
    );
    // This question sends the outcome summary as its value
    assert_eq!(
        resolution.parameters["outcomes"].value,
        ParamValue::Many(vec!["Secure Access for remote users".to_string()])
    );

    let body = gateway.body_for(OUTCOMES).expect("outcome lookup made");
    assert_eq!(body.get("deployment"), Some(&json!(["north"])));
    assert_eq!(body.get("customerName"), Some(&json!("104461")));
}

#[tokio::test]
async fn test_static_parameters_need_no_lookups() {
    let catalog = catalog();
    let gateway = Arc::new(StubGateway::default());
    let (id, resolution) = run(
        &catalog,
        gateway.clone(),
        "Compare renewal pipeline by region for EMEAR over last quarter",
    )
    .await;

    assert_eq!(id, "regional-pipeline");
    assert_eq!(resolution.parameters["region"].value, ParamValue::from("EMEAR"));
    assert_eq!(
        resolution.parameters["timeframe"].value,
        ParamValue::from("last quarter")
    );
    assert_eq!(gateway.call_count(), 0);
}
