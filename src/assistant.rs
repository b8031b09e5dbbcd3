//! The assistant shell: ties routing, resolution and dispatch together and
//! keeps the per-environment conversation thread.

use crate::catalog::{Catalog, Followup};
use crate::client::{
    new_thread_id, DispatchResponse, Feedback, HttpDispatcher, RequestDispatcher, RequestSource,
    StructuredRequest,
};
use crate::config::{Environment, RouterConfig};
use crate::credentials::{CredentialProvider, Credentials, FileCredentialProvider};
use crate::error::Result;
use crate::formatter::format_followups;
use crate::fuzzy_matcher::QuestionMatcher;
use crate::lookup::{HttpLookupGateway, LookupGateway};
use crate::resolver::RemoteResolver;
use crate::routing::{build_routing_error, route, Route};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Backend question id used as context for ad-hoc customer searches
const CUSTOMER_SEARCH_CONTEXT: &str = "sentimentQ2";
const CUSTOMER_LIST_LIMIT: usize = 10;
const SUGGESTION_LIMIT: usize = 3;

#[derive(Debug, Clone)]
struct Session {
    thread_id: String,
    source: RequestSource,
}

pub struct Assistant {
    catalog: Arc<Catalog>,
    gateway: Arc<dyn LookupGateway>,
    resolver: RemoteResolver,
    dispatcher: Arc<dyn RequestDispatcher>,
    credentials: Arc<dyn CredentialProvider>,
    match_threshold: u8,
    sessions: Mutex<HashMap<Environment, Session>>,
}

impl Assistant {
    pub fn new(
        catalog: Arc<Catalog>,
        gateway: Arc<dyn LookupGateway>,
        dispatcher: Arc<dyn RequestDispatcher>,
        credentials: Arc<dyn CredentialProvider>,
        config: &RouterConfig,
    ) -> Self {
        Self {
            catalog,
            resolver: RemoteResolver::new(gateway.clone(), config.lookup_timeout),
            gateway,
            dispatcher,
            credentials,
            match_threshold: config.match_threshold,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Assistant wired to the HTTP service, the catalog file and the saved
    /// browser cookies named in `config`.
    pub fn from_config(config: &RouterConfig) -> Result<Self> {
        let catalog = Arc::new(Catalog::load(&config.catalog_path)?);
        Ok(Self::new(
            catalog,
            Arc::new(HttpLookupGateway::new(config)?),
            Arc::new(HttpDispatcher::new(config)?),
            Arc::new(FileCredentialProvider::new(&config.cookies_dir)),
            config,
        ))
    }

    /// Match and extract without touching the network.
    pub fn route(&self, message: &str) -> Route<'_> {
        let matcher = QuestionMatcher::new(&self.catalog);
        route(&matcher, message, self.match_threshold)
    }

    pub fn followups(&self, question_id: &str) -> Option<Vec<Followup>> {
        self.catalog
            .get(question_id)
            .map(|question| self.catalog.followups(question))
    }

    /// Answer `message` through the best-matching catalog question.
    pub async fn ask_structured(&self, environment: Environment, message: &str) -> Result<String> {
        let (question, extracted) = match self.route(message) {
            Route::NoMatch => return Ok(self.no_match_message(message)),
            Route::Incomplete { question, missing } => {
                return Ok(build_routing_error(question, &missing))
            }
            Route::Ready {
                question, extracted, ..
            } => (question, extracted),
        };

        let credentials = self.credentials.load(environment).await?;
        let resolution = self
            .resolver
            .resolve(environment, question, &extracted, &credentials)
            .await;
        if !resolution.is_complete() {
            return Ok(build_routing_error(question, &resolution.unresolved));
        }

        let last_thread = self.last_session(environment).map(|s| s.thread_id);
        let request = StructuredRequest::new(question, resolution.parameters, last_thread.as_deref());

        let dispatcher = &self.dispatcher;
        let body = &request;
        let response = self
            .with_reauth(environment, credentials, move |credentials| async move {
                dispatcher
                    .call_structured(environment, body, &credentials)
                    .await
            })
            .await?;

        if !response.is_success() {
            return Ok(format!("API error: HTTP {}", response.status));
        }

        self.remember(environment, &request.thread_id, RequestSource::Structured);
        let followups = self.catalog.followups(question);
        Ok(response.content + &format_followups(&followups))
    }

    /// Send `message` to the free-form assistant.
    pub async fn ask_open(&self, environment: Environment, message: &str) -> Result<String> {
        let credentials = self.credentials.load(environment).await?;
        let thread_id = self
            .last_session(environment)
            .map(|s| s.thread_id)
            .unwrap_or_else(new_thread_id);

        let dispatcher = &self.dispatcher;
        let thread = thread_id.as_str();
        let response = self
            .with_reauth(environment, credentials, move |credentials| async move {
                dispatcher
                    .call_open_prompt(environment, message, thread, &credentials)
                    .await
            })
            .await?;

        if response.status == 404 {
            return Ok(format!(
                "Open prompt endpoint not available on {}. Try a structured question instead.",
                environment
            ));
        }
        if !response.is_success() {
            return Ok(format!("API error: HTTP {}", response.status));
        }

        self.remember(environment, &thread_id, RequestSource::Open);
        Ok(response.content)
    }

    pub async fn search_customers(&self, environment: Environment, search_text: &str) -> Result<String> {
        let credentials = self.credentials.load(environment).await?;
        let outcome = self
            .gateway
            .search_customers(environment, CUSTOMER_SEARCH_CONTEXT, search_text, &credentials)
            .await;
        let results = outcome.options();
        if results.is_empty() {
            return Ok(format!("No customers found matching '{}'.", search_text));
        }

        let mut lines = vec![format!("Found {} customer(s):", results.len())];
        for r in results.iter().take(CUSTOMER_LIST_LIMIT) {
            lines.push(format!("  - {} (value: {})", r.label, r.value));
        }
        if results.len() > CUSTOMER_LIST_LIMIT {
            lines.push(format!("  ... and {} more", results.len() - CUSTOMER_LIST_LIMIT));
        }
        Ok(lines.join("\n"))
    }

    /// Rate the last response in `environment`. The feedback endpoint follows
    /// the surface of the last request unless `source` is given.
    pub async fn give_feedback(
        &self,
        environment: Environment,
        rating: &str,
        comment: Option<String>,
        source: Option<RequestSource>,
    ) -> Result<String> {
        let Some(session) = self.last_session(environment) else {
            return Ok("No recent conversation to provide feedback on.".to_string());
        };
        let credentials = self.credentials.load(environment).await?;

        let feedback = Feedback {
            source: source.unwrap_or(session.source),
            thread_id: session.thread_id,
            rating: rating.to_string(),
            comment: comment.filter(|c| !c.is_empty()),
        };
        let dispatcher = &self.dispatcher;
        let body = &feedback;
        let response = self
            .with_reauth(environment, credentials, move |credentials| async move {
                dispatcher.send_feedback(environment, body, &credentials).await
            })
            .await?;

        if response.is_success() {
            Ok(format!("Feedback ({}) submitted successfully.", rating))
        } else {
            Ok(format!("Failed to submit feedback: HTTP {}", response.status))
        }
    }

    /// Run `call`; on 401 refresh the credentials once and run it again.
    async fn with_reauth<F, Fut>(
        &self,
        environment: Environment,
        credentials: Credentials,
        call: F,
    ) -> Result<DispatchResponse>
    where
        F: Fn(Credentials) -> Fut,
        Fut: Future<Output = Result<DispatchResponse>>,
    {
        let response = call(credentials).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }
        warn!("Session rejected for {}, refreshing credentials", environment);
        let refreshed = self.credentials.refresh(environment).await?;
        call(refreshed).await
    }

    fn no_match_message(&self, message: &str) -> String {
        let matcher = QuestionMatcher::new(&self.catalog);
        let mut text = "Could not find a matching question in the catalog. \
                        Try an open prompt for free-form questions."
            .to_string();
        let suggestions = matcher.suggest(message, SUGGESTION_LIMIT);
        if !suggestions.is_empty() {
            text.push_str("\n\nDid you mean:");
            for q in suggestions {
                text.push_str(&format!("\n- {}", q.label));
            }
        }
        text
    }

    fn last_session(&self, environment: Environment) -> Option<Session> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(&environment)
            .cloned()
    }

    fn remember(&self, environment: Environment, thread_id: &str, source: RequestSource) {
        info!("Continuing {} thread {} ({})", environment, thread_id, source);
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(
                environment,
                Session {
                    thread_id: thread_id.to_string(),
                    source,
                },
            );
    }
}
