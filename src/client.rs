//! Outbound calls to the assistant service: structured questions, open
//! prompts and feedback.

use crate::catalog::QuestionDefinition;
use crate::config::{Environment, RouterConfig};
use crate::credentials::Credentials;
use crate::error::Result;
use crate::params::ParameterMap;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::debug;

/// Body of `POST /api/{agent}/message`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredRequest {
    pub question: String,
    pub question_id: String,
    pub frontend_id: String,
    pub thread_id: String,
    pub parameters: ParameterMap,
    pub agent: String,
}

impl StructuredRequest {
    /// Continues `thread_id` when given, otherwise starts a new thread.
    pub fn new(
        question: &QuestionDefinition,
        parameters: ParameterMap,
        thread_id: Option<&str>,
    ) -> Self {
        Self {
            question: question.label.clone(),
            question_id: question.backend_question_id.clone(),
            frontend_id: question.id.clone(),
            thread_id: thread_id.map_or_else(new_thread_id, str::to_string),
            parameters,
            agent: question.agent.clone(),
        }
    }
}

pub fn new_thread_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Which conversation surface a thread belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestSource {
    Structured,
    Open,
}

impl RequestSource {
    pub fn feedback_path(&self) -> &'static str {
        match self {
            RequestSource::Structured => "/api/renewals/feedback",
            RequestSource::Open => "/api/supervisor/feedback",
        }
    }
}

impl fmt::Display for RequestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestSource::Structured => f.write_str("structured"),
            RequestSource::Open => f.write_str("open"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    #[serde(skip)]
    pub source: RequestSource,
    pub thread_id: String,
    /// `up` or `down`
    pub rating: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Status and body text of a dispatched call. `content` is empty unless the
/// status is 200.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchResponse {
    pub status: u16,
    pub content: String,
}

impl DispatchResponse {
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            status: 200,
            content: content.into(),
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content: String::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == 200
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == 401
    }
}

#[async_trait]
pub trait RequestDispatcher: Send + Sync {
    async fn call_structured(
        &self,
        environment: Environment,
        request: &StructuredRequest,
        credentials: &Credentials,
    ) -> Result<DispatchResponse>;

    async fn call_open_prompt(
        &self,
        environment: Environment,
        message: &str,
        thread_id: &str,
        credentials: &Credentials,
    ) -> Result<DispatchResponse>;

    async fn send_feedback(
        &self,
        environment: Environment,
        feedback: &Feedback,
        credentials: &Credentials,
    ) -> Result<DispatchResponse>;
}

/// Extract the answer from a server-sent event stream. The `final` event's
/// response wins; without one, `token` event contents are concatenated.
pub fn parse_sse_response(raw: &str) -> String {
    let events: Vec<Value> = raw
        .split("\n\n")
        .filter_map(|chunk| chunk.strip_prefix("data: "))
        .filter_map(|data| serde_json::from_str(data).ok())
        .collect();

    let event_type =
        |evt: &Value, kind: &str| evt.get("event_type").and_then(Value::as_str) == Some(kind);

    if let Some(response) = events
        .iter()
        .filter(|evt| event_type(*evt, "final"))
        .find_map(|evt| evt.pointer("/data/response").and_then(Value::as_str))
    {
        return response.to_string();
    }

    events
        .iter()
        .filter(|evt| event_type(*evt, "token"))
        .filter_map(|evt| evt.pointer("/data/content").and_then(Value::as_str))
        .collect()
}

pub struct HttpDispatcher {
    client: Client,
    production_host: String,
    stage_host: String,
}

impl HttpDispatcher {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.dispatch_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            client,
            production_host: config.host(Environment::Production).to_string(),
            stage_host: config.host(Environment::Stage).to_string(),
        })
    }

    fn url(&self, environment: Environment, path: &str) -> String {
        let host = match environment {
            Environment::Production => &self.production_host,
            Environment::Stage => &self.stage_host,
        };
        format!("{}{}", host, path)
    }
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    async fn call_structured(
        &self,
        environment: Environment,
        request: &StructuredRequest,
        credentials: &Credentials,
    ) -> Result<DispatchResponse> {
        let url = self.url(environment, &format!("/api/{}/message", request.agent));
        debug!("POST {} (question {})", url, request.question_id);

        let response = self
            .client
            .post(&url)
            .header(COOKIE, credentials.cookie_header())
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(DispatchResponse::status(status));
        }
        let body: Value = response.json().await?;
        let content = body
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(DispatchResponse::ok(content))
    }

    async fn call_open_prompt(
        &self,
        environment: Environment,
        message: &str,
        thread_id: &str,
        credentials: &Credentials,
    ) -> Result<DispatchResponse> {
        let url = self.url(environment, "/api/supervisor/stream");
        let body = serde_json::json!({
            "message": message,
            "thread_id": thread_id,
            "rbac_access_scope": "my",
        });

        let response = self
            .client
            .post(&url)
            .header(COOKIE, credentials.cookie_header())
            .header(ACCEPT, "text/event-stream")
            .json(&body)
            .send()
            .await?;

        let status = response.status().as_u16();
        if status != 200 {
            return Ok(DispatchResponse::status(status));
        }
        let raw = response.text().await?;
        Ok(DispatchResponse::ok(parse_sse_response(&raw)))
    }

    async fn send_feedback(
        &self,
        environment: Environment,
        feedback: &Feedback,
        credentials: &Credentials,
    ) -> Result<DispatchResponse> {
        let url = self.url(environment, feedback.source.feedback_path());
        let response = self
            .client
            .post(&url)
            .header(COOKIE, credentials.cookie_header())
            .json(feedback)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;
        Ok(DispatchResponse {
            status,
            content: text,
        })
    }
}
