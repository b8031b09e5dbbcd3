use crate::config::{Environment, RouterConfig};
use crate::credentials::Credentials;
use crate::error::Result;
use crate::lookup::parse::{parse_customer_results, parse_options};
use crate::lookup::tables::CUSTOMER_SEARCH_PATH;
use crate::lookup::{
    HttpMethod, LookupBody, LookupEndpoint, LookupFailure, LookupGateway, LookupOption,
    LookupOutcome,
};
use async_trait::async_trait;
use reqwest::header::COOKIE;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Lookup gateway backed by the assistant's HTTP list endpoints.
pub struct HttpLookupGateway {
    client: Client,
    production_host: String,
    stage_host: String,
    lookup_timeout: Duration,
    search_timeout: Duration,
}

impl HttpLookupGateway {
    pub fn new(config: &RouterConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .tcp_keepalive(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            production_host: config.host(Environment::Production).to_string(),
            stage_host: config.host(Environment::Stage).to_string(),
            lookup_timeout: config.lookup_timeout,
            search_timeout: config.search_timeout,
        })
    }

    fn url(&self, environment: Environment, path: &str) -> String {
        let host = match environment {
            Environment::Production => &self.production_host,
            Environment::Stage => &self.stage_host,
        };
        format!("{}{}", host, path)
    }

    /// Send the request and decode a 200 JSON body. Every failure is folded
    /// into a [`LookupFailure`].
    async fn fetch_json(
        &self,
        request: RequestBuilder,
        credentials: &Credentials,
    ) -> std::result::Result<Value, LookupFailure> {
        let response = request
            .header(COOKIE, credentials.cookie_header())
            .send()
            .await
            .map_err(|e| LookupFailure::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupFailure::Status(status.as_u16()));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| LookupFailure::Malformed(e.to_string()))
    }

    fn outcome(
        path: &str,
        result: std::result::Result<Value, LookupFailure>,
        parse: fn(&Value) -> Vec<LookupOption>,
    ) -> LookupOutcome {
        match result {
            Ok(data) => {
                let options = parse(&data);
                debug!("Lookup {} returned {} options", path, options.len());
                LookupOutcome::Options(options)
            }
            Err(failure) => {
                warn!("Lookup {} failed: {}", path, failure);
                LookupOutcome::Failed(failure)
            }
        }
    }
}

#[async_trait]
impl LookupGateway for HttpLookupGateway {
    async fn fetch_options(
        &self,
        environment: Environment,
        endpoint: LookupEndpoint,
        context_id: &str,
        body: &LookupBody,
        credentials: &Credentials,
    ) -> LookupOutcome {
        let url = self.url(environment, endpoint.path);
        let request = match endpoint.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => {
                let mut payload = LookupBody::new();
                payload.insert("q_num".to_string(), Value::String(context_id.to_string()));
                payload.extend(body.iter().map(|(k, v)| (k.clone(), v.clone())));
                self.client.post(&url).json(&payload)
            }
        }
        .timeout(self.lookup_timeout);

        let result = self.fetch_json(request, credentials).await;
        Self::outcome(endpoint.path, result, parse_options)
    }

    async fn search_customers(
        &self,
        environment: Environment,
        context_id: &str,
        search_text: &str,
        credentials: &Credentials,
    ) -> LookupOutcome {
        let url = self.url(environment, CUSTOMER_SEARCH_PATH);
        let body = serde_json::json!({
            "q_num": context_id,
            "search_input": search_text,
        });
        let request = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.search_timeout);

        let result = self.fetch_json(request, credentials).await;
        Self::outcome(CUSTOMER_SEARCH_PATH, result, parse_customer_results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_host_is_transport_failure() {
        let config = RouterConfig {
            stage_host: "http://127.0.0.1:1".to_string(),
            ..RouterConfig::default()
        };
        let gateway = HttpLookupGateway::new(&config).unwrap();
        let outcome = gateway
            .search_customers(Environment::Stage, "q1", "acme", &Credentials::default())
            .await;
        assert!(matches!(
            outcome.failure(),
            Some(LookupFailure::Transport(_))
        ));
        assert!(outcome.options().is_empty());
    }

    #[test]
    fn test_url_uses_configured_host() {
        let config = RouterConfig {
            production_host: "https://example.test/".to_string(),
            ..RouterConfig::default()
        };
        let gateway = HttpLookupGateway::new(&config).unwrap();
        assert_eq!(
            gateway.url(Environment::Production, "/api/renewals/get_fy_qtr_list"),
            "https://example.test/api/renewals/get_fy_qtr_list"
        );
    }
}
