//! The HTTP delivery handler.
//!
//! Renders the receiver's template against a notification batch and forwards
//! the result to the configured endpoint through the retrying dispatcher.
//! Failures are logged here and never propagate: one unreachable destination
//! must not destabilize the process or other deliveries.

use crate::core::{Handler, NotificationBatch};
use crate::dispatch::{dispatch, RetryConfig};
use crate::handlers::HandlerFactory;
use crate::registry::ConfigError;
use crate::template::BodyTemplate;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

/// HTTP methods a receiver may configure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    #[default]
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
        }
    }
}

/// The `params` mapping accepted for `handler = "http"` receivers.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct HttpParams {
    url: String,
    #[serde(default)]
    method: HttpMethod,
    headers: Option<HashMap<String, String>>,
    template: String,
    #[serde(default = "default_timeout")]
    timeout: f64,
    #[serde(default = "default_max_attempts")]
    max_attempt_number: u32,
    #[serde(default = "default_wait_multiplier")]
    wait_multiplier: f64,
}

fn default_timeout() -> f64 {
    10.0
}

fn default_max_attempts() -> u32 {
    3
}

fn default_wait_multiplier() -> f64 {
    2.0
}

fn default_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Forwards notification batches to a single HTTP endpoint.
///
/// All state is resolved and validated at construction; the handler is
/// immutable afterwards and safe to share across concurrent deliveries. The
/// `reqwest` client is owned per handler and lives for the process lifetime;
/// it may pool connections underneath.
#[derive(Debug)]
pub struct HttpHandler {
    url: Url,
    method: HttpMethod,
    headers: HeaderMap,
    template: BodyTemplate,
    timeout: Duration,
    retry: RetryConfig,
    client: Client,
}

impl HttpHandler {
    /// Builds a handler from a receiver's `params` mapping, validating
    /// everything that can be validated before the first delivery.
    pub fn from_params(name: &str, params: &serde_json::Value) -> Result<Self, ConfigError> {
        let params: HttpParams =
            serde_json::from_value(params.clone()).map_err(|e| ConfigError::InvalidParams {
                name: name.to_string(),
                reason: e.to_string(),
            })?;

        let url = Url::parse(&params.url).map_err(|e| ConfigError::InvalidParams {
            name: name.to_string(),
            reason: format!("invalid url '{}': {}", params.url, e),
        })?;

        if !params.timeout.is_finite() || params.timeout <= 0.0 {
            return Err(ConfigError::InvalidParams {
                name: name.to_string(),
                reason: format!("timeout must be positive, got {}", params.timeout),
            });
        }
        if params.max_attempt_number < 1 {
            return Err(ConfigError::InvalidParams {
                name: name.to_string(),
                reason: "max_attempt_number must be at least 1".to_string(),
            });
        }
        if !params.wait_multiplier.is_finite() || params.wait_multiplier < 0.0 {
            return Err(ConfigError::InvalidParams {
                name: name.to_string(),
                reason: format!(
                    "wait_multiplier must not be negative, got {}",
                    params.wait_multiplier
                ),
            });
        }

        let headers = match &params.headers {
            Some(headers) => build_headers(name, headers)?,
            None => default_headers(),
        };

        let template =
            BodyTemplate::compile(&params.template).map_err(|e| ConfigError::InvalidTemplate {
                name: name.to_string(),
                source: e,
            })?;
        template.validate().map_err(|e| ConfigError::InvalidTemplate {
            name: name.to_string(),
            source: e,
        })?;

        let client = Client::builder()
            .build()
            .map_err(|e| ConfigError::InvalidParams {
                name: name.to_string(),
                reason: format!("failed to build http client: {}", e),
            })?;

        Ok(Self {
            url,
            method: params.method,
            headers,
            template,
            timeout: Duration::from_secs_f64(params.timeout),
            retry: RetryConfig {
                max_attempts: params.max_attempt_number,
                wait_multiplier: params.wait_multiplier,
            },
            client,
        })
    }
}

fn build_headers(name: &str, headers: &HashMap<String, String>) -> Result<HeaderMap, ConfigError> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let key = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            ConfigError::InvalidParams {
                name: name.to_string(),
                reason: format!("invalid header name '{}': {}", key, e),
            }
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| ConfigError::InvalidParams {
            name: name.to_string(),
            reason: format!("invalid value for header '{}': {}", key, e),
        })?;
        map.insert(key, value);
    }
    Ok(map)
}

#[async_trait]
impl Handler for HttpHandler {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn handle(&self, batch: &NotificationBatch) {
        let body = match self.template.render(batch) {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "failed to render request body");
                return;
            }
        };

        match dispatch(
            &self.client,
            self.method.into(),
            &self.url,
            &self.headers,
            Some(body),
            self.timeout,
            &self.retry,
        )
        .await
        {
            Ok(response) => {
                debug!(status = %response.status(), "notification delivered");
            }
            Err(e) => {
                error!(status = ?e.final_status(), error = %e, "failed to deliver notification");
            }
        }
    }
}

/// Factory for `handler = "http"` receivers.
pub struct HttpHandlerFactory;

impl HandlerFactory for HttpHandlerFactory {
    fn kind(&self) -> &'static str {
        "http"
    }

    fn build(
        &self,
        name: &str,
        params: &serde_json::Value,
    ) -> Result<Arc<dyn Handler>, ConfigError> {
        Ok(Arc::new(HttpHandler::from_params(name, params)?))
    }
}
