//! Webhook transport over `ureq`.

use std::time::{Duration, Instant};

use switchboard_eval::services::{
    ServiceError, WebhookCall, WebhookRequest, WebhookResponse, WebhookService,
};

use crate::config::WebhookConfig;

/// Sends webhook requests with a shared agent. Non-2xx statuses come back as
/// responses; only transport failures leave the response empty.
pub struct HttpWebhookService {
    agent: ureq::Agent,
}

impl HttpWebhookService {
    pub fn new(config: &WebhookConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .user_agent(config.user_agent.as_str())
            .build()
            .into();
        HttpWebhookService { agent }
    }
}

impl WebhookService for HttpWebhookService {
    fn call(&self, request: &WebhookRequest) -> Result<WebhookCall, ServiceError> {
        let mut builder = http::Request::builder()
            .method(request.method.as_str())
            .uri(request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let http_request = builder
            .body(request.body.clone())
            .map_err(|e| ServiceError::failed("webhook", e.to_string()))?;

        let started = Instant::now();
        let outcome = self.agent.run(http_request).and_then(|mut response| {
            let status = response.status().as_u16();
            let body = response.body_mut().read_to_string()?;
            Ok(WebhookResponse { status, body })
        });
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        tracing::debug!(url = %request.url, method = %request.method, elapsed_ms, "webhook call");
        Ok(match outcome {
            Ok(response) => WebhookCall {
                request: request.clone(),
                response: Some(response),
                error: None,
                elapsed_ms,
            },
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "webhook transport error");
                WebhookCall {
                    request: request.clone(),
                    response: None,
                    error: Some(e.to_string()),
                    elapsed_ms,
                }
            }
        })
    }
}
