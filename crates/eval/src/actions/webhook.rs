//! Webhook and resthook calls.

use std::collections::BTreeMap;

use http::HeaderName;
use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError, CATEGORY_FAILURE, CATEGORY_SUCCESS};
use crate::dates;
use crate::events::{EventPayload, WebhookCalled};
use crate::flow::RunScope;
use crate::services::{CallStatus, WebhookCall, WebhookRequest};
use crate::template::TemplateOptions;
use crate::types::Value;

pub(super) const CALL_WEBHOOK: &str = "call_webhook";
pub(super) const CALL_RESTHOOK: &str = "call_resthook";

const MAX_URL_LENGTH: usize = 2048;
/// Response bodies at least this large are not copied into result extras.
const MAX_EXTRA_BYTES: usize = 10000;
const METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE"];

fn is_valid_url(url: &str) -> bool {
    url.chars().count() <= MAX_URL_LENGTH && url::Url::parse(url).is_ok()
}

/// Calls an external service. URL, header values and body are templates;
/// the body is never truncated. With a `result_name`, the call is saved as
/// a result whose value is the status code. The response of the latest call
/// in a sprint is available as `@webhook`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallWebhookAction {
    pub uuid: String,
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result_name: String,
}

impl Action for CallWebhookAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        CALL_WEBHOOK
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !METHODS.contains(&self.method.to_uppercase().as_str()) {
            return Err(ValidationError::new(
                self,
                format!("'{}' is not a valid HTTP method", self.method),
            ));
        }
        if self.url.trim().is_empty() {
            return Err(ValidationError::new(self, "URL is required"));
        }
        for key in self.headers.keys() {
            if HeaderName::from_bytes(key.as_bytes()).is_err() {
                return Err(ValidationError::new(
                    self,
                    format!("header '{}' is not a valid HTTP header", key),
                ));
            }
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let url = scope.evaluate_with(&self.url, TemplateOptions::default());
        let url = url.trim();
        if url.is_empty() {
            scope.error("webhook URL evaluated to empty string");
            return Ok(());
        }
        if !is_valid_url(url) {
            scope.error(format!("webhook URL evaluated to an invalid URL: '{}'", url));
            return Ok(());
        }

        let body = if self.body.is_empty() {
            String::new()
        } else {
            scope.evaluate_with(&self.body, TemplateOptions::default())
        };
        let headers = self
            .headers
            .iter()
            .map(|(key, value)| (key.clone(), scope.evaluate(value)))
            .collect();

        let request = WebhookRequest {
            method: self.method.to_uppercase(),
            url: url.to_string(),
            headers,
            body,
        };

        let service = scope.services().webhook(&scope.assets())?;
        let call = match service.call(&request) {
            Ok(call) => call,
            Err(e) => {
                scope.error(e.to_string());
                return Ok(());
            }
        };
        let status = log_call(scope, &call, None);
        scope.set_webhook(response_value(&call));
        if !self.result_name.is_empty() {
            save_call_result(scope, &self.result_name, &call, status);
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(CALL_WEBHOOK, self)
    }
}

/// Posts a JSON summary of the run to every subscriber of a resthook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallResthookAction {
    pub uuid: String,
    pub resthook: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result_name: String,
}

impl Action for CallResthookAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        CALL_RESTHOOK
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.resthook.trim().is_empty() {
            return Err(ValidationError::new(self, "resthook slug is required"));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let assets = scope.assets();
        let Some(resthook) = assets.resthook(&self.resthook) else {
            scope.error(format!("no such resthook '{}'", self.resthook));
            return Ok(());
        };
        if resthook.subscribers.is_empty() {
            return Ok(());
        }

        let payload = resthook_payload(scope).to_string();
        let service = scope.services().webhook(&assets)?;

        let mut calls = Vec::with_capacity(resthook.subscribers.len());
        for url in &resthook.subscribers {
            let request = WebhookRequest {
                method: "POST".to_string(),
                url: url.clone(),
                headers: vec![("Content-Type".to_string(), "application/json".to_string())],
                body: payload.clone(),
            };
            match service.call(&request) {
                Ok(call) => {
                    let status = log_call(scope, &call, Some(&resthook.slug));
                    calls.push((call, status));
                }
                Err(e) => scope.error(e.to_string()),
            }
        }

        // a failed call decides the result, otherwise the last one does
        let chosen = calls
            .iter()
            .find(|(_, s)| matches!(s, CallStatus::ConnectionError | CallStatus::ResponseError))
            .or_else(|| calls.last());
        if let Some((call, status)) = chosen {
            scope.set_webhook(response_value(call));
            if !self.result_name.is_empty() {
                save_call_result(scope, &self.result_name, call, *status);
            }
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(CALL_RESTHOOK, self)
    }
}

/// Logs a completed call and returns its status.
fn log_call(scope: &mut RunScope<'_>, call: &WebhookCall, resthook: Option<&str>) -> CallStatus {
    if let Some(error) = &call.error {
        scope.error(error.clone());
    }
    let status = CallStatus::classify(call, resthook.is_some());
    scope.log(EventPayload::WebhookCalled(WebhookCalled {
        url: call.request.url.clone(),
        method: call.request.method.clone(),
        status,
        status_code: call.status_code(),
        elapsed_ms: call.elapsed_ms,
        resthook: resthook.map(str::to_string),
        call: call.clone(),
    }));
    status
}

/// The response body as JSON when it parses, otherwise as text.
fn response_value(call: &WebhookCall) -> Value {
    match &call.response {
        Some(response) => match serde_json::from_str::<serde_json::Value>(&response.body) {
            Ok(json) => Value::from_json(&json),
            Err(_) => Value::text(response.body.clone()),
        },
        None => Value::text(""),
    }
}

fn save_call_result(scope: &mut RunScope<'_>, name: &str, call: &WebhookCall, status: CallStatus) {
    let category = if status == CallStatus::Success {
        CATEGORY_SUCCESS
    } else {
        CATEGORY_FAILURE
    };
    let extra = call
        .response
        .as_ref()
        .filter(|r| r.body.len() < MAX_EXTRA_BYTES)
        .and_then(|r| serde_json::from_str(&r.body).ok());
    scope.save_result(
        name,
        &call.status_code().to_string(),
        category,
        &format!("{} {}", call.request.method, call.request.url),
        extra,
    );
}

fn resthook_payload(scope: &RunScope<'_>) -> serde_json::Value {
    let contact = scope.contact();
    let run = scope.run();
    serde_json::json!({
        "contact": {
            "uuid": contact.uuid,
            "name": contact.name,
            "urn": contact.urns.iter().next().map(|u| u.to_raw(false)),
        },
        "flow": run.flow.reference(),
        "path": run.path,
        "results": run.results,
        "run": {
            "uuid": run.uuid,
            "created_on": dates::format_datetime(&run.created_on),
        },
        "input": scope.input().map(|i| &i.msg),
    })
}
