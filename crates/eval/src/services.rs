//! External services used by actions, and the factories that provide them.
//!
//! The engine never talks to the outside world directly. Each kind of
//! service is a trait; the embedding application registers a factory for it
//! and the engine resolves a service lazily when an action needs one.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use switchboard_interchange::{ClassifierDef, TicketerDef};

use crate::assets::{AssetRef, SessionAssets};
use crate::contacts::ContactUrn;
use crate::envs::Environment;

/// Errors from resolving or calling a service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// No factory was registered for this kind of service.
    #[error("no {0} service factory configured")]
    NotConfigured(&'static str),
    /// The service was reached but the operation failed.
    #[error("{service} service error: {message}")]
    Failed {
        service: &'static str,
        message: String,
    },
}

impl ServiceError {
    pub fn failed(service: &'static str, message: impl Into<String>) -> Self {
        ServiceError::Failed {
            service,
            message: message.into(),
        }
    }
}

// ──────────────────────────────────────────────
// Webhooks
// ──────────────────────────────────────────────

/// An outgoing HTTP request built by a webhook action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookRequest {
    pub method: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<(String, String)>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: u16,
    #[serde(default)]
    pub body: String,
}

/// A completed webhook call. A missing response means the server couldn't
/// be reached; `error` then says why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookCall {
    pub request: WebhookRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<WebhookResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
}

impl WebhookCall {
    pub fn status_code(&self) -> u16 {
        self.response.as_ref().map_or(0, |r| r.status)
    }
}

/// The outcome of a webhook call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallStatus {
    Success,
    ConnectionError,
    ResponseError,
    SubscriberGone,
}

impl CallStatus {
    /// Classifies a call. No response is a connection error; a resthook
    /// subscriber answering 410 is gone; any 2xx is a success and anything
    /// else is a response error.
    pub fn classify(call: &WebhookCall, is_resthook: bool) -> CallStatus {
        let Some(response) = &call.response else {
            return CallStatus::ConnectionError;
        };
        if call.error.is_some() {
            return CallStatus::ConnectionError;
        }
        if is_resthook && response.status == 410 {
            return CallStatus::SubscriberGone;
        }
        if response.status / 100 == 2 {
            CallStatus::Success
        } else {
            CallStatus::ResponseError
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CallStatus::Success => "success",
            CallStatus::ConnectionError => "connection_error",
            CallStatus::ResponseError => "response_error",
            CallStatus::SubscriberGone => "subscriber_gone",
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait WebhookService: Send + Sync {
    /// Makes the request. Transport failures are reported through the
    /// returned call, not as an `Err`.
    fn call(&self, request: &WebhookRequest) -> Result<WebhookCall, ServiceError>;
}

// ──────────────────────────────────────────────
// Email, classification, tickets, airtime
// ──────────────────────────────────────────────

pub trait EmailService: Send + Sync {
    fn send(&self, addresses: &[String], subject: &str, body: &str) -> Result<(), ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedIntent {
    pub name: String,
    #[serde(with = "crate::numeric::json_number")]
    pub confidence: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub value: String,
    #[serde(with = "crate::numeric::json_number")]
    pub confidence: Decimal,
}

/// What a classifier made of some input. Intents are ordered by descending
/// confidence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default)]
    pub intents: Vec<ExtractedIntent>,
    #[serde(default)]
    pub entities: BTreeMap<String, Vec<ExtractedEntity>>,
}

pub trait ClassificationService: Send + Sync {
    fn classify(&self, env: &Environment, input: &str) -> Result<Classification, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub uuid: String,
    pub ticketer: AssetRef,
    pub subject: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
}

pub trait TicketService: Send + Sync {
    fn open(&self, subject: &str, body: &str) -> Result<Ticket, ServiceError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AirtimeTransfer {
    pub sender: String,
    pub recipient: String,
    pub currency: String,
    #[serde(with = "crate::numeric::json_number")]
    pub desired_amount: Decimal,
    #[serde(with = "crate::numeric::json_number")]
    pub actual_amount: Decimal,
}

pub trait AirtimeService: Send + Sync {
    /// Sends airtime to `recipient`. `amounts` maps currency codes to the
    /// amount to send in that currency; the service picks the currency the
    /// recipient's network uses.
    fn transfer(
        &self,
        sender: Option<&ContactUrn>,
        recipient: &ContactUrn,
        amounts: &BTreeMap<String, Decimal>,
    ) -> Result<AirtimeTransfer, ServiceError>;
}

// ──────────────────────────────────────────────
// Factories
// ──────────────────────────────────────────────

pub type ServiceFactory<S> =
    Box<dyn Fn(&SessionAssets) -> Result<Arc<S>, ServiceError> + Send + Sync>;
pub type ClassificationFactory =
    Box<dyn Fn(&ClassifierDef) -> Result<Arc<dyn ClassificationService>, ServiceError> + Send + Sync>;
pub type TicketFactory =
    Box<dyn Fn(&TicketerDef) -> Result<Arc<dyn TicketService>, ServiceError> + Send + Sync>;

/// The service factories registered with an engine. Unset factories fail
/// with [`ServiceError::NotConfigured`].
#[derive(Default)]
pub struct Services {
    pub(crate) email: Option<ServiceFactory<dyn EmailService>>,
    pub(crate) webhook: Option<ServiceFactory<dyn WebhookService>>,
    pub(crate) classification: Option<ClassificationFactory>,
    pub(crate) ticket: Option<TicketFactory>,
    pub(crate) airtime: Option<ServiceFactory<dyn AirtimeService>>,
}

impl Services {
    pub fn email(&self, assets: &SessionAssets) -> Result<Arc<dyn EmailService>, ServiceError> {
        let factory = self
            .email
            .as_ref()
            .ok_or(ServiceError::NotConfigured("email"))?;
        factory(assets)
    }

    pub fn webhook(&self, assets: &SessionAssets) -> Result<Arc<dyn WebhookService>, ServiceError> {
        let factory = self
            .webhook
            .as_ref()
            .ok_or(ServiceError::NotConfigured("webhook"))?;
        factory(assets)
    }

    pub fn classification(
        &self,
        classifier: &ClassifierDef,
    ) -> Result<Arc<dyn ClassificationService>, ServiceError> {
        let factory = self
            .classification
            .as_ref()
            .ok_or(ServiceError::NotConfigured("classification"))?;
        factory(classifier)
    }

    pub fn ticket(&self, ticketer: &TicketerDef) -> Result<Arc<dyn TicketService>, ServiceError> {
        let factory = self
            .ticket
            .as_ref()
            .ok_or(ServiceError::NotConfigured("ticket"))?;
        factory(ticketer)
    }

    pub fn airtime(&self, assets: &SessionAssets) -> Result<Arc<dyn AirtimeService>, ServiceError> {
        let factory = self
            .airtime
            .as_ref()
            .ok_or(ServiceError::NotConfigured("airtime"))?;
        factory(assets)
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("email", &self.email.is_some())
            .field("webhook", &self.webhook.is_some())
            .field("classification", &self.classification.is_some())
            .field("ticket", &self.ticket.is_some())
            .field("airtime", &self.airtime.is_some())
            .finish()
    }
}
