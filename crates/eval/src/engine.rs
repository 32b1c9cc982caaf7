//! The engine: service factories, configuration and decoding registries.
//!
//! An [`Engine`] is built once by an [`EngineBuilder`] and then drives any
//! number of independent sessions. It holds no per-session state.

use std::sync::Arc;

use serde::Deserialize;
use switchboard_interchange::{InterchangeError, Registry};

use crate::actions::{self, Action, ValidationError};
use crate::assets::SessionAssets;
use crate::events::{self, EventPayload};
use crate::flow::{Session, Sprint};
use crate::modifiers::{self, Modifier};
use crate::services::{
    AirtimeService, ClassificationService, EmailService, ServiceError, Services, TicketService,
    WebhookService,
};
use crate::triggers::{self, Resume, Trigger};
use crate::types::{JsonConfig, ValueError};
use switchboard_interchange::{ClassifierDef, TicketerDef};

/// Default bound on the number of nodes a single sprint may visit.
pub const DEFAULT_MAX_STEPS_PER_SPRINT: usize = 100;

/// Errors returned by the engine API.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("session is not waiting for input")]
    NotWaiting,
    #[error("session has already ended")]
    SessionEnded,
    #[error(transparent)]
    Decode(#[from] InterchangeError),
    #[error("no such flow with UUID '{0}'")]
    FlowNotFound(String),
    #[error("invalid asset: {0}")]
    InvalidAsset(String),
    #[error("invalid flow '{flow}': {message}")]
    InvalidFlow { flow: String, message: String },
    #[error("invalid contact: {0}")]
    InvalidContact(ValueError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Engine-wide settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub max_steps_per_sprint: usize,
    pub json: JsonConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_steps_per_sprint: DEFAULT_MAX_STEPS_PER_SPRINT,
            json: JsonConfig::default(),
        }
    }
}

/// Discriminant dispatch tables for every typed envelope the engine reads.
pub struct Registries {
    pub actions: Registry<Box<dyn Action>>,
    pub modifiers: Registry<Modifier>,
    pub events: Registry<EventPayload>,
    pub triggers: Registry<Trigger>,
    pub resumes: Registry<Resume>,
}

impl Registries {
    /// Every built-in action, modifier, event, trigger and resume type.
    pub fn standard() -> Self {
        Registries {
            actions: actions::registry(),
            modifiers: modifiers::registry(),
            events: events::registry(),
            triggers: triggers::registry(),
            resumes: triggers::resume_registry(),
        }
    }
}

pub struct Engine {
    services: Services,
    config: EngineConfig,
    registries: Registries,
}

impl Engine {
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Decodes an assets bundle, decoding and validating every flow.
    pub fn read_assets(&self, data: &serde_json::Value) -> Result<SessionAssets, EngineError> {
        let bundle = switchboard_interchange::from_interchange(data)?;
        SessionAssets::from_bundle(bundle, &self.registries)
    }

    pub fn read_trigger(&self, data: &serde_json::Value) -> Result<Trigger, EngineError> {
        Ok(self.registries.triggers.read(data)?)
    }

    pub fn read_resume(&self, data: &serde_json::Value) -> Result<Resume, EngineError> {
        Ok(self.registries.resumes.read(data)?)
    }

    /// Starts a new session from `trigger`, running until it waits or ends.
    pub fn start(
        &self,
        assets: Arc<SessionAssets>,
        trigger: Trigger,
    ) -> Result<(Session, Sprint), EngineError> {
        Session::start(self, assets, trigger)
    }

    /// Resumes a waiting session with new input.
    pub fn resume(&self, session: &mut Session, resume: Resume) -> Result<Sprint, EngineError> {
        session.resume(self, resume)
    }
}

/// Configures service factories and settings, then builds an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    services: Services,
    config: EngineConfig,
}

impl EngineBuilder {
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_max_steps_per_sprint(mut self, max: usize) -> Self {
        self.config.max_steps_per_sprint = max;
        self
    }

    pub fn with_email_service_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&SessionAssets) -> Result<Arc<dyn EmailService>, ServiceError> + Send + Sync + 'static,
    {
        self.services.email = Some(Box::new(factory));
        self
    }

    pub fn with_webhook_service_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&SessionAssets) -> Result<Arc<dyn WebhookService>, ServiceError>
            + Send
            + Sync
            + 'static,
    {
        self.services.webhook = Some(Box::new(factory));
        self
    }

    pub fn with_classification_service_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ClassifierDef) -> Result<Arc<dyn ClassificationService>, ServiceError>
            + Send
            + Sync
            + 'static,
    {
        self.services.classification = Some(Box::new(factory));
        self
    }

    pub fn with_ticket_service_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&TicketerDef) -> Result<Arc<dyn TicketService>, ServiceError> + Send + Sync + 'static,
    {
        self.services.ticket = Some(Box::new(factory));
        self
    }

    pub fn with_airtime_service_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&SessionAssets) -> Result<Arc<dyn AirtimeService>, ServiceError>
            + Send
            + Sync
            + 'static,
    {
        self.services.airtime = Some(Box::new(factory));
        self
    }

    pub fn build(self) -> Engine {
        Engine {
            services: self.services,
            config: self.config,
            registries: Registries::standard(),
        }
    }
}
