//! Switchboard flow engine -- runs contacts through flow graphs.
//!
//! The engine consumes asset JSON (flows, channels, groups, fields and the
//! rest), starts sessions from triggers and resumes them with incoming
//! messages. Each start or resume is a sprint: the events and contact
//! modifiers it produced are returned to the caller, and the session is
//! left waiting for input or ended.
//!
//! Everything that reaches outside the process (webhooks, email, NLU
//! classifiers, ticketing, airtime) goes through the service traits in
//! [`services`], supplied by the embedding application.

pub mod actions;
pub mod assets;
pub mod contacts;
pub mod context;
pub mod dates;
pub mod definition;
pub mod engine;
pub mod envs;
pub mod events;
pub mod flow;
pub mod modifiers;
pub mod numeric;
pub mod resolver;
pub mod results;
pub mod routers;
pub mod services;
pub mod template;
pub mod triggers;
pub mod types;

pub use assets::{AssetRef, SessionAssets};
pub use contacts::{Contact, ContactUrn};
pub use engine::{Engine, EngineBuilder, EngineConfig, EngineError, Registries};
pub use envs::Environment;
pub use events::{Event, EventPayload, Msg};
pub use flow::{Run, RunStatus, Session, SessionStatus, Sprint};
pub use modifiers::Modifier;
pub use triggers::{Resume, Trigger};
pub use types::{JsonConfig, Value, ValueError};

/// Evaluates a standalone template against a JSON context.
///
/// Each top-level key of `context` becomes a name usable as `@key`.
/// Returns the rendered text and any expression errors met on the way.
pub fn evaluate_template(
    template: &str,
    context: &serde_json::Value,
) -> (String, Vec<ValueError>) {
    let root = Value::from_json(context);
    let keys: Vec<&str> = match context {
        serde_json::Value::Object(map) => map.keys().map(String::as_str).collect(),
        _ => Vec::new(),
    };
    template::Scope::new(&root, &keys).evaluate(template, template::TemplateOptions::default())
}
