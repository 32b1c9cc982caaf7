//! Sessions, runs and the sprint driver.
//!
//! A session is a state machine walk over flow graphs. Each sprint starts at
//! a trigger or a resume and visits nodes until a run waits for input or the
//! root run exits. Nodes run their actions in order and then their router;
//! the chosen category's exit names the next node, and an exit without a
//! destination completes the run.
//!
//! Child runs started by `enter_flow` are pushed onto the same session. When
//! a child exits, control returns to the parent's router with `@child` in
//! scope. A failed child fails its parent.
//!
//! Graph defects never abort the process: they log a `failure` event and
//! mark the run errored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::assets::{AssetRef, SessionAssets};
use crate::context::{Capability, Fields, Item, Queryable};
use crate::contacts::{Contact, ContactContext, FieldValues};
use crate::dates;
use crate::definition::{Exit, Flow};
use crate::engine::{Engine, EngineConfig, EngineError};
use crate::envs::Environment;
use crate::events::{self, Event, EventPayload, FlowEntered, MsgReceived, MsgWait, RunResultChanged};
use crate::modifiers::Modifier;
use crate::results::{Detail, Results, ResultsContext, RunResult};
use crate::services::Services;
use crate::template::{Scope, TemplateOptions};
use crate::triggers::{Input, InputContext, Resume, Trigger, TriggerContext};
use crate::types::{JsonConfig, Value, ValueError};

/// Context keys that a bare `@name` in a template may start with.
pub const TOP_LEVEL_KEYS: &[&str] = &[
    "contact", "fields", "urns", "results", "run", "input", "webhook", "trigger", "parent",
    "child",
];

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ──────────────────────────────────────────────
// Runs and steps
// ──────────────────────────────────────────────

/// One visit to a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    pub uuid: String,
    pub node_uuid: String,
    #[serde(with = "dates::rfc3339")]
    pub arrived_on: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_uuid: Option<String>,
}

impl Step {
    fn new(node_uuid: &str) -> Self {
        Step {
            uuid: new_uuid(),
            node_uuid: node_uuid.to_string(),
            arrived_on: OffsetDateTime::now_utc(),
            exit_uuid: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Active,
    Waiting,
    Completed,
    Errored,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Active => "active",
            RunStatus::Waiting => "waiting",
            RunStatus::Completed => "completed",
            RunStatus::Errored => "errored",
        }
    }

    pub fn is_exited(self) -> bool {
        matches!(self, RunStatus::Completed | RunStatus::Errored)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Waiting,
    Completed,
    Failed,
}

/// A contact's walk through one flow.
#[derive(Debug)]
pub struct Run {
    pub uuid: String,
    pub flow: Arc<Flow>,
    pub parent_uuid: Option<String>,
    pub status: RunStatus,
    pub path: Vec<Step>,
    pub results: Results,
    pub events: Vec<Event>,
    pub created_on: OffsetDateTime,
    pub exited_on: Option<OffsetDateTime>,
}

#[derive(Serialize)]
struct RunEnvelope<'a> {
    uuid: &'a str,
    flow: AssetRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent_uuid: Option<&'a str>,
    status: RunStatus,
    path: &'a [Step],
    results: &'a Results,
    #[serde(with = "dates::rfc3339")]
    created_on: OffsetDateTime,
    #[serde(with = "dates::rfc3339_option", skip_serializing_if = "Option::is_none")]
    exited_on: Option<OffsetDateTime>,
}

impl Run {
    fn new(flow: Arc<Flow>, parent_uuid: Option<String>) -> Self {
        Run {
            uuid: new_uuid(),
            flow,
            parent_uuid,
            status: RunStatus::Active,
            path: Vec::new(),
            results: Results::new(),
            events: Vec::new(),
            created_on: OffsetDateTime::now_utc(),
            exited_on: None,
        }
    }

    fn current_step(&self) -> Option<&Step> {
        self.path.last()
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(RunEnvelope {
            uuid: &self.uuid,
            flow: self.flow.reference(),
            parent_uuid: self.parent_uuid.as_deref(),
            status: self.status,
            path: &self.path,
            results: &self.results,
            created_on: self.created_on,
            exited_on: self.exited_on,
        })
    }
}

/// `@run`, `@parent` and `@child`.
pub struct RunContext<'a>(pub &'a Run);

impl Queryable for RunContext<'_> {
    fn describe(&self) -> String {
        "run".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let run = self.0;
        Ok(match key {
            "uuid" => Item::text(run.uuid.clone()),
            "status" => Item::text(run.status.as_str()),
            "flow" => Item::value(Value::dict([
                ("uuid", Value::text(run.flow.uuid.clone())),
                ("name", Value::text(run.flow.name.clone())),
            ])),
            "results" => Item::Owned(Box::new(ResultsContext {
                results: &run.results,
                detail: Detail::Full,
            })),
            "created_on" => Item::value(Value::DateTime(run.created_on)),
            "exited_on" => Item::value(run.exited_on.map_or_else(|| Value::text(""), Value::DateTime)),
            _ => {
                return Err(ValueError::NoSuchKey {
                    container: "run".to_string(),
                    key: key.to_string(),
                })
            }
        })
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::text(self.0.uuid.clone()))
    }
}

// ──────────────────────────────────────────────
// Sprints
// ──────────────────────────────────────────────

/// Everything one start or resume produced.
#[derive(Debug, Default)]
pub struct Sprint {
    pub modifiers: Vec<Modifier>,
    pub events: Vec<Event>,
}

impl Sprint {
    pub fn to_json(&self) -> Result<serde_json::Value, EngineError> {
        let modifiers = self
            .modifiers
            .iter()
            .map(Modifier::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        let events = self
            .events
            .iter()
            .map(Event::to_json)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(serde_json::json!({"modifiers": modifiers, "events": events}))
    }

    /// Event type names in order, handy for assertions and logs.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.iter().map(Event::type_name).collect()
    }
}

/// Where the driver goes next.
enum Cursor {
    Visit { run: usize, node: String },
    Route { run: usize, node: String },
    Exit { run: usize, status: RunStatus },
    Wait,
    Done,
}

// ──────────────────────────────────────────────
// Sessions
// ──────────────────────────────────────────────

#[derive(Debug)]
pub struct Session {
    uuid: String,
    assets: Arc<SessionAssets>,
    environment: Environment,
    trigger: Trigger,
    contact: Contact,
    runs: Vec<Run>,
    status: SessionStatus,
    input: Option<Input>,
    webhook: Option<Value>,
}

impl Session {
    #[tracing::instrument(skip_all, fields(flow = %trigger.flow().uuid))]
    pub(crate) fn start(
        engine: &Engine,
        assets: Arc<SessionAssets>,
        trigger: Trigger,
    ) -> Result<(Session, Sprint), EngineError> {
        let flow = assets
            .flow(&trigger.flow().uuid)
            .cloned()
            .ok_or_else(|| EngineError::FlowNotFound(trigger.flow().uuid.clone()))?;
        let contact = Contact::read(trigger.contact(), &assets).map_err(EngineError::InvalidContact)?;
        let environment = trigger.environment().cloned().unwrap_or_default();
        let input = trigger.msg().map(|msg| Input {
            msg: msg.clone(),
            created_on: trigger.triggered_on(),
        });

        let mut session = Session {
            uuid: new_uuid(),
            assets,
            environment,
            trigger,
            contact,
            runs: Vec::new(),
            status: SessionStatus::Active,
            input,
            webhook: None,
        };
        tracing::debug!(session = %session.uuid, "starting session");

        let cursor = session.start_run(flow, None);
        let mut sprint = Sprint::default();
        session.drive(engine, &mut sprint, cursor);
        Ok((session, sprint))
    }

    #[tracing::instrument(skip_all, fields(session = %self.uuid))]
    pub(crate) fn resume(&mut self, engine: &Engine, resume: Resume) -> Result<Sprint, EngineError> {
        match self.status {
            SessionStatus::Waiting => {}
            SessionStatus::Completed | SessionStatus::Failed => return Err(EngineError::SessionEnded),
            SessionStatus::Active => return Err(EngineError::NotWaiting),
        }
        let run = self
            .runs
            .iter()
            .rposition(|r| r.status == RunStatus::Waiting)
            .ok_or(EngineError::NotWaiting)?;
        let (node, step_uuid) = self.runs[run]
            .current_step()
            .map(|s| (s.node_uuid.clone(), s.uuid.clone()))
            .ok_or(EngineError::NotWaiting)?;

        let Resume::Msg(resume) = resume;
        self.status = SessionStatus::Active;
        self.runs[run].status = RunStatus::Active;
        self.webhook = None;
        self.input = Some(Input {
            msg: resume.msg.clone(),
            created_on: resume.resumed_on,
        });

        let mut sprint = Sprint::default();
        self.log(
            &mut sprint,
            run,
            Some(step_uuid.as_str()),
            EventPayload::MsgReceived(MsgReceived { msg: resume.msg }),
        );
        self.drive(engine, &mut sprint, Cursor::Route { run, node });
        Ok(sprint)
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn contact(&self) -> &Contact {
        &self.contact
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn assets(&self) -> &Arc<SessionAssets> {
        &self.assets
    }

    /// Every run, the first one being the root.
    pub fn runs(&self) -> &[Run] {
        &self.runs
    }

    pub fn input(&self) -> Option<&Input> {
        self.input.as_ref()
    }

    pub fn to_json(&self, config: &JsonConfig) -> Result<serde_json::Value, EngineError> {
        let contact = self
            .contact
            .to_json(config)
            .map_err(EngineError::InvalidContact)?;
        let runs = self
            .runs
            .iter()
            .map(Run::to_json)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| EngineError::InvalidAsset(e.to_string()))?;
        Ok(serde_json::json!({
            "uuid": self.uuid,
            "status": self.status,
            "trigger": self.trigger.to_json()?,
            "environment": self.environment,
            "contact": contact,
            "runs": runs,
        }))
    }

    fn run_by_uuid(&self, uuid: &str) -> Option<usize> {
        self.runs.iter().position(|r| r.uuid == uuid)
    }

    fn start_run(&mut self, flow: Arc<Flow>, parent_uuid: Option<String>) -> Cursor {
        let entry = flow.entry().map(|n| n.uuid.clone());
        self.runs.push(Run::new(flow, parent_uuid));
        let run = self.runs.len() - 1;
        match entry {
            Some(node) => Cursor::Visit { run, node },
            None => Cursor::Exit {
                run,
                status: RunStatus::Completed,
            },
        }
    }

    fn log(&mut self, sprint: &mut Sprint, run: usize, step_uuid: Option<&str>, payload: EventPayload) {
        let mut event = Event::new(payload);
        event.step_uuid = step_uuid.map(str::to_string);
        self.runs[run].events.push(event.clone());
        sprint.events.push(event);
    }

    fn drive(&mut self, engine: &Engine, sprint: &mut Sprint, mut cursor: Cursor) {
        let max_steps = engine.config().max_steps_per_sprint;
        let mut visits = 0;
        loop {
            cursor = match cursor {
                Cursor::Visit { run, node } => {
                    visits += 1;
                    if visits > max_steps {
                        self.fail(
                            sprint,
                            run,
                            format!("reached maximum number of steps per sprint ({})", max_steps),
                        )
                    } else {
                        self.visit(engine, sprint, run, &node)
                    }
                }
                Cursor::Route { run, node } => self.route(engine, sprint, run, &node),
                Cursor::Exit { run, status } => self.exit(run, status),
                Cursor::Wait => {
                    self.status = SessionStatus::Waiting;
                    tracing::debug!(session = %self.uuid, "session waiting for input");
                    return;
                }
                Cursor::Done => {
                    tracing::debug!(session = %self.uuid, status = ?self.status, "session ended");
                    return;
                }
            };
        }
    }

    fn visit(&mut self, engine: &Engine, sprint: &mut Sprint, run: usize, node_uuid: &str) -> Cursor {
        let flow = Arc::clone(&self.runs[run].flow);
        let Some(node) = flow.node(node_uuid) else {
            return self.fail(
                sprint,
                run,
                format!("no such node '{}' in flow '{}'", node_uuid, flow.uuid),
            );
        };

        let step = Step::new(node_uuid);
        let step_uuid = step.uuid.clone();
        self.runs[run].path.push(step);
        tracing::debug!(run = %self.runs[run].uuid, node = node_uuid, "visiting node");

        let mut child = None;
        for action in &node.actions {
            let mut scope = RunScope::new(self, engine, sprint, run, &step_uuid);
            if let Err(e) = action.execute(&mut scope) {
                tracing::warn!(action = action.uuid(), kind = action.type_name(), error = %e, "action failed");
                scope.error(e.to_string());
            }
            if let Some(flow) = scope.child.take() {
                child = Some(flow);
            }
        }

        if let Some(flow) = child {
            return self.enter_child(sprint, run, &step_uuid, flow);
        }

        match &node.router {
            Some(router) if router.wait.is_some() => {
                self.runs[run].status = RunStatus::Waiting;
                self.log(sprint, run, Some(step_uuid.as_str()), EventPayload::MsgWait(MsgWait {}));
                Cursor::Wait
            }
            Some(_) => Cursor::Route {
                run,
                node: node_uuid.to_string(),
            },
            None => self.follow(run, node.exits.first()),
        }
    }

    fn route(&mut self, engine: &Engine, sprint: &mut Sprint, run: usize, node_uuid: &str) -> Cursor {
        let flow = Arc::clone(&self.runs[run].flow);
        let Some(node) = flow.node(node_uuid) else {
            return self.fail(
                sprint,
                run,
                format!("no such node '{}' in flow '{}'", node_uuid, flow.uuid),
            );
        };
        let Some(router) = &node.router else {
            return self.follow(run, node.exits.first());
        };
        let step_uuid = self.runs[run]
            .current_step()
            .map(|s| s.uuid.clone())
            .unwrap_or_default();

        let route = {
            let mut scope = RunScope::new(self, engine, sprint, run, &step_uuid);
            let route = router.route(&mut scope);
            if let (Some(route), Some(name)) = (&route, &router.result_name) {
                scope.save_result(
                    name,
                    &route.value,
                    &route.category.name,
                    &route.operand,
                    route.extra.clone(),
                );
            }
            route
        };

        let Some(route) = route else {
            return self.fail(
                sprint,
                run,
                format!("router of node '{}' picked a missing category", node_uuid),
            );
        };
        match node.exit(&route.category.exit_uuid) {
            Some(exit) => self.follow(run, Some(exit)),
            None => self.fail(
                sprint,
                run,
                format!(
                    "category '{}' of node '{}' has no exit '{}'",
                    route.category.name, node_uuid, route.category.exit_uuid
                ),
            ),
        }
    }

    /// Records the exit on the current step and moves to its destination.
    fn follow(&mut self, run: usize, exit: Option<&Exit>) -> Cursor {
        if let Some(step) = self.runs[run].path.last_mut() {
            step.exit_uuid = exit.map(|e| e.uuid.clone());
        }
        match exit.and_then(|e| e.destination_uuid.clone()) {
            Some(node) => Cursor::Visit { run, node },
            None => Cursor::Exit {
                run,
                status: RunStatus::Completed,
            },
        }
    }

    fn enter_child(&mut self, sprint: &mut Sprint, run: usize, step_uuid: &str, flow: AssetRef) -> Cursor {
        let Some(child_flow) = self.assets.flow(&flow.uuid).cloned() else {
            return self.fail(sprint, run, format!("no such flow with UUID '{}'", flow.uuid));
        };
        let parent_uuid = self.runs[run].uuid.clone();
        self.log(
            sprint,
            run,
            Some(step_uuid),
            EventPayload::FlowEntered(FlowEntered {
                flow: child_flow.reference(),
                parent_run_uuid: parent_uuid.clone(),
            }),
        );
        self.start_run(child_flow, Some(parent_uuid))
    }

    /// Logs a failure on `run` and exits it as errored.
    fn fail(&mut self, sprint: &mut Sprint, run: usize, text: String) -> Cursor {
        tracing::error!(run = %self.runs[run].uuid, "{}", text);
        let step_uuid = self.runs[run].current_step().map(|s| s.uuid.clone());
        self.log(sprint, run, step_uuid.as_deref(), events::failure(text));
        Cursor::Exit {
            run,
            status: RunStatus::Errored,
        }
    }

    fn exit(&mut self, run: usize, status: RunStatus) -> Cursor {
        let exiting = &mut self.runs[run];
        exiting.status = status;
        exiting.exited_on = Some(OffsetDateTime::now_utc());
        let parent = exiting.parent_uuid.clone();

        match parent.and_then(|uuid| self.run_by_uuid(&uuid)) {
            Some(parent) if status == RunStatus::Errored => Cursor::Exit {
                run: parent,
                status: RunStatus::Errored,
            },
            Some(parent) => match self.runs[parent].current_step() {
                Some(step) => Cursor::Route {
                    run: parent,
                    node: step.node_uuid.clone(),
                },
                None => Cursor::Exit {
                    run: parent,
                    status: RunStatus::Completed,
                },
            },
            None => {
                self.status = if status == RunStatus::Errored {
                    SessionStatus::Failed
                } else {
                    SessionStatus::Completed
                };
                Cursor::Done
            }
        }
    }
}

// ──────────────────────────────────────────────
// Run scope
// ──────────────────────────────────────────────

/// What an action or router sees of the session while it runs: template
/// evaluation against the current run, contact modifiers, results and the
/// event log.
pub struct RunScope<'s> {
    session: &'s mut Session,
    engine: &'s Engine,
    sprint: &'s mut Sprint,
    run: usize,
    step_uuid: &'s str,
    child: Option<AssetRef>,
}

impl<'s> RunScope<'s> {
    fn new(
        session: &'s mut Session,
        engine: &'s Engine,
        sprint: &'s mut Sprint,
        run: usize,
        step_uuid: &'s str,
    ) -> Self {
        RunScope {
            session,
            engine,
            sprint,
            run,
            step_uuid,
            child: None,
        }
    }

    pub fn services(&self) -> &Services {
        self.engine.services()
    }

    pub fn config(&self) -> &EngineConfig {
        self.engine.config()
    }

    pub fn assets(&self) -> Arc<SessionAssets> {
        Arc::clone(&self.session.assets)
    }

    pub fn environment(&self) -> &Environment {
        &self.session.environment
    }

    pub fn contact(&self) -> &Contact {
        &self.session.contact
    }

    pub fn run(&self) -> &Run {
        &self.session.runs[self.run]
    }

    /// The message the session is currently handling, if any.
    pub fn input(&self) -> Option<&Input> {
        self.session.input.as_ref()
    }

    pub fn node_uuid(&self) -> &str {
        self.run().current_step().map_or("", |s| s.node_uuid.as_str())
    }

    /// Resolves a single expression path against the run's context.
    pub fn resolve(&self, path: &str) -> Value {
        let root = context_root(&*self.session, self.run);
        Scope::new(&root, TOP_LEVEL_KEYS).resolve(path)
    }

    /// Evaluates a template, truncated to the environment's value limit.
    /// Expression errors are logged as `error` events.
    pub fn evaluate(&mut self, template: &str) -> String {
        let max = self.session.environment.max_value_length;
        self.evaluate_with(template, TemplateOptions::truncated(max))
    }

    pub fn evaluate_with(&mut self, template: &str, options: TemplateOptions) -> String {
        let (text, errors) = {
            let root = context_root(&*self.session, self.run);
            Scope::new(&root, TOP_LEVEL_KEYS).evaluate(template, options)
        };
        for e in errors {
            self.error(e.to_string());
        }
        text
    }

    /// Evaluates a template, or `None` when any expression in it failed.
    /// Failures are logged as `error` events.
    pub fn try_evaluate(&mut self, template: &str) -> Option<String> {
        let max = self.session.environment.max_value_length;
        let (text, errors) = {
            let root = context_root(&*self.session, self.run);
            Scope::new(&root, TOP_LEVEL_KEYS).evaluate(template, TemplateOptions::truncated(max))
        };
        let failed = !errors.is_empty();
        for e in errors {
            self.error(e.to_string());
        }
        (!failed).then_some(text)
    }

    pub fn log(&mut self, payload: EventPayload) {
        self.session
            .log(self.sprint, self.run, Some(self.step_uuid), payload);
    }

    pub fn error(&mut self, text: impl Into<String>) {
        self.log(events::error(text));
    }

    /// Applies a modifier to the contact and records it in the sprint.
    pub fn apply_modifier(&mut self, modifier: Modifier) {
        let mut payloads = Vec::new();
        {
            let session = &mut *self.session;
            modifier.apply(
                &session.environment,
                self.engine.services(),
                &session.assets,
                &mut session.contact,
                &mut |e| payloads.push(e),
            );
        }
        for payload in payloads {
            self.log(payload);
        }
        self.sprint.modifiers.push(modifier);
    }

    /// Saves a result on the current run and logs `run_result_changed`.
    pub fn save_result(
        &mut self,
        name: &str,
        value: &str,
        category: &str,
        input: &str,
        extra: Option<serde_json::Value>,
    ) {
        let env = &self.session.environment;
        let result = RunResult {
            name: name.to_string(),
            value: env.truncate(value),
            category: env.truncate(category),
            category_localized: String::new(),
            node_uuid: self.node_uuid().to_string(),
            input: env.truncate(input),
            extra,
            created_on: OffsetDateTime::now_utc(),
        };
        let event = RunResultChanged {
            name: result.name.clone(),
            value: result.value.clone(),
            category: result.category.clone(),
            input: result.input.clone(),
            extra: result.extra.clone(),
        };
        self.session.runs[self.run].results.save(result);
        self.log(EventPayload::RunResultChanged(event));
    }

    /// Sets `@webhook` for the rest of this sprint.
    pub fn set_webhook(&mut self, value: Value) {
        self.session.webhook = Some(value);
    }

    /// Asks the driver to start a child run once the current node's actions
    /// have finished.
    pub fn enter_flow(&mut self, flow: AssetRef) {
        self.child = Some(flow);
    }
}

/// Builds the expression context for `run`.
fn context_root(session: &Session, run: usize) -> Fields<'_> {
    let current = &session.runs[run];
    let parent = current
        .parent_uuid
        .as_deref()
        .and_then(|uuid| session.runs.iter().find(|r| r.uuid == uuid));
    let child = session
        .runs
        .iter()
        .rev()
        .find(|r| r.parent_uuid.as_deref() == Some(current.uuid.as_str()));

    Fields::new("context")
        .with(
            "contact",
            Item::Owned(Box::new(ContactContext {
                contact: &session.contact,
                assets: &session.assets,
            })),
        )
        .with(
            "fields",
            Item::Owned(Box::new(FieldValues {
                contact: &session.contact,
                assets: &session.assets,
            })),
        )
        .with("urns", Item::Entity(&session.contact.urns))
        .with(
            "results",
            Item::Owned(Box::new(ResultsContext {
                results: &current.results,
                detail: Detail::Simple,
            })),
        )
        .with("run", Item::Owned(Box::new(RunContext(current))))
        .with(
            "input",
            match &session.input {
                Some(input) => Item::Owned(Box::new(InputContext(input))),
                None => Item::text(""),
            },
        )
        .with(
            "webhook",
            match &session.webhook {
                Some(value) => Item::borrowed(value),
                None => Item::text(""),
            },
        )
        .with("trigger", Item::Owned(Box::new(TriggerContext(&session.trigger))))
        .with("parent", run_item(parent))
        .with("child", run_item(child))
}

fn run_item(run: Option<&Run>) -> Item<'_> {
    match run {
        Some(run) => Item::Owned(Box::new(RunContext(run))),
        None => Item::text(""),
    }
}
