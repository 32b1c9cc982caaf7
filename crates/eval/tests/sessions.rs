//! End-to-end sessions against recording service fakes.
//!
//! Each fake records what the engine asked of it so tests can check both the
//! events a sprint produced and the calls that left the engine.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use serde_json::json;
use switchboard_eval::{
    services::{
        AirtimeService, AirtimeTransfer, Classification, ClassificationService, EmailService,
        ExtractedIntent, ServiceError, Ticket, TicketService, WebhookCall, WebhookRequest,
        WebhookResponse, WebhookService,
    },
    AssetRef, ContactUrn, Engine, EngineError, Environment, EventPayload, SessionStatus, Sprint,
    Value,
};

// ──────────────────────────────────────────────
// Fakes
// ──────────────────────────────────────────────

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<(Vec<String>, String, String)>>,
}

impl EmailService for Outbox {
    fn send(&self, addresses: &[String], subject: &str, body: &str) -> Result<(), ServiceError> {
        self.sent
            .lock()
            .unwrap()
            .push((addresses.to_vec(), subject.to_string(), body.to_string()));
        Ok(())
    }
}

struct Classifier {
    fail: bool,
}

impl ClassificationService for Classifier {
    fn classify(&self, _env: &Environment, input: &str) -> Result<Classification, ServiceError> {
        if self.fail {
            return Err(ServiceError::failed("classification", "quota exceeded"));
        }
        let name = if input.contains("flight") {
            "book_flight"
        } else {
            "book_hotel"
        };
        Ok(Classification {
            intents: vec![
                ExtractedIntent {
                    name: name.to_string(),
                    confidence: Decimal::new(9, 1),
                },
                ExtractedIntent {
                    name: "cancel".to_string(),
                    confidence: Decimal::new(1, 1),
                },
            ],
            entities: BTreeMap::new(),
        })
    }
}

#[derive(Default)]
struct Helpdesk {
    opened: Mutex<Vec<(String, String)>>,
}

impl TicketService for Helpdesk {
    fn open(&self, subject: &str, body: &str) -> Result<Ticket, ServiceError> {
        self.opened
            .lock()
            .unwrap()
            .push((subject.to_string(), body.to_string()));
        Ok(Ticket {
            uuid: "t-1".to_string(),
            ticketer: AssetRef::new("tk-1", "Support"),
            subject: subject.to_string(),
            body: body.to_string(),
            external_id: Some("123".to_string()),
        })
    }
}

#[derive(Default)]
struct Airtime {
    transfers: Mutex<Vec<(Option<String>, String)>>,
}

impl AirtimeService for Airtime {
    fn transfer(
        &self,
        sender: Option<&ContactUrn>,
        recipient: &ContactUrn,
        amounts: &BTreeMap<String, Decimal>,
    ) -> Result<AirtimeTransfer, ServiceError> {
        let sender = sender.map(ContactUrn::identity);
        self.transfers
            .lock()
            .unwrap()
            .push((sender.clone(), recipient.identity()));
        let amount = amounts
            .get("USD")
            .copied()
            .ok_or_else(|| ServiceError::failed("airtime", "no USD amount"))?;
        Ok(AirtimeTransfer {
            sender: sender.unwrap_or_default(),
            recipient: recipient.identity(),
            currency: "USD".to_string(),
            desired_amount: amount,
            actual_amount: amount,
        })
    }
}

/// Answers 410 for subscribers on `gone.example.com`, 200 otherwise.
#[derive(Default)]
struct Subscribers {
    requests: Mutex<Vec<WebhookRequest>>,
}

impl WebhookService for Subscribers {
    fn call(&self, request: &WebhookRequest) -> Result<WebhookCall, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        let status = if request.url.contains("gone.example.com") {
            410
        } else {
            200
        };
        Ok(WebhookCall {
            request: request.clone(),
            response: Some(WebhookResponse {
                status,
                body: r#"{"ok": true}"#.to_string(),
            }),
            error: None,
            elapsed_ms: 3,
        })
    }
}

struct Fakes {
    outbox: Arc<Outbox>,
    helpdesk: Arc<Helpdesk>,
    airtime: Arc<Airtime>,
    subscribers: Arc<Subscribers>,
}

fn engine_with(fakes: &Fakes, classifier_fails: bool) -> Engine {
    let outbox = Arc::clone(&fakes.outbox);
    let helpdesk = Arc::clone(&fakes.helpdesk);
    let airtime = Arc::clone(&fakes.airtime);
    let subscribers = Arc::clone(&fakes.subscribers);
    Engine::builder()
        .with_email_service_factory(move |_| Ok(Arc::clone(&outbox) as Arc<dyn EmailService>))
        .with_classification_service_factory(move |_| {
            Ok(Arc::new(Classifier {
                fail: classifier_fails,
            }) as Arc<dyn ClassificationService>)
        })
        .with_ticket_service_factory(move |_| Ok(Arc::clone(&helpdesk) as Arc<dyn TicketService>))
        .with_airtime_service_factory(move |_| Ok(Arc::clone(&airtime) as Arc<dyn AirtimeService>))
        .with_webhook_service_factory(move |_| {
            Ok(Arc::clone(&subscribers) as Arc<dyn WebhookService>)
        })
        .build()
}

fn fakes() -> Fakes {
    Fakes {
        outbox: Arc::default(),
        helpdesk: Arc::default(),
        airtime: Arc::default(),
        subscribers: Arc::default(),
    }
}

// ──────────────────────────────────────────────
// Fixtures
// ──────────────────────────────────────────────

fn assets_json(actions: serde_json::Value) -> serde_json::Value {
    json!({
        "flows": [{
            "uuid": "f-1",
            "name": "Onboarding",
            "nodes": [{
                "uuid": "n-1",
                "actions": actions,
                "exits": [{"uuid": "e-1"}]
            }]
        }],
        "channels": [{
            "uuid": "ch-1",
            "name": "Nexmo",
            "address": "+250788000001",
            "schemes": ["tel"],
            "roles": ["send", "receive"]
        }],
        "groups": [{"uuid": "g-1", "name": "Testers"}],
        "fields": [{"key": "age", "name": "Age", "type": "number"}],
        "classifiers": [{"uuid": "cl-1", "name": "Booking", "type": "wit", "intents": ["book_flight", "book_hotel"]}],
        "ticketers": [{"uuid": "tk-1", "name": "Support", "type": "mailgun"}],
        "resthooks": [{
            "slug": "new-tester",
            "subscribers": ["http://gone.example.com/hook", "http://live.example.com/hook"]
        }]
    })
}

fn start(engine: &Engine, actions: serde_json::Value) -> (switchboard_eval::Session, Sprint) {
    let assets = Arc::new(engine.read_assets(&assets_json(actions)).unwrap());
    let trigger = engine
        .read_trigger(&json!({
            "type": "manual",
            "flow": {"uuid": "f-1", "name": "Onboarding"},
            "contact": {
                "uuid": "c-1",
                "name": "Ryan Lewis",
                "created_on": "2018-06-20T11:40:30Z",
                "urns": ["tel:+12065551212"]
            },
            "triggered_on": "2000-01-01T00:00:00Z"
        }))
        .unwrap();
    engine.start(assets, trigger).unwrap()
}

fn everything() -> serde_json::Value {
    json!([
        {"type": "add_contact_groups", "uuid": "a-1", "groups": [{"uuid": "g-1", "name": "Testers"}]},
        {"type": "set_contact_field", "uuid": "a-2", "field": {"key": "age", "name": "Age"}, "value": "23"},
        {"type": "add_contact_urn", "uuid": "a-3", "scheme": "twitter", "path": "ryan"},
        {
            "type": "send_email",
            "uuid": "a-4",
            "addresses": ["ops@example.com"],
            "subject": "New tester\n@contact.name",
            "body": "Age: @fields.age"
        },
        {
            "type": "call_classifier",
            "uuid": "a-5",
            "classifier": {"uuid": "cl-1", "name": "Booking"},
            "input": "book me a flight",
            "result_name": "Intent"
        },
        {
            "type": "open_ticket",
            "uuid": "a-6",
            "ticketer": {"uuid": "tk-1", "name": "Support"},
            "subject": "Needs help",
            "body": "wants @results.intent.value",
            "result_name": "Ticket"
        },
        {"type": "transfer_airtime", "uuid": "a-7", "amounts": {"USD": 1.5}, "result_name": "Reward"},
        {"type": "call_resthook", "uuid": "a-8", "resthook": "new-tester", "result_name": "Hook"}
    ])
}

fn result_value(session: &switchboard_eval::Session, key: &str) -> (String, String) {
    let result = session.runs()[0].results.get(key).unwrap();
    (result.value.clone(), result.category.clone())
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[test]
fn every_service_action_in_one_sprint() {
    let fakes = fakes();
    let engine = engine_with(&fakes, false);
    let (session, sprint) = start(&engine, everything());

    assert_eq!(
        sprint.event_types(),
        vec![
            "contact_groups_changed",
            "contact_field_changed",
            "contact_urns_changed",
            "email_sent",
            "service_called",
            "run_result_changed",
            "ticket_opened",
            "run_result_changed",
            "airtime_transferred",
            "run_result_changed",
            "webhook_called",
            "webhook_called",
            "run_result_changed",
        ]
    );
    assert_eq!(sprint.modifiers.len(), 3);
    assert_eq!(session.status(), SessionStatus::Completed);

    // contact changes
    let contact = session.contact();
    assert!(contact.in_group("g-1"));
    assert_eq!(contact.field_value("age"), Value::from(23i64));
    assert_eq!(contact.urns.len(), 2);

    // email: subject is flattened to one line
    let sent = fakes.outbox.sent.lock().unwrap();
    assert_eq!(
        *sent,
        vec![(
            vec!["ops@example.com".to_string()],
            "New tester Ryan Lewis".to_string(),
            "Age: 23".to_string()
        )]
    );

    // classifier result feeds the ticket
    assert_eq!(
        result_value(&session, "intent"),
        ("book_flight".to_string(), "Success".to_string())
    );
    let opened = fakes.helpdesk.opened.lock().unwrap();
    assert_eq!(opened[0].1, "wants book_flight");
    assert_eq!(
        result_value(&session, "ticket"),
        ("t-1".to_string(), "Success".to_string())
    );

    // airtime goes from the tel channel to the first tel URN
    let transfers = fakes.airtime.transfers.lock().unwrap();
    assert_eq!(
        *transfers,
        vec![(
            Some("tel:+250788000001".to_string()),
            "tel:+12065551212".to_string()
        )]
    );
    assert_eq!(
        result_value(&session, "reward"),
        ("1.5".to_string(), "Success".to_string())
    );

    // the resthook result comes from the last call when none failed
    assert_eq!(
        result_value(&session, "hook"),
        ("200".to_string(), "Success".to_string())
    );
}

#[test]
fn amounts_and_confidences_encode_as_bare_numbers() {
    let fakes = fakes();
    let engine = engine_with(&fakes, false);
    let (session, sprint) = start(&engine, everything());

    let json = sprint.to_json().unwrap();
    let transferred = json["events"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["type"] == "airtime_transferred")
        .unwrap();
    assert!(transferred["desired_amount"].is_number());
    assert_eq!(transferred["actual_amount"].to_string(), "1.5");

    let intent = session.runs()[0].results.get("intent").unwrap();
    let extra = intent.extra.as_ref().unwrap();
    assert!(extra["intents"][0]["confidence"].is_number());
    assert_eq!(extra["intents"][0]["confidence"].to_string(), "0.9");

    let session_json = session.to_json(&engine.config().json).unwrap();
    let cancel = &session_json["runs"][0]["results"]["intent"]["extra"]["intents"][1];
    assert_eq!(cancel["confidence"].to_string(), "0.1");
}

#[test]
fn resthook_posts_run_summary_to_each_subscriber() {
    let fakes = fakes();
    let engine = engine_with(&fakes, false);
    let (_, sprint) = start(
        &engine,
        json!([{"type": "call_resthook", "uuid": "a-1", "resthook": "new-tester"}]),
    );

    let statuses: Vec<String> = sprint
        .events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::WebhookCalled(w) => {
                assert_eq!(w.resthook.as_deref(), Some("new-tester"));
                Some(w.status.to_string())
            }
            _ => None,
        })
        .collect();
    assert_eq!(statuses, vec!["subscriber_gone", "success"]);

    let requests = fakes.subscribers.requests.lock().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r.method == "POST"));
    let payload: serde_json::Value = serde_json::from_str(&requests[0].body).unwrap();
    assert_eq!(payload["contact"]["uuid"], "c-1");
    assert_eq!(payload["contact"]["urn"], "tel:+12065551212");
    assert_eq!(payload["flow"]["name"], "Onboarding");
}

#[test]
fn classifier_failure_saves_failure_result() {
    let fakes = fakes();
    let engine = engine_with(&fakes, true);
    let (session, sprint) = start(&engine, everything());

    assert_eq!(
        result_value(&session, "intent"),
        ("".to_string(), "Failure".to_string())
    );
    let errors: Vec<&str> = sprint
        .events
        .iter()
        .filter_map(|e| match &e.payload {
            EventPayload::Error(err) => Some(err.text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(errors, vec!["classification service error: quota exceeded"]);

    // later actions still run
    assert_eq!(
        result_value(&session, "ticket"),
        ("t-1".to_string(), "Success".to_string())
    );
    assert_eq!(session.status(), SessionStatus::Completed);
}

#[test]
fn classifier_without_service_is_not_called() {
    let engine = Engine::builder().build();
    let (session, sprint) = start(
        &engine,
        json!([{
            "type": "call_classifier",
            "uuid": "a-1",
            "classifier": {"uuid": "cl-1", "name": "Booking"},
            "input": "book me a flight",
            "result_name": "Intent"
        }]),
    );

    assert_eq!(sprint.event_types(), vec!["error", "run_result_changed"]);
    assert_eq!(
        result_value(&session, "intent"),
        ("".to_string(), "Failure".to_string())
    );
}

#[test]
fn unknown_assets_are_logged_not_fatal() {
    let fakes = fakes();
    let engine = engine_with(&fakes, false);
    let (session, sprint) = start(
        &engine,
        json!([
            {"type": "set_contact_field", "uuid": "a-1", "field": {"key": "shoe_size", "name": "Shoe Size"}, "value": "9"},
            {"type": "call_resthook", "uuid": "a-2", "resthook": "missing"},
            {"type": "open_ticket", "uuid": "a-3", "ticketer": {"uuid": "tk-9", "name": "Gone"}, "subject": "x", "body": "y"}
        ]),
    );

    assert_eq!(sprint.event_types(), vec!["error", "error", "error"]);
    assert!(sprint.modifiers.is_empty());
    assert_eq!(session.status(), SessionStatus::Completed);
}

#[test]
fn invalid_assets_are_rejected() {
    let engine = Engine::builder().build();
    let mut bad = assets_json(json!([]));
    bad["fields"] = json!([{"key": "age", "name": "Age", "type": "color"}]);
    let err = engine.read_assets(&bad).unwrap_err();
    assert!(matches!(err, EngineError::InvalidAsset(_)));
    assert_eq!(err.to_string(), "invalid asset: field 'age' has unknown type 'color'");
}

#[test]
fn sprint_serializes_events_and_modifiers() {
    let fakes = fakes();
    let engine = engine_with(&fakes, false);
    let (_, sprint) = start(
        &engine,
        json!([{"type": "add_contact_groups", "uuid": "a-1", "groups": [{"uuid": "g-1", "name": "Testers"}]}]),
    );

    let json = sprint.to_json().unwrap();
    assert_eq!(json["modifiers"][0]["type"], "groups");
    assert_eq!(json["modifiers"][0]["modification"], "add");
    assert_eq!(json["events"][0]["type"], "contact_groups_changed");
    assert_eq!(json["events"][0]["groups_added"][0]["name"], "Testers");
}
