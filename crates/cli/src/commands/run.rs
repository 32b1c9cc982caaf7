//! `switchboard run`: starts a session and feeds it input from the command
//! line, printing what each sprint produced.

use std::path::Path;
use std::process;
use std::sync::Arc;

use switchboard_eval::events::{Event, EventPayload, Msg};
use switchboard_eval::services::WebhookService;
use switchboard_eval::triggers::{ManualTrigger, MsgResume};
use switchboard_eval::{Engine, Resume, SessionStatus, Sprint, Trigger};
use time::OffsetDateTime;

use super::read_json;
use crate::config::CliConfig;
use crate::http::HttpWebhookService;
use crate::{report_error, OutputFormat};

pub(crate) struct RunOptions<'a> {
    pub assets: &'a Path,
    pub contact: &'a Path,
    pub flow: Option<&'a str>,
    pub inputs: &'a [String],
    pub config: &'a CliConfig,
    pub output: OutputFormat,
    pub quiet: bool,
}

pub(crate) fn cmd_run(opts: RunOptions<'_>) {
    let (output, quiet) = (opts.output, opts.quiet);

    let webhook = Arc::new(HttpWebhookService::new(&opts.config.webhook));
    let engine = Engine::builder()
        .with_config(opts.config.engine)
        .with_webhook_service_factory(move |_| Ok(Arc::clone(&webhook) as Arc<dyn WebhookService>))
        .build();

    let data = read_json(opts.assets, "assets", output, quiet);
    let assets = match engine.read_assets(&data) {
        Ok(a) => Arc::new(a),
        Err(e) => exit_with(&format!("error: {}: {}", opts.assets.display(), e), output, quiet),
    };

    let flow = match opts.flow {
        Some(uuid) => assets.flow(uuid),
        None => assets.flows().next(),
    };
    let Some(flow) = flow.map(|f| f.reference()) else {
        let msg = match opts.flow {
            Some(uuid) => format!("error: no flow with UUID '{}'", uuid),
            None => format!("error: {} contains no flows", opts.assets.display()),
        };
        exit_with(&msg, output, quiet)
    };

    let trigger = Trigger::Manual(ManualTrigger {
        flow,
        contact: read_json(opts.contact, "contact", output, quiet),
        environment: opts.config.environment.clone(),
        params: None,
        triggered_on: OffsetDateTime::now_utc(),
    });

    let (mut session, sprint) = match engine.start(assets, trigger) {
        Ok(started) => started,
        Err(e) => exit_with(&format!("error: {}", e), output, quiet),
    };
    let mut sprints = vec![sprint];

    for text in opts.inputs {
        if session.status() != SessionStatus::Waiting {
            tracing::warn!(input = %text, "session ended before all input was used");
            break;
        }
        let resume = Resume::Msg(MsgResume {
            msg: Msg::text(uuid::Uuid::new_v4().to_string(), text.clone()),
            resumed_on: OffsetDateTime::now_utc(),
        });
        match engine.resume(&mut session, resume) {
            Ok(sprint) => sprints.push(sprint),
            Err(e) => exit_with(&format!("error: {}", e), output, quiet),
        }
    }

    if !quiet {
        match output {
            OutputFormat::Json => {
                let mut encoded = Vec::with_capacity(sprints.len());
                for sprint in &sprints {
                    match sprint.to_json() {
                        Ok(v) => encoded.push(v),
                        Err(e) => exit_with(&format!("error: {}", e), output, quiet),
                    }
                }
                let session_json = match session.to_json(&engine.config().json) {
                    Ok(v) => v,
                    Err(e) => exit_with(&format!("error: {}", e), output, quiet),
                };
                let result = serde_json::json!({ "sprints": encoded, "session": session_json });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&result)
                        .unwrap_or_else(|e| format!("serialization error: {}", e))
                );
            }
            OutputFormat::Text => {
                for (i, sprint) in sprints.iter().enumerate() {
                    print_sprint(i, sprint);
                }
                println!("status: {}", status_name(session.status()));
            }
        }
    }

    if session.status() == SessionStatus::Failed {
        process::exit(1);
    }
}

fn exit_with(msg: &str, output: OutputFormat, quiet: bool) -> ! {
    report_error(msg, output, quiet);
    process::exit(1);
}

fn print_sprint(index: usize, sprint: &Sprint) {
    println!("-- sprint {} --", index + 1);
    for event in &sprint.events {
        println!("{}", describe(event));
    }
}

fn status_name(status: SessionStatus) -> &'static str {
    match status {
        SessionStatus::Active => "active",
        SessionStatus::Waiting => "waiting",
        SessionStatus::Completed => "completed",
        SessionStatus::Failed => "failed",
    }
}

/// One line per event, type first.
fn describe(event: &Event) -> String {
    let detail = match &event.payload {
        EventPayload::MsgCreated(e) => format!("\"{}\"", e.msg.text),
        EventPayload::MsgReceived(e) => format!("\"{}\"", e.msg.text),
        EventPayload::MsgWait(_) => String::new(),
        EventPayload::Error(e) => e.text.clone(),
        EventPayload::Failure(e) => e.text.clone(),
        EventPayload::WebhookCalled(e) => {
            format!("{} {} -> {} ({})", e.method, e.url, e.status_code, e.status)
        }
        EventPayload::RunResultChanged(e) => {
            format!("{} = \"{}\" [{}]", e.name, e.value, e.category)
        }
        EventPayload::EmailSent(e) => format!("to {}: {}", e.addresses.join(", "), e.subject),
        EventPayload::ServiceCalled(e) => e.service.clone(),
        EventPayload::TicketOpened(e) => format!("{} \"{}\"", e.ticket.uuid, e.ticket.subject),
        EventPayload::AirtimeTransferred(e) => {
            format!("{} {} to {}", e.actual_amount, e.currency, e.recipient)
        }
        EventPayload::FlowEntered(e) => format!("{} ({})", e.flow.name, e.flow.uuid),
        EventPayload::ContactNameChanged(e) => format!("\"{}\"", e.name),
        EventPayload::ContactFieldChanged(e) => format!(
            "{} = {}",
            e.field.key,
            e.value
                .as_ref()
                .map_or_else(|| "null".to_string(), |v| v.to_string())
        ),
        EventPayload::ContactLanguageChanged(e) => e.language.clone(),
        EventPayload::ContactUrnsChanged(e) => e.urns.join(", "),
        EventPayload::ContactGroupsChanged(e) => {
            let added: Vec<&str> = e.groups_added.iter().map(|g| g.name.as_str()).collect();
            let removed: Vec<&str> = e.groups_removed.iter().map(|g| g.name.as_str()).collect();
            format!("+[{}] -[{}]", added.join(", "), removed.join(", "))
        }
    };
    if detail.is_empty() {
        format!("[{}]", event.type_name())
    } else {
        format!("[{}] {}", event.type_name(), detail)
    }
}
