use std::path::Path;
use std::process;

use switchboard_eval::Engine;

use super::read_json;
use crate::{report_error, OutputFormat};

/// Decodes every flow in an assets file and validates its actions.
pub(crate) fn cmd_validate(assets_path: &Path, output: OutputFormat, quiet: bool) {
    let data = read_json(assets_path, "assets", output, quiet);
    let engine = Engine::builder().build();

    let assets = match engine.read_assets(&data) {
        Ok(a) => a,
        Err(e) => {
            let msg = format!("error: {}: {}", assets_path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };

    if quiet {
        return;
    }
    let flows: Vec<_> = assets.flows().map(|f| f.reference()).collect();
    match output {
        OutputFormat::Json => {
            let result = serde_json::json!({ "valid": true, "flows": flows });
            println!(
                "{}",
                serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|e| format!("serialization error: {}", e))
            );
        }
        OutputFormat::Text => {
            println!("OK: {} ({} flows)", assets_path.display(), flows.len());
            for flow in &flows {
                println!("  {} {}", flow.uuid, flow.name);
            }
        }
    }
}
