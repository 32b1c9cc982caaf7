pub(crate) mod run;
pub(crate) mod validate;

use std::path::Path;
use std::process;

use crate::{report_error, OutputFormat};

/// Reads and parses a JSON file, exiting with a report on failure.
pub(crate) fn read_json(path: &Path, what: &str, output: OutputFormat, quiet: bool) -> serde_json::Value {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            let msg = format!("error: could not read {} file '{}': {}", what, path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    };
    match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) => {
            let msg = format!("error: invalid JSON in {}: {}", path.display(), e);
            report_error(&msg, output, quiet);
            process::exit(1);
        }
    }
}
