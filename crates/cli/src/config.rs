//! TOML configuration for the `switchboard` binary.
//!
//! Every section is optional:
//!
//! ```toml
//! [engine]
//! max_steps_per_sprint = 50
//!
//! [engine.json]
//! numbers = "quoted"
//!
//! [webhook]
//! timeout_secs = 10
//! user_agent = "switchboard/0.1"
//!
//! [environment]
//! default_language = "eng"
//! default_country = "US"
//! ```

use std::path::Path;

use serde::Deserialize;
use switchboard_eval::{EngineConfig, Environment};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    /// Environment given to every session started by `run`.
    #[serde(default)]
    pub environment: Option<Environment>,
}

/// `[webhook]` section.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebhookConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        WebhookConfig {
            timeout_secs: 15,
            user_agent: format!("switchboard/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Reads the config at `path`, or the defaults when no path is given.
pub fn read_config(path: Option<&Path>) -> Result<CliConfig, String> {
    let Some(path) = path else {
        return Ok(CliConfig::default());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read '{}': {}", path.display(), e))?;
    toml::from_str(&content).map_err(|e| format!("could not parse '{}': {}", path.display(), e))
}
