mod commands;
mod config;
mod http;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the log filter, e.g. `switchboard_eval=debug`.
const LOG_ENV: &str = "SWITCHBOARD_LOG";

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Runs and checks switchboard flows.
#[derive(Parser)]
#[command(name = "switchboard", version, about = "Runs and checks switchboard flows")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    quiet: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a session and feed it messages
    Run {
        /// Path to the assets JSON file
        assets: PathBuf,
        /// Path to the contact JSON file
        #[arg(long)]
        contact: PathBuf,
        /// UUID of the flow to start (default: the first flow)
        #[arg(long)]
        flow: Option<String>,
        /// Message text to resume with; repeat for more messages
        #[arg(long = "input")]
        inputs: Vec<String>,
    },

    /// Decode every flow in an assets file and validate its actions
    Validate {
        /// Path to the assets JSON file
        assets: PathBuf,
    },
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging();

    let config = match config::read_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            report_error(&format!("error: {}", e), cli.output, cli.quiet);
            process::exit(1);
        }
    };

    match cli.command {
        Commands::Run {
            assets,
            contact,
            flow,
            inputs,
        } => {
            commands::run::cmd_run(commands::run::RunOptions {
                assets: &assets,
                contact: &contact,
                flow: flow.as_deref(),
                inputs: &inputs,
                config: &config,
                output: cli.output,
                quiet: cli.quiet,
            });
        }
        Commands::Validate { assets } => {
            commands::validate::cmd_validate(&assets, cli.output, cli.quiet);
        }
    }
}

pub(crate) fn report_error(msg: &str, output: OutputFormat, quiet: bool) {
    if quiet {
        return;
    }
    match output {
        OutputFormat::Text => eprintln!("{}", msg),
        OutputFormat::Json => {
            eprintln!("{}", serde_json::json!({ "error": msg }));
        }
    }
}
