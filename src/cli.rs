use clap::{Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// Resolve the effective output format.
    /// If user specified a format, use it.
    /// Otherwise: TTY → Text, non-TTY (pipe) → Json
    pub fn resolve(user_choice: Option<OutputFormat>) -> OutputFormat {
        match user_choice {
            Some(fmt) => fmt,
            None => {
                if std::io::stdout().is_terminal() {
                    OutputFormat::Text
                } else {
                    OutputFormat::Json
                }
            }
        }
    }
}

#[derive(Parser)]
#[command(
    name = "hookpost",
    about = "Deliver event notifications to webhook endpoints",
    version = env!("GIT_DESCRIBE"),
    after_help = "Logs are written to: ~/.local/share/hookpost/logs/hookpost.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to hookpost.yaml config file")]
    pub config: Option<PathBuf>,

    /// Suppress non-error output
    #[arg(short, long, global = true, help = "Suppress non-error output")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build and deliver a notification for an event
    Send {
        /// Event JSON file (reads stdin when omitted)
        event: Option<PathBuf>,

        /// Deliver to this endpoint instead of the configured rules
        #[arg(long, short = 'e')]
        endpoint: Option<String>,

        /// Only deliver for the named rule(s)
        #[arg(long, short = 'r')]
        rule: Vec<String>,

        /// Skip TLS certificate and hostname verification
        #[arg(long)]
        insecure: bool,

        /// Request timeout in seconds
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        timeout: Option<u64>,

        /// Send even when notifications are disabled
        #[arg(long)]
        force: bool,
    },

    /// Print the payload that would be sent for an event
    Preview {
        /// Event JSON file (reads stdin when omitted)
        event: Option<PathBuf>,
    },

    /// Show recent delivery attempts
    Audit {
        /// Number of records to show
        #[arg(long, short = 'n', default_value = "20")]
        last: usize,

        /// Only show records whose endpoint contains this text
        #[arg(long)]
        endpoint: Option<String>,

        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show current configuration
    Show {
        /// Output format (default: text for TTY, json for pipes)
        #[arg(long, short = 'o', value_enum)]
        format: Option<OutputFormat>,
    },

    /// Get a configuration value
    Get {
        /// Config key (e.g., notifications.enabled)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Config key
        key: String,

        /// Value to set
        value: String,
    },
}
