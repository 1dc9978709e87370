//! CLI command definitions for the `parlor` binary.

pub mod agents;
pub mod chat;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Chat agents with tools and per-conversation memory.
#[derive(Parser)]
#[command(name = "parlor", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: $PARLOR_CONFIG, then ~/.parlor/config.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Detailed output (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Export spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 if self.quiet => "error",
            0 => "warn",
            1 => "info,parlor=debug",
            _ => "trace",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server.
    Serve {
        /// Port to listen on (default: [server] port).
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to (default: [server] host).
        #[arg(long)]
        host: Option<String>,
    },

    /// Send one message to an agent.
    Chat {
        /// Agent name (see `parlor agents`).
        agent: String,

        message: String,

        /// Conversation id; omit for a stateless turn.
        #[arg(short, long)]
        conversation: Option<String>,

        /// Persona parameter, e.g. `--param voice=pirate`. Repeatable.
        #[arg(long = "param", value_parser = parse_key_val)]
        params: Vec<(String, String)>,

        /// Print the answer as it is generated.
        #[arg(long)]
        stream: bool,
    },

    /// List available agents.
    #[command(alias = "ls")]
    Agents {
        /// Output machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_key_val(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{raw}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
