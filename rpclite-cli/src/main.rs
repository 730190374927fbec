//! rpclite-cli - Command-line interface for rpclite
//!
//! Sends one-shot calls, listens for calls, and hashes method names.

mod commands;

use clap::{Parser, Subcommand};
use colored::Colorize;
use rpclite_protocol::WireMode;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "rpclite-cli")]
#[command(about = "Command-line interface for rpclite")]
#[command(version)]
struct Cli {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:11223", env = "RPCLITE_SERVER")]
    server: SocketAddr,

    /// Argument encoding (self_framed or compact); must match the peer
    #[arg(short, long, default_value = "self_framed", env = "RPCLITE_WIRE_MODE")]
    wire_mode: WireMode,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Call a remote method
    Call {
        /// Method name
        method: String,

        /// Argument format, one character per value (i, f, s, b)
        format: String,

        /// Argument values; blobs are hex
        #[arg(allow_hyphen_values = true)]
        values: Vec<String>,
    },

    /// Accept connections and print every call received
    Listen {
        /// Address to listen on
        #[arg(short, long, default_value = "127.0.0.1:11223")]
        bind: SocketAddr,

        /// Method to serve, as NAME:SIGNATURE (repeatable)
        #[arg(short, long = "method", required = true)]
        methods: Vec<String>,
    },

    /// Print the FNV-1a hash of a method name
    Hash {
        /// Method name
        name: String,
    },
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hash { name } => Ok(commands::hash(&name)),
        Commands::Call {
            method,
            format,
            values,
        } => commands::call(cli.server, cli.wire_mode, &method, &format, &values),
        Commands::Listen { bind, methods } => commands::listen(bind, cli.wire_mode, &methods),
    };

    match result {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
