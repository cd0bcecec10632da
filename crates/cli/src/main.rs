// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! pairlog - operator CLI for a pairlog daemon

mod client;
mod commands;
mod error;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{log, status, write};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "pairlog", version, about = "pairlog - replicated commit log")]
struct Cli {
    /// Daemon base URL
    #[arg(
        long,
        global = true,
        env = "PAIRLOG_SERVER",
        default_value = "http://127.0.0.1:4000"
    )]
    server: String,

    /// API key sent in X-Api-Key
    #[arg(long, global = true, env = "PAIRLOG_TOKEN")]
    token: Option<String>,

    #[arg(long, global = true, value_enum, default_value = "json")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit an operation through the replication path
    Do(write::DoArgs),
    /// Show replica status
    Status,
    /// Inspect or drive the commit log directly
    Log(log::LogArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = client::connect(&cli.server, cli.token.as_deref())?;

    match cli.command {
        Commands::Do(args) => write::handle(&client, args, cli.output).await,
        Commands::Status => status::handle(&client, cli.output).await,
        Commands::Log(args) => log::handle(&client, args.command, cli.output).await,
    }
}
