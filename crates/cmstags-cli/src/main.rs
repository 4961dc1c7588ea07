// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use cmstags_cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cmstags")]
#[command(author = "Maravilla Labs")]
#[command(version)]
#[command(about = "Render and serve CMS tag templates", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Configuration file
    #[arg(short, long, global = true, default_value = "cmstags.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render one template to stdout
    Render {
        /// Template name relative to the template directory
        template: String,
        /// JSON fixture file (overrides the configuration)
        #[arg(short, long)]
        fixtures: Option<PathBuf>,
    },
    /// Serve the template directory over HTTP
    Serve {
        /// Port to run the server on
        #[arg(short, long)]
        port: Option<u16>,
        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
        /// JSON fixture file (overrides the configuration)
        #[arg(short, long)]
        fixtures: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with the specified log level
    let filter = EnvFilter::try_new(&cli.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render { template, fixtures } => {
            commands::render::run(&cli.config, &template, fixtures.as_deref())
        }
        Commands::Serve { port, host, fixtures } => {
            commands::serve::run(&cli.config, host, port, fixtures.as_deref()).await
        }
    }
}
