//! # saml-sp
//!
//! Command-line tools for the SAML service provider.

#![forbid(unsafe_code)]

use clap::Parser;
use saml_sp_cli::{commands, output::error, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_level.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match commands::run(cli).await {
        Ok(output) => println!("{output}"),
        Err(e) => {
            error(&e.to_string());
            std::process::exit(e.exit_code());
        }
    }
}
