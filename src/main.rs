//! kconfig-header CLI - write a C configuration header from Kconfig.

use clap::Parser;
use kconfig_header::Error;
use kconfig_header::cli::{Cli, USAGE};
use kconfig_header::commands::{self, CommandResult};
use std::io::IsTerminal;
use std::process;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "KCONFIG_HEADER_LOG";

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let json = cli.json;

    let result = cli.request().and_then(|request| commands::generate(&request));

    match result {
        Ok(result) => output(&result, json),
        Err(e) => {
            report_error(&e, json);
            process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .init();
}

/// Print output in JSON or human-readable format.
fn output<T: CommandResult>(result: &T, json: bool) {
    if json {
        println!("{}", result.to_json());
    } else {
        println!("{}", result.to_human());
    }
}

fn report_error(e: &Error, json: bool) {
    if matches!(e, Error::Usage(_)) {
        println!("{}", USAGE);
    }
    if json {
        eprintln!("{}", serde_json::json!({ "error": e.to_string() }));
    } else if matches!(e, Error::MissingFile(_)) {
        eprintln!("{}", e);
    } else {
        eprintln!("Error: {}", e);
    }
}
