#![forbid(unsafe_code)]
#![deny(unused_must_use, missing_debug_implementations)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! Command-line frontend for `typebridge-core`.
//!
//! Flags are merged over `typebridge.toml`, which is merged over the
//! library defaults. Errors are printed to stderr and mapped to exit codes.

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

mod commands;
mod config;
mod format;

#[derive(Parser)]
#[command(
    name = "typebridge",
    version,
    about = "Generate Swift bindings from Convex API declarations and schemas"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate argument and return types for functions in api.d.ts
    Api(commands::api::ApiArgs),
    /// Generate document types, IR dump and usage report from schema.ts
    Schema(commands::schema::SchemaArgs),
}

/// Parse `args` (including the program name) and run the selected command.
/// Returns the process exit code.
pub fn run_cli(args: Vec<String>) -> i32 {
    match Cli::try_parse_from(args) {
        Ok(cli) => match cli.command {
            Some(Commands::Api(args)) => commands::api::run(args),
            Some(Commands::Schema(args)) => commands::schema::run(args),
            None => {
                let mut cmd = Cli::command();
                let _ = cmd.print_help();
                println!();
                0
            }
        },
        Err(e) => {
            let code = e.exit_code();
            let _ = e.print();
            code
        }
    }
}

/// Install the stderr fmt subscriber.
///
/// `TYPEBRIDGE_LOG` takes a plain level ("trace", "debug", "info", "warn",
/// "error") applied to the typebridge crates, or a full filter spec such as
/// "typebridge_core=debug,typebridge_cli=info".
pub fn init_tracing() {
    let filter = match std::env::var("TYPEBRIDGE_LOG") {
        Ok(level) if is_plain_level(&level) => crate_filter(&level),
        Ok(spec) => spec,
        Err(_) => crate_filter("info"),
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_filter(EnvFilter::new(filter));

    if tracing_subscriber::registry()
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Warning: tracing subscriber already initialized");
    }
}

fn crate_filter(level: &str) -> String {
    let crate_root = module_path!();
    format!("{crate_root}={level},typebridge_core={level}")
}

fn is_plain_level(s: &str) -> bool {
    matches!(
        s.to_ascii_lowercase().as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    )
}
