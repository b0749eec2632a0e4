//! `typebridge api`.

use clap::Args;
use std::path::PathBuf;

use typebridge_core::discover::{DefaultSelection, Selection};
use typebridge_core::{ApiOptions, DEFAULT_API_PATH, DEFAULT_ROOTS, generate_api};

use super::{prefer_flags, write_output};
use crate::config::{SelectionMode, load_config};
use crate::format::{FormatArgs, run_formatter};

/// Output path when neither flag nor config names one.
pub const DEFAULT_API_OUT: &str = "Generated/ConvexApi.swift";

#[derive(Args, Debug, Clone)]
pub struct ApiArgs {
    /// Declaration file to read [default: convex/_generated/api.d.ts]
    #[arg(long = "api", value_name = "PATH")]
    pub api: Option<PathBuf>,
    /// Swift file to write [default: Generated/ConvexApi.swift]
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// Root export to walk; repeat for several [default: api, internal]
    #[arg(long = "root", value_name = "NAME")]
    pub roots: Vec<String>,
    /// Functions to generate, overriding the default selection
    #[arg(long, value_delimiter = ',', value_name = "PATHS")]
    pub include: Vec<String>,
    /// Functions to leave out
    #[arg(long, value_delimiter = ',', value_name = "PATHS")]
    pub exclude: Vec<String>,
    /// Selection used without --include
    #[arg(long = "default-selection", value_enum, value_name = "MODE")]
    pub default_selection: Option<SelectionMode>,
    /// Functions selected by --default-selection=curated
    #[arg(long, value_delimiter = ',', value_name = "PATHS")]
    pub curated: Vec<String>,
    #[command(flatten)]
    pub format: FormatArgs,
    /// Config file [default: typebridge.toml when present]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Run the command; returns the process exit code.
pub fn run(args: ApiArgs) -> i32 {
    match run_inner(args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn run_inner(args: ApiArgs) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let api = config.api;

    let roots = if args.roots.is_empty() {
        api.roots.clone().unwrap_or_else(|| {
            DEFAULT_ROOTS.iter().map(|r| (*r).to_string()).collect()
        })
    } else {
        args.roots
    };
    if roots.is_empty() {
        return Err("At least one root export is required".to_string());
    }

    let mode = args
        .default_selection
        .or(api.default_selection)
        .unwrap_or_default();
    let default = match mode {
        SelectionMode::Public => DefaultSelection::Public,
        SelectionMode::Curated => {
            let curated = prefer_flags(args.curated, &api.curated);
            if curated.is_empty() {
                return Err(
                    "Curated selection requires a curated list (--curated or [api].curated)"
                        .to_string(),
                );
            }
            DefaultSelection::Curated(curated)
        }
    };

    let options = ApiOptions {
        input: args
            .api
            .or(api.input)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_API_PATH)),
        roots,
        selection: Selection {
            include: prefer_flags(args.include, &api.include),
            exclude: prefer_flags(args.exclude, &api.exclude),
            default,
        },
    };
    let out = args
        .out
        .or(api.out)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_API_OUT));

    let generated = generate_api(&options).map_err(|err| err.to_string())?;
    write_output(&out, &generated.source, "Swift bindings")?;
    if let Some(command) = args.format.resolve(&config.format) {
        run_formatter(&command, &out)?;
    }

    println!(
        "Generated {} functions into {}",
        generated.functions.len(),
        out.display()
    );
    Ok(())
}
