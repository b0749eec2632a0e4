//! `typebridge schema`.

use clap::Args;
use std::path::{Path, PathBuf};

use typebridge_core::{DEFAULT_SCHEMA_PATH, generate_schema};

use super::write_output;
use crate::config::load_config;
use crate::format::{FormatArgs, run_formatter};

/// Output path when neither flag nor config names one.
pub const DEFAULT_SCHEMA_OUT: &str = "Generated/ConvexSchema.swift";

#[derive(Args, Debug, Clone)]
pub struct SchemaArgs {
    /// Schema source to read [default: convex/schema.ts]
    #[arg(long = "schema", value_name = "PATH")]
    pub schema: Option<PathBuf>,
    /// Swift file to write [default: Generated/ConvexSchema.swift]
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
    /// JSON IR dump [default: <out stem>.ir.json next to the output]
    #[arg(long = "ir-out", value_name = "PATH")]
    pub ir_out: Option<PathBuf>,
    /// JSON usage report [default: <out stem>.report.json next to the output]
    #[arg(long = "report-out", value_name = "PATH")]
    pub report_out: Option<PathBuf>,
    #[command(flatten)]
    pub format: FormatArgs,
    /// Config file [default: typebridge.toml when present]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Run the command; returns the process exit code.
pub fn run(args: SchemaArgs) -> i32 {
    match run_inner(args) {
        Ok(()) => 0,
        Err(err) => {
            eprintln!("{err}");
            1
        }
    }
}

fn run_inner(args: SchemaArgs) -> Result<(), String> {
    let config = load_config(args.config.as_deref())?;
    let schema = config.schema;

    let input = args
        .schema
        .or(schema.input)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_PATH));
    let out = args
        .out
        .or(schema.out)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_SCHEMA_OUT));
    let ir_out = args
        .ir_out
        .or(schema.ir_out)
        .unwrap_or_else(|| sibling(&out, "ir.json"));
    let report_out = args
        .report_out
        .or(schema.report_out)
        .unwrap_or_else(|| sibling(&out, "report.json"));

    let generated = generate_schema(&input).map_err(|err| err.to_string())?;
    write_output(&out, &generated.source, "Swift bindings")?;
    write_output(&ir_out, &generated.ir_json, "schema IR")?;
    write_output(&report_out, &generated.report_json, "usage report")?;
    if let Some(command) = args.format.resolve(&config.format) {
        run_formatter(&command, &out)?;
    }

    println!(
        "Generated {} tables into {} ({} usage issues)",
        generated.ir.tables.len(),
        out.display(),
        generated.report.issues.len()
    );
    Ok(())
}

/// `Generated/ConvexSchema.swift` -> `Generated/ConvexSchema.<extension>`.
fn sibling(out: &Path, extension: &str) -> PathBuf {
    let stem = out
        .file_stem()
        .map_or_else(|| "schema".to_string(), |s| s.to_string_lossy().into_owned());
    out.with_file_name(format!("{stem}.{extension}"))
}
