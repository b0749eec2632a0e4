//! End-to-end generation for both input variants.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::discover::{FunctionRef, Selection, discover_functions, discover_tables};
use crate::error::{Error, Result};
use crate::frontend::TypeChecker;
use crate::reduce::Reducer;
use crate::render::{Emit, FunctionShape, codegen_api, codegen_schema};
use crate::report::{UsageReport, build_report};
use crate::schema::SchemaIr;

/// Default location of the API declaration file.
pub const DEFAULT_API_PATH: &str = "convex/_generated/api.d.ts";
/// Default location of the schema source.
pub const DEFAULT_SCHEMA_PATH: &str = "convex/schema.ts";
/// Root exports walked when none are configured.
pub const DEFAULT_ROOTS: [&str; 2] = ["api", "internal"];

/// Inputs of the API variant.
#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Declaration file to read.
    pub input: PathBuf,
    /// Root exports to walk, in order.
    pub roots: Vec<String>,
    /// Which discovered functions to emit.
    pub selection: Selection,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_API_PATH),
            roots: DEFAULT_ROOTS.iter().map(|r| (*r).to_string()).collect(),
            selection: Selection::default(),
        }
    }
}

/// Output of the API variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedApi {
    /// Swift source text.
    pub source: String,
    /// Qualified paths of the generated functions, in output order.
    pub functions: Vec<String>,
}

/// Output of the schema variant.
#[derive(Debug, Clone)]
pub struct GeneratedSchema {
    /// Discovered tables.
    pub ir: SchemaIr,
    /// Kind counts and imprecise fields.
    pub report: UsageReport,
    /// Swift source text.
    pub source: String,
    /// Pretty-printed JSON of `ir`.
    pub ir_json: String,
    /// Pretty-printed JSON of `report`.
    pub report_json: String,
}

/// Generate Swift for the functions selected from the declaration file at `options.input`.
pub fn generate_api(options: &ApiOptions) -> Result<GeneratedApi> {
    let mut checker = TypeChecker::load(&options.input)?;
    generate_api_with(&mut checker, options)
}

/// Same as [`generate_api`] over in-memory source; `options.input` names it in
/// diagnostics and the header.
pub fn generate_api_from_source(source: &str, options: &ApiOptions) -> Result<GeneratedApi> {
    let mut checker = TypeChecker::from_source(&options.input, source)?;
    generate_api_with(&mut checker, options)
}

fn generate_api_with(checker: &mut TypeChecker, options: &ApiOptions) -> Result<GeneratedApi> {
    let functions = discover_functions(checker, &options.roots)?;
    let selected = options.selection.apply(&functions, &options.roots);
    if selected.is_empty() {
        return Err(Error::EmptySelection {
            path: checker.path().to_path_buf(),
        });
    }

    let reducer = Reducer::new(checker);
    let shapes: Vec<FunctionShape<'_>> = selected
        .iter()
        .map(|function| {
            debug!(function = %function.qualified(), "Reducing function types.");
            FunctionShape {
                function,
                path: name_path(function, &options.roots),
                args: reducer.reduce(function.args),
                returns: reducer.reduce(function.returns),
            }
        })
        .collect();

    let file = codegen_api(&checker.path().display().to_string(), &shapes);
    info!(
        path = %checker.path().display(),
        discovered = functions.len(),
        selected = shapes.len(),
        structs = file.structs.len(),
        enums = file.enums.len(),
        "Generated API bindings."
    );
    Ok(GeneratedApi {
        source: file.emit(),
        functions: selected.iter().map(|f| f.qualified()).collect(),
    })
}

/// Segments type names derive from; the primary root is left out.
fn name_path(function: &FunctionRef, roots: &[String]) -> Vec<String> {
    let mut path = Vec::new();
    if roots.first() != Some(&function.root) {
        path.push(function.root.clone());
    }
    path.extend(function.segments());
    path
}

/// Generate Swift, the IR dump and the usage report for the schema source at `path`.
pub fn generate_schema(path: &Path) -> Result<GeneratedSchema> {
    let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    generate_schema_from_source(path, &source)
}

/// Same as [`generate_schema`] over in-memory source.
pub fn generate_schema_from_source(path: &Path, source: &str) -> Result<GeneratedSchema> {
    let ir = discover_tables(path, source)?;
    let report = build_report(&ir);
    let file = codegen_schema(&ir);

    let mut ir_json = serde_json::to_string_pretty(&ir).map_err(|source| Error::Json {
        what: "schema IR",
        source,
    })?;
    ir_json.push('\n');
    let mut report_json = serde_json::to_string_pretty(&report).map_err(|source| Error::Json {
        what: "usage report",
        source,
    })?;
    report_json.push('\n');

    info!(
        path = %path.display(),
        tables = ir.tables.len(),
        issues = report.issues.len(),
        "Generated schema bindings."
    );
    Ok(GeneratedSchema {
        source: file.emit(),
        ir,
        report,
        ir_json,
        report_json,
    })
}
