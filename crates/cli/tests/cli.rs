//! End-to-end runs of the `typebridge` binary against fixtures in a temp dir.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const API: &str = r#"
import type { FunctionReference, FilterApi } from "convex/server";
import type { Id } from "../dataModel";

declare const fullApi: {
  tasks: {
    list: FunctionReference<"query", "public", { limit?: number }, Array<{ _id: Id<"tasks">; text: string }>>;
    add: FunctionReference<"mutation", "public", { text: string }, Id<"tasks">>;
    sweep: FunctionReference<"mutation", "internal", {}, null>;
  };
};
export declare const api: FilterApi<typeof fullApi, FunctionReference<any, "public">>;
export declare const internal: FilterApi<typeof fullApi, FunctionReference<any, "internal">>;
"#;

const SCHEMA: &str = r#"
import { defineSchema, defineTable } from "convex/server";
import { v } from "convex/values";

export default defineSchema({
  tasks: defineTable({
    text: v.string(),
    done: v.boolean(),
    meta: v.optional(v.any()),
  }).index("by_done", ["done"]),
});
"#;

fn typebridge(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_typebridge"))
        .args(args)
        .current_dir(dir)
        .env("TYPEBRIDGE_LOG", "error")
        .output()
        .expect("Failed to run typebridge")
}

fn project() -> TempDir {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let convex = dir.path().join("convex");
    fs::create_dir_all(convex.join("_generated")).unwrap();
    fs::write(convex.join("_generated/api.d.ts"), API).unwrap();
    fs::write(convex.join("schema.ts"), SCHEMA).unwrap();
    dir
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_api_command_writes_default_output() {
    let dir = project();
    let output = typebridge(dir.path(), &["api"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let swift = fs::read_to_string(dir.path().join("Generated/ConvexApi.swift")).unwrap();
    assert!(swift.contains("struct TasksListArgs {"));
    assert!(swift.contains("typealias TasksAddReturn = ConvexId<TasksTable>"));
    assert!(!swift.contains("TasksSweep"));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Generated 2 functions"));
}

#[test]
fn test_api_command_honors_selection_flags() {
    let dir = project();
    let output = typebridge(
        dir.path(),
        &[
            "api",
            "--out",
            "out/Api.swift",
            "--include",
            "tasks.add,internal.tasks.sweep",
        ],
    );
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let swift = fs::read_to_string(dir.path().join("out/Api.swift")).unwrap();
    assert!(swift.contains("struct TasksAddArgs {"));
    assert!(swift.contains("struct InternalTasksSweepArgs {"));
    assert!(!swift.contains("TasksListArgs"));
}

#[test]
fn test_api_command_reads_config() {
    let dir = project();
    fs::write(
        dir.path().join("typebridge.toml"),
        "[api]\nout = \"App/Api.swift\"\ndefault_selection = \"curated\"\ncurated = [\"tasks.list\"]\n",
    )
    .unwrap();
    let output = typebridge(dir.path(), &["api"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let swift = fs::read_to_string(dir.path().join("App/Api.swift")).unwrap();
    assert!(swift.contains("struct TasksListArgs {"));
    assert!(!swift.contains("TasksAddArgs"));
}

#[test]
fn test_schema_command_writes_all_outputs() {
    let dir = project();
    let output = typebridge(dir.path(), &["schema"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));

    let generated = dir.path().join("Generated");
    let swift = fs::read_to_string(generated.join("ConvexSchema.swift")).unwrap();
    assert!(swift.contains("struct TasksDocument: Decodable {"));
    assert!(swift.contains("    let meta: JSONValue?\n"));

    let ir: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(generated.join("ConvexSchema.ir.json")).unwrap())
            .unwrap();
    assert_eq!(ir["tables"][0]["name"], "tasks");
    assert_eq!(ir["tables"][0]["indexes"][0]["name"], "by_done");

    let report: serde_json::Value = serde_json::from_str(
        &fs::read_to_string(generated.join("ConvexSchema.report.json")).unwrap(),
    )
    .unwrap();
    assert_eq!(report["issues"][0]["field"], "meta");
}

#[test]
fn test_missing_input_exits_with_one() {
    let dir = TempDir::new().unwrap();
    let output = typebridge(dir.path(), &["api"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("api.d.ts"));

    let output = typebridge(dir.path(), &["schema", "--schema", "nope.ts"]);
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_empty_selection_exits_with_one() {
    let dir = project();
    let output = typebridge(
        dir.path(),
        &["api", "--default-selection", "curated", "--curated", "tasks.missing"],
    );
    assert_eq!(output.status.code(), Some(1));
    assert!(!dir.path().join("Generated/ConvexApi.swift").exists());
}

#[test]
fn test_curated_mode_requires_a_list() {
    let dir = project();
    let output = typebridge(dir.path(), &["api", "--default-selection", "curated"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("curated list"));
}

#[test]
fn test_missing_formatter_exits_with_one() {
    let dir = project();
    fs::write(
        dir.path().join("typebridge.toml"),
        "[format]\nenabled = true\ncommand = [\"typebridge-no-such-formatter\"]\n",
    )
    .unwrap();
    let output = typebridge(dir.path(), &["schema"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("not found"));

    let output = typebridge(dir.path(), &["schema", "--no-format"]);
    assert_eq!(output.status.code(), Some(0), "{}", stderr(&output));
}

#[test]
fn test_bad_config_exits_with_one() {
    let dir = project();
    fs::write(dir.path().join("typebridge.toml"), "[api]\noutput = 1\n").unwrap();
    let output = typebridge(dir.path(), &["api"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to parse config file"));
}

#[test]
fn test_usage_errors_exit_with_two() {
    let dir = project();
    let output = typebridge(dir.path(), &["api", "--bogus"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_no_subcommand_prints_help() {
    let dir = project();
    let output = typebridge(dir.path(), &[]);
    assert_eq!(output.status.code(), Some(0));
    assert!(String::from_utf8_lossy(&output.stdout).contains("Usage"));
}
