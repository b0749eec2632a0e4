//! Framework declarations available to every declaration file.
//!
//! Generated API files import these from the framework's server and values
//! packages; declaring them here lets those imports resolve. A declaration of
//! the same name in the input file takes precedence.

/// Source of the built-in declarations.
pub const PRELUDE: &str = r#"
export type FunctionType = "query" | "mutation" | "action";
export type FunctionVisibility = "public" | "internal";

export type FunctionReference<
  Type extends FunctionType,
  Visibility extends FunctionVisibility = "public",
  Args = any,
  ReturnType = any,
  ComponentPath = string | undefined,
> = {
  _type: Type;
  _visibility: Visibility;
  _args: Args;
  _returnType: ReturnType;
  _componentPath: ComponentPath;
};

export type GenericId<TableName extends string> = string & { __tableName: TableName };
export type Id<TableName extends string> = GenericId<TableName>;
"#;
