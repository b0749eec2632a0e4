//! Table discovery over a `defineSchema(...)` source.
//!
//! The schema DSL is evaluated symbolically: `v.*` builder calls map onto
//! validators, top-level `const` bindings are followed by name and object
//! spreads are merged. Anything else becomes `unknown` carrying its source text.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;

use indexmap::IndexMap;
use swc_common::Spanned;
use swc_ecma_ast::{
    ArrayLit, Callee, Decl, ExportDecl, Expr, ExprOrSpread, Lit, MemberProp, ModuleDecl,
    ModuleItem, Pat, Prop, PropName, PropOrSpread, Stmt, UnaryOp,
};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::frontend::source::{ParsedSource, SourceKind};
use crate::schema::{
    FieldSchema, IndexKind, IndexSchema, SchemaIr, TableSchema, UnknownReason, Validator,
    ValidatorKind,
};

const MAX_BINDING_DEPTH: usize = 32;

/// Collect the tables declared by the `defineSchema(...)` call in `source`.
pub fn discover_tables(path: &Path, source: &str) -> Result<SchemaIr> {
    let parsed = ParsedSource::parse(path, source, SourceKind::Module)?;
    let reader = SchemaReader::new(path, &parsed);

    let call = reader.find_schema_call().ok_or_else(|| Error::MissingSchema {
        path: path.to_path_buf(),
    })?;
    let definition = call
        .first()
        .map(|arg| reader.resolve(&arg.expr))
        .ok_or_else(|| reader.invalid("defineSchema(...) has no arguments"))?;
    let Expr::Object(object) = definition else {
        return Err(reader.invalid("defineSchema(...) expects an object literal"));
    };

    let mut tables = Vec::new();
    for (name, expr) in reader.entries(&object.props, 0) {
        tables.push(reader.table(&name, &expr)?);
    }
    debug!(
        path = %path.display(),
        tables = tables.len(),
        "Discovered tables."
    );
    Ok(SchemaIr {
        source: path.display().to_string(),
        tables,
    })
}

struct SchemaReader<'a> {
    path: &'a Path,
    parsed: &'a ParsedSource,
    /// `const` initializers in source order.
    bindings: Vec<(&'a str, &'a Expr)>,
    by_name: HashMap<&'a str, &'a Expr>,
    defaults: Vec<&'a Expr>,
}

impl<'a> SchemaReader<'a> {
    fn new(path: &'a Path, parsed: &'a ParsedSource) -> Self {
        let mut bindings = Vec::new();
        let mut defaults = Vec::new();
        for item in &parsed.module.body {
            let var = match item {
                ModuleItem::Stmt(Stmt::Decl(Decl::Var(var)))
                | ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl {
                    decl: Decl::Var(var),
                    ..
                })) => var,
                ModuleItem::ModuleDecl(ModuleDecl::ExportDefaultExpr(default)) => {
                    defaults.push(&*default.expr);
                    continue;
                }
                _ => continue,
            };
            for declarator in &var.decls {
                if let (Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
                    bindings.push((binding.id.sym.as_str(), &**init));
                }
            }
        }
        let by_name = bindings.iter().copied().collect();
        Self {
            path,
            parsed,
            bindings,
            by_name,
            defaults,
        }
    }

    fn invalid(&self, message: impl Into<String>) -> Error {
        Error::InvalidSchema {
            path: self.path.to_path_buf(),
            message: message.into(),
        }
    }

    fn text(&self, expr: &Expr) -> String {
        self.parsed.text(expr.span()).to_string()
    }

    /// Follow identifier references to their `const` initializer, looking
    /// through parentheses and type assertions.
    fn resolve<'e>(&self, mut expr: &'e Expr) -> &'e Expr
    where
        'a: 'e,
    {
        for _ in 0..MAX_BINDING_DEPTH {
            expr = match expr {
                Expr::Paren(inner) => &*inner.expr,
                Expr::TsAs(inner) => &*inner.expr,
                Expr::TsSatisfies(inner) => &*inner.expr,
                Expr::TsConstAssertion(inner) => &*inner.expr,
                Expr::TsNonNull(inner) => &*inner.expr,
                Expr::Ident(ident) => match self.by_name.get(ident.sym.as_str()) {
                    Some(&value) => value,
                    None => return expr,
                },
                _ => return expr,
            };
        }
        expr
    }

    /// Arguments of the `defineSchema(...)` call, preferring the default export.
    fn find_schema_call(&self) -> Option<&'a [ExprOrSpread]> {
        self.defaults
            .iter()
            .find_map(|&expr| self.schema_args(expr))
            .or_else(|| {
                self.bindings
                    .iter()
                    .find_map(|&(_, value)| self.schema_args(value))
            })
    }

    fn schema_args(&self, expr: &'a Expr) -> Option<&'a [ExprOrSpread]> {
        match call_parts(self.resolve(expr)) {
            Some((callee, args)) if callee_name(callee) == Some("defineSchema") => Some(args),
            _ => None,
        }
    }

    /// Entries of an object literal with spreads merged in; later keys win.
    fn entries<'e>(&self, props: &'e [PropOrSpread], depth: usize) -> IndexMap<String, Cow<'e, Expr>>
    where
        'a: 'e,
    {
        let mut merged = IndexMap::new();
        for prop in props {
            match prop {
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::KeyValue(entry) => match self.key(&entry.key) {
                        Some(key) => {
                            merged.insert(key, Cow::Borrowed(&*entry.value));
                        }
                        None => warn!(
                            path = %self.path.display(),
                            key = %self.parsed.text(entry.key.span()),
                            "Ignoring computed object key."
                        ),
                    },
                    Prop::Shorthand(ident) => {
                        merged.insert(ident.sym.to_string(), Cow::Owned(Expr::Ident(ident.clone())));
                    }
                    _ => {}
                },
                PropOrSpread::Spread(spread) => {
                    if depth >= MAX_BINDING_DEPTH {
                        continue;
                    }
                    match self.object_entries(&spread.expr) {
                        Some(inner) => merged.extend(self.entries(inner, depth + 1)),
                        None => warn!(
                            path = %self.path.display(),
                            spread = %self.text(&spread.expr),
                            "Ignoring spread that is not an object literal."
                        ),
                    }
                }
            }
        }
        merged
    }

    fn key(&self, key: &PropName) -> Option<String> {
        match key {
            PropName::Ident(ident) => Some(ident.sym.to_string()),
            PropName::Str(value) => Some(value.value.to_string_lossy().into_owned()),
            PropName::Num(number) => Some(self.parsed.text(number.span).to_string()),
            PropName::Computed(computed) => string_value(self.resolve(&computed.expr)),
            PropName::BigInt(_) => None,
        }
    }

    /// Properties of an object literal or a `v.object({...})` call.
    fn object_entries<'e>(&self, expr: &'e Expr) -> Option<&'e [PropOrSpread]>
    where
        'a: 'e,
    {
        match self.resolve(expr) {
            Expr::Object(object) => Some(&object.props),
            resolved => match call_parts(resolved) {
                Some((callee, args)) if callee_name(callee) == Some("object") => {
                    match self.resolve(&args.first()?.expr) {
                        Expr::Object(object) => Some(&object.props),
                        _ => None,
                    }
                }
                _ => None,
            },
        }
    }

    fn table<'e>(&self, name: &str, expr: &'e Expr) -> Result<TableSchema>
    where
        'a: 'e,
    {
        let mut indexes = Vec::new();
        let mut current = self.resolve(expr);
        loop {
            let Some((callee, args)) = call_parts(current) else {
                return Err(self.invalid(format!("table `{name}` is not a defineTable(...) call")));
            };
            if let Expr::Member(member) = callee
                && let MemberProp::Ident(method) = &member.prop
                && let Some(kind) = index_kind(method.sym.as_str())
            {
                indexes.push(self.index(kind, args));
                current = self.resolve(&member.obj);
                continue;
            }
            if callee_name(callee) != Some("defineTable") {
                return Err(self.invalid(format!("table `{name}` is not a defineTable(...) call")));
            }
            let props = args
                .first()
                .and_then(|arg| self.object_entries(&arg.expr))
                .ok_or_else(|| {
                    self.invalid(format!("defineTable(...) for `{name}` expects an object"))
                })?;
            indexes.reverse();
            return Ok(TableSchema {
                name: name.to_string(),
                fields: self.fields(props, 0),
                indexes,
            });
        }
    }

    fn strings(&self, array: &ArrayLit) -> Vec<String> {
        array
            .elems
            .iter()
            .flatten()
            .filter_map(|item| string_value(self.resolve(&item.expr)))
            .collect()
    }

    fn index(&self, kind: IndexKind, args: &[ExprOrSpread]) -> IndexSchema {
        let name = args
            .first()
            .and_then(|arg| string_value(self.resolve(&arg.expr)))
            .unwrap_or_default();
        let fields = match (kind, args.get(1).map(|arg| self.resolve(&arg.expr))) {
            (IndexKind::Index, Some(Expr::Array(items))) => self.strings(items),
            (IndexKind::Search | IndexKind::Vector, Some(Expr::Object(object))) => {
                let primary = if kind == IndexKind::Search {
                    "searchField"
                } else {
                    "vectorField"
                };
                let config = self.entries(&object.props, 0);
                let mut fields: Vec<String> = config
                    .get(primary)
                    .and_then(|value| string_value(self.resolve(value)))
                    .into_iter()
                    .collect();
                if let Some(Expr::Array(items)) =
                    config.get("filterFields").map(|value| self.resolve(value))
                {
                    fields.extend(self.strings(items));
                }
                fields
            }
            _ => Vec::new(),
        };
        IndexSchema { kind, name, fields }
    }

    fn fields(&self, props: &[PropOrSpread], depth: usize) -> Vec<FieldSchema> {
        self.entries(props, 0)
            .into_iter()
            .map(|(name, value)| FieldSchema::new(name, self.validator(&value, depth + 1), false))
            .collect()
    }

    fn validator(&self, expr: &Expr, depth: usize) -> Validator {
        if depth > MAX_BINDING_DEPTH {
            return Validator::unknown(self.text(expr), UnknownReason::DepthLimit);
        }
        let expr = self.resolve(expr);
        let Some((callee, args)) = call_parts(expr) else {
            return Validator::unknown(self.text(expr), UnknownReason::Unclassified);
        };
        let arg = |index: usize| args.get(index).map(|a| self.validator(&a.expr, depth + 1));

        match callee_name(callee).unwrap_or_default() {
            "string" => Validator::new(ValidatorKind::String),
            "number" | "float64" => Validator::new(ValidatorKind::Number),
            "boolean" => Validator::new(ValidatorKind::Boolean),
            "any" => Validator::new(ValidatorKind::Any),
            "null" => {
                Validator::unknown(self.text(expr), UnknownReason::NullOnly).with_flags(false, true)
            }
            "id" => Validator::new(ValidatorKind::Id {
                table: args.first().and_then(|a| string_value(self.resolve(&a.expr))),
            }),
            "literal" => match args.first().map(|a| self.resolve(&a.expr)) {
                Some(Expr::Lit(Lit::Str(value))) => Validator::new(ValidatorKind::Enum {
                    values: vec![value.value.to_string_lossy().into_owned()],
                }),
                Some(Expr::Lit(Lit::Bool(_))) => Validator::new(ValidatorKind::Boolean),
                Some(literal) if is_number_literal(literal) => Validator::new(ValidatorKind::Number),
                _ => Validator::unknown(self.text(expr), UnknownReason::Unclassified),
            },
            "optional" => match arg(0) {
                Some(inner) => inner.with_flags(true, false),
                None => Validator::unknown(self.text(expr), UnknownReason::Unclassified),
            },
            "nullable" => match arg(0) {
                Some(inner) => inner.with_flags(false, true),
                None => Validator::unknown(self.text(expr), UnknownReason::Unclassified),
            },
            "array" => match arg(0) {
                Some(element) => Validator::new(ValidatorKind::Array {
                    element: Box::new(element),
                }),
                None => Validator::unknown(self.text(expr), UnknownReason::Unclassified),
            },
            "record" => match (arg(0), arg(1)) {
                (Some(key), Some(value)) => Validator::new(ValidatorKind::Record {
                    key: Some(Box::new(key)),
                    value: Box::new(value),
                }),
                _ => Validator::unknown(self.text(expr), UnknownReason::Unclassified),
            },
            "object" => match self.object_entries(expr) {
                Some(props) => Validator::new(ValidatorKind::Object {
                    fields: self.fields(props, depth),
                }),
                None => Validator::unknown(self.text(expr), UnknownReason::Unclassified),
            },
            "union" => {
                let members: Vec<Validator> = args
                    .iter()
                    .map(|a| self.validator(&a.expr, depth + 1))
                    .collect();
                self.union(expr, members)
            }
            _ => Validator::unknown(self.text(expr), UnknownReason::UnsupportedBuilder),
        }
    }

    fn union(&self, expr: &Expr, members: Vec<Validator>) -> Validator {
        let is_null = |m: &Validator| {
            matches!(
                m.kind,
                ValidatorKind::Unknown {
                    reason: UnknownReason::NullOnly,
                    ..
                }
            )
        };
        let nullable = members.iter().any(|m| m.nullable || is_null(m));
        let optional = members.iter().any(|m| m.optional);
        let rest: Vec<Validator> = members
            .into_iter()
            .filter(|m| !is_null(m))
            .map(|m| m.stripped())
            .collect();

        let classified = match rest.as_slice() {
            [] => Validator::unknown(self.text(expr), UnknownReason::NullOnly),
            [single] => single.clone(),
            _ if rest.iter().all(|m| matches!(m.kind, ValidatorKind::Enum { .. })) => {
                let mut values: Vec<String> = Vec::new();
                for member in &rest {
                    if let ValidatorKind::Enum { values: member_values } = &member.kind {
                        for value in member_values {
                            if !values.contains(value) {
                                values.push(value.clone());
                            }
                        }
                    }
                }
                Validator::new(ValidatorKind::Enum { values })
            }
            _ if rest
                .iter()
                .all(|m| matches!(m.kind, ValidatorKind::Enum { .. } | ValidatorKind::String)) =>
            {
                Validator::new(ValidatorKind::String)
            }
            _ if rest.iter().all(|m| m.kind == ValidatorKind::Boolean) => {
                Validator::new(ValidatorKind::Boolean)
            }
            _ => Validator::unknown(self.text(expr), UnknownReason::NonLiteralUnion),
        };
        classified.with_flags(optional, nullable)
    }
}

/// Callee and arguments of a plain call expression.
fn call_parts(expr: &Expr) -> Option<(&Expr, &[ExprOrSpread])> {
    match expr {
        Expr::Call(call) => match &call.callee {
            Callee::Expr(callee) => Some((&**callee, call.args.as_slice())),
            Callee::Super(_) | Callee::Import(_) => None,
        },
        _ => None,
    }
}

/// Name a builder is called by: `defineTable(...)` or `v.string()`.
fn callee_name(callee: &Expr) -> Option<&str> {
    match callee {
        Expr::Ident(ident) => Some(ident.sym.as_str()),
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(property) => Some(property.sym.as_str()),
            MemberProp::PrivateName(_) | MemberProp::Computed(_) => None,
        },
        _ => None,
    }
}

fn index_kind(method: &str) -> Option<IndexKind> {
    match method {
        "index" => Some(IndexKind::Index),
        "searchIndex" => Some(IndexKind::Search),
        "vectorIndex" => Some(IndexKind::Vector),
        _ => None,
    }
}

fn string_value(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Lit(Lit::Str(value)) => Some(value.value.to_string_lossy().into_owned()),
        _ => None,
    }
}

/// `1.5` or `-1`.
fn is_number_literal(expr: &Expr) -> bool {
    match expr {
        Expr::Lit(Lit::Num(_)) => true,
        Expr::Unary(unary) => {
            unary.op == UnaryOp::Minus && matches!(&*unary.arg, Expr::Lit(Lit::Num(_)))
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
import { defineSchema, defineTable } from "convex/server";
import { v } from "convex/values";

const status = v.union(
  v.literal("open"),
  v.literal("pr_changes_requested"),
  v.literal("closed"),
);

const audit = { createdBy: v.id("users"), updatedAt: v.optional(v.number()) };

export default defineSchema({
  users: defineTable({
    name: v.string(),
    email: v.optional(v.string()),
  }).index("by_email", ["email"]),
  tasks: defineTable(
    v.object({
      ...audit,
      text: v.string(),
      status,
      pinned: v.optional(v.boolean()),
      assignee: v.union(v.id("users"), v.null()),
      tags: v.array(v.string()),
      meta: v.record(v.string(), v.any()),
      size: v.int64(),
    }),
  )
    .index("by_status", ["status", "text"])
    .searchIndex("search_text", { searchField: "text", filterFields: ["status"] }),
});
"#;

    fn tables(src: &str) -> SchemaIr {
        discover_tables(Path::new("convex/schema.ts"), src).unwrap()
    }

    fn field<'t>(table: &'t TableSchema, name: &str) -> &'t FieldSchema {
        table.fields.iter().find(|f| f.name == name).unwrap()
    }

    #[test]
    fn test_tables_in_declaration_order() {
        let ir = tables(SCHEMA);
        let names: Vec<&str> = ir.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["users", "tasks"]);
        assert_eq!(ir.source, "convex/schema.ts");
    }

    #[test]
    fn test_builders_and_bindings() {
        let ir = tables(SCHEMA);
        let tasks = &ir.tables[1];
        let names: Vec<&str> = tasks.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "createdBy", "updatedAt", "text", "status", "pinned", "assignee", "tags", "meta",
                "size"
            ]
        );

        assert_eq!(
            field(tasks, "createdBy").schema.kind,
            ValidatorKind::Id {
                table: Some("users".into())
            }
        );
        assert!(field(tasks, "updatedAt").optional);
        assert_eq!(
            field(tasks, "status").schema.kind,
            ValidatorKind::Enum {
                values: vec!["open".into(), "pr_changes_requested".into(), "closed".into()]
            }
        );
        let pinned = field(tasks, "pinned");
        assert!(pinned.optional && !pinned.nullable);
        assert_eq!(pinned.schema.kind, ValidatorKind::Boolean);

        let assignee = field(tasks, "assignee");
        assert!(assignee.nullable && !assignee.optional);
        assert_eq!(
            assignee.schema.kind,
            ValidatorKind::Id {
                table: Some("users".into())
            }
        );

        assert!(matches!(
            &field(tasks, "meta").schema.kind,
            ValidatorKind::Record { key: Some(key), value }
                if key.kind == ValidatorKind::String && value.kind == ValidatorKind::Any
        ));
        assert_eq!(
            field(tasks, "size").schema.kind,
            ValidatorKind::Unknown {
                text: "v.int64()".into(),
                reason: UnknownReason::UnsupportedBuilder
            }
        );
    }

    #[test]
    fn test_indexes_in_declaration_order() {
        let ir = tables(SCHEMA);
        assert_eq!(
            ir.tables[0].indexes,
            vec![IndexSchema {
                kind: IndexKind::Index,
                name: "by_email".into(),
                fields: vec!["email".into()],
            }]
        );
        let tasks = &ir.tables[1].indexes;
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].name, "by_status");
        assert_eq!(tasks[0].fields, vec!["status", "text"]);
        assert_eq!(tasks[1].kind, IndexKind::Search);
        assert_eq!(tasks[1].fields, vec!["text", "status"]);
    }

    #[test]
    fn test_union_classification() {
        let src = r#"
export default defineSchema({
  t: defineTable({
    mixed: v.union(v.string(), v.number()),
    widened: v.union(v.string(), v.literal("x")),
    onlyNull: v.null(),
    flag: v.union(v.literal(true), v.literal(false)),
  }),
});
"#;
        let ir = tables(src);
        let t = &ir.tables[0];
        assert_eq!(
            field(t, "mixed").schema.kind,
            ValidatorKind::Unknown {
                text: "v.union(v.string(), v.number())".into(),
                reason: UnknownReason::NonLiteralUnion
            }
        );
        assert_eq!(field(t, "widened").schema.kind, ValidatorKind::String);
        let only_null = field(t, "onlyNull");
        assert!(only_null.nullable);
        assert!(only_null.schema.is_untyped());
        assert_eq!(field(t, "flag").schema.kind, ValidatorKind::Boolean);
    }

    #[test]
    fn test_schema_bound_to_const() {
        let src = "const schema = defineSchema({ a: defineTable({ x: v.float64() }) });\nexport default schema;";
        let ir = tables(src);
        assert_eq!(ir.tables[0].fields[0].schema.kind, ValidatorKind::Number);
    }

    #[test]
    fn test_missing_and_invalid_schema() {
        let err = discover_tables(Path::new("s.ts"), "export const x = 1;").unwrap_err();
        assert!(matches!(err, Error::MissingSchema { .. }));

        let err = discover_tables(Path::new("s.ts"), "export default defineSchema(tables);")
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSchema { .. }));

        let err = discover_tables(
            Path::new("s.ts"),
            "export default defineSchema({ a: somethingElse() });",
        )
        .unwrap_err();
        assert!(err.to_string().contains("`a`"));
    }

    #[test]
    fn test_assertions_and_quoted_keys() {
        let src = r#"
const shared = { "created-at": v.number() } as const;
const tables = {
  logs: defineTable({ ...shared, level: v.literal(-1) }),
} satisfies Record<string, unknown>;
export default defineSchema(tables);
"#;
        let ir = tables(src);
        let logs = &ir.tables[0];
        assert_eq!(logs.name, "logs");
        assert_eq!(field(logs, "created-at").schema.kind, ValidatorKind::Number);
        assert_eq!(field(logs, "level").schema.kind, ValidatorKind::Number);
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = discover_tables(Path::new("s.ts"), "export default defineSchema({ a: (").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }));
    }
}
