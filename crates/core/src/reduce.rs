//! Reduction of resolved types into [`Validator`] trees.
//!
//! Order of classification for a type:
//! 1. Unwrap `undefined`/`void` (optional) and `null` (nullable) union members
//! 2. Identity: table ids (by rendered name, then by brand), string, boolean, number
//! 3. Structure: array, string index signature, literal union, object
//! 4. Anything else is `unknown` and keeps its text
//!
//! Each reduction chain carries a [`VisitContext`]: a type already on the
//! chain or a chain deeper than [`MAX_DEPTH`] reduces to `unknown`.

use std::collections::HashSet;
use std::sync::LazyLock;

use tracing::debug;

use crate::frontend::syntax::Keyword;
use crate::frontend::{TypeChecker, TypeId, TypeKind};
use crate::schema::{FieldSchema, UnknownReason, Validator, ValidatorKind};

/// Deepest nesting a single reduction chain may reach.
pub const MAX_DEPTH: usize = 30;

/// Prototype members of primitive wrappers and `Object` that must never become
/// struct fields.
static BUILTIN_MEMBERS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // Object.prototype
        "constructor",
        "hasOwnProperty",
        "isPrototypeOf",
        "propertyIsEnumerable",
        "toLocaleString",
        "toString",
        "valueOf",
        // String.prototype
        "length",
        "anchor",
        "at",
        "charAt",
        "charCodeAt",
        "codePointAt",
        "concat",
        "endsWith",
        "includes",
        "indexOf",
        "lastIndexOf",
        "localeCompare",
        "match",
        "matchAll",
        "normalize",
        "padEnd",
        "padStart",
        "repeat",
        "replace",
        "replaceAll",
        "search",
        "slice",
        "split",
        "startsWith",
        "substr",
        "substring",
        "toLocaleLowerCase",
        "toLocaleUpperCase",
        "toLowerCase",
        "toUpperCase",
        "trim",
        "trimEnd",
        "trimStart",
        // Number.prototype
        "toExponential",
        "toFixed",
        "toPrecision",
    ]
    .into_iter()
    .collect()
});

/// Whether a property name comes from a builtin prototype rather than the
/// declared shape.
pub fn is_builtin_member(name: &str) -> bool {
    BUILTIN_MEMBERS.contains(name) || is_well_known_symbol(name)
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_')
}

/// `__@iterator` or `__@asyncIterator@12`.
fn is_well_known_symbol(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("__@") else {
        return false;
    };
    match rest.split_once('@') {
        Some((symbol, id)) => is_word(symbol) && !id.is_empty() && id.chars().all(|c| c.is_ascii_digit()),
        None => is_word(rest),
    }
}

/// Argument text of `Id<...>` or `GenericId<...>`, optionally namespace-qualified.
fn id_type_argument(text: &str) -> Option<&str> {
    let (head, rest) = text.split_once('<')?;
    let inner = rest.strip_suffix('>')?;
    let mut segments: Vec<&str> = head.split('.').collect();
    let name = segments.pop()?;
    let qualified = segments
        .iter()
        .all(|s| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'));
    (qualified && matches!(name, "Id" | "GenericId")).then(|| inner.trim())
}

/// Per-chain cycle and depth guard.
#[derive(Debug, Default)]
pub struct VisitContext {
    chain: HashSet<TypeId>,
    depth: usize,
}

/// Reduces types of one checker into validators.
#[derive(Debug, Clone, Copy)]
pub struct Reducer<'a> {
    checker: &'a TypeChecker,
}

impl<'a> Reducer<'a> {
    /// Create a reducer over `checker`'s types.
    pub fn new(checker: &'a TypeChecker) -> Self {
        Self { checker }
    }

    /// Reduce `ty` with a fresh visit context.
    pub fn reduce(&self, ty: TypeId) -> Validator {
        self.reduce_in(ty, &mut VisitContext::default())
    }

    /// Reduce `ty` as part of an existing chain.
    pub fn reduce_in(&self, ty: TypeId, ctx: &mut VisitContext) -> Validator {
        if ctx.depth >= MAX_DEPTH {
            return self.unknown(ty, UnknownReason::DepthLimit);
        }
        if !ctx.chain.insert(ty) {
            return self.unknown(ty, UnknownReason::Cycle);
        }
        ctx.depth += 1;
        let validator = self.classify(ty, ctx);
        ctx.depth -= 1;
        ctx.chain.remove(&ty);
        validator
    }

    fn unknown(&self, ty: TypeId, reason: UnknownReason) -> Validator {
        let text = self.checker.text(ty);
        debug!(text = %text, reason = reason.as_str(), "Type reduced to unknown.");
        Validator::unknown(text, reason)
    }

    fn classify(&self, ty: TypeId, ctx: &mut VisitContext) -> Validator {
        let Some(members) = self.checker.union_members(ty) else {
            return self.classify_single(ty, ctx);
        };

        let mut optional = false;
        let mut nullable = false;
        let mut real = Vec::new();
        for &member in members {
            match self.checker.kind(member) {
                TypeKind::Primitive(Keyword::Undefined | Keyword::Void) => optional = true,
                TypeKind::Primitive(Keyword::Null) => nullable = true,
                _ => real.push(member),
            }
        }
        match real.as_slice() {
            [] => self
                .unknown(ty, UnknownReason::NullOnly)
                .with_flags(optional, nullable),
            [single] => self.reduce_in(*single, ctx).with_flags(optional, nullable),
            _ => self.classify_union(&real).with_flags(optional, nullable),
        }
    }

    /// A union with at least two non-null members.
    fn classify_union(&self, members: &[TypeId]) -> Validator {
        let kinds: Vec<&TypeKind> = members.iter().map(|m| self.checker.kind(*m)).collect();

        if kinds
            .iter()
            .all(|k| matches!(k, TypeKind::BooleanLiteral(_) | TypeKind::Primitive(Keyword::Boolean)))
        {
            return Validator::new(ValidatorKind::Boolean);
        }

        if kinds.iter().all(|k| matches!(k, TypeKind::StringLiteral(_))) {
            let mut values: Vec<String> = Vec::new();
            for kind in kinds {
                if let TypeKind::StringLiteral(value) = kind
                    && !values.contains(value)
                {
                    values.push(value.clone());
                }
            }
            return Validator::new(ValidatorKind::Enum { values });
        }

        if kinds
            .iter()
            .all(|k| matches!(k, TypeKind::StringLiteral(_) | TypeKind::Primitive(Keyword::String)))
        {
            return Validator::new(ValidatorKind::String);
        }

        let text = members
            .iter()
            .map(|m| self.checker.text(*m))
            .collect::<Vec<_>>()
            .join(" | ");
        debug!(text = %text, "Union is not a literal union.");
        Validator::unknown(text, UnknownReason::NonLiteralUnion)
    }

    fn classify_single(&self, ty: TypeId, ctx: &mut VisitContext) -> Validator {
        if let Some(table) = self.id_table(ty) {
            return Validator::new(ValidatorKind::Id { table });
        }

        match self.checker.kind(ty) {
            TypeKind::Primitive(Keyword::String) => return Validator::new(ValidatorKind::String),
            TypeKind::Primitive(Keyword::Boolean) | TypeKind::BooleanLiteral(_) => {
                return Validator::new(ValidatorKind::Boolean);
            }
            TypeKind::Primitive(Keyword::Number) | TypeKind::NumberLiteral(_) => {
                return Validator::new(ValidatorKind::Number);
            }
            TypeKind::StringLiteral(value) => {
                return Validator::new(ValidatorKind::Enum {
                    values: vec![value.clone()],
                });
            }
            TypeKind::Primitive(Keyword::Any) => return Validator::new(ValidatorKind::Any),
            TypeKind::Primitive(Keyword::Null) => {
                return self.unknown(ty, UnknownReason::NullOnly).with_flags(false, true);
            }
            TypeKind::Primitive(Keyword::Undefined | Keyword::Void) => {
                return self.unknown(ty, UnknownReason::NullOnly).with_flags(true, false);
            }
            TypeKind::Primitive(_) | TypeKind::Tuple(_) | TypeKind::Opaque => {
                return self.unknown(ty, UnknownReason::Unclassified);
            }
            _ => {}
        }

        if let Some(element) = self.checker.array_element(ty) {
            let element = self.reduce_in(element, ctx);
            return Validator::new(ValidatorKind::Array {
                element: Box::new(element),
            });
        }

        if let Some(value) = self.checker.string_index(ty) {
            let value = self.reduce_in(value, ctx);
            return Validator::new(ValidatorKind::Record {
                key: None,
                value: Box::new(value),
            });
        }

        let properties: Vec<_> = self
            .checker
            .properties(ty)
            .into_iter()
            .filter(|p| !is_builtin_member(&p.name))
            .collect();
        if properties.is_empty() {
            return self.unknown(ty, UnknownReason::Unclassified);
        }

        let fields = properties
            .into_iter()
            .map(|p| {
                let schema = self.reduce_in(p.ty, ctx);
                FieldSchema::new(p.name, schema, p.optional)
            })
            .collect();
        Validator::new(ValidatorKind::Object { fields })
    }

    /// `Some(table)` when `ty` is a table id; the table is `None` when the
    /// name argument is not a string literal.
    fn id_table(&self, ty: TypeId) -> Option<Option<String>> {
        if let Some(inner) = id_type_argument(self.checker.text(ty)) {
            return Some(string_literal_text(inner));
        }

        // `string & { __tableName: "tasks" }` reached through another alias name.
        let TypeKind::Intersection(parts) = self.checker.kind(ty) else {
            return None;
        };
        let has_string = parts
            .iter()
            .any(|p| matches!(self.checker.kind(*p), TypeKind::Primitive(Keyword::String)));
        if !has_string {
            return None;
        }
        parts.iter().find_map(|part| {
            let TypeKind::Object(shape) = self.checker.kind(*part) else {
                return None;
            };
            let brand = shape.properties.iter().find(|p| p.name == "__tableName")?;
            match self.checker.kind(brand.ty) {
                TypeKind::StringLiteral(table) => Some(Some(table.clone())),
                _ => Some(None),
            }
        })
    }
}

fn string_literal_text(text: &str) -> Option<String> {
    let quoted = (text.starts_with('"') && text.ends_with('"'))
        || (text.starts_with('\'') && text.ends_with('\''));
    (quoted && text.len() >= 2).then(|| text[1..text.len() - 1].to_string())
}
