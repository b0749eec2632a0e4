//! Closed intermediate schema shared by the reducer, the table discoverer and
//! the renderer.
//!
//! Validators are built once and never mutated; the `serde` derives produce
//! the JSON IR dump of the schema variant.

use serde::Serialize;

/// Why a type could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnknownReason {
    /// No classification rule matched.
    Unclassified,
    /// The type was already being reduced higher up the chain.
    Cycle,
    /// Nesting exceeded the depth ceiling.
    DepthLimit,
    /// A union with members other than string literals.
    NonLiteralUnion,
    /// Only `null`/`undefined` remained after unwrapping.
    NullOnly,
    /// A schema builder call with no validator mapping.
    UnsupportedBuilder,
}

impl UnknownReason {
    /// Short label used in diagnostics and the usage report.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unclassified => "unclassified",
            Self::Cycle => "cycle",
            Self::DepthLimit => "depth-limit",
            Self::NonLiteralUnion => "non-literal union",
            Self::NullOnly => "null-only",
            Self::UnsupportedBuilder => "unsupported builder",
        }
    }
}

/// Shape of a validator node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ValidatorKind {
    /// `v.string()` or a string keyword.
    String,
    /// `v.number()`, `v.float64()` or a number keyword.
    Number,
    /// `v.boolean()` or a boolean keyword.
    Boolean,
    /// Reference to a table row.
    Id {
        /// Target table, when known.
        #[serde(skip_serializing_if = "Option::is_none")]
        table: Option<String>,
    },
    /// Homogeneous list.
    Array {
        /// Element validator.
        element: Box<Validator>,
    },
    /// String-keyed mapping. Declarations only yield the value; the schema
    /// DSL also records the key validator.
    Record {
        /// Key validator.
        #[serde(skip_serializing_if = "Option::is_none")]
        key: Option<Box<Validator>>,
        /// Value validator.
        value: Box<Validator>,
    },
    /// Object with named fields.
    Object {
        /// Fields in declaration order.
        fields: Vec<FieldSchema>,
    },
    /// Closed set of string literals, in declaration order.
    Enum {
        /// Literal values, deduplicated.
        values: Vec<String>,
    },
    /// `v.any()`
    Any,
    /// Could not be classified.
    Unknown {
        /// Source text of the unclassified node.
        text: String,
        /// Why classification stopped.
        reason: UnknownReason,
    },
}

/// A validator node with its presence flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Validator {
    /// Node shape.
    #[serde(flatten)]
    pub kind: ValidatorKind,
    /// Wrapped in `v.optional(...)` or unioned with `undefined`.
    #[serde(skip_serializing_if = "is_false")]
    pub optional: bool,
    /// Unioned with `null`.
    #[serde(skip_serializing_if = "is_false")]
    pub nullable: bool,
}

/// A named field of an object validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSchema {
    /// Key as written.
    pub name: String,
    /// The key may be omitted.
    pub optional: bool,
    /// The value may be null.
    pub nullable: bool,
    /// Value validator.
    pub schema: Validator,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(value: &bool) -> bool {
    !*value
}

impl Validator {
    /// A required, non-null validator.
    pub fn new(kind: ValidatorKind) -> Self {
        Self {
            kind,
            optional: false,
            nullable: false,
        }
    }

    /// An `unknown` validator carrying the unclassified text.
    pub fn unknown(text: impl Into<String>, reason: UnknownReason) -> Self {
        Self::new(ValidatorKind::Unknown {
            text: text.into(),
            reason,
        })
    }

    /// Same validator with the given flags OR-ed in.
    pub fn with_flags(mut self, optional: bool, nullable: bool) -> Self {
        self.optional |= optional;
        self.nullable |= nullable;
        self
    }

    /// Same validator with both flags cleared.
    pub fn stripped(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            optional: false,
            nullable: false,
        }
    }

    /// Name of the validator kind, as counted in the usage report.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            ValidatorKind::String => "string",
            ValidatorKind::Number => "number",
            ValidatorKind::Boolean => "boolean",
            ValidatorKind::Id { .. } => "id",
            ValidatorKind::Array { .. } => "array",
            ValidatorKind::Record { .. } => "record",
            ValidatorKind::Object { .. } => "object",
            ValidatorKind::Enum { .. } => "enum",
            ValidatorKind::Any => "any",
            ValidatorKind::Unknown { .. } => "unknown",
        }
    }

    /// Whether the node is `any` or `unknown`.
    pub fn is_untyped(&self) -> bool {
        matches!(self.kind, ValidatorKind::Any | ValidatorKind::Unknown { .. })
    }
}

impl FieldSchema {
    /// Field whose presence flags come from the validator plus a declared `?`.
    pub fn new(name: impl Into<String>, schema: Validator, declared_optional: bool) -> Self {
        Self {
            name: name.into(),
            optional: schema.optional || declared_optional,
            nullable: schema.nullable,
            schema,
        }
    }
}

/// Kind of a table index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum IndexKind {
    /// `.index(name, fields)`
    Index,
    /// `.searchIndex(name, config)`
    Search,
    /// `.vectorIndex(name, config)`
    Vector,
}

/// An index declared on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexSchema {
    /// Index flavor.
    pub kind: IndexKind,
    /// Index name.
    pub name: String,
    /// Indexed fields; search and vector indexes list the primary field first.
    pub fields: Vec<String>,
}

/// A table of the schema source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Document fields, system fields excluded.
    pub fields: Vec<FieldSchema>,
    /// Declared indexes in call order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub indexes: Vec<IndexSchema>,
}

/// All tables of one schema source, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaIr {
    /// Path of the schema source.
    pub source: String,
    /// Tables in declaration order.
    pub tables: Vec<TableSchema>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_merges_declared_optional() {
        let field = FieldSchema::new("a", Validator::new(ValidatorKind::String), true);
        assert!(field.optional);
        assert!(!field.nullable);

        let nullable = Validator::new(ValidatorKind::Number).with_flags(false, true);
        let field = FieldSchema::new("b", nullable, false);
        assert!(!field.optional);
        assert!(field.nullable);
    }

    #[test]
    fn test_serializes_tagged_kind_and_skips_false_flags() {
        let v = Validator::new(ValidatorKind::Id {
            table: Some("tasks".into()),
        })
        .with_flags(true, false);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "kind": "id", "table": "tasks", "optional": true })
        );
    }

    #[test]
    fn test_unknown_reason_serialization() {
        let v = Validator::unknown("bigint", UnknownReason::UnsupportedBuilder);
        let json = serde_json::to_value(&v).unwrap();
        assert_eq!(json["reason"], "unsupported-builder");
        assert_eq!(json["text"], "bigint");
    }
}
