//! Declaration tree the checker resolves.
//!
//! Only the type-level shapes generated declaration files use are kept;
//! everything else is lowered to [`TypeExpr::Opaque`] with its source text.

/// Keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    /// `string`
    String,
    /// `number`
    Number,
    /// `boolean`
    Boolean,
    /// `bigint`
    BigInt,
    /// `symbol`
    Symbol,
    /// `object`
    Object,
    /// `null`
    Null,
    /// `undefined`
    Undefined,
    /// `void`
    Void,
    /// `any`
    Any,
    /// `unknown`
    Unknown,
    /// `never`
    Never,
}

impl Keyword {
    /// Source spelling.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::BigInt => "bigint",
            Self::Symbol => "symbol",
            Self::Object => "object",
            Self::Null => "null",
            Self::Undefined => "undefined",
            Self::Void => "void",
            Self::Any => "any",
            Self::Unknown => "unknown",
            Self::Never => "never",
        }
    }
}

/// A type expression as written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A keyword type.
    Keyword(Keyword),
    /// String literal type, unquoted.
    StringLit(String),
    /// Numeric literal type as written, sign included.
    NumberLit(String),
    /// `true` or `false`.
    BoolLit(bool),
    /// `Name` or `ns.Name<Args>`
    Reference {
        /// Dotted name.
        name: String,
        /// Type arguments, empty when none were given.
        args: Vec<TypeExpr>,
    },
    /// `T[]` or `readonly T[]`
    Array(Box<TypeExpr>),
    /// `[A, B]`
    Tuple(Vec<TypeExpr>),
    /// `A | B`
    Union(Vec<TypeExpr>),
    /// `A & B`
    Intersection(Vec<TypeExpr>),
    /// `{ ... }` type literal.
    Object(Vec<Member>),
    /// `typeof value`
    Query(String),
    /// Function, conditional, mapped and other shapes kept only as text.
    Opaque(String),
}

/// A member of an object type or interface body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    /// Property or method signature.
    Property {
        /// Property name with quotes removed.
        name: String,
        /// Declared with `?`.
        optional: bool,
        /// Annotated type; methods are opaque.
        ty: TypeExpr,
    },
    /// `[key: string]: T`
    Index {
        /// Key parameter type.
        key: TypeExpr,
        /// Value type.
        value: TypeExpr,
    },
}

/// A generic parameter with its optional default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    /// Parameter name.
    pub name: String,
    /// `= Default`, if any.
    pub default: Option<TypeExpr>,
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    /// `type Name<Params> = T`
    TypeAlias {
        /// Alias name.
        name: String,
        /// Generic parameters.
        params: Vec<TypeParam>,
        /// Aliased type.
        ty: TypeExpr,
        /// Declared with `export`.
        exported: bool,
    },
    /// `interface Name<Params> extends Bases { ... }`
    Interface {
        /// Interface name.
        name: String,
        /// Generic parameters.
        params: Vec<TypeParam>,
        /// Heritage clause.
        extends: Vec<TypeExpr>,
        /// Body members.
        members: Vec<Member>,
        /// Declared with `export`.
        exported: bool,
    },
    /// `declare const name: T`
    Value {
        /// Binding name.
        name: String,
        /// Annotated type.
        ty: TypeExpr,
        /// Declared with `export`.
        exported: bool,
    },
    /// `export { local as exported }`
    ExportList(Vec<(String, String)>),
}
