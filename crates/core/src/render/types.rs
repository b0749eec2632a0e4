//! Swift AST for generated files.
//!
//! - `SwiftType`: type expressions (`String`, `[T]`, `ConvexId<T>`, optionals)
//! - `SwiftStruct` / `SwiftEnum` / `TableMarker` / `TypeAlias`: declarations
//! - `SwiftFile`: everything one output file contains

/// Which direction a rendered type travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    /// Decoded from server responses.
    Decode,
    /// Encoded into function arguments.
    Encode,
}

/// Swift type expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwiftType {
    /// `String`
    String,
    /// `Bool`
    Bool,
    /// `Double`
    Double,
    /// Struct or enum declared in the same file
    Named(String),
    /// `ConvexId<Marker>`
    Id(String),
    /// `[T]`
    Array(Box<SwiftType>),
    /// `[String: T]`
    Dictionary(Box<SwiftType>),
    /// `T?`
    Optional(Box<SwiftType>),
    /// Untyped value on the decode side
    JsonValue,
    /// Untyped value on the encode side; already optional
    Encodable,
}

impl SwiftType {
    /// Wrap in an optional unless already optional.
    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) | Self::Encodable => self,
            other => Self::Optional(Box::new(other)),
        }
    }
}

/// Property wrapper applied to a decoded field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyWrapper {
    /// `@ConvexFloat`
    ConvexFloat,
    /// `@OptionalConvexFloat`
    OptionalConvexFloat,
}

/// How a value is turned into a `ConvexEncodable?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    /// Value is already encodable
    Direct,
    /// `.rawValue` of an id or enum
    RawValue,
    /// `.toArgs()` of a nested argument struct
    Nested,
    /// `encodeArray(value) { ... }`
    Array(Box<Encoding>),
    /// `encodeRecord(value) { ... }`
    Record(Box<Encoding>),
}

/// Presence rule of an encoded argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    /// Always set
    Required,
    /// Set only when present
    Optional,
    /// Set when present, explicit null otherwise
    Nullable,
}

/// Stored property of a generated struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwiftField {
    /// Swift identifier, backticked if reserved
    pub ident: String,
    /// Key on the wire
    pub wire_name: String,
    /// Declared type
    pub ty: SwiftType,
    /// Decode-side wrapper
    pub wrapper: Option<PropertyWrapper>,
    /// Present on argument structs only
    pub encoding: Option<(Encoding, Presence)>,
}

impl SwiftField {
    /// Whether the identifier differs from the wire name and needs a `CodingKeys` entry.
    pub fn needs_coding_key(&self) -> bool {
        self.ident.trim_matches('`') != self.wire_name
    }
}

/// Generated struct
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwiftStruct {
    /// Type name
    pub name: String,
    /// Decodable or encodable
    pub side: Side,
    /// Stored properties in declaration order
    pub fields: Vec<SwiftField>,
}

/// String-backed enum for a literal union
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwiftEnum {
    /// Type name
    pub name: String,
    /// `(case identifier, raw value)` in declaration order
    pub cases: Vec<(String, String)>,
}

/// Uninhabited marker type naming a table: `enum TasksTable {}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMarker {
    /// Type name
    pub name: String,
    /// Table it stands for
    pub table: String,
}

/// `typealias Name = Target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeAlias {
    /// Alias name
    pub name: String,
    /// Aliased type
    pub target: SwiftType,
}

/// Complete generated file
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SwiftFile {
    /// Comment lines, without the `// ` prefix
    pub header: Vec<String>,
    /// Some field is typed as `JSONValue`
    pub uses_json_value: bool,
    /// Table markers, emitted first
    pub markers: Vec<TableMarker>,
    /// Literal-union enums
    pub enums: Vec<SwiftEnum>,
    /// Document, argument and object structs
    pub structs: Vec<SwiftStruct>,
    /// Return-type aliases, emitted last
    pub aliases: Vec<TypeAlias>,
}
