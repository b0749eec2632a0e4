//! Swift code emission via the Emit trait.
//!
//! Each AST node implements `Emit`; `SwiftFile::emit` lays out the whole file in
//! a fixed order so identical input always produces identical text.

use super::types::{
    Encoding, Presence, PropertyWrapper, Side, SwiftEnum, SwiftField, SwiftFile, SwiftStruct,
    SwiftType, TableMarker, TypeAlias,
};
use super::utils::escape_swift_string;

/// Trait for emitting Swift code from AST nodes.
pub trait Emit {
    /// Convert the AST node to its Swift source text.
    fn emit(&self) -> String;
}

const INDENT: &str = "    ";

const ARGS_TYPE: &str = "[String: ConvexEncodable?]";

const CONVEX_ID: &str = r#"/// Identifier of a row in the table named by `Table`.
struct ConvexId<Table>: Codable, Hashable, CustomStringConvertible {
    let rawValue: String

    init(_ rawValue: String) {
        self.rawValue = rawValue
    }

    init(from decoder: Decoder) throws {
        rawValue = try decoder.singleValueContainer().decode(String.self)
    }

    func encode(to encoder: Encoder) throws {
        var container = encoder.singleValueContainer()
        try container.encode(rawValue)
    }

    var description: String { rawValue }
}"#;

const ENCODING_HELPERS: &str = r"func encodeArray<T>(_ values: [T], _ transform: (T) -> ConvexEncodable?) -> [ConvexEncodable?] {
    values.map(transform)
}

func encodeRecord<T>(_ values: [String: T], _ transform: (T) -> ConvexEncodable?) -> [String: ConvexEncodable?] {
    values.mapValues(transform)
}";

const JSON_VALUE: &str = r"/// Value whose shape is not known statically.
enum JSONValue: Decodable, Hashable {
    case null
    case bool(Bool)
    case number(Double)
    case string(String)
    case array([JSONValue])
    case object([String: JSONValue])

    init(from decoder: Decoder) throws {
        let container = try decoder.singleValueContainer()
        if container.decodeNil() {
            self = .null
        } else if let value = try? container.decode(Bool.self) {
            self = .bool(value)
        } else if let value = try? container.decode(Double.self) {
            self = .number(value)
        } else if let value = try? container.decode(String.self) {
            self = .string(value)
        } else if let value = try? container.decode([JSONValue].self) {
            self = .array(value)
        } else {
            self = .object(try container.decode([String: JSONValue].self))
        }
    }
}";

// =============================================================================
// Types
// =============================================================================

impl Emit for SwiftType {
    fn emit(&self) -> String {
        match self {
            SwiftType::String => "String".to_string(),
            SwiftType::Bool => "Bool".to_string(),
            SwiftType::Double => "Double".to_string(),
            SwiftType::Named(name) => name.clone(),
            SwiftType::Id(marker) => format!("ConvexId<{marker}>"),
            SwiftType::Array(element) => format!("[{}]", element.emit()),
            SwiftType::Dictionary(value) => format!("[String: {}]", value.emit()),
            SwiftType::Optional(inner) => match **inner {
                SwiftType::Encodable | SwiftType::Optional(_) => inner.emit(),
                _ => format!("{}?", inner.emit()),
            },
            SwiftType::JsonValue => "JSONValue".to_string(),
            SwiftType::Encodable => "ConvexEncodable?".to_string(),
        }
    }
}

impl Emit for PropertyWrapper {
    fn emit(&self) -> String {
        match self {
            PropertyWrapper::ConvexFloat => "@ConvexFloat".to_string(),
            PropertyWrapper::OptionalConvexFloat => "@OptionalConvexFloat".to_string(),
        }
    }
}

impl Emit for SwiftField {
    fn emit(&self) -> String {
        match self.wrapper {
            Some(wrapper) => format!("{} var {}: {}", wrapper.emit(), self.ident, self.ty.emit()),
            None => format!("let {}: {}", self.ident, self.ty.emit()),
        }
    }
}

// =============================================================================
// Argument encoding
// =============================================================================

/// Expression turning `value` into a `ConvexEncodable?`.
pub fn encode_value(encoding: &Encoding, value: &str) -> String {
    match encoding {
        Encoding::Direct => value.to_string(),
        Encoding::RawValue => format!("{value}.rawValue"),
        Encoding::Nested => format!("{value}.toArgs()"),
        Encoding::Array(inner) => format!("encodeArray({value}) {{ {} }}", encode_value(inner, "$0")),
        Encoding::Record(inner) => {
            format!("encodeRecord({value}) {{ {} }}", encode_value(inner, "$0"))
        }
    }
}

/// Statement adding `field` to the `args` dictionary.
///
/// Fields are read through `self` so a field named `args` or `value` is not
/// shadowed by the locals of `toArgs()`.
pub fn encode_statement(field: &SwiftField, encoding: &Encoding, presence: Presence) -> String {
    let key = escape_swift_string(&field.wire_name);
    let member = format!("self.{}", field.ident);
    match presence {
        Presence::Required => format!("args[\"{key}\"] = {}", encode_value(encoding, &member)),
        Presence::Optional => format!(
            "if let value = {member} {{ args[\"{key}\"] = {} }}",
            encode_value(encoding, "value")
        ),
        Presence::Nullable => format!(
            "if let value = {member} {{ args[\"{key}\"] = {} }} else {{ args.updateValue(nil, forKey: \"{key}\") }}",
            encode_value(encoding, "value")
        ),
    }
}

fn emit_to_args(fields: &[SwiftField]) -> Vec<String> {
    let statements: Vec<String> = fields
        .iter()
        .filter_map(|field| {
            let (encoding, presence) = field.encoding.as_ref()?;
            Some(encode_statement(field, encoding, *presence))
        })
        .collect();

    let mut lines = vec![format!("{INDENT}func toArgs() -> {ARGS_TYPE} {{")];
    if statements.is_empty() {
        lines.push(format!("{INDENT}{INDENT}[:]"));
    } else {
        lines.push(format!("{INDENT}{INDENT}var args: {ARGS_TYPE} = [:]"));
        lines.extend(statements.into_iter().map(|s| format!("{INDENT}{INDENT}{s}")));
        lines.push(format!("{INDENT}{INDENT}return args"));
    }
    lines.push(format!("{INDENT}}}"));
    lines
}

// =============================================================================
// Declarations
// =============================================================================

impl Emit for SwiftStruct {
    fn emit(&self) -> String {
        let declaration = match self.side {
            Side::Decode => format!("struct {}: Decodable", self.name),
            Side::Encode => format!("struct {}", self.name),
        };

        let mut body: Vec<String> = self
            .fields
            .iter()
            .map(|field| format!("{INDENT}{}", field.emit()))
            .collect();

        if self.side == Side::Decode && self.fields.iter().any(SwiftField::needs_coding_key) {
            body.push(String::new());
            body.push(format!("{INDENT}enum CodingKeys: String, CodingKey {{"));
            for field in &self.fields {
                if field.needs_coding_key() {
                    body.push(format!(
                        "{INDENT}{INDENT}case {} = \"{}\"",
                        field.ident,
                        escape_swift_string(&field.wire_name)
                    ));
                } else {
                    body.push(format!("{INDENT}{INDENT}case {}", field.ident));
                }
            }
            body.push(format!("{INDENT}}}"));
        }

        if self.side == Side::Encode {
            if !body.is_empty() {
                body.push(String::new());
            }
            body.extend(emit_to_args(&self.fields));
        }

        if body.is_empty() {
            format!("{declaration} {{}}")
        } else {
            format!("{declaration} {{\n{}\n}}", body.join("\n"))
        }
    }
}

impl Emit for SwiftEnum {
    fn emit(&self) -> String {
        let cases: Vec<String> = self
            .cases
            .iter()
            .map(|(ident, raw)| format!("{INDENT}case {ident} = \"{}\"", escape_swift_string(raw)))
            .collect();
        format!(
            "enum {}: String, Codable, CaseIterable {{\n{}\n}}",
            self.name,
            cases.join("\n")
        )
    }
}

impl Emit for TableMarker {
    fn emit(&self) -> String {
        format!(
            "/// Marker for the `{}` table.\nenum {} {{}}",
            self.table, self.name
        )
    }
}

impl Emit for TypeAlias {
    fn emit(&self) -> String {
        format!("typealias {} = {}", self.name, self.target.emit())
    }
}

// =============================================================================
// File
// =============================================================================

fn section<T: Emit>(title: &str, items: &[T]) -> Option<String> {
    if items.is_empty() {
        return None;
    }
    let body: Vec<String> = items.iter().map(Emit::emit).collect();
    Some(format!("// MARK: - {title}\n\n{}", body.join("\n\n")))
}

impl Emit for SwiftFile {
    fn emit(&self) -> String {
        let header: Vec<String> = self
            .header
            .iter()
            .map(|line| {
                if line.is_empty() {
                    "//".to_string()
                } else {
                    format!("// {line}")
                }
            })
            .collect();

        let mut blocks = vec![
            header.join("\n"),
            "import ConvexMobile\nimport Foundation".to_string(),
            format!("// MARK: - Support\n\n{CONVEX_ID}\n\n{ENCODING_HELPERS}"),
        ];
        if self.uses_json_value {
            blocks.push(JSON_VALUE.to_string());
        }
        blocks.extend(section("Tables", &self.markers));
        blocks.extend(section("Enums", &self.enums));
        blocks.extend(section("Structs", &self.structs));
        blocks.extend(section("Return Types", &self.aliases));

        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }
}
