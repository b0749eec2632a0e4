//! Validator trees to Swift declarations.
//!
//! Every named declaration goes through a [`RenderContext`] owned by one run.
//! Names come from paths; two shapes deriving the same name share one
//! declaration when they are identical and get a numeric suffix otherwise.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{debug, warn};

use super::types::{
    Encoding, Presence, PropertyWrapper, Side, SwiftEnum, SwiftField, SwiftFile, SwiftStruct,
    SwiftType, TableMarker, TypeAlias,
};
use super::utils::{derive_name, sanitize_case_name, swift_field_identifier, unique_name};
use crate::discover::FunctionRef;
use crate::schema::{FieldSchema, SchemaIr, Validator, ValidatorKind};

/// Members every generated struct declares itself.
const GENERATED_MEMBERS: &[&str] = &["toArgs", "CodingKeys"];

/// Type expression and decode-side wrapper of a rendered validator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// Swift type of the field.
    pub ty: SwiftType,
    /// Decode-side wrapper, if any.
    pub wrapper: Option<PropertyWrapper>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Definition {
    Struct(SwiftStruct),
    Enum(SwiftEnum),
    Marker(TableMarker),
}

impl Definition {
    fn rename(&mut self, name: &str) {
        match self {
            Self::Struct(s) => s.name = name.to_string(),
            Self::Enum(e) => e.name = name.to_string(),
            Self::Marker(m) => m.name = name.to_string(),
        }
    }
}

/// Named declarations accumulated over one generation run.
#[derive(Debug, Default)]
pub struct RenderContext {
    definitions: IndexMap<String, Definition>,
    uses_json_value: bool,
}

impl RenderContext {
    /// Empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Render `validator` at `path`, registering any named types it needs.
    pub fn render(&mut self, validator: &Validator, path: &[String], side: Side) -> Rendered {
        self.render_with(
            &validator.kind,
            validator.optional || validator.nullable,
            path,
            side,
        )
    }

    fn render_with(
        &mut self,
        kind: &ValidatorKind,
        optional: bool,
        path: &[String],
        side: Side,
    ) -> Rendered {
        let base = self.render_kind(kind, path, side);
        let wrapper = match (kind, side) {
            (ValidatorKind::Number, Side::Decode) if optional => {
                Some(PropertyWrapper::OptionalConvexFloat)
            }
            (ValidatorKind::Number, Side::Decode) => Some(PropertyWrapper::ConvexFloat),
            _ => None,
        };
        let ty = if optional { base.optional() } else { base };
        Rendered { ty, wrapper }
    }

    fn render_kind(&mut self, kind: &ValidatorKind, path: &[String], side: Side) -> SwiftType {
        match kind {
            ValidatorKind::String | ValidatorKind::Id { table: None } => SwiftType::String,
            ValidatorKind::Boolean => SwiftType::Bool,
            ValidatorKind::Number => SwiftType::Double,
            ValidatorKind::Id { table: Some(table) } => SwiftType::Id(self.marker(table)),
            ValidatorKind::Array { element } => {
                let path = child_path(path, "Item");
                SwiftType::Array(Box::new(self.render_kind(&element.kind, &path, side)))
            }
            ValidatorKind::Record { value, .. } => {
                let path = child_path(path, "Value");
                SwiftType::Dictionary(Box::new(self.render_kind(&value.kind, &path, side)))
            }
            ValidatorKind::Object { fields } => {
                SwiftType::Named(self.render_struct(fields, path, side))
            }
            ValidatorKind::Enum { values } => SwiftType::Named(self.render_enum(values, path)),
            ValidatorKind::Any | ValidatorKind::Unknown { .. } => match side {
                Side::Decode => {
                    self.uses_json_value = true;
                    SwiftType::JsonValue
                }
                Side::Encode => SwiftType::Encodable,
            },
        }
    }

    /// Register a struct for `fields` named after `path`; returns the final name.
    pub fn render_struct(&mut self, fields: &[FieldSchema], path: &[String], side: Side) -> String {
        let mut taken: HashSet<String> = GENERATED_MEMBERS.iter().map(ToString::to_string).collect();
        let mut swift_fields = Vec::with_capacity(fields.len());
        for field in fields {
            let (ident, _) = swift_field_identifier(&field.name);
            let ident = unique_name(&ident, &taken);
            taken.insert(ident.clone());

            let rendered = self.render_with(
                &field.schema.kind,
                field.optional || field.nullable,
                &child_path(path, &field.name),
                side,
            );
            let encoding = (side == Side::Encode).then(|| {
                let presence = if field.optional {
                    Presence::Optional
                } else if field.nullable {
                    Presence::Nullable
                } else {
                    Presence::Required
                };
                (encoding_for(&field.schema.kind), presence)
            });
            swift_fields.push(SwiftField {
                ident,
                wire_name: field.name.clone(),
                ty: rendered.ty,
                wrapper: rendered.wrapper,
                encoding,
            });
        }
        self.register(Definition::Struct(SwiftStruct {
            name: derive_name(path),
            side,
            fields: swift_fields,
        }))
    }

    fn render_enum(&mut self, values: &[String], path: &[String]) -> String {
        let mut taken = HashSet::new();
        let cases = values
            .iter()
            .map(|value| {
                let ident = unique_name(&sanitize_case_name(value), &taken);
                taken.insert(ident.clone());
                (ident, value.clone())
            })
            .collect();
        self.register(Definition::Enum(SwiftEnum {
            name: format!("{}Enum", derive_name(path)),
            cases,
        }))
    }

    fn marker(&mut self, table: &str) -> String {
        self.register(Definition::Marker(TableMarker {
            name: format!("{}Table", derive_name(&[table])),
            table: table.to_string(),
        }))
    }

    fn register(&mut self, mut definition: Definition) -> String {
        let base = match &definition {
            Definition::Struct(s) => s.name.clone(),
            Definition::Enum(e) => e.name.clone(),
            Definition::Marker(m) => m.name.clone(),
        };
        let mut suffix = 1;
        loop {
            let candidate = if suffix == 1 {
                base.clone()
            } else {
                format!("{base}{suffix}")
            };
            definition.rename(&candidate);
            match self.definitions.get(&candidate) {
                Some(existing) if *existing == definition => return candidate,
                Some(_) => suffix += 1,
                None => {
                    if suffix > 1 {
                        warn!(
                            name = %base,
                            renamed = %candidate,
                            "Different shapes derive the same type name; renamed."
                        );
                    }
                    self.definitions.insert(candidate.clone(), definition);
                    return candidate;
                }
            }
        }
    }

    /// Assemble the file from everything registered so far.
    pub fn into_file(self, header: Vec<String>, aliases: Vec<TypeAlias>) -> SwiftFile {
        let mut file = SwiftFile {
            header,
            uses_json_value: self.uses_json_value,
            aliases,
            ..SwiftFile::default()
        };
        for definition in self.definitions.into_values() {
            match definition {
                Definition::Struct(s) => file.structs.push(s),
                Definition::Enum(e) => file.enums.push(e),
                Definition::Marker(m) => file.markers.push(m),
            }
        }
        file.structs.sort_by(|a, b| a.name.cmp(&b.name));
        file.enums.sort_by(|a, b| a.name.cmp(&b.name));
        file.markers.sort_by(|a, b| a.name.cmp(&b.name));
        file
    }
}

fn child_path(path: &[String], segment: &str) -> Vec<String> {
    let mut child = path.to_vec();
    child.push(segment.to_string());
    child
}

/// How a value of `kind` is encoded into an argument dictionary.
pub fn encoding_for(kind: &ValidatorKind) -> Encoding {
    match kind {
        ValidatorKind::Id { table: Some(_) } | ValidatorKind::Enum { .. } => Encoding::RawValue,
        ValidatorKind::Object { .. } => Encoding::Nested,
        ValidatorKind::Array { element } => Encoding::Array(Box::new(encoding_for(&element.kind))),
        ValidatorKind::Record { value, .. } => {
            Encoding::Record(Box::new(encoding_for(&value.kind)))
        }
        _ => Encoding::Direct,
    }
}

/// Reduced argument and return validators of one selected function.
#[derive(Debug, Clone)]
pub struct FunctionShape<'a> {
    /// The selected function.
    pub function: &'a FunctionRef,
    /// Segments type names derive from.
    pub path: Vec<String>,
    /// Reduced arguments object.
    pub args: Validator,
    /// Reduced return type.
    pub returns: Validator,
}

/// Build the API file: one argument struct and one return type per function.
pub fn codegen_api(source: &str, functions: &[FunctionShape<'_>]) -> SwiftFile {
    let mut ctx = RenderContext::new();
    let mut aliases = Vec::new();

    for shape in functions {
        let args_path = child_path(&shape.path, "Args");
        let no_fields = Vec::new();
        let fields = match &shape.args.kind {
            ValidatorKind::Object { fields } => fields,
            _ => {
                debug!(
                    function = %shape.function.qualified(),
                    kind = shape.args.kind_name(),
                    "Arguments are not an object; generating an empty argument struct."
                );
                &no_fields
            }
        };
        ctx.render_struct(fields, &args_path, Side::Encode);

        let return_path = child_path(&shape.path, "Return");
        match &shape.returns.kind {
            ValidatorKind::Object { fields } if !shape.returns.optional && !shape.returns.nullable => {
                ctx.render_struct(fields, &return_path, Side::Decode);
            }
            _ => {
                let rendered = ctx.render(&shape.returns, &shape.path, Side::Decode);
                aliases.push(TypeAlias {
                    name: derive_name(&return_path),
                    target: rendered.ty,
                });
            }
        }
    }

    let mut header = vec![
        format!("Generated by typebridge from {source}. Do not edit."),
        String::new(),
        "Functions:".to_string(),
    ];
    header.extend(
        functions
            .iter()
            .map(|shape| format!("  {} {}", shape.function.kind, shape.function.qualified())),
    );
    ctx.into_file(header, aliases)
}

/// Build the schema file: one document struct per table.
pub fn codegen_schema(ir: &SchemaIr) -> SwiftFile {
    let mut ctx = RenderContext::new();
    for table in &ir.tables {
        let mut fields = vec![
            FieldSchema::new(
                "_id",
                Validator::new(ValidatorKind::Id {
                    table: Some(table.name.clone()),
                }),
                false,
            ),
            FieldSchema::new("_creationTime", Validator::new(ValidatorKind::Number), false),
        ];
        fields.extend(
            table
                .fields
                .iter()
                .filter(|f| f.name != "_id" && f.name != "_creationTime")
                .cloned(),
        );
        ctx.render_struct(&fields, &[table.name.clone(), "Document".to_string()], Side::Decode);
    }

    let mut header = vec![
        format!("Generated by typebridge from {}. Do not edit.", ir.source),
        String::new(),
        "Tables:".to_string(),
    ];
    header.extend(ir.tables.iter().map(|t| format!("  {}", t.name)));
    ctx.into_file(header, Vec::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::UnknownReason;

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| (*s).to_string()).collect()
    }

    fn object(fields: Vec<FieldSchema>) -> Validator {
        Validator::new(ValidatorKind::Object { fields })
    }

    fn string() -> Validator {
        Validator::new(ValidatorKind::String)
    }

    #[test]
    fn test_number_wrappers_by_side_and_presence() {
        let mut ctx = RenderContext::new();
        let number = Validator::new(ValidatorKind::Number);
        let required = ctx.render(&number, &path(&["n"]), Side::Decode);
        assert_eq!(required.ty, SwiftType::Double);
        assert_eq!(required.wrapper, Some(PropertyWrapper::ConvexFloat));

        let optional = ctx.render(&number.clone().with_flags(true, false), &path(&["n"]), Side::Decode);
        assert_eq!(optional.ty, SwiftType::Optional(Box::new(SwiftType::Double)));
        assert_eq!(optional.wrapper, Some(PropertyWrapper::OptionalConvexFloat));

        let encoded = ctx.render(&number, &path(&["n"]), Side::Encode);
        assert_eq!(encoded.wrapper, None);
    }

    #[test]
    fn test_ids_register_markers() {
        let mut ctx = RenderContext::new();
        let id = Validator::new(ValidatorKind::Id {
            table: Some("tasks".into()),
        });
        let rendered = ctx.render(&id, &path(&["x"]), Side::Decode);
        assert_eq!(rendered.ty, SwiftType::Id("TasksTable".into()));
        let untabled = ctx.render(&Validator::new(ValidatorKind::Id { table: None }), &path(&["x"]), Side::Decode);
        assert_eq!(untabled.ty, SwiftType::String);

        let file = ctx.into_file(Vec::new(), Vec::new());
        assert_eq!(file.markers.len(), 1);
        assert_eq!(file.markers[0].table, "tasks");
    }

    #[test]
    fn test_collections_strip_element_optionality() {
        let mut ctx = RenderContext::new();
        let array = Validator::new(ValidatorKind::Array {
            element: Box::new(string().with_flags(true, true)),
        })
        .with_flags(true, false);
        let rendered = ctx.render(&array, &path(&["tags"]), Side::Decode);
        assert_eq!(
            rendered.ty,
            SwiftType::Optional(Box::new(SwiftType::Array(Box::new(SwiftType::String))))
        );
    }

    #[test]
    fn test_untyped_values_by_side() {
        let mut ctx = RenderContext::new();
        let unknown = Validator::unknown("bigint", UnknownReason::UnsupportedBuilder).with_flags(true, false);
        assert_eq!(ctx.render(&unknown, &path(&["u"]), Side::Encode).ty, SwiftType::Encodable);
        assert_eq!(
            ctx.render(&unknown, &path(&["u"]), Side::Decode).ty,
            SwiftType::Optional(Box::new(SwiftType::JsonValue))
        );
        assert!(ctx.into_file(Vec::new(), Vec::new()).uses_json_value);
    }

    #[test]
    fn test_identical_shapes_share_a_name() {
        let mut ctx = RenderContext::new();
        let a = ctx.render_struct(&[FieldSchema::new("x", string(), false)], &path(&["a_b"]), Side::Decode);
        let b = ctx.render_struct(&[FieldSchema::new("x", string(), false)], &path(&["a", "b"]), Side::Decode);
        assert_eq!(a, "AB");
        assert_eq!(b, "AB");
        assert_eq!(ctx.into_file(Vec::new(), Vec::new()).structs.len(), 1);
    }

    #[test]
    fn test_different_shapes_get_suffixes() {
        let mut ctx = RenderContext::new();
        let a = ctx.render_struct(&[FieldSchema::new("x", string(), false)], &path(&["a_b"]), Side::Decode);
        let b = ctx.render_struct(&[FieldSchema::new("y", string(), false)], &path(&["a", "b"]), Side::Decode);
        let c = ctx.render_struct(&[FieldSchema::new("z", string(), false)], &path(&["aB"]), Side::Decode);
        assert_eq!((a.as_str(), b.as_str(), c.as_str()), ("AB", "AB2", "AB3"));
    }

    #[test]
    fn test_enum_cases_are_unique() {
        let mut ctx = RenderContext::new();
        let values = vec!["in-review".to_string(), "in_review".to_string(), "open".to_string()];
        let name = ctx.render_enum(&values, &path(&["task", "status"]));
        assert_eq!(name, "TaskStatusEnum");
        let file = ctx.into_file(Vec::new(), Vec::new());
        let cases: Vec<(&str, &str)> = file.enums[0]
            .cases
            .iter()
            .map(|(ident, raw)| (ident.as_str(), raw.as_str()))
            .collect();
        assert_eq!(
            cases,
            vec![("inReview", "in-review"), ("inReview2", "in_review"), ("open", "open")]
        );
    }

    #[test]
    fn test_argument_presence_and_encoding() {
        let mut ctx = RenderContext::new();
        let status = Validator::new(ValidatorKind::Enum {
            values: vec!["a".into()],
        });
        let fields = vec![
            FieldSchema::new("text", string(), false),
            FieldSchema::new("note", string(), true),
            FieldSchema::new("status", status.with_flags(false, true), false),
            FieldSchema::new(
                "tags",
                Validator::new(ValidatorKind::Array {
                    element: Box::new(object(vec![FieldSchema::new("k", string(), false)])),
                }),
                false,
            ),
        ];
        ctx.render_struct(&fields, &path(&["tasks", "create", "Args"]), Side::Encode);
        let file = ctx.into_file(Vec::new(), Vec::new());
        let args = file.structs.iter().find(|s| s.name == "TasksCreateArgs").unwrap();
        let encodings: Vec<_> = args.fields.iter().map(|f| f.encoding.clone().unwrap()).collect();
        assert_eq!(encodings[0], (Encoding::Direct, Presence::Required));
        assert_eq!(encodings[1], (Encoding::Direct, Presence::Optional));
        assert_eq!(encodings[2], (Encoding::RawValue, Presence::Nullable));
        assert_eq!(
            encodings[3],
            (Encoding::Array(Box::new(Encoding::Nested)), Presence::Required)
        );
        assert!(file.structs.iter().any(|s| s.name == "TasksCreateArgsTagsItem"));
    }

    #[test]
    fn test_fields_named_like_generated_members_are_renamed() {
        let mut ctx = RenderContext::new();
        let fields = vec![
            FieldSchema::new("toArgs", string(), false),
            FieldSchema::new("CodingKeys", string(), false),
            FieldSchema::new("args", string(), false),
        ];
        ctx.render_struct(&fields, &path(&["f", "Args"]), Side::Encode);
        let file = ctx.into_file(Vec::new(), Vec::new());
        let idents: Vec<&str> = file.structs[0].fields.iter().map(|f| f.ident.as_str()).collect();
        assert_eq!(idents, vec!["toArgs2", "CodingKeys2", "args"]);
        assert_eq!(file.structs[0].fields[0].wire_name, "toArgs");
    }

    #[test]
    fn test_optional_wins_over_nullable() {
        let mut ctx = RenderContext::new();
        let fields = vec![FieldSchema::new("x", string().with_flags(true, true), false)];
        ctx.render_struct(&fields, &path(&["f", "Args"]), Side::Encode);
        let file = ctx.into_file(Vec::new(), Vec::new());
        assert_eq!(
            file.structs[0].fields[0].encoding,
            Some((Encoding::Direct, Presence::Optional))
        );
    }
}
