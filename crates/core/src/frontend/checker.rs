//! Resolves declarations into an arena of structural types.
//!
//! Every resolved type gets a [`TypeId`]. Alias and interface instantiations
//! are memoized by `(name, type arguments)` and allocated before their body is
//! resolved, so a declaration that refers to itself resolves to its own id
//! instead of recursing. Consumers walk the graph through [`TypeChecker::kind`],
//! [`TypeChecker::properties`] and [`TypeChecker::string_index`], and detect
//! cycles by id.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::debug;

use super::source::{ParsedSource, SourceKind};
use super::prelude::PRELUDE;
use super::syntax::{Decl, Keyword, Member, TypeExpr, TypeParam};
use crate::error::{Error, Result};

/// Nested generic instantiations beyond this resolve to an opaque type.
pub const MAX_INSTANTIATION_DEPTH: usize = 64;

const MAX_WALK_DEPTH: usize = 32;

/// Members a string value exposes through its prototype.
const STRING_MEMBERS: &[&str] = &[
    "length",
    "charAt",
    "charCodeAt",
    "concat",
    "indexOf",
    "lastIndexOf",
    "localeCompare",
    "match",
    "replace",
    "search",
    "slice",
    "split",
    "substring",
    "toLowerCase",
    "toUpperCase",
    "trim",
    "toString",
    "valueOf",
    "__@iterator",
];

const NUMBER_MEMBERS: &[&str] = &[
    "toFixed",
    "toExponential",
    "toPrecision",
    "toString",
    "toLocaleString",
    "valueOf",
];

const BOOLEAN_MEMBERS: &[&str] = &["valueOf"];

/// Identity of a resolved type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Structural shape of a resolved type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    /// Keyword type.
    Primitive(Keyword),
    /// String literal, unquoted.
    StringLiteral(String),
    /// Numeric literal as written.
    NumberLiteral(String),
    /// `true` or `false`.
    BooleanLiteral(bool),
    /// `T[]`
    Array(TypeId),
    /// `[A, B]`
    Tuple(Vec<TypeId>),
    /// Flattened union members.
    Union(Vec<TypeId>),
    /// Intersection members; see [`TypeChecker::properties`] for the merge.
    Intersection(Vec<TypeId>),
    /// Object type or interface.
    Object(ObjectShape),
    /// A name with no declaration in scope; only its text is known.
    Unresolved,
    /// A shape outside the modelled subset; only its text is known.
    Opaque,
    /// An instantiation whose body is still being resolved.
    Pending,
}

/// Properties and index signature of an object type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ObjectShape {
    /// Named properties in declaration order.
    pub properties: Vec<Property>,
    /// Value type of a `[key: string]` signature.
    pub string_index: Option<TypeId>,
}

/// A named property of an object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Declared type.
    pub ty: TypeId,
    /// Declared with `?`.
    pub optional: bool,
}

#[derive(Debug)]
struct TypeInfo {
    kind: TypeKind,
    text: String,
}

#[derive(Debug, Clone)]
enum DeclBody {
    Alias(TypeExpr),
    Interface {
        extends: Vec<TypeExpr>,
        members: Vec<Member>,
    },
}

#[derive(Debug, Clone)]
struct TypeDecl {
    params: Vec<TypeParam>,
    body: DeclBody,
}

type Scope = HashMap<String, TypeId>;

/// Symbol tables of one declaration file plus the type arena built from them.
#[derive(Debug)]
pub struct TypeChecker {
    path: PathBuf,
    types: IndexMap<String, TypeDecl>,
    values: IndexMap<String, TypeExpr>,
    exports: IndexMap<String, String>,
    arena: Vec<TypeInfo>,
    keywords: HashMap<Keyword, TypeId>,
    string_literals: HashMap<String, TypeId>,
    instantiations: HashMap<(String, Vec<TypeId>), TypeId>,
    value_types: HashMap<String, TypeId>,
    resolving_values: HashSet<String>,
    method_type: TypeId,
    depth: usize,
}

impl TypeChecker {
    /// Load and parse the declaration file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(path, &source)
    }

    /// Build a checker from in-memory source; `path` is used for diagnostics.
    pub fn from_source(path: impl Into<PathBuf>, source: &str) -> Result<Self> {
        let path = path.into();
        let prelude =
            ParsedSource::parse(Path::new("<prelude>"), PRELUDE, SourceKind::Declarations)?.declarations();
        let decls = ParsedSource::parse(&path, source, SourceKind::Declarations)?.declarations();

        let mut checker = Self {
            path,
            types: IndexMap::new(),
            values: IndexMap::new(),
            exports: IndexMap::new(),
            arena: Vec::new(),
            keywords: HashMap::new(),
            string_literals: HashMap::new(),
            instantiations: HashMap::new(),
            value_types: HashMap::new(),
            resolving_values: HashSet::new(),
            method_type: TypeId(0),
            depth: 0,
        };
        checker.method_type = checker.alloc(TypeKind::Opaque, "(method)".to_string());

        for decl in prelude {
            checker.declare(decl, false);
        }
        for decl in decls {
            checker.declare(decl, true);
        }
        debug!(
            path = %checker.path.display(),
            types = checker.types.len(),
            values = checker.values.len(),
            exports = checker.exports.len(),
            "Loaded declaration file."
        );
        Ok(checker)
    }

    fn declare(&mut self, decl: Decl, track_exports: bool) {
        match decl {
            Decl::TypeAlias {
                name,
                params,
                ty,
                exported,
            } => {
                if exported && track_exports {
                    self.exports.insert(name.clone(), name.clone());
                }
                self.types.insert(
                    name,
                    TypeDecl {
                        params,
                        body: DeclBody::Alias(ty),
                    },
                );
            }
            Decl::Interface {
                name,
                params,
                extends,
                members,
                exported,
            } => {
                if exported && track_exports {
                    self.exports.insert(name.clone(), name.clone());
                }
                self.types.insert(
                    name,
                    TypeDecl {
                        params,
                        body: DeclBody::Interface { extends, members },
                    },
                );
            }
            Decl::Value { name, ty, exported } => {
                if exported && track_exports {
                    self.exports.insert(name.clone(), name.clone());
                }
                self.values.insert(name, ty);
            }
            Decl::ExportList(list) => {
                if track_exports {
                    for (local, exported) in list {
                        self.exports.insert(exported, local);
                    }
                }
            }
        }
    }

    /// Path of the loaded declaration file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Type of the exported value `name`, failing if no such export exists.
    pub fn export_type(&mut self, name: &str) -> Result<TypeId> {
        let local = self
            .exports
            .get(name)
            .filter(|local| self.values.contains_key(local.as_str()))
            .cloned()
            .ok_or_else(|| Error::MissingExport {
                name: name.to_string(),
                path: self.path.clone(),
            })?;
        Ok(self.value_type(&local))
    }

    /// Structural kind of `id`.
    pub fn kind(&self, id: TypeId) -> &TypeKind {
        &self.arena[id.index()].kind
    }

    /// Rendered text of `id`; named instantiations keep their written name.
    pub fn text(&self, id: TypeId) -> &str {
        &self.arena[id.index()].text
    }

    /// Element type when `id` is an array.
    pub fn array_element(&self, id: TypeId) -> Option<TypeId> {
        match self.kind(id) {
            TypeKind::Array(element) => Some(*element),
            _ => None,
        }
    }

    /// Members when `id` is a union.
    pub fn union_members(&self, id: TypeId) -> Option<&[TypeId]> {
        match self.kind(id) {
            TypeKind::Union(members) => Some(members),
            _ => None,
        }
    }

    /// Apparent properties of `id`, including prototype members of primitives
    /// that take part in an intersection.
    pub fn properties(&self, id: TypeId) -> Vec<Property> {
        self.properties_in(id, 0)
    }

    fn properties_in(&self, id: TypeId, depth: usize) -> Vec<Property> {
        if depth > MAX_WALK_DEPTH {
            return Vec::new();
        }
        match self.kind(id) {
            TypeKind::Object(shape) => shape.properties.clone(),
            TypeKind::Intersection(parts) => {
                let mut merged: IndexMap<String, Property> = IndexMap::new();
                for part in parts {
                    for property in self.properties_in(*part, depth + 1) {
                        merged.entry(property.name.clone()).or_insert(property);
                    }
                }
                merged.into_values().collect()
            }
            TypeKind::Primitive(Keyword::String) | TypeKind::StringLiteral(_) => {
                self.apparent(STRING_MEMBERS)
            }
            TypeKind::Primitive(Keyword::Number) | TypeKind::NumberLiteral(_) => {
                self.apparent(NUMBER_MEMBERS)
            }
            TypeKind::Primitive(Keyword::Boolean) | TypeKind::BooleanLiteral(_) => {
                self.apparent(BOOLEAN_MEMBERS)
            }
            _ => Vec::new(),
        }
    }

    fn apparent(&self, names: &[&str]) -> Vec<Property> {
        names
            .iter()
            .map(|name| Property {
                name: (*name).to_string(),
                ty: self.method_type,
                optional: false,
            })
            .collect()
    }

    /// Value type of a `[key: string]` index signature on `id`.
    pub fn string_index(&self, id: TypeId) -> Option<TypeId> {
        self.string_index_in(id, 0)
    }

    fn string_index_in(&self, id: TypeId, depth: usize) -> Option<TypeId> {
        if depth > MAX_WALK_DEPTH {
            return None;
        }
        match self.kind(id) {
            TypeKind::Object(shape) => shape.string_index,
            TypeKind::Intersection(parts) => parts
                .iter()
                .find_map(|part| self.string_index_in(*part, depth + 1)),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    fn alloc(&mut self, kind: TypeKind, text: String) -> TypeId {
        let id = TypeId(self.arena.len() as u32);
        self.arena.push(TypeInfo { kind, text });
        id
    }

    fn keyword(&mut self, keyword: Keyword) -> TypeId {
        if let Some(&id) = self.keywords.get(&keyword) {
            return id;
        }
        let id = self.alloc(TypeKind::Primitive(keyword), keyword.as_str().to_string());
        self.keywords.insert(keyword, id);
        id
    }

    fn string_literal(&mut self, value: &str) -> TypeId {
        if let Some(&id) = self.string_literals.get(value) {
            return id;
        }
        let id = self.alloc(
            TypeKind::StringLiteral(value.to_string()),
            quote_literal(value),
        );
        self.string_literals.insert(value.to_string(), id);
        id
    }

    fn resolve(&mut self, expr: &TypeExpr, scope: &Scope) -> TypeId {
        match expr {
            TypeExpr::Keyword(keyword) => self.keyword(*keyword),
            TypeExpr::StringLit(value) => self.string_literal(value),
            TypeExpr::NumberLit(value) => {
                self.alloc(TypeKind::NumberLiteral(value.clone()), value.clone())
            }
            TypeExpr::BoolLit(value) => {
                self.alloc(TypeKind::BooleanLiteral(*value), value.to_string())
            }
            TypeExpr::Reference { name, args } => self.resolve_reference(name, args, scope),
            TypeExpr::Array(element) => {
                let element = self.resolve(element, scope);
                self.array_of(element)
            }
            TypeExpr::Tuple(elements) => {
                let ids: Vec<TypeId> = elements.iter().map(|e| self.resolve(e, scope)).collect();
                let text = format!("[{}]", self.join_texts(&ids, ", "));
                self.alloc(TypeKind::Tuple(ids), text)
            }
            TypeExpr::Union(members) => {
                let mut ids = Vec::new();
                for member in members {
                    let id = self.resolve(member, scope);
                    match self.kind(id) {
                        TypeKind::Union(inner) => ids.extend(inner.iter().copied()),
                        _ => ids.push(id),
                    }
                }
                let text = self.join_texts(&ids, " | ");
                self.alloc(TypeKind::Union(ids), text)
            }
            TypeExpr::Intersection(members) => {
                let ids: Vec<TypeId> = members.iter().map(|m| self.resolve(m, scope)).collect();
                let text = self.join_texts(&ids, " & ");
                self.alloc(TypeKind::Intersection(ids), text)
            }
            TypeExpr::Object(members) => {
                let shape = self.resolve_members(members, scope);
                let text = self.object_text(&shape);
                self.alloc(TypeKind::Object(shape), text)
            }
            TypeExpr::Query(name) => self.resolve_query(name),
            TypeExpr::Opaque(text) => self.alloc(TypeKind::Opaque, text.clone()),
        }
    }

    fn resolve_reference(&mut self, name: &str, args: &[TypeExpr], scope: &Scope) -> TypeId {
        if args.is_empty()
            && let Some(&id) = scope.get(name)
        {
            return id;
        }
        let args: Vec<TypeId> = args.iter().map(|a| self.resolve(a, scope)).collect();
        if self.types.contains_key(name) {
            return self.instantiate(name, args);
        }
        match (name, args.as_slice()) {
            ("Array" | "ReadonlyArray", [element]) => self.array_of(*element),
            ("Record", [key, value]) => self.record_of(*key, *value),
            ("Partial" | "Required" | "Readonly", [target]) => {
                self.map_properties(name, *target)
            }
            ("NonNullable", [target]) => self.non_nullable(*target),
            ("FilterApi", [api, filter]) => self.filter_api(*api, *filter),
            _ => {
                let text = self.reference_text(name, &args);
                self.alloc(TypeKind::Unresolved, text)
            }
        }
    }

    fn resolve_query(&mut self, name: &str) -> TypeId {
        let mut segments = name.split('.');
        let Some(root) = segments.next() else {
            return self.alloc(TypeKind::Opaque, format!("typeof {name}"));
        };
        let mut id = self.value_type(root);
        for segment in segments {
            let found = self
                .properties(id)
                .into_iter()
                .find(|p| p.name == segment)
                .map(|p| p.ty);
            match found {
                Some(ty) => id = ty,
                None => return self.alloc(TypeKind::Opaque, format!("typeof {name}")),
            }
        }
        id
    }

    fn value_type(&mut self, name: &str) -> TypeId {
        if let Some(&id) = self.value_types.get(name) {
            return id;
        }
        let Some(expr) = self.values.get(name).cloned() else {
            return self.alloc(TypeKind::Unresolved, format!("typeof {name}"));
        };
        if !self.resolving_values.insert(name.to_string()) {
            return self.alloc(TypeKind::Opaque, format!("typeof {name}"));
        }
        let id = self.resolve(&expr, &Scope::new());
        self.resolving_values.remove(name);
        self.value_types.insert(name.to_string(), id);
        id
    }

    fn instantiate(&mut self, name: &str, args: Vec<TypeId>) -> TypeId {
        let key = (name.to_string(), args);
        if let Some(&id) = self.instantiations.get(&key) {
            return id;
        }
        let (name, args) = key;
        let text = self.reference_text(&name, &args);
        let Some(decl) = self.types.get(&name).cloned() else {
            return self.alloc(TypeKind::Unresolved, text);
        };
        if self.depth >= MAX_INSTANTIATION_DEPTH {
            debug!(name = %name, "Instantiation depth exceeded.");
            return self.alloc(TypeKind::Opaque, text);
        }

        let id = self.alloc(TypeKind::Pending, text);
        self.instantiations.insert((name, args.clone()), id);
        self.depth += 1;

        let mut scope = Scope::new();
        for (index, param) in decl.params.iter().enumerate() {
            let arg = match (args.get(index), &param.default) {
                (Some(&arg), _) => arg,
                (None, Some(default)) => self.resolve(default, &scope),
                (None, None) => self.keyword(Keyword::Unknown),
            };
            scope.insert(param.name.clone(), arg);
        }

        let kind = match &decl.body {
            DeclBody::Alias(ty) => {
                let target = self.resolve(ty, &scope);
                match self.kind(target) {
                    _ if target == id => TypeKind::Opaque,
                    TypeKind::Pending => TypeKind::Opaque,
                    kind => kind.clone(),
                }
            }
            DeclBody::Interface { extends, members } => {
                let mut shape = ObjectShape::default();
                for base in extends {
                    let base = self.resolve(base, &scope);
                    for property in self.properties(base) {
                        upsert_property(&mut shape.properties, property);
                    }
                    if shape.string_index.is_none() {
                        shape.string_index = self.string_index(base);
                    }
                }
                let own = self.resolve_members(members, &scope);
                for property in own.properties {
                    upsert_property(&mut shape.properties, property);
                }
                if own.string_index.is_some() {
                    shape.string_index = own.string_index;
                }
                TypeKind::Object(shape)
            }
        };

        self.depth -= 1;
        self.arena[id.index()].kind = kind;
        id
    }

    fn resolve_members(&mut self, members: &[Member], scope: &Scope) -> ObjectShape {
        let mut shape = ObjectShape::default();
        for member in members {
            match member {
                Member::Property { name, optional, ty } => {
                    let ty = self.resolve(ty, scope);
                    upsert_property(
                        &mut shape.properties,
                        Property {
                            name: name.clone(),
                            ty,
                            optional: *optional,
                        },
                    );
                }
                Member::Index { key, value } => {
                    let key = self.resolve(key, scope);
                    let value = self.resolve(value, scope);
                    if matches!(
                        self.kind(key),
                        TypeKind::Primitive(Keyword::String | Keyword::Number)
                    ) {
                        shape.string_index = Some(value);
                    }
                }
            }
        }
        shape
    }

    fn array_of(&mut self, element: TypeId) -> TypeId {
        let inner = self.text(element);
        let text = if inner.contains(' ') && !inner.starts_with('{') {
            format!("({inner})[]")
        } else {
            format!("{inner}[]")
        };
        self.alloc(TypeKind::Array(element), text)
    }

    fn record_of(&mut self, key: TypeId, value: TypeId) -> TypeId {
        let text = format!("Record<{}, {}>", self.text(key), self.text(value));
        let shape = match self.literal_keys(key) {
            Some(keys) => ObjectShape {
                properties: keys
                    .into_iter()
                    .map(|name| Property {
                        name,
                        ty: value,
                        optional: false,
                    })
                    .collect(),
                string_index: None,
            },
            None => ObjectShape {
                properties: Vec::new(),
                string_index: Some(value),
            },
        };
        self.alloc(TypeKind::Object(shape), text)
    }

    fn literal_keys(&self, key: TypeId) -> Option<Vec<String>> {
        match self.kind(key) {
            TypeKind::StringLiteral(value) => Some(vec![value.clone()]),
            TypeKind::Union(members) => members
                .iter()
                .map(|m| match self.kind(*m) {
                    TypeKind::StringLiteral(value) => Some(value.clone()),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }

    fn map_properties(&mut self, modifier: &str, target: TypeId) -> TypeId {
        let text = format!("{modifier}<{}>", self.text(target));
        let properties = self.properties(target);
        if properties.is_empty() && self.string_index(target).is_none() {
            return self.alloc(TypeKind::Unresolved, text);
        }
        let shape = ObjectShape {
            properties: properties
                .into_iter()
                .map(|p| Property {
                    optional: match modifier {
                        "Partial" => true,
                        "Required" => false,
                        _ => p.optional,
                    },
                    ..p
                })
                .collect(),
            string_index: self.string_index(target),
        };
        self.alloc(TypeKind::Object(shape), text)
    }

    fn non_nullable(&mut self, target: TypeId) -> TypeId {
        let Some(members) = self.union_members(target) else {
            return target;
        };
        let kept: Vec<TypeId> = members
            .iter()
            .copied()
            .filter(|m| {
                !matches!(
                    self.kind(*m),
                    TypeKind::Primitive(Keyword::Null | Keyword::Undefined)
                )
            })
            .collect();
        match kept.as_slice() {
            [single] => *single,
            _ => {
                let text = self.join_texts(&kept, " | ");
                self.alloc(TypeKind::Union(kept), text)
            }
        }
    }

    /// Keep the function references of `api` whose `_visibility` matches the
    /// one `filter` declares, dropping namespaces left empty. An `api` with no
    /// known structure stays unresolved.
    fn filter_api(&mut self, api: TypeId, filter: TypeId) -> TypeId {
        if !matches!(self.kind(api), TypeKind::Object(_) | TypeKind::Intersection(_)) {
            let text = self.reference_text("FilterApi", &[api, filter]);
            return self.alloc(TypeKind::Unresolved, text);
        }
        let wanted = self.member_literal(filter, "_visibility");
        match self.filter_api_in(api, wanted.as_deref(), 0) {
            Some(id) => id,
            None => self.alloc(TypeKind::Object(ObjectShape::default()), "{}".to_string()),
        }
    }

    fn filter_api_in(&mut self, id: TypeId, wanted: Option<&str>, depth: usize) -> Option<TypeId> {
        if depth > MAX_WALK_DEPTH {
            return None;
        }
        let properties = self.properties(id);
        let is_reference = ["_type", "_visibility"]
            .iter()
            .all(|sentinel| properties.iter().any(|p| p.name == *sentinel));
        if is_reference {
            let visibility = self.member_literal(id, "_visibility");
            return match wanted {
                Some(wanted) if visibility.as_deref() != Some(wanted) => None,
                _ => Some(id),
            };
        }
        if !matches!(self.kind(id), TypeKind::Object(_) | TypeKind::Intersection(_)) {
            return None;
        }
        let mut shape = ObjectShape::default();
        for property in properties {
            if let Some(ty) = self.filter_api_in(property.ty, wanted, depth + 1) {
                shape.properties.push(Property { ty, ..property });
            }
        }
        if shape.properties.is_empty() {
            return None;
        }
        let text = self.object_text(&shape);
        Some(self.alloc(TypeKind::Object(shape), text))
    }

    fn member_literal(&self, id: TypeId, name: &str) -> Option<String> {
        let member = self.properties(id).into_iter().find(|p| p.name == name)?;
        match self.kind(member.ty) {
            TypeKind::StringLiteral(value) => Some(value.clone()),
            _ => None,
        }
    }

    // -------------------------------------------------------------------------
    // Text rendering
    // -------------------------------------------------------------------------

    fn join_texts(&self, ids: &[TypeId], separator: &str) -> String {
        ids.iter()
            .map(|id| self.text(*id))
            .collect::<Vec<_>>()
            .join(separator)
    }

    fn reference_text(&self, name: &str, args: &[TypeId]) -> String {
        if args.is_empty() {
            name.to_string()
        } else {
            format!("{name}<{}>", self.join_texts(args, ", "))
        }
    }

    fn object_text(&self, shape: &ObjectShape) -> String {
        let mut parts: Vec<String> = shape
            .properties
            .iter()
            .map(|p| {
                let optional = if p.optional { "?" } else { "" };
                format!("{}{optional}: {}", p.name, self.text(p.ty))
            })
            .collect();
        if let Some(index) = shape.string_index {
            parts.push(format!("[key: string]: {}", self.text(index)));
        }
        if parts.is_empty() {
            "{}".to_string()
        } else {
            format!("{{ {} }}", parts.join("; "))
        }
    }
}

fn upsert_property(properties: &mut Vec<Property>, property: Property) {
    match properties.iter_mut().find(|p| p.name == property.name) {
        Some(existing) => *existing = property,
        None => properties.push(property),
    }
}

fn quote_literal(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
