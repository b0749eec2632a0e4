//! TypeScript parsing with swc, and lowering of declaration files into
//! [`syntax`](super::syntax) declarations.
//!
//! Lowering keeps the structural subset the checker resolves. Function,
//! conditional, mapped, indexed-access, `keyof`, `infer` and `import(...)`
//! types survive only as their source text.

use std::path::Path;

use swc_common::source_map::SmallPos;
use swc_common::{BytePos, FileName, SourceMap, Span, Spanned};
use swc_ecma_ast::{
    BindingIdent, Decl as AstDecl, EsVersion, ExportDecl, ExportSpecifier, Expr, Lit, MemberProp,
    Module, ModuleDecl, ModuleExportName, ModuleItem, NamedExport, Pat, Stmt, TsEntityName,
    TsExprWithTypeArgs, TsFnParam, TsKeywordTypeKind, TsLit, TsType, TsTypeElement,
    TsTypeOperatorOp, TsTypeParamDecl, TsTypeParamInstantiation, TsTypeQueryExpr,
    TsUnionOrIntersectionType,
};
use swc_ecma_parser::{Syntax, TsSyntax, parse_file_as_module};
use tracing::debug;

use super::syntax::{Decl, Keyword, Member, TypeExpr, TypeParam};
use crate::error::{Error, Result};

/// What a source file is expected to contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// An ambient `.d.ts` declaration file.
    Declarations,
    /// A regular TypeScript module such as `schema.ts`.
    Module,
}

/// A parsed module and the text its spans point into.
#[derive(Debug)]
pub struct ParsedSource {
    /// Module AST.
    pub module: Module,
    source: String,
    start: BytePos,
}

impl ParsedSource {
    /// Parse `source`; `path` is used for diagnostics.
    pub fn parse(path: &Path, source: &str, kind: SourceKind) -> Result<Self> {
        let cm = SourceMap::default();
        let fm = cm.new_source_file(FileName::Real(path.to_path_buf()).into(), source.to_string());
        let syntax = Syntax::Typescript(TsSyntax {
            tsx: false,
            decorators: false,
            dts: kind == SourceKind::Declarations,
            ..Default::default()
        });
        let mut recovered = Vec::new();
        let parsed = parse_file_as_module(&fm, syntax, EsVersion::latest(), None, &mut recovered);
        let start = fm.start_pos;
        let module = parsed.map_err(|err| syntax_error(path, source, start, &err))?;
        for err in &recovered {
            debug!(
                path = %path.display(),
                error = %err.kind().msg(),
                "Recovered from syntax error."
            );
        }
        Ok(Self {
            module,
            source: source.to_string(),
            start,
        })
    }

    /// Source text covered by `span`, trimmed.
    pub fn text(&self, span: Span) -> &str {
        let lo = span.lo.to_usize().saturating_sub(self.start.to_usize());
        let hi = span.hi.to_usize().saturating_sub(self.start.to_usize());
        self.source.get(lo..hi).unwrap_or_default().trim()
    }

    /// Top-level declarations in source order.
    pub fn declarations(&self) -> Vec<Decl> {
        let mut decls = Vec::new();
        for item in &self.module.body {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(ExportDecl { decl, .. })) => {
                    self.lower_decl(decl, true, &mut decls);
                }
                ModuleItem::ModuleDecl(ModuleDecl::ExportNamed(named)) => {
                    if let Some(list) = export_list(named) {
                        decls.push(Decl::ExportList(list));
                    }
                }
                ModuleItem::Stmt(Stmt::Decl(decl)) => self.lower_decl(decl, false, &mut decls),
                ModuleItem::ModuleDecl(_) | ModuleItem::Stmt(_) => {}
            }
        }
        decls
    }

    fn lower_decl(&self, decl: &AstDecl, exported: bool, decls: &mut Vec<Decl>) {
        match decl {
            AstDecl::TsTypeAlias(alias) => decls.push(Decl::TypeAlias {
                name: alias.id.sym.to_string(),
                params: self.type_params(alias.type_params.as_deref()),
                ty: self.lower_type(&alias.type_ann),
                exported,
            }),
            AstDecl::TsInterface(interface) => decls.push(Decl::Interface {
                name: interface.id.sym.to_string(),
                params: self.type_params(interface.type_params.as_deref()),
                extends: interface
                    .extends
                    .iter()
                    .map(|base| self.heritage(base))
                    .collect(),
                members: self.members(&interface.body.body),
                exported,
            }),
            AstDecl::Var(var) => {
                for declarator in &var.decls {
                    if let Pat::Ident(BindingIdent {
                        id,
                        type_ann: Some(annotation),
                    }) = &declarator.name
                    {
                        decls.push(Decl::Value {
                            name: id.sym.to_string(),
                            ty: self.lower_type(&annotation.type_ann),
                            exported,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    fn type_params(&self, params: Option<&TsTypeParamDecl>) -> Vec<TypeParam> {
        params
            .map(|decl| {
                decl.params
                    .iter()
                    .map(|param| TypeParam {
                        name: param.name.sym.to_string(),
                        default: param.default.as_deref().map(|ty| self.lower_type(ty)),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn type_args(&self, args: Option<&TsTypeParamInstantiation>) -> Vec<TypeExpr> {
        args.map(|inst| inst.params.iter().map(|ty| self.lower_type(ty)).collect())
            .unwrap_or_default()
    }

    fn heritage(&self, base: &TsExprWithTypeArgs) -> TypeExpr {
        match dotted_name(&base.expr) {
            Some(name) => TypeExpr::Reference {
                name,
                args: self.type_args(base.type_args.as_deref()),
            },
            None => self.opaque(base.span),
        }
    }

    fn opaque(&self, span: Span) -> TypeExpr {
        TypeExpr::Opaque(self.text(span).to_string())
    }

    fn lower_type(&self, ty: &TsType) -> TypeExpr {
        match ty {
            TsType::TsKeywordType(keyword) => match keyword_of(keyword.kind) {
                Some(keyword) => TypeExpr::Keyword(keyword),
                None => self.opaque(keyword.span),
            },
            TsType::TsTypeRef(reference) => TypeExpr::Reference {
                name: entity_name(&reference.type_name),
                args: self.type_args(reference.type_params.as_deref()),
            },
            TsType::TsTypeQuery(query) => match &query.expr_name {
                TsTypeQueryExpr::TsEntityName(name) => TypeExpr::Query(entity_name(name)),
                TsTypeQueryExpr::Import(_) => self.opaque(query.span),
            },
            TsType::TsTypeLit(literal) => TypeExpr::Object(self.members(&literal.members)),
            TsType::TsArrayType(array) => TypeExpr::Array(Box::new(self.lower_type(&array.elem_type))),
            TsType::TsTupleType(tuple) => TypeExpr::Tuple(
                tuple
                    .elem_types
                    .iter()
                    .map(|element| self.lower_type(&element.ty))
                    .collect(),
            ),
            TsType::TsOptionalType(inner) => self.lower_type(&inner.type_ann),
            TsType::TsRestType(inner) => self.lower_type(&inner.type_ann),
            TsType::TsParenthesizedType(inner) => self.lower_type(&inner.type_ann),
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsUnionType(union)) => {
                self.flatten(&union.types, TypeExpr::Union)
            }
            TsType::TsUnionOrIntersectionType(TsUnionOrIntersectionType::TsIntersectionType(
                intersection,
            )) => self.flatten(&intersection.types, TypeExpr::Intersection),
            TsType::TsTypeOperator(operator) => match operator.op {
                TsTypeOperatorOp::ReadOnly => self.lower_type(&operator.type_ann),
                TsTypeOperatorOp::Unique => TypeExpr::Keyword(Keyword::Symbol),
                TsTypeOperatorOp::KeyOf => self.opaque(operator.span),
            },
            TsType::TsLitType(literal) => match &literal.lit {
                TsLit::Str(value) => TypeExpr::StringLit(value.value.to_string_lossy().into_owned()),
                TsLit::Number(_) => TypeExpr::NumberLit(self.text(literal.span).to_string()),
                TsLit::Bool(value) => TypeExpr::BoolLit(value.value),
                TsLit::BigInt(_) => TypeExpr::Keyword(Keyword::BigInt),
                TsLit::Tpl(_) => TypeExpr::Keyword(Keyword::String),
            },
            TsType::TsThisType(_)
            | TsType::TsFnOrConstructorType(_)
            | TsType::TsConditionalType(_)
            | TsType::TsInferType(_)
            | TsType::TsIndexedAccessType(_)
            | TsType::TsMappedType(_)
            | TsType::TsTypePredicate(_)
            | TsType::TsImportType(_) => self.opaque(ty.span()),
        }
    }

    fn flatten(&self, types: &[Box<TsType>], wrap: fn(Vec<TypeExpr>) -> TypeExpr) -> TypeExpr {
        let mut lowered: Vec<TypeExpr> = types.iter().map(|ty| self.lower_type(ty)).collect();
        if lowered.len() == 1 {
            return lowered.remove(0);
        }
        wrap(lowered)
    }

    fn members(&self, elements: &[TsTypeElement]) -> Vec<Member> {
        elements
            .iter()
            .filter_map(|element| self.member(element))
            .collect()
    }

    fn member(&self, element: &TsTypeElement) -> Option<Member> {
        match element {
            TsTypeElement::TsPropertySignature(property) => Some(Member::Property {
                name: self.key_name(&property.key, property.computed)?,
                optional: property.optional,
                ty: self.annotation(property.type_ann.as_deref().map(|a| &*a.type_ann)),
            }),
            TsTypeElement::TsGetterSignature(getter) => Some(Member::Property {
                name: self.key_name(&getter.key, getter.computed)?,
                optional: false,
                ty: self.annotation(getter.type_ann.as_deref().map(|a| &*a.type_ann)),
            }),
            TsTypeElement::TsMethodSignature(method) => Some(Member::Property {
                name: self.key_name(&method.key, method.computed)?,
                optional: method.optional,
                ty: TypeExpr::Opaque(
                    self.text(method.span)
                        .trim_end_matches([';', ','])
                        .to_string(),
                ),
            }),
            TsTypeElement::TsIndexSignature(index) => {
                let key = index.params.first().and_then(|param| match param {
                    TsFnParam::Ident(BindingIdent {
                        type_ann: Some(annotation),
                        ..
                    }) => Some(self.lower_type(&annotation.type_ann)),
                    _ => None,
                })?;
                Some(Member::Index {
                    key,
                    value: self.annotation(index.type_ann.as_deref().map(|a| &*a.type_ann)),
                })
            }
            TsTypeElement::TsSetterSignature(_)
            | TsTypeElement::TsCallSignatureDecl(_)
            | TsTypeElement::TsConstructSignatureDecl(_) => None,
        }
    }

    /// Declared type of a member; an unannotated member is `any`.
    fn annotation(&self, ty: Option<&TsType>) -> TypeExpr {
        ty.map_or(TypeExpr::Keyword(Keyword::Any), |ty| self.lower_type(ty))
    }

    /// Member name as the checker keys it. `[Symbol.iterator]` becomes
    /// `__@iterator`; other computed keys keep their brackets.
    fn key_name(&self, key: &Expr, computed: bool) -> Option<String> {
        if computed {
            return Some(match dotted_name(key) {
                Some(name) => match name.strip_prefix("Symbol.") {
                    Some(symbol) => format!("__@{symbol}"),
                    None => format!("[{name}]"),
                },
                None => format!("[{}]", self.text(key.span())),
            });
        }
        match key {
            Expr::Ident(ident) => Some(ident.sym.to_string()),
            Expr::Lit(Lit::Str(value)) => Some(value.value.to_string_lossy().into_owned()),
            Expr::Lit(Lit::Num(number)) => Some(self.text(number.span).to_string()),
            _ => None,
        }
    }
}

/// `export { a, b as c }`; re-exports from another module are ignored.
fn export_list(named: &NamedExport) -> Option<Vec<(String, String)>> {
    if named.src.is_some() {
        return None;
    }
    let list = named
        .specifiers
        .iter()
        .filter_map(|specifier| match specifier {
            ExportSpecifier::Named(named) => {
                let local = export_name(&named.orig);
                let exported = named.exported.as_ref().map_or_else(|| local.clone(), export_name);
                Some((local, exported))
            }
            ExportSpecifier::Namespace(_) | ExportSpecifier::Default(_) => None,
        })
        .collect();
    Some(list)
}

fn export_name(name: &ModuleExportName) -> String {
    match name {
        ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ModuleExportName::Str(value) => value.value.to_string_lossy().into_owned(),
    }
}

fn keyword_of(kind: TsKeywordTypeKind) -> Option<Keyword> {
    Some(match kind {
        TsKeywordTypeKind::TsAnyKeyword => Keyword::Any,
        TsKeywordTypeKind::TsUnknownKeyword => Keyword::Unknown,
        TsKeywordTypeKind::TsNumberKeyword => Keyword::Number,
        TsKeywordTypeKind::TsObjectKeyword => Keyword::Object,
        TsKeywordTypeKind::TsBooleanKeyword => Keyword::Boolean,
        TsKeywordTypeKind::TsBigIntKeyword => Keyword::BigInt,
        TsKeywordTypeKind::TsStringKeyword => Keyword::String,
        TsKeywordTypeKind::TsSymbolKeyword => Keyword::Symbol,
        TsKeywordTypeKind::TsVoidKeyword => Keyword::Void,
        TsKeywordTypeKind::TsUndefinedKeyword => Keyword::Undefined,
        TsKeywordTypeKind::TsNullKeyword => Keyword::Null,
        TsKeywordTypeKind::TsNeverKeyword => Keyword::Never,
        TsKeywordTypeKind::TsIntrinsicKeyword => return None,
    })
}

/// `ns.Name` for a type name.
fn entity_name(name: &TsEntityName) -> String {
    match name {
        TsEntityName::Ident(ident) => ident.sym.to_string(),
        TsEntityName::TsQualifiedName(qualified) => {
            format!("{}.{}", entity_name(&qualified.left), qualified.right.sym)
        }
    }
}

/// `a.b.c` for an identifier or a chain of plain member accesses.
pub fn dotted_name(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Ident(ident) => Some(ident.sym.to_string()),
        Expr::Member(member) => match &member.prop {
            MemberProp::Ident(property) => {
                Some(format!("{}.{}", dotted_name(&member.obj)?, property.sym))
            }
            MemberProp::PrivateName(_) | MemberProp::Computed(_) => None,
        },
        _ => None,
    }
}

fn syntax_error(path: &Path, source: &str, start: BytePos, err: &swc_ecma_parser::error::Error) -> Error {
    let offset = err.span().lo.to_usize().saturating_sub(start.to_usize());
    let (line, column) = line_col(source, offset);
    Error::Syntax {
        path: path.to_path_buf(),
        line,
        column,
        message: err.kind().msg().into_owned(),
    }
}

/// 1-based line and column of byte `offset` in `input`.
pub fn line_col(input: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(input.len());
    let before = input.get(..offset).unwrap_or(input);
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
        + 1;
    (line, column)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn declarations(src: &str) -> Vec<Decl> {
        ParsedSource::parse(Path::new("api.d.ts"), src, SourceKind::Declarations)
            .unwrap()
            .declarations()
    }

    fn alias_type(src: &str) -> TypeExpr {
        match declarations(src).remove(0) {
            Decl::TypeAlias { ty, .. } => ty,
            other => panic!("expected alias, got {other:?}"),
        }
    }

    fn reference(name: &str) -> TypeExpr {
        TypeExpr::Reference {
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    fn object_members(src: &str) -> Vec<Member> {
        match alias_type(src) {
            TypeExpr::Object(members) => members,
            other => panic!("expected object, got {other:?}"),
        }
    }

    #[test]
    fn test_generic_alias_with_default() {
        let decls = declarations(
            "export type FunctionReference<Type, Visibility = \"public\"> = { _type: Type; _visibility: Visibility };",
        );
        let Decl::TypeAlias {
            name,
            params,
            exported,
            ..
        } = &decls[0]
        else {
            panic!("expected alias");
        };
        assert_eq!(name, "FunctionReference");
        assert!(*exported);
        assert_eq!(params.len(), 2);
        assert_eq!(params[0].default, None);
        assert_eq!(params[1].default, Some(TypeExpr::StringLit("public".into())));
    }

    #[test]
    fn test_union_with_leading_pipe_and_arrays() {
        assert_eq!(
            alias_type("type U =\n  | string\n  | number[]\n  | null;"),
            TypeExpr::Union(vec![
                TypeExpr::Keyword(Keyword::String),
                TypeExpr::Array(Box::new(TypeExpr::Keyword(Keyword::Number))),
                TypeExpr::Keyword(Keyword::Null),
            ])
        );
        assert_eq!(alias_type("type V = | string;"), TypeExpr::Keyword(Keyword::String));
    }

    #[test]
    fn test_reference_with_type_arguments() {
        assert_eq!(
            alias_type("type R = values.GenericId<\"tasks\">;"),
            TypeExpr::Reference {
                name: "values.GenericId".into(),
                args: vec![TypeExpr::StringLit("tasks".into())],
            }
        );
        assert_eq!(alias_type("type Q = typeof fullApi.tasks;"), TypeExpr::Query("fullApi.tasks".into()));
    }

    #[test]
    fn test_literals() {
        assert_eq!(alias_type("type N = -1;"), TypeExpr::NumberLit("-1".into()));
        assert_eq!(alias_type("type T = `id_${string}`;"), TypeExpr::Keyword(Keyword::String));
        assert_eq!(alias_type("type B = true;"), TypeExpr::BoolLit(true));
        assert_eq!(alias_type("type S = unique symbol;"), TypeExpr::Keyword(Keyword::Symbol));
        assert_eq!(alias_type("type R = readonly string[];"), TypeExpr::Array(Box::new(TypeExpr::Keyword(Keyword::String))));
    }

    #[test]
    fn test_index_signature_and_methods() {
        let members = object_members(
            "type O = { [key: string]: number; toString(): string; get size(): number; set size(v: number); (x: number): void; new (): O };",
        );
        assert_eq!(members.len(), 3);
        assert_eq!(
            members[0],
            Member::Index {
                key: TypeExpr::Keyword(Keyword::String),
                value: TypeExpr::Keyword(Keyword::Number),
            }
        );
        assert!(matches!(
            &members[1],
            Member::Property { name, ty: TypeExpr::Opaque(text), .. } if name == "toString" && text == "toString(): string"
        ));
        assert!(matches!(
            &members[2],
            Member::Property { name, ty: TypeExpr::Keyword(Keyword::Number), .. } if name == "size"
        ));
    }

    #[test]
    fn test_member_keys() {
        let members = object_members(
            "type O = { [Symbol.iterator](): any; [other.key]: string; \"content-type\"?: string; 0: boolean };",
        );
        let names: Vec<(&str, bool)> = members
            .iter()
            .map(|m| match m {
                Member::Property { name, optional, .. } => (name.as_str(), *optional),
                Member::Index { .. } => ("<index>", false),
            })
            .collect();
        assert_eq!(
            names,
            vec![("__@iterator", false), ("[other.key]", false), ("content-type", true), ("0", false)]
        );
    }

    #[test]
    fn test_function_conditional_and_mapped_types_are_opaque() {
        assert_eq!(
            alias_type("type F = (a: string) => void;"),
            TypeExpr::Opaque("(a: string) => void".into())
        );
        assert_eq!(
            alias_type("type C<T> = T extends string ? 1 : 2;"),
            TypeExpr::Opaque("T extends string ? 1 : 2".into())
        );
        assert_eq!(
            alias_type("type M<T> = { [K in keyof T]: T[K] };"),
            TypeExpr::Opaque("{ [K in keyof T]: T[K] }".into())
        );
        assert_eq!(alias_type("type K<T> = keyof T;"), TypeExpr::Opaque("keyof T".into()));
        assert_eq!(
            alias_type("type I = import(\"./m\").Thing;"),
            TypeExpr::Opaque("import(\"./m\").Thing".into())
        );
    }

    #[test]
    fn test_interface_and_declared_values() {
        let decls = declarations(
            "interface Task extends Base, ns.Other<string> { text: string }\nexport declare const api: { tasks: Task }, internal: {};\ndeclare let untyped;",
        );
        assert_eq!(decls.len(), 3);
        assert!(matches!(
            &decls[0],
            Decl::Interface { name, extends, members, exported: false, .. }
                if name == "Task" && extends.len() == 2 && extends[0] == reference("Base") && members.len() == 1
        ));
        assert!(matches!(&decls[1], Decl::Value { name, exported: true, .. } if name == "api"));
        assert!(matches!(&decls[2], Decl::Value { name, exported: true, .. } if name == "internal"));
    }

    #[test]
    fn test_export_lists() {
        let decls = declarations(
            "declare const fullApi: {};\nexport { fullApi as api, fullApi };\nexport { other } from \"./other\";\nimport { Id } from \"./dataModel\";",
        );
        assert_eq!(
            decls[1],
            Decl::ExportList(vec![
                ("fullApi".into(), "api".into()),
                ("fullApi".into(), "fullApi".into()),
            ])
        );
        assert_eq!(decls.len(), 2);
    }

    #[test]
    fn test_unmodelled_statements_are_skipped() {
        let decls = declarations(
            "declare function helper(x: number): void;\ndeclare namespace ns { const inner: string; }\ndeclare enum Color { Red }\ndeclare class Box {}\ntype Kept = string;\nexport default Kept;",
        );
        assert_eq!(decls.len(), 1);
        assert!(matches!(&decls[0], Decl::TypeAlias { name, .. } if name == "Kept"));
    }

    #[test]
    fn test_syntax_error_has_location() {
        let err = ParsedSource::parse(Path::new("api.d.ts"), "type A = string;\ntype B = ;", SourceKind::Declarations)
            .unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 2, .. }), "{err:?}");
        assert!(err.to_string().starts_with("api.d.ts:2:"));
    }

    #[test]
    fn test_text_of_span() {
        let parsed =
            ParsedSource::parse(Path::new("schema.ts"), "const a = v.int64();", SourceKind::Module).unwrap();
        let span = parsed.module.body[0].span();
        assert!(parsed.text(span).starts_with("const a = v.int64()"));
    }

    #[test]
    fn test_line_col() {
        assert_eq!(line_col("abc", 0), (1, 1));
        assert_eq!(line_col("a\nbc", 3), (2, 2));
        assert_eq!(line_col("a\nbc", 99), (2, 3));
    }
}
