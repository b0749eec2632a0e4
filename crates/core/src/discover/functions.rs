//! Function discovery over API roots, and selection of which functions to emit.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::frontend::{TypeChecker, TypeId, TypeKind};

/// Members every function reference exposes.
pub const FUNCTION_SENTINELS: [&str; 4] = ["_type", "_visibility", "_args", "_returnType"];

const MAX_NAMESPACE_DEPTH: usize = 32;

/// Whether a member-name list belongs to a function reference.
pub fn is_function_reference<S: AsRef<str>>(member_names: &[S]) -> bool {
    FUNCTION_SENTINELS
        .iter()
        .all(|sentinel| member_names.iter().any(|name| name.as_ref() == *sentinel))
}

/// Who may call a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Callable from clients.
    Public,
    /// Callable only from other functions.
    Internal,
}

/// Kind of a remote function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionKind {
    /// Read-only, cached.
    Query,
    /// Transactional write.
    Mutation,
    /// Side-effecting, non-transactional.
    Action,
    /// `_type` was not one of the known literals.
    Unknown,
}

impl fmt::Display for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Action => "action",
            Self::Unknown => "function",
        })
    }
}

/// A discovered function reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRef {
    /// Root export the function was found under (`api`, `internal`).
    pub root: String,
    /// Dotted path below the root (`tasks.get`).
    pub path: String,
    /// Query, mutation or action.
    pub kind: FunctionKind,
    /// Public or internal.
    pub visibility: Visibility,
    /// Arguments object type.
    pub args: TypeId,
    /// Return type.
    pub returns: TypeId,
}

impl FunctionRef {
    /// Path including the root (`api.tasks.get`).
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.root, self.path)
    }

    /// Path segments below the root.
    pub fn segments(&self) -> Vec<String> {
        self.path.split('.').map(str::to_string).collect()
    }
}

/// Walk every root export and collect function references in declaration order.
pub fn discover_functions(checker: &mut TypeChecker, roots: &[String]) -> Result<Vec<FunctionRef>> {
    let mut found = Vec::new();
    for root in roots {
        let ty = checker.export_type(root)?;
        let before = found.len();
        let mut walk = Walk {
            checker: &*checker,
            root,
            found: &mut found,
            visiting: HashSet::new(),
        };
        walk.visit(ty, &mut Vec::new());
        if found.len() == before {
            check_empty_root(checker, root, ty)?;
        }
    }
    debug!(
        path = %checker.path().display(),
        count = found.len(),
        "Discovered functions."
    );
    Ok(found)
}

/// A root without functions is fine only when it is an empty object, as
/// `FilterApi` yields for a visibility nothing uses.
fn check_empty_root(checker: &TypeChecker, root: &str, ty: TypeId) -> Result<()> {
    if is_namespace(checker.kind(ty)) && checker.properties(ty).is_empty() {
        debug!(root, "Root export has no functions.");
        return Ok(());
    }
    Err(Error::UnresolvedRoot {
        root: root.to_string(),
        text: checker.text(ty).to_string(),
        path: checker.path().to_path_buf(),
    })
}

struct Walk<'a> {
    checker: &'a TypeChecker,
    root: &'a str,
    found: &'a mut Vec<FunctionRef>,
    visiting: HashSet<TypeId>,
}

impl Walk<'_> {
    fn visit(&mut self, ty: TypeId, path: &mut Vec<String>) {
        if path.len() > MAX_NAMESPACE_DEPTH || !self.visiting.insert(ty) {
            return;
        }
        for property in self.checker.properties(ty) {
            path.push(property.name.clone());
            let members: Vec<String> = self
                .checker
                .properties(property.ty)
                .into_iter()
                .map(|p| p.name)
                .collect();
            if is_function_reference(&members) {
                self.record(property.ty, path);
            } else if !members.is_empty() && is_namespace(self.checker.kind(property.ty)) {
                self.visit(property.ty, path);
            }
            path.pop();
        }
        self.visiting.remove(&ty);
    }

    fn record(&mut self, ty: TypeId, path: &[String]) {
        let member = |name: &str| {
            self.checker
                .properties(ty)
                .into_iter()
                .find(|p| p.name == name)
                .map(|p| p.ty)
        };
        let (Some(kind), Some(visibility), Some(args), Some(returns)) = (
            member("_type"),
            member("_visibility"),
            member("_args"),
            member("_returnType"),
        ) else {
            return;
        };

        let kind = match literal_text(self.checker, kind).as_str() {
            "query" => FunctionKind::Query,
            "mutation" => FunctionKind::Mutation,
            "action" => FunctionKind::Action,
            _ => FunctionKind::Unknown,
        };
        let visibility_text = literal_text(self.checker, visibility);
        let visibility = match visibility_text.as_str() {
            "public" => Visibility::Public,
            "internal" => Visibility::Internal,
            other => {
                warn!(
                    path = %path.join("."),
                    visibility = other,
                    "Unrecognized function visibility, treating as internal."
                );
                Visibility::Internal
            }
        };

        self.found.push(FunctionRef {
            root: self.root.to_string(),
            path: path.join("."),
            kind,
            visibility,
            args,
            returns,
        });
    }
}

/// Primitives expose prototype members but are never namespaces.
fn is_namespace(kind: &TypeKind) -> bool {
    matches!(kind, TypeKind::Object(_) | TypeKind::Intersection(_))
}

/// Text of a string-literal type with its quotes stripped.
fn literal_text(checker: &TypeChecker, ty: TypeId) -> String {
    match checker.kind(ty) {
        TypeKind::StringLiteral(value) => value.clone(),
        _ => checker.text(ty).trim_matches(['"', '\'']).to_string(),
    }
}

/// What to emit when no include list is given.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DefaultSelection {
    /// Every public function.
    #[default]
    Public,
    /// A fixed list of function paths.
    Curated(Vec<String>),
}

/// Include/exclude rules applied to discovered functions.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection {
    /// Paths to emit instead of the default selection.
    pub include: Vec<String>,
    /// Paths removed last.
    pub exclude: Vec<String>,
    /// Used when `include` is empty.
    pub default: DefaultSelection,
}

impl Selection {
    /// Functions to emit, sorted by qualified path.
    ///
    /// An include list overrides the default regardless of visibility; the
    /// exclude list is subtracted afterwards.
    pub fn apply<'f>(&self, functions: &'f [FunctionRef], roots: &[String]) -> Vec<&'f FunctionRef> {
        let normalize = |entries: &[String]| -> HashSet<String> {
            entries
                .iter()
                .map(|entry| normalize_path(entry, roots))
                .collect()
        };
        let excluded = normalize(&self.exclude);

        let mut selected: Vec<&FunctionRef> = if self.include.is_empty() {
            match &self.default {
                DefaultSelection::Public => functions
                    .iter()
                    .filter(|f| f.visibility == Visibility::Public)
                    .collect(),
                DefaultSelection::Curated(list) => {
                    let wanted = normalize(list);
                    report_unmatched(&wanted, functions, "curated");
                    functions
                        .iter()
                        .filter(|f| wanted.contains(&f.qualified()))
                        .collect()
                }
            }
        } else {
            let wanted = normalize(&self.include);
            report_unmatched(&wanted, functions, "include");
            functions
                .iter()
                .filter(|f| wanted.contains(&f.qualified()))
                .collect()
        };

        selected.retain(|f| !excluded.contains(&f.qualified()));
        selected.sort_by_key(|f| f.qualified());
        selected.dedup_by_key(|f| f.qualified());
        selected
    }
}

fn report_unmatched(wanted: &HashSet<String>, functions: &[FunctionRef], list: &str) {
    let mut missing: Vec<&String> = wanted
        .iter()
        .filter(|entry| !functions.iter().any(|f| &f.qualified() == *entry))
        .collect();
    missing.sort();
    for entry in missing {
        warn!(function = %entry, list, "Selected function was not discovered.");
    }
}

/// Prefix `entry` with the primary root unless it already names a root.
pub fn normalize_path(entry: &str, roots: &[String]) -> String {
    let entry = entry.trim().trim_matches('.');
    let first = entry.split('.').next().unwrap_or_default();
    if roots.iter().any(|root| root == first) {
        return entry.to_string();
    }
    match roots.first() {
        Some(primary) => format!("{primary}.{entry}"),
        None => entry.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const API: &str = r#"
import type { FunctionReference } from "convex/server";

declare const fullApi: {
  a: {
    one: FunctionReference<"query", "public", {}, string>;
    two: FunctionReference<"mutation", "internal", { id: string }, null>;
  };
  b: {
    one: FunctionReference<"action", "public", {}, number>;
  };
};
export declare const api: typeof fullApi;
"#;

    fn roots() -> Vec<String> {
        vec!["api".to_string()]
    }

    fn discover(src: &str, roots: &[String]) -> Vec<FunctionRef> {
        let mut checker = TypeChecker::from_source("api.d.ts", src).unwrap();
        discover_functions(&mut checker, roots).unwrap()
    }

    fn paths(selected: &[&FunctionRef]) -> Vec<String> {
        selected.iter().map(|f| f.path.clone()).collect()
    }

    #[test]
    fn test_sentinel_predicate() {
        assert!(is_function_reference(&[
            "_type",
            "_visibility",
            "_args",
            "_returnType",
            "_componentPath"
        ]));
        assert!(!is_function_reference(&["_type", "_visibility", "_args"]));
        assert!(!is_function_reference::<&str>(&[]));
    }

    #[test]
    fn test_discovers_paths_kinds_and_visibility() {
        let functions = discover(API, &roots());
        assert_eq!(functions.len(), 3);
        assert_eq!(functions[0].path, "a.one");
        assert_eq!(functions[0].kind, FunctionKind::Query);
        assert_eq!(functions[0].visibility, Visibility::Public);
        assert_eq!(functions[1].path, "a.two");
        assert_eq!(functions[1].kind, FunctionKind::Mutation);
        assert_eq!(functions[1].visibility, Visibility::Internal);
        assert_eq!(functions[2].qualified(), "api.b.one");
        assert_eq!(functions[2].kind, FunctionKind::Action);
    }

    #[test]
    fn test_default_selects_public_only() {
        let functions = discover(API, &roots());
        let selected = Selection::default().apply(&functions, &roots());
        assert_eq!(paths(&selected), vec!["a.one", "b.one"]);
    }

    #[test]
    fn test_include_overrides_visibility() {
        let functions = discover(API, &roots());
        let selection = Selection {
            include: vec!["a.two".into()],
            ..Selection::default()
        };
        assert_eq!(paths(&selection.apply(&functions, &roots())), vec!["a.two"]);
    }

    #[test]
    fn test_exclude_subtracts_after_include() {
        let functions = discover(API, &roots());
        let selection = Selection {
            include: vec!["a.one".into(), "a.two".into()],
            exclude: vec!["api.a.two".into()],
            ..Selection::default()
        };
        assert_eq!(paths(&selection.apply(&functions, &roots())), vec!["a.one"]);
    }

    #[test]
    fn test_curated_default() {
        let functions = discover(API, &roots());
        let selection = Selection {
            default: DefaultSelection::Curated(vec!["b.one".into(), "missing.fn".into()]),
            ..Selection::default()
        };
        assert_eq!(paths(&selection.apply(&functions, &roots())), vec!["b.one"]);
    }

    #[test]
    fn test_normalize_path() {
        let roots = vec!["api".to_string(), "internal".to_string()];
        assert_eq!(normalize_path("tasks.get", &roots), "api.tasks.get");
        assert_eq!(normalize_path("api.tasks.get", &roots), "api.tasks.get");
        assert_eq!(normalize_path("internal.tasks.purge", &roots), "internal.tasks.purge");
        assert_eq!(normalize_path(" get ", &roots), "api.get");
    }

    #[test]
    fn test_multiple_roots_and_missing_root() {
        let src = r#"
export declare const api: { tasks: { get: FunctionReference<"query", "public", {}, string> } };
export declare const internal: { tasks: { purge: FunctionReference<"mutation", "internal", {}, null> } };
"#;
        let roots = vec!["api".to_string(), "internal".to_string()];
        let functions = discover(src, &roots);
        let qualified: Vec<String> = functions.iter().map(|f| f.qualified()).collect();
        assert_eq!(qualified, vec!["api.tasks.get", "internal.tasks.purge"]);

        let mut checker = TypeChecker::from_source("api.d.ts", src).unwrap();
        let err = discover_functions(&mut checker, &["api".to_string(), "components".to_string()])
            .unwrap_err();
        assert!(err.to_string().contains("`components`"));
    }

    #[test]
    fn test_module_style_root_names_the_unresolved_type() {
        let src = r#"
import type * as tasks from "../tasks.js";
import type { ApiFromModules, FilterApi, FunctionReference } from "convex/server";

declare const fullApi: ApiFromModules<{
  tasks: typeof tasks;
}>;
export declare const api: FilterApi<typeof fullApi, FunctionReference<any, "public">>;
"#;
        let mut checker = TypeChecker::from_source("api.d.ts", src).unwrap();
        let err = discover_functions(&mut checker, &roots()).unwrap_err();
        match &err {
            Error::UnresolvedRoot { root, text, .. } => {
                assert_eq!(root, "api");
                assert!(text.contains("ApiFromModules<"), "{text}");
            }
            other => panic!("expected unresolved root, got {other:?}"),
        }
        assert!(err.to_string().contains("`api`"));
    }

    #[test]
    fn test_root_without_functions_fails_unless_empty() {
        let src = "export declare const api: { version: string };
export declare const internal: {};";
        let mut checker = TypeChecker::from_source("api.d.ts", src).unwrap();
        assert!(discover_functions(&mut checker, &["internal".to_string()]).unwrap().is_empty());
        let err = discover_functions(&mut checker, &roots()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedRoot { ref text, .. } if text == "{ version: string }"));
    }

    #[test]
    fn test_primitive_leaves_are_not_namespaces() {
        let src = "export declare const api: { version: string; tasks: { get: FunctionReference<\"query\"> } };";
        let functions = discover(src, &roots());
        assert_eq!(functions.len(), 1);
        assert_eq!(functions[0].path, "tasks.get");
        assert_eq!(functions[0].visibility, Visibility::Public);
    }
}
