//! Naming and escaping helpers for Swift emission.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Swift keywords that must be backticked when used as identifiers.
///
/// Contextual keywords such as `open` or `mutating` are valid identifiers and
/// are left out.
pub static SWIFT_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "associatedtype",
        "class",
        "deinit",
        "enum",
        "extension",
        "fileprivate",
        "func",
        "import",
        "init",
        "inout",
        "internal",
        "let",
        "operator",
        "private",
        "precedencegroup",
        "protocol",
        "public",
        "rethrows",
        "static",
        "struct",
        "subscript",
        "typealias",
        "var",
        "break",
        "case",
        "catch",
        "continue",
        "default",
        "defer",
        "do",
        "else",
        "fallthrough",
        "for",
        "guard",
        "if",
        "in",
        "repeat",
        "return",
        "throw",
        "switch",
        "where",
        "while",
        "Any",
        "as",
        "await",
        "false",
        "is",
        "nil",
        "self",
        "Self",
        "super",
        "throws",
        "true",
        "try",
        "Type",
    ]
    .into_iter()
    .collect()
});

/// Whether `name` is usable as a Swift identifier without backticks or renaming.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Backtick `name` if it is a reserved word.
pub fn escape_reserved(name: &str) -> String {
    if SWIFT_RESERVED_WORDS.contains(name) {
        format!("`{name}`")
    } else {
        name.to_string()
    }
}

/// Uppercase the first character, keeping the rest.
pub fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn words(s: &str) -> Vec<&str> {
    s.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

/// `tasks_get.byId` -> `TasksGetById`.
pub fn to_pascal_case(s: &str) -> String {
    words(s).into_iter().map(capitalize_first).collect()
}

/// Type name for a path of segments: `["tasks", "get", "Item"]` -> `TasksGetItem`.
pub fn derive_name<S: AsRef<str>>(path: &[S]) -> String {
    let joined = path.iter().map(AsRef::as_ref).collect::<Vec<_>>().join("_");
    let name = to_pascal_case(&joined);
    if name.is_empty() {
        "Value".to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name
    }
}

/// lowerCamelCase identifier for an arbitrary string, without reserved-word handling.
pub fn to_camel_case(raw: &str) -> String {
    let shouting = !raw.chars().any(|c| c.is_ascii_lowercase());
    let mut out = String::new();
    for (index, word) in words(raw).into_iter().enumerate() {
        let word = if shouting {
            word.to_ascii_lowercase()
        } else {
            word.to_string()
        };
        if index == 0 {
            out.push_str(&lowercase_first(&word));
        } else {
            out.push_str(&capitalize_first(&word));
        }
    }
    if out.is_empty() {
        return "value".to_string();
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Enum case identifier for a string literal: `pr_changes_requested` -> `prChangesRequested`.
pub fn sanitize_case_name(raw: &str) -> String {
    escape_reserved(&to_camel_case(raw))
}

/// Swift property identifier for a wire field name, and whether a `CodingKeys`
/// entry is needed to map it back.
pub fn swift_field_identifier(wire: &str) -> (String, bool) {
    if is_plain_identifier(wire) {
        (escape_reserved(wire), false)
    } else {
        (escape_reserved(&to_camel_case(wire)), true)
    }
}

/// Append `2`, `3`, ... to `base` until `taken` does not contain it.
pub fn unique_name(base: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(base) {
        return base.to_string();
    }
    let (stem, tick) = match base.strip_suffix('`') {
        Some(inner) => (inner, "`"),
        None => (base, ""),
    };
    (2..)
        .map(|n| format!("{stem}{n}{tick}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| base.to_string())
}

/// Escape a string for a Swift string literal.
pub fn escape_swift_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\0' => out.push_str("\\0"),
            c if c.is_control() => out.push_str(&format!("\\u{{{:x}}}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
