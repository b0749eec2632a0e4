//! Usage report for the schema variant: how often each validator kind occurs
//! and which fields bottom out in untyped values.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{FieldSchema, SchemaIr, Validator, ValidatorKind};

/// A field whose type the generated code cannot express precisely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageIssue {
    /// Table the field belongs to.
    pub table: String,
    /// Dotted path below the table; array elements add `[]`.
    pub field: String,
    /// What made the field imprecise.
    pub reason: String,
}

/// Kind counts and issues over every table of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UsageReport {
    /// Number of fields per validator kind.
    pub kinds: BTreeMap<String, usize>,
    /// Fields typed as `any` or `unknown`.
    pub issues: Vec<UsageIssue>,
}

/// Walk every field of `ir`, counting validator kinds and collecting issues.
pub fn build_report(ir: &SchemaIr) -> UsageReport {
    let mut report = UsageReport::default();
    for table in &ir.tables {
        for field in &table.fields {
            report.visit_field(&table.name, field, "");
        }
    }
    report
}

impl UsageReport {
    fn count(&mut self, key: &str) {
        *self.kinds.entry(key.to_string()).or_insert(0) += 1;
    }

    fn visit_field(&mut self, table: &str, field: &FieldSchema, prefix: &str) {
        let path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{prefix}.{}", field.name)
        };
        if field.optional {
            self.count("optional");
        }
        if field.nullable {
            self.count("nullable");
        }
        self.visit(table, &field.schema, &path);
    }

    fn visit(&mut self, table: &str, validator: &Validator, path: &str) {
        self.count(validator.kind_name());
        match &validator.kind {
            ValidatorKind::Any => self.issue(table, path, "any".to_string()),
            ValidatorKind::Unknown { text, reason } => {
                self.issue(table, path, format!("{}: {text}", reason.as_str()));
            }
            ValidatorKind::Array { element } => self.visit(table, element, &format!("{path}[]")),
            ValidatorKind::Record { value, .. } => {
                if value.is_untyped() {
                    self.issue(table, path, "record with untyped value".to_string());
                    self.count(value.kind_name());
                } else {
                    self.visit(table, value, &format!("{path}{{}}"));
                }
            }
            ValidatorKind::Object { fields } => {
                for field in fields {
                    self.visit_field(table, field, path);
                }
            }
            _ => {}
        }
    }

    fn issue(&mut self, table: &str, field: &str, reason: String) {
        self.issues.push(UsageIssue {
            table: table.to_string(),
            field: field.to_string(),
            reason,
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::schema::{TableSchema, UnknownReason};

    fn ir(fields: Vec<FieldSchema>) -> SchemaIr {
        SchemaIr {
            source: "schema.ts".into(),
            tables: vec![TableSchema {
                name: "tasks".into(),
                fields,
                indexes: Vec::new(),
            }],
        }
    }

    #[test]
    fn test_counts_kinds_and_flags() {
        let report = build_report(&ir(vec![
            FieldSchema::new("text", Validator::new(ValidatorKind::String), false),
            FieldSchema::new(
                "n",
                Validator::new(ValidatorKind::Number).with_flags(true, true),
                false,
            ),
            FieldSchema::new(
                "tags",
                Validator::new(ValidatorKind::Array {
                    element: Box::new(Validator::new(ValidatorKind::String)),
                }),
                false,
            ),
        ]));
        assert_eq!(report.kinds["string"], 2);
        assert_eq!(report.kinds["number"], 1);
        assert_eq!(report.kinds["array"], 1);
        assert_eq!(report.kinds["optional"], 1);
        assert_eq!(report.kinds["nullable"], 1);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn test_issues_for_untyped_fields() {
        let nested = Validator::new(ValidatorKind::Object {
            fields: vec![FieldSchema::new(
                "size",
                Validator::unknown("v.int64()", UnknownReason::UnsupportedBuilder),
                false,
            )],
        });
        let report = build_report(&ir(vec![
            FieldSchema::new("meta", Validator::new(ValidatorKind::Any), false),
            FieldSchema::new(
                "items",
                Validator::new(ValidatorKind::Array {
                    element: Box::new(nested),
                }),
                false,
            ),
            FieldSchema::new(
                "extra",
                Validator::new(ValidatorKind::Record {
                    key: Some(Box::new(Validator::new(ValidatorKind::String))),
                    value: Box::new(Validator::new(ValidatorKind::Any)),
                }),
                false,
            ),
        ]));
        let issues: Vec<(&str, &str)> = report
            .issues
            .iter()
            .map(|i| (i.field.as_str(), i.reason.as_str()))
            .collect();
        assert_eq!(
            issues,
            vec![
                ("meta", "any"),
                ("items[].size", "unsupported builder: v.int64()"),
                ("extra", "record with untyped value"),
            ]
        );
        assert!(report.issues.iter().all(|i| i.table == "tasks"));
    }

    #[test]
    fn test_serializes_as_json() {
        let report = build_report(&ir(vec![FieldSchema::new(
            "meta",
            Validator::new(ValidatorKind::Any),
            false,
        )]));
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["kinds"]["any"], 1);
        assert_eq!(json["issues"][0]["field"], "meta");
    }
}
