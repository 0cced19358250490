//! Schema consistency checks
//!
//! Issues are warnings: a schema with issues still validates documents.

use std::collections::{HashSet, VecDeque};
use std::fmt;

use tracing::warn;

use super::schemas::XmlSchema;
use crate::automata::TEXT;

/// Category of a schema issue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// Element defined but not reachable from the start element
    Unreachable,
    /// Child tag used in a content model without a schema entry
    UndeclaredChild,
}

/// One schema issue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaIssue {
    /// Issue category
    pub kind: IssueKind,
    /// Element the issue is about
    pub element: String,
    /// Human-readable description
    pub message: String,
}

impl fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Enumerate the issues of a schema
///
/// Unreachable elements come first in definition order, followed by
/// undeclared children in the order their parents are defined.
pub fn check_schema(schema: &XmlSchema) -> Vec<SchemaIssue> {
    let mut issues = Vec::new();

    let reachable = reachable_from_start(schema);
    for name in schema.tag_names() {
        if !reachable.contains(name) {
            issues.push(SchemaIssue {
                kind: IssueKind::Unreachable,
                element: name.to_string(),
                message: format!(
                    "<{}> is not reachable from the start element <{}>",
                    name,
                    schema.start_element()
                ),
            });
        }
    }

    for element_schema in schema.element_schemas() {
        for child in element_schema.expr.allowed() {
            if child != TEXT && schema.element_schema(child).is_none() {
                issues.push(SchemaIssue {
                    kind: IssueKind::UndeclaredChild,
                    element: child.clone(),
                    message: format!(
                        "<{}> is used in <{}> but has no schema",
                        child, element_schema.name
                    ),
                });
            }
        }
    }

    for issue in &issues {
        warn!(kind = ?issue.kind, "{}", issue.message);
    }
    issues
}

fn reachable_from_start(schema: &XmlSchema) -> HashSet<&str> {
    let mut reachable = HashSet::new();
    let mut queue = VecDeque::new();
    reachable.insert(schema.start_element());
    queue.push_back(schema.start_element());

    while let Some(name) = queue.pop_front() {
        let Some(element_schema) = schema.element_schema(name) else {
            continue;
        };
        for child in element_schema.expr.allowed() {
            if child != TEXT && reachable.insert(child.as_str()) {
                queue.push_back(child.as_str());
            }
        }
    }
    reachable
}
