//! Element and document validation
//!
//! Validation never fails with an `Err`: every problem becomes a
//! [`ValidationError`] in the returned [`ValidationResult`], and a rejected
//! child does not stop the remaining children from being checked.

use std::collections::VecDeque;

use tracing::debug;

use super::schemas::{ElementSchema, ElementType, XmlSchema};
use crate::automata::TEXT;
use crate::documents::{Document, Element, XmlNode};
use crate::error::{Error, Result, ValidationError, ValidationErrorKind};

/// Outcome of validating an element or a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    /// True when no errors were found
    pub ok: bool,
    /// Every error found, in document order
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// A passing result
    pub fn valid() -> Self {
        Self {
            ok: true,
            errors: Vec::new(),
        }
    }

    fn from_errors(errors: Vec<ValidationError>) -> Self {
        Self {
            ok: errors.is_empty(),
            errors,
        }
    }

    /// Check if validation passed
    pub fn is_valid(&self) -> bool {
        self.ok
    }

    fn merge(&mut self, other: ValidationResult) {
        self.ok &= other.ok;
        self.errors.extend(other.errors);
    }
}

/// Token presented to a content model for one child node
///
/// Whitespace-only text carries no content and yields no token.
pub(crate) fn node_token(node: &XmlNode) -> Option<&str> {
    match node {
        XmlNode::Element(el) => Some(el.name.as_str()),
        XmlNode::Text(text) if text.trim().is_empty() => None,
        XmlNode::Text(_) | XmlNode::CData(_) => Some(TEXT),
    }
}

/// Tokens of a run of child nodes
pub(crate) fn content_tokens(nodes: &[XmlNode]) -> impl Iterator<Item = &str> {
    nodes.iter().filter_map(node_token)
}

/// Validate the attributes and direct content of `el`
pub fn validate_element(schema: &XmlSchema, el: &Element) -> ValidationResult {
    let Some(element_schema) = schema.element_schema(&el.name) else {
        return ValidationResult::from_errors(vec![ValidationError::new(
            ValidationErrorKind::UnknownTag,
            format!("Unknown tag <{}>.", el.name),
        )
        .with_element(el.name.as_str())]);
    };

    let mut result = check_attributes(element_schema, el);
    if element_schema.element_type.validates_content() {
        result.merge(check_children(element_schema, el));
    }
    result
}

// Attribute names are collected but not enforced.
fn check_attributes(_schema: &ElementSchema, _el: &Element) -> ValidationResult {
    ValidationResult::valid()
}

fn check_children(schema: &ElementSchema, el: &Element) -> ValidationResult {
    let expr = &schema.expr;
    let mut state = expr.initial_state();
    let mut token_count = 0;

    for token in content_tokens(&el.children) {
        token_count += 1;
        expr.consume(&mut state, token);
    }

    let text_may_be_empty = schema.element_type == ElementType::Text && token_count == 0;
    if !expr.is_finished(&state) && !text_may_be_empty {
        let error = expr.incomplete_error(&state);
        state.errors.push(error);
    }

    ValidationResult::from_errors(state.errors)
}

/// Validate a whole document
///
/// The root must be the schema's start element. Elements are then visited
/// breadth-first; the content of unknown, external and not-implemented
/// elements is not descended into. Errors carry the element's path.
pub fn validate_document(schema: &XmlSchema, doc: &Document) -> Result<ValidationResult> {
    let root = doc
        .root()
        .ok_or_else(|| Error::Xml("document has no root element".to_string()))?;

    let mut result = ValidationResult::valid();
    if root.name != schema.start_element() {
        result.merge(ValidationResult::from_errors(vec![ValidationError::new(
            ValidationErrorKind::StartElement,
            format!(
                "<{}> is not the start element <{}>.",
                root.name,
                schema.start_element()
            ),
        )
        .with_element(root.name.as_str())
        .with_path(format!("/{}", root.name))]));
    }

    let mut queue = VecDeque::new();
    queue.push_back((root, format!("/{}", root.name)));
    let mut visited = 0usize;

    while let Some((el, path)) = queue.pop_front() {
        visited += 1;
        let mut element_result = validate_element(schema, el);
        for error in &mut element_result.errors {
            error.path = Some(path.clone());
        }
        result.merge(element_result);

        let descend = schema
            .element_schema(&el.name)
            .map_or(false, |s| s.element_type.validates_content());
        if !descend {
            continue;
        }

        let mut seen: Vec<(&str, usize)> = Vec::new();
        for child in el.child_elements() {
            let index = match seen.iter_mut().find(|(name, _)| *name == child.name) {
                Some((_, count)) => {
                    *count += 1;
                    *count
                }
                None => {
                    seen.push((child.name.as_str(), 1));
                    1
                }
            };
            queue.push_back((child, format!("{}/{}[{}]", path, child.name, index)));
        }
    }

    debug!(
        elements = visited,
        errors = result.errors.len(),
        "validated document"
    );
    Ok(result)
}
