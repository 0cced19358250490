//! Compiled schema objects
//!
//! An [`XmlSchema`] maps every tag name to an [`ElementSchema`] holding the
//! element's type, its attribute names and its compiled content model.
//! Schemas are immutable once built and can be shared across threads.

use std::fmt;

use indexmap::{IndexMap, IndexSet};

use super::validation::{content_tokens, validate_element, ValidationResult};
use crate::automata::{Expression, TEXT};
use crate::documents::Element;
use crate::error::{Error, Result};

/// How an element's content is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    /// Structured content
    Element,
    /// Character data, possibly mixed with elements; may be empty
    Text,
    /// Content owned by another vocabulary, never validated
    External,
    /// Placeholder for an element without a content model yet
    NotImplemented,
}

impl ElementType {
    /// Parse from a type name
    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "element" => Some(ElementType::Element),
            "text" => Some(ElementType::Text),
            "external" => Some(ElementType::External),
            "not-implemented" => Some(ElementType::NotImplemented),
            _ => None,
        }
    }

    /// Get the type name
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::Element => "element",
            ElementType::Text => "text",
            ElementType::External => "external",
            ElementType::NotImplemented => "not-implemented",
        }
    }

    /// Check if children of this type are validated at all
    pub fn validates_content(&self) -> bool {
        !matches!(self, ElementType::External | ElementType::NotImplemented)
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Schema of one element
#[derive(Debug, Clone)]
pub struct ElementSchema {
    /// Tag name
    pub name: String,
    /// Content type
    pub element_type: ElementType,
    /// Declared attribute names
    pub attributes: IndexSet<String>,
    /// Compiled content model
    pub expr: Expression,
}

impl ElementSchema {
    /// Create an element schema
    pub fn new(
        name: impl Into<String>,
        element_type: ElementType,
        attributes: IndexSet<String>,
        expr: Expression,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Schema("'name' is mandatory".to_string()));
        }
        if expr.name() != name {
            return Err(Error::Schema(format!(
                "expression of <{}> belongs to <{}>",
                name,
                expr.name()
            )));
        }
        Ok(Self {
            name,
            element_type,
            attributes,
            expr,
        })
    }

    /// Check if `tag` may appear among the children
    pub fn is_allowed(&self, tag: &str) -> bool {
        self.expr.is_allowed(tag)
    }

    /// Check if character data may appear among the children
    pub fn is_text_allowed(&self) -> bool {
        self.expr.is_allowed(TEXT)
    }

    /// One-line grammar rule, e.g. `p ::= (TEXT|b|i)*`
    pub fn print_structure(&self) -> String {
        format!("{} ::= {}", self.name, self.expr)
    }

    /// Lowest child-node index where inserting `<tag>` keeps `el` valid
    pub fn find_first_valid_pos(&self, el: &Element, tag: &str) -> Option<usize> {
        (0..=el.children.len()).find(|&pos| self.accepts_insertion(el, tag, pos))
    }

    /// Highest child-node index where inserting `<tag>` keeps `el` valid
    pub fn find_last_valid_pos(&self, el: &Element, tag: &str) -> Option<usize> {
        (0..=el.children.len())
            .rev()
            .find(|&pos| self.accepts_insertion(el, tag, pos))
    }

    fn accepts_insertion(&self, el: &Element, tag: &str, pos: usize) -> bool {
        let (before, after) = el.children.split_at(pos);
        let tokens = content_tokens(before)
            .chain(std::iter::once(tag))
            .chain(content_tokens(after));
        self.expr.accepts(tokens)
    }
}

/// Whole-document schema
#[derive(Debug, Clone)]
pub struct XmlSchema {
    elements: IndexMap<String, ElementSchema>,
    start: String,
}

impl XmlSchema {
    /// Create a schema; `start` must name one of the elements
    pub fn new(elements: IndexMap<String, ElementSchema>, start: impl Into<String>) -> Result<Self> {
        let start = start.into();
        if !elements.contains_key(&start) {
            return Err(Error::Schema(format!(
                "start element <{}> must be a valid element",
                start
            )));
        }
        Ok(Self { elements, start })
    }

    /// All tag names, in definition order
    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Schema of one element
    pub fn element_schema(&self, name: &str) -> Option<&ElementSchema> {
        self.elements.get(name)
    }

    /// All element schemas, in definition order
    pub fn element_schemas(&self) -> impl Iterator<Item = &ElementSchema> {
        self.elements.values()
    }

    /// Name of the document root element
    pub fn start_element(&self) -> &str {
        &self.start
    }

    /// Number of element schemas
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the schema has no elements (never true for a constructed schema)
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Validate the attributes and direct content of one element
    pub fn validate_element(&self, el: &Element) -> ValidationResult {
        validate_element(self, el)
    }
}
