//! Error types for rngschema
//!
//! Compilation problems are returned as [`Error`] and abort the pipeline.
//! Validation problems are plain data ([`ValidationError`]) and are collected,
//! never raised.

use std::fmt;
use thiserror::Error;

/// Result type alias using rngschema Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rngschema operations
#[derive(Error, Debug)]
pub enum Error {
    /// A grammar file or include target could not be located or is malformed
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Grammar structure is missing a mandatory part
    #[error("grammar error: {0}")]
    Grammar(String),

    /// A definition refers to itself while being expanded
    #[error("cyclic reference: definition '{0}' refers to itself")]
    CyclicReference(String),

    /// A `ref` names a definition that does not exist
    #[error("unknown definition '{0}'")]
    UnknownDefinition(String),

    /// An `elementType` declaration names an element that does not exist
    #[error("unknown element '{0}' in elementType declaration")]
    UnknownElement(String),

    /// Interleave used below another combinator
    #[error("nested interleave blocks are not supported (in <{0}>)")]
    NestedInterleave(String),

    /// Grammar construct outside the supported dialect
    #[error("unsupported grammar construct <{0}>")]
    Unsupported(String),

    /// Schema object invariant violated
    #[error("schema error: {0}")]
    Schema(String),

    /// Compact schema data is malformed
    #[error("serialization error: {0}")]
    Serialization(String),

    /// JSON encoding/decoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// XML parsing error with location
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),
}

/// Category of a validation error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The element's tag has no schema entry
    UnknownTag,
    /// The child tag appears nowhere in the parent's content model
    NotAllowed,
    /// The child tag is part of the content model but not at this position
    OutOfOrder,
    /// Character data where the content model does not admit it
    TextNotAllowed,
    /// Content ended before the content model was satisfied
    Incomplete,
    /// The document root is not the schema's start element
    StartElement,
}

impl ValidationErrorKind {
    /// Get the kind as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationErrorKind::UnknownTag => "unknown-tag",
            ValidationErrorKind::NotAllowed => "not-allowed",
            ValidationErrorKind::OutOfOrder => "out-of-order",
            ValidationErrorKind::TextNotAllowed => "text-not-allowed",
            ValidationErrorKind::Incomplete => "incomplete",
            ValidationErrorKind::StartElement => "start-element",
        }
    }
}

impl fmt::Display for ValidationErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Validation error with context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error category
    pub kind: ValidationErrorKind,
    /// Error message
    pub message: String,
    /// Tag of the element whose content failed
    pub element: Option<String>,
    /// Path to the element that failed validation
    pub path: Option<String>,
    /// Content expression of the failing element
    pub schema_component: Option<String>,
    /// Expected-vs-found summary
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            element: None,
            path: None,
            schema_component: None,
            reason: None,
        }
    }

    /// Set the element tag
    pub fn with_element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the schema component
    pub fn with_schema_component(mut self, component: impl Into<String>) -> Self {
        self.schema_component = Some(component.into());
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        if let Some(ref schema) = self.schema_component {
            write!(f, "\n\nSchema: {}", schema)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// XML parsing error
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// File the error occurred in
    pub location: Option<String>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref loc) = self.location {
            write!(f, " ({})", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new(ValidationErrorKind::OutOfOrder, "<c> is not allowed at the current position in <foo>.")
            .with_reason("expected one of: b")
            .with_path("/foo")
            .with_schema_component("(a,b,c)");

        let msg = format!("{}", err);
        assert!(msg.contains("<c> is not allowed"));
        assert!(msg.contains("Reason: expected one of: b"));
        assert!(msg.contains("Path: /foo"));
        assert!(msg.contains("Schema: (a,b,c)"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new("unexpected end of stream").with_location("lib/Parent.rng");

        let msg = format!("{}", err);
        assert_eq!(msg, "unexpected end of stream (lib/Parent.rng)");
    }

    #[test]
    fn test_error_conversion() {
        let err: Error = ParseError::new("test").into();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_cyclic_reference_names_definition() {
        let err = Error::CyclicReference("para.content".to_string());
        assert!(err.to_string().contains("para.content"));
    }
}
