//! Schema objects and validation
//!
//! [`XmlSchema`] is the compiled artifact; [`validate_element`] and
//! [`validate_document`] run instance trees through it, and
//! [`check_schema`] reports structural warnings about the schema itself.

pub mod issues;
pub mod schemas;
pub mod validation;

pub use issues::{check_schema, IssueKind, SchemaIssue};
pub use schemas::{ElementSchema, ElementType, XmlSchema};
pub use validation::{validate_document, validate_element, ValidationResult};
