//! # rngschema
//!
//! Compiles a restricted RELAX NG dialect into deterministic automata that
//! check the child content of XML elements, and validates documents with
//! them.
//!
//! ## Features
//!
//! - Include resolution across search directories
//! - Definition overriding and `combine="interleave"` merging
//! - Dialect extensions: `removed`, `not-implemented`, `elementType`
//! - One DFA per element, or one DFA per block for unordered content
//! - Accumulating validation errors with expected-token hints
//! - A compact, literal-interned JSON form for distributing compiled schemas
//!
//! ## Example
//!
//! ```rust,ignore
//! use rngschema::{compile, validate_document, Document};
//!
//! let schema = compile(&["schemas".into()], "article.rng")?;
//! let doc = Document::from_string(&std::fs::read_to_string("article.xml")?)?;
//!
//! let result = validate_document(&schema, &doc)?;
//! for error in &result.errors {
//!     eprintln!("{}", error);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Resource loading
pub mod locations;
pub mod loaders;
pub mod documents;

// Grammar processing
pub mod grammar;
pub mod automata;
pub mod compiler;

// Schemas and validation
pub mod validators;
pub mod serialization;

// Re-exports for convenience
pub use compiler::{compile, compile_str, Compiler};
pub use documents::{Document, Element, XmlNode};
pub use error::{Error, Result, ValidationError, ValidationErrorKind};
pub use limits::Limits;
pub use loaders::{FileSystem, MemoryFileSystem, OsFileSystem};
pub use serialization::{deserialize_schema, serialize_schema};
pub use validators::{
    check_schema, validate_document, validate_element, ElementSchema, ElementType, IssueKind,
    SchemaIssue, ValidationResult, XmlSchema,
};

/// Version of the rngschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
