//! Grammar documents and their transformation
//!
//! A grammar goes through three stages before it can be compiled:
//! the loader expands includes into one [`GrammarTree`], the
//! [`DefinitionRegistry`] resolves named definitions, and [`transform`]
//! flattens every element definition into its attributes and children.

pub mod attributes;
pub mod registry;
pub mod transform;
pub mod tree;

pub use attributes::collect_attributes;
pub use registry::DefinitionRegistry;
pub use transform::{transform, TransformedGrammar};
pub use tree::{GrammarNode, GrammarTree, NodeId};
