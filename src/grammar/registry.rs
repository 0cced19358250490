//! Named definitions of a grammar
//!
//! Only the direct `<define>` children of `<grammar>` are registered. A later
//! definition with the same name replaces an earlier one, except when it is
//! declared with `combine="interleave"`: then its children are appended to the
//! definition already registered under that name.

use indexmap::IndexMap;
use tracing::debug;

use super::tree::{GrammarTree, NodeId};
use crate::error::{Error, Result};

/// Mapping from definition name to its `<define>` node
#[derive(Debug, Clone, Default)]
pub struct DefinitionRegistry {
    defs: IndexMap<String, NodeId>,
}

impl DefinitionRegistry {
    /// Collect the top-level definitions of `grammar`
    ///
    /// Interleave-combined children are moved into the surviving `<define>`,
    /// which is why the tree is borrowed mutably.
    pub fn collect(tree: &mut GrammarTree, grammar: NodeId) -> Result<Self> {
        let mut registry = Self::default();
        let defines: Vec<NodeId> = tree
            .children(grammar)
            .iter()
            .copied()
            .filter(|&c| tree.is(c, "define"))
            .collect();

        for define in defines {
            registry.register(tree, define)?;
        }
        Ok(registry)
    }

    fn register(&mut self, tree: &mut GrammarTree, define: NodeId) -> Result<()> {
        let name = tree
            .attr(define, "name")
            .ok_or_else(|| Error::Grammar("<define> without name".to_string()))?
            .to_string();
        let combine = tree.attr(define, "combine") == Some("interleave");

        match self.defs.get(&name).copied() {
            Some(existing) if combine => {
                debug!(name = %name, "combining definition");
                for child in tree.children(define).to_vec() {
                    tree.append_child(existing, child);
                }
            }
            Some(_) => {
                debug!(name = %name, "overriding definition");
                self.defs.insert(name, define);
            }
            None => {
                self.defs.insert(name, define);
            }
        }
        Ok(())
    }

    /// Look up a definition
    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.defs.get(name).copied()
    }

    /// Check whether `define` is the registered node for its name
    pub fn is_registered(&self, tree: &GrammarTree, define: NodeId) -> bool {
        tree.attr(define, "name")
            .and_then(|name| self.get(name))
            .map_or(false, |registered| registered == define)
    }

    /// Number of registered names
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Check if no definitions were registered
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
