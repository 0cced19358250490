//! Arena representation of a grammar document
//!
//! Grammar files are parsed once with roxmltree and copied into an arena of
//! element nodes addressed by [`NodeId`]. All transformation passes edit the
//! arena through explicit parent/child operations. Detached nodes stay in the
//! arena but are unreachable from the root, so every traversal starting at
//! the root skips them.

use indexmap::IndexMap;

use crate::error::{ParseError, Result};

/// Index of a node inside a [`GrammarTree`]
pub type NodeId = usize;

/// One grammar element
#[derive(Debug, Clone)]
pub struct GrammarNode {
    /// Local tag name (namespace prefix stripped)
    pub name: String,
    /// Attributes by local name
    pub attributes: IndexMap<String, String>,
    /// Child elements in document order
    pub children: Vec<NodeId>,
    /// Parent element, `None` for the root and detached nodes
    pub parent: Option<NodeId>,
}

impl GrammarNode {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
            parent: None,
        }
    }
}

/// Element-only grammar document stored as an arena
#[derive(Debug, Clone)]
pub struct GrammarTree {
    nodes: Vec<GrammarNode>,
    root: NodeId,
}

impl GrammarTree {
    /// Create a tree holding a single root element
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![GrammarNode::new(root_name)],
            root: 0,
        }
    }

    /// Parse grammar XML text
    ///
    /// Only element nodes are kept; text, comments and processing
    /// instructions carry no meaning in the supported dialect.
    pub fn parse(xml: &str) -> Result<Self> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let doc = roxmltree::Document::parse_with_options(xml, options)
            .map_err(|e| ParseError::new(e.to_string()))?;

        let mut tree = Self {
            nodes: Vec::new(),
            root: 0,
        };
        tree.root = tree.copy_xml_node(doc.root_element(), None);
        Ok(tree)
    }

    fn copy_xml_node(&mut self, xml: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> NodeId {
        let mut node = GrammarNode::new(xml.tag_name().name());
        for attr in xml.attributes() {
            node.attributes
                .insert(attr.name().to_string(), attr.value().to_string());
        }
        node.parent = parent;

        let id = self.nodes.len();
        self.nodes.push(node);

        for child in xml.children().filter(|c| c.is_element()) {
            let child_id = self.copy_xml_node(child, Some(id));
            self.nodes[id].children.push(child_id);
        }
        id
    }

    /// The root element
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Access a node
    pub fn node(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id]
    }

    /// Local tag name of a node
    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id].name
    }

    /// Attribute value by local name
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.nodes[id].attributes.get(name).map(String::as_str)
    }

    /// Set an attribute value
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        self.nodes[id].attributes.insert(name.to_string(), value.into());
    }

    /// Child elements of a node
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    /// Parent element of a node
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    /// Check a node's tag name
    pub fn is(&self, id: NodeId, name: &str) -> bool {
        self.nodes[id].name == name
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.nodes.push(GrammarNode::new(name));
        self.nodes.len() - 1
    }

    /// Detach a node from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|&c| c != id);
        }
    }

    /// Move `child` to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    /// Move `child` into `parent` right before `reference`
    ///
    /// Falls back to appending when `reference` is not a child of `parent`.
    pub fn insert_before(&mut self, parent: NodeId, child: NodeId, reference: NodeId) {
        self.detach(child);
        self.nodes[child].parent = Some(parent);
        let siblings = &mut self.nodes[parent].children;
        match siblings.iter().position(|&c| c == reference) {
            Some(pos) => siblings.insert(pos, child),
            None => siblings.push(child),
        }
    }

    /// Put `replacement` where `old` is and detach `old`
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) {
        let Some(parent) = self.nodes[old].parent else {
            return;
        };
        self.detach(replacement);
        let siblings = &mut self.nodes[parent].children;
        if let Some(pos) = siblings.iter().position(|&c| c == old) {
            siblings[pos] = replacement;
        }
        self.nodes[replacement].parent = Some(parent);
        self.nodes[old].parent = None;
    }

    /// All descendants of `id` in document order (excluding `id`)
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    /// First descendant with the given tag name
    pub fn find(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.descendants(id).into_iter().find(|&n| self.is(n, name))
    }

    /// All descendants with the given tag name, in document order
    pub fn find_all(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is(n, name))
            .collect()
    }

    /// The `<grammar>` element: the root itself or its first descendant
    pub fn find_grammar(&self) -> Option<NodeId> {
        if self.is(self.root, "grammar") {
            Some(self.root)
        } else {
            self.find(self.root, "grammar")
        }
    }

    /// Copy a node without its children into this tree (detached)
    pub fn shallow_copy(&mut self, other: &GrammarTree, id: NodeId) -> NodeId {
        let source = other.node(id);
        let mut node = GrammarNode::new(source.name.clone());
        node.attributes = source.attributes.clone();
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Deep-copy a subtree of another tree into this one (detached)
    pub fn import(&mut self, other: &GrammarTree, id: NodeId) -> NodeId {
        let copy = self.shallow_copy(other, id);
        for &child in other.children(id) {
            let child_copy = self.import(other, child);
            self.append_child(copy, child_copy);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RNG: &str = r#"
        <grammar xmlns="http://relaxng.org/ns/structure/1.0" xmlns:s="http://example.com/schema">
          <!-- comment -->
          <define name="a"><element name="a"><text/></element></define>
          <define name="b"><element name="b"><ref name="a"/></element></define>
          <start><ref name="b"/></start>
        </grammar>
    "#;

    #[test]
    fn test_parse_keeps_elements_only() {
        let tree = GrammarTree::parse(RNG).unwrap();
        let grammar = tree.find_grammar().unwrap();
        assert_eq!(grammar, tree.root());
        let names: Vec<&str> = tree.children(grammar).iter().map(|&c| tree.name(c)).collect();
        assert_eq!(names, vec!["define", "define", "start"]);
    }

    #[test]
    fn test_find_all_document_order() {
        let tree = GrammarTree::parse(RNG).unwrap();
        let refs: Vec<&str> = tree
            .find_all(tree.root(), "ref")
            .into_iter()
            .map(|r| tree.attr(r, "name").unwrap())
            .collect();
        assert_eq!(refs, vec!["a", "b"]);
    }

    #[test]
    fn test_detach_hides_subtree() {
        let mut tree = GrammarTree::parse(RNG).unwrap();
        let first_define = tree.children(tree.root())[0];
        tree.detach(first_define);
        assert_eq!(tree.find_all(tree.root(), "define").len(), 1);
        assert!(tree.parent(first_define).is_none());
    }

    #[test]
    fn test_insert_before_and_replace() {
        let mut tree = GrammarTree::new("choice");
        let root = tree.root();
        let a = tree.create_element("a");
        let c = tree.create_element("c");
        tree.append_child(root, a);
        tree.append_child(root, c);
        let b = tree.create_element("b");
        tree.insert_before(root, b, c);
        let names: Vec<&str> = tree.children(root).iter().map(|&n| tree.name(n)).collect();
        assert_eq!(names, vec!["a", "b", "c"]);

        let d = tree.create_element("d");
        tree.replace(b, d);
        let names: Vec<&str> = tree.children(root).iter().map(|&n| tree.name(n)).collect();
        assert_eq!(names, vec!["a", "d", "c"]);
        assert!(tree.parent(b).is_none());
    }

    #[test]
    fn test_import_deep_copies() {
        let source = GrammarTree::parse(RNG).unwrap();
        let mut target = GrammarTree::new("grammar");
        let define = source.children(source.root())[1];
        let copy = target.import(&source, define);
        target.append_child(target.root(), copy);
        assert_eq!(target.attr(copy, "name"), Some("b"));
        assert_eq!(target.find_all(target.root(), "ref").len(), 1);
    }

    #[test]
    fn test_parse_error() {
        assert!(GrammarTree::parse("<grammar>").is_err());
    }
}
