//! Grammar compilation
//!
//! Load → register definitions → transform → build expressions → compile
//! automata → assemble the [`XmlSchema`].

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use tracing::{debug, info};

use crate::automata::{Expression, Node, TEXT};
use crate::error::{Error, Result};
use crate::grammar::{collect_attributes, transform, DefinitionRegistry, GrammarTree, NodeId};
use crate::limits::Limits;
use crate::loaders::{FileSystem, Loader, OsFileSystem};
use crate::locations::Location;
use crate::validators::{ElementSchema, ElementType, XmlSchema};

/// Grammar compiler
#[derive(Debug)]
pub struct Compiler<F: FileSystem = OsFileSystem> {
    loader: Loader<F>,
    limits: Limits,
}

impl Compiler<OsFileSystem> {
    /// Create a compiler reading grammars from disk
    pub fn new(search_dirs: Vec<PathBuf>) -> Self {
        Self::with_file_system(OsFileSystem, search_dirs)
    }
}

impl<F: FileSystem> Compiler<F> {
    /// Create a compiler over a custom file system
    pub fn with_file_system(fs: F, search_dirs: Vec<PathBuf>) -> Self {
        Self {
            loader: Loader::with_file_system(fs, search_dirs),
            limits: Limits::default(),
        }
    }

    /// Set the limits for loading and automaton construction
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.loader = self.loader.with_limits(limits.clone());
        self.limits = limits;
        self
    }

    /// Compile the grammar found at `entry`
    pub fn compile(&self, entry: impl AsRef<Path>) -> Result<XmlSchema> {
        let entry = entry.as_ref();
        info!(entry = %entry.display(), "compiling grammar");
        let tree = self.loader.load_entry(entry)?;
        self.compile_tree(tree)
    }

    /// Compile grammar text; includes are still resolved through the loader
    pub fn compile_str(&self, rng: &str) -> Result<XmlSchema> {
        let tree = self.loader.load(&Location::String(rng.to_string()))?;
        self.compile_tree(tree)
    }

    fn compile_tree(&self, mut tree: GrammarTree) -> Result<XmlSchema> {
        let grammar = tree
            .find_grammar()
            .ok_or_else(|| Error::Resolution("<grammar> not found".to_string()))?;
        let defs = DefinitionRegistry::collect(&mut tree, grammar)?;
        debug!(definitions = defs.len(), "registered definitions");

        let transformed = transform(&mut tree, grammar, &defs)?;
        let out = &transformed.tree;

        let mut elements = IndexMap::with_capacity(transformed.elements.len());
        for (name, &el) in &transformed.elements {
            let attributes = transformed
                .attributes(el)
                .map(|container| collect_attributes(out, container))
                .unwrap_or_default();
            let root = match transformed.children(el) {
                Some(children) => process_children(out, children)?,
                None => Node::Sequence(Vec::new()),
            };
            let expr = Expression::compile(name.as_str(), root, &self.limits)?;

            let element_type = match out.attr(el, "type") {
                Some(t) => ElementType::from_name(t).ok_or_else(|| {
                    Error::Grammar(format!("unknown type '{}' for element <{}>", t, name))
                })?,
                None if expr.is_allowed(TEXT) => ElementType::Text,
                None => ElementType::Element,
            };
            debug!(element = %name, kind = %element_type, expr = %expr, "compiled element");

            elements.insert(
                name.clone(),
                ElementSchema::new(name.as_str(), element_type, attributes, expr)?,
            );
        }

        let schema = XmlSchema::new(elements, transformed.start)?;
        info!(
            elements = schema.len(),
            start = schema.start_element(),
            "compiled schema"
        );
        Ok(schema)
    }
}

/// Expression for the content of `el`: one block as is, otherwise a sequence
fn process_children(tree: &GrammarTree, el: NodeId) -> Result<Node> {
    let mut blocks = process_blocks(tree, tree.children(el))?;
    if blocks.len() == 1 {
        Ok(blocks.remove(0))
    } else {
        Ok(Node::Sequence(blocks))
    }
}

fn process_blocks(tree: &GrammarTree, children: &[NodeId]) -> Result<Vec<Node>> {
    let mut blocks = Vec::with_capacity(children.len());
    for &child in children {
        let block = match tree.name(child) {
            "attribute" | "empty" | "notAllowed" => continue,
            "element" => {
                let name = tree.attr(child, "name").ok_or_else(|| {
                    Error::Grammar("'name' is mandatory on <element>".to_string())
                })?;
                Node::token(name)
            }
            "text" => Node::token(TEXT),
            "group" => Node::Sequence(process_blocks(tree, tree.children(child))?),
            "choice" => Node::Choice(process_blocks(tree, tree.children(child))?),
            "interleave" => Node::Interleave(process_blocks(tree, tree.children(child))?),
            "optional" => Node::optional(process_children(tree, child)?),
            "oneOrMore" => Node::plus(process_children(tree, child)?),
            "zeroOrMore" => Node::kleene(process_children(tree, child)?),
            other => return Err(Error::Unsupported(other.to_string())),
        };
        blocks.push(block);
    }
    Ok(blocks)
}

/// Compile the grammar `entry`, looked up in `search_dirs`
pub fn compile(search_dirs: &[PathBuf], entry: impl AsRef<Path>) -> Result<XmlSchema> {
    Compiler::new(search_dirs.to_vec()).compile(entry)
}

/// Compile grammar text with default settings
pub fn compile_str(rng: &str) -> Result<XmlSchema> {
    Compiler::new(Vec::new()).compile_str(rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::MemoryFileSystem;

    fn structure(schema: &XmlSchema, name: &str) -> String {
        schema.element_schema(name).unwrap().print_structure()
    }

    #[test]
    fn test_compile_simple_grammar() {
        let schema = compile_str(
            r#"<grammar>
                <define name="doc"><element name="doc">
                    <attribute name="id"/>
                    <ref name="title"/>
                    <zeroOrMore><choice><ref name="p"/><ref name="list"/></choice></zeroOrMore>
                </element></define>
                <define name="title"><element name="title"><text/></element></define>
                <define name="p"><element name="p"><zeroOrMore><choice><text/><ref name="b"/></choice></zeroOrMore></element></define>
                <define name="b"><element name="b"><text/></element></define>
                <define name="list"><element name="list"><oneOrMore><element name="item"/></oneOrMore></element></define>
                <start><ref name="doc"/></start>
            </grammar>"#,
        )
        .unwrap();

        assert_eq!(schema.start_element(), "doc");
        assert_eq!(structure(&schema, "doc"), "doc ::= (title,(p|list)*)");
        assert_eq!(structure(&schema, "title"), "title ::= TEXT");
        assert_eq!(structure(&schema, "p"), "p ::= (TEXT|b)*");
        assert_eq!(structure(&schema, "list"), "list ::= item+");

        let doc = schema.element_schema("doc").unwrap();
        assert_eq!(doc.element_type, ElementType::Element);
        assert!(doc.attributes.contains("id"));
        assert_eq!(schema.element_schema("p").unwrap().element_type, ElementType::Text);
    }

    #[test]
    fn test_explicit_types() {
        let schema = compile_str(
            r#"<grammar>
                <not-implemented name="table"/>
                <define name="doc"><element name="doc"><optional><ref name="math"/></optional><optional><ref name="table"/></optional></element></define>
                <define name="math"><element name="math"><zeroOrMore><element name="mi"/></zeroOrMore></element></define>
                <define name="table"><element name="table"><element name="tr"/></element></define>
                <elementType name="math" type="external"/>
                <start><ref name="doc"/></start>
            </grammar>"#,
        )
        .unwrap();
        assert_eq!(schema.element_schema("math").unwrap().element_type, ElementType::External);
        let table = schema.element_schema("table").unwrap();
        assert_eq!(table.element_type, ElementType::NotImplemented);
        assert_eq!(table.print_structure(), "table ::= ()");
    }

    #[test]
    fn test_unsupported_construct() {
        let err = compile_str(
            r#"<grammar>
                <define name="doc"><element name="doc"><mixed><text/></mixed></element></define>
                <start><ref name="doc"/></start>
            </grammar>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Unsupported(ref name) if name == "mixed"));
    }

    #[test]
    fn test_nested_interleave() {
        let err = compile_str(
            r#"<grammar>
                <define name="doc"><element name="doc">
                    <element name="head"/>
                    <interleave><element name="a"/><element name="b"/></interleave>
                </element></define>
                <start><ref name="doc"/></start>
            </grammar>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NestedInterleave(ref name) if name == "doc"));
    }

    #[test]
    fn test_interleave_inside_interleave() {
        let err = compile_str(
            r#"<grammar>
                <define name="doc"><element name="doc">
                    <interleave>
                        <interleave><element name="a"/><element name="b"/></interleave>
                        <element name="c"/>
                    </interleave>
                </element></define>
                <start><ref name="doc"/></start>
            </grammar>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::NestedInterleave(ref name) if name == "doc"));
    }

    #[test]
    fn test_start_must_be_an_element() {
        let err = compile_str(
            r#"<grammar>
                <define name="doc"><element name="doc"><empty/></element></define>
                <define name="content"><text/></define>
                <start><ref name="content"/></start>
            </grammar>"#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Schema(_)));
    }

    #[test]
    fn test_compile_with_memory_file_system() {
        let fs = MemoryFileSystem::new()
            .with_file(
                "base.rng",
                r#"<grammar>
                    <define name="doc"><element name="doc"><ref name="doc.content"/></element></define>
                    <define name="doc.content"><text/></define>
                    <start><ref name="doc"/></start>
                </grammar>"#,
            )
            .with_file(
                "custom.rng",
                r#"<grammar>
                    <include href="base.rng"/>
                    <define name="doc.content"><oneOrMore><element name="p"/></oneOrMore></define>
                </grammar>"#,
            );
        let schema = Compiler::with_file_system(fs, vec![]).compile("custom.rng").unwrap();
        assert_eq!(structure(&schema, "doc"), "doc ::= p+");
    }

    #[test]
    fn test_limits_apply_to_automata() {
        let limits = Limits {
            max_dfa_states: 2,
            ..Limits::default()
        };
        let compiler = Compiler::with_file_system(MemoryFileSystem::new(), vec![]).with_limits(limits);
        let err = compiler
            .compile_str(
                r#"<grammar>
                    <define name="doc"><element name="doc"><element name="a"/><element name="b"/><element name="c"/></element></define>
                    <start><ref name="doc"/></start>
                </grammar>"#,
            )
            .unwrap_err();
        assert!(matches!(err, Error::LimitExceeded(_)));
    }
}
