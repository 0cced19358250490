//! Grammar transformation
//!
//! Turns a loaded grammar into one flat element per `define > element`, with
//! every reference expanded inline. Each transformed element has the shape
//!
//! ```xml
//! <element name="..." type="...">
//!   <attributes>...</attributes>
//!   <children>...</children>
//! </element>
//! ```
//!
//! and lives in a fresh [`GrammarTree`]; the source tree is only edited by
//! the `removed` pass.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use super::registry::DefinitionRegistry;
use super::tree::{GrammarTree, NodeId};
use crate::error::{Error, Result};

/// Output of the transformation pass
#[derive(Debug, Clone)]
pub struct TransformedGrammar {
    /// Arena holding all transformed elements
    pub tree: GrammarTree,
    /// Transformed `<element>` nodes by element name
    pub elements: IndexMap<String, NodeId>,
    /// Name of the start element
    pub start: String,
}

impl TransformedGrammar {
    /// The `<attributes>` container of an element
    pub fn attributes(&self, element: NodeId) -> Option<NodeId> {
        self.container(element, "attributes")
    }

    /// The `<children>` container of an element
    pub fn children(&self, element: NodeId) -> Option<NodeId> {
        self.container(element, "children")
    }

    fn container(&self, element: NodeId, name: &str) -> Option<NodeId> {
        self.tree
            .children(element)
            .iter()
            .copied()
            .find(|&c| self.tree.is(c, name))
    }
}

/// Transform `grammar` into flat element definitions
pub fn transform(
    source: &mut GrammarTree,
    grammar: NodeId,
    defs: &DefinitionRegistry,
) -> Result<TransformedGrammar> {
    strip_removed(source, grammar);

    let not_implemented: HashSet<String> = source
        .find_all(grammar, "not-implemented")
        .into_iter()
        .filter_map(|n| source.attr(n, "name").map(str::to_string))
        .collect();

    let mut out = GrammarTree::new("grammar");
    let mut elements = IndexMap::new();

    for el in element_definitions(source, grammar, defs) {
        let name = source
            .attr(el, "name")
            .ok_or_else(|| Error::Grammar("'name' is mandatory on <element>".to_string()))?
            .to_string();

        let transformed = if not_implemented.contains(&name) {
            debug!(element = %name, "element marked as not implemented");
            let placeholder = out.create_element("element");
            out.set_attr(placeholder, "name", name.as_str());
            out.set_attr(placeholder, "type", "not-implemented");
            placeholder
        } else {
            transform_element(source, &mut out, &name, el, defs)?
        };

        let root = out.root();
        out.append_child(root, transformed);
        if let Some(previous) = elements.insert(name, transformed) {
            out.detach(previous);
        }
    }

    for type_el in source.find_all(grammar, "elementType") {
        let (Some(name), Some(element_type)) =
            (source.attr(type_el, "name"), source.attr(type_el, "type"))
        else {
            return Err(Error::Grammar(
                "attributes 'name' and 'type' are mandatory on <elementType>".to_string(),
            ));
        };
        let element = *elements
            .get(name)
            .ok_or_else(|| Error::UnknownElement(name.to_string()))?;
        out.set_attr(element, "type", element_type);
    }

    let start = extract_start(source, grammar)?;

    Ok(TransformedGrammar {
        tree: out,
        elements,
        start,
    })
}

/// Delete every `element`/`ref` named by a `removed` marker
fn strip_removed(source: &mut GrammarTree, grammar: NodeId) {
    let removed: Vec<String> = source
        .find_all(grammar, "removed")
        .into_iter()
        .filter_map(|n| source.attr(n, "name").map(str::to_string))
        .collect();

    for name in removed {
        let targets: Vec<NodeId> = source
            .descendants(grammar)
            .into_iter()
            .filter(|&n| {
                (source.is(n, "element") || source.is(n, "ref"))
                    && source.attr(n, "name") == Some(name.as_str())
            })
            .collect();
        debug!(name = %name, count = targets.len(), "removing marked nodes");
        for target in targets {
            source.detach(target);
        }
    }
}

/// All `define > element` nodes, minus those of overridden top-level defines
fn element_definitions(
    source: &GrammarTree,
    grammar: NodeId,
    defs: &DefinitionRegistry,
) -> Vec<NodeId> {
    source
        .find_all(grammar, "element")
        .into_iter()
        .filter(|&el| match source.parent(el) {
            Some(define) if source.is(define, "define") => {
                source.parent(define) != Some(grammar) || defs.is_registered(source, define)
            }
            _ => false,
        })
        .collect()
}

fn transform_element(
    source: &GrammarTree,
    out: &mut GrammarTree,
    name: &str,
    el: NodeId,
    defs: &DefinitionRegistry,
) -> Result<NodeId> {
    let element = out.create_element("element");
    out.set_attr(element, "name", name);
    let attributes = out.create_element("attributes");
    let children = out.create_element("children");

    for &child in source.children(el) {
        let mut visiting = HashSet::new();
        for block in transform_block(source, out, child, defs, &mut visiting)? {
            if out.is(block, "attribute") || out.find(block, "attribute").is_some() {
                out.append_child(attributes, block);
            } else {
                out.append_child(children, block);
            }
        }
    }
    out.append_child(element, attributes);
    out.append_child(element, children);

    normalize_content(out, children);
    Ok(element)
}

/// Copy `block` into `out`, expanding references
///
/// Nested `element`s become name-only leaves; their content belongs to their
/// own definition.
fn transform_block(
    source: &GrammarTree,
    out: &mut GrammarTree,
    block: NodeId,
    defs: &DefinitionRegistry,
    visiting: &mut HashSet<String>,
) -> Result<Vec<NodeId>> {
    match source.name(block) {
        "element" => {
            let name = source
                .attr(block, "name")
                .ok_or_else(|| Error::Grammar("'name' is mandatory on <element>".to_string()))?;
            let leaf = out.create_element("element");
            out.set_attr(leaf, "name", name);
            Ok(vec![leaf])
        }
        "ref" => expand_ref(source, out, block, defs, visiting),
        "empty" | "notAllowed" => Ok(Vec::new()),
        _ => {
            let copy = out.shallow_copy(source, block);
            for &child in source.children(block) {
                for expanded in transform_block(source, out, child, defs, visiting)? {
                    out.append_child(copy, expanded);
                }
            }
            Ok(vec![copy])
        }
    }
}

fn expand_ref(
    source: &GrammarTree,
    out: &mut GrammarTree,
    reference: NodeId,
    defs: &DefinitionRegistry,
    visiting: &mut HashSet<String>,
) -> Result<Vec<NodeId>> {
    let name = source
        .attr(reference, "name")
        .ok_or_else(|| Error::Grammar("<ref> without name".to_string()))?;

    if !visiting.insert(name.to_string()) {
        return Err(Error::CyclicReference(name.to_string()));
    }

    let define = defs
        .get(name)
        .ok_or_else(|| Error::UnknownDefinition(name.to_string()))?;

    let mut expanded = Vec::new();
    for &child in source.children(define) {
        expanded.extend(transform_block(source, out, child, defs, visiting)?);
    }

    visiting.remove(name);
    Ok(expanded)
}

/// Structural clean-up of an element's `<children>` container
fn normalize_content(out: &mut GrammarTree, children: NodeId) {
    // choice > choice: splice the inner choice's children into the outer one
    while let Some(nested) = out.find_all(children, "choice").into_iter().find(|&c| {
        out.parent(c).map_or(false, |p| out.is(p, "choice"))
    }) {
        if let Some(outer) = out.parent(nested) {
            for child in out.children(nested).to_vec() {
                out.insert_before(outer, child, nested);
            }
        }
        out.detach(nested);
    }

    // a choice of one is that one
    for choice in out.find_all(children, "choice") {
        if let [only] = *out.children(choice) {
            out.replace(choice, only);
        }
    }

    // text is always optional, so optional/zeroOrMore around bare text is redundant
    for text in out.find_all(children, "text") {
        if let Some(wrapper) = out.parent(text) {
            if (out.is(wrapper, "optional") || out.is(wrapper, "zeroOrMore"))
                && out.children(wrapper).len() == 1
            {
                out.replace(wrapper, text);
            }
        }
    }

    // drop repetition wrappers left empty, innermost first
    for node in out.descendants(children).into_iter().rev() {
        let is_wrapper =
            out.is(node, "optional") || out.is(node, "zeroOrMore") || out.is(node, "oneOrMore");
        if is_wrapper && out.children(node).is_empty() {
            out.detach(node);
        }
    }
}

/// Name of the element referenced by `<start><ref name="..."/></start>`
fn extract_start(source: &GrammarTree, grammar: NodeId) -> Result<String> {
    let start = source
        .find(grammar, "start")
        .ok_or_else(|| Error::Grammar("<grammar> must have a <start> element".to_string()))?;
    let start_ref = source
        .find(start, "ref")
        .ok_or_else(|| Error::Grammar("expecting one <ref> inside of <start>".to_string()))?;
    source
        .attr(start_ref, "name")
        .map(str::to_string)
        .ok_or_else(|| Error::Grammar("<ref> inside of <start> must have a name".to_string()))
}
