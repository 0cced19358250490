//! Attribute collection
//!
//! Only attribute names are modeled. Value grammars and the
//! required/optional distinction are ignored.

use indexmap::IndexSet;

use super::tree::{GrammarTree, NodeId};

/// Collect the attribute names declared below `container`
///
/// Descends through `group`, `choice`, `optional`, `oneOrMore` and
/// `zeroOrMore`, never into nested elements.
pub fn collect_attributes(tree: &GrammarTree, container: NodeId) -> IndexSet<String> {
    let mut names = IndexSet::new();
    collect_into(tree, container, &mut names);
    names
}

fn collect_into(tree: &GrammarTree, el: NodeId, names: &mut IndexSet<String>) {
    for &child in tree.children(el) {
        match tree.name(child) {
            "attribute" => {
                // attributes named through a <name> child are not modeled
                if let Some(name) = tree.attr(child, "name") {
                    names.insert(name.to_string());
                }
            }
            "group" | "choice" | "optional" | "oneOrMore" | "zeroOrMore" => {
                collect_into(tree, child, names);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_nested_attributes() {
        let tree = GrammarTree::parse(
            r#"<attributes>
                <attribute name="id"/>
                <optional><attribute name="lang"/></optional>
                <choice>
                    <group><attribute name="href"/><attribute name="id"/></group>
                    <zeroOrMore><attribute name="class"/></zeroOrMore>
                </choice>
            </attributes>"#,
        )
        .unwrap();
        let names = collect_attributes(&tree, tree.root());
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        assert_eq!(names, vec!["id", "lang", "href", "class"]);
    }

    #[test]
    fn test_does_not_descend_into_elements() {
        let tree = GrammarTree::parse(
            r#"<attributes>
                <element name="inner"><attribute name="hidden"/></element>
                <interleave><attribute name="skipped"/></interleave>
                <attribute><name>computed</name></attribute>
            </attributes>"#,
        )
        .unwrap();
        assert!(collect_attributes(&tree, tree.root()).is_empty());
    }
}
