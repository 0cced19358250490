//! Property-based tests for content model automata
//!
//! Compiled automata are checked against a direct backtracking matcher over
//! the same expression tree, and against their own compact-format decoding.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use proptest::prelude::*;
use rngschema::automata::{Expression, Node};
use rngschema::{deserialize_schema, serialize_schema, ElementSchema, ElementType, Limits, XmlSchema};

const ALPHABET: &[&str] = &["a", "b", "c", "TEXT"];

/// Positions at which a match of `node` starting at `start` can end
fn match_ends(node: &Node, tokens: &[&str], start: usize) -> BTreeSet<usize> {
    match node {
        Node::Token(name) => {
            if tokens.get(start) == Some(&name.as_str()) {
                BTreeSet::from([start + 1])
            } else {
                BTreeSet::new()
            }
        }
        Node::Sequence(blocks) => blocks.iter().fold(BTreeSet::from([start]), |ends, block| {
            ends.iter()
                .flat_map(|&pos| match_ends(block, tokens, pos))
                .collect()
        }),
        Node::Choice(blocks) => blocks
            .iter()
            .flat_map(|block| match_ends(block, tokens, start))
            .collect(),
        Node::Optional(block) => {
            let mut ends = match_ends(block, tokens, start);
            ends.insert(start);
            ends
        }
        Node::Kleene(block) => repeat(block, tokens, BTreeSet::from([start])),
        Node::Plus(block) => repeat(block, tokens, match_ends(block, tokens, start)),
        Node::Interleave(_) => unreachable!("interleave is only generated at the top level"),
    }
}

fn repeat(block: &Node, tokens: &[&str], mut ends: BTreeSet<usize>) -> BTreeSet<usize> {
    let mut frontier: Vec<usize> = ends.iter().copied().collect();
    while let Some(pos) = frontier.pop() {
        for next in match_ends(block, tokens, pos) {
            if ends.insert(next) {
                frontier.push(next);
            }
        }
    }
    ends
}

fn reference_accepts(node: &Node, tokens: &[&str]) -> bool {
    match_ends(node, tokens, 0).contains(&tokens.len())
}

fn node_strategy() -> impl Strategy<Value = Node> {
    let leaf = prop::sample::select(ALPHABET).prop_map(|name| Node::token(name));
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 1..4).prop_map(Node::Sequence),
            prop::collection::vec(inner.clone(), 1..4).prop_map(Node::Choice),
            inner.clone().prop_map(Node::optional),
            inner.clone().prop_map(Node::kleene),
            inner.prop_map(Node::plus),
        ]
    })
}

fn tokens_strategy() -> impl Strategy<Value = Vec<&'static str>> {
    prop::collection::vec(prop::sample::select(ALPHABET), 0..7)
}

fn compile(root: Node) -> Expression {
    Expression::compile("el", root, &Limits::permissive()).unwrap()
}

fn single_element_schema(root: Node) -> XmlSchema {
    let expr = compile(root);
    let mut elements = IndexMap::new();
    elements.insert(
        "el".to_string(),
        ElementSchema::new("el", ElementType::Element, IndexSet::new(), expr).unwrap(),
    );
    XmlSchema::new(elements, "el").unwrap()
}

#[cfg(test)]
mod proptest_tests {
    use super::*;

    proptest! {
        #[test]
        fn test_dfa_matches_reference(root in node_strategy(), tokens in tokens_strategy()) {
            let expr = compile(root.clone());
            prop_assert_eq!(
                expr.accepts(tokens.iter().copied()),
                reference_accepts(&root, &tokens),
                "{} on {:?}", root, tokens
            );
        }

        #[test]
        fn test_occurrence_counts(a in 0usize..3, b in 0usize..3, c in 0usize..4) {
            // (a, b?, c+)
            let root = Node::Sequence(vec![
                Node::token("a"),
                Node::optional(Node::token("b")),
                Node::plus(Node::token("c")),
            ]);
            let expr = compile(root);
            let tokens: Vec<&str> = std::iter::repeat("a").take(a)
                .chain(std::iter::repeat("b").take(b))
                .chain(std::iter::repeat("c").take(c))
                .collect();
            prop_assert_eq!(expr.accepts(tokens), a == 1 && b <= 1 && c >= 1);
        }

        #[test]
        fn test_interleave_accepts_any_order(order in Just(vec!["a", "b", "c"]).prop_shuffle()) {
            let root = Node::Interleave(vec![
                Node::token("a"),
                Node::token("b"),
                Node::plus(Node::token("c")),
            ]);
            let expr = compile(root);
            prop_assert!(expr.accepts(order.iter().copied()), "{:?}", order);
        }

        #[test]
        fn test_rejected_tokens_do_not_move_state(root in node_strategy(), tokens in tokens_strategy()) {
            let expr = compile(root);
            let mut state = expr.initial_state();
            let mut accepted = Vec::new();
            for token in &tokens {
                if expr.consume(&mut state, token) {
                    accepted.push(*token);
                }
            }
            // the accepted subsequence replays without errors
            let mut replay = expr.initial_state();
            for token in &accepted {
                prop_assert!(expr.consume(&mut replay, token));
            }
            prop_assert_eq!(expr.is_finished(&state), expr.is_finished(&replay));
            prop_assert_eq!(state.errors.len(), tokens.len() - accepted.len());
        }

        #[test]
        fn test_compact_format_preserves_acceptance(root in node_strategy(), tokens in tokens_strategy()) {
            let schema = single_element_schema(root);
            let restored = deserialize_schema(&serialize_schema(&schema).unwrap()).unwrap();
            let original = &schema.element_schema("el").unwrap().expr;
            let decoded = &restored.element_schema("el").unwrap().expr;
            prop_assert_eq!(original.root(), decoded.root());
            prop_assert_eq!(
                original.accepts(tokens.iter().copied()),
                decoded.accepts(tokens.iter().copied())
            );
        }
    }
}
