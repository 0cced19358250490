//! Automaton construction
//!
//! Expressions are first turned into an epsilon-NFA from Thompson fragments:
//! one fragment per node, each with a single entry and a single accepting
//! state, glued together with epsilon edges. Subset construction then yields
//! a [`Dfa`] without epsilon edges, deterministic by construction.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::debug;

use super::dfa::{Dfa, StateId};
use super::expression::Node;
use crate::error::{Error, Result};
use crate::limits::Limits;

/// Entry and accepting state of a partial automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fragment {
    /// Entry state
    pub start: StateId,
    /// Accepting state
    pub end: StateId,
}

#[derive(Debug, Clone, Default)]
struct NfaState {
    transitions: Vec<(String, StateId)>,
    epsilon: Vec<StateId>,
}

/// Epsilon-NFA under construction
#[derive(Debug, Clone, Default)]
pub struct NfaBuilder {
    states: Vec<NfaState>,
}

impl NfaBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    fn add_state(&mut self) -> StateId {
        self.states.push(NfaState::default());
        self.states.len() - 1
    }

    fn add_transition(&mut self, from: StateId, to: StateId, token: &str) {
        self.states[from].transitions.push((token.to_string(), to));
    }

    fn add_epsilon(&mut self, from: StateId, to: StateId) {
        self.states[from].epsilon.push(to);
    }

    /// Fragment accepting exactly `token`
    pub fn token(&mut self, token: &str) -> Fragment {
        let start = self.add_state();
        let end = self.add_state();
        self.add_transition(start, end, token);
        Fragment { start, end }
    }

    /// Fragment accepting only the empty sequence
    pub fn epsilon(&mut self) -> Fragment {
        let s = self.add_state();
        Fragment { start: s, end: s }
    }

    /// Concatenate fragments in order
    pub fn append(&mut self, fragments: Vec<Fragment>) -> Fragment {
        let mut iter = fragments.into_iter();
        let Some(mut result) = iter.next() else {
            return self.epsilon();
        };
        for next in iter {
            self.add_epsilon(result.end, next.start);
            result = Fragment {
                start: result.start,
                end: next.end,
            };
        }
        result
    }

    /// Union of fragments
    ///
    /// With no fragments the result accepts the empty sequence.
    pub fn merge(&mut self, fragments: Vec<Fragment>) -> Fragment {
        let start = self.add_state();
        let end = self.add_state();
        if fragments.is_empty() {
            self.add_epsilon(start, end);
        }
        for frag in fragments {
            self.add_epsilon(start, frag.start);
            self.add_epsilon(frag.end, end);
        }
        Fragment { start, end }
    }

    /// `frag?`
    pub fn optional(&mut self, frag: Fragment) -> Fragment {
        let start = self.add_state();
        let end = self.add_state();
        self.add_epsilon(start, frag.start);
        self.add_epsilon(start, end);
        self.add_epsilon(frag.end, end);
        Fragment { start, end }
    }

    /// `frag*`
    pub fn kleene(&mut self, frag: Fragment) -> Fragment {
        let start = self.add_state();
        let end = self.add_state();
        self.add_epsilon(start, frag.start);
        self.add_epsilon(start, end);
        self.add_epsilon(frag.end, frag.start);
        self.add_epsilon(frag.end, end);
        Fragment { start, end }
    }

    /// `frag+`
    pub fn plus(&mut self, frag: Fragment) -> Fragment {
        let start = self.add_state();
        let end = self.add_state();
        self.add_epsilon(start, frag.start);
        self.add_epsilon(frag.end, frag.start);
        self.add_epsilon(frag.end, end);
        Fragment { start, end }
    }

    /// Build the fragment for an expression
    ///
    /// Interleave nodes have no single-automaton form; `context` names the
    /// element reported when one is found.
    pub fn build(&mut self, node: &Node, context: &str) -> Result<Fragment> {
        match node {
            Node::Token(name) => Ok(self.token(name)),
            Node::Sequence(blocks) => {
                let frags = self.build_all(blocks, context)?;
                Ok(self.append(frags))
            }
            Node::Choice(blocks) => {
                let frags = self.build_all(blocks, context)?;
                Ok(self.merge(frags))
            }
            Node::Optional(block) => {
                let frag = self.build(block, context)?;
                Ok(self.optional(frag))
            }
            Node::Kleene(block) => {
                let frag = self.build(block, context)?;
                Ok(self.kleene(frag))
            }
            Node::Plus(block) => {
                let frag = self.build(block, context)?;
                Ok(self.plus(frag))
            }
            Node::Interleave(_) => Err(Error::NestedInterleave(context.to_string())),
        }
    }

    fn build_all(&mut self, blocks: &[Node], context: &str) -> Result<Vec<Fragment>> {
        blocks.iter().map(|b| self.build(b, context)).collect()
    }

    fn closure(&self, seed: impl IntoIterator<Item = StateId>) -> BTreeSet<StateId> {
        let mut set = BTreeSet::new();
        let mut stack: Vec<StateId> = seed.into_iter().collect();
        while let Some(s) = stack.pop() {
            if set.insert(s) {
                stack.extend(self.states[s].epsilon.iter().copied());
            }
        }
        set
    }

    /// Subset construction starting from `frag`
    ///
    /// State 0 of the result is the closure of `frag.start`; further states
    /// are numbered in discovery order, tokens visited in sorted order.
    pub fn determinize(&self, frag: Fragment, limits: &Limits) -> Result<Dfa> {
        let initial = self.closure([frag.start]);
        let mut ids: BTreeMap<BTreeSet<StateId>, StateId> = BTreeMap::new();
        let mut sets: Vec<BTreeSet<StateId>> = Vec::new();
        let mut transitions: Vec<BTreeMap<String, StateId>> = Vec::new();
        let mut queue = VecDeque::new();

        ids.insert(initial.clone(), 0);
        sets.push(initial);
        transitions.push(BTreeMap::new());
        queue.push_back(0);

        while let Some(current) = queue.pop_front() {
            let mut moves: BTreeMap<&str, BTreeSet<StateId>> = BTreeMap::new();
            for &s in &sets[current] {
                for (token, target) in &self.states[s].transitions {
                    moves.entry(token.as_str()).or_default().insert(*target);
                }
            }

            for (token, targets) in moves {
                let next_set = self.closure(targets);
                let next = match ids.get(&next_set) {
                    Some(&id) => id,
                    None => {
                        let id = sets.len();
                        limits.check_dfa_states(id + 1)?;
                        ids.insert(next_set.clone(), id);
                        sets.push(next_set);
                        transitions.push(BTreeMap::new());
                        queue.push_back(id);
                        id
                    }
                };
                transitions[current].insert(token.to_string(), next);
            }
        }

        let finished = sets.iter().map(|set| set.contains(&frag.end)).collect();
        debug!(
            nfa_states = self.states.len(),
            dfa_states = sets.len(),
            "determinized automaton"
        );
        Ok(Dfa::from_parts(transitions, finished))
    }
}

/// Compile a non-interleave expression into a DFA
pub fn compile_dfa(node: &Node, context: &str, limits: &Limits) -> Result<Dfa> {
    let mut builder = NfaBuilder::new();
    let frag = builder.build(node, context)?;
    builder.determinize(frag, limits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automata::dfa::START;
    use crate::automata::Expression;

    fn accepts(dfa: &Dfa, tokens: &[&str]) -> bool {
        let mut state = START;
        for token in tokens {
            match dfa.consume(state, token) {
                Some(next) => state = next,
                None => return false,
            }
        }
        dfa.is_finished(state)
    }

    fn compile(node: &Node) -> Dfa {
        compile_dfa(node, "test", &Limits::default()).unwrap()
    }

    #[test]
    fn test_token() {
        let dfa = compile(&Node::token("a"));
        assert!(accepts(&dfa, &["a"]));
        assert!(!accepts(&dfa, &[]));
        assert!(!accepts(&dfa, &["a", "a"]));
    }

    #[test]
    fn test_sequence() {
        let dfa = compile(&Node::Sequence(vec![
            Node::token("a"),
            Node::token("b"),
            Node::token("c"),
        ]));
        assert!(accepts(&dfa, &["a", "b", "c"]));
        assert!(!accepts(&dfa, &["a", "c"]));
        assert!(!accepts(&dfa, &["a", "b"]));
    }

    #[test]
    fn test_empty_sequence_and_choice_accept_nothing_consumed() {
        let dfa = compile(&Node::Sequence(vec![]));
        assert!(accepts(&dfa, &[]));
        assert!(dfa.tokens().is_empty());

        let dfa = compile(&Node::Choice(vec![]));
        assert!(accepts(&dfa, &[]));
        assert!(!accepts(&dfa, &["a"]));
    }

    #[test]
    fn test_choice() {
        let dfa = compile(&Node::Choice(vec![
            Node::token("a"),
            Node::Sequence(vec![Node::token("b"), Node::token("c")]),
        ]));
        assert!(accepts(&dfa, &["a"]));
        assert!(accepts(&dfa, &["b", "c"]));
        assert!(!accepts(&dfa, &["b"]));
        assert!(!accepts(&dfa, &["a", "b", "c"]));
    }

    #[test]
    fn test_choice_with_shared_prefix_is_deterministic() {
        let dfa = compile(&Node::Choice(vec![
            Node::Sequence(vec![Node::token("a"), Node::token("b")]),
            Node::Sequence(vec![Node::token("a"), Node::token("c")]),
        ]));
        assert!(accepts(&dfa, &["a", "b"]));
        assert!(accepts(&dfa, &["a", "c"]));
        assert_eq!(dfa.expected(START).collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_closures() {
        let opt = compile(&Node::optional(Node::token("a")));
        assert!(accepts(&opt, &[]));
        assert!(accepts(&opt, &["a"]));
        assert!(!accepts(&opt, &["a", "a"]));

        let star = compile(&Node::kleene(Node::token("a")));
        assert!(accepts(&star, &[]));
        assert!(accepts(&star, &["a", "a", "a"]));

        let plus = compile(&Node::plus(Node::token("a")));
        assert!(!accepts(&plus, &[]));
        assert!(accepts(&plus, &["a"]));
        assert!(accepts(&plus, &["a", "a"]));
    }

    #[test]
    fn test_plus_of_empty_is_vacuous() {
        let dfa = compile(&Node::plus(Node::Sequence(vec![])));
        assert!(accepts(&dfa, &[]));
    }

    #[test]
    fn test_nested_interleave_rejected() {
        let node = Node::Sequence(vec![
            Node::token("a"),
            Node::Interleave(vec![Node::token("b"), Node::token("c")]),
        ]);
        let err = compile_dfa(&node, "foo", &Limits::default()).unwrap_err();
        assert!(matches!(err, Error::NestedInterleave(ref el) if el == "foo"));

        let node = Node::optional(Node::Interleave(vec![Node::token("b")]));
        assert!(compile_dfa(&node, "foo", &Limits::default()).is_err());
    }

    #[test]
    fn test_interleave_inside_interleave_rejected() {
        let node = Node::Interleave(vec![
            Node::Interleave(vec![Node::token("a"), Node::token("b")]),
            Node::token("c"),
        ]);
        let err = Expression::compile("foo", node, &Limits::default()).unwrap_err();
        assert!(matches!(err, Error::NestedInterleave(ref el) if el == "foo"));
    }

    #[test]
    fn test_state_limit() {
        let limits = Limits {
            max_dfa_states: 2,
            ..Limits::default()
        };
        let node = Node::Sequence(vec![Node::token("a"), Node::token("b"), Node::token("c")]);
        assert!(matches!(
            compile_dfa(&node, "foo", &limits),
            Err(Error::LimitExceeded(_))
        ));
    }
}
