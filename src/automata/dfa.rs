//! Compiled deterministic automata

use std::collections::{BTreeMap, BTreeSet};

/// Index of a DFA state
pub type StateId = usize;

/// The initial state of every [`Dfa`]
pub const START: StateId = 0;

/// Deterministic automaton over element tokens
///
/// Produced by [`NfaBuilder::determinize`](super::builder::NfaBuilder::determinize);
/// contains no epsilon edges. A missing transition means the token is
/// rejected in that state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dfa {
    transitions: Vec<BTreeMap<String, StateId>>,
    finished: Vec<bool>,
}

impl Dfa {
    pub(crate) fn from_parts(
        transitions: Vec<BTreeMap<String, StateId>>,
        finished: Vec<bool>,
    ) -> Self {
        debug_assert_eq!(transitions.len(), finished.len());
        Self {
            transitions,
            finished,
        }
    }

    /// Follow the transition for `token`, if any
    pub fn consume(&self, state: StateId, token: &str) -> Option<StateId> {
        self.transitions.get(state)?.get(token).copied()
    }

    /// Check whether `token` can be consumed in `state`
    pub fn can_consume(&self, state: StateId, token: &str) -> bool {
        self.consume(state, token).is_some()
    }

    /// Check whether `state` is accepting
    pub fn is_finished(&self, state: StateId) -> bool {
        self.finished.get(state).copied().unwrap_or(false)
    }

    /// Tokens with a transition out of `state`
    pub fn expected(&self, state: StateId) -> impl Iterator<Item = &str> {
        self.transitions
            .get(state)
            .into_iter()
            .flat_map(|t| t.keys().map(String::as_str))
    }

    /// Every token appearing on any transition
    pub fn tokens(&self) -> BTreeSet<&str> {
        self.transitions
            .iter()
            .flat_map(|t| t.keys().map(String::as_str))
            .collect()
    }

    /// Number of states
    pub fn state_count(&self) -> usize {
        self.transitions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ab() -> Dfa {
        // a b?
        let mut t0 = BTreeMap::new();
        t0.insert("a".to_string(), 1);
        let mut t1 = BTreeMap::new();
        t1.insert("b".to_string(), 2);
        Dfa::from_parts(vec![t0, t1, BTreeMap::new()], vec![false, true, true])
    }

    #[test]
    fn test_consume_and_finish() {
        let dfa = ab();
        assert!(!dfa.is_finished(START));
        let s = dfa.consume(START, "a").unwrap();
        assert!(dfa.is_finished(s));
        assert!(dfa.can_consume(s, "b"));
        assert!(dfa.consume(s, "a").is_none());
        assert_eq!(dfa.state_count(), 3);
    }

    #[test]
    fn test_tokens_and_expected() {
        let dfa = ab();
        assert_eq!(dfa.tokens().into_iter().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(dfa.expected(1).collect::<Vec<_>>(), vec!["b"]);
        assert_eq!(dfa.expected(99).count(), 0);
        assert!(!dfa.is_finished(99));
    }
}
