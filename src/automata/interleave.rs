//! Unordered content groups
//!
//! An interleave keeps one automaton per block instead of a product
//! automaton. Each token goes to the first block, in declaration order, that
//! can consume it in its current state. This is exact when the blocks'
//! alphabets are disjoint; with overlapping alphabets a valid ordering can
//! be rejected because tokens are never re-routed.

use std::collections::BTreeSet;

use super::builder::compile_dfa;
use super::dfa::{Dfa, StateId, START};
use super::expression::Node;
use crate::error::Result;
use crate::limits::Limits;

/// One automaton per interleaved block
#[derive(Debug, Clone)]
pub struct InterleaveEngine {
    blocks: Vec<Dfa>,
}

impl InterleaveEngine {
    /// Compile every block independently
    pub fn compile(blocks: &[Node], context: &str, limits: &Limits) -> Result<Self> {
        let blocks = blocks
            .iter()
            .map(|block| compile_dfa(block, context, limits))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { blocks })
    }

    /// Initial state vector
    pub fn initial_states(&self) -> Vec<StateId> {
        vec![START; self.blocks.len()]
    }

    /// Index of the block that takes `token`
    pub fn route(&self, states: &[StateId], token: &str) -> Option<usize> {
        self.blocks
            .iter()
            .zip(states)
            .position(|(dfa, &state)| dfa.can_consume(state, token))
    }

    /// Feed `token` to the routed block; `false` when no block takes it
    pub fn consume(&self, states: &mut [StateId], token: &str) -> bool {
        let Some(idx) = self.route(states, token) else {
            return false;
        };
        match self.blocks[idx].consume(states[idx], token) {
            Some(next) => {
                states[idx] = next;
                true
            }
            None => false,
        }
    }

    /// Every block is in an accepting state
    pub fn is_finished(&self, states: &[StateId]) -> bool {
        self.blocks
            .iter()
            .zip(states)
            .all(|(dfa, &state)| dfa.is_finished(state))
    }

    /// Tokens some block could take next
    pub fn expected(&self, states: &[StateId]) -> BTreeSet<&str> {
        self.blocks
            .iter()
            .zip(states)
            .flat_map(|(dfa, &state)| dfa.expected(state))
            .collect()
    }

    /// Union of all block alphabets
    pub fn tokens(&self) -> BTreeSet<&str> {
        self.blocks.iter().flat_map(Dfa::tokens).collect()
    }

    /// The per-block automata
    pub fn blocks(&self) -> &[Dfa] {
        &self.blocks
    }
}
