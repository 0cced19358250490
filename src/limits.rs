//! Limits and constraints for grammar compilation and validation
//!
//! These guard against runaway inputs: include cycles, automata that blow up
//! during subset construction, and oversized or deeply nested documents.

use crate::error::{Error, Result};

/// Global limits configuration
#[derive(Debug, Clone)]
pub struct Limits {
    /// Maximum size of a single grammar file in bytes
    pub max_grammar_size: usize,

    /// Maximum include nesting (also stops include cycles)
    pub max_include_depth: usize,

    /// Maximum number of states of one compiled automaton
    pub max_dfa_states: usize,

    /// Maximum element nesting depth of an instance document
    pub max_xml_depth: usize,

    /// Maximum instance document size in bytes
    pub max_xml_size: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_grammar_size: 16 * 1024 * 1024, // 16 MB
            max_include_depth: 32,
            max_dfa_states: 10000,
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create strict limits (more restrictive)
    pub fn strict() -> Self {
        Self {
            max_grammar_size: 1024 * 1024, // 1 MB
            max_include_depth: 8,
            max_dfa_states: 1000,
            max_xml_depth: 100,
            max_xml_size: 10 * 1024 * 1024, // 10 MB
        }
    }

    /// Create permissive limits (less restrictive, use with caution)
    pub fn permissive() -> Self {
        Self {
            max_grammar_size: 256 * 1024 * 1024, // 256 MB
            max_include_depth: 256,
            max_dfa_states: 1000000,
            max_xml_depth: 10000,
            max_xml_size: 1024 * 1024 * 1024, // 1 GB
        }
    }

    /// Check if a grammar file size is within limits
    pub fn check_grammar_size(&self, size: usize) -> Result<()> {
        if size > self.max_grammar_size {
            Err(Error::LimitExceeded(format!(
                "grammar size {} bytes exceeds maximum {} bytes",
                size, self.max_grammar_size
            )))
        } else {
            Ok(())
        }
    }

    /// Check if include nesting is within limits
    pub fn check_include_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_include_depth {
            Err(Error::LimitExceeded(format!(
                "include depth {} exceeds maximum {}",
                depth, self.max_include_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if an automaton's state count is within limits
    pub fn check_dfa_states(&self, count: usize) -> Result<()> {
        if count > self.max_dfa_states {
            Err(Error::LimitExceeded(format!(
                "automaton state count {} exceeds maximum {}",
                count, self.max_dfa_states
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML depth is within limits
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        if depth > self.max_xml_depth {
            Err(Error::LimitExceeded(format!(
                "XML depth {} exceeds maximum {}",
                depth, self.max_xml_depth
            )))
        } else {
            Ok(())
        }
    }

    /// Check if XML size is within limits
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        if size > self.max_xml_size {
            Err(Error::LimitExceeded(format!(
                "XML size {} bytes exceeds maximum {} bytes",
                size, self.max_xml_size
            )))
        } else {
            Ok(())
        }
    }
}
