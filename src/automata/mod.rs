//! Content-model automata
//!
//! An [`Expression`] is the compiled form of one element's content model.
//! Plain models compile to a single [`Dfa`]; a model whose root is an
//! interleave compiles to an [`InterleaveEngine`]. Either way the expression
//! is simulated token by token through a [`ValidationState`].

pub mod builder;
pub mod dfa;
pub mod expression;
pub mod interleave;

use std::collections::BTreeSet;
use std::fmt;

use crate::error::{Result, ValidationError, ValidationErrorKind};
use crate::limits::Limits;

pub use builder::{compile_dfa, Fragment, NfaBuilder};
pub use dfa::{Dfa, StateId, START};
pub use expression::Node;
pub use interleave::InterleaveEngine;

/// Token standing for character data
pub const TEXT: &str = "TEXT";

#[derive(Debug, Clone)]
enum Engine {
    Dfa(Dfa),
    Interleave(InterleaveEngine),
}

/// Progress of one simulation run
#[derive(Debug, Clone)]
pub struct ValidationState {
    states: Vec<StateId>,
    /// Errors recorded so far
    pub errors: Vec<ValidationError>,
    /// Tokens consumed successfully, in order
    pub trace: Vec<String>,
}

impl ValidationState {
    /// Number of tokens consumed successfully
    pub fn consumed(&self) -> usize {
        self.trace.len()
    }
}

/// Compiled content model of an element
#[derive(Debug, Clone)]
pub struct Expression {
    name: String,
    root: Node,
    engine: Engine,
    allowed: BTreeSet<String>,
}

impl Expression {
    /// Compile the content model `root` of element `name`
    pub fn compile(name: impl Into<String>, root: Node, limits: &Limits) -> Result<Self> {
        let name = name.into();
        let engine = match &root {
            Node::Interleave(blocks) => {
                Engine::Interleave(InterleaveEngine::compile(blocks, &name, limits)?)
            }
            other => Engine::Dfa(compile_dfa(other, &name, limits)?),
        };
        let allowed = match &engine {
            Engine::Dfa(dfa) => dfa.tokens(),
            Engine::Interleave(il) => il.tokens(),
        }
        .into_iter()
        .map(str::to_string)
        .collect();

        Ok(Self {
            name,
            root,
            engine,
            allowed,
        })
    }

    /// Element name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expression tree
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Check if the model is an unordered group
    pub fn is_interleave(&self) -> bool {
        matches!(self.engine, Engine::Interleave(_))
    }

    /// Tokens that may appear somewhere in the content
    pub fn allowed(&self) -> &BTreeSet<String> {
        &self.allowed
    }

    /// Check if `token` may appear somewhere in the content
    pub fn is_allowed(&self, token: &str) -> bool {
        self.allowed.contains(token)
    }

    /// Fresh simulation state
    pub fn initial_state(&self) -> ValidationState {
        let states = match &self.engine {
            Engine::Dfa(_) => vec![START],
            Engine::Interleave(il) => il.initial_states(),
        };
        ValidationState {
            states,
            errors: Vec::new(),
            trace: Vec::new(),
        }
    }

    /// Feed one token
    ///
    /// A rejected token is recorded in `state.errors` and leaves the
    /// automaton where it was, so later tokens are still checked.
    pub fn consume(&self, state: &mut ValidationState, token: &str) -> bool {
        let accepted = match &self.engine {
            Engine::Dfa(dfa) => match state.states.first().and_then(|&s| dfa.consume(s, token)) {
                Some(next) => {
                    state.states[0] = next;
                    true
                }
                None => false,
            },
            Engine::Interleave(il) => il.consume(&mut state.states, token),
        };

        if accepted {
            state.trace.push(token.to_string());
        } else {
            let error = self.describe_error(state, token);
            state.errors.push(error);
        }
        accepted
    }

    /// Check whether the content seen so far is complete
    pub fn is_finished(&self, state: &ValidationState) -> bool {
        match &self.engine {
            Engine::Dfa(dfa) => state.states.first().map_or(false, |&s| dfa.is_finished(s)),
            Engine::Interleave(il) => il.is_finished(&state.states),
        }
    }

    /// Tokens acceptable in the current state
    pub fn expected(&self, state: &ValidationState) -> Vec<String> {
        match &self.engine {
            Engine::Dfa(dfa) => state
                .states
                .first()
                .map(|&s| dfa.expected(s).map(str::to_string).collect())
                .unwrap_or_default(),
            Engine::Interleave(il) => il
                .expected(&state.states)
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    /// Run a whole token sequence; stops at the first rejected token
    pub fn accepts<'a>(&self, tokens: impl IntoIterator<Item = &'a str>) -> bool {
        let mut state = self.initial_state();
        for token in tokens {
            if !self.consume(&mut state, token) {
                return false;
            }
        }
        self.is_finished(&state)
    }

    /// Error for content that ended too early
    pub fn incomplete_error(&self, state: &ValidationState) -> ValidationError {
        ValidationError::new(
            ValidationErrorKind::Incomplete,
            format!("<{}> is incomplete.", self.name),
        )
        .with_element(self.name.as_str())
        .with_schema_component(self.root.to_string())
        .with_reason(expected_reason(&self.expected(state)))
    }

    fn describe_error(&self, state: &ValidationState, token: &str) -> ValidationError {
        let (kind, message) = if token == TEXT {
            (
                ValidationErrorKind::TextNotAllowed,
                format!(
                    "TEXT is not allowed at the current position: {}",
                    state.trace.join(",")
                ),
            )
        } else if !self.is_allowed(token) {
            (
                ValidationErrorKind::NotAllowed,
                format!("<{}> is not valid in <{}>", token, self.name),
            )
        } else {
            (
                ValidationErrorKind::OutOfOrder,
                format!(
                    "<{}> is not allowed at the current position in <{}>.",
                    token, self.name
                ),
            )
        };
        ValidationError::new(kind, message)
            .with_element(self.name.as_str())
            .with_schema_component(self.root.to_string())
            .with_reason(expected_reason(&self.expected(state)))
    }
}

fn expected_reason(expected: &[String]) -> String {
    if expected.is_empty() {
        "no further content expected".to_string()
    } else {
        format!("expected one of: {}", expected.join(", "))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr(root: Node) -> Expression {
        Expression::compile("foo", root, &Limits::default()).unwrap()
    }

    fn abc() -> Node {
        Node::Sequence(vec![Node::token("a"), Node::token("b"), Node::token("c")])
    }

    #[test]
    fn test_sequence_errors() {
        let e = expr(abc());
        let mut state = e.initial_state();
        assert!(e.consume(&mut state, "a"));
        assert!(!e.consume(&mut state, "c"));
        assert!(!e.consume(&mut state, "x"));
        assert!(!e.consume(&mut state, TEXT));

        let kinds: Vec<_> = state.errors.iter().map(|err| err.kind).collect();
        assert_eq!(
            kinds,
            vec![
                ValidationErrorKind::OutOfOrder,
                ValidationErrorKind::NotAllowed,
                ValidationErrorKind::TextNotAllowed
            ]
        );
        assert_eq!(
            state.errors[0].message,
            "<c> is not allowed at the current position in <foo>."
        );
        assert_eq!(state.errors[1].message, "<x> is not valid in <foo>");
        assert_eq!(state.errors[2].message, "TEXT is not allowed at the current position: a");
        assert_eq!(state.errors[0].schema_component.as_deref(), Some("(a,b,c)"));
        assert_eq!(state.errors[0].reason.as_deref(), Some("expected one of: b"));
    }

    #[test]
    fn test_rejected_token_keeps_state() {
        let e = expr(abc());
        let mut state = e.initial_state();
        for token in ["a", "c", "b", "c"] {
            e.consume(&mut state, token);
        }
        assert_eq!(state.errors.len(), 1);
        assert_eq!(state.trace, vec!["a", "b", "c"]);
        assert!(e.is_finished(&state));
    }

    #[test]
    fn test_interleave_expression() {
        let e = expr(Node::Interleave(vec![
            Node::token("a"),
            Node::token("b"),
            Node::token("c"),
        ]));
        assert!(e.is_interleave());
        assert!(e.accepts(["a", "c", "b"]));
        assert!(!e.accepts(["a", "b"]));
        assert_eq!(e.to_string(), "(a, b, c)[unordered]");
    }

    #[test]
    fn test_allowed_children() {
        let e = expr(Node::Sequence(vec![
            Node::token("title"),
            Node::kleene(Node::Choice(vec![Node::token("p"), Node::token(TEXT)])),
        ]));
        assert!(e.is_allowed("p"));
        assert!(e.is_allowed(TEXT));
        assert!(!e.is_allowed("sec"));
        assert_eq!(e.allowed().len(), 3);
    }

    #[test]
    fn test_incomplete_error() {
        let e = expr(abc());
        let mut state = e.initial_state();
        e.consume(&mut state, "a");
        assert!(!e.is_finished(&state));
        let err = e.incomplete_error(&state);
        assert_eq!(err.kind, ValidationErrorKind::Incomplete);
        assert_eq!(err.message, "<foo> is incomplete.");
        assert_eq!(err.reason.as_deref(), Some("expected one of: b"));
    }
}
