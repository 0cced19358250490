//! Regular-language expression tree
//!
//! Content models are expressed over tokens: element tag names plus the
//! reserved [`TEXT`](super::TEXT) token for character data.

use std::fmt;

/// One node of a content model
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A single element tag or TEXT
    Token(String),
    /// Blocks in the given order
    Sequence(Vec<Node>),
    /// Exactly one of the blocks
    Choice(Vec<Node>),
    /// All blocks, in any relative order
    Interleave(Vec<Node>),
    /// The block or nothing
    Optional(Box<Node>),
    /// The block zero or more times
    Kleene(Box<Node>),
    /// The block one or more times
    Plus(Box<Node>),
}

impl Node {
    /// Create a token node
    pub fn token(name: impl Into<String>) -> Self {
        Node::Token(name.into())
    }

    /// Wrap a node as optional
    pub fn optional(block: Node) -> Self {
        Node::Optional(Box::new(block))
    }

    /// Wrap a node as zero-or-more
    pub fn kleene(block: Node) -> Self {
        Node::Kleene(Box::new(block))
    }

    /// Wrap a node as one-or-more
    pub fn plus(block: Node) -> Self {
        Node::Plus(Box::new(block))
    }

    /// Every token mentioned anywhere in this tree, in first-seen order
    pub fn tokens(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_tokens(&mut out);
        out
    }

    fn collect_tokens<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Node::Token(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Node::Sequence(blocks) | Node::Choice(blocks) | Node::Interleave(blocks) => {
                for block in blocks {
                    block.collect_tokens(out);
                }
            }
            Node::Optional(block) | Node::Kleene(block) | Node::Plus(block) => {
                block.collect_tokens(out)
            }
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, blocks: &[Node], sep: &str) -> fmt::Result {
    for (i, block) in blocks.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{}", block)?;
    }
    Ok(())
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Token(name) => f.write_str(name),
            Node::Sequence(blocks) => {
                f.write_str("(")?;
                write_joined(f, blocks, ",")?;
                f.write_str(")")
            }
            Node::Choice(blocks) => {
                f.write_str("(")?;
                write_joined(f, blocks, "|")?;
                f.write_str(")")
            }
            Node::Interleave(blocks) => {
                f.write_str("(")?;
                write_joined(f, blocks, ", ")?;
                f.write_str(")[unordered]")
            }
            Node::Optional(block) => write!(f, "{}?", block),
            Node::Kleene(block) => write!(f, "{}*", block),
            Node::Plus(block) => write!(f, "{}+", block),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let node = Node::Sequence(vec![
            Node::token("a"),
            Node::optional(Node::Choice(vec![Node::token("b"), Node::token("c")])),
            Node::kleene(Node::token("d")),
            Node::plus(Node::Sequence(vec![Node::token("e"), Node::token("TEXT")])),
        ]);
        assert_eq!(node.to_string(), "(a,(b|c)?,d*,(e,TEXT)+)");
    }

    #[test]
    fn test_display_interleave() {
        let node = Node::Interleave(vec![Node::token("a"), Node::optional(Node::token("b"))]);
        assert_eq!(node.to_string(), "(a, b?)[unordered]");
        assert_eq!(Node::Sequence(vec![]).to_string(), "()");
    }

    #[test]
    fn test_tokens_deduplicated() {
        let node = Node::Sequence(vec![
            Node::token("a"),
            Node::kleene(Node::Choice(vec![Node::token("b"), Node::token("a")])),
        ]);
        assert_eq!(node.tokens(), vec!["a", "b"]);
    }
}
