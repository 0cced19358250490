//! Compact schema format
//!
//! A compiled schema is stored as JSON with every name interned:
//!
//! ```text
//! { "literals": [name...],
//!   "schema": [startRank, [[nameRank, type, [attrRank...], content]...]] }
//! ```
//!
//! `type` is `"t"` (text), `"e"` (element), `"x"` (external) or `"n"`
//! (not implemented). The last two extend the plain `t`/`e` format so that
//! external and not-implemented elements survive a round trip; a reader that
//! only knows `t`/`e` should treat them as `e`.
//!
//! `content` is either a literal rank (a token) or `[op, payload]`, where
//! `op` is one of `,` `~` `|` (payload: list of contents) or `?` `+` `*`
//! (payload: one content). Literals are ranked by descending use count; ties
//! keep first-use order.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::automata::{Expression, Node};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::validators::{ElementSchema, ElementType, XmlSchema};

type ElementEntry = (usize, String, Vec<usize>, Value);

#[derive(Debug, Serialize, Deserialize)]
struct CompactSchema {
    literals: Vec<String>,
    schema: (usize, Vec<ElementEntry>),
}

fn type_code(element_type: ElementType) -> &'static str {
    match element_type {
        ElementType::Text => "t",
        ElementType::Element => "e",
        ElementType::External => "x",
        ElementType::NotImplemented => "n",
    }
}

fn type_from_code(code: &str) -> Result<ElementType> {
    match code {
        "t" => Ok(ElementType::Text),
        "e" => Ok(ElementType::Element),
        "x" => Ok(ElementType::External),
        "n" => Ok(ElementType::NotImplemented),
        other => Err(Error::Serialization(format!("unknown element type '{}'", other))),
    }
}

/// Use counts of every literal, in first-use order
#[derive(Debug, Default)]
struct LiteralRegistry {
    counts: IndexMap<String, usize>,
    ranks: IndexMap<String, usize>,
}

impl LiteralRegistry {
    fn register(&mut self, literal: &str) {
        *self.counts.entry(literal.to_string()).or_insert(0) += 1;
    }

    fn register_node(&mut self, node: &Node) {
        match node {
            Node::Token(name) => self.register(name),
            Node::Sequence(blocks) | Node::Choice(blocks) | Node::Interleave(blocks) => {
                for block in blocks {
                    self.register_node(block);
                }
            }
            Node::Optional(block) | Node::Kleene(block) | Node::Plus(block) => {
                self.register_node(block)
            }
        }
    }

    fn compute_ranks(&mut self) -> Vec<String> {
        let mut entries: Vec<(&String, &usize)> = self.counts.iter().collect();
        // stable: equal counts keep registration order
        entries.sort_by(|a, b| b.1.cmp(a.1));
        let sorted: Vec<String> = entries.into_iter().map(|(l, _)| l.clone()).collect();
        self.ranks = sorted
            .iter()
            .enumerate()
            .map(|(rank, l)| (l.clone(), rank))
            .collect();
        sorted
    }

    fn rank(&self, literal: &str) -> Result<usize> {
        self.ranks
            .get(literal)
            .copied()
            .ok_or_else(|| Error::Serialization(format!("unregistered literal '{}'", literal)))
    }
}

fn encode_node(node: &Node, literals: &LiteralRegistry) -> Result<Value> {
    let (op, payload) = match node {
        Node::Token(name) => return Ok(Value::from(literals.rank(name)?)),
        Node::Sequence(blocks) => (",", encode_list(blocks, literals)?),
        Node::Interleave(blocks) => ("~", encode_list(blocks, literals)?),
        Node::Choice(blocks) => ("|", encode_list(blocks, literals)?),
        Node::Optional(block) => ("?", encode_node(block, literals)?),
        Node::Plus(block) => ("+", encode_node(block, literals)?),
        Node::Kleene(block) => ("*", encode_node(block, literals)?),
    };
    Ok(Value::Array(vec![Value::from(op), payload]))
}

fn encode_list(blocks: &[Node], literals: &LiteralRegistry) -> Result<Value> {
    blocks
        .iter()
        .map(|b| encode_node(b, literals))
        .collect::<Result<Vec<_>>>()
        .map(Value::Array)
}

/// Encode a schema into the compact JSON format
pub fn serialize_schema(schema: &XmlSchema) -> Result<String> {
    let mut literals = LiteralRegistry::default();
    literals.register(schema.start_element());
    for element in schema.element_schemas() {
        literals.register(&element.name);
        for attr in &element.attributes {
            literals.register(attr);
        }
        literals.register_node(element.expr.root());
    }
    let sorted = literals.compute_ranks();

    let mut entries = Vec::with_capacity(schema.len());
    for element in schema.element_schemas() {
        let attributes = element
            .attributes
            .iter()
            .map(|a| literals.rank(a))
            .collect::<Result<Vec<_>>>()?;
        entries.push((
            literals.rank(&element.name)?,
            type_code(element.element_type).to_string(),
            attributes,
            encode_node(element.expr.root(), &literals)?,
        ));
    }

    let compact = CompactSchema {
        literals: sorted,
        schema: (literals.rank(schema.start_element())?, entries),
    };
    debug!(
        literals = compact.literals.len(),
        elements = compact.schema.1.len(),
        "serialized schema"
    );
    Ok(serde_json::to_string(&compact)?)
}

struct Decoder<'a> {
    literals: &'a [String],
}

impl Decoder<'_> {
    fn literal(&self, rank: usize) -> Result<&str> {
        self.literals
            .get(rank)
            .map(String::as_str)
            .ok_or_else(|| Error::Serialization(format!("literal rank {} out of range", rank)))
    }

    fn node(&self, data: &Value) -> Result<Node> {
        match data {
            Value::Number(n) => {
                let rank = n
                    .as_u64()
                    .ok_or_else(|| Error::Serialization(format!("invalid literal rank {}", n)))?;
                Ok(Node::token(self.literal(rank as usize)?))
            }
            Value::Array(pair) => {
                let [Value::String(op), payload] = pair.as_slice() else {
                    return Err(Error::Serialization(format!("invalid content {}", data)));
                };
                match op.as_str() {
                    "," => Ok(Node::Sequence(self.list(payload)?)),
                    "~" => Ok(Node::Interleave(self.list(payload)?)),
                    "|" => Ok(Node::Choice(self.list(payload)?)),
                    "?" => Ok(Node::optional(self.node(payload)?)),
                    "+" => Ok(Node::plus(self.node(payload)?)),
                    "*" => Ok(Node::kleene(self.node(payload)?)),
                    other => Err(Error::Serialization(format!("unknown operator '{}'", other))),
                }
            }
            other => Err(Error::Serialization(format!("invalid content {}", other))),
        }
    }

    fn list(&self, data: &Value) -> Result<Vec<Node>> {
        let Value::Array(items) = data else {
            return Err(Error::Serialization(format!("expected a list, found {}", data)));
        };
        items.iter().map(|item| self.node(item)).collect()
    }
}

/// Decode a schema from the compact JSON format
pub fn deserialize_schema(data: &str) -> Result<XmlSchema> {
    deserialize_schema_with_limits(data, &Limits::default())
}

/// Decode a schema, compiling its automata under `limits`
pub fn deserialize_schema_with_limits(data: &str, limits: &Limits) -> Result<XmlSchema> {
    let compact: CompactSchema = serde_json::from_str(data)?;
    let decoder = Decoder {
        literals: &compact.literals,
    };
    let (start_rank, entries) = &compact.schema;
    let start = decoder.literal(*start_rank)?;

    let mut elements = IndexMap::with_capacity(entries.len());
    for (name_rank, code, attr_ranks, content) in entries {
        let name = decoder.literal(*name_rank)?;
        let attributes = attr_ranks
            .iter()
            .map(|&r| decoder.literal(r).map(str::to_string))
            .collect::<Result<IndexSet<_>>>()?;
        let expr = Expression::compile(name, decoder.node(content)?, limits)?;
        let schema = ElementSchema::new(name, type_from_code(code)?, attributes, expr)?;
        elements.insert(name.to_string(), schema);
    }

    XmlSchema::new(elements, start)
}
