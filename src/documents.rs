//! Instance XML documents
//!
//! A small owned tree built with quick-xml: elements keep their tag as
//! written (prefix included, since grammar element names are matched
//! literally), attributes in document order, and a child list of elements,
//! text and CDATA sections. Comments and processing instructions are dropped;
//! adjacent text runs are merged into one text node.

use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Error, Result};
use crate::limits::Limits;

/// Child node of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    /// Nested element
    Element(Element),
    /// Character data (unescaped)
    Text(String),
    /// CDATA section content
    CData(String),
}

impl XmlNode {
    /// The element, if this node is one
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            XmlNode::Element(el) => Some(el),
            _ => None,
        }
    }
}

/// XML Element in the document tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name as written
    pub name: String,
    /// Attributes in document order (namespace declarations excluded)
    pub attributes: IndexMap<String, String>,
    /// Child nodes in document order
    pub children: Vec<XmlNode>,
}

impl Element {
    /// Create a new element
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: IndexMap::new(),
            children: Vec::new(),
        }
    }

    /// Builder: add an attribute
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Builder: add a child element
    pub fn with_child(mut self, child: Element) -> Self {
        self.add_child(child);
        self
    }

    /// Builder: add text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(text);
        self
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Get an attribute value by name
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Add a child element
    pub fn add_child(&mut self, child: Element) {
        self.children.push(XmlNode::Element(child));
    }

    /// Append text, merging with a preceding text node
    pub fn push_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        match self.children.last_mut() {
            Some(XmlNode::Text(last)) => last.push_str(&text),
            _ => self.children.push(XmlNode::Text(text)),
        }
    }

    /// Child elements in document order
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    /// Find child elements by tag name
    pub fn find_children(&self, name: &str) -> Vec<&Element> {
        self.child_elements().filter(|e| e.name == name).collect()
    }

    /// Concatenated text and CDATA of the direct children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                XmlNode::Text(t) | XmlNode::CData(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }
}

/// XML Document representation
#[derive(Debug, Clone, Default)]
pub struct Document {
    /// Root element of the document
    pub root: Option<Element>,
}

impl Document {
    /// Create a new empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse(xml.as_bytes())
    }

    /// Parse an XML document from bytes with default limits
    pub fn parse(xml: &[u8]) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from bytes
    pub fn parse_with_limits(xml: &[u8], limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;

        let mut reader = Reader::from_reader(xml);
        reader.trim_text(false);

        let mut doc = Document::new();
        let mut element_stack: Vec<Element> = Vec::new();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => {
                    let element = Self::parse_element(&e)?;
                    element_stack.push(element);
                    limits.check_xml_depth(element_stack.len())?;
                }
                Ok(Event::End(_)) => {
                    if let Some(current) = element_stack.pop() {
                        if let Some(parent) = element_stack.last_mut() {
                            parent.add_child(current);
                        } else {
                            doc.root = Some(current);
                        }
                    }
                }
                Ok(Event::Empty(e)) => {
                    let element = Self::parse_element(&e)?;
                    limits.check_xml_depth(element_stack.len() + 1)?;
                    if let Some(parent) = element_stack.last_mut() {
                        parent.add_child(element);
                    } else {
                        doc.root = Some(element);
                    }
                }
                Ok(Event::Text(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = e
                            .unescape()
                            .map_err(|e| Error::Xml(format!("Failed to unescape text: {}", e)))?;
                        current.push_text(text.into_owned());
                    }
                }
                Ok(Event::CData(e)) => {
                    if let Some(current) = element_stack.last_mut() {
                        let text = String::from_utf8(e.into_inner().into_owned())
                            .map_err(|e| Error::Xml(format!("Invalid CDATA section: {}", e)))?;
                        current.children.push(XmlNode::CData(text));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::Xml(format!(
                        "Error parsing XML at position {}: {}",
                        reader.buffer_position(),
                        e
                    )))
                }
                _ => {} // comments, processing instructions, declarations
            }
            buf.clear();
        }

        if !element_stack.is_empty() {
            return Err(Error::Xml("unexpected end of document".to_string()));
        }
        Ok(doc)
    }

    fn parse_element(start: &BytesStart) -> Result<Element> {
        let name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?
            .to_string();

        let mut element = Element::new(name);

        for attr_result in start.attributes() {
            let attr = attr_result
                .map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

            let attr_name = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?;
            if attr_name == "xmlns" || attr_name.starts_with("xmlns:") {
                continue;
            }

            let attr_value = attr
                .unescape_value()
                .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
                .to_string();
            element.attributes.insert(attr_name.to_string(), attr_value);
        }

        Ok(element)
    }

    /// Get the root element
    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }
}
