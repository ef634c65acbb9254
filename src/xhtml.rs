//! Rich-text value type for mixed XHTML content
//!
//! MIM definition fields embed inline `xhtml:`-prefixed markup. The value
//! is held as a node tree and exposes a canonical string form; parsing a
//! canonical string back yields a structurally equivalent tree.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::io::BufRead;

use crate::error::ContentFormatError;

/// One node of a mixed-content fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum XhtmlNode {
    Text(String),
    Element {
        /// Qualified element name as written, e.g. `xhtml:p`
        name: String,
        attributes: Vec<(String, String)>,
        children: Vec<XhtmlNode>,
    },
}

/// Mixed XHTML markup content
///
/// The canonical string form writes every element with an explicit end
/// tag and minimally escaped text, so `from_string(to_canonical_string())`
/// reproduces the same tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct XhtmlText {
    nodes: Vec<XhtmlNode>,
}

impl XhtmlText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a markup fragment string into a rich-text value
    ///
    /// Malformed markup is a [`ContentFormatError`]; the value is never
    /// silently truncated.
    pub fn from_string(content: &str) -> Result<Self, ContentFormatError> {
        let mut reader = Reader::from_reader(content.as_bytes());
        let nodes = read_nodes(&mut reader, None)?;
        Ok(Self { nodes })
    }

    pub(crate) fn from_nodes(nodes: Vec<XhtmlNode>) -> Self {
        Self { nodes }
    }

    /// The parsed node tree
    pub fn nodes(&self) -> &[XhtmlNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Serialize the content to its canonical string form
    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        for node in &self.nodes {
            render_node(node, &mut out);
        }
        out
    }
}

/// Read mixed-content nodes from an event stream
///
/// With `until: Some(name)` the fragment is embedded in a document and
/// reading stops at the enclosing element's end tag; with `None` the whole
/// input is one fragment and reading stops at end of input.
pub(crate) fn read_nodes<R: BufRead>(
    reader: &mut Reader<R>,
    until: Option<&[u8]>,
) -> Result<Vec<XhtmlNode>, ContentFormatError> {
    let mut top = Vec::new();
    let mut stack: Vec<XhtmlNode> = Vec::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let node = element_node(&e)?;
                stack.push(node);
            }
            Event::Empty(e) => {
                let node = element_node(&e)?;
                append(&mut stack, &mut top, node);
            }
            Event::Text(t) => {
                let text = t.unescape()?.into_owned();
                if !text.is_empty() {
                    append(&mut stack, &mut top, XhtmlNode::Text(text));
                }
            }
            Event::CData(c) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                if !text.is_empty() {
                    append(&mut stack, &mut top, XhtmlNode::Text(text));
                }
            }
            Event::End(e) => match stack.pop() {
                Some(node) => append(&mut stack, &mut top, node),
                None => {
                    // not part of the fragment: the enclosing wire element
                    let name = e.name().into_inner().to_vec();
                    return match until {
                        Some(expected) if local_part(&name) == expected => Ok(top),
                        _ => Err(ContentFormatError::Unexpected {
                            reason: format!(
                                "unmatched closing tag '{}'",
                                String::from_utf8_lossy(&name)
                            ),
                        }),
                    };
                }
            },
            Event::Eof => {
                if let Some(expected) = until {
                    return Err(ContentFormatError::UnclosedElement {
                        element: String::from_utf8_lossy(expected).into_owned(),
                    });
                }
                if let Some(XhtmlNode::Element { name, .. }) = stack.last() {
                    return Err(ContentFormatError::UnclosedElement {
                        element: name.clone(),
                    });
                }
                return Ok(top);
            }
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }
}

fn element_node(e: &BytesStart<'_>) -> Result<XhtmlNode, ContentFormatError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        attributes.push((
            String::from_utf8_lossy(attr.key.into_inner()).into_owned(),
            attr.unescape_value()?.into_owned(),
        ));
    }
    Ok(XhtmlNode::Element {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn local_part(name: &[u8]) -> &[u8] {
    match name.iter().rposition(|b| *b == b':') {
        Some(colon) => &name[colon + 1..],
        None => name,
    }
}

fn append(stack: &mut [XhtmlNode], top: &mut Vec<XhtmlNode>, node: XhtmlNode) {
    if let Some(XhtmlNode::Element { children, .. }) = stack.last_mut() {
        children.push(node);
    } else {
        top.push(node);
    }
}

fn render_node(node: &XhtmlNode, out: &mut String) {
    match node {
        XhtmlNode::Text(text) => out.push_str(&escape(text.as_str())),
        XhtmlNode::Element {
            name,
            attributes,
            children,
        } => {
            out.push('<');
            out.push_str(name);
            for (key, value) in attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            out.push('>');
            for child in children {
                render_node(child, out);
            }
            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "<xhtml:body><xhtml:p>Dit is een tekst met \
         <xhtml:b>mixed</xhtml:b> <xhtml:i>content</xhtml:i>.</xhtml:p></xhtml:body>";

    #[test]
    fn test_canonical_round_trip() {
        let text = XhtmlText::from_string(SAMPLE).unwrap();
        assert_eq!(text.to_canonical_string(), SAMPLE);
    }

    #[test]
    fn test_structural_round_trip() {
        let text = XhtmlText::from_string(SAMPLE).unwrap();
        let reparsed = XhtmlText::from_string(&text.to_canonical_string()).unwrap();
        assert_eq!(text, reparsed);
    }

    #[test]
    fn test_mixed_content_preserves_inner_whitespace() {
        let text = XhtmlText::from_string(SAMPLE).unwrap();
        let XhtmlNode::Element { children, .. } = &text.nodes()[0] else {
            panic!("expected element");
        };
        let XhtmlNode::Element { children, .. } = &children[0] else {
            panic!("expected paragraph");
        };
        assert_eq!(
            children[0],
            XhtmlNode::Text("Dit is een tekst met ".to_string())
        );
    }

    #[test]
    fn test_self_closing_element_normalized() {
        let text = XhtmlText::from_string("<xhtml:p>a<xhtml:br/>b</xhtml:p>").unwrap();
        assert_eq!(
            text.to_canonical_string(),
            "<xhtml:p>a<xhtml:br></xhtml:br>b</xhtml:p>"
        );
    }

    #[test]
    fn test_escaped_text_round_trips_structurally() {
        let text = XhtmlText::from_string("<xhtml:p>1 &lt; 2 &amp; 3</xhtml:p>").unwrap();
        let reparsed = XhtmlText::from_string(&text.to_canonical_string()).unwrap();
        assert_eq!(text, reparsed);
    }

    #[test]
    fn test_attributes_preserved() {
        let text =
            XhtmlText::from_string("<xhtml:a href=\"https://example.org\">link</xhtml:a>").unwrap();
        assert_eq!(
            text.to_canonical_string(),
            "<xhtml:a href=\"https://example.org\">link</xhtml:a>"
        );
    }

    #[test]
    fn test_unclosed_element_rejected() {
        assert!(XhtmlText::from_string("<xhtml:p>open").is_err());
    }

    #[test]
    fn test_mismatched_tags_rejected() {
        assert!(XhtmlText::from_string("<xhtml:p>x</xhtml:b>").is_err());
    }
}
