//! XML parsing and serialization.
//!
//! The extractor and merger never talk to an XML library directly. They
//! receive an [`XmlCodec`], which turns text into a [`Document`] and back.
//! [`QuickXmlCodec`] is the default implementation, built on `quick-xml`.
//!
//! # Well-formedness
//!
//! Parsing is strict: mismatched or unclosed tags, invalid names,
//! malformed or duplicate attributes, unknown entity references, stray
//! text outside the root and a missing or repeated root element are all
//! reported as a [`ParseError`]. General entities declared in the
//! document's internal DTD subset (`<!ENTITY ns_svg "...">`, as written
//! by Illustrator) are known. Namespace prefixes are *not* resolved,
//! so markup using an undeclared `parametric:` prefix still parses.
//!
//! # Layout
//!
//! [`Layout::Compact`] writes the tree back as parsed. [`Layout::Pretty`]
//! re-indents it: each child element on its own line, whitespace-only
//! text dropped. Elements with mixed content (non-blank text or CDATA
//! children) or `xml:space="preserve"` are written compactly so their
//! text is never altered.

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::{Deserialize, Serialize};

use crate::document::{Document, Element, Node};
use crate::error::ParseError;

/// Number of spaces per nesting level used by [`Layout::default`].
pub const DEFAULT_INDENT: usize = 2;

/// How a [`Document`] is laid out when serialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Layout {
    /// Write nodes exactly as stored, without added whitespace.
    Compact,
    /// Re-indent element content by `indent` spaces per level.
    Pretty {
        /// Spaces per nesting level.
        indent: usize,
    },
}

impl Default for Layout {
    fn default() -> Self {
        Self::Pretty {
            indent: DEFAULT_INDENT,
        }
    }
}

/// Parse/serialize capability injected into the extractor and merger.
pub trait XmlCodec {
    /// Parse markup into a document tree.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] if `text` is not well-formed XML.
    fn parse(&self, text: &str) -> Result<Document, ParseError>;

    /// Serialize a document tree to text, without a trailing newline.
    fn serialize(&self, document: &Document, layout: Layout) -> String;
}

/// The default [`XmlCodec`], backed by `quick-xml`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuickXmlCodec;

impl XmlCodec for QuickXmlCodec {
    fn parse(&self, text: &str) -> Result<Document, ParseError> {
        let mut reader = Reader::from_str(text);
        // End names are checked by the tree builder so the error carries
        // both names.
        reader.check_end_names(false).check_comments(true);

        let mut tree = TreeBuilder::default();
        let mut entities = HashMap::new();
        loop {
            let position = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(err) => {
                    return Err(ParseError::Syntax {
                        position: reader.buffer_position(),
                        message: err.to_string(),
                    });
                }
            };

            match event {
                Event::Start(start) => tree.open(element_from_start(&start, &entities, position)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start, &entities, position)?;
                    tree.attach_element(element, position)?;
                }
                Event::End(end) => {
                    let name = utf8(end.name().as_ref(), position)?;
                    tree.close(name.trim_end(), position)?;
                }
                Event::Text(text) => {
                    // Validates entity references; the raw form is kept.
                    text.unescape_with(|entity| entities.get(entity).map(String::as_str))
                        .map_err(|err| syntax(position, &err))?;
                    tree.text(Node::Text(utf8(&text, position)?), position)?;
                }
                Event::CData(cdata) => tree.text(Node::CData(utf8(&cdata, position)?), position)?,
                Event::Comment(comment) => tree.attach_misc(Node::Comment(utf8(&comment, position)?)),
                Event::PI(pi) => tree.attach_misc(Node::ProcessingInstruction(utf8(&pi, position)?)),
                Event::Decl(decl) => tree.attach_misc(Node::Declaration(utf8(&decl, position)?)),
                Event::DocType(doctype) => {
                    let content = utf8(&doctype, position)?;
                    for (name, value) in internal_entities(&content) {
                        // The first declaration of an entity is binding.
                        entities.entry(name).or_insert(value);
                    }
                    tree.attach_misc(Node::DocType(content));
                }
                Event::Eof => break,
            }
        }

        tree.finish()
    }

    fn serialize(&self, document: &Document, layout: Layout) -> String {
        let mut out = String::new();
        for node in &document.prolog {
            write_node(&mut out, node, 0, layout);
            out.push('\n');
        }
        write_element(&mut out, &document.root, 0, layout);
        for node in &document.epilog {
            out.push('\n');
            write_node(&mut out, node, 0, layout);
        }
        out
    }
}

/// Parse `source` and pretty-print it with `indent` spaces per level,
/// appending a trailing newline.
///
/// # Errors
///
/// Returns a [`ParseError`] if `source` is not well-formed XML.
pub fn format(source: &str, indent: usize) -> Result<String, ParseError> {
    let codec = QuickXmlCodec;
    let document = codec.parse(source)?;
    let mut out = codec.serialize(&document, Layout::Pretty { indent });
    out.push('\n');
    Ok(out)
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Accumulates parser events into a [`Document`].
#[derive(Default)]
struct TreeBuilder {
    prolog: Vec<Node>,
    root: Option<Element>,
    epilog: Vec<Node>,
    /// Elements opened but not yet closed, innermost last.
    open: Vec<Element>,
}

impl TreeBuilder {
    fn open(&mut self, element: Element) {
        self.open.push(element);
    }

    fn close(&mut self, name: &str, position: usize) -> Result<(), ParseError> {
        let Some(element) = self.open.pop() else {
            return Err(ParseError::UnexpectedClose {
                position,
                found: name.to_string(),
            });
        };
        if element.name() != name {
            return Err(ParseError::MismatchedClose {
                position,
                expected: element.name().to_string(),
                found: name.to_string(),
            });
        }
        self.attach_element(element, position)
    }

    fn attach_element(&mut self, element: Element, position: usize) -> Result<(), ParseError> {
        if let Some(parent) = self.open.last_mut() {
            parent.push_child(element);
            return Ok(());
        }
        if self.root.is_some() {
            return Err(ParseError::MultipleRoots {
                position,
                name: element.name().to_string(),
            });
        }
        self.root = Some(element);
        Ok(())
    }

    /// Character data: allowed anywhere inside the root, and outside it
    /// only as whitespace (which is dropped).
    fn text(&mut self, node: Node, position: usize) -> Result<(), ParseError> {
        if let Some(parent) = self.open.last_mut() {
            parent.push_child(node);
            Ok(())
        } else if node.is_blank_text() {
            Ok(())
        } else {
            Err(ParseError::TextOutsideRoot { position })
        }
    }

    fn attach_misc(&mut self, node: Node) {
        if let Some(parent) = self.open.last_mut() {
            parent.push_child(node);
        } else if self.root.is_none() {
            self.prolog.push(node);
        } else {
            self.epilog.push(node);
        }
    }

    fn finish(self) -> Result<Document, ParseError> {
        if let Some(unclosed) = self.open.last() {
            return Err(ParseError::Unclosed {
                name: unclosed.name().to_string(),
            });
        }
        let root = self.root.ok_or(ParseError::NoRoot)?;
        Ok(Document {
            prolog: self.prolog,
            root,
            epilog: self.epilog,
        })
    }
}

/// Build an element (without children) from a start or empty tag.
fn element_from_start(
    start: &BytesStart<'_>,
    entities: &HashMap<String, String>,
    position: usize,
) -> Result<Element, ParseError> {
    let name = utf8(start.name().as_ref(), position)?;
    check_name(&name, position)?;

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|err| syntax(position, &err))?;
        let key = utf8(attr.key.as_ref(), position)?;
        check_name(&key, position)?;
        let value = attr
            .unescape_value_with(|entity| entities.get(entity).map(String::as_str))
            .map_err(|err| syntax(position, &err))?;
        element.set_attribute(key, value.into_owned());
    }
    Ok(element)
}

/// General entities with a literal value declared in the internal
/// subset of a `DOCTYPE`. Parameter and external entities are skipped.
fn internal_entities(doctype: &str) -> Vec<(String, String)> {
    let mut entities = Vec::new();
    let mut rest = doctype;
    while let Some(start) = rest.find("<!ENTITY") {
        rest = rest[start + "<!ENTITY".len()..].trim_start();
        if rest.starts_with('%') {
            continue;
        }
        let name_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (name, after_name) = rest.split_at(name_end);
        let after_name = after_name.trim_start();
        rest = after_name;

        let Some(quote) = after_name.chars().next().filter(|c| *c == '"' || *c == '\'') else {
            continue;
        };
        let literal = &after_name[1..];
        let Some(value_end) = literal.find(quote) else {
            break;
        };
        if is_xml_name(name) {
            entities.push((name.to_string(), literal[..value_end].to_string()));
        }
        rest = &literal[value_end + 1..];
    }
    entities
}

fn check_name(name: &str, position: usize) -> Result<(), ParseError> {
    if is_xml_name(name) {
        Ok(())
    } else {
        Err(ParseError::InvalidName {
            position,
            name: name.to_string(),
        })
    }
}

/// Approximation of the XML `Name` production: ASCII is checked
/// exactly, non-ASCII characters are accepted.
fn is_xml_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    let is_start = |c: char| c.is_ascii_alphabetic() || c == '_' || c == ':' || !c.is_ascii();
    is_start(first) && chars.all(|c| is_start(c) || c.is_ascii_digit() || c == '-' || c == '.')
}

fn utf8(bytes: &[u8], position: usize) -> Result<String, ParseError> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| syntax(position, &err))
}

fn syntax(position: usize, err: &impl std::fmt::Display) -> ParseError {
    ParseError::Syntax {
        position,
        message: err.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

fn write_node(out: &mut String, node: &Node, depth: usize, layout: Layout) {
    match node {
        Node::Element(element) => write_element(out, element, depth, layout),
        Node::Text(raw) => out.push_str(raw),
        Node::CData(data) => {
            out.push_str("<![CDATA[");
            out.push_str(data);
            out.push_str("]]>");
        }
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(content) | Node::Declaration(content) => {
            out.push_str("<?");
            out.push_str(content);
            out.push_str("?>");
        }
        Node::DocType(content) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(content);
            out.push('>');
        }
    }
}

fn write_element(out: &mut String, element: &Element, depth: usize, layout: Layout) {
    out.push('<');
    out.push_str(element.name());
    for attr in element.attributes() {
        out.push(' ');
        out.push_str(&attr.name);
        out.push_str("=\"");
        out.push_str(&escape_attribute(&attr.value));
        out.push('"');
    }

    let indent = match layout {
        Layout::Pretty { indent } if !element.has_text_content() && !preserves_space(element) => {
            Some(indent)
        }
        _ => None,
    };

    match indent {
        None if element.children().is_empty() => out.push_str("/>"),
        None => {
            out.push('>');
            for child in element.children() {
                write_node(out, child, depth + 1, Layout::Compact);
            }
            write_end_tag(out, element);
        }
        Some(indent) => {
            let mut children = element.children().iter().filter(|n| !n.is_blank_text()).peekable();
            if children.peek().is_none() {
                out.push_str("/>");
                return;
            }
            out.push('>');
            for child in children {
                out.push('\n');
                push_indent(out, (depth + 1) * indent);
                write_node(out, child, depth + 1, layout);
            }
            out.push('\n');
            push_indent(out, depth * indent);
            write_end_tag(out, element);
        }
    }
}

fn preserves_space(element: &Element) -> bool {
    element.attribute("xml:space") == Some("preserve")
}

fn write_end_tag(out: &mut String, element: &Element) {
    out.push_str("</");
    out.push_str(element.name());
    out.push('>');
}

fn push_indent(out: &mut String, width: usize) {
    out.extend(std::iter::repeat_n(' ', width));
}

fn escape_attribute(value: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<Document, ParseError> {
        QuickXmlCodec.parse(text)
    }

    fn roundtrip(text: &str, layout: Layout) -> String {
        let codec = QuickXmlCodec;
        codec.serialize(&codec.parse(text).unwrap(), layout)
    }

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = parse(r#"<svg width="10"><g><circle r="5"/></g></svg>"#).unwrap();
        assert_eq!(doc.root.name(), "svg");
        assert_eq!(doc.root.attribute("width"), Some("10"));
        let circle = doc.root.find_descendant("circle").unwrap();
        assert_eq!(circle.attribute("r"), Some("5"));
    }

    #[test]
    fn attribute_values_are_unescaped() {
        let doc = parse(r#"<svg title="a &amp; b &lt; c"/>"#).unwrap();
        assert_eq!(doc.root.attribute("title"), Some("a & b < c"));
    }

    #[test]
    fn undeclared_prefixes_are_accepted() {
        let doc = parse(r#"<svg><rect parametric:width="width"/></svg>"#).unwrap();
        let rect = doc.root.find_descendant("rect").unwrap();
        assert_eq!(rect.attribute("parametric:width"), Some("width"));
    }

    #[test]
    fn rejects_invalid_tag_name() {
        let err = parse("<svg><invalid</svg>").unwrap_err();
        assert!(
            matches!(err, ParseError::InvalidName { .. } | ParseError::Syntax { .. }),
            "unexpected error: {err:?}"
        );
    }

    #[test]
    fn rejects_mismatched_close() {
        let err = parse("<svg><g></svg>").unwrap_err();
        assert_eq!(
            err,
            ParseError::MismatchedClose {
                position: 8,
                expected: "g".to_string(),
                found: "svg".to_string(),
            }
        );
    }

    #[test]
    fn rejects_unclosed_root() {
        let err = parse("<svg><g/>").unwrap_err();
        assert_eq!(
            err,
            ParseError::Unclosed {
                name: "svg".to_string()
            }
        );
    }

    #[test]
    fn rejects_stray_close() {
        let err = parse("<svg/></svg>").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedClose { .. }), "{err:?}");
    }

    #[test]
    fn rejects_multiple_roots() {
        let err = parse("<svg/><svg/>").unwrap_err();
        assert!(matches!(err, ParseError::MultipleRoots { .. }), "{err:?}");
    }

    #[test]
    fn rejects_text_outside_root() {
        let err = parse("hello <svg/>").unwrap_err();
        assert_eq!(err, ParseError::TextOutsideRoot { position: 0 });
    }

    #[test]
    fn rejects_empty_input() {
        assert_eq!(parse("").unwrap_err(), ParseError::NoRoot);
        assert_eq!(parse("  \n").unwrap_err(), ParseError::NoRoot);
    }

    #[test]
    fn rejects_duplicate_attributes() {
        assert!(parse(r#"<svg a="1" a="2"/>"#).is_err());
    }

    #[test]
    fn rejects_unquoted_attributes() {
        assert!(parse("<svg a=1/>").is_err());
    }

    #[test]
    fn rejects_unknown_entities() {
        assert!(parse("<svg><text>&nbsp;</text></svg>").is_err());
        assert!(parse("<svg><text>a & b</text></svg>").is_err());
    }

    #[test]
    fn keeps_prolog_and_epilog() {
        let text = "<?xml version=\"1.0\"?>\n<!-- drawing -->\n<svg/>\n<!-- end -->";
        let doc = parse(text).unwrap();
        assert_eq!(doc.prolog.len(), 2);
        assert_eq!(doc.epilog, [Node::Comment(" end ".to_string())]);
        assert_eq!(
            QuickXmlCodec.serialize(&doc, Layout::default()),
            "<?xml version=\"1.0\"?>\n<!-- drawing -->\n<svg/>\n<!-- end -->"
        );
    }

    #[test]
    fn compact_preserves_structure() {
        let text = r#"<svg><defs><param name="a" value="1"/></defs><circle r="5"></circle></svg>"#;
        assert_eq!(
            roundtrip(text, Layout::Compact),
            r#"<svg><defs><param name="a" value="1"/></defs><circle r="5"/></svg>"#
        );
    }

    #[test]
    fn compact_escapes_attributes() {
        let doc = Document::new(Element::new("svg").with_attribute("title", "\"a\" & <b>"));
        assert_eq!(
            QuickXmlCodec.serialize(&doc, Layout::Compact),
            r#"<svg title="&quot;a&quot; &amp; &lt;b&gt;"/>"#
        );
    }

    #[test]
    fn pretty_indents_children() {
        let text = concat!(
            "<svg>",
            "<defs>",
            r#"<param name="width" value="100"/>"#,
            r#"<param name="height" value="200"/>"#,
            "</defs>",
            r#"<rect parametric:width="width" parametric:height="height"/>"#,
            "</svg>",
        );
        assert_eq!(
            roundtrip(text, Layout::default()),
            [
                "<svg>",
                "  <defs>",
                r#"    <param name="width" value="100"/>"#,
                r#"    <param name="height" value="200"/>"#,
                "  </defs>",
                r#"  <rect parametric:width="width" parametric:height="height"/>"#,
                "</svg>",
            ]
            .join("\n")
        );
    }

    #[test]
    fn pretty_keeps_text_content_inline() {
        let text = "<svg><text x=\"1\">Hello <tspan>there</tspan></text></svg>";
        assert_eq!(
            roundtrip(text, Layout::Pretty { indent: 4 }),
            "<svg>\n    <text x=\"1\">Hello <tspan>there</tspan></text>\n</svg>"
        );
    }

    #[test]
    fn pretty_is_stable() {
        let text = "<svg>\n\n   <g>\n<circle/>  </g>\n<!-- note --></svg>";
        let once = roundtrip(text, Layout::default());
        assert_eq!(once, "<svg>\n  <g>\n    <circle/>\n  </g>\n  <!-- note -->\n</svg>");
        assert_eq!(roundtrip(&once, Layout::default()), once);
    }

    #[test]
    fn pretty_collapses_blank_elements() {
        assert_eq!(roundtrip("<svg>\n  <defs>\n  </defs>\n</svg>", Layout::default()), "<svg>\n  <defs/>\n</svg>");
    }

    #[test]
    fn raw_text_entities_survive() {
        let text = "<svg><text>a &amp; b &#169;</text></svg>";
        assert_eq!(roundtrip(text, Layout::Compact), text);
    }

    #[test]
    fn cdata_is_preserved() {
        let text = "<svg><style><![CDATA[ rect { fill: red } ]]></style></svg>";
        assert_eq!(roundtrip(text, Layout::default()), "<svg>\n  <style><![CDATA[ rect { fill: red } ]]></style>\n</svg>");
    }

    #[test]
    fn format_appends_newline() {
        assert_eq!(format("<svg><g/></svg>", 2).unwrap(), "<svg>\n  <g/>\n</svg>\n");
    }

    #[test]
    fn format_reports_parse_errors() {
        assert!(format("<svg>", 2).is_err());
    }

    #[test]
    fn layout_json_shape() {
        assert_eq!(serde_json::to_string(&Layout::Compact).unwrap(), r#""compact""#);
        assert_eq!(
            serde_json::to_string(&Layout::default()).unwrap(),
            r#"{"pretty":{"indent":2}}"#
        );
    }

    #[test]
    fn resolves_internal_subset_entities() {
        let text = concat!(
            "<?xml version=\"1.0\"?>\n",
            "<!DOCTYPE svg PUBLIC \"-//W3C//DTD SVG 1.1//EN\" ",
            "\"http://www.w3.org/Graphics/SVG/1.1/DTD/svg11.dtd\" [\n",
            "\t<!ENTITY ns_svg \"http://www.w3.org/2000/svg\">\n",
            "\t<!ENTITY label 'tick &amp; tock'>\n",
            "]>\n",
            "<svg xmlns=\"&ns_svg;\"><text>&label;</text></svg>",
        );
        let doc = parse(text).unwrap();
        assert_eq!(doc.root.attribute("xmlns"), Some("http://www.w3.org/2000/svg"));
        assert!(matches!(&doc.prolog[1], Node::DocType(content) if content.contains("<!ENTITY ns_svg")));

        // Text keeps its raw reference; the DOCTYPE travels with it.
        let compact = roundtrip(text, Layout::Compact);
        assert!(compact.contains("<text>&label;</text>"));
        assert!(parse(&compact).is_ok());
    }

    #[test]
    fn rejects_undeclared_entities() {
        let err = parse(r#"<!DOCTYPE svg [<!ENTITY a "1">]><svg x="&b;"/>"#).unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }), "unexpected error: {err:?}");
    }

    #[test]
    fn internal_entities_skip_parameter_and_external() {
        let subset = concat!(
            "svg [",
            r#"<!ENTITY % shared "ignored">"#,
            r#"<!ENTITY logo SYSTEM "logo.svg">"#,
            r#"<!ENTITY color "red">"#,
            "]",
        );
        assert_eq!(
            internal_entities(subset),
            [("color".to_string(), "red".to_string())]
        );
    }

    #[test]
    fn pretty_keeps_preserved_whitespace() {
        let text = r#"<svg><text xml:space="preserve"> </text><g> <a> x</a> </g></svg>"#;
        assert_eq!(
            roundtrip(text, Layout::Pretty { indent: 2 }),
            concat!(
                "<svg>\n",
                "  <text xml:space=\"preserve\"> </text>\n",
                "  <g>\n",
                "    <a> x</a>\n",
                "  </g>\n",
                "</svg>",
            )
        );
    }

    #[test]
    fn xml_names() {
        assert!(is_xml_name("svg"));
        assert!(is_xml_name("parametric:width"));
        assert!(is_xml_name("_a-b.c1"));
        assert!(!is_xml_name(""));
        assert!(!is_xml_name("1abc"));
        assert!(!is_xml_name("invalid</svg"));
    }
}
