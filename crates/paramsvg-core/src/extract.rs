//! Variable extraction: read `<defs><param/></defs>` bindings out of a
//! drawing.
//!
//! Extraction is a reader, not a rewriter: the source is returned
//! verbatim and there is no error path. Markup that fails to parse, or
//! has no `<defs>`, simply yields no variables.

use crate::codec::{QuickXmlCodec, XmlCodec};
use crate::document::Element;
use crate::types::{Extracted, Variable};

/// Local name of the container element scanned for params.
pub const DEFS: &str = "defs";

/// Local name of a variable binding element.
pub const PARAM: &str = "param";

/// Reads variables from markup using an injected [`XmlCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Extractor<C = QuickXmlCodec> {
    codec: C,
}

impl<C: XmlCodec> Extractor<C> {
    /// Create an extractor that parses with `codec`.
    #[must_use]
    pub const fn new(codec: C) -> Self {
        Self { codec }
    }

    /// Extract every `<param>` nested anywhere below any `<defs>`.
    ///
    /// Params lacking a non-empty `name` or `value` are skipped.
    #[must_use]
    pub fn extract(&self, source: &str) -> Extracted {
        let variables = match self.codec.parse(source) {
            Ok(document) => {
                let mut variables = Vec::new();
                collect_params(&document.root, false, &mut variables);
                variables
            }
            Err(err) => {
                log::debug!("no variables extracted from unparsable markup: {err}");
                Vec::new()
            }
        };

        Extracted {
            source: source.to_string(),
            variables,
        }
    }
}

/// Extract variables with the default codec.
///
/// See [`Extractor::extract`].
#[must_use]
pub fn extract(source: &str) -> Extracted {
    Extractor::<QuickXmlCodec>::default().extract(source)
}

/// Pre-order walk collecting params that have a `<defs>` ancestor.
fn collect_params(element: &Element, inside_defs: bool, out: &mut Vec<Variable>) {
    for child in element.child_elements() {
        let local_name = child.local_name();
        if inside_defs
            && local_name == PARAM
            && let Some(variable) = variable_from_param(child)
        {
            out.push(variable);
        }
        collect_params(child, inside_defs || local_name == DEFS, out);
    }
}

fn variable_from_param(param: &Element) -> Option<Variable> {
    let name = param.attribute("name").filter(|n| !n.is_empty())?;
    let value = param.attribute("value").filter(|v| !v.is_empty())?;
    Some(Variable::new(name, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::error::ParseError;

    fn names(extracted: &Extracted) -> Vec<(&str, &str)> {
        extracted
            .variables
            .iter()
            .map(|v| (v.name.as_str(), v.value.as_str()))
            .collect()
    }

    #[test]
    fn no_defs_yields_no_variables() {
        let source = r#"<svg><circle r="5"/></svg>"#;
        let extracted = extract(source);
        assert_eq!(extracted.source, source);
        assert!(extracted.variables.is_empty());
    }

    #[test]
    fn pulls_variables_out_of_defs() {
        let source = concat!(
            "<svg>",
            "<defs>",
            r#"<param name="width" value="100"/>"#,
            r#"<param name="height" value="200"/>"#,
            "</defs>",
            r#"<rect parametric:width="width" parametric:height="height"/>"#,
            "</svg>",
        );
        let extracted = extract(source);
        assert_eq!(
            extracted.variables,
            [Variable::new("width", "100"), Variable::new("height", "200")]
        );
    }

    #[test]
    fn source_is_returned_verbatim() {
        let source = "<svg>\n<defs><param name=\"a\" value=\"1\"/></defs>\n</svg>  ";
        assert_eq!(extract(source).source, source);
    }

    #[test]
    fn scans_every_defs_block_in_document_order() {
        let source = concat!(
            "<svg>",
            r#"<defs><param name="a" value="1"/></defs>"#,
            r#"<g><defs><param name="b" value="2"/></defs></g>"#,
            r#"<defs><param name="c" value="3"/></defs>"#,
            "</svg>",
        );
        assert_eq!(names(&extract(source)), [("a", "1"), ("b", "2"), ("c", "3")]);
    }

    #[test]
    fn params_nested_inside_defs_count() {
        let source = r#"<svg><defs><g><param name="deep" value="7"/></g></defs></svg>"#;
        assert_eq!(names(&extract(source)), [("deep", "7")]);
    }

    #[test]
    fn params_outside_defs_are_ignored() {
        let source = r#"<svg><param name="loose" value="1"/><defs/></svg>"#;
        assert!(extract(source).variables.is_empty());
    }

    #[test]
    fn incomplete_params_are_skipped() {
        let source = concat!(
            "<svg><defs>",
            r#"<param name="a"/>"#,
            r#"<param value="1"/>"#,
            r#"<param name="" value="1"/>"#,
            r#"<param name="b" value=""/>"#,
            r#"<param name="c" value="3"/>"#,
            "</defs></svg>",
        );
        assert_eq!(names(&extract(source)), [("c", "3")]);
    }

    #[test]
    fn prefixed_elements_match_on_local_name() {
        let source = r#"<svg:svg><svg:defs><svg:param name="a" value="1"/></svg:defs></svg:svg>"#;
        assert_eq!(names(&extract(source)), [("a", "1")]);
    }

    #[test]
    fn duplicate_names_are_kept_in_order() {
        let source = r#"<svg><defs><param name="a" value="1"/><param name="a" value="2"/></defs></svg>"#;
        assert_eq!(names(&extract(source)), [("a", "1"), ("a", "2")]);
    }

    #[test]
    fn malformed_markup_yields_no_variables() {
        let source = r#"<svg><defs><param name="a" value="1"/></defs><invalid</svg>"#;
        let extracted = extract(source);
        assert_eq!(extracted.source, source);
        assert!(extracted.variables.is_empty());
    }

    #[test]
    fn attribute_entities_are_decoded() {
        let source = r#"<svg><defs><param name="label" value="a &amp; b"/></defs></svg>"#;
        assert_eq!(names(&extract(source)), [("label", "a & b")]);
    }

    /// Codec that ignores its input and returns a fixed tree.
    struct FixedCodec(Document);

    impl XmlCodec for FixedCodec {
        fn parse(&self, _text: &str) -> Result<Document, ParseError> {
            Ok(self.0.clone())
        }

        fn serialize(&self, _document: &Document, _layout: crate::codec::Layout) -> String {
            String::new()
        }
    }

    #[test]
    fn uses_injected_codec() {
        let mut defs = Element::new("defs");
        defs.push_child(
            Element::new("param")
                .with_attribute("name", "x")
                .with_attribute("value", "9"),
        );
        let mut svg = Element::new("svg");
        svg.push_child(defs);

        let extractor = Extractor::new(FixedCodec(Document::new(svg)));
        let extracted = extractor.extract("not xml at all");
        assert_eq!(extracted.source, "not xml at all");
        assert_eq!(names(&extracted), [("x", "9")]);
    }
}
