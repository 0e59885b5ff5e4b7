//! Variable merging: write a list of variables back into a drawing.
//!
//! # Algorithm
//!
//! 1. Parse the markup. A parse failure becomes the fixed
//!    [`ErrorReport::invalid_markup`] report.
//! 2. Optionally add the SVG and `parametric` namespace declarations to
//!    the root element (see [`MergeOptions::complete_namespaces`]).
//! 3. Reuse the first `<defs>` in document order, or create one.
//! 4. For each variable in order, drop every `<param>` with the same name
//!    anywhere inside `<defs>` and append a fresh one as its last child.
//!    Updated params move to the end; untouched children keep their
//!    relative order.
//! 5. Insert a newly created `<defs>` as the first child of the root.
//! 6. Serialize with the configured [`Layout`] plus a trailing newline.
//!
//! Merging the same variables twice produces the same output: names are
//! never duplicated and a single `<defs>` is reused.

use serde::{Deserialize, Serialize};

use crate::codec::{DEFAULT_INDENT, Layout, QuickXmlCodec, XmlCodec};
use crate::document::{Element, Node};
use crate::error::{ErrorReport, MergeError};
use crate::extract::{DEFS, PARAM};
use crate::types::{FileContents, Variable};

/// Default SVG namespace, declared as `xmlns`.
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Namespace of `parametric:*` attributes, declared as `xmlns:parametric`.
pub const PARAMETRIC_NAMESPACE: &str = "//parametric-svg.js.org/v1";

/// Declarations added by namespace completion, in insertion order.
const REQUIRED_NAMESPACES: [(&str, &str); 2] = [
    ("xmlns", SVG_NAMESPACE),
    ("xmlns:parametric", PARAMETRIC_NAMESPACE),
];

/// Configuration for [`Merger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MergeOptions {
    /// Add missing `xmlns` and `xmlns:parametric` declarations to the
    /// root element. Existing declarations are never changed.
    pub complete_namespaces: bool,

    /// Output layout. The payload always ends with a newline.
    pub layout: Layout,
}

impl MergeOptions {
    /// Default for [`complete_namespaces`](Self::complete_namespaces).
    pub const DEFAULT_COMPLETE_NAMESPACES: bool = true;

    /// Default for [`layout`](Self::layout).
    pub const DEFAULT_LAYOUT: Layout = Layout::Pretty {
        indent: DEFAULT_INDENT,
    };
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            complete_namespaces: Self::DEFAULT_COMPLETE_NAMESPACES,
            layout: Self::DEFAULT_LAYOUT,
        }
    }
}

/// Merges variables into markup using an injected [`XmlCodec`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Merger<C = QuickXmlCodec> {
    codec: C,
    options: MergeOptions,
}

impl Merger<QuickXmlCodec> {
    /// Create a merger using the default codec.
    #[must_use]
    pub const fn with_options(options: MergeOptions) -> Self {
        Self {
            codec: QuickXmlCodec,
            options,
        }
    }
}

impl<C: XmlCodec> Merger<C> {
    /// Create a merger that parses and serializes with `codec`.
    #[must_use]
    pub const fn new(codec: C, options: MergeOptions) -> Self {
        Self { codec, options }
    }

    /// Merge `variables` into `source`, keeping the structured error.
    ///
    /// # Errors
    ///
    /// Returns [`MergeError::Parse`] if `source` is not well-formed XML.
    pub fn try_merge(&self, source: &str, variables: &[Variable]) -> Result<String, MergeError> {
        let mut document = self.codec.parse(source)?;

        if self.options.complete_namespaces {
            complete_namespaces(&mut document.root);
        }
        merge_params(&mut document.root, variables);

        let mut payload = self.codec.serialize(&document, self.options.layout);
        payload.push('\n');
        log::debug!(
            "merged {} variable(s) into {} bytes of markup",
            variables.len(),
            payload.len()
        );
        Ok(payload)
    }

    /// Merge `variables` into `source`, reporting failures the way the
    /// UI displays them.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorReport::invalid_markup`] if `source` is not
    /// well-formed XML. The parser's diagnostic is logged, not returned.
    pub fn merge(&self, source: &str, variables: &[Variable]) -> Result<String, ErrorReport> {
        self.try_merge(source, variables).map_err(|err| {
            log::warn!("cannot merge variables: {err}");
            ErrorReport::from(err)
        })
    }

    /// [`merge`](Self::merge) in the listener's `{ payload, error }` shape.
    #[must_use]
    pub fn file_contents(&self, source: &str, variables: &[Variable]) -> FileContents {
        FileContents::from(self.merge(source, variables))
    }
}

/// Merge with default options and codec.
///
/// # Errors
///
/// See [`Merger::merge`].
pub fn merge(source: &str, variables: &[Variable]) -> Result<String, ErrorReport> {
    Merger::<QuickXmlCodec>::default().merge(source, variables)
}

fn complete_namespaces(root: &mut Element) {
    for (attribute, namespace) in REQUIRED_NAMESPACES {
        if !root.has_attribute(attribute) {
            root.set_attribute(attribute, namespace);
        }
    }
}

fn merge_params(root: &mut Element, variables: &[Variable]) {
    if let Some(defs) = root.find_descendant_mut(DEFS) {
        reconcile(defs, variables);
        return;
    }

    let mut defs = Element::new(DEFS);
    reconcile(&mut defs, variables);
    root.children_mut().insert(0, Node::Element(defs));
}

/// Remove-then-append each variable, so the last occurrence of a name
/// wins and ends up after every untouched child.
fn reconcile(defs: &mut Element, variables: &[Variable]) {
    for variable in variables {
        remove_params_named(defs, &variable.name);
        defs.push_child(
            Element::new(PARAM)
                .with_attribute("name", variable.name.as_str())
                .with_attribute("value", variable.value.as_str()),
        );
    }
}

/// Drop matching params at any depth below `parent`.
fn remove_params_named(parent: &mut Element, name: &str) {
    parent.children_mut().retain(|node| !is_param_named(node, name));
    for child in parent.children_mut() {
        if let Node::Element(element) = child {
            remove_params_named(element, name);
        }
    }
}

fn is_param_named(node: &Node, name: &str) -> bool {
    node.as_element()
        .is_some_and(|el| el.local_name() == PARAM && el.attribute("name") == Some(name))
}
