//! Owned XML document tree.
//!
//! A [`Document`] is produced by an [`XmlCodec`](crate::codec::XmlCodec),
//! mutated in place by the merger, and handed back to the codec for
//! serialization. Each call owns its own tree; nothing is cached between
//! calls.
//!
//! Element and attribute names are stored as written (qualified, with
//! any prefix). Namespace prefixes are not resolved: lookups that care
//! about element identity compare [`Element::local_name`].

/// A parsed XML document: optional prolog, exactly one root element,
/// optional epilog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Nodes before the root element (XML declaration, doctype,
    /// comments, processing instructions).
    pub prolog: Vec<Node>,

    /// The document element.
    pub root: Element,

    /// Comments and processing instructions after the root element.
    pub epilog: Vec<Node>,
}

impl Document {
    /// Create a document consisting of a single root element.
    #[must_use]
    pub const fn new(root: Element) -> Self {
        Self {
            prolog: Vec::new(),
            root,
            epilog: Vec::new(),
        }
    }
}

/// A node in the document tree.
///
/// Textual payloads are stored exactly as they appeared in the source
/// (still escaped), so serializing an untouched node reproduces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data, raw (entity references are not expanded).
    Text(String),
    /// Contents of a `<![CDATA[...]]>` section.
    CData(String),
    /// Contents of a `<!--...-->` comment.
    Comment(String),
    /// Contents of a `<?...?>` processing instruction.
    ProcessingInstruction(String),
    /// Contents of the `<?xml ...?>` declaration.
    Declaration(String),
    /// Contents of a `<!DOCTYPE ...>` declaration.
    DocType(String),
}

impl Node {
    /// Returns the element if this node is one.
    #[must_use]
    pub const fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Returns `true` for text nodes that contain only XML whitespace.
    #[must_use]
    pub fn is_blank_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.trim().is_empty())
    }
}

impl From<Element> for Node {
    fn from(el: Element) -> Self {
        Self::Element(el)
    }
}

/// A single attribute with its value already unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified attribute name, e.g. `xmlns:parametric`.
    pub name: String,
    /// Decoded attribute value.
    pub value: String,
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<Attribute>,
    children: Vec<Node>,
}

impl Element {
    /// Create an empty element with the given qualified name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder-style [`set_attribute`](Self::set_attribute).
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(name, value);
        self
    }

    /// Qualified name as written in the source.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name with any namespace prefix removed.
    #[must_use]
    pub fn local_name(&self) -> &str {
        self.name
            .split_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }

    /// Attributes in source order.
    #[must_use]
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Value of the attribute with exactly this qualified name.
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Returns `true` if an attribute with this qualified name exists.
    #[must_use]
    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|attr| attr.name == name)
    }

    /// Set an attribute, replacing the value in place if it already
    /// exists, otherwise appending it after the existing attributes.
    pub fn set_attribute(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|attr| attr.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(Attribute { name, value }),
        }
    }

    /// Child nodes in document order.
    #[must_use]
    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Mutable access to the child list.
    pub const fn children_mut(&mut self) -> &mut Vec<Node> {
        &mut self.children
    }

    /// Append a child node.
    pub fn push_child(&mut self, node: impl Into<Node>) {
        self.children.push(node.into());
    }

    /// Iterate over child elements, skipping text and other nodes.
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(Node::as_element)
    }

    /// Returns `true` if any child is non-blank text or CDATA.
    ///
    /// Such elements have mixed content and must not be re-indented.
    #[must_use]
    pub fn has_text_content(&self) -> bool {
        self.children.iter().any(|node| match node {
            Node::Text(text) => !text.trim().is_empty(),
            Node::CData(_) => true,
            _ => false,
        })
    }

    /// First descendant element (pre-order, excluding `self`) whose
    /// local name matches.
    #[must_use]
    pub fn find_descendant(&self, local_name: &str) -> Option<&Self> {
        for child in self.child_elements() {
            if child.local_name() == local_name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(local_name) {
                return Some(found);
            }
        }
        None
    }

    /// Mutable variant of [`find_descendant`](Self::find_descendant).
    pub fn find_descendant_mut(&mut self, local_name: &str) -> Option<&mut Self> {
        for child in &mut self.children {
            if let Node::Element(el) = child {
                if el.local_name() == local_name {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant_mut(local_name) {
                    return Some(found);
                }
            }
        }
        None
    }
}
