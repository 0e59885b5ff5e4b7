//! Error types.
//!
//! [`ParseError`] is the structured failure reported by the XML codec.
//! [`MergeError`] wraps it for the merger. Neither is shown to users
//! directly: the UI receives an [`ErrorReport`], a fixed, actionable
//! message that deliberately discards parser diagnostics.

use serde::{Deserialize, Serialize};

/// Why a piece of markup could not be parsed.
///
/// Positions are byte offsets into the source text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The underlying tokenizer rejected the input.
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: usize, message: String },

    /// An element or attribute name is not a valid XML name.
    #[error("invalid XML name `{name}` at byte {position}")]
    InvalidName { position: usize, name: String },

    /// A closing tag with no matching open element.
    #[error("unexpected closing tag `</{found}>` at byte {position}")]
    UnexpectedClose { position: usize, found: String },

    /// A closing tag that does not match the innermost open element.
    #[error("expected `</{expected}>` but found `</{found}>` at byte {position}")]
    MismatchedClose {
        position: usize,
        expected: String,
        found: String,
    },

    /// The input ended while an element was still open.
    #[error("element `<{name}>` is never closed")]
    Unclosed { name: String },

    /// Non-whitespace character data before or after the root element.
    #[error("text outside the root element at byte {position}")]
    TextOutsideRoot { position: usize },

    /// A second top-level element.
    #[error("second root element `<{name}>` at byte {position}")]
    MultipleRoots { position: usize, name: String },

    /// The input contains no element at all.
    #[error("document has no root element")]
    NoRoot,
}

/// Errors that can occur while merging variables into markup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// The markup is not well-formed XML.
    #[error("failed to parse markup: {0}")]
    Parse(#[from] ParseError),
}

/// Message shown when markup cannot be parsed.
pub const INVALID_MARKUP_MESSAGE: &str = "Uh-oh! We can’t serialize the contents of your SVG. \
    Make sure it’s valid XML. If you need help, you can copy the markup \
    and paste it into an online validator.";

/// Label of the button attached to [`INVALID_MARKUP_MESSAGE`].
pub const INVALID_MARKUP_BUTTON_TEXT: &str = "Validate your markup";

/// Where the button attached to [`INVALID_MARKUP_MESSAGE`] leads.
pub const INVALID_MARKUP_BUTTON_URL: &str = "https://xmlvalidation.com/";

/// A user-facing error with an actionable button, rendered by the UI as
/// a toast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReport {
    /// Human-readable explanation.
    pub message: String,
    /// Button label.
    pub button_text: String,
    /// Button target.
    pub button_url: String,
    /// Whether the button opens its URL in a new tab.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_in_new_tab: Option<bool>,
}

impl ErrorReport {
    /// The report emitted for markup that is not well-formed XML.
    #[must_use]
    pub fn invalid_markup() -> Self {
        Self {
            message: INVALID_MARKUP_MESSAGE.to_string(),
            button_text: INVALID_MARKUP_BUTTON_TEXT.to_string(),
            button_url: INVALID_MARKUP_BUTTON_URL.to_string(),
            open_in_new_tab: Some(true),
        }
    }
}

impl From<&MergeError> for ErrorReport {
    fn from(err: &MergeError) -> Self {
        match err {
            MergeError::Parse(_) => Self::invalid_markup(),
        }
    }
}

impl From<MergeError> for ErrorReport {
    fn from(err: MergeError) -> Self {
        Self::from(&err)
    }
}
