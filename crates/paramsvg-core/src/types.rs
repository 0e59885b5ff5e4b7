//! Shared types exchanged with the editor UI.

use serde::{Deserialize, Serialize};

use crate::error::ErrorReport;

/// A named value bound into a drawing via `<param name="..." value="..."/>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Parameter name, the key used to reconcile with existing params.
    pub name: String,
    /// Parameter value, kept as text.
    pub value: String,
}

impl Variable {
    /// Create a new variable.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for Variable {
    fn from((name, value): (N, V)) -> Self {
        Self::new(name, value)
    }
}

/// Result of reading a drawing: the untouched source and its variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extracted {
    /// The input markup, verbatim.
    pub source: String,
    /// Variables in document order.
    pub variables: Vec<Variable>,
}

/// Outcome of a merge in the shape the UI listener expects.
///
/// Exactly one of `payload` and `error` is set. Both keys are always
/// serialized, the absent one as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileContents {
    /// Serialized markup ready for display or upload.
    pub payload: Option<String>,
    /// Error to surface instead of a payload.
    pub error: Option<ErrorReport>,
}

impl FileContents {
    /// Convert back into a `Result`.
    ///
    /// A value with neither field set (only possible through
    /// deserialization) is treated as the invalid-markup error.
    ///
    /// # Errors
    ///
    /// Returns the carried [`ErrorReport`] when `error` is set.
    pub fn into_result(self) -> Result<String, ErrorReport> {
        match (self.payload, self.error) {
            (_, Some(error)) => Err(error),
            (Some(payload), None) => Ok(payload),
            (None, None) => Err(ErrorReport::invalid_markup()),
        }
    }
}

impl From<Result<String, ErrorReport>> for FileContents {
    fn from(result: Result<String, ErrorReport>) -> Self {
        match result {
            Ok(payload) => Self {
                payload: Some(payload),
                error: None,
            },
            Err(error) => Self {
                payload: None,
                error: Some(error),
            },
        }
    }
}
