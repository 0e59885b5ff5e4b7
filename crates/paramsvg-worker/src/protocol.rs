//! JSON message protocol between the editor UI and the worker.
//!
//! Kept free of `wasm_bindgen` types so it can be tested natively.

use paramsvg_core::{Extracted, FileContents, MergeOptions, Merger, Variable};
use serde::{Deserialize, Serialize};

/// A request decoded from the `requestJson` message field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Request {
    /// Read the variables out of imported file contents.
    Extract {
        /// Markup fetched from file storage.
        source: String,
    },
    /// Write variables into the current markup.
    Merge {
        /// Markup serialized from the live drawing.
        markup: String,
        /// Variables in the order the UI lists them.
        variables: Vec<Variable>,
        /// Merge configuration; defaults apply when omitted.
        #[serde(default)]
        options: MergeOptions,
    },
}

/// The answer to a [`Request`], encoded into `responseJson`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Response {
    /// Answer to [`Request::Extract`].
    Extracted(Extracted),
    /// Answer to [`Request::Merge`]: a payload or a user-facing error.
    FileContents(FileContents),
}

/// Failures of the protocol itself, as opposed to invalid markup
/// (which is a normal [`Response::FileContents`] with an error set).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum WorkerError {
    /// `requestJson` is not a valid [`Request`].
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The response could not be encoded.
    #[error("failed to encode response: {0}")]
    Encode(String),
}

/// Run a decoded request against the core.
#[must_use]
pub fn handle(request: Request) -> Response {
    match request {
        Request::Extract { source } => Response::Extracted(paramsvg_core::extract(&source)),
        Request::Merge {
            markup,
            variables,
            options,
        } => Response::FileContents(Merger::with_options(options).file_contents(&markup, &variables)),
    }
}

/// Decode `request_json`, handle it and encode the response.
///
/// # Errors
///
/// Returns [`WorkerError::InvalidRequest`] if the request cannot be
/// decoded and [`WorkerError::Encode`] if the response cannot be encoded.
pub fn handle_json(request_json: &str) -> Result<String, WorkerError> {
    let request: Request = serde_json::from_str(request_json)
        .map_err(|e| WorkerError::InvalidRequest(e.to_string()))?;
    log::debug!("handling {} request", request_kind(&request));
    serde_json::to_string(&handle(request)).map_err(|e| WorkerError::Encode(e.to_string()))
}

/// Outcome of one message, ready to post back to the main thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Whether `json` is a [`Response`] (`true`) or a [`WorkerError`].
    pub ok: bool,
    /// The encoded response or error.
    pub json: String,
}

impl Reply {
    /// Name of the message field that carries [`json`](Self::json).
    #[must_use]
    pub const fn field(&self) -> &'static str {
        if self.ok { "responseJson" } else { "errorJson" }
    }
}

impl From<Result<String, WorkerError>> for Reply {
    fn from(result: Result<String, WorkerError>) -> Self {
        match result {
            Ok(json) => Self { ok: true, json },
            Err(err) => Self {
                ok: false,
                json: serde_json::to_string(&err).unwrap_or_else(|_| "\"unknown error\"".into()),
            },
        }
    }
}

const fn request_kind(request: &Request) -> &'static str {
    match request {
        Request::Extract { .. } => "extract",
        Request::Merge { .. } => "merge",
    }
}
