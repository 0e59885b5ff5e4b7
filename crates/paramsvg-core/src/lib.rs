//! paramsvg-core: Pure variable extraction and merging for parametric
//! SVG drawings (sans-IO).
//!
//! A parametric drawing declares its variables inside `<defs>`:
//!
//! ```xml
//! <svg xmlns="http://www.w3.org/2000/svg" xmlns:parametric="//parametric-svg.js.org/v1">
//!   <defs>
//!     <param name="width" value="100"/>
//!   </defs>
//!   <rect parametric:width="width"/>
//! </svg>
//! ```
//!
//! Two symmetrical operations work on that markup:
//!
//! - [`extract`] reads the `<param>` bindings into an ordered list of
//!   [`Variable`]s (used when importing a file).
//! - [`merge`] writes a list of variables back, reconciling existing
//!   params by name (used on every edit and on export).
//!
//! Both parse through an injected [`XmlCodec`], hold no state between
//! calls and do no I/O. All browser and filesystem interaction lives in
//! `paramsvg-worker` and `paramsvg-cli`.

pub mod codec;
pub mod document;
pub mod error;
pub mod extract;
pub mod merge;
pub mod types;

pub use codec::{Layout, QuickXmlCodec, XmlCodec, format};
pub use document::{Attribute, Document, Element, Node};
pub use error::{ErrorReport, MergeError, ParseError};
pub use extract::{Extractor, extract};
pub use merge::{MergeOptions, Merger, PARAMETRIC_NAMESPACE, SVG_NAMESPACE, merge};
pub use types::{Extracted, FileContents, Variable};
