//! Signed-document PDF composition.
//!
//! Given signer metadata and a drawn signature, either stamps a signature
//! block onto an existing PDF or, when there is none, composes a standalone
//! signing certificate. See [`GenerationContext`] for the entry point.

pub mod augment;
pub mod certificate;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fetch;
pub mod imaging;
pub mod layout;
pub mod overlay;
pub mod signature;

pub use config::{FetchFailurePolicy, GenerationConfig};
pub use dispatch::{generate_signed_document, GenerationContext};
pub use error::{Result, SignError};
pub use fetch::{AnySource, DocumentSource, FileSource, HttpFetcher};
pub use imaging::SignatureImage;
pub use signature::{safe_file_stem, signed_filename, AuditEntry, SignatureInfo};
