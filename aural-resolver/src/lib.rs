//! Turns a user-supplied reference into concrete metadata and a
//! short-lived stream URL by invoking an external extractor, behind a
//! canonicalization step the cache uses as its key.

mod canonical;
mod error;
mod extractor;

pub use canonical::canonicalize;
pub use error::{Result, ResolverError};
pub use extractor::{ExternalExtractorResolver, ExtractorConfig, PlaylistEntryRef, Resolution, Resolve};
