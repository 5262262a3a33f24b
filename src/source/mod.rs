//! Remote sprite sources.
//!
//! Sprites are fetched from an ordered list of URL templates (highest quality
//! first). The [`SourceResolver`] tries each template in turn and returns the
//! first payload that decodes as a well-formed image; exhausting every source
//! is a normal outcome, not an error.

mod http;
mod resolver;
mod types;

pub use http::ReqwestFetcher;
pub(crate) use resolver::validate_image;
pub use resolver::{SourceResolver, DEFAULT_SOURCE_TEMPLATES, ID_PLACEHOLDER};
pub use types::{SourceError, SpriteFetch};
