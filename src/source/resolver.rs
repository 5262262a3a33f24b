//! Ordered multi-source sprite resolution.

use super::types::{SourceError, SpriteFetch};
use crate::entity::EntityId;
use tracing::{debug, trace};

/// Placeholder substituted with the entity id in source URL templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default sprite URL templates, highest quality first.
pub const DEFAULT_SOURCE_TEMPLATES: [&str; 3] = [
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/official-artwork/{id}.png",
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/other/home/{id}.png",
    "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon/{id}.png",
];

/// Resolves an entity id to image bytes by trying sources in priority order.
///
/// Each template has the id substituted in and is fetched in turn. A source
/// that is unreachable, returns an error status, or returns bytes that do
/// not decode as an image is skipped with a debug log and the next source is
/// tried. The first source yielding a valid image wins.
///
/// Exhausting every source is a normal outcome (many ids have no art at some
/// quality tiers) and is reported as `None`, not an error. There are no
/// retries within a single source; retrying is the caller's concern.
pub struct SourceResolver<C: SpriteFetch> {
    templates: Vec<String>,
    client: C,
}

impl<C: SpriteFetch> SourceResolver<C> {
    /// Creates a resolver over the given templates, in priority order.
    ///
    /// Each template must contain the `{id}` placeholder.
    pub fn new(templates: Vec<String>, client: C) -> Self {
        Self { templates, client }
    }

    /// Creates a resolver over the default sprite sources.
    pub fn with_default_sources(client: C) -> Self {
        Self::new(
            DEFAULT_SOURCE_TEMPLATES
                .iter()
                .map(|t| t.to_string())
                .collect(),
            client,
        )
    }

    /// Returns the number of configured sources.
    pub fn source_count(&self) -> usize {
        self.templates.len()
    }

    /// Resolves an id to validated image bytes.
    ///
    /// Returns `Some(bytes)` from the first source whose payload decodes as
    /// a well-formed image, or `None` once every source is exhausted.
    pub async fn resolve(&self, id: &EntityId) -> Option<Vec<u8>> {
        for template in &self.templates {
            let url = template.replace(ID_PLACEHOLDER, id.as_str());

            match self.client.get(&url).await {
                Ok(bytes) => match validate_image(&bytes) {
                    Ok(()) => {
                        trace!(id = %id, url = url, bytes = bytes.len(), "sprite resolved");
                        return Some(bytes);
                    }
                    Err(e) => {
                        debug!(id = %id, url = url, error = %e, "source returned invalid image, trying next");
                    }
                },
                Err(e) => {
                    debug!(id = %id, url = url, error = %e, "source fetch failed, trying next");
                }
            }
        }

        debug!(id = %id, sources = self.templates.len(), "all sources exhausted, no sprite");
        None
    }
}

/// Checks that a payload decodes as a well-formed image.
pub(crate) fn validate_image(bytes: &[u8]) -> Result<(), SourceError> {
    image::load_from_memory(bytes)
        .map(|_| ())
        .map_err(|e| SourceError::InvalidImage(e.to_string()))
}
