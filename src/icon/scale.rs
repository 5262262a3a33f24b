//! Sprite decoding and scaling.

use crate::entity::EntityId;
use image::imageops::FilterType;
use image::RgbaImage;

/// A decoded sprite pre-scaled to a target size.
///
/// Entries are immutable once built; the icon cache hands out shared handles
/// to the same entry for repeated requests.
#[derive(Debug, Clone)]
pub struct ScaledSprite {
    id: EntityId,
    size: u32,
    image: RgbaImage,
}

impl ScaledSprite {
    /// Returns the entity id this sprite belongs to.
    pub fn id(&self) -> &EntityId {
        &self.id
    }

    /// Returns the target size the sprite was scaled to.
    pub fn size(&self) -> u32 {
        self.size
    }

    /// Returns the scaled pixel data.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Decodes raw sprite bytes and scales them to `size` x `size`.
///
/// Uses Lanczos3 resampling for smooth downscaling of artwork.
pub fn scale_sprite(
    id: &EntityId,
    bytes: &[u8],
    size: u32,
) -> Result<ScaledSprite, image::ImageError> {
    let decoded = image::load_from_memory(bytes)?;
    let image = decoded.resize_exact(size, size, FilterType::Lanczos3).to_rgba8();
    Ok(ScaledSprite {
        id: id.clone(),
        size,
        image,
    })
}
