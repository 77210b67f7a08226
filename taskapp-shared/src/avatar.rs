/// Avatar upload checks and image normalization
///
/// An upload is accepted when it is at most [`AVATAR_MAX_BYTES`] long and its
/// original filename ends in `.jpg`, `.jpeg` or `.png` (case-sensitive). The
/// image is then cropped and scaled to [`AVATAR_SIZE`]×[`AVATAR_SIZE`] and
/// re-encoded as PNG; only the normalized bytes are ever stored.
///
/// # Example
///
/// ```no_run
/// use taskapp_shared::avatar::{check_upload, normalize};
///
/// # fn example(filename: &str, bytes: &[u8]) -> Result<(), taskapp_shared::avatar::AvatarError> {
/// check_upload(filename, bytes.len())?;
/// let png = normalize(bytes)?;
/// # let _ = png;
/// # Ok(())
/// # }
/// ```

use image::{imageops::FilterType, ImageFormat};
use std::io::Cursor;

/// Largest accepted upload, in bytes
pub const AVATAR_MAX_BYTES: usize = 1_000_000;

/// Edge length of the stored square avatar, in pixels
pub const AVATAR_SIZE: u32 = 250;

/// Content type of every stored avatar
pub const AVATAR_CONTENT_TYPE: &str = "image/png";

const ALLOWED_EXTENSIONS: [&str; 3] = [".jpg", ".jpeg", ".png"];

#[derive(Debug, thiserror::Error)]
pub enum AvatarError {
    #[error("File too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("Please upload jpg, jpeg, or png")]
    UnsupportedType,

    #[error("Could not read image: {0}")]
    Decode(String),

    #[error("Could not encode avatar: {0}")]
    Encode(String),
}

/// Checks size and filename before any decoding happens
pub fn check_upload(filename: &str, size: usize) -> Result<(), AvatarError> {
    if size > AVATAR_MAX_BYTES {
        return Err(AvatarError::TooLarge {
            size,
            limit: AVATAR_MAX_BYTES,
        });
    }

    if !ALLOWED_EXTENSIONS.iter().any(|ext| filename.ends_with(ext)) {
        return Err(AvatarError::UnsupportedType);
    }

    Ok(())
}

/// Decodes an uploaded image and returns it as a square PNG
///
/// CPU bound; call from `spawn_blocking` in async code.
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>, AvatarError> {
    let image = image::load_from_memory(bytes).map_err(|e| AvatarError::Decode(e.to_string()))?;
    let resized = image.resize_to_fill(AVATAR_SIZE, AVATAR_SIZE, FilterType::Triangle);

    let mut out = Cursor::new(Vec::new());
    resized
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| AvatarError::Encode(e.to_string()))?;

    Ok(out.into_inner())
}
