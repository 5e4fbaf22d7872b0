//! Bleeter header image processing.
//!
//! Uploaded images are downscaled and re-encoded as lossless WebP, and a tiny
//! blurred PNG is produced as an inline placeholder for clients to show while
//! the full image loads.

use std::{
    io::Cursor,
    path::PathBuf,
};

use base64::{Engine, engine::general_purpose::STANDARD};
use image::{DynamicImage, GenericImageView, ImageFormat, codecs::webp::WebPEncoder, imageops::FilterType};

use crate::error::UploadError;

/// MIME types accepted for header images.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/gif", "image/jpeg", "image/webp"];

/// Upper bound on a single uploaded image.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

const MAX_WIDTH: u32 = 1920;
const PLACEHOLDER_SIZE: u32 = 16;
const PLACEHOLDER_SIGMA: f32 = 2.0;

pub fn is_allowed_image_type(mime: &str) -> bool {
    ALLOWED_IMAGE_TYPES.contains(&mime)
}

/// A web-ready image and its blur placeholder.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    /// File name on disk, also stored as the post's `image_id`
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// `data:image/png;base64,...`
    pub blur_data: String,
}

/// Decodes `raw`, downsizes it to at most [`MAX_WIDTH`] wide and encodes it as WebP.
pub fn encode_for_web(stem: &str, raw: &[u8]) -> Result<EncodedImage, UploadError> {
    let img = image::load_from_memory(raw).map_err(UploadError::Decode)?;

    let (width, height) = img.dimensions();
    let img = if width > MAX_WIDTH {
        img.resize(MAX_WIDTH, height, FilterType::Lanczos3)
    } else {
        img
    };

    // The lossless WebP encoder only takes 8-bit buffers
    let rgba = DynamicImage::ImageRgba8(img.to_rgba8());
    let mut bytes = Vec::new();
    rgba.write_with_encoder(WebPEncoder::new_lossless(&mut bytes))
        .map_err(UploadError::Encode)?;

    let blur_data = blur_placeholder(&rgba)?;

    Ok(EncodedImage {
        file_name: format!("{stem}.webp"),
        bytes,
        blur_data,
    })
}

/// [`encode_for_web`] on the blocking pool.
pub async fn encode_for_web_blocking(stem: String, raw: Vec<u8>) -> Result<EncodedImage, UploadError> {
    tokio::task::spawn_blocking(move || encode_for_web(&stem, &raw)).await?
}

fn blur_placeholder(img: &DynamicImage) -> Result<String, UploadError> {
    let tiny = img
        .thumbnail(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE)
        .blur(PLACEHOLDER_SIGMA);

    let mut png = Vec::new();
    tiny.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(UploadError::Encode)?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

/// Directory that holds the encoded bleeter images.
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, file_name: &str) -> PathBuf {
        self.root.join(file_name)
    }

    /// Writes the encoded image, creating the directory on first use.
    pub async fn write(&self, image: &EncodedImage) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&image.file_name);
        tokio::fs::write(&path, &image.bytes).await?;
        Ok(path)
    }

    /// Removes an image; a missing file is not an error.
    pub async fn remove(&self, file_name: &str) -> std::io::Result<()> {
        match tokio::fs::remove_file(self.path_for(file_name)).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}
