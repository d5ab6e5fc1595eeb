// Upload storage: stored names, thumbnail pipeline, derived URLs.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

/// Pixel bounds of the downscaled copies generated for every upload.
pub const THUMB_SIZES: [u32; 3] = [128, 256, 512];

/// Extensions accepted for storage, after normalizing "jpeg" to "jpg".
const ALLOWED_EXTENSIONS: [&str; 3] = ["png", "jpg", "webp"];

/// Generations a generation image may be bound to.
pub const VALID_GENERATIONS: [f64; 14] = [
    1.0, 2.0, 3.0, 3.5, 4.0, 4.5, 5.0, 5.5, 6.0, 6.5, 7.0, 7.5, 8.0, 9.0,
];

pub fn is_valid_generation(gen: f64) -> bool {
    VALID_GENERATIONS.iter().any(|g| (g - gen).abs() < 1e-9)
}

/// Metadata row for one stored upload.
#[derive(Debug, Clone, Serialize)]
pub struct ImageRecord {
    pub id: i64,
    pub filename: String,
    pub original_name: Option<String>,
    pub file_size: i64,
    pub file_type: Option<String>,
    pub upload_time: String,
}

/// An image bound to a character generation for the gallery page.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationImage {
    pub id: i64,
    pub gen: f64,
    pub filename: String,
    /// Display URL chosen at upload time (512 thumbnail when available).
    pub url: String,
    pub created_at: String,
}

/// Determine the stored extension for an upload: the filename's own extension
/// when it is allowed, else a mapping from the declared MIME type. HEIC
/// sources get "jpg" since their derived copies are JPEG anyway. Returns
/// `None` when neither source yields an allowed extension.
pub fn infer_extension(filename: &str, content_type: Option<&str>) -> Option<String> {
    if let Some((_, ext)) = filename.rsplit_once('.') {
        let ext = ext.to_lowercase();
        let ext = if ext == "jpeg" { "jpg".to_string() } else { ext };
        if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
            return Some(ext);
        }
    }
    match content_type? {
        "image/png" => Some("png".to_string()),
        "image/jpeg" | "image/jpg" => Some("jpg".to_string()),
        "image/webp" => Some("webp".to_string()),
        "image/heic" | "image/heif" => Some("jpg".to_string()),
        _ => None,
    }
}

/// Fresh stored filename for an upload: `<uuid-hex>_orig.<ext>`.
pub fn stored_filename(ext: &str) -> String {
    format!("{}_orig.{}", Uuid::new_v4().simple(), ext)
}

/// Derive the thumbnail filename for a stored original. Returns `None` when
/// the stored name does not follow the `<uid>_orig.<ext>` convention.
pub fn thumb_name(filename: &str, size: u32) -> Option<String> {
    let (base, _) = filename.split_once("_orig.")?;
    Some(format!("{base}_{size}.jpg"))
}

/// Public URL under which the uploads directory serves a file.
pub fn upload_url(filename: &str) -> String {
    format!("/uploads/{filename}")
}

/// Per-size display URLs for a stored image. Names outside the stored-name
/// convention fall back to the original URL for every size.
#[derive(Debug, Clone, Serialize)]
pub struct ImageUrls {
    pub url: String,
    pub thumb_128: String,
    pub thumb_256: String,
    pub thumb_512: String,
}

pub fn derived_urls(filename: &str) -> ImageUrls {
    let original = upload_url(filename);
    let thumb = |size: u32| {
        thumb_name(filename, size)
            .map(|name| upload_url(&name))
            .unwrap_or_else(|| original.clone())
    };
    ImageUrls {
        thumb_128: thumb(128),
        thumb_256: thumb(256),
        thumb_512: thumb(512),
        url: original,
    }
}

/// Thumbnailing knobs. Avatars use a higher JPEG quality and clamp oversized
/// sources before resizing.
#[derive(Debug, Clone, Copy)]
pub struct ThumbnailOptions {
    pub jpeg_quality: u8,
    pub max_source_dim: Option<u32>,
}

impl Default for ThumbnailOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 85,
            max_source_dim: None,
        }
    }
}

/// Options for character avatar uploads.
pub const AVATAR_OPTIONS: ThumbnailOptions = ThumbnailOptions {
    jpeg_quality: 88,
    max_source_dim: Some(2048),
};

/// Outcome of storing one upload: the stored original name plus the sizes
/// whose thumbnails were actually written.
#[derive(Debug, Clone)]
pub struct StoredUpload {
    pub filename: String,
    pub generated_sizes: Vec<u32>,
}

impl StoredUpload {
    /// Response URL map: "original" plus one entry per generated size.
    pub fn urls(&self) -> BTreeMap<String, String> {
        let mut urls = BTreeMap::new();
        urls.insert("original".to_string(), upload_url(&self.filename));
        for size in &self.generated_sizes {
            if let Some(name) = thumb_name(&self.filename, *size) {
                urls.insert(size.to_string(), upload_url(&name));
            }
        }
        urls
    }

    /// Display URL: the 512 thumbnail when it was generated, else the
    /// stored original.
    pub fn display_url(&self) -> String {
        if self.generated_sizes.contains(&512) {
            if let Some(name) = thumb_name(&self.filename, 512) {
                return upload_url(&name);
            }
        }
        upload_url(&self.filename)
    }
}

/// Write an upload into `dir` under a fresh stored name and generate the
/// downscaled JPEG copies. Thumbnailing is best-effort: a source that cannot
/// be decoded (HEIC, corrupt data) leaves the original usable with no
/// thumbnails, and per-size write failures skip only that size.
pub fn store_upload(
    dir: &Path,
    ext: &str,
    data: &[u8],
    opts: &ThumbnailOptions,
) -> Result<StoredUpload> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create uploads directory {}", dir.display()))?;

    let filename = stored_filename(ext);
    let path = dir.join(&filename);
    fs::write(&path, data).with_context(|| format!("failed to write upload {}", path.display()))?;

    let generated_sizes = match image::load_from_memory(data) {
        Ok(img) => write_thumbnails(dir, &filename, img, opts),
        Err(err) => {
            tracing::warn!("could not decode {filename} for thumbnails: {err}");
            Vec::new()
        }
    };

    Ok(StoredUpload {
        filename,
        generated_sizes,
    })
}

fn write_thumbnails(
    dir: &Path,
    filename: &str,
    mut img: image::DynamicImage,
    opts: &ThumbnailOptions,
) -> Vec<u32> {
    if let Some(max_dim) = opts.max_source_dim {
        if img.width() > max_dim || img.height() > max_dim {
            img = img.thumbnail(max_dim, max_dim);
        }
    }

    let mut generated = Vec::new();
    for size in THUMB_SIZES {
        let Some(name) = thumb_name(filename, size) else {
            continue;
        };
        match write_one_thumbnail(&dir.join(&name), &img, size, opts.jpeg_quality) {
            Ok(()) => generated.push(size),
            Err(err) => {
                tracing::warn!("failed to write {size}px thumbnail for {filename}: {err:#}");
            }
        }
    }
    generated
}

fn write_one_thumbnail(
    path: &Path,
    img: &image::DynamicImage,
    size: u32,
    quality: u8,
) -> Result<()> {
    // Bounded resize preserving aspect ratio; JPEG output requires RGB.
    let thumb = img.thumbnail(size, size).to_rgb8();
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create thumbnail {}", path.display()))?;
    let mut writer = std::io::BufWriter::new(file);
    let encoder = image::codecs::jpeg::JpegEncoder::new_with_quality(&mut writer, quality);
    thumb
        .write_with_encoder(encoder)
        .with_context(|| format!("failed to encode thumbnail {}", path.display()))?;
    Ok(())
}

/// Remove a stored original and its derived thumbnails. Missing files are
/// ignored; the metadata row is the caller's concern.
pub fn remove_stored_files(dir: &Path, filename: &str) {
    let _ = fs::remove_file(dir.join(filename));
    for size in THUMB_SIZES {
        if let Some(name) = thumb_name(filename, size) {
            let _ = fs::remove_file(dir.join(name));
        }
    }
}
