// Media endpoints: image uploads, listing, generation images, avatars.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::media::{
    self, derived_urls, infer_extension, is_valid_generation, GenerationImage, ImageRecord,
    ThumbnailOptions, AVATAR_OPTIONS, VALID_GENERATIONS,
};
use crate::server::error::ApiError;
use crate::server::AppState;

/// Hard cap on character avatar uploads, checked before any pixel work.
const AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

fn bad_multipart(err: MultipartError) -> ApiError {
    ApiError::BadRequest(format!("invalid multipart payload: {err}"))
}

fn invalid_generation() -> ApiError {
    let valid = VALID_GENERATIONS
        .iter()
        .map(|g| {
            if g.fract() == 0.0 {
                format!("{}", *g as i64)
            } else {
                format!("{g}")
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    ApiError::BadRequest(format!("gen must be one of {valid}"))
}

/// One multipart file part, buffered in memory.
struct UploadedFile {
    file_name: Option<String>,
    content_type: Option<String>,
    data: Bytes,
}

impl UploadedFile {
    /// The allowed storage extension, from the filename else the MIME type.
    fn extension(&self) -> Result<String, ApiError> {
        let name = self
            .file_name
            .as_deref()
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::BadRequest("no file selected".to_string()))?;
        infer_extension(name, self.content_type.as_deref())
            .ok_or_else(|| ApiError::BadRequest("unsupported file type".to_string()))
    }

    /// Name to record as the upload's original filename.
    fn original_name(&self, ext: &str) -> String {
        match self.file_name.as_deref().filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => format!("upload.{ext}"),
        }
    }
}

/// Collected multipart form: text fields by name plus the "file" part.
#[derive(Default)]
struct UploadForm {
    file: Option<UploadedFile>,
    gen: Option<String>,
    cid: Option<String>,
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let data = field.bytes().await.map_err(bad_multipart)?;
                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            Some("gen") => {
                let value = field.text().await.map_err(bad_multipart)?;
                if !value.is_empty() {
                    form.gen = Some(value);
                }
            }
            Some("cid") => {
                let value = field.text().await.map_err(bad_multipart)?;
                if !value.is_empty() {
                    form.cid = Some(value);
                }
            }
            // Accepted alias for cid; an explicit cid field wins.
            Some("character_id") => {
                let value = field.text().await.map_err(bad_multipart)?;
                if form.cid.is_none() && !value.is_empty() {
                    form.cid = Some(value);
                }
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Run the blocking store-and-thumbnail pipeline off the async executor.
async fn store_in_background(
    dir: std::path::PathBuf,
    ext: String,
    data: Bytes,
    opts: ThumbnailOptions,
) -> Result<media::StoredUpload, ApiError> {
    let stored = tokio::task::spawn_blocking(move || media::store_upload(&dir, &ext, &data, &opts))
        .await
        .map_err(|err| anyhow::anyhow!("upload task failed: {err}"))??;
    Ok(stored)
}

// ---------------------------------------------------------------------------
// Image library
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ImageListQuery {
    page: Option<String>,
    page_size: Option<String>,
}

/// Page number, page size, and row offset from the raw query strings.
///
/// Non-numeric values reset both knobs to their defaults. The offset
/// saturates, so a page number past the data reads as an empty page
/// instead of wrapping.
fn paging(query: &ImageListQuery) -> (i64, i64, i64) {
    let (page, page_size) = match (
        query.page.as_deref().unwrap_or("1").parse::<i64>(),
        query.page_size.as_deref().unwrap_or("30").parse::<i64>(),
    ) {
        (Ok(page), Ok(page_size)) => (page.max(1), page_size.clamp(1, 100)),
        _ => (1, 30),
    };
    let offset = page.saturating_sub(1).saturating_mul(page_size);
    (page, page_size, offset)
}

#[derive(Serialize)]
pub struct ImageListResponse {
    total: i64,
    page: i64,
    page_size: i64,
    items: Vec<ImageItem>,
}

#[derive(Serialize)]
struct ImageItem {
    id: i64,
    filename: String,
    original_name: Option<String>,
    file_size: i64,
    file_type: Option<String>,
    upload_time: String,
    url: String,
    thumb_128: String,
    thumb_256: String,
    thumb_512: String,
}

impl From<ImageRecord> for ImageItem {
    fn from(record: ImageRecord) -> Self {
        let urls = derived_urls(&record.filename);
        Self {
            id: record.id,
            filename: record.filename,
            original_name: record.original_name,
            file_size: record.file_size,
            file_type: record.file_type,
            upload_time: record.upload_time,
            url: urls.url,
            thumb_128: urls.thumb_128,
            thumb_256: urls.thumb_256,
            thumb_512: urls.thumb_512,
        }
    }
}

pub async fn list_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ImageListQuery>,
) -> Result<Json<ImageListResponse>, ApiError> {
    let (page, page_size, offset) = paging(&query);

    let total = state.db.count_images()?;
    let items = state
        .db
        .list_images(page_size, offset)?
        .into_iter()
        .map(ImageItem::from)
        .collect();

    Ok(Json(ImageListResponse {
        total,
        page,
        page_size,
        items,
    }))
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_upload_form(multipart).await?;
    let Some(file) = form.file else {
        return Err(ApiError::BadRequest("no file provided".to_string()));
    };
    let ext = file.extension()?;

    let file_size = file.data.len() as i64;
    let original_name = file.original_name(&ext);
    let content_type = file.content_type.clone();

    let stored = store_in_background(
        state.uploads_dir(),
        ext,
        file.data,
        ThumbnailOptions::default(),
    )
    .await?;

    state.db.insert_image(
        &stored.filename,
        Some(&original_name),
        file_size,
        content_type.as_deref(),
    )?;

    Ok(Json(
        serde_json::json!({ "success": true, "urls": stored.urls() }),
    ))
}

pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(record) = state.db.get_image(id)? else {
        return Err(ApiError::NotFound("image not found".to_string()));
    };

    state.db.delete_image(id)?;
    media::remove_stored_files(&state.uploads_dir(), &record.filename);
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Generation images
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct GenerationListQuery {
    gen: Option<String>,
}

pub async fn list_generation_images(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerationListQuery>,
) -> Result<Json<Vec<GenerationImage>>, ApiError> {
    // A non-numeric gen filter yields an empty list.
    let images = match query.gen.as_deref().filter(|g| !g.is_empty()) {
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(gen) => state.db.list_generation_images(Some(gen))?,
            Err(_) => Vec::new(),
        },
        None => state.db.list_generation_images(None)?,
    };
    Ok(Json(images))
}

pub async fn upload_generation_image(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GenerationListQuery>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_upload_form(multipart).await?;

    // gen may arrive as a form field or a query parameter.
    let Some(gen_raw) = form.gen.or(query.gen) else {
        return Err(ApiError::BadRequest("gen is required".to_string()));
    };
    let gen: f64 = gen_raw.trim().parse().map_err(|_| invalid_generation())?;
    if !is_valid_generation(gen) {
        return Err(invalid_generation());
    }

    let Some(file) = form.file else {
        return Err(ApiError::BadRequest("no file provided".to_string()));
    };
    let ext = file.extension()?;

    let file_size = file.data.len() as i64;
    let original_name = file.original_name(&ext);
    let content_type = file.content_type.clone();

    let stored = store_in_background(
        state.uploads_dir(),
        ext,
        file.data,
        ThumbnailOptions::default(),
    )
    .await?;
    let url = stored.display_url();

    state.db.insert_image(
        &stored.filename,
        Some(&original_name),
        file_size,
        content_type.as_deref(),
    )?;
    state
        .db
        .insert_generation_image(gen, &stored.filename, &url)?;

    Ok(Json(serde_json::json!({ "success": true, "url": url })))
}

pub async fn delete_generation_image(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(record) = state.db.get_generation_image(id)? else {
        return Err(ApiError::NotFound("generation image not found".to_string()));
    };

    state.db.delete_generation_image(id)?;
    media::remove_stored_files(&state.uploads_dir(), &record.filename);
    Ok(Json(serde_json::json!({ "success": true })))
}

// ---------------------------------------------------------------------------
// Character avatars
// ---------------------------------------------------------------------------

pub async fn upload_character_avatar(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let form = read_upload_form(multipart).await?;

    let Some(cid_raw) = form.cid else {
        return Err(ApiError::BadRequest("character id is required".to_string()));
    };
    let cid: i64 = cid_raw
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("invalid character id".to_string()))?;

    let Some(file) = form.file else {
        return Err(ApiError::BadRequest("no file provided".to_string()));
    };
    if file.data.len() > AVATAR_MAX_BYTES {
        return Err(ApiError::BadRequest(
            "file exceeds the 5 MB limit".to_string(),
        ));
    }
    let ext = file.extension()?;

    if state.db.get_character(cid)?.is_none() {
        return Err(ApiError::NotFound("character not found".to_string()));
    }

    let file_size = file.data.len() as i64;
    let original_name = file.original_name(&ext);
    let content_type = file.content_type.clone();

    let stored = store_in_background(state.uploads_dir(), ext, file.data, AVATAR_OPTIONS).await?;
    let url = stored.display_url();

    state.db.insert_image(
        &stored.filename,
        Some(&original_name),
        file_size,
        content_type.as_deref(),
    )?;
    state.db.update_character_avatar(cid, &url)?;
    tracing::info!("avatar for character {cid} set to {url}");

    Ok(Json(serde_json::json!({ "success": true, "url": url })))
}
