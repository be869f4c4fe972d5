use crate::config::Config;
use actix_multipart::Multipart;
use actix_web::web;
use futures_util::StreamExt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum MediaError {
    #[error("{0}")]
    Validation(String),
    #[error("Upload stream error: {0}")]
    Multipart(#[from] actix_multipart::MultipartError),
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

/// Maps a validated image MIME type to a safe extension. Intentionally not
/// configurable; anything outside this table is refused.
fn mime_to_safe_extension(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        "image/gif" => Some("gif"),
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Streams one image field to `media/<subdir>/<uuid>.<ext>` and returns the
/// public path. Size is capped by the configured limit; an oversized upload
/// is removed again before the error goes out.
pub async fn save_image_upload(
    config: &Config,
    mut payload: Multipart,
    subdir: &str,
) -> Result<String, MediaError> {
    let max_bytes = config.max_upload_size_mb * 1024 * 1024;
    let file_id = Uuid::new_v4().to_string();

    let mut stored_path: Option<PathBuf> = None;
    let mut extension = String::new();
    let mut file_size: u64 = 0;

    while let Some(item) = payload.next().await {
        let mut field = item?;
        let field_name = field
            .content_disposition()
            .get_name()
            .unwrap_or_default()
            .to_string();
        if field_name != "file" {
            continue;
        }

        let content_type = field
            .content_type()
            .map(|m| m.to_string())
            .ok_or_else(|| MediaError::Validation("Content-Type not available.".to_string()))?;
        extension = mime_to_safe_extension(&content_type)
            .ok_or_else(|| {
                MediaError::Validation(format!("Unsupported file type: '{}'.", content_type))
            })?
            .to_string();

        let dir = PathBuf::from(&config.media_path).join(subdir);
        web::block({
            let dir = dir.clone();
            move || fs::create_dir_all(&dir)
        })
        .await??;

        let final_path = dir.join(format!("{}.{}", file_id, extension));
        stored_path = Some(final_path.clone());

        let mut f = web::block(move || fs::File::create(final_path)).await??;
        while let Some(chunk) = field.next().await {
            let data = chunk?;
            file_size += data.len() as u64;
            if file_size > max_bytes {
                drop(f);
                if let Some(path) = &stored_path {
                    let _ = fs::remove_file(path);
                }
                return Err(MediaError::Validation(format!(
                    "File is too large. Maximum size is {}MB.",
                    config.max_upload_size_mb
                )));
            }
            f = web::block(move || f.write_all(&data).map(|_| f)).await??;
        }
    }

    if stored_path.is_none() {
        return Err(MediaError::Validation("No file was uploaded.".to_string()));
    }

    Ok(format!("/media/{}/{}.{}", subdir, file_id, extension))
}
