use axum::{
    extract::{Multipart, State},
    response::Json,
    Extension,
};
use bytes::Bytes;
use serde::Serialize;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::user::Claims;
use crate::services::cloudinary::ResourceType;
use crate::state::AppState;

const MB: usize = 1024 * 1024;
const MAX_IMAGE_SIZE: usize = 10 * MB;
const MAX_PDF_SIZE: usize = 50 * MB;

/// Content class decided from the file's leading bytes, never its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Video,
    Pdf,
}

impl FileKind {
    pub fn resource_type(&self) -> ResourceType {
        match self {
            FileKind::Image => ResourceType::Image,
            FileKind::Video => ResourceType::Video,
            FileKind::Pdf => ResourceType::Raw,
        }
    }

    pub fn max_bytes(&self, max_video_mb: usize) -> usize {
        match self {
            FileKind::Image => MAX_IMAGE_SIZE,
            FileKind::Video => max_video_mb * MB,
            FileKind::Pdf => MAX_PDF_SIZE,
        }
    }

    fn folder(&self) -> &'static str {
        match self {
            FileKind::Image => "learnhub/images",
            FileKind::Video => "learnhub/videos",
            FileKind::Pdf => "learnhub/pdfs",
        }
    }
}

/// The `file` part of a multipart body.
pub(crate) struct IncomingFile {
    pub file_name: String,
    pub data: Bytes,
}

pub(crate) async fn read_file_field(multipart: &mut Multipart) -> Result<IncomingFile> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let data = field.bytes().await?;
        if data.is_empty() {
            return Err(AppError::invalid_data("Uploaded file is empty"));
        }
        return Ok(IncomingFile { file_name, data });
    }
    Err(AppError::invalid_data("No file provided in the 'file' field"))
}

/// Returns the kind and detected MIME type of `data`.
pub fn sniff(data: &[u8]) -> Result<(FileKind, &'static str)> {
    let detected = infer::get(data)
        .ok_or_else(|| AppError::UnsupportedFile("Unrecognised file type".to_string()))?;

    let kind = match detected.matcher_type() {
        infer::MatcherType::Image => FileKind::Image,
        infer::MatcherType::Video => FileKind::Video,
        _ if detected.mime_type() == mime::APPLICATION_PDF.essence_str() => FileKind::Pdf,
        _ => {
            return Err(AppError::UnsupportedFile(format!(
                "{} is not an image, video or PDF",
                detected.mime_type()
            )))
        }
    };
    Ok((kind, detected.mime_type()))
}

/// Cloudinary public id derived from the client's file name.
pub fn public_id_for(file_name: &str) -> String {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let clean: String = sanitize_filename::sanitize(stem)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .take(60)
        .collect();
    let clean = if clean.trim_matches('_').is_empty() { "file".to_string() } else { clean };

    format!("{}_{}", clean, &Uuid::new_v4().simple().to_string()[..8])
}

pub(crate) fn check_size(kind: FileKind, len: usize, max_video_mb: usize) -> Result<()> {
    let limit = kind.max_bytes(max_video_mb);
    if len > limit {
        return Err(AppError::FileTooLarge(limit));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub kind: FileKind,
    pub content_type: String,
    pub url: String,
    pub public_id: String,
    pub bytes: usize,
}

/// Admin upload of course media. The returned url/public_id go into a video or PDF entry.
pub async fn upload_file(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>> {
    let cloudinary = state.cloudinary()?;
    let file = read_file_field(&mut multipart).await?;

    let (kind, content_type) = sniff(&file.data)?;
    check_size(kind, file.data.len(), state.config.max_upload_mb)?;

    tracing::info!(
        "📤 {} uploading {} ({:?}, {} bytes)",
        claims.email,
        file.file_name,
        kind,
        file.data.len()
    );

    let public_id = public_id_for(&file.file_name);
    let asset = cloudinary
        .upload(
            file.data.to_vec(),
            &file.file_name,
            content_type,
            kind.resource_type(),
            kind.folder(),
            Some(&public_id),
        )
        .await?;

    Ok(Json(UploadResponse {
        success: true,
        kind,
        content_type: content_type.to_string(),
        url: asset.url,
        public_id: asset.public_id,
        bytes: asset.bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];
    const PDF: &[u8] = b"%PDF-1.7\n%\xE2\xE3\xCF\xD3\n";
    const ZIP: &[u8] = &[0x50, 0x4B, 0x03, 0x04, 0x14, 0x00, 0x00, 0x00];

    #[test]
    fn test_sniff_by_content() {
        assert_eq!(sniff(PNG).unwrap(), (FileKind::Image, "image/png"));
        assert_eq!(sniff(PDF).unwrap().0, FileKind::Pdf);
        assert!(matches!(sniff(ZIP), Err(AppError::UnsupportedFile(_))));
        assert!(sniff(b"plain text").is_err());
    }

    #[test]
    fn test_size_caps_per_kind() {
        assert!(check_size(FileKind::Image, MAX_IMAGE_SIZE, 200).is_ok());
        assert!(matches!(
            check_size(FileKind::Image, MAX_IMAGE_SIZE + 1, 200),
            Err(AppError::FileTooLarge(_))
        ));
        assert!(check_size(FileKind::Video, 150 * MB, 200).is_ok());
        assert!(check_size(FileKind::Video, 150 * MB, 100).is_err());
    }

    #[test]
    fn test_public_id_is_sanitized() {
        let id = public_id_for("../../Intro Lesson!.mp4");
        assert!(id.starts_with("Intro_Lesson_"), "got {}", id);
        assert!(!id.contains('/'));
        assert!(!id.contains('.'));

        assert!(public_id_for("...").starts_with("file_"));
    }
}
