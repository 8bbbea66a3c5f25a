//! Chart image loading for vision requests

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chartscout_application::{ArtifactError, ChartImage};
use std::path::Path;

/// MIME type from the file extension; PNG when unknown
fn media_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    }
}

/// Read a rendered chart and encode it for a model request
pub async fn load_chart_image(path: &Path) -> Result<ChartImage, ArtifactError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| ArtifactError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(ChartImage::new(media_type(path), BASE64.encode(bytes)))
}
