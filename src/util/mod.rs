use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::model::CarModel;

static DATA_URI_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^data:([\w.+-]+/[\w.+-]+);base64,(.+)$").expect("regex should compile")
});

/// A `data:` URI that could not be turned back into bytes.
#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("not a base64 data URI")]
    NotDataUri,
    #[error("invalid base64 image payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Image bytes recovered from a data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Wraps an already base64-encoded payload into a `data:` URI.
pub fn data_uri(mime: &str, base64_payload: &str) -> String {
    format!("data:{mime};base64,{base64_payload}")
}

pub fn decode_data_uri(uri: &str) -> Result<DecodedImage, DataUriError> {
    let caps = DATA_URI_RE.captures(uri).ok_or(DataUriError::NotDataUri)?;
    let (mime, payload) = match (caps.get(1), caps.get(2)) {
        (Some(mime), Some(payload)) => (mime.as_str(), payload.as_str()),
        _ => return Err(DataUriError::NotDataUri),
    };
    let bytes = BASE64_STANDARD.decode(payload.trim())?;
    Ok(DecodedImage {
        mime: mime.to_owned(),
        bytes,
    })
}

/// File extension for an image mime type (defaulting to `"img"`).
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "img",
    }
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

/// Writes the car's rendered image to `dir/{id}.{ext}`. Cars without an image are skipped.
pub async fn export_image(dir: &Path, car: &CarModel) -> anyhow::Result<Option<PathBuf>> {
    if !car.has_image() {
        return Ok(None);
    }
    let image = decode_data_uri(&car.image_url)
        .with_context(|| format!("decoding image of {}", car.name))?;
    tokio::fs::create_dir_all(dir)
        .await
        .with_context(|| format!("creating image directory {}", dir.display()))?;
    let path = dir.join(format!("{}.{}", car.id, extension_for_mime(&image.mime)));
    tokio::fs::write(&path, &image.bytes)
        .await
        .with_context(|| format!("writing image {}", path.display()))?;
    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CarAttributes, ConfigOptions, PerformanceStats};
    use assert_matches::assert_matches;

    fn car_with_image(image_url: String) -> CarModel {
        let attributes = CarAttributes {
            name: "Helix".into(),
            brand: "Aurelian".into(),
            description: String::new(),
            specs: PerformanceStats::FALLBACK,
            features: Vec::new(),
            launch_year: 2030,
        };
        CarModel::assemble(&ConfigOptions::default(), attributes, image_url)
    }

    #[test]
    fn decodes_data_uri() {
        let uri = data_uri("image/png", &BASE64_STANDARD.encode(b"\x89PNG"));
        let image = decode_data_uri(&uri).unwrap();
        assert_eq!(image.mime, "image/png");
        assert_eq!(image.bytes, b"\x89PNG");
    }

    #[test]
    fn rejects_plain_urls() {
        assert_matches!(
            decode_data_uri("https://example.com/car.png"),
            Err(DataUriError::NotDataUri)
        );
    }

    #[test]
    fn rejects_broken_base64() {
        assert_matches!(
            decode_data_uri("data:image/png;base64,@@@"),
            Err(DataUriError::Base64(_))
        );
    }

    #[test]
    fn maps_mime_extensions() {
        assert_eq!(extension_for_mime("image/png"), "png");
        assert_eq!(extension_for_mime("image/jpeg"), "jpg");
        assert_eq!(extension_for_mime("application/octet-stream"), "img");
    }

    #[test]
    fn truncates_on_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
    }

    #[tokio::test]
    async fn exports_image_to_directory() {
        let dir = std::env::temp_dir().join(format!("autoforge-export-{}", uuid::Uuid::new_v4()));
        let car = car_with_image(data_uri("image/png", &BASE64_STANDARD.encode(b"pixels")));
        let path = export_image(&dir, &car).await.unwrap().expect("image written");
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("png"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"pixels");
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn skips_cars_without_image() {
        let dir = std::env::temp_dir().join("autoforge-export-unused");
        let car = car_with_image(String::new());
        assert!(export_image(&dir, &car).await.unwrap().is_none());
    }
}
