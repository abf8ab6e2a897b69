// THEORY:
// Every analysis starts from "some image". Hosts hand us whatever they have: an upload
// already inlined as a `data:` URI, a link to a stored photo, a file on disk, or a
// frame they decoded themselves. `ImageSource` names those cases so the pipeline can
// treat them uniformly: load to a `DynamicImage`, then analyze.
//
// Fetching and decoding failures are all `InvalidInput`. The caller cannot tell a 404
// from a corrupt JPEG, and does not need to: both mean "send another picture".

use crate::error::{Result, VisionError};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";

#[derive(Debug, Clone)]
pub enum ImageSource {
    Url(String),
    DataUri(String),
    Path(PathBuf),
    Image(DynamicImage),
}

impl ImageSource {
    /// Classifies a string by its prefix: `data:`, then `http://` or `https://`,
    /// otherwise a filesystem path.
    pub fn parse(value: &str) -> Self {
        let trimmed = value.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with(DATA_PREFIX) {
            ImageSource::DataUri(trimmed.to_string())
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            ImageSource::Url(trimmed.to_string())
        } else {
            ImageSource::Path(PathBuf::from(trimmed))
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ImageSource::Url(_) => "url",
            ImageSource::DataUri(_) => "data-uri",
            ImageSource::Path(_) => "path",
            ImageSource::Image(_) => "image",
        }
    }

    /// Fetches and decodes the image. `fetch_timeout` only applies to URLs.
    pub async fn load(self, fetch_timeout: Option<Duration>) -> Result<DynamicImage> {
        debug!(kind = self.kind(), "loading image source");
        match self {
            ImageSource::Image(image) => Ok(image),
            ImageSource::DataUri(uri) => decode(&data_uri_bytes(&uri)?),
            ImageSource::Path(path) => {
                let bytes = tokio::fs::read(&path).await.map_err(|err| {
                    VisionError::InvalidInput(format!("{}: {}", path.display(), err))
                })?;
                decode(&bytes)
            }
            ImageSource::Url(url) => decode(&fetch(&url, fetch_timeout).await?),
        }
    }
}

impl FromStr for ImageSource {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ImageSource::parse(value))
    }
}

impl From<DynamicImage> for ImageSource {
    fn from(image: DynamicImage) -> Self {
        ImageSource::Image(image)
    }
}

fn decode(bytes: &[u8]) -> Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// The payload of a base64 `data:` URI.
fn data_uri_bytes(uri: &str) -> Result<Vec<u8>> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| VisionError::InvalidInput("data URI has no payload".to_string()))?;
    if !header.to_ascii_lowercase().ends_with(BASE64_MARKER) {
        return Err(VisionError::InvalidInput(
            "only base64 data URIs are supported".to_string(),
        ));
    }
    let payload: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(payload)
        .map_err(|err| VisionError::InvalidInput(format!("data URI payload: {}", err)))
}

async fn fetch(url: &str, timeout: Option<Duration>) -> Result<Vec<u8>> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    let client = builder
        .build()
        .map_err(|err| VisionError::InvalidInput(err.to_string()))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|err| VisionError::InvalidInput(format!("{}: {}", url, err)))?;
    if !response.status().is_success() {
        return Err(VisionError::InvalidInput(format!(
            "{} returned {}",
            url,
            response.status()
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| VisionError::InvalidInput(format!("{}: {}", url, err)))?;
    Ok(bytes.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::utils::image_helper::image_helper::{encode_png, png_data_uri};

    fn tiny_png() -> Vec<u8> {
        let pixels = [200u8, 170, 150, 255].repeat(6);
        encode_png(3, 2, &pixels).unwrap()
    }

    #[test]
    fn parse_classifies_by_prefix() {
        assert!(matches!(ImageSource::parse("data:image/png;base64,AA=="), ImageSource::DataUri(_)));
        assert!(matches!(ImageSource::parse("HTTPS://cdn.example/a.jpg"), ImageSource::Url(_)));
        assert!(matches!(ImageSource::parse("http://host/a.png"), ImageSource::Url(_)));
        assert!(matches!(ImageSource::parse("photos/before.jpg"), ImageSource::Path(_)));
        assert!(matches!(ImageSource::parse("  data:x;base64,AA"), ImageSource::DataUri(_)));
    }

    #[tokio::test]
    async fn data_uri_decodes() {
        let source = ImageSource::parse(&png_data_uri(&tiny_png()));
        let image = source.load(None).await.unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.to_rgba8().get_pixel(0, 0).0, [200, 170, 150, 255]);
    }

    #[tokio::test]
    async fn path_decodes() {
        let path = std::env::temp_dir().join(format!("salon_vision_{}_source.png", std::process::id()));
        std::fs::write(&path, tiny_png()).unwrap();
        let image = ImageSource::Path(path.clone()).load(None).await;
        std::fs::remove_file(&path).ok();
        assert_eq!(image.unwrap().width(), 3);
    }

    #[tokio::test]
    async fn decoded_images_pass_through() {
        let image = DynamicImage::new_rgba8(5, 4);
        let loaded = ImageSource::from(image).load(None).await.unwrap();
        assert_eq!((loaded.width(), loaded.height()), (5, 4));
    }

    #[tokio::test]
    async fn unreadable_inputs_are_invalid_input() {
        let cases = [
            ImageSource::parse("data:image/png;base64"),
            ImageSource::parse("data:text/plain,hello"),
            ImageSource::parse("data:image/png;base64,!!!"),
            ImageSource::parse("data:image/png;base64,aGVsbG8="),
            ImageSource::parse("definitely/not/a/file.png"),
        ];
        for source in cases {
            assert!(matches!(
                source.load(None).await,
                Err(VisionError::InvalidInput(_))
            ));
        }
    }
}
