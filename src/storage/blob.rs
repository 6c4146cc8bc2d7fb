//! Avatar image sources.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::StorageError;
use crate::http::HttpClient;

const OCTET_STREAM: &str = "application/octet-stream";

/// Where the avatar bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    Bytes(Vec<u8>),
    /// Plain base64 or a `data:<mime>;base64,<payload>` URL.
    Base64(String),
    /// Fetched through the injected [`HttpClient`].
    Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageBlob {
    pub bytes: Vec<u8>,
    pub mime: String,
}

impl ImageSource {
    pub async fn load(&self, http: &HttpClient) -> Result<ImageBlob, StorageError> {
        match self {
            Self::Bytes(bytes) => Ok(ImageBlob {
                bytes: bytes.clone(),
                mime: OCTET_STREAM.to_string(),
            }),
            Self::Base64(encoded) => decode_base64_image(encoded),
            Self::Url(url) => fetch_image(http, url).await,
        }
    }
}

pub fn decode_base64_image(encoded: &str) -> Result<ImageBlob, StorageError> {
    let (mime, payload) = match encoded.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| StorageError::Image("data URL has no payload".to_string()))?;
            let mime = header
                .strip_suffix(";base64")
                .filter(|mime| !mime.is_empty())
                .unwrap_or(OCTET_STREAM);
            (mime, payload)
        }
        None => (OCTET_STREAM, encoded),
    };

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| StorageError::Image(format!("invalid base64 image: {e}")))?;
    Ok(ImageBlob {
        bytes,
        mime: mime.to_string(),
    })
}

async fn fetch_image(http: &HttpClient, url: &str) -> Result<ImageBlob, StorageError> {
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| StorageError::Image(format!("failed to fetch {url}: {e}")))?;
    let status = response.status();
    if !status.is_success() {
        return Err(StorageError::Image(format!(
            "failed to fetch {url}: HTTP {}",
            status.as_u16()
        )));
    }

    let mime = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or(OCTET_STREAM)
        .to_string();
    let bytes = response
        .bytes()
        .await
        .map_err(|e| StorageError::Image(format!("failed to read {url}: {e}")))?;
    Ok(ImageBlob {
        bytes: bytes.to_vec(),
        mime,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn data_url_keeps_mime() {
        let blob = decode_base64_image("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(blob.mime, "image/png");
        assert_eq!(blob.bytes, b"hello");
    }

    #[test]
    fn plain_base64_is_octet_stream() {
        let blob = decode_base64_image("aGVsbG8=").unwrap();
        assert_eq!(blob.mime, OCTET_STREAM);
        assert_eq!(blob.bytes, b"hello");
    }

    #[test]
    fn invalid_base64_is_an_image_error() {
        assert!(matches!(
            decode_base64_image("data:image/png;base64,@@@"),
            Err(StorageError::Image(_))
        ));
    }

    #[tokio::test]
    async fn url_source_fetches_bytes_and_rejects_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/avatar.png"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1u8, 2, 3]),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing.png"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let http = HttpClient::new(Duration::from_secs(5));
        let blob = ImageSource::Url(format!("{}/avatar.png", server.uri()))
            .load(&http)
            .await
            .unwrap();
        assert_eq!(blob.bytes, vec![1, 2, 3]);
        assert_eq!(blob.mime, "image/png");

        let err = ImageSource::Url(format!("{}/missing.png", server.uri()))
            .load(&http)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("404"));
    }
}
