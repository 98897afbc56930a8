//! The background-removal capability.
//!
//! Removal is delegated to an external model and treated as a black box: raw
//! encoded image bytes in, raw encoded PNG bytes (background removed) out.
//! The trait seam exists so tests can substitute a stub without invoking a
//! real model. Model inference can take seconds, so no request timeout is
//! applied; a request runs to completion or fails.

use anyhow::{Context, bail};
use async_trait::async_trait;
use url::Url;

use crate::config::RemovalConfig;

/// Opaque `bytes -> bytes` transform that removes an image background.
#[async_trait]
pub trait BackgroundRemover: Send + Sync {
    async fn remove(&self, image: &[u8]) -> anyhow::Result<Vec<u8>>;
}

/// Production remover: forwards the image to an upstream model endpoint over
/// HTTP and returns the response body.
pub struct HttpRemover {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpRemover {
    pub fn new(config: &RemovalConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.url.clone(),
        }
    }
}

#[async_trait]
impl BackgroundRemover for HttpRemover {
    async fn remove(&self, image: &[u8]) -> anyhow::Result<Vec<u8>> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .context("background removal request failed")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            bail!("background removal model returned {status}: {detail}");
        }

        let bytes = response.bytes().await.context("failed to read background removal response")?;
        Ok(bytes.to_vec())
    }
}

/// Test doubles for the removal seam.
#[cfg(test)]
pub mod stub {
    use super::*;

    /// Always succeeds with a fixed payload.
    pub struct FixedRemover(pub Vec<u8>);

    #[async_trait]
    impl BackgroundRemover for FixedRemover {
        async fn remove(&self, _image: &[u8]) -> anyhow::Result<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    /// Always fails with a fixed message.
    pub struct FailingRemover(pub &'static str);

    #[async_trait]
    impl BackgroundRemover for FailingRemover {
        async fn remove(&self, _image: &[u8]) -> anyhow::Result<Vec<u8>> {
            bail!("{}", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_bytes, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remover_for(server: &MockServer) -> HttpRemover {
        let config = RemovalConfig {
            url: Url::parse(&format!("{}/api/remove", server.uri())).unwrap(),
        };
        HttpRemover::new(&config)
    }

    #[tokio::test]
    async fn posts_bytes_and_returns_response_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/remove"))
            .and(body_bytes(b"original image".to_vec()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"processed image".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let result = remover_for(&server).remove(b"original image").await.unwrap();
        assert_eq!(result, b"processed image");
    }

    #[tokio::test]
    async fn upstream_error_status_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/remove"))
            .respond_with(ResponseTemplate::new(503).set_body_string("model loading"))
            .mount(&server)
            .await;

        let err = remover_for(&server).remove(b"image").await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("503"));
        assert!(message.contains("model loading"));
    }

    #[tokio::test]
    async fn connection_failure_is_reported_with_context() {
        // Nothing is listening here
        let config = RemovalConfig {
            url: Url::parse("http://127.0.0.1:1/api/remove").unwrap(),
        };
        let err = HttpRemover::new(&config).remove(b"image").await.unwrap_err();
        assert!(format!("{err:#}").contains("background removal request failed"));
    }
}
