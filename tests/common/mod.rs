#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use arkimage::{
    ArkImageError, ArtifactDownloader, DownloadPolicy, FetchedImage, GenerationRequest,
    ImageDescriptor, ImageFetcher, ImagePipeline, ImageProvider,
};
use async_trait::async_trait;
use parking_lot::Mutex;

/// Returns a fixed list of image URLs and records every request it sees.
pub struct FakeProvider {
    outcome: Result<Vec<ImageDescriptor>, (Option<String>, String)>,
    pub requests: Mutex<Vec<GenerationRequest>>,
}

impl FakeProvider {
    pub fn returning(urls: &[&str]) -> Self {
        Self {
            outcome: Ok(urls
                .iter()
                .map(|url| ImageDescriptor {
                    remote_url: url.to_string(),
                    size: "2048x2048".to_string(),
                })
                .collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(code: &str, message: &str) -> Self {
        Self {
            outcome: Err((Some(code.to_string()), message.to_string())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ImageProvider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn generate(&self, request: &GenerationRequest) -> arkimage::Result<Vec<ImageDescriptor>> {
        self.requests.lock().push(request.clone());
        match &self.outcome {
            Ok(descriptors) => Ok(descriptors.clone()),
            Err((code, message)) => Err(ArkImageError::Provider {
                code: code.clone(),
                message: message.clone(),
            }),
        }
    }
}

/// Serves bytes for known URLs; unknown URLs fail like an unreachable host.
#[derive(Default)]
pub struct FakeFetcher {
    responses: HashMap<String, FetchedImage>,
    pub fetched: Mutex<Vec<String>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, content_type: Option<&str>, bytes: &[u8]) -> Self {
        self.responses.insert(
            url.to_string(),
            FetchedImage {
                bytes: bytes.to_vec(),
                content_type: content_type.map(str::to_string),
            },
        );
        self
    }
}

#[async_trait]
impl ImageFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> arkimage::Result<FetchedImage> {
        self.fetched.lock().push(url.to_string());
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| ArkImageError::Other(anyhow::anyhow!("connection refused: {url}")))
    }
}

pub fn pipeline(
    provider: Arc<FakeProvider>,
    fetcher: Arc<FakeFetcher>,
    policy: DownloadPolicy,
) -> ImagePipeline {
    ImagePipeline::new(provider, ArtifactDownloader::new(fetcher).with_policy(policy))
}
