use std::sync::Arc;

use serde_json::Value;
use tracing::{error, info, instrument, warn};

use super::assembler::ResponseAssembler;
use super::types::{GenerationRequest, GenerationResult};
use super::validator::ParameterValidator;
use crate::config::ProviderConfig;
use crate::download::{ArtifactDownloader, DownloadPolicy, HttpFetcher};
use crate::error::Result;
use crate::provider::{ArkClient, DynImageProvider};

/// 校验 → 调用服务商 → 下载 → 汇总
#[derive(Clone)]
pub struct ImagePipeline {
    provider: DynImageProvider,
    downloader: ArtifactDownloader,
}

impl ImagePipeline {
    pub fn new(provider: DynImageProvider, downloader: ArtifactDownloader) -> Self {
        Self {
            provider,
            downloader,
        }
    }

    /// 使用方舟接口和 HTTP 下载器构建
    pub fn from_config(config: ProviderConfig, policy: DownloadPolicy) -> Result<Self> {
        let provider: DynImageProvider = Arc::new(ArkClient::new(config)?);
        let downloader = ArtifactDownloader::new(Arc::new(HttpFetcher::new())).with_policy(policy);
        Ok(Self::new(provider, downloader))
    }

    /// `generate_images` 工具的完整处理流程
    pub async fn generate_images(&self, arguments: &Value) -> Result<GenerationResult> {
        let request = ParameterValidator::validate(arguments)?;
        self.run(&request).await
    }

    #[instrument(skip_all, fields(provider = self.provider.name(), batch = request.batch_size()))]
    pub async fn run(&self, request: &GenerationRequest) -> Result<GenerationResult> {
        info!(
            prompt = %preview(request.prompt()),
            size = %request.size(),
            references = request.reference_image_paths().len(),
            output_dir = %request.output_dir().display(),
            "generating images"
        );

        let mut descriptors = self.provider.generate(request).await.map_err(|err| {
            error!(error = %err, "image generation failed");
            err
        })?;

        let cap = request.batch_size() as usize;
        if descriptors.len() > cap {
            warn!(
                returned = descriptors.len(),
                cap, "provider returned more images than requested, extra images dropped"
            );
            descriptors.truncate(cap);
        }

        let report = self
            .downloader
            .download_all(request.output_dir(), descriptors)
            .await
            .map_err(|err| {
                error!(error = %err, "saving images failed");
                err
            })?;

        let result = ResponseAssembler::assemble(report);
        info!(
            saved = result.count,
            failed = result.failures.len(),
            "generation finished"
        );
        Ok(result)
    }
}

fn preview(prompt: &str) -> String {
    const LIMIT: usize = 50;
    match prompt.char_indices().nth(LIMIT) {
        Some((end, _)) => format!("{}...", &prompt[..end]),
        None => prompt.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::preview;

    #[test]
    fn preview_truncates_on_char_boundary() {
        assert_eq!(preview("short"), "short");
        let long = "画".repeat(60);
        let shown = preview(&long);
        assert_eq!(shown.chars().count(), 53);
        assert!(shown.ends_with("..."));
    }
}
