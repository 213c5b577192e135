//! 豆包 Seedream（火山方舟）图片生成接口

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info, instrument};

use super::ImageProvider;
use crate::config::ProviderConfig;
use crate::error::{ArkImageError, Result};
use crate::generation::{reference, GenerationRequest, ImageDescriptor};

#[derive(Debug, Deserialize)]
struct ArkImagesResponse {
    #[serde(default)]
    data: Option<Vec<ArkImageItem>>,
    #[serde(default)]
    error: Option<ArkErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ArkImageItem {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    error: Option<ArkErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ArkErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl From<ArkErrorBody> for ArkImageError {
    fn from(body: ArkErrorBody) -> Self {
        ArkImageError::Provider {
            code: body.code,
            message: body
                .message
                .unwrap_or_else(|| "provider returned an error without a message".to_string()),
        }
    }
}

#[derive(Clone)]
pub struct ArkClient {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl ArkClient {
    pub fn new(config: ProviderConfig) -> Result<Self> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| ArkImageError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// 构造请求体
    ///
    /// 参考图只有一张时以字符串传递，多张时以数组传递。
    pub fn build_body(&self, request: &GenerationRequest, references: Vec<String>) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "prompt": request.prompt(),
            "size": request.size().to_string(),
            "sequential_image_generation": request.sequential_mode().as_str(),
            "sequential_image_generation_options": {
                "max_images": request.batch_size()
            },
            "response_format": "url",
            "watermark": request.watermark()
        });

        match references.len() {
            0 => {}
            1 => body["image"] = Value::String(references.into_iter().next().unwrap_or_default()),
            _ => body["image"] = json!(references),
        }
        body
    }

    /// 解析成功响应；缺少 `url` 的条目视为上游响应格式错误
    pub fn parse_response(body: &str, fallback_size: &str) -> Result<Vec<ImageDescriptor>> {
        let parsed: ArkImagesResponse = serde_json::from_str(body)
            .map_err(|e| ArkImageError::provider(format!("malformed response: {e}")))?;

        if let Some(error) = parsed.error {
            return Err(error.into());
        }

        let data = parsed
            .data
            .ok_or_else(|| ArkImageError::provider("malformed response: missing `data` field"))?;

        data.into_iter()
            .enumerate()
            .map(|(index, item)| {
                let url = item.url.filter(|u| !u.is_empty()).ok_or_else(|| {
                    let detail = item
                        .error
                        .and_then(|e| e.message)
                        .map(|m| format!(" ({m})"))
                        .unwrap_or_default();
                    ArkImageError::provider(format!(
                        "malformed response: image {} has no url{detail}",
                        index + 1
                    ))
                })?;
                Ok(ImageDescriptor {
                    remote_url: url,
                    size: item
                        .size
                        .filter(|s| !s.is_empty())
                        .unwrap_or_else(|| fallback_size.to_string()),
                })
            })
            .collect()
    }

    /// 非 2xx 响应时从错误信封中提取 code 和 message
    fn error_from_status(status: reqwest::StatusCode, body: &str) -> ArkImageError {
        match serde_json::from_str::<ArkImagesResponse>(body) {
            Ok(ArkImagesResponse {
                error: Some(error), ..
            }) => error.into(),
            _ => ArkImageError::Provider {
                code: Some(status.as_u16().to_string()),
                message: if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body.trim().to_string()
                },
            },
        }
    }
}

#[async_trait]
impl ImageProvider for ArkClient {
    fn name(&self) -> &str {
        "ark"
    }

    #[instrument(skip_all, fields(model = %self.config.model, batch = request.batch_size()))]
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<ImageDescriptor>> {
        let references = request
            .reference_image_paths()
            .iter()
            .map(|path| reference::to_data_uri(path))
            .collect::<Result<Vec<_>>>()?;
        if !references.is_empty() {
            info!(count = references.len(), "using reference images");
        }

        let body = self.build_body(request, references);
        debug!(
            size = %request.size(),
            sequential = request.sequential_mode().as_str(),
            watermark = request.watermark(),
            "sending image generation request"
        );

        let response = self
            .client
            .post(self.config.generations_endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ArkImageError::provider(format!("request failed: {e}")))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ArkImageError::provider(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(Self::error_from_status(status, &text));
        }

        let descriptors = Self::parse_response(&text, &request.size().to_string())?;
        info!(count = descriptors.len(), "provider returned images");
        Ok(descriptors)
    }
}
