pub mod ark;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::generation::{GenerationRequest, ImageDescriptor};

pub use ark::ArkClient;

/// 图片生成服务商
///
/// 每次 `generate` 只发起一次请求，按服务商返回的顺序给出图片描述。
/// 失败时返回 [`crate::ArkImageError::Provider`]，不做本地重试。
#[async_trait]
pub trait ImageProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<ImageDescriptor>>;
}

pub type DynImageProvider = Arc<dyn ImageProvider>;
