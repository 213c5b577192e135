pub mod compress;
pub mod generate;
pub mod manifest;
pub mod registry;
pub mod tool;

use std::sync::Arc;

pub use compress::{CompressImagesTool, CompressRequest, COMPRESS_IMAGES};
pub use generate::{GenerateImagesTool, GENERATE_IMAGES};
pub use manifest::{ToolManifest, ToolManifestBuilder};
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolInvocation, ToolOutput};

use crate::error::Result;
use crate::generation::ImagePipeline;

/// 内置工具清单（不需要服务商配置）
pub fn builtin_manifests() -> Vec<ToolManifest> {
    vec![CompressImagesTool::manifest(), GenerateImagesTool::manifest()]
}

/// 注册 `generate_images` 与 `compress_images`
pub fn default_registry(pipeline: Arc<ImagePipeline>) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register_with_manifest(
        Arc::new(GenerateImagesTool::new(pipeline)),
        GenerateImagesTool::manifest(),
    )?;
    registry.register_with_manifest(
        Arc::new(CompressImagesTool),
        CompressImagesTool::manifest(),
    )?;
    Ok(registry)
}
