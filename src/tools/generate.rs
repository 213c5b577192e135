use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::error::{ArkImageError, Result};
use crate::generation::types::{
    DEFAULT_MAX_IMAGES, MAX_REFERENCE_IMAGES, MAX_SEQUENTIAL_IMAGES, MAX_SINGLE_SHOT_IMAGES,
};
use crate::generation::ImagePipeline;
use crate::tools::manifest::ToolManifest;
use crate::tools::tool::{Tool, ToolInvocation, ToolOutput};

pub const GENERATE_IMAGES: &str = "generate_images";

const SIZE_DESCRIPTION: &str = "Image size specification. Supports two methods (cannot be mixed):
Method 1: Resolution preset (1K, 2K, 4K) - specify resolution and describe aspect ratio in prompt, model determines final size.
Method 2: Exact pixel dimensions (e.g., 2048x2048) - specify width x height directly.
Pixel range: [1280x720, 4096x4096]
Aspect ratio range: [1/16, 16]
Recommended sizes:
1:1 -> 2048x2048
4:3 -> 2304x1728
3:4 -> 1728x2304
16:9 -> 2560x1440
9:16 -> 1440x2560
3:2 -> 2496x1664
2:3 -> 1664x2496
21:9 -> 3024x1296";

/// 文生图工具：生成图片并下载到本地目录
pub struct GenerateImagesTool {
    pipeline: Arc<ImagePipeline>,
}

impl GenerateImagesTool {
    pub fn new(pipeline: Arc<ImagePipeline>) -> Self {
        Self { pipeline }
    }

    pub fn manifest() -> ToolManifest {
        ToolManifest::builder(GENERATE_IMAGES)
            .description(
                "Generate images from text prompts using Doubao Seedream and save them locally. \
                 Supports text-to-images (up to 15 in grouped mode), single image + text, \
                 or multi-image + text (up to 10 reference images, total images <= 15).",
            )
            .property(
                "prompt",
                json!({"type": "string", "description": "Text description for image generation."}),
            )
            .property(
                "num_images",
                json!({
                    "type": "integer",
                    "description": "Number of images to generate (1-3)",
                    "minimum": 1,
                    "maximum": MAX_SINGLE_SHOT_IMAGES,
                    "default": 1
                }),
            )
            .property(
                "size",
                json!({"type": "string", "description": SIZE_DESCRIPTION, "default": "2K"}),
            )
            .property(
                "watermark",
                json!({
                    "type": "boolean",
                    "description": "Whether to add watermark to generated images",
                    "default": false
                }),
            )
            .property(
                "output_dir",
                json!({
                    "type": "string",
                    "description": "Directory for saving downloaded images, created if missing. Defaults to the working directory."
                }),
            )
            .property(
                "reference_image_paths",
                json!({
                    "type": "array",
                    "description": "Optional local reference images (JPEG/PNG, >14px, <=10MB, <=6000x6000px, aspect ratio 1/3-3). Also accepted as `image_paths`.",
                    "items": {"type": "string"},
                    "minItems": 0,
                    "maxItems": MAX_REFERENCE_IMAGES
                }),
            )
            .property(
                "sequential_mode",
                json!({
                    "type": "string",
                    "description": "Grouped generation. `auto`: the model decides whether to return a group of related images and how many; `disabled`: grouped generation is off. Also accepted as `sequential_image_generation`.",
                    "enum": ["auto", "disabled"],
                    "default": "disabled"
                }),
            )
            .property(
                "max_images",
                json!({
                    "type": "integer",
                    "description": "Maximum number of images in grouped mode (1-15). Only effective when sequential_mode is `auto`. Reference images + generated images <= 15.",
                    "minimum": 1,
                    "maximum": MAX_SEQUENTIAL_IMAGES,
                    "default": DEFAULT_MAX_IMAGES
                }),
            )
            .required("prompt")
            .build()
    }
}

#[async_trait]
impl Tool for GenerateImagesTool {
    fn name(&self) -> &'static str {
        GENERATE_IMAGES
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        let result = self.pipeline.generate_images(&invocation.input).await?;
        let structured = serde_json::to_value(&result)
            .map_err(|e| ArkImageError::Other(anyhow::anyhow!(e)))?;
        Ok(ToolOutput::new(result.summary(), structured))
    }
}
