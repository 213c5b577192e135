use std::path::PathBuf;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::compress::{compress_path, CompressOptions, OutputFormat};
use crate::error::{ArkImageError, Result};
use crate::tools::manifest::ToolManifest;
use crate::tools::tool::{Tool, ToolInvocation, ToolOutput};

pub const COMPRESS_IMAGES: &str = "compress_images";

#[derive(Debug, Deserialize)]
struct CompressArgs {
    input_path: String,
    #[serde(default)]
    output_path: Option<String>,
    #[serde(default = "default_max_width")]
    max_width: i64,
    #[serde(default = "default_max_height")]
    max_height: i64,
    #[serde(default = "default_quality")]
    quality: i64,
    #[serde(default)]
    format: Option<String>,
}

fn default_max_width() -> i64 {
    1920
}

fn default_max_height() -> i64 {
    1080
}

fn default_quality() -> i64 {
    85
}

/// 校验后的 `compress_images` 参数
#[derive(Debug, Clone, PartialEq)]
pub struct CompressRequest {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub options: CompressOptions,
}

/// 压缩/缩放本地图片
#[derive(Default)]
pub struct CompressImagesTool;

impl CompressImagesTool {
    pub fn manifest() -> ToolManifest {
        ToolManifest::builder(COMPRESS_IMAGES)
            .description("Compress and resize images to optimize for web usage")
            .property(
                "input_path",
                json!({"type": "string", "description": "Path to the input image file or directory containing images"}),
            )
            .property(
                "output_path",
                json!({"type": "string", "description": "Output file or directory (optional, defaults to a '_compressed' suffix or a 'compressed' subdirectory)"}),
            )
            .property(
                "max_width",
                json!({"type": "integer", "description": "Maximum width in pixels (keeps aspect ratio)", "minimum": 100, "maximum": 4096, "default": 1920}),
            )
            .property(
                "max_height",
                json!({"type": "integer", "description": "Maximum height in pixels (keeps aspect ratio)", "minimum": 100, "maximum": 4096, "default": 1080}),
            )
            .property(
                "quality",
                json!({"type": "integer", "description": "JPEG quality (1-100)", "minimum": 1, "maximum": 100, "default": 85}),
            )
            .property(
                "format",
                json!({"type": "string", "description": "Output image format", "enum": ["JPEG", "PNG", "WebP"], "default": "JPEG"}),
            )
            .required("input_path")
            .build()
    }

    /// 工具参数与命令行共用的校验入口
    pub fn parse(input: serde_json::Value) -> Result<CompressRequest> {
        let args: CompressArgs = serde_json::from_value(input)
            .map_err(|e| ArkImageError::validation("arguments", e.to_string()))?;

        let max_width = in_range("max_width", args.max_width, 100, 4096)?;
        let max_height = in_range("max_height", args.max_height, 100, 4096)?;
        let quality = in_range("quality", args.quality, 1, 100)?;
        let format = match args.format.as_deref() {
            None => OutputFormat::Jpeg,
            Some(raw) => raw
                .parse()
                .map_err(|message| ArkImageError::validation("format", message))?,
        };
        if args.input_path.trim().is_empty() {
            return Err(ArkImageError::validation("input_path", "must not be empty"));
        }

        let output = args
            .output_path
            .filter(|p| !p.trim().is_empty())
            .map(PathBuf::from);
        Ok(CompressRequest {
            input: PathBuf::from(args.input_path),
            output,
            options: CompressOptions {
                max_width: max_width as u32,
                max_height: max_height as u32,
                quality: quality as u8,
                format,
            },
        })
    }
}

fn in_range(field: &str, value: i64, min: i64, max: i64) -> Result<i64> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ArkImageError::validation(
            field,
            format!("must be between {min} and {max}, got {value}"),
        ))
    }
}

#[async_trait]
impl Tool for CompressImagesTool {
    fn name(&self) -> &'static str {
        COMPRESS_IMAGES
    }

    async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        let CompressRequest {
            input,
            output,
            options,
        } = Self::parse(invocation.input)?;
        tracing::info!(
            input = %input.display(),
            max_width = options.max_width,
            max_height = options.max_height,
            quality = options.quality,
            format = ?options.format,
            "compressing images"
        );

        let report = tokio::task::spawn_blocking(move || {
            compress_path(&input, output.as_deref(), &options)
        })
        .await
        .map_err(|e| ArkImageError::Other(anyhow::anyhow!("compression task failed: {e}")))??;

        let structured = serde_json::to_value(&report)
            .map_err(|e| ArkImageError::Other(anyhow::anyhow!(e)))?;
        Ok(ToolOutput::new(report.summary(), structured))
    }
}
