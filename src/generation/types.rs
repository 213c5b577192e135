use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DownloadFailure;

pub const DEFAULT_SIZE: ImageSize = ImageSize::Preset(SizePreset::TwoK);
pub const MAX_SINGLE_SHOT_IMAGES: u32 = 3;
pub const MAX_SEQUENTIAL_IMAGES: u32 = 15;
pub const DEFAULT_MAX_IMAGES: u32 = 3;
pub const MAX_REFERENCE_IMAGES: usize = 10;

const MIN_PIXELS: u64 = 1280 * 720;
const MAX_PIXELS: u64 = 4096 * 4096;
const MAX_ASPECT: f64 = 16.0;

/// 组图模式：`auto` 时由模型决定返回几张相关联的图片
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequentialMode {
    #[default]
    Disabled,
    Auto,
}

impl SequentialMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Auto => "auto",
        }
    }
}

impl FromStr for SequentialMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "disabled" | "off" | "false" => Ok(Self::Disabled),
            other => Err(format!("expected `auto` or `disabled`, got `{other}`")),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SizePreset {
    OneK,
    TwoK,
    FourK,
}

/// 图片尺寸：分辨率预设（1K/2K/4K）或精确的 `WxH`，两种方式不能混用
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSize {
    Preset(SizePreset),
    Explicit { width: u32, height: u32 },
}

impl fmt::Display for ImageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preset(SizePreset::OneK) => f.write_str("1K"),
            Self::Preset(SizePreset::TwoK) => f.write_str("2K"),
            Self::Preset(SizePreset::FourK) => f.write_str("4K"),
            Self::Explicit { width, height } => write!(f, "{width}x{height}"),
        }
    }
}

impl FromStr for ImageSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token.to_ascii_uppercase().as_str() {
            "1K" => return Ok(Self::Preset(SizePreset::OneK)),
            "2K" => return Ok(Self::Preset(SizePreset::TwoK)),
            "4K" => return Ok(Self::Preset(SizePreset::FourK)),
            _ => {}
        }

        let (w, h) = token
            .split_once(['x', 'X', '×'])
            .ok_or_else(|| format!("expected 1K, 2K, 4K or WIDTHxHEIGHT, got `{token}`"))?;
        let width: u32 = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in `{token}`"))?;
        let height: u32 = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in `{token}`"))?;
        if width == 0 || height == 0 {
            return Err(format!("width and height must be positive, got `{token}`"));
        }

        let pixels = u64::from(width) * u64::from(height);
        if !(MIN_PIXELS..=MAX_PIXELS).contains(&pixels) {
            return Err(format!(
                "total pixels of `{token}` must be between 1280x720 and 4096x4096"
            ));
        }
        let aspect = f64::from(width) / f64::from(height);
        if !(1.0 / MAX_ASPECT..=MAX_ASPECT).contains(&aspect) {
            return Err(format!("aspect ratio of `{token}` must be between 1/16 and 16"));
        }

        Ok(Self::Explicit { width, height })
    }
}

impl Serialize for ImageSize {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// 校验通过的生成请求，只能由 [`super::ParameterValidator`] 构造
#[derive(Clone, Debug, Serialize)]
pub struct GenerationRequest {
    pub(crate) prompt: String,
    pub(crate) num_images: u32,
    pub(crate) size: ImageSize,
    pub(crate) watermark: bool,
    pub(crate) output_dir: PathBuf,
    pub(crate) reference_image_paths: Vec<PathBuf>,
    pub(crate) sequential_mode: SequentialMode,
    pub(crate) max_images: u32,
}

impl GenerationRequest {
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn num_images(&self) -> u32 {
        self.num_images
    }

    pub fn size(&self) -> ImageSize {
        self.size
    }

    pub fn watermark(&self) -> bool {
        self.watermark
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn reference_image_paths(&self) -> &[PathBuf] {
        &self.reference_image_paths
    }

    pub fn sequential_mode(&self) -> SequentialMode {
        self.sequential_mode
    }

    pub fn max_images(&self) -> u32 {
        self.max_images
    }

    /// 本次调用最多产出的图片数
    pub fn batch_size(&self) -> u32 {
        match self.sequential_mode {
            SequentialMode::Auto => self.max_images,
            SequentialMode::Disabled => self.num_images,
        }
    }
}

/// 服务商返回的单张图片
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDescriptor {
    pub remote_url: String,
    pub size: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedArtifact {
    /// 在本批次中的序号，从 1 开始
    pub index: usize,
    pub descriptor: ImageDescriptor,
    pub local_path: PathBuf,
    pub byte_length: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    #[serde(skip)]
    pub index: usize,
    pub remote_url: String,
    pub size: String,
    pub local_path: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct GenerationResult {
    pub images: Vec<GeneratedImage>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<DownloadFailure>,
}
