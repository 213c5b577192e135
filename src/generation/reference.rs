//! 参考图处理：校验本地图片是否满足服务商要求，并转换为 base64 data URI

use std::fs::File;
use std::path::Path;

use base64::{engine::general_purpose, Engine as _};

use crate::error::{ArkImageError, Result};

const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
const MIN_EDGE: u32 = 14;
const MAX_EDGE: u32 = 6000;
const MAX_ASPECT: f64 = 3.0;

/// 参考图格式，只支持 JPEG 与 PNG
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReferenceFormat {
    Jpeg,
    Png,
}

impl ReferenceFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            _ => None,
        }
    }

    pub fn mime_subtype(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
        }
    }
}

/// 检查参考图，返回不满足要求的原因
///
/// 要求：文件可读、JPEG/PNG、不超过 10MB、宽高均大于 14px 且不超过 6000px、宽高比在 [1/3, 3] 之间。
pub fn check_reference_image(path: &Path) -> std::result::Result<ReferenceFormat, String> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| format!("cannot access `{}`: {e}", path.display()))?;
    if !metadata.is_file() {
        return Err(format!("`{}` is not a file", path.display()));
    }
    File::open(path).map_err(|e| format!("cannot read `{}`: {e}", path.display()))?;

    let format = ReferenceFormat::from_path(path).ok_or_else(|| {
        format!(
            "unsupported image format for `{}`, only JPEG and PNG are supported",
            path.display()
        )
    })?;

    if metadata.len() > MAX_FILE_BYTES {
        return Err(format!(
            "`{}` is {:.1}MB, the limit is 10MB",
            path.display(),
            metadata.len() as f64 / (1024.0 * 1024.0)
        ));
    }

    let (width, height) = image::image_dimensions(path)
        .map_err(|e| format!("cannot decode `{}`: {e}", path.display()))?;
    if width <= MIN_EDGE || height <= MIN_EDGE {
        return Err(format!(
            "`{}` is {width}x{height}px, both sides must be larger than {MIN_EDGE}px",
            path.display()
        ));
    }
    if width > MAX_EDGE || height > MAX_EDGE {
        return Err(format!(
            "`{}` is {width}x{height}px, the maximum is {MAX_EDGE}x{MAX_EDGE}px",
            path.display()
        ));
    }
    let aspect = f64::from(width) / f64::from(height);
    if !(1.0 / MAX_ASPECT..=MAX_ASPECT).contains(&aspect) {
        return Err(format!(
            "`{}` has aspect ratio {aspect:.2}, it must be between 0.33 and 3.0",
            path.display()
        ));
    }

    Ok(format)
}

/// 读取参考图并编码为 `data:image/<fmt>;base64,...`
pub fn to_data_uri(path: &Path) -> Result<String> {
    let format = ReferenceFormat::from_path(path).ok_or_else(|| {
        ArkImageError::validation(
            "reference_image_paths",
            format!("unsupported image format for `{}`", path.display()),
        )
    })?;
    let data = std::fs::read(path).map_err(|e| ArkImageError::filesystem(path, e))?;
    let encoded = general_purpose::STANDARD.encode(&data);
    Ok(format!("data:image/{};base64,{}", format.mime_subtype(), encoded))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> std::path::PathBuf {
        let path = dir.join(name);
        RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
            .save(&path)
            .unwrap();
        path
    }

    #[test]
    fn accepts_regular_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "ref.png", 64, 48);
        assert_eq!(check_reference_image(&path), Ok(ReferenceFormat::Png));
    }

    #[test]
    fn rejects_tiny_and_stretched_images() {
        let dir = tempfile::tempdir().unwrap();
        let tiny = write_png(dir.path(), "tiny.png", 14, 40);
        assert!(check_reference_image(&tiny).unwrap_err().contains("larger than 14px"));

        let wide = write_png(dir.path(), "wide.png", 200, 50);
        assert!(check_reference_image(&wide).unwrap_err().contains("aspect ratio"));
    }

    #[test]
    fn rejects_missing_and_unsupported_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.png");
        assert!(check_reference_image(&missing).unwrap_err().contains("cannot access"));

        let gif = dir.path().join("anim.gif");
        std::fs::write(&gif, b"GIF89a").unwrap();
        assert!(check_reference_image(&gif).unwrap_err().contains("only JPEG and PNG"));

        assert!(check_reference_image(dir.path()).unwrap_err().contains("not a file"));
    }

    #[test]
    fn data_uri_uses_declared_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(dir.path(), "ref.png", 32, 32);
        let uri = to_data_uri(&path).unwrap();
        assert!(uri.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }
}
