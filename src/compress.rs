//! 图片压缩与缩放

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use serde::Serialize;

use crate::error::{ArkImageError, Result};

const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::WebP),
            other => Err(format!("expected JPEG, PNG or WebP, got `{other}`")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompressOptions {
    pub max_width: u32,
    pub max_height: u32,
    /// 仅对 JPEG 生效
    pub quality: u8,
    pub format: OutputFormat,
}

#[derive(Clone, Debug, Serialize)]
pub struct CompressionRecord {
    pub input: String,
    pub output: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CompressionRecord {
    /// 体积减少的百分比
    pub fn size_reduction(&self) -> Option<f64> {
        match (self.original_bytes, self.new_bytes) {
            (Some(original), Some(new)) if original > 0 => {
                Some((original as f64 - new as f64) / original as f64 * 100.0)
            }
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct CompressionReport {
    pub processed: usize,
    pub records: Vec<CompressionRecord>,
}

impl CompressionReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Image compression completed: {}/{} images processed successfully",
            self.processed,
            self.records.len()
        )];
        for record in &self.records {
            match (&record.error, record.original_bytes, record.new_bytes) {
                (None, Some(original), Some(new)) => lines.push(format!(
                    "✓ {} → {}\n  Size: {:.1} KB → {:.1} KB ({:.1}% reduction)",
                    record.input,
                    record.output,
                    original as f64 / 1024.0,
                    new as f64 / 1024.0,
                    record.size_reduction().unwrap_or_default()
                )),
                (error, _, _) => lines.push(format!(
                    "✗ {}: {}",
                    record.input,
                    error.as_deref().unwrap_or("unknown error")
                )),
            }
        }
        lines.join("\n")
    }
}

/// 压缩单个文件或目录下的全部图片
///
/// 单文件默认输出为同目录下的 `<stem>_compressed.<ext>`；
/// 目录默认输出到 `<dir>/compressed/`，单个文件失败不影响其他文件。
pub fn compress_path(
    input: &Path,
    output: Option<&Path>,
    options: &CompressOptions,
) -> Result<CompressionReport> {
    let metadata = std::fs::metadata(input).map_err(|_| {
        ArkImageError::validation(
            "input_path",
            format!("input path does not exist: {}", input.display()),
        )
    })?;

    let jobs: Vec<(PathBuf, PathBuf)> = if metadata.is_file() {
        let target = match output {
            Some(path) => path.to_path_buf(),
            None => input.with_file_name(compressed_name(input, options.format)),
        };
        vec![(input.to_path_buf(), target)]
    } else if metadata.is_dir() {
        let out_dir = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| input.join("compressed"));
        std::fs::create_dir_all(&out_dir).map_err(|e| ArkImageError::filesystem(&out_dir, e))?;

        let mut files: Vec<PathBuf> = std::fs::read_dir(input)
            .map_err(|e| ArkImageError::filesystem(input, e))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && has_image_extension(path))
            .collect();
        files.sort();
        files
            .into_iter()
            .map(|file| {
                let target = out_dir.join(compressed_name(&file, options.format));
                (file, target)
            })
            .collect()
    } else {
        return Err(ArkImageError::validation(
            "input_path",
            format!("neither a file nor a directory: {}", input.display()),
        ));
    };

    let mut report = CompressionReport::default();
    for (source, target) in jobs {
        let record = match compress_file(&source, &target, options) {
            Ok((original, new)) => {
                report.processed += 1;
                CompressionRecord {
                    input: source.display().to_string(),
                    output: target.display().to_string(),
                    success: true,
                    original_bytes: Some(original),
                    new_bytes: Some(new),
                    error: None,
                }
            }
            Err(err) => {
                tracing::warn!(input = %source.display(), error = %err, "compression failed");
                CompressionRecord {
                    input: source.display().to_string(),
                    output: target.display().to_string(),
                    success: false,
                    original_bytes: None,
                    new_bytes: None,
                    error: Some(err.to_string()),
                }
            }
        };
        report.records.push(record);
    }

    tracing::info!(
        processed = report.processed,
        total = report.records.len(),
        "image compression completed"
    );
    Ok(report)
}

fn compressed_name(path: &Path, format: OutputFormat) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    format!("{stem}_compressed.{}", format.extension())
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| INPUT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn compress_file(
    input: &Path,
    output: &Path,
    options: &CompressOptions,
) -> anyhow::Result<(u64, u64)> {
    let original_size = std::fs::metadata(input)?.len();
    let mut img = image::open(input)?;

    if img.width() > options.max_width || img.height() > options.max_height {
        img = img.resize(options.max_width, options.max_height, FilterType::Lanczos3);
    }

    let mut writer = BufWriter::new(File::create(output)?);
    match options.format {
        OutputFormat::Jpeg => {
            let rgb = flatten_on_white(&img);
            JpegEncoder::new_with_quality(&mut writer, options.quality).encode_image(&rgb)?;
        }
        OutputFormat::Png => img.write_to(&mut writer, ImageFormat::Png)?,
        OutputFormat::WebP => {
            DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut writer, ImageFormat::WebP)?
        }
    }
    writer.flush()?;
    drop(writer);

    let new_size = std::fs::metadata(output)?.len();
    Ok((original_size, new_size))
}

/// JPEG 不支持透明通道，透明像素按白底合成
fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }

    let rgba = img.to_rgba8();
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u16::from(pixel[3]);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
        out.put_pixel(x, y, Rgb([blend(pixel[0]), blend(pixel[1]), blend(pixel[2])]));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn options(format: OutputFormat) -> CompressOptions {
        CompressOptions {
            max_width: 200,
            max_height: 200,
            quality: 80,
            format,
        }
    }

    #[test]
    fn resizes_single_file_and_keeps_aspect_ratio() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("wide.png");
        RgbImage::from_pixel(400, 200, Rgb([10, 120, 200]))
            .save(&input)
            .unwrap();

        let report = compress_path(&input, None, &options(OutputFormat::Jpeg)).unwrap();
        assert_eq!(report.processed, 1);

        let output = dir.path().join("wide_compressed.jpeg");
        assert_eq!(report.records[0].output, output.display().to_string());
        assert_eq!(image::image_dimensions(&output).unwrap(), (200, 100));
    }

    #[test]
    fn small_images_are_not_upscaled() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("small.png");
        RgbImage::new(120, 80).save(&input).unwrap();
        let output = dir.path().join("out.png");

        compress_path(&input, Some(&output), &options(OutputFormat::Png)).unwrap();
        assert_eq!(image::image_dimensions(&output).unwrap(), (120, 80));
    }

    #[test]
    fn directory_mode_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        RgbImage::new(300, 300).save(dir.path().join("a.png")).unwrap();
        RgbImage::new(50, 50).save(dir.path().join("b.png")).unwrap();
        std::fs::write(dir.path().join("broken.jpg"), b"not an image").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"skip me").unwrap();

        let report = compress_path(dir.path(), None, &options(OutputFormat::WebP)).unwrap();
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.processed, 2);
        assert!(dir.path().join("compressed/a_compressed.webp").exists());
        assert!(!report.records[2].success);

        let summary = report.summary();
        assert!(summary.starts_with("Image compression completed: 2/3"));
        assert!(summary.contains("✗"));
    }

    #[test]
    fn transparent_pixels_become_white() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        img.put_pixel(1, 0, Rgba([255, 0, 0, 255]));
        let flat = flatten_on_white(&DynamicImage::ImageRgba8(img));
        assert_eq!(flat.get_pixel(0, 0), &Rgb([255, 255, 255]));
        assert_eq!(flat.get_pixel(1, 0), &Rgb([255, 0, 0]));
    }

    #[test]
    fn missing_input_is_a_validation_error() {
        let err = compress_path(
            Path::new("/definitely/not/here.png"),
            None,
            &options(OutputFormat::Jpeg),
        )
        .unwrap_err();
        assert_eq!(err.field(), Some("input_path"));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("WebP".parse::<OutputFormat>(), Ok(OutputFormat::WebP));
        assert_eq!("jpg".parse::<OutputFormat>(), Ok(OutputFormat::Jpeg));
        assert!("gif".parse::<OutputFormat>().is_err());
    }
}
