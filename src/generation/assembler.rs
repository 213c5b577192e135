use std::fmt::Write as _;

use super::types::{GeneratedImage, GenerationResult};
use crate::download::DownloadReport;

/// 把下载结果汇总为最终返回值，`count` 始终按实际落盘的图片数重新计算
pub struct ResponseAssembler;

impl ResponseAssembler {
    pub fn assemble(report: DownloadReport) -> GenerationResult {
        let images: Vec<GeneratedImage> = report
            .artifacts
            .into_iter()
            .map(|artifact| GeneratedImage {
                index: artifact.index,
                remote_url: artifact.descriptor.remote_url,
                size: artifact.descriptor.size,
                local_path: artifact.local_path.to_string_lossy().into_owned(),
            })
            .collect();

        GenerationResult {
            count: images.len(),
            images,
            failures: report.failures,
        }
    }
}

impl GenerationResult {
    /// 面向用户的文字摘要，成功和失败的图片按批次序号交错列出
    pub fn summary(&self) -> String {
        let total = self.count + self.failures.len();

        let mut entries: Vec<(usize, String)> = self
            .images
            .iter()
            .map(|image| {
                (
                    image.index,
                    format!(
                        "{} (size: {})\n  → Downloaded to: {}",
                        image.remote_url, image.size, image.local_path
                    ),
                )
            })
            .chain(self.failures.iter().map(|failure| {
                (
                    failure.index,
                    format!("{}\n  → Download failed: {}", failure.url, failure.reason),
                )
            }))
            .collect();
        entries.sort_by_key(|(index, _)| *index);

        let mut out = format!("Generated {total} images:");
        for (index, line) in entries {
            let _ = write!(out, "\nImage {index}: {line}");
        }
        let _ = write!(
            out,
            "\n\nDownload summary: {}/{} images saved successfully",
            self.count, total
        );
        out
    }
}
