//! 图片下载：把远程 URL 落盘到输出目录，文件名保证不覆盖已有文件

pub mod fetcher;
pub mod naming;

use std::path::{Path, PathBuf};

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ArkImageError, DownloadFailure, Result};
use crate::generation::{DownloadedArtifact, ImageDescriptor};

pub use fetcher::{DynImageFetcher, FetchedImage, HttpFetcher, ImageFetcher};
pub use naming::{artifact_file_name, extension_for_content_type};

/// 批次中部分图片下载失败时的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadPolicy {
    /// 保留成功的图片，失败的记录在结果里
    #[default]
    BestEffort,
    /// 任意一张失败即整体失败，并删除本次已写入的文件
    AllOrNothing,
}

#[derive(Clone, Debug, Default)]
pub struct DownloadReport {
    pub artifacts: Vec<DownloadedArtifact>,
    pub failures: Vec<DownloadFailure>,
}

#[derive(Clone)]
pub struct ArtifactDownloader {
    fetcher: DynImageFetcher,
    policy: DownloadPolicy,
}

impl ArtifactDownloader {
    pub fn new(fetcher: DynImageFetcher) -> Self {
        Self {
            fetcher,
            policy: DownloadPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: DownloadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// 并发下载全部图片，结果保持输入顺序
    pub async fn download_all(
        &self,
        output_dir: &Path,
        descriptors: Vec<ImageDescriptor>,
    ) -> Result<DownloadReport> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| ArkImageError::filesystem(output_dir, e))?;

        let attempted = descriptors.len();
        info!(count = attempted, dir = %output_dir.display(), "downloading images");

        let outcomes = join_all(descriptors.into_iter().enumerate().map(
            |(offset, descriptor)| async move {
                let index = offset + 1;
                let outcome = self.download_one(output_dir, index, &descriptor).await;
                (index, descriptor, outcome)
            },
        ))
        .await;

        let mut report = DownloadReport::default();
        for (index, descriptor, outcome) in outcomes {
            match outcome {
                Ok((local_path, byte_length)) => {
                    info!(index, path = %local_path.display(), bytes = byte_length, "image saved");
                    report.artifacts.push(DownloadedArtifact {
                        index,
                        descriptor,
                        local_path,
                        byte_length,
                    });
                }
                Err(err) => {
                    warn!(
                        index,
                        url = %descriptor.remote_url,
                        error = %err,
                        "image download failed"
                    );
                    report.failures.push(DownloadFailure {
                        index,
                        url: descriptor.remote_url,
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            saved = report.artifacts.len(),
            total = attempted,
            "download complete"
        );

        if report.failures.is_empty() {
            return Ok(report);
        }
        if report.artifacts.is_empty() {
            return Err(ArkImageError::Download {
                attempted,
                failures: report.failures,
            });
        }
        if self.policy == DownloadPolicy::AllOrNothing {
            for artifact in &report.artifacts {
                if let Err(err) = tokio::fs::remove_file(&artifact.local_path).await {
                    warn!(
                        path = %artifact.local_path.display(),
                        error = %err,
                        "failed to remove partial artifact"
                    );
                }
            }
            return Err(ArkImageError::Download {
                attempted,
                failures: report.failures,
            });
        }
        Ok(report)
    }

    async fn download_one(
        &self,
        output_dir: &Path,
        index: usize,
        descriptor: &ImageDescriptor,
    ) -> Result<(PathBuf, u64)> {
        let fetched = self.fetcher.fetch(&descriptor.remote_url).await?;
        if fetched.bytes.is_empty() {
            return Err(ArkImageError::Other(anyhow::anyhow!(
                "download returned an empty body"
            )));
        }

        let extension = extension_for_content_type(fetched.content_type.as_deref());
        let path = naming::persist_unique(output_dir, index, extension, &fetched.bytes)
            .await
            .map_err(|e| ArkImageError::filesystem(output_dir, e))?;
        Ok((path, fetched.bytes.len() as u64))
    }
}
