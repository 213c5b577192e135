use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArkImageError>;

/// 单个图片下载失败的记录
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct DownloadFailure {
    /// 在本次批次中的位置（从 1 开始）
    pub index: usize,
    pub url: String,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ArkImageError {
    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("provider error{}: {message}", code_suffix(.code))]
    Provider {
        code: Option<String>,
        message: String,
    },
    #[error("filesystem error at `{}`: {source}", .path.display())]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} of {attempted} downloads failed", .failures.len())]
    Download {
        attempted: usize,
        failures: Vec<DownloadFailure>,
    },
    #[error("tool `{0}` not registered")]
    ToolNotRegistered(String),
    #[error("manifest for {kind} `{name}` does not match")]
    ManifestMismatch { kind: &'static str, name: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn code_suffix(code: &Option<String>) -> String {
    code.as_deref()
        .map(|c| format!(" [{c}]"))
        .unwrap_or_default()
}

impl ArkImageError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        Self::Provider {
            code: None,
            message: message.into(),
        }
    }

    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }

    /// 返回给调用方的稳定错误标签
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation_error",
            Self::Provider { .. } => "provider_error",
            Self::Filesystem { .. } => "filesystem_error",
            Self::Download { .. } => "download_error",
            Self::ToolNotRegistered(_) => "tool_not_registered",
            Self::ManifestMismatch { .. } => "manifest_mismatch",
            Self::Config(_) => "config_error",
            Self::Other(_) => "internal_error",
        }
    }

    /// 出错的参数名，仅对参数校验错误有值
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Validation { field, .. } => Some(field),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_display_includes_code() {
        let err = ArkImageError::Provider {
            code: Some("InvalidParameter".into()),
            message: "size is not supported".into(),
        };
        assert_eq!(
            err.to_string(),
            "provider error [InvalidParameter]: size is not supported"
        );
        assert_eq!(
            ArkImageError::provider("boom").to_string(),
            "provider error: boom"
        );
    }

    #[test]
    fn kind_and_field_tags() {
        let err = ArkImageError::validation("prompt", "must not be empty");
        assert_eq!(err.kind(), "validation_error");
        assert_eq!(err.field(), Some("prompt"));
        assert_eq!(err.to_string(), "invalid `prompt`: must not be empty");

        let err = ArkImageError::Download {
            attempted: 2,
            failures: vec![],
        };
        assert_eq!(err.kind(), "download_error");
        assert!(err.field().is_none());
    }
}
