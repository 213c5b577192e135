use crate::error::{ArkImageError, Result};

const KEY_PLACEHOLDERS: &[&str] = &["REPLACE_WITH_YOUR_KEY", "your_api_key", "changeme"];

/// 配置验证器
pub struct ConfigValidator;

impl ConfigValidator {
    /// 验证 API Key，拒绝空值和占位符
    pub fn validate_api_key(api_key: &str) -> Result<()> {
        let trimmed = api_key.trim();
        if trimmed.is_empty() {
            return Err(ArkImageError::Config("API key must not be empty".into()));
        }

        if trimmed.starts_with("your_")
            || KEY_PLACEHOLDERS
                .iter()
                .any(|p| trimmed.eq_ignore_ascii_case(p))
        {
            return Err(ArkImageError::Config(
                "API key looks like a placeholder, set ARK_API_KEY to a real key".into(),
            ));
        }

        Ok(())
    }

    /// 验证 URL 格式
    pub fn validate_url(url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ArkImageError::Config("base URL must not be empty".into()));
        }

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ArkImageError::Config(format!(
                "base URL must start with http:// or https://, got `{}`",
                url
            )));
        }

        Ok(())
    }

    /// 验证模型名称
    pub fn validate_model_name(model: &str) -> Result<()> {
        if model.trim().is_empty() {
            return Err(ArkImageError::Config("model id must not be empty".into()));
        }

        if !model.contains("seedream") {
            tracing::warn!(
                model = %model,
                "model id does not look like a Seedream model, image generation may be rejected"
            );
        }

        Ok(())
    }
}
