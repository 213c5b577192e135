use serde::{Deserialize, Serialize};

use super::env::{EnvConfig, API_KEY_ENV, BASE_URL_ENV, MODEL_ID_ENV};
use crate::error::Result;
use crate::utils::ConfigValidator;

pub const DEFAULT_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_MODEL_ID: &str = "doubao-seedream-4-0-250828";

/// 图片生成服务的连接配置
///
/// 在构造 [`crate::provider::ArkClient`] 时注入，不在代码中写死凭据。
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"***")
            .finish()
    }
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL_ID.to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// 从 `ARK_API_KEY` / `ARK_BASE_URL` / `ARK_MODEL_ID` 读取配置
    pub fn from_env() -> Result<Self> {
        let api_key = EnvConfig::get_api_key("", API_KEY_ENV)?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = EnvConfig::get_env_optional(BASE_URL_ENV) {
            config.base_url = base_url;
        }
        if let Some(model) = EnvConfig::get_env_optional(MODEL_ID_ENV) {
            config.model = model;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        ConfigValidator::validate_api_key(&self.api_key)?;
        ConfigValidator::validate_url(&self.base_url)?;
        ConfigValidator::validate_model_name(&self.model)
    }

    /// 图片生成接口地址
    pub fn generations_endpoint(&self) -> String {
        format!("{}/images/generations", self.base_url.trim_end_matches('/'))
    }
}
