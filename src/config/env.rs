use crate::error::{ArkImageError, Result};
use std::env;

pub const API_KEY_ENV: &str = "ARK_API_KEY";
pub const BASE_URL_ENV: &str = "ARK_BASE_URL";
pub const MODEL_ID_ENV: &str = "ARK_MODEL_ID";
pub const DEBUG_ENV: &str = "ARKIMAGE_DEBUG";

/// 环境变量配置管理
pub struct EnvConfig;

impl EnvConfig {
    /// 获取 API Key
    ///
    /// 优先级：
    /// 1. 直接传入的 api_key（如果不以 ${} 包裹）
    /// 2. `${VAR_NAME}` 形式时读取对应环境变量
    /// 3. 为空时读取 `default_env_var`
    pub fn get_api_key(api_key: &str, default_env_var: &str) -> Result<String> {
        if api_key.starts_with("${") && api_key.ends_with('}') {
            let env_var_name = &api_key[2..api_key.len() - 1];
            Self::get_env(env_var_name)
        } else if api_key.is_empty() {
            Self::get_env(default_env_var)
        } else {
            Ok(api_key.to_string())
        }
    }

    /// 从环境变量获取值
    pub fn get_env(key: &str) -> Result<String> {
        env::var(key).map_err(|_| {
            ArkImageError::Config(format!(
                "environment variable `{}` is not set, get an API key from https://console.volcengine.com/ark",
                key
            ))
        })
    }

    /// 获取可选的环境变量，空字符串视为未设置
    pub fn get_env_optional(key: &str) -> Option<String> {
        env::var(key).ok().filter(|v| !v.trim().is_empty())
    }

    pub fn is_debug_mode() -> bool {
        env::var(DEBUG_ENV).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_api_key_direct() {
        let result = EnvConfig::get_api_key("ark-1234567890abcdef", "ARKIMAGE_TEST_UNUSED");
        assert_eq!(result.unwrap(), "ark-1234567890abcdef");
    }

    #[test]
    fn test_get_api_key_env_var() {
        env::set_var("ARKIMAGE_TEST_KEY", "test_key_value");
        let result = EnvConfig::get_api_key("${ARKIMAGE_TEST_KEY}", "ARKIMAGE_TEST_FALLBACK");
        assert_eq!(result.unwrap(), "test_key_value");
        env::remove_var("ARKIMAGE_TEST_KEY");
    }

    #[test]
    fn test_get_api_key_missing() {
        env::remove_var("ARKIMAGE_TEST_MISSING");
        let err = EnvConfig::get_api_key("", "ARKIMAGE_TEST_MISSING").unwrap_err();
        assert_eq!(err.kind(), "config_error");
    }

    #[test]
    fn test_optional_ignores_blank() {
        env::set_var("ARKIMAGE_TEST_BLANK", "  ");
        assert!(EnvConfig::get_env_optional("ARKIMAGE_TEST_BLANK").is_none());
        env::remove_var("ARKIMAGE_TEST_BLANK");
    }
}
