use std::path::PathBuf;

use serde_json::{Map, Value};

use super::reference::check_reference_image;
use super::types::{
    GenerationRequest, ImageSize, SequentialMode, DEFAULT_MAX_IMAGES, DEFAULT_SIZE,
    MAX_REFERENCE_IMAGES, MAX_SEQUENTIAL_IMAGES, MAX_SINGLE_SHOT_IMAGES,
};
use crate::error::{ArkImageError, Result};

/// 调用参数校验器
///
/// 把工具调用传入的原始 JSON 参数规范化为 [`GenerationRequest`]。
/// 只读取参数和参考图文件，不访问网络，也不创建输出目录。
pub struct ParameterValidator;

impl ParameterValidator {
    pub fn validate(arguments: &Value) -> Result<GenerationRequest> {
        let args = arguments
            .as_object()
            .ok_or_else(|| ArkImageError::validation("arguments", "must be a JSON object"))?;

        let prompt = Self::prompt(args)?;
        let sequential_mode = Self::sequential_mode(args)?;

        let num_images = Self::integer(args, &["num_images"], 1)?;
        if sequential_mode == SequentialMode::Disabled
            && !(1..=i64::from(MAX_SINGLE_SHOT_IMAGES)).contains(&num_images)
        {
            return Err(ArkImageError::validation(
                "num_images",
                format!("must be between 1 and {MAX_SINGLE_SHOT_IMAGES}, got {num_images}"),
            ));
        }

        let max_images = Self::integer(args, &["max_images"], i64::from(DEFAULT_MAX_IMAGES))?;
        if sequential_mode == SequentialMode::Auto
            && !(1..=i64::from(MAX_SEQUENTIAL_IMAGES)).contains(&max_images)
        {
            return Err(ArkImageError::validation(
                "max_images",
                format!("must be between 1 and {MAX_SEQUENTIAL_IMAGES}, got {max_images}"),
            ));
        }

        let size = match Self::lookup(args, &["size"]) {
            None => DEFAULT_SIZE,
            Some(Value::String(raw)) => raw
                .parse::<ImageSize>()
                .map_err(|message| ArkImageError::validation("size", message))?,
            Some(_) => return Err(ArkImageError::validation("size", "must be a string")),
        };

        let watermark = match Self::lookup(args, &["watermark"]) {
            None => false,
            Some(Value::Bool(flag)) => *flag,
            Some(_) => return Err(ArkImageError::validation("watermark", "must be a boolean")),
        };

        let output_dir = match Self::lookup(args, &["output_dir"]) {
            None => PathBuf::from("."),
            Some(Value::String(dir)) if !dir.trim().is_empty() => PathBuf::from(dir),
            Some(Value::String(_)) => {
                return Err(ArkImageError::validation("output_dir", "must not be empty"))
            }
            Some(_) => return Err(ArkImageError::validation("output_dir", "must be a string")),
        };

        let reference_image_paths = Self::reference_images(args)?;
        if sequential_mode == SequentialMode::Auto
            && reference_image_paths.len() as i64 + max_images > i64::from(MAX_SEQUENTIAL_IMAGES)
        {
            return Err(ArkImageError::validation(
                "max_images",
                format!(
                    "{} reference images plus {max_images} generated images exceed the total of {MAX_SEQUENTIAL_IMAGES}",
                    reference_image_paths.len()
                ),
            ));
        }

        Ok(GenerationRequest {
            prompt,
            num_images: num_images.clamp(1, i64::from(MAX_SINGLE_SHOT_IMAGES)) as u32,
            size,
            watermark,
            output_dir,
            reference_image_paths,
            sequential_mode,
            max_images: max_images.clamp(1, i64::from(MAX_SEQUENTIAL_IMAGES)) as u32,
        })
    }

    /// 取第一个非 null 的字段（支持别名）
    fn lookup<'a>(args: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
        names
            .iter()
            .find_map(|name| args.get(*name).filter(|v| !v.is_null()))
    }

    fn prompt(args: &Map<String, Value>) -> Result<String> {
        match Self::lookup(args, &["prompt"]) {
            Some(Value::String(prompt)) if !prompt.trim().is_empty() => Ok(prompt.clone()),
            Some(Value::String(_)) => Err(ArkImageError::validation("prompt", "must not be empty")),
            Some(_) => Err(ArkImageError::validation("prompt", "must be a string")),
            None => Err(ArkImageError::validation("prompt", "is required")),
        }
    }

    fn sequential_mode(args: &Map<String, Value>) -> Result<SequentialMode> {
        match Self::lookup(args, &["sequential_mode", "sequential_image_generation"]) {
            None => Ok(SequentialMode::Disabled),
            Some(Value::String(mode)) => mode
                .parse()
                .map_err(|message| ArkImageError::validation("sequential_mode", message)),
            Some(Value::Bool(false)) => Ok(SequentialMode::Disabled),
            Some(_) => Err(ArkImageError::validation(
                "sequential_mode",
                "must be `auto` or `disabled`",
            )),
        }
    }

    fn integer(args: &Map<String, Value>, names: &[&str], default: i64) -> Result<i64> {
        match Self::lookup(args, names) {
            None => Ok(default),
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ArkImageError::validation(names[0], "must be an integer")),
        }
    }

    fn reference_images(args: &Map<String, Value>) -> Result<Vec<PathBuf>> {
        const FIELD: &str = "reference_image_paths";

        let items = match Self::lookup(args, &[FIELD, "image_paths"]) {
            None => return Ok(Vec::new()),
            Some(Value::Array(items)) => items,
            Some(_) => return Err(ArkImageError::validation(FIELD, "must be an array of paths")),
        };
        if items.len() > MAX_REFERENCE_IMAGES {
            return Err(ArkImageError::validation(
                FIELD,
                format!(
                    "at most {MAX_REFERENCE_IMAGES} reference images are allowed, got {}",
                    items.len()
                ),
            ));
        }

        items
            .iter()
            .map(|item| {
                let raw = item
                    .as_str()
                    .filter(|s| !s.trim().is_empty())
                    .ok_or_else(|| {
                        ArkImageError::validation(FIELD, format!("`{item}` is not a valid path"))
                    })?;
                let path = PathBuf::from(raw);
                check_reference_image(&path)
                    .map_err(|message| ArkImageError::validation(FIELD, message))?;
                Ok(path)
            })
            .collect()
    }
}
