use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// 工具清单，序列化后即 `tools/list` 中的一项
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolManifest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

impl ToolManifest {
    pub fn builder(name: impl Into<String>) -> ToolManifestBuilder {
        ToolManifestBuilder::new(name)
    }
}

pub struct ToolManifestBuilder {
    name: String,
    description: Option<String>,
    properties: serde_json::Map<String, Value>,
    required: Vec<String>,
}

impl ToolManifestBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            properties: serde_json::Map::new(),
            required: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// 添加一个输入参数的 JSON Schema
    pub fn property(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.properties.insert(name.into(), schema);
        self
    }

    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.required.push(name.into());
        self
    }

    pub fn build(self) -> ToolManifest {
        let mut input_schema = json!({
            "type": "object",
            "properties": Value::Object(self.properties),
        });
        if !self.required.is_empty() {
            input_schema["required"] = json!(self.required);
        }
        ToolManifest {
            name: self.name,
            description: self.description,
            input_schema,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_produces_object_schema() {
        let manifest = ToolManifest::builder("echo")
            .description("echo text back")
            .property("text", json!({"type": "string"}))
            .required("text")
            .build();

        assert_eq!(manifest.name, "echo");
        assert_eq!(manifest.description.as_deref(), Some("echo text back"));
        assert_eq!(manifest.input_schema["type"], "object");
        assert_eq!(manifest.input_schema["properties"]["text"]["type"], "string");
        assert_eq!(manifest.input_schema["required"], json!(["text"]));

        let value = serde_json::to_value(&manifest).unwrap();
        assert!(value.get("inputSchema").is_some());
    }

    #[test]
    fn required_is_omitted_when_empty() {
        let manifest = ToolManifest::builder("noop").build();
        assert!(manifest.input_schema.get("required").is_none());
        assert!(manifest.description.is_none());
    }
}
