use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{ArkImageError, Result};
use crate::tools::manifest::ToolManifest;
use crate::tools::tool::{Tool, ToolInvocation, ToolOutput};

#[derive(Clone)]
struct ToolEntry {
    tool: Arc<dyn Tool>,
    manifest: Option<Arc<ToolManifest>>,
}

#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: BTreeMap<String, ToolEntry>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let _ = self.insert(tool, None);
    }

    pub fn register_with_manifest(
        &mut self,
        tool: Arc<dyn Tool>,
        manifest: ToolManifest,
    ) -> Result<()> {
        self.insert(tool, Some(manifest))
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| Arc::clone(&entry.tool))
    }

    pub fn manifest(&self, name: &str) -> Option<Arc<ToolManifest>> {
        self.tools
            .get(name)
            .and_then(|entry| entry.manifest.as_ref().map(Arc::clone))
    }

    /// 按名称排序的全部工具清单，未登记清单的工具只带名称
    pub fn manifests(&self) -> Vec<ToolManifest> {
        self.tools
            .iter()
            .map(|(name, entry)| match &entry.manifest {
                Some(manifest) => manifest.as_ref().clone(),
                None => ToolManifest::builder(name.clone()).build(),
            })
            .collect()
    }

    pub async fn call(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        let tool = self
            .get(&invocation.name)
            .ok_or_else(|| ArkImageError::ToolNotRegistered(invocation.name.clone()))?;
        tool.call(invocation).await
    }

    fn insert(&mut self, tool: Arc<dyn Tool>, manifest: Option<ToolManifest>) -> Result<()> {
        if let Some(ref manifest) = manifest {
            if manifest.name != tool.name() {
                return Err(ArkImageError::ManifestMismatch {
                    kind: "tool",
                    name: tool.name().to_string(),
                });
            }
        }

        self.tools.insert(
            tool.name().to_string(),
            ToolEntry {
                tool,
                manifest: manifest.map(Arc::new),
            },
        );
        Ok(())
    }
}
