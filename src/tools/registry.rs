//! Tool registry - name to tool mapping in registration order

use std::collections::HashMap;
use std::sync::Arc;

use super::{DatabaseTool, FileOpsTool, SearchTool, Tool, ToolSchema};

/// Holds every tool the gateway can invoke
///
/// Registering a name that already exists replaces the earlier tool but keeps its
/// position, so `list()` stays in first-registration order.
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Create an empty registry (for custom tool sets)
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a registry with the built-in tools
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(SearchTool::new()));
        registry.register(Arc::new(DatabaseTool::new()));
        registry.register(Arc::new(FileOpsTool::new()));
        registry
    }

    /// Add a tool, replacing any tool already registered under the same name
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&slot) => {
                log::debug!("Replacing registered tool: {}", name);
                self.tools[slot] = tool;
            }
            None => {
                log::debug!("Registering tool: {}", name);
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| Arc::clone(&self.tools[slot]))
    }

    /// Schemas of all tools, in registration order
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema().clone()).collect()
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tool names, in registration order
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
