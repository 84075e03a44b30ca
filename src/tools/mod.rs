//! Tool System - schemas, the Tool trait, built-in stub tools and the registry
//!
//! Every tool pins its schema at construction and executes a parameter map into
//! either a JSON result or a typed [`ToolError`].

mod database;
mod file_ops;
mod registry;
mod search;

pub use database::DatabaseTool;
pub use file_ops::FileOpsTool;
pub use registry::ToolRegistry;
pub use search::SearchTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Parameter map handed to [`Tool::execute`]
pub type Parameters = Map<String, Value>;

/// Closed set of tool categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Search,
    Database,
    FileOps,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Search => "search",
            Self::Database => "database",
            Self::FileOps => "file_ops",
        }
    }
}

/// Self-description of a tool, as returned by `list_tools`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique registry key
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub description: String,
    /// JSON-Schema-like object with `type`, `properties` and `required`
    pub parameters: Value,
}

impl ToolSchema {
    pub fn new(name: impl Into<String>, kind: ToolKind, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            parameters: serde_json::json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
        }
    }

    /// Set the parameter schema
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Names listed under `required`
    pub fn required(&self) -> Vec<&str> {
        self.parameters["required"]
            .as_array()
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Failure raised by a tool's own logic
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    /// Missing or malformed required parameter
    #[error("InvalidInput: {0}")]
    InvalidInput(String),

    /// Domain-specific failure
    #[error("ExecutionError: {0}")]
    Execution(String),
}

impl ToolError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }
}

/// A named capability exposed through the gateway
#[async_trait]
pub trait Tool: Send + Sync {
    /// Schema pinned at construction
    fn schema(&self) -> &ToolSchema;

    /// Run the tool against the caller's parameters
    async fn execute(&self, parameters: &Parameters) -> Result<Value, ToolError>;

    fn name(&self) -> &str {
        &self.schema().name
    }
}

/// Non-blank string parameter, or `None`
pub(crate) fn non_blank<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
}
