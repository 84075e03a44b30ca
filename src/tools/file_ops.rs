//! file_ops tool - simulated file operations
//!
//! Nothing touches the real filesystem; each operation returns a synthetic payload.

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Parameters, Tool, ToolError, ToolKind, ToolSchema, non_blank};

/// Size reported by a simulated read
const SIMULATED_FILE_SIZE: u64 = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileOperation {
    Read,
    Write,
    List,
    Delete,
}

impl FileOperation {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "read" => Some(Self::Read),
            "write" => Some(Self::Write),
            "list" => Some(Self::List),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

pub struct FileOpsTool {
    schema: ToolSchema,
}

impl FileOpsTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new("file_ops", ToolKind::FileOps, "Perform file operations (read, write, list)")
            .with_parameters(json!({
                "type": "object",
                "properties": {
                    "operation": {
                        "type": "string",
                        "enum": ["read", "write", "list", "delete"],
                        "description": "File operation"
                    },
                    "path": {
                        "type": "string",
                        "description": "File or directory path"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write (for write operation)"
                    }
                },
                "required": ["operation", "path"]
            }));
        Self { schema }
    }
}

impl Default for FileOpsTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FileOpsTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, parameters: &Parameters) -> Result<Value, ToolError> {
        let (Some(raw_operation), Some(path)) = (non_blank(parameters, "operation"), non_blank(parameters, "path")) else {
            return Err(ToolError::invalid_input("Operation and path parameters are required"));
        };

        let operation = FileOperation::parse(raw_operation)
            .ok_or_else(|| ToolError::invalid_input(format!("Unknown operation: {}", raw_operation)))?;

        match operation {
            FileOperation::Read => Ok(json!({
                "operation": raw_operation,
                "path": path,
                "content": format!("Simulated content of {}", path),
                "size": SIMULATED_FILE_SIZE
            })),
            FileOperation::Write => {
                let content = parameters
                    .get("content")
                    .and_then(Value::as_str)
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| ToolError::invalid_input("Content parameter is required for write operation"))?;
                Ok(json!({
                    "operation": raw_operation,
                    "path": path,
                    "bytes_written": content.len()
                }))
            }
            FileOperation::List => {
                let files: Vec<String> = (1..=3).map(|i| format!("file_{}.txt", i)).collect();
                Ok(json!({
                    "operation": raw_operation,
                    "path": path,
                    "count": files.len(),
                    "files": files
                }))
            }
            FileOperation::Delete => Ok(json!({
                "operation": raw_operation,
                "path": path,
                "deleted": true
            })),
        }
    }
}
