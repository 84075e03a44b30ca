//! database tool - simulated CRUD operations against a named table

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Parameters, Tool, ToolError, ToolKind, ToolSchema, non_blank};

const OPERATIONS: [&str; 4] = ["query", "insert", "update", "delete"];

/// Rows returned by a simulated `query`
const QUERY_ROWS: i64 = 5;

pub struct DatabaseTool {
    schema: ToolSchema,
}

impl DatabaseTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new("database", ToolKind::Database, "Query database for records").with_parameters(json!({
            "type": "object",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": OPERATIONS,
                    "description": "Database operation"
                },
                "table": {
                    "type": "string",
                    "description": "Table name"
                },
                "data": {
                    "type": "object",
                    "description": "Operation data"
                }
            },
            "required": ["operation", "table"]
        }));
        Self { schema }
    }
}

impl Default for DatabaseTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DatabaseTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, parameters: &Parameters) -> Result<Value, ToolError> {
        let (Some(operation), Some(table)) = (non_blank(parameters, "operation"), non_blank(parameters, "table")) else {
            return Err(ToolError::invalid_input("Operation and table parameters are required"));
        };

        if !OPERATIONS.contains(&operation) {
            return Err(ToolError::invalid_input(format!("Unsupported operation: {}", operation)));
        }

        if operation == "query" {
            let records: Vec<Value> = (1..=QUERY_ROWS)
                .map(|i| json!({"id": i, "name": format!("Record {}", i)}))
                .collect();
            return Ok(json!({
                "operation": operation,
                "table": table,
                "affected_rows": QUERY_ROWS,
                "data": records
            }));
        }

        let data = parameters.get("data").cloned().unwrap_or_else(|| json!({}));
        Ok(json!({
            "operation": operation,
            "table": table,
            "affected_rows": 1,
            "data": data
        }))
    }
}
