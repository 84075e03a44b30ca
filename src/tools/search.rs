//! search tool - ranked pseudo-results for a query

use async_trait::async_trait;
use serde_json::{Value, json};

use super::{Parameters, Tool, ToolError, ToolKind, ToolSchema, non_blank};

/// Limit applied when the caller omits one
pub const DEFAULT_LIMIT: i64 = 10;

/// Stub ceiling on returned results
pub const MAX_RESULTS: i64 = 5;

pub struct SearchTool {
    schema: ToolSchema,
}

impl SearchTool {
    pub fn new() -> Self {
        let schema = ToolSchema::new("search", ToolKind::Search, "Search for content based on a query").with_parameters(
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search query"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of results",
                        "default": DEFAULT_LIMIT
                    }
                },
                "required": ["query"]
            }),
        );
        Self { schema }
    }
}

impl Default for SearchTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for SearchTool {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn execute(&self, parameters: &Parameters) -> Result<Value, ToolError> {
        let query = non_blank(parameters, "query").ok_or_else(|| ToolError::invalid_input("Query parameter is required"))?;

        let limit = match parameters.get("limit") {
            None | Some(Value::Null) => DEFAULT_LIMIT,
            Some(value) => value
                .as_i64()
                .ok_or_else(|| ToolError::invalid_input("Limit parameter must be an integer"))?,
        };

        let count = limit.clamp(0, MAX_RESULTS);
        let results: Vec<Value> = (1..=count)
            .map(|i| {
                json!({
                    "id": i,
                    "title": format!("Result {} for '{}'", i, query),
                    "score": 1.0 - (i as f64 * 0.1)
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "count": results.len(),
            "results": results
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(value: Value) -> Parameters {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_search_returns_ranked_results() {
        let tool = SearchTool::new();
        let result = tool.execute(&params(json!({"query": "test", "limit": 5}))).await.unwrap();

        assert_eq!(result["query"], "test");
        assert_eq!(result["count"], 5);
        let results = result["results"].as_array().unwrap();
        assert_eq!(results.len(), 5);

        let scores: Vec<f64> = results.iter().map(|r| r["score"].as_f64().unwrap()).collect();
        assert!(scores.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(results[0]["title"], "Result 1 for 'test'");
    }

    #[tokio::test]
    async fn test_search_default_limit_is_clamped() {
        let tool = SearchTool::new();
        let result = tool.execute(&params(json!({"query": "rust"}))).await.unwrap();
        assert_eq!(result["count"], 5);
    }

    #[tokio::test]
    async fn test_search_small_limit() {
        let tool = SearchTool::new();
        let result = tool.execute(&params(json!({"query": "rust", "limit": 3}))).await.unwrap();
        assert_eq!(result["count"], 3);

        let result = tool.execute(&params(json!({"query": "rust", "limit": 0}))).await.unwrap();
        assert_eq!(result["count"], 0);
    }

    #[tokio::test]
    async fn test_search_missing_query() {
        let tool = SearchTool::new();
        let err = tool.execute(&params(json!({}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
        assert!(err.to_string().contains("Query parameter is required"));
    }

    #[tokio::test]
    async fn test_search_whitespace_query() {
        let tool = SearchTool::new();
        let err = tool.execute(&params(json!({"query": "   \t"}))).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_search_non_integer_limit() {
        let tool = SearchTool::new();
        let err = tool
            .execute(&params(json!({"query": "rust", "limit": "many"})))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_search_schema() {
        let tool = SearchTool::new();
        assert_eq!(tool.name(), "search");
        assert_eq!(tool.schema().kind, ToolKind::Search);
        assert_eq!(tool.schema().required(), vec!["query"]);
        assert_eq!(tool.schema().parameters["properties"]["limit"]["default"], 10);
    }
}
