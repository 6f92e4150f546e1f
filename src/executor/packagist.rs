// Packagist tool - package discovery over the Packagist search API

use crate::executor::{ExecutorError, Result, ToolContext, ToolOutput};
use crate::provider::ToolDefinition;
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info};

const SEARCH_URL: &str = "https://packagist.org/search.json";
const DEFAULT_LIMIT: u32 = 10;
const MAX_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
struct PackagistInput {
    query: String,
    #[serde(default)]
    limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
    #[serde(default)]
    total: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    downloads: u64,
}

/// Package discovery tool backed by the Packagist search endpoint.
pub struct PackagistTool {
    client: reqwest::Client,
    description: String,
}

impl PackagistTool {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            description: description.into(),
        }
    }
}

#[async_trait]
impl crate::executor::ToolImpl for PackagistTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search_packages".to_string(),
            description: self.description.clone(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Search terms, e.g. 'http client'"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum results to return (default 10, max 50)"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn run(&self, input: serde_json::Value, _ctx: &ToolContext) -> Result<ToolOutput> {
        let PackagistInput { query, limit } = serde_json::from_value(input)
            .map_err(|e| ExecutorError::InvalidInput("search_packages".to_string(), e.to_string()))?;

        let query = query.trim();
        if query.is_empty() {
            return Err(ExecutorError::InvalidInput(
                "search_packages".to_string(),
                "'query' is required".to_string(),
            ));
        }
        let limit = limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        debug!(query = %query, limit = limit, "searching packagist");

        let response = match self
            .client
            .get(SEARCH_URL)
            .query(&[("q", query), ("per_page", &limit.to_string())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => return Ok(ToolOutput::error(format!("packagist request failed: {}", e))),
        };

        if !response.status().is_success() {
            return Ok(ToolOutput::error(format!(
                "packagist returned HTTP {}",
                response.status().as_u16()
            )));
        }

        let parsed: SearchResponse = match response.json().await {
            Ok(p) => p,
            Err(e) => {
                return Ok(ToolOutput::error(format!(
                    "failed to parse packagist response: {}",
                    e
                )))
            }
        };

        if parsed.results.is_empty() {
            return Ok(ToolOutput::success(format!("No packages found for '{}'.", query)));
        }

        let mut lines = vec![format!(
            "{} packages found (showing {}):",
            parsed.total,
            parsed.results.len()
        )];
        for result in &parsed.results {
            lines.push(format!(
                "- {} ({} downloads): {}",
                result.name, result.downloads, result.description
            ));
        }

        info!(query = %query, results = parsed.results.len(), "packagist search completed");
        Ok(ToolOutput::success(lines.join("\n")))
    }
}

/// Default packagist tool description
pub fn default_packagist_description() -> String {
    "Search Packagist for packages by keyword. Returns package names, \
     download counts and descriptions."
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::ToolImpl;
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_query_is_invalid_input() {
        let tool = PackagistTool::new(default_packagist_description());
        let result = tool.run(json!({"query": "  "}), &ToolContext::default()).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_search_response_parsing() {
        let body = r#"{
            "results": [
                {"name": "guzzlehttp/guzzle", "description": "HTTP client", "url": "x", "downloads": 100},
                {"name": "symfony/http-client", "downloads": 50}
            ],
            "total": 2
        }"#;
        let parsed: SearchResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.total, 2);
        assert_eq!(parsed.results.len(), 2);
        assert_eq!(parsed.results[0].name, "guzzlehttp/guzzle");
        assert_eq!(parsed.results[1].description, "");
    }
}
