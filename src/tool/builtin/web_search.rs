use crate::tool::{Tool, ToolContext, ToolError, ToolResult};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::json;
use std::time::Duration;

const SEARCH_URL: &str = "https://html.duckduckgo.com/html/";
const MAX_RESULTS_CAP: usize = 20;

/// DuckDuckGo HTML search, summarised as a numbered text list.
pub struct WebSearchTool {
    client: Client,
    default_max_results: usize,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self::new(5)
    }
}

impl WebSearchTool {
    #[must_use]
    pub fn new(default_max_results: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .user_agent(
                "Mozilla/5.0 (X11; Linux x86_64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/124.0.0.0 Safari/537.36",
            )
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            default_max_results: default_max_results.clamp(1, MAX_RESULTS_CAP),
        }
    }
}

#[derive(Debug)]
struct SearchResult {
    title: String,
    url: String,
    snippet: String,
}

/// Resolve a DuckDuckGo result link to its target.
///
/// Result links look like `//duckduckgo.com/l/?uddg=https%3A%2F%2Fexample.com&rut=...`.
fn extract_ddg_url(href: &str) -> Option<String> {
    let full = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };

    let parsed = reqwest::Url::parse(&full).ok()?;
    if parsed.host_str() == Some("duckduckgo.com") {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, value)| value.into_owned());
    }
    Some(full)
}

fn parse_results(html: &str, max_results: usize) -> Vec<SearchResult> {
    let document = Html::parse_document(html);

    let result_sel = Selector::parse(".result").expect("valid selector");
    let title_sel = Selector::parse(".result__a").expect("valid selector");
    let snippet_sel = Selector::parse(".result__snippet").expect("valid selector");

    document
        .select(&result_sel)
        .filter_map(|element| {
            let title_el = element.select(&title_sel).next()?;
            let title = title_el.text().collect::<String>().trim().to_string();
            let url = title_el.value().attr("href").and_then(extract_ddg_url)?;
            if title.is_empty() || url.is_empty() {
                return None;
            }
            let snippet = element
                .select(&snippet_sel)
                .next()
                .map(|el| el.text().collect::<String>().trim().to_string())
                .unwrap_or_default();
            Some(SearchResult {
                title,
                url,
                snippet,
            })
        })
        .take(max_results)
        .collect()
}

fn summarize(query: &str, results: &[SearchResult]) -> String {
    if results.is_empty() {
        return format!("No results found for \"{query}\".");
    }

    let mut output = format!("Search results for \"{query}\":\n\n");
    for (i, r) in results.iter().enumerate() {
        output.push_str(&format!("{}. {} ({})\n", i + 1, r.title, r.url));
        if !r.snippet.is_empty() {
            output.push_str(&format!("   {}\n", r.snippet));
        }
    }
    output
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for current events, facts, or anything you don't know. \
         Returns result titles, URLs, and snippets."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query"
                },
                "max_results": {
                    "type": "integer",
                    "description": "Maximum number of results to return (max: 20)"
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let query = args
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .ok_or_else(|| ToolError::InvalidArgs("query is required".to_string()))?;

        if query.is_empty() {
            return Err(ToolError::InvalidArgs("query must not be empty".to_string()));
        }

        #[allow(clippy::cast_possible_truncation)]
        let max_results = args
            .get("max_results")
            .and_then(serde_json::Value::as_u64)
            .map_or(self.default_max_results, |v| {
                v.clamp(1, MAX_RESULTS_CAP as u64) as usize
            });

        tracing::debug!(session = %ctx.session_id, query, max_results, "web_search");

        let response = self
            .client
            .post(SEARCH_URL)
            .form(&[("q", query)])
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Ok(ToolResult::error(format!(
                "Search failed: HTTP {}",
                status.as_u16()
            )));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read response: {e}")))?;

        let results = parse_results(&html, max_results);

        Ok(ToolResult {
            content: summarize(query, &results),
            is_error: false,
            metadata: Some(json!({
                "query": query,
                "result_count": results.len(),
            })),
        })
    }
}
