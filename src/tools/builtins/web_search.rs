//! Web search built-in tool.
//!
//! Queries the DuckDuckGo HTML endpoint, which needs no API key, and returns
//! the hits as a markdown list of links with snippets.

use crate::messages::ToolArguments;
use crate::tools::{
    ParamType, ToolConfig, ToolContext, ToolError, ToolExecutionFuture, ToolExecutor,
    ToolParameter, ToolSchema,
};
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use url::Url;

/// DuckDuckGo's JavaScript-free search page.
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

/// Results returned when the model does not ask for a count.
pub const DEFAULT_MAX_RESULTS: usize = 10;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

// DuckDuckGo rejects requests without a browser-like agent.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) conductor";

/// One search hit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    /// Result title
    pub title: String,
    /// Target URL
    pub url: String,
    /// Text snippet, possibly empty
    pub snippet: String,
}

/// Web search tool executor.
#[derive(Debug, Clone)]
pub struct WebSearchTool {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for WebSearchTool {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }
}

impl WebSearchTool {
    /// Creates a web search tool for DuckDuckGo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Points the tool at another endpoint serving DuckDuckGo-style HTML.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn config() -> ToolConfig {
        ToolConfig::new(
            ToolSchema::new(
                "web_search",
                "Search the web and return the top results as markdown links with snippets.",
            )
            .with_parameter(ToolParameter::required(
                "query",
                ParamType::String,
                "The search query",
            ))
            .with_parameter(ToolParameter::optional(
                "max_results",
                ParamType::Integer,
                "Maximum number of results (default 10)",
            )),
        )
        .with_timeout(SEARCH_TIMEOUT + Duration::from_secs(5))
    }

    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<SearchResult>, ToolError> {
        let url = Url::parse_with_params(&self.endpoint, &[("q", query)]).map_err(|e| {
            ToolError::execution_failed("web_search", format!("invalid search endpoint: {e}"))
        })?;

        let response = self
            .client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::timeout("web_search", SEARCH_TIMEOUT)
                } else {
                    ToolError::execution_failed("web_search", format!("search request failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution_failed(
                "web_search",
                format!("search returned HTTP {status}"),
            ));
        }

        let html = response.text().await.map_err(|e| {
            ToolError::execution_failed("web_search", format!("failed to read results: {e}"))
        })?;

        let mut results = parse_results(&html);
        results.truncate(max_results);
        Ok(results)
    }
}

struct ResultPatterns {
    link: Regex,
    snippet: Regex,
    href: Regex,
    tag: Regex,
}

fn patterns() -> Option<&'static ResultPatterns> {
    static PATTERNS: OnceLock<Option<ResultPatterns>> = OnceLock::new();
    PATTERNS
        .get_or_init(|| {
            Some(ResultPatterns {
                link: Regex::new(r#"(?s)<a([^>]*class="result__a"[^>]*)>(.*?)</a>"#).ok()?,
                snippet: Regex::new(r#"(?s)<a[^>]*class="result__snippet"[^>]*>(.*?)</a>"#).ok()?,
                href: Regex::new(r#"href="([^"]*)""#).ok()?,
                tag: Regex::new(r"<[^>]+>").ok()?,
            })
        })
        .as_ref()
}

/// Extracts results from a DuckDuckGo HTML results page.
///
/// Titles and snippets are paired by position; a page without snippets
/// still yields titled links.
#[must_use]
pub fn parse_results(html: &str) -> Vec<SearchResult> {
    let Some(p) = patterns() else {
        return Vec::new();
    };

    let snippets: Vec<String> = p
        .snippet
        .captures_iter(html)
        .map(|c| clean_fragment(&p.tag, &c[1]))
        .collect();

    p.link
        .captures_iter(html)
        .enumerate()
        .filter_map(|(i, c)| {
            let href = p.href.captures(&c[1])?;
            let url = resolve_redirect(&decode_entities(&href[1]))?;
            Some(SearchResult {
                title: clean_fragment(&p.tag, &c[2]),
                url,
                snippet: snippets.get(i).cloned().unwrap_or_default(),
            })
        })
        .collect()
}

/// Unwraps DuckDuckGo's `/l/?uddg=<target>` redirect links.
fn resolve_redirect(href: &str) -> Option<String> {
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else {
        href.to_string()
    };
    let parsed = Url::parse(&absolute).ok()?;

    if parsed.path().starts_with("/l/") {
        return parsed
            .query_pairs()
            .find(|(key, _)| key == "uddg")
            .map(|(_, target)| target.into_owned());
    }
    Some(parsed.to_string())
}

fn clean_fragment(tag: &Regex, fragment: &str) -> String {
    let text = tag.replace_all(fragment, "");
    decode_entities(text.trim())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(text: &str) -> String {
    text.replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Renders results the way the model sees them.
#[must_use]
pub fn format_results(results: &[SearchResult]) -> String {
    let entries: Vec<String> = results
        .iter()
        .map(|r| {
            if r.snippet.is_empty() {
                format!("[{}]({})", r.title, r.url)
            } else {
                format!("[{}]({})\n{}", r.title, r.url, r.snippet)
            }
        })
        .collect();
    format!("## Search Results\n\n{}", entries.join("\n\n"))
}

impl ToolExecutor for WebSearchTool {
    fn execute(&self, args: ToolArguments, _ctx: ToolContext) -> ToolExecutionFuture {
        let tool = self.clone();
        Box::pin(async move {
            let query = args
                .get("query")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string();
            if query.is_empty() {
                return Err(ToolError::validation_failed("web_search", "query cannot be empty"));
            }
            let max_results = args
                .get("max_results")
                .and_then(|v| v.as_u64())
                .map_or(DEFAULT_MAX_RESULTS, |n| n.clamp(1, 25) as usize);

            tracing::debug!(query = %query, max_results, "searching the web");
            let results = tool.search(&query, max_results).await?;
            if results.is_empty() {
                return Err(ToolError::execution_failed(
                    "web_search",
                    format!("No results found for '{query}'. Try a less restrictive query."),
                ));
            }
            Ok(format_results(&results))
        })
    }
}
