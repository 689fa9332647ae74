//! Visit webpage built-in tool.
//!
//! Fetches a page and returns it as readable text, trimmed to a fixed
//! character budget so one page cannot flood the model context.

use crate::messages::ToolArguments;
use crate::tools::{
    ParamType, ToolConfig, ToolContext, ToolError, ToolExecutionFuture, ToolExecutor,
    ToolParameter, ToolSchema,
};
use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;
use std::time::Duration;
use url::{Host, Url};

/// Characters of page text returned to the model.
pub const MAX_PAGE_CHARS: usize = 4000;

/// HTTP timeout for one page fetch.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Line width used when rendering HTML to text.
const RENDER_WIDTH: usize = 120;

const USER_AGENT: &str = concat!("conductor/", env!("CARGO_PKG_VERSION"));

/// Visit webpage tool executor.
#[derive(Debug, Clone)]
pub struct VisitWebpageTool {
    /// HTTP client
    client: reqwest::Client,
    /// Per-request timeout
    timeout: Duration,
    /// Whether loopback and private addresses may be fetched
    allow_private_hosts: bool,
}

impl Default for VisitWebpageTool {
    fn default() -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout: FETCH_TIMEOUT,
            allow_private_hosts: false,
        }
    }
}

impl VisitWebpageTool {
    /// Creates a new visit webpage tool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allows fetching loopback and private-network addresses.
    #[must_use]
    pub fn allow_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn config() -> ToolConfig {
        ToolConfig::new(
            ToolSchema::new(
                "visit_webpage",
                "Fetch a webpage and return its content as plain text (first 4000 characters).",
            )
            .with_parameter(ToolParameter::required(
                "url",
                ParamType::String,
                "The http or https URL of the webpage to read",
            )),
        )
        .with_timeout(FETCH_TIMEOUT + Duration::from_secs(5))
    }

    /// Validates and normalizes the URL.
    fn validate_url(&self, url: &str) -> Result<Url, ToolError> {
        let parsed = Url::parse(url.trim()).map_err(|e| {
            ToolError::validation_failed("visit_webpage", format!("invalid URL '{url}': {e}"))
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(ToolError::validation_failed(
                    "visit_webpage",
                    format!("unsupported URL scheme: {scheme}; only http and https are allowed"),
                ));
            }
        }

        if !self.allow_private_hosts && is_private_host(&parsed) {
            return Err(ToolError::validation_failed(
                "visit_webpage",
                "cannot fetch from localhost or private IP addresses",
            ));
        }

        Ok(parsed)
    }

    async fn fetch(&self, url: Url) -> Result<String, ToolError> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ToolError::timeout("visit_webpage", self.timeout)
                } else {
                    ToolError::execution_failed(
                        "visit_webpage",
                        format!("error fetching {url}: {e}"),
                    )
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::execution_failed(
                "visit_webpage",
                format!("error fetching {url}: HTTP {status}"),
            ));
        }

        let declared_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.to_ascii_lowercase().contains("html"));

        let body = response.text().await.map_err(|e| {
            ToolError::execution_failed(
                "visit_webpage",
                format!("error reading {url}: {e}"),
            )
        })?;

        let text = if declared_html || looks_like_html(&body) {
            html2text::from_read(body.as_bytes(), RENDER_WIDTH)
        } else {
            body
        };

        Ok(clean_page_text(&text))
    }
}

/// Servers often mislabel pages, so markup is sniffed from the body too.
fn looks_like_html(body: &str) -> bool {
    let head = body
        .trim_start()
        .chars()
        .take(15)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}

/// Collapses blank-line runs, trims, and truncates to [`MAX_PAGE_CHARS`].
#[must_use]
pub fn clean_page_text(text: &str) -> String {
    static BLANK_RUNS: OnceLock<Option<Regex>> = OnceLock::new();
    let collapsed = match BLANK_RUNS.get_or_init(|| Regex::new(r"\n{3,}").ok()) {
        Some(re) => re.replace_all(text, "\n\n").into_owned(),
        None => text.to_string(),
    };
    collapsed.trim().chars().take(MAX_PAGE_CHARS).collect()
}

fn is_private_host(url: &Url) -> bool {
    match url.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain == "localhost" || domain.ends_with(".localhost")
        }
        Some(Host::Ipv4(ip)) => is_private_ip(IpAddr::V4(ip)),
        Some(Host::Ipv6(ip)) => is_private_ip(IpAddr::V6(ip)),
        None => true,
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback()
                || v4.is_private()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
        }
        IpAddr::V6(v6) => {
            v6.is_loopback()
                || v6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link local
                || (v6.segments()[0] & 0xfe00) == 0xfc00
                || (v6.segments()[0] & 0xffc0) == 0xfe80
                || v6.to_ipv4_mapped().is_some_and(|v4| is_private_ip(IpAddr::V4(v4)))
        }
    }
}

impl ToolExecutor for VisitWebpageTool {
    fn execute(&self, args: ToolArguments, _ctx: ToolContext) -> ToolExecutionFuture {
        let tool = self.clone();
        Box::pin(async move {
            let url = args
                .get("url")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            if url.trim().is_empty() {
                return Err(ToolError::validation_failed("visit_webpage", "url cannot be empty"));
            }

            let url = tool.validate_url(url)?;
            tracing::debug!(url = %url, "visiting webpage");
            tool.fetch(url).await
        })
    }
}
