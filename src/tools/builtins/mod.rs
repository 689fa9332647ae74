//! Built-in tools.
//!
//! ## Available Tools
//!
//! ### Web Tools
//! - **web_search**: Search the web via DuckDuckGo
//! - **visit_webpage**: Read a webpage as plain text
//!
//! ### Execution Tools
//! - **calculate**: Evaluate mathematical expressions
//!
//! ## Usage
//!
//! ```rust
//! use conductor::tools::builtins::BuiltinTools;
//!
//! let registry = BuiltinTools::select(&["web_search", "visit_webpage"])
//!     .unwrap()
//!     .into_registry()
//!     .unwrap();
//! assert_eq!(registry.names(), vec!["web_search", "visit_webpage"]);
//! ```

mod calculate;
mod visit_webpage;
mod web_search;

pub use calculate::{CalculateTool, WSE_DIAGONAL_M};
pub use visit_webpage::{clean_page_text, VisitWebpageTool, FETCH_TIMEOUT, MAX_PAGE_CHARS};
pub use web_search::{
    format_results, parse_results, SearchResult, WebSearchTool, DEFAULT_MAX_RESULTS,
    DEFAULT_SEARCH_ENDPOINT,
};

use crate::error::ConfigurationError;
use crate::tools::{RegisteredTool, ToolError, ToolRegistry};
use std::sync::Arc;

/// An ordered selection of built-in tools.
#[derive(Debug, Default, Clone)]
pub struct BuiltinTools {
    tools: Vec<RegisteredTool>,
}

impl BuiltinTools {
    /// Every built-in tool.
    #[must_use]
    pub fn all() -> Self {
        Self {
            tools: Self::available().into_iter().filter_map(builtin).collect(),
        }
    }

    /// Only the named tools, in the order given.
    ///
    /// # Errors
    ///
    /// Returns a not-found `ToolError` listing the available names when a
    /// name is not a built-in.
    pub fn select(names: &[&str]) -> Result<Self, ToolError> {
        let tools = names
            .iter()
            .map(|name| {
                builtin(name).ok_or_else(|| {
                    ToolError::not_found(
                        *name,
                        Self::available().into_iter().map(String::from).collect(),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tools })
    }

    /// Lists all built-in tool names.
    #[must_use]
    pub fn available() -> Vec<&'static str> {
        vec!["web_search", "visit_webpage", "calculate"]
    }

    /// Returns the selected tool with this name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.iter().find(|t| t.name() == name)
    }

    /// Returns the number of selected tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if no tools are selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// The selected tools, in order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredTool> {
        self.tools.iter()
    }

    /// Builds a registry holding the selected tools.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError` if a tool was selected twice.
    pub fn into_registry(self) -> Result<ToolRegistry, ConfigurationError> {
        ToolRegistry::new(self.tools)
    }
}

/// Instantiates one built-in tool by name.
fn builtin(name: &str) -> Option<RegisteredTool> {
    let tool = match name {
        "web_search" => RegisteredTool::new(WebSearchTool::config(), Arc::new(WebSearchTool::new())),
        "visit_webpage" => {
            RegisteredTool::new(VisitWebpageTool::config(), Arc::new(VisitWebpageTool::new()))
        }
        "calculate" => RegisteredTool::new(CalculateTool::config(), Arc::new(CalculateTool::new())),
        _ => return None,
    };
    Some(tool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_creates_every_available_tool() {
        let tools = BuiltinTools::all();
        assert_eq!(tools.len(), BuiltinTools::available().len());
        for name in BuiltinTools::available() {
            assert!(tools.get(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn select_keeps_order() {
        let tools = BuiltinTools::select(&["visit_webpage", "web_search"]).unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name()).collect();
        assert_eq!(names, vec!["visit_webpage", "web_search"]);
        assert!(tools.get("calculate").is_none());
    }

    #[test]
    fn select_unknown_fails_with_alternatives() {
        let error = BuiltinTools::select(&["calculate", "bash"]).unwrap_err();
        assert!(error.is_not_found());
        assert!(error.observation().contains("web_search, visit_webpage, calculate"));
    }

    #[test]
    fn duplicate_selection_fails_at_registry() {
        let tools = BuiltinTools::select(&["calculate", "calculate"]).unwrap();
        assert!(tools.into_registry().unwrap_err().is_duplicate_tool());
    }

    #[test]
    fn empty_selection() {
        let tools = BuiltinTools::default();
        assert!(tools.is_empty());
        assert!(tools.into_registry().unwrap().is_empty());
    }

    #[test]
    fn every_tool_has_description_and_timeout() {
        for tool in BuiltinTools::all().iter() {
            assert!(!tool.config.schema.description.is_empty(), "{}", tool.name());
            assert!(tool.config.timeout.is_some(), "{}", tool.name());
        }
    }
}
