//! Calculate built-in tool.
//!
//! The code-executing capability of a calculation agent. Expressions are
//! evaluated with fasteval, a math-only parser, so the model never gets
//! arbitrary code execution.

use crate::messages::ToolArguments;
use crate::tools::{
    ParamType, ToolConfig, ToolContext, ToolError, ToolExecutionFuture, ToolExecutor,
    ToolParameter, ToolSchema,
};
use fasteval::ez_eval;
use std::collections::BTreeMap;
use std::time::Duration;

/// Diagonal of a Cerebras Wafer-Scale Engine, in metres.
pub const WSE_DIAGONAL_M: f64 = 0.215;

/// Longest expression accepted.
const MAX_EXPRESSION_LEN: usize = 1000;

/// Calculate tool executor.
#[derive(Debug, Default, Clone)]
pub struct CalculateTool;

impl CalculateTool {
    /// Creates a new calculate tool.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Returns the tool configuration for registration.
    #[must_use]
    pub fn config() -> ToolConfig {
        ToolConfig::new(
            ToolSchema::new(
                "calculate",
                "Evaluate a mathematical expression and return the number. Supports arithmetic \
                 (+, -, *, /, ^, %), comparisons and functions (sin, cos, tan, log, abs, min, max, \
                 floor, ceil, round, pi(), e()). The variable wse_diagonal_m is the diagonal of a \
                 Wafer-Scale Engine in metres (0.215).",
            )
            .with_parameter(ToolParameter::required(
                "expression",
                ParamType::String,
                "Expression to evaluate, e.g. '2 + 2' or '1200 / wse_diagonal_m'",
            ))
            .with_parameter(ToolParameter::optional(
                "variables",
                ParamType::Object,
                "Variable bindings, e.g. {\"x\": 5, \"y\": 10}",
            )),
        )
        .with_timeout(Duration::from_secs(5))
    }

    /// Evaluates an expression with optional variable bindings.
    ///
    /// # Errors
    ///
    /// Returns `ToolError` for an empty, oversized or unparseable expression
    /// or a non-numeric variable.
    pub fn evaluate(
        expression: &str,
        variables: Option<&serde_json::Value>,
    ) -> Result<f64, ToolError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(ToolError::validation_failed(
                "calculate",
                "expression cannot be empty",
            ));
        }
        if expression.len() > MAX_EXPRESSION_LEN {
            return Err(ToolError::validation_failed(
                "calculate",
                format!("expression is too long (max {MAX_EXPRESSION_LEN} characters)"),
            ));
        }

        let mut bindings = BTreeMap::from([("wse_diagonal_m".to_string(), WSE_DIAGONAL_M)]);
        if let Some(serde_json::Value::Object(vars)) = variables {
            for (name, value) in vars {
                let number = value.as_f64().ok_or_else(|| {
                    ToolError::validation_failed(
                        "calculate",
                        format!("variable '{name}' must be a number"),
                    )
                })?;
                bindings.insert(name.clone(), number);
            }
        }

        let mut namespace =
            |name: &str, _args: Vec<f64>| -> Option<f64> { bindings.get(name).copied() };

        ez_eval(expression, &mut namespace).map_err(|e| {
            ToolError::execution_failed("calculate", format!("failed to evaluate expression: {e}"))
        })
    }

    /// Formats a result: whole numbers without a decimal point, non-finite
    /// values by name.
    #[must_use]
    pub fn format(result: f64) -> String {
        if result.is_nan() {
            "NaN".to_string()
        } else if result.is_infinite() {
            if result.is_sign_positive() {
                "Infinity".to_string()
            } else {
                "-Infinity".to_string()
            }
        } else if result.fract() == 0.0 && result.abs() < 1e15 {
            format!("{}", result as i64)
        } else {
            format!("{result}")
        }
    }
}

impl ToolExecutor for CalculateTool {
    fn execute(&self, args: ToolArguments, _ctx: ToolContext) -> ToolExecutionFuture {
        Box::pin(async move {
            let expression = args
                .get("expression")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let result = Self::evaluate(expression, args.get("variables"))?;
            Ok(Self::format(result))
        })
    }
}
