//! Tool schemas and argument validation.
//!
//! Model-supplied arguments are untrusted. [`ToolSchema::validate`] checks
//! them against the declared parameters before a tool ever sees them, and
//! coerces the common near-misses (numbers sent as strings and the like).

use crate::messages::ToolArguments;
use crate::tools::error::ToolError;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// JSON type of a tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    /// A JSON string
    String,
    /// A whole number
    Integer,
    /// Any JSON number
    Number,
    /// `true` or `false`
    Boolean,
    /// A JSON object
    Object,
    /// A JSON array
    Array,
}

impl ParamType {
    /// The JSON Schema type keyword.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    /// Returns the value as this type, coercing where unambiguous.
    fn coerce(self, value: Value) -> Result<Value, Value> {
        match (self, value) {
            (Self::String, v @ Value::String(_)) => Ok(v),
            (Self::String, v @ (Value::Number(_) | Value::Bool(_))) => {
                Ok(Value::String(v.to_string()))
            }
            (Self::Integer, v @ Value::Number(_)) if is_integral(&v) => Ok(v),
            (Self::Integer, Value::String(s)) => match s.trim().parse::<i64>() {
                Ok(n) => Ok(json!(n)),
                Err(_) => Err(Value::String(s)),
            },
            (Self::Number, v @ Value::Number(_)) => Ok(v),
            (Self::Number, Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(json!(n)),
                _ => Err(Value::String(s)),
            },
            (Self::Boolean, v @ Value::Bool(_)) => Ok(v),
            (Self::Boolean, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(Value::Bool(true)),
                "false" => Ok(Value::Bool(false)),
                _ => Err(Value::String(s)),
            },
            (Self::Object, v @ Value::Object(_)) => Ok(v),
            (Self::Array, v @ Value::Array(_)) => Ok(v),
            (_, other) => Err(other),
        }
    }
}

fn is_integral(value: &Value) -> bool {
    value.is_i64()
        || value.is_u64()
        || value
            .as_f64()
            .is_some_and(|f| f.fract() == 0.0 && f.is_finite())
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Argument key
    pub name: String,
    /// Expected JSON type
    pub kind: ParamType,
    /// Whether the argument must be present
    pub required: bool,
    /// Description shown to the model
    pub description: String,
}

impl ToolParameter {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: description.into(),
        }
    }

    /// Creates an optional parameter.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        kind: ParamType,
        description: impl Into<String>,
    ) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }
}

/// Name, description and ordered parameters of a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique name within a registry; matched case-sensitively
    pub name: String,
    /// What the tool does, shown to the model
    pub description: String,
    /// Declared parameters, in order
    pub parameters: Vec<ToolParameter>,
}

impl ToolSchema {
    /// Creates a schema with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    /// Appends a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ToolParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Renders the parameters as a JSON Schema object.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| {
                (
                    p.name.clone(),
                    json!({"type": p.kind.as_str(), "description": p.description}),
                )
            })
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
            .collect();

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// One-line signature used in system prompts, e.g.
    /// `calculate(expression: string, variables?: object)`.
    #[must_use]
    pub fn signature(&self) -> String {
        let params: Vec<String> = self
            .parameters
            .iter()
            .map(|p| {
                format!(
                    "{}{}: {}",
                    p.name,
                    if p.required { "" } else { "?" },
                    p.kind
                )
            })
            .collect();
        format!("{}({})", self.name, params.join(", "))
    }

    /// Checks `args` against the declared parameters.
    ///
    /// Returns the arguments with declared values coerced to their types.
    /// Undeclared arguments are dropped.
    ///
    /// # Errors
    ///
    /// Returns `ToolError::validation_failed` for a missing required
    /// argument or a value that cannot be read as the declared type.
    pub fn validate(&self, mut args: ToolArguments) -> Result<ToolArguments, ToolError> {
        let mut validated = ToolArguments::new();

        for param in &self.parameters {
            match args.remove(&param.name) {
                None | Some(Value::Null) if param.required => {
                    return Err(ToolError::validation_failed(
                        &self.name,
                        format!("missing required argument '{}'", param.name),
                    ));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    let coerced = param.kind.coerce(value).map_err(|rejected| {
                        ToolError::validation_failed(
                            &self.name,
                            format!(
                                "argument '{}' must be {}, got {}",
                                param.name,
                                param.kind,
                                describe(&rejected)
                            ),
                        )
                    })?;
                    validated.insert(param.name.clone(), coerced);
                }
            }
        }

        if !args.is_empty() {
            tracing::debug!(
                tool_name = %self.name,
                ignored = ?args.keys().collect::<Vec<_>>(),
                "ignoring undeclared tool arguments"
            );
        }

        Ok(validated)
    }
}

fn describe(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 40 {
        let head: String = text.chars().take(40).collect();
        format!("{head}...")
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calculate_schema() -> ToolSchema {
        ToolSchema::new("calculate", "Evaluates math")
            .with_parameter(ToolParameter::required(
                "expression",
                ParamType::String,
                "The expression",
            ))
            .with_parameter(ToolParameter::optional(
                "precision",
                ParamType::Integer,
                "Decimal places",
            ))
    }

    fn args(value: Value) -> ToolArguments {
        match value {
            Value::Object(map) => map,
            _ => panic!("test arguments must be an object"),
        }
    }

    #[test]
    fn json_schema_lists_required() {
        let schema = calculate_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["expression"]["type"], "string");
        assert_eq!(schema["properties"]["precision"]["type"], "integer");
        assert_eq!(schema["required"], json!(["expression"]));
    }

    #[test]
    fn signature_marks_optional() {
        assert_eq!(
            calculate_schema().signature(),
            "calculate(expression: string, precision?: integer)"
        );
    }

    #[test]
    fn validate_accepts_well_typed() {
        let validated = calculate_schema()
            .validate(args(json!({"expression": "2+2", "precision": 2})))
            .unwrap();
        assert_eq!(validated["expression"], "2+2");
        assert_eq!(validated["precision"], 2);
    }

    #[test]
    fn validate_rejects_missing_required() {
        let error = calculate_schema().validate(args(json!({}))).unwrap_err();
        assert!(error.observation().contains("missing required argument 'expression'"));
    }

    #[test]
    fn validate_treats_null_as_missing() {
        assert!(calculate_schema()
            .validate(args(json!({"expression": null})))
            .is_err());
        let validated = calculate_schema()
            .validate(args(json!({"expression": "1", "precision": null})))
            .unwrap();
        assert!(!validated.contains_key("precision"));
    }

    #[test]
    fn validate_coerces_strings_to_numbers() {
        let validated = calculate_schema()
            .validate(args(json!({"expression": "1", "precision": " 3 "})))
            .unwrap();
        assert_eq!(validated["precision"], 3);
    }

    #[test]
    fn validate_coerces_scalars_to_string() {
        let validated = calculate_schema()
            .validate(args(json!({"expression": 4})))
            .unwrap();
        assert_eq!(validated["expression"], "4");
    }

    #[test]
    fn validate_rejects_uncoercible() {
        let error = calculate_schema()
            .validate(args(json!({"expression": "1", "precision": "many"})))
            .unwrap_err();
        let text = error.observation();
        assert!(text.starts_with("Error executing calculate:"));
        assert!(text.contains("'precision' must be integer"));
    }

    #[test]
    fn validate_rejects_fractional_integer() {
        assert!(calculate_schema()
            .validate(args(json!({"expression": "1", "precision": 1.5})))
            .is_err());
    }

    #[test]
    fn validate_drops_undeclared() {
        let validated = calculate_schema()
            .validate(args(json!({"expression": "1", "extra": true})))
            .unwrap();
        assert!(!validated.contains_key("extra"));
    }

    #[test]
    fn boolean_coercion() {
        assert_eq!(
            ParamType::Boolean.coerce(json!("TRUE")),
            Ok(Value::Bool(true))
        );
        assert!(ParamType::Boolean.coerce(json!("yes")).is_err());
    }
}
