//! The models the default provider serves.

use crate::llm::normalize_model_id;
use serde::Serialize;

/// A model offered by the default provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelInfo {
    /// Routing id, as accepted by `--model` and `modelId`
    pub id: &'static str,
    /// Human-readable name
    pub name: &'static str,
    /// Parameter count
    pub params: &'static str,
    /// Typical generation speed
    pub speed: &'static str,
}

impl ModelInfo {
    /// The id sent to the API, without the routing prefix.
    #[must_use]
    pub fn api_id(&self) -> String {
        normalize_model_id(self.id)
    }
}

static MODELS: [ModelInfo; 5] = [
    ModelInfo {
        id: "cerebras/llama-4-scout-17b-16e-instruct",
        name: "Llama 4 Scout",
        params: "109 billion",
        speed: "~2600 tokens/s",
    },
    ModelInfo {
        id: "cerebras/llama3.1-8b",
        name: "Llama 3.1 8B",
        params: "8 billion",
        speed: "~2200 tokens/s",
    },
    ModelInfo {
        id: "cerebras/llama-3.3-70b",
        name: "Llama 3.3 70B",
        params: "70 billion",
        speed: "~2100 tokens/s",
    },
    ModelInfo {
        id: "cerebras/qwen-3-32b",
        name: "Qwen 3 32B",
        params: "32 billion",
        speed: "~2100 tokens/s",
    },
    ModelInfo {
        id: "cerebras/deepseek-r1-distill-llama-70b",
        name: "DeepSeek R1 Distill Llama 70B",
        params: "70 billion",
        speed: "~1700 tokens/s",
    },
];

/// Every catalogued model, fastest first.
#[must_use]
pub fn available_models() -> &'static [ModelInfo] {
    &MODELS
}

/// Looks up a model by id, with or without the routing prefix.
#[must_use]
pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    let wanted = normalize_model_id(id);
    MODELS.iter().find(|m| m.api_id() == wanted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DEFAULT_MODEL;

    #[test]
    fn catalog_lists_five_models() {
        assert_eq!(available_models().len(), 5);
        assert_eq!(available_models()[0].name, "Llama 4 Scout");
    }

    #[test]
    fn default_model_is_catalogued() {
        assert!(find_model(DEFAULT_MODEL).is_some());
    }

    #[test]
    fn lookup_accepts_prefixed_and_bare_ids() {
        let prefixed = find_model("cerebras/qwen-3-32b").unwrap();
        let bare = find_model("qwen-3-32b").unwrap();
        assert_eq!(prefixed, bare);
        assert_eq!(bare.api_id(), "qwen-3-32b");
        assert!(find_model("gpt-4o").is_none());
    }

    #[test]
    fn serializes_like_the_models_endpoint() {
        let value = serde_json::to_value(available_models()[1]).unwrap();
        assert_eq!(value["id"], "cerebras/llama3.1-8b");
        assert_eq!(value["params"], "8 billion");
    }
}
