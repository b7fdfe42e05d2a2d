use serde::Serialize;

/// Sparse tuning parameters forwarded to the backend's `options` object.
/// Only fields that are set are serialized; the backend keeps its own defaults for the rest.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_ctx: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_predict: Option<i64>,
}

impl GenerationOptions {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// `None` when nothing is configured, so the request omits `options` entirely.
    pub fn as_payload(&self) -> Option<&Self> {
        (!self.is_empty()).then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_only_present_options_are_serialized() {
        let options = GenerationOptions {
            seed: Some(7),
            temperature: Some(0.4),
            top_k: Some(5),
            stop: Some("STOP".to_string()),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            json!({"seed": 7, "temperature": 0.4, "top_k": 5, "stop": "STOP"})
        );
    }

    #[test]
    fn test_empty_options_produce_no_payload() {
        let options = GenerationOptions::default();
        assert!(options.is_empty());
        assert!(options.as_payload().is_none());
    }

    #[test]
    fn test_single_option_produces_payload() {
        let options = GenerationOptions {
            num_predict: Some(256),
            ..Default::default()
        };
        assert_eq!(options.as_payload(), Some(&options));
    }
}
