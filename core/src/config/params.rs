//! Generate parameters supplied by callers, overrides and the model layer

use crate::config::Field;
use crate::error::ResolveError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A partial set of generate parameters.
///
/// Used for the caller config, the keyword overrides and the model-provided
/// defaults alike. `None` means "not supplied by this source".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateParams {
    /// Stop strings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words_str: Option<Vec<String>>,
    /// Stop token-id sequences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words_list: Option<Vec<Vec<u32>>>,
    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u32>,
    /// Minimum tokens to generate before stop conditions apply
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_new_tokens: Option<u32>,
    /// Top-k sampling parameter, 0 disables top-k truncation
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    /// Top-p sampling parameter (0.0 to 1.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    /// Temperature for sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repetition_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_beams: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_return_sequences: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_seed: Option<u64>,
    /// Request timeout in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_logits: Option<bool>,
    /// Stream only the newly generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_incremental: Option<bool>,
    /// Unrecognized keys, forwarded untouched to downstream consumers
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerateParams {
    /// Create an empty parameter set
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a caller mapping such as a request's `generate_config` object.
    ///
    /// Recognized keys are type checked, `null` values count as absent and
    /// every other key is kept in [`GenerateParams::extra`].
    pub fn from_json(value: &Value) -> Result<Self, ResolveError> {
        let object = value.as_object().ok_or_else(|| {
            ResolveError::malformed(
                "generate_config",
                format!("expected a mapping, got {}", json_kind(value)),
            )
        })?;

        let mut params = Self::new();
        for (key, value) in object {
            let Some(field) = Field::from_name(key) else {
                params.extra.insert(key.clone(), value.clone());
                continue;
            };
            if value.is_null() {
                continue;
            }

            match field {
                Field::StopWordsStr => params.stop_words_str = Some(parse_strings(field, value)?),
                Field::StopWordsList => {
                    params.stop_words_list = Some(parse_token_lists(field, value)?)
                }
                Field::MaxNewTokens => params.max_new_tokens = Some(parse_u32(field, value)?),
                Field::MinNewTokens => params.min_new_tokens = Some(parse_u32(field, value)?),
                Field::TopK => params.top_k = Some(parse_u32(field, value)?),
                Field::TopP => params.top_p = Some(parse_f64(field, value)?),
                Field::Temperature => params.temperature = Some(parse_f64(field, value)?),
                Field::RepetitionPenalty => {
                    params.repetition_penalty = Some(parse_f64(field, value)?)
                }
                Field::NumBeams => params.num_beams = Some(parse_u32(field, value)?),
                Field::NumReturnSequences => {
                    params.num_return_sequences = Some(parse_u32(field, value)?)
                }
                Field::RandomSeed => params.random_seed = Some(parse_u64(field, value)?),
                Field::TimeoutMs => params.timeout_ms = Some(parse_u64(field, value)?),
                Field::ReturnLogits => params.return_logits = Some(parse_bool(field, value)?),
                Field::ReturnIncremental => {
                    params.return_incremental = Some(parse_bool(field, value)?)
                }
            }
        }

        params.validate()?;
        Ok(params)
    }

    /// Check the range contract of every supplied value
    pub fn validate(&self) -> Result<(), ResolveError> {
        if let Some(words) = &self.stop_words_str {
            if words.iter().any(|word| word.is_empty()) {
                return Err(ResolveError::malformed(
                    Field::StopWordsStr.as_str(),
                    "stop strings must not be empty",
                ));
            }
        }

        if let Some(lists) = &self.stop_words_list {
            if lists.iter().any(|ids| ids.is_empty()) {
                return Err(ResolveError::malformed(
                    Field::StopWordsList.as_str(),
                    "stop token sequences must not be empty",
                ));
            }
        }

        if let Some(top_p) = self.top_p {
            if !(0.0..=1.0).contains(&top_p) {
                return Err(ResolveError::malformed(
                    Field::TopP.as_str(),
                    format!("must be between 0.0 and 1.0, got {}", top_p),
                ));
            }
        }

        if let Some(temperature) = self.temperature {
            if !temperature.is_finite() || temperature < 0.0 {
                return Err(ResolveError::malformed(
                    Field::Temperature.as_str(),
                    format!("must be a finite non-negative number, got {}", temperature),
                ));
            }
        }

        if let Some(penalty) = self.repetition_penalty {
            if !penalty.is_finite() || penalty <= 0.0 {
                return Err(ResolveError::malformed(
                    Field::RepetitionPenalty.as_str(),
                    format!("must be a finite positive number, got {}", penalty),
                ));
            }
        }

        for (field, value) in [
            (Field::NumBeams, self.num_beams),
            (Field::NumReturnSequences, self.num_return_sequences),
        ] {
            if value == Some(0) {
                return Err(ResolveError::malformed(field.as_str(), "must be at least 1"));
            }
        }

        Ok(())
    }

    /// Lay `overrides` on top of `self`.
    ///
    /// Any field the overrides supply replaces this set's value wholesale,
    /// list fields included. Unrecognized keys follow the same rule per key.
    pub fn overlay(&self, overrides: &GenerateParams) -> GenerateParams {
        let mut extra = self.extra.clone();
        for (key, value) in &overrides.extra {
            extra.insert(key.clone(), value.clone());
        }

        GenerateParams {
            stop_words_str: pick(&overrides.stop_words_str, &self.stop_words_str),
            stop_words_list: pick(&overrides.stop_words_list, &self.stop_words_list),
            max_new_tokens: overrides.max_new_tokens.or(self.max_new_tokens),
            min_new_tokens: overrides.min_new_tokens.or(self.min_new_tokens),
            top_k: overrides.top_k.or(self.top_k),
            top_p: overrides.top_p.or(self.top_p),
            temperature: overrides.temperature.or(self.temperature),
            repetition_penalty: overrides.repetition_penalty.or(self.repetition_penalty),
            num_beams: overrides.num_beams.or(self.num_beams),
            num_return_sequences: overrides.num_return_sequences.or(self.num_return_sequences),
            random_seed: overrides.random_seed.or(self.random_seed),
            timeout_ms: overrides.timeout_ms.or(self.timeout_ms),
            return_logits: overrides.return_logits.or(self.return_logits),
            return_incremental: overrides.return_incremental.or(self.return_incremental),
            extra,
        }
    }

    /// Whether this source supplies a value for `field`
    pub fn is_set(&self, field: Field) -> bool {
        match field {
            Field::StopWordsStr => self.stop_words_str.is_some(),
            Field::StopWordsList => self.stop_words_list.is_some(),
            Field::MaxNewTokens => self.max_new_tokens.is_some(),
            Field::MinNewTokens => self.min_new_tokens.is_some(),
            Field::TopK => self.top_k.is_some(),
            Field::TopP => self.top_p.is_some(),
            Field::Temperature => self.temperature.is_some(),
            Field::RepetitionPenalty => self.repetition_penalty.is_some(),
            Field::NumBeams => self.num_beams.is_some(),
            Field::NumReturnSequences => self.num_return_sequences.is_some(),
            Field::RandomSeed => self.random_seed.is_some(),
            Field::TimeoutMs => self.timeout_ms.is_some(),
            Field::ReturnLogits => self.return_logits.is_some(),
            Field::ReturnIncremental => self.return_incremental.is_some(),
        }
    }

    pub fn with_stop_words_str<I, S>(mut self, words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stop_words_str = Some(words.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_stop_words_list(mut self, lists: Vec<Vec<u32>>) -> Self {
        self.stop_words_list = Some(lists);
        self
    }

    pub fn with_max_new_tokens(mut self, max_new_tokens: u32) -> Self {
        self.max_new_tokens = Some(max_new_tokens);
        self
    }

    pub fn with_min_new_tokens(mut self, min_new_tokens: u32) -> Self {
        self.min_new_tokens = Some(min_new_tokens);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_repetition_penalty(mut self, penalty: f64) -> Self {
        self.repetition_penalty = Some(penalty);
        self
    }

    pub fn with_num_beams(mut self, num_beams: u32) -> Self {
        self.num_beams = Some(num_beams);
        self
    }

    pub fn with_num_return_sequences(mut self, count: u32) -> Self {
        self.num_return_sequences = Some(count);
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_return_logits(mut self, return_logits: bool) -> Self {
        self.return_logits = Some(return_logits);
        self
    }

    pub fn with_return_incremental(mut self, return_incremental: bool) -> Self {
        self.return_incremental = Some(return_incremental);
        self
    }

    /// Add an unrecognized key to forward downstream
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

impl TryFrom<&Value> for GenerateParams {
    type Error = ResolveError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        Self::from_json(value)
    }
}

impl TryFrom<Value> for GenerateParams {
    type Error = ResolveError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_json(&value)
    }
}

fn pick<T: Clone>(preferred: &Option<T>, fallback: &Option<T>) -> Option<T> {
    preferred.as_ref().or(fallback.as_ref()).cloned()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}

fn parse_u64(field: Field, value: &Value) -> Result<u64, ResolveError> {
    value.as_u64().ok_or_else(|| {
        ResolveError::malformed(
            field.as_str(),
            format!("expected a non-negative integer, got {}", value),
        )
    })
}

fn parse_u32(field: Field, value: &Value) -> Result<u32, ResolveError> {
    let wide = parse_u64(field, value)?;
    u32::try_from(wide).map_err(|_| {
        ResolveError::malformed(field.as_str(), format!("{} is out of range", wide))
    })
}

fn parse_f64(field: Field, value: &Value) -> Result<f64, ResolveError> {
    value.as_f64().ok_or_else(|| {
        ResolveError::malformed(
            field.as_str(),
            format!("expected a number, got {}", json_kind(value)),
        )
    })
}

fn parse_bool(field: Field, value: &Value) -> Result<bool, ResolveError> {
    value.as_bool().ok_or_else(|| {
        ResolveError::malformed(
            field.as_str(),
            format!("expected a boolean, got {}", json_kind(value)),
        )
    })
}

fn parse_strings(field: Field, value: &Value) -> Result<Vec<String>, ResolveError> {
    let items = value.as_array().ok_or_else(|| {
        ResolveError::malformed(
            field.as_str(),
            format!("expected a list of strings, got {}", json_kind(value)),
        )
    })?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ResolveError::malformed(
                    field.as_str(),
                    format!("expected a string entry, got {}", item),
                )
            })
        })
        .collect()
}

fn parse_token_lists(field: Field, value: &Value) -> Result<Vec<Vec<u32>>, ResolveError> {
    let items = value.as_array().ok_or_else(|| {
        ResolveError::malformed(
            field.as_str(),
            format!("expected a list of token-id lists, got {}", json_kind(value)),
        )
    })?;

    items
        .iter()
        .map(|item| {
            let ids = item.as_array().ok_or_else(|| {
                ResolveError::malformed(
                    field.as_str(),
                    format!("expected a token-id list entry, got {}", item),
                )
            })?;
            ids.iter()
                .map(|id| {
                    id.as_u64()
                        .and_then(|id| u32::try_from(id).ok())
                        .ok_or_else(|| {
                            ResolveError::malformed(
                                field.as_str(),
                                format!("{} is not a valid token id", id),
                            )
                        })
                })
                .collect::<Result<Vec<u32>, _>>()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn caller_config() -> Value {
        json!({
            "stop_words_str": ["hello", "what's your name"],
            "stop_words_list": [[8848]],
            "top_k": 1,
            "top_p": 0.95,
            "max_new_tokens": 100
        })
    }

    #[test]
    fn test_from_json_reads_recognized_fields() {
        let params = GenerateParams::from_json(&caller_config()).unwrap();
        assert_eq!(
            params.stop_words_str,
            Some(vec!["hello".to_string(), "what's your name".to_string()])
        );
        assert_eq!(params.stop_words_list, Some(vec![vec![8848]]));
        assert_eq!(params.top_k, Some(1));
        assert_eq!(params.top_p, Some(0.95));
        assert_eq!(params.max_new_tokens, Some(100));
        assert_eq!(params.temperature, None);
        assert!(params.extra.is_empty());
    }

    #[test]
    fn test_from_json_keeps_unknown_keys_and_skips_nulls() {
        let params = GenerateParams::from_json(&json!({
            "top_k": null,
            "chat_id": "abc",
            "adapter_name": ["lora-a"]
        }))
        .unwrap();
        assert_eq!(params.top_k, None);
        assert_eq!(params.extra.get("chat_id"), Some(&json!("abc")));
        assert_eq!(params.extra.get("adapter_name"), Some(&json!(["lora-a"])));
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        let err = GenerateParams::from_json(&json!({ "top_k": "many" })).unwrap_err();
        assert!(matches!(err, ResolveError::MalformedField { ref field, .. } if field == "top_k"));

        let err = GenerateParams::from_json(&json!({ "max_new_tokens": -1 })).unwrap_err();
        assert!(
            matches!(err, ResolveError::MalformedField { ref field, .. } if field == "max_new_tokens")
        );

        let err =
            GenerateParams::from_json(&json!({ "stop_words_list": [[1, "x"]] })).unwrap_err();
        assert!(
            matches!(err, ResolveError::MalformedField { ref field, .. } if field == "stop_words_list")
        );

        let err = GenerateParams::from_json(&json!({ "stop_words_list": [1233] })).unwrap_err();
        assert!(
            matches!(err, ResolveError::MalformedField { ref field, .. } if field == "stop_words_list")
        );

        let err = GenerateParams::from_json(&json!(["top_k"])).unwrap_err();
        assert!(
            matches!(err, ResolveError::MalformedField { ref field, .. } if field == "generate_config")
        );
    }

    #[test]
    fn test_validate_ranges() {
        let err = GenerateParams::new().with_top_p(1.5).validate().unwrap_err();
        assert!(matches!(err, ResolveError::MalformedField { ref field, .. } if field == "top_p"));

        assert!(GenerateParams::new().with_top_p(f64::NAN).validate().is_err());
        assert!(GenerateParams::new().with_temperature(-0.1).validate().is_err());
        assert!(GenerateParams::new().with_repetition_penalty(0.0).validate().is_err());
        assert!(GenerateParams::new().with_num_beams(0).validate().is_err());
        assert!(GenerateParams::new()
            .with_stop_words_list(vec![vec![]])
            .validate()
            .is_err());
        assert!(GenerateParams::new()
            .with_stop_words_str([""])
            .validate()
            .is_err());

        assert!(GenerateParams::new()
            .with_top_p(0.0)
            .with_top_k(0)
            .with_max_new_tokens(0)
            .with_temperature(0.0)
            .validate()
            .is_ok());
    }

    #[test]
    fn test_overlay_replaces_whole_fields() {
        let caller = GenerateParams::from_json(&caller_config())
            .unwrap()
            .with_extra("chat_id", json!("c1"));
        let overrides = GenerateParams::new()
            .with_stop_words_str(["hi"])
            .with_top_k(2)
            .with_extra("chat_id", json!("c2"));

        let merged = caller.overlay(&overrides);
        assert_eq!(merged.stop_words_str, Some(vec!["hi".to_string()]));
        assert_eq!(merged.stop_words_list, Some(vec![vec![8848]]));
        assert_eq!(merged.top_k, Some(2));
        assert_eq!(merged.top_p, Some(0.95));
        assert_eq!(merged.max_new_tokens, Some(100));
        assert_eq!(merged.extra.get("chat_id"), Some(&json!("c2")));
    }

    #[test]
    fn test_overlay_with_empty_list_still_replaces() {
        let caller = GenerateParams::new().with_stop_words_str(["hello"]);
        let overrides = GenerateParams::new().with_stop_words_str(Vec::<String>::new());
        let merged = caller.overlay(&overrides);
        assert_eq!(merged.stop_words_str, Some(vec![]));
    }

    #[test]
    fn test_is_set() {
        let params = GenerateParams::new().with_top_p(0.5);
        assert!(params.is_set(Field::TopP));
        assert!(!params.is_set(Field::TopK));
    }
}
