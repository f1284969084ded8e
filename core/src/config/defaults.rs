//! Model-layer defaults consumed by the resolver
//!
//! These values are owned by the model loader. Core only reads them; loading
//! them from disk is the caller's business, which is why every type here is
//! plain serde data.

use crate::config::GenerateParams;
use crate::error::{ResolveError, Result};
use serde::{Deserialize, Serialize};

/// Baseline maximum number of new tokens
pub const DEFAULT_MAX_NEW_TOKENS: u32 = 1000;
/// Baseline top-k, 0 disables top-k truncation
pub const DEFAULT_TOP_K: u32 = 0;
pub const DEFAULT_TOP_P: f64 = 1.0;
pub const DEFAULT_TEMPERATURE: f64 = 1.0;
pub const DEFAULT_REPETITION_PENALTY: f64 = 1.0;

/// Stop conditions intrinsic to a model, independent of any request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpecialTokensDefaults {
    /// Stop token-id sequences
    pub stop_words_list: Vec<Vec<u32>>,
    /// Stop strings
    pub stop_words_str: Vec<String>,
}

impl SpecialTokensDefaults {
    pub fn new(stop_words_list: Vec<Vec<u32>>, stop_words_str: Vec<String>) -> Self {
        Self {
            stop_words_list,
            stop_words_str,
        }
    }
}

/// Everything the model layer contributes to a resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefaults {
    /// Model stop conditions, union-merged into every resolved config
    #[serde(default)]
    pub special_tokens: SpecialTokensDefaults,
    /// Scalar defaults, used only where no caller or override value exists.
    /// Stop-word slots here are ignored in favour of `special_tokens`.
    #[serde(default = "GenerateParams::baseline")]
    pub params: GenerateParams,
}

impl ModelDefaults {
    /// Baseline params with the given special tokens
    pub fn new(special_tokens: SpecialTokensDefaults) -> Self {
        Self {
            special_tokens,
            params: GenerateParams::baseline(),
        }
    }

    /// Replace the scalar defaults
    pub fn with_params(mut self, params: GenerateParams) -> Self {
        self.params = params;
        self
    }

    /// Parse defaults published by the model loader as JSON
    pub fn from_json_str(content: &str) -> Result<Self> {
        let defaults: ModelDefaults = serde_json::from_str(content)?;
        defaults.validate()?;
        Ok(defaults)
    }

    /// Check the special tokens and scalar defaults
    pub fn validate(&self) -> std::result::Result<(), ResolveError> {
        if self.special_tokens.stop_words_list.iter().any(|ids| ids.is_empty()) {
            return Err(ResolveError::malformed(
                "special_tokens.stop_words_list",
                "stop token sequences must not be empty",
            ));
        }
        if self.special_tokens.stop_words_str.iter().any(|word| word.is_empty()) {
            return Err(ResolveError::malformed(
                "special_tokens.stop_words_str",
                "stop strings must not be empty",
            ));
        }
        self.params.validate()
    }
}

impl Default for ModelDefaults {
    fn default() -> Self {
        Self::new(SpecialTokensDefaults::default())
    }
}

impl From<SpecialTokensDefaults> for ModelDefaults {
    fn from(special_tokens: SpecialTokensDefaults) -> Self {
        Self::new(special_tokens)
    }
}

impl GenerateParams {
    /// The documented baseline every model starts from
    pub fn baseline() -> Self {
        GenerateParams::new()
            .with_max_new_tokens(DEFAULT_MAX_NEW_TOKENS)
            .with_min_new_tokens(0)
            .with_top_k(DEFAULT_TOP_K)
            .with_top_p(DEFAULT_TOP_P)
            .with_temperature(DEFAULT_TEMPERATURE)
            .with_repetition_penalty(DEFAULT_REPETITION_PENALTY)
            .with_num_beams(1)
            .with_num_return_sequences(1)
            .with_return_logits(false)
            .with_return_incremental(false)
    }
}
