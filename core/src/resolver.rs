//! Generate config resolution
//!
//! Resolution runs in two stages:
//!
//! 1. **Override merge**: the keyword overrides are laid over the caller
//!    config. A field supplied by the overrides replaces the caller value
//!    wholesale, lists included.
//! 2. **Defaults merge**: stop-word lists are union-merged with the model's
//!    special tokens (supplied entries first, then unseen model entries).
//!    Every other field takes the model default only when still unset.
//!
//! All inputs are validated before anything is built, so a failed resolution
//! never yields a partial config.

use crate::config::resolved::ResolvedFields;
use crate::config::{Field, GenerateParams, MergePolicy, ModelDefaults, ResolvedGenerateConfig};
use crate::error::ResolveError;
use crate::tokenizer::TokenConverter;
use serde_json::Value;
use tracing::{debug, trace};

/// Resolves request configs against one model's defaults
pub struct ConfigResolver<'a> {
    defaults: &'a ModelDefaults,
    tokenizer: Option<&'a dyn TokenConverter>,
}

impl<'a> ConfigResolver<'a> {
    /// Create a resolver without a tokenizer
    pub fn new(defaults: &'a ModelDefaults) -> Self {
        Self {
            defaults,
            tokenizer: None,
        }
    }

    /// Set the tokenizer used to encode stop strings
    pub fn with_tokenizer(mut self, tokenizer: &'a dyn TokenConverter) -> Self {
        self.tokenizer = Some(tokenizer);
        self
    }

    /// Resolve typed caller config and overrides
    pub fn resolve(
        &self,
        caller_config: Option<&GenerateParams>,
        overrides: Option<&GenerateParams>,
    ) -> Result<ResolvedGenerateConfig, ResolveError> {
        let empty = GenerateParams::new();
        let caller_config = caller_config.unwrap_or(&empty);
        let overrides = overrides.unwrap_or(&empty);

        caller_config.validate()?;
        overrides.validate()?;
        self.defaults.validate()?;

        let requested = caller_config.overlay(overrides);
        let fields = self.merge_defaults(requested)?;

        debug!(
            max_new_tokens = fields.max_new_tokens,
            top_k = fields.top_k,
            top_p = fields.top_p,
            stop_words_str = fields.stop_words_str.len(),
            stop_words_list = fields.stop_words_list.len(),
            extra_keys = fields.extra.len(),
            "Resolved generate config"
        );

        Ok(ResolvedGenerateConfig::from_fields(fields))
    }

    /// Resolve caller config and overrides given as JSON mappings
    pub fn resolve_json(
        &self,
        caller_config: Option<&Value>,
        overrides: Option<&Value>,
    ) -> Result<ResolvedGenerateConfig, ResolveError> {
        let caller_config = caller_config.map(GenerateParams::from_json).transpose()?;
        let overrides = overrides.map(GenerateParams::from_json).transpose()?;
        self.resolve(caller_config.as_ref(), overrides.as_ref())
    }

    fn merge_defaults(&self, requested: GenerateParams) -> Result<ResolvedFields, ResolveError> {
        let mut params = self.defaults.params.overlay(&requested);

        for field in Field::ALL {
            if field.merge_policy() == MergePolicy::Union {
                self.union_with_special_tokens(field, &requested, &mut params);
            }
            if field.is_required() && !params.is_set(field) {
                return Err(ResolveError::UnresolvedRequiredField {
                    field: field.as_str().to_string(),
                });
            }
        }
        trace!(
            stop_words_str = ?params.stop_words_str,
            stop_words_list = ?params.stop_words_list,
            "Merged stop words with model special tokens"
        );

        let max_new_tokens = require(params.max_new_tokens, Field::MaxNewTokens)?;
        let min_new_tokens = require(params.min_new_tokens, Field::MinNewTokens)?;
        if min_new_tokens > max_new_tokens {
            return Err(ResolveError::malformed(
                Field::MinNewTokens.as_str(),
                format!(
                    "{} exceeds max_new_tokens ({})",
                    min_new_tokens, max_new_tokens
                ),
            ));
        }

        let stop_words_str = params.stop_words_str.unwrap_or_default();
        let stop_words_list = params.stop_words_list.unwrap_or_default();
        let stop_words_encoded = self.encode_stop_words(&stop_words_str)?;

        Ok(ResolvedFields {
            stop_words_str,
            stop_words_list,
            stop_words_encoded,
            max_new_tokens,
            min_new_tokens,
            top_k: require(params.top_k, Field::TopK)?,
            top_p: unsigned_zero(require(params.top_p, Field::TopP)?),
            temperature: unsigned_zero(require(params.temperature, Field::Temperature)?),
            repetition_penalty: require(params.repetition_penalty, Field::RepetitionPenalty)?,
            num_beams: require(params.num_beams, Field::NumBeams)?,
            num_return_sequences: require(params.num_return_sequences, Field::NumReturnSequences)?,
            random_seed: params.random_seed,
            timeout_ms: params.timeout_ms,
            return_logits: require(params.return_logits, Field::ReturnLogits)?,
            return_incremental: require(params.return_incremental, Field::ReturnIncremental)?,
            extra: params.extra,
        })
    }

    /// Requested entries first, then model special tokens not seen yet
    fn union_with_special_tokens(
        &self,
        field: Field,
        requested: &GenerateParams,
        params: &mut GenerateParams,
    ) {
        let special_tokens = &self.defaults.special_tokens;
        match field {
            Field::StopWordsStr => {
                params.stop_words_str = Some(union_merge(
                    requested.stop_words_str.as_deref().unwrap_or(&[]),
                    &special_tokens.stop_words_str,
                ))
            }
            Field::StopWordsList => {
                params.stop_words_list = Some(union_merge(
                    requested.stop_words_list.as_deref().unwrap_or(&[]),
                    &special_tokens.stop_words_list,
                ))
            }
            // No model-level list backs any other field
            _ => {}
        }
    }

    fn encode_stop_words(&self, stop_words: &[String]) -> Result<Vec<Vec<u32>>, ResolveError> {
        let Some(tokenizer) = self.tokenizer else {
            return Ok(Vec::new());
        };

        stop_words
            .iter()
            .map(|text| {
                let ids = tokenizer
                    .encode(text)
                    .map_err(|e| ResolveError::Conversion {
                        text: text.clone(),
                        message: e.to_string(),
                    })?;
                if ids.is_empty() {
                    return Err(ResolveError::Conversion {
                        text: text.clone(),
                        message: "encoded to no tokens".to_string(),
                    });
                }
                Ok(ids)
            })
            .collect()
    }
}

/// Resolve one request's generate config.
///
/// `overrides` beat `caller_config` field by field; `defaults` fill in what
/// neither supplies and contribute their stop words to the union.
pub fn resolve(
    defaults: &ModelDefaults,
    caller_config: Option<&GenerateParams>,
    overrides: Option<&GenerateParams>,
    tokenizer: Option<&dyn TokenConverter>,
) -> Result<ResolvedGenerateConfig, ResolveError> {
    let mut resolver = ConfigResolver::new(defaults);
    if let Some(tokenizer) = tokenizer {
        resolver = resolver.with_tokenizer(tokenizer);
    }
    resolver.resolve(caller_config, overrides)
}

/// Keep every entry of `primary` in order, then append entries of
/// `secondary` not seen yet. Later duplicates are dropped on both sides.
pub(crate) fn union_merge<T: PartialEq + Clone>(primary: &[T], secondary: &[T]) -> Vec<T> {
    let mut merged: Vec<T> = Vec::with_capacity(primary.len() + secondary.len());
    for item in primary.iter().chain(secondary) {
        if !merged.contains(item) {
            merged.push(item.clone());
        }
    }
    merged
}

/// `-0.0` and `0.0` compare equal, so they must also fingerprint equal
fn unsigned_zero(value: f64) -> f64 {
    if value == 0.0 {
        0.0
    } else {
        value
    }
}

fn require<T>(value: Option<T>, field: Field) -> Result<T, ResolveError> {
    value.ok_or_else(|| ResolveError::UnresolvedRequiredField {
        field: field.as_str().to_string(),
    })
}
