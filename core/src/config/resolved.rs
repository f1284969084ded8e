//! The immutable, fully resolved generate config

use crate::config::GenerateParams;
use crate::fingerprint::Fingerprint;
use crate::resolver::union_merge;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// Field values of a resolved config, in canonical order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ResolvedFields {
    pub(crate) stop_words_str: Vec<String>,
    pub(crate) stop_words_list: Vec<Vec<u32>>,
    /// Token ids of `stop_words_str`, same order, empty without a tokenizer
    pub(crate) stop_words_encoded: Vec<Vec<u32>>,
    pub(crate) max_new_tokens: u32,
    pub(crate) min_new_tokens: u32,
    pub(crate) top_k: u32,
    pub(crate) top_p: f64,
    pub(crate) temperature: f64,
    pub(crate) repetition_penalty: f64,
    pub(crate) num_beams: u32,
    pub(crate) num_return_sequences: u32,
    pub(crate) random_seed: Option<u64>,
    pub(crate) timeout_ms: Option<u64>,
    pub(crate) return_logits: bool,
    pub(crate) return_incremental: bool,
    pub(crate) extra: Map<String, Value>,
}

/// Generate parameters for one request, after merging every source.
///
/// Values can only be read once built. The fingerprint is computed on first
/// use and cached; clones carry the cache along.
#[derive(Debug, Clone)]
pub struct ResolvedGenerateConfig {
    pub(crate) fields: ResolvedFields,
    fingerprint: OnceLock<Fingerprint>,
}

impl ResolvedGenerateConfig {
    pub(crate) fn from_fields(fields: ResolvedFields) -> Self {
        Self {
            fields,
            fingerprint: OnceLock::new(),
        }
    }

    pub fn stop_words_str(&self) -> &[String] {
        &self.fields.stop_words_str
    }

    pub fn stop_words_list(&self) -> &[Vec<u32>] {
        &self.fields.stop_words_list
    }

    /// Token ids for each entry of [`Self::stop_words_str`]
    pub fn stop_words_encoded(&self) -> &[Vec<u32>] {
        &self.fields.stop_words_encoded
    }

    /// Every token-level stop condition the engine must watch for:
    /// `stop_words_list` followed by any encoded stop strings not already in it
    pub fn engine_stop_words(&self) -> Vec<Vec<u32>> {
        union_merge(&self.fields.stop_words_list, &self.fields.stop_words_encoded)
    }

    pub fn max_new_tokens(&self) -> u32 {
        self.fields.max_new_tokens
    }

    pub fn min_new_tokens(&self) -> u32 {
        self.fields.min_new_tokens
    }

    pub fn top_k(&self) -> u32 {
        self.fields.top_k
    }

    pub fn top_p(&self) -> f64 {
        self.fields.top_p
    }

    pub fn temperature(&self) -> f64 {
        self.fields.temperature
    }

    pub fn repetition_penalty(&self) -> f64 {
        self.fields.repetition_penalty
    }

    pub fn num_beams(&self) -> u32 {
        self.fields.num_beams
    }

    pub fn num_return_sequences(&self) -> u32 {
        self.fields.num_return_sequences
    }

    pub fn random_seed(&self) -> Option<u64> {
        self.fields.random_seed
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.fields.timeout_ms
    }

    pub fn return_logits(&self) -> bool {
        self.fields.return_logits
    }

    pub fn return_incremental(&self) -> bool {
        self.fields.return_incremental
    }

    /// Unrecognized keys forwarded from the caller and overrides
    pub fn extra(&self) -> &Map<String, Value> {
        &self.fields.extra
    }

    /// Identity of this config, computed once and cached
    pub fn fingerprint(&self) -> &Fingerprint {
        self.fingerprint.get_or_init(|| Fingerprint::of_fields(&self.fields))
    }

    /// Whether `other` resolves to the same parameters
    pub fn is_same(&self, other: &ResolvedGenerateConfig) -> bool {
        self.fingerprint() == other.fingerprint()
    }

    /// Turn the resolved values back into a fully populated parameter set
    pub fn to_params(&self) -> GenerateParams {
        let fields = &self.fields;
        GenerateParams {
            stop_words_str: Some(fields.stop_words_str.clone()),
            stop_words_list: Some(fields.stop_words_list.clone()),
            max_new_tokens: Some(fields.max_new_tokens),
            min_new_tokens: Some(fields.min_new_tokens),
            top_k: Some(fields.top_k),
            top_p: Some(fields.top_p),
            temperature: Some(fields.temperature),
            repetition_penalty: Some(fields.repetition_penalty),
            num_beams: Some(fields.num_beams),
            num_return_sequences: Some(fields.num_return_sequences),
            random_seed: fields.random_seed,
            timeout_ms: fields.timeout_ms,
            return_logits: Some(fields.return_logits),
            return_incremental: Some(fields.return_incremental),
            extra: fields.extra.clone(),
        }
    }
}

impl PartialEq for ResolvedGenerateConfig {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Serialize for ResolvedGenerateConfig {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}
