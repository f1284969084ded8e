//! Identity fingerprints for resolved generate configs
//!
//! A fingerprint is the SHA-256 digest of a canonical JSON rendering of the
//! resolved fields: object keys sorted at every depth and optional fields
//! always present (`null` when unset), so an absent value never collides with
//! a default one.

use crate::config::resolved::ResolvedFields;
use crate::config::ResolvedGenerateConfig;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Bumped whenever the canonical form changes
const CANONICAL_FORM_VERSION: &str = "genconfig/v1";

/// Hex-encoded SHA-256 identity of a resolved config
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub(crate) fn of_fields(fields: &ResolvedFields) -> Self {
        let canonical = canonical_json(fields);
        tracing::trace!(canonical = %canonical, "Computing generate config fingerprint");
        Self(sha256::digest(canonical))
    }

    /// Get the hex digest
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Fingerprint of `config`, served from its cache after the first call
pub fn fingerprint(config: &ResolvedGenerateConfig) -> Fingerprint {
    config.fingerprint().clone()
}

/// Whether two configs carry identical parameters, list order included
pub fn same(a: &ResolvedGenerateConfig, b: &ResolvedGenerateConfig) -> bool {
    a.is_same(b)
}

fn canonical_json(fields: &ResolvedFields) -> String {
    format!(
        "{}\n{}",
        CANONICAL_FORM_VERSION,
        canonicalize(canonical_value(fields))
    )
}

/// Every resolved field under its own name, unset optionals as `null`
fn canonical_value(fields: &ResolvedFields) -> Value {
    let mut object = Map::new();
    object.insert("stop_words_str".into(), Value::from(fields.stop_words_str.clone()));
    object.insert("stop_words_list".into(), Value::from(fields.stop_words_list.clone()));
    object.insert(
        "stop_words_encoded".into(),
        Value::from(fields.stop_words_encoded.clone()),
    );
    object.insert("max_new_tokens".into(), Value::from(fields.max_new_tokens));
    object.insert("min_new_tokens".into(), Value::from(fields.min_new_tokens));
    object.insert("top_k".into(), Value::from(fields.top_k));
    object.insert("top_p".into(), Value::from(fields.top_p));
    object.insert("temperature".into(), Value::from(fields.temperature));
    object.insert(
        "repetition_penalty".into(),
        Value::from(fields.repetition_penalty),
    );
    object.insert("num_beams".into(), Value::from(fields.num_beams));
    object.insert(
        "num_return_sequences".into(),
        Value::from(fields.num_return_sequences),
    );
    object.insert(
        "random_seed".into(),
        fields.random_seed.map_or(Value::Null, Value::from),
    );
    object.insert(
        "timeout_ms".into(),
        fields.timeout_ms.map_or(Value::Null, Value::from),
    );
    object.insert("return_logits".into(), Value::from(fields.return_logits));
    object.insert(
        "return_incremental".into(),
        Value::from(fields.return_incremental),
    );
    object.insert("extra".into(), Value::Object(fields.extra.clone()));
    Value::Object(object)
}

fn canonicalize(value: Value) -> Value {
    match value {
        Value::Object(object) => {
            let mut entries: Vec<(String, Value)> = object.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut sorted = Map::new();
            for (key, value) in entries {
                sorted.insert(key, canonicalize(value));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GenerateParams, ModelDefaults, SpecialTokensDefaults};
    use crate::resolver::resolve;
    use serde_json::json;

    fn model_defaults() -> ModelDefaults {
        ModelDefaults::new(SpecialTokensDefaults::new(
            vec![vec![1233, 19912]],
            vec!["gg".to_string()],
        ))
    }

    fn caller_config() -> GenerateParams {
        GenerateParams::new()
            .with_stop_words_str(["hello", "what's your name"])
            .with_stop_words_list(vec![vec![8848]])
            .with_top_k(1)
            .with_top_p(0.95)
            .with_max_new_tokens(100)
    }

    fn resolve_with(caller: &GenerateParams) -> ResolvedGenerateConfig {
        resolve(&model_defaults(), Some(caller), None, None).unwrap()
    }

    #[test]
    fn test_same() {
        let a = resolve_with(&caller_config());
        let b = resolve_with(&caller_config());
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert!(same(&a, &b));
        assert!(a.is_same(&b));
    }

    #[test]
    fn test_single_field_change_breaks_identity() {
        let a = resolve_with(&caller_config());

        let b = resolve_with(&caller_config().with_top_k(2));
        assert!(!same(&a, &b));

        let b = resolve_with(&caller_config().with_top_p(0.9));
        assert!(!same(&a, &b));

        let b = resolve_with(&caller_config().with_random_seed(7));
        assert!(!same(&a, &b));

        let b = resolve_with(&caller_config().with_extra("chat_id", json!("c1")));
        assert!(!same(&a, &b));
    }

    #[test]
    fn test_stop_word_order_matters() {
        let a = resolve_with(&caller_config());
        let b = resolve_with(&caller_config().with_stop_words_str(["what's your name", "hello"]));
        assert_ne!(a.stop_words_str(), b.stop_words_str());
        assert!(!same(&a, &b));
    }

    #[test]
    fn test_absent_seed_differs_from_zero_seed() {
        let a = resolve_with(&caller_config());
        let b = resolve_with(&caller_config().with_random_seed(0));
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_extra_key_order_does_not_matter() {
        let a = resolve_with(
            &caller_config()
                .with_extra("a", json!({ "x": 1, "y": 2 }))
                .with_extra("b", json!(true)),
        );
        let b = resolve_with(
            &caller_config()
                .with_extra("b", json!(true))
                .with_extra("a", json!({ "y": 2, "x": 1 })),
        );
        assert!(same(&a, &b));
    }

    #[test]
    fn test_fingerprint_is_memoized() {
        let config = resolve_with(&caller_config());
        let first = config.fingerprint();
        let second = config.fingerprint();
        assert!(std::ptr::eq(first, second));
        assert_eq!(fingerprint(&config), *first);

        let cloned = config.clone();
        assert_eq!(cloned.fingerprint(), first);
    }

    #[test]
    fn test_concurrent_fingerprint_agrees() {
        let config = resolve_with(&caller_config());
        let expected = fingerprint(&resolve_with(&caller_config()));

        let seen: Vec<Fingerprint> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| config.fingerprint().clone()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(seen.iter().all(|fp| *fp == expected));
    }

    #[test]
    fn test_re_resolving_resolved_params_is_stable() {
        let defaults = model_defaults();
        let config = resolve(&defaults, Some(&caller_config()), None, None).unwrap();
        let again = resolve(&defaults, Some(&config.to_params()), None, None).unwrap();
        assert_eq!(config, again);
        assert!(same(&config, &again));
    }

    #[test]
    fn test_resolved_config_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ResolvedGenerateConfig>();
        assert_send_sync::<Fingerprint>();
    }

    #[test]
    fn test_signed_zero_agrees_with_equality() {
        let a = resolve_with(&caller_config().with_top_p(0.0).with_temperature(0.0));
        let b = resolve_with(&caller_config().with_top_p(-0.0).with_temperature(-0.0));
        assert_eq!(a, b);
        assert!(same(&a, &b));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_canonical_json_layout() {
        let config = resolve_with(&caller_config());
        let canonical = canonical_json(&config.fields);
        assert_eq!(canonical, canonical_json(&config.clone().fields));

        let (version, body) = canonical.split_once('\n').unwrap();
        assert_eq!(version, CANONICAL_FORM_VERSION);

        let value: Value = serde_json::from_str(body).unwrap();
        let keys: Vec<&String> = value.as_object().unwrap().keys().collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(keys.len(), 16);
        assert_eq!(value["random_seed"], Value::Null);
        assert_eq!(value["timeout_ms"], Value::Null);
        assert_eq!(value["top_k"], json!(1));
        assert_eq!(value["stop_words_str"], json!(["hello", "what's your name", "gg"]));
    }

    #[test]
    fn test_canonicalize_sorts_nested_keys() {
        let value = json!({ "b": { "z": 1, "a": [ { "y": 2, "x": 3 } ] }, "a": null });
        assert_eq!(
            canonicalize(value).to_string(),
            r#"{"a":null,"b":{"a":[{"x":3,"y":2}],"z":1}}"#
        );
    }

    #[test]
    fn test_fingerprint_is_hex_sha256() {
        let fp = Fingerprint(sha256::digest("abc"));
        assert_eq!(
            fp.as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(fp.to_string().len(), 64);
    }
}
