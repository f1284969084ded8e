//! Tokenizer boundary used to turn stop strings into token ids

use std::sync::Arc;

/// Converts text into token ids.
///
/// Implementations must be deterministic for a fixed vocabulary and report
/// failures instead of returning an empty or partial encoding.
pub trait TokenConverter: Send + Sync {
    /// Encode `text` without adding special tokens
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>>;
}

impl<T: TokenConverter + ?Sized> TokenConverter for &T {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        (**self).encode(text)
    }
}

impl<T: TokenConverter + ?Sized> TokenConverter for Box<T> {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        (**self).encode(text)
    }
}

impl<T: TokenConverter + ?Sized> TokenConverter for Arc<T> {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        (**self).encode(text)
    }
}

/// A shared tokenizer handle
pub type SharedTokenConverter = Arc<dyn TokenConverter>;

#[cfg(feature = "hf-tokenizers")]
impl TokenConverter for tokenizers::Tokenizer {
    fn encode(&self, text: &str) -> anyhow::Result<Vec<u32>> {
        let encoding = (**self)
            .encode(text, false)
            .map_err(|e| anyhow::anyhow!("tokenizer failed: {}", e))?;
        Ok(encoding.get_ids().to_vec())
    }
}
