//! # genconfig Core
//!
//! Resolves the effective generation parameters for a single text-generation
//! request and fingerprints the result.
//!
//! Three sources feed a resolution: the caller's config, keyword overrides
//! that beat it field by field, and the model's own defaults. Stop words from
//! the model are union-merged into whatever the request asked for; every other
//! model default only fills gaps.
//!
//! ```
//! use genconfig_core::{resolve, same, GenerateParams, ModelDefaults, SpecialTokensDefaults};
//!
//! let defaults = ModelDefaults::new(SpecialTokensDefaults::new(
//!     vec![vec![1233, 19912]],
//!     vec!["gg".to_string()],
//! ));
//! let caller = GenerateParams::new().with_stop_words_str(["hello"]).with_top_k(1);
//! let overrides = GenerateParams::new().with_top_k(2);
//!
//! let a = resolve(&defaults, Some(&caller), Some(&overrides), None).unwrap();
//! assert_eq!(a.top_k(), 2);
//! assert_eq!(a.stop_words_str(), &["hello", "gg"]);
//!
//! let b = resolve(&defaults, Some(&caller), Some(&overrides), None).unwrap();
//! assert!(same(&a, &b));
//! ```

// Core modules
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod resolver;
pub mod tokenizer;

// Re-export commonly used types
pub use config::{
    Field, GenerateParams, MergePolicy, ModelDefaults, ResolvedGenerateConfig,
    SpecialTokensDefaults,
};
pub use error::{Error, ResolveError, Result};
pub use fingerprint::{fingerprint, same, Fingerprint};
pub use resolver::{resolve, ConfigResolver};
pub use tokenizer::{SharedTokenConverter, TokenConverter};

/// Current version of the genconfig-core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the library
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
}

/// Initialize tracing with a specific debug mode
pub fn init_tracing_with_debug(debug: bool) {
    let filter = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();
}
