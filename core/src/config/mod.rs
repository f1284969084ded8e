//! Configuration types for genconfig core
//!
//! Only pure data types live here. Merging happens in [`crate::resolver`].

pub mod defaults;
pub mod field;
pub mod params;
pub mod resolved;

pub use defaults::{ModelDefaults, SpecialTokensDefaults};
pub use field::{Field, MergePolicy};
pub use params::GenerateParams;
pub use resolved::ResolvedGenerateConfig;
