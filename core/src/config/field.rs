//! Recognized generate config fields and their merge rules
//!
//! Every merge decision in the resolver is driven by this table, so adding a
//! field means adding a variant here and a slot in [`GenerateParams`].
//!
//! [`GenerateParams`]: super::GenerateParams

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a field combines with the model defaults once caller and override
/// values have been merged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Model default is used only when no caller or override value exists
    Fallback,
    /// Model default entries are appended after the supplied entries, deduplicated
    Union,
}

/// A recognized generate config field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    StopWordsStr,
    StopWordsList,
    MaxNewTokens,
    MinNewTokens,
    TopK,
    TopP,
    Temperature,
    RepetitionPenalty,
    NumBeams,
    NumReturnSequences,
    RandomSeed,
    TimeoutMs,
    ReturnLogits,
    ReturnIncremental,
}

impl Field {
    /// All recognized fields, in canonical order
    pub const ALL: [Field; 14] = [
        Field::StopWordsStr,
        Field::StopWordsList,
        Field::MaxNewTokens,
        Field::MinNewTokens,
        Field::TopK,
        Field::TopP,
        Field::Temperature,
        Field::RepetitionPenalty,
        Field::NumBeams,
        Field::NumReturnSequences,
        Field::RandomSeed,
        Field::TimeoutMs,
        Field::ReturnLogits,
        Field::ReturnIncremental,
    ];

    /// Get the field name as it appears in caller mappings
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::StopWordsStr => "stop_words_str",
            Field::StopWordsList => "stop_words_list",
            Field::MaxNewTokens => "max_new_tokens",
            Field::MinNewTokens => "min_new_tokens",
            Field::TopK => "top_k",
            Field::TopP => "top_p",
            Field::Temperature => "temperature",
            Field::RepetitionPenalty => "repetition_penalty",
            Field::NumBeams => "num_beams",
            Field::NumReturnSequences => "num_return_sequences",
            Field::RandomSeed => "random_seed",
            Field::TimeoutMs => "timeout_ms",
            Field::ReturnLogits => "return_logits",
            Field::ReturnIncremental => "return_incremental",
        }
    }

    /// Look up a field by its mapping key
    pub fn from_name(name: &str) -> Option<Field> {
        Field::ALL.iter().copied().find(|field| field.as_str() == name)
    }

    pub fn merge_policy(&self) -> MergePolicy {
        match self {
            Field::StopWordsStr | Field::StopWordsList => MergePolicy::Union,
            _ => MergePolicy::Fallback,
        }
    }

    /// Whether downstream generation needs a value for this field.
    ///
    /// Union fields resolve to an empty list when nobody supplies entries,
    /// so they are never reported as unresolved.
    pub fn is_required(&self) -> bool {
        !matches!(
            self,
            Field::StopWordsStr | Field::StopWordsList | Field::RandomSeed | Field::TimeoutMs
        )
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip_covers_all_fields() {
        for field in Field::ALL {
            assert_eq!(Field::from_name(field.as_str()), Some(field));
        }
        assert_eq!(Field::from_name("do_sample"), None);
    }

    #[test]
    fn test_only_stop_words_union_with_defaults() {
        let union: Vec<_> = Field::ALL
            .iter()
            .filter(|f| f.merge_policy() == MergePolicy::Union)
            .collect();
        assert_eq!(union, vec![&Field::StopWordsStr, &Field::StopWordsList]);
    }

    #[test]
    fn test_required_fields() {
        assert!(Field::MaxNewTokens.is_required());
        assert!(Field::TopK.is_required());
        assert!(Field::TopP.is_required());
        assert!(!Field::RandomSeed.is_required());
        assert!(!Field::StopWordsList.is_required());
    }
}
