//! Alternate-code suggestions for duplicate-code situations.
//!
//! The candidate list is a fixed, deterministic policy behind a trait so a
//! future allocation scheme (frequency-aware, layout-aware, …) can swap in
//! without touching the classifier.

use crate::simulate::{Occupant, WorkingView};
use crate::{Suggestion, SuggestionAction};
use codetable_model::Code;

/// Alternate-code allocation strategy.
pub trait SuggestStrategy: Send + Sync {
    /// Deterministic, ordered candidate codes derived from `code`. Candidates
    /// longer than the code length limit must already be filtered out;
    /// occupancy filtering happens at the call site against the simulated
    /// state.
    fn candidates(&self, code: &Code) -> Vec<Code>;
}

/// Default policy: append a fixed suffix list to the original code.
#[derive(Debug, Clone)]
pub struct SuffixStrategy {
    suffixes: Vec<String>,
}

impl SuffixStrategy {
    pub const DEFAULT_SUFFIXES: [&'static str; 4] = ["a", "i", ";", ";;"];

    pub fn new(suffixes: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            suffixes: suffixes.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for SuffixStrategy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SUFFIXES)
    }
}

impl SuggestStrategy for SuffixStrategy {
    fn candidates(&self, code: &Code) -> Vec<Code> {
        self.suffixes
            .iter()
            .filter_map(|suffix| code.with_suffix(suffix))
            .collect()
    }
}

/// Suggestions for a non-fatal duplicate-code Create without an in-batch
/// resolution: one Move for the existing occupant, then Adjust candidates
/// for the new word, restricted to codes free in the simulated state.
pub(crate) fn duplicate_code_suggestions(
    strategy: &dyn SuggestStrategy,
    view: &WorkingView,
    code: &Code,
    new_word: &str,
    occupant: &Occupant,
) -> Vec<Suggestion> {
    let free: Vec<Code> = strategy
        .candidates(code)
        .into_iter()
        .filter(|candidate| !view.is_occupied(candidate))
        .collect();

    let mut suggestions = vec![Suggestion {
        action: SuggestionAction::Move,
        word: occupant.entry.word.clone(),
        to_code: free.first().cloned(),
        reason: match free.first() {
            Some(to) => format!("可将「{}」移至空闲编码 {to}", occupant.entry.word),
            None => format!("可将「{}」移至其他编码", occupant.entry.word),
        },
    }];

    suggestions.extend(free.iter().map(|candidate| Suggestion {
        action: SuggestionAction::Adjust,
        word: new_word.to_string(),
        to_code: Some(candidate.clone()),
        reason: format!("编码 {candidate} 空闲，可改用"),
    }));

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_candidates_in_fixed_order() {
        let strategy = SuffixStrategy::default();
        let candidates = strategy.candidates(&Code::new("rjgl").unwrap());
        let as_strings: Vec<&str> = candidates.iter().map(Code::as_str).collect();
        assert_eq!(as_strings, vec!["rjgla", "rjgli", "rjgl;", "rjgl;;"]);
    }

    #[test]
    fn candidates_respect_length_limit() {
        let strategy = SuffixStrategy::default();
        // 5 chars: the two-char suffix no longer fits.
        let candidates = strategy.candidates(&Code::new("abcde").unwrap());
        let as_strings: Vec<&str> = candidates.iter().map(Code::as_str).collect();
        assert_eq!(as_strings, vec!["abcdea", "abcdei", "abcde;"]);

        // 6 chars: nothing fits.
        assert!(strategy
            .candidates(&Code::new("abcdef").unwrap())
            .is_empty());
    }
}
