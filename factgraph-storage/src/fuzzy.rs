// Copyright 2025 Factgraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Fuzzy matching for keyword queries.
//!
//! Similarity is the normalized character-level diff ratio over lowercased
//! inputs, in [0, 1]. A fact qualifies when any one of subject, predicate,
//! or object independently meets the threshold.

use similar::TextDiff;

use factgraph_core::Fact;

/// Normalized similarity between two strings, case-insensitive.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    TextDiff::from_chars(a.as_str(), b.as_str()).ratio() as f64
}

/// Whether any field of the fact matches the keyword at the threshold.
pub fn fact_matches(fact: &Fact, keyword: &str, threshold: f64) -> bool {
    similarity(&fact.subject, keyword) >= threshold
        || similarity(&fact.predicate, keyword) >= threshold
        || similarity(&fact.object, keyword) >= threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use factgraph_core::SOURCE_MANUAL;
    use proptest::prelude::*;

    #[test]
    fn near_miss_keyword_matches_subject() {
        // "Alic" vs "Alice": 4 of 5 chars shared.
        assert!(similarity("Alice", "Alic") >= 0.8);
        let fact = Fact::new("Alice", "friends_with", "Bob", SOURCE_MANUAL, None);
        assert!(fact_matches(&fact, "Alic", 0.8));
        assert!(!fact_matches(&fact, "Zed", 0.8));
    }

    #[test]
    fn comparison_is_case_insensitive() {
        assert_eq!(similarity("ALICE", "alice"), 1.0);
    }

    #[test]
    fn any_single_field_qualifies() {
        let fact = Fact::new("Alice", "friends_with", "Bob", SOURCE_MANUAL, None);
        assert!(fact_matches(&fact, "friends_wit", 0.8));
        assert!(fact_matches(&fact, "Bob", 0.8));
    }

    proptest! {
        #[test]
        fn similarity_is_bounded(a in ".{0,32}", b in ".{0,32}") {
            let score = similarity(&a, &b);
            prop_assert!((0.0..=1.0).contains(&score));
        }

        #[test]
        fn identical_strings_score_one(a in ".{1,32}") {
            prop_assert_eq!(similarity(&a, &a), 1.0);
        }
    }
}
