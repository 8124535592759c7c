//! Word-overlap relevance scoring.
//!
//! The score of a candidate is the fraction of query tokens found in it. A
//! query token is found when some word of the candidate contains it
//! (case-insensitive), so "error" also matches "errors". Candidates below the
//! threshold are dropped; the rest are ranked by score, ties keeping their
//! original order.

/// Minimum score for a snippet to be returned.
pub const DEFAULT_RELEVANCE_THRESHOLD: f64 = 0.3;

/// Default number of snippets fetched for context assembly.
pub const DEFAULT_KNOWLEDGE_LIMIT: usize = 10;

/// Lowercased words of `text`, stripped of surrounding punctuation.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|word| {
            word.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect()
}

/// Fraction of `query` tokens present in `content`, in `[0, 1]`.
///
/// An empty query scores 0.
pub fn score(query: &str, content: &str) -> f64 {
    score_tokens(&tokenize(query), &tokenize(content))
}

pub(crate) fn score_tokens(query_tokens: &[String], content_tokens: &[String]) -> f64 {
    if query_tokens.is_empty() {
        return 0.0;
    }
    let matched = query_tokens
        .iter()
        .filter(|q| content_tokens.iter().any(|c| c.contains(q.as_str())))
        .count();
    matched as f64 / query_tokens.len() as f64
}

/// Score `candidates`, drop those under `threshold`, rank and truncate.
///
/// Returns `(index, score)` pairs into `candidates`.
pub fn rank<'a, I>(query: &str, candidates: I, threshold: f64, limit: usize) -> Vec<(usize, f64)>
where
    I: IntoIterator<Item = &'a str>,
{
    let query_tokens = tokenize(query);
    let mut scored: Vec<(usize, f64)> = candidates
        .into_iter()
        .enumerate()
        .map(|(i, content)| (i, score_tokens(&query_tokens, &tokenize(content))))
        .filter(|(_, s)| *s > 0.0 && *s >= threshold)
        .collect();

    // sort_by is stable, so equal scores keep insertion order.
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    const STORED: &str = "I got a database connection error today";

    #[rstest]
    #[case("database error", 1.0)]
    #[case("quantum physics", 0.0)]
    #[case("database physics", 0.5)]
    #[case("DATABASE, Error!", 1.0)]
    #[case("", 0.0)]
    fn test_score(#[case] query: &str, #[case] expected: f64) {
        assert!((score(query, STORED) - expected).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_word_match() {
        assert_eq!(score("error", "three errors found"), 1.0);
    }

    #[test]
    fn test_rank_filters_and_orders() {
        let candidates = [
            "quantum physics lecture",
            "database is slow",
            STORED,
            "database error in the logs",
        ];
        let ranked = rank("database error", candidates, DEFAULT_RELEVANCE_THRESHOLD, 10);
        let indices: Vec<usize> = ranked.iter().map(|(i, _)| *i).collect();
        // Both full matches keep original order, then the half match.
        assert_eq!(indices, vec![2, 3, 1]);
    }

    #[test]
    fn test_rank_respects_threshold_and_limit() {
        let candidates = ["alpha", "alpha beta", "alpha beta gamma"];
        let ranked = rank("alpha beta gamma delta", candidates, 0.5, 10);
        assert_eq!(ranked.iter().map(|(i, _)| *i).collect::<Vec<_>>(), vec![2, 1]);

        let ranked = rank("alpha", candidates, 0.3, 2);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].0, 0);
    }

    proptest! {
        #[test]
        fn prop_score_is_a_fraction(query in "[a-z ]{0,40}", content in "[a-z ]{0,80}") {
            let s = score(&query, &content);
            prop_assert!((0.0..=1.0).contains(&s));
        }

        #[test]
        fn prop_content_matches_itself(text in "[a-z]{1,8}( [a-z]{1,8}){0,6}") {
            prop_assert_eq!(score(&text, &text), 1.0);
        }

        #[test]
        fn prop_rank_is_sorted_and_bounded(
            query in "[a-c]{1,3}( [a-c]{1,3}){0,3}",
            candidates in proptest::collection::vec("[a-c]{1,3}( [a-c]{1,3}){0,5}", 0..20),
            limit in 0usize..15,
        ) {
            let ranked = rank(&query, candidates.iter().map(String::as_str), 0.3, limit);
            prop_assert!(ranked.len() <= limit);
            for pair in ranked.windows(2) {
                prop_assert!(pair[0].1 >= pair[1].1);
                if pair[0].1 == pair[1].1 {
                    prop_assert!(pair[0].0 < pair[1].0);
                }
            }
            for (_, s) in &ranked {
                prop_assert!(*s >= 0.3);
            }
        }
    }
}
