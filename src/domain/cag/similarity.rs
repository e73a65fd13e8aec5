//! Exact linear-scan similarity search over cached embeddings

use crate::domain::embedding::cosine_similarity;

use super::CacheEntry;

/// Restricts which cached entries a semantic lookup may match
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchFilter {
    pub category: Option<String>,
    pub difficulty: Option<String>,
}

impl MatchFilter {
    pub fn new(category: Option<String>, difficulty: Option<String>) -> Self {
        Self {
            category,
            difficulty,
        }
    }

    /// An unset filter field matches anything; a set one requires equality
    pub fn matches(&self, entry: &CacheEntry) -> bool {
        if let Some(ref category) = self.category {
            if entry.category() != Some(category.as_str()) {
                return false;
            }
        }

        if let Some(ref difficulty) = self.difficulty {
            if entry.difficulty() != Some(difficulty.as_str()) {
                return false;
            }
        }

        true
    }
}

/// Best-scoring candidate of a search
#[derive(Debug, Clone, Copy)]
pub struct SimilarityMatch<'a> {
    pub entry: &'a CacheEntry,
    pub score: f32,
}

/// Return the candidate whose embedding is closest (cosine) to `query_vector`
///
/// Candidates failing `filter` are skipped. `None` only when no candidate is
/// left; threshold acceptance is the caller's decision. O(n·d).
pub fn find_best_match<'a, I>(
    query_vector: &[f32],
    candidates: I,
    filter: &MatchFilter,
) -> Option<SimilarityMatch<'a>>
where
    I: IntoIterator<Item = &'a CacheEntry>,
{
    candidates
        .into_iter()
        .filter(|entry| filter.matches(entry))
        .map(|entry| SimilarityMatch {
            entry,
            score: cosine_similarity(query_vector, entry.embedding()),
        })
        .fold(None, |best: Option<SimilarityMatch<'a>>, candidate| match best {
            Some(current) if current.score >= candidate.score => Some(current),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::generation::GeneratedAnswer;

    fn entry(key: &str, embedding: Vec<f32>, category: Option<&str>) -> CacheEntry {
        CacheEntry::new(key, GeneratedAnswer::new(key, 0.5), embedding)
            .with_category(category.map(String::from))
    }

    #[test]
    fn test_empty_candidates() {
        let entries: Vec<CacheEntry> = Vec::new();
        assert!(find_best_match(&[1.0, 0.0], &entries, &MatchFilter::default()).is_none());
    }

    #[test]
    fn test_picks_highest_score() {
        let entries = vec![
            entry("low", vec![0.5, 0.5, 0.5], None),
            entry("high", vec![0.99, 0.1, 0.0], None),
            entry("medium", vec![0.8, 0.3, 0.0], None),
        ];

        let best = find_best_match(&[1.0, 0.0, 0.0], &entries, &MatchFilter::default()).unwrap();

        assert_eq!(best.entry.key(), "high");
        assert!(best.score > 0.99);
    }

    #[test]
    fn test_returns_best_even_below_any_threshold() {
        let entries = vec![entry("orthogonal", vec![0.0, 1.0], None)];
        let best = find_best_match(&[1.0, 0.0], &entries, &MatchFilter::default()).unwrap();

        assert!(best.score.abs() < 1e-6);
    }

    #[test]
    fn test_category_filter() {
        let entries = vec![
            entry("web", vec![1.0, 0.0], Some("web")),
            entry("network", vec![1.0, 0.0], Some("network")),
            entry("untagged", vec![1.0, 0.0], None),
        ];
        let filter = MatchFilter::new(Some("network".to_string()), None);

        let best = find_best_match(&[1.0, 0.0], &entries, &filter).unwrap();
        assert_eq!(best.entry.key(), "network");

        let filter = MatchFilter::new(Some("cloud".to_string()), None);
        assert!(find_best_match(&[1.0, 0.0], &entries, &filter).is_none());
    }

    #[test]
    fn test_difficulty_filter() {
        let hard = CacheEntry::new("hard", GeneratedAnswer::new("h", 0.5), vec![1.0, 0.0])
            .with_difficulty(Some("advanced".to_string()));
        let easy = CacheEntry::new("easy", GeneratedAnswer::new("e", 0.5), vec![1.0, 0.0])
            .with_difficulty(Some("beginner".to_string()));
        let entries = vec![hard, easy];
        let filter = MatchFilter::new(None, Some("beginner".to_string()));

        let best = find_best_match(&[1.0, 0.0], &entries, &filter).unwrap();
        assert_eq!(best.entry.key(), "easy");
    }
}
