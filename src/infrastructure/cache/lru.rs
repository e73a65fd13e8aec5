//! Least-recently-used victim selection

use std::collections::HashMap;

/// Key of the entry with the smallest rank, i.e. the next one to evict
pub(crate) fn lru_victim<V, R, F>(entries: &HashMap<String, V>, rank: F) -> Option<String>
where
    R: Ord,
    F: Fn(&V) -> R,
{
    entries
        .iter()
        .min_by(|(_, a), (_, b)| rank(a).cmp(&rank(b)))
        .map(|(key, _)| key.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_map_has_no_victim() {
        let entries: HashMap<String, (u64, u64)> = HashMap::new();
        assert!(lru_victim(&entries, |v| *v).is_none());
    }

    #[test]
    fn test_picks_lowest_rank() {
        let mut entries = HashMap::new();
        entries.insert("recent".to_string(), (30u64, 0u64));
        entries.insert("old-popular".to_string(), (10, 5));
        entries.insert("old-unused".to_string(), (10, 1));

        assert_eq!(lru_victim(&entries, |v| *v).as_deref(), Some("old-unused"));
    }
}
