//! Transportable cache snapshot (export/import)

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::embedding::is_finite_vector;
use crate::domain::generation::GeneratedAnswer;
use crate::domain::DomainError;

use super::{normalize_query, CacheEntry};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted form of one cached answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub response: String,
    #[serde(default)]
    pub techniques: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub code_examples: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
    pub confidence: f32,
    pub embedding: Vec<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&CacheEntry> for SnapshotEntry {
    fn from(entry: &CacheEntry) -> Self {
        let answer = entry.answer();

        Self {
            response: answer.response.clone(),
            techniques: answer.techniques.clone(),
            tools: answer.tools.clone(),
            code_examples: answer.code_examples.clone(),
            sources: answer.sources.clone(),
            confidence: answer.confidence,
            embedding: entry.embedding().to_vec(),
            category: entry.category().map(String::from),
            difficulty: entry.difficulty().map(String::from),
            created_at: entry.created_at(),
        }
    }
}

/// Serializable copy of the response store and, optionally, the embedding cache
///
/// `entries` is keyed by normalized query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub version: u32,
    /// Embedding dimension shared by every vector in the snapshot
    #[serde(default)]
    pub dimension: Option<usize>,
    pub exported_at: DateTime<Utc>,
    pub entries: BTreeMap<String, SnapshotEntry>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub embeddings: BTreeMap<String, Vec<f32>>,
}

/// Validated snapshot content, ready to merge into the stores
#[derive(Debug, Clone)]
pub struct ValidatedSnapshot {
    pub entries: Vec<CacheEntry>,
    pub embeddings: Vec<(String, Vec<f32>)>,
    pub dimension: Option<usize>,
}

impl CacheSnapshot {
    /// Build a snapshot from live entries and cached embeddings
    pub fn from_parts<'a>(
        entries: impl IntoIterator<Item = &'a CacheEntry>,
        embeddings: impl IntoIterator<Item = (String, Vec<f32>)>,
    ) -> Self {
        let entries: BTreeMap<String, SnapshotEntry> = entries
            .into_iter()
            .map(|entry| (entry.key().to_string(), SnapshotEntry::from(entry)))
            .collect();
        let embeddings: BTreeMap<String, Vec<f32>> = embeddings.into_iter().collect();
        let dimension = entries
            .values()
            .map(|e| e.embedding.len())
            .chain(embeddings.values().map(Vec::len))
            .next();

        Self {
            version: SNAPSHOT_VERSION,
            dimension,
            exported_at: Utc::now(),
            entries,
            embeddings,
        }
    }

    /// Parse an untyped JSON document, reporting shape errors as validation errors
    pub fn from_json(value: serde_json::Value) -> Result<Self, DomainError> {
        serde_json::from_value(value)
            .map_err(|e| DomainError::snapshot_validation(format!("Malformed snapshot: {}", e)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Validate every entry and convert to cache entries
    ///
    /// All-or-nothing: the first structural problem rejects the whole
    /// snapshot. `expected_dimension` is the dimension already in use by the
    /// target store, if any. Entries whose TTL already elapsed are dropped.
    pub fn validate(
        self,
        expected_dimension: Option<usize>,
        ttl: Option<Duration>,
    ) -> Result<ValidatedSnapshot, DomainError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(DomainError::snapshot_validation(format!(
                "Unsupported snapshot version {} (expected {})",
                self.version, SNAPSHOT_VERSION
            )));
        }

        let mut dimension = expected_dimension;

        if let Some(declared) = self.dimension {
            check_dimension(&mut dimension, declared, "snapshot header")?;
        }

        let mut entries = Vec::with_capacity(self.entries.len());
        let mut seen = std::collections::HashSet::new();

        for (raw_key, entry) in self.entries {
            let key = normalize_query(&raw_key).map_err(|_| {
                DomainError::snapshot_validation("Snapshot entry has an empty key")
            })?;

            if !seen.insert(key.clone()) {
                return Err(DomainError::snapshot_validation(format!(
                    "Duplicate snapshot key after normalization: '{}'",
                    key
                )));
            }

            validate_vector(&entry.embedding, &key)?;
            check_dimension(&mut dimension, entry.embedding.len(), &key)?;

            if !entry.confidence.is_finite() || !(0.0..=1.0).contains(&entry.confidence) {
                return Err(DomainError::snapshot_validation(format!(
                    "Entry '{}' has confidence {} outside [0, 1]",
                    key, entry.confidence
                )));
            }

            let answer = GeneratedAnswer {
                response: entry.response,
                techniques: entry.techniques,
                tools: entry.tools,
                code_examples: entry.code_examples,
                sources: entry.sources,
                confidence: entry.confidence,
            };

            let cache_entry = CacheEntry::new(key, answer, entry.embedding)
                .with_category(entry.category)
                .with_difficulty(entry.difficulty)
                .with_ttl(ttl)
                .with_created_at(entry.created_at);

            if !cache_entry.is_expired() {
                entries.push(cache_entry);
            }
        }

        let mut embeddings = Vec::with_capacity(self.embeddings.len());

        for (raw_key, vector) in self.embeddings {
            let key = normalize_query(&raw_key).map_err(|_| {
                DomainError::snapshot_validation("Snapshot embedding has an empty key")
            })?;

            validate_vector(&vector, &key)?;
            check_dimension(&mut dimension, vector.len(), &key)?;
            embeddings.push((key, vector));
        }

        Ok(ValidatedSnapshot {
            entries,
            embeddings,
            dimension,
        })
    }
}

fn validate_vector(vector: &[f32], key: &str) -> Result<(), DomainError> {
    if vector.is_empty() {
        return Err(DomainError::snapshot_validation(format!(
            "Entry '{}' has an empty embedding",
            key
        )));
    }

    if !is_finite_vector(vector) {
        return Err(DomainError::snapshot_validation(format!(
            "Entry '{}' has non-finite embedding values",
            key
        )));
    }

    Ok(())
}

fn check_dimension(
    dimension: &mut Option<usize>,
    actual: usize,
    source: &str,
) -> Result<(), DomainError> {
    match *dimension {
        Some(expected) if expected != actual => Err(DomainError::snapshot_validation(format!(
            "Embedding dimension mismatch at '{}': expected {}, got {}",
            source, expected, actual
        ))),
        Some(_) => Ok(()),
        None => {
            *dimension = Some(actual);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(key: &str, embedding: Vec<f32>) -> CacheEntry {
        CacheEntry::new(
            key,
            GeneratedAnswer::new(format!("answer for {}", key), 0.75)
                .with_sources(vec!["OWASP".to_string()]),
            embedding,
        )
        .with_category(Some("web".to_string()))
    }

    #[test]
    fn test_from_parts_and_validate() {
        let entries = vec![entry("a", vec![1.0, 0.0]), entry("b", vec![0.0, 1.0])];
        let snapshot =
            CacheSnapshot::from_parts(&entries, vec![("c".to_string(), vec![0.5, 0.5])]);

        assert_eq!(snapshot.version, SNAPSHOT_VERSION);
        assert_eq!(snapshot.dimension, Some(2));
        assert_eq!(snapshot.len(), 2);

        let validated = snapshot.validate(None, None).unwrap();

        assert_eq!(validated.entries.len(), 2);
        assert_eq!(validated.embeddings.len(), 1);
        assert_eq!(validated.dimension, Some(2));

        let a = validated.entries.iter().find(|e| e.key() == "a").unwrap();
        assert_eq!(a.answer().response, "answer for a");
        assert_eq!(a.answer().sources, vec!["OWASP".to_string()]);
        assert_eq!(a.category(), Some("web"));
        assert_eq!(a.embedding(), &[1.0, 0.0]);
        assert_eq!(a.created_at(), entries[0].created_at());
    }

    #[test]
    fn test_json_round_trip_preserves_entries() {
        let entries = vec![entry("what is xss?", vec![0.25, -0.5, 0.75])];
        let snapshot = CacheSnapshot::from_parts(&entries, Vec::new());

        let json = serde_json::to_value(&snapshot).unwrap();
        assert!(json["entries"]["what is xss?"]["embedding"].is_array());

        let parsed = CacheSnapshot::from_json(json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = serde_json::json!({
            "version": 1,
            "exported_at": "2024-01-01T00:00:00Z",
            "entries": { "q": { "confidence": 0.5, "embedding": [1.0], "created_at": "2024-01-01T00:00:00Z" } }
        });

        let result = CacheSnapshot::from_json(json);
        assert!(matches!(result, Err(DomainError::SnapshotValidation { .. })));
    }

    #[test]
    fn test_wrong_types_rejected() {
        let json = serde_json::json!({ "version": "one", "entries": [] });
        assert!(CacheSnapshot::from_json(json).is_err());
    }

    #[test]
    fn test_dimension_mismatch_rejected() {
        let entries = vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0, 0.0, 0.0])];
        let mut snapshot = CacheSnapshot::from_parts(&entries, Vec::new());
        snapshot.dimension = None;

        let result = snapshot.validate(None, None);
        assert!(matches!(result, Err(DomainError::SnapshotValidation { .. })));
    }

    #[test]
    fn test_expected_dimension_enforced() {
        let entries = vec![entry("a", vec![1.0, 0.0])];
        let snapshot = CacheSnapshot::from_parts(&entries, Vec::new());

        assert!(snapshot.clone().validate(Some(2), None).is_ok());
        assert!(snapshot.validate(Some(3), None).is_err());
    }

    #[test]
    fn test_empty_key_rejected() {
        let entries = vec![entry("a", vec![1.0])];
        let mut snapshot = CacheSnapshot::from_parts(&entries, Vec::new());
        let value = snapshot.entries.remove("a").unwrap();
        snapshot.entries.insert("   ".to_string(), value);

        assert!(snapshot.validate(None, None).is_err());
    }

    #[test]
    fn test_duplicate_normalized_keys_rejected() {
        let entries = vec![entry("a b", vec![1.0]), entry("A  B", vec![1.0])];
        let snapshot = CacheSnapshot::from_parts(&entries, Vec::new());

        assert!(snapshot.validate(None, None).is_err());
    }

    #[test]
    fn test_bad_confidence_and_values_rejected() {
        let entries = vec![entry("a", vec![1.0])];
        let mut snapshot = CacheSnapshot::from_parts(&entries, Vec::new());
        snapshot.entries.get_mut("a").unwrap().confidence = 1.5;
        assert!(snapshot.validate(None, None).is_err());

        let mut snapshot = CacheSnapshot::from_parts(&entries, Vec::new());
        snapshot.entries.get_mut("a").unwrap().embedding = vec![f32::NAN];
        assert!(snapshot.validate(None, None).is_err());
    }

    #[test]
    fn test_unknown_version_rejected() {
        let mut snapshot = CacheSnapshot::from_parts(&Vec::<CacheEntry>::new(), Vec::new());
        snapshot.version = 99;

        assert!(snapshot.validate(None, None).is_err());
    }

    #[test]
    fn test_expired_entries_dropped() {
        let entries = vec![entry("old", vec![1.0])];
        let mut snapshot = CacheSnapshot::from_parts(&entries, Vec::new());
        snapshot.entries.get_mut("old").unwrap().created_at =
            Utc::now() - chrono::Duration::hours(2);

        let validated = snapshot
            .validate(None, Some(Duration::from_secs(60)))
            .unwrap();

        assert!(validated.entries.is_empty());
    }
}
