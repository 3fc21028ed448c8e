use std::path::Path;

use crate::error::CasefeedError;
use crate::models::post::RawPost;

const BUNDLED_SEED: &str = include_str!("../../data/cases.json");

/// The read-only dataset posts are seeded from. Records are kept raw and
/// normalized on the way into the feed.
#[derive(Clone, Debug, Default)]
pub struct SeedDataset {
    records: Vec<RawPost>,
}

impl SeedDataset {
    pub fn from_records(records: Vec<RawPost>) -> Self {
        Self { records }
    }

    /// Parse a JSON array of post records. Entries that are not records are
    /// skipped; only a document that is not an array fails.
    pub fn from_json(json: &str) -> Result<Self, CasefeedError> {
        let values: Vec<serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| CasefeedError::Seed(format!("Failed to parse seed dataset: {}", e)))?;

        let records = values
            .into_iter()
            .enumerate()
            .filter_map(|(i, value)| match serde_json::from_value::<RawPost>(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("Skipping malformed seed record {}: {}", i, e);
                    None
                }
            })
            .collect();
        Ok(Self { records })
    }

    pub async fn from_path(path: &Path) -> Result<Self, CasefeedError> {
        let json = tokio::fs::read_to_string(path).await.map_err(|e| {
            CasefeedError::Seed(format!("Failed to read seed dataset {:?}: {}", path, e))
        })?;
        Self::from_json(&json)
    }

    /// The dataset compiled into the binary.
    pub fn bundled() -> Result<Self, CasefeedError> {
        Self::from_json(BUNDLED_SEED)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all(&self) -> Vec<RawPost> {
        self.records.clone()
    }

    /// Up to `count` records starting at `start`; empty once past the end.
    pub fn slice(&self, start: usize, count: usize) -> Vec<RawPost> {
        self.records
            .iter()
            .skip(start)
            .take(count)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::normalize;

    #[test]
    fn test_bundled_dataset_parses() {
        let seed = SeedDataset::bundled().unwrap();
        assert!(!seed.is_empty());
    }

    #[test]
    fn test_slice_past_end_is_empty() {
        let seed = SeedDataset::from_json(r#"[{"title":"a"},{"title":"b"},{"title":"c"}]"#).unwrap();
        assert_eq!(seed.slice(1, 10).len(), 2);
        assert!(seed.slice(3, 10).is_empty());
        assert!(seed.slice(100, 10).is_empty());
    }

    #[test]
    fn test_bad_record_does_not_sink_the_dataset() {
        let seed = SeedDataset::from_json(
            r#"[{"title":"a","num_hugs":-1},42,{"title":5,"num_hugs":2.5},{"title":"c","num_hugs":3}]"#,
        )
        .unwrap();
        assert_eq!(seed.len(), 3);

        let posts = normalize(seed.all(), 0);
        assert_eq!(posts[0].title, "a");
        assert_eq!(posts[0].hug_count, 0);
        assert_eq!(posts[2].hug_count, 3);
    }

    #[test]
    fn test_non_array_seed_is_an_error() {
        assert!(matches!(
            SeedDataset::from_json(r#"{"title":"a"}"#),
            Err(CasefeedError::Seed(_))
        ));
    }
}
