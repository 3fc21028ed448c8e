use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::post::Post;
use crate::models::storage::KeyValueStore;

pub fn hugged_key(post_id: &str) -> String {
    format!("hugged_{}", post_id)
}

pub fn saved_key(post_id: &str) -> String {
    format!("saved_{}", post_id)
}

pub fn description_key(post_id: &str) -> String {
    format!("patient_description_{}", post_id)
}

pub fn assessment_key(post_id: &str) -> String {
    format!("assessment_{}", post_id)
}

/// This device's engagement with one post, plus the long-form text the
/// detail view shows.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Engagement {
    pub hugged: bool,
    pub bookmarked: bool,
    pub description: String,
    pub assessment: String,
}

impl Engagement {
    /// Defaults for a post nothing has been stored for yet.
    pub fn for_post(post: &Post) -> Self {
        Self {
            hugged: false,
            bookmarked: false,
            description: post.description.clone(),
            assessment: post.assessment.clone(),
        }
    }

    /// Read each stored field independently. A field that is missing or does
    /// not parse keeps its default. Text fields that were never stored are
    /// written from the post so the detail view outlives a seed change.
    pub async fn load(store: &dyn KeyValueStore, post: &Post) -> Self {
        let mut engagement = Self::for_post(post);

        if let Some(hugged) = read_field(store, &hugged_key(&post.id)).await {
            engagement.hugged = hugged;
        }
        if let Some(bookmarked) = read_field(store, &saved_key(&post.id)).await {
            engagement.bookmarked = bookmarked;
        }

        let key = description_key(&post.id);
        match read_field::<String>(store, &key).await {
            Some(description) => engagement.description = description,
            None => write_field(store, &key, &engagement.description).await,
        }

        let key = assessment_key(&post.id);
        match read_field::<String>(store, &key).await {
            Some(assessment) => engagement.assessment = assessment,
            None => write_field(store, &key, &engagement.assessment).await,
        }

        engagement
    }
}

/// JSON-decoded value under `key`, or `None` when absent, unreadable or malformed.
pub(crate) async fn read_field<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                log::warn!("Ignoring malformed value under {}: {}", key, e);
                None
            }
        },
        Ok(None) => None,
        Err(e) => {
            log::error!("Error loading {}: {}", key, e);
            None
        }
    }
}

pub(crate) async fn write_field<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) {
    let json = match serde_json::to_string(value) {
        Ok(json) => json,
        Err(e) => {
            log::error!("Error encoding {}: {}", key, e);
            return;
        }
    };
    if let Err(e) = store.set(key, &json).await {
        log::error!("Error saving {}: {}", key, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::post::RawPost;
    use crate::models::storage::MemoryStore;

    fn post() -> Post {
        let raw: RawPost = serde_json::from_str(
            r#"{"id":"p1","title":"t","patient_description":"seed desc","assessment":"seed assessment"}"#,
        )
        .unwrap();
        raw.into_post(0)
    }

    #[tokio::test]
    async fn test_absent_keys_keep_defaults() {
        let store = MemoryStore::new();
        let engagement = Engagement::load(&store, &post()).await;
        assert_eq!(engagement, Engagement::for_post(&post()));
    }

    #[tokio::test]
    async fn test_text_snapshot_is_written_when_absent() {
        let store = MemoryStore::new();
        Engagement::load(&store, &post()).await;
        assert_eq!(
            store.get("patient_description_p1").await.unwrap(),
            Some("\"seed desc\"".to_string())
        );
    }

    #[tokio::test]
    async fn test_stored_values_override_post() {
        let store = MemoryStore::new();
        store.set("hugged_p1", "true").await.unwrap();
        store.set("saved_p1", "true").await.unwrap();
        store.set("assessment_p1", "\"stored assessment\"").await.unwrap();

        let engagement = Engagement::load(&store, &post()).await;
        assert!(engagement.hugged);
        assert!(engagement.bookmarked);
        assert_eq!(engagement.assessment, "stored assessment");
        assert_eq!(engagement.description, "seed desc");
    }

    #[tokio::test]
    async fn test_malformed_field_does_not_block_others() {
        let store = MemoryStore::new();
        store.set("hugged_p1", "not-a-bool").await.unwrap();
        store.set("saved_p1", "true").await.unwrap();

        let engagement = Engagement::load(&store, &post()).await;
        assert!(!engagement.hugged);
        assert!(engagement.bookmarked);
    }
}
