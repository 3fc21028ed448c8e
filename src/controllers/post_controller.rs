use std::fmt::Write;
use std::sync::Arc;

use crate::error::CasefeedError;
use crate::models::assessment::{parse_assessment, AssessmentBlock};
use crate::models::storage::default_storage_file;
use crate::models::{Config, Engagement, FeedStore, FileStore, KeyValueStore, MemoryStore, Post, SeedDataset};
use crate::views::tui::{format_datetime, plural};

/// Build the feed store described by `config` and load it.
pub async fn init_feed(config: &Config, ephemeral: bool) -> Result<FeedStore, CasefeedError> {
    let storage: Arc<dyn KeyValueStore> = if ephemeral {
        log::info!("Using in-memory storage");
        Arc::new(MemoryStore::new())
    } else {
        let path = match &config.storage_path {
            Some(path) => path.clone(),
            None => default_storage_file()?,
        };
        match FileStore::open(&path).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                log::error!("{}; starting with empty storage", e);
                Arc::new(FileStore::empty(path))
            }
        }
    };

    let seed = load_seed(config).await;
    let feed = FeedStore::new(storage, seed)
        .with_page_size(config.page_size)
        .with_initial_limit(config.initial_limit);
    let count = feed.load().await;
    log::info!("Feed ready with {} posts", count);
    Ok(feed)
}

async fn load_seed(config: &Config) -> SeedDataset {
    let seed = match &config.seed_path {
        Some(path) => SeedDataset::from_path(path).await,
        None => SeedDataset::bundled(),
    };
    seed.unwrap_or_else(|e| {
        log::error!("{}; continuing without seed data", e);
        SeedDataset::default()
    })
}

pub fn format_feed(posts: &[Post]) -> String {
    let mut out = String::new();
    for post in posts {
        let _ = writeln!(
            out,
            "{:<16} {:>8} {:>12}  {}",
            post.id,
            plural(post.hug_count as usize, "hug", "hugs"),
            plural(post.comments.len(), "comment", "comments"),
            post.title
        );
    }
    out
}

pub fn format_post(post: &Post, engagement: &Engagement) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} [{}]", post.display_title(), post.id);
    let _ = writeln!(
        out,
        "{} | {}",
        post.age_tag().unwrap_or("Unknown"),
        format_datetime(post.created_at)
    );
    let _ = writeln!(
        out,
        "{}{}  {}{}",
        plural(post.hug_count as usize, "Hug", "Hugs"),
        if engagement.hugged { " (hugged)" } else { "" },
        plural(post.comments.len(), "Comment", "Comments"),
        if engagement.bookmarked { "  Saved" } else { "" },
    );

    let _ = writeln!(out, "\nPatient Description:\n{}", engagement.description);
    let _ = writeln!(out, "\nAssessment:");
    for block in parse_assessment(&engagement.assessment) {
        match block {
            AssessmentBlock::Heading(text) => {
                let _ = writeln!(out, "== {} ==", text);
            }
            AssessmentBlock::Body(text) => {
                let _ = writeln!(out, "{}", text);
            }
        }
    }

    if !post.comments.is_empty() {
        let _ = writeln!(out, "\nComments:");
        for comment in &post.comments {
            let _ = writeln!(
                out,
                "- {} ({}): {}",
                comment.author.display_name(),
                format_datetime(comment.created_at),
                comment.text
            );
        }
    }
    out
}

pub async fn list_posts(feed: &FeedStore) {
    print!("{}", format_feed(&feed.posts().await));
}

pub async fn show_post(feed: &FeedStore, post_id: &str) -> Result<(), CasefeedError> {
    let post = feed
        .post(post_id)
        .await
        .ok_or_else(|| CasefeedError::PostNotFound(post_id.to_string()))?;
    let engagement = feed
        .load_saved_state(post_id)
        .await
        .unwrap_or_else(|| Engagement::for_post(&post));
    print!("{}", format_post(&post, &engagement));
    Ok(())
}

pub async fn reset(feed: &FeedStore) -> Result<(), CasefeedError> {
    if feed.clear_snapshot().await {
        println!("Stored feed cleared; it will be reseeded on next start.");
        Ok(())
    } else {
        Err(CasefeedError::Storage("Failed to clear stored feed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_feed() -> FeedStore {
        let seed = SeedDataset::from_json(
            r####"[
                {"id":"case-1","title":"[25F] headache","patient_description":"desc",
                 "assessment":"### Cause\nTension","num_hugs":1,
                 "comments":{"a":{"id":"c1","display_name":"dr_lee","text":"rest up"}}},
                {"title":"[34M] knee"}
            ]"####,
        )
        .unwrap();
        FeedStore::new(Arc::new(MemoryStore::new()), seed)
    }

    #[tokio::test]
    async fn test_format_feed_lists_every_post() {
        let feed = sample_feed();
        feed.load().await;
        let out = format_feed(&feed.posts().await);
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("case-1"));
        assert!(out.contains("1 hug"));
        assert!(out.contains("fallback-id-1"));
    }

    #[tokio::test]
    async fn test_format_post_renders_assessment_and_comments() {
        let feed = sample_feed();
        feed.load().await;
        let engagement = feed.load_saved_state("case-1").await.unwrap();
        let out = format_post(&feed.post("case-1").await.unwrap(), &engagement);
        assert!(out.starts_with("headache [case-1]"));
        assert!(out.contains("25F |"));
        assert!(out.contains("== Cause =="));
        assert!(out.contains("- dr_lee"));
    }

    #[tokio::test]
    async fn test_show_unknown_post_is_an_error() {
        let feed = sample_feed();
        feed.load().await;
        assert!(matches!(
            show_post(&feed, "nope").await,
            Err(CasefeedError::PostNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_init_feed_with_seed_file_and_ephemeral_storage() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = dir.path().join("cases.json");
        std::fs::write(&seed_path, r#"[{"title":"a"},{"title":"b"},{"title":"c"}]"#).unwrap();

        let config = Config {
            seed_path: Some(seed_path),
            initial_limit: Some(2),
            ..Config::default()
        };
        let feed = init_feed(&config, true).await.unwrap();
        assert_eq!(feed.len().await, 2);
        assert_eq!(feed.load_more().await, 1);
    }

    #[tokio::test]
    async fn test_init_feed_survives_missing_seed_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            seed_path: Some(dir.path().join("missing.json")),
            storage_path: Some(dir.path().join("storage.json")),
            ..Config::default()
        };
        let feed = init_feed(&config, false).await.unwrap();
        assert!(feed.is_empty().await);
    }
}
