use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::models::engagement::{hugged_key, saved_key, write_field, Engagement};
use crate::models::post::{fallback_id, normalize, Comment, Post};
use crate::models::seed::SeedDataset;
use crate::models::storage::KeyValueStore;

/// Storage key of the full post list snapshot.
pub const POSTS_KEY: &str = "postsData";

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Owns every post and every per-post engagement field. All mutations go
/// through here, so the hug count in the list and the hugged flag are always
/// written together.
pub struct FeedStore {
    storage: Arc<dyn KeyValueStore>,
    seed: SeedDataset,
    page_size: usize,
    initial_limit: Option<usize>,
    posts: RwLock<Vec<Post>>,
    engagement: RwLock<HashMap<String, Engagement>>,
    loading: AtomicBool,
}

/// Clears the loading flag when dropped, however the load ends.
pub(crate) struct LoadGuard<'a> {
    flag: &'a AtomicBool,
}

impl Drop for LoadGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl FeedStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, seed: SeedDataset) -> Self {
        Self {
            storage,
            seed,
            page_size: DEFAULT_PAGE_SIZE,
            initial_limit: None,
            posts: RwLock::new(Vec::new()),
            engagement: RwLock::new(HashMap::new()),
            loading: AtomicBool::new(false),
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Seed only the first `limit` records on a fresh start and leave the
    /// rest to `load_more`.
    pub fn with_initial_limit(mut self, limit: Option<usize>) -> Self {
        self.initial_limit = limit;
        self
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    pub(crate) fn begin_load(&self) -> Option<LoadGuard<'_>> {
        self.loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| LoadGuard { flag: &self.loading })
    }

    pub async fn posts(&self) -> Vec<Post> {
        self.posts.read().await.clone()
    }

    pub async fn post(&self, post_id: &str) -> Option<Post> {
        self.posts.read().await.iter().find(|p| p.id == post_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.posts.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.posts.read().await.is_empty()
    }

    /// Whether the seed dataset has records past the current list.
    pub async fn has_more(&self) -> bool {
        self.len().await < self.seed.len()
    }

    /// Populate the list from the stored snapshot, or from the seed dataset
    /// when nothing is stored. A failed read leaves the list as it was.
    /// Returns the list length afterwards.
    pub async fn load(&self) -> usize {
        let Some(_guard) = self.begin_load() else {
            log::debug!("Load already in progress, skipping");
            return self.len().await;
        };

        let loaded = match self.storage.get(POSTS_KEY).await {
            Ok(Some(json)) => match serde_json::from_str::<Vec<Post>>(&json) {
                Ok(mut posts) => {
                    for (index, post) in posts.iter_mut().enumerate() {
                        if post.id.trim().is_empty() {
                            post.id = fallback_id(index);
                        }
                    }
                    log::info!("Loaded {} posts from snapshot", posts.len());
                    Some(posts)
                }
                Err(e) => {
                    log::error!("Error loading data: {}", e);
                    None
                }
            },
            Ok(None) => {
                let records = match self.initial_limit {
                    Some(limit) => self.seed.slice(0, limit),
                    None => self.seed.all(),
                };
                log::info!("No snapshot stored, seeding {} posts", records.len());
                Some(normalize(records, 0))
            }
            Err(e) => {
                log::error!("Error loading data: {}", e);
                None
            }
        };

        let mut posts = self.posts.write().await;
        if let Some(loaded) = loaded {
            *posts = loaded;
        }
        posts.len()
    }

    /// Append the next page of seed records past the current list. Returns how
    /// many posts were appended; zero at the end of the dataset or while
    /// another load is running.
    pub async fn load_more(&self) -> usize {
        let Some(_guard) = self.begin_load() else {
            log::debug!("Load already in progress, skipping");
            return 0;
        };

        let mut posts = self.posts.write().await;
        let offset = posts.len();
        let page = self.seed.slice(offset, self.page_size);
        if page.is_empty() {
            return 0;
        }

        let appended = normalize(page, offset);
        let count = appended.len();
        posts.extend(appended);
        log::debug!("Appended {} posts at offset {}", count, offset);
        count
    }

    /// Set one post's hug count and persist the list. Returns false if no post
    /// has that id.
    pub async fn update_hug_count(&self, post_id: &str, hug_count: u32) -> bool {
        self.mutate_post(post_id, |post| {
            post.hug_count = hug_count;
            true
        })
        .await
        .is_some()
    }

    /// Replace one post's comments wholesale and persist the list.
    pub async fn update_comments(&self, post_id: &str, comments: Vec<Comment>) -> bool {
        self.mutate_post(post_id, |post| {
            post.comments = comments;
            true
        })
        .await
        .is_some()
    }

    /// Apply `f` to the post in place and persist the whole list if `f`
    /// reports a change. `None` when the post does not exist.
    async fn mutate_post<F>(&self, post_id: &str, f: F) -> Option<bool>
    where
        F: FnOnce(&mut Post) -> bool,
    {
        let mut posts = self.posts.write().await;
        let post = posts.iter_mut().find(|p| p.id == post_id)?;
        let changed = f(post);
        if changed {
            self.persist(&posts).await;
        }
        Some(changed)
    }

    async fn persist(&self, posts: &[Post]) {
        let json = match serde_json::to_string(posts) {
            Ok(json) => json,
            Err(e) => {
                log::error!("Error saving data: {}", e);
                return;
            }
        };
        if let Err(e) = self.storage.set(POSTS_KEY, &json).await {
            log::error!("Error saving data: {}", e);
        }
    }

    /// Drop the stored snapshot so the next `load` reseeds. Hug flags go with
    /// it, since the reseeded counts no longer include them. Bookmarks and the
    /// text snapshots are kept.
    pub async fn clear_snapshot(&self) -> bool {
        if let Err(e) = self.storage.remove(POSTS_KEY).await {
            log::error!("Error clearing snapshot: {}", e);
            return false;
        }

        let mut ids: BTreeSet<String> = normalize(self.seed.all(), 0)
            .into_iter()
            .map(|post| post.id)
            .collect();
        ids.extend(self.posts.read().await.iter().map(|post| post.id.clone()));

        let mut cleared = true;
        for id in &ids {
            if let Err(e) = self.storage.remove(&hugged_key(id)).await {
                log::error!("Error clearing hug flag for {}: {}", id, e);
                cleared = false;
            }
        }
        self.engagement.write().await.clear();
        cleared
    }

    /// Read the post's stored engagement into memory and return it.
    pub async fn load_saved_state(&self, post_id: &str) -> Option<Engagement> {
        let post = self.post(post_id).await?;
        let engagement = Engagement::load(self.storage.as_ref(), &post).await;
        self.engagement
            .write()
            .await
            .insert(post_id.to_string(), engagement.clone());
        Some(engagement)
    }

    /// Engagement already in memory, without touching storage.
    pub async fn engagement(&self, post_id: &str) -> Option<Engagement> {
        self.engagement.read().await.get(post_id).cloned()
    }

    async fn ensure_engagement(&self, post_id: &str) -> Option<()> {
        if self.engagement.read().await.contains_key(post_id) {
            return Some(());
        }
        self.load_saved_state(post_id).await.map(|_| ())
    }

    /// Flip the hug and move the count with it. Returns the new flag and count.
    pub async fn toggle_hug(&self, post_id: &str) -> Option<(bool, u32)> {
        self.ensure_engagement(post_id).await?;
        let mut engagement = self.engagement.write().await;
        let state = engagement.get_mut(post_id)?;

        let hugged = !state.hugged;
        let current = self.post(post_id).await?.hug_count;
        let hug_count = if hugged {
            current.saturating_add(1)
        } else {
            current.saturating_sub(1)
        };

        self.update_hug_count(post_id, hug_count).await;
        state.hugged = hugged;
        write_field(self.storage.as_ref(), &hugged_key(post_id), &hugged).await;
        Some((hugged, hug_count))
    }

    /// Flip and persist the bookmark. The post list is not touched.
    pub async fn toggle_bookmark(&self, post_id: &str) -> Option<bool> {
        self.ensure_engagement(post_id).await?;
        let mut engagement = self.engagement.write().await;
        let state = engagement.get_mut(post_id)?;

        state.bookmarked = !state.bookmarked;
        write_field(self.storage.as_ref(), &saved_key(post_id), &state.bookmarked).await;
        Some(state.bookmarked)
    }

    /// Append a locally authored comment. Blank text is ignored.
    pub async fn add_comment(&self, post_id: &str, text: &str) -> Option<Comment> {
        if text.trim().is_empty() {
            return None;
        }
        let comment = Comment::local(post_id, text);
        let added = comment.clone();
        self.mutate_post(post_id, move |post| {
            post.comments.push(comment);
            true
        })
        .await?;
        Some(added)
    }

    /// Remove a locally authored comment. Unknown ids and comments from other
    /// authors leave the list unchanged. Returns whether a comment was removed.
    pub async fn delete_comment(&self, post_id: &str, comment_id: &str) -> bool {
        self.mutate_post(post_id, |post| {
            let Some(index) = post.comments.iter().position(|c| c.id == comment_id) else {
                return false;
            };
            if !post.comments[index].author.is_local() {
                log::warn!("Refusing to delete comment {} by another author", comment_id);
                return false;
            }
            post.comments.remove(index);
            true
        })
        .await
        .unwrap_or(false)
    }
}
