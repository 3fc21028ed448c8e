use crate::models::{Engagement, Post};
use crate::views::widgets::StatefulList;

/// Title of the feed block when nothing is in flight.
pub const FEED_TITLE: &str = "Cases";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ModalState {
    #[default]
    Closed,
    Open,
}

impl ModalState {
    pub fn is_open(self) -> bool {
        self == ModalState::Open
    }
}

/// Everything the terminal UI draws from.
pub struct UiState {
    pub feed: StatefulList<Post>,
    pub detail: ModalState,
    pub comments: ModalState,
    /// Post the modals are showing.
    pub active_post: Option<String>,
    pub engagement: Option<Engagement>,
    pub comment_input: String,
    pub comment_selected: Option<usize>,
    pub full_description: bool,
    pub full_assessment: bool,
    pub status: String,
}

impl UiState {
    pub fn new(posts: Vec<Post>) -> Self {
        Self {
            feed: StatefulList::with_items(posts),
            detail: ModalState::Closed,
            comments: ModalState::Closed,
            active_post: None,
            engagement: None,
            comment_input: String::new(),
            comment_selected: None,
            full_description: false,
            full_assessment: false,
            status: FEED_TITLE.to_string(),
        }
    }

    pub fn active_post(&self) -> Option<&Post> {
        let id = self.active_post.as_deref()?;
        self.feed.items.iter().find(|p| p.id == id)
    }

    /// Id of the post the modals show, or of the highlighted one in the feed.
    pub fn target_post_id(&self) -> Option<String> {
        self.active_post
            .clone()
            .or_else(|| self.feed.selected().map(|p| p.id.clone()))
    }

    pub fn selected_comment_id(&self) -> Option<String> {
        let post = self.active_post()?;
        let index = self.comment_selected?;
        post.comments.get(index).map(|c| c.id.clone())
    }

    pub fn select_next_comment(&mut self) {
        let count = self.active_post().map(|p| p.comments.len()).unwrap_or(0);
        self.comment_selected = match (self.comment_selected, count) {
            (_, 0) => None,
            (None, _) => Some(0),
            (Some(i), n) => Some((i + 1) % n),
        };
    }

    pub fn clamp_comment_selection(&mut self) {
        let count = self.active_post().map(|p| p.comments.len()).unwrap_or(0);
        self.comment_selected = match self.comment_selected {
            Some(_) if count == 0 => None,
            Some(i) => Some(i.min(count - 1)),
            None => None,
        };
    }
}
