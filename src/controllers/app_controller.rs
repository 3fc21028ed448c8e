use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::Terminal;

use crate::error::CasefeedError;
use crate::models::FeedStore;
use crate::views::state::{ModalState, UiState, FEED_TITLE};
use crate::views::tui;

const JUMP: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    Continue,
    Quit,
}

pub async fn start_app(feed: FeedStore) -> Result<(), CasefeedError> {
    // Setup terminal
    let mut terminal = tui::setup_terminal()
        .map_err(|e| CasefeedError::Terminal(e.to_string()))?;

    let mut ui = UiState::new(feed.posts().await);

    // Run the app
    let res = run_app(&mut terminal, &mut ui, &feed).await;

    // Restore terminal
    tui::restore_terminal(&mut terminal)
        .map_err(|e| CasefeedError::Terminal(e.to_string()))?;

    res
}

pub async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    ui: &mut UiState,
    feed: &FeedStore,
) -> Result<(), CasefeedError> {
    loop {
        terminal.draw(|f| tui::render_ui(f, ui))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if wants_more(ui, feed, &key).await {
                ui.status = String::from("Loading...");
                terminal.draw(|f| tui::render_ui(f, ui))?;
            }
            if handle_key(ui, feed, key).await == Action::Quit {
                return Ok(());
            }
            ui.status = String::from(FEED_TITLE);
        }
    }
}

// The key will page in more posts, so the footer should say so first.
async fn wants_more(ui: &UiState, feed: &FeedStore, key: &KeyEvent) -> bool {
    !ui.detail.is_open()
        && !ui.comments.is_open()
        && matches!(key.code, KeyCode::Down | KeyCode::Char('j') | KeyCode::PageDown)
        && ui.feed.is_at_end()
        && feed.has_more().await
}

/// Apply one key press to the UI state, calling into the feed for anything
/// that changes a post.
pub async fn handle_key(ui: &mut UiState, feed: &FeedStore, key: KeyEvent) -> Action {
    if ui.comments.is_open() {
        handle_comments_key(ui, feed, key).await;
        return Action::Continue;
    }
    if ui.detail.is_open() {
        handle_detail_key(ui, feed, key).await;
        return Action::Continue;
    }

    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Down | KeyCode::Char('j') => {
            if ui.feed.is_at_end() {
                load_more(ui, feed).await;
            }
            ui.feed.next();
        }
        KeyCode::Up | KeyCode::Char('k') => ui.feed.previous(),
        KeyCode::Char('g') | KeyCode::Home => ui.feed.first(),
        KeyCode::Char('G') | KeyCode::End => ui.feed.last(),
        KeyCode::PageUp => ui.feed.jump_up(JUMP),
        KeyCode::PageDown => {
            if ui.feed.is_at_end() {
                load_more(ui, feed).await;
            }
            ui.feed.jump_down(JUMP);
        }
        KeyCode::Enter => {
            if let Some(id) = ui.feed.selected().map(|p| p.id.clone()) {
                open_post(ui, feed, id).await;
                ui.detail = ModalState::Open;
            }
        }
        KeyCode::Char('c') => {
            if let Some(id) = ui.feed.selected().map(|p| p.id.clone()) {
                open_post(ui, feed, id).await;
                ui.comments = ModalState::Open;
            }
        }
        KeyCode::Char('h') => toggle_hug(ui, feed).await,
        KeyCode::Char('b') => toggle_bookmark(ui, feed).await,
        _ => {}
    }
    Action::Continue
}

async fn handle_detail_key(ui: &mut UiState, feed: &FeedStore, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => {
            ui.detail = ModalState::Closed;
            release_post(ui);
        }
        KeyCode::Char('h') => toggle_hug(ui, feed).await,
        KeyCode::Char('b') => toggle_bookmark(ui, feed).await,
        KeyCode::Char('c') => ui.comments = ModalState::Open,
        KeyCode::Char('d') => ui.full_description = !ui.full_description,
        KeyCode::Char('a') => ui.full_assessment = !ui.full_assessment,
        _ => {}
    }
}

async fn handle_comments_key(ui: &mut UiState, feed: &FeedStore, key: KeyEvent) {
    let delete = key.code == KeyCode::Delete
        || (key.code == KeyCode::Char('d') && key.modifiers.contains(KeyModifiers::CONTROL));
    if delete {
        delete_selected_comment(ui, feed).await;
        return;
    }

    match key.code {
        KeyCode::Esc => {
            ui.comments = ModalState::Closed;
            release_post(ui);
        }
        KeyCode::Enter => {
            let Some(id) = ui.active_post.clone() else {
                return;
            };
            if feed.add_comment(&id, &ui.comment_input).await.is_some() {
                ui.comment_input.clear();
                refresh(ui, feed).await;
            }
        }
        KeyCode::Tab => ui.select_next_comment(),
        KeyCode::Backspace => {
            ui.comment_input.pop();
        }
        KeyCode::Char(c) => ui.comment_input.push(c),
        _ => {}
    }
}

async fn delete_selected_comment(ui: &mut UiState, feed: &FeedStore) {
    let (Some(post_id), Some(comment_id)) = (ui.active_post.clone(), ui.selected_comment_id()) else {
        return;
    };
    // Only comments written on this device offer a delete action.
    let is_local = ui
        .active_post()
        .and_then(|p| p.find_comment(&comment_id))
        .map(|c| c.author.is_local())
        .unwrap_or(false);
    if !is_local {
        return;
    }
    if feed.delete_comment(&post_id, &comment_id).await {
        refresh(ui, feed).await;
        ui.clamp_comment_selection();
    }
}

async fn load_more(ui: &mut UiState, feed: &FeedStore) {
    if feed.load_more().await > 0 {
        refresh(ui, feed).await;
    }
}

async fn open_post(ui: &mut UiState, feed: &FeedStore, id: String) {
    ui.engagement = feed.load_saved_state(&id).await;
    ui.active_post = Some(id);
    ui.full_description = false;
    ui.full_assessment = false;
    ui.comment_selected = None;
}

// Forget the active post once neither modal shows it.
fn release_post(ui: &mut UiState) {
    if !ui.detail.is_open() && !ui.comments.is_open() {
        ui.active_post = None;
        ui.engagement = None;
        ui.comment_input.clear();
        ui.comment_selected = None;
    }
}

async fn toggle_hug(ui: &mut UiState, feed: &FeedStore) {
    let Some(id) = ui.target_post_id() else {
        return;
    };
    if feed.toggle_hug(&id).await.is_some() {
        sync_engagement(ui, feed, &id).await;
        refresh(ui, feed).await;
    }
}

async fn toggle_bookmark(ui: &mut UiState, feed: &FeedStore) {
    let Some(id) = ui.target_post_id() else {
        return;
    };
    if feed.toggle_bookmark(&id).await.is_some() {
        sync_engagement(ui, feed, &id).await;
    }
}

async fn sync_engagement(ui: &mut UiState, feed: &FeedStore, id: &str) {
    if ui.active_post.as_deref() == Some(id) {
        ui.engagement = feed.engagement(id).await;
    }
}

async fn refresh(ui: &mut UiState, feed: &FeedStore) {
    ui.feed.replace_items(feed.posts().await);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::models::{MemoryStore, SeedDataset};

    async fn setup(records: usize) -> (FeedStore, UiState) {
        let json = (0..records)
            .map(|i| format!(r#"{{"title":"[2{}F] case","num_hugs":1}}"#, i % 10))
            .collect::<Vec<_>>()
            .join(",");
        let feed = FeedStore::new(
            Arc::new(MemoryStore::new()),
            SeedDataset::from_json(&format!("[{}]", json)).unwrap(),
        )
        .with_initial_limit(Some(2))
        .with_page_size(2);
        feed.load().await;
        let ui = UiState::new(feed.posts().await);
        (feed, ui)
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    async fn type_text(ui: &mut UiState, feed: &FeedStore, text: &str) {
        for c in text.chars() {
            handle_key(ui, feed, press(KeyCode::Char(c))).await;
        }
    }

    #[tokio::test]
    async fn test_detail_opens_and_closes() {
        let (feed, mut ui) = setup(2).await;
        handle_key(&mut ui, &feed, press(KeyCode::Enter)).await;
        assert_eq!(ui.detail, ModalState::Open);
        assert_eq!(ui.active_post.as_deref(), Some("fallback-id-0"));
        assert!(ui.engagement.is_some());

        assert_eq!(handle_key(&mut ui, &feed, press(KeyCode::Esc)).await, Action::Continue);
        assert_eq!(ui.detail, ModalState::Closed);
        assert!(ui.active_post.is_none());

        assert_eq!(handle_key(&mut ui, &feed, press(KeyCode::Esc)).await, Action::Quit);
    }

    #[tokio::test]
    async fn test_comments_modal_is_independent_of_detail() {
        let (feed, mut ui) = setup(2).await;
        handle_key(&mut ui, &feed, press(KeyCode::Enter)).await;
        handle_key(&mut ui, &feed, press(KeyCode::Char('c'))).await;
        assert!(ui.detail.is_open());
        assert!(ui.comments.is_open());

        handle_key(&mut ui, &feed, press(KeyCode::Esc)).await;
        assert!(!ui.comments.is_open());
        assert!(ui.detail.is_open());
        assert!(ui.active_post.is_some());
    }

    #[tokio::test]
    async fn test_hug_from_detail_updates_count_and_flag() {
        let (feed, mut ui) = setup(2).await;
        handle_key(&mut ui, &feed, press(KeyCode::Enter)).await;
        handle_key(&mut ui, &feed, press(KeyCode::Char('h'))).await;

        assert_eq!(ui.active_post().unwrap().hug_count, 2);
        assert!(ui.engagement.as_ref().unwrap().hugged);
        assert_eq!(feed.post("fallback-id-0").await.unwrap().hug_count, 2);
    }

    #[tokio::test]
    async fn test_post_and_delete_comment() {
        let (feed, mut ui) = setup(2).await;
        handle_key(&mut ui, &feed, press(KeyCode::Char('c'))).await;
        type_text(&mut ui, &feed, "feel better").await;
        handle_key(&mut ui, &feed, press(KeyCode::Enter)).await;

        assert!(ui.comment_input.is_empty());
        assert_eq!(ui.active_post().unwrap().comments.len(), 1);
        assert_eq!(ui.active_post().unwrap().comments[0].text, "feel better");

        handle_key(&mut ui, &feed, press(KeyCode::Tab)).await;
        handle_key(&mut ui, &feed, press(KeyCode::Delete)).await;
        assert!(ui.active_post().unwrap().comments.is_empty());
        assert_eq!(ui.comment_selected, None);
    }

    #[tokio::test]
    async fn test_blank_comment_keeps_input_state() {
        let (feed, mut ui) = setup(1).await;
        handle_key(&mut ui, &feed, press(KeyCode::Char('c'))).await;
        type_text(&mut ui, &feed, "  ").await;
        handle_key(&mut ui, &feed, press(KeyCode::Enter)).await;
        assert!(ui.active_post().unwrap().comments.is_empty());
    }

    #[tokio::test]
    async fn test_loading_footer_only_when_more_posts_remain() {
        let (feed, mut ui) = setup(3).await;
        let down = press(KeyCode::Down);
        assert!(!wants_more(&ui, &feed, &down).await);

        ui.feed.last();
        assert!(wants_more(&ui, &feed, &down).await);
        assert!(!wants_more(&ui, &feed, &press(KeyCode::Up)).await);

        handle_key(&mut ui, &feed, down).await;
        ui.feed.last();
        assert!(!feed.has_more().await);
        assert!(!wants_more(&ui, &feed, &down).await);
    }

    #[tokio::test]
    async fn test_scrolling_past_end_loads_next_page() {
        let (feed, mut ui) = setup(5).await;
        assert_eq!(ui.feed.items.len(), 2);

        handle_key(&mut ui, &feed, press(KeyCode::Down)).await;
        handle_key(&mut ui, &feed, press(KeyCode::Down)).await;
        assert_eq!(ui.feed.items.len(), 4);
        assert_eq!(ui.feed.state.selected(), Some(2));

        handle_key(&mut ui, &feed, press(KeyCode::Char('G'))).await;
        handle_key(&mut ui, &feed, press(KeyCode::Down)).await;
        handle_key(&mut ui, &feed, press(KeyCode::Char('G'))).await;
        handle_key(&mut ui, &feed, press(KeyCode::Down)).await;
        assert_eq!(ui.feed.items.len(), 5);
        assert_eq!(ui.feed.state.selected(), Some(4));
    }
}
