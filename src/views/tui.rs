use std::io;
use chrono::{DateTime, Local, Utc};
use ratatui::{
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    layout::{Layout, Constraint, Direction, Rect},
    style::{Style, Color, Modifier},
    Terminal, Frame,
    text::Line,
    prelude::Span,
};
use crossterm::{
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    execute,
    event::{DisableMouseCapture, EnableMouseCapture},
};

use crate::models::assessment::{collapsed, parse_assessment, AssessmentBlock};
use crate::models::Post;
use crate::views::state::UiState;

const PREVIEW_CHARS: usize = 150;
const DESCRIPTION_PREVIEW_CHARS: usize = 100;
const ASSESSMENT_PREVIEW_LINES: usize = 3;

pub fn setup_terminal() -> io::Result<Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    Terminal::new(backend)
}

pub fn restore_terminal(terminal: &mut Terminal<ratatui::backend::CrosstermBackend<io::Stdout>>) -> io::Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()
}

/// Cut `text` to `limit` characters, marking the cut with an ellipsis.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() > limit {
        let cut: String = text.chars().take(limit).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

pub fn format_datetime(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(utc_time) => {
            let local_time: DateTime<Local> = DateTime::from(utc_time);
            local_time.format("%H:%M %h-%d-%Y").to_string()
        }
        None => "unknown date".to_string(),
    }
}

pub fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{} {}", count, singular)
    } else {
        format!("{} {}", count, plural)
    }
}

pub fn render_ui<B: ratatui::backend::Backend>(
    f: &mut Frame<B>,
    ui: &mut UiState,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(3), Constraint::Length(1)].as_ref())
        .split(f.size());

    // Create the feed of posts
    let items: Vec<ListItem> = ui.feed.items
        .iter()
        .map(|post| {
            let header = Line::from(vec![
                Span::styled(
                    post.display_title(),
                    Style::default().add_modifier(Modifier::BOLD)
                )
            ]);
            let meta = Line::from(vec![
                Span::styled(
                    format!(
                        "{} | {}",
                        post.age_tag().unwrap_or("Unknown"),
                        format_datetime(post.created_at)
                    ),
                    Style::default().fg(Color::Cyan)
                )
            ]);
            let description = if post.description.is_empty() {
                "No description available".to_string()
            } else {
                truncate(&post.description, PREVIEW_CHARS)
            };
            let counts = Line::from(vec![
                Span::styled(
                    plural(post.hug_count as usize, "Hug", "Hugs"),
                    Style::default().fg(Color::Magenta)
                ),
                Span::raw("   "),
                Span::raw(plural(post.comments.len(), "Comment", "Comments")),
            ]);

            ListItem::new(vec![
                header,
                meta,
                Line::from(description),
                counts,
                Line::from(""), // Empty line for spacing between posts
            ])
            .style(Style::default())
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().title(ui.status.clone()).borders(Borders::ALL))
        .highlight_style(
            Style::default()
                .bg(Color::Gray)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        );

    f.render_stateful_widget(list, chunks[0], &mut ui.feed.state);

    let help = if ui.comments.is_open() {
        "type to compose  Enter post  Tab select  Del delete  Esc close"
    } else if ui.detail.is_open() {
        "h hug  b bookmark  c comments  d description  a assessment  Esc close"
    } else {
        "j/k move  Enter open  h hug  b bookmark  c comments  q quit"
    };
    f.render_widget(
        Paragraph::new(Line::from(Span::styled(help, Style::default().fg(Color::DarkGray)))),
        chunks[1],
    );

    if ui.detail.is_open() {
        if let Some(post) = ui.active_post() {
            render_detail(f, ui, post);
        }
    }
    if ui.comments.is_open() {
        if let Some(post) = ui.active_post() {
            render_comments(f, ui, post);
        }
    }
}

fn engagement_line(ui: &UiState, post: &Post) -> Line<'static> {
    let (hugged, bookmarked) = ui
        .engagement
        .as_ref()
        .map(|e| (e.hugged, e.bookmarked))
        .unwrap_or((false, false));
    Line::from(vec![
        Span::styled(
            format!(
                "{} {}",
                if hugged { "♥" } else { "♡" },
                plural(post.hug_count as usize, "Hug", "Hugs")
            ),
            Style::default().fg(Color::Magenta)
        ),
        Span::raw("   "),
        Span::raw(plural(post.comments.len(), "Comment", "Comments")),
        Span::raw("   "),
        Span::styled(
            if bookmarked { "Saved" } else { "Save" },
            Style::default().fg(Color::Blue)
        ),
    ])
}

fn render_detail<B: ratatui::backend::Backend>(f: &mut Frame<B>, ui: &UiState, post: &Post) {
    let area = centered_rect(80, 80, f.size());
    let heading = Style::default().add_modifier(Modifier::BOLD);

    let (description, assessment) = match &ui.engagement {
        Some(e) => (e.description.as_str(), e.assessment.as_str()),
        None => (post.description.as_str(), post.assessment.as_str()),
    };

    let mut lines = vec![
        Line::from(Span::styled(post.display_title(), heading.fg(Color::Cyan))),
        engagement_line(ui, post),
        Line::from(""),
        Line::from(Span::styled("Patient Description:", heading)),
    ];
    let description = if ui.full_description {
        description.to_string()
    } else {
        truncate(description, DESCRIPTION_PREVIEW_CHARS)
    };
    lines.extend(description.lines().map(|l| Line::from(l.to_string())));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Assessment:", heading)));

    let blocks = parse_assessment(assessment);
    let shown: Vec<&AssessmentBlock> = if ui.full_assessment {
        blocks.iter().collect()
    } else {
        collapsed(&blocks, ASSESSMENT_PREVIEW_LINES)
    };
    for block in shown {
        lines.push(match block {
            AssessmentBlock::Heading(text) => Line::from(Span::styled(text.clone(), heading)),
            AssessmentBlock::Body(text) => Line::from(text.clone()),
        });
    }
    if !ui.full_assessment && shown_is_partial(&blocks) {
        lines.push(Line::from(Span::styled("Show More (a)", Style::default().fg(Color::Blue))));
    }

    f.render_widget(Clear, area);
    f.render_widget(
        Paragraph::new(lines)
            .block(Block::default().title("Case").borders(Borders::ALL))
            .wrap(Wrap { trim: false }),
        area,
    );
}

fn shown_is_partial(blocks: &[AssessmentBlock]) -> bool {
    collapsed(blocks, ASSESSMENT_PREVIEW_LINES).len() < blocks.len()
}

fn render_comments<B: ratatui::backend::Backend>(f: &mut Frame<B>, ui: &UiState, post: &Post) {
    let area = centered_rect(70, 70, f.size());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(3)].as_ref())
        .split(area);

    let items: Vec<ListItem> = post.comments
        .iter()
        .enumerate()
        .map(|(i, comment)| {
            let mut name_style = Style::default().add_modifier(Modifier::BOLD);
            if comment.author.is_local() {
                name_style = name_style.fg(Color::Green);
            }
            let mut item = ListItem::new(vec![
                Line::from(Span::styled(comment.author.display_name().to_string(), name_style)),
                Line::from(comment.text.clone()),
                Line::from(Span::styled(
                    format_datetime(comment.created_at),
                    Style::default().fg(Color::DarkGray)
                )),
                Line::from(""),
            ]);
            if ui.comment_selected == Some(i) {
                item = item.style(Style::default().bg(Color::Gray).fg(Color::Black));
            }
            item
        })
        .collect();

    f.render_widget(Clear, area);
    f.render_widget(
        List::new(items).block(Block::default().title("Comments").borders(Borders::ALL)),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(ui.comment_input.as_str())
            .block(Block::default().title("Add a comment...").borders(Borders::ALL)),
        chunks[1],
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ]
            .as_ref(),
        )
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints(
            [
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ]
            .as_ref(),
        )
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo world", 5), "héllo...");
    }

    #[test]
    fn test_plural() {
        assert_eq!(plural(1, "Hug", "Hugs"), "1 Hug");
        assert_eq!(plural(0, "Hug", "Hugs"), "0 Hugs");
    }

    #[test]
    fn test_missing_timestamp() {
        assert_eq!(format_datetime(None), "unknown date");
    }
}
