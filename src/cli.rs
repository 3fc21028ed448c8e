use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::models::Config;

#[derive(Copy, Clone, PartialEq, Eq, Debug, ValueEnum)]
pub enum Command {
    /// Browse the feed interactively (default)
    Browse,
    /// Print the feed
    List,
    /// Print one post with its comments
    Show,
    /// Forget the stored feed so the next start reseeds it
    Reset,
}

#[derive(Parser, Debug, Default)]
#[command(about = concat!(env!("CARGO_CRATE_NAME"), " - browse and respond to case posts"))]
pub struct Flags {
    pub command: Option<Command>,

    /// Post id for `show`
    pub post_id: Option<String>,

    /// Seed dataset (JSON array of posts) to use instead of the bundled one
    #[arg(long)]
    pub seed: Option<PathBuf>,

    /// Storage file to read and write
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Posts appended per page when scrolling past the end
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Seed only this many posts on a fresh start
    #[arg(long)]
    pub initial: Option<usize>,

    /// Keep everything in memory; nothing is written to disk
    #[arg(long)]
    pub ephemeral: bool,
}

impl Flags {
    /// Parse from `std::env::args_os()`, [exit][clap::Error::exit] on error.
    pub fn from_args() -> Self {
        Self::parse()
    }

    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Browse)
    }

    /// Command-line values take precedence over the config file.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(seed) = &self.seed {
            config.seed_path = Some(seed.clone());
        }
        if let Some(storage) = &self.storage {
            config.storage_path = Some(storage.clone());
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if self.initial.is_some() {
            config.initial_limit = self.initial;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_browse() {
        let flags = Flags::parse_from(["casefeed"]);
        assert_eq!(flags.command(), Command::Browse);
    }

    #[test]
    fn test_show_takes_post_id() {
        let flags = Flags::parse_from(["casefeed", "show", "case-1000"]);
        assert_eq!(flags.command(), Command::Show);
        assert_eq!(flags.post_id.as_deref(), Some("case-1000"));
    }

    #[test]
    fn test_flags_override_config() {
        let flags = Flags::parse_from(["casefeed", "list", "--page-size", "3", "--initial", "4"]);
        let mut config = Config::default();
        flags.apply_to(&mut config);
        assert_eq!(config.page_size, 3);
        assert_eq!(config.initial_limit, Some(4));
        assert_eq!(config.seed_path, None);
    }
}
