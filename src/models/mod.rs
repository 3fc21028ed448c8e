pub mod post;
pub mod assessment;
pub mod seed;
pub mod storage;
pub mod engagement;
pub mod feed;
pub mod config;

// Re-export important structs for convenience
pub use post::{Author, Comment, Post};
pub use assessment::AssessmentBlock;
pub use seed::SeedDataset;
pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use engagement::Engagement;
pub use feed::FeedStore;
pub use config::Config;
