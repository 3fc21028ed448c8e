use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::CasefeedError;
use crate::models::feed::DEFAULT_PAGE_SIZE;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Seed dataset to use instead of the bundled one.
    pub seed_path: Option<PathBuf>,
    /// Storage file, defaults to `storage.json` in the cache directory.
    pub storage_path: Option<PathBuf>,
    pub page_size: usize,
    /// Seed only this many posts on a fresh start.
    pub initial_limit: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            seed_path: None,
            storage_path: None,
            page_size: DEFAULT_PAGE_SIZE,
            initial_limit: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf, CasefeedError> {
        Ok(dirs::home_dir()
            .ok_or_else(|| CasefeedError::Config("Could not find home directory".to_string()))?
            .join(".config/casefeed/config.json"))
    }

    /// Load `~/.config/casefeed/config.json`, or defaults when it does not exist.
    pub fn load() -> Result<Self, CasefeedError> {
        Self::load_from(Self::default_path()?)
    }

    pub fn load_from(config_path: PathBuf) -> Result<Self, CasefeedError> {
        let file = match File::open(&config_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                log::debug!("No config at {:?}, using defaults", config_path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(anyhow::Error::from(e)
                    .context(format!("Failed to open config file at {:?}", config_path))
                    .into())
            }
        };

        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse config JSON at {:?}", config_path))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(br#"{"page_size": 5, "seed_path": "/tmp/cases.json"}"#).unwrap();
        file.flush().unwrap();

        let config = Config::load_from(file.path().to_path_buf()).unwrap();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.seed_path, Some(PathBuf::from("/tmp/cases.json")));
        assert_eq!(config.storage_path, None);
    }

    #[test]
    fn test_malformed_file_is_a_config_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"page_size = 5").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            Config::load_from(file.path().to_path_buf()),
            Err(CasefeedError::Config(_))
        ));
    }
}
