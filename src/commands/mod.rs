pub mod manage;
pub mod process;
pub mod publish;
pub mod search;

use anyhow::{Context, Result};
use std::path::Path;

use newsloom::config::Config;
use newsloom::storage::{AppState, StateStore};

pub use manage::{AccountsCommand, ArchiveCommand, DomainsCommand, KeysCommand, QueueCommand};
pub use process::process;
pub use publish::{publish, publish_now};
pub use search::search;

/// Loaded state plus the store it came from
pub struct Workspace {
    pub config: Config,
    pub store: StateStore,
    pub state: AppState,
}

impl Workspace {
    pub fn open(config: Config) -> Result<Self> {
        let store = StateStore::new(&config.storage.data_dir, config.storage.archive_limit);
        let state = store
            .load()
            .with_context(|| format!("Failed to load state from {}", store.path().display()))?;
        Ok(Self {
            config,
            store,
            state,
        })
    }

    pub fn save(&mut self) -> Result<()> {
        self.store
            .save(&mut self.state)
            .with_context(|| format!("Failed to save state to {}", self.store.path().display()))
    }
}

/// One URL per line; blank lines and `#` comments are skipped
pub fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read URL file: {}", path.display()))?;
    Ok(parse_url_list(&content))
}

fn parse_url_list(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub fn truncate_url(url: &str, max_len: usize) -> String {
    if url.chars().count() <= max_len {
        url.to_string()
    } else {
        let head: String = url.chars().take(max_len.saturating_sub(3)).collect();
        format!("{head}...")
    }
}
