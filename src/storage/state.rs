//! Snapshot persistence for application state
//!
//! The whole state is one pretty-printed JSON document. Saves go to a
//! temporary file first and are renamed into place.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use super::archive::ArchiveStore;
use super::queue::PublishQueue;
use crate::models::SocialAccount;
use crate::scheduler::rotation::KeyPool;
use crate::utils::error::StateError;

const STATE_FILE: &str = "state.json";

/// Everything newsloom keeps between runs
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppState {
    pub archive: ArchiveStore,
    pub keys: KeyPool,
    pub queue: PublishQueue,
    pub accounts: Vec<SocialAccount>,
    pub excluded_domains: Vec<String>,
}

/// Loads and saves [`AppState`] under a data directory
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    archive_limit: usize,
}

impl StateStore {
    pub fn new(data_dir: &Path, archive_limit: usize) -> Self {
        Self {
            path: data_dir.join(STATE_FILE),
            archive_limit,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load state; a missing file yields the default state.
    pub fn load(&self) -> Result<AppState, StateError> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No state file, starting fresh");
            return Ok(AppState::default());
        }

        let file = File::open(&self.path).map_err(|source| self.io_err(source))?;
        let state: AppState =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| StateError::Serde {
                path: self.path.display().to_string(),
                source,
            })?;

        tracing::debug!(
            path = %self.path.display(),
            archived = state.archive.len(),
            queued = state.queue.len(),
            "State loaded"
        );
        Ok(state)
    }

    /// Save state, keeping only the newest archive entries.
    pub fn save(&self, state: &mut AppState) -> Result<(), StateError> {
        state.archive.truncate_to_latest(self.archive_limit);

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|source| self.io_err(source))?;
        }

        // Write to temp file first, then rename
        let temp_path = self.path.with_extension("json.tmp");
        let written = File::create(&temp_path)
            .and_then(|file| write_pretty(file, state))
            .and_then(|file| file.sync_all());
        if let Err(source) = written {
            // A partial temp file must never replace the current state
            let _ = fs::remove_file(&temp_path);
            return Err(StateError::Io {
                path: temp_path.display().to_string(),
                source,
            });
        }

        fs::rename(&temp_path, &self.path).map_err(|source| self.io_err(source))?;

        tracing::debug!(path = %self.path.display(), "State saved");
        Ok(())
    }

    fn io_err(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

/// Pretty JSON through a buffer that is flushed explicitly, so write
/// errors are reported instead of lost on drop
fn write_pretty<W: Write>(inner: W, state: &AppState) -> io::Result<W> {
    let mut writer = BufWriter::new(inner);
    serde_json::to_writer_pretty(&mut writer, state)?;
    writer.flush()?;
    writer.into_inner().map_err(|e| e.into_error())
}
