use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use chrono::Utc;

use super::format::{clamp_position, clamp_rate};
use crate::identity::{ContentIdentity, identify_file};
use crate::store::{DisplayMode, LoadError, PlaybackRecord, StateStore};

const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "webm", "avi", "mov", "m4v", "mpg", "mpeg", "ts", "ogv", "wmv", "flv", "3gp",
];

pub(crate) fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            let lowered = ext.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&lowered.as_str())
        })
}

/// Display name, original style: file name minus the extension.
pub(crate) fn file_title(path: &Path) -> String {
    path.file_stem()
        .or_else(|| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

struct CurrentFile {
    identity: ContentIdentity,
    title: String,
    path: PathBuf,
    display_mode: DisplayMode,
}

/// One playback session: the file currently open and its content identity.
///
/// `open` is the only way identity enters the session, and it runs the whole
/// validate → digest → load sequence to completion on `&mut self`, so a save
/// for an old file can never race a load for a new one.
pub(crate) struct PlayerSession<'a> {
    store: &'a StateStore,
    current: Option<CurrentFile>,
}

impl<'a> PlayerSession<'a> {
    pub(crate) fn new(store: &'a StateStore) -> Self {
        Self {
            store,
            current: None,
        }
    }

    /// Opens a file and returns its saved state, if any. A record that fails
    /// to parse counts as absent and is deleted so it cannot linger.
    pub(crate) fn open(&mut self, path: &Path) -> Result<Option<PlaybackRecord>> {
        if !is_video_file(path) {
            bail!("{} does not look like a video file", path.display());
        }

        // The identity must be known before the store is touched for this file.
        let identity = identify_file(path)?;
        let restored = match self.store.load(&identity) {
            Ok(record) => Some(record),
            Err(LoadError::NotFound) => None,
            Err(LoadError::Corrupt(err)) => {
                eprintln!(
                    "Warning: discarding unreadable saved state for {}: {err}",
                    path.display()
                );
                if let Err(err) = self.store.delete(&identity) {
                    eprintln!("Warning: could not discard saved state: {err}");
                }
                None
            }
            Err(err @ LoadError::Backend(_)) => {
                eprintln!("Warning: could not read saved state: {err}");
                None
            }
        };

        self.current = Some(CurrentFile {
            identity,
            title: file_title(path),
            path: path.to_path_buf(),
            display_mode: restored
                .as_ref()
                .map(|record| record.display_mode)
                .unwrap_or_default(),
        });
        Ok(restored)
    }

    #[cfg(test)]
    pub(crate) fn identity(&self) -> Option<&ContentIdentity> {
        self.current.as_ref().map(|current| &current.identity)
    }

    pub(crate) fn title(&self) -> Option<&str> {
        self.current.as_ref().map(|current| current.title.as_str())
    }

    /// Saves the transport state of the open file under its identity.
    pub(crate) fn record_progress(&self, position_seconds: f64, playback_rate: f64) -> Result<()> {
        let Some(current) = self.current.as_ref() else {
            bail!("no video is open");
        };
        let record = PlaybackRecord {
            position_seconds: clamp_position(position_seconds),
            playback_rate: clamp_rate(playback_rate),
            last_opened_at_ms: Utc::now().timestamp_millis(),
            display_mode: current.display_mode,
            title: Some(current.title.clone()),
            path: Some(current.path.clone()),
        };
        self.store.save(&current.identity, &record)
    }

    /// Playback reached natural end: the saved position is cleared.
    pub(crate) fn finished(&self) -> Result<bool> {
        let Some(current) = self.current.as_ref() else {
            bail!("no video is open");
        };
        self.store.delete(&current.identity)
    }
}
