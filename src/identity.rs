use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha1::{Digest, Sha1};

/// Content-derived identity of a video file: the hex SHA-1 of its full byte
/// content. Renaming or copying a file keeps its saved playback state, since
/// the key never depends on the name or path. Used purely as a lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentIdentity(String);

impl ContentIdentity {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Keys in the backend were written by us, so they are digests already.
    pub(crate) fn from_stored_key(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for ContentIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Digests the whole file without loading it into memory.
pub fn identify_file(path: &Path) -> Result<ContentIdentity> {
    let mut file =
        File::open(path).with_context(|| format!("could not open file {}", path.display()))?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("could not read file {}", path.display()))?;
    Ok(ContentIdentity(format!("{:x}", hasher.finalize())))
}

#[cfg(test)]
pub(crate) fn identify_bytes(bytes: &[u8]) -> ContentIdentity {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    ContentIdentity(format!("{:x}", hasher.finalize()))
}
