//! Durable record of already-announced items.
//!
//! Every item that reaches the dispatch queue is first recorded here under
//! its [`Fingerprint`]. The set is loaded once at startup and rewritten in
//! full after each completed feed cycle, so an item marked in a finished
//! cycle is never announced again, including after a restart.
//!
//! The set only grows. Nothing prunes old fingerprints.
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Failed to read ledger '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write ledger '{path}': {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Identity of one announceable event: `{source}::{sha256 hex}`.
///
/// The digest covers title, link and the RFC 3339 publish time (empty when
/// absent), so a re-edited title or a moved link counts as a new item. Keys
/// hashed from a raw feed date string never match these.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(source: &str, title: &str, link: &str, published: Option<DateTime<Utc>>) -> Self {
        let published = published.map(|p| p.to_rfc3339()).unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(title.as_bytes());
        hasher.update(link.as_bytes());
        hasher.update(published.as_bytes());

        Self(format!("{}::{:x}", source, hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// In-memory fingerprint set with its backing file.
#[derive(Debug)]
pub struct DedupLedger {
    path: PathBuf,
    seen: HashSet<String>,
    dirty: bool,
}

impl DedupLedger {
    /// Empty ledger that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            seen: HashSet::new(),
            dirty: false,
        }
    }

    /// Loads the newline-delimited ledger file.
    ///
    /// A missing file is an empty ledger. Blank lines are ignored. Any other
    /// read failure is returned, since starting without the ledger would
    /// re-announce everything still inside the freshness window.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "No ledger file yet, starting empty");
                return Ok(Self::new(path));
            }
            Err(source) => return Err(LedgerError::Read { path, source }),
        };

        let seen: HashSet<String> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();

        tracing::info!(path = %path.display(), entries = seen.len(), "Loaded dedup ledger");
        Ok(Self {
            path,
            seen,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_new(&self, fingerprint: &Fingerprint) -> bool {
        !self.seen.contains(fingerprint.as_str())
    }

    pub fn mark_seen(&mut self, fingerprint: Fingerprint) {
        if self.seen.insert(fingerprint.0) {
            self.dirty = true;
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Rewrites the backing file with the full set.
    ///
    /// Writes to a uniquely named sibling temp file, syncs it and renames it
    /// over the ledger, so a crash leaves either the old or the new file.
    /// A no-op when nothing was marked since the last persist.
    pub fn persist(&mut self) -> Result<(), LedgerError> {
        if !self.dirty {
            return Ok(());
        }

        let mut lines: Vec<&str> = self.seen.iter().map(String::as_str).collect();
        lines.sort_unstable();
        let mut content = lines.join("\n");
        content.push('\n');

        write_atomic(&self.path, content.as_bytes()).map_err(|source| LedgerError::Write {
            path: self.path.clone(),
            source,
        })?;

        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.seen.len(), "Persisted dedup ledger");
        Ok(())
    }
}

fn write_atomic(dst: &Path, content: &[u8]) -> std::io::Result<()> {
    use std::time::{SystemTime, UNIX_EPOCH};

    let suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = dst.with_extension(format!("tmp.{:016x}", suffix));

    let result = (|| {
        let mut temp_file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&temp_path)?;
        temp_file.write_all(content)?;
        temp_file.sync_all()?;
        drop(temp_file);

        #[cfg(windows)]
        if dst.exists() {
            std::fs::remove_file(dst)?;
        }

        std::fs::rename(&temp_path, dst)
    })();

    if result.is_err() {
        let _ = std::fs::remove_file(&temp_path);
    }
    result
}
