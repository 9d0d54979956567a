//! Completed-chunk ledger for resumable acquisition
//!
//! Without a ledger, re-running an acquisition re-merges every chunk and
//! doubles the accumulator's counts for chunks that already succeeded. The
//! ledger records which chunk indices have been merged, keyed to a
//! fingerprint of the sorted company list and chunk size, so a restarted run
//! can skip them. A fingerprint mismatch means the input changed since the
//! ledger was written and the ledger is discarded.

use std::collections::HashSet;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Ledger file name, placed next to the accumulator.
pub const LEDGER_SUFFIX: &str = ".ledger.json";

/// Current ledger format version - bump when making breaking changes.
pub const LEDGER_VERSION: u32 = 1;

/// Persistent record of which acquisition chunks have been merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkLedger {
    /// Ledger format version for compatibility checking.
    pub version: u32,

    /// UTC timestamp when the ledger was created.
    pub created_at: DateTime<Utc>,

    /// Fingerprint of (sorted company list, chunk size) the ledger belongs to.
    pub fingerprint: u64,

    /// Chunk indices whose tallies are already in the accumulator.
    pub completed_chunks: HashSet<usize>,
}

impl ChunkLedger {
    pub fn new(fingerprint: u64) -> Self {
        Self {
            version: LEDGER_VERSION,
            created_at: Utc::now(),
            fingerprint,
            completed_chunks: HashSet::new(),
        }
    }

    /// Path of the ledger that belongs to a given accumulator file.
    pub fn path_for(accumulator_path: &Path) -> PathBuf {
        let mut name = accumulator_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "accumulator".to_string());
        name.push_str(LEDGER_SUFFIX);
        accumulator_path.with_file_name(name)
    }

    /// Load the ledger for this run, or start a fresh one.
    ///
    /// A missing file, an incompatible version, or a fingerprint that does
    /// not match the current input all yield a fresh ledger.
    pub fn load_or_new(path: &Path, fingerprint: u64) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new(fingerprint));
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read chunk ledger: {}", path.display()))?;
        let ledger: ChunkLedger = match serde_json::from_str(&content) {
            Ok(l) => l,
            Err(e) => {
                warn!("Discarding unreadable chunk ledger {}: {}", path.display(), e);
                return Ok(Self::new(fingerprint));
            }
        };

        if ledger.version != LEDGER_VERSION {
            warn!(
                "Discarding chunk ledger with version {} (expected {})",
                ledger.version, LEDGER_VERSION
            );
            return Ok(Self::new(fingerprint));
        }

        if ledger.fingerprint != fingerprint {
            warn!("Chunk ledger is for a different company list or chunk size, starting fresh");
            return Ok(Self::new(fingerprint));
        }

        debug!(
            "Resuming from chunk ledger: {} chunks already completed",
            ledger.completed_chunks.len()
        );
        Ok(ledger)
    }

    /// Persist the ledger.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create ledger directory: {}", parent.display())
                })?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize chunk ledger")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write chunk ledger: {}", path.display()))?;
        Ok(())
    }

    pub fn is_completed(&self, chunk_index: usize) -> bool {
        self.completed_chunks.contains(&chunk_index)
    }

    pub fn mark_completed(&mut self, chunk_index: usize) {
        self.completed_chunks.insert(chunk_index);
    }

    /// Remove the ledger file once a run has fully completed.
    pub fn delete(path: &Path) -> Result<()> {
        if path.exists() {
            std::fs::remove_file(path)
                .with_context(|| format!("Failed to delete chunk ledger: {}", path.display()))?;
        }
        Ok(())
    }
}

/// Fingerprint of the acquisition input: the sorted company list plus the
/// chunk size. Chunk boundaries are a pure function of these two.
pub fn input_fingerprint(sorted_companies: &[String], chunk_size: usize) -> u64 {
    let mut hasher = DefaultHasher::new();
    chunk_size.hash(&mut hasher);
    for company in sorted_companies {
        company.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn companies() -> Vec<String> {
        vec!["Acme".to_string(), "Beta".to_string(), "Gamma".to_string()]
    }

    #[test]
    fn test_fresh_ledger_when_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv.ledger.json");
        let ledger = ChunkLedger::load_or_new(&path, 42).unwrap();
        assert_eq!(ledger.version, LEDGER_VERSION);
        assert!(ledger.completed_chunks.is_empty());
    }

    #[test]
    fn test_save_and_resume() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv.ledger.json");
        let fp = input_fingerprint(&companies(), 2);

        let mut ledger = ChunkLedger::load_or_new(&path, fp).unwrap();
        ledger.mark_completed(0);
        ledger.mark_completed(1);
        ledger.save(&path).unwrap();

        let resumed = ChunkLedger::load_or_new(&path, fp).unwrap();
        assert!(resumed.is_completed(0));
        assert!(resumed.is_completed(1));
        assert!(!resumed.is_completed(2));
    }

    #[test]
    fn test_fingerprint_mismatch_discards_ledger() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv.ledger.json");
        let fp = input_fingerprint(&companies(), 2);

        let mut ledger = ChunkLedger::load_or_new(&path, fp).unwrap();
        ledger.mark_completed(0);
        ledger.save(&path).unwrap();

        // Different chunk size shifts every chunk boundary
        let other_fp = input_fingerprint(&companies(), 3);
        assert_ne!(fp, other_fp);
        let fresh = ChunkLedger::load_or_new(&path, other_fp).unwrap();
        assert!(fresh.completed_chunks.is_empty());
    }

    #[test]
    fn test_corrupt_ledger_discarded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv.ledger.json");
        std::fs::write(&path, "{not json").unwrap();

        let ledger = ChunkLedger::load_or_new(&path, 7).unwrap();
        assert!(ledger.completed_chunks.is_empty());
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv.ledger.json");
        ChunkLedger::new(1).save(&path).unwrap();
        assert!(path.exists());
        ChunkLedger::delete(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_ledger_path_beside_accumulator() {
        let p = ChunkLedger::path_for(Path::new("data/scraped/hits.csv"));
        assert_eq!(p, PathBuf::from("data/scraped/hits.csv.ledger.json"));
    }
}
