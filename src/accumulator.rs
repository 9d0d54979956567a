//! Durable accumulator of scraped hit counts
//!
//! The one piece of state that outlives a single run. Each acquisition chunk
//! appends its per-name tally as new rows; the same company scraped in two
//! chunks (or two runs) therefore appears twice, and the dedup grouper sums
//! the duplicates downstream. The file is never rewritten in place other
//! than by a full-file replace after a merge, and its row count grows
//! monotonically within a run. A missing file is the empty state, not an
//! error - it just means no acquisition has run yet.
//!
//! Single writer assumed; the read-merge-write cycle is not atomic across
//! concurrent coordinators.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One accumulator row: a raw (or canonical) company name and its running
/// hit count.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HitRow {
    pub company: String,
    pub count: u64,
}

/// Append-only table of scraped hit counts backed by a CSV file.
#[derive(Debug)]
pub struct Accumulator {
    path: PathBuf,
    rows: Vec<HitRow>,
}

impl Accumulator {
    /// Load the accumulator from disk. A missing file yields an empty
    /// accumulator bound to the same path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No accumulator at {}, starting empty", path.display());
            return Ok(Self {
                path: path.to_path_buf(),
                rows: Vec::new(),
            });
        }

        let file = File::open(path)
            .with_context(|| format!("Failed to open accumulator: {}", path.display()))?;
        let mut reader = csv::Reader::from_reader(file);
        let mut rows = Vec::new();
        for record in reader.deserialize() {
            let row: HitRow = record
                .with_context(|| format!("Malformed accumulator row in {}", path.display()))?;
            rows.push(row);
        }

        debug!("Loaded {} accumulator rows from {}", rows.len(), path.display());
        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// Append one chunk's tally. Rows are concatenated, never summed here -
    /// summing is the grouper's job.
    pub fn merge_chunk(&mut self, tally: Vec<HitRow>) {
        self.rows.extend(tally);
    }

    /// Write the whole table back to disk, replacing the previous file.
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create accumulator directory: {}", parent.display())
                })?;
            }
        }

        let file = File::create(&self.path)
            .with_context(|| format!("Failed to write accumulator: {}", self.path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        debug!("Flushed {} accumulator rows to {}", self.rows.len(), self.path.display());
        Ok(())
    }

    pub fn rows(&self) -> &[HitRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(company: &str, count: u64) -> HitRow {
        HitRow {
            company: company.to_string(),
            count,
        }
    }

    #[test]
    fn test_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let acc = Accumulator::load(&dir.path().join("hits.csv")).unwrap();
        assert!(acc.is_empty());
    }

    #[test]
    fn test_merge_flush_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");

        let mut acc = Accumulator::load(&path).unwrap();
        acc.merge_chunk(vec![row("Acme GmbH", 3), row("Beta Inc", 1)]);
        acc.flush().unwrap();

        let reloaded = Accumulator::load(&path).unwrap();
        assert_eq!(reloaded.rows(), &[row("Acme GmbH", 3), row("Beta Inc", 1)]);
    }

    #[test]
    fn test_rows_concatenate_across_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");

        let mut acc = Accumulator::load(&path).unwrap();
        acc.merge_chunk(vec![row("Acme", 2)]);
        acc.flush().unwrap();

        // Second chunk in a fresh process: same company appears again as a
        // new row, not summed into the old one.
        let mut acc = Accumulator::load(&path).unwrap();
        acc.merge_chunk(vec![row("Acme", 1)]);
        acc.flush().unwrap();

        let reloaded = Accumulator::load(&path).unwrap();
        assert_eq!(reloaded.rows(), &[row("Acme", 2), row("Acme", 1)]);
    }

    #[test]
    fn test_flush_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/scraped/hits.csv");

        let mut acc = Accumulator::load(&path).unwrap();
        acc.merge_chunk(vec![row("Acme", 1)]);
        acc.flush().unwrap();
        assert!(path.exists());
    }
}
