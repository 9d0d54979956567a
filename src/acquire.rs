//! Chunked, restart-tolerant acquisition of scraped job-ad hits
//!
//! Partitions the reference company list into bounded chunks and drives the
//! external scraper adapter one chunk at a time, merging each chunk's tally
//! into the durable accumulator before moving on. Strictly sequential by
//! design: the job site penalizes concurrent or rapid automated access.
//!
//! A failed chunk is logged and skipped; the run continues. Re-running a
//! chunk that already succeeded duplicates its contribution in the
//! accumulator (the grouper sums rows, it cannot tell a rerun from a real
//! hit), so resumable runs should pass a chunk ledger.

use std::collections::BTreeMap;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::accumulator::{Accumulator, HitRow};
use crate::ledger::{self, ChunkLedger};

/// External scraper seam. Takes one ordered chunk of company names and
/// returns the raw matched company names, one entry per job-listing hit.
/// May fail per invocation; the coordinator retries only by being re-run at
/// chunk granularity.
pub trait ScrapeAdapter {
    fn scrape(&mut self, chunk: &[String]) -> Result<Vec<String>>;
}

impl<F> ScrapeAdapter for F
where
    F: FnMut(&[String]) -> Result<Vec<String>>,
{
    fn scrape(&mut self, chunk: &[String]) -> Result<Vec<String>> {
        self(chunk)
    }
}

/// Adapter backed by an external program (the browser-automation
/// collaborator). The chunk is written to the program's stdin, one company
/// name per line; each non-empty stdout line is one raw hit.
pub struct CommandAdapter {
    program: String,
    args: Vec<String>,
}

impl CommandAdapter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl ScrapeAdapter for CommandAdapter {
    fn scrape(&mut self, chunk: &[String]) -> Result<Vec<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("Failed to spawn scraper adapter: {}", self.program))?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .context("Failed to open scraper adapter stdin")?;
            for company in chunk {
                writeln!(stdin, "{}", company)?;
            }
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for scraper adapter")?;
        if !output.status.success() {
            bail!("Scraper adapter exited with status {}", output.status);
        }

        let hits = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(hits)
    }
}

/// Outcome of one chunk within an acquisition run.
#[derive(Debug, Clone)]
pub struct ChunkOutcome {
    pub index: usize,
    pub companies: usize,
    /// Raw hits merged for this chunk; None if the chunk failed or was
    /// skipped via the ledger.
    pub hits: Option<usize>,
    pub error: Option<String>,
}

/// Summary of an acquisition run.
#[derive(Debug, Clone, Default)]
pub struct AcquisitionSummary {
    pub total_chunks: usize,
    pub merged: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_hits: usize,
    pub chunk_outcomes: Vec<ChunkOutcome>,
}

/// Run the acquisition pipeline.
///
/// Companies are sorted ascending so chunk boundaries are deterministic and
/// resumable, then processed in contiguous chunks of `chunk_size`. Each
/// chunk's hits are tallied per raw name and merged into the accumulator at
/// `accumulator_path` via load-concat-flush. With `use_ledger` set, chunks
/// recorded as completed for this exact input are skipped and each merged
/// chunk is recorded after its flush, so a crash between chunks loses at
/// most the in-progress chunk.
pub fn acquire(
    companies: &[String],
    adapter: &mut dyn ScrapeAdapter,
    accumulator_path: &std::path::Path,
    chunk_size: usize,
    use_ledger: bool,
) -> Result<AcquisitionSummary> {
    if chunk_size == 0 {
        bail!("Chunk size must be at least 1");
    }

    let mut sorted: Vec<String> = companies.to_vec();
    sorted.sort();

    let chunks: Vec<&[String]> = sorted.chunks(chunk_size).collect();
    let mut summary = AcquisitionSummary {
        total_chunks: chunks.len(),
        ..Default::default()
    };

    let ledger_path = ChunkLedger::path_for(accumulator_path);
    let fingerprint = ledger::input_fingerprint(&sorted, chunk_size);
    let mut chunk_ledger = if use_ledger {
        Some(ChunkLedger::load_or_new(&ledger_path, fingerprint)?)
    } else {
        None
    };

    info!(
        "Acquiring {} companies in {} chunks of up to {}",
        sorted.len(),
        chunks.len(),
        chunk_size
    );

    let progress = ProgressBar::new(chunks.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} chunks {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    for (index, chunk) in chunks.iter().enumerate() {
        if let Some(ledger) = &chunk_ledger {
            if ledger.is_completed(index) {
                debug!("Chunk {}/{} already merged, skipping", index + 1, chunks.len());
                summary.skipped += 1;
                summary.chunk_outcomes.push(ChunkOutcome {
                    index,
                    companies: chunk.len(),
                    hits: None,
                    error: None,
                });
                progress.inc(1);
                continue;
            }
        }

        match adapter.scrape(chunk) {
            Ok(raw_hits) => {
                let tally = tally_hits(&raw_hits);
                let mut accumulator = Accumulator::load(accumulator_path)?;
                accumulator.merge_chunk(tally);
                accumulator.flush()?;

                if let Some(ledger) = &mut chunk_ledger {
                    ledger.mark_completed(index);
                    ledger.save(&ledger_path)?;
                }

                info!(
                    "Chunk {}/{} processed: {} hits merged",
                    index + 1,
                    chunks.len(),
                    raw_hits.len()
                );
                summary.merged += 1;
                summary.total_hits += raw_hits.len();
                summary.chunk_outcomes.push(ChunkOutcome {
                    index,
                    companies: chunk.len(),
                    hits: Some(raw_hits.len()),
                    error: None,
                });
            }
            Err(e) => {
                // Skipped for this run; recovery is re-running the
                // acquisition.
                warn!("Chunk {}/{} failed, skipping: {:#}", index + 1, chunks.len(), e);
                summary.failed += 1;
                summary.chunk_outcomes.push(ChunkOutcome {
                    index,
                    companies: chunk.len(),
                    hits: None,
                    error: Some(format!("{:#}", e)),
                });
            }
        }
        progress.inc(1);
    }

    progress.finish_and_clear();

    // A fully merged run has no use for the ledger anymore; failed chunks
    // keep it so a re-run retries only them.
    if let Some(ledger) = &chunk_ledger {
        if summary.failed == 0 && ledger.completed_chunks.len() == chunks.len() {
            ChunkLedger::delete(&ledger_path)?;
        }
    }

    Ok(summary)
}

/// Count occurrences per raw hit name, ordered by name.
fn tally_hits(raw_hits: &[String]) -> Vec<HitRow> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for hit in raw_hits {
        *counts.entry(hit.as_str()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(company, count)| HitRow {
            company: company.to_string(),
            count,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_tally_counts_per_name() {
        let tally = tally_hits(&names(&["Acme", "Beta", "Acme"]));
        assert_eq!(
            tally,
            vec![
                HitRow { company: "Acme".to_string(), count: 2 },
                HitRow { company: "Beta".to_string(), count: 1 },
            ]
        );
    }

    #[test]
    fn test_chunks_are_sorted_and_sequential() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");

        let mut seen: Vec<Vec<String>> = Vec::new();
        let mut adapter = |chunk: &[String]| {
            seen.push(chunk.to_vec());
            Ok(Vec::new())
        };

        let companies = names(&["Gamma", "Acme", "Beta"]);
        let summary = acquire(&companies, &mut adapter, &path, 2, false).unwrap();

        assert_eq!(summary.total_chunks, 2);
        assert_eq!(seen, vec![names(&["Acme", "Beta"]), names(&["Gamma"])]);
    }

    #[test]
    fn test_failed_chunk_is_skipped_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");

        let mut calls = 0usize;
        let mut adapter = |chunk: &[String]| {
            calls += 1;
            if calls == 1 {
                anyhow::bail!("site unavailable");
            }
            Ok(chunk.to_vec())
        };

        let companies = names(&["Acme", "Beta", "Gamma"]);
        let summary = acquire(&companies, &mut adapter, &path, 2, false).unwrap();

        assert_eq!(summary.failed, 1);
        assert_eq!(summary.merged, 1);

        // Only the second chunk's hits were merged
        let acc = Accumulator::load(&path).unwrap();
        assert_eq!(acc.rows(), &[HitRow { company: "Gamma".to_string(), count: 1 }]);
    }

    #[test]
    fn test_rerun_without_ledger_doubles_counts() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");

        let companies = names(&["Acme"]);
        let mut adapter = |_: &[String]| Ok(names(&["Acme", "Acme"]));

        acquire(&companies, &mut adapter, &path, 10, false).unwrap();
        acquire(&companies, &mut adapter, &path, 10, false).unwrap();

        let acc = Accumulator::load(&path).unwrap();
        let total: u64 = acc.rows().iter().map(|r| r.count).sum();
        assert_eq!(total, 4, "rerun is expected to double the contribution");
    }

    #[test]
    fn test_rerun_with_ledger_skips_completed_chunks() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");
        let companies = names(&["Acme", "Beta", "Gamma"]);

        // First run: second chunk fails, first is merged and recorded
        let mut calls = 0usize;
        let mut flaky = |chunk: &[String]| {
            calls += 1;
            if calls == 2 {
                anyhow::bail!("timeout");
            }
            Ok(chunk.to_vec())
        };
        let summary = acquire(&companies, &mut flaky, &path, 2, true).unwrap();
        assert_eq!(summary.merged, 1);
        assert_eq!(summary.failed, 1);

        // Second run: only the failed chunk is retried
        let mut scraped: Vec<Vec<String>> = Vec::new();
        let mut adapter = |chunk: &[String]| {
            scraped.push(chunk.to_vec());
            Ok(chunk.to_vec())
        };
        let summary = acquire(&companies, &mut adapter, &path, 2, true).unwrap();
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.merged, 1);
        assert_eq!(scraped, vec![names(&["Gamma"])]);

        let acc = Accumulator::load(&path).unwrap();
        let total: u64 = acc.rows().iter().map(|r| r.count).sum();
        assert_eq!(total, 3, "no chunk contributed twice");

        // Fully merged run cleans its ledger up
        assert!(!ChunkLedger::path_for(&path).exists());
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("hits.csv");
        let mut adapter = |_: &[String]| Ok(Vec::new());
        assert!(acquire(&names(&["Acme"]), &mut adapter, &path, 0, false).is_err());
    }
}
