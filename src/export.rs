//! Reconciliation result export
//!
//! Writes the two reconciliation tables (scored candidates and scrape-only
//! companies) as CSV or JSON and prints a console summary. No format is
//! mandated downstream; the dashboard consumes whichever is configured.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use csv::Writer;
use tracing::{debug, info};

use crate::dedup::CanonicalGroup;
use crate::reconcile::ReconciliationRecord;

pub fn export_csv(
    matched: &[ReconciliationRecord],
    unmatched: &[CanonicalGroup],
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let matched_path = output_dir.join("candidates.csv");
    debug!("Exporting {} candidates to {}", matched.len(), matched_path.display());
    let mut wtr = Writer::from_writer(File::create(&matched_path)?);
    wtr.write_record([
        "Company",
        "Annual Revenue",
        "Employees",
        "Industry",
        "Job Ads",
        "Ads per 100 Employees",
    ])?;
    for record in matched {
        wtr.write_record(&[
            &record.name,
            &format!("{:.2}", record.revenue),
            &format!("{}", record.employees),
            &record.industry,
            &record.ad_count.to_string(),
            &format!("{:.2}", record.intensity),
        ])?;
    }
    wtr.flush()?;

    let unmatched_path = output_dir.join("scrape_only.csv");
    debug!(
        "Exporting {} scrape-only companies to {}",
        unmatched.len(),
        unmatched_path.display()
    );
    let mut wtr = Writer::from_writer(File::create(&unmatched_path)?);
    wtr.write_record(["Company", "Job Ads"])?;
    for group in unmatched {
        wtr.write_record(&[&group.canonical_name, &group.total_count.to_string()])?;
    }
    wtr.flush()?;

    info!(
        "Exported {} candidates and {} scrape-only companies to {}",
        matched.len(),
        unmatched.len(),
        output_dir.display()
    );
    Ok(())
}

pub fn export_json(
    matched: &[ReconciliationRecord],
    unmatched: &[CanonicalGroup],
    output_dir: &Path,
) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let output = JsonExport {
        summary: ExportSummary {
            candidates: matched.len(),
            scrape_only: unmatched.len(),
            total_hits: matched.iter().map(|r| r.ad_count).sum::<u64>()
                + unmatched.iter().map(|g| g.total_count).sum::<u64>(),
        },
        candidates: matched.to_vec(),
        scrape_only: unmatched.to_vec(),
    };

    let path = output_dir.join("reconciliation.json");
    let json = serde_json::to_string_pretty(&output)?;
    let mut file =
        File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(json.as_bytes())?;

    info!("Exported reconciliation result to {}", path.display());
    Ok(())
}

#[derive(serde::Serialize)]
struct JsonExport {
    summary: ExportSummary,
    candidates: Vec<ReconciliationRecord>,
    scrape_only: Vec<CanonicalGroup>,
}

#[derive(serde::Serialize)]
struct ExportSummary {
    candidates: usize,
    scrape_only: usize,
    total_hits: u64,
}

/// Console summary of a reconciliation run.
pub fn print_summary(matched: &[ReconciliationRecord], unmatched: &[CanonicalGroup]) {
    println!();
    println!("Companies with job ads from the reference list: {}", matched.len());
    println!("Companies found only via scraping:              {}", unmatched.len());

    if !matched.is_empty() {
        println!();
        println!("Top candidates by ads per 100 employees:");
        for record in matched.iter().take(10) {
            println!(
                "  {:<40} {:>4} ads  {:>8.2} per 100 employees",
                record.name, record.ad_count, record.intensity
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> (Vec<ReconciliationRecord>, Vec<CanonicalGroup>) {
        (
            vec![ReconciliationRecord {
                name: "Acme GmbH".to_string(),
                key: "acme".to_string(),
                revenue: 1180.0,
                employees: 50.0,
                industry: "Machinery".to_string(),
                ad_count: 2,
                intensity: 4.0,
            }],
            vec![CanonicalGroup {
                canonical_name: "beta".to_string(),
                total_count: 1,
            }],
        )
    }

    #[test]
    fn test_csv_export_writes_both_tables() {
        let dir = TempDir::new().unwrap();
        let (matched, unmatched) = sample();
        export_csv(&matched, &unmatched, dir.path()).unwrap();

        let candidates = std::fs::read_to_string(dir.path().join("candidates.csv")).unwrap();
        assert!(candidates.contains("Acme GmbH"));
        assert!(candidates.contains("4.00"));

        let scrape_only = std::fs::read_to_string(dir.path().join("scrape_only.csv")).unwrap();
        assert!(scrape_only.contains("beta,1"));
    }

    #[test]
    fn test_json_export_carries_summary() {
        let dir = TempDir::new().unwrap();
        let (matched, unmatched) = sample();
        export_json(&matched, &unmatched, dir.path()).unwrap();

        let json = std::fs::read_to_string(dir.path().join("reconciliation.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["summary"]["candidates"], 1);
        assert_eq!(parsed["summary"]["scrape_only"], 1);
        assert_eq!(parsed["summary"]["total_hits"], 3);
        assert_eq!(parsed["candidates"][0]["name"], "Acme GmbH");
    }
}
