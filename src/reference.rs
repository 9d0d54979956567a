//! Reference company ingestion
//!
//! Reads the CRM export of candidate companies: a CSV with one banner row
//! above the real header row (the shape the export tool produces). Revenue
//! in EUR is converted to the common unit with a fixed multiplier, missing
//! numeric cells are filled with the column mean, and rows sharing an
//! Account Name keep only the most recently modified one.
//!
//! Missing required columns abort ingestion before any processing - the
//! rest of the pipeline assumes their presence.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;
use tracing::debug;

use crate::normalize::normalize;

/// Fixed approximate EUR -> common-unit multiplier.
pub const EUR_RATE: f64 = 1.18;

/// Required columns of the reference export.
const REQUIRED_COLUMNS: &[&str] = &[
    "Account Name",
    "Annual Revenue",
    "Annual Revenue Currency",
    "Employees",
    "Industry",
    "Last Modified Date",
];

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Failed to read reference file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse reference file: {0}")]
    Csv(#[from] csv::Error),

    #[error("Reference file is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Reference file has no header row")]
    MissingHeader,
}

/// One reference-list company, cleaned and keyed for reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceCompany {
    /// Raw Account Name as exported.
    pub name: String,
    /// Normalized join key.
    pub key: String,
    /// Annual revenue in the common unit.
    pub revenue: f64,
    pub employees: f64,
    pub industry: String,
    pub last_modified: Option<NaiveDateTime>,
}

/// Load and clean the reference export at `path`.
pub fn load_reference(path: &Path) -> Result<Vec<ReferenceCompany>, IngestError> {
    let file = File::open(path)?;
    let companies = read_reference(file)?;
    debug!("Loaded {} reference companies from {}", companies.len(), path.display());
    Ok(companies)
}

/// Parse, convert, mean-fill and deduplicate reference rows from a reader.
pub fn read_reference<R: Read>(reader: R) -> Result<Vec<ReferenceCompany>, IngestError> {
    // The export carries a banner row before the header, so headers are
    // located by hand instead of letting the csv reader assume row one.
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut records = csv_reader.records();

    // Banner row; an empty file has no header at all.
    if records.next().transpose()?.is_none() {
        return Err(IngestError::MissingHeader);
    }
    let header = records.next().transpose()?.ok_or(IngestError::MissingHeader)?;

    let mut columns: HashMap<String, usize> = HashMap::new();
    for (index, cell) in header.iter().enumerate() {
        columns.insert(cell.trim().to_string(), index);
    }
    for required in REQUIRED_COLUMNS {
        if !columns.contains_key(*required) {
            return Err(IngestError::MissingColumn(required.to_string()));
        }
    }

    let name_col = columns["Account Name"];
    let revenue_col = columns["Annual Revenue"];
    let currency_col = columns["Annual Revenue Currency"];
    let employees_col = columns["Employees"];
    let industry_col = columns["Industry"];
    let modified_col = columns["Last Modified Date"];

    struct RawRow {
        name: String,
        revenue: Option<f64>,
        employees: Option<f64>,
        industry: String,
        last_modified: Option<NaiveDateTime>,
    }

    let mut rows: Vec<RawRow> = Vec::new();
    for record in records {
        let record = record?;
        let name = cell(&record, name_col).trim().to_string();
        if name.is_empty() {
            continue;
        }

        let currency = cell(&record, currency_col).trim().to_string();
        let mut revenue = parse_number(cell(&record, revenue_col));
        if let Some(value) = revenue {
            // Unrecognized currencies pass through unconverted and are
            // assumed to already be in the common unit.
            if currency.eq_ignore_ascii_case("EUR") {
                revenue = Some(value * EUR_RATE);
            }
        }

        rows.push(RawRow {
            name,
            revenue,
            employees: parse_number(cell(&record, employees_col)),
            industry: cell(&record, industry_col).trim().to_string(),
            last_modified: parse_datetime(cell(&record, modified_col)),
        });
    }

    // Mean-fill missing numerics, column by column.
    let revenue_mean = mean(rows.iter().filter_map(|r| r.revenue));
    let employees_mean = mean(rows.iter().filter_map(|r| r.employees));

    let mut companies: Vec<ReferenceCompany> = rows
        .into_iter()
        .map(|row| ReferenceCompany {
            key: normalize(&row.name),
            name: row.name,
            revenue: row.revenue.unwrap_or(revenue_mean),
            employees: row.employees.unwrap_or(employees_mean),
            industry: row.industry,
            last_modified: row.last_modified,
        })
        .collect();

    companies = keep_latest(companies);
    Ok(companies)
}

/// For account names appearing more than once, keep only the row with the
/// most recent Last Modified Date.
fn keep_latest(companies: Vec<ReferenceCompany>) -> Vec<ReferenceCompany> {
    let mut latest: HashMap<String, usize> = HashMap::new();
    for (index, company) in companies.iter().enumerate() {
        let newer = match latest.get(&company.name) {
            Some(&existing) => companies[existing].last_modified < company.last_modified,
            None => true,
        };
        if newer {
            latest.insert(company.name.clone(), index);
        }
    }

    companies
        .iter()
        .enumerate()
        .filter(|(index, company)| latest.get(&company.name) == Some(index))
        .map(|(_, company)| company.clone())
        .collect()
}

fn cell<'a>(record: &'a csv::StringRecord, index: usize) -> &'a str {
    record.get(index).unwrap_or("")
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    const FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%d.%m.%Y %H:%M",
        "%m/%d/%Y %H:%M",
    ];
    for format in FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    // Date-only cells
    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    if let Ok(date) = chrono::NaiveDate::parse_from_str(trimmed, "%d.%m.%Y") {
        return date.and_hms_opt(0, 0, 0);
    }
    None
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        return 0.0;
    }
    collected.iter().sum::<f64>() / collected.len() as f64
}
