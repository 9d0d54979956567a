// Allow dead code for public API functions that may not be used internally
// but are part of the library's exposed interface
#![allow(dead_code)]

pub mod accumulator;
pub mod acquire;
pub mod cli;
pub mod config;
pub mod dedup;
pub mod export;
pub mod ledger;
pub mod logger;
pub mod normalize;
pub mod outlier;
pub mod reconcile;
pub mod reference;

pub use accumulator::{Accumulator, HitRow};
pub use acquire::{AcquisitionSummary, CommandAdapter, ScrapeAdapter};
pub use dedup::CanonicalGroup;
pub use reconcile::ReconciliationRecord;
pub use reference::ReferenceCompany;
