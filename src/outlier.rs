//! Outlier bounding of reference candidates
//!
//! Derives revenue and headcount bounds from the current-customer population
//! and drops candidates outside them, removing implausible leads before
//! reconciliation. The population is small, so the revenue bounds anchor on
//! the observed min/max (extended by 1.5x IQR each way) rather than on the
//! quartiles themselves. The employee lower bound is a fixed floor of 10,
//! excluding micro-companies regardless of the customer distribution; the
//! asymmetry with the revenue bounds is deliberate.

use tracing::debug;

use crate::reference::ReferenceCompany;

/// Fixed employee floor; candidates below it are never plausible leads.
pub const EMPLOYEE_FLOOR: f64 = 10.0;

/// IQR extension factor applied to each bound.
const IQR_FACTOR: f64 = 1.5;

/// Inclusive revenue and employee bounds derived from a population.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds {
    pub revenue_low: f64,
    pub revenue_high: f64,
    pub employees_low: f64,
    pub employees_high: f64,
}

impl Bounds {
    /// Derive bounds from the reference-customer population. Recomputed
    /// from the argument on every call; no hidden state.
    pub fn derive(population: &[ReferenceCompany]) -> Self {
        let revenues: Vec<f64> = population.iter().map(|c| c.revenue).collect();
        let employees: Vec<f64> = population.iter().map(|c| c.employees).collect();

        let revenue_iqr = iqr(&revenues);
        let employee_iqr = iqr(&employees);

        let bounds = Self {
            revenue_low: min(&revenues) - IQR_FACTOR * revenue_iqr,
            revenue_high: max(&revenues) + IQR_FACTOR * revenue_iqr,
            employees_low: EMPLOYEE_FLOOR,
            employees_high: max(&employees) + IQR_FACTOR * employee_iqr,
        };
        debug!("Derived outlier bounds: {:?}", bounds);
        bounds
    }

    /// Whether a candidate falls within both bounds, inclusive.
    pub fn contains(&self, candidate: &ReferenceCompany) -> bool {
        candidate.revenue >= self.revenue_low
            && candidate.revenue <= self.revenue_high
            && candidate.employees >= self.employees_low
            && candidate.employees <= self.employees_high
    }
}

/// Drop candidates whose revenue or headcount lies outside the bounds
/// derived from `population`.
pub fn filter_outliers(
    candidates: Vec<ReferenceCompany>,
    population: &[ReferenceCompany],
) -> Vec<ReferenceCompany> {
    let bounds = Bounds::derive(population);
    let before = candidates.len();
    let kept: Vec<ReferenceCompany> = candidates
        .into_iter()
        .filter(|candidate| bounds.contains(candidate))
        .collect();
    debug!("Outlier filter kept {}/{} candidates", kept.len(), before);
    kept
}

fn min(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}

fn max(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Interquartile range with linearly interpolated quartiles.
fn iqr(values: &[f64]) -> f64 {
    quantile(values, 0.75) - quantile(values, 0.25)
}

/// Linear-interpolation quantile over the sorted values.
fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let fraction = position - lower as f64;
    sorted[lower] + fraction * (sorted[upper] - sorted[lower])
}
