//! Fleiss' kappa engine.
//!
//! Closed-form overall and per-category kappa (Fleiss, 1971) with
//! asymptotic standard errors, z tests and confidence bounds.
//!
//! Implementation notes:
//! - Works on the weighted `CountMatrix` directly; a row with multiplicity
//!   `w` contributes exactly as `w` identical rows would.
//! - The two-sided p-value `1 - chi2_cdf(z², 1)` is evaluated as
//!   `erfc(|z| / sqrt 2)`, and the critical value `sqrt(chi2_inv(level, 1))`
//!   as `sqrt 2 * erf_inv(level)`. Both are the same quantities; the erf
//!   forms keep full precision in the tails.
//! - The per-category ASE is the classical constant `sqrt(2 / (N K (K-1)))`
//!   shared by every category.

use std::f64::consts::SQRT_2;

use serde::{Deserialize, Serialize};
use statrs::function::erf::{erf_inv, erfc};
use tracing::debug;

use crate::error::KappaError;
use crate::options::{MAX_CONFIDENCE_LEVEL, MIN_CONFIDENCE_LEVEL};
use crate::ratings::CountMatrix;

/// Overall agreement statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KappaResult {
    pub kappa: f64,
    /// Asymptotic standard error.
    pub ase: f64,
    pub z: f64,
    pub p_value: f64,
    pub lower: f64,
    pub upper: f64,
}

/// Agreement statistics for one category (column of the count matrix).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryKappaResult {
    /// Probability that a second rater picks this category given that a
    /// first rater did.
    pub conditional_probability: f64,
    pub kappa: f64,
    pub ase: f64,
    pub z: f64,
    pub p_value: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KappaAnalysis {
    pub overall: KappaResult,
    /// One entry per matrix column, in column order.
    pub categories: Vec<CategoryKappaResult>,
}

/// Two-sided p-value of a standard-normal statistic.
pub fn two_sided_p_value(z: f64) -> f64 {
    erfc(z.abs() / SQRT_2)
}

/// Half-width multiplier of a two-sided interval at `level_percent`.
pub fn critical_value(level_percent: f64) -> f64 {
    SQRT_2 * erf_inv(level_percent / 100.0)
}

fn validate(
    matrix: &CountMatrix,
    rater_count: usize,
    confidence_level_percent: f64,
) -> Result<(), KappaError> {
    if !(MIN_CONFIDENCE_LEVEL..=MAX_CONFIDENCE_LEVEL).contains(&confidence_level_percent) {
        return Err(KappaError::InvalidConfidenceLevel(confidence_level_percent));
    }
    if rater_count < 2 {
        return Err(KappaError::invalid_matrix(format!(
            "rater count {rater_count} < 2"
        )));
    }
    if matrix.ncols() < 2 {
        return Err(KappaError::invalid_matrix(format!(
            "{} categories, need at least 2",
            matrix.ncols()
        )));
    }
    if matrix.subjects()? == 0 {
        return Err(KappaError::invalid_matrix("no subjects"));
    }
    for i in 0..matrix.nrows() {
        let total = matrix.row_total(i);
        if total != rater_count as u64 {
            return Err(KappaError::invalid_matrix(format!(
                "row {i} sums to {total}, expected {rater_count}"
            )));
        }
    }
    if let Some(j) = matrix.column_totals()?.iter().position(|&t| t == 0) {
        return Err(KappaError::invalid_matrix(format!(
            "category column {j} is never used"
        )));
    }
    Ok(())
}

/// Compute overall and per-category Fleiss' kappa.
///
/// Fails with `InvalidMatrix` when a row does not sum to `rater_count`, when
/// fewer than two columns (or an unused column) are present, and with
/// `InvalidConfidenceLevel` when the level is outside [50, 99.999].
pub fn compute_kappa(
    matrix: &CountMatrix,
    rater_count: usize,
    confidence_level_percent: f64,
) -> Result<KappaAnalysis, KappaError> {
    validate(matrix, rater_count, confidence_level_percent)?;

    let subjects = matrix.subjects()?;
    debug!(
        rows = matrix.nrows(),
        subjects,
        raters = rater_count,
        categories = matrix.ncols(),
        "computing fleiss kappa"
    );

    let n = subjects as f64;
    let k = rater_count as f64;
    let col_sums: Vec<f64> = matrix.column_totals()?.iter().map(|&v| v as f64).collect();
    let col_sq: Vec<f64> = matrix
        .column_sums_of_squares()?
        .iter()
        .map(|&v| v as f64)
        .collect();
    let total: f64 = col_sums.iter().sum();
    let sum_sq: f64 = col_sq.iter().sum();
    let pairs = n * k * (k - 1.0);

    let p: Vec<f64> = col_sums.iter().map(|&c| c / total).collect();
    let q: Vec<f64> = p.iter().map(|&pj| 1.0 - pj).collect();

    let p_e: f64 = p.iter().map(|&pj| pj * pj).sum();
    let p_a = sum_sq / pairs - 1.0 / (k - 1.0);
    let kappa = (p_a - p_e) / (1.0 - p_e);

    // (Σ p_j q_j) enters both the numerator and denominator of the ASE.
    let pq: f64 = p.iter().zip(&q).map(|(pj, qj)| pj * qj).sum();
    let cross: f64 = p
        .iter()
        .zip(&q)
        .map(|(pj, qj)| pj * qj * (qj - pj))
        .sum();
    let ase = (2.0 * (pq * pq - cross) / (pairs * pq * pq)).sqrt();

    let crit = critical_value(confidence_level_percent);
    let overall = KappaResult::from_estimate(kappa, ase, crit);

    let ase_j = (2.0 / pairs).sqrt();
    let categories = (0..matrix.ncols())
        .map(|j| {
            let cp = (col_sq[j] - col_sums[j]) / ((k - 1.0) * col_sums[j]);
            let kappa_j = (cp - p[j]) / q[j];
            CategoryKappaResult::from_estimate(cp, kappa_j, ase_j, crit)
        })
        .collect();

    Ok(KappaAnalysis {
        overall,
        categories,
    })
}

impl KappaResult {
    fn from_estimate(kappa: f64, ase: f64, crit: f64) -> Self {
        let z = kappa / ase;
        Self {
            kappa,
            ase,
            z,
            p_value: two_sided_p_value(z),
            lower: kappa - crit * ase,
            upper: kappa + crit * ase,
        }
    }
}

impl CategoryKappaResult {
    fn from_estimate(conditional_probability: f64, kappa: f64, ase: f64, crit: f64) -> Self {
        let base = KappaResult::from_estimate(kappa, ase, crit);
        Self {
            conditional_probability,
            kappa: base.kappa,
            ase: base.ase,
            z: base.z,
            p_value: base.p_value,
            lower: base.lower,
            upper: base.upper,
        }
    }
}
