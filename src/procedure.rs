//! The analysis procedure: from a raw rating table to a finished report.
//!
//! This layer owns everything the engine assumes has already happened:
//! confidence-level clamping, weight rounding, listwise deletion of
//! subjects with missing ratings. Adjustments are reported as `Warning`s
//! instead of being applied silently.

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::KappaError;
use crate::kappa::{compute_kappa, CategoryKappaResult, KappaResult};
use crate::options::{ConfidenceLevel, FleissOptions};
use crate::ratings::{
    build_count_matrix, Label, RatingRow, RatingTable, SubjectRatings, MAX_MULTIPLICITY,
};

/// Non-fatal adjustment made while preparing the data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Requested level was below 50% and has been reset to 50%.
    ConfidenceLevelRaised { requested: f64 },
    /// Requested level was above 99.999% and has been reset to 99.999%.
    ConfidenceLevelLowered { requested: f64 },
    /// Fractional case weights were rounded to the nearest integer.
    WeightsRounded { rows: usize },
    /// Subjects with at least one missing rating were left out.
    CasesExcluded { count: usize },
}

impl Warning {
    pub fn message(&self) -> String {
        match self {
            Self::ConfidenceLevelRaised { .. } => {
                "CILEVEL cannot be less than 50%. It has been reset to 50%.".to_string()
            }
            Self::ConfidenceLevelLowered { .. } => {
                "CILEVEL cannot be greater than 99.999%. It has been reset to 99.999%.".to_string()
            }
            Self::WeightsRounded { rows } => {
                format!("{rows} non-integer case weights have been rounded to the nearest integer.")
            }
            Self::CasesExcluded { count } => {
                format!("{count} cases with missing ratings have been excluded.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub category: Label,
    #[serde(flatten)]
    pub stats: CategoryKappaResult,
}

/// Everything a presentation layer needs to render the analysis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleissReport {
    pub raters: Vec<String>,
    pub confidence_level: ConfidenceLevel,
    /// Complete cases before weighting.
    pub valid_cases: usize,
    /// N: complete cases after weighting.
    pub weighted_cases: u64,
    pub overall: KappaResult,
    pub categories: Vec<CategoryReport>,
    pub warnings: Vec<Warning>,
}

/// Rounded integer multiplicity for a case weight, and whether it was
/// fractional. Weights above `MAX_MULTIPLICITY` are rejected.
fn case_multiplicity(row: usize, weight: f64) -> Result<(u64, bool), KappaError> {
    if !weight.is_finite() || weight < 0.0 {
        return Err(KappaError::InvalidWeight { row, weight });
    }
    let rounded = weight.round();
    if rounded > MAX_MULTIPLICITY as f64 {
        return Err(KappaError::InvalidWeight { row, weight });
    }
    Ok((rounded as u64, rounded != weight))
}

fn rater_names(table: &RatingTable, raters: usize) -> Vec<String> {
    if table.raters.len() == raters {
        table.raters.clone()
    } else {
        (1..=raters).map(|i| format!("rater{i}")).collect()
    }
}

fn check_shape(rows: &[RatingRow], raters: usize) -> Result<(), KappaError> {
    for (row, subject) in rows.iter().enumerate() {
        if subject.ratings.len() != raters {
            return Err(KappaError::RaggedRow {
                row,
                expected: raters,
                found: subject.ratings.len(),
            });
        }
    }
    Ok(())
}

/// Run the full Fleiss' kappa analysis over a rating table.
pub fn run(table: &RatingTable, options: &FleissOptions) -> Result<FleissReport, KappaError> {
    let raters = table.rater_count();
    if raters < 2 {
        return Err(KappaError::TooFewRaters { raters });
    }
    check_shape(&table.subjects, raters)?;

    let mut warnings = Vec::new();
    let (level, level_warning) = ConfidenceLevel::clamped(options.confidence_level)?;
    warnings.extend(level_warning);

    let mut subjects = Vec::with_capacity(table.subjects.len());
    let mut excluded = 0usize;
    let mut rounded_rows = 0usize;
    for (row, subject) in table.subjects.iter().enumerate() {
        let (multiplicity, rounded) = case_multiplicity(row, subject.weight)?;
        let Some(labels) = subject.complete_ratings() else {
            excluded += 1;
            continue;
        };
        if rounded {
            rounded_rows += 1;
        }
        subjects.push(SubjectRatings::new(labels, multiplicity));
    }
    if rounded_rows > 0 {
        warnings.push(Warning::WeightsRounded { rows: rounded_rows });
    }
    if excluded > 0 {
        warnings.push(Warning::CasesExcluded { count: excluded });
    }
    for w in &warnings {
        warn!(kind = ?w, "{}", w.message());
    }

    let valid_cases = subjects.len();
    let (categories, matrix) = build_count_matrix(&subjects)?;
    let weighted_cases = matrix.subjects()?;

    let analysis = compute_kappa(&matrix, raters, level.percent())?;
    debug!(kappa = analysis.overall.kappa, ase = analysis.overall.ase, "kappa computed");

    let categories = categories
        .labels()
        .iter()
        .cloned()
        .zip(analysis.categories)
        .map(|(category, stats)| CategoryReport { category, stats })
        .collect();

    Ok(FleissReport {
        raters: rater_names(table, raters),
        confidence_level: level,
        valid_cases,
        weighted_cases,
        overall: analysis.overall,
        categories,
        warnings,
    })
}
