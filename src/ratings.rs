//! Rating tables, category sets and the subject-by-category count matrix.
//!
//! The builder turns complete per-subject rater labels into:
//! - a `CategorySet`: every distinct label observed, in ascending order
//! - a `CountMatrix`: one row per subject, one column per category, each row
//!   summing to the number of raters
//!
//! Case weights are carried as per-row multiplicities instead of physically
//! replicating rows, so a subject with weight 40 costs one row, not forty.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

use crate::error::KappaError;

// ---------------------------------------------------------------------
//  Labels
// ---------------------------------------------------------------------

/// A category label as assigned by one rater.
///
/// Labels order numbers before text; numbers compare by value (with `-0.0`
/// equal to `0.0`), text compares lexicographically.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Number(f64),
    Text(String),
}

impl Label {
    pub fn number(value: f64) -> Self {
        Self::Number(value)
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(_) => None,
        }
    }

    /// True for numeric labels with a fractional part.
    pub fn is_fractional(&self) -> bool {
        matches!(self, Self::Number(v) if v.is_finite() && v.fract() != 0.0)
    }
}

fn canonical(v: f64) -> f64 {
    // Folds -0.0 into 0.0.
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl From<f64> for Label {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Label {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<i32> for Label {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Label {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Label {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl Ord for Label {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Label {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Label {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Label {}

impl Hash for Label {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Self::Number(v) => {
                0u8.hash(state);
                canonical(*v).to_bits().hash(state);
            }
            Self::Text(s) => {
                1u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(v) => write!(f, "{}", canonical(*v)),
            Self::Text(s) => f.write_str(s),
        }
    }
}

// ---------------------------------------------------------------------
//  Rating table (raw input, may contain missing ratings)
// ---------------------------------------------------------------------

fn default_weight() -> f64 {
    1.0
}

/// One subject as read from the dataset: K ratings, `None` where missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRow {
    pub ratings: Vec<Option<Label>>,
    /// Case weight. Rounded to an integer multiplicity by the procedure layer.
    #[serde(default = "default_weight")]
    pub weight: f64,
}

impl RatingRow {
    pub fn new(ratings: Vec<Option<Label>>) -> Self {
        Self {
            ratings,
            weight: 1.0,
        }
    }

    /// Row with every rating present.
    pub fn complete<L: Into<Label>>(ratings: impl IntoIterator<Item = L>) -> Self {
        Self::new(ratings.into_iter().map(|l| Some(l.into())).collect())
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Labels of this row if no rating is missing.
    pub fn complete_ratings(&self) -> Option<Vec<Label>> {
        self.ratings.iter().cloned().collect()
    }
}

/// Subjects × raters table handed over by the host dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RatingTable {
    /// Rater (variable) names. When empty, the rater count is taken from
    /// the first subject.
    #[serde(default)]
    pub raters: Vec<String>,
    pub subjects: Vec<RatingRow>,
}

impl RatingTable {
    pub fn new(raters: Vec<String>, subjects: Vec<RatingRow>) -> Self {
        Self { raters, subjects }
    }

    pub fn rater_count(&self) -> usize {
        if !self.raters.is_empty() {
            return self.raters.len();
        }
        self.subjects.first().map(|s| s.ratings.len()).unwrap_or(0)
    }
}

// ---------------------------------------------------------------------
//  Builder input / output
// ---------------------------------------------------------------------

/// Complete ratings for one subject plus its integer multiplicity.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectRatings {
    pub ratings: Vec<Label>,
    pub multiplicity: u64,
}

impl SubjectRatings {
    pub fn new(ratings: Vec<Label>, multiplicity: u64) -> Self {
        Self {
            ratings,
            multiplicity,
        }
    }

    pub fn single<L: Into<Label>>(ratings: impl IntoIterator<Item = L>) -> Self {
        Self::new(ratings.into_iter().map(Into::into).collect(), 1)
    }
}

/// Distinct observed category labels in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySet {
    labels: Vec<Label>,
}

impl CategorySet {
    pub fn from_labels(labels: impl IntoIterator<Item = Label>) -> Self {
        let set: BTreeSet<Label> = labels.into_iter().collect();
        Self {
            labels: set.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn index_of(&self, label: &Label) -> Option<usize> {
        self.labels.binary_search(label).ok()
    }
}

/// Largest accepted row multiplicity (2^53). Every multiplicity up to this
/// value is exact as an `f64`.
pub const MAX_MULTIPLICITY: u64 = 1 << 53;

fn checked_total(terms: impl IntoIterator<Item = Option<u64>>) -> Result<u64, KappaError> {
    terms
        .into_iter()
        .try_fold(0u64, |acc, term| term.and_then(|t| acc.checked_add(t)))
        .ok_or_else(|| KappaError::invalid_matrix("weighted counts overflow u64"))
}

/// Subject-by-category rating counts with per-row multiplicities.
///
/// Logically this is the N×C matrix where row `i` is repeated
/// `multiplicity(i)` times; N is the sum of multiplicities.
#[derive(Debug, Clone, PartialEq)]
pub struct CountMatrix {
    counts: DMatrix<u64>,
    multiplicities: Vec<u64>,
}

impl CountMatrix {
    pub fn new(counts: DMatrix<u64>, multiplicities: Vec<u64>) -> Result<Self, KappaError> {
        if counts.nrows() != multiplicities.len() {
            return Err(KappaError::invalid_matrix(format!(
                "{} rows but {} multiplicities",
                counts.nrows(),
                multiplicities.len()
            )));
        }
        if let Some(row) = multiplicities.iter().position(|&w| w > MAX_MULTIPLICITY) {
            return Err(KappaError::invalid_matrix(format!(
                "row {row} multiplicity {} exceeds {MAX_MULTIPLICITY}",
                multiplicities[row]
            )));
        }
        Ok(Self {
            counts,
            multiplicities,
        })
    }

    /// Matrix with every row counted once.
    pub fn from_rows(rows: &[Vec<u64>]) -> Result<Self, KappaError> {
        let weighted: Vec<(Vec<u64>, u64)> = rows.iter().map(|r| (r.clone(), 1)).collect();
        Self::from_weighted_rows(&weighted)
    }

    pub fn from_weighted_rows(rows: &[(Vec<u64>, u64)]) -> Result<Self, KappaError> {
        let ncols = rows.first().map(|(r, _)| r.len()).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * ncols);
        let mut multiplicities = Vec::with_capacity(rows.len());
        for (idx, (row, multiplicity)) in rows.iter().enumerate() {
            if row.len() != ncols {
                return Err(KappaError::invalid_matrix(format!(
                    "row {idx} has {} columns, expected {ncols}",
                    row.len()
                )));
            }
            data.extend_from_slice(row);
            multiplicities.push(*multiplicity);
        }
        Self::new(
            DMatrix::from_row_slice(rows.len(), ncols, &data),
            multiplicities,
        )
    }

    /// Number of stored (distinct) rows.
    pub fn nrows(&self) -> usize {
        self.counts.nrows()
    }

    /// Number of categories.
    pub fn ncols(&self) -> usize {
        self.counts.ncols()
    }

    pub fn count(&self, row: usize, col: usize) -> u64 {
        self.counts[(row, col)]
    }

    pub fn multiplicity(&self, row: usize) -> u64 {
        self.multiplicities[row]
    }

    pub fn counts(&self) -> &DMatrix<u64> {
        &self.counts
    }

    /// N: subjects after applying multiplicities.
    pub fn subjects(&self) -> Result<u64, KappaError> {
        checked_total(self.multiplicities.iter().map(|&w| Some(w)))
    }

    pub fn row_total(&self, row: usize) -> u64 {
        self.counts.row(row).iter().sum()
    }

    /// Weighted column totals, `colSum[j]`.
    pub fn column_totals(&self) -> Result<Vec<u64>, KappaError> {
        (0..self.ncols())
            .map(|j| {
                checked_total(
                    self.counts
                        .column(j)
                        .iter()
                        .zip(&self.multiplicities)
                        .map(|(&c, &w)| c.checked_mul(w)),
                )
            })
            .collect()
    }

    /// Weighted column sums of squared counts, `Σ_i M[i][j]²`.
    pub fn column_sums_of_squares(&self) -> Result<Vec<u64>, KappaError> {
        (0..self.ncols())
            .map(|j| {
                checked_total(
                    self.counts
                        .column(j)
                        .iter()
                        .zip(&self.multiplicities)
                        .map(|(&c, &w)| c.checked_mul(c).and_then(|sq| sq.checked_mul(w))),
                )
            })
            .collect()
    }

    /// Matrix with columns reordered so that new column `k` is old column
    /// `order[k]`.
    pub fn permute_columns(&self, order: &[usize]) -> Result<Self, KappaError> {
        let ncols = self.ncols();
        let mut seen = vec![false; ncols];
        if order.len() != ncols {
            return Err(KappaError::invalid_matrix("permutation length mismatch"));
        }
        for &j in order {
            if j >= ncols || seen[j] {
                return Err(KappaError::invalid_matrix("not a permutation of columns"));
            }
            seen[j] = true;
        }
        let counts = DMatrix::from_fn(self.nrows(), ncols, |i, k| self.counts[(i, order[k])]);
        Self::new(counts, self.multiplicities.clone())
    }
}

// ---------------------------------------------------------------------
//  Builder
// ---------------------------------------------------------------------

/// Build the category set and count matrix from complete subject ratings.
///
/// Subjects with multiplicity 0 are skipped entirely, including their labels.
/// Fails with `InsufficientCategories` when fewer than two labels are
/// observed, and with `InsufficientCases` when the weighted subject count is
/// below `max(categories, raters)`.
pub fn build_count_matrix(
    subjects: &[SubjectRatings],
) -> Result<(CategorySet, CountMatrix), KappaError> {
    let retained: Vec<&SubjectRatings> = subjects.iter().filter(|s| s.multiplicity > 0).collect();

    let raters = retained.first().map(|s| s.ratings.len()).unwrap_or(0);
    for (row, subject) in retained.iter().enumerate() {
        if subject.ratings.len() != raters {
            return Err(KappaError::RaggedRow {
                row,
                expected: raters,
                found: subject.ratings.len(),
            });
        }
    }

    let categories =
        CategorySet::from_labels(retained.iter().flat_map(|s| s.ratings.iter().cloned()));
    if categories.len() < 2 {
        return Err(KappaError::InsufficientCategories {
            categories: categories.len(),
        });
    }

    if let Some(row) = retained.iter().position(|s| s.multiplicity > MAX_MULTIPLICITY) {
        return Err(KappaError::InvalidWeight {
            row,
            weight: retained[row].multiplicity as f64,
        });
    }
    let cases = checked_total(retained.iter().map(|s| Some(s.multiplicity)))?;
    let required = categories.len().max(raters) as u64;
    if cases < required {
        return Err(KappaError::InsufficientCases { cases, required });
    }

    let mut counts = DMatrix::<u64>::zeros(retained.len(), categories.len());
    for (i, subject) in retained.iter().enumerate() {
        for label in &subject.ratings {
            // Every label was collected into `categories` above.
            if let Some(j) = categories.index_of(label) {
                counts[(i, j)] += 1;
            }
        }
    }

    let multiplicities = retained.iter().map(|s| s.multiplicity).collect();
    let matrix = CountMatrix::new(counts, multiplicities)?;
    Ok((categories, matrix))
}
