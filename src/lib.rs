#![forbid(unsafe_code)]

//! # fleiss-kappa
//!
//! Inter-rater agreement for K raters sorting N subjects into C categories.
//!
//! The crate builds a subject-by-category count matrix from raw rater labels
//! and computes Fleiss' kappa on it: overall and per-category kappa,
//! conditional probabilities, asymptotic standard errors, z tests, two-sided
//! p-values and confidence bounds.
//!
//! - `ratings`: labels, rating tables, the count-matrix builder
//! - `kappa`: the closed-form engine
//! - `procedure`: missing-data filtering, case weights, warnings
//! - `report`: markdown rendering of a finished analysis

pub mod error;
pub mod kappa;
pub mod options;
pub mod procedure;
pub mod ratings;
pub mod report;
pub mod simulate;

pub use error::KappaError;
pub use kappa::{compute_kappa, CategoryKappaResult, KappaAnalysis, KappaResult};
pub use options::{load_options_from_path, ConfidenceLevel, FleissOptions};
pub use procedure::{run, CategoryReport, FleissReport, Warning};
pub use ratings::{
    build_count_matrix, CategorySet, CountMatrix, Label, RatingRow, RatingTable, SubjectRatings,
};
pub use report::render_markdown;
