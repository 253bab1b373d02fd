//! Report rendering for Fleiss' kappa runs.

use crate::procedure::FleissReport;
use crate::ratings::Label;

const TRUNCATION_CAPTION: &str =
    "Non-integer rating category values are truncated for presentation.";

fn stat_headers(report: &FleissReport) -> [String; 6] {
    let level = report.confidence_level;
    [
        "Kappa".to_string(),
        "Asymptotic Standard Error".to_string(),
        "Z".to_string(),
        "P Value".to_string(),
        format!("Lower {level}% Asymptotic CI Bound"),
        format!("Upper {level}% Asymptotic CI Bound"),
    ]
}

fn category_cell(label: &Label) -> String {
    match label {
        Label::Number(v) => format!("{v:.0}"),
        Label::Text(s) => s.clone(),
    }
}

fn row(cells: &[String]) -> String {
    format!("| {} |\n", cells.join(" | "))
}

fn separator(columns: usize) -> String {
    format!("|{}\n", "---|".repeat(columns))
}

fn fmt3(v: f64) -> String {
    format!("{v:.3}")
}

pub fn render_markdown(report: &FleissReport) -> String {
    let mut out = String::new();
    out.push_str("# Fleiss Kappa\n\n");
    out.push_str(&format!("- Raters: {}\n", report.raters.join(", ")));
    out.push_str(&format!("- Valid cases: {}\n", report.valid_cases));
    if report.weighted_cases != report.valid_cases as u64 {
        out.push_str(&format!("- Weighted cases: {}\n", report.weighted_cases));
    }

    if !report.warnings.is_empty() {
        out.push_str("\n## Warnings\n\n");
        for warning in &report.warnings {
            out.push_str(&format!("- {}\n", warning.message()));
        }
    }

    let headers = stat_headers(report);

    out.push_str("\n## Overall Kappa\n\n");
    let mut head = vec![String::new()];
    head.extend(headers.iter().cloned());
    out.push_str(&row(&head));
    out.push_str(&separator(head.len()));
    let o = &report.overall;
    out.push_str(&row(&[
        "Overall".to_string(),
        fmt3(o.kappa),
        fmt3(o.ase),
        fmt3(o.z),
        fmt3(o.p_value),
        fmt3(o.lower),
        fmt3(o.upper),
    ]));

    out.push_str("\n## Kappas for Individual Categories\n\n");
    let mut head = vec![
        "Rating Category".to_string(),
        "Conditional Probability".to_string(),
    ];
    head.extend(headers.iter().cloned());
    out.push_str(&row(&head));
    out.push_str(&separator(head.len()));
    for cat in &report.categories {
        let s = &cat.stats;
        out.push_str(&row(&[
            category_cell(&cat.category),
            fmt3(s.conditional_probability),
            fmt3(s.kappa),
            fmt3(s.ase),
            fmt3(s.z),
            fmt3(s.p_value),
            fmt3(s.lower),
            fmt3(s.upper),
        ]));
    }
    if report.categories.iter().any(|c| c.category.is_fractional()) {
        out.push_str(&format!("\n_{TRUNCATION_CAPTION}_\n"));
    }

    out
}
