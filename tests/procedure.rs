use fleiss_kappa::ratings::MAX_MULTIPLICITY;
use fleiss_kappa::{
    render_markdown, run, FleissOptions, KappaError, Label, RatingRow, RatingTable, Warning,
};

fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol
}

fn raters(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("r{i}")).collect()
}

fn base_rows() -> Vec<RatingRow> {
    vec![
        RatingRow::complete([1, 1, 1]),
        RatingRow::complete([2, 2, 1]),
        RatingRow::complete([2, 2, 2]),
        RatingRow::complete([1, 2, 1]),
    ]
}

#[test]
fn missing_ratings_are_excluded_listwise() {
    let mut rows = base_rows();
    rows.push(RatingRow::new(vec![
        Some(Label::from(3)),
        None,
        Some(Label::from(3)),
    ]));
    let table = RatingTable::new(raters(3), rows);
    let report = run(&table, &FleissOptions::default()).unwrap();

    assert_eq!(report.valid_cases, 4);
    assert_eq!(report.weighted_cases, 4);
    // Category 3 only appears in the excluded subject.
    assert_eq!(report.categories.len(), 2);
    assert_eq!(report.warnings, vec![Warning::CasesExcluded { count: 1 }]);

    let clean = run(
        &RatingTable::new(raters(3), base_rows()),
        &FleissOptions::default(),
    )
    .unwrap();
    assert_eq!(clean.overall, report.overall);
    assert!(clean.warnings.is_empty());
}

#[test]
fn weights_act_as_replication() {
    let weighted = RatingTable::new(
        raters(3),
        vec![
            RatingRow::complete([1, 1, 1]).with_weight(3.0),
            RatingRow::complete([2, 2, 1]),
            RatingRow::complete([2, 2, 2]).with_weight(2.0),
            RatingRow::complete([1, 2, 1]).with_weight(0.0),
        ],
    );
    let replicated = RatingTable::new(
        raters(3),
        vec![
            RatingRow::complete([1, 1, 1]),
            RatingRow::complete([1, 1, 1]),
            RatingRow::complete([1, 1, 1]),
            RatingRow::complete([2, 2, 1]),
            RatingRow::complete([2, 2, 2]),
            RatingRow::complete([2, 2, 2]),
        ],
    );

    let a = run(&weighted, &FleissOptions::default()).unwrap();
    let b = run(&replicated, &FleissOptions::default()).unwrap();
    assert_eq!(a.weighted_cases, 6);
    assert_eq!(a.valid_cases, 4);
    assert_eq!(a.overall, b.overall);
    assert_eq!(a.categories, b.categories);
}

#[test]
fn fractional_weights_are_rounded_with_warning() {
    let table = RatingTable::new(
        raters(3),
        vec![
            RatingRow::complete([1, 1, 1]).with_weight(2.6),
            RatingRow::complete([2, 2, 1]).with_weight(1.0),
            RatingRow::complete([2, 2, 2]).with_weight(0.5),
        ],
    );
    let report = run(&table, &FleissOptions::default()).unwrap();
    assert_eq!(report.weighted_cases, 3 + 1 + 1);
    assert_eq!(report.warnings, vec![Warning::WeightsRounded { rows: 2 }]);
}

#[test]
fn negative_weight_is_an_error() {
    let mut rows = base_rows();
    rows[2] = rows[2].clone().with_weight(-1.0);
    let err = run(&RatingTable::new(raters(3), rows), &FleissOptions::default()).unwrap_err();
    assert_eq!(
        err,
        KappaError::InvalidWeight {
            row: 2,
            weight: -1.0
        }
    );
}

#[test]
fn confidence_level_is_clamped_with_warning() {
    let table = RatingTable::new(raters(3), base_rows());

    let low = run(&table, &FleissOptions::default().with_confidence_level(20.0)).unwrap();
    assert_eq!(low.confidence_level.percent(), 50.0);
    assert_eq!(
        low.warnings,
        vec![Warning::ConfidenceLevelRaised { requested: 20.0 }]
    );

    let high = run(&table, &FleissOptions::default().with_confidence_level(100.0)).unwrap();
    assert_eq!(high.confidence_level.percent(), 99.999);
    assert!(matches!(
        high.warnings.as_slice(),
        [Warning::ConfidenceLevelLowered { .. }]
    ));
    assert!(high.overall.upper - high.overall.lower > low.overall.upper - low.overall.lower);
}

#[test]
fn ragged_table_is_rejected() {
    let mut rows = base_rows();
    rows.push(RatingRow::complete([1, 2]));
    assert!(matches!(
        run(&RatingTable::new(raters(3), rows), &FleissOptions::default()),
        Err(KappaError::RaggedRow { row: 4, .. })
    ));
}

#[test]
fn all_missing_table_reports_insufficient_categories() {
    let table = RatingTable::new(
        raters(2),
        vec![
            RatingRow::new(vec![None, Some(Label::from(1))]),
            RatingRow::new(vec![Some(Label::from(2)), None]),
        ],
    );
    assert_eq!(
        run(&table, &FleissOptions::default()).unwrap_err(),
        KappaError::InsufficientCategories { categories: 0 }
    );
}

#[test]
fn report_attaches_labels_in_sorted_order() {
    let table: RatingTable = serde_json::from_str(
        r#"{
            "raters": ["a", "b"],
            "subjects": [
                {"ratings": ["no", "yes"]},
                {"ratings": ["yes", "yes"], "weight": 2},
                {"ratings": ["no", "no"]},
                {"ratings": ["maybe", "no"]}
            ]
        }"#,
    )
    .unwrap();
    let report = run(&table, &FleissOptions::default()).unwrap();
    let labels: Vec<String> = report
        .categories
        .iter()
        .map(|c| c.category.to_string())
        .collect();
    assert_eq!(labels, vec!["maybe", "no", "yes"]);
    assert_eq!(report.raters, vec!["a".to_string(), "b".to_string()]);
    assert!(report.overall.kappa.is_finite());
}

#[test]
fn markdown_report_has_both_tables() {
    let table = RatingTable::new(raters(3), base_rows());
    let report = run(&table, &FleissOptions::default().with_confidence_level(90.0)).unwrap();
    let md = render_markdown(&report);

    assert!(md.contains("## Overall Kappa"));
    assert!(md.contains("## Kappas for Individual Categories"));
    assert!(md.contains("Lower 90% Asymptotic CI Bound"));
    assert!(md.contains("Upper 90% Asymptotic CI Bound"));
    assert!(md.contains(&format!("| Overall | {:.3} |", report.overall.kappa)));
    assert!(!md.contains("## Warnings"));
    assert!(!md.contains("truncated for presentation"));
}

#[test]
fn markdown_report_notes_fractional_categories_and_warnings() {
    let table = RatingTable::new(
        raters(2),
        vec![
            RatingRow::complete([1.5, 1.5]),
            RatingRow::complete([2.0, 1.5]),
            RatingRow::complete([2.0, 2.0]),
            RatingRow::new(vec![None, Some(Label::from(2.0))]),
        ],
    );
    let report = run(&table, &FleissOptions::default()).unwrap();
    let md = render_markdown(&report);

    assert!(md.contains("truncated for presentation"));
    assert!(md.contains("## Warnings"));
    assert!(md.contains("1 cases with missing ratings have been excluded."));
    assert!(approx_eq(
        report.categories[0].stats.ase,
        report.categories[1].stats.ase,
        0.0
    ));
}

#[test]
fn oversized_weights_are_rejected() {
    for weight in [1e18, 1e300] {
        let table = RatingTable::new(
            raters(5),
            vec![
                RatingRow::complete([1, 1, 2, 2, 2]).with_weight(weight),
                RatingRow::complete([1, 1, 1, 1, 1]),
                RatingRow::complete([2, 2, 2, 1, 2]),
                RatingRow::complete([1, 2, 1, 2, 1]),
                RatingRow::complete([2, 2, 2, 2, 2]),
            ],
        );
        assert_eq!(
            run(&table, &FleissOptions::default()).unwrap_err(),
            KappaError::InvalidWeight { row: 0, weight }
        );
    }
}

#[test]
fn largest_accepted_weight_still_computes() {
    let table = RatingTable::new(
        raters(3),
        vec![
            RatingRow::complete([1, 1, 1]).with_weight(MAX_MULTIPLICITY as f64),
            RatingRow::complete([2, 2, 1]),
            RatingRow::complete([2, 2, 2]),
        ],
    );
    let report = run(&table, &FleissOptions::default()).unwrap();
    assert_eq!(report.weighted_cases, MAX_MULTIPLICITY + 2);
    assert!(report.overall.kappa.is_finite());
}

#[test]
fn table_where_every_weight_rounds_to_zero_has_no_categories() {
    let table = RatingTable::new(
        raters(3),
        base_rows()
            .into_iter()
            .map(|row| row.with_weight(0.3))
            .collect(),
    );
    assert_eq!(
        run(&table, &FleissOptions::default()).unwrap_err(),
        KappaError::InsufficientCategories { categories: 0 }
    );
}
