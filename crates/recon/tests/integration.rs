use std::path::PathBuf;

use tally_recon::config::MatchConfig;
use tally_recon::engine::{apply_normalization, build_transactions, load_csv_table, run};
use tally_recon::model::{SourceId, Table};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_fixture_table(file: &str) -> Table {
    let path = fixtures_dir().join(file);
    let data = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    load_csv_table(file, &data).unwrap()
}

fn load_and_run(config_toml: &str) -> tally_recon::ReconResult {
    let config = MatchConfig::from_toml(config_toml).unwrap();
    let table_a = load_fixture_table(&config.source_a.as_ref().unwrap().file);
    let table_b = load_fixture_table(&config.source_b.as_ref().unwrap().file);
    run(&config, &table_a, &table_b).unwrap()
}

fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
    Table {
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect(),
        filename: None,
    }
}

// ---------------------------------------------------------------------------
// End-to-end runs
// ---------------------------------------------------------------------------

#[test]
fn two_way_fixture_run() {
    let toml = std::fs::read_to_string(fixtures_dir().join("two-way.toml")).unwrap();
    let result = load_and_run(&toml);

    assert_eq!(result.summary.matched_count, 3);
    assert_eq!(result.summary.unmatched_a_count, 1);
    assert_eq!(result.summary.unmatched_b_count, 0);
    assert!((result.summary.match_rate - 0.75).abs() < 1e-12);

    // INV9 has no counterpart at all.
    assert_eq!(result.unmatched_a[0].reference.as_deref(), Some("INV9"));

    for m in &result.matched {
        assert_eq!(m.transactions_a.len(), 1);
        assert_eq!(m.transactions_b.len(), 1);
        assert!(m.confidence >= 0.7 && m.confidence <= 1.0);
        for s in &m.rule_scores {
            assert!((0.0..=1.0).contains(s));
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let toml = std::fs::read_to_string(fixtures_dir().join("two-way.toml")).unwrap();
    let first = serde_json::to_string(&load_and_run(&toml)).unwrap();
    let second = serde_json::to_string(&load_and_run(&toml)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn partition_invariant_holds() {
    let toml = std::fs::read_to_string(fixtures_dir().join("two-way.toml")).unwrap();
    let result = load_and_run(&toml);

    let mut seen_a: Vec<usize> = result
        .matched
        .iter()
        .flat_map(|m| m.transactions_a.iter().map(|t| t.row_index))
        .chain(result.unmatched_a.iter().map(|t| t.row_index))
        .collect();
    seen_a.sort_unstable();
    assert_eq!(seen_a, vec![0, 1, 2, 3], "each A record appears exactly once");

    let mut seen_b: Vec<usize> = result
        .matched
        .iter()
        .flat_map(|m| m.transactions_b.iter().map(|t| t.row_index))
        .chain(result.unmatched_b.iter().map(|t| t.row_index))
        .collect();
    seen_b.sort_unstable();
    assert_eq!(seen_b, vec![0, 1, 2], "each B record appears exactly once");
}

// ---------------------------------------------------------------------------
// Scenario tests on inline tables
// ---------------------------------------------------------------------------

const AMOUNT_REF_RULES: &str = r#"
name = "Amount + Reference"
min_confidence = 0.7

[[rules]]
column_a = "Amount"
column_b = "Amount"
match_type = "tolerance_numeric"
tolerance = 0.01
mode = "fixed"
weight = 0.6

[[rules]]
column_a = "Reference"
column_b = "Reference"
match_type = "exact"
weight = 0.4
"#;

#[test]
fn amount_and_reference_best_pair_wins() {
    let config = MatchConfig::from_toml(AMOUNT_REF_RULES).unwrap();
    let a = table(&["Amount", "Reference"], &[&["100.00", "INV1"]]);
    let b = table(
        &["Amount", "Reference"],
        &[&["100.00", "INV1"], &["105.00", "INV1"]],
    );

    let result = run(&config, &a, &b).unwrap();
    assert_eq!(result.matched.len(), 1);
    assert_eq!(result.matched[0].confidence, 1.0);
    assert_eq!(result.matched[0].transactions_b[0].row_index, 0);
    assert_eq!(result.unmatched_b.len(), 1);
    assert_eq!(result.unmatched_b[0].row_index, 1);
}

#[test]
fn threshold_boundary_is_inclusive() {
    // Reference matches, amount does not: confidence is exactly 0.4.
    let a = table(&["Amount", "Reference"], &[&["100.00", "INV1"]]);
    let b = table(&["Amount", "Reference"], &[&["500.00", "INV1"]]);

    let at_floor = MatchConfig::from_toml(
        &AMOUNT_REF_RULES.replace("min_confidence = 0.7", "min_confidence = 0.4"),
    )
    .unwrap();
    assert_eq!(run(&at_floor, &a, &b).unwrap().matched.len(), 1);

    let above = MatchConfig::from_toml(
        &AMOUNT_REF_RULES.replace("min_confidence = 0.7", "min_confidence = 0.401"),
    )
    .unwrap();
    assert_eq!(run(&above, &a, &b).unwrap().matched.len(), 0);
}

#[test]
fn tie_break_is_stable() {
    let config = MatchConfig::from_toml(AMOUNT_REF_RULES).unwrap();
    let a = table(
        &["Amount", "Reference"],
        &[&["100.00", "INV1"], &["200.00", "INV2"]],
    );
    let b = table(
        &["Amount", "Reference"],
        &[&["200.00", "INV2"], &["100.00", "INV1"]],
    );

    let result = run(&config, &a, &b).unwrap();
    assert_eq!(result.matched.len(), 2);
    // Equal confidences accept in ascending A row order.
    assert_eq!(result.matched[0].transactions_a[0].row_index, 0);
    assert_eq!(result.matched[1].transactions_a[0].row_index, 1);
}

#[test]
fn date_tolerance_scenario() {
    let config = MatchConfig::from_toml(
        r#"
name = "Dates"
min_confidence = 0.2

[[rules]]
column_a = "Date"
column_b = "Date"
match_type = "tolerance_date"
tolerance = 3
weight = 1.0
"#,
    )
    .unwrap();

    // 3-day gap: inside the inclusive boundary, partial score.
    let a = table(&["Date"], &[&["2025-01-01"]]);
    let b = table(&["Date"], &[&["2025-01-04"]]);
    let result = run(&config, &a, &b).unwrap();
    assert_eq!(result.matched.len(), 1);
    assert!(result.matched[0].confidence > 0.0 && result.matched[0].confidence < 1.0);

    // 9-day gap: scores 0, no candidate.
    let b_far = table(&["Date"], &[&["2025-01-10"]]);
    let result = run(&config, &a, &b_far).unwrap();
    assert!(result.matched.is_empty());
    assert_eq!(result.unmatched_a.len(), 1);
    assert_eq!(result.unmatched_b.len(), 1);
}

#[test]
fn empty_source_b_yields_full_unmatched_a() {
    let config = MatchConfig::from_toml(AMOUNT_REF_RULES).unwrap();
    let a = table(
        &["Amount", "Reference"],
        &[&["100.00", "INV1"], &["200.00", "INV2"]],
    );
    let b = table(&["Amount", "Reference"], &[]);

    let result = run(&config, &a, &b).unwrap();
    assert!(result.matched.is_empty());
    assert_eq!(result.unmatched_a.len(), 2);
    assert_eq!(result.summary.match_rate, 0.0);
}

#[test]
fn missing_rule_column_fails_fast() {
    let config = MatchConfig::from_toml(AMOUNT_REF_RULES).unwrap();
    let a = table(&["Amount", "Reference"], &[&["100.00", "INV1"]]);
    let b = table(&["Amount"], &[&["100.00"]]);

    let err = run(&config, &a, &b).unwrap_err();
    assert!(err.to_string().contains("Reference"));
    assert!(err.to_string().contains("source B"));
}

// ---------------------------------------------------------------------------
// Anomalies + normalization pre-pass
// ---------------------------------------------------------------------------

#[test]
fn unmatched_records_carry_anomaly_hints() {
    let config = MatchConfig::from_toml(AMOUNT_REF_RULES).unwrap();
    // Same reference on both sides, amounts too far apart to match.
    let a = table(
        &["Amount", "Reference"],
        &[&["100.00", "INV1"], &["55.00", "INV1"]],
    );
    let b = table(&["Amount", "Reference"], &[&["180.00", "INV1"]]);

    let result = run(&config, &a, &b).unwrap();
    assert!(result.matched.is_empty());

    // Both unmatched A rows get hints: an amount delta to the same-reference
    // counterpart and the duplicate-reference flag within source A.
    assert_eq!(result.anomalies.unmatched_a.len(), 2);
    let json = serde_json::to_string(&result.anomalies).unwrap();
    assert!(json.contains("amount_delta"));
    assert!(json.contains("duplicate_reference"));
}

#[test]
fn normalization_pre_pass_recovers_vendor_match() {
    let config = MatchConfig::from_toml(
        r#"
name = "Vendors"
min_confidence = 0.9

[[rules]]
column_a = "Vendor"
column_b = "Vendor"
match_type = "exact"
weight = 1.0

[normalize]
columns = ["Vendor"]
threshold = 0.8
"#,
    )
    .unwrap();

    let mut a = table(&["Vendor"], &[&["Acme Corp"], &["Acme Corp"]]);
    let mut b = table(&["Vendor"], &[&["ACME CORP."]]);

    // Punctuation variant defeats exact matching without the pre-pass.
    let before = run(&config, &a, &b).unwrap();
    assert_eq!(before.matched.len(), 0);

    apply_normalization(&config, &mut a, &mut b);
    let after = run(&config, &a, &b).unwrap();
    assert_eq!(after.matched.len(), 1);
}

#[test]
fn report_wrapper_keeps_result_intact() {
    let config = MatchConfig::from_toml(AMOUNT_REF_RULES).unwrap();
    let a = table(&["Amount", "Reference"], &[&["100.00", "INV1"]]);
    let b = table(&["Amount", "Reference"], &[&["100.00", "INV1"]]);

    let result = run(&config, &a, &b).unwrap();
    let matched = result.summary.matched_count;
    let report = result.into_report(12);
    assert_eq!(report.meta.processing_time_ms, 12);
    assert_eq!(report.result.summary.matched_count, matched);
    assert!(!report.meta.engine_version.is_empty());
}

#[test]
fn builds_transactions_with_stable_row_indices() {
    let t = load_fixture_table("bank.csv");
    let txns = build_transactions(SourceId::A, &t);
    let rows: Vec<usize> = txns.iter().map(|t| t.row_index).collect();
    assert_eq!(rows, vec![0, 1, 2, 3]);
    assert_eq!(txns[0].amount, Some(100.0));
    assert_eq!(txns[0].reference.as_deref(), Some("INV1"));
}
