use serde::Serialize;

use crate::anomaly;
use crate::assign::assign_one_to_one;
use crate::config::MatchConfig;
use crate::error::ReconError;
use crate::model::{ReconResult, ReconSummary, SourceId, Table, Transaction};
use crate::normalize;
use crate::rule::{parse_amount, parse_date};

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run one reconciliation. Pure and synchronous: same config and tables in,
/// byte-for-byte the same result out. All I/O and timing belong to the
/// caller.
pub fn run(config: &MatchConfig, table_a: &Table, table_b: &Table) -> Result<ReconResult, ReconError> {
    let rules = config.compile()?;
    config.validate_columns(&table_a.headers, &table_b.headers)?;

    let txns_a = build_transactions(SourceId::A, table_a);
    let txns_b = build_transactions(SourceId::B, table_b);

    let assignment = assign_one_to_one(&rules, config.min_confidence, &txns_a, &txns_b);
    let anomalies = anomaly::detect(
        &assignment.unmatched_a,
        &assignment.unmatched_b,
        &txns_a,
        &txns_b,
        anomaly::gap_window(&rules),
    );

    let summary = compute_summary(
        assignment.matched.len(),
        assignment.unmatched_a.len(),
        assignment.unmatched_b.len(),
        txns_a.len(),
        txns_b.len(),
    );

    Ok(ReconResult {
        summary,
        matched: assignment.matched,
        unmatched_a: assignment.unmatched_a,
        unmatched_b: assignment.unmatched_b,
        anomalies,
        config: config.clone(),
    })
}

/// Apply the config's normalization pre-pass to both tables, in place.
/// No-op when the config has no `[normalize]` block.
pub fn apply_normalization(config: &MatchConfig, table_a: &mut Table, table_b: &mut Table) {
    let Some(ref norm) = config.normalize else {
        return;
    };
    for column in &norm.columns {
        let suggestions = normalize::suggest_normalizations(
            column,
            &[&*table_a, &*table_b],
            norm.threshold,
        );
        let mapping = normalize::to_mapping(&suggestions);
        normalize::apply_mapping(table_a, column, &mapping);
        normalize::apply_mapping(table_b, column, &mapping);
    }
}

fn compute_summary(
    matched_count: usize,
    unmatched_a_count: usize,
    unmatched_b_count: usize,
    total_a: usize,
    total_b: usize,
) -> ReconSummary {
    let denom = total_a.max(total_b);
    ReconSummary {
        matched_count,
        unmatched_a_count,
        unmatched_b_count,
        match_rate: if denom == 0 {
            0.0
        } else {
            matched_count as f64 / denom as f64
        },
    }
}

// ---------------------------------------------------------------------------
// Table loading + column inference
// ---------------------------------------------------------------------------

/// Load one CSV into a `Table`, headers preserved verbatim.
pub fn load_csv_table(filename: &str, csv_data: &str) -> Result<Table, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReconError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Io(e.to_string()))?;
        // Pad short rows so every row has one cell per header.
        let mut row: Vec<String> = record.iter().map(|v| v.to_string()).collect();
        row.resize(headers.len(), String::new());
        rows.push(row);
    }

    Ok(Table {
        headers,
        rows,
        filename: Some(filename.to_string()),
    })
}

const AMOUNT_KEYWORDS: &[&str] = &["amount", "amt", "value", "total", "debit", "credit"];
const REFERENCE_KEYWORDS: &[&str] = &["reference", "ref", "invoice", "check", "memo"];

/// Build `Transaction`s from a table, inferring the semantic amount, date,
/// and reference columns from header names. Inference misses and parse
/// failures leave the field None; they never abort the run.
pub fn build_transactions(source: SourceId, table: &Table) -> Vec<Transaction> {
    let amount_idx = find_column(&table.headers, AMOUNT_KEYWORDS);
    let date_idx = table
        .headers
        .iter()
        .position(|h| h.to_lowercase().contains("date"));
    let reference_idx = find_column(&table.headers, REFERENCE_KEYWORDS)
        .or_else(|| table.headers.iter().position(|h| is_id_header(h)));

    table
        .rows
        .iter()
        .enumerate()
        .map(|(row_index, row)| {
            let cell = |idx: Option<usize>| idx.and_then(|i| row.get(i)).map(|v| v.as_str());

            let reference = cell(reference_idx)
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            Transaction {
                source,
                row_index,
                amount: cell(amount_idx).and_then(parse_amount),
                date: cell(date_idx).and_then(parse_date),
                reference,
                raw: table
                    .headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, v)| (h.clone(), v.clone()))
                    .collect(),
            }
        })
        .collect()
}

/// First header containing any keyword, case-insensitive; header order wins
/// over keyword order so inference is stable per table.
fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let lower = h.to_lowercase();
        keywords.iter().any(|kw| lower.contains(kw))
    })
}

/// "id", "txn_id", "Transaction ID" — but not "paid_date".
fn is_id_header(header: &str) -> bool {
    let lower = header.to_lowercase();
    lower == "id" || lower.ends_with("_id") || lower.ends_with(" id")
}

// ---------------------------------------------------------------------------
// Run report (boundary wrapper)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
    pub processing_time_ms: u64,
}

/// `ReconResult` plus wall-clock metadata. Only this wrapper carries
/// non-deterministic data; the result inside is reproducible.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub meta: RunMeta,
    pub result: ReconResult,
}

impl ReconResult {
    pub fn into_report(self, processing_time_ms: u64) -> RunReport {
        RunReport {
            meta: RunMeta {
                engine_version: env!("CARGO_PKG_VERSION").to_string(),
                run_at: chrono::Utc::now().to_rfc3339(),
                processing_time_ms,
            },
            result: self,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
