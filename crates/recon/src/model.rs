use chrono::NaiveDate;
use serde::ser::Serializer;
use serde::Serialize;

use crate::anomaly::AnomalyReport;
use crate::config::MatchConfig;
use crate::score::ConfidenceLabel;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Which of the two input sets a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceId {
    A,
    B,
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::A => write!(f, "A"),
            Self::B => write!(f, "B"),
        }
    }
}

/// One parsed table at the engine boundary: verbatim headers plus string
/// cells, row-major. `filename` is carried for display only.
#[derive(Debug, Clone)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub filename: Option<String>,
}

/// A single row from one source, with semantic fields inferred at load time.
///
/// `row_index` is the 0-based position in the original source, unique within
/// a source and stable for the life of a run. `raw` preserves every original
/// column name and value in column order.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    pub source: SourceId,
    pub row_index: usize,
    pub amount: Option<f64>,
    pub date: Option<NaiveDate>,
    pub reference: Option<String>,
    #[serde(serialize_with = "serialize_raw")]
    pub raw: Vec<(String, String)>,
}

impl Transaction {
    /// Raw value for a column, if the column exists. Columns are few, so a
    /// linear scan beats carrying an index per row.
    pub fn field(&self, column: &str) -> Option<&str> {
        self.raw
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the column exists on this record at all.
    pub fn has_column(&self, column: &str) -> bool {
        self.raw.iter().any(|(name, _)| name == column)
    }
}

fn serialize_raw<S>(raw: &[(String, String)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_map(raw.iter().map(|(k, v)| (k.as_str(), v.as_str())))
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// One accepted pairing. Singleton on each side under one-to-one matching.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub transactions_a: Vec<Transaction>,
    pub transactions_b: Vec<Transaction>,
    pub confidence: f64,
    /// Display tier only; assignment never consults it.
    pub label: ConfidenceLabel,
    /// Per-rule scores aligned with the config's rule order.
    pub rule_scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconSummary {
    pub matched_count: usize,
    pub unmatched_a_count: usize,
    pub unmatched_b_count: usize,
    pub match_rate: f64,
}

/// Full output of one run. Deterministic: carries no clock or host data.
/// The config that produced it is echoed back for audit.
#[derive(Debug, Clone, Serialize)]
pub struct ReconResult {
    pub summary: ReconSummary,
    pub matched: Vec<MatchResult>,
    pub unmatched_a: Vec<Transaction>,
    pub unmatched_b: Vec<Transaction>,
    pub anomalies: AnomalyReport,
    pub config: MatchConfig,
}
