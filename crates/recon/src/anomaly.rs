use std::collections::HashMap;

use serde::Serialize;

use crate::model::{SourceId, Transaction};
use crate::rule::{CompiledRule, RuleKind};
use crate::similarity::normalize_text;

/// Window used for date-gap flags when the config has no date rule.
pub const DEFAULT_DATE_GAP_DAYS: u32 = 3;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// One structured hint on an unmatched record. Data only — consumed by the
/// external explanation service, never turned into prose here.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// Delta to the nearest-amount counterpart sharing this reference.
    AmountDelta { counterpart_row: usize, delta: f64 },
    /// The same reference appears on more than one row of this source.
    DuplicateReference { rows: Vec<usize> },
    /// Record date falls outside the plausible window of every counterpart.
    DateGap { nearest_offset_days: i64 },
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordAnomalies {
    pub source: SourceId,
    pub row_index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    pub flags: Vec<Anomaly>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AnomalyReport {
    pub unmatched_a: Vec<RecordAnomalies>,
    pub unmatched_b: Vec<RecordAnomalies>,
}

// ---------------------------------------------------------------------------
// Detection
// ---------------------------------------------------------------------------

/// The largest date tolerance in the rule set, as the plausible window for
/// date-gap flags.
pub fn gap_window(rules: &[CompiledRule]) -> u32 {
    rules
        .iter()
        .filter_map(|r| match r.kind {
            RuleKind::ToleranceDate { days } => Some(days),
            _ => None,
        })
        .max()
        .unwrap_or(DEFAULT_DATE_GAP_DAYS)
}

/// Annotate unmatched records with likely explanations. Never alters
/// matches; records without findings are omitted from the report.
pub fn detect(
    unmatched_a: &[Transaction],
    unmatched_b: &[Transaction],
    all_a: &[Transaction],
    all_b: &[Transaction],
    window_days: u32,
) -> AnomalyReport {
    AnomalyReport {
        unmatched_a: annotate_side(unmatched_a, all_a, all_b, window_days),
        unmatched_b: annotate_side(unmatched_b, all_b, all_a, window_days),
    }
}

fn annotate_side(
    unmatched: &[Transaction],
    own: &[Transaction],
    counterparts: &[Transaction],
    window_days: u32,
) -> Vec<RecordAnomalies> {
    // Duplicates are detected source-wide, reported on unmatched rows only.
    let mut by_ref: HashMap<String, Vec<usize>> = HashMap::new();
    for t in own {
        if let Some(ref r) = t.reference {
            let key = normalize_text(r);
            if !key.is_empty() {
                by_ref.entry(key).or_default().push(t.row_index);
            }
        }
    }

    let mut out = Vec::new();

    for t in unmatched {
        let mut flags = Vec::new();
        let ref_key = t.reference.as_deref().map(normalize_text);

        // Amount delta vs. nearest same-reference counterpart.
        if let (Some(amount), Some(key)) = (t.amount, ref_key.as_deref()) {
            let nearest = counterparts
                .iter()
                .filter(|c| {
                    c.reference.as_deref().map(normalize_text).as_deref() == Some(key)
                })
                .filter_map(|c| c.amount.map(|ca| (c.row_index, amount - ca)))
                .min_by(|x, y| {
                    x.1.abs()
                        .partial_cmp(&y.1.abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then(x.0.cmp(&y.0))
                });
            if let Some((counterpart_row, delta)) = nearest {
                flags.push(Anomaly::AmountDelta { counterpart_row, delta });
            }
        }

        // Duplicate reference within this source.
        if let Some(key) = ref_key.as_deref() {
            if let Some(rows) = by_ref.get(key) {
                if rows.len() > 1 {
                    flags.push(Anomaly::DuplicateReference { rows: rows.clone() });
                }
            }
        }

        // Date gap: outside the window of every counterpart date.
        if let Some(date) = t.date {
            let nearest = counterparts
                .iter()
                .filter_map(|c| c.date.map(|cd| (date - cd).num_days()))
                .min_by_key(|off| off.unsigned_abs());
            if let Some(offset) = nearest {
                if offset.unsigned_abs() > u64::from(window_days) {
                    flags.push(Anomaly::DateGap { nearest_offset_days: offset });
                }
            }
        }

        if !flags.is_empty() {
            out.push(RecordAnomalies {
                source: t.source,
                row_index: t.row_index,
                reference: t.reference.clone(),
                flags,
            });
        }
    }

    out
}
