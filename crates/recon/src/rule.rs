use chrono::NaiveDate;

use crate::config::NumericMode;
use crate::similarity::{normalize_text, text_ratio};

// ---------------------------------------------------------------------------
// Compiled rules
// ---------------------------------------------------------------------------

/// A validated rule, lowered from `RuleConfig`. The evaluator matches
/// exhaustively on `RuleKind`; a new match type is one new variant plus one
/// new branch in `evaluate`.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub column_a: String,
    pub column_b: String,
    pub weight: f64,
    pub kind: RuleKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RuleKind {
    Exact,
    ToleranceNumeric { tolerance: f64, mode: NumericMode },
    ToleranceDate { days: u32 },
    SimilarText { threshold: f64 },
}

// ---------------------------------------------------------------------------
// Evaluation
// ---------------------------------------------------------------------------

/// Score one rule against one pair of column values, in [0,1].
///
/// A blank value on either side scores 0.0 for every kind: absence is never
/// treated as a match. Unparseable amounts and dates also score 0.0 rather
/// than aborting the run.
pub fn evaluate(kind: &RuleKind, a: &str, b: &str) -> f64 {
    if a.trim().is_empty() || b.trim().is_empty() {
        return 0.0;
    }

    match kind {
        RuleKind::Exact => {
            if normalize_text(a) == normalize_text(b) {
                1.0
            } else {
                0.0
            }
        }
        RuleKind::ToleranceNumeric { tolerance, mode } => {
            let (va, vb) = match (parse_amount(a), parse_amount(b)) {
                (Some(va), Some(vb)) => (va, vb),
                _ => return 0.0,
            };
            let diff = (va - vb).abs();
            let effective = match mode {
                NumericMode::Fixed => *tolerance,
                // Percent of the larger magnitude.
                NumericMode::Percentage => tolerance / 100.0 * va.abs().max(vb.abs()),
            };
            decay_score(diff, effective)
        }
        RuleKind::ToleranceDate { days } => {
            let (da, db) = match (parse_date(a), parse_date(b)) {
                (Some(da), Some(db)) => (da, db),
                _ => return 0.0,
            };
            let gap = (da - db).num_days().unsigned_abs();
            if gap <= u64::from(*days) {
                // Linear decay that keeps the inclusive boundary above zero:
                // gap == days scores 1/(days+1), gap > days scores 0.
                1.0 - gap as f64 / (f64::from(*days) + 1.0)
            } else {
                0.0
            }
        }
        RuleKind::SimilarText { threshold } => {
            let ratio = text_ratio(a, b);
            if ratio < *threshold {
                0.0
            } else {
                ratio
            }
        }
    }
}

/// 1.0 within tolerance, then linear decay reaching 0 at 2x tolerance.
/// The epsilon absorbs f64 subtraction noise so that a diff equal to the
/// tolerance (e.g. 100.01 vs 100.00 at 0.01) stays inside the boundary.
fn decay_score(diff: f64, tolerance: f64) -> f64 {
    const EPS: f64 = 1e-9;
    if diff <= tolerance + EPS {
        1.0
    } else if tolerance > 0.0 && diff < 2.0 * tolerance {
        (1.0 - (diff - tolerance) / tolerance).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Lenient parsing
// ---------------------------------------------------------------------------

/// Parse a decimal amount, tolerating currency symbols, thousands commas,
/// inner spaces, and accounting-style parentheses for negatives.
pub fn parse_amount(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }

    let (body, negate) = if trimmed.starts_with('(') && trimmed.ends_with(')') {
        (&trimmed[1..trimmed.len() - 1], true)
    } else {
        (trimmed, false)
    };

    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, '$' | '€' | '£' | ',' | ' '))
        .collect();

    let value: f64 = cleaned.parse().ok()?;
    if !value.is_finite() {
        return None;
    }
    Some(if negate { -value } else { value })
}

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
];

/// Parse a calendar date, ISO-8601 first, then common regional formats.
/// The format list is ordered, so ambiguous inputs resolve the same way on
/// every run.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
