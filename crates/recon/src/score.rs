use serde::Serialize;

use crate::model::Transaction;
use crate::rule::{evaluate, CompiledRule};

// ---------------------------------------------------------------------------
// Confidence labels
// ---------------------------------------------------------------------------

/// Discrete tier for presentation. Assignment decisions never consult it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLabel {
    High,
    Medium,
    Low,
}

impl ConfidenceLabel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.85 {
            Self::High
        } else if score >= 0.6 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl std::fmt::Display for ConfidenceLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "high"),
            Self::Medium => write!(f, "medium"),
            Self::Low => write!(f, "low"),
        }
    }
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Weighted mean of per-rule scores for one candidate pair.
///
/// Restricted to rules whose columns exist on both records; a rule whose
/// column is absent contributes neither score nor weight. Returns None when
/// no rule applies or the applicable weight sum is zero — such a pair is not
/// a matching candidate. The score vector is aligned with the config's rule
/// order (inapplicable rules recorded as 0.0).
pub fn aggregate(rules: &[CompiledRule], a: &Transaction, b: &Transaction) -> Option<(f64, Vec<f64>)> {
    let mut weighted_sum = 0.0;
    let mut weight_sum = 0.0;
    let mut scores = Vec::with_capacity(rules.len());

    for rule in rules {
        let (va, vb) = match (a.field(&rule.column_a), b.field(&rule.column_b)) {
            (Some(va), Some(vb)) => (va, vb),
            _ => {
                scores.push(0.0);
                continue;
            }
        };
        let score = evaluate(&rule.kind, va, vb);
        scores.push(score);
        weighted_sum += rule.weight * score;
        weight_sum += rule.weight;
    }

    if weight_sum <= 0.0 {
        return None;
    }
    Some((weighted_sum / weight_sum, scores))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SourceId;
    use crate::rule::RuleKind;

    fn txn(raw: &[(&str, &str)]) -> Transaction {
        Transaction {
            source: SourceId::A,
            row_index: 0,
            amount: None,
            date: None,
            reference: None,
            raw: raw
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn exact_rule(col: &str, weight: f64) -> CompiledRule {
        CompiledRule {
            column_a: col.into(),
            column_b: col.into(),
            weight,
            kind: RuleKind::Exact,
        }
    }

    #[test]
    fn weighted_mean_of_rule_scores() {
        let rules = vec![exact_rule("Ref", 0.6), exact_rule("Kind", 0.4)];
        let a = txn(&[("Ref", "INV1"), ("Kind", "payment")]);
        let b = txn(&[("Ref", "INV1"), ("Kind", "deposit")]);

        let (conf, scores) = aggregate(&rules, &a, &b).unwrap();
        assert_eq!(scores, vec![1.0, 0.0]);
        assert!((conf - 0.6).abs() < 1e-12);
    }

    #[test]
    fn missing_column_excluded_from_denominator() {
        let rules = vec![exact_rule("Ref", 0.6), exact_rule("Kind", 0.4)];
        let a = txn(&[("Ref", "INV1")]);
        let b = txn(&[("Ref", "INV1"), ("Kind", "deposit")]);

        // Only the Ref rule applies; its full weight carries the mean.
        let (conf, scores) = aggregate(&rules, &a, &b).unwrap();
        assert_eq!(scores, vec![1.0, 0.0]);
        assert_eq!(conf, 1.0);
    }

    #[test]
    fn no_applicable_rules_yields_none() {
        let rules = vec![exact_rule("Ref", 1.0)];
        let a = txn(&[("Other", "x")]);
        let b = txn(&[("Other", "x")]);
        assert!(aggregate(&rules, &a, &b).is_none());
    }

    #[test]
    fn labels() {
        assert_eq!(ConfidenceLabel::from_score(1.0), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.85), ConfidenceLabel::High);
        assert_eq!(ConfidenceLabel::from_score(0.7), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.6), ConfidenceLabel::Medium);
        assert_eq!(ConfidenceLabel::from_score(0.59), ConfidenceLabel::Low);
    }
}
