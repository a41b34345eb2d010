use crate::model::{MatchResult, Transaction};
use crate::rule::CompiledRule;
use crate::score::{aggregate, ConfidenceLabel};

// ---------------------------------------------------------------------------
// One-to-one assignment
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Assignment {
    /// Accepted pairings, in acceptance order (confidence descending,
    /// ties by A row index then B row index).
    pub matched: Vec<MatchResult>,
    /// Unclaimed records, in original row order.
    pub unmatched_a: Vec<Transaction>,
    pub unmatched_b: Vec<Transaction>,
}

#[derive(Debug)]
struct Candidate {
    a_idx: usize,
    b_idx: usize,
    confidence: f64,
    rule_scores: Vec<f64>,
}

/// Greedy approximation to maximum-weight bipartite matching under the
/// one-to-one constraint and the confidence floor.
///
/// Candidates are generated one A row at a time, sorted globally, then
/// accepted greedily while both rows are unclaimed. Not guaranteed optimal
/// on adversarial inputs, but O(n*m*log(n*m)) with stable, explainable
/// output: ties always resolve to the lower A row index, then lower B row
/// index. The acceptance pass is inherently sequential.
pub fn assign_one_to_one(
    rules: &[CompiledRule],
    min_confidence: f64,
    txns_a: &[Transaction],
    txns_b: &[Transaction],
) -> Assignment {
    let mut candidates = Vec::new();

    for (a_idx, a) in txns_a.iter().enumerate() {
        for (b_idx, b) in txns_b.iter().enumerate() {
            let Some((confidence, rule_scores)) = aggregate(rules, a, b) else {
                continue;
            };
            // Floor is inclusive: a pair exactly at min_confidence is kept.
            if confidence >= min_confidence {
                candidates.push(Candidate { a_idx, b_idx, confidence, rule_scores });
            }
        }
    }

    // Scores are weighted means of [0,1] rule scores, so never NaN; the
    // Equal fallback is unreachable but keeps the comparator total.
    candidates.sort_by(|x, y| {
        y.confidence
            .partial_cmp(&x.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(x.a_idx.cmp(&y.a_idx))
            .then(x.b_idx.cmp(&y.b_idx))
    });

    let mut claimed_a = vec![false; txns_a.len()];
    let mut claimed_b = vec![false; txns_b.len()];
    let mut matched = Vec::new();

    for cand in candidates {
        if claimed_a[cand.a_idx] || claimed_b[cand.b_idx] {
            continue;
        }
        claimed_a[cand.a_idx] = true;
        claimed_b[cand.b_idx] = true;
        matched.push(MatchResult {
            transactions_a: vec![txns_a[cand.a_idx].clone()],
            transactions_b: vec![txns_b[cand.b_idx].clone()],
            confidence: cand.confidence,
            label: ConfidenceLabel::from_score(cand.confidence),
            rule_scores: cand.rule_scores,
        });
    }

    let unmatched_a = txns_a
        .iter()
        .enumerate()
        .filter(|(i, _)| !claimed_a[*i])
        .map(|(_, t)| t.clone())
        .collect();
    let unmatched_b = txns_b
        .iter()
        .enumerate()
        .filter(|(i, _)| !claimed_b[*i])
        .map(|(_, t)| t.clone())
        .collect();

    Assignment { matched, unmatched_a, unmatched_b }
}
