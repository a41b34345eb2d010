use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Table;
use crate::score::ConfidenceLabel;
use crate::similarity::text_ratio;

// ---------------------------------------------------------------------------
// Suggestions
// ---------------------------------------------------------------------------

/// A proposed canonical rewrite for a group of near-duplicate values.
#[derive(Debug, Clone, Serialize)]
pub struct NormalizationSuggestion {
    pub canonical: String,
    pub variants: Vec<String>,
    /// Tier of the weakest in-group similarity.
    pub tier: ConfidenceLabel,
}

/// Group near-duplicate values of one column across both sources.
///
/// The most frequent value seeds each group and becomes its canonical form
/// (count ties break lexicographically, so output is deterministic). A value
/// joins a group when its similarity to the seed meets `threshold`. Only
/// groups with at least one variant are emitted. Pre-processing aid only —
/// assignment never sees this.
pub fn suggest_normalizations(
    column: &str,
    tables: &[&Table],
    threshold: f64,
) -> Vec<NormalizationSuggestion> {
    // Distinct values with occurrence counts, first-seen order preserved.
    let mut counts: Vec<(String, usize)> = Vec::new();
    for table in tables {
        let Some(idx) = table.headers.iter().position(|h| h == column) else {
            continue;
        };
        for row in &table.rows {
            let Some(value) = row.get(idx) else { continue };
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match counts.iter_mut().find(|(v, _)| v == value) {
                Some((_, n)) => *n += 1,
                None => counts.push((value.to_string(), 1)),
            }
        }
    }

    // Seed order: most frequent first, then lexicographic.
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&i, &j| {
        counts[j]
            .1
            .cmp(&counts[i].1)
            .then_with(|| counts[i].0.cmp(&counts[j].0))
    });

    let mut grouped = vec![false; counts.len()];
    let mut suggestions = Vec::new();

    for &seed in &order {
        if grouped[seed] {
            continue;
        }
        grouped[seed] = true;

        let mut variants = Vec::new();
        let mut weakest = 1.0_f64;
        for &other in &order {
            if grouped[other] {
                continue;
            }
            let ratio = text_ratio(&counts[seed].0, &counts[other].0);
            if ratio >= threshold {
                grouped[other] = true;
                variants.push(counts[other].0.clone());
                weakest = weakest.min(ratio);
            }
        }

        if !variants.is_empty() {
            suggestions.push(NormalizationSuggestion {
                canonical: counts[seed].0.clone(),
                variants,
                tier: ConfidenceLabel::from_score(weakest),
            });
        }
    }

    suggestions
}

// ---------------------------------------------------------------------------
// Mapping application
// ---------------------------------------------------------------------------

/// Variant -> canonical mapping for `apply_mapping`.
pub fn to_mapping(suggestions: &[NormalizationSuggestion]) -> BTreeMap<String, String> {
    let mut mapping = BTreeMap::new();
    for s in suggestions {
        for v in &s.variants {
            mapping.insert(v.clone(), s.canonical.clone());
        }
    }
    mapping
}

/// Rewrite every cell of `column` whose trimmed value appears in the
/// mapping. Run before matching; a record's raw value is all that changes.
pub fn apply_mapping(table: &mut Table, column: &str, mapping: &BTreeMap<String, String>) {
    let Some(idx) = table.headers.iter().position(|h| h == column) else {
        return;
    };
    for row in &mut table.rows {
        if let Some(cell) = row.get_mut(idx) {
            if let Some(canonical) = mapping.get(cell.trim()) {
                *cell = canonical.clone();
            }
        }
    }
}
