use serde::{Deserialize, Serialize};

use crate::error::ReconError;
use crate::model::SourceId;
use crate::rule::{CompiledRule, RuleKind};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    pub name: String,
    #[serde(default)]
    pub matching: Matching,
    pub min_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_a: Option<SourceConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_b: Option<SourceConfig>,
    pub rules: Vec<RuleConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub normalize: Option<NormalizeConfig>,
}

/// Assignment discipline. Only one-to-one is supported; any other TOML value
/// fails deserialization, which is the required configuration error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Matching {
    OneToOne,
}

impl Default for Matching {
    fn default() -> Self {
        Self::OneToOne
    }
}

/// Where the CLI finds a source file. The engine itself never reads files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// Optional normalization pre-pass applied to both tables before matching.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizeConfig {
    pub columns: Vec<String>,
    #[serde(default = "default_normalize_threshold")]
    pub threshold: f64,
}

fn default_normalize_threshold() -> f64 {
    0.85
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Exact,
    ToleranceNumeric,
    ToleranceDate,
    SimilarText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericMode {
    Fixed,
    Percentage,
}

/// One comparison rule as written in config. Mode-specific parameters are
/// optional here and checked by `validate`; `compile` turns the rule into
/// the closed `RuleKind` variant the evaluator matches on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleConfig {
    pub column_a: String,
    pub column_b: String,
    pub match_type: MatchType,
    pub weight: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tolerance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<NumericMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
}

// ---------------------------------------------------------------------------
// Parse + Validate + Compile
// ---------------------------------------------------------------------------

impl MatchConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: MatchConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Intrinsic checks: rule parameters, weight sum, threshold ranges.
    /// Column existence is checked separately once headers are known.
    pub fn validate(&self) -> Result<(), ReconError> {
        if self.rules.is_empty() {
            return Err(ReconError::ConfigValidation(
                "at least one rule is required".into(),
            ));
        }

        if !self.min_confidence.is_finite() || !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ReconError::ConfigValidation(format!(
                "min_confidence must be in [0,1], got {}",
                self.min_confidence
            )));
        }

        for (i, rule) in self.rules.iter().enumerate() {
            if !rule.weight.is_finite() || rule.weight < 0.0 {
                return Err(ReconError::InvalidRule {
                    index: i,
                    field: "weight",
                    message: format!("must be a non-negative number, got {}", rule.weight),
                });
            }

            match rule.match_type {
                MatchType::Exact => {}
                MatchType::ToleranceNumeric => {
                    let t = rule.tolerance.ok_or(ReconError::InvalidRule {
                        index: i,
                        field: "tolerance",
                        message: "required for tolerance_numeric".into(),
                    })?;
                    if !t.is_finite() || t < 0.0 {
                        return Err(ReconError::InvalidRule {
                            index: i,
                            field: "tolerance",
                            message: format!("must be >= 0, got {t}"),
                        });
                    }
                }
                MatchType::ToleranceDate => {
                    let t = rule.tolerance.ok_or(ReconError::InvalidRule {
                        index: i,
                        field: "tolerance",
                        message: "required for tolerance_date (day count)".into(),
                    })?;
                    if !t.is_finite() || t < 0.0 || t.fract() != 0.0 || t > u32::MAX as f64 {
                        return Err(ReconError::InvalidRule {
                            index: i,
                            field: "tolerance",
                            message: format!("must be a whole day count >= 0, got {t}"),
                        });
                    }
                }
                MatchType::SimilarText => {
                    let t = rule.threshold.ok_or(ReconError::InvalidRule {
                        index: i,
                        field: "threshold",
                        message: "required for similar_text".into(),
                    })?;
                    if !t.is_finite() || !(0.0..=1.0).contains(&t) {
                        return Err(ReconError::InvalidRule {
                            index: i,
                            field: "threshold",
                            message: format!("must be in [0,1], got {t}"),
                        });
                    }
                }
            }
        }

        let weight_sum: f64 = self.rules.iter().map(|r| r.weight).sum();
        if weight_sum <= 0.0 {
            return Err(ReconError::ConfigValidation(
                "rule weights must not all be zero".into(),
            ));
        }

        Ok(())
    }

    /// Every rule must reference an existing column on each side.
    pub fn validate_columns(
        &self,
        headers_a: &[String],
        headers_b: &[String],
    ) -> Result<(), ReconError> {
        for (i, rule) in self.rules.iter().enumerate() {
            if !headers_a.iter().any(|h| h == &rule.column_a) {
                return Err(ReconError::UnknownColumn {
                    side: SourceId::A,
                    rule: i,
                    column: rule.column_a.clone(),
                });
            }
            if !headers_b.iter().any(|h| h == &rule.column_b) {
                return Err(ReconError::UnknownColumn {
                    side: SourceId::B,
                    rule: i,
                    column: rule.column_b.clone(),
                });
            }
        }
        Ok(())
    }

    /// Validate and lower every rule into its evaluator form.
    pub fn compile(&self) -> Result<Vec<CompiledRule>, ReconError> {
        self.validate()?;

        Ok(self
            .rules
            .iter()
            .map(|rule| {
                let kind = match rule.match_type {
                    MatchType::Exact => RuleKind::Exact,
                    MatchType::ToleranceNumeric => RuleKind::ToleranceNumeric {
                        tolerance: rule.tolerance.unwrap_or(0.0),
                        mode: rule.mode.unwrap_or(NumericMode::Fixed),
                    },
                    MatchType::ToleranceDate => RuleKind::ToleranceDate {
                        days: rule.tolerance.unwrap_or(0.0) as u32,
                    },
                    MatchType::SimilarText => RuleKind::SimilarText {
                        threshold: rule.threshold.unwrap_or(0.0),
                    },
                };
                CompiledRule {
                    column_a: rule.column_a.clone(),
                    column_b: rule.column_b.clone(),
                    weight: rule.weight,
                    kind,
                }
            })
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
