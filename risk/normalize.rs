//! # Probability Normalization
//!
//! Converts whatever a condition's model returned into a canonical probability in
//! [0, 1], and holds the pre-inference override rules that bypass a model when an
//! input marker sits outside the range the model can be trusted on.
//!
//! The outward-facing number is a percentage, so out-of-range scores are clamped
//! to the nearest bound instead of being rejected. A NaN carries no ordering
//! information and is reported as a model error.

use crate::model::ModelError;
use crate::types::{Attribute, AttributeKind, AttributeValue, Condition, Submission};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A probability guaranteed to lie in [0, 1]. The full `f64` precision is kept;
/// rounding only happens when formatting.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Probability(f64);

impl Probability {
    pub const ZERO: Probability = Probability(0.0);
    pub const ONE: Probability = Probability(1.0);

    /// Returns `None` unless `value` is a number in [0, 1]. Negative zero is
    /// stored as positive zero.
    pub fn new(value: f64) -> Option<Self> {
        (0.0..=1.0)
            .contains(&value)
            .then_some(Self(value + 0.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn as_percent(self) -> f64 {
        self.0 * 100.0
    }
}

impl fmt::Display for Probability {
    /// Two-decimal percentage, e.g. `12.34%`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}%", self.as_percent())
    }
}

/// Clamps a raw model score into [0, 1]. Infinities clamp to the nearest bound.
pub fn clamp_probability(condition: Condition, raw: f64) -> Result<Probability, ModelError> {
    if raw.is_nan() {
        return Err(ModelError::NonFiniteScore {
            condition,
            score: raw,
        });
    }
    // Adding positive zero turns -0.0 into 0.0 and leaves every other value alone.
    let clamped = raw.clamp(0.0, 1.0) + 0.0;
    if clamped != raw {
        log::warn!("{condition} model returned {raw}, clamped to {clamped}");
    }
    Ok(Probability(clamped))
}

/// The comparison an override rule applies to its attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Threshold {
    Below(f64),
    AtOrAbove(f64),
}

impl Threshold {
    fn matches(self, value: f64) -> bool {
        match self {
            Threshold::Below(limit) => value < limit,
            Threshold::AtOrAbove(limit) => value >= limit,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Threshold::Below(limit) => write!(f, "< {limit}"),
            Threshold::AtOrAbove(limit) => write!(f, ">= {limit}"),
        }
    }
}

/// One row of the override table: when `attribute` meets `threshold` the model is
/// skipped and `probability` is reported instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    pub attribute: Attribute,
    pub threshold: Threshold,
    pub probability: f64,
}

impl OverrideRule {
    /// Rules must target a numeric attribute and assign a probability in [0, 1].
    pub fn check(&self) -> Result<Probability, String> {
        if self.attribute.kind() != AttributeKind::Numeric {
            return Err(format!(
                "override rules apply to numeric attributes, '{}' is not numeric",
                self.attribute
            ));
        }
        Probability::new(self.probability).ok_or_else(|| {
            format!(
                "override probability {} for '{}' is outside [0, 1]",
                self.probability, self.attribute
            )
        })
    }
}

/// The HbA1c rules applied to the diabetes model by default. Below 4.0 % the
/// model is outside its training distribution; 6.5 % is the diagnostic threshold.
pub fn default_diabetes_overrides() -> Vec<OverrideRule> {
    vec![
        OverrideRule {
            attribute: Attribute::Hba1cLevel,
            threshold: Threshold::Below(4.0),
            probability: 0.0,
        },
        OverrideRule {
            attribute: Attribute::Hba1cLevel,
            threshold: Threshold::AtOrAbove(6.5),
            probability: 1.0,
        },
    ]
}

/// Per-condition normalization: an ordered override table followed by clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationPolicy {
    condition: Condition,
    overrides: Vec<OverrideRule>,
}

impl NormalizationPolicy {
    pub fn new(condition: Condition, overrides: Vec<OverrideRule>) -> Result<Self, String> {
        for rule in &overrides {
            rule.check()?;
        }
        Ok(Self {
            condition,
            overrides,
        })
    }

    /// The stock policy for a condition: diabetes gets the HbA1c rules, the other
    /// conditions only clamp.
    pub fn standard(condition: Condition) -> Self {
        let overrides = match condition {
            Condition::Diabetes => default_diabetes_overrides(),
            Condition::Cardiovascular | Condition::Stroke => Vec::new(),
        };
        Self {
            condition,
            overrides,
        }
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    pub fn overrides(&self) -> &[OverrideRule] {
        &self.overrides
    }

    /// Returns the fixed probability of the first matching rule, if any. Must be
    /// consulted before the model is invoked.
    pub fn pre_inference(&self, submission: &Submission) -> Option<Probability> {
        self.overrides.iter().find_map(|rule| {
            let AttributeValue::Numeric(value) = submission.value(rule.attribute) else {
                return None;
            };
            if !rule.threshold.matches(value) {
                return None;
            }
            log::info!(
                "{} override: {} {} ({value}), model bypassed",
                self.condition,
                rule.attribute,
                rule.threshold
            );
            Probability::new(rule.probability)
        })
    }

    pub fn normalize(&self, raw: f64) -> Result<Probability, ModelError> {
        clamp_probability(self.condition, raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::jane;

    #[test]
    fn in_range_scores_pass_through_unchanged() {
        for raw in [0.0, 1e-12, 0.123456789, 0.5, 1.0 - 1e-12, 1.0] {
            let p = clamp_probability(Condition::Stroke, raw).unwrap();
            assert_eq!(p.value(), raw);
        }
    }

    #[test]
    fn out_of_range_scores_clamp_to_nearest_bound() {
        let clamp = |raw| clamp_probability(Condition::Cardiovascular, raw).unwrap().value();
        assert_eq!(clamp(-0.2), 0.0);
        assert_eq!(clamp(-1e300), 0.0);
        assert_eq!(clamp(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp(1.0000001), 1.0);
        assert_eq!(clamp(42.0), 1.0);
        assert_eq!(clamp(f64::INFINITY), 1.0);
    }

    #[test]
    fn negative_zero_is_reported_as_zero() {
        let p = clamp_probability(Condition::Stroke, -0.0).unwrap();
        assert!(!p.value().is_sign_negative());
        assert_eq!(p.to_string(), "0.00%");
        assert_eq!(p.value().to_string(), "0");

        let q = Probability::new(-0.0).unwrap();
        assert!(!q.value().is_sign_negative());
        assert_eq!(q, Probability::ZERO);
    }

    #[test]
    fn nan_score_is_a_model_error() {
        let err = clamp_probability(Condition::Diabetes, f64::NAN).unwrap_err();
        assert!(matches!(
            err,
            ModelError::NonFiniteScore {
                condition: Condition::Diabetes,
                ..
            }
        ));
    }

    #[test]
    fn percentage_formatting_uses_two_decimals() {
        assert_eq!(Probability::new(0.123456).unwrap().to_string(), "12.35%");
        assert_eq!(Probability::ZERO.to_string(), "0.00%");
        assert_eq!(Probability::ONE.to_string(), "100.00%");
        assert_eq!(Probability::new(0.123456).unwrap().value(), 0.123456);
    }

    #[test]
    fn probability_constructor_rejects_out_of_range() {
        assert!(Probability::new(-0.01).is_none());
        assert!(Probability::new(1.01).is_none());
        assert!(Probability::new(f64::NAN).is_none());
    }

    #[test]
    fn diabetes_hba1c_rules_short_circuit() {
        let policy = NormalizationPolicy::standard(Condition::Diabetes);
        let mut submission = jane();

        submission.hba1c_level = 2.0;
        assert_eq!(policy.pre_inference(&submission), Some(Probability::ZERO));

        submission.hba1c_level = 7.0;
        assert_eq!(policy.pre_inference(&submission), Some(Probability::ONE));

        submission.hba1c_level = 6.5;
        assert_eq!(policy.pre_inference(&submission), Some(Probability::ONE));

        submission.hba1c_level = 5.0;
        assert_eq!(policy.pre_inference(&submission), None);

        submission.hba1c_level = 4.0;
        assert_eq!(policy.pre_inference(&submission), None);
    }

    #[test]
    fn other_conditions_have_no_overrides_by_default() {
        let mut submission = jane();
        submission.hba1c_level = 9.0;
        for condition in [Condition::Cardiovascular, Condition::Stroke] {
            let policy = NormalizationPolicy::standard(condition);
            assert!(policy.overrides().is_empty());
            assert_eq!(policy.pre_inference(&submission), None);
        }
    }

    #[test]
    fn first_matching_rule_wins() {
        let policy = NormalizationPolicy::new(
            Condition::Stroke,
            vec![
                OverrideRule {
                    attribute: Attribute::Age,
                    threshold: Threshold::AtOrAbove(40.0),
                    probability: 0.25,
                },
                OverrideRule {
                    attribute: Attribute::Age,
                    threshold: Threshold::AtOrAbove(30.0),
                    probability: 0.75,
                },
            ],
        )
        .unwrap();
        assert_eq!(policy.pre_inference(&jane()).map(Probability::value), Some(0.25));
    }

    #[test]
    fn rules_on_labels_or_bad_probabilities_are_rejected() {
        let on_label = OverrideRule {
            attribute: Attribute::Glucose,
            threshold: Threshold::Below(1.0),
            probability: 0.0,
        };
        assert!(NormalizationPolicy::new(Condition::Diabetes, vec![on_label]).is_err());

        let too_high = OverrideRule {
            attribute: Attribute::Bmi,
            threshold: Threshold::AtOrAbove(45.0),
            probability: 100.0,
        };
        assert!(NormalizationPolicy::new(Condition::Diabetes, vec![too_high]).is_err());
    }
}
