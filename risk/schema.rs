//! # Feature Schema Adapter
//!
//! Each condition's model was trained on a different subset, naming and ordering of
//! the same underlying attributes. This module holds those contracts as static
//! tables and turns a submission into the exact feature vector a model expects.
//!
//! - Strict Schema: feature names and order are fixed per condition and are checked
//!   against the loaded model before any prediction is made.
//! - Scoped Encodings: every categorical feature carries the encoding table of its
//!   own condition. The stroke model, for example, codes `Urban` as 0.

use crate::encode::{EncodingLookupError, EncodingTable, encode};
use crate::types::{Attribute, AttributeKind, AttributeValue, Condition, Submission};
use ndarray::Array1;
use thiserror::Error;

/// How a feature value is derived from its attribute.
#[derive(Debug, Clone, Copy)]
pub enum FeatureSource {
    /// Numeric attribute passed through unchanged.
    Passthrough,
    /// Categorical or flag attribute mapped through the given table.
    Encoded(&'static EncodingTable),
}

/// One column of a model's input.
#[derive(Debug, Clone, Copy)]
pub struct FeatureSpec {
    /// The column name the model was trained with.
    pub name: &'static str,
    pub attribute: Attribute,
    pub source: FeatureSource,
}

/// The full input contract of one condition's model.
#[derive(Debug)]
pub struct ConditionSchema {
    pub condition: Condition,
    pub features: &'static [FeatureSpec],
}

/// A feature vector ready for one condition's model. Values are stored in the
/// schema's order.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    pub condition: Condition,
    pub values: Array1<f64>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FeatureError {
    #[error("{condition} model input: {source}")]
    Encoding {
        condition: Condition,
        #[source]
        source: EncodingLookupError,
    },
    #[error(
        "Internal error: {condition} feature '{feature}' is declared as {declared} but attribute '{attribute}' is {actual:?}."
    )]
    SchemaMismatch {
        condition: Condition,
        feature: &'static str,
        attribute: Attribute,
        declared: &'static str,
        actual: AttributeKind,
    },
}

const fn passthrough(name: &'static str, attribute: Attribute) -> FeatureSpec {
    FeatureSpec {
        name,
        attribute,
        source: FeatureSource::Passthrough,
    }
}

const fn encoded(
    name: &'static str,
    attribute: Attribute,
    table: &'static EncodingTable,
) -> FeatureSpec {
    FeatureSpec {
        name,
        attribute,
        source: FeatureSource::Encoded(table),
    }
}

/// Encoding tables of the cardiovascular model.
pub mod cardiovascular {
    use crate::encode::EncodingTable;

    pub static GENDER: EncodingTable = EncodingTable::new("gender", &[("Male", 1), ("Female", 0)]);
    pub static CHOLESTEROL: EncodingTable = EncodingTable::new(
        "cholesterol",
        &[("Normal", 0), ("Above Normal", 1), ("Well Above Normal", 2)],
    );
    pub static GLUCOSE: EncodingTable = EncodingTable::new(
        "glucose",
        &[("Normal", 0), ("Above Normal", 1), ("Well Above Normal", 2)],
    );
    pub static SMOKING_STATUS: EncodingTable = EncodingTable::new(
        "smoking status",
        &[("Never smoked", 0), ("Formerly smoked", 1), ("Smokes", 2)],
    );
    pub static YES_NO: EncodingTable = EncodingTable::new("yes/no", &[("Yes", 1), ("No", 0)]);
}

/// Encoding tables of the stroke model.
pub mod stroke {
    use crate::encode::EncodingTable;

    pub static GENDER: EncodingTable = EncodingTable::new("gender", &[("Male", 1), ("Female", 0)]);
    pub static WORK_TYPE: EncodingTable = EncodingTable::new(
        "work type",
        &[
            ("Private", 0),
            ("Self-employed", 1),
            ("Govt_job", 2),
            ("children", 3),
            ("Never_worked", 4),
        ],
    );
    pub static RESIDENCE_TYPE: EncodingTable =
        EncodingTable::new("residence type", &[("Urban", 0), ("Rural", 1)]);
    pub static GLUCOSE: EncodingTable = EncodingTable::new(
        "glucose",
        &[("Normal", 0), ("Above Normal", 1), ("Well Above Normal", 2)],
    );
    pub static SMOKING_STATUS: EncodingTable = EncodingTable::new(
        "smoking status",
        &[("Never smoked", 0), ("Formerly smoked", 1), ("Smokes", 2)],
    );
    pub static YES_NO: EncodingTable = EncodingTable::new("yes/no", &[("Yes", 1), ("No", 0)]);
}

/// Encoding tables of the diabetes model.
pub mod diabetes {
    use crate::encode::EncodingTable;

    pub static GENDER: EncodingTable = EncodingTable::new("gender", &[("Male", 1), ("Female", 0)]);
    pub static GLUCOSE: EncodingTable = EncodingTable::new(
        "glucose",
        &[("Normal", 0), ("Above Normal", 1), ("Well Above Normal", 2)],
    );
    pub static SMOKING_STATUS: EncodingTable = EncodingTable::new(
        "smoking status",
        &[("Never smoked", 0), ("Formerly smoked", 1), ("Smokes", 2)],
    );
    pub static YES_NO: EncodingTable = EncodingTable::new("yes/no", &[("Yes", 1), ("No", 0)]);
}

static CARDIOVASCULAR_FEATURES: [FeatureSpec; 7] = [
    passthrough("Age", Attribute::Age),
    encoded("Gender", Attribute::Gender, &cardiovascular::GENDER),
    encoded("Cholesterol", Attribute::Cholesterol, &cardiovascular::CHOLESTEROL),
    encoded("Glucose", Attribute::Glucose, &cardiovascular::GLUCOSE),
    encoded("Smoking_Status", Attribute::SmokingStatus, &cardiovascular::SMOKING_STATUS),
    encoded("Alcohol Intake", Attribute::AlcoholIntake, &cardiovascular::YES_NO),
    encoded("Physical Activity", Attribute::PhysicalActivity, &cardiovascular::YES_NO),
];

static STROKE_FEATURES: [FeatureSpec; 10] = [
    encoded("Gender", Attribute::Gender, &stroke::GENDER),
    passthrough("Age", Attribute::Age),
    encoded("Hypertension", Attribute::Hypertension, &stroke::YES_NO),
    encoded("Heart_disease", Attribute::HeartDisease, &stroke::YES_NO),
    encoded("Ever_Married", Attribute::EverMarried, &stroke::YES_NO),
    encoded("Work_Type", Attribute::WorkType, &stroke::WORK_TYPE),
    encoded("Residence_Type", Attribute::ResidenceType, &stroke::RESIDENCE_TYPE),
    encoded("Glucose", Attribute::Glucose, &stroke::GLUCOSE),
    passthrough("BMI", Attribute::Bmi),
    encoded("Smoking_Status", Attribute::SmokingStatus, &stroke::SMOKING_STATUS),
];

static DIABETES_FEATURES: [FeatureSpec; 8] = [
    encoded("Gender", Attribute::Gender, &diabetes::GENDER),
    passthrough("Age", Attribute::Age),
    encoded("Hypertension", Attribute::Hypertension, &diabetes::YES_NO),
    encoded("Heart_disease", Attribute::HeartDisease, &diabetes::YES_NO),
    encoded("Smoking_Status", Attribute::SmokingStatus, &diabetes::SMOKING_STATUS),
    passthrough("BMI", Attribute::Bmi),
    passthrough("HbA1c_level", Attribute::Hba1cLevel),
    encoded("Glucose", Attribute::Glucose, &diabetes::GLUCOSE),
];

static CARDIOVASCULAR_SCHEMA: ConditionSchema = ConditionSchema {
    condition: Condition::Cardiovascular,
    features: &CARDIOVASCULAR_FEATURES,
};

static STROKE_SCHEMA: ConditionSchema = ConditionSchema {
    condition: Condition::Stroke,
    features: &STROKE_FEATURES,
};

static DIABETES_SCHEMA: ConditionSchema = ConditionSchema {
    condition: Condition::Diabetes,
    features: &DIABETES_FEATURES,
};

impl ConditionSchema {
    pub fn for_condition(condition: Condition) -> &'static ConditionSchema {
        match condition {
            Condition::Cardiovascular => &CARDIOVASCULAR_SCHEMA,
            Condition::Stroke => &STROKE_SCHEMA,
            Condition::Diabetes => &DIABETES_SCHEMA,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Model column names in the order the model expects them.
    pub fn feature_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.features.iter().map(|spec| spec.name)
    }

    /// Builds this condition's model input from a submission.
    ///
    /// Numeric attributes pass through unchanged and every categorical attribute is
    /// encoded with this condition's own table. An unknown label aborts the vector
    /// for this condition only.
    pub fn build_feature_vector(
        &self,
        submission: &Submission,
    ) -> Result<FeatureVector, FeatureError> {
        let mut values = Vec::with_capacity(self.features.len());

        for spec in self.features {
            let value = match (spec.source, submission.value(spec.attribute)) {
                (FeatureSource::Passthrough, AttributeValue::Numeric(v)) => v,
                (FeatureSource::Encoded(table), AttributeValue::Label(label)) => {
                    encode(label, table).map_err(|source| {
                        log::debug!(
                            "{} feature '{}' rejected '{label}' against {table}",
                            self.condition,
                            spec.name
                        );
                        FeatureError::Encoding {
                            condition: self.condition,
                            source,
                        }
                    })? as f64
                }
                (source, _) => {
                    return Err(FeatureError::SchemaMismatch {
                        condition: self.condition,
                        feature: spec.name,
                        attribute: spec.attribute,
                        declared: match source {
                            FeatureSource::Passthrough => "numeric",
                            FeatureSource::Encoded(_) => "encoded",
                        },
                        actual: spec.attribute.kind(),
                    });
                }
            };
            values.push(value);
        }

        log::debug!(
            "{} feature vector: {:?}",
            self.condition,
            self.feature_names().zip(values.iter()).collect::<Vec<_>>()
        );

        Ok(FeatureVector {
            condition: self.condition,
            values: Array1::from_vec(values),
        })
    }
}
