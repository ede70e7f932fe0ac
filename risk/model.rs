use crate::schema::{ConditionSchema, FeatureVector};
use crate::types::Condition;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use thiserror::Error;

// --- Public Data Structures ---
// These structs define the public, human-readable format of a risk model artifact
// when serialized to a TOML file.

/// Defines the link function, connecting the linear predictor to the model output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkFunction {
    /// The logit link: the output is a class-1 probability in (0, 1).
    Logit,
    /// The identity link: the output is the raw linear score. Legacy models
    /// exported this way are not confined to [0, 1].
    Identity,
}

/// The structural description of a model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub condition: Condition,
    pub link_function: LinkFunction,
    /// Column names in the exact order the weights were fitted against.
    pub feature_names: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Coefficients {
    pub intercept: f64,
    /// One weight per entry of `ModelConfig::feature_names`.
    pub weights: Vec<f64>,
}

/// A self-contained logistic risk model, saved to and loaded from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticModel {
    pub config: ModelConfig,
    pub coefficients: Coefficients,
}

/// Custom error type for model loading, saving, and prediction.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Failed to read or write model file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML model file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize model to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Model declares {weights} weights for {features} features.")]
    MismatchedWeightCount { weights: usize, features: usize },
    #[error(
        "{condition} model input does not match its schema: expected [{}], found [{}].",
        .expected.join(", "),
        .found.join(", ")
    )]
    SchemaMismatch {
        condition: Condition,
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("A model trained for {found} cannot be used as the {expected} model.")]
    ConditionMismatch { expected: Condition, found: Condition },
    #[error("{condition} model failed during prediction: {reason}")]
    Fault { condition: Condition, reason: String },
    #[error("{condition} model returned a non-finite score ({score}).")]
    NonFiniteScore { condition: Condition, score: f64 },
}

/// A pre-trained binary classifier, treated as a black box.
///
/// Implementations report the feature names they were trained on so the invoker
/// can verify the input contract once, at construction time.
pub trait Classifier: Send + Sync {
    fn feature_names(&self) -> &[String];

    /// The condition the classifier was trained for, when its artifact records one.
    fn condition(&self) -> Option<Condition> {
        None
    }

    /// Returns the class-1 probability or score for a single row.
    fn predict(&self, features: ArrayView1<f64>) -> Result<f64, ModelError>;
}

impl LogisticModel {
    /// Saves the model to a file in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        Ok(())
    }

    /// Loads a model from a TOML file and checks that weights and features line up.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let toml_string = fs::read_to_string(path)?;
        let model: Self = toml::from_str(&toml_string)?;
        model.check_dimensions()?;
        Ok(model)
    }

    fn check_dimensions(&self) -> Result<(), ModelError> {
        let features = self.config.feature_names.len();
        let weights = self.coefficients.weights.len();
        if features != weights {
            return Err(ModelError::MismatchedWeightCount { weights, features });
        }
        Ok(())
    }
}

impl Classifier for LogisticModel {
    fn feature_names(&self) -> &[String] {
        &self.config.feature_names
    }

    fn condition(&self) -> Option<Condition> {
        Some(self.config.condition)
    }

    fn predict(&self, features: ArrayView1<f64>) -> Result<f64, ModelError> {
        self.check_dimensions()?;
        if features.len() != self.coefficients.weights.len() {
            return Err(ModelError::SchemaMismatch {
                condition: self.config.condition,
                expected: self.config.feature_names.clone(),
                found: vec![format!("{} values", features.len())],
            });
        }

        let weights = ArrayView1::from(self.coefficients.weights.as_slice());
        let eta = self.coefficients.intercept + features.dot(&weights);

        let output = match self.config.link_function {
            LinkFunction::Logit => {
                // Clamp eta to prevent numerical overflow in exp()
                let eta_clamped = eta.clamp(-700.0, 700.0);
                1.0 / (1.0 + f64::exp(-eta_clamped))
            }
            LinkFunction::Identity => eta,
        };

        Ok(output)
    }
}

/// Wraps one condition's classifier behind a uniform, fault-isolated call.
pub struct ModelInvoker {
    condition: Condition,
    schema: &'static ConditionSchema,
    classifier: Box<dyn Classifier>,
}

impl ModelInvoker {
    /// Binds a classifier to a condition. The classifier's declared feature names
    /// must match the condition schema exactly, including order, and a classifier
    /// that records its own condition must record this one.
    pub fn new(condition: Condition, classifier: Box<dyn Classifier>) -> Result<Self, ModelError> {
        if let Some(found) = classifier.condition() {
            if found != condition {
                return Err(ModelError::ConditionMismatch {
                    expected: condition,
                    found,
                });
            }
        }

        let schema = ConditionSchema::for_condition(condition);
        let expected: Vec<&str> = schema.feature_names().collect();
        let found = classifier.feature_names();

        if found.len() != expected.len() || found.iter().zip(&expected).any(|(f, e)| f != e) {
            return Err(ModelError::SchemaMismatch {
                condition,
                expected: expected.into_iter().map(str::to_string).collect(),
                found: found.to_vec(),
            });
        }

        Ok(Self {
            condition,
            schema,
            classifier,
        })
    }

    pub fn condition(&self) -> Condition {
        self.condition
    }

    /// Returns the classifier's raw output for one feature vector.
    ///
    /// Shape errors, classifier errors and classifier panics all come back as a
    /// `ModelError` for this condition.
    pub fn predict(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        if features.condition != self.condition || features.values.len() != self.schema.len() {
            return Err(ModelError::SchemaMismatch {
                condition: self.condition,
                expected: self.schema.feature_names().map(str::to_string).collect(),
                found: vec![format!(
                    "{} values built for {}",
                    features.values.len(),
                    features.condition
                )],
            });
        }

        let view = features.values.view();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.classifier.predict(view)));

        match outcome {
            Ok(Ok(raw)) => {
                log::debug!("{} raw model output: {raw}", self.condition);
                Ok(raw)
            }
            Ok(Err(err @ ModelError::SchemaMismatch { .. })) => Err(err),
            Ok(Err(err)) => Err(ModelError::Fault {
                condition: self.condition,
                reason: err.to_string(),
            }),
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "classifier panicked".to_string());
                Err(ModelError::Fault {
                    condition: self.condition,
                    reason,
                })
            }
        }
    }
}

impl std::fmt::Debug for ModelInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelInvoker")
            .field("condition", &self.condition)
            .field("features", &self.schema.len())
            .finish()
    }
}
