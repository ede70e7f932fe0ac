//! # Submission Pipeline
//!
//! One submission flows through validation, then each condition independently
//! (feature vector, override check, model, normalization), then the ledger. The
//! three conditions run on the rayon pool and share nothing mutable. A failure in
//! one condition is reported for that condition only, and a ledger failure never
//! hides the predictions that were computed.

use crate::ledger::{AppendReceipt, CsvSheetStore, Ledger, LedgerRecord, LedgerStore, StoreError};
use crate::model::{Classifier, LogisticModel, ModelError, ModelInvoker};
use crate::normalize::{NormalizationPolicy, Probability};
use crate::schema::{ConditionSchema, FeatureError};
use crate::shared::config::{AppConfig, ConfigError};
use crate::types::{Condition, Submission};
use crate::validate::{ValidatedSubmission, ValidationError, validate};
use rayon::prelude::*;
use thiserror::Error;

pub const SUBMITTED_MESSAGE: &str =
    "Your details and predictions have been successfully submitted!";

/// Why a single condition produced no probability.
#[derive(Error, Debug)]
pub enum ConditionError {
    #[error(transparent)]
    Feature(#[from] FeatureError),
    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Everything needed to turn a submission into one condition's probability.
#[derive(Debug)]
pub struct ConditionEngine {
    invoker: ModelInvoker,
    policy: NormalizationPolicy,
}

impl ConditionEngine {
    /// The classifier is bound to the policy's condition and must declare that
    /// condition's feature names in order.
    pub fn new(
        classifier: Box<dyn Classifier>,
        policy: NormalizationPolicy,
    ) -> Result<Self, ModelError> {
        let invoker = ModelInvoker::new(policy.condition(), classifier)?;
        Ok(Self { invoker, policy })
    }

    pub fn condition(&self) -> Condition {
        self.invoker.condition()
    }

    /// The feature vector is always built first, so a label the model cannot
    /// encode is reported even when an override rule would skip the model.
    pub fn evaluate(&self, submission: &Submission) -> Result<Probability, ConditionError> {
        let vector =
            ConditionSchema::for_condition(self.condition()).build_feature_vector(submission)?;
        if let Some(fixed) = self.policy.pre_inference(submission) {
            return Ok(fixed);
        }
        let raw = self.invoker.predict(&vector)?;
        Ok(self.policy.normalize(raw)?)
    }
}

#[derive(Debug)]
pub struct ConditionOutcome {
    pub condition: Condition,
    pub result: Result<Probability, ConditionError>,
}

impl ConditionOutcome {
    /// The line shown to the user, e.g. `Cardio Probability: 12.34%`.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(probability) => format!("{} Probability: {probability}", self.condition.label()),
            Err(err) => format!("{} Probability: unavailable ({err})", self.condition.label()),
        }
    }
}

/// The result of processing one accepted submission.
#[derive(Debug)]
pub struct SubmissionReport {
    pub submission: ValidatedSubmission,
    /// One outcome per condition, in `Condition::ALL` order.
    pub outcomes: Vec<ConditionOutcome>,
    pub persisted: Result<AppendReceipt, StoreError>,
}

impl SubmissionReport {
    pub fn probability(&self, condition: Condition) -> Option<Probability> {
        self.outcomes
            .iter()
            .find(|o| o.condition == condition)
            .and_then(|o| o.result.as_ref().ok().copied())
    }

    pub fn persistence_message(&self) -> String {
        match &self.persisted {
            Ok(_) => SUBMITTED_MESSAGE.to_string(),
            Err(err) => format!("Your predictions were computed but could not be saved: {err}"),
        }
    }

    /// Prediction lines followed by the persistence line.
    pub fn lines(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .map(ConditionOutcome::message)
            .chain(std::iter::once(self.persistence_message()))
            .collect()
    }
}

pub struct RiskEngine<S> {
    engines: Vec<ConditionEngine>,
    ledger: Ledger<S>,
}

impl RiskEngine<CsvSheetStore> {
    /// Loads every model artifact named in the configuration and opens the sheet.
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let mut engines = Vec::with_capacity(Condition::ALL.len());
        for condition in Condition::ALL {
            let path = config.models.path(condition);
            let model_error = |source| ConfigError::Model {
                condition,
                path: path.to_path_buf(),
                source,
            };
            let model = LogisticModel::load(path).map_err(model_error)?;
            log::info!(
                "Loaded {condition} model from '{}' ({} features)",
                path.display(),
                model.config.feature_names.len()
            );
            let policy = config.policy(condition)?;
            engines.push(ConditionEngine::new(Box::new(model), policy).map_err(model_error)?);
        }
        let ledger = Ledger::new(config.sheet_store(), config.read_ttl());
        Self::new(engines, ledger)
    }
}

impl<S: LedgerStore> RiskEngine<S> {
    /// Requires exactly one engine per condition.
    pub fn new(mut engines: Vec<ConditionEngine>, ledger: Ledger<S>) -> Result<Self, ConfigError> {
        for condition in Condition::ALL {
            match engines.iter().filter(|e| e.condition() == condition).count() {
                0 => return Err(ConfigError::MissingCondition(condition)),
                1 => {}
                _ => return Err(ConfigError::DuplicateCondition(condition)),
            }
        }
        engines.sort_by_key(|e| Condition::ALL.iter().position(|c| *c == e.condition()));
        Ok(Self { engines, ledger })
    }

    pub fn ledger(&self) -> &Ledger<S> {
        &self.ledger
    }

    /// Validates, predicts and records one submission.
    ///
    /// An `Err` means the submission was rejected before any model ran and nothing
    /// was written; the caller should re-prompt. Everything after validation is
    /// reported inside the `SubmissionReport`.
    pub fn process(&self, submission: Submission) -> Result<SubmissionReport, ValidationError> {
        let submission = validate(submission)?;

        let outcomes: Vec<ConditionOutcome> = self
            .engines
            .par_iter()
            .map(|engine| ConditionOutcome {
                condition: engine.condition(),
                result: engine.evaluate(&submission),
            })
            .collect();

        for outcome in &outcomes {
            match &outcome.result {
                Ok(p) => log::info!("{} probability: {p}", outcome.condition),
                Err(err) => log::error!("{} prediction failed: {err}", outcome.condition),
            }
        }

        let predictions: Vec<(Condition, Option<Probability>)> = outcomes
            .iter()
            .map(|o| (o.condition, o.result.as_ref().ok().copied()))
            .collect();
        let record = LedgerRecord::new(&submission, &predictions);

        let persisted = self.ledger.append(&record);
        if let Err(err) = &persisted {
            log::warn!("Submission was not recorded: {err}");
        }

        Ok(SubmissionReport {
            submission,
            outcomes,
            persisted,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerTable, MemoryStore};
    use crate::types::fixtures::jane;
    use ndarray::ArrayView1;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Scripted {
        names: Vec<String>,
        output: f64,
        calls: Arc<AtomicUsize>,
    }

    impl Classifier for Scripted {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn predict(&self, _: ArrayView1<f64>) -> Result<f64, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output)
        }
    }

    fn scripted(condition: Condition, output: f64, calls: &Arc<AtomicUsize>) -> ConditionEngine {
        let classifier = Scripted {
            names: ConditionSchema::for_condition(condition)
                .feature_names()
                .map(str::to_string)
                .collect(),
            output,
            calls: Arc::clone(calls),
        };
        ConditionEngine::new(Box::new(classifier), NormalizationPolicy::standard(condition))
            .unwrap()
    }

    fn engine_with<S: LedgerStore>(
        outputs: [f64; 3],
        calls: &Arc<AtomicUsize>,
        store: S,
    ) -> RiskEngine<S> {
        let engines = Condition::ALL
            .iter()
            .zip(outputs)
            .map(|(c, out)| scripted(*c, out, calls))
            .collect();
        RiskEngine::new(engines, Ledger::new(store, Duration::ZERO)).unwrap()
    }

    struct Offline;

    impl LedgerStore for Offline {
        fn read(&self, _: Duration) -> Result<Option<LedgerTable>, StoreError> {
            Err(StoreError::Unavailable("sheet service offline".to_string()))
        }

        fn write(&self, _: &LedgerTable) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("sheet service offline".to_string()))
        }
    }

    #[test]
    fn missing_contact_is_rejected_before_any_model_runs() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with([0.1, 0.2, 0.3], &calls, MemoryStore::new());
        let mut submission = jane();
        submission.contact_number = "  ".to_string();

        let err = engine.process(submission).unwrap_err();
        assert!(err.reprompt().contains("Ensure all mandatory fields are filled."));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(engine.ledger().store().snapshot().is_none());
    }

    #[test]
    fn report_lists_each_condition_and_records_one_row() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with([0.1234, 0.05, 0.5], &calls, MemoryStore::new());
        let report = engine.process(jane()).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            report.lines(),
            vec![
                "Cardio Probability: 12.34%",
                "Stroke Probability: 5.00%",
                "Diabetes Probability: 50.00%",
                SUBMITTED_MESSAGE,
            ]
        );
        let table = engine.ledger().read().unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.cell(0, "Cardio_Probability"), Some("0.1234"));
        assert_eq!(table.cell(0, "ContactNumber"), Some("00101234567"));
    }

    #[test]
    fn hba1c_extremes_bypass_the_diabetes_model() {
        for (hba1c, expected) in [(2.0, Probability::ZERO), (7.0, Probability::ONE)] {
            let calls = Arc::new(AtomicUsize::new(0));
            let engine = engine_with([0.0, 0.0, 0.5], &calls, MemoryStore::new());
            let mut submission = jane();
            submission.hba1c_level = hba1c;

            let report = engine.process(submission).unwrap();
            assert_eq!(report.probability(Condition::Diabetes), Some(expected));
            // Only cardiovascular and stroke reached their classifiers.
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn one_failing_condition_does_not_block_the_others() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with([0.2, f64::NAN, 1.7], &calls, MemoryStore::new());
        let report = engine.process(jane()).unwrap();

        assert!(matches!(
            report.outcomes[1].result,
            Err(ConditionError::Model(ModelError::NonFiniteScore { .. }))
        ));
        assert_eq!(
            report.probability(Condition::Cardiovascular).map(Probability::value),
            Some(0.2)
        );
        assert_eq!(report.probability(Condition::Diabetes), Some(Probability::ONE));
        assert!(report.outcomes[1].message().starts_with("Stroke Probability: unavailable"));

        let table = engine.ledger().read().unwrap();
        assert_eq!(table.cell(0, "Stroke_Probability"), Some(""));
        assert_eq!(table.cell(0, "Diabetes_Probability"), Some("1"));
    }

    #[test]
    fn unknown_label_fails_only_the_conditions_that_use_it() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with([0.1, 0.1, 0.1], &calls, MemoryStore::new());
        let mut submission = jane();
        submission.work_type = "Astronaut".to_string();

        let report = engine.process(submission).unwrap();
        assert!(matches!(report.outcomes[1].result, Err(ConditionError::Feature(_))));
        assert!(report.probability(Condition::Cardiovascular).is_some());
        assert!(report.probability(Condition::Diabetes).is_some());
    }

    #[test]
    fn override_does_not_hide_an_unknown_label() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with([0.1, 0.1, 0.1], &calls, MemoryStore::new());
        let mut submission = jane();
        submission.hba1c_level = 7.0;
        submission.glucose = "Very High".to_string();

        let report = engine.process(submission).unwrap();
        for outcome in &report.outcomes {
            match &outcome.result {
                Err(ConditionError::Feature(FeatureError::Encoding { source, .. })) => {
                    assert_eq!(source.label, "Very High");
                }
                other => {
                    panic!("{} expected an encoding error, got {other:?}", outcome.condition)
                }
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(engine.ledger().read().unwrap().cell(0, "Diabetes_Probability"), Some(""));
    }

    #[test]
    fn ledger_failure_keeps_predictions() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engine = engine_with([0.3, 0.3, 0.3], &calls, Offline);
        let report = engine.process(jane()).unwrap();

        assert!(report.persisted.is_err());
        assert_eq!(report.outcomes.iter().filter(|o| o.result.is_ok()).count(), 3);
        assert!(report.persistence_message().contains("could not be saved"));
    }

    #[test]
    fn engine_requires_every_condition_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engines = vec![
            scripted(Condition::Cardiovascular, 0.1, &calls),
            scripted(Condition::Stroke, 0.1, &calls),
        ];
        let err = RiskEngine::new(engines, Ledger::new(MemoryStore::new(), Duration::ZERO))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::MissingCondition(Condition::Diabetes)));

        let engines = vec![
            scripted(Condition::Cardiovascular, 0.1, &calls),
            scripted(Condition::Stroke, 0.1, &calls),
            scripted(Condition::Diabetes, 0.1, &calls),
            scripted(Condition::Stroke, 0.1, &calls),
        ];
        let err = RiskEngine::new(engines, Ledger::new(MemoryStore::new(), Duration::ZERO))
            .err()
            .unwrap();
        assert!(matches!(err, ConfigError::DuplicateCondition(Condition::Stroke)));
    }

    #[test]
    fn outcomes_follow_condition_order_regardless_of_input_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let engines = vec![
            scripted(Condition::Diabetes, 0.3, &calls),
            scripted(Condition::Cardiovascular, 0.1, &calls),
            scripted(Condition::Stroke, 0.2, &calls),
        ];
        let engine =
            RiskEngine::new(engines, Ledger::new(MemoryStore::new(), Duration::ZERO)).unwrap();
        let report = engine.process(jane()).unwrap();
        let order: Vec<Condition> = report.outcomes.iter().map(|o| o.condition).collect();
        assert_eq!(order, Condition::ALL.to_vec());
    }
}
