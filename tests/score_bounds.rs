use ndarray::ArrayView1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use wellai::model::{Classifier, ModelError};
use wellai::normalize::NormalizationPolicy;
use wellai::pipeline::{ConditionEngine, ConditionError};
use wellai::schema::ConditionSchema;
use wellai::types::{Condition, Submission};

// A classifier that ignores its input and returns a fixed raw score.
struct Fixed {
    names: Vec<String>,
    score: f64,
}

impl Classifier for Fixed {
    fn feature_names(&self) -> &[String] {
        &self.names
    }

    fn predict(&self, _: ArrayView1<f64>) -> Result<f64, ModelError> {
        Ok(self.score)
    }
}

fn engine(condition: Condition, score: f64) -> ConditionEngine {
    let names = ConditionSchema::for_condition(condition)
        .feature_names()
        .map(str::to_string)
        .collect();
    ConditionEngine::new(
        Box::new(Fixed { names, score }),
        NormalizationPolicy::standard(condition),
    )
    .expect("schema-conformant classifier")
}

fn jane() -> Submission {
    toml::from_str(include_str!("../submissions/jane.toml")).expect("bundled submission parses")
}

#[test]
fn adversarial_scores_always_yield_bounded_probabilities() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let submission = jane();

    let mut scores = vec![
        -0.0,
        -1e-300,
        1.0 + f64::EPSILON,
        f64::MAX,
        f64::MIN,
        f64::INFINITY,
        f64::NEG_INFINITY,
    ];
    scores.extend((0..500).map(|_| rng.gen_range(-1e6..1e6)));
    scores.extend((0..500).map(|_| rng.gen_range(-2.0..3.0)));

    for condition in Condition::ALL {
        for &score in &scores {
            let p = engine(condition, score)
                .evaluate(&submission)
                .expect("finite or infinite scores are clamped");
            assert!((0.0..=1.0).contains(&p.value()), "{condition} {score} -> {p:?}");
            assert!(!p.value().is_sign_negative(), "{condition} {score} -> {p:?}");
            assert!(!p.to_string().starts_with('-'), "{condition} {score} -> {p}");
            if (0.0..=1.0).contains(&score) {
                assert_eq!(p.value(), score);
            }
        }
    }
}

#[test]
fn negative_zero_score_is_shown_and_stored_as_zero() {
    let submission = jane();
    for condition in Condition::ALL {
        let p = engine(condition, -0.0)
            .evaluate(&submission)
            .expect("zero is a valid probability");
        assert!(!p.value().is_sign_negative());
        assert_eq!(p.to_string(), "0.00%");
        assert_eq!(p.value().to_string(), "0");
    }
}

#[test]
fn nan_score_is_an_error_for_that_condition_only() {
    let submission = jane();
    for condition in Condition::ALL {
        match engine(condition, f64::NAN).evaluate(&submission) {
            Err(ConditionError::Model(ModelError::NonFiniteScore { condition: failed, .. })) => {
                assert_eq!(failed, condition);
            }
            other => panic!("expected a non-finite score error, got {other:?}"),
        }
    }
}

#[test]
fn unknown_glucose_label_is_an_encoding_error() {
    let mut submission = jane();
    submission.glucose = "Very High".to_string();
    let err = engine(Condition::Cardiovascular, 0.5)
        .evaluate(&submission)
        .expect_err("unknown label");
    assert!(matches!(err, ConditionError::Feature(_)));
    assert!(err.to_string().contains("Very High"), "{err}");
}
