//! # Submission Validation
//!
//! A submission is either `Incomplete` or `Ready`. Only a `ValidatedSubmission`
//! can reach the models or the ledger, and the only way to obtain one is through
//! [`validate`], so an incomplete form can never be processed with defaults.

use crate::types::{Attribute, Submission};
use std::fmt;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Message shown to the person filling in the form when a mandatory field is empty.
pub const REPROMPT_MESSAGE: &str = "Ensure all mandatory fields are filled.";

/// Contact numbers are left-padded with zeros to this width.
const CONTACT_NUMBER_WIDTH: usize = 11;
/// The contact input accepts at most this many characters.
const CONTACT_NUMBER_MAX_CHARS: usize = 12;

/// Accepted ranges of the numeric form inputs.
const AGE_RANGE: RangeInclusive<f64> = 0.0..=100.0;
const BMI_RANGE: RangeInclusive<f64> = 0.0..=50.0;
const HBA1C_RANGE: RangeInclusive<f64> = 0.0..=20.0;

/// Identity fields that must be filled before anything else happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MandatoryField {
    Name,
    ContactNumber,
}

impl fmt::Display for MandatoryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MandatoryField::Name => f.write_str("Your Name"),
            MandatoryField::ContactNumber => f.write_str("Contact Number"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Ensure all mandatory fields are filled. Missing: {}", list_fields(.0))]
    MissingFields(Vec<MandatoryField>),
    #[error("Contact number is {length} characters long; at most {max} are accepted.")]
    ContactTooLong { length: usize, max: usize },
    #[error("{attribute} value {value} is outside the accepted range {min}..={max}.")]
    OutOfRange {
        attribute: Attribute,
        value: f64,
        min: f64,
        max: f64,
    },
}

impl ValidationError {
    /// The message the form layer should display before asking again.
    pub fn reprompt(&self) -> String {
        match self {
            ValidationError::MissingFields(_) => REPROMPT_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }
}

/// A submission whose mandatory fields are present and whose numeric answers are
/// inside the form's ranges. The contact number is already normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSubmission(Submission);

impl ValidatedSubmission {
    pub fn submission(&self) -> &Submission {
        &self.0
    }

    pub fn into_inner(self) -> Submission {
        self.0
    }
}

impl std::ops::Deref for ValidatedSubmission {
    type Target = Submission;

    fn deref(&self) -> &Submission {
        &self.0
    }
}

/// The two states of the validator.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionState {
    Incomplete { missing: Vec<MandatoryField> },
    Ready(ValidatedSubmission),
}

/// Reports which mandatory fields are still empty without consuming the submission.
pub fn missing_fields(submission: &Submission) -> Vec<MandatoryField> {
    let mut missing = Vec::new();
    if submission.name.trim().is_empty() {
        missing.push(MandatoryField::Name);
    }
    if submission.contact_number.trim().is_empty() {
        missing.push(MandatoryField::ContactNumber);
    }
    missing
}

fn list_fields(fields: &[MandatoryField]) -> String {
    fields
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Moves a submission to `Ready` or leaves it `Incomplete`.
///
/// Range and length problems are returned as errors; missing identity fields are
/// the `Incomplete` state.
pub fn assess(submission: Submission) -> Result<SubmissionState, ValidationError> {
    let missing = missing_fields(&submission);
    if !missing.is_empty() {
        return Ok(SubmissionState::Incomplete { missing });
    }

    let mut submission = submission;
    submission.name = submission.name.trim().to_string();
    submission.contact_number = normalize_contact_number(&submission.contact_number)?;

    check_range(Attribute::Age, f64::from(submission.age), AGE_RANGE)?;
    check_range(Attribute::Bmi, submission.bmi, BMI_RANGE)?;
    check_range(Attribute::Hba1cLevel, submission.hba1c_level, HBA1C_RANGE)?;

    Ok(SubmissionState::Ready(ValidatedSubmission(submission)))
}

/// Validates a submission, collapsing the `Incomplete` state into an error.
pub fn validate(submission: Submission) -> Result<ValidatedSubmission, ValidationError> {
    match assess(submission)? {
        SubmissionState::Ready(ready) => Ok(ready),
        SubmissionState::Incomplete { missing } => Err(ValidationError::MissingFields(missing)),
    }
}

/// Trims the contact number, enforces the input length and left-pads it with
/// zeros. Padding happens only after the presence check, so an empty number can
/// never turn into a string of zeros.
fn normalize_contact_number(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    let length = trimmed.chars().count();
    if length > CONTACT_NUMBER_MAX_CHARS {
        return Err(ValidationError::ContactTooLong {
            length,
            max: CONTACT_NUMBER_MAX_CHARS,
        });
    }
    Ok(format!("{trimmed:0>width$}", width = CONTACT_NUMBER_WIDTH))
}

fn check_range(
    attribute: Attribute,
    value: f64,
    range: RangeInclusive<f64>,
) -> Result<(), ValidationError> {
    if value.is_finite() && range.contains(&value) {
        return Ok(());
    }
    Err(ValidationError::OutOfRange {
        attribute,
        value,
        min: *range.start(),
        max: *range.end(),
    })
}
