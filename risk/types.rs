// ========================================================================================
//                             High-Level Data Contracts
// ========================================================================================

// This file is ONLY for types that are SHARED BETWEEN FILES, not types that only are used in one file.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three predicted health risks. Each condition owns its own model,
/// feature schema and encoding tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Condition {
    Cardiovascular,
    Stroke,
    Diabetes,
}

impl Condition {
    /// Canonical evaluation and reporting order.
    pub const ALL: [Condition; 3] = [
        Condition::Cardiovascular,
        Condition::Stroke,
        Condition::Diabetes,
    ];

    /// Short label used in user-facing output and ledger column names.
    pub fn label(self) -> &'static str {
        match self {
            Condition::Cardiovascular => "Cardio",
            Condition::Stroke => "Stroke",
            Condition::Diabetes => "Diabetes",
        }
    }

    pub fn probability_column(self) -> &'static str {
        match self {
            Condition::Cardiovascular => "Cardio_Probability",
            Condition::Stroke => "Stroke_Probability",
            Condition::Diabetes => "Diabetes_Probability",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The semantic type of an attribute, independent of how any model encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Numeric,
    /// Ordinal or nominal category chosen from a fixed list of labels.
    Category,
    /// Yes/No style binary answer.
    Flag,
}

/// A clinical or demographic fact collected by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Attribute {
    Gender,
    Age,
    Hypertension,
    HeartDisease,
    EverMarried,
    WorkType,
    ResidenceType,
    Bmi,
    SmokingStatus,
    Hba1cLevel,
    Cholesterol,
    Glucose,
    AlcoholIntake,
    PhysicalActivity,
}

impl Attribute {
    pub fn kind(self) -> AttributeKind {
        match self {
            Attribute::Age | Attribute::Bmi | Attribute::Hba1cLevel => AttributeKind::Numeric,
            Attribute::Hypertension
            | Attribute::HeartDisease
            | Attribute::EverMarried
            | Attribute::AlcoholIntake
            | Attribute::PhysicalActivity => AttributeKind::Flag,
            Attribute::Gender
            | Attribute::WorkType
            | Attribute::ResidenceType
            | Attribute::SmokingStatus
            | Attribute::Cholesterol
            | Attribute::Glucose => AttributeKind::Category,
        }
    }

    /// The label shown next to the form widget.
    pub fn label(self) -> &'static str {
        match self {
            Attribute::Gender => "Gender",
            Attribute::Age => "Age",
            Attribute::Hypertension => "Hypertension",
            Attribute::HeartDisease => "Heart Disease",
            Attribute::EverMarried => "Ever Married",
            Attribute::WorkType => "Work Type",
            Attribute::ResidenceType => "Residence Type",
            Attribute::Bmi => "BMI",
            Attribute::SmokingStatus => "Smoking Status",
            Attribute::Hba1cLevel => "HbA1c Level",
            Attribute::Cholesterol => "Cholesterol",
            Attribute::Glucose => "Glucose",
            Attribute::AlcoholIntake => "Alcohol Intake",
            Attribute::PhysicalActivity => "Physical Activity",
        }
    }

    /// The header this attribute is stored under in the ledger.
    pub fn ledger_column(self) -> &'static str {
        match self {
            Attribute::Gender => "Gender",
            Attribute::Age => "Age",
            Attribute::Hypertension => "Hypertension",
            Attribute::HeartDisease => "HeartDisease",
            Attribute::EverMarried => "EverMarried",
            Attribute::WorkType => "WorkType",
            Attribute::ResidenceType => "ResidenceType",
            Attribute::Bmi => "BMI",
            Attribute::SmokingStatus => "SmokingStatus",
            Attribute::Hba1cLevel => "HbA1cLevel",
            Attribute::Cholesterol => "Cholesterol",
            Attribute::Glucose => "Glucose",
            Attribute::AlcoholIntake => "AlcoholIntake",
            Attribute::PhysicalActivity => "PhysicalActivity",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A borrowed view of one attribute's answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AttributeValue<'a> {
    Numeric(f64),
    Label(&'a str),
}

/// One person's answers as handed over by the form layer.
///
/// Identity fields default to empty so that a form which omits them still
/// deserializes and is then rejected by validation instead of by the parser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub contact_number: String,
    pub gender: String,
    pub age: u32,
    pub hypertension: String,
    pub heart_disease: String,
    pub ever_married: String,
    pub work_type: String,
    pub residence_type: String,
    pub bmi: f64,
    pub smoking_status: String,
    pub hba1c_level: f64,
    pub cholesterol: String,
    pub glucose: String,
    pub alcohol_intake: String,
    pub physical_activity: String,
}

impl Submission {
    /// Attribute order used for the ledger row.
    pub const ATTRIBUTES: [Attribute; 14] = [
        Attribute::Gender,
        Attribute::Age,
        Attribute::Hypertension,
        Attribute::HeartDisease,
        Attribute::EverMarried,
        Attribute::WorkType,
        Attribute::ResidenceType,
        Attribute::Bmi,
        Attribute::SmokingStatus,
        Attribute::Hba1cLevel,
        Attribute::Cholesterol,
        Attribute::Glucose,
        Attribute::AlcoholIntake,
        Attribute::PhysicalActivity,
    ];

    pub fn value(&self, attribute: Attribute) -> AttributeValue<'_> {
        match attribute {
            Attribute::Gender => AttributeValue::Label(&self.gender),
            Attribute::Age => AttributeValue::Numeric(f64::from(self.age)),
            Attribute::Hypertension => AttributeValue::Label(&self.hypertension),
            Attribute::HeartDisease => AttributeValue::Label(&self.heart_disease),
            Attribute::EverMarried => AttributeValue::Label(&self.ever_married),
            Attribute::WorkType => AttributeValue::Label(&self.work_type),
            Attribute::ResidenceType => AttributeValue::Label(&self.residence_type),
            Attribute::Bmi => AttributeValue::Numeric(self.bmi),
            Attribute::SmokingStatus => AttributeValue::Label(&self.smoking_status),
            Attribute::Hba1cLevel => AttributeValue::Numeric(self.hba1c_level),
            Attribute::Cholesterol => AttributeValue::Label(&self.cholesterol),
            Attribute::Glucose => AttributeValue::Label(&self.glucose),
            Attribute::AlcoholIntake => AttributeValue::Label(&self.alcohol_intake),
            Attribute::PhysicalActivity => AttributeValue::Label(&self.physical_activity),
        }
    }

    /// Ledger cell text for an attribute. Labels are stored as answered and
    /// numbers keep their shortest round-trip representation.
    pub fn cell(&self, attribute: Attribute) -> String {
        match attribute {
            Attribute::Age => self.age.to_string(),
            _ => match self.value(attribute) {
                AttributeValue::Numeric(v) => v.to_string(),
                AttributeValue::Label(label) => label.to_string(),
            },
        }
    }
}
