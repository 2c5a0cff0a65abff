//! Write-side problem payloads and their validation rules

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use validator::{Validate, ValidationError};

use crate::error::{BankError, BankResult};
use crate::types::Difficulty;

/// Tolerance when comparing a problem's total against its test case points
pub const POINTS_EPSILON: f64 = 0.01;

/// Points given to an edited test case that does not specify any
pub const DEFAULT_EDITED_CASE_POINTS: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TestCaseDraft {
    #[validate(custom(function = "not_blank"))]
    pub input: String,

    #[serde(alias = "expectedOutput")]
    #[validate(custom(function = "not_blank"))]
    pub expected_output: String,

    #[serde(default)]
    #[validate(range(min = 0.0, message = "Testcase points must be a positive number"))]
    pub points: Option<f64>,

    #[serde(default)]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ProblemDraft {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: String,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: String,

    pub difficulty: Difficulty,

    #[serde(alias = "totalPoints")]
    #[validate(range(min = 0.0, message = "Total points must be a positive number"))]
    pub total_points: f64,

    #[serde(alias = "testCases", alias = "testcases")]
    #[validate(length(min = 1, message = "At least one test case is required"), nested)]
    pub test_cases: Vec<TestCaseDraft>,
}

impl ProblemDraft {
    /// Trim free-text fields, then run every field rule
    pub fn normalized(mut self) -> BankResult<Self> {
        self.title = self.title.trim().to_string();
        self.description = self.description.trim().to_string();
        self.validate()?;
        ensure_finite("total_points", self.total_points)?;
        Ok(self)
    }
}

/// Partial update. Absent fields keep their stored value; an absent or empty
/// test case list keeps the stored cases.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ProblemUpdate {
    #[validate(length(min = 3, max = 100, message = "Title must be between 3 and 100 characters"))]
    pub title: Option<String>,

    #[validate(length(min = 10, message = "Description must be at least 10 characters"))]
    pub description: Option<String>,

    pub difficulty: Option<Difficulty>,

    #[serde(default, alias = "totalPoints")]
    #[validate(range(min = 0.0, message = "Total points must be a positive number"))]
    pub total_points: Option<f64>,

    #[serde(default, alias = "testCases", alias = "testcases")]
    #[validate(nested)]
    pub test_cases: Option<Vec<TestCaseDraft>>,
}

impl ProblemUpdate {
    pub fn normalized(mut self) -> BankResult<Self> {
        self.title = self.title.map(|t| t.trim().to_string());
        self.description = self.description.map(|d| d.trim().to_string());
        self.test_cases = self.test_cases.filter(|cases| !cases.is_empty());
        self.validate()?;
        if let Some(total) = self.total_points {
            ensure_finite("total_points", total)?;
        }
        Ok(self)
    }
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::from("must not be blank")));
    }
    Ok(())
}

fn ensure_finite(field: &str, value: f64) -> BankResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(BankError::InvalidInput(format!("{} must be a valid number", field)))
    }
}

pub fn points_match(expected_total: f64, points: &[f64]) -> bool {
    let actual: f64 = points.iter().sum();
    (actual - expected_total).abs() < POINTS_EPSILON
}

/// Resolve the point value of each new test case.
///
/// When no case carries points the total is split evenly. Otherwise every case
/// must carry points (or `fallback` fills the gaps) and their sum must equal
/// the total.
pub fn assign_points(
    total_points: f64,
    drafts: &[TestCaseDraft],
    fallback: Option<f64>,
) -> BankResult<Vec<f64>> {
    if drafts.is_empty() {
        return Ok(Vec::new());
    }

    if fallback.is_none() && drafts.iter().all(|d| d.points.is_none()) {
        let share = total_points / drafts.len() as f64;
        return Ok(vec![share; drafts.len()]);
    }

    let mut points = Vec::with_capacity(drafts.len());
    for (idx, draft) in drafts.iter().enumerate() {
        let value = draft.points.or(fallback).ok_or_else(|| {
            BankError::InvalidInput(format!(
                "test case {} has no points while others do",
                idx + 1
            ))
        })?;
        ensure_finite("points", value)?;
        points.push(value);
    }

    if !points_match(total_points, &points) {
        return Err(BankError::InvalidInput(format!(
            "Total points ({}) must match sum of testcase points ({})",
            total_points,
            points.iter().sum::<f64>()
        )));
    }
    Ok(points)
}
