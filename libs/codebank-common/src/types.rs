use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::BankError;

/// Languages the grader knows how to execute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    JavaScript,
}

impl Language {
    pub fn all() -> &'static [Language] {
        &[Language::JavaScript]
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::JavaScript => write!(f, "javascript"),
        }
    }
}

impl FromStr for Language {
    type Err = BankError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(BankError::InvalidInput("language is required".to_string()));
        }
        match tag.to_lowercase().as_str() {
            "javascript" | "js" => Ok(Language::JavaScript),
            _ => Err(BankError::UnsupportedLanguage(tag.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(BankError::InvalidInput(format!(
                "invalid difficulty level: {}",
                other
            ))),
        }
    }
}

/// A stored coding exercise. Test cases are kept separately by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub total_points: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub input: String,
    pub expected_output: String,
    pub points: f64,
    pub difficulty: Difficulty,
}

/// A problem together with its ordered test cases
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemDetail {
    #[serde(flatten)]
    pub problem: Problem,
    pub test_cases: Vec<TestCase>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: Language,
    pub input: String,
}

/// Outcome of running one piece of code against one input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub succeeded: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ExecutionResult {
    pub fn success(output: String) -> Self {
        Self {
            succeeded: true,
            output,
            error_message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            succeeded: false,
            output: String::new(),
            error_message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub passed: bool,
    pub input: String,
    pub expected: String,
    pub actual: String,
    pub points_awarded: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingResult {
    pub passed_count: usize,
    pub total_count: usize,
    pub score_awarded: f64,
    /// Declared total of the problem. Informational: it is not recomputed
    /// from the test cases and may diverge from their sum.
    pub max_score: f64,
    pub per_case: Vec<CaseResult>,
}

/// Persisted record of one graded attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub problem_id: Uuid,
    pub code: String,
    pub language: Language,
    pub passed_tests: usize,
    pub total_tests: usize,
    pub score: f64,
    pub submitted_at: DateTime<Utc>,
}

impl Submission {
    pub fn from_grading(
        problem_id: Uuid,
        code: &str,
        language: Language,
        result: &GradingResult,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            problem_id,
            code: code.to_string(),
            language,
            passed_tests: result.passed_count,
            total_tests: result.total_count,
            score: result.score_awarded,
            submitted_at: Utc::now(),
        }
    }
}
