//! Problem maintenance: create, read, list, update and delete problems along
//! with their test cases. Enforces the write-time rule that a problem's test
//! case points add up to its declared total.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::{BankError, BankResult};
use crate::store::ProblemStore;
use crate::types::{Difficulty, Problem, ProblemDetail, Submission, TestCase};
use crate::validation::{
    assign_points, points_match, ProblemDraft, ProblemUpdate, TestCaseDraft,
    DEFAULT_EDITED_CASE_POINTS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Points,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemFilter {
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub sort: SortOrder,
}

#[derive(Clone)]
pub struct ProblemCatalog {
    store: Arc<dyn ProblemStore>,
}

impl ProblemCatalog {
    pub fn new(store: Arc<dyn ProblemStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, draft: ProblemDraft) -> BankResult<ProblemDetail> {
        let draft = draft.normalized()?;
        let points = assign_points(draft.total_points, &draft.test_cases, None)?;

        let now = Utc::now();
        let problem = Problem {
            id: Uuid::new_v4(),
            title: draft.title,
            description: draft.description,
            difficulty: draft.difficulty,
            total_points: draft.total_points,
            created_at: now,
            updated_at: now,
        };
        let test_cases = build_test_cases(problem.id, draft.test_cases, &points);

        self.store.insert_problem(&problem, &test_cases).await?;
        info!(
            problem_id = %problem.id,
            test_cases = test_cases.len(),
            total_points = problem.total_points,
            "Problem created"
        );

        Ok(ProblemDetail { problem, test_cases })
    }

    pub async fn get(&self, id: Uuid) -> BankResult<ProblemDetail> {
        let problem = self.find(id).await?;
        let test_cases = self.store.get_test_cases(id).await?;
        Ok(ProblemDetail { problem, test_cases })
    }

    pub async fn list(&self, filter: &ProblemFilter) -> BankResult<Vec<ProblemDetail>> {
        let mut problems: Vec<Problem> = self
            .store
            .list_problems()
            .await?
            .into_iter()
            .filter(|p| filter.difficulty.map_or(true, |d| p.difficulty == d))
            .collect();

        match filter.sort {
            SortOrder::Newest => problems.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortOrder::Points => problems.sort_by(|a, b| {
                b.total_points
                    .total_cmp(&a.total_points)
                    .then_with(|| b.created_at.cmp(&a.created_at))
            }),
        }

        let mut details = Vec::with_capacity(problems.len());
        for problem in problems {
            let test_cases = self.store.get_test_cases(problem.id).await?;
            details.push(ProblemDetail { problem, test_cases });
        }
        Ok(details)
    }

    pub async fn update(&self, id: Uuid, update: ProblemUpdate) -> BankResult<ProblemDetail> {
        let update = update.normalized()?;
        let mut problem = self.find(id).await?;

        if let Some(title) = update.title {
            problem.title = title;
        }
        if let Some(description) = update.description {
            problem.description = description;
        }
        if let Some(difficulty) = update.difficulty {
            problem.difficulty = difficulty;
        }
        if let Some(total_points) = update.total_points {
            problem.total_points = total_points;
        }
        problem.updated_at = Utc::now();

        let test_cases = match update.test_cases {
            Some(drafts) => {
                let points = assign_points(
                    problem.total_points,
                    &drafts,
                    Some(DEFAULT_EDITED_CASE_POINTS),
                )?;
                Some(build_test_cases(id, drafts, &points))
            }
            None => {
                let existing = self.store.get_test_cases(id).await?;
                let points: Vec<f64> = existing.iter().map(|tc| tc.points).collect();
                if !points_match(problem.total_points, &points) {
                    return Err(BankError::InvalidInput(format!(
                        "Total points ({}) must match sum of testcase points ({})",
                        problem.total_points,
                        points.iter().sum::<f64>()
                    )));
                }
                None
            }
        };

        if !self
            .store
            .update_problem(&problem, test_cases.as_deref())
            .await?
        {
            return Err(BankError::NotFound(id));
        }
        let test_cases = match test_cases {
            Some(cases) => {
                info!(problem_id = %id, test_cases = cases.len(), "Test cases replaced");
                cases
            }
            None => self.store.get_test_cases(id).await?,
        };

        info!(problem_id = %id, "Problem updated");
        Ok(ProblemDetail { problem, test_cases })
    }

    pub async fn delete(&self, id: Uuid) -> BankResult<()> {
        if !self.store.delete_problem(id).await? {
            return Err(BankError::NotFound(id));
        }
        info!(problem_id = %id, "Problem deleted");
        Ok(())
    }

    pub async fn submissions(&self, id: Uuid) -> BankResult<Vec<Submission>> {
        self.find(id).await?;
        let mut submissions = self.store.list_submissions(id).await?;
        submissions.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(submissions)
    }

    async fn find(&self, id: Uuid) -> BankResult<Problem> {
        self.store
            .get_problem(id)
            .await?
            .ok_or(BankError::NotFound(id))
    }
}

fn build_test_cases(problem_id: Uuid, drafts: Vec<TestCaseDraft>, points: &[f64]) -> Vec<TestCase> {
    drafts
        .into_iter()
        .zip(points.iter().copied())
        .map(|(draft, points)| TestCase {
            id: Uuid::new_v4(),
            problem_id,
            input: draft.input,
            expected_output: draft.expected_output,
            points,
            difficulty: draft.difficulty.unwrap_or_default(),
        })
        .collect()
}
