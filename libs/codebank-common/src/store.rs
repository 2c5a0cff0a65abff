//! Persistence boundary for problems, test cases and submissions.
//!
//! The grader and the catalog only see the `ProblemStore` trait. Two backends
//! ship with the crate: `InMemoryStore` for tests, local grading and
//! single-process deployments, and `RedisStore` (see `crate::redis`).

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::StoreResult;
use crate::types::{Problem, Submission, TestCase};

#[async_trait]
pub trait ProblemStore: Send + Sync {
    async fn list_problems(&self) -> StoreResult<Vec<Problem>>;

    async fn get_problem(&self, id: Uuid) -> StoreResult<Option<Problem>>;

    /// Test cases in grading order
    async fn get_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>>;

    async fn insert_problem(&self, problem: &Problem, test_cases: &[TestCase]) -> StoreResult<()>;

    /// Overwrites an existing problem and, when given, replaces its test cases
    /// in the same write. Returns false without writing anything if the
    /// problem no longer exists.
    async fn update_problem(
        &self,
        problem: &Problem,
        test_cases: Option<&[TestCase]>,
    ) -> StoreResult<bool>;

    /// Removes the problem and its test cases. Returns false if it did not exist.
    async fn delete_problem(&self, id: Uuid) -> StoreResult<bool>;

    async fn create_submission(&self, submission: &Submission) -> StoreResult<()>;

    async fn list_submissions(&self, problem_id: Uuid) -> StoreResult<Vec<Submission>>;
}

#[derive(Default)]
struct Tables {
    problems: HashMap<Uuid, Problem>,
    test_cases: HashMap<Uuid, Vec<TestCase>>,
    submissions: HashMap<Uuid, Vec<Submission>>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProblemStore for InMemoryStore {
    async fn list_problems(&self) -> StoreResult<Vec<Problem>> {
        let tables = self.tables.read().await;
        Ok(tables.problems.values().cloned().collect())
    }

    async fn get_problem(&self, id: Uuid) -> StoreResult<Option<Problem>> {
        Ok(self.tables.read().await.problems.get(&id).cloned())
    }

    async fn get_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>> {
        let tables = self.tables.read().await;
        Ok(tables.test_cases.get(&problem_id).cloned().unwrap_or_default())
    }

    async fn insert_problem(&self, problem: &Problem, test_cases: &[TestCase]) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables.problems.insert(problem.id, problem.clone());
        tables.test_cases.insert(problem.id, test_cases.to_vec());
        Ok(())
    }

    async fn update_problem(
        &self,
        problem: &Problem,
        test_cases: Option<&[TestCase]>,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.problems.contains_key(&problem.id) {
            return Ok(false);
        }
        tables.problems.insert(problem.id, problem.clone());
        if let Some(cases) = test_cases {
            tables.test_cases.insert(problem.id, cases.to_vec());
        }
        Ok(true)
    }

    async fn delete_problem(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        tables.test_cases.remove(&id);
        Ok(tables.problems.remove(&id).is_some())
    }

    async fn create_submission(&self, submission: &Submission) -> StoreResult<()> {
        let mut tables = self.tables.write().await;
        tables
            .submissions
            .entry(submission.problem_id)
            .or_default()
            .push(submission.clone());
        Ok(())
    }

    async fn list_submissions(&self, problem_id: Uuid) -> StoreResult<Vec<Submission>> {
        let tables = self.tables.read().await;
        Ok(tables.submissions.get(&problem_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Difficulty, Language};
    use chrono::Utc;

    fn problem() -> Problem {
        Problem {
            id: Uuid::new_v4(),
            title: "Sum".to_string(),
            description: "Add two integers".to_string(),
            difficulty: Difficulty::Easy,
            total_points: 10.0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn case(problem_id: Uuid, input: &str) -> TestCase {
        TestCase {
            id: Uuid::new_v4(),
            problem_id,
            input: input.to_string(),
            expected_output: "x".to_string(),
            points: 5.0,
            difficulty: Difficulty::Easy,
        }
    }

    #[tokio::test]
    async fn test_test_case_order_is_preserved() {
        let store = InMemoryStore::new();
        let p = problem();
        let cases = vec![case(p.id, "c"), case(p.id, "a"), case(p.id, "b")];
        store.insert_problem(&p, &cases).await.unwrap();

        let inputs: Vec<String> = store
            .get_test_cases(p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|tc| tc.input)
            .collect();
        assert_eq!(inputs, vec!["c", "a", "b"]);
    }

    #[tokio::test]
    async fn test_update_replaces_problem_and_cases_together() {
        let store = InMemoryStore::new();
        let mut p = problem();
        store.insert_problem(&p, &[case(p.id, "old")]).await.unwrap();

        p.total_points = 20.0;
        let cases = vec![case(p.id, "new-1"), case(p.id, "new-2")];
        assert!(store.update_problem(&p, Some(cases.as_slice())).await.unwrap());

        assert_eq!(store.get_problem(p.id).await.unwrap().unwrap().total_points, 20.0);
        assert_eq!(store.get_test_cases(p.id).await.unwrap(), cases);

        p.title = "Renamed".to_string();
        assert!(store.update_problem(&p, None).await.unwrap());
        assert_eq!(store.get_test_cases(p.id).await.unwrap(), cases);
    }

    #[tokio::test]
    async fn test_update_of_deleted_problem_writes_nothing() {
        let store = InMemoryStore::new();
        let p = problem();
        store.insert_problem(&p, &[case(p.id, "1")]).await.unwrap();
        assert!(store.delete_problem(p.id).await.unwrap());

        let cases = vec![case(p.id, "2")];
        assert!(!store.update_problem(&p, Some(cases.as_slice())).await.unwrap());
        assert!(store.get_problem(p.id).await.unwrap().is_none());
        assert!(store.get_test_cases(p.id).await.unwrap().is_empty());
        assert!(store.list_problems().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_keeps_submissions() {
        let store = InMemoryStore::new();
        let p = problem();
        store.insert_problem(&p, &[case(p.id, "1")]).await.unwrap();
        let submission = Submission {
            id: Uuid::new_v4(),
            problem_id: p.id,
            code: "console.log(1)".to_string(),
            language: Language::JavaScript,
            passed_tests: 0,
            total_tests: 1,
            score: 0.0,
            submitted_at: Utc::now(),
        };
        store.create_submission(&submission).await.unwrap();

        assert!(store.delete_problem(p.id).await.unwrap());
        assert!(!store.delete_problem(p.id).await.unwrap());
        assert!(store.get_problem(p.id).await.unwrap().is_none());
        assert!(store.get_test_cases(p.id).await.unwrap().is_empty());
        assert_eq!(store.list_submissions(p.id).await.unwrap().len(), 1);
    }
}
