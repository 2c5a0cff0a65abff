/// Grading Orchestrator - High-Level Coordination
///
/// **Responsibility:**
/// Coordinate the execution engine, the evaluator and the store to run or
/// grade a submission.
///
/// **Grading flow (one invocation):**
/// 1. Validate code and language before anything else
/// 2. Fetch the problem and its ordered test cases
/// 3. For each case in order: execute, then compare
/// 4. Aggregate, then record a submission
///
/// An execution failure at any case ends the invocation immediately with no
/// partial score (fail-fast). Cases run strictly one after another.

use crate::engine::{CodeExecutor, MAX_INPUT_BYTES, MAX_SOURCE_CODE_BYTES};
use crate::evaluator;
use codebank_common::error::{BankError, BankResult};
use codebank_common::store::ProblemStore;
use codebank_common::types::{
    ExecutionRequest, GradingResult, Language, Problem, Submission, TestCase,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// A graded and recorded attempt
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub result: GradingResult,
    pub submission: Submission,
}

#[derive(Clone)]
pub struct Grader {
    engine: Arc<dyn CodeExecutor>,
    store: Arc<dyn ProblemStore>,
}

impl Grader {
    pub fn new(engine: Arc<dyn CodeExecutor>, store: Arc<dyn ProblemStore>) -> Self {
        Self { engine, store }
    }

    /// Input and language checks shared by run and submit
    fn prepare(&self, code: &str, language: &str) -> BankResult<Language> {
        if code.trim().is_empty() {
            return Err(BankError::InvalidInput("code is required".to_string()));
        }
        if code.len() > MAX_SOURCE_CODE_BYTES {
            return Err(BankError::InvalidInput(format!(
                "code exceeds maximum size of {} bytes",
                MAX_SOURCE_CODE_BYTES
            )));
        }

        let language: Language = language.parse()?;
        if !self.engine.supports(language) {
            return Err(BankError::UnsupportedLanguage(language.to_string()));
        }
        Ok(language)
    }

    /// Run mode: execute once against a caller-supplied input, no scoring
    pub async fn run(&self, code: &str, language: &str, input: &str) -> BankResult<String> {
        let language = self.prepare(code, language)?;
        if input.len() > MAX_INPUT_BYTES {
            return Err(BankError::InvalidInput(format!(
                "input exceeds maximum size of {} bytes",
                MAX_INPUT_BYTES
            )));
        }

        let request = ExecutionRequest {
            code: code.to_string(),
            language,
            input: input.to_string(),
        };

        let start = Instant::now();
        let result = self.engine.execute(&request).await;
        let execution_ms = start.elapsed().as_millis() as u64;

        if result.succeeded {
            info!(language = %language, execution_ms, "Run completed");
            Ok(result.output)
        } else {
            let message = result.error_message.unwrap_or_default();
            warn!(language = %language, execution_ms, error = %message, "Run failed");
            Err(BankError::Execution(message))
        }
    }

    /// Grade `code` against every test case of a problem and record the attempt
    pub async fn submit(
        &self,
        problem_id: Uuid,
        code: &str,
        language: &str,
    ) -> BankResult<GradedSubmission> {
        let language = self.prepare(code, language)?;

        let problem = self
            .store
            .get_problem(problem_id)
            .await?
            .ok_or(BankError::NotFound(problem_id))?;
        let test_cases = self.store.get_test_cases(problem_id).await?;

        let result = self.grade(&problem, &test_cases, code, language).await?;

        let submission = Submission::from_grading(problem_id, code, language, &result);
        if let Err(e) = self.store.create_submission(&submission).await {
            error!(
                problem_id = %problem_id,
                error = %e,
                "Graded submission could not be recorded"
            );
            return Err(BankError::Persistence {
                result: Box::new(result),
                source: e,
            });
        }

        info!(
            problem_id = %problem_id,
            submission_id = %submission.id,
            "Submission recorded"
        );
        Ok(GradedSubmission { result, submission })
    }

    #[tracing::instrument(skip_all, fields(problem_id = %problem.id, language = %language))]
    async fn grade(
        &self,
        problem: &Problem,
        test_cases: &[TestCase],
        code: &str,
        language: Language,
    ) -> BankResult<GradingResult> {
        info!(test_cases = test_cases.len(), "Starting grading");
        let start = Instant::now();

        let mut per_case = Vec::with_capacity(test_cases.len());
        for (idx, test_case) in test_cases.iter().enumerate() {
            let request = ExecutionRequest {
                code: code.to_string(),
                language,
                input: test_case.input.clone(),
            };

            let result = self.engine.execute(&request).await;
            if !result.succeeded {
                let message = result.error_message.unwrap_or_default();
                warn!(
                    test_num = idx + 1,
                    executed = idx + 1,
                    total = test_cases.len(),
                    error = %message,
                    "Execution failed; aborting grading"
                );
                return Err(BankError::Execution(message));
            }

            let verdict = evaluator::evaluate_case(test_case, &result.output);
            debug!(
                test_num = idx + 1,
                passed = verdict.passed,
                points = verdict.points_awarded,
                "Test result"
            );
            per_case.push(verdict);
        }

        let result = evaluator::aggregate(problem.total_points, per_case);
        info!(
            passed = result.passed_count,
            total = result.total_count,
            score = result.score_awarded,
            max_score = result.max_score,
            execution_ms = start.elapsed().as_millis() as u64,
            "Grading completed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use codebank_common::error::{StoreError, StoreResult};
    use codebank_common::store::InMemoryStore;
    use codebank_common::types::{Difficulty, ExecutionResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Behaviour = Box<dyn Fn(&ExecutionRequest) -> ExecutionResult + Send + Sync>;

    /// In-process stand-in for an interpreter: the behaviour closure plays the
    /// submitted program.
    struct ScriptedEngine {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl ScriptedEngine {
        fn new(behaviour: impl Fn(&ExecutionRequest) -> ExecutionResult + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                behaviour: Box::new(behaviour),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CodeExecutor for ScriptedEngine {
        fn supports(&self, _language: Language) -> bool {
            true
        }

        async fn execute(&self, request: &ExecutionRequest) -> ExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.behaviour)(request)
        }
    }

    /// Store whose submission writes always fail
    struct ReadOnlyStore(InMemoryStore);

    #[async_trait]
    impl ProblemStore for ReadOnlyStore {
        async fn list_problems(&self) -> StoreResult<Vec<Problem>> {
            self.0.list_problems().await
        }
        async fn get_problem(&self, id: Uuid) -> StoreResult<Option<Problem>> {
            self.0.get_problem(id).await
        }
        async fn get_test_cases(&self, problem_id: Uuid) -> StoreResult<Vec<TestCase>> {
            self.0.get_test_cases(problem_id).await
        }
        async fn insert_problem(&self, problem: &Problem, test_cases: &[TestCase]) -> StoreResult<()> {
            self.0.insert_problem(problem, test_cases).await
        }
        async fn update_problem(
            &self,
            problem: &Problem,
            test_cases: Option<&[TestCase]>,
        ) -> StoreResult<bool> {
            self.0.update_problem(problem, test_cases).await
        }
        async fn delete_problem(&self, id: Uuid) -> StoreResult<bool> {
            self.0.delete_problem(id).await
        }
        async fn create_submission(&self, _submission: &Submission) -> StoreResult<()> {
            Err(StoreError::Unavailable("submissions table is read-only".to_string()))
        }
        async fn list_submissions(&self, problem_id: Uuid) -> StoreResult<Vec<Submission>> {
            self.0.list_submissions(problem_id).await
        }
    }

    fn sum_program(request: &ExecutionRequest) -> ExecutionResult {
        let total: i64 = request
            .input
            .split_whitespace()
            .filter_map(|n| n.parse::<i64>().ok())
            .sum();
        ExecutionResult::success(total.to_string())
    }

    fn zero_program(_request: &ExecutionRequest) -> ExecutionResult {
        ExecutionResult::success("0".to_string())
    }

    /// Inserts a problem with `(input, expected, points)` cases
    async fn seed(store: &dyn ProblemStore, total_points: f64, cases: &[(&str, &str, f64)]) -> Uuid {
        let problem = Problem {
            id: Uuid::new_v4(),
            title: "Sum of two".to_string(),
            description: "Print the sum of two integers".to_string(),
            difficulty: Difficulty::Easy,
            total_points,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let test_cases: Vec<TestCase> = cases
            .iter()
            .map(|(input, expected, points)| TestCase {
                id: Uuid::new_v4(),
                problem_id: problem.id,
                input: input.to_string(),
                expected_output: expected.to_string(),
                points: *points,
                difficulty: Difficulty::Easy,
            })
            .collect();
        store.insert_problem(&problem, &test_cases).await.unwrap();
        problem.id
    }

    const SUM_CASES: &[(&str, &str, f64)] = &[("2 3", "5", 5.0), ("4 4", "8", 5.0)];

    #[tokio::test]
    async fn test_correct_submission_scores_full_marks() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let grader = Grader::new(ScriptedEngine::new(sum_program), store.clone());

        let graded = grader.submit(problem_id, "sum()", "javascript").await.unwrap();

        assert_eq!(graded.result.passed_count, 2);
        assert_eq!(graded.result.total_count, 2);
        assert_eq!(graded.result.score_awarded, 10.0);
        assert_eq!(graded.result.max_score, 10.0);
        assert_eq!(graded.result.per_case[0].actual, "5");

        let recorded = store.list_submissions(problem_id).await.unwrap();
        assert_eq!(recorded, vec![graded.submission.clone()]);
        assert_eq!(graded.submission.passed_tests, 2);
        assert_eq!(graded.submission.score, 10.0);
        assert_eq!(graded.submission.language, Language::JavaScript);
    }

    #[tokio::test]
    async fn test_wrong_submission_scores_zero() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let grader = Grader::new(ScriptedEngine::new(zero_program), store.clone());

        let graded = grader.submit(problem_id, "zero()", "javascript").await.unwrap();

        assert_eq!(graded.result.passed_count, 0);
        assert_eq!(graded.result.total_count, 2);
        assert_eq!(graded.result.score_awarded, 0.0);
        assert_eq!(graded.result.max_score, 10.0);
        assert!(graded.result.per_case.iter().all(|c| c.points_awarded == 0.0));
        assert_eq!(store.list_submissions(problem_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_score_is_sum_of_passed_points() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(
            store.as_ref(),
            10.0,
            &[("1 1", "2", 1.5), ("2 2", "5", 3.5), ("3 3", "6", 5.0)],
        )
        .await;
        let grader = Grader::new(ScriptedEngine::new(sum_program), store);

        let result = grader.submit(problem_id, "sum()", "js").await.unwrap().result;

        let expected: f64 = result
            .per_case
            .iter()
            .filter(|c| c.passed)
            .map(|c| c.points_awarded)
            .sum();
        assert_eq!(result.passed_count, 2);
        assert_eq!(result.score_awarded, expected);
        assert_eq!(result.score_awarded, 6.5);
    }

    #[tokio::test]
    async fn test_execution_failure_aborts_remaining_cases() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(
            store.as_ref(),
            15.0,
            &[("1 1", "2", 5.0), ("boom", "x", 5.0), ("3 3", "6", 5.0)],
        )
        .await;
        let engine = ScriptedEngine::new(|request: &ExecutionRequest| {
            if request.input == "boom" {
                ExecutionResult::failure("SyntaxError: Unexpected token")
            } else {
                sum_program(request)
            }
        });
        let grader = Grader::new(engine.clone(), store.clone());

        let err = grader.submit(problem_id, "sum()", "javascript").await.unwrap_err();

        assert!(matches!(err, BankError::Execution(ref msg) if msg == "SyntaxError: Unexpected token"));
        assert_eq!(engine.calls(), 2, "third case must never execute");
        assert!(store.list_submissions(problem_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_language_fails_before_execution() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let engine = ScriptedEngine::new(sum_program);
        let grader = Grader::new(engine.clone(), store);

        let err = grader.submit(problem_id, "sum()", "cobol").await.unwrap_err();
        assert!(matches!(err, BankError::UnsupportedLanguage(ref tag) if tag == "cobol"));

        let err = grader.run("sum()", "cobol", "1 2").await.unwrap_err();
        assert!(err.to_string().contains("unsupported language"));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_code_or_language_is_input_error() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let engine = ScriptedEngine::new(sum_program);
        let grader = Grader::new(engine.clone(), store);

        assert!(matches!(
            grader.submit(problem_id, "   ", "javascript").await,
            Err(BankError::InvalidInput(_))
        ));
        assert!(matches!(
            grader.run("sum()", "", "").await,
            Err(BankError::InvalidInput(_))
        ));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_oversized_code_rejected() {
        let grader = Grader::new(ScriptedEngine::new(sum_program), Arc::new(InMemoryStore::new()));
        let code = "x".repeat(MAX_SOURCE_CODE_BYTES + 1);
        assert!(matches!(
            grader.run(&code, "javascript", "").await,
            Err(BankError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_unknown_problem() {
        let engine = ScriptedEngine::new(sum_program);
        let grader = Grader::new(engine.clone(), Arc::new(InMemoryStore::new()));
        let id = Uuid::new_v4();

        let err = grader.submit(id, "sum()", "javascript").await.unwrap_err();
        assert!(matches!(err, BankError::NotFound(missing) if missing == id));
        assert_eq!(engine.calls(), 0);
    }

    #[tokio::test]
    async fn test_unrecorded_submission_keeps_result() {
        let store = Arc::new(ReadOnlyStore(InMemoryStore::new()));
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let grader = Grader::new(ScriptedEngine::new(sum_program), store);

        match grader.submit(problem_id, "sum()", "javascript").await {
            Err(BankError::Persistence { result, source }) => {
                assert_eq!(result.passed_count, 2);
                assert_eq!(result.score_awarded, 10.0);
                assert!(matches!(source, StoreError::Unavailable(_)));
            }
            other => panic!("expected persistence error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_resubmission_scores_identically_with_distinct_records() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let grader = Grader::new(ScriptedEngine::new(sum_program), store.clone());

        let first = grader.submit(problem_id, "sum()", "javascript").await.unwrap();
        let second = grader.submit(problem_id, "sum()", "javascript").await.unwrap();

        assert_eq!(first.result.passed_count, second.result.passed_count);
        assert_eq!(first.result.score_awarded, second.result.score_awarded);
        assert_ne!(first.submission.id, second.submission.id);
        assert_eq!(store.list_submissions(problem_id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_max_score_comes_from_problem_total() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 100.0, SUM_CASES).await;
        let grader = Grader::new(ScriptedEngine::new(sum_program), store);

        let result = grader.submit(problem_id, "sum()", "javascript").await.unwrap().result;
        assert_eq!(result.score_awarded, 10.0);
        assert_eq!(result.max_score, 100.0);
    }

    #[tokio::test]
    async fn test_printed_error_text_can_pass() {
        // A program that prints its error message is graded on that output
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 5.0, &[("", "Error:\nboom", 5.0)]).await;
        let engine = ScriptedEngine::new(|_: &ExecutionRequest| {
            ExecutionResult::success("Error:\nboom".to_string())
        });
        let grader = Grader::new(engine, store);

        let result = grader.submit(problem_id, "throw", "javascript").await.unwrap().result;
        assert_eq!(result.passed_count, 1);
    }

    #[tokio::test]
    async fn test_run_returns_raw_output() {
        let store = Arc::new(InMemoryStore::new());
        let engine = ScriptedEngine::new(|request: &ExecutionRequest| {
            ExecutionResult::success(format!("  echo:{}\n", request.input))
        });
        let grader = Grader::new(engine.clone(), store.clone());

        let output = grader.run("echo()", "javascript", "").await.unwrap();
        assert_eq!(output, "  echo:\n");
        assert_eq!(engine.calls(), 1);
        assert!(store.list_problems().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_surfaces_execution_failure() {
        let engine = ScriptedEngine::new(|_: &ExecutionRequest| {
            ExecutionResult::failure("execution timed out after 100 ms")
        });
        let grader = Grader::new(engine, Arc::new(InMemoryStore::new()));

        let err = grader.run("while(true){}", "javascript", "").await.unwrap_err();
        assert!(matches!(err, BankError::Execution(ref msg) if msg.contains("timed out")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_submissions_are_graded_independently() {
        let store = Arc::new(InMemoryStore::new());
        let problem_id = seed(store.as_ref(), 10.0, SUM_CASES).await;
        let engine = ScriptedEngine::new(|request: &ExecutionRequest| {
            if request.code == "sum()" {
                sum_program(request)
            } else {
                zero_program(request)
            }
        });
        let grader = Grader::new(engine.clone(), store.clone());

        let mut tasks = tokio::task::JoinSet::new();
        for n in 0..8 {
            let grader = grader.clone();
            let code = if n % 2 == 0 { "sum()" } else { "zero()" };
            tasks.spawn(async move {
                let graded = grader.submit(problem_id, code, "javascript").await.unwrap();
                (code, graded)
            });
        }

        let mut ids = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (code, graded) = joined.unwrap();
            let expected = if code == "sum()" { 10.0 } else { 0.0 };
            assert_eq!(graded.result.score_awarded, expected);
            assert_eq!(graded.submission.code, code);
            ids.push(graded.submission.id);
        }

        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(engine.calls(), 16);
        assert_eq!(store.list_submissions(problem_id).await.unwrap().len(), 8);
    }
}
