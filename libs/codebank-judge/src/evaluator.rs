/// Test Evaluator - Language-Agnostic Scoring Logic
///
/// **Core Responsibility:**
/// Compare actual program output against a test case's expected output and
/// aggregate the per-case verdicts into a score.
///
/// **Critical Properties:**
/// - Knows nothing about interpreters or processes
/// - Knows nothing about the store
/// - Pure functions: (test case, actual output) → verdict
///
/// **Scoring Rules:**
/// - A passed case awards its own points, a failed case awards 0
/// - score = sum of points over passed cases
/// - max_score = the problem's declared total (not recomputed)
///
/// **Normalization Rules:**
/// - Trim leading and trailing whitespace: YES
/// - Collapse internal whitespace: NO
/// - Case sensitivity: YES (exact match required)

use codebank_common::types::{CaseResult, GradingResult, TestCase};

/// Normalize output string for comparison
///
/// Removes leading/trailing whitespace, which also absorbs trailing
/// newlines and `\r\n` at the ends. Everything inside is preserved.
pub fn normalize_output(output: &str) -> &str {
    output.trim()
}

/// Judge one successful execution against its test case
pub fn evaluate_case(test_case: &TestCase, actual: &str) -> CaseResult {
    let passed = normalize_output(actual) == normalize_output(&test_case.expected_output);

    CaseResult {
        passed,
        input: test_case.input.clone(),
        expected: test_case.expected_output.clone(),
        actual: actual.to_string(),
        points_awarded: if passed { test_case.points } else { 0.0 },
    }
}

/// Aggregate per-case verdicts into the final grading result
pub fn aggregate(max_score: f64, per_case: Vec<CaseResult>) -> GradingResult {
    let passed_count = per_case.iter().filter(|c| c.passed).count();
    let score_awarded: f64 = per_case
        .iter()
        .filter(|c| c.passed)
        .map(|c| c.points_awarded)
        .sum();

    GradingResult {
        passed_count,
        total_count: per_case.len(),
        score_awarded,
        max_score,
        per_case,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    /// Helper to create a test case
    fn make_test_case(expected_output: &str, points: f64) -> TestCase {
        TestCase {
            id: Uuid::new_v4(),
            problem_id: Uuid::nil(),
            input: "input".to_string(),
            expected_output: expected_output.to_string(),
            points,
            difficulty: Default::default(),
        }
    }

    #[test]
    fn test_normalize_output() {
        assert_eq!(normalize_output("hello"), "hello");
        assert_eq!(normalize_output("  hello  "), "hello");
        assert_eq!(normalize_output("hello\n"), "hello");
        assert_eq!(normalize_output("\r\nhello\r\n"), "hello");
        assert_eq!(normalize_output("  hello world  \n"), "hello world");
        assert_eq!(normalize_output(""), "");
        assert_eq!(normalize_output("   "), "");
    }

    #[test]
    fn test_exact_match() {
        let result = evaluate_case(&make_test_case("120", 10.0), "120");
        assert!(result.passed);
        assert_eq!(result.points_awarded, 10.0);
        assert_eq!(result.actual, "120");
    }

    #[test]
    fn test_surrounding_whitespace_ignored() {
        let result = evaluate_case(&make_test_case(" hello ", 10.0), "  hello  \n");
        assert!(result.passed);
        // actual output is reported as produced
        assert_eq!(result.actual, "  hello  \n");
    }

    #[test]
    fn test_internal_whitespace_matters() {
        let result = evaluate_case(&make_test_case("1 2", 10.0), "1  2");
        assert!(!result.passed);
        assert_eq!(result.points_awarded, 0.0);
    }

    #[test]
    fn test_case_sensitivity() {
        assert!(!evaluate_case(&make_test_case("Hello", 10.0), "hello").passed);
    }

    #[test]
    fn test_multiline_output() {
        let result = evaluate_case(&make_test_case("line1\nline2\nline3", 10.0), "line1\nline2\nline3\n");
        assert!(result.passed);
    }

    #[test]
    fn test_empty_output() {
        assert!(evaluate_case(&make_test_case("", 5.0), "   \n").passed);
    }

    #[test]
    fn test_aggregate_partial_pass() {
        let cases = vec![
            evaluate_case(&make_test_case("correct", 20.0), "correct"),
            evaluate_case(&make_test_case("wrong", 30.0), "incorrect"),
            evaluate_case(&make_test_case("7", 2.5), "7\n"),
        ];

        let result = aggregate(52.5, cases);

        assert_eq!(result.passed_count, 2);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.score_awarded, 22.5);
        assert_eq!(result.max_score, 52.5);
        let awarded: f64 = result
            .per_case
            .iter()
            .filter(|c| c.passed)
            .map(|c| c.points_awarded)
            .sum();
        assert_eq!(awarded, result.score_awarded);
    }

    #[test]
    fn test_max_score_is_not_recomputed() {
        let cases = vec![evaluate_case(&make_test_case("1", 10.0), "1")];
        let result = aggregate(100.0, cases);
        assert_eq!(result.score_awarded, 10.0);
        assert_eq!(result.max_score, 100.0);
    }

    #[test]
    fn test_zero_point_case() {
        let result = aggregate(0.0, vec![evaluate_case(&make_test_case("ok", 0.0), "ok")]);
        assert_eq!(result.passed_count, 1);
        assert_eq!(result.score_awarded, 0.0);
    }

    #[test]
    fn test_no_cases() {
        let result = aggregate(10.0, Vec::new());
        assert_eq!(result.passed_count, 0);
        assert_eq!(result.total_count, 0);
        assert_eq!(result.score_awarded, 0.0);
    }
}
