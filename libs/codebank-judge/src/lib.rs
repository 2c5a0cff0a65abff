//! Code execution and grading.
//!
//! The engine runs one program against one input, the evaluator turns
//! outputs into verdicts and the grader drives both against a stored problem.

pub mod config;
pub mod engine;
pub mod evaluator;
pub mod executor;


pub use engine::{CodeExecutor, ProcessEngine};
pub use executor::{GradedSubmission, Grader};
