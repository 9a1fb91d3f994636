//! Core data model shared by the grading entry points
//!
//! - `problem`: problem definitions and test cases as read from the catalog
//! - `outcome`: grading and ad-hoc outcome records
//! - `verdict`: status vocabularies used by the outcomes

pub mod outcome;
pub mod problem;
pub mod verdict;

pub use outcome::{AdhocOutcome, CaseResult, GradingOutcome, RunSummary};
pub use problem::{Difficulty, Problem, TestCase};
pub use verdict::{AdhocStatus, CaseVerdict, GradingStatus};
