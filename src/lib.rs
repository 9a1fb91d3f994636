//! Practice Judge - grading core for coding exercises
//!
//! Takes a learner's source text, compiles it in a fresh interpreter realm,
//! runs it against a problem's test cases and reports a structured verdict.
//!
//! - `judger::run_tests`: grade against every test case
//! - `playground::run_custom`: one ad-hoc call with caller-supplied arguments
//! - `runner`: async wrappers, optionally with a wall-clock limit

pub mod catalog;
pub mod checker;
pub mod compiler;
pub mod config;
pub mod core;
pub mod engine;
pub mod formatter;
pub mod judger;
pub mod playground;
pub mod report;
pub mod runner;

pub use checker::equals;
pub use compiler::{compile, CompileError, CompiledUnit};
pub use formatter::format_value;
pub use judger::{run_tests, GradeOptions};
pub use playground::{parse_arguments, run_custom, InvalidArguments};
