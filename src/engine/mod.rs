//! Embedded interpreter for learner solutions
//!
//! A strict-mode JavaScript subset: lexer, parser, tree-walking evaluator and
//! the built-in library. Values are `Rc`-based and never leave the thread that
//! created them; [`on_evaluation_thread`] gives each run a thread with a stack
//! large enough for the configured call depth.

pub mod ast;
pub mod builtins;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod scope;
pub mod value;

pub use error::ParseError;
pub use interpreter::{
    describe_thrown, describe_unwind, EvalOptions, EvalResult, Interpreter, Unwind,
};
pub use value::Value;

use std::any::Any;

use anyhow::{anyhow, Context, Result};

/// Text carried by a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

/// Run `work` on a dedicated thread with `stack_size_mb` of stack and wait for it.
///
/// A panic inside `work` is returned as an error instead of unwinding into the caller.
pub fn on_evaluation_thread<F, R>(stack_size_mb: usize, work: F) -> Result<R>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("practice-judge-eval".to_string())
            .stack_size(stack_size_mb.max(1) * 1024 * 1024)
            .spawn_scoped(scope, work)
            .context("Failed to spawn evaluation thread")?;
        handle
            .join()
            .map_err(|panic| anyhow!("Evaluation thread panicked: {}", panic_message(&*panic)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluation_thread_returns_result() {
        let answer = on_evaluation_thread(4, || 6 * 7).unwrap();
        assert_eq!(answer, 42);
    }

    #[test]
    fn test_evaluation_thread_contains_panics() {
        let err = on_evaluation_thread(4, || -> u32 { panic!("kaboom") }).unwrap_err();
        assert!(err.to_string().contains("kaboom"));
    }

    #[test]
    fn test_deep_recursion_hits_call_depth_not_native_stack() {
        let outcome = on_evaluation_thread(256, || {
            let program = parser::parse_program("function f(n) { return f(n + 1); } f(0);")
                .expect("program parses");
            let mut interpreter = Interpreter::new(EvalOptions::default());
            match interpreter.run_program(&program) {
                Err(Unwind::Throw(value)) => describe_thrown(&value).0,
                _ => String::new(),
            }
        })
        .unwrap();
        assert_eq!(outcome, "Maximum call stack size exceeded");
    }
}
