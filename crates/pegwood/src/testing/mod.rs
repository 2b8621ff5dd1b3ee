//! # Test Harness
//!
//! Runs a grammar over a block of sample inputs, one per line, and reports
//! each result or failure. Handy for grammar development and doc examples.

mod harness;

pub use harness::{run_tests, RunTestsOptions, TestCase, TestRun};
