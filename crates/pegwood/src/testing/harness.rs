use std::fmt;

use crate::error::ParseError;
use crate::error::diagnostics::caret_line;
use crate::grammar::builder::Grammar;
use crate::results::ParseResults;

/// Options for [`run_tests`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunTestsOptions {
    /// Require each test line to match completely
    pub parse_all: bool,
    /// Lines starting with this character are skipped
    pub comment: Option<char>,
    /// Expect every line to fail instead of succeed
    pub failure_tests: bool,
}

impl Default for RunTestsOptions {
    fn default() -> Self {
        Self {
            parse_all: true,
            comment: Some('#'),
            failure_tests: false,
        }
    }
}

impl RunTestsOptions {
    /// Every line is expected to fail
    #[must_use]
    pub fn failures() -> Self {
        Self {
            failure_tests: true,
            ..Self::default()
        }
    }
}

/// One line of a test run
#[derive(Debug, Clone)]
pub struct TestCase {
    pub input: String,
    pub outcome: Result<ParseResults, ParseError>,
    pub passed: bool,
}

impl TestCase {
    /// The dumped results, or the caret line and message of the failure
    #[must_use]
    pub fn report(&self) -> String {
        let mut out = self.input.clone();
        out.push('\n');
        match &self.outcome {
            Ok(results) => out.push_str(&results.dump()),
            Err(ParseError::Syntax(failure)) => {
                if failure.line_text() != self.input {
                    out.push_str(failure.line_text());
                    out.push('\n');
                }
                out.push_str(&caret_line(failure.line_text(), failure.column()));
                out.push('\n');
                out.push_str(&format!("ParseFailure: {failure}"));
            }
            Err(err) => out.push_str(&format!("Error: {err}")),
        }
        if !self.passed {
            out.push_str(if self.outcome.is_ok() {
                "\nFAIL: expected a failure"
            } else {
                "\nFAIL"
            });
        }
        out
    }
}

/// The outcome of [`run_tests`]
#[derive(Debug, Clone)]
pub struct TestRun {
    pub all_passed: bool,
    pub cases: Vec<TestCase>,
}

impl TestRun {
    /// Cases that did not behave as expected
    pub fn failures(&self) -> impl Iterator<Item = &TestCase> {
        self.cases.iter().filter(|case| !case.passed)
    }

    /// Assert that every case passed
    ///
    /// # Panics
    /// Panics with the report of each failing case
    pub fn assert_all_passed(&self) {
        if !self.all_passed {
            let reports: Vec<String> = self.failures().map(TestCase::report).collect();
            panic!("{} test case(s) failed:\n\n{}", reports.len(), reports.join("\n\n"));
        }
    }
}

impl fmt::Display for TestRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for case in &self.cases {
            writeln!(f, "{}", case.report())?;
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Parse each line of `tests` and report how each one went
///
/// Lines are trimmed. Blank lines and comment lines are skipped. A line
/// passes when it parses, or when it fails and
/// [`RunTestsOptions::failure_tests`] is set.
pub fn run_tests(grammar: &Grammar, tests: &str, options: &RunTestsOptions) -> TestRun {
    let mut cases = Vec::new();
    for line in tests.lines().map(str::trim) {
        if line.is_empty() || options.comment.is_some_and(|c| line.starts_with(c)) {
            continue;
        }
        let outcome = grammar.parse(line, options.parse_all);
        let passed = outcome.is_ok() != options.failure_tests;
        if !passed {
            log::debug!("test case failed: {line:?}");
        }
        cases.push(TestCase {
            input: line.to_owned(),
            outcome,
            passed,
        });
    }
    TestRun {
        all_passed: cases.iter().all(|case| case.passed),
        cases,
    }
}

impl Grammar {
    /// [`run_tests`] against this grammar
    #[must_use]
    pub fn run_tests(&self, tests: &str, options: &RunTestsOptions) -> TestRun {
        run_tests(self, tests, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::expr::Expr;

    #[test]
    fn test_skips_blank_and_comment_lines() {
        let grammar = Grammar::from_expr(Expr::integer()).expect("builds");
        let run = grammar.run_tests("  # numbers\n 12 \n\n 7\n", &RunTestsOptions::default());
        assert!(run.all_passed);
        let inputs: Vec<_> = run.cases.iter().map(|c| c.input.as_str()).collect();
        assert_eq!(inputs, ["12", "7"]);
    }

    #[test]
    fn test_failure_report() {
        let grammar = Grammar::from_expr(Expr::literal("x") + "y").expect("builds");
        let run = grammar.run_tests("x z", &RunTestsOptions::default());
        assert!(!run.all_passed);
        assert_eq!(
            run.cases[0].report(),
            "x z\n  ^\nParseFailure: Expected \"y\", found \"z\" (at char 2), (line:1, col:3)\nFAIL"
        );
    }

    #[test]
    fn test_failure_tests_invert() {
        let grammar = Grammar::from_expr(Expr::integer()).expect("builds");
        let run = grammar.run_tests("abc\n-", &RunTestsOptions::failures());
        assert!(run.all_passed);
        assert_eq!(run.failures().count(), 0);
    }
}
