//! Operator confirmation
//!
//! A replace destroys the target's tables, so it only runs after an explicit
//! yes. The question goes through [`Confirm`] so tests can answer it.

use std::io::{self, BufRead, Write};

use crate::error::Result;

/// Asks the operator a yes/no question
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> Result<bool>;
}

/// Always gives the same answer; used for `--yes` and in tests
#[derive(Debug, Clone, Copy)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm(&mut self, _question: &str) -> Result<bool> {
        Ok(self.0)
    }
}

/// Line-based prompt that repeats the question until it gets y/n
pub struct ConsoleConfirm<R, W> {
    input: R,
    output: W,
}

impl ConsoleConfirm<io::StdinLock<'static>, io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> ConsoleConfirm<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Confirm for ConsoleConfirm<R, W> {
    fn confirm(&mut self, question: &str) -> Result<bool> {
        let mut line = String::new();
        loop {
            write!(self.output, "{} (y/n): ", question)?;
            self.output.flush()?;

            line.clear();
            // Closed input counts as a refusal.
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }

            if let Some(answer) = parse_answer(&line) {
                return Ok(answer);
            }
        }
    }
}

/// `y`/`yes` and `n`/`no`, any case; anything else is unrecognised
pub fn parse_answer(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}
