//! Script runtime (spec.md §4.K): an explicit step state machine
//! replacing the original interpreter's line-by-line C loop with
//! `goto`-driven control flow (per the REDESIGN FLAGS note: no
//! setjmp-style abort, a plain enum instead).

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::ErrorKind;

pub const RETURN_STACK_DEPTH: usize = 15;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("gosub return stack is full")]
    ReturnStackFull,
    #[error("return with nothing on the stack")]
    ReturnStackEmpty,
    #[error("tag not found: {0}")]
    TagNotFound(String),
}

impl ScriptError {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            ScriptError::ReturnStackFull | ScriptError::ReturnStackEmpty => ErrorKind::Fatal,
            ScriptError::TagNotFound(_) => ErrorKind::Parse,
        }
    }
}

/// The outcome of executing one line, replacing the original's
/// longjmp-to-abort with an explicit step result (spec.md §9 REDESIGN
/// FLAGS).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue,
    Exit { remove_file: bool, chain_to: Option<String> },
    Jump(String),
    Gosub(String),
    Return,
}

/// True when `line`, after the optional ignore-failure `-` prefix and
/// whitespace, is blank or a `#` comment.
pub fn is_comment_or_blank(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.is_empty() || trimmed.starts_with('#')
}

/// Whether the leading `-` that suppresses a non-success return is
/// present, and the command text with it stripped.
pub fn strip_ignore_failure(line: &str) -> (bool, &str) {
    match line.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, line),
    }
}

/// A `# TAG` or `# TAG:` comment line at the start of a line, as
/// searched for by `goto`/`gosub` (spec.md §4.K step 4).
pub fn matches_tag(line: &str, tag: &str) -> bool {
    let trimmed = line.trim_start();
    let Some(rest) = trimmed.strip_prefix('#') else {
        return false;
    };
    let rest = rest.trim_start();
    rest == tag || rest.strip_suffix(':').is_some_and(|t| t == tag)
}

pub fn find_tag<'a>(lines: &'a [String], tag: &str) -> Option<usize> {
    lines.iter().position(|line| matches_tag(line, tag))
}

/// The `gosub`/`return` call stack (spec.md §4.K: capacity 15,
/// `gosub` while full is rejected).
#[derive(Debug, Default)]
pub struct ReturnStack {
    frames: Vec<usize>,
}

impl ReturnStack {
    pub fn push(&mut self, line_no: usize) -> Result<(), ScriptError> {
        if self.frames.len() >= RETURN_STACK_DEPTH {
            return Err(ScriptError::ReturnStackFull);
        }
        self.frames.push(line_no);
        Ok(())
    }

    pub fn pop(&mut self) -> Result<usize, ScriptError> {
        self.frames.pop().ok_or(ScriptError::ReturnStackEmpty)
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

/// Drives one script to completion by repeatedly calling a dispatch
/// closure for each non-comment line (spec.md §4.K steps 1-4).
pub struct Runtime {
    pub lines: Vec<String>,
    pub cursor: usize,
    pub verbose: bool,
    pub return_stack: ReturnStack,
}

impl Runtime {
    pub fn new(text: &str) -> Self {
        Runtime {
            lines: text.lines().map(ToString::to_string).collect(),
            cursor: 0,
            verbose: false,
            return_stack: ReturnStack::default(),
        }
    }

    /// Advance past the current line and return it, or `None` at EOF.
    pub fn read_line(&mut self) -> Option<String> {
        let line = self.lines.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(line)
    }

    /// Apply a `Step` produced by dispatching the last line read.
    /// Returns `Ok(true)` to keep running, `Ok(false)` to terminate.
    pub fn apply(&mut self, step: Step) -> Result<bool, ScriptError> {
        match step {
            Step::Continue => Ok(true),
            Step::Exit { .. } => Ok(false),
            Step::Jump(tag) => {
                let target = find_tag(&self.lines, &tag).ok_or(ScriptError::TagNotFound(tag))?;
                self.cursor = target + 1;
                Ok(true)
            }
            Step::Gosub(tag) => {
                let target = find_tag(&self.lines, &tag).ok_or_else(|| ScriptError::TagNotFound(tag.clone()))?;
                self.return_stack.push(self.cursor)?;
                self.cursor = target + 1;
                Ok(true)
            }
            Step::Return => {
                self.cursor = self.return_stack.pop()?;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(is_comment_or_blank(""));
        assert!(is_comment_or_blank("   "));
        assert!(is_comment_or_blank("# a comment"));
        assert!(!is_comment_or_blank("set FOO=1"));
    }

    #[test]
    fn ignore_failure_prefix_is_detected_and_stripped() {
        assert_eq!(strip_ignore_failure("-dhcp"), (true, "dhcp"));
        assert_eq!(strip_ignore_failure("dhcp"), (false, "dhcp"));
    }

    #[test]
    fn tag_matches_with_or_without_trailing_colon() {
        assert!(matches_tag("# RETRY", "RETRY"));
        assert!(matches_tag("# RETRY:", "RETRY"));
        assert!(!matches_tag("# OTHER", "RETRY"));
    }

    #[test]
    fn gosub_then_return_round_trips_the_cursor() {
        let script = "gosub SUB\necho after\nexit\n# SUB\necho inside\nreturn\n";
        let mut rt = Runtime::new(script);
        rt.read_line(); // "gosub SUB"
        rt.apply(Step::Gosub("SUB".into())).unwrap();
        assert_eq!(rt.lines[rt.cursor], "echo inside");
        rt.read_line();
        rt.read_line(); // "return"
        rt.apply(Step::Return).unwrap();
        assert_eq!(rt.lines[rt.cursor], "echo after");
    }

    #[test]
    fn gosub_rejects_when_stack_is_full() {
        let mut stack = ReturnStack::default();
        for i in 0..RETURN_STACK_DEPTH {
            stack.push(i).unwrap();
        }
        assert!(matches!(stack.push(99), Err(ScriptError::ReturnStackFull)));
    }

    #[test]
    fn return_with_empty_stack_is_an_error() {
        let mut stack = ReturnStack::default();
        assert!(matches!(stack.pop(), Err(ScriptError::ReturnStackEmpty)));
    }

    #[test]
    fn jump_to_missing_tag_errors() {
        let mut rt = Runtime::new("echo hi\n");
        assert!(matches!(rt.apply(Step::Jump("NOPE".into())), Err(ScriptError::TagNotFound(_))));
    }
}
