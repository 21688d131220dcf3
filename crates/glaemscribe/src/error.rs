//! The closed set of diagnostics a mode can produce.
//!
//! Compile-time diagnostics (everything but [`Warning`]) accumulate in a
//! [`Mode`](crate::mode::Mode)'s error log during finalization and abort
//! activation. Runtime [`Warning`]s never abort a transcription; they ride
//! alongside the output.

use serde::Serialize;
use std::fmt;

/// One compile-time diagnostic, tagged with the closed kind it belongs to.
///
/// The four kinds mirror the four ways a mode can fail to compile: a
/// malformed document (`Parse`), a variable that can't be resolved
/// (`Resolution`), a rule or macro that doesn't type-check against the
/// sheaf/prototype rules (`Compile`), or a charset reference that doesn't
/// exist (`Charset`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeError {
    pub kind: ErrorKind,
    pub line: u32,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Parse,
    Resolution,
    Compile,
    Charset,
}

impl ModeError {
    pub fn parse(line: u32, message: impl Into<String>) -> Self {
        ModeError { kind: ErrorKind::Parse, line, message: message.into() }
    }

    pub fn resolution(line: u32, message: impl Into<String>) -> Self {
        ModeError { kind: ErrorKind::Resolution, line, message: message.into() }
    }

    pub fn compile(line: u32, message: impl Into<String>) -> Self {
        ModeError { kind: ErrorKind::Compile, line, message: message.into() }
    }

    pub fn charset(line: u32, message: impl Into<String>) -> Self {
        ModeError { kind: ErrorKind::Charset, line, message: message.into() }
    }
}

impl fmt::Display for ModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:?}: {}", self.line, self.kind, self.message)
    }
}

/// An ordered collection of [`ModeError`]s accumulated while finalizing a mode.
///
/// Errors are appended in the order they're discovered; nothing here
/// deduplicates or reorders them, since `line`-ordering is part of the
/// user-facing contract for reproducible diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ErrorLog(pub Vec<ModeError>);

impl ErrorLog {
    pub fn new() -> Self {
        ErrorLog(Vec::new())
    }

    pub fn push(&mut self, error: ModeError) {
        self.0.push(error);
    }

    pub fn extend(&mut self, other: ErrorLog) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModeError> {
        self.0.iter()
    }
}

impl fmt::Display for ErrorLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{err}")?;
        }
        Ok(())
    }
}

/// A runtime-only warning: degrade gracefully, never abort.
///
/// Bounded per call by [`WarningSink::cap`]; once the cap is hit, further
/// warnings of this call are silently dropped (the cap itself is recorded
/// so callers can tell truncation happened).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Warning {
    pub message: String,
}

impl Warning {
    pub fn unmapped_token(token: &str) -> Self {
        Warning { message: format!("unmapped token: {token}") }
    }
}

/// Accumulates [`Warning`]s for a single transcription call, bounded by `cap`.
#[derive(Debug, Clone)]
pub struct WarningSink {
    warnings: Vec<Warning>,
    cap: usize,
    truncated: bool,
}

impl WarningSink {
    pub fn new(cap: usize) -> Self {
        WarningSink { warnings: Vec::new(), cap, truncated: false }
    }

    /// Record a warning unless the cap has already been reached.
    pub fn push(&mut self, warning: Warning) {
        if self.warnings.len() < self.cap {
            self.warnings.push(warning);
        } else {
            self.truncated = true;
        }
    }

    pub fn truncated(&self) -> bool {
        self.truncated
    }

    pub fn into_vec(self) -> Vec<Warning> {
        self.warnings
    }
}

impl Default for WarningSink {
    /// A generous default cap; callers doing bulk transcription should
    /// construct their own sink with a tighter bound.
    fn default() -> Self {
        WarningSink::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_log_preserves_order() {
        let mut log = ErrorLog::new();
        log.push(ModeError::parse(3, "a"));
        log.push(ModeError::compile(1, "b"));
        assert_eq!(log.0[0].line, 3);
        assert_eq!(log.0[1].line, 1);
    }

    #[test]
    fn warning_sink_truncates_at_cap() {
        let mut sink = WarningSink::new(2);
        sink.push(Warning::unmapped_token("a"));
        sink.push(Warning::unmapped_token("b"));
        sink.push(Warning::unmapped_token("c"));
        assert_eq!(sink.warnings.len(), 2);
        assert!(sink.truncated());
    }
}
