//! Moving YAML parse errors from evaluated coordinates back onto the template.

use std::fmt;

use serde::Serialize;

use crate::helm::shift::ShiftTable;

/// A 0-based line/column position reported by a YAML parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Mark {
    pub line: usize,
    pub column: usize,
}

impl Mark {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.line + 1, self.column + 1)
    }
}

/// A parse error carrying a problem position and an optional context position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkedError {
    pub problem: String,
    pub problem_mark: Option<Mark>,
    pub context: Option<String>,
    pub context_mark: Option<Mark>,
}

impl MarkedError {
    pub fn new(problem: impl Into<String>, problem_mark: Option<Mark>) -> Self {
        Self {
            problem: problem.into(),
            problem_mark,
            context: None,
            context_mark: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>, mark: Option<Mark>) -> Self {
        self.context = Some(context.into());
        self.context_mark = mark;
        self
    }
}

impl fmt::Display for MarkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            write!(f, "{context}")?;
            if let Some(mark) = self.context_mark {
                write!(f, " at line {}, column {}", mark.line + 1, mark.column + 1)?;
            }
            write!(f, ": ")?;
        }
        write!(f, "{}", self.problem)?;
        if let Some(mark) = self.problem_mark {
            write!(f, " at line {}, column {}", mark.line + 1, mark.column + 1)?;
        }
        Ok(())
    }
}

impl std::error::Error for MarkedError {}

impl From<&serde_yaml::Error> for MarkedError {
    fn from(error: &serde_yaml::Error) -> Self {
        // serde_yaml locations are 1-based
        let mark = error.location().map(|location| {
            Mark::new(
                location.line().saturating_sub(1),
                location.column().saturating_sub(1),
            )
        });
        let problem = match error.location() {
            // drop the " at line N column M" suffix, marks are carried separately
            Some(_) => {
                let message = error.to_string();
                match message.rfind(" at line ") {
                    Some(idx) => message[..idx].to_string(),
                    None => message,
                }
            }
            None => error.to_string(),
        };
        Self::new(problem, mark)
    }
}

/// A parse error moved back onto the template source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShiftedMarkedError {
    /// The error as reported against the evaluated source.
    pub original: MarkedError,
    /// The same error with marks moved onto the template source.
    pub shifted: MarkedError,
}

impl ShiftedMarkedError {
    /// Human readable description of how the problem mark moved.
    pub fn describe_shifting(&self) -> String {
        match (self.original.problem_mark, self.shifted.problem_mark) {
            (Some(from), Some(to)) => format!("from {from} to {to}"),
            _ => String::from("without position"),
        }
    }
}

impl fmt::Display for ShiftedMarkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.shifted.fmt(f)
    }
}

impl std::error::Error for ShiftedMarkedError {}

/// A YAML error after relocation was attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RelocatedError {
    /// The problem line had a shift entry.
    Shifted(ShiftedMarkedError),
    /// No shift entry covers the problem line; the error is passed through.
    Unchanged(MarkedError),
}

impl RelocatedError {
    /// The error as it should be reported against the template source.
    pub fn reported(&self) -> &MarkedError {
        match self {
            Self::Shifted(shifted) => &shifted.shifted,
            Self::Unchanged(error) => error,
        }
    }
}

impl fmt::Display for RelocatedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.reported().fmt(f)
    }
}

impl std::error::Error for RelocatedError {}

/// Mark of the first column of the first source line behind a 0-based
/// evaluated line, if there is a shift entry for it.
fn shift_mark(mark: Mark, table: &ShiftTable) -> Option<Mark> {
    table
        .entry(mark.line + 1)
        .map(|entry| Mark::new(entry.original_start.saturating_sub(1), 0))
}

/// Move the marks of `error` onto the template source.
pub fn relocate(error: MarkedError, table: &ShiftTable) -> RelocatedError {
    let Some(problem_mark) = error.problem_mark.and_then(|m| shift_mark(m, table)) else {
        return RelocatedError::Unchanged(error);
    };
    let context_mark = error
        .context_mark
        .map(|m| shift_mark(m, table).unwrap_or(m));

    let shifted = MarkedError {
        problem: error.problem.clone(),
        problem_mark: Some(problem_mark),
        context: error.context.clone(),
        context_mark,
    };
    let shifted = ShiftedMarkedError {
        original: error,
        shifted,
    };
    log::debug!("Shifting YAML exception {}", shifted.describe_shifting());
    RelocatedError::Shifted(shifted)
}
