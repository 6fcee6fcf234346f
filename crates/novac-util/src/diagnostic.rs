//! Diagnostic collection.
//!
//! Every pipeline stage owns a [`Handler`] and appends diagnostics to it as
//! it works; non-fatal problems never abort a stage. The driver reads the
//! handler after each stage and decides whether to continue. Rendered form is
//! `<filename>:<line>:<column>: error: <message>`.

use std::cell::RefCell;
use std::fmt;

use crate::SourceLocation;

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// Prevents the driver from continuing past the current stage boundary.
    Error,
    /// Reported but does not fail the compile.
    Warning,
    /// Additional context attached by a stage.
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A single diagnostic message with severity and location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub location: SourceLocation,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.location, self.level, self.message)
    }
}

/// Collects diagnostics for one stage.
///
/// Interior-mutable so lexer/parser/lowering code can report through a shared
/// reference. The compiler is single-threaded; `RefCell` is sufficient.
#[derive(Debug, Default)]
pub struct Handler {
    diagnostics: RefCell<Vec<Diagnostic>>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error at `location`.
    pub fn error(&self, message: impl Into<String>, location: SourceLocation) {
        self.emit(Level::Error, message.into(), location);
    }

    /// Report a warning at `location`.
    pub fn warning(&self, message: impl Into<String>, location: SourceLocation) {
        self.emit(Level::Warning, message.into(), location);
    }

    /// Report a note at `location`.
    pub fn note(&self, message: impl Into<String>, location: SourceLocation) {
        self.emit(Level::Note, message.into(), location);
    }

    fn emit(&self, level: Level, message: String, location: SourceLocation) {
        self.diagnostics.borrow_mut().push(Diagnostic {
            level,
            message,
            location,
        });
    }

    /// True if any error-level diagnostic has been reported.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .borrow()
            .iter()
            .any(|d| d.level == Level::Error)
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .borrow()
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// All diagnostics reported so far, rendered in source order.
    pub fn rendered(&self) -> Vec<String> {
        self.diagnostics
            .borrow()
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    /// Drain all collected diagnostics, leaving the handler empty.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.diagnostics.borrow_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Symbol;

    #[test]
    fn renders_in_compiler_format() {
        let handler = Handler::new();
        let loc = SourceLocation::new(Symbol::intern("app.ts"), 3, 7, 42);
        handler.error("unexpected token", loc);

        let rendered = handler.rendered();
        assert_eq!(rendered, vec!["app.ts:3:7: error: unexpected token"]);
        assert!(handler.has_errors());
        assert_eq!(handler.error_count(), 1);
    }

    #[test]
    fn warnings_are_not_errors() {
        let handler = Handler::new();
        handler.warning("unused variable", SourceLocation::dummy());
        assert!(!handler.has_errors());
        assert_eq!(handler.error_count(), 0);
        assert_eq!(handler.take().len(), 1);
        assert!(handler.rendered().is_empty());
    }
}
