//! The diagnostic/error model. Every pass reports through this crate rather
//! than writing to stderr directly, splitting "just data" (`Diagnostic`)
//! from "an error type that carries that data" (`FatalError`).

use std::fmt;

use gulc_ast::SourceSpan;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single diagnostic, formatted as
/// `<severity>[<file>, {<line>,<col> to <line>,<col>}]: <message>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub span: SourceSpan,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}, {{{},{} to {},{}}}]: {}",
            self.severity,
            self.file,
            self.span.start.line,
            self.span.start.column,
            self.span.end.line,
            self.span.end.column,
            self.message
        )
    }
}

/// The nine-entry fatal error taxonomy.
#[derive(Debug, Error)]
pub enum FatalError {
    #[error("{0}")]
    SyntaxInternal(Diagnostic),
    #[error("{0}")]
    UnresolvedReference(Diagnostic),
    #[error("{0}")]
    Ambiguous(Diagnostic),
    #[error("{0}")]
    CycleDetected(Diagnostic),
    #[error("{0}")]
    ConstViolation(Diagnostic),
    #[error("{0}")]
    LabelError(Diagnostic),
    #[error("{0}")]
    OverloadMismatch(Diagnostic),
    #[error("{0}")]
    TemplateArityMismatch(Diagnostic),
    #[error("{0}")]
    InternalInvariant(Diagnostic),
}

impl FatalError {
    pub fn diagnostic(&self) -> &Diagnostic {
        match self {
            FatalError::SyntaxInternal(d)
            | FatalError::UnresolvedReference(d)
            | FatalError::Ambiguous(d)
            | FatalError::CycleDetected(d)
            | FatalError::ConstViolation(d)
            | FatalError::LabelError(d)
            | FatalError::OverloadMismatch(d)
            | FatalError::TemplateArityMismatch(d)
            | FatalError::InternalInvariant(d) => d,
        }
    }

    fn make(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Diagnostic {
        Diagnostic { severity: Severity::Error, file: file.into(), span, message: message.into() }
    }

    pub fn unresolved_reference(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::UnresolvedReference(Self::make(file, span, message))
    }

    pub fn ambiguous(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::Ambiguous(Self::make(file, span, message))
    }

    pub fn cycle_detected(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::CycleDetected(Self::make(file, span, message))
    }

    pub fn const_violation(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::ConstViolation(Self::make(file, span, message))
    }

    pub fn label_error(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::LabelError(Self::make(file, span, message))
    }

    pub fn overload_mismatch(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::OverloadMismatch(Self::make(file, span, message))
    }

    pub fn template_arity_mismatch(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::TemplateArityMismatch(Self::make(file, span, message))
    }

    pub fn internal_invariant(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::InternalInvariant(Self::make(file, span, message))
    }

    pub fn syntax_internal(file: impl Into<String>, span: SourceSpan, message: impl Into<String>) -> Self {
        FatalError::SyntaxInternal(Self::make(file, span, message))
    }
}

/// Non-fatal diagnostics accumulated across a pass; the pass keeps going
/// rather than aborting.
#[derive(Debug, Default)]
pub struct Warnings {
    items: Vec<Diagnostic>,
}

impl Warnings {
    pub fn push(&mut self, file: impl Into<String>, span: SourceSpan, message: impl Into<String>) {
        let diag = Diagnostic { severity: Severity::Warning, file: file.into(), span, message: message.into() };
        log::warn!("{diag}");
        self.items.push(diag);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}
