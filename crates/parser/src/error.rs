use thiserror::Error;

pub use crate::ast::Span;

impl Span {
    #[inline]
    pub const fn empty_at(pos: usize) -> Self {
        let p = if pos > u32::MAX as usize {
            u32::MAX
        } else {
            pos as u32
        };
        Self { start: p, end: p }
    }

    #[inline]
    pub const fn single_at(pos: usize) -> Self {
        let p = if pos > u32::MAX as usize {
            u32::MAX
        } else {
            pos as u32
        };
        Self {
            start: p,
            end: p.saturating_add(1),
        }
    }

    pub fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Parse,
            span,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for Diag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// A file that failed to parse. `diags` is never empty.
#[derive(Debug, Error)]
#[error("{} syntax error(s), first: {}", .diags.len(), .diags.first().map(|d| d.message.as_str()).unwrap_or(""))]
pub struct ParseFailure {
    pub diags: Vec<Diag>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Lex,
            span: self.span,
            message: self.kind.to_string(),
        }
    }
}
