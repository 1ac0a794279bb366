//! Inspection error types and handling.

use std::fmt;

use crate::tag::Lexp;

/// Categories of inspection errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InspectErrorKind {
    /// NaN-boxed word whose top 16 bits are not a known tag
    Decode,
    /// Ordinal or offset outside the cell heap, or the read itself failed
    HeapAccess,
    /// No NUL terminator within the configured maximum length
    UnterminatedString,
    /// A cons cell was reached again from inside its own structure
    CycleDetected,
    /// Traversal went past the configured depth or node cap
    LimitExceeded,
    /// The host could not evaluate a reference expression
    Host,
    /// Malformed reader input, reference expression or symbol file
    Syntax,
}

impl InspectErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            InspectErrorKind::Decode => "decode error",
            InspectErrorKind::HeapAccess => "heap access error",
            InspectErrorKind::UnterminatedString => "unterminated string",
            InspectErrorKind::CycleDetected => "cycle detected",
            InspectErrorKind::LimitExceeded => "limit exceeded",
            InspectErrorKind::Host => "host error",
            InspectErrorKind::Syntax => "syntax error",
        }
    }
}

/// An inspection error with context.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectError {
    /// The category of error
    pub kind: InspectErrorKind,
    /// Human-readable error message
    pub message: String,
    /// The raw word being inspected when the error happened (if known)
    pub word: Option<Lexp>,
    /// Heap ordinal or byte offset involved (if any)
    pub ordinal: Option<u64>,
}

impl InspectError {
    /// Create a new inspection error.
    pub fn new(kind: InspectErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            word: None,
            ordinal: None,
        }
    }

    /// Attach the word under inspection.
    pub fn with_word(mut self, word: Lexp) -> Self {
        self.word = Some(word);
        self
    }

    /// Attach the heap ordinal or byte offset involved.
    pub fn with_ordinal(mut self, ordinal: u64) -> Self {
        self.ordinal = Some(ordinal);
        self
    }

    /// Create a decode error for a NaN word with an unrecognized tag.
    pub fn decode(word: Lexp) -> Self {
        Self::new(
            InspectErrorKind::Decode,
            format!("unrecognized tag bits {:#06x}", word.top16()),
        )
        .with_word(word)
    }

    /// Create a heap access error.
    pub fn heap(what: impl Into<String>) -> Self {
        Self::new(InspectErrorKind::HeapAccess, what)
    }

    /// Create an out-of-range heap access error for a byte offset.
    pub fn out_of_range(offset: u64, extent: usize) -> Self {
        Self::heap(format!(
            "offset {offset:#x} outside cell heap of {extent:#x} bytes"
        ))
        .with_ordinal(offset)
    }

    /// Create an unterminated string error.
    pub fn unterminated(offset: u64, max_len: usize) -> Self {
        Self::new(
            InspectErrorKind::UnterminatedString,
            format!("no NUL within {max_len} bytes of cell[{offset:#x}]"),
        )
        .with_ordinal(offset)
    }

    /// Create a cycle error for a revisited cons ordinal.
    pub fn cycle(ordinal: u32) -> Self {
        Self::new(
            InspectErrorKind::CycleDetected,
            format!("cons cell @{ordinal:#x} reached from itself"),
        )
        .with_ordinal(u64::from(ordinal))
    }

    /// Create a limit error.
    pub fn limit(what: impl Into<String>) -> Self {
        Self::new(InspectErrorKind::LimitExceeded, what)
    }

    /// Create a host evaluation error.
    pub fn host(what: impl Into<String>) -> Self {
        Self::new(InspectErrorKind::Host, what)
    }

    /// Create a syntax error.
    pub fn syntax(what: impl Into<String>) -> Self {
        Self::new(InspectErrorKind::Syntax, what)
    }
}

impl fmt::Display for InspectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.label(), self.message)?;
        if let Some(word) = self.word {
            write!(f, " (word {word})")?;
        }
        Ok(())
    }
}

impl std::error::Error for InspectError {}

impl From<InspectError> for String {
    fn from(err: InspectError) -> String {
        err.to_string()
    }
}

pub type Result<T> = std::result::Result<T, InspectError>;
