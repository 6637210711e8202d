//! Error types for the tree crate.

use thiserror::Error;

/// Result type for tree operations.
pub type TreeResult<T> = Result<T, TreeError>;

/// Errors that can occur while reading or writing XML text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The XML text could not be parsed.
    #[error("parse failed at byte {position}: {message}")]
    Parse {
        /// Byte offset where the reader stopped.
        position: u64,
        /// Description of the parse error.
        message: String,
    },

    /// The tree could not be written.
    #[error("write failed: {message}")]
    Write {
        /// Description of the write error.
        message: String,
    },

    /// The document contains no element.
    #[error("document has no root element")]
    NoRootElement,

    /// An end tag did not match the open element.
    #[error("unbalanced element: expected </{expected}>, found </{found}>")]
    UnbalancedElement {
        /// Name of the element that was open.
        expected: String,
        /// Name of the end tag that was found.
        found: String,
    },

    /// Content was found after the root element was closed.
    #[error("unexpected content after root element")]
    TrailingContent,
}

impl TreeError {
    /// Create a parse error.
    pub fn parse(position: u64, message: impl Into<String>) -> Self {
        Self::Parse {
            position,
            message: message.into(),
        }
    }

    /// Create a write error.
    pub fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }
}
