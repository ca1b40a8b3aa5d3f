//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A read or write touched bytes past the end of the buffer
    #[error("range {offset:#x}+{requested:#x} exceeds buffer length {len:#x}")]
    OutOfBounds {
        /// Start of the requested range
        offset: usize,
        /// Number of bytes requested
        requested: usize,
        /// Length of the underlying buffer
        len: usize,
    },

    /// No null terminator between the string start and the end of the buffer
    #[error("string at {offset:#x} is not null-terminated")]
    UnterminatedString {
        /// Absolute offset where the string starts
        offset: usize,
    },

    /// Padding was requested to a zero boundary
    #[error("invalid alignment {0}")]
    InvalidAlignment(usize),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
