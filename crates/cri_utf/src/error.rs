//! Error types that can be emitted from this library
//!
//! Offsets in decode errors are relative to the start of the table header.

use miette::Diagnostic;
use thiserror::Error;

use crate::types::DataType;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// The buffer does not start with `@UTF`
    #[error("bad table magic {found:02X?}, expected \"@UTF\"")]
    BadMagic {
        /// The four bytes found where the magic was expected
        found: [u8; 4],
    },

    /// A read ran past the end of the table or one of its regions
    #[error("range {offset:#x}+{requested:#x} exceeds available length {len:#x}")]
    TruncatedBuffer {
        offset: usize,
        requested: usize,
        len: usize,
    },

    /// Header offsets describe overlapping or out of order regions
    #[error("{section} region {start:#x}..{end:#x} is invalid")]
    InvalidSection {
        section: &'static str,
        start: usize,
        end: usize,
    },

    /// Reserved storage flags or type code in a schema record
    #[error("column {column} has unsupported flags {flags:#04x}")]
    UnknownColumnType { column: usize, flags: u8 },

    /// Per-row columns need more bytes than the declared row stride
    #[error("row layout needs {needed} bytes but the stride is {stride}")]
    RowOverflow { needed: usize, stride: usize },

    /// String offset outside the string pool or missing its terminator
    #[error("string reference {offset:#x} is invalid for a pool of {pool_len:#x} bytes")]
    InvalidStringRef { offset: u32, pool_len: usize },

    /// String pool entry is not valid UTF-8
    #[error("string at pool offset {offset:#x} is not valid utf-8")]
    InvalidUtf8 { offset: u32 },

    /// Data span outside the data pool
    #[error("data reference {offset:#x}+{size:#x} is invalid for a pool of {pool_len:#x} bytes")]
    InvalidDataRef {
        offset: u32,
        size: u32,
        pool_len: usize,
    },

    /// A cell or constant does not have its column's type
    #[error("column {column:?} expects {expected} but found {found}")]
    ColumnWidthMismatch {
        column: String,
        expected: DataType,
        found: DataType,
    },

    /// A row does not have one cell per column
    #[error("row {row} has {found} cells, expected {expected}")]
    RowLengthMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    /// A row disagrees with the value a constant or zero column stores for every row
    #[error("row {row} of column {column:?} differs from the column's stored value")]
    ConstantMismatch { column: String, row: usize },

    /// Strings are stored null-terminated and cannot contain a nul byte
    #[error("string {0:?} contains a nul byte")]
    InteriorNul(String),

    /// A count or offset does not fit its header field
    #[error("{field} of {value} does not fit the table header")]
    TableTooLarge { field: &'static str, value: usize },

    /// Data alignment must be a non-zero power of two
    #[error("invalid data alignment {0}")]
    InvalidAlignment(u32),
}

impl From<cri_cursor::Error> for Error {
    fn from(value: cri_cursor::Error) -> Self {
        match value {
            cri_cursor::Error::OutOfBounds {
                offset,
                requested,
                len,
            } => Error::TruncatedBuffer {
                offset,
                requested,
                len,
            },
            cri_cursor::Error::UnterminatedString { offset } => Error::TruncatedBuffer {
                offset,
                requested: 1,
                len: offset,
            },
            cri_cursor::Error::InvalidAlignment(alignment) => {
                Error::InvalidAlignment(alignment as u32)
            }
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
