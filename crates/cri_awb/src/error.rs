//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// The buffer does not start with `AFS2`
    #[error("bad archive magic {found:02X?}, expected \"AFS2\"")]
    BadMagic {
        /// The four bytes found where the magic was expected
        found: [u8; 4],
    },

    /// A header, table or subfile extends past the end of the buffer
    #[error("range {offset:#x}+{requested:#x} exceeds buffer length {len:#x}")]
    TruncatedBuffer {
        offset: u64,
        requested: u64,
        len: u64,
    },

    /// Id or offset table element width other than the supported ones
    #[error("unsupported {field} width {width}")]
    UnsupportedWidth { field: &'static str, width: u16 },

    /// The archive end does not fit the requested offset table width
    #[error("archive end {end:#x} does not fit {width} byte offsets")]
    OffsetOverflow { width: u8, end: u64 },

    /// A subfile id does not fit the requested id table width
    #[error("subfile id {id} does not fit {width} byte ids")]
    IdOverflow { id: u32, width: u16 },

    /// Alignment must be a non-zero power of two that fits the header
    #[error("invalid alignment {0}")]
    InvalidAlignment(u64),

    /// The first subfile boundary points inside the id or offset table
    #[error("first subfile boundary {offset:#x} lies inside the tables ending at {tables_end:#x}")]
    InvalidSection { offset: u64, tables_end: u64 },

    /// A subfile boundary is smaller than the one before it
    #[error("boundary {index} at {offset:#x} is before the previous boundary {previous:#x}")]
    NonMonotonicOffsets {
        index: usize,
        previous: u64,
        offset: u64,
    },

    /// The aligned start of a subfile lies past its end
    #[error("subfile {index} starts at aligned offset {start:#x} past its end {end:#x}")]
    MisalignedOffset { index: usize, start: u64, end: u64 },

    /// Two subfiles share an id
    #[error("duplicate subfile id {0}")]
    DuplicateId(u32),

    /// More subfiles or bytes than the archive tables can address
    #[error("{0} subfiles do not fit an archive")]
    TooManyFiles(usize),

    /// Data was written before [`crate::AwbWriter::start_file`]
    #[error("no file has been started")]
    NoFileStarted,

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// with id {0}
    #[error("with id {0}")]
    Id(u32),
}

impl From<cri_cursor::Error> for Error {
    fn from(value: cri_cursor::Error) -> Self {
        match value {
            cri_cursor::Error::OutOfBounds {
                offset,
                requested,
                len,
            } => Error::TruncatedBuffer {
                offset: offset as u64,
                requested: requested as u64,
                len: len as u64,
            },
            cri_cursor::Error::UnterminatedString { offset } => Error::TruncatedBuffer {
                offset: offset as u64,
                requested: 1,
                len: offset as u64,
            },
            cri_cursor::Error::InvalidAlignment(alignment) => {
                Error::InvalidAlignment(alignment as u64)
            }
        }
    }
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
