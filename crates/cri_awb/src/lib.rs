//! This library handles reading from and creating **AWB** archives used by CRI Middleware.
//!
//! # AWB Archive Format Documentation
//!
//! AWB ("AFS2") archives pack the waveforms of an ACB cue sheet. Subfiles are opaque byte ranges,
//! usually HCA audio, addressed by a numeric id that the cue sheet refers to. Archives are either
//! standalone `.awb` files or embedded in a data column of the cue sheet.
//!
//! ## File Structure
//!
//! An archive consists of a header, an id table, an offset table and the subfile data.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x41465332 ("AFS2")                               |
//! | 0x0004         | Version                | 1 byte: 1 or 2                                             |
//! | 0x0005         | Offset Width           | 1 byte: Size of an offset table element (2, 4 or 8)        |
//! | 0x0006         | Id Width               | 2 bytes: Size of an id table element (2 or 4)              |
//! | 0x0008         | Subfile Count          | 4 bytes: Number of subfiles                                |
//! | 0x000C         | Alignment              | 2 bytes: Boundary subfile starts are rounded up to         |
//! | 0x000E         | Subkey                 | 2 bytes: Key modifier for encrypted HCA payloads           |
//!
//! ### Tables
//!
//! The id table holds `count` ids. The offset table that follows holds `count + 1` boundaries:
//! the end of the tables, then the unpadded end of every subfile. Subfile `i` starts at boundary
//! `i` rounded up to the alignment and ends at boundary `i + 1`, so the last boundary is the
//! length of the archive.
//!
//! ### Data
//!
//! Subfiles follow the tables in table order. The gaps between a boundary and the next aligned
//! start are zero.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.awb`
//! - **Endianness**: Little-endian for all multi-byte integers
//! - **Subfile Types**: HCA starts with `HCA\0`, HCA with a masked header with `C8 C3 C1 00`
//!

pub mod error;
pub mod read;
pub mod types;
pub mod write;

/// Magic bytes every archive starts with
pub const MAGIC: &[u8; 4] = b"AFS2";

pub use error::{Error, Result};
pub use read::{decode, AwbArchive, Subfile, SubfileEntry};
pub use types::SubfileKind;
pub use write::{encode, AwbWriter, AwbWriterOptions};
