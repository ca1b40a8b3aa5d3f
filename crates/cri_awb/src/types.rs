//! Base types for structure of an AWB archive.

use binrw::{BinRead, BinWrite};
use byteorder::LittleEndian;
use cri_cursor::ByteCursor;
use derive_more::derive::Display;

use crate::error::{Error, Result};

/// Size of the fixed archive header
pub const HEADER_SIZE: u64 = 0x10;

/// AWB archive header
///
/// Starts with "AFS2". All data is stored in little endian format.
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"AFS2", little)]
pub struct AfsHeader {
    /// Format version, 1 or 2 in archives seen so far
    pub version: u8,

    /// Width in bytes of every offset table element
    pub offset_width: u8,

    /// Width in bytes of every id table element
    pub id_width: u16,

    /// The number of subfiles in the archive
    pub count: u32,

    /// Boundary every subfile start is rounded up to
    pub alignment: u16,

    /// Key modifier for encrypted HCA payloads
    pub subkey: u16,
}

impl AfsHeader {
    /// Checks the table widths and the alignment.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.offset_width, 2 | 4 | 8) {
            return Err(Error::UnsupportedWidth {
                field: "offset",
                width: self.offset_width.into(),
            });
        }
        if !matches!(self.id_width, 2 | 4) {
            return Err(Error::UnsupportedWidth {
                field: "id",
                width: self.id_width,
            });
        }
        if !self.alignment.is_power_of_two() {
            return Err(Error::InvalidAlignment(self.alignment.into()));
        }
        Ok(())
    }

    /// End of the id and offset tables from the start of the archive
    pub fn tables_end(&self) -> u64 {
        let count = u64::from(self.count);
        HEADER_SIZE + count * u64::from(self.id_width) + (count + 1) * u64::from(self.offset_width)
    }
}

/// Reads one unsigned table element of `width` bytes.
pub(crate) fn read_uint(cursor: &mut ByteCursor<&[u8]>, width: u16) -> Result<u64> {
    Ok(match width {
        2 => cursor.read_u16::<LittleEndian>()?.into(),
        4 => cursor.read_u32::<LittleEndian>()?.into(),
        8 => cursor.read_u64::<LittleEndian>()?,
        _ => {
            return Err(Error::UnsupportedWidth {
                field: "table",
                width,
            })
        }
    })
}

/// Writes one unsigned table element of `width` bytes. The value must fit.
pub(crate) fn write_uint(cursor: &mut ByteCursor<Vec<u8>>, width: u16, value: u64) -> Result<()> {
    match width {
        2 => cursor.write_u16::<LittleEndian>(value as u16)?,
        4 => cursor.write_u32::<LittleEndian>(value as u32)?,
        8 => cursor.write_u64::<LittleEndian>(value)?,
        _ => {
            return Err(Error::UnsupportedWidth {
                field: "table",
                width,
            })
        }
    }
    Ok(())
}

/// Payload type of a subfile, sniffed from its first bytes
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SubfileKind {
    /// CRI HCA audio, starts with `HCA\0`
    #[display("HCA")]
    Hca,
    /// HCA with its header masked, starts with `C8 C3 C1 00`
    #[display("HCA (encrypted)")]
    EncryptedHca,
    /// Anything else
    #[display("unknown")]
    Unknown,
}

impl SubfileKind {
    pub fn sniff(data: &[u8]) -> SubfileKind {
        if data.starts_with(b"HCA\0") {
            SubfileKind::Hca
        } else if data.starts_with(&[0xC8, 0xC3, 0xC1, 0x00]) {
            SubfileKind::EncryptedHca
        } else {
            SubfileKind::Unknown
        }
    }

    /// File extension used when extracting
    pub const fn extension(self) -> &'static str {
        match self {
            SubfileKind::Hca | SubfileKind::EncryptedHca => "hca",
            SubfileKind::Unknown => "bin",
        }
    }
}
