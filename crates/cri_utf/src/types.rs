//! Base types for the structure of a @UTF table.

use binrw::{BinRead, BinWrite};
use derive_more::derive::Display;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Size of the fixed table header
pub const HEADER_SIZE: usize = 0x20;

/// Header offsets and the table size are stored relative to this position
pub const HEADER_BIAS: usize = 0x08;

/// @UTF table header
///
/// Starts with "@UTF". All data is stored in big endian format and every
/// offset is stored minus [`HEADER_BIAS`], i.e. relative to the end of the size field.
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(magic = b"@UTF", big)]
pub struct UtfHeader {
    /// The number of bytes following this field
    pub table_size: u32,

    /// Format version word, usually 0x0001
    pub version: u16,

    /// The start of the row region
    pub rows_offset: u16,

    /// The start of the string pool
    pub strings_offset: u32,

    /// The start of the data pool
    pub data_offset: u32,

    /// Offset of the table name inside the string pool
    pub name_offset: u32,

    /// The number of schema records
    pub column_count: u16,

    /// The size in bytes of every row record
    pub row_stride: u16,

    /// The number of row records
    pub row_count: u32,
}

impl UtfHeader {
    /// Total size of the table including the header
    pub fn table_len(&self) -> usize {
        self.table_size as usize + HEADER_BIAS
    }

    /// Start of the row region from the start of the table
    pub fn rows_start(&self) -> usize {
        self.rows_offset as usize + HEADER_BIAS
    }

    /// Start of the string pool from the start of the table
    pub fn strings_start(&self) -> usize {
        self.strings_offset as usize + HEADER_BIAS
    }

    /// Start of the data pool from the start of the table
    pub fn data_start(&self) -> usize {
        self.data_offset as usize + HEADER_BIAS
    }
}

/// Value type of a column, stored in the low nibble of the schema flags
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum DataType {
    UInt8 = 0x00,
    Int8 = 0x01,
    UInt16 = 0x02,
    Int16 = 0x03,
    UInt32 = 0x04,
    Int32 = 0x05,
    UInt64 = 0x06,
    Int64 = 0x07,
    Float32 = 0x08,
    Float64 = 0x09,
    /// Offset into the string pool
    String = 0x0A,
    /// Offset and size in the data pool
    Data = 0x0B,
}

impl DataType {
    /// Number of bytes a value occupies in a schema or row record
    pub const fn width(self) -> usize {
        match self {
            DataType::UInt8 | DataType::Int8 => 1,
            DataType::UInt16 | DataType::Int16 => 2,
            DataType::UInt32 | DataType::Int32 | DataType::Float32 | DataType::String => 4,
            DataType::UInt64 | DataType::Int64 | DataType::Float64 | DataType::Data => 8,
        }
    }

    /// The value every row of a [`StorageKind::Zero`] column reads
    pub fn zero(self) -> Value {
        match self {
            DataType::UInt8 => Value::UInt8(0),
            DataType::Int8 => Value::Int8(0),
            DataType::UInt16 => Value::UInt16(0),
            DataType::Int16 => Value::Int16(0),
            DataType::UInt32 => Value::UInt32(0),
            DataType::Int32 => Value::Int32(0),
            DataType::UInt64 => Value::UInt64(0),
            DataType::Int64 => Value::Int64(0),
            DataType::Float32 => Value::Float32(0.0),
            DataType::Float64 => Value::Float64(0.0),
            DataType::String => Value::String(String::new()),
            DataType::Data => Value::Data(Vec::new()),
        }
    }
}

impl TryFrom<u8> for DataType {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x00 => DataType::UInt8,
            0x01 => DataType::Int8,
            0x02 => DataType::UInt16,
            0x03 => DataType::Int16,
            0x04 => DataType::UInt32,
            0x05 => DataType::Int32,
            0x06 => DataType::UInt64,
            0x07 => DataType::Int64,
            0x08 => DataType::Float32,
            0x09 => DataType::Float64,
            0x0A => DataType::String,
            0x0B => DataType::Data,
            _ => return Err(value),
        })
    }
}

/// Where a column keeps its value, stored in the high nibble of the schema flags
///
/// | Flags  | Kind                       |
/// |--------|----------------------------|
/// | `0x10` | name only ([`Zero`](StorageKind::Zero)) |
/// | `0x30` | name + constant            |
/// | `0x50` | name + per row             |
/// | `0x70` | name + constant + per row  |
#[derive(Debug, Display, Copy, Clone, PartialEq, Eq, Hash)]
pub enum StorageKind {
    /// No value is stored, rows read the type's zero value
    Zero,
    /// One value in the schema record shared by all rows
    Constant,
    /// One value per row record
    PerRow,
    /// Legacy layout with a schema constant as well as per row values
    PerRowWithConstantName,
}

const FLAG_NAME: u8 = 0x10;
const FLAG_CONSTANT: u8 = 0x20;
const FLAG_ROW: u8 = 0x40;

impl StorageKind {
    /// High nibble of the schema flags byte
    pub const fn flags(self) -> u8 {
        match self {
            StorageKind::Zero => FLAG_NAME,
            StorageKind::Constant => FLAG_NAME | FLAG_CONSTANT,
            StorageKind::PerRow => FLAG_NAME | FLAG_ROW,
            StorageKind::PerRowWithConstantName => FLAG_NAME | FLAG_CONSTANT | FLAG_ROW,
        }
    }

    /// Whether the schema record carries a value
    pub const fn has_constant(self) -> bool {
        self.flags() & FLAG_CONSTANT != 0
    }

    /// Whether every row record carries a value
    pub const fn is_per_row(self) -> bool {
        self.flags() & FLAG_ROW != 0
    }
}

/// Splits a schema flags byte into its storage kind and data type.
///
/// Returns `None` for reserved bits and unsupported combinations.
pub fn parse_flags(flags: u8) -> Option<(StorageKind, DataType)> {
    let kind = match flags & 0xF0 {
        0x10 => StorageKind::Zero,
        0x30 => StorageKind::Constant,
        0x50 => StorageKind::PerRow,
        0x70 => StorageKind::PerRowWithConstantName,
        _ => return None,
    };
    let data_type = DataType::try_from(flags & 0x0F).ok()?;
    Some((kind, data_type))
}

/// Packs a storage kind and data type into a schema flags byte.
pub const fn pack_flags(kind: StorageKind, data_type: DataType) -> u8 {
    kind.flags() | data_type as u8
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;

    use crate::error::Result;
    use crate::types::{pack_flags, parse_flags, DataType, StorageKind, UtfHeader};

    #[rustfmt::skip]
    const HEADER: [u8; 32] = [
        0x40, 0x55, 0x54, 0x46,
        0x00, 0x00, 0x00, 0x48,
        0x00, 0x01,
        0x00, 0x22,
        0x00, 0x00, 0x00, 0x32,
        0x00, 0x00, 0x00, 0x50,
        0x00, 0x00, 0x00, 0x07,
        0x00, 0x03,
        0x00, 0x06,
        0x00, 0x00, 0x00, 0x02,
    ];

    fn expected_header() -> UtfHeader {
        UtfHeader {
            table_size: 0x48,
            version: 1,
            rows_offset: 0x22,
            strings_offset: 0x32,
            data_offset: 0x50,
            name_offset: 7,
            column_count: 3,
            row_stride: 6,
            row_count: 2,
        }
    }

    #[test]
    fn read_header() -> Result<()> {
        let header = UtfHeader::read(&mut Cursor::new(HEADER))?;

        assert_eq!(header, expected_header());
        assert_eq!(header.table_len(), 0x50);
        assert_eq!(header.rows_start(), 0x2A);
        assert_eq!(header.strings_start(), 0x3A);
        assert_eq!(header.data_start(), 0x58);

        Ok(())
    }

    #[test]
    fn write_header() -> Result<()> {
        let mut actual = Vec::new();
        expected_header().write(&mut Cursor::new(&mut actual))?;

        assert_eq!(actual, HEADER.to_vec());

        Ok(())
    }

    #[test]
    fn read_header_with_bad_magic() {
        let mut input = HEADER;
        input[0] = b'#';

        assert!(UtfHeader::read(&mut Cursor::new(input)).is_err());
    }

    #[test]
    fn split_flags() {
        assert_eq!(parse_flags(0x13), Some((StorageKind::Zero, DataType::Int16)));
        assert_eq!(parse_flags(0x35), Some((StorageKind::Constant, DataType::Int32)));
        assert_eq!(parse_flags(0x5A), Some((StorageKind::PerRow, DataType::String)));
        assert_eq!(
            parse_flags(0x7B),
            Some((StorageKind::PerRowWithConstantName, DataType::Data))
        );

        assert_eq!(parse_flags(0x5C), None);
        assert_eq!(parse_flags(0x50 | 0x0F), None);
        assert_eq!(parse_flags(0x20), None);
        assert_eq!(parse_flags(0xD0), None);
        assert_eq!(parse_flags(0x00), None);
    }

    #[test]
    fn flags_round_trip_through_packing() {
        for kind in [
            StorageKind::Zero,
            StorageKind::Constant,
            StorageKind::PerRow,
            StorageKind::PerRowWithConstantName,
        ] {
            let flags = pack_flags(kind, DataType::Float64);
            assert_eq!(parse_flags(flags), Some((kind, DataType::Float64)));
        }
    }

    #[test]
    fn widths_match_record_layout() {
        assert_eq!(DataType::UInt8.width(), 1);
        assert_eq!(DataType::Int16.width(), 2);
        assert_eq!(DataType::Float32.width(), 4);
        assert_eq!(DataType::String.width(), 4);
        assert_eq!(DataType::Int64.width(), 8);
        assert_eq!(DataType::Data.width(), 8);
    }
}
