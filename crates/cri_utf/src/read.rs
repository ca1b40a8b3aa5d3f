//! Decoding @UTF tables
//!

use std::io::Cursor;

use binrw::BinRead;
use byteorder::BigEndian;
use cri_cursor::ByteCursor;
use tracing::{debug, instrument, trace, Level};

use crate::error::{Error, Result};
use crate::table::{Column, Row, RowLayout, Storage, Table};
use crate::types::{parse_flags, DataType, StorageKind, UtfHeader, HEADER_SIZE};
use crate::value::Value;

/// The string and data pools of one table
#[derive(Debug, Clone, Copy)]
struct Pools<'a> {
    strings: &'a [u8],
    data: &'a [u8],
}

impl Pools<'_> {
    fn string(&self, offset: u32) -> Result<String> {
        let cursor = ByteCursor::new(self.strings);
        let raw = cursor
            .read_cstring_at(0, offset as usize)
            .map_err(|_| Error::InvalidStringRef {
                offset,
                pool_len: self.strings.len(),
            })?;

        String::from_utf8(raw.to_vec()).map_err(|_| Error::InvalidUtf8 { offset })
    }

    fn data(&self, offset: u32, size: u32) -> Result<Vec<u8>> {
        ByteCursor::new(self.data)
            .bytes_at(offset as usize, size as usize)
            .map(<[u8]>::to_vec)
            .map_err(|_| Error::InvalidDataRef {
                offset,
                size,
                pool_len: self.data.len(),
            })
    }
}

fn read_value(cursor: &mut ByteCursor<&[u8]>, data_type: DataType, pools: &Pools) -> Result<Value> {
    Ok(match data_type {
        DataType::UInt8 => Value::UInt8(cursor.read_u8()?),
        DataType::Int8 => Value::Int8(cursor.read_i8()?),
        DataType::UInt16 => Value::UInt16(cursor.read_u16::<BigEndian>()?),
        DataType::Int16 => Value::Int16(cursor.read_i16::<BigEndian>()?),
        DataType::UInt32 => Value::UInt32(cursor.read_u32::<BigEndian>()?),
        DataType::Int32 => Value::Int32(cursor.read_i32::<BigEndian>()?),
        DataType::UInt64 => Value::UInt64(cursor.read_u64::<BigEndian>()?),
        DataType::Int64 => Value::Int64(cursor.read_i64::<BigEndian>()?),
        DataType::Float32 => Value::Float32(cursor.read_f32::<BigEndian>()?),
        DataType::Float64 => Value::Float64(cursor.read_f64::<BigEndian>()?),
        DataType::String => Value::String(pools.string(cursor.read_u32::<BigEndian>()?)?),
        DataType::Data => {
            let offset = cursor.read_u32::<BigEndian>()?;
            let size = cursor.read_u32::<BigEndian>()?;
            Value::Data(pools.data(offset, size)?)
        }
    })
}

fn check_section(section: &'static str, start: usize, end: usize, limit: usize) -> Result<()> {
    if start > end || end > limit {
        return Err(Error::InvalidSection {
            section,
            start,
            end,
        });
    }
    Ok(())
}

/// Reads and validates the fixed header of the table starting at `base`.
fn read_header(bytes: &[u8], base: usize) -> Result<UtfHeader> {
    let truncated = Error::TruncatedBuffer {
        offset: base,
        requested: HEADER_SIZE,
        len: bytes.len(),
    };
    let header = bytes
        .get(base..)
        .and_then(|b| b.get(..HEADER_SIZE))
        .ok_or(truncated)?;

    if !header.starts_with(crate::MAGIC) {
        let mut found = [0u8; 4];
        found.copy_from_slice(&header[..4]);
        return Err(Error::BadMagic { found });
    }

    Ok(UtfHeader::read(&mut Cursor::new(header))?)
}

fn read_schema(schema: &[u8], column_count: u16, pools: &Pools) -> Result<Vec<Column>> {
    let mut cursor = ByteCursor::new(schema);
    cursor.set_position(HEADER_SIZE)?;

    (0..column_count as usize)
        .map(|index| {
            let flags = cursor.read_u8()?;
            let (kind, data_type) = parse_flags(flags).ok_or(Error::UnknownColumnType {
                column: index,
                flags,
            })?;
            let name = pools.string(cursor.read_u32::<BigEndian>()?)?;

            let storage = match kind {
                StorageKind::Zero => Storage::Zero,
                StorageKind::PerRow => Storage::PerRow,
                StorageKind::Constant => {
                    Storage::Constant(read_value(&mut cursor, data_type, pools)?)
                }
                StorageKind::PerRowWithConstantName => {
                    Storage::PerRowWithConstantName(read_value(&mut cursor, data_type, pools)?)
                }
            };

            trace!(index, name = %name, %data_type, %kind, "column");
            Ok(Column::new(name, data_type, storage))
        })
        .collect()
}

fn read_rows(
    table: &[u8],
    header: &UtfHeader,
    columns: &[Column],
    layout: &RowLayout,
    pools: &Pools,
) -> Result<Vec<Row>> {
    let fixed = columns
        .iter()
        .map(|column| match column.storage() {
            Storage::Zero => Some(column.data_type().zero()),
            Storage::Constant(value) => Some(value.clone()),
            Storage::PerRow | Storage::PerRowWithConstantName(_) => None,
        })
        .collect::<Vec<_>>();

    let mut cursor = ByteCursor::new(table);
    let stride = header.row_stride as usize;

    (0..header.row_count as usize)
        .map(|row| {
            let start = header.rows_start() + row * stride;
            columns
                .iter()
                .enumerate()
                .map(|(index, column)| match (&fixed[index], layout.offset(index)) {
                    (Some(value), _) => Ok(value.clone()),
                    (None, Some(offset)) => {
                        cursor.set_position(start + offset)?;
                        read_value(&mut cursor, column.data_type(), pools)
                    }
                    (None, None) => Ok(column.data_type().zero()),
                })
                .collect::<Result<Vec<_>>>()
                .map(Row::new)
        })
        .collect()
}

/// Decode the @UTF table whose header starts at `base` in `bytes`.
///
/// All offsets inside the table are relative to `base`. The buffer may extend
/// past the end of the table; bytes after it are ignored.
#[instrument(skip(bytes), fields(len = bytes.len()), err(level = Level::DEBUG))]
pub fn decode(bytes: &[u8], base: usize) -> Result<Table> {
    let header = read_header(bytes, base)?;

    let table_len = header.table_len();
    let table = bytes
        .get(base..)
        .and_then(|b| b.get(..table_len))
        .ok_or(Error::TruncatedBuffer {
            offset: base,
            requested: table_len,
            len: bytes.len(),
        })?;

    let rows_start = header.rows_start();
    let rows_end = (header.row_count as usize)
        .checked_mul(header.row_stride as usize)
        .and_then(|size| size.checked_add(rows_start))
        .ok_or(Error::InvalidSection {
            section: "rows",
            start: rows_start,
            end: usize::MAX,
        })?;
    let strings_start = header.strings_start();
    let data_start = header.data_start();

    check_section("schema", HEADER_SIZE, rows_start, table_len)?;
    check_section("rows", rows_start, rows_end, strings_start)?;
    check_section("strings", strings_start, data_start, table_len)?;
    check_section("data", data_start, table_len, table_len)?;

    // rows without stored bytes still decode to cells, so bound them by the table size
    if header.row_stride == 0 {
        let cells = (header.row_count as usize).saturating_mul(usize::from(header.column_count).max(1));
        if cells > table_len {
            return Err(Error::InvalidSection {
                section: "rows",
                start: rows_start,
                end: rows_start.saturating_add(cells),
            });
        }
    }

    let pools = Pools {
        strings: &table[strings_start..data_start],
        data: &table[data_start..],
    };

    let name = pools.string(header.name_offset)?;

    let columns = read_schema(&table[..rows_start], header.column_count, &pools)?;

    let layout = RowLayout::new(&columns);
    if layout.stride() > header.row_stride as usize {
        return Err(Error::RowOverflow {
            needed: layout.stride(),
            stride: header.row_stride as usize,
        });
    }

    let rows = read_rows(&table[..rows_end], &header, &columns, &layout, &pools)?;

    debug!(
        name = %name,
        version = header.version,
        columns = columns.len(),
        rows = rows.len(),
        "decoded table"
    );

    Ok(Table::from_parts(name, header.version, columns, rows))
}
