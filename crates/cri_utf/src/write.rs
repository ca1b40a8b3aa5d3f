//! Encoding @UTF tables
//!

use std::io::Cursor;

use binrw::BinWrite;
use bon::Builder;
use byteorder::BigEndian;
use cri_cursor::ByteCursor;
use indexmap::IndexMap;
use tracing::{debug, instrument, trace, Level};

use crate::error::{Error, Result};
use crate::table::{RowLayout, Table};
use crate::types::{pack_flags, UtfHeader, HEADER_BIAS, HEADER_SIZE};
use crate::value::Value;

/// Options for how the table should be written
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct UtfWriterOptions {
    /// Boundary the data pool and every blob inside it start on
    ///
    /// CRI tools align embedded tables and archives to `0x20`. The string pool
    /// is zero-padded up to the data pool; recorded blob sizes stay unpadded.
    pub data_alignment: Option<u32>,
}

/// Content-keyed byte pool
///
/// Insertion order is layout order and identical content is stored once.
#[derive(Debug)]
struct Pool {
    entries: IndexMap<Vec<u8>, u32>,
    len: usize,
    alignment: usize,
    terminator: usize,
    field: &'static str,
}

impl Pool {
    fn strings() -> Pool {
        Pool {
            entries: IndexMap::new(),
            len: 0,
            alignment: 1,
            terminator: 1,
            field: "string pool",
        }
    }

    fn data(alignment: usize) -> Pool {
        Pool {
            entries: IndexMap::new(),
            len: 0,
            alignment,
            terminator: 0,
            field: "data pool",
        }
    }

    fn intern(&mut self, bytes: &[u8]) -> Result<u32> {
        if let Some(offset) = self.entries.get(bytes) {
            return Ok(*offset);
        }

        let start = self.len.next_multiple_of(self.alignment);
        let offset = u32::try_from(start).map_err(|_| Error::TableTooLarge {
            field: self.field,
            value: start,
        })?;
        self.len = start + bytes.len() + self.terminator;
        self.entries.insert(bytes.to_vec(), offset);

        Ok(offset)
    }

    fn write(&self, cursor: &mut ByteCursor<Vec<u8>>, base: usize) -> Result<()> {
        for (bytes, offset) in &self.entries {
            cursor.set_position(base + *offset as usize)?;
            cursor.write_bytes(bytes)?;
        }
        Ok(())
    }
}

/// Where the pooled part of a cell lives
#[derive(Debug, Clone, Copy)]
enum PoolRef {
    Inline,
    String(u32),
    Data { offset: u32, size: u32 },
}

#[derive(Debug)]
struct Encoder<'t> {
    table: &'t Table,
    layout: RowLayout,
    strings: Pool,
    data: Pool,
}

/// Region starts from the beginning of the table
#[derive(Debug, Clone, Copy)]
struct Regions {
    rows: usize,
    strings: usize,
    data: usize,
    end: usize,
}

fn fits<T: TryFrom<usize>>(field: &'static str, value: usize) -> Result<T> {
    T::try_from(value).map_err(|_| Error::TableTooLarge { field, value })
}

impl<'t> Encoder<'t> {
    fn new(table: &'t Table, alignment: usize) -> Encoder<'t> {
        Encoder {
            table,
            layout: table.layout(),
            strings: Pool::strings(),
            data: Pool::data(alignment),
        }
    }

    fn intern_str(&mut self, value: &str) -> Result<u32> {
        if value.contains('\0') {
            return Err(Error::InteriorNul(value.to_owned()));
        }
        self.strings.intern(value.as_bytes())
    }

    fn intern(&mut self, value: &Value) -> Result<PoolRef> {
        Ok(match value {
            Value::String(s) => PoolRef::String(self.intern_str(s)?),
            Value::Data(d) => PoolRef::Data {
                size: fits("data size", d.len())?,
                offset: self.data.intern(d)?,
            },
            _ => PoolRef::Inline,
        })
    }

    /// Interns every pooled value in layout order: the table name, then per
    /// column its name and constant, then per-row cells row by row.
    fn intern_all(&mut self) -> Result<()> {
        let table = self.table;

        self.intern_str(table.name())?;
        for column in table.columns() {
            self.intern_str(column.name())?;
            if let Some(constant) = column.storage().constant() {
                self.intern(constant)?;
            }
        }

        for row in table.rows() {
            for (index, cell) in row.iter().enumerate() {
                if self.layout.offset(index).is_some() {
                    self.intern(cell)?;
                }
            }
        }

        Ok(())
    }

    fn regions(&self) -> Result<Regions> {
        let schema_size: usize = self
            .table
            .columns()
            .iter()
            .map(|c| {
                let constant = if c.kind().has_constant() {
                    c.data_type().width()
                } else {
                    0
                };
                1 + 4 + constant
            })
            .sum();

        let rows = HEADER_SIZE + schema_size;
        let rows_size = self
            .table
            .row_count()
            .checked_mul(self.layout.stride())
            .ok_or(Error::TableTooLarge {
                field: "row region",
                value: usize::MAX,
            })?;
        let strings = rows + rows_size;
        let data = (strings + self.strings.len).next_multiple_of(self.data.alignment);
        let end = data + self.data.len;

        Ok(Regions {
            rows,
            strings,
            data,
            end,
        })
    }

    fn header(&self, regions: &Regions) -> Result<UtfHeader> {
        Ok(UtfHeader {
            table_size: fits("table size", regions.end - HEADER_BIAS)?,
            version: self.table.version(),
            rows_offset: fits("schema size", regions.rows - HEADER_BIAS)?,
            strings_offset: fits("row region", regions.strings - HEADER_BIAS)?,
            data_offset: fits("string pool", regions.data - HEADER_BIAS)?,
            // the table name is always the first string
            name_offset: 0,
            column_count: fits("column count", self.table.column_count())?,
            row_stride: fits("row stride", self.layout.stride())?,
            row_count: fits("row count", self.table.row_count())?,
        })
    }

    fn write_value(
        &mut self,
        cursor: &mut ByteCursor<Vec<u8>>,
        value: &Value,
    ) -> Result<()> {
        match (value, self.intern(value)?) {
            (Value::UInt8(v), _) => cursor.write_u8(*v)?,
            (Value::Int8(v), _) => cursor.write_i8(*v)?,
            (Value::UInt16(v), _) => cursor.write_u16::<BigEndian>(*v)?,
            (Value::Int16(v), _) => cursor.write_i16::<BigEndian>(*v)?,
            (Value::UInt32(v), _) => cursor.write_u32::<BigEndian>(*v)?,
            (Value::Int32(v), _) => cursor.write_i32::<BigEndian>(*v)?,
            (Value::UInt64(v), _) => cursor.write_u64::<BigEndian>(*v)?,
            (Value::Int64(v), _) => cursor.write_i64::<BigEndian>(*v)?,
            (Value::Float32(v), _) => cursor.write_f32::<BigEndian>(*v)?,
            (Value::Float64(v), _) => cursor.write_f64::<BigEndian>(*v)?,
            (_, PoolRef::String(offset)) => cursor.write_u32::<BigEndian>(offset)?,
            (_, PoolRef::Data { offset, size }) => {
                cursor.write_u32::<BigEndian>(offset)?;
                cursor.write_u32::<BigEndian>(size)?;
            }
            (_, PoolRef::Inline) => {}
        }
        Ok(())
    }

    fn write(mut self) -> Result<Vec<u8>> {
        self.intern_all()?;
        let regions = self.regions()?;
        let header = self.header(&regions)?;

        trace!(?regions, strings = self.strings.entries.len(), data = self.data.entries.len(), "layout");

        let mut head = Cursor::new(Vec::with_capacity(HEADER_SIZE));
        header.write(&mut head)?;

        let mut cursor = ByteCursor::new(vec![0u8; regions.end]);
        cursor.write_bytes(head.get_ref())?;

        let table = self.table;
        for column in table.columns() {
            cursor.write_u8(pack_flags(column.kind(), column.data_type()))?;
            let name = self.intern_str(column.name())?;
            cursor.write_u32::<BigEndian>(name)?;
            if let Some(constant) = column.storage().constant() {
                self.write_value(&mut cursor, constant)?;
            }
        }

        let stride = self.layout.stride();
        for (index, row) in table.rows().iter().enumerate() {
            let start = regions.rows + index * stride;
            for (column, cell) in row.iter().enumerate() {
                if let Some(offset) = self.layout.offset(column) {
                    cursor.set_position(start + offset)?;
                    self.write_value(&mut cursor, cell)?;
                }
            }
        }

        self.strings.write(&mut cursor, regions.strings)?;
        self.data.write(&mut cursor, regions.data)?;

        Ok(cursor.into_inner())
    }
}

/// Encode a table with default options.
pub fn encode(table: &Table) -> Result<Vec<u8>> {
    encode_with(table, UtfWriterOptions::default())
}

/// Encode a table into a new buffer sized exactly to the table.
///
/// The table is validated first; a failed call returns no partial output.
#[instrument(skip_all, fields(name = table.name(), rows = table.row_count()), err(level = Level::DEBUG))]
pub fn encode_with(table: &Table, options: UtfWriterOptions) -> Result<Vec<u8>> {
    table.validate()?;

    let alignment = match options.data_alignment {
        None => 1,
        Some(a) if a.is_power_of_two() => a as usize,
        Some(a) => return Err(Error::InvalidAlignment(a)),
    };

    let bytes = Encoder::new(table, alignment).write()?;
    debug!(len = bytes.len(), "encoded table");

    Ok(bytes)
}
