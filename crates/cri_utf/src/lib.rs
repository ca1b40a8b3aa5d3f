//! This library handles reading from and creating **@UTF** tables used by CRI Middleware.
//!
//! # @UTF Table Format Documentation
//!
//! @UTF tables are the self-describing binary tables behind CRI's ACB cue sheets, ACF project files
//! and CPK tables of contents. A table has a name, a typed schema and any number of rows. Strings and
//! variable length blobs live in two pools at the end of the table.
//!
//! ## File Structure
//!
//! A table consists of a header, followed by the schema, the row region, the string pool and the data pool.
//!
//! | Offset (bytes) | Field                  | Description                                                |
//! |----------------|------------------------|------------------------------------------------------------|
//! | 0x0000         | Magic number           | 4 bytes: 0x40555446 ("@UTF")                               |
//! | 0x0004         | Table Size             | 4 bytes: Size of the table minus 8                         |
//! | 0x0008         | Version                | 2 bytes: Usually 0x0001                                    |
//! | 0x000A         | Rows Offset            | 2 bytes: Start of the row region minus 8                   |
//! | 0x000C         | Strings Offset         | 4 bytes: Start of the string pool minus 8                  |
//! | 0x0010         | Data Offset            | 4 bytes: Start of the data pool minus 8                    |
//! | 0x0014         | Name Offset            | 4 bytes: Table name, relative to the string pool           |
//! | 0x0018         | Column Count           | 2 bytes: Number of schema records                          |
//! | 0x001A         | Row Stride             | 2 bytes: Size of one row record                            |
//! | 0x001C         | Row Count              | 4 bytes: Number of row records                             |
//!
//! ### Schema
//!
//! The schema starts right after the header and holds one record per column:
//!
//! | Size (bytes)   | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 1              | Flags                  | High nibble: storage, low nibble: type code             |
//! | 4              | Name Offset            | Column name, relative to the string pool                |
//! | type width     | Constant               | Present when the storage carries a constant             |
//!
//! Storage flags are `0x10` (name only, every row reads zero), `0x30` (constant), `0x50` (per row) and
//! `0x70` (constant and per row). Type codes run from `0x0` to `0xB`:
//! `u8, i8, u16, i16, u32, i32, u64, i64, f32, f64, string, data`.
//!
//! ### Rows
//!
//! Row `i` starts at `rows_offset + i * row_stride` and holds the values of the per-row columns in
//! schema order. Strings are stored as a 4 byte string pool offset, data as a 4 byte data pool
//! offset followed by a 4 byte size.
//!
//! ### Pools
//!
//! The string pool stores null terminated UTF-8 strings, the table name first. The data pool stores
//! raw blobs, which are frequently nested @UTF tables or AWB archives
//! (see [`Value::nested_table`]).
//!
//! ## Additional Information
//!
//! - **Endianness**: Big-endian for all multi-byte integers
//! - **Offsets**: Relative to the start of the table header
//!

pub mod error;
pub mod read;
pub mod table;
pub mod types;
pub mod value;
pub mod write;

/// Magic bytes every table starts with
pub const MAGIC: &[u8; 4] = b"@UTF";

pub use error::{Error, Result};
pub use read::decode;
pub use table::{Column, Row, RowLayout, Storage, Table, TableBuilder};
pub use types::{DataType, StorageKind};
pub use value::Value;
pub use write::{encode, encode_with, UtfWriterOptions};
