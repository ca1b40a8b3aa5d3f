//! Types for reading AWB archives
//!

use std::fmt::{self, Debug};
use std::io::Cursor;

use binrw::BinRead;
use cri_cursor::{align_up, ByteCursor};
use indexmap::IndexMap;
use tracing::{debug, instrument, trace, Level};

use crate::error::{Error, FileNotFoundError, Result};
use crate::types::{read_uint, AfsHeader, SubfileKind, HEADER_SIZE};

/// Location of one subfile inside the archive
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SubfileEntry {
    /// Id the cue sheet refers to this subfile by
    pub id: u32,
    /// Aligned start of the subfile from the start of the archive
    pub offset: u64,
    /// Length of the subfile without padding
    pub length: u64,
}

impl SubfileEntry {
    /// End of the subfile from the start of the archive
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// A zero-copy view of one subfile
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Subfile<'a> {
    entry: SubfileEntry,
    data: &'a [u8],
}

impl Debug for Subfile<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Subfile({:#?}, {})", self.entry, self.kind())
    }
}

impl<'a> Subfile<'a> {
    pub fn id(&self) -> u32 {
        self.entry.id
    }

    /// Get the starting offset of the data in the archive
    pub fn offset(&self) -> u64 {
        self.entry.offset
    }

    /// Get the size of the file, in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The subfile's bytes, borrowed from the archive buffer
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Sniffs the payload type from the first bytes
    pub fn kind(&self) -> SubfileKind {
        SubfileKind::sniff(self.data)
    }

    /// Name for this subfile when extracted from the archive `stem`
    ///
    /// ```
    /// # let bytes = cri_awb::encode([(0x2Au32, b"HCA\0".as_slice())], 32)?;
    /// # let archive = cri_awb::decode(&bytes)?;
    /// assert_eq!(archive.subfile(0)?.file_name("voice"), "voice_0000002a.hca");
    /// # Ok::<(), cri_awb::error::Error>(())
    /// ```
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}_{:08x}.{}", self.entry.id, self.kind().extension())
    }
}

/// AWB archive reader
///
/// The archive borrows the buffer it was decoded from; subfiles are views into it.
///
/// ```no_run
/// fn list_awb_contents(bytes: &[u8]) -> cri_awb::error::Result<()> {
///     let awb = cri_awb::AwbArchive::new(bytes)?;
///
///     for file in awb.iter() {
///         println!("{:08x}: {} bytes of {}", file.id(), file.len(), file.kind());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct AwbArchive<'a> {
    data: &'a [u8],
    header: AfsHeader,
    entries: IndexMap<u32, SubfileEntry>,
}

impl Debug for AwbArchive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("AwbArchive")
            .field("header", &self.header)
            .field("entries", &self.entries.values().collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> AwbArchive<'a> {
    /// Read an AWB archive, validating the tables against the buffer.
    #[instrument(skip(data), fields(len = data.len()), err(level = Level::DEBUG))]
    pub fn new(data: &'a [u8]) -> Result<AwbArchive<'a>> {
        let header = Self::get_header(data)?;
        let (ids, boundaries) = Self::get_tables(data, &header)?;
        let entries = Self::get_entries(data, &header, &ids, &boundaries)?;

        debug!(
            version = header.version,
            count = header.count,
            alignment = header.alignment,
            "decoded archive"
        );

        Ok(AwbArchive {
            data,
            header,
            entries,
        })
    }

    /// Number of subfiles contained in this archive.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether this archive contains no subfiles
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn version(&self) -> u8 {
        self.header.version
    }

    /// Boundary every subfile start is rounded up to
    pub fn alignment(&self) -> u16 {
        self.header.alignment
    }

    /// Key modifier for encrypted HCA payloads
    pub fn subkey(&self) -> u16 {
        self.header.subkey
    }

    /// Width in bytes of the id table elements
    pub fn id_width(&self) -> u16 {
        self.header.id_width
    }

    /// Width in bytes of the offset table elements
    pub fn offset_width(&self) -> u8 {
        self.header.offset_width
    }

    /// Returns an iterator over the subfile ids in archive order.
    pub fn ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Returns the subfile locations in archive order.
    pub fn entries(&self) -> impl Iterator<Item = &SubfileEntry> {
        self.entries.values()
    }

    /// Get the index of a subfile by id, if it's present.
    #[inline(always)]
    pub fn index_for_id(&self, id: u32) -> Option<usize> {
        self.entries.get_index_of(&id)
    }

    /// Get a contained subfile by index
    pub fn subfile(&self, index: usize) -> Result<Subfile<'a>> {
        let (_, entry) = self
            .entries
            .get_index(index)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(index)))?;
        Ok(self.view(entry))
    }

    /// Search for a subfile by id
    pub fn by_id(&self, id: u32) -> Result<Subfile<'a>> {
        let entry = self
            .entries
            .get(&id)
            .ok_or(Error::FileNotFound(FileNotFoundError::Id(id)))?;
        Ok(self.view(entry))
    }

    /// Returns an iterator over every subfile in archive order.
    pub fn iter(&self) -> impl Iterator<Item = Subfile<'a>> + '_ {
        self.entries.values().map(|entry| self.view(entry))
    }

    /// Unwrap and return the buffer the archive was read from
    pub fn into_inner(self) -> &'a [u8] {
        self.data
    }

    fn view(&self, entry: &SubfileEntry) -> Subfile<'a> {
        // entries were checked against the buffer when decoding
        let data: &'a [u8] = self.data;
        Subfile {
            entry: *entry,
            data: &data[entry.offset as usize..entry.end() as usize],
        }
    }

    fn get_header(data: &[u8]) -> Result<AfsHeader> {
        let header = data
            .get(..HEADER_SIZE as usize)
            .ok_or(Error::TruncatedBuffer {
                offset: 0,
                requested: HEADER_SIZE,
                len: data.len() as u64,
            })?;

        if !header.starts_with(crate::MAGIC) {
            let mut found = [0u8; 4];
            found.copy_from_slice(&header[..4]);
            return Err(Error::BadMagic { found });
        }

        let header = AfsHeader::read(&mut Cursor::new(header))?;
        header.validate()?;

        let tables_end = header.tables_end();
        if tables_end > data.len() as u64 {
            return Err(Error::TruncatedBuffer {
                offset: HEADER_SIZE,
                requested: tables_end - HEADER_SIZE,
                len: data.len() as u64,
            });
        }

        Ok(header)
    }

    /// Reads the id table and the raw boundaries of the offset table.
    fn get_tables(data: &[u8], header: &AfsHeader) -> Result<(Vec<u32>, Vec<u64>)> {
        let mut cursor = ByteCursor::new(data);
        cursor.set_position(HEADER_SIZE as usize)?;

        let ids = (0..header.count)
            .map(|_| read_uint(&mut cursor, header.id_width).map(|id| id as u32))
            .collect::<Result<Vec<_>>>()?;

        let offset_width = header.offset_width.into();
        let boundaries = (0..=header.count)
            .map(|_| read_uint(&mut cursor, offset_width))
            .collect::<Result<Vec<_>>>()?;

        Ok((ids, boundaries))
    }

    fn get_entries(
        data: &[u8],
        header: &AfsHeader,
        ids: &[u32],
        boundaries: &[u64],
    ) -> Result<IndexMap<u32, SubfileEntry>> {
        let tables_end = header.tables_end();
        let alignment = u64::from(header.alignment);

        if let Some(&first) = boundaries.first() {
            if first < tables_end {
                return Err(Error::InvalidSection {
                    offset: first,
                    tables_end,
                });
            }
        }

        let mut entries = IndexMap::with_capacity(ids.len());
        for (index, (&id, pair)) in ids.iter().zip(boundaries.windows(2)).enumerate() {
            let (boundary, end) = (pair[0], pair[1]);

            if end < boundary {
                return Err(Error::NonMonotonicOffsets {
                    index: index + 1,
                    previous: boundary,
                    offset: end,
                });
            }

            let start = align_up(boundary, alignment).unwrap_or(u64::MAX);
            if start > end {
                return Err(Error::MisalignedOffset { index, start, end });
            }

            if end > data.len() as u64 {
                return Err(Error::TruncatedBuffer {
                    offset: start,
                    requested: end - start,
                    len: data.len() as u64,
                });
            }

            let entry = SubfileEntry {
                id,
                offset: start,
                length: end - start,
            };
            trace!(index, ?entry, "subfile");

            if entries.insert(id, entry).is_some() {
                return Err(Error::DuplicateId(id));
            }
        }

        // the last boundary is the archive length, which an empty archive must hold as well
        if let Some(&last) = boundaries.last() {
            if last > data.len() as u64 {
                return Err(Error::TruncatedBuffer {
                    offset: tables_end,
                    requested: last.saturating_sub(tables_end),
                    len: data.len() as u64,
                });
            }
        }

        Ok(entries)
    }
}

/// Decode an AWB archive borrowing `bytes`.
pub fn decode(bytes: &[u8]) -> Result<AwbArchive<'_>> {
    AwbArchive::new(bytes)
}
