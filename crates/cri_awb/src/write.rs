//! Types for writing AWB archives
//!

use std::io::{self, Cursor, Write};

use binrw::BinWrite;
use bon::Builder;
use cri_cursor::{align_up, ByteCursor};
use indexmap::{IndexMap, IndexSet};
use tracing::{debug, instrument, trace, Level};

use crate::error::{Error, Result};
use crate::types::{write_uint, AfsHeader, HEADER_SIZE};

/// Alignment CRI tools use for subfile starts
pub const DEFAULT_ALIGNMENT: u32 = 0x20;

/// Header version written by default
pub const DEFAULT_VERSION: u8 = 2;

/// Options for how the AWB archive should be written
#[derive(Debug, Clone, Copy, Builder)]
pub struct AwbWriterOptions {
    /// Boundary every subfile start is rounded up to, a power of two that fits 16 bits
    #[builder(default = DEFAULT_ALIGNMENT)]
    pub alignment: u32,

    /// Header version byte
    #[builder(default = DEFAULT_VERSION)]
    pub version: u8,

    /// Key modifier for encrypted HCA payloads
    #[builder(default)]
    pub subkey: u16,

    /// Offset table element width (2, 4 or 8). Picks 4, or 8 for archives past 4 GiB, when unset.
    pub offset_width: Option<u8>,

    /// Id table element width (2 or 4). Picks 2 when every id fits 16 bits, 4 otherwise, when unset.
    pub id_width: Option<u16>,
}

impl Default for AwbWriterOptions {
    fn default() -> Self {
        AwbWriterOptions::builder().build()
    }
}

/// Offsets of one planned archive
#[derive(Debug, Clone)]
struct Layout {
    header: AfsHeader,
    /// Raw boundaries, the tables' end then each subfile's unpadded end
    boundaries: Vec<u64>,
    /// Aligned subfile starts
    starts: Vec<u64>,
}

impl Layout {
    fn plan(files: &[(u32, &[u8])], options: &AwbWriterOptions, offset_width: u8) -> Result<Layout> {
        let alignment = u16::try_from(options.alignment)
            .ok()
            .filter(|a| a.is_power_of_two())
            .ok_or(Error::InvalidAlignment(options.alignment.into()))?;
        let count = u32::try_from(files.len()).map_err(|_| Error::TooManyFiles(files.len()))?;
        let wide_id = files.iter().map(|(id, _)| *id).find(|id| *id > u16::MAX.into());
        let id_width = match (options.id_width, wide_id) {
            (Some(width), _) => width,
            (None, Some(_)) => 4,
            (None, None) => 2,
        };

        let header = AfsHeader {
            version: options.version,
            offset_width,
            id_width,
            count,
            alignment,
            subkey: options.subkey,
        };
        header.validate()?;

        if let (2, Some(id)) = (id_width, wide_id) {
            return Err(Error::IdOverflow { id, width: 2 });
        }

        let too_many = || Error::TooManyFiles(files.len());
        let mut boundaries = Vec::with_capacity(files.len() + 1);
        let mut starts = Vec::with_capacity(files.len());
        let mut end = header.tables_end();
        boundaries.push(end);

        for (_, data) in files {
            let start = align_up(end, alignment.into()).ok_or_else(too_many)?;
            end = start.checked_add(data.len() as u64).ok_or_else(too_many)?;
            starts.push(start);
            boundaries.push(end);
        }

        let max_offset = match offset_width {
            8 => u64::MAX,
            width => (1u64 << (8 * u32::from(width))) - 1,
        };
        if end > max_offset {
            return Err(Error::OffsetOverflow {
                width: offset_width,
                end,
            });
        }

        Ok(Layout {
            header,
            boundaries,
            starts,
        })
    }

    fn end(&self) -> u64 {
        self.boundaries.last().copied().unwrap_or(HEADER_SIZE)
    }

    fn write(&self, files: &[(u32, &[u8])]) -> Result<Vec<u8>> {
        let size = usize::try_from(self.end()).map_err(|_| Error::TooManyFiles(files.len()))?;

        let mut head = Cursor::new(Vec::with_capacity(HEADER_SIZE as usize));
        self.header.write(&mut head)?;

        let mut cursor = ByteCursor::new(vec![0u8; size]);
        cursor.write_bytes(head.get_ref())?;

        for (id, _) in files {
            write_uint(&mut cursor, self.header.id_width, (*id).into())?;
        }
        for boundary in &self.boundaries {
            write_uint(&mut cursor, self.header.offset_width.into(), *boundary)?;
        }

        for ((id, data), start) in files.iter().zip(&self.starts) {
            trace!(id, start, len = data.len(), "subfile");
            cursor.set_position(*start as usize)?;
            cursor.write_bytes(data)?;
        }

        Ok(cursor.into_inner())
    }
}

#[instrument(skip(files), fields(count = files.len()), err(level = Level::DEBUG))]
fn write_archive(files: &[(u32, &[u8])], options: &AwbWriterOptions) -> Result<Vec<u8>> {
    let mut seen = IndexSet::with_capacity(files.len());
    if let Some((id, _)) = files.iter().find(|(id, _)| !seen.insert(*id)) {
        return Err(Error::DuplicateId(*id));
    }

    let layout = match options.offset_width {
        Some(width) => Layout::plan(files, options, width)?,
        None => match Layout::plan(files, options, 4) {
            Err(Error::OffsetOverflow { .. }) => Layout::plan(files, options, 8)?,
            planned => planned?,
        },
    };

    let bytes = layout.write(files)?;
    debug!(
        len = bytes.len(),
        id_width = layout.header.id_width,
        offset_width = layout.header.offset_width,
        "encoded archive"
    );

    Ok(bytes)
}

/// Encode `(id, content)` pairs into an archive, in order.
///
/// ```
/// let bytes = cri_awb::encode([(0u32, vec![1u8; 10]), (1, vec![2; 7])], 32)?;
/// let archive = cri_awb::decode(&bytes)?;
///
/// assert_eq!(archive.by_id(1)?.data(), &[2u8; 7]);
/// # Ok::<(), cri_awb::error::Error>(())
/// ```
pub fn encode<I, B>(files: I, alignment: u32) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = (u32, B)>,
    B: AsRef<[u8]>,
{
    let files = files.into_iter().collect::<Vec<_>>();
    let borrowed = files
        .iter()
        .map(|(id, data)| (*id, data.as_ref()))
        .collect::<Vec<_>>();

    let options = AwbWriterOptions::builder().alignment(alignment).build();
    write_archive(&borrowed, &options)
}

/// AWB archive generator
///
/// Subfiles are buffered until [`AwbWriter::finish`] since the tables in front
/// of them depend on every subfile's size.
///
/// ```
/// # fn doit() -> cri_awb::error::Result<()>
/// # {
/// use std::io::Write;
/// use cri_awb::{AwbWriter, AwbWriterOptions};
///
/// let mut awb = AwbWriter::new(Vec::new(), AwbWriterOptions::builder().alignment(0x40).build());
///
/// awb.start_file(7)?;
/// awb.write_all(b"HCA\0")?;
/// awb.add_file(8, b"raw payload")?;
///
/// let bytes = awb.finish()?;
/// assert_eq!(cri_awb::decode(&bytes)?.len(), 2);
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
#[derive(Debug)]
pub struct AwbWriter<W: Write> {
    inner: W,
    options: AwbWriterOptions,
    files: IndexMap<u32, Vec<u8>>,
    writing_to_file: bool,
}

impl<W: Write> AwbWriter<W> {
    /// Initializes the archive.
    ///
    /// Before writing to this object, the [`AwbWriter::start_file`] function should be called.
    pub fn new(inner: W, options: AwbWriterOptions) -> AwbWriter<W> {
        AwbWriter {
            inner,
            options,
            files: IndexMap::new(),
            writing_to_file: false,
        }
    }

    /// Returns true if a file is currently open for writing.
    pub const fn is_writing_file(&self) -> bool {
        self.writing_to_file
    }

    /// Number of subfiles started so far
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Start a new subfile with the given id. Ids must be unique.
    #[instrument(skip(self), err)]
    pub fn start_file(&mut self, id: u32) -> Result<()> {
        if self.files.contains_key(&id) {
            return Err(Error::DuplicateId(id));
        }

        self.files.insert(id, Vec::new());
        self.writing_to_file = true;

        Ok(())
    }

    /// Add a complete subfile.
    pub fn add_file(&mut self, id: u32, data: impl AsRef<[u8]>) -> Result<()> {
        self.start_file(id)?;
        self.write_all(data.as_ref())?;
        Ok(())
    }

    /// Lay out every subfile and write the archive to the inner writer
    ///
    /// This will return the writer, but one should normally not append any data to the end of the archive.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        let files = self
            .files
            .iter()
            .map(|(id, data)| (*id, data.as_slice()))
            .collect::<Vec<_>>();

        let bytes = write_archive(&files, &self.options)?;
        self.inner.write_all(&bytes)?;

        Ok(self.inner)
    }
}

impl<W: Write> Write for AwbWriter<W> {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size = buf.len()))]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.files.last_mut() {
            Some((_, data)) if self.writing_to_file => data.write(buf),
            _ => Err(io::Error::new(io::ErrorKind::Other, Error::NoFileStarted)),
        }
    }

    #[instrument(skip(self), err)]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::{Error, Result};
    use crate::read::decode;
    use crate::write::{encode, AwbWriter, AwbWriterOptions};

    #[test]
    #[traced_test]
    fn write_small_archive() -> Result<()> {
        let mut awb = AwbWriter::new(Vec::new(), AwbWriterOptions::default());
        awb.start_file(5)?;
        awb.write_all(b"HCA\0")?;
        awb.write_all(b"\x01\x02")?;
        awb.add_file(2, b"abc")?;

        #[rustfmt::skip]
        let mut expected = vec![
            0x41, 0x46, 0x53, 0x32,
            0x02,
            0x04,
            0x02, 0x00,
            0x02, 0x00, 0x00, 0x00,
            0x20, 0x00,
            0x00, 0x00,
            0x05, 0x00, 0x02, 0x00,
            0x20, 0x00, 0x00, 0x00,
            0x26, 0x00, 0x00, 0x00,
            0x43, 0x00, 0x00, 0x00,
        ];
        expected.extend_from_slice(b"HCA\0\x01\x02");
        expected.resize(0x40, 0);
        expected.extend_from_slice(b"abc");

        assert_eq!(awb.finish()?, expected);

        Ok(())
    }

    #[test]
    fn subfile_starts_follow_alignment() -> Result<()> {
        let files = [(0u32, vec![0xA1; 10]), (1, vec![0xB2; 7]), (2, vec![0xC3; 100])];

        let bytes = encode(files.clone(), 32)?;
        let archive = decode(&bytes)?;

        // 16 byte header, 3 two byte ids, 4 four byte offsets
        let header_end = 64;
        assert_eq!(
            archive.entries().map(|e| e.offset).collect::<Vec<_>>(),
            vec![header_end, header_end + 32, header_end + 64]
        );
        assert_eq!(bytes.len() as u64, header_end + 64 + 100);

        for ((id, data), file) in files.iter().zip(archive.iter()) {
            assert_eq!(file.id(), *id);
            assert_eq!(file.data(), data.as_slice());
        }

        Ok(())
    }

    #[test]
    fn padding_is_zero() -> Result<()> {
        let bytes = encode([(0u32, [0xFFu8; 3]), (1, [0xFFu8; 3])], 64)?;

        // tables end at 0x20, subfiles start at 0x40 and 0x80
        assert_eq!(&bytes[0x20..0x40], &[0u8; 0x20]);
        assert_eq!(&bytes[0x43..0x80], &[0u8; 0x3D]);
        assert_eq!(bytes.len(), 0x83);

        Ok(())
    }

    #[test]
    fn large_ids_use_wide_table() -> Result<()> {
        let bytes = encode([(0x1_0000u32, b"a".as_slice()), (3, b"b".as_slice())], 32)?;
        let archive = decode(&bytes)?;

        assert_eq!(archive.id_width(), 4);
        assert_eq!(archive.offset_width(), 4);
        assert_eq!(archive.ids().collect::<Vec<_>>(), vec![0x1_0000, 3]);

        Ok(())
    }

    #[test]
    fn round_trip_keeps_header_fields() -> Result<()> {
        let options = AwbWriterOptions::builder()
            .alignment(0x800)
            .version(1)
            .subkey(0x1234)
            .build();
        let mut awb = AwbWriter::new(Vec::new(), options);
        awb.add_file(9, b"HCA\0payload")?;
        awb.add_file(4, b"")?;
        awb.add_file(1, b"\xC8\xC3\xC1\0masked")?;

        let bytes = awb.finish()?;
        let archive = decode(&bytes)?;

        assert_eq!(archive.version(), 1);
        assert_eq!(archive.alignment(), 0x800);
        assert_eq!(archive.subkey(), 0x1234);
        assert_eq!(archive.by_id(9)?.data(), b"HCA\0payload");
        assert!(archive.by_id(4)?.is_empty());
        assert_eq!(archive.by_id(1)?.data(), b"\xC8\xC3\xC1\0masked");
        assert!(archive.entries().all(|e| e.offset % 0x800 == 0));

        Ok(())
    }

    #[test]
    fn empty_archive() -> Result<()> {
        let bytes = encode(Vec::<(u32, Vec<u8>)>::new(), 32)?;

        assert_eq!(bytes.len(), 0x14);
        assert!(decode(&bytes)?.is_empty());

        Ok(())
    }

    #[test]
    fn rejects_duplicate_ids() {
        assert!(matches!(
            encode([(1u32, b"a".as_slice()), (1, b"b".as_slice())], 32),
            Err(Error::DuplicateId(1))
        ));

        let mut awb = AwbWriter::new(Vec::new(), AwbWriterOptions::default());
        awb.start_file(3).unwrap();
        assert!(matches!(awb.start_file(3), Err(Error::DuplicateId(3))));
    }

    #[test]
    fn rejects_invalid_alignment() {
        for alignment in [0, 24, 0x1_0000] {
            assert!(matches!(
                encode([(1u32, b"a")], alignment),
                Err(Error::InvalidAlignment(a)) if a == u64::from(alignment)
            ));
        }
    }

    #[test]
    fn fixed_widths_are_checked() {
        let narrow = AwbWriterOptions::builder()
            .alignment(0x10)
            .offset_width(2)
            .build();
        let mut awb = AwbWriter::new(Vec::new(), narrow);
        awb.add_file(0, vec![0u8; 0x1_0000]).unwrap();
        assert!(matches!(
            awb.finish(),
            Err(Error::OffsetOverflow { width: 2, end: 0x1_0020 })
        ));

        let odd = AwbWriterOptions::builder().offset_width(3).build();
        let mut awb = AwbWriter::new(Vec::new(), odd);
        awb.add_file(0, b"a").unwrap();
        assert!(matches!(
            awb.finish(),
            Err(Error::UnsupportedWidth { field: "offset", width: 3 })
        ));

        let short_ids = AwbWriterOptions::builder().id_width(2).build();
        let mut awb = AwbWriter::new(Vec::new(), short_ids);
        awb.add_file(0x1_0000, b"a").unwrap();
        assert!(matches!(
            awb.finish(),
            Err(Error::IdOverflow { id: 0x1_0000, width: 2 })
        ));
    }

    #[test]
    fn write_without_file_fails() {
        let mut awb = AwbWriter::new(Vec::new(), AwbWriterOptions::default());

        assert!(!awb.is_writing_file());
        assert!(awb.write(b"orphan").is_err());
    }
}
