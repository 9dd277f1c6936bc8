/// Reads ESRI ".shx" Shapefile index files.
///
/// The index shares the geometry stream's 100-byte header, then holds one
/// 8-byte big-endian record per shape: offset and length, both in 16-bit
/// words. It exists so "shape number i" can become a direct seek instead of
/// a scan.
use std::cmp;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::io::{Read, Seek};
use std::path::Path;
use byteorder::{BigEndian, ByteOrder};

const SHX_HEADER_LENGTH: usize = 100;
const SHX_ENTRY_LENGTH: usize = 8;
const SHX_MAGIC_NUMBER: u32 = 9994;

#[derive(Debug)]
pub enum ShxError {
    IOError(io::Error),
    WrongFileCode(u32),
}

impl error::Error for ShxError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ShxError::IOError(ref err) => Some(err),
            ShxError::WrongFileCode(_) => None,
        }
    }
}

impl fmt::Display for ShxError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShxError::IOError(ref err) => err.fmt(f),
            ShxError::WrongFileCode(code) => write!(f, "File code {} is wrong", code),
        }
    }
}

/// One index entry, converted to byte units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShxEntry {
    pub offset: u64,
    pub length: u64,
}

/// The whole index, read eagerly at construction; the backing file is
/// released as soon as `new()` returns.
#[derive(Debug)]
pub struct ShxReader {
    entries: Vec<ShxEntry>,
}

impl ShxReader {
    pub fn new<R: Read + Seek>(mut file: R) -> Result<ShxReader, ShxError> {
        let mut header = [0u8; SHX_HEADER_LENGTH];
        match file.read_exact(&mut header) {
            Err(err) => return Err(ShxError::IOError(err)),
            Ok(_) => {}
        }

        let magic_number = BigEndian::read_u32(&header[0..4]);
        if magic_number != SHX_MAGIC_NUMBER {
            return Err(ShxError::WrongFileCode(magic_number));
        }

        let declared_n_bytes = cmp::max(0, BigEndian::read_i32(&header[24..28]) as i64 * 2) as u64;
        let n_records_declared = declared_n_bytes.saturating_sub(SHX_HEADER_LENGTH as u64) / SHX_ENTRY_LENGTH as u64;

        // Measure instead of trusting the header.
        let measured_n_bytes = match file.seek(io::SeekFrom::End(0)) {
            Err(err) => return Err(ShxError::IOError(err)),
            Ok(n) => n,
        };
        let n_records = measured_n_bytes.saturating_sub(SHX_HEADER_LENGTH as u64) / SHX_ENTRY_LENGTH as u64;
        if n_records != n_records_declared {
            warn!("shx header declares {} records but the file holds {}; using the measured count",
                  n_records_declared, n_records);
        }

        match file.seek(io::SeekFrom::Start(SHX_HEADER_LENGTH as u64)) {
            Err(err) => return Err(ShxError::IOError(err)),
            Ok(_) => {}
        }

        let mut buf = vec![0u8; n_records as usize * SHX_ENTRY_LENGTH];
        match file.read_exact(&mut buf) {
            Err(err) => return Err(ShxError::IOError(err)),
            Ok(_) => {}
        }

        let entries = buf.chunks(SHX_ENTRY_LENGTH)
            .map(|b| ShxEntry {
                offset: cmp::max(0, BigEndian::read_i32(&b[0..4]) as i64 * 2) as u64,
                length: cmp::max(0, BigEndian::read_i32(&b[4..8]) as i64 * 2) as u64,
            })
            .collect();

        Ok(ShxReader { entries: entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Absolute byte offset of shape `i` in the geometry stream, or None
    /// past the end of the index.
    pub fn offset_at(&self, i: usize) -> Option<u64> {
        self.entries.get(i).map(|entry| entry.offset)
    }

    pub fn entries(&self) -> &[ShxEntry] {
        &self.entries
    }
}

pub fn open(path: &Path) -> Result<ShxReader, ShxError> {
    match fs::File::open(path) {
        Err(err) => Err(ShxError::IOError(err)),
        Ok(f) => ShxReader::new(io::BufReader::new(f)),
    }
}

#[cfg(test)]
pub mod test {
    use std::io;
    use byteorder::{BigEndian, WriteBytesExt};
    use super::{ShxError, ShxReader};

    /// Builds a .shx byte stream from byte-unit (offset, length) pairs.
    pub fn shx_file(entries: &[(u64, u64)]) -> Vec<u8> {
        let n_bytes = 100 + entries.len() * 8;
        let mut buf = vec![];
        buf.write_i32::<BigEndian>(9994).unwrap();
        for _ in 0..5 {
            buf.write_i32::<BigEndian>(0).unwrap();
        }
        buf.write_i32::<BigEndian>((n_bytes / 2) as i32).unwrap();
        buf.extend_from_slice(&[0u8; 68]);
        assert_eq!(100, buf.len());
        for &(offset, length) in entries {
            buf.write_i32::<BigEndian>((offset / 2) as i32).unwrap();
            buf.write_i32::<BigEndian>((length / 2) as i32).unwrap();
        }
        buf
    }

    fn reader(bytes: Vec<u8>) -> Result<ShxReader, ShxError> {
        ShxReader::new(io::Cursor::new(bytes))
    }

    #[test]
    fn offsets_convert_to_bytes() {
        let r = reader(shx_file(&[(100, 128), (236, 64), (308, 128)])).unwrap();
        assert_eq!(3, r.len());
        assert_eq!(Some(100), r.offset_at(0));
        assert_eq!(Some(236), r.offset_at(1));
        assert_eq!(Some(308), r.offset_at(2));
        assert_eq!(64, r.entries()[1].length);
    }

    #[test]
    fn out_of_range_lookup_is_none() {
        let r = reader(shx_file(&[(100, 128)])).unwrap();
        assert_eq!(None, r.offset_at(1));
        assert_eq!(None, r.offset_at(1000));
    }

    #[test]
    fn measured_count_beats_declared_count() {
        let mut bytes = shx_file(&[(100, 128), (236, 64)]);
        // Claim a far longer file than the two entries present.
        bytes[24] = 0;
        bytes[25] = 0;
        bytes[26] = 0x7f;
        bytes[27] = 0xff;
        let r = reader(bytes).unwrap();
        assert_eq!(2, r.len());
    }

    #[test]
    fn rejects_wrong_file_code() {
        let mut bytes = shx_file(&[(100, 128)]);
        bytes[3] = 0;
        match reader(bytes) {
            Err(ShxError::WrongFileCode(_)) => {}
            other => panic!("expected WrongFileCode, got {:?}", other),
        }
    }

    #[test]
    fn empty_index_has_no_entries() {
        let r = reader(shx_file(&[])).unwrap();
        assert_eq!(0, r.len());
        assert_eq!(None, r.offset_at(0));
    }
}
