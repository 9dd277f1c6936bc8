/// Reads xBase ".dbf" attribute tables, as per
/// https://www.clicketyclick.dk/databases/xbase/format/dbf.html
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::io::{Read, Seek};
use std::path::Path;
use byteorder::{ByteOrder, LittleEndian};
use encoding;
use encoding::{DecoderTrap, EncodingRef};

const DBF_HEADER_LENGTH: usize = 32;
const DBF_FIELD_DESCRIPTOR_LENGTH: usize = 32;
const DBF_FIELD_TERMINATOR: u8 = 0x0d;

#[derive(Debug)]
pub enum DbfError {
    IOError(io::Error),
    ParseError(String),
}

impl error::Error for DbfError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            DbfError::IOError(ref err) => Some(err),
            DbfError::ParseError(_) => None,
        }
    }
}

impl fmt::Display for DbfError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DbfError::IOError(ref err) => err.fmt(f),
            DbfError::ParseError(ref description) => write!(f, "Parse error: {}", description),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DbfField {
    pub name: String,
    /// One-letter xBase type code: C, N, F, D, L or M.
    pub type_code: char,
    pub length: usize,
    pub decimal_count: usize,
}

/// One decoded attribute value. `Null` stands for a value that was all
/// padding on disk.
#[derive(Debug, Clone, PartialEq)]
pub enum DbfValue {
    Null,
    Character(String),
    Numeric(i64),
    Float(f64),
    Logical(bool),
    Date(String),
    Memo(String),
}

pub type DbfRecord = Vec<DbfValue>;

#[derive(Debug)]
struct DbfHeader {
    file_type: u8,
    last_update: String, // YYYY-MM-DD
    n_records: usize,
    n_header_bytes: usize,
    n_bytes_per_record: usize,
}

/// Reads the first 32 bytes of the file.
///
/// Side-effect: advances the file cursor 32 bytes.
fn read_dbf_header<R: Read>(file: &mut R) -> Result<DbfHeader, DbfError> {
    let mut buf = [0u8; DBF_HEADER_LENGTH];

    match file.read_exact(&mut buf) {
        Err(err) => return Err(DbfError::IOError(err)),
        Ok(_) => {}
    }

    // Virtually any combination of 32 bytes is a valid .dbf header. The one
    // exception: the last-update date. All years are valid; there are 12
    // valid months and 31 valid days.
    if buf[2] > 12 || buf[3] > 31 {
        return Err(DbfError::ParseError(String::from(
            "The first four bytes of the file mention an invalid update date. This is not a valid .dbf file.")));
    }

    Ok(DbfHeader {
        file_type: buf[0],
        last_update: format!("{}-{:02}-{:02}", 1900 + buf[1] as u32, buf[2], buf[3]),
        n_records: LittleEndian::read_u32(&buf[4..8]) as usize,
        n_header_bytes: LittleEndian::read_u16(&buf[8..10]) as usize,
        n_bytes_per_record: LittleEndian::read_u16(&buf[10..12]) as usize,
    })
}

/// Reads all field descriptors plus the terminator byte that must follow
/// them. Call after read_dbf_header().
///
/// Side-effect: advances the file cursor to the first data record.
fn read_dbf_fields<R: Read>(file: &mut R, dbf_header: &DbfHeader, encoding: EncodingRef) -> Result<Vec<DbfField>, DbfError> {
    let n_fields = dbf_header.n_header_bytes.saturating_sub(DBF_HEADER_LENGTH + 1) / DBF_FIELD_DESCRIPTOR_LENGTH;

    // Every record starts with a one-byte deletion flag; a synthetic field
    // keeps the schema aligned with the bytes on disk.
    let mut fields = vec![DbfField {
        name: String::from("DeletionFlag"),
        type_code: 'C',
        length: 1,
        decimal_count: 0,
    }];

    for _ in 0..n_fields {
        let mut buf = [0u8; DBF_FIELD_DESCRIPTOR_LENGTH];
        match file.read_exact(&mut buf) {
            Err(err) => return Err(DbfError::IOError(err)),
            Ok(_) => {}
        }

        let name_len = buf[0..11].iter().position(|&b| b == 0).unwrap_or(11);
        fields.push(DbfField {
            name: decode_string(&buf[0..name_len], encoding),
            type_code: buf[11] as char,
            length: buf[16] as usize,
            decimal_count: buf[17] as usize,
        });
    }

    let mut terminator = [0u8; 1];
    match file.read_exact(&mut terminator) {
        Err(err) => return Err(DbfError::IOError(err)),
        Ok(_) => {}
    }
    if terminator[0] != DBF_FIELD_TERMINATOR {
        return Err(DbfError::ParseError(format!(
            "expected field terminator 0x{:02x} after {} field descriptors, found 0x{:02x}",
            DBF_FIELD_TERMINATOR, n_fields, terminator[0])));
    }

    Ok(fields)
}

fn decode_string(bytes: &[u8], encoding: EncodingRef) -> String {
    match encoding.decode(bytes, DecoderTrap::Replace) {
        Ok(s) => s,
        Err(_) => String::new(),
    }
}

fn parse_value(field: &DbfField, trimmed: &str) -> Result<DbfValue, DbfError> {
    if trimmed.is_empty() {
        return Ok(DbfValue::Null);
    }

    match field.type_code {
        'N' => {
            if field.decimal_count > 0 || trimmed.contains('.') {
                match trimmed.parse::<f64>() {
                    Ok(v) => Ok(DbfValue::Float(v)),
                    Err(_) => Err(DbfError::ParseError(format!("field {} holds {:?}, which is not a number", field.name, trimmed))),
                }
            } else {
                match trimmed.parse::<i64>() {
                    Ok(v) => Ok(DbfValue::Numeric(v)),
                    Err(_) => Err(DbfError::ParseError(format!("field {} holds {:?}, which is not an integer", field.name, trimmed))),
                }
            }
        }
        'F' => {
            match trimmed.parse::<f64>() {
                Ok(v) => Ok(DbfValue::Float(v)),
                Err(_) => Err(DbfError::ParseError(format!("field {} holds {:?}, which is not a number", field.name, trimmed))),
            }
        }
        // Date, stored as a string in the format YYYYMMDD. Kept raw.
        'D' => Ok(DbfValue::Date(trimmed.to_string())),
        'C' => Ok(DbfValue::Character(trimmed.to_string())),
        'L' => Ok(DbfValue::Logical(["T", "t", "Y", "y"].contains(&trimmed))),
        // Memo: the value is a .dbt block number, kept raw.
        'M' => Ok(DbfValue::Memo(trimmed.to_string())),
        other => {
            warn!("unknown field type {:?} for field {}; keeping the raw string", other, field.name);
            Ok(DbfValue::Character(trimmed.to_string()))
        }
    }
}

/// Reads an xBase ".dbf" attribute table.
///
/// Records are addressed by zero-based index; `record_at(i)` seeks straight
/// to the record, and `records()` walks them in order. Both decode the same
/// bytes the same way.
///
/// # Example
///
/// ```no_run
/// use shapeio::read::shapefile::dbf;
///
/// let mut dbf_reader = dbf::open_utf8(std::path::Path::new("counties.dbf")).unwrap();
/// let record = dbf_reader.record_at(0).unwrap();
/// println!("{:?}", record);
/// ```
pub struct DbfReader<R: Read + Seek> {
    file: R,
    file_type: u8,
    last_update: String,
    n_records: usize,
    n_header_bytes: usize,
    n_bytes_per_record: usize,
    fields: Vec<DbfField>,
    encoding: EncodingRef,
}

// encoding::EncodingRef does not implement std::fmt::Debug
impl<R: Read + Seek> fmt::Debug for DbfReader<R> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DbfReader")
            .field("n_records", &self.n_records)
            .field("n_bytes_per_record", &self.n_bytes_per_record)
            .field("fields", &self.fields)
            .field("encoding", &self.encoding.name())
            .finish()
    }
}

impl<R: Read + Seek> DbfReader<R> {
    pub fn new(mut file: R, encoding: EncodingRef) -> Result<DbfReader<R>, DbfError> {
        let header = read_dbf_header(&mut file)?;
        let fields = read_dbf_fields(&mut file, &header, encoding)?;

        // The declared record length loses to the one computed from the
        // schema when they disagree.
        let n_bytes_per_record: usize = fields.iter().map(|f| f.length).sum();
        if n_bytes_per_record != header.n_bytes_per_record {
            warn!("record length in header is {} bytes but the field widths sum to {}; using the sum",
                  header.n_bytes_per_record, n_bytes_per_record);
        }

        Ok(DbfReader {
            file: file,
            file_type: header.file_type,
            last_update: header.last_update,
            n_records: header.n_records,
            n_header_bytes: header.n_header_bytes,
            n_bytes_per_record: n_bytes_per_record,
            fields: fields,
            encoding: encoding,
        })
    }

    pub fn record_count(&self) -> usize {
        self.n_records
    }

    pub fn file_type(&self) -> u8 {
        self.file_type
    }

    /// Last-update date from the header, formatted YYYY-MM-DD.
    pub fn last_update(&self) -> &str {
        &self.last_update
    }

    /// The schema, including the synthetic leading DeletionFlag field.
    pub fn fields(&self) -> &[DbfField] {
        &self.fields
    }

    pub fn field_named(&self, name: &str) -> Option<&DbfField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Decodes record `i`. A logically-deleted record (deletion flag not a
    /// space) decodes to an empty Vec, not an error.
    pub fn record_at(&mut self, i: usize) -> Result<DbfRecord, DbfError> {
        let offset = self.n_header_bytes as u64 + i as u64 * self.n_bytes_per_record as u64;
        match self.file.seek(io::SeekFrom::Start(offset)) {
            Err(err) => return Err(DbfError::IOError(err)),
            Ok(_) => {}
        }

        let mut buf = vec![0u8; self.n_bytes_per_record];
        match self.file.read_exact(&mut buf) {
            Err(err) => return Err(DbfError::IOError(err)),
            Ok(_) => {}
        }

        if buf[0] != b' ' {
            return Ok(vec![]);
        }

        let mut record = Vec::with_capacity(self.fields.len() - 1);
        let mut pos = 1; // past the deletion flag
        for field in &self.fields[1..] {
            let value = decode_string(&buf[pos..pos + field.length], self.encoding);
            record.push(parse_value(field, value.trim())?);
            pos += field.length;
        }

        Ok(record)
    }

    /// Iterates over every record. The iterator stops after yielding the
    /// first error; calling `records()` again restarts from the beginning.
    pub fn records(&mut self) -> DbfRecords<R> {
        DbfRecords {
            reader: self,
            index: 0,
            done: false,
        }
    }
}

#[derive(Debug)]
pub struct DbfRecords<'a, R: Read + Seek + 'a> {
    reader: &'a mut DbfReader<R>,
    index: usize,
    done: bool,
}

impl<'a, R: Read + Seek> Iterator for DbfRecords<'a, R> {
    type Item = Result<DbfRecord, DbfError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.index >= self.reader.n_records {
            return None;
        }
        let ret = self.reader.record_at(self.index);
        self.index += 1;
        if ret.is_err() {
            self.done = true;
        }
        Some(ret)
    }
}

pub fn open(path: &Path, encoding: EncodingRef) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    match fs::File::open(path) {
        Err(err) => Err(DbfError::IOError(err)),
        Ok(f) => {
            let r = io::BufReader::new(f);
            DbfReader::new(r, encoding)
        }
    }
}

pub fn open_ascii(path: &Path) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    open(path, encoding::all::ASCII)
}

pub fn open_utf8(path: &Path) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    open(path, encoding::all::UTF_8)
}

pub fn open_windows1252(path: &Path) -> Result<DbfReader<io::BufReader<fs::File>>, DbfError> {
    open(path, encoding::all::WINDOWS_1252)
}
