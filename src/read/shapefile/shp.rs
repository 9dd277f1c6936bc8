/// Reads ESRI ".shp" Shapefile geometry streams, as per
/// https://www.esri.com/library/whitepapers/pdfs/shapefile.pdf
use std::cmp;
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::io::{Read, Seek};
use std::path::Path;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use itertools::Itertools;

pub const SHP_HEADER_LENGTH: usize = 100;
const SHP_RECORD_HEADER_LENGTH: usize = 8;
const SHP_MAGIC_NUMBER: u32 = 9994;

/// Any measure below this is "no data", per the ESRI spec.
const SHP_NO_DATA: f64 = -1e38;

#[derive(Debug)]
pub enum ShpError {
    IOError(io::Error),
    WrongFileCode(u32),
    InvalidShapeType(i32),
    OffsetOutOfLength(u64, u64),
    ParseError(String),
}

impl error::Error for ShpError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ShpError::IOError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ShpError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShpError::IOError(ref err) => err.fmt(f),
            ShpError::WrongFileCode(code) => write!(f, "File code {} is wrong", code),
            ShpError::InvalidShapeType(code) => write!(f, "Shape type {} is not valid", code),
            ShpError::OffsetOutOfLength(offset, length) => write!(f, "Shape offset {} is greater than file length {}", offset, length),
            ShpError::ParseError(ref description) => write!(f, "Parse error: {}", description),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ShapeType {
    Null,
    Point,
    PolyLine,
    Polygon,
    MultiPoint,
    PointZ,
    PolyLineZ,
    PolygonZ,
    MultiPointZ,
    PointM,
    PolyLineM,
    PolygonM,
    MultiPointM,
    MultiPatch,
}

impl ShapeType {
    pub fn from_i32(i: i32) -> Option<ShapeType> {
        match i {
            0 => Some(ShapeType::Null),
            1 => Some(ShapeType::Point),
            3 => Some(ShapeType::PolyLine),
            5 => Some(ShapeType::Polygon),
            8 => Some(ShapeType::MultiPoint),
            11 => Some(ShapeType::PointZ),
            13 => Some(ShapeType::PolyLineZ),
            15 => Some(ShapeType::PolygonZ),
            18 => Some(ShapeType::MultiPointZ),
            21 => Some(ShapeType::PointM),
            23 => Some(ShapeType::PolyLineM),
            25 => Some(ShapeType::PolygonM),
            28 => Some(ShapeType::MultiPointM),
            31 => Some(ShapeType::MultiPatch),
            _ => None,
        }
    }

    pub fn has_bounding_box(&self) -> bool {
        match *self {
            ShapeType::PolyLine | ShapeType::Polygon | ShapeType::MultiPoint
            | ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
            | ShapeType::PolyLineM | ShapeType::PolygonM | ShapeType::MultiPointM
            | ShapeType::MultiPatch => true,
            _ => false,
        }
    }

    pub fn has_parts(&self) -> bool {
        match *self {
            ShapeType::PolyLine | ShapeType::Polygon
            | ShapeType::PolyLineZ | ShapeType::PolygonZ
            | ShapeType::PolyLineM | ShapeType::PolygonM
            | ShapeType::MultiPatch => true,
            _ => false,
        }
    }

    pub fn has_points(&self) -> bool {
        match *self {
            ShapeType::PolyLine | ShapeType::Polygon | ShapeType::MultiPoint
            | ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
            | ShapeType::PolyLineM | ShapeType::PolygonM | ShapeType::MultiPointM
            | ShapeType::MultiPatch => true,
            _ => false,
        }
    }

    pub fn has_z_values(&self) -> bool {
        match *self {
            ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
            | ShapeType::MultiPatch => true,
            _ => false,
        }
    }

    pub fn has_m_values(&self) -> bool {
        match *self {
            ShapeType::PolyLineZ | ShapeType::PolygonZ | ShapeType::MultiPointZ
            | ShapeType::PolyLineM | ShapeType::PolygonM | ShapeType::MultiPointM
            | ShapeType::MultiPatch => true,
            _ => false,
        }
    }

    pub fn has_single_point(&self) -> bool {
        match *self {
            ShapeType::Point | ShapeType::PointZ | ShapeType::PointM => true,
            _ => false,
        }
    }

    pub fn has_single_z(&self) -> bool {
        match *self {
            ShapeType::PointZ => true,
            _ => false,
        }
    }

    pub fn has_single_m(&self) -> bool {
        match *self {
            ShapeType::PointZ | ShapeType::PointM => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ShpPoint(pub f64, pub f64);

impl fmt::Display for ShpPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({},{})", self.0, self.1)
    }
}

/// (x_min, y_min, x_max, y_max)
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ShpBoundingBox(pub f64, pub f64, pub f64, pub f64);

/// One decoded geometry record.
///
/// Which fields are populated depends entirely on the `ShapeType`
/// capability methods: `parts` only when `has_parts()`, `part_types` only
/// for `MultiPatch`, `z` for the Z types (one entry per point, or a single
/// entry for `PointZ`), `m` for the M types with `None` marking a no-data
/// measure.
#[derive(Debug, Clone)]
pub struct Shape {
    pub shape_type: ShapeType,
    pub points: Vec<ShpPoint>,
    pub bbox: ShpBoundingBox,
    pub parts: Vec<usize>,
    pub part_types: Vec<i32>,
    pub z: Vec<f64>,
    pub m: Vec<Option<f64>>,
}

impl Shape {
    fn new(shape_type: ShapeType) -> Shape {
        Shape {
            shape_type: shape_type,
            points: vec![],
            bbox: ShpBoundingBox(0.0, 0.0, 0.0, 0.0),
            parts: vec![],
            part_types: vec![],
            z: vec![],
            m: vec![],
        }
    }

    /// One slice of points per part, the last part running to the end of
    /// the point list. Empty for shape types without parts.
    pub fn part_slices(&self) -> Vec<&[ShpPoint]> {
        if !self.shape_type.has_parts() {
            return vec![];
        }

        let mut bounds = self.parts.clone();
        bounds.push(self.points.len());

        bounds.into_iter()
            .tuple_windows()
            .filter(|&(start, end)| start <= end && end <= self.points.len())
            .map(|(start, end)| &self.points[start..end])
            .collect()
    }
}

#[derive(Debug, Copy, Clone)]
pub struct ShpHeader {
    /// Measured length of the stream, in bytes. The length declared in the
    /// header is not trusted; when the two disagree, this is the actual one.
    pub file_n_bytes: u64,
    pub shape_type: ShapeType,
    pub bounding_box: ShpBoundingBox,
    pub z_range: (f64, f64),
    pub m_range: (f64, f64),
}

impl ShpHeader {
    fn measure_defined(&self) -> bool {
        self.m_range.0 != 0.0 && self.m_range.1 != 0.0
    }
}

/// Reads the first 100 bytes of the file, then measures its total length.
///
/// Side-effect: leaves the file cursor at an unspecified position. Every
/// record read seeks to an absolute offset first, so this doesn't matter.
fn read_shp_header<R: Read + Seek>(file: &mut R) -> Result<ShpHeader, ShpError> {
    let mut buf = [0u8; SHP_HEADER_LENGTH];

    match file.read_exact(&mut buf) {
        Err(err) => return Err(ShpError::IOError(err)),
        Ok(_) => {}
    }

    let magic_number = BigEndian::read_u32(&buf[0..4]);
    if magic_number != SHP_MAGIC_NUMBER {
        return Err(ShpError::WrongFileCode(magic_number));
    }

    let declared_n_bytes = cmp::max(0, BigEndian::read_i32(&buf[24..28]) as i64 * 2) as u64;

    let shape_type_i32 = LittleEndian::read_i32(&buf[32..36]);
    let shape_type = match ShapeType::from_i32(shape_type_i32) {
        Some(t) => t,
        None => return Err(ShpError::InvalidShapeType(shape_type_i32)),
    };

    let bounding_box = ShpBoundingBox(
        LittleEndian::read_f64(&buf[36..44]),
        LittleEndian::read_f64(&buf[44..52]),
        LittleEndian::read_f64(&buf[52..60]),
        LittleEndian::read_f64(&buf[60..68]),
    );
    let z_range = (LittleEndian::read_f64(&buf[68..76]), LittleEndian::read_f64(&buf[76..84]));
    let m_range = (LittleEndian::read_f64(&buf[84..92]), LittleEndian::read_f64(&buf[92..100]));

    // The length declared in the header is untrusted: measure instead.
    let measured_n_bytes = match file.seek(io::SeekFrom::End(0)) {
        Err(err) => return Err(ShpError::IOError(err)),
        Ok(n) => n,
    };
    if measured_n_bytes != declared_n_bytes {
        warn!("shp length in header is {} bytes but the file measures {} bytes; using the measured length",
              declared_n_bytes, measured_n_bytes);
    }

    Ok(ShpHeader {
        file_n_bytes: measured_n_bytes,
        shape_type: shape_type,
        bounding_box: bounding_box,
        z_range: z_range,
        m_range: m_range,
    })
}

/// Walks a record body slice left to right. Running past the end of the
/// slice is a ParseError, never a panic.
struct RecordCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> RecordCursor<'a> {
    fn new(buf: &'a [u8]) -> RecordCursor<'a> {
        RecordCursor { buf: buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ShpError> {
        if n > self.buf.len() - self.pos {
            Err(ShpError::ParseError(format!(
                "record needs {} more bytes at position {}, but its body is only {} bytes",
                n, self.pos, self.buf.len())))
        } else {
            let slice = &self.buf[self.pos..self.pos + n];
            self.pos += n;
            Ok(slice)
        }
    }

    fn i32(&mut self) -> Result<i32, ShpError> {
        self.take(4).map(|b| LittleEndian::read_i32(b))
    }

    fn f64(&mut self) -> Result<f64, ShpError> {
        self.take(8).map(|b| LittleEndian::read_f64(b))
    }
}

fn parse_point(buf: &[u8]) -> ShpPoint {
    ShpPoint(LittleEndian::read_f64(&buf[0..8]), LittleEndian::read_f64(&buf[8..16]))
}

fn measure_or_no_data(m: f64) -> Option<f64> {
    if m < SHP_NO_DATA { None } else { Some(m) }
}

/// Parses one record body. Field presence follows the shape type's
/// capability matrix; counts are clamped to zero when negative.
fn parse_shape(buf: &[u8], measure_defined: bool) -> Result<Shape, ShpError> {
    let mut cursor = RecordCursor::new(buf);

    let shape_type_i32 = cursor.i32()?;
    let shape_type = match ShapeType::from_i32(shape_type_i32) {
        Some(t) => t,
        None => return Err(ShpError::InvalidShapeType(shape_type_i32)),
    };

    let mut shape = Shape::new(shape_type);
    let mut n_parts: usize = 0;
    let mut n_points: usize = 0;

    if shape_type.has_bounding_box() {
        let b = cursor.take(32)?;
        shape.bbox = ShpBoundingBox(
            LittleEndian::read_f64(&b[0..8]),
            LittleEndian::read_f64(&b[8..16]),
            LittleEndian::read_f64(&b[16..24]),
            LittleEndian::read_f64(&b[24..32]),
        );
    }

    if shape_type.has_parts() {
        n_parts = cmp::max(0, cursor.i32()?) as usize;
    }

    if shape_type.has_points() {
        n_points = cmp::max(0, cursor.i32()?) as usize;
    }

    if n_parts > 0 {
        shape.parts = cursor.take(n_parts * 4)?
            .chunks(4)
            .map(|b| cmp::max(0, LittleEndian::read_i32(b)) as usize)
            .collect();
    }

    if shape_type == ShapeType::MultiPatch {
        shape.part_types = cursor.take(n_parts * 4)?
            .chunks(4)
            .map(|b| LittleEndian::read_i32(b))
            .collect();
    }

    if n_points > 0 {
        shape.points = cursor.take(n_points * 16)?
            .chunks(16)
            .map(parse_point)
            .collect();
    }

    if shape_type.has_z_values() {
        cursor.take(16)?; // z min, z max
        shape.z = cursor.take(n_points * 8)?
            .chunks(8)
            .map(|b| LittleEndian::read_f64(b))
            .collect();
    }

    if shape_type.has_m_values() && measure_defined {
        cursor.take(16)?; // m min, m max
        shape.m = cursor.take(n_points * 8)?
            .chunks(8)
            .map(|b| measure_or_no_data(LittleEndian::read_f64(b)))
            .collect();
    }

    if shape_type.has_single_point() {
        let b = cursor.take(16)?;
        shape.points = vec![parse_point(b)];
    }

    if shape_type.has_single_z() {
        shape.z = vec![cursor.f64()?];
    }

    if shape_type.has_single_m() {
        shape.m = vec![measure_or_no_data(cursor.f64()?)];
    }

    Ok(shape)
}

/// Reads an ESRI ".shp" Shapefile geometry stream, following instructions at
/// https://www.esri.com/library/whitepapers/pdfs/shapefile.pdf
///
/// Records are addressed by absolute byte offset, so both sequential
/// iteration (`shapes()`) and index-driven random access
/// (`shape_at_offset()`) read from the same reader.
///
/// # Example
///
/// ```no_run
/// use shapeio::read::shapefile::shp;
///
/// // builder returns Result<ShpReader, ShpError>
/// let mut shp_reader = shp::open(std::path::Path::new("counties.shp")).unwrap();
///
/// for shape in shp_reader.shapes() {
///     // shape is a Result<Shape, ShpError>
///     println!("{:?}", shape.unwrap().shape_type);
/// }
/// ```
#[derive(Debug)]
pub struct ShpReader<R: Read + Seek> {
    file: R,
    pub header: ShpHeader,
}

impl<R: Read + Seek> ShpReader<R> {
    pub fn new(mut file: R) -> Result<ShpReader<R>, ShpError> {
        read_shp_header(&mut file).map(move |header| {
            ShpReader {
                file: file,
                header: header,
            }
        })
    }

    /// Decodes the record starting at the given absolute byte offset.
    ///
    /// Returns `Ok(None)` when the offset is exactly the end of the stream,
    /// and `Ok(Some((next_offset, shape)))` otherwise. The next offset is
    /// computed from the record header alone, so a corrupted body doesn't
    /// derail a caller that walks the stream by holding the next offset.
    pub fn shape_at_offset(&mut self, offset: u64) -> Result<Option<(u64, Shape)>, ShpError> {
        if offset == self.header.file_n_bytes {
            return Ok(None);
        }
        if offset > self.header.file_n_bytes {
            return Err(ShpError::OffsetOutOfLength(offset, self.header.file_n_bytes));
        }

        match self.file.seek(io::SeekFrom::Start(offset)) {
            Err(err) => return Err(ShpError::IOError(err)),
            Ok(_) => {}
        }

        let mut header_buf = [0u8; SHP_RECORD_HEADER_LENGTH];
        match self.file.read_exact(&mut header_buf) {
            Err(err) => return Err(ShpError::IOError(err)),
            Ok(_) => {}
        }

        // header_buf[0..4] is the record number; nothing here needs it
        let content_words = BigEndian::read_i32(&header_buf[4..8]);
        let content_n_bytes = cmp::max(0, content_words as i64 * 2) as u64;
        let next = offset + SHP_RECORD_HEADER_LENGTH as u64 + content_n_bytes;

        // Never allocate more than the stream can actually hold.
        let remaining = self.header.file_n_bytes
            .saturating_sub(offset + SHP_RECORD_HEADER_LENGTH as u64);
        let body_n_bytes = cmp::min(content_n_bytes, remaining);

        let mut body = vec![0u8; body_n_bytes as usize];
        match self.file.read_exact(&mut body) {
            Err(err) => return Err(ShpError::IOError(err)),
            Ok(_) => {}
        }

        parse_shape(&body, self.header.measure_defined()).map(|shape| Some((next, shape)))
    }

    /// Iterates over every record from the start of the stream. The
    /// iterator stops after yielding the first error; calling `shapes()`
    /// again restarts from the beginning.
    pub fn shapes(&mut self) -> ShpShapes<R> {
        ShpShapes {
            reader: self,
            offset: SHP_HEADER_LENGTH as u64,
            done: false,
        }
    }
}

#[derive(Debug)]
pub struct ShpShapes<'a, R: Read + Seek + 'a> {
    reader: &'a mut ShpReader<R>,
    offset: u64,
    done: bool,
}

impl<'a, R: Read + Seek> Iterator for ShpShapes<'a, R> {
    type Item = Result<Shape, ShpError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.shape_at_offset(self.offset) {
            Ok(Some((next, shape))) => {
                self.offset = next;
                Some(Ok(shape))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

pub fn open(path: &Path) -> Result<ShpReader<io::BufReader<fs::File>>, ShpError> {
    match fs::File::open(path) {
        Err(err) => Err(ShpError::IOError(err)),
        Ok(f) => {
            let r = io::BufReader::new(f);
            ShpReader::new(r)
        }
    }
}
