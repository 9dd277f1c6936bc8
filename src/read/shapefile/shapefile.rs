/// Ties the four sibling readers into one dataset addressed by position.
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use encoding::EncodingRef;
use super::dbf::{self, DbfReader};
use super::prj::{self, PrjError, PrjReader};
use super::shp::{self, Shape, ShpError, ShpReader, ShpShapes};
use super::shx::{self, ShxReader};

type FileReader = io::BufReader<fs::File>;

#[derive(Debug)]
pub enum ShapefileError {
    ShpError(ShpError),
    PrjError(PrjError),
    NoShpFile(PathBuf),
    NoShape(usize),
}

impl error::Error for ShapefileError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            ShapefileError::ShpError(ref err) => Some(err),
            ShapefileError::PrjError(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for ShapefileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ShapefileError::ShpError(ref err) => err.fmt(f),
            ShapefileError::PrjError(ref err) => err.fmt(f),
            ShapefileError::NoShpFile(ref path) => write!(f, "Path {:?} doesn't point to a .shp file", path),
            ShapefileError::NoShape(i) => write!(f, "No shape at index {}", i),
        }
    }
}

/// A whole dataset: the geometry stream plus whichever of the ".dbf",
/// ".shx" and ".prj" siblings could be opened.
///
/// The geometry reader is mandatory; any failure to open or parse it
/// propagates. The three siblings are best-effort: a failure leaves that
/// field `None` and the dataset still works, just with fewer tricks (no
/// attributes, no O(1) positional access, no coordinate system).
///
/// # Example
///
/// ```no_run
/// use shapeio::read::shapefile;
///
/// let mut reader = shapefile::open_utf8(std::path::Path::new("counties.shp")).unwrap();
///
/// for i in 0..reader.count() {
///     let shape = reader.shape_at(i).unwrap();
///     println!("{}: {:?}", i, shape.shape_type);
/// }
/// ```
#[derive(Debug)]
pub struct ShapefileReader {
    pub shp: ShpReader<FileReader>,
    pub dbf: Option<DbfReader<FileReader>>,
    pub shx: Option<ShxReader>,
    pub prj: Option<PrjReader>,
}

impl ShapefileReader {
    /// Shape `i`, through the index when it has a usable entry.
    ///
    /// Without an index, or when the indexed offset doesn't decode, this
    /// falls back to a sequential scan discarding the first `i` shapes:
    /// O(n), not O(1).
    pub fn shape_at(&mut self, i: usize) -> Result<Shape, ShapefileError> {
        if let Some(offset) = self.shx.as_ref().and_then(|shx| shx.offset_at(i)) {
            if let Ok(Some((_, shape))) = self.shp.shape_at_offset(offset) {
                return Ok(shape);
            }
        }

        match self.shp.shapes().filter_map(|s| s.ok()).nth(i) {
            Some(shape) => Ok(shape),
            None => Err(ShapefileError::NoShape(i)),
        }
    }

    /// Number of shapes: the index's entry count when present, else the
    /// cost of a full sequential scan.
    pub fn count(&mut self) -> usize {
        match self.shx {
            Some(ref shx) => shx.len(),
            None => self.shp.shapes().take_while(|s| s.is_ok()).count(),
        }
    }

    /// Sequential iteration over the geometry stream, index not involved.
    pub fn shapes(&mut self) -> ShpShapes<FileReader> {
        self.shp.shapes()
    }
}

/// Opens a dataset by its ".shp" path, deriving the ".dbf", ".shx" and
/// ".prj" paths by extension substitution.
pub fn open(shp_path: &Path, encoding: EncodingRef) -> Result<ShapefileReader, ShapefileError> {
    if shp_path.extension().and_then(|e| e.to_str()) != Some("shp") {
        return Err(ShapefileError::NoShpFile(shp_path.to_path_buf()));
    }

    let shp_reader = match shp::open(shp_path) {
        Err(err) => return Err(ShapefileError::ShpError(err)),
        Ok(r) => r,
    };

    let mut sibling = PathBuf::from(shp_path);
    sibling.set_extension("dbf");
    let dbf_reader = dbf::open(&sibling, encoding).ok();
    sibling.set_extension("shx");
    let shx_reader = shx::open(&sibling).ok();
    sibling.set_extension("prj");
    let prj_reader = prj::open(&sibling).ok();

    Ok(ShapefileReader {
        shp: shp_reader,
        dbf: dbf_reader,
        shx: shx_reader,
        prj: prj_reader,
    })
}

#[cfg(test)]
pub mod test {
    use std::fs;
    use std::io::Write;
    use std::path::{Path, PathBuf};
    use encoding;
    use tempfile;
    use read::shapefile::dbf::test::dbf_file;
    use read::shapefile::prj::test::WGS84_PRJ;
    use read::shapefile::shp::{ShapeType, ShpError};
    use read::shapefile::shp::test::{polygon_content, polygon_file};
    use read::shapefile::shx::test::shx_file;
    use super::{open, ShapefileError, ShapefileReader};

    pub const SQUARE: &'static [(f64, f64)] = &[(0., 0.), (0., 2.), (2., 2.), (2., 0.), (0., 0.)];
    pub const TRIANGLE: &'static [(f64, f64)] = &[(5., 5.), (6., 7.), (7., 5.), (5., 5.)];

    /// Index entries matching `polygon_file(rings_per_record)`.
    pub fn polygon_shx(rings_per_record: &[&[&[(f64, f64)]]]) -> Vec<u8> {
        let mut entries = vec![];
        let mut offset = 100u64;
        for parts in rings_per_record {
            let length = polygon_content(parts).len() as u64;
            entries.push((offset, length));
            offset += 8 + length;
        }
        shx_file(&entries)
    }

    pub fn name_dbf(n_records: usize) -> Vec<u8> {
        let records: Vec<String> = (0..n_records).map(|i| format!(" town{:03}", i)).collect();
        dbf_file(&[("NAME", 'C', 7, 0)], &records)
    }

    /// Writes the given sibling files into `dir` and returns the ".shp"
    /// path whether or not one was written.
    pub fn write_bundle(dir: &Path, files: &[(&str, &[u8])]) -> PathBuf {
        for &(name, bytes) in files {
            let mut f = fs::File::create(dir.join(name)).unwrap();
            f.write_all(bytes).unwrap();
        }
        dir.join("towns.shp")
    }

    fn full_bundle(dir: &Path, rings_per_record: &[&[&[(f64, f64)]]]) -> ShapefileReader {
        let shp_path = write_bundle(dir, &[
            ("towns.shp", &polygon_file(rings_per_record)),
            ("towns.dbf", &name_dbf(rings_per_record.len())),
            ("towns.shx", &polygon_shx(rings_per_record)),
            ("towns.prj", WGS84_PRJ),
        ]);
        open(&shp_path, encoding::all::UTF_8).unwrap()
    }

    #[test]
    fn counts_agree_across_readers() {
        let dir = tempfile::tempdir().unwrap();
        let rings: &[&[&[(f64, f64)]]] = &[&[SQUARE], &[SQUARE, TRIANGLE], &[TRIANGLE]];
        let mut r = full_bundle(dir.path(), rings);

        assert_eq!(3, r.count());
        assert_eq!(3, r.dbf.as_ref().unwrap().record_count());
        assert_eq!(3, r.shapes().count());
    }

    #[test]
    fn indexed_access_equals_sequential_scan() {
        let dir = tempfile::tempdir().unwrap();
        let rings: &[&[&[(f64, f64)]]] = &[&[SQUARE], &[SQUARE, TRIANGLE], &[TRIANGLE]];
        let mut r = full_bundle(dir.path(), rings);

        let sequential: Vec<_> = r.shapes().map(|s| s.unwrap()).collect();
        for (i, expected) in sequential.iter().enumerate() {
            let shape = r.shape_at(i).unwrap();
            assert_eq!(expected.parts.len(), shape.parts.len());
            assert_eq!(expected.points.len(), shape.points.len());
        }
    }

    #[test]
    fn twenty_six_polygons_by_both_paths() {
        let mut rings: Vec<&[&[(f64, f64)]]> = vec![&[SQUARE]; 26];
        rings[2] = &[SQUARE, TRIANGLE];

        let with_index = tempfile::tempdir().unwrap();
        let mut indexed = full_bundle(with_index.path(), &rings);
        assert_eq!(26, indexed.count());

        let without_index = tempfile::tempdir().unwrap();
        let shp_path = write_bundle(without_index.path(), &[
            ("towns.shp", &polygon_file(&rings)),
        ]);
        let mut scanned = open(&shp_path, encoding::all::UTF_8).unwrap();
        assert!(scanned.shx.is_none());
        assert_eq!(26, scanned.count());

        for r in &mut [&mut indexed, &mut scanned] {
            let shape = r.shape_at(2).unwrap();
            assert_eq!(ShapeType::Polygon, shape.shape_type);
            assert_eq!(2, shape.parts.len());
            assert_eq!(9, shape.points.len());
            assert!(shape.bbox.2 > 0.0);
        }
    }

    #[test]
    fn missing_siblings_are_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let shp_path = write_bundle(dir.path(), &[
            ("towns.shp", &polygon_file(&[&[SQUARE], &[TRIANGLE]])),
        ]);
        let mut r = open(&shp_path, encoding::all::UTF_8).unwrap();

        assert!(r.dbf.is_none());
        assert!(r.shx.is_none());
        assert!(r.prj.is_none());
        assert_eq!(2, r.count());
        assert_eq!(4, r.shape_at(1).unwrap().points.len());
    }

    #[test]
    fn corrupt_index_entry_falls_back_to_scan() {
        let dir = tempfile::tempdir().unwrap();
        let rings: &[&[&[(f64, f64)]]] = &[&[SQUARE], &[TRIANGLE]];
        // Point every index entry far past the end of the stream.
        let shp_path = write_bundle(dir.path(), &[
            ("towns.shp", &polygon_file(rings)),
            ("towns.shx", &shx_file(&[(100_000, 8), (200_000, 8)])),
        ]);
        let mut r = open(&shp_path, encoding::all::UTF_8).unwrap();

        assert_eq!(4, r.shape_at(1).unwrap().points.len());
    }

    #[test]
    fn shape_out_of_range_is_no_shape() {
        let dir = tempfile::tempdir().unwrap();
        let shp_path = write_bundle(dir.path(), &[
            ("towns.shp", &polygon_file(&[&[SQUARE]])),
        ]);
        let mut r = open(&shp_path, encoding::all::UTF_8).unwrap();

        match r.shape_at(7) {
            Err(ShapefileError::NoShape(7)) => {}
            other => panic!("expected NoShape, got {:?}", other),
        }
    }

    #[test]
    fn non_shp_extension_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_bundle(dir.path(), &[("towns.dbf", &name_dbf(1))]);
        match open(&dir.path().join("towns.dbf"), encoding::all::UTF_8) {
            Err(ShapefileError::NoShpFile(_)) => {}
            other => panic!("expected NoShpFile, got {:?}", other),
        }
    }

    #[test]
    fn attribute_bytes_in_a_shp_file_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        // A .dbf byte stream doesn't start with the geometry magic code.
        let shp_path = write_bundle(dir.path(), &[("towns.shp", &name_dbf(3))]);
        match open(&shp_path, encoding::all::UTF_8) {
            Err(ShapefileError::ShpError(ShpError::WrongFileCode(_))) => {}
            other => panic!("expected WrongFileCode, got {:?}", other),
        }
    }
}
