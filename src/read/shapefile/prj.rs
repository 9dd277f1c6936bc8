/// Reads ".prj" coordinate-system descriptions: a single Well-Known Text
/// expression per OGC 01-009.
use std::error;
use std::fmt;
use std::fs;
use std::io;
use std::io::Read;
use std::path::Path;
use wkt;
use wkt::cs::{decode_coordinate_system, CoordinateSystem};

#[derive(Debug)]
pub enum PrjError {
    IOError(io::Error),
    Parse(wkt::ParseError),
    Decode(wkt::DecodeError),
    CoordinateSystemNotDefined,
    CoordinateSystemNotSupported(String),
}

impl error::Error for PrjError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            PrjError::IOError(ref err) => Some(err),
            PrjError::Parse(ref err) => Some(err),
            PrjError::Decode(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for PrjError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            PrjError::IOError(ref err) => err.fmt(f),
            PrjError::Parse(ref err) => err.fmt(f),
            PrjError::Decode(ref err) => err.fmt(f),
            PrjError::CoordinateSystemNotDefined => write!(f, "Coordinate system not defined"),
            PrjError::CoordinateSystemNotSupported(ref name) => write!(f, "Coordinate system {:?} not supported", name),
        }
    }
}

/// Reads a ".prj" file into a typed coordinate system.
///
/// Unlike the other sibling files, a ".prj" without a coordinate system is
/// useless, so an empty decode fails construction.
///
/// # Example
///
/// ```no_run
/// use shapeio::read::shapefile::prj;
///
/// let prj_reader = prj::open(std::path::Path::new("counties.prj")).unwrap();
/// println!("{}", prj_reader.coordinate_system().name());
/// ```
#[derive(Debug)]
pub struct PrjReader {
    coordinate_system: CoordinateSystem,
}

impl PrjReader {
    pub fn new<R: Read>(mut file: R) -> Result<PrjReader, PrjError> {
        let mut data = vec![];
        match file.read_to_end(&mut data) {
            Err(err) => return Err(PrjError::IOError(err)),
            Ok(_) => {}
        }

        let roots = match wkt::parse::parse(&data) {
            Err(err) => return Err(PrjError::Parse(err)),
            Ok(roots) => roots,
        };
        match decode_coordinate_system(&roots[0]) {
            Err(err) => Err(PrjError::Decode(err)),
            Ok(None) => Err(PrjError::CoordinateSystemNotDefined),
            Ok(Some(coordinate_system)) => Ok(PrjReader {
                coordinate_system: coordinate_system,
            }),
        }
    }

    pub fn coordinate_system(&self) -> &CoordinateSystem {
        &self.coordinate_system
    }
}

pub fn open(path: &Path) -> Result<PrjReader, PrjError> {
    match fs::File::open(path) {
        Err(err) => Err(PrjError::IOError(err)),
        Ok(f) => PrjReader::new(io::BufReader::new(f)),
    }
}

#[cfg(test)]
pub mod test {
    use std::io;
    use wkt::{DecodeError, ParseError};
    use wkt::cs::CoordinateSystem;
    use super::{PrjError, PrjReader};

    pub const WGS84_PRJ: &'static [u8] = br#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;

    fn reader(bytes: &[u8]) -> Result<PrjReader, PrjError> {
        PrjReader::new(io::Cursor::new(bytes.to_vec()))
    }

    #[test]
    fn decodes_a_geographic_system() {
        let r = reader(WGS84_PRJ).unwrap();
        assert_eq!("GCS_WGS_1984", r.coordinate_system().name());
        match *r.coordinate_system() {
            CoordinateSystem::Geographic(_) => {}
            ref other => panic!("expected Geographic, got {:?}", other),
        }
    }

    #[test]
    fn empty_text_is_a_parse_error() {
        match reader(b"  \n ") {
            Err(PrjError::Parse(ParseError::NoObjectsFound)) => {}
            other => panic!("expected Parse, got {:?}", other),
        }
    }

    #[test]
    fn unknown_root_keyword_means_no_coordinate_system() {
        match reader(br#"BOGUS["not a coordinate system"]"#) {
            Err(PrjError::CoordinateSystemNotDefined) => {}
            other => panic!("expected CoordinateSystemNotDefined, got {:?}", other),
        }
    }

    #[test]
    fn malformed_system_is_a_decode_error() {
        match reader(b"GEOGCS[42]") {
            Err(PrjError::Decode(DecodeError::TypeMismatch { .. })) => {}
            other => panic!("expected Decode, got {:?}", other),
        }
    }
}
