/// Geographic conveniences over the decoded coordinate-system tree.
///
/// This is mapping, not projection math: the only supported system is a
/// geographic one named like WGS84, where x already is longitude and y
/// already is latitude.
use regex::Regex;
use wkt::cs::CoordinateSystem;
use super::prj::{PrjError, PrjReader};
use super::shapefile::{ShapefileError, ShapefileReader};
use super::shp::ShpPoint;

/// A geographic position, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

pub type CoordinateConverter = fn(&ShpPoint) -> Coordinate;

lazy_static! {
    static ref WGS84_NAME: Regex = Regex::new(r"(?i)wgs.*84").unwrap();
}

fn wgs84_converter(point: &ShpPoint) -> Coordinate {
    Coordinate {
        latitude: point.1,
        longitude: point.0,
    }
}

impl PrjReader {
    /// A point-to-coordinate mapping for the decoded system, when the
    /// system is one this library knows how to map.
    pub fn coordinate_converter(&self) -> Result<CoordinateConverter, PrjError> {
        match *self.coordinate_system() {
            CoordinateSystem::Geographic(ref geogcs) if WGS84_NAME.is_match(&geogcs.name) => Ok(wgs84_converter),
            ref other => Err(PrjError::CoordinateSystemNotSupported(other.name().to_string())),
        }
    }
}

impl ShapefileReader {
    fn converter(&self) -> Result<CoordinateConverter, ShapefileError> {
        match self.prj {
            Some(ref prj) => prj.coordinate_converter().map_err(ShapefileError::PrjError),
            None => Err(ShapefileError::PrjError(PrjError::CoordinateSystemNotDefined)),
        }
    }

    /// The points of shape `i`, as geographic coordinates.
    pub fn shape_coordinates(&mut self, i: usize) -> Result<Vec<Coordinate>, ShapefileError> {
        let converter = self.converter()?;
        let shape = self.shape_at(i)?;
        Ok(shape.points.iter().map(converter).collect())
    }

    /// The dataset's bounding-box corners, as geographic coordinates.
    pub fn mbr_coordinates(&self) -> Result<(Coordinate, Coordinate), ShapefileError> {
        let converter = self.converter()?;
        let bbox = self.shp.header.bounding_box;
        Ok((
            converter(&ShpPoint(bbox.0, bbox.1)),
            converter(&ShpPoint(bbox.2, bbox.3)),
        ))
    }

    /// The spherical midpoint of the bounding-box corners: average the two
    /// unit vectors, then convert back to angles.
    pub fn center_coordinate(&self) -> Result<Coordinate, ShapefileError> {
        let (min, max) = self.mbr_coordinates()?;
        let lat1 = min.latitude.to_radians();
        let lon1 = min.longitude.to_radians();
        let lat2 = max.latitude.to_radians();
        let lon2 = max.longitude.to_radians();
        let x = (lat1.cos() * lon1.cos() + lat2.cos() * lon2.cos()) / 2.0;
        let y = (lat1.cos() * lon1.sin() + lat2.cos() * lon2.sin()) / 2.0;
        let z = (lat1.sin() + lat2.sin()) / 2.0;

        Ok(Coordinate {
            latitude: z.atan2(x.hypot(y)).to_degrees(),
            longitude: y.atan2(x).to_degrees(),
        })
    }
}

#[cfg(test)]
mod test {
    use std::io;
    use encoding;
    use tempfile;
    use read::shapefile::prj::{PrjError, PrjReader};
    use read::shapefile::prj::test::WGS84_PRJ;
    use read::shapefile::shapefile::{open, ShapefileError};
    use read::shapefile::shapefile::test::{name_dbf, polygon_shx, write_bundle, SQUARE};
    use read::shapefile::shp::ShpPoint;
    use read::shapefile::shp::test::polygon_file;
    use wkt::parse::test::EXAMPLE_PROJCS;
    use super::Coordinate;

    #[test]
    fn wgs84_maps_x_to_longitude_and_y_to_latitude() {
        let prj = PrjReader::new(io::Cursor::new(WGS84_PRJ.to_vec())).unwrap();
        let converter = prj.coordinate_converter().unwrap();
        assert_eq!(
            Coordinate { latitude: 46.95, longitude: 7.44 },
            converter(&ShpPoint(7.44, 46.95))
        );
    }

    #[test]
    fn projected_system_is_not_supported() {
        let prj = PrjReader::new(io::Cursor::new(EXAMPLE_PROJCS.as_bytes().to_vec())).unwrap();
        match prj.coordinate_converter() {
            Err(PrjError::CoordinateSystemNotSupported(ref name)) => assert_eq!("CH1903+_LV95", name),
            other => panic!("expected CoordinateSystemNotSupported, got {:?}", other),
        }
    }

    #[test]
    fn bundle_coordinates() {
        let dir = tempfile::tempdir().unwrap();
        let rings: &[&[&[(f64, f64)]]] = &[&[SQUARE]];
        let shp_path = write_bundle(dir.path(), &[
            ("towns.shp", &polygon_file(rings)),
            ("towns.dbf", &name_dbf(1)),
            ("towns.shx", &polygon_shx(rings)),
            ("towns.prj", WGS84_PRJ),
        ]);
        let mut r = open(&shp_path, encoding::all::UTF_8).unwrap();

        let coordinates = r.shape_coordinates(0).unwrap();
        assert_eq!(5, coordinates.len());
        assert_eq!(Coordinate { latitude: 2.0, longitude: 0.0 }, coordinates[1]);

        // The fixture header's bounding box is (0, 0, 10, 10).
        let (min, max) = r.mbr_coordinates().unwrap();
        assert_eq!(Coordinate { latitude: 0.0, longitude: 0.0 }, min);
        assert_eq!(Coordinate { latitude: 10.0, longitude: 10.0 }, max);

        let center = r.center_coordinate().unwrap();
        assert!((center.latitude - 5.0).abs() < 0.1);
        assert!((center.longitude - 5.0).abs() < 0.1);
    }

    #[test]
    fn missing_prj_means_no_coordinate_system() {
        let dir = tempfile::tempdir().unwrap();
        let shp_path = write_bundle(dir.path(), &[
            ("towns.shp", &polygon_file(&[&[SQUARE]])),
        ]);
        let mut r = open(&shp_path, encoding::all::UTF_8).unwrap();

        match r.shape_coordinates(0) {
            Err(ShapefileError::PrjError(PrjError::CoordinateSystemNotDefined)) => {}
            other => panic!("expected CoordinateSystemNotDefined, got {:?}", other),
        }
    }
}
