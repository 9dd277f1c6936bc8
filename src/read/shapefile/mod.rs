//! Reads ".shp" geometry and the sibling ".dbf", ".shx" and ".prj" files.
//!
//! A shapefile is really a dataset split across siblings: the geometry
//! stream (".shp"), a fixed-record attribute table (".dbf"), a flat offset
//! index (".shx") and a textual coordinate-system description (".prj").
//! Only the geometry is mandatory; the other three are opened best-effort
//! and their absence just removes a capability:
//!
//! * no ".dbf": no attribute records.
//! * no ".shx": positional access degrades to a sequential scan.
//! * no ".prj": no geographic coordinates.
//!
//! # Examples
//!
//! Open by ".shp" filename:
//!
//! ```no_run
//! use shapeio::read::shapefile;
//!
//! let mut reader = shapefile::open_utf8(std::path::Path::new("counties.shp")).unwrap();
//!
//! for shape in reader.shapes() {
//!     // shape is a Result<Shape, ShpError>
//!     println!("{:?}", shape.unwrap().shape_type);
//! }
//! ```
//!
//! Positional access, plus the matching attribute record:
//!
//! ```no_run
//! use shapeio::read::shapefile;
//!
//! let mut reader = shapefile::open_utf8(std::path::Path::new("counties.shp")).unwrap();
//!
//! let shape = reader.shape_at(2).unwrap();
//! println!("{} points", shape.points.len());
//!
//! if let Some(ref mut dbf) = reader.dbf {
//!     println!("{:?}", dbf.record_at(2).unwrap());
//! }
//! ```
//!
//! Each reader also works on its own; see `shp`, `dbf`, `shx` and `prj`.

use std::path::Path;
use encoding;

pub mod dbf;
pub mod geo;
pub mod prj;
pub mod shapefile;
pub mod shp;
pub mod shx;

pub use self::dbf::{DbfError, DbfField, DbfRecord, DbfValue};
pub use self::geo::Coordinate;
pub use self::prj::{PrjError, PrjReader};
pub use self::shapefile::{ShapefileError, ShapefileReader};
pub use self::shapefile::open;
pub use self::shp::{Shape, ShapeType, ShpBoundingBox, ShpError, ShpPoint};
pub use self::shx::{ShxEntry, ShxError, ShxReader};

pub fn open_ascii(shp_path: &Path) -> Result<ShapefileReader, ShapefileError> {
    open(shp_path, encoding::all::ASCII)
}

pub fn open_utf8(shp_path: &Path) -> Result<ShapefileReader, ShapefileError> {
    open(shp_path, encoding::all::UTF_8)
}

pub fn open_windows1252(shp_path: &Path) -> Result<ShapefileReader, ShapefileError> {
    open(shp_path, encoding::all::WINDOWS_1252)
}
