//! Well-Known Text, in two layers.
//!
//! `parse` turns raw bytes into a generic tree of keyword+parameters
//! nodes; it knows nothing about coordinate systems. `decode` flattens
//! that tree into a queue and rebuilds typed entities from it; `cs` is the
//! OGC 01-009 coordinate-system grammar built on top.
//!
//! # Example
//!
//! ```
//! use shapeio::wkt;
//! use shapeio::wkt::cs::CoordinateSystem;
//!
//! let text = br#"GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]]"#;
//! let roots = wkt::parse::parse(text).unwrap();
//! let cs = wkt::cs::decode_coordinate_system(&roots[0]).unwrap().unwrap();
//! assert_eq!("GCS_WGS_1984", cs.name());
//! match cs {
//!     CoordinateSystem::Geographic(geogcs) => {
//!         assert_eq!("Greenwich", geogcs.prime_meridian.name);
//!     }
//!     other => panic!("expected a geographic system, got {:?}", other),
//! }
//! ```

pub mod cs;
pub mod decode;
pub mod parse;

pub use self::cs::{CoordinateSystem, MathTransform};
pub use self::decode::{DecodeError, WktDecoder, WktElement, WktEntity};
pub use self::parse::{Brackets, ParseError, WktObject, WktParameter};
