extern crate byteorder;
extern crate encoding;
extern crate itertools;
#[macro_use] extern crate lazy_static;
#[macro_use] extern crate log;
extern crate regex;

#[cfg(test)]
extern crate tempfile;

pub mod read;
pub mod wkt;

pub use read::shapefile::{ShapefileError, ShapefileReader};
