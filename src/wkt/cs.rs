/// The OGC 01-009 coordinate-system grammar, reconstructed from parsed
/// WKT. Non-strict: unknown trailing clauses decode as absent rather than
/// failing the whole document.
use wkt::decode::{DecodeError, WktDecoder, WktEntity};
use wkt::parse::WktObject;

/// The closed set of coordinate-system variants. Decode tries keywords in
/// this order and builds the first match.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateSystem {
    Geographic(GeographicCS),
    Projected(ProjectedCS),
    Geocentric(GeocentricCS),
    Vertical(VertCS),
    Compound(CompdCS),
    Fitted(FittedCS),
    Local(LocalCS),
}

impl CoordinateSystem {
    pub fn name(&self) -> &str {
        match *self {
            CoordinateSystem::Geographic(ref cs) => &cs.name,
            CoordinateSystem::Projected(ref cs) => &cs.name,
            CoordinateSystem::Geocentric(ref cs) => &cs.name,
            CoordinateSystem::Vertical(ref cs) => &cs.name,
            CoordinateSystem::Compound(ref cs) => &cs.name,
            CoordinateSystem::Fitted(ref cs) => &cs.name,
            CoordinateSystem::Local(ref cs) => &cs.name,
        }
    }

    /// Keyword-dispatched variant decode. A keyword matching none of the
    /// variants is an absent value, not an error.
    pub fn decode(decoder: &mut WktDecoder) -> Result<Option<CoordinateSystem>, DecodeError> {
        let keyword = match decoder.peek_keyword() {
            Some(keyword) => keyword.to_string(),
            None => return Ok(None),
        };

        if keyword == GeographicCS::KEYWORD {
            decoder.expect_entity::<GeographicCS>().map(|cs| Some(CoordinateSystem::Geographic(cs)))
        } else if keyword == ProjectedCS::KEYWORD {
            decoder.expect_entity::<ProjectedCS>().map(|cs| Some(CoordinateSystem::Projected(cs)))
        } else if keyword == GeocentricCS::KEYWORD {
            decoder.expect_entity::<GeocentricCS>().map(|cs| Some(CoordinateSystem::Geocentric(cs)))
        } else if keyword == VertCS::KEYWORD {
            decoder.expect_entity::<VertCS>().map(|cs| Some(CoordinateSystem::Vertical(cs)))
        } else if keyword == CompdCS::KEYWORD {
            decoder.expect_entity::<CompdCS>().map(|cs| Some(CoordinateSystem::Compound(cs)))
        } else if keyword == FittedCS::KEYWORD {
            decoder.expect_entity::<FittedCS>().map(|cs| Some(CoordinateSystem::Fitted(cs)))
        } else if keyword == LocalCS::KEYWORD {
            decoder.expect_entity::<LocalCS>().map(|cs| Some(CoordinateSystem::Local(cs)))
        } else {
            Ok(None)
        }
    }
}

/// The closed set of math-transform variants, for fitted coordinate
/// systems.
#[derive(Debug, Clone, PartialEq)]
pub enum MathTransform {
    Param(ParamMT),
    Concat(ConcatMT),
    Inverse(InvMT),
    Passthrough(PassthroughMT),
}

impl MathTransform {
    pub fn decode(decoder: &mut WktDecoder) -> Result<Option<MathTransform>, DecodeError> {
        let keyword = match decoder.peek_keyword() {
            Some(keyword) => keyword.to_string(),
            None => return Ok(None),
        };

        if keyword == ParamMT::KEYWORD {
            decoder.expect_entity::<ParamMT>().map(|mt| Some(MathTransform::Param(mt)))
        } else if keyword == ConcatMT::KEYWORD {
            decoder.expect_entity::<ConcatMT>().map(|mt| Some(MathTransform::Concat(mt)))
        } else if keyword == InvMT::KEYWORD {
            decoder.expect_entity::<InvMT>().map(|mt| Some(MathTransform::Inverse(mt)))
        } else if keyword == PassthroughMT::KEYWORD {
            decoder.expect_entity::<PassthroughMT>().map(|mt| Some(MathTransform::Passthrough(mt)))
        } else {
            Ok(None)
        }
    }
}

fn twin_axes(decoder: &mut WktDecoder) -> Result<Option<(Axis, Axis)>, DecodeError> {
    match decoder.optional_entity::<Axis>()? {
        Some(axis1) => {
            let axis2 = decoder.expect_entity::<Axis>()?;
            Ok(Some((axis1, axis2)))
        }
        None => Ok(None),
    }
}

fn triple_axes(decoder: &mut WktDecoder) -> Result<Option<(Axis, Axis, Axis)>, DecodeError> {
    match decoder.optional_entity::<Axis>()? {
        Some(axis1) => {
            let axis2 = decoder.expect_entity::<Axis>()?;
            let axis3 = decoder.expect_entity::<Axis>()?;
            Ok(Some((axis1, axis2, axis3)))
        }
        None => Ok(None),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeographicCS {
    pub name: String,
    pub datum: Datum,
    pub prime_meridian: PrimeMeridian,
    pub angular_unit: Unit,
    pub axes: Option<(Axis, Axis)>,
    pub authority: Option<Authority>,
}

impl WktEntity for GeographicCS {
    const KEYWORD: &'static str = "GEOGCS";

    fn decode(decoder: &mut WktDecoder) -> Result<GeographicCS, DecodeError> {
        Ok(GeographicCS {
            name: decoder.text("geographic cs name")?,
            datum: decoder.expect_entity::<Datum>()?,
            prime_meridian: decoder.expect_entity::<PrimeMeridian>()?,
            angular_unit: decoder.expect_entity::<Unit>()?,
            axes: twin_axes(decoder)?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedCS {
    pub name: String,
    pub geographic_cs: GeographicCS,
    pub projection: Projection,
    pub parameters: Vec<Parameter>,
    pub linear_unit: Unit,
    pub axes: Option<(Axis, Axis)>,
    pub authority: Option<Authority>,
}

impl WktEntity for ProjectedCS {
    const KEYWORD: &'static str = "PROJCS";

    fn decode(decoder: &mut WktDecoder) -> Result<ProjectedCS, DecodeError> {
        Ok(ProjectedCS {
            name: decoder.text("projected cs name")?,
            geographic_cs: decoder.expect_entity::<GeographicCS>()?,
            projection: decoder.expect_entity::<Projection>()?,
            parameters: decoder.entity_list::<Parameter>()?,
            linear_unit: decoder.expect_entity::<Unit>()?,
            axes: twin_axes(decoder)?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeocentricCS {
    pub name: String,
    pub datum: Datum,
    pub prime_meridian: PrimeMeridian,
    pub linear_unit: Unit,
    pub axes: Option<(Axis, Axis, Axis)>,
    pub authority: Option<Authority>,
}

impl WktEntity for GeocentricCS {
    const KEYWORD: &'static str = "GEOCCS";

    fn decode(decoder: &mut WktDecoder) -> Result<GeocentricCS, DecodeError> {
        Ok(GeocentricCS {
            name: decoder.text("geocentric cs name")?,
            datum: decoder.expect_entity::<Datum>()?,
            prime_meridian: decoder.expect_entity::<PrimeMeridian>()?,
            linear_unit: decoder.expect_entity::<Unit>()?,
            axes: triple_axes(decoder)?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertCS {
    pub name: String,
    pub vert_datum: VertDatum,
    pub linear_unit: Unit,
    pub axis: Option<Axis>,
    pub authority: Option<Authority>,
}

impl WktEntity for VertCS {
    const KEYWORD: &'static str = "VERT_CS";

    fn decode(decoder: &mut WktDecoder) -> Result<VertCS, DecodeError> {
        Ok(VertCS {
            name: decoder.text("vertical cs name")?,
            vert_datum: decoder.expect_entity::<VertDatum>()?,
            linear_unit: decoder.expect_entity::<Unit>()?,
            axis: decoder.optional_entity::<Axis>()?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

/// A compound system embeds two other systems, themselves decoded through
/// the variant dispatch; the recursion is structural.
#[derive(Debug, Clone, PartialEq)]
pub struct CompdCS {
    pub name: String,
    pub head_cs: Option<Box<CoordinateSystem>>,
    pub tail_cs: Option<Box<CoordinateSystem>>,
    pub authority: Option<Authority>,
}

impl WktEntity for CompdCS {
    const KEYWORD: &'static str = "COMPD_CS";

    fn decode(decoder: &mut WktDecoder) -> Result<CompdCS, DecodeError> {
        Ok(CompdCS {
            name: decoder.text("compound cs name")?,
            head_cs: CoordinateSystem::decode(decoder)?.map(Box::new),
            tail_cs: CoordinateSystem::decode(decoder)?.map(Box::new),
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedCS {
    pub name: String,
    pub to_base: Option<MathTransform>,
    pub base_cs: Option<Box<CoordinateSystem>>,
}

impl WktEntity for FittedCS {
    const KEYWORD: &'static str = "FITTED_CS";

    fn decode(decoder: &mut WktDecoder) -> Result<FittedCS, DecodeError> {
        Ok(FittedCS {
            name: decoder.text("fitted cs name")?,
            to_base: MathTransform::decode(decoder)?,
            base_cs: CoordinateSystem::decode(decoder)?.map(Box::new),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalCS {
    pub name: String,
    pub local_datum: LocalDatum,
    pub unit: Unit,
    pub axis: Axis,
    pub axes: Vec<Axis>,
    pub authority: Option<Authority>,
}

impl WktEntity for LocalCS {
    const KEYWORD: &'static str = "LOCAL_CS";

    fn decode(decoder: &mut WktDecoder) -> Result<LocalCS, DecodeError> {
        Ok(LocalCS {
            name: decoder.text("local cs name")?,
            local_datum: decoder.expect_entity::<LocalDatum>()?,
            unit: decoder.expect_entity::<Unit>()?,
            axis: decoder.expect_entity::<Axis>()?,
            axes: decoder.entity_list::<Axis>()?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub value: f64,
}

impl WktEntity for Parameter {
    const KEYWORD: &'static str = "PARAMETER";

    fn decode(decoder: &mut WktDecoder) -> Result<Parameter, DecodeError> {
        Ok(Parameter {
            name: decoder.text("parameter name")?,
            value: decoder.number("parameter value")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub name: String,
    pub authority: Option<Authority>,
}

impl WktEntity for Projection {
    const KEYWORD: &'static str = "PROJECTION";

    fn decode(decoder: &mut WktDecoder) -> Result<Projection, DecodeError> {
        Ok(Projection {
            name: decoder.text("projection name")?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Datum {
    pub name: String,
    pub spheroid: Spheroid,
    pub to_wgs84: Option<ToWGS84>,
    pub authority: Option<Authority>,
}

impl WktEntity for Datum {
    const KEYWORD: &'static str = "DATUM";

    fn decode(decoder: &mut WktDecoder) -> Result<Datum, DecodeError> {
        Ok(Datum {
            name: decoder.text("datum name")?,
            spheroid: decoder.expect_entity::<Spheroid>()?,
            to_wgs84: decoder.optional_entity::<ToWGS84>()?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spheroid {
    pub name: String,
    pub semi_major_axis: f64,
    pub inverse_flattening: f64,
    pub authority: Option<Authority>,
}

impl WktEntity for Spheroid {
    const KEYWORD: &'static str = "SPHEROID";

    fn decode(decoder: &mut WktDecoder) -> Result<Spheroid, DecodeError> {
        Ok(Spheroid {
            name: decoder.text("spheroid name")?,
            semi_major_axis: decoder.number("semi-major axis")?,
            inverse_flattening: decoder.number("inverse flattening")?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PrimeMeridian {
    pub name: String,
    pub longitude: f64,
    pub authority: Option<Authority>,
}

impl WktEntity for PrimeMeridian {
    const KEYWORD: &'static str = "PRIMEM";

    fn decode(decoder: &mut WktDecoder) -> Result<PrimeMeridian, DecodeError> {
        Ok(PrimeMeridian {
            name: decoder.text("prime meridian name")?,
            longitude: decoder.number("prime meridian longitude")?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    pub conversion_factor: f64,
    pub authority: Option<Authority>,
}

impl WktEntity for Unit {
    const KEYWORD: &'static str = "UNIT";

    fn decode(decoder: &mut WktDecoder) -> Result<Unit, DecodeError> {
        Ok(Unit {
            name: decoder.text("unit name")?,
            conversion_factor: decoder.number("unit conversion factor")?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Authority {
    pub name: String,
    pub code: String,
}

impl WktEntity for Authority {
    const KEYWORD: &'static str = "AUTHORITY";

    fn decode(decoder: &mut WktDecoder) -> Result<Authority, DecodeError> {
        Ok(Authority {
            name: decoder.text("authority name")?,
            code: decoder.text("authority code")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VertDatum {
    pub name: String,
    pub datum_type: f64,
    pub authority: Option<Authority>,
}

impl WktEntity for VertDatum {
    const KEYWORD: &'static str = "VERT_DATUM";

    fn decode(decoder: &mut WktDecoder) -> Result<VertDatum, DecodeError> {
        Ok(VertDatum {
            name: decoder.text("vertical datum name")?,
            datum_type: decoder.number("vertical datum type")?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalDatum {
    pub name: String,
    pub datum_type: f64,
    pub authority: Option<Authority>,
}

impl WktEntity for LocalDatum {
    const KEYWORD: &'static str = "LOCAL_DATUM";

    fn decode(decoder: &mut WktDecoder) -> Result<LocalDatum, DecodeError> {
        Ok(LocalDatum {
            name: decoder.text("local datum name")?,
            datum_type: decoder.number("local datum type")?,
            authority: decoder.optional_entity::<Authority>()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisDirection {
    North,
    South,
    East,
    West,
    Up,
    Down,
    Other,
}

impl AxisDirection {
    fn from_text(text: &str) -> Option<AxisDirection> {
        match text {
            "NORTH" => Some(AxisDirection::North),
            "SOUTH" => Some(AxisDirection::South),
            "EAST" => Some(AxisDirection::East),
            "WEST" => Some(AxisDirection::West),
            "UP" => Some(AxisDirection::Up),
            "DOWN" => Some(AxisDirection::Down),
            "OTHER" => Some(AxisDirection::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Axis {
    pub name: String,
    pub direction: AxisDirection,
}

impl WktEntity for Axis {
    const KEYWORD: &'static str = "AXIS";

    fn decode(decoder: &mut WktDecoder) -> Result<Axis, DecodeError> {
        let name = decoder.text("axis name")?;
        let direction_text = decoder.text("axis direction")?;
        let direction = match AxisDirection::from_text(&direction_text) {
            Some(direction) => direction,
            None => {
                return Err(DecodeError::TypeMismatch {
                    found: format!("text {:?}", direction_text),
                    target: "axis direction",
                })
            }
        };
        Ok(Axis {
            name: name,
            direction: direction,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToWGS84 {
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub ex: f64,
    pub ey: f64,
    pub ez: f64,
    pub ppm: f64,
}

impl WktEntity for ToWGS84 {
    const KEYWORD: &'static str = "TOWGS84";

    fn decode(decoder: &mut WktDecoder) -> Result<ToWGS84, DecodeError> {
        Ok(ToWGS84 {
            dx: decoder.number("towgs84 dx")?,
            dy: decoder.number("towgs84 dy")?,
            dz: decoder.number("towgs84 dz")?,
            ex: decoder.number("towgs84 ex")?,
            ey: decoder.number("towgs84 ey")?,
            ez: decoder.number("towgs84 ez")?,
            ppm: decoder.number("towgs84 ppm")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamMT {
    pub classification_name: String,
    pub parameters: Vec<Parameter>,
}

impl WktEntity for ParamMT {
    const KEYWORD: &'static str = "PARAM_MT";

    fn decode(decoder: &mut WktDecoder) -> Result<ParamMT, DecodeError> {
        Ok(ParamMT {
            classification_name: decoder.text("transform classification name")?,
            parameters: decoder.entity_list::<Parameter>()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConcatMT {
    pub transforms: Vec<MathTransform>,
}

impl WktEntity for ConcatMT {
    const KEYWORD: &'static str = "CONCAT_MT";

    fn decode(decoder: &mut WktDecoder) -> Result<ConcatMT, DecodeError> {
        let mut transforms = vec![];
        while let Some(transform) = MathTransform::decode(decoder)? {
            transforms.push(transform);
        }
        Ok(ConcatMT { transforms: transforms })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvMT {
    pub transform: Option<Box<MathTransform>>,
}

impl WktEntity for InvMT {
    const KEYWORD: &'static str = "INVERSE_MT";

    fn decode(decoder: &mut WktDecoder) -> Result<InvMT, DecodeError> {
        Ok(InvMT {
            transform: MathTransform::decode(decoder)?.map(Box::new),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PassthroughMT {
    pub integer: i64,
    pub transform: Option<Box<MathTransform>>,
}

impl WktEntity for PassthroughMT {
    const KEYWORD: &'static str = "PASSTHROUGH_MT";

    fn decode(decoder: &mut WktDecoder) -> Result<PassthroughMT, DecodeError> {
        Ok(PassthroughMT {
            integer: decoder.integer("passthrough ordinate index")?,
            transform: MathTransform::decode(decoder)?.map(Box::new),
        })
    }
}

/// Decodes one parsed root node into a coordinate-system variant.
pub fn decode_coordinate_system(root: &WktObject) -> Result<Option<CoordinateSystem>, DecodeError> {
    let mut decoder = WktDecoder::new(root);
    CoordinateSystem::decode(&mut decoder)
}
