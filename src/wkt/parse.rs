/// Parses OGC 01-009 Well-Known Text into a generic tree of
/// keyword-plus-parameters nodes. This layer knows nothing about
/// coordinate systems; see `wkt::decode` and `wkt::cs` for the typed
/// reconstruction.
use std::error;
use std::fmt;
use encoding;
use encoding::{DecoderTrap, EncodingRef};

#[derive(Debug)]
pub enum ParseError {
    UndecodableText,
    NoObjectsFound,
}

impl error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            ParseError::UndecodableText => write!(f, "Unable to decode the given bytes as text"),
            ParseError::NoObjectsFound => write!(f, "No objects found in the text"),
        }
    }
}

/// WKT appears in the wild with both bracket styles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Brackets {
    Round,
    Square,
}

impl Brackets {
    fn opening(&self) -> u8 {
        match *self {
            Brackets::Round => b'(',
            Brackets::Square => b'[',
        }
    }

    fn closing(&self) -> u8 {
        match *self {
            Brackets::Round => b')',
            Brackets::Square => b']',
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WktParameter {
    Object(WktObject),
    Text(String),
    Number(f64),
}

impl fmt::Display for WktParameter {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            WktParameter::Object(ref object) => object.fmt(f),
            WktParameter::Text(ref text) => write!(f, "\"{}\"", text),
            WktParameter::Number(number) => write!(f, "{}", number),
        }
    }
}

/// One node: the keyword before an opening bracket, plus everything
/// between the brackets, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct WktObject {
    pub keyword: String,
    pub parameters: Vec<WktParameter>,
}

impl fmt::Display for WktObject {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut r = write!(f, "{}[", self.keyword);
        for (i, parameter) in self.parameters.iter().enumerate() {
            if i > 0 {
                r = r.and_then(|_| write!(f, ","));
            }
            r = r.and_then(|_| write!(f, "{}", parameter));
        }
        r.and_then(|_| write!(f, "]"))
    }
}

/// Decodes raw bytes as text, trying encodings in a fixed order.
fn decode_text(data: &[u8]) -> Option<String> {
    let encodings: [EncodingRef; 3] = [
        encoding::all::UTF_8,
        encoding::all::ISO_8859_1,
        encoding::all::MAC_ROMAN,
    ];
    for &enc in encodings.iter() {
        match enc.decode(data, DecoderTrap::Strict) {
            Ok(text) => return Some(text),
            Err(_) => {}
        }
    }
    None
}

fn push_token(result: &mut Vec<WktParameter>, raw: &str) {
    let token = raw.trim();
    if token.is_empty() {
        return;
    }
    match token.parse::<f64>() {
        Ok(number) => result.push(WktParameter::Number(number)),
        Err(_) => result.push(WktParameter::Text(token.to_string())),
    }
}

/// One recursive scan. Commas and closing brackets end bare tokens; a
/// bracket opens a nested node; quote parity, not bracket depth, decides
/// whether a bracket inside quotes counts.
fn parse_parameters(text: &str, brackets: Brackets) -> Vec<WktParameter> {
    let bytes = text.as_bytes();
    let opening = brackets.opening();
    let closing = brackets.closing();

    let mut result = vec![];
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'"' {
            // A quoted literal runs to the last quote before the next
            // delimiter, so doubled quotes inside survive untouched.
            let first = i;
            let mut last = i;
            let mut closed = false;
            let mut j = i + 1;
            while j < bytes.len() {
                let c = bytes[j];
                if c == b'"' {
                    closed = !closed;
                    last = j;
                } else if (c == b',' || c == closing) && closed {
                    break;
                }
                j += 1;
            }
            if closed && last > first {
                result.push(WktParameter::Text(text[first + 1..last].to_string()));
            }
            i = j;
            start = i + 1;
        } else if b == opening {
            let keyword = text[start..i].trim().to_string();
            let mut depth = 1;
            let mut in_quotes = false;
            let mut close = None;
            let mut j = i + 1;
            while j < bytes.len() {
                let c = bytes[j];
                if c == b'"' {
                    in_quotes = !in_quotes;
                } else if c == opening && !in_quotes {
                    depth += 1;
                } else if c == closing && !in_quotes {
                    depth -= 1;
                    if depth == 0 {
                        close = Some(j);
                        break;
                    }
                }
                j += 1;
            }
            match close {
                Some(close) => {
                    let parameters = parse_parameters(&text[i + 1..close], brackets);
                    result.push(WktParameter::Object(WktObject {
                        keyword: keyword,
                        parameters: parameters,
                    }));
                    i = close;
                    start = i + 1;
                }
                None => {
                    // Unmatched bracket: nothing more to salvage.
                    i = bytes.len();
                    start = i;
                }
            }
        } else if b == b',' || b == closing {
            push_token(&mut result, &text[start..i]);
            start = i + 1;
        }
        i += 1;
    }
    if start < bytes.len() {
        push_token(&mut result, &text[start..]);
    }

    result
}

/// Parses square-bracketed WKT text into its root nodes.
pub fn parse(data: &[u8]) -> Result<Vec<WktObject>, ParseError> {
    parse_with_brackets(data, Brackets::Square)
}

pub fn parse_with_brackets(data: &[u8], brackets: Brackets) -> Result<Vec<WktObject>, ParseError> {
    let text = match decode_text(data) {
        Some(text) => text,
        None => return Err(ParseError::UndecodableText),
    };

    let roots: Vec<WktObject> = parse_parameters(&text, brackets)
        .into_iter()
        .filter_map(|parameter| match parameter {
            WktParameter::Object(object) => Some(object),
            _ => None,
        })
        .collect();

    if roots.is_empty() {
        return Err(ParseError::NoObjectsFound);
    }
    Ok(roots)
}

#[cfg(test)]
pub mod test {
    use super::{Brackets, ParseError, WktParameter, parse, parse_with_brackets};

    pub const EXAMPLE_PROJCS: &'static str = r#"PROJCS["CH1903+_LV95",GEOGCS["GCS_CH1903+",DATUM["D_CH1903+",SPHEROID["Bessel_1841",6377397.155,299.1528128]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Hotine_Oblique_Mercator_Azimuth_Center"],PARAMETER["False_Easting",2600000.0],PARAMETER["False_Northing",1200000.0],PARAMETER["Scale_Factor",1.0],PARAMETER["Azimuth",90.0],PARAMETER["Longitude_Of_Center",7.439583333333333],PARAMETER["Latitude_Of_Center",46.95240555555556],UNIT["Meter",1.0],AUTHORITY["EPSG","2056"]]"#;

    #[test]
    fn nested_objects() {
        let roots = parse(EXAMPLE_PROJCS.as_bytes()).unwrap();
        assert_eq!(1, roots.len());
        let root = &roots[0];
        assert_eq!("PROJCS", root.keyword);
        assert_eq!(WktParameter::Text("CH1903+_LV95".to_string()), root.parameters[0]);
        match root.parameters[1] {
            WktParameter::Object(ref geogcs) => {
                assert_eq!("GEOGCS", geogcs.keyword);
                assert_eq!(5, geogcs.parameters.len());
            }
            ref other => panic!("expected GEOGCS object, got {:?}", other),
        }
    }

    #[test]
    fn numbers_and_bare_tokens() {
        let roots = parse(b"AXIS[Easting,EAST],PARAMETER[\"x\",-1.5e3]").unwrap();
        assert_eq!(2, roots.len());
        assert_eq!(
            vec![
                WktParameter::Text("Easting".to_string()),
                WktParameter::Text("EAST".to_string()),
            ],
            roots[0].parameters
        );
        assert_eq!(WktParameter::Number(-1500.0), roots[1].parameters[1]);
    }

    #[test]
    fn quoted_text_shields_delimiters() {
        let roots = parse(b"UNIT[\"metre [m], SI\",1.0]").unwrap();
        assert_eq!(
            vec![
                WktParameter::Text("metre [m], SI".to_string()),
                WktParameter::Number(1.0),
            ],
            roots[0].parameters
        );
    }

    #[test]
    fn doubled_quotes_survive() {
        let roots = parse(b"NOTE[\"he said \"\"hi\"\"\"]").unwrap();
        assert_eq!(
            vec![WktParameter::Text("he said \"\"hi\"\"".to_string())],
            roots[0].parameters
        );
    }

    #[test]
    fn round_brackets() {
        let roots = parse_with_brackets(b"GEOGCS(\"WGS 84\",DATUM(\"WGS_1984\"))", Brackets::Round).unwrap();
        assert_eq!("GEOGCS", roots[0].keyword);
        assert_eq!(2, roots[0].parameters.len());
    }

    #[test]
    fn no_objects_is_an_error() {
        match parse(b"   \n  ") {
            Err(ParseError::NoObjectsFound) => {}
            other => panic!("expected NoObjectsFound, got {:?}", other),
        }
        match parse(b"just, some, tokens") {
            Err(ParseError::NoObjectsFound) => {}
            other => panic!("expected NoObjectsFound, got {:?}", other),
        }
    }

    #[test]
    fn latin1_fallback() {
        let mut bytes = b"GEOGCS[\"caf".to_vec();
        bytes.push(0xe9); // é in ISO-8859-1, invalid alone in UTF-8
        bytes.extend_from_slice(b"\"]");
        let roots = parse(&bytes).unwrap();
        assert_eq!(vec![WktParameter::Text("caf\u{e9}".to_string())], roots[0].parameters);
    }

    #[test]
    fn unmatched_bracket_drops_the_tail() {
        match parse(b"GEOGCS[\"unterminated\"") {
            Err(ParseError::NoObjectsFound) => {}
            other => panic!("expected NoObjectsFound, got {:?}", other),
        }
    }

    #[test]
    fn display_round_trips_structural_content() {
        let roots = parse(EXAMPLE_PROJCS.as_bytes()).unwrap();
        let rendered = format!("{}", roots[0]);

        let strip = |s: &str| -> String {
            s.chars()
                .filter(|c| !c.is_whitespace() && !c.is_digit(10) && *c != '.' && *c != '"' && *c != '-')
                .collect()
        };
        assert_eq!(strip(EXAMPLE_PROJCS), strip(&rendered));
    }
}
