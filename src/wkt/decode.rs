/// Turns a parsed WKT tree into typed entities.
///
/// The tree is flattened into a queue by pre-order traversal: a node, then
/// each of its parameters in order. Typed reconstruction leans on that
/// fixed left-to-right order; every entity's decode pops exactly the
/// elements its fields occupy in the grammar.
use std::collections::VecDeque;
use std::error;
use std::fmt;
use wkt::parse::{WktObject, WktParameter};

#[derive(Debug, PartialEq)]
pub enum DecodeError {
    NoElementToDecode(&'static str),
    TypeMismatch {
        found: String,
        target: &'static str,
    },
}

impl error::Error for DecodeError {}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            DecodeError::NoElementToDecode(target) => write!(f, "No elements left to decode to {}", target),
            DecodeError::TypeMismatch { ref found, target } => write!(f, "Type mismatch on decode from {} to {}", found, target),
        }
    }
}

/// One flattened queue element.
#[derive(Debug, Clone, PartialEq)]
pub enum WktElement {
    Object(String),
    Text(String),
    Number(f64),
}

impl WktElement {
    fn describe(&self) -> String {
        match *self {
            WktElement::Object(ref keyword) => format!("object {}", keyword),
            WktElement::Text(ref text) => format!("text {:?}", text),
            WktElement::Number(number) => format!("number {}", number),
        }
    }
}

/// A typed WKT entity: a keyword plus a decode that consumes the entity's
/// fields from the queue in grammar order.
pub trait WktEntity: Sized {
    const KEYWORD: &'static str;

    fn decode(decoder: &mut WktDecoder) -> Result<Self, DecodeError>;
}

pub struct WktDecoder {
    queue: VecDeque<WktElement>,
}

impl WktDecoder {
    pub fn new(root: &WktObject) -> WktDecoder {
        let mut queue = VecDeque::new();
        flatten(root, &mut queue);
        WktDecoder { queue: queue }
    }

    /// The keyword of the next element, when it is a node.
    pub fn peek_keyword(&self) -> Option<&str> {
        match self.queue.front() {
            Some(&WktElement::Object(ref keyword)) => Some(keyword.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn number(&mut self, target: &'static str) -> Result<f64, DecodeError> {
        match self.queue.pop_front() {
            None => Err(DecodeError::NoElementToDecode(target)),
            Some(WktElement::Number(number)) => Ok(number),
            Some(element) => Err(DecodeError::TypeMismatch {
                found: element.describe(),
                target: target,
            }),
        }
    }

    pub fn integer(&mut self, target: &'static str) -> Result<i64, DecodeError> {
        self.number(target).map(|n| n as i64)
    }

    pub fn text(&mut self, target: &'static str) -> Result<String, DecodeError> {
        match self.queue.pop_front() {
            None => Err(DecodeError::NoElementToDecode(target)),
            Some(WktElement::Text(text)) => Ok(text),
            Some(element) => Err(DecodeError::TypeMismatch {
                found: element.describe(),
                target: target,
            }),
        }
    }

    /// Decodes an entity whose keyword must come next.
    pub fn expect_entity<T: WktEntity>(&mut self) -> Result<T, DecodeError> {
        match self.queue.front() {
            None => return Err(DecodeError::NoElementToDecode(T::KEYWORD)),
            Some(&WktElement::Object(ref keyword)) if keyword == T::KEYWORD => {}
            Some(element) => {
                return Err(DecodeError::TypeMismatch {
                    found: element.describe(),
                    target: T::KEYWORD,
                })
            }
        }
        self.queue.pop_front();
        T::decode(self)
    }

    /// Decodes an entity if its keyword comes next. A keyword mismatch is
    /// an absent value, not an error; an error inside a matched entity
    /// still propagates.
    pub fn optional_entity<T: WktEntity>(&mut self) -> Result<Option<T>, DecodeError> {
        match self.peek_keyword() {
            Some(keyword) if keyword == T::KEYWORD => {}
            _ => return Ok(None),
        }
        self.queue.pop_front();
        T::decode(self).map(Some)
    }

    /// Zero or more entities of one kind, as long as the keyword repeats.
    pub fn entity_list<T: WktEntity>(&mut self) -> Result<Vec<T>, DecodeError> {
        let mut entities = vec![];
        while let Some(entity) = self.optional_entity::<T>()? {
            entities.push(entity);
        }
        Ok(entities)
    }
}

fn flatten(object: &WktObject, queue: &mut VecDeque<WktElement>) {
    queue.push_back(WktElement::Object(object.keyword.clone()));
    for parameter in &object.parameters {
        match *parameter {
            WktParameter::Object(ref nested) => flatten(nested, queue),
            WktParameter::Text(ref text) => queue.push_back(WktElement::Text(text.clone())),
            WktParameter::Number(number) => queue.push_back(WktElement::Number(number)),
        }
    }
}

#[cfg(test)]
mod test {
    use wkt::parse;
    use super::{DecodeError, WktDecoder, WktElement, WktEntity};

    fn decoder(wkt: &str) -> WktDecoder {
        let roots = parse::parse(wkt.as_bytes()).unwrap();
        WktDecoder::new(&roots[0])
    }

    #[derive(Debug, PartialEq)]
    struct Tag {
        name: String,
        value: f64,
    }

    impl WktEntity for Tag {
        const KEYWORD: &'static str = "TAG";

        fn decode(decoder: &mut WktDecoder) -> Result<Tag, DecodeError> {
            let name = decoder.text("tag name")?;
            let value = decoder.number("tag value")?;
            Ok(Tag {
                name: name,
                value: value,
            })
        }
    }

    #[test]
    fn flattening_is_pre_order() {
        let mut d = decoder(r#"A["x",B[1],2]"#);
        assert_eq!(Some("A"), d.peek_keyword());
        d.queue.pop_front();
        assert_eq!(Some(WktElement::Text("x".to_string())), d.queue.pop_front());
        assert_eq!(Some(WktElement::Object("B".to_string())), d.queue.pop_front());
        assert_eq!(Some(WktElement::Number(1.0)), d.queue.pop_front());
        assert_eq!(Some(WktElement::Number(2.0)), d.queue.pop_front());
        assert!(d.is_empty());
    }

    #[test]
    fn expect_entity_decodes_fields_in_order() {
        let mut d = decoder(r#"TAG["speed",88.5]"#);
        let tag = d.expect_entity::<Tag>().unwrap();
        assert_eq!(Tag { name: "speed".to_string(), value: 88.5 }, tag);
        assert!(d.is_empty());
    }

    #[test]
    fn expect_entity_rejects_other_keywords() {
        let mut d = decoder(r#"LABEL["speed"]"#);
        match d.expect_entity::<Tag>() {
            Err(DecodeError::TypeMismatch { ref found, target }) => {
                assert_eq!("object LABEL", found);
                assert_eq!("TAG", target);
            }
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn optional_entity_mismatch_is_absent() {
        let mut d = decoder(r#"LABEL["speed"]"#);
        assert_eq!(None, d.optional_entity::<Tag>().unwrap());
        // The queue is untouched: the LABEL node is still next.
        assert_eq!(Some("LABEL"), d.peek_keyword());
    }

    #[test]
    fn error_inside_matched_optional_entity_propagates() {
        let mut d = decoder(r#"TAG[42,88.5]"#);
        match d.optional_entity::<Tag>() {
            Err(DecodeError::TypeMismatch { target, .. }) => assert_eq!("tag name", target),
            other => panic!("expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn entity_list_stops_at_first_other_keyword() {
        let mut d = decoder(r#"ROOT[TAG["a",1],TAG["b",2],LABEL["c"]]"#);
        d.queue.pop_front(); // past ROOT
        let tags = d.entity_list::<Tag>().unwrap();
        assert_eq!(2, tags.len());
        assert_eq!("b", tags[1].name);
        assert_eq!(Some("LABEL"), d.peek_keyword());
    }

    #[test]
    fn exhausted_queue_reports_the_target() {
        let mut d = decoder(r#"TAG["speed"]"#);
        match d.expect_entity::<Tag>() {
            Err(DecodeError::NoElementToDecode("tag value")) => {}
            other => panic!("expected NoElementToDecode, got {:?}", other),
        }
    }
}
