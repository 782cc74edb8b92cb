//! Owned, typed view of JSON parse trees
//!
//! [`JsonValue`] is decoded from the tree produced by the
//! [`JsonRules`](super::JsonRules) value grammar. Object members keep the
//! order in which they appear in the input, and duplicate names are kept.

use std::error::Error;
use std::fmt::{Display, Formatter};

use num_bigint::BigInt;

use super::{TAG_ARRAY, TAG_NUMBER, TAG_OBJECT, TAG_STRING};
use crate::parse::Parsed;
use crate::tree::{Node, Tag, Token};

/// Number in its literal textual form.
///
/// Conversions are performed on demand, so no precision is lost until the
/// caller picks a representation.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
#[cfg_attr(feature = "serde_impls", serde(transparent))]
pub struct JsonNumber(String);

impl JsonNumber {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the literal has neither fraction nor exponent.
    #[must_use]
    pub fn is_integer(&self) -> bool {
        !self.0.bytes().any(|b| matches!(b, b'.' | b'e' | b'E'))
    }

    /// Integer value, if the literal is an integer that fits in an `i64`.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.0.parse().ok()
        } else {
            None
        }
    }

    /// Nearest `f64`; very large literals become infinite.
    #[must_use]
    pub fn as_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }

    /// Arbitrary-precision value of an integer literal.
    #[must_use]
    pub fn to_bigint(&self) -> Option<BigInt> {
        if self.is_integer() {
            BigInt::parse_bytes(self.0.as_bytes(), 10)
        } else {
            None
        }
    }
}

impl Display for JsonNumber {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde_impls", derive(serde::Serialize))]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(JsonNumber),
    /// Decoded string contents; not necessarily UTF-8
    String(Vec<u8>),
    Array(Vec<JsonValue>),
    /// Members in input order
    Object(Vec<(Vec<u8>, JsonValue)>),
}

impl JsonValue {
    /// Value of the first member named `name`, if this is an object.
    #[must_use]
    pub fn get(&self, name: &[u8]) -> Option<&JsonValue> {
        match self {
            JsonValue::Object(members) => members
                .iter()
                .find(|(k, _)| k.as_slice() == name)
                .map(|(_, v)| v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            JsonValue::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            JsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<&JsonNumber> {
        match self {
            JsonValue::Number(n) => Some(n),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, JsonValue::Null)
    }

    /// Decodes the root of a successful parse.
    pub fn from_parsed(parsed: &Parsed) -> Result<Self, ValueError> {
        match parsed.root() {
            Some(root) => Self::try_from(root),
            None => Err(ValueError::Missing),
        }
    }
}

impl TryFrom<Node<'_>> for JsonValue {
    type Error = ValueError;

    fn try_from(node: Node<'_>) -> Result<Self, Self::Error> {
        match node.token() {
            Token::Bytes(bytes) => match bytes.as_slice() {
                b"true" => Ok(JsonValue::Bool(true)),
                b"false" => Ok(JsonValue::Bool(false)),
                b"null" => Ok(JsonValue::Null),
                other => Err(ValueError::UnknownLiteral(other.to_vec())),
            },
            Token::Tagged(tag, _) => {
                let inner = node.inner().ok_or(ValueError::Missing)?;
                decode_tagged(*tag, inner)
            }
            Token::None => Err(ValueError::Missing),
            Token::Uint(_) | Token::Seq(_) => Err(ValueError::Shape("value")),
        }
    }
}

fn decode_tagged(tag: Tag, inner: Node<'_>) -> Result<JsonValue, ValueError> {
    match tag {
        TAG_STRING => inner
            .bytes()
            .map(|s| JsonValue::String(s.to_vec()))
            .ok_or(ValueError::Shape("string contents")),
        TAG_NUMBER => {
            let text = inner.bytes().ok_or(ValueError::Shape("number text"))?;
            std::str::from_utf8(text)
                .map(|s| JsonValue::Number(JsonNumber(s.to_owned())))
                .map_err(|_| ValueError::UnknownLiteral(text.to_vec()))
        }
        TAG_ARRAY => {
            if !matches!(inner.token(), Token::Seq(_)) {
                return Err(ValueError::Shape("array elements"));
            }
            inner
                .children()
                .map(JsonValue::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Array)
        }
        TAG_OBJECT => {
            if !matches!(inner.token(), Token::Seq(_)) {
                return Err(ValueError::Shape("object members"));
            }
            inner
                .children()
                .map(decode_member)
                .collect::<Result<Vec<_>, _>>()
                .map(JsonValue::Object)
        }
        other => Err(ValueError::UnknownTag(other)),
    }
}

/// Members are `(name value)` pairs; the name is either a decoded string or
/// the raw literal of a fixed-name member.
fn decode_member(pair: Node<'_>) -> Result<(Vec<u8>, JsonValue), ValueError> {
    match (pair.len(), pair.child(0), pair.child(1)) {
        (2, Some(name), Some(value)) => {
            let name = match name.tag() {
                Some(TAG_STRING) => name.inner().and_then(|n| n.bytes()),
                Some(_) => None,
                None => name.bytes(),
            }
            .ok_or(ValueError::Shape("member name"))?;
            Ok((name.to_vec(), JsonValue::try_from(value)?))
        }
        _ => Err(ValueError::Shape("object member")),
    }
}

/// Error returned when a tree does not have the shape of a JSON value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// No token where a value was expected
    Missing,
    /// A byte-string other than `true`, `false` or `null`
    UnknownLiteral(Vec<u8>),
    UnknownTag(Tag),
    /// The token does not have the shape of the named part
    Shape(&'static str),
}

impl Display for ValueError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueError::Missing => f.write_str("no token where a JSON value was expected"),
            ValueError::UnknownLiteral(bytes) => write!(
                f,
                "`{}` is not a JSON literal",
                String::from_utf8_lossy(bytes)
            ),
            ValueError::UnknownTag(tag) => write!(f, "tag {} does not denote a JSON value", tag),
            ValueError::Shape(part) => write!(f, "malformed JSON {} in parse tree", part),
        }
    }
}

impl Error for ValueError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;
    use crate::json::JsonRules;
    use crate::tree::Arena;

    fn dummy<T: Send + Sync>() {}

    #[test]
    fn value_threadsafe() {
        dummy::<JsonValue>();
        dummy::<ValueError>();
    }

    fn decode(input: &[u8]) -> JsonValue {
        let mut b = GrammarBuilder::new();
        let json = JsonRules::install(&mut b).unwrap();
        let doc = b.end(json.document).unwrap();
        let g = b.build().unwrap();
        JsonValue::from_parsed(&g.parse(doc, input).unwrap()).unwrap()
    }

    #[test]
    fn nested_document() {
        let value = decode(b" {\"a\": [1, -2.5e3, \"x\\ty\"], \"b\": {\"c\": null}, \"d\": false} ");
        let a = value.get(b"a").and_then(JsonValue::as_array).unwrap();
        assert_eq!(a[0].as_number().and_then(JsonNumber::as_i64), Some(1));
        assert_eq!(a[1].as_number().map(JsonNumber::as_f64), Some(-2500.0));
        assert_eq!(a[1].as_number().and_then(JsonNumber::as_i64), None);
        assert_eq!(a[2].as_bytes(), Some(&b"x\ty"[..]));
        assert!(value.get(b"b").unwrap().get(b"c").unwrap().is_null());
        assert_eq!(value.get(b"d"), Some(&JsonValue::Bool(false)));
        assert_eq!(value.get(b"e"), None);
    }

    #[test]
    fn member_order_and_duplicates_kept() {
        let value = decode(b"{\"z\": 1, \"a\": 2, \"z\": 3}");
        match value {
            JsonValue::Object(members) => {
                let names: Vec<_> = members.iter().map(|(k, _)| k.as_slice()).collect();
                assert_eq!(names, vec![&b"z"[..], b"a", b"z"]);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn big_integers() {
        let value = decode(b"123456789012345678901234567890");
        let n = value.as_number().unwrap();
        assert_eq!(n.as_i64(), None);
        assert_eq!(
            n.to_bigint().unwrap().to_string(),
            "123456789012345678901234567890"
        );
        assert_eq!(decode(b"-7").as_number().unwrap().to_bigint(), Some(BigInt::from(-7)));
    }

    #[test]
    fn malformed_trees() {
        let mut arena = Arena::new();
        let bytes = arena.alloc(Token::Bytes(b"maybe".to_vec()));
        assert_eq!(
            JsonValue::try_from(arena.node(bytes)),
            Err(ValueError::UnknownLiteral(b"maybe".to_vec()))
        );
        let tagged = arena.alloc(Token::Tagged(Tag(99), bytes));
        assert_eq!(
            JsonValue::try_from(arena.node(tagged)),
            Err(ValueError::UnknownTag(Tag(99)))
        );
        let array = arena.alloc(Token::Tagged(TAG_ARRAY, bytes));
        assert_eq!(
            JsonValue::try_from(arena.node(array)),
            Err(ValueError::Shape("array elements"))
        );
    }
}
