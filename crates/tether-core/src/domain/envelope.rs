//! Envelope - wire 上を流れる 3-tuple `(name, token, payload)`
//!
//! transport に依存しない値の形です。JSON では `["math.add.v1", "tok1", {...}]`
//! という 3 要素の配列になります。
//!
//! # デコード
//! `Envelope::decode` は受信した未検証の値を 3-tuple として検証します。
//! payload の中身はここでは一切見ません（name に対応する宣言でのみ検証する）。

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::errors::DispatchError;
use super::token::Token;
use crate::typed::codec::shape_of;

/// The wire-level call envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub name: String,
    pub token: Token,
    pub payload: Value,
}

impl Envelope {
    pub fn new(name: impl Into<String>, token: Token, payload: Value) -> Self {
        Self {
            name: name.into(),
            token,
            payload,
        }
    }

    /// Validate an untyped value against the `(string, string, any)` shape.
    pub fn decode(raw: Value) -> Result<Self, DispatchError> {
        let items = match raw {
            Value::Array(items) => items,
            other => {
                return Err(DispatchError::EnvelopeDecode {
                    detail: format!("expected a 3-element array, found {}", shape_of(&other)),
                });
            }
        };
        let [name, token, payload] = <[Value; 3]>::try_from(items).map_err(|items| {
            DispatchError::EnvelopeDecode {
                detail: format!("expected 3 elements, found {}", items.len()),
            }
        })?;

        Ok(Self {
            name: expect_string(name, "name")?,
            token: Token::from(expect_string(token, "token")?),
            payload,
        })
    }

    /// Encode back into the wire shape.
    pub fn into_value(self) -> Value {
        Value::Array(vec![
            Value::String(self.name),
            Value::String(self.token.into_string()),
            self.payload,
        ])
    }
}

fn expect_string(item: Value, field: &str) -> Result<String, DispatchError> {
    match item {
        Value::String(s) => Ok(s),
        other => Err(DispatchError::EnvelopeDecode {
            detail: format!("{field}: expected string, found {}", shape_of(&other)),
        }),
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        envelope.into_value()
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (&self.name, &self.token, &self.payload).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (name, token, payload) = <(String, Token, Value)>::deserialize(deserializer)?;
        Ok(Self {
            name,
            token,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn decodes_well_formed_envelope() {
        let env = Envelope::decode(json!(["math.add.v1", "tok1", {"a": 1, "b": 2}])).unwrap();
        assert_eq!(env.name, "math.add.v1");
        assert_eq!(env.token, Token::from("tok1"));
        assert_eq!(env.payload, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn payload_may_be_any_shape() {
        let env = Envelope::decode(json!(["x", "", null])).unwrap();
        assert!(env.token.is_fire_and_forget());
        assert_eq!(env.payload, Value::Null);
    }

    #[rstest]
    #[case::two_elements(json!(["math.add.v1", "tok1"]))]
    #[case::four_elements(json!(["math.add.v1", "tok1", {}, 1]))]
    #[case::object(json!({"name": "math.add.v1", "token": "t", "payload": {}}))]
    #[case::numeric_name(json!([7, "tok1", {}]))]
    #[case::null_token(json!(["math.add.v1", null, {}]))]
    #[case::string(json!("math.add.v1"))]
    fn rejects_malformed_envelopes(#[case] raw: Value) {
        let err = Envelope::decode(raw).unwrap_err();
        assert!(matches!(err, DispatchError::EnvelopeDecode { .. }));
    }

    #[rstest]
    #[case::empty(json!([]), "expected 3 elements, found 0")]
    #[case::four_elements(json!(["a", "b", null, null]), "expected 3 elements, found 4")]
    #[case::bad_name(json!([1, "t", {}]), "name: expected string, found number")]
    #[case::bad_token(json!(["a", [], {}]), "token: expected string, found array of 0")]
    fn decode_errors_name_the_problem(#[case] raw: Value, #[case] expected: &str) {
        let DispatchError::EnvelopeDecode { detail } = Envelope::decode(raw).unwrap_err() else {
            panic!("expected an envelope decode error");
        };
        assert_eq!(detail, expected);
    }

    #[test]
    fn serializes_as_three_element_array() {
        let env = Envelope::new("greet.hello.v1", Token::from("t"), json!({"name": "x"}));
        let v = serde_json::to_value(&env).unwrap();
        assert_eq!(v, json!(["greet.hello.v1", "t", {"name": "x"}]));
        assert_eq!(Value::from(env), v);
    }
}
