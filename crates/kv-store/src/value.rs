use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};

use crate::{KvError, Result};

/// A value as held by the key-value store.
///
/// Values are wrapped in a tagged envelope before they reach the wire, so a
/// reader always knows whether it is looking at a structured record or an
/// opaque string. The envelope is written as self-describing JSON:
///
/// ```json
/// {"kind":"encoded","data":{"cart_id":"..."}}
/// {"kind":"raw","data":"plain text"}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StoredValue {
    /// A structured record.
    Encoded(serde_json::Value),
    /// An opaque string stored as-is.
    Raw(String),
}

impl StoredValue {
    /// Encodes a serializable record into an envelope.
    pub fn encode<T: Serialize>(value: &T) -> Result<Self> {
        Ok(Self::Encoded(serde_json::to_value(value)?))
    }

    /// Wraps an opaque string.
    pub fn raw(text: impl Into<String>) -> Self {
        Self::Raw(text.into())
    }

    /// Decodes the record held by an `Encoded` envelope.
    ///
    /// A `Raw` envelope never decodes into a record.
    pub fn decode<T: DeserializeOwned>(self) -> std::result::Result<T, serde_json::Error> {
        match self {
            Self::Encoded(value) => serde_json::from_value(value),
            Self::Raw(_) => Err(serde_json::Error::custom(
                "raw value does not hold an encoded record",
            )),
        }
    }

    /// Returns the text of a `Raw` envelope.
    pub fn as_raw(&self) -> Option<&str> {
        match self {
            Self::Raw(text) => Some(text),
            Self::Encoded(_) => None,
        }
    }

    /// Serializes the envelope to its wire text.
    pub fn to_wire(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses wire text read from `key` back into an envelope.
    pub fn from_wire(key: &str, text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|source| KvError::Decode {
            key: key.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Record {
        name: String,
        count: u32,
    }

    #[test]
    fn encoded_envelope_is_tagged_on_the_wire() {
        let value = StoredValue::encode(&Record {
            name: "a".to_string(),
            count: 2,
        })
        .unwrap();

        let wire = value.to_wire().unwrap();
        let json: serde_json::Value = serde_json::from_str(&wire).unwrap();
        assert_eq!(json["kind"], "encoded");
        assert_eq!(json["data"]["count"], 2);
    }

    #[test]
    fn raw_envelope_is_tagged_on_the_wire() {
        let wire = StoredValue::raw("hello").to_wire().unwrap();
        assert_eq!(wire, r#"{"kind":"raw","data":"hello"}"#);
    }

    #[test]
    fn decode_returns_the_record() {
        let record = Record {
            name: "b".to_string(),
            count: 7,
        };
        let wire = StoredValue::encode(&record).unwrap().to_wire().unwrap();

        let decoded: Record = StoredValue::from_wire("k", &wire)
            .unwrap()
            .decode()
            .unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn raw_value_does_not_decode_into_a_record() {
        let result: std::result::Result<Record, _> = StoredValue::raw("{}").decode();
        assert!(result.is_err());
    }

    #[test]
    fn untagged_wire_text_is_a_decode_error() {
        let result = StoredValue::from_wire("cart:anon:x", r#"{"name":"a","count":1}"#);
        assert!(matches!(result, Err(KvError::Decode { ref key, .. }) if key == "cart:anon:x"));

        let result = StoredValue::from_wire("k", "not json at all");
        assert!(matches!(result, Err(KvError::Decode { .. })));
    }

    #[test]
    fn as_raw_only_for_raw_values() {
        assert_eq!(StoredValue::raw("x").as_raw(), Some("x"));
        assert_eq!(StoredValue::Encoded(serde_json::json!(1)).as_raw(), None);
    }
}
