//! Navigation locations and their transport codec
//!
//! A [`Location`] identifies one screen. It travels as a query parameter and
//! as the `X-Location` response header, so its string form is the
//! percent-encoded canonical JSON object `{"selectedId":N}` or
//! `{"selectedId":null}`. The canonical string is also the client cache key.
//!
//! Decoding is lenient about what older clients send (numeric strings, an
//! empty string, a missing field) and strict about everything else.

use crate::error::LocationError;
use crate::record::RecordId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The navigation state of the application.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawLocation")]
pub struct Location {
    #[serde(rename = "selectedId")]
    pub selected_id: Option<RecordId>,
}

impl Location {
    /// The list view: no record selected.
    pub const fn list() -> Self {
        Self { selected_id: None }
    }

    /// The detail view of one record.
    pub const fn selected(id: RecordId) -> Self {
        Self {
            selected_id: Some(id),
        }
    }

    /// Canonical JSON form, stable field order and no whitespace.
    pub fn to_json(&self) -> String {
        match self.selected_id {
            Some(id) => format!("{{\"selectedId\":{}}}", id),
            None => "{\"selectedId\":null}".to_string(),
        }
    }

    /// Transport-safe canonical string. Equal locations encode identically.
    pub fn encode(&self) -> String {
        urlencoding::encode(&self.to_json()).into_owned()
    }

    /// Parse an encoded location. Accepts both percent-encoded and raw JSON.
    pub fn decode(input: &str) -> Result<Self, LocationError> {
        let json = urlencoding::decode(input)
            .map_err(|e| LocationError::malformed(input, format!("invalid percent-encoding: {}", e)))?;
        if !json.trim_start().starts_with('{') {
            return Err(LocationError::malformed(input, "expected a JSON object"));
        }
        let raw: RawLocation = serde_json::from_str(&json)
            .map_err(|e| LocationError::malformed(input, e.to_string()))?;
        Location::try_from(raw).map_err(|e| LocationError::malformed(input, e.to_string()))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Location {
    type Err = LocationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

// ============================================================================
// LENIENT DECODING
// ============================================================================

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLocation {
    #[serde(rename = "selectedId", default)]
    selected_id: Option<RawId>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(i64),
    Text(String),
}

impl TryFrom<RawLocation> for Location {
    type Error = LocationError;

    fn try_from(raw: RawLocation) -> Result<Self, Self::Error> {
        let selected_id = match raw.selected_id {
            None => None,
            Some(RawId::Number(value)) => Some(RecordId::new(value)?),
            Some(RawId::Text(text)) if text.trim().is_empty() => None,
            Some(RawId::Text(text)) => Some(text.parse::<RecordId>()?),
        };
        Ok(Self { selected_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(value: i64) -> RecordId {
        RecordId::new(value).unwrap()
    }

    #[test]
    fn test_encode_is_canonical() {
        assert_eq!(Location::list().to_json(), r#"{"selectedId":null}"#);
        assert_eq!(Location::selected(id(12)).to_json(), r#"{"selectedId":12}"#);
        assert_eq!(
            Location::selected(id(12)).encode(),
            "%7B%22selectedId%22%3A12%7D"
        );
    }

    #[test]
    fn test_encode_matches_serde() -> Result<(), serde_json::Error> {
        for location in [Location::list(), Location::selected(id(3))] {
            assert_eq!(serde_json::to_string(&location)?, location.to_json());
        }
        Ok(())
    }

    #[test]
    fn test_decode_round_trip() {
        for location in [Location::list(), Location::selected(id(1)), Location::selected(id(i64::MAX))] {
            assert_eq!(Location::decode(&location.encode()), Ok(location));
        }
    }

    #[test]
    fn test_decode_lenient_forms() {
        assert_eq!(Location::decode(r#"{"selectedId":"7"}"#), Ok(Location::selected(id(7))));
        assert_eq!(Location::decode(r#"{"selectedId":""}"#), Ok(Location::list()));
        assert_eq!(Location::decode(r#"{"selectedId":null}"#), Ok(Location::list()));
        assert_eq!(Location::decode("{}"), Ok(Location::list()));
        assert_eq!(
            Location::decode("%7B%22selectedId%22%3A%20%224%22%7D"),
            Ok(Location::selected(id(4)))
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let inputs = [
            "",
            "not json",
            "%7B",
            "[]",
            r#"{"selectedId":0}"#,
            r#"{"selectedId":-3}"#,
            r#"{"selectedId":1.5}"#,
            r#"{"selectedId":"abc"}"#,
            r#"{"selectedId":1,"extra":true}"#,
            r#"{"selectedId":{}}"#,
        ];
        for input in inputs {
            match Location::decode(input) {
                Err(LocationError::Malformed { .. }) => {}
                other => panic!("expected malformed for {:?}, got {:?}", input, other),
            }
        }
    }

    #[test]
    fn test_equal_locations_have_equal_keys() {
        let a = Location::decode(r#"{"selectedId":"5"}"#).unwrap();
        let b = Location::decode(r#"{"selectedId":5}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.encode(), b.encode());
    }
}
