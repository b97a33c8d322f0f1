//! Shared JSON codec with fixed leniency rules.
//!
//! # Responsibilities
//! - Encode handler results and decode request bodies with one set of rules
//! - Tolerate sloppy client input where tolerance is safe (unknown fields,
//!   scalar-for-sequence, unknown enumerators)
//! - Serialize date/time values as RFC 3339 text, never as epoch numbers
//!
//! # Design Decisions
//! - The codec is an immutable value constructed at startup and passed
//!   explicitly to every component that needs it; there is no global
//! - Leniency that serde expresses per-field lives in the [`one_or_many`]
//!   and [`lenient_enum`] helper modules; application types opt in with
//!   `#[serde(with = "...")]` / `#[serde(deserialize_with = "...")]`
//! - Unknown object fields are dropped by serde's default behavior; the
//!   codec never enables `deny_unknown_fields`
//! - `chrono::DateTime<Utc>` fields serialize through chrono's serde
//!   integration, which emits RFC 3339 strings

use crate::error::DeserializationError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Process-wide JSON codec.
///
/// Holds no per-call state and is freely cloneable; clones share the same
/// fixed configuration, so concurrent use from any number of in-flight
/// requests is safe.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    pub fn new() -> Self {
        Self
    }

    /// Serialize a value to JSON text.
    pub fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String, serde_json::Error> {
        serde_json::to_string(value)
    }

    /// Deserialize JSON text into `T`.
    ///
    /// Failures carry the offending text and the target type name so the
    /// exception registry can produce a useful response.
    pub fn decode<T: DeserializeOwned>(&self, text: &str) -> Result<T, DeserializationError> {
        serde_json::from_str(text).map_err(|source| DeserializationError {
            text: text.to_string(),
            target: std::any::type_name::<T>(),
            source,
        })
    }

    /// Convert a serializable value into a JSON tree.
    pub fn to_value<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value, serde_json::Error> {
        serde_json::to_value(value)
    }

    /// Deserialize a JSON tree into `T`.
    pub fn from_value<T: DeserializeOwned>(&self, value: Value) -> Result<T, DeserializationError> {
        let text = value.to_string();
        serde_json::from_value(value).map_err(|source| DeserializationError {
            text,
            target: std::any::type_name::<T>(),
            source,
        })
    }
}

/// Field helper: accept either a sequence or a single scalar where a
/// sequence is expected; a scalar decodes as a one-element `Vec`.
pub mod one_or_many {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de>,
    {
        Ok(match OneOrMany::deserialize(deserializer)? {
            OneOrMany::Many(values) => values,
            OneOrMany::One(value) => vec![value],
        })
    }

    pub fn serialize<S, T>(values: &[T], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        values.serialize(serializer)
    }
}

/// Field helper: an unknown enumerator value decodes to `None` instead of
/// failing the whole document.
pub mod lenient_enum {
    use serde::de::DeserializeOwned;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn deserialize<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: DeserializeOwned,
    {
        let value = Value::deserialize(deserializer)?;
        if value.is_null() {
            return Ok(None);
        }
        Ok(T::deserialize(value).ok())
    }

    pub fn serialize<S, T>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        T: Serialize,
    {
        value.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    enum Species {
        Cat,
        Dog,
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Pet {
        name: String,
        #[serde(with = "one_or_many")]
        tags: Vec<String>,
        #[serde(default, with = "lenient_enum")]
        species: Option<Species>,
        registered_at: DateTime<Utc>,
    }

    fn sample() -> Pet {
        Pet {
            name: "Fluffy".into(),
            tags: vec!["indoor".into()],
            species: Some(Species::Cat),
            registered_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn round_trip_preserves_known_fields() {
        let codec = JsonCodec::new();
        let text = codec.encode(&sample()).unwrap();
        let back: Pet = codec.decode(&text).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let codec = JsonCodec::new();
        let text = r#"{"name":"Rex","tags":["guard"],"species":"Dog",
                       "registered_at":"2024-05-01T12:00:00Z","color":"brown"}"#;
        let pet: Pet = codec.decode(text).unwrap();
        assert_eq!(pet.name, "Rex");
    }

    #[test]
    fn scalar_coerces_to_one_element_sequence() {
        let codec = JsonCodec::new();
        let text = r#"{"name":"Rex","tags":"guard","species":"Dog",
                       "registered_at":"2024-05-01T12:00:00Z"}"#;
        let pet: Pet = codec.decode(text).unwrap();
        assert_eq!(pet.tags, vec!["guard".to_string()]);
    }

    #[test]
    fn unknown_enumerator_becomes_none() {
        let codec = JsonCodec::new();
        let text = r#"{"name":"Zig","tags":[],"species":"Ferret",
                       "registered_at":"2024-05-01T12:00:00Z"}"#;
        let pet: Pet = codec.decode(text).unwrap();
        assert_eq!(pet.species, None);
    }

    #[test]
    fn dates_serialize_as_text_not_epoch() {
        let codec = JsonCodec::new();
        let text = codec.encode(&sample()).unwrap();
        assert!(text.contains("2024-05-01T12:00:00Z"));
        assert!(!text.contains("1714564800"));
    }

    #[test]
    fn decode_failure_reports_target_and_text() {
        let codec = JsonCodec::new();
        let err = codec.decode::<Pet>("{not json").unwrap_err();
        assert_eq!(err.text, "{not json");
        assert!(err.target.contains("Pet"));
    }
}
