use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// One weather observation as published by the upstream producer.
///
/// Missing or `null` fields fall back to zero / empty string so a partial
/// record is still relayed; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    #[serde(default, deserialize_with = "null_as_default")]
    pub temperature: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub windspeed: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub humidity: f64,

    #[serde(rename = "uvIndex", default, deserialize_with = "null_as_default")]
    pub uv_index: f64,

    #[serde(
        rename = "precipitationChance",
        default,
        deserialize_with = "null_as_default"
    )]
    pub precipitation_chance: f64,

    #[serde(rename = "heatIndex", default, deserialize_with = "null_as_default")]
    pub heat_index: f64,

    /// When the producer published the record
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,

    /// When the observation was taken at the source
    #[serde(default, deserialize_with = "null_as_default")]
    pub obs_timestamp: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub source: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub condition: String,
}

#[derive(Error, Debug)]
pub enum ObservationParseError {
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

impl ObservationRecord {
    /// Decode a broker message body.
    ///
    /// A bare `null` body decodes to the all-default record.
    pub fn from_json(payload: &[u8]) -> Result<Self, ObservationParseError> {
        let value: serde_json::Value = serde_json::from_slice(payload)?;
        match value {
            serde_json::Value::Null => Ok(Self::default()),
            serde_json::Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(ObservationParseError::NotAnObject(json_kind(&other))),
        }
    }

    /// Encode for the outbound request body
    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
