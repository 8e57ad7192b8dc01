// Request-body encoding: one introspection point over caller input shapes.
// The wire contract requires a top-level JSON object so the server can match
// named parameters to the query; every other shape is rejected here.

use crate::core::error::{Error, ErrorKind};
use serde::Serialize;
use serde_json::value::RawValue;
use serde_json::{Map, Value};

/// Caller input for one query, tagged by shape.
///
/// Raw variants (`Text`, `Bytes`) pass through verbatim after a
/// well-formedness check; `Data` holds a serialized record or mapping and is
/// shape-checked at encode time. `Empty` stands in for "no parameters".
#[derive(Clone, Debug, PartialEq)]
pub enum QueryInput {
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Data(Value),
}

impl QueryInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Capture a structured record or mapping. References serialize through,
    /// so `data(&user)` and `data(&&user)` are equivalent; `&None::<T>` is
    /// captured as null and rejected later by [`encode`](Self::encode).
    pub fn data<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        let value = serde_json::to_value(value).map_err(|err| {
            Error::new(ErrorKind::UnsupportedShape)
                .with_message("input cannot be represented as json")
                .with_source(err)
        })?;
        Ok(Self::Data(value))
    }

    /// Produce the JSON body bytes for this input.
    ///
    /// Pure function of the input; no I/O. `Empty` yields `{}` so every
    /// query has a well-formed body.
    pub fn encode(self) -> Result<Vec<u8>, Error> {
        match self {
            QueryInput::Empty => Ok(b"{}".to_vec()),
            QueryInput::Text(text) => {
                validate_json(text.as_bytes())?;
                Ok(text.into_bytes())
            }
            QueryInput::Bytes(bytes) => {
                validate_json(&bytes)?;
                Ok(bytes)
            }
            QueryInput::Data(value) => encode_value(value),
        }
    }
}

impl Default for QueryInput {
    fn default() -> Self {
        Self::Empty
    }
}

impl From<Value> for QueryInput {
    fn from(value: Value) -> Self {
        Self::Data(value)
    }
}

impl From<Map<String, Value>> for QueryInput {
    fn from(map: Map<String, Value>) -> Self {
        Self::Data(Value::Object(map))
    }
}

// Raw pass-through is caller-asserted: only well-formedness is checked, the
// top-level object requirement applies to typed inputs.
fn validate_json(bytes: &[u8]) -> Result<(), Error> {
    match serde_json::from_slice::<&RawValue>(bytes) {
        Ok(_) => Ok(()),
        Err(err) => Err(Error::new(ErrorKind::InvalidJson)
            .with_message("input is not well-formed json")
            .with_source(err)),
    }
}

fn encode_value(value: Value) -> Result<Vec<u8>, Error> {
    match value {
        Value::Object(map) => serde_json::to_vec(&map).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("failed to encode query body")
                .with_source(err)
        }),
        Value::Null => Err(Error::new(ErrorKind::NilInput)
            .with_message("input resolved to null; use QueryInput::Empty for a parameterless query")),
        Value::Array(_) => Err(Error::new(ErrorKind::UnsupportedShape)
            .with_message("array cannot form a query body; wrap the collection in a named field")),
        other => Err(Error::new(ErrorKind::UnsupportedShape).with_message(format!(
            "{} cannot form a query body; the server expects named parameters",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
