// Response binding: distribute a shape-unknown JSON document into caller
// destinations. The destination list is validated before any parsing; field
// mode decodes the document once into raw sub-values and fills from those.

use crate::core::error::{Error, ErrorKind};
use serde::de::DeserializeOwned;
use serde_json::error::Category;
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Capability of being populated from one raw JSON value.
///
/// Blanket-implemented for every `T: DeserializeOwned`. Destinations are
/// always live `&mut T`, so a null or non-reference destination cannot be
/// expressed; the only runtime-invalid destination left is a field entry
/// with an empty name.
pub trait ScanSlot {
    fn fill(&mut self, raw: &RawValue) -> Result<(), serde_json::Error>;
}

impl<T: DeserializeOwned> ScanSlot for T {
    fn fill(&mut self, raw: &RawValue) -> Result<(), serde_json::Error> {
        *self = serde_json::from_str(raw.get())?;
        Ok(())
    }
}

/// One scan destination: the whole document, or one named top-level field.
///
/// The two shapes are mutually exclusive per call; `scan` takes exactly one
/// whole-document destination or any number of field destinations.
pub enum ScanDest<'a> {
    Whole(&'a mut dyn ScanSlot),
    Field {
        name: String,
        slot: &'a mut dyn ScanSlot,
    },
}

impl<'a> ScanDest<'a> {
    pub fn whole<T: DeserializeOwned>(dest: &'a mut T) -> Self {
        ScanDest::Whole(dest)
    }

    pub fn field<T: DeserializeOwned>(name: impl Into<String>, dest: &'a mut T) -> Self {
        ScanDest::Field {
            name: name.into(),
            slot: dest,
        }
    }
}

/// Bind one JSON document into the supplied destinations.
///
/// Field mode verifies that every requested name is present before writing
/// any destination, so `FieldNotFound` never leaves partial state. A
/// `TypeMismatch` in the fill pass aborts the call; destinations earlier in
/// the same call keep their decoded values.
pub fn bind(document: &[u8], dests: &mut [ScanDest<'_>]) -> Result<(), Error> {
    validate_dests(dests)?;
    match dests {
        [ScanDest::Whole(slot)] => bind_whole(document, &mut **slot),
        fields => bind_fields(document, fields),
    }
}

/// Decode the full document into a generic string-to-value mapping, for
/// untyped exploration without a predeclared destination shape.
pub fn generic_map(document: &[u8]) -> Result<Map<String, Value>, Error> {
    serde_json::from_slice::<Map<String, Value>>(document)
        .map_err(|err| decode_error(err, "expected a json object at the top level"))
}

// Upfront pass over the destination list; runs before any JSON is parsed.
fn validate_dests(dests: &[ScanDest<'_>]) -> Result<(), Error> {
    if dests.is_empty() {
        return Err(Error::new(ErrorKind::NoDestination)
            .with_message("scan requires at least one destination"));
    }
    let mut wholes = 0usize;
    for dest in dests {
        match dest {
            ScanDest::Whole(_) => wholes += 1,
            ScanDest::Field { name, .. } => {
                if name.is_empty() {
                    return Err(Error::new(ErrorKind::InvalidDestination)
                        .with_message("field destination has an empty name"));
                }
            }
        }
    }
    if wholes > 1 || (wholes == 1 && dests.len() > 1) {
        return Err(Error::new(ErrorKind::MixedDestinations).with_message(
            "scan takes exactly one whole-document destination or a list of field destinations",
        ));
    }
    Ok(())
}

fn bind_whole(document: &[u8], slot: &mut dyn ScanSlot) -> Result<(), Error> {
    let raw = parse_document(document)?;
    slot.fill(raw)
        .map_err(|err| decode_error(err, "document does not match the destination shape"))
}

fn bind_fields(document: &[u8], dests: &mut [ScanDest<'_>]) -> Result<(), Error> {
    let fields: HashMap<String, &RawValue> = serde_json::from_slice(document)
        .map_err(|err| decode_error(err, "expected a json object at the top level"))?;

    for dest in dests.iter() {
        let ScanDest::Field { name, .. } = dest else {
            continue;
        };
        if !fields.contains_key(name) {
            return Err(Error::new(ErrorKind::FieldNotFound)
                .with_message(format!("field \"{name}\" not present in response"))
                .with_field(name.clone()));
        }
    }

    for dest in dests.iter_mut() {
        let ScanDest::Field { name, slot } = dest else {
            continue;
        };
        let Some(raw) = fields.get(name.as_str()) else {
            continue;
        };
        slot.fill(raw).map_err(|err| {
            decode_error(
                err,
                &format!("field \"{name}\" does not match the destination shape"),
            )
            .with_field(name.clone())
        })?;
    }
    Ok(())
}

fn parse_document(document: &[u8]) -> Result<&RawValue, Error> {
    serde_json::from_slice::<&RawValue>(document)
        .map_err(|err| decode_error(err, "response body is not valid json"))
}

// serde_json's own error category decides the kind: Data means the JSON was
// fine but the shape did not fit, everything else means malformed input.
fn decode_error(err: serde_json::Error, context: &str) -> Error {
    let kind = match err.classify() {
        Category::Data => ErrorKind::TypeMismatch,
        _ => ErrorKind::InvalidJson,
    };
    let message = format!("{context}: {err}");
    Error::new(kind).with_message(message).with_source(err)
}
