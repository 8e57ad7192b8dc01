//! Purpose: Hold one query's raw JSON response and expose the binding operations.
//! Exports: `QueryResponse`.
//! Role: Response envelope; owns the byte buffer and never mutates it.
//! Invariants: Every binding call re-reads the buffer; nothing is cached between calls.
//! Invariants: Errors leaving this module carry the originating endpoint name.
#![allow(clippy::result_large_err)]

use crate::core::bind::{ScanDest, bind, generic_map};
use crate::core::error::Error;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Raw response document from one query, ready to be bound.
#[derive(Clone, Debug)]
pub struct QueryResponse {
    endpoint: String,
    bytes: Vec<u8>,
}

impl QueryResponse {
    /// Wrap an already-retrieved JSON document. Binding works on any stored
    /// body, not only one fresh off the wire.
    pub fn from_bytes(endpoint: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            bytes: bytes.into(),
        }
    }

    /// Name of the query this response answered.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The response body exactly as received.
    pub fn raw(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Bind the response document into the supplied destinations.
    ///
    /// Pass exactly one [`ScanDest::whole`] destination to decode the entire
    /// document, or any number of [`ScanDest::field`] destinations to decode
    /// named top-level fields. Field binding checks that every requested name
    /// is present before writing any destination; a field that is present but
    /// fails to decode aborts the call, and destinations filled earlier in
    /// the same call keep their values.
    pub fn scan(&self, dests: &mut [ScanDest<'_>]) -> Result<(), Error> {
        bind(&self.bytes, dests).map_err(|err| err.with_endpoint(&self.endpoint))
    }

    /// Whole-document shorthand for [`scan`](Self::scan).
    pub fn scan_into<T: DeserializeOwned>(&self, dest: &mut T) -> Result<(), Error> {
        self.scan(&mut [ScanDest::whole(dest)])
    }

    /// Decode the document into a generic map for untyped exploration, with
    /// no destination shape declared up front.
    pub fn as_map(&self) -> Result<Map<String, Value>, Error> {
        generic_map(&self.bytes).map_err(|err| err.with_endpoint(&self.endpoint))
    }
}
