//! Blocking HTTP client for HelixDB-style named-query endpoints.
//!
//! A query is one POST of a JSON object to `<base>/<endpoint>`. [`QueryInput`]
//! turns caller data (a serializable record or mapping, raw JSON text or
//! bytes, or nothing) into that body. The reply comes back as a
//! [`QueryResponse`] that can be bound whole into one typed destination,
//! field by field into several, or read as a generic map.
//!
//! # Quick start
//!
//! ```no_run
//! use helix_client::{Client, QueryInput, ScanDest};
//!
//! # fn main() -> Result<(), helix_client::Error> {
//! let client = Client::new("http://localhost:6969")?;
//!
//! let mut users: Vec<serde_json::Value> = Vec::new();
//! let mut count = 0u32;
//! client
//!     .query("get_users", QueryInput::Empty)?
//!     .scan(&mut [
//!         ScanDest::field("users", &mut users),
//!         ScanDest::field("count", &mut count),
//!     ])?;
//! # Ok(())
//! # }
//! ```
//!
//! The [`api`] module is the stable surface; the engine modules behind it
//! (input encoding, response binding) stay private. Every failure is an
//! [`Error`] value carrying a flat [`ErrorKind`] plus context; the library
//! never terminates the process.

pub mod api;

mod core;

pub use api::{Client, Error, ErrorKind, QueryInput, QueryResponse, ScanDest, ScanSlot};
