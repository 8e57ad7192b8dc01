//! Purpose: Define the stable public API boundary for the client.
//! Exports: Client, response, input, destination, and error types.
//! Role: Public, additive-only surface; hides the core engine modules.
//! Invariants: This module is the only public path to encoding and binding.
//! Invariants: Core modules remain private and are not directly exposed.

mod client;
mod response;

pub use crate::core::bind::{ScanDest, ScanSlot};
pub use crate::core::encode::QueryInput;
pub use crate::core::error::{Error, ErrorKind};
pub use client::Client;
pub use response::QueryResponse;
