// Core modules implementing input encoding, response binding, and error modeling.
pub mod bind;
pub mod encode;
pub mod error;
