//! Canonical request protocol shared by every provider adapter

pub mod types;

pub use types::*;
