//! HTTP layer shared by every provider call
//!
//! One pooled client; the relay owns status handling and body streaming.

pub mod client;

pub use client::HttpClient;
