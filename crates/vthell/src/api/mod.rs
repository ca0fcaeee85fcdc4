//! REST API client for the VTHell backend.

pub mod client;

pub use client::{ApiClient, RecordsSnapshot};
