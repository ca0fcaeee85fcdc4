//! Persistent event-stream connection to the VTHell backend.
//!
//! The backend pushes JSON frames of shape `{"event": string, "data": any}`
//! over a WebSocket; the same shape is used for outbound frames.

pub mod client;
pub mod frame;

pub use client::EventStreamClient;
pub use frame::{events, Frame};
