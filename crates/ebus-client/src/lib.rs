//! # ebus-client
//!
//! Thin client over `tokio-tungstenite`. [`Client::connect`] completes the
//! handshake before returning; afterwards a writer task drains queued
//! events in order and a reader task hands every received event to the
//! caller's callback.

#![deny(unsafe_code)]

pub mod client;
pub mod errors;

pub use client::{Client, EventCallback};
pub use errors::ClientError;
