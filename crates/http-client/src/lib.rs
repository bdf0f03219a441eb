//! HTTP control path for ESP32 devices.
//!
//! [`HttpClient`] performs single requests with a hard timeout over a small
//! pooled connection set; [`ActionDispatcher`] builds the device's
//! `/health` and `/run` calls on top of it.

pub mod actions;
pub mod client;
pub mod error;
pub mod types;

pub use actions::{ActionDispatcher, base_url};
pub use client::HttpClient;
pub use error::HttpError;
pub use types::{ActionRequest, ActionResult, HttpMethod, Payload};
