//! Shared types and HTTP client for the Hookstorm webhook endpoint API.
//!
//! The wire format uses snake_case keys; every response passes through
//! [`normalize`] before it is deserialized into the camelCase domain
//! objects in [`objects`].

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod normalize;
pub mod objects;

#[cfg(feature = "client")]
pub mod client;
