//! Async Rust client for the Philips Hue bridge REST API.
//!
//! This crate provides the HTTP layer for coordinating an entertainment
//! streaming session with a Hue bridge:
//!
//! - **Pairing** — one-time application registration against `/api`, which
//!   yields the application key (REST bearer identifier) and the client key
//!   (pre-shared secret for the streaming channel).
//! - **Entertainment configurations** — listing the bridge's entertainment
//!   areas and their channel layout via the CLIP v2 resource endpoints.
//! - **Session control** — starting and stopping entertainment mode for an
//!   area, which gates the bridge's UDP streaming listener.
//!
//! Hue bridges present a self-signed certificate, so the shared
//! [`TransportConfig`] disables certificate verification — see the module
//! docs on [`transport`] for why that is acceptable here.

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::HueClient;
pub use error::Error;
pub use models::{EntertainmentArea, PairedCredentials};
pub use transport::TransportConfig;
