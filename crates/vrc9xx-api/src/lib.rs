//! Async Rust client for the Vaillant multiMATIC (VRC9xx) cloud API.
//!
//! Layers, leaves first:
//!
//! - [`Transport`] executes one request with the session cookie jar,
//!   classifies the status and retries retryable failures.
//! - [`Session`] runs the two-step login handshake and tracks the
//!   authentication state.
//! - [`VaillantClient`] exposes one typed method per remote read.
//!
//! [`ApiRequest`] describes every call, reads and writes alike.

pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod query_log;
pub mod request;
pub mod session;
pub mod transport;

pub use auth::{AuthIdentity, AuthState, Credentials};
pub use client::VaillantClient;
pub use error::Error;
pub use query_log::QueryLog;
pub use request::{ApiRequest, DhwMode, HeatingMode, Method, RoomMode};
pub use session::Session;
pub use transport::{DEFAULT_BASE_URL, RetryPolicy, Transport, TransportConfig};
