// meli-proxy: Async Rust client for the Caddy admin API (route publishing)

pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use client::CaddyClient;
pub use error::Error;
pub use models::{Handler, MatchSet, Route};
pub use transport::{TlsMode, TransportConfig};
