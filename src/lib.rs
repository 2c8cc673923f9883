//! Pure Rust async implementation of the [Source RCON protocol](https://developer.valvesoftware.com/wiki/Source_RCON_Protocol).
pub mod client;
pub mod config;
pub mod error;
pub mod packet;
pub mod reassembler;
pub mod session;

pub use client::{Client, Response};
pub use config::{Config, ResponseMode};
pub use error::RconError;
pub use session::Session;
