//! ft-core: Core abstractions and configuration for fantail
//!
//! This crate provides shared types, error families, and connection
//! configuration used by the engine, remote producer, and CLI.

pub mod config;
pub mod error;
pub mod types;

pub use config::ConnectOptions;
pub use error::{ConfigError, ConnectionError, FtError, SessionError};
pub use types::Hostname;
