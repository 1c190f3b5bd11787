//! # chargebridge - TCP link client for wallbox chargers
//!
//! Keeps a persistent TCP connection to a charging station that streams
//! fixed-layout telemetry frames, publishes the decoded measurements into a
//! key/value state store and relays user commands back to the charger as
//! register writes.
//!
//! ## Architecture
//!
//! - `codec`: telemetry frame decoding and register write encoding
//! - `buffer`: FIFO of writes issued while the charger is unreachable
//! - `connection`: socket lifecycle, reconnect timer and event handling
//! - `telemetry`: channel catalogue and the publisher feeding the store
//! - `commands`: maps store changes to register writes
//! - `store`: the state store seam and an in-memory implementation
//! - `bridge`: spawns the connection manager and hands out a handle
//! - `config`: YAML configuration and validation
//! - `logging`: structured logging and tracing

pub mod bridge;
pub mod buffer;
pub mod codec;
pub mod commands;
pub mod config;
pub mod connection;
pub mod error;
pub mod logging;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use bridge::{BridgeHandle, spawn};
pub use config::Config;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{BridgeError, DecodeError, Result};
pub use store::{MemoryStore, StateChange, StateStore};
pub use telemetry::TelemetryRecord;
