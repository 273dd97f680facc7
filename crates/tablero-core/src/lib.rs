//! tablero-core: board synchronization for a Kanban client.
//!
//! Keeps an in-memory card collection consistent with a remote card store
//! reached through [`gateway::CardGateway`], merges a client-only overlay
//! ([`extras`]) at render time, and runs drag-and-drop moves optimistically
//! with sequence-numbered rollback ([`moves`], [`collection`]).
//!
//! # Conventions
//!
//! - **Errors**: typed `thiserror` enums with stable [`error::ErrorCode`]s;
//!   `anyhow::Result` only in [`config`].
//! - **Logging**: `tracing` macros (`info!`, `warn!`, `debug!`).
//! - **I/O**: none outside [`extras::sqlite`] and [`config`]; the gateway is
//!   injected.

pub mod collection;
pub mod config;
pub mod error;
pub mod extras;
pub mod gateway;
pub mod model;
pub mod moves;
pub mod session;
pub mod view;
pub mod wire;

pub use error::{ErrorCode, SyncError, ValidationError};
pub use session::BoardSession;
