//! Shared utilities for the idle culler
//!
//! This crate provides:
//! - ID types (KernelId, TerminalName, SessionId, WorkspaceId)
//! - Idle-time arithmetic and formatting
//! - Error types

mod error;
mod ids;
mod time;

pub use error::*;
pub use ids::*;
pub use time::*;
