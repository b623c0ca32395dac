//! Jupyter server adapters for the idle culler
//!
//! Provides:
//! - A REST client for the Jupyter server API and the culler's own endpoints
//! - Manager trait implementations backed by that client
//! - Running-server discovery and token resolution

mod adapter;
mod client;
mod discovery;
mod models;

pub use adapter::*;
pub use client::*;
pub use discovery::*;
pub use models::*;
