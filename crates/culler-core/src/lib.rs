//! Idle culling engine
//!
//! This crate is the heart of the culler, containing:
//! - Eviction policies for kernels, terminals, sessions and workspaces
//! - The culling engine (settings, active-terminal registry, last result)
//! - The repeating scheduler that drives culling passes

mod engine;
mod events;
mod kernels;
mod policy;
mod scheduler;
mod sessions;
mod terminals;
mod workspaces;

pub use engine::*;
pub use events::*;
pub use kernels::*;
pub use policy::*;
pub use scheduler::*;
pub use sessions::*;
pub use terminals::*;
pub use workspaces::*;
