//! Resource manager interfaces for the idle culler
//!
//! This crate defines the boundary between the culling core and whatever
//! owns the kernels, terminals, sessions and workspaces. It contains no
//! host code itself; see `culler-host-jupyter` for the REST-backed adapters.

mod managers;
mod mock;
mod snapshot;
mod traits;

pub use managers::*;
pub use mock::*;
pub use snapshot::*;
pub use traits::*;
