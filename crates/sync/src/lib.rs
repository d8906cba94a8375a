//! Editing workflow for slit-mask designs.
//!
//! [`coordinator::SyncCoordinator`] drives the lifecycle of one mask and
//! one catalog list: load, render, edit, save, generate, finalize. It is
//! written against the [`slitmask_client::MaskStore`] and
//! [`renderer::SkyRenderer`] capabilities so both can be swapped out.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod renderer;
pub mod state;

pub use config::SyncConfig;
pub use coordinator::SyncCoordinator;
pub use error::SyncError;
pub use state::SessionState;
