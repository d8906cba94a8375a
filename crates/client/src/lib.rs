//! HTTP client for the slit-mask project store.
//!
//! Provides the typed REST wrapper ([`api::MaskApi`]), wire response types,
//! artifact (file) retrieval helpers, and the [`store::MaskStore`]
//! capability trait that the sync layer is written against.

pub mod api;
pub mod artifact;
pub mod messages;
pub mod store;

pub use api::{MaskApi, MaskApiError};
pub use store::MaskStore;
