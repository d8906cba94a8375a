//! Slit-mask design core: coordinate conversion, slit overlay geometry,
//! catalog edit reconciliation, and mask-generation payload assembly.
//!
//! Everything in this crate is pure and in-memory. Network access lives in
//! `slitmask-client`; orchestration lives in `slitmask-sync`.

pub mod catalog;
pub mod coords;
pub mod diff;
pub mod error;
pub mod geometry;
mod lenient;
pub mod mask;
pub mod payload;
pub mod session;
