// Thin re-export module: implementation is in `blockchain/core.rs` so block
// construction and chain verification can evolve independently.

pub mod core;
pub use core::*;
