//! Latch Engine Core
//!
//! Shared building blocks used across the engine crates:
//! - Stable string hashing
//! - File system abstraction
//! - Math (glam re-export)

pub mod fs;
pub mod hash;
pub mod math;

pub use glam;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
