//! Asset handles
//!
//! Every asset and sub-asset is named by a 64-bit handle. File-backed assets
//! get a random handle on first import; sub-assets derive theirs from the
//! parent so re-importing the same source reproduces the same handles.

use latch_core::hash::fnv1a_64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset handle (opaque ID)
///
/// The raw value 0 is reserved for [`AssetHandle::INVALID`].
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AssetHandle(u64);

impl AssetHandle {
    pub const INVALID: Self = Self(0);

    /// Generate a fresh random handle.
    pub fn generate() -> Self {
        loop {
            let raw = rand::random::<u64>();
            if raw != 0 {
                return Self(raw);
            }
        }
    }

    /// Derive the handle of the `index`-th sub-asset of kind `sub_type`.
    ///
    /// Hashes `"{base}|{sub_type}|{index}"` with FNV-1a.
    pub fn derive(base: AssetHandle, sub_type: &str, index: u32) -> Self {
        Self(fnv1a_64(&format!("{}|{}|{}", base.0, sub_type, index)))
    }

    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for AssetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for AssetHandle {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
