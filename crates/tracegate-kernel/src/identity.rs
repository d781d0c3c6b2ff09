//! Interned object identity.
//!
//! Every host object receives an [`ObjectId`] when it is registered. Tokens
//! come from a process-wide counter and are never handed out twice, so a
//! classification keyed by token cannot alias a newer object that happens to
//! occupy the memory of a dropped one.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque, stable identifier for one registered host object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Issue a fresh token. Tokens increase monotonically.
    pub(crate) fn issue() -> Self {
        Self(NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "obj#{}", self.0)
    }
}
