// src/registry.rs

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::error::{PlayerError, Result};

/// Tracks which target surfaces currently have a player mounted.
///
/// Cheap to clone; clones share the same set. Pass one instance to every
/// player that may compete for the same targets.
#[derive(Debug, Clone, Default)]
pub struct SurfaceRegistry {
    mounted: Arc<Mutex<HashSet<String>>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `target`; fails if another player already holds it.
    pub fn claim(&self, target: &str) -> Result<()> {
        let mut mounted = self.mounted.lock().unwrap_or_else(|e| e.into_inner());
        if !mounted.insert(target.to_string()) {
            return Err(PlayerError::AlreadyMounted(target.to_string()));
        }
        Ok(())
    }

    pub fn release(&self, target: &str) {
        let mut mounted = self.mounted.lock().unwrap_or_else(|e| e.into_inner());
        mounted.remove(target);
    }

    pub fn is_mounted(&self, target: &str) -> bool {
        let mounted = self.mounted.lock().unwrap_or_else(|e| e.into_inner());
        mounted.contains(target)
    }

    pub fn len(&self) -> usize {
        self.mounted.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
