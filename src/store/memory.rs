//! In-process store, lost on exit.

use std::collections::HashSet;

use super::{DedupStore, Result};
use crate::types::Fullname;

/// A [`DedupStore`] backed by a `HashSet`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    seen: HashSet<Fullname>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FromIterator<Fullname> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = Fullname>>(iter: I) -> Self {
        MemoryStore {
            seen: iter.into_iter().collect(),
        }
    }
}

impl DedupStore for MemoryStore {
    fn contains(&self, fullname: &Fullname) -> bool {
        self.seen.contains(fullname)
    }

    fn add(&mut self, fullname: &Fullname) -> Result<bool> {
        Ok(self.seen.insert(fullname.clone()))
    }

    fn len(&self) -> usize {
        self.seen.len()
    }
}
