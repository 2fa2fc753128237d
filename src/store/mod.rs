//! The record of items already handled.
//!
//! Dispatch consults the store before any handler runs and claims an item
//! (adds its fullname) before invoking handlers, so an item reaches the
//! handlers at most once even across a crash.
//!
//! Entries are never removed.

use std::io;

use thiserror::Error;

use crate::types::Fullname;

pub mod flat_file;
pub mod fsync;
pub mod memory;

pub use flat_file::FlatFileStore;
pub use memory::MemoryStore;

/// Errors from a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A fullname that cannot be stored one per line.
    #[error("fullname {0:?} contains a line break")]
    InvalidFullname(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// An append-only set of handled fullnames.
pub trait DedupStore: Send {
    /// Whether `fullname` has been claimed.
    fn contains(&self, fullname: &Fullname) -> bool;

    /// Claims `fullname`. Returns false if it was already present, in which
    /// case nothing is written.
    fn add(&mut self, fullname: &Fullname) -> Result<bool>;

    /// Makes every claim so far durable. Backends without durable storage
    /// have nothing to do.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
