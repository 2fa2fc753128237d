//! Pluggable item handlers ("summons").
//!
//! A handler inspects one kind of item and may return an [`Effect`]. It
//! never talks to the platform itself. Each handler exposes two steps:
//!
//! - [`Handler::probe`]: a cheap check of whether the item is meant for this
//!   handler (e.g. it contains the trigger phrase). Dispatch runs the full
//!   interaction check only once some probe accepts.
//! - [`Handler::handle`]: produce the response.

use thiserror::Error;

pub mod registry;
pub mod trigger;

pub use registry::HandlerRegistry;
pub use trigger::{TRIGGER_GROUP, TriggerHandler, contains_trigger};

use crate::config::ConfigSource;
use crate::effects::Effect;
use crate::responses::TemplateError;
use crate::store::{DedupStore, StoreError};
use crate::types::Username;

/// Errors a handler may report. Dispatch logs them and moves on to the next
/// handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("missing configuration: {0}")]
    MissingConfig(String),

    #[error("{0}")]
    Failed(String),
}

/// What a handler may read and write while handling an item.
pub struct HandlerContext<'a> {
    pub store: &'a mut dyn DedupStore,
    pub config: &'a dyn ConfigSource,
    /// The bot's own account.
    pub identity: &'a Username,
}

/// Handles items of type `I` (a comment, a link or a message).
pub trait Handler<I>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Whether `item` is meant for this handler. Must be cheap and free of
    /// side effects.
    fn probe(&self, item: &I, config: &dyn ConfigSource) -> bool;

    /// Produces the response to `item`, or `None` for no response.
    fn handle(&self, item: &I, ctx: &mut HandlerContext<'_>) -> Result<Option<Effect>, HandlerError>;
}
