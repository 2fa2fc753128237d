//! Per-item dispatch: dedup, gating and handler invocation.
//!
//! Every fetched item goes through the same state machine:
//!
//! ```text
//! seen? ──yes──► AlreadySeen
//!   │no
//! own item? ──yes──► OwnItem
//!   │no
//! fast gate ──deny──► Rejected            (not claimed)
//!   │allow
//! CLAIM (add to dedup store)
//!   │
//! no author? ──► NoAuthor
//!   │
//! for each handler of the item's kind, in registration order:
//!   probe ──decline──► next handler
//!   full gate (evaluated once) ──deny──► InteractionDenied + hook
//!   handle ──► effect? ──► sink
//! ```
//!
//! The claim happens before any handler runs, so a crash part-way through
//! handling means the item is skipped on restart rather than answered twice.
//!
//! A failing or panicking handler never stops the loop: the failure is
//! logged, dispatch pauses briefly, and the next handler runs.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::ConfigSource;
use crate::effects::{Effect, EffectSink};
use crate::gate::InteractionGate;
use crate::handlers::{Handler, HandlerContext, HandlerRegistry};
use crate::hooks::{ModerationHooks, NoHooks};
use crate::retry::{Interrupted, Pacer};
use crate::store::{DedupStore, StoreError};
use crate::types::{Item, Username};

/// Errors that stop the poll loop.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The dedup store could not record a claim. Continuing would risk
    /// answering items twice.
    #[error("could not claim item: {0}")]
    Store(#[from] StoreError),

    #[error("interrupted by shutdown")]
    Interrupted(#[from] Interrupted),
}

/// Result type for dispatch operations.
pub type Result<T> = std::result::Result<T, DispatchError>;

/// How far an item got through dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Already in the dedup store. Nothing ran.
    AlreadySeen,
    /// Authored by the bot itself.
    OwnItem,
    /// The author failed the fast gate. Not claimed.
    Rejected,
    /// Claimed; the author is deleted or the item is system-originated.
    NoAuthor,
    /// Claimed; a handler accepted the item but its author failed the full
    /// gate.
    InteractionDenied,
    /// Claimed and offered to every handler.
    Handled {
        /// Whether some handler produced a non-empty effect.
        responded: bool,
    },
}

impl DispatchOutcome {
    pub fn responded(&self) -> bool {
        matches!(self, DispatchOutcome::Handled { responded: true })
    }

    /// Whether dispatch added the item to the dedup store.
    pub fn claimed(&self) -> bool {
        matches!(
            self,
            DispatchOutcome::NoAuthor
                | DispatchOutcome::InteractionDenied
                | DispatchOutcome::Handled { .. }
        )
    }
}

/// Routes items to handlers and their effects to a sink.
pub struct DispatchEngine<'a, G, S> {
    registry: &'a HandlerRegistry,
    gate: &'a G,
    sink: &'a S,
    config: &'a dyn ConfigSource,
    identity: &'a Username,
    pacer: Pacer,
    pause: Duration,
    hooks: &'a dyn ModerationHooks,
}

impl<'a, G, S> DispatchEngine<'a, G, S>
where
    G: InteractionGate,
    S: EffectSink,
{
    pub fn new(
        registry: &'a HandlerRegistry,
        gate: &'a G,
        sink: &'a S,
        config: &'a dyn ConfigSource,
        identity: &'a Username,
        pacer: Pacer,
    ) -> Self {
        DispatchEngine {
            registry,
            gate,
            sink,
            config,
            identity,
            pacer,
            pause: Duration::ZERO,
            hooks: &NoHooks,
        }
    }

    /// Pause after a handler fails.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn with_hooks(mut self, hooks: &'a dyn ModerationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Runs one item through dispatch.
    #[instrument(skip_all, fields(item = %item.fullname(), kind = ?item.kind()))]
    pub async fn dispatch(&self, item: &Item, store: &mut dyn DedupStore) -> Result<DispatchOutcome> {
        let fullname = item.fullname();
        if store.contains(fullname) {
            trace!("already seen");
            return Ok(DispatchOutcome::AlreadySeen);
        }

        let author = item.author();
        if let Some(author) = author {
            if author.matches(self.identity) {
                trace!("own item");
                return Ok(DispatchOutcome::OwnItem);
            }
            if !self.gate.fast(author) {
                debug!(author = %author, "author rejected");
                return Ok(DispatchOutcome::Rejected);
            }
        }

        store.add(fullname)?;

        let Some(author) = author else {
            debug!("no author; skipping");
            return Ok(DispatchOutcome::NoAuthor);
        };

        match item {
            Item::Comment(c) => {
                self.run_handlers(item, c, self.registry.comment_handlers(), author, store)
                    .await
            }
            Item::Link(l) => {
                self.run_handlers(item, l, self.registry.link_handlers(), author, store)
                    .await
            }
            Item::Message(m) => {
                self.run_handlers(item, m, self.registry.message_handlers(), author, store)
                    .await
            }
        }
    }

    async fn run_handlers<I: Sync>(
        &self,
        item: &Item,
        inner: &I,
        handlers: &[Box<dyn Handler<I>>],
        author: &Username,
        store: &mut dyn DedupStore,
    ) -> Result<DispatchOutcome> {
        let mut allowed: Option<bool> = None;
        let mut responded = false;

        for handler in handlers {
            let name = handler.name();
            let accepted = catch_unwind(AssertUnwindSafe(|| handler.probe(inner, self.config)));
            match accepted {
                Ok(true) => {}
                Ok(false) => continue,
                Err(panic) => {
                    error!(handler = name, panic = %panic_message(&*panic), "probe panicked");
                    self.pacer.sleep(self.pause).await?;
                    continue;
                }
            }

            let permitted = match allowed {
                Some(permitted) => permitted,
                None => {
                    let permitted = self.gate.full(author).await;
                    allowed = Some(permitted);
                    permitted
                }
            };
            if !permitted {
                info!(author = %author, handler = name, "interaction denied");
                self.hooks.on_failed_interaction(item);
                return Ok(DispatchOutcome::InteractionDenied);
            }

            let outcome = {
                let mut ctx = HandlerContext {
                    store: &mut *store,
                    config: self.config,
                    identity: self.identity,
                };
                catch_unwind(AssertUnwindSafe(|| handler.handle(inner, &mut ctx)))
            };
            match outcome {
                Ok(Ok(Some(effect))) if !effect.is_empty() => {
                    debug!(handler = name, kind = ?effect.kind, "handler responded");
                    responded = true;
                    self.deliver(item, &effect).await?;
                }
                Ok(Ok(_)) => trace!(handler = name, "no response"),
                Ok(Err(e)) => {
                    warn!(handler = name, error = %e, "handler failed");
                    self.pacer.sleep(self.pause).await?;
                }
                Err(panic) => {
                    error!(handler = name, panic = %panic_message(&*panic), "handler panicked");
                    self.pacer.sleep(self.pause).await?;
                }
            }
        }

        Ok(DispatchOutcome::Handled { responded })
    }

    async fn deliver(&self, item: &Item, effect: &Effect) -> Result<()> {
        self.sink.deliver(item, effect).await?;
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
