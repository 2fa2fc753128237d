//! Callbacks fired on moderation outcomes.
//!
//! Hooks observe; they cannot change what the dispatch engine or the effect
//! applier does. Every method defaults to a no-op, so an implementation only
//! overrides the events it cares about.

use crate::types::{Item, Username};

/// Typed callbacks for moderation events.
pub trait ModerationHooks: Send + Sync {
    /// An item's author failed the full interaction check. No handler ran.
    fn on_failed_interaction(&self, item: &Item) {
        let _ = item;
    }

    /// A ban was applied (or was already in place) on every monitored realm.
    fn on_user_banned(&self, user: &Username) {
        let _ = user;
    }

    /// An unban was applied (or the user was not banned) on every monitored
    /// realm.
    fn on_user_unbanned(&self, user: &Username) {
        let _ = user;
    }
}

/// Hooks that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl ModerationHooks for NoHooks {}
