//! Two-phase actor eligibility check.
//!
//! [`InteractionGate::fast`] runs for every unseen item before any handler is
//! consulted and must be cheap. [`InteractionGate::full`] runs at most once
//! per item, and only after some handler's probe accepted it, so it may be
//! expensive (e.g. a remote lookup).

use std::collections::HashSet;
use std::future::Future;

use tracing::debug;

use crate::config::{BANNED_LIST, ConfigSource};
use crate::types::Username;

/// Decides whether an actor may trigger handlers at all.
pub trait InteractionGate: Send + Sync {
    /// Cheap pre-filter. `false` ends dispatch of the item before it is
    /// claimed.
    fn fast(&self, actor: &Username) -> bool;

    /// Authoritative check, evaluated lazily once per item.
    fn full(&self, actor: &Username) -> impl Future<Output = bool> + Send;
}

/// Rejects actors on the banned list.
#[derive(Debug, Clone, Default)]
pub struct BannedListGate {
    banned: HashSet<String>,
}

impl BannedListGate {
    pub fn new<I, S>(banned: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        BannedListGate {
            banned: banned
                .into_iter()
                .map(|name| Username::new(name.as_ref()).normalized())
                .collect(),
        }
    }

    /// Reads the `banned` list from `config`.
    pub fn from_config(config: &dyn ConfigSource) -> Self {
        Self::new(config.list(BANNED_LIST))
    }

    fn allows(&self, actor: &Username) -> bool {
        let allowed = !self.banned.contains(&actor.normalized());
        if !allowed {
            debug!(actor = %actor, "actor is on the banned list");
        }
        allowed
    }
}

impl InteractionGate for BannedListGate {
    fn fast(&self, actor: &Username) -> bool {
        self.allows(actor)
    }

    async fn full(&self, actor: &Username) -> bool {
        self.allows(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSet;
    use crate::test_utils::arb_username;
    use proptest::prelude::*;

    #[test]
    fn unlisted_actor_passes() {
        let gate = BannedListGate::new(["mallory"]);
        assert!(gate.fast(&Username::new("alice")));
    }

    #[test]
    fn listed_actor_fails_regardless_of_case() {
        let gate = BannedListGate::new(["/u/Mallory"]);
        assert!(!gate.fast(&Username::new("MALLORY")));
        assert!(!gate.fast(&Username::new("mallory")));
    }

    #[tokio::test]
    async fn full_check_agrees_with_fast() {
        let gate = BannedListGate::new(["mallory"]);
        assert!(!gate.full(&Username::new("Mallory")).await);
        assert!(gate.full(&Username::new("alice")).await);
    }

    #[test]
    fn reads_banned_list_from_config() {
        let config = ConfigSet::new().with_list(BANNED_LIST, ["Eve"]);
        let gate = BannedListGate::from_config(&config);
        assert!(!gate.fast(&Username::new("eve")));
    }

    proptest! {
        #[test]
        fn every_banned_actor_fails_fast(
            banned in prop::collection::vec(arb_username(), 1..20),
            pick in any::<prop::sample::Index>(),
        ) {
            let gate = BannedListGate::new(banned.iter().map(|u| u.as_str().to_uppercase()));
            let actor = pick.get(&banned);
            prop_assert!(!gate.fast(actor));
        }
    }
}
