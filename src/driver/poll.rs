//! The top-level poll loop.
//!
//! # Cycle
//!
//! After the initial login and a short settle delay, every cycle:
//!
//! 1. refreshes the login session if it is close to expiry
//! 2. fetches new comments from the combined realm and dispatches each
//! 3. fetches new submissions and dispatches each
//! 4. fetches unread inbox entries, marks them read, and dispatches the
//!    private messages (comment replies are only logged)
//! 5. flushes the dedup store
//!
//! and then sleeps for the poll interval.
//!
//! Everything runs on one task, one remote call at a time: the effects for
//! an item are applied (or given up on) before the next item is dispatched.
//!
//! # Fatal Conditions
//!
//! The loop only returns on a [`FatalError`]: the initial login failed, a
//! fetch failed terminally, the dedup store failed, or shutdown was
//! requested during a wait.

use std::convert::Infallible;

use tracing::{debug, error, info, instrument, warn};

use super::FatalError;
use super::session::SessionKeeper;
use crate::config::{BotConfig, ConfigSource};
use crate::dispatch::{DispatchEngine, DispatchOutcome};
use crate::effects::{EffectApplier, EffectSink};
use crate::gate::InteractionGate;
use crate::handlers::HandlerRegistry;
use crate::hooks::{ModerationHooks, NoHooks};
use crate::retry::{Pacer, RetryError, RetryExecutor};
use crate::store::DedupStore;
use crate::transport::Transport;
use crate::types::{Fullname, InboxItem, Item, Realm};

/// Counts from one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Items handed to dispatch.
    pub fetched: usize,
    /// Items newly added to the dedup store.
    pub claimed: usize,
    /// Items some handler responded to.
    pub responded: usize,
}

impl CycleStats {
    fn record(&mut self, outcome: DispatchOutcome) {
        self.fetched += 1;
        if outcome.claimed() {
            self.claimed += 1;
        }
        if outcome.responded() {
            self.responded += 1;
        }
    }
}

/// Drives fetching and dispatch until a fatal condition.
pub struct PollLoop<'a, T, G> {
    transport: &'a T,
    bot: &'a BotConfig,
    resources: &'a dyn ConfigSource,
    registry: &'a HandlerRegistry,
    gate: &'a G,
    hooks: &'a dyn ModerationHooks,
    pacer: Pacer,
}

impl<'a, T, G> PollLoop<'a, T, G>
where
    T: Transport,
    G: InteractionGate,
{
    pub fn new(
        transport: &'a T,
        bot: &'a BotConfig,
        resources: &'a dyn ConfigSource,
        registry: &'a HandlerRegistry,
        gate: &'a G,
        pacer: Pacer,
    ) -> Self {
        PollLoop {
            transport,
            bot,
            resources,
            registry,
            gate,
            hooks: &NoHooks,
            pacer,
        }
    }

    pub fn with_hooks(mut self, hooks: &'a dyn ModerationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Logs in and polls forever. The returned error has already been
    /// logged.
    #[instrument(skip_all, fields(identity = %self.bot.identity))]
    pub async fn run(&self, store: &mut dyn DedupStore) -> Result<Infallible, FatalError> {
        let Err(e) = self.poll(store).await;
        if e.is_interrupted() {
            info!("shutdown requested; stopping");
        } else {
            error!(error = %e, "poll loop stopped");
        }
        Err(e)
    }

    async fn poll(&self, store: &mut dyn DedupStore) -> Result<Infallible, FatalError> {
        let timing = &self.bot.timing;
        let retry = RetryExecutor::new(timing.retry, self.pacer.clone());
        let session = SessionKeeper::new(
            self.transport,
            &retry,
            &self.bot.credentials,
            timing.refresh_margin,
        );

        session.login().await.map_err(FatalError::login)?;
        debug!(delay_ms = timing.startup_delay.as_millis() as u64, "settling before first cycle");
        self.pacer.sleep(timing.startup_delay).await?;

        let applier = EffectApplier::new(
            self.transport,
            &retry,
            &self.bot.identity,
            &self.bot.realms,
        )
        .with_pause(timing.brief_pause)
        .with_session(&session)
        .with_hooks(self.hooks);
        let engine = DispatchEngine::new(
            self.registry,
            self.gate,
            &applier,
            self.resources,
            &self.bot.identity,
            self.pacer.clone(),
        )
        .with_pause(timing.brief_pause)
        .with_hooks(self.hooks);

        let realm = Realm::combined(&self.bot.realms);
        info!(
            realm = %realm,
            handlers = self.registry.len(),
            poll_interval_secs = timing.poll_interval.as_secs(),
            "polling"
        );

        let mut number: u64 = 0;
        loop {
            number += 1;
            let stats = self
                .cycle(number, &realm, &retry, &session, &engine, store)
                .await?;
            if stats.fetched > 0 {
                info!(
                    cycle = number,
                    fetched = stats.fetched,
                    claimed = stats.claimed,
                    responded = stats.responded,
                    "cycle complete"
                );
            }
            self.pacer.sleep(timing.poll_interval).await?;
        }
    }

    #[instrument(skip_all, fields(cycle = number))]
    async fn cycle<S: EffectSink>(
        &self,
        number: u64,
        realm: &Realm,
        retry: &RetryExecutor,
        session: &SessionKeeper<'_, T>,
        engine: &DispatchEngine<'_, G, S>,
        store: &mut dyn DedupStore,
    ) -> Result<CycleStats, FatalError> {
        let transport = self.transport;
        let mut stats = CycleStats::default();

        if !session.ensure_fresh().await? {
            warn!("continuing without a fresh session");
        }

        let comments = retry
            .named("fetch_new_comments")
            .on_failure(session)
            .run(|| transport.fetch_new_comments(realm))
            .await
            .map_err(FatalError::fetch)?;
        debug!(count = comments.len(), "fetched comments");
        for comment in comments {
            stats.record(engine.dispatch(&Item::from(comment), store).await?);
        }

        let submissions = retry
            .named("fetch_new_submissions")
            .on_failure(session)
            .run(|| transport.fetch_new_submissions(realm))
            .await
            .map_err(FatalError::fetch)?;
        debug!(count = submissions.len(), "fetched submissions");
        for link in submissions {
            stats.record(engine.dispatch(&Item::from(link), store).await?);
        }

        let inbox = retry
            .named("fetch_unread_messages")
            .on_failure(session)
            .run(|| transport.fetch_unread_messages())
            .await
            .map_err(FatalError::fetch)?;
        debug!(count = inbox.len(), "fetched inbox");
        if !inbox.is_empty() {
            let ids: Vec<Fullname> = inbox.iter().map(|entry| entry.fullname().clone()).collect();
            self.mark_read(retry, session, &ids).await?;
        }
        for entry in inbox {
            match entry {
                InboxItem::CommentReply(reply) => {
                    info!(
                        fullname = %reply.fullname,
                        author = ?reply.author.as_ref().map(|a| a.as_str()),
                        "comment reply in inbox"
                    );
                }
                InboxItem::Message(message) => {
                    stats.record(engine.dispatch(&Item::from(message), store).await?);
                }
            }
        }

        store.flush()?;
        Ok(stats)
    }

    /// Best effort: a failure is logged and the cycle continues.
    async fn mark_read(
        &self,
        retry: &RetryExecutor,
        session: &SessionKeeper<'_, T>,
        ids: &[Fullname],
    ) -> Result<(), FatalError> {
        let transport = self.transport;
        match retry
            .named("mark_read")
            .on_failure(session)
            .run(|| transport.mark_read(ids))
            .await
        {
            Ok(()) => Ok(()),
            Err(RetryError::Interrupted { .. }) => Err(FatalError::Interrupted),
            Err(e) => {
                warn!(count = ids.len(), error = %e, "could not mark inbox read");
                Ok(())
            }
        }
    }
}
