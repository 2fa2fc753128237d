//! Performs effects against the platform.
//!
//! Each action of an effect is applied independently: a failed reply does
//! not prevent the flair, a failed ban does not prevent the messages.
//! Actions run in the order given by [`Effect::actions`], one remote call at
//! a time, separated by a brief pause.
//!
//! The only failure that stops an effect part-way is [`Interrupted`]:
//! shutdown was requested while waiting, and the caller treats it as fatal.

use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use super::{Action, BanRequest, Effect, EffectSink, OutboundMessage};
use crate::hooks::{ModerationHooks, NoHooks};
use crate::retry::{FailureHook, Interrupted, Retry, RetryError, RetryExecutor};
use crate::transport::Transport;
use crate::types::{FlairTemplateId, Fullname, Item, Realm, Username};

/// Which action an [`ActionRecord`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Reply,
    LinkFlair,
    Report,
    Ban,
    Unban,
    Message,
}

/// The result of one applied action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionRecord {
    pub kind: ActionKind,
    /// True if the action took effect or its goal already held.
    pub succeeded: bool,
}

/// Per-action results of applying one effect, in application order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectReport {
    pub records: Vec<ActionRecord>,
}

impl EffectReport {
    /// True if no action was attempted.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn all_succeeded(&self) -> bool {
        self.records.iter().all(|r| r.succeeded)
    }

    /// The result of the first action of `kind`, if there was one.
    pub fn succeeded(&self, kind: ActionKind) -> Option<bool> {
        self.records
            .iter()
            .find(|r| r.kind == kind)
            .map(|r| r.succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = ActionKind> + '_ {
        self.records.iter().filter(|r| !r.succeeded).map(|r| r.kind)
    }
}

/// Where a ban or unban stands on one realm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RealmOutcome {
    Applied,
    AlreadySatisfied,
    /// The target moderates the realm, or that could not be determined.
    SkippedModerator,
    Failed,
}

impl RealmOutcome {
    fn is_satisfied(self) -> bool {
        matches!(self, RealmOutcome::Applied | RealmOutcome::AlreadySatisfied)
    }
}

/// Applies [`Effect`]s through the retry executor.
pub struct EffectApplier<'a, T> {
    transport: &'a T,
    retry: &'a RetryExecutor,
    identity: &'a Username,
    realms: &'a [Realm],
    pause: Duration,
    session: Option<&'a dyn FailureHook>,
    hooks: &'a dyn ModerationHooks,
}

impl<'a, T: Transport> EffectApplier<'a, T> {
    /// Creates an applier acting as `identity` on `realms`.
    pub fn new(
        transport: &'a T,
        retry: &'a RetryExecutor,
        identity: &'a Username,
        realms: &'a [Realm],
    ) -> Self {
        EffectApplier {
            transport,
            retry,
            identity,
            realms,
            pause: Duration::ZERO,
            session: None,
            hooks: &NoHooks,
        }
    }

    /// Pause between consecutive remote calls.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Registers the session keeper to run after each failed attempt.
    pub fn with_session(mut self, session: &'a dyn FailureHook) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_hooks(mut self, hooks: &'a dyn ModerationHooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Applies every action of `effect` on behalf of `item`.
    ///
    /// An empty effect makes no remote call.
    #[instrument(skip_all, fields(item = %item.fullname()))]
    pub async fn apply(&self, item: &Item, effect: &Effect) -> Result<EffectReport, Interrupted> {
        let mut report = EffectReport::default();
        for (index, action) in effect.actions().into_iter().enumerate() {
            if index > 0 {
                self.pause().await?;
            }
            let succeeded = match action {
                Action::Reply(text) => self.reply(item.fullname(), text).await?,
                Action::LinkFlair(template) => self.flair(item, template).await?,
                Action::Report(reason) => self.report(item.fullname(), reason).await?,
                Action::Ban(request) => self.ban(request).await?,
                Action::Unban(user) => self.unban(user).await?,
                Action::Message(message) => self.send(message).await?,
            };
            report.records.push(ActionRecord {
                kind: action.kind(),
                succeeded,
            });
        }
        debug!(
            actions = report.records.len(),
            failed = report.failures().count(),
            "effect applied"
        );
        Ok(report)
    }

    fn call(&self, operation: &str) -> Retry<'a> {
        let retry = self.retry.named(operation);
        match self.session {
            Some(session) => retry.on_failure(session),
            None => retry,
        }
    }

    async fn pause(&self) -> Result<(), Interrupted> {
        self.retry.pacer().sleep(self.pause).await
    }

    async fn reply(&self, parent: &Fullname, text: &str) -> Result<bool, Interrupted> {
        let transport = self.transport;
        match self.call("reply").run(|| transport.reply(parent, text)).await {
            Ok(()) => {
                debug!(parent = %parent, "replied");
                Ok(true)
            }
            Err(e) if e.transport_error().is_some_and(|e| e.is_too_old()) => {
                info!(parent = %parent, "target is archived; reply treated as done");
                Ok(true)
            }
            Err(e) => {
                unless_interrupted(e)?;
                Ok(false)
            }
        }
    }

    async fn flair(&self, item: &Item, template: &FlairTemplateId) -> Result<bool, Interrupted> {
        let Some(link) = item.link_for_flair() else {
            warn!(template = %template, "item has no link to flair; skipping");
            return Ok(false);
        };
        let transport = self.transport;
        match self
            .call("flair_link")
            .run(|| transport.flair_link(link, template))
            .await
        {
            Ok(()) => {
                debug!(link = %link, template = %template, "flaired");
                Ok(true)
            }
            Err(e) => {
                let e = unless_interrupted(e)?;
                if e.transport_error().is_some_and(|e| e.is_forbidden()) {
                    warn!(link = %link, "not permitted to flair this link");
                }
                Ok(false)
            }
        }
    }

    async fn report(&self, thing: &Fullname, reason: &str) -> Result<bool, Interrupted> {
        let transport = self.transport;
        match self.call("report").run(|| transport.report(thing, reason)).await {
            Ok(()) => {
                debug!(thing = %thing, "reported");
                Ok(true)
            }
            Err(e) => {
                unless_interrupted(e)?;
                Ok(false)
            }
        }
    }

    #[instrument(skip_all, fields(user = %request.user))]
    async fn ban(&self, request: &BanRequest) -> Result<bool, Interrupted> {
        if request.user.matches(self.identity) {
            warn!("refusing to ban the bot's own account");
            return Ok(false);
        }
        if self.realms.is_empty() {
            warn!("no realms configured; nothing to ban from");
            return Ok(false);
        }

        let mut satisfied_everywhere = true;
        for (index, realm) in self.realms.iter().enumerate() {
            if index > 0 {
                self.pause().await?;
            }
            let outcome = self.ban_in(realm, request).await?;
            debug!(realm = %realm, ?outcome, "ban");
            satisfied_everywhere &= outcome.is_satisfied();
        }

        if satisfied_everywhere {
            info!("user banned from every realm");
            self.hooks.on_user_banned(&request.user);
        }
        Ok(satisfied_everywhere)
    }

    async fn ban_in(&self, realm: &Realm, request: &BanRequest) -> Result<RealmOutcome, Interrupted> {
        let user = &request.user;
        match self.is_banned(realm, user).await? {
            Some(true) => return Ok(RealmOutcome::AlreadySatisfied),
            Some(false) => {}
            None => return Ok(RealmOutcome::Failed),
        }

        let transport = self.transport;
        match self
            .call("is_moderator")
            .run(|| transport.is_moderator(realm, user))
            .await
        {
            Ok(false) => {}
            Ok(true) => {
                info!(realm = %realm, "target moderates this realm; not banning");
                return Ok(RealmOutcome::SkippedModerator);
            }
            Err(e) => {
                unless_interrupted(e)?;
                warn!(realm = %realm, "moderator status unknown; not banning");
                return Ok(RealmOutcome::SkippedModerator);
            }
        }

        match self.call("ban").run(|| transport.ban(realm, request)).await {
            Ok(()) => Ok(RealmOutcome::Applied),
            Err(e) => {
                unless_interrupted(e)?;
                Ok(RealmOutcome::Failed)
            }
        }
    }

    #[instrument(skip_all, fields(user = %user))]
    async fn unban(&self, user: &Username) -> Result<bool, Interrupted> {
        if self.realms.is_empty() {
            warn!("no realms configured; nothing to unban from");
            return Ok(false);
        }

        let mut satisfied_everywhere = true;
        for (index, realm) in self.realms.iter().enumerate() {
            if index > 0 {
                self.pause().await?;
            }
            let outcome = self.unban_in(realm, user).await?;
            debug!(realm = %realm, ?outcome, "unban");
            satisfied_everywhere &= outcome.is_satisfied();
        }

        if satisfied_everywhere {
            info!("user unbanned from every realm");
            self.hooks.on_user_unbanned(user);
        }
        Ok(satisfied_everywhere)
    }

    async fn unban_in(&self, realm: &Realm, user: &Username) -> Result<RealmOutcome, Interrupted> {
        match self.is_banned(realm, user).await? {
            Some(false) => return Ok(RealmOutcome::AlreadySatisfied),
            Some(true) => {}
            None => return Ok(RealmOutcome::Failed),
        }

        let transport = self.transport;
        match self.call("unban").run(|| transport.unban(realm, user)).await {
            Ok(()) => Ok(RealmOutcome::Applied),
            Err(e) => {
                unless_interrupted(e)?;
                Ok(RealmOutcome::Failed)
            }
        }
    }

    /// `None` if the ban list could not be read.
    async fn is_banned(&self, realm: &Realm, user: &Username) -> Result<Option<bool>, Interrupted> {
        let transport = self.transport;
        match self
            .call("is_banned")
            .run(|| transport.is_banned(realm, user))
            .await
        {
            Ok(banned) => Ok(Some(banned)),
            Err(e) => {
                unless_interrupted(e)?;
                warn!(realm = %realm, user = %user, "could not read ban status");
                Ok(None)
            }
        }
    }

    async fn send(&self, message: &OutboundMessage) -> Result<bool, Interrupted> {
        let transport = self.transport;
        let result = self
            .call("send_message")
            .run(|| transport.send_message(&message.to, &message.title, &message.body))
            .await;
        match result {
            Ok(errors) if errors.is_empty() => {
                debug!(to = %message.to, "message sent");
                Ok(true)
            }
            Ok(errors) => {
                for error in &errors {
                    warn!(to = %message.to, error = %error, "message refused");
                }
                Ok(false)
            }
            Err(e) => {
                unless_interrupted(e)?;
                Ok(false)
            }
        }
    }
}

impl<T: Transport> EffectSink for EffectApplier<'_, T> {
    async fn deliver(&self, item: &Item, effect: &Effect) -> Result<(), Interrupted> {
        let report = self.apply(item, effect).await?;
        if !report.all_succeeded() {
            warn!(
                item = %item.fullname(),
                failed = ?report.failures().collect::<Vec<_>>(),
                "some actions failed"
            );
        }
        Ok(())
    }
}

/// Passes a non-interrupt failure back to the caller; turns an interrupt
/// into [`Interrupted`].
fn unless_interrupted(err: RetryError) -> Result<RetryError, Interrupted> {
    if err.is_interrupted() {
        Err(Interrupted)
    } else {
        Ok(err)
    }
}
