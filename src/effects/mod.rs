//! Effects-as-data for handler responses.
//!
//! A handler never talks to the platform directly. It returns an [`Effect`]
//! describing what should happen, and the [`EffectApplier`] performs it.
//! This keeps handlers pure and testable, and lets the replay tool run every
//! handler without touching the platform.
//!
//! An effect is a bundle of independent actions. [`Effect::actions`] lists
//! them in the fixed order they are applied:
//!
//! 1. reply
//! 2. link flair
//! 3. report
//! 4. ban
//! 5. unban
//! 6. outbound private messages

use std::future::Future;

use serde::{Deserialize, Serialize};
use tracing::info;

pub mod apply;

pub use apply::{ActionKind, ActionRecord, EffectApplier, EffectReport};

use crate::retry::Interrupted;
use crate::types::{FlairTemplateId, Item, Username};

/// Where dispatch sends the effects handlers produce.
///
/// [`EffectApplier`] performs them; [`DryRun`] only logs them.
pub trait EffectSink: Send + Sync {
    /// Handles one non-empty effect produced for `item`.
    ///
    /// Only shutdown is an error; failed actions are logged by the sink.
    fn deliver(
        &self,
        item: &Item,
        effect: &Effect,
    ) -> impl Future<Output = Result<(), Interrupted>> + Send;
}

/// Logs effects instead of performing them.
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRun;

impl EffectSink for DryRun {
    async fn deliver(&self, item: &Item, effect: &Effect) -> Result<(), Interrupted> {
        info!(
            item = %item.fullname(),
            kind = ?effect.kind,
            actions = effect.actions().len(),
            reply = effect.reply.as_deref().unwrap_or(""),
            "would respond"
        );
        Ok(())
    }
}

/// How a handler classifies its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseKind {
    /// A normal response to a well-formed summon.
    #[default]
    Valid,

    /// A response explaining why the summon was not understood.
    Invalid,

    /// Perform the non-reply actions without posting a reply.
    Silent,
}

/// A request to ban a user from every monitored realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BanRequest {
    pub user: Username,
    /// Shown to the banned user.
    pub message: String,
    /// Ban reason recorded by the platform.
    pub reason: String,
    /// Private note visible to moderators.
    pub note: String,
}

impl BanRequest {
    pub fn new(
        user: impl Into<Username>,
        message: impl Into<String>,
        reason: impl Into<String>,
        note: impl Into<String>,
    ) -> Self {
        BanRequest {
            user: user.into(),
            message: message.into(),
            reason: reason.into(),
            note: note.into(),
        }
    }
}

/// A private message to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub to: Username,
    pub title: String,
    pub body: String,
}

impl OutboundMessage {
    pub fn new(to: impl Into<Username>, title: impl Into<String>, body: impl Into<String>) -> Self {
        OutboundMessage {
            to: to.into(),
            title: title.into(),
            body: body.into(),
        }
    }
}

/// What a handler wants done in response to an item.
///
/// Every field is optional. An effect with no populated field means "no
/// response" and produces no remote call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Effect {
    #[serde(default)]
    pub kind: ResponseKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_flair: Option<FlairTemplateId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ban: Option<BanRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unban: Option<Username>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<OutboundMessage>,
}

impl Effect {
    /// An effect with nothing to do.
    pub fn none() -> Self {
        Effect::default()
    }

    /// An effect that only replies with `text`.
    pub fn reply(text: impl Into<String>) -> Self {
        Effect {
            reply: Some(text.into()),
            ..Effect::default()
        }
    }

    pub fn with_kind(mut self, kind: ResponseKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_reply(mut self, text: impl Into<String>) -> Self {
        self.reply = Some(text.into());
        self
    }

    pub fn with_link_flair(mut self, template: impl Into<FlairTemplateId>) -> Self {
        self.link_flair = Some(template.into());
        self
    }

    pub fn with_report(mut self, reason: impl Into<String>) -> Self {
        self.report = Some(reason.into());
        self
    }

    pub fn with_ban(mut self, request: BanRequest) -> Self {
        self.ban = Some(request);
        self
    }

    pub fn with_unban(mut self, user: impl Into<Username>) -> Self {
        self.unban = Some(user.into());
        self
    }

    pub fn with_message(mut self, message: OutboundMessage) -> Self {
        self.messages.push(message);
        self
    }

    /// True if no field is populated.
    pub fn is_empty(&self) -> bool {
        self.reply.is_none()
            && self.link_flair.is_none()
            && self.report.is_none()
            && self.ban.is_none()
            && self.unban.is_none()
            && self.messages.is_empty()
    }

    /// The actions to perform, in application order.
    ///
    /// A silent effect omits its reply.
    pub fn actions(&self) -> Vec<Action<'_>> {
        let mut actions = Vec::new();
        if let Some(text) = &self.reply
            && self.kind != ResponseKind::Silent
        {
            actions.push(Action::Reply(text));
        }
        if let Some(template) = &self.link_flair {
            actions.push(Action::LinkFlair(template));
        }
        if let Some(reason) = &self.report {
            actions.push(Action::Report(reason));
        }
        if let Some(request) = &self.ban {
            actions.push(Action::Ban(request));
        }
        if let Some(user) = &self.unban {
            actions.push(Action::Unban(user));
        }
        actions.extend(self.messages.iter().map(Action::Message));
        actions
    }
}

/// One side action of an [`Effect`].
///
/// This is a closed set; the applier matches it exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    Reply(&'a str),
    LinkFlair(&'a FlairTemplateId),
    Report(&'a str),
    Ban(&'a BanRequest),
    Unban(&'a Username),
    Message(&'a OutboundMessage),
}

impl Action<'_> {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Reply(_) => ActionKind::Reply,
            Action::LinkFlair(_) => ActionKind::LinkFlair,
            Action::Report(_) => ActionKind::Report,
            Action::Ban(_) => ActionKind::Ban,
            Action::Unban(_) => ActionKind::Unban,
            Action::Message(_) => ActionKind::Message,
        }
    }
}
