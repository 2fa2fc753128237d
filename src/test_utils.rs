//! Shared test utilities: item builders, a scriptable transport, recording
//! hooks and arbitrary generators for property-based testing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use crate::effects::BanRequest;
use crate::hooks::ModerationHooks;
use crate::transport::{self, ApiErrorEntry, Transport, TransportError};
use crate::types::{
    Comment, Credentials, FlairTemplateId, Fullname, InboxItem, Item, Link, LoginSession,
    Message, Realm, Username,
};

// ─── Item builders ───

pub fn timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

pub fn comment(fullname: &str, author: &str, body: &str, link_id: &str) -> Comment {
    Comment {
        fullname: Fullname::new(fullname),
        author: Some(Username::new(author)),
        body: body.to_string(),
        link_id: Fullname::new(link_id),
        parent_id: Fullname::new(link_id),
        created_utc: timestamp(),
    }
}

pub fn link(fullname: &str, author: &str, title: &str) -> Link {
    Link {
        fullname: Fullname::new(fullname),
        author: Some(Username::new(author)),
        title: title.to_string(),
        selftext: String::new(),
        created_utc: timestamp(),
    }
}

pub fn message(fullname: &str, author: Option<&str>, body: &str) -> Message {
    Message {
        fullname: Fullname::new(fullname),
        author: author.map(Username::new),
        subject: "summon".to_string(),
        body: body.to_string(),
        created_utc: timestamp(),
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        username: "summon_bot".into(),
        password: "hunter2".into(),
        app_client_id: "client".into(),
        app_client_secret: "secret".into(),
    }
}

// ─── Mock transport ───

/// A recorded remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login,
    FetchComments(Realm),
    FetchSubmissions(Realm),
    FetchUnread,
    MarkRead(Vec<Fullname>),
    Reply { parent: Fullname, text: String },
    Flair { link: Fullname, template: FlairTemplateId },
    Report { thing: Fullname, reason: String },
    IsBanned { realm: Realm, user: Username },
    IsModerator { realm: Realm, user: Username },
    Ban { realm: Realm, user: Username },
    Unban { realm: Realm, user: Username },
    SendMessage { to: Username, title: String, body: String },
}

/// Remote operations, for scripting failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Login,
    FetchComments,
    FetchSubmissions,
    FetchUnread,
    MarkRead,
    Reply,
    Flair,
    Report,
    IsBanned,
    IsModerator,
    Ban,
    Unban,
    SendMessage,
}

impl Call {
    pub fn op(&self) -> Op {
        match self {
            Call::Login => Op::Login,
            Call::FetchComments(_) => Op::FetchComments,
            Call::FetchSubmissions(_) => Op::FetchSubmissions,
            Call::FetchUnread => Op::FetchUnread,
            Call::MarkRead(_) => Op::MarkRead,
            Call::Reply { .. } => Op::Reply,
            Call::Flair { .. } => Op::Flair,
            Call::Report { .. } => Op::Report,
            Call::IsBanned { .. } => Op::IsBanned,
            Call::IsModerator { .. } => Op::IsModerator,
            Call::Ban { .. } => Op::Ban,
            Call::Unban { .. } => Op::Unban,
            Call::SendMessage { .. } => Op::SendMessage,
        }
    }

    /// True for calls that change something visible on the platform.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self.op(),
            Op::Reply | Op::Flair | Op::Report | Op::Ban | Op::Unban | Op::SendMessage
        )
    }
}

/// A [`Transport`] that records every call and answers from a script.
///
/// Scripted failures for an operation are returned, in order, before the
/// operation starts succeeding. Fetches return the queued batches in order
/// and empty lists once the queue runs out.
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    failures: Mutex<HashMap<Op, VecDeque<TransportError>>>,
    comments: Mutex<VecDeque<Vec<Comment>>>,
    submissions: Mutex<VecDeque<Vec<Link>>>,
    inbox: Mutex<VecDeque<Vec<InboxItem>>>,
    banned: Mutex<HashSet<(Realm, Username)>>,
    moderators: Mutex<HashSet<(Realm, Username)>>,
    message_errors: Mutex<HashMap<Username, Vec<ApiErrorEntry>>>,
    session_ttl: Duration,
    logins: Mutex<u32>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        MockTransport {
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(HashMap::new()),
            comments: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(VecDeque::new()),
            inbox: Mutex::new(VecDeque::new()),
            banned: Mutex::new(HashSet::new()),
            moderators: Mutex::new(HashSet::new()),
            message_errors: Mutex::new(HashMap::new()),
            session_ttl: Duration::from_secs(3600),
            logins: Mutex::new(0),
        }
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Makes the next call of `op` fail with `error`.
    pub fn fail(&self, op: Op, error: TransportError) -> &Self {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
        self
    }

    pub fn queue_comments(&self, batch: Vec<Comment>) -> &Self {
        self.comments.lock().unwrap().push_back(batch);
        self
    }

    pub fn queue_submissions(&self, batch: Vec<Link>) -> &Self {
        self.submissions.lock().unwrap().push_back(batch);
        self
    }

    pub fn queue_inbox(&self, batch: Vec<InboxItem>) -> &Self {
        self.inbox.lock().unwrap().push_back(batch);
        self
    }

    pub fn set_banned(&self, realm: &str, user: &str) -> &Self {
        self.banned
            .lock()
            .unwrap()
            .insert((Realm::new(realm), Username::new(user)));
        self
    }

    pub fn set_moderator(&self, realm: &str, user: &str) -> &Self {
        self.moderators
            .lock()
            .unwrap()
            .insert((Realm::new(realm), Username::new(user)));
        self
    }

    /// Makes messages to `to` come back with `errors`.
    pub fn refuse_messages_to(&self, to: &str, errors: Vec<ApiErrorEntry>) -> &Self {
        self.message_errors
            .lock()
            .unwrap()
            .insert(Username::new(to), errors);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, op: Op) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op() == op).collect()
    }

    pub fn mutations(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_mutation).collect()
    }

    pub fn is_banned_now(&self, realm: &str, user: &str) -> bool {
        self.banned
            .lock()
            .unwrap()
            .contains(&(Realm::new(realm), Username::new(user)))
    }

    fn record(&self, call: Call) -> transport::Result<()> {
        let op = call.op();
        self.calls.lock().unwrap().push(call);
        match self
            .failures
            .lock()
            .unwrap()
            .get_mut(&op)
            .and_then(VecDeque::pop_front)
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl Transport for MockTransport {
    async fn login(&self, _credentials: &Credentials) -> transport::Result<LoginSession> {
        self.record(Call::Login)?;
        let mut logins = self.logins.lock().unwrap();
        *logins += 1;
        Ok(LoginSession::new(
            format!("token-{}", *logins),
            Utc::now(),
            self.session_ttl,
        ))
    }

    async fn fetch_new_comments(&self, realm: &Realm) -> transport::Result<Vec<Comment>> {
        self.record(Call::FetchComments(realm.clone()))?;
        Ok(self.comments.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn fetch_new_submissions(&self, realm: &Realm) -> transport::Result<Vec<Link>> {
        self.record(Call::FetchSubmissions(realm.clone()))?;
        Ok(self
            .submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_default())
    }

    async fn fetch_unread_messages(&self) -> transport::Result<Vec<InboxItem>> {
        self.record(Call::FetchUnread)?;
        Ok(self.inbox.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn mark_read(&self, ids: &[Fullname]) -> transport::Result<()> {
        self.record(Call::MarkRead(ids.to_vec()))
    }

    async fn reply(&self, parent: &Fullname, text: &str) -> transport::Result<()> {
        self.record(Call::Reply {
            parent: parent.clone(),
            text: text.to_string(),
        })
    }

    async fn flair_link(
        &self,
        link: &Fullname,
        template: &FlairTemplateId,
    ) -> transport::Result<()> {
        self.record(Call::Flair {
            link: link.clone(),
            template: template.clone(),
        })
    }

    async fn report(&self, thing: &Fullname, reason: &str) -> transport::Result<()> {
        self.record(Call::Report {
            thing: thing.clone(),
            reason: reason.to_string(),
        })
    }

    async fn is_banned(&self, realm: &Realm, user: &Username) -> transport::Result<bool> {
        self.record(Call::IsBanned {
            realm: realm.clone(),
            user: user.clone(),
        })?;
        Ok(self
            .banned
            .lock()
            .unwrap()
            .contains(&(realm.clone(), user.clone())))
    }

    async fn is_moderator(&self, realm: &Realm, user: &Username) -> transport::Result<bool> {
        self.record(Call::IsModerator {
            realm: realm.clone(),
            user: user.clone(),
        })?;
        Ok(self
            .moderators
            .lock()
            .unwrap()
            .contains(&(realm.clone(), user.clone())))
    }

    async fn ban(&self, realm: &Realm, request: &BanRequest) -> transport::Result<()> {
        self.record(Call::Ban {
            realm: realm.clone(),
            user: request.user.clone(),
        })?;
        self.banned
            .lock()
            .unwrap()
            .insert((realm.clone(), request.user.clone()));
        Ok(())
    }

    async fn unban(&self, realm: &Realm, user: &Username) -> transport::Result<()> {
        self.record(Call::Unban {
            realm: realm.clone(),
            user: user.clone(),
        })?;
        self.banned
            .lock()
            .unwrap()
            .remove(&(realm.clone(), user.clone()));
        Ok(())
    }

    async fn send_message(
        &self,
        to: &Username,
        title: &str,
        body: &str,
    ) -> transport::Result<Vec<ApiErrorEntry>> {
        self.record(Call::SendMessage {
            to: to.clone(),
            title: title.to_string(),
            body: body.to_string(),
        })?;
        Ok(self
            .message_errors
            .lock()
            .unwrap()
            .get(to)
            .cloned()
            .unwrap_or_default())
    }
}

// ─── Recording hooks ───

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookEvent {
    FailedInteraction(Fullname),
    Banned(Username),
    Unbanned(Username),
}

#[derive(Default)]
pub struct RecordingHooks {
    events: Mutex<Vec<HookEvent>>,
}

impl RecordingHooks {
    pub fn events(&self) -> Vec<HookEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ModerationHooks for RecordingHooks {
    fn on_failed_interaction(&self, item: &Item) {
        self.events
            .lock()
            .unwrap()
            .push(HookEvent::FailedInteraction(item.fullname().clone()));
    }

    fn on_user_banned(&self, user: &Username) {
        self.events
            .lock()
            .unwrap()
            .push(HookEvent::Banned(user.clone()));
    }

    fn on_user_unbanned(&self, user: &Username) {
        self.events
            .lock()
            .unwrap()
            .push(HookEvent::Unbanned(user.clone()));
    }
}

// ─── Arbitraries ───

pub fn arb_fullname() -> impl Strategy<Value = Fullname> {
    "t[134]_[0-9a-z]{1,10}".prop_map(Fullname::new)
}

pub fn arb_username() -> impl Strategy<Value = Username> {
    "[A-Za-z0-9_-]{3,20}".prop_map(Username::new)
}
