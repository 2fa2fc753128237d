//! The remote platform as seen by the core.
//!
//! The HTTP session, JSON parsing and authentication mechanics live behind
//! [`Transport`]. The core only sequences calls, retries them, and decides
//! what a failure means.
//!
//! Implementations hold whatever session state the platform needs:
//! [`Transport::login`] installs a fresh credential and reports its lifetime
//! so the poll loop can refresh it before expiry.

use std::future::Future;

mod error;

pub use error::{ApiErrorEntry, TOO_OLD, TransportError, TransportErrorKind};

use crate::effects::BanRequest;
use crate::types::{
    Comment, Credentials, FlairTemplateId, Fullname, InboxItem, Link, LoginSession, Realm,
    Username,
};

/// Result type for transport calls.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Remote operations consumed by the poll loop, the dispatch engine and the
/// effect applier.
///
/// Every call may fail transiently (network, parse) or terminally (forbidden,
/// rejected); see [`TransportErrorKind`].
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct EmptyRealm;
///
/// impl Transport for EmptyRealm {
///     async fn fetch_new_comments(&self, _realm: &Realm) -> Result<Vec<Comment>> {
///         Ok(Vec::new())
///     }
///     // ...
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Logs in and installs the resulting credential for subsequent calls.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginSession>> + Send;

    /// Newest comments in `realm`, newest first.
    fn fetch_new_comments(&self, realm: &Realm)
    -> impl Future<Output = Result<Vec<Comment>>> + Send;

    /// Newest submissions in `realm`, newest first.
    fn fetch_new_submissions(
        &self,
        realm: &Realm,
    ) -> impl Future<Output = Result<Vec<Link>>> + Send;

    /// Unread inbox entries (comment replies and private messages).
    fn fetch_unread_messages(&self) -> impl Future<Output = Result<Vec<InboxItem>>> + Send;

    /// Marks inbox entries as read.
    fn mark_read(&self, ids: &[Fullname]) -> impl Future<Output = Result<()>> + Send;

    /// Posts `text` as a reply to `parent`.
    fn reply(&self, parent: &Fullname, text: &str) -> impl Future<Output = Result<()>> + Send;

    /// Applies a link flair template to a submission.
    fn flair_link(
        &self,
        link: &Fullname,
        template: &FlairTemplateId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Reports a thing to the realm's moderators.
    fn report(&self, thing: &Fullname, reason: &str) -> impl Future<Output = Result<()>> + Send;

    /// Whether `user` is currently banned from `realm`.
    fn is_banned(&self, realm: &Realm, user: &Username)
    -> impl Future<Output = Result<bool>> + Send;

    /// Whether `user` moderates `realm`.
    fn is_moderator(
        &self,
        realm: &Realm,
        user: &Username,
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Bans `request.user` from `realm`.
    fn ban(&self, realm: &Realm, request: &BanRequest) -> impl Future<Output = Result<()>> + Send;

    /// Lifts a ban on `user` in `realm`.
    fn unban(&self, realm: &Realm, user: &Username) -> impl Future<Output = Result<()>> + Send;

    /// Sends a private message.
    ///
    /// A delivered request can still be refused; the returned list carries the
    /// platform's errors and is empty on success.
    fn send_message(
        &self,
        to: &Username,
        title: &str,
        body: &str,
    ) -> impl Future<Output = Result<Vec<ApiErrorEntry>>> + Send;
}
