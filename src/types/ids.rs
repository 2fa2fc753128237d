//! Newtype wrappers for remote identifiers.
//!
//! These types prevent accidental mixing of different identifier kinds (e.g.,
//! passing a realm name where a fullname is expected) and make the code more
//! self-documenting.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind prefix of a fullname (`t1_`, `t3_`, `t4_`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThingKind {
    /// `t1_`: a comment.
    Comment,
    /// `t3_`: a link / submission.
    Link,
    /// `t4_`: a private message.
    Message,
}

impl ThingKind {
    /// Returns the fullname prefix for this kind, including the underscore.
    pub fn prefix(&self) -> &'static str {
        match self {
            ThingKind::Comment => "t1_",
            ThingKind::Link => "t3_",
            ThingKind::Message => "t4_",
        }
    }
}

/// The stable, opaque identifier of a remote item.
///
/// Fullnames are the unit of deduplication: once a fullname has been claimed
/// it is never handed to a handler again.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fullname(String);

impl Fullname {
    /// Creates a fullname from a string.
    ///
    /// Note: This does not validate the prefix. Use [`Fullname::kind`] to
    /// inspect it.
    pub fn new(s: impl Into<String>) -> Self {
        Fullname(s.into())
    }

    /// Builds a fullname from a kind and a base-36 id (`kind.prefix() + id`).
    pub fn from_parts(kind: ThingKind, id: &str) -> Self {
        Fullname(format!("{}{}", kind.prefix(), id))
    }

    /// Returns the fullname as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the kind encoded in the prefix, if it is a known one.
    pub fn kind(&self) -> Option<ThingKind> {
        [ThingKind::Comment, ThingKind::Link, ThingKind::Message]
            .into_iter()
            .find(|kind| self.0.starts_with(kind.prefix()))
    }

    /// Returns the id part after the kind prefix, or the whole string if the
    /// prefix is not recognized.
    pub fn id(&self) -> &str {
        match self.kind() {
            Some(kind) => &self.0[kind.prefix().len()..],
            None => &self.0,
        }
    }
}

impl fmt::Display for Fullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Fullname {
    fn from(s: String) -> Self {
        Fullname(s)
    }
}

impl From<&str> for Fullname {
    fn from(s: &str) -> Self {
        Fullname(s.to_string())
    }
}

/// An account name on the remote platform.
///
/// Usernames are case-insensitive on the platform. The stored form keeps the
/// original casing for display; comparisons go through [`Username::matches`]
/// or [`Username::normalized`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Creates a username, stripping a leading `/u/` or `u/` if present.
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        let stripped = s
            .strip_prefix("/u/")
            .or_else(|| s.strip_prefix("u/"))
            .map(str::to_string);
        Username(stripped.unwrap_or(s))
    }

    /// Returns the username as given (minus any `/u/` prefix).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the lower-cased form used for list membership and storage.
    pub fn normalized(&self) -> String {
        self.0.to_lowercase()
    }

    /// Case-insensitive comparison against another username.
    pub fn matches(&self, other: &Username) -> bool {
        self.0.eq_ignore_ascii_case(&other.0) || self.normalized() == other.normalized()
    }
}

impl PartialEq for Username {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Username {}

impl std::hash::Hash for Username {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/u/{}", self.0)
    }
}

impl From<&str> for Username {
    fn from(s: &str) -> Self {
        Username::new(s)
    }
}

impl From<String> for Username {
    fn from(s: String) -> Self {
        Username::new(s)
    }
}

/// A monitored community (subreddit) the bot moderates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Realm(String);

impl Realm {
    /// Creates a realm, stripping a leading `/r/` or `r/` if present.
    pub fn new(s: impl Into<String>) -> Self {
        let s = s.into();
        let stripped = s
            .strip_prefix("/r/")
            .or_else(|| s.strip_prefix("r/"))
            .map(str::to_string);
        Realm(stripped.unwrap_or(s))
    }

    /// Joins several realms into the combined listing form (`a+b+c`).
    ///
    /// Fetching new items from the combined realm returns items from every
    /// member realm in one listing.
    pub fn combined(realms: &[Realm]) -> Realm {
        Realm(
            realms
                .iter()
                .map(Realm::as_str)
                .collect::<Vec<_>>()
                .join("+"),
        )
    }

    /// Returns the realm name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Realm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/r/{}", self.0)
    }
}

impl From<&str> for Realm {
    fn from(s: &str) -> Self {
        Realm::new(s)
    }
}

/// A link flair template id, as returned by the platform's flair selector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FlairTemplateId(pub String);

impl FlairTemplateId {
    pub fn new(s: impl Into<String>) -> Self {
        FlairTemplateId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlairTemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FlairTemplateId {
    fn from(s: &str) -> Self {
        FlairTemplateId(s.to_string())
    }
}
