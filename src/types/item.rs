//! Items fetched from the remote platform.
//!
//! Items are created by the transport and are read-only afterwards. The core
//! never mutates an item; handlers receive shared references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{Fullname, ThingKind, Username};

/// A comment in a monitored realm, or a comment reply in the inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub fullname: Fullname,
    /// `None` for deleted accounts.
    pub author: Option<Username>,
    pub body: String,
    /// The submission this comment belongs to.
    pub link_id: Fullname,
    /// The direct parent (a comment or the submission itself).
    pub parent_id: Fullname,
    pub created_utc: DateTime<Utc>,
}

/// A submission in a monitored realm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub fullname: Fullname,
    pub author: Option<Username>,
    pub title: String,
    /// Body of a self post; empty for link posts.
    #[serde(default)]
    pub selftext: String,
    pub created_utc: DateTime<Utc>,
}

/// A private message in the bot's inbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub fullname: Fullname,
    /// `None` for system-originated messages.
    pub author: Option<Username>,
    pub subject: String,
    pub body: String,
    pub created_utc: DateTime<Utc>,
}

/// Any item the dispatch engine can process.
///
/// Dispatch switches exhaustively over this type, so adding a kind is a
/// compile-time checked change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Item {
    Comment(Comment),
    Link(Link),
    Message(Message),
}

impl Item {
    pub fn fullname(&self) -> &Fullname {
        match self {
            Item::Comment(c) => &c.fullname,
            Item::Link(l) => &l.fullname,
            Item::Message(m) => &m.fullname,
        }
    }

    pub fn author(&self) -> Option<&Username> {
        match self {
            Item::Comment(c) => c.author.as_ref(),
            Item::Link(l) => l.author.as_ref(),
            Item::Message(m) => m.author.as_ref(),
        }
    }

    pub fn kind(&self) -> ThingKind {
        match self {
            Item::Comment(_) => ThingKind::Comment,
            Item::Link(_) => ThingKind::Link,
            Item::Message(_) => ThingKind::Message,
        }
    }

    /// The submission a flair effect applies to.
    ///
    /// Comments flair their parent link; a link flairs itself; messages have
    /// no link.
    pub fn link_for_flair(&self) -> Option<&Fullname> {
        match self {
            Item::Comment(c) => Some(&c.link_id),
            Item::Link(l) => Some(&l.fullname),
            Item::Message(_) => None,
        }
    }

    pub fn created_utc(&self) -> DateTime<Utc> {
        match self {
            Item::Comment(c) => c.created_utc,
            Item::Link(l) => l.created_utc,
            Item::Message(m) => m.created_utc,
        }
    }
}

impl From<Comment> for Item {
    fn from(c: Comment) -> Self {
        Item::Comment(c)
    }
}

impl From<Link> for Item {
    fn from(l: Link) -> Self {
        Item::Link(l)
    }
}

impl From<Message> for Item {
    fn from(m: Message) -> Self {
        Item::Message(m)
    }
}

/// An unread inbox entry.
///
/// The inbox mixes replies to the bot's comments with true private messages.
/// Only private messages are dispatched to handlers; comment replies are
/// logged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboxItem {
    CommentReply(Comment),
    Message(Message),
}

impl InboxItem {
    pub fn fullname(&self) -> &Fullname {
        match self {
            InboxItem::CommentReply(c) => &c.fullname,
            InboxItem::Message(m) => &m.fullname,
        }
    }
}
