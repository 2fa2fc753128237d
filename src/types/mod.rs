//! Core domain types for the summon bot.
//!
//! Identifiers, the items fetched from the platform, and the login session.

pub mod ids;
pub mod item;
pub mod session;

pub use ids::{FlairTemplateId, Fullname, Realm, ThingKind, Username};
pub use item::{Comment, InboxItem, Item, Link, Message};
pub use session::{Credentials, LoginSession};
