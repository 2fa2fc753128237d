//! Summon Bot - a polling moderation bot core.
//!
//! The bot polls a social platform for new comments, submissions and
//! private messages, runs each unseen item past an interaction gate and a
//! list of pluggable handlers ("summons"), and applies the effects they
//! return (replies, flair, reports, bans, unbans, private messages) through
//! a retrying executor.
//!
//! The platform itself sits behind [`transport::Transport`].

pub mod config;
pub mod dispatch;
pub mod driver;
pub mod effects;
pub mod gate;
pub mod handlers;
pub mod hooks;
pub mod responses;
pub mod retry;
pub mod store;
pub mod telemetry;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;
