//! Ordered handler lists per item kind.

use super::Handler;
use crate::types::{Comment, Link, Message};

/// Handlers keyed by item kind, in registration order.
#[derive(Default)]
pub struct HandlerRegistry {
    comments: Vec<Box<dyn Handler<Comment>>>,
    links: Vec<Box<dyn Handler<Link>>>,
    messages: Vec<Box<dyn Handler<Message>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_comment(&mut self, handler: impl Handler<Comment> + 'static) -> &mut Self {
        self.comments.push(Box::new(handler));
        self
    }

    pub fn register_link(&mut self, handler: impl Handler<Link> + 'static) -> &mut Self {
        self.links.push(Box::new(handler));
        self
    }

    pub fn register_message(&mut self, handler: impl Handler<Message> + 'static) -> &mut Self {
        self.messages.push(Box::new(handler));
        self
    }

    pub fn comment_handlers(&self) -> &[Box<dyn Handler<Comment>>] {
        &self.comments
    }

    pub fn link_handlers(&self) -> &[Box<dyn Handler<Link>>] {
        &self.links
    }

    pub fn message_handlers(&self) -> &[Box<dyn Handler<Message>>] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.comments.len() + self.links.len() + self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names = |hs: Vec<&str>| hs.join(", ");
        f.debug_struct("HandlerRegistry")
            .field("comments", &names(self.comments.iter().map(|h| h.name()).collect()))
            .field("links", &names(self.links.iter().map(|h| h.name()).collect()))
            .field("messages", &names(self.messages.iter().map(|h| h.name()).collect()))
            .finish()
    }
}
