//! The built-in trigger-phrase handler.
//!
//! Fires when an item's text contains the configured phrase (e.g.
//! `!summon`) and replies with a rendered template. Configured by the
//! `[trigger]` group:
//!
//! ```toml
//! [trigger]
//! phrase = "!summon"
//! template = "summon_reply"   # optional, defaults to "trigger_reply"
//! ```

use tracing::debug;

use super::{Handler, HandlerContext, HandlerError};
use crate::config::ConfigSource;
use crate::effects::Effect;
use crate::responses::{self, ExpectedKey, ResponseInfo};
use crate::types::{Comment, Fullname, Link, Message, Username};

/// Configuration group read by [`TriggerHandler::from_config`].
pub const TRIGGER_GROUP: &str = "trigger";

const DEFAULT_TEMPLATE: &str = "trigger_reply";

/// Finds `phrase` in `text`, case-insensitively, at a word boundary.
///
/// The match must not be preceded or followed by an alphanumeric character,
/// so `!summon` matches in `"hey !summon me"` but not in `"x!summoner"`.
pub fn contains_trigger(text: &str, phrase: &str) -> bool {
    if phrase.is_empty() {
        return false;
    }
    text.char_indices().any(|(pos, _)| {
        let Some(candidate) = text.get(pos..pos + phrase.len()) else {
            return false;
        };
        if !candidate.eq_ignore_ascii_case(phrase) {
            return false;
        }
        let left_ok = text[..pos]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let right_ok = text[pos + phrase.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        left_ok && right_ok
    })
}

/// Replies with a template to any item containing the trigger phrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerHandler {
    phrase: String,
    template: String,
}

impl TriggerHandler {
    /// Creates a handler replying with the template named `template`.
    pub fn new(phrase: impl Into<String>, template: impl Into<String>) -> Self {
        TriggerHandler {
            phrase: phrase.into(),
            template: template.into(),
        }
    }

    /// Builds the handler from the `[trigger]` group, checking that the reply
    /// template exists and uses only known keys.
    pub fn from_config(config: &dyn ConfigSource) -> Result<Self, HandlerError> {
        let group = config
            .group(TRIGGER_GROUP)
            .ok_or_else(|| HandlerError::MissingConfig(format!("[{}] group", TRIGGER_GROUP)))?;
        let phrase = group
            .get("phrase")
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| HandlerError::MissingConfig(format!("{}.phrase", TRIGGER_GROUP)))?;
        let template = group
            .get("template")
            .map(String::as_str)
            .unwrap_or(DEFAULT_TEMPLATE);

        let text = config
            .template(template)
            .ok_or_else(|| HandlerError::MissingConfig(format!("template {:?}", template)))?;
        responses::verify(text, &expected_keys()?)?;

        Ok(Self::new(phrase.trim(), template))
    }

    pub fn phrase(&self) -> &str {
        &self.phrase
    }

    fn respond(
        &self,
        fullname: &Fullname,
        author: Option<&Username>,
        config: &dyn ConfigSource,
    ) -> Result<Option<Effect>, HandlerError> {
        let template = config
            .template(&self.template)
            .ok_or_else(|| HandlerError::MissingConfig(format!("template {:?}", self.template)))?;
        let info = ResponseInfo::new()
            .with_text("author", author.map(Username::as_str).unwrap_or("[deleted]"))
            .with_text("fullname", fullname.as_str());
        let reply = responses::render(template, &info)?;
        debug!(fullname = %fullname, "trigger matched");
        Ok(Some(Effect::reply(reply)))
    }
}

fn expected_keys() -> Result<[ExpectedKey; 2], HandlerError> {
    Ok([
        ExpectedKey::new("author", "the user who posted the trigger")?,
        ExpectedKey::new("fullname", "the id of the item containing the trigger")?,
    ])
}

impl Handler<Comment> for TriggerHandler {
    fn name(&self) -> &str {
        "trigger"
    }

    fn probe(&self, item: &Comment, _config: &dyn ConfigSource) -> bool {
        contains_trigger(&item.body, &self.phrase)
    }

    fn handle(&self, item: &Comment, ctx: &mut HandlerContext<'_>) -> Result<Option<Effect>, HandlerError> {
        self.respond(&item.fullname, item.author.as_ref(), ctx.config)
    }
}

impl Handler<Link> for TriggerHandler {
    fn name(&self) -> &str {
        "trigger"
    }

    fn probe(&self, item: &Link, _config: &dyn ConfigSource) -> bool {
        contains_trigger(&item.title, &self.phrase) || contains_trigger(&item.selftext, &self.phrase)
    }

    fn handle(&self, item: &Link, ctx: &mut HandlerContext<'_>) -> Result<Option<Effect>, HandlerError> {
        self.respond(&item.fullname, item.author.as_ref(), ctx.config)
    }
}

impl Handler<Message> for TriggerHandler {
    fn name(&self) -> &str {
        "trigger"
    }

    fn probe(&self, item: &Message, _config: &dyn ConfigSource) -> bool {
        contains_trigger(&item.subject, &self.phrase) || contains_trigger(&item.body, &self.phrase)
    }

    fn handle(&self, item: &Message, ctx: &mut HandlerContext<'_>) -> Result<Option<Effect>, HandlerError> {
        self.respond(&item.fullname, item.author.as_ref(), ctx.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigSet;
    use crate::store::MemoryStore;
    use crate::test_utils::{comment, link, message};
    use proptest::prelude::*;

    fn config() -> ConfigSet {
        ConfigSet::new()
            .with_group(TRIGGER_GROUP, [("phrase", "!summon"), ("template", "reply")])
            .with_template("reply", "Hello <author>, you summoned me from <fullname>.")
    }

    // ─── Trigger matching ───

    #[test]
    fn matches_at_word_boundaries() {
        assert!(contains_trigger("!summon", "!summon"));
        assert!(contains_trigger("hey !summon me", "!summon"));
        assert!(contains_trigger("(!SUMMON)", "!summon"));
        assert!(contains_trigger("first line\n!Summon", "!summon"));
    }

    #[test]
    fn rejects_embedded_phrases() {
        assert!(!contains_trigger("x!summoner", "!summon"));
        assert!(!contains_trigger("!summoner", "!summon"));
        assert!(!contains_trigger("nothing here", "!summon"));
        assert!(!contains_trigger("anything", ""));
    }

    #[test]
    fn multibyte_text_does_not_panic() {
        assert!(contains_trigger("héllo ✨ !summon", "!summon"));
        assert!(!contains_trigger("✨✨✨", "!summon"));
    }

    proptest! {
        #[test]
        fn phrase_surrounded_by_spaces_always_matches(
            before in "[a-z ]{0,20}",
            after in "[a-z ]{0,20}",
        ) {
            let text = format!("{} !summon {}", before, after);
            prop_assert!(contains_trigger(&text, "!summon"));
        }

        #[test]
        fn text_without_bang_never_matches(text in "[a-zA-Z0-9 ,.]{0,64}") {
            prop_assert!(!contains_trigger(&text, "!summon"));
        }
    }

    // ─── Handler ───

    #[test]
    fn from_config_reads_group() {
        let handler = TriggerHandler::from_config(&config()).unwrap();
        assert_eq!(handler, TriggerHandler::new("!summon", "reply"));
    }

    #[test]
    fn from_config_requires_phrase_and_template() {
        let no_group = ConfigSet::new();
        assert!(matches!(
            TriggerHandler::from_config(&no_group),
            Err(HandlerError::MissingConfig(_))
        ));

        let no_template = ConfigSet::new().with_group(TRIGGER_GROUP, [("phrase", "!summon")]);
        assert!(matches!(
            TriggerHandler::from_config(&no_template),
            Err(HandlerError::MissingConfig(_))
        ));
    }

    #[test]
    fn from_config_rejects_unknown_template_keys() {
        let config = ConfigSet::new()
            .with_group(TRIGGER_GROUP, [("phrase", "!summon")])
            .with_template(DEFAULT_TEMPLATE, "Hi <author>, your balance is <balance>");
        assert!(matches!(
            TriggerHandler::from_config(&config),
            Err(HandlerError::Template(_))
        ));
    }

    #[test]
    fn comment_reply_is_rendered() {
        let config = config();
        let handler = TriggerHandler::from_config(&config).unwrap();
        let mut store = MemoryStore::new();
        let identity = Username::new("summon_bot");
        let mut ctx = HandlerContext {
            store: &mut store,
            config: &config,
            identity: &identity,
        };
        let item = comment("t1_c", "alice", "please !summon", "t3_p");

        assert!(Handler::<Comment>::probe(&handler, &item, &config));
        let effect = Handler::<Comment>::handle(&handler, &item, &mut ctx).unwrap();

        assert_eq!(
            effect,
            Some(Effect::reply("Hello alice, you summoned me from t1_c."))
        );
    }

    #[test]
    fn link_probe_checks_title_and_selftext() {
        let config = config();
        let handler = TriggerHandler::from_config(&config).unwrap();
        let mut item = link("t3_a", "alice", "Book request");
        assert!(!Handler::<Link>::probe(&handler, &item, &config));
        item.selftext = "!summon please".into();
        assert!(Handler::<Link>::probe(&handler, &item, &config));
    }

    #[test]
    fn message_without_author_renders_placeholder() {
        let config = config();
        let handler = TriggerHandler::from_config(&config).unwrap();
        let mut store = MemoryStore::new();
        let identity = Username::new("summon_bot");
        let mut ctx = HandlerContext {
            store: &mut store,
            config: &config,
            identity: &identity,
        };
        let item = message("t4_m", None, "!summon");

        let effect = Handler::<Message>::handle(&handler, &item, &mut ctx).unwrap();
        assert_eq!(
            effect.and_then(|e| e.reply),
            Some("Hello [deleted], you summoned me from t4_m.".to_string())
        );
    }
}
