//! In-memory named resources.

use std::collections::HashMap;

use super::ConfigSource;
use crate::types::Username;

/// Lists, groups and templates held in memory.
///
/// The directory loader fills one from disk; tests build one directly.
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    lists: HashMap<String, Vec<String>>,
    groups: HashMap<String, HashMap<String, String>>,
    templates: HashMap<String, String>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a list, normalizing entries like a list file.
    pub fn with_list<I, S>(mut self, name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .filter_map(|e| normalize_entry(e.as_ref()))
            .collect();
        self.lists.insert(name.into(), entries);
        self
    }

    pub fn with_group<I, K, V>(mut self, name: impl Into<String>, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let group = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.groups.insert(name.into(), group);
        self
    }

    pub fn with_template(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.templates.insert(name.into(), text.into());
        self
    }

    pub(super) fn insert_list(&mut self, name: String, entries: Vec<String>) {
        self.lists.insert(name, entries);
    }

    pub(super) fn insert_group(&mut self, name: String, group: HashMap<String, String>) {
        self.groups.insert(name, group);
    }

    pub(super) fn insert_template(&mut self, name: String, text: String) {
        self.templates.insert(name, text);
    }
}

impl ConfigSource for ConfigSet {
    fn list(&self, name: &str) -> &[String] {
        self.lists.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    fn group(&self, name: &str) -> Option<&HashMap<String, String>> {
        self.groups.get(name)
    }

    fn template(&self, name: &str) -> Option<&str> {
        self.templates.get(name).map(String::as_str)
    }
}

fn normalize_entry(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(Username::new(line).normalized())
    }
}

/// Parses a list file: one entry per line, `/u/` stripped, lower-cased,
/// blank lines ignored.
pub fn parse_list(text: &str) -> Vec<String> {
    text.lines().filter_map(normalize_entry).collect()
}

/// Parses a template file.
///
/// Lines starting with `#` are comments. Blank lines before the first
/// content line are dropped; the rest are joined with `\n`.
pub fn parse_template(text: &str) -> String {
    text.lines()
        .filter(|line| !line.starts_with('#'))
        .skip_while(|line| line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_entries_are_normalized() {
        let entries = parse_list("/u/Alice\n\n  bob  \nu/CAROL\n");
        assert_eq!(entries, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn template_drops_comments_and_leading_blanks() {
        let text = "# reply sent when summoned\n\n\nHello <author>,\n\n# note\nthanks!\n";
        assert_eq!(parse_template(text), "Hello <author>,\n\nthanks!");
    }

    #[test]
    fn missing_resources() {
        let config = ConfigSet::new();
        assert!(config.list("banned").is_empty());
        assert!(config.group("credentials").is_none());
        assert!(config.template("reply").is_none());
    }

    #[test]
    fn list_contains_uses_normalized_entries() {
        let config = ConfigSet::new().with_list("banned", ["/u/Mallory"]);
        assert!(config.list_contains("banned", "mallory"));
        assert!(!config.list_contains("banned", "Mallory"));
    }

    #[test]
    fn groups_and_templates() {
        let config = ConfigSet::new()
            .with_group("trigger", [("phrase", "!summon")])
            .with_template("reply", "hi <author>");
        assert_eq!(
            config
                .group("trigger")
                .and_then(|g| g.get("phrase"))
                .map(String::as_str),
            Some("!summon")
        );
        assert_eq!(config.template("reply"), Some("hi <author>"));
    }
}
