//! Loads a configuration directory from disk.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::settings::{BotConfig, Timing, TimingOverrides};
use super::set::{ConfigSet, parse_list, parse_template};
use super::{ConfigError, Result};
use crate::types::{Credentials, Realm, Username};

/// The main settings file inside a configuration directory.
pub const BOT_FILE: &str = "bot.toml";

const LISTS_DIR: &str = "lists";
const TEMPLATES_DIR: &str = "templates";
const DEFAULT_SEEN_FILE: &str = "seen.txt";

/// Top-level tables of `bot.toml` that are settings rather than groups.
const RESERVED_TABLES: &[&str] = &["timing"];

#[derive(Debug, Deserialize)]
struct BotFile {
    identity: String,
    realms: Vec<String>,
    credentials: Credentials,
    #[serde(default)]
    timing: TimingOverrides,
    /// Dedup store path, relative to the configuration directory.
    seen_file: Option<PathBuf>,
}

/// A fully loaded configuration directory.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub bot: BotConfig,
    pub resources: ConfigSet,
    /// Where the flat-file dedup store lives.
    pub seen_path: PathBuf,
}

/// Loads `bot.toml`, `lists/*.txt` and `templates/*.txt` from `dir`.
///
/// Environment overrides are not applied here; see
/// [`Timing::with_process_env`].
pub fn load_dir(dir: impl AsRef<Path>) -> Result<LoadedConfig> {
    let dir = dir.as_ref();
    let bot_path = dir.join(BOT_FILE);
    let text = read(&bot_path)?;

    let raw: BotFile = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: bot_path.clone(),
        source,
    })?;
    let table: toml::Table = toml::from_str(&text).map_err(|source| ConfigError::Toml {
        path: bot_path.clone(),
        source,
    })?;

    if raw.identity.trim().is_empty() {
        return Err(ConfigError::Invalid("identity must not be empty".into()));
    }
    if raw.realms.is_empty() {
        return Err(ConfigError::Invalid("at least one realm is required".into()));
    }

    let mut resources = ConfigSet::new();
    for (name, group) in groups(&table) {
        resources.insert_group(name, group);
    }
    for (name, text) in text_files(&dir.join(LISTS_DIR))? {
        resources.insert_list(name, parse_list(&text));
    }
    for (name, text) in text_files(&dir.join(TEMPLATES_DIR))? {
        resources.insert_template(name, parse_template(&text));
    }

    let bot = BotConfig {
        identity: Username::new(raw.identity.trim()),
        realms: raw.realms.iter().map(|r| Realm::new(r.trim())).collect(),
        credentials: raw.credentials,
        timing: Timing::new().with_overrides(&raw.timing),
    };
    let seen_path = dir.join(
        raw.seen_file
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SEEN_FILE)),
    );

    debug!(
        dir = %dir.display(),
        identity = %bot.identity,
        realms = bot.realms.len(),
        "loaded configuration"
    );
    Ok(LoadedConfig {
        bot,
        resources,
        seen_path,
    })
}

fn read(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Every non-reserved top-level table, with values rendered as strings.
fn groups(table: &toml::Table) -> Vec<(String, HashMap<String, String>)> {
    table
        .iter()
        .filter(|(name, _)| !RESERVED_TABLES.contains(&name.as_str()))
        .filter_map(|(name, value)| {
            let inner = value.as_table()?;
            let group = inner
                .iter()
                .map(|(k, v)| {
                    let rendered = match v {
                        toml::Value::String(s) => s.clone(),
                        other => other.to_string(),
                    };
                    (k.clone(), rendered)
                })
                .collect();
            Some((name.clone(), group))
        })
        .collect()
}

/// `(stem, contents)` of every `*.txt` file in `dir`; empty if `dir` does
/// not exist.
fn text_files(dir: &Path) -> Result<Vec<(String, String)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let entries = fs::read_dir(dir).map_err(|source| ConfigError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| ConfigError::Io {
                path: dir.to_path_buf(),
                source,
            })?
            .path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        files.push((stem.to_string(), read(&path)?));
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BANNED_LIST, ConfigSource};
    use std::time::Duration;
    use tempfile::tempdir;

    const BOT_TOML: &str = r#"
identity = "summon_bot"
realms = ["/r/books", "movies"]

[credentials]
username = "summon_bot"
password = "hunter2"
app_client_id = "id"
app_client_secret = "secret"

[timing]
poll_interval_secs = 45

[trigger]
phrase = "!summon"
cooldown = 3
"#;

    fn write_dir(files: &[(&str, &str)]) -> tempfile::TempDir {
        let dir = tempdir().unwrap();
        for (name, text) in files {
            let path = dir.path().join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, text).unwrap();
        }
        dir
    }

    #[test]
    fn loads_full_directory() {
        let dir = write_dir(&[
            (BOT_FILE, BOT_TOML),
            ("lists/banned.txt", "/u/Mallory\nEve\n"),
            ("templates/summon_reply.txt", "# comment\n\nHello <author>\n"),
        ]);

        let loaded = load_dir(dir.path()).unwrap();

        assert_eq!(loaded.bot.identity, Username::new("summon_bot"));
        assert_eq!(
            loaded.bot.realms,
            vec![Realm::new("books"), Realm::new("movies")]
        );
        assert_eq!(loaded.bot.credentials.password, "hunter2");
        assert_eq!(loaded.bot.timing.poll_interval, Duration::from_secs(45));
        assert_eq!(loaded.bot.timing.brief_pause, Duration::from_secs(5));
        assert_eq!(loaded.seen_path, dir.path().join("seen.txt"));

        let resources = &loaded.resources;
        assert_eq!(resources.list(BANNED_LIST), ["mallory", "eve"]);
        assert_eq!(resources.template("summon_reply"), Some("Hello <author>"));
        let trigger = resources.group("trigger").unwrap();
        assert_eq!(trigger["phrase"], "!summon");
        assert_eq!(trigger["cooldown"], "3");
        assert_eq!(resources.group("credentials").unwrap()["username"], "summon_bot");
        assert!(resources.group("timing").is_none());
    }

    #[test]
    fn missing_lists_and_templates_are_empty() {
        let dir = write_dir(&[(BOT_FILE, BOT_TOML)]);
        let loaded = load_dir(dir.path()).unwrap();
        assert!(loaded.resources.list(BANNED_LIST).is_empty());
        assert!(loaded.resources.template("summon_reply").is_none());
    }

    #[test]
    fn missing_bot_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_dir(dir.path()),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn missing_credential_field_is_a_parse_error() {
        let text = BOT_TOML.replace("app_client_secret = \"secret\"\n", "");
        let dir = write_dir(&[(BOT_FILE, &text)]);
        assert!(matches!(
            load_dir(dir.path()),
            Err(ConfigError::Toml { .. })
        ));
    }

    #[test]
    fn empty_realm_list_is_invalid() {
        let text = BOT_TOML.replace(r#"realms = ["/r/books", "movies"]"#, "realms = []");
        let dir = write_dir(&[(BOT_FILE, &text)]);
        assert!(matches!(
            load_dir(dir.path()),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn custom_seen_file() {
        let text = BOT_TOML.replace(
            "identity = \"summon_bot\"\n",
            "identity = \"summon_bot\"\nseen_file = \"state/seen.txt\"\n",
        );
        let dir = write_dir(&[(BOT_FILE, &text)]);
        let loaded = load_dir(dir.path()).unwrap();
        assert_eq!(loaded.seen_path, dir.path().join("state/seen.txt"));
    }
}
