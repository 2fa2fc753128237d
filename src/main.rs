//! Replays a JSON file of items through the dispatch engine without touching
//! the platform, and prints which items would have produced a response.
//!
//! ```text
//! summon-bot <config-dir> <items.json>
//! ```
//!
//! Both paths may instead come from `SUMMON_BOT_CONFIG_DIR` and
//! `SUMMON_BOT_ITEMS`. The items file holds a JSON array of items tagged by
//! `kind` (`comment`, `link` or `message`).

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use summon_bot::config::{self, ConfigSource};
use summon_bot::dispatch::{DispatchEngine, DispatchOutcome};
use summon_bot::effects::DryRun;
use summon_bot::gate::BannedListGate;
use summon_bot::handlers::{HandlerRegistry, TRIGGER_GROUP, TriggerHandler};
use summon_bot::retry::Pacer;
use summon_bot::store::MemoryStore;
use summon_bot::telemetry;
use summon_bot::types::Item;

const CONFIG_DIR_ENV: &str = "SUMMON_BOT_CONFIG_DIR";
const ITEMS_ENV: &str = "SUMMON_BOT_ITEMS";

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init().context("failed to install log subscriber")?;

    let (config_dir, items_path) = paths()?;
    let mut loaded = config::load_dir(&config_dir)
        .with_context(|| format!("failed to load configuration from {}", config_dir.display()))?;
    loaded.bot.timing = loaded.bot.timing.with_process_env()?;

    let text = fs::read_to_string(&items_path)
        .with_context(|| format!("failed to read {}", items_path.display()))?;
    let items: Vec<Item> = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", items_path.display()))?;

    let resources = &loaded.resources;
    let registry = registry(resources)?;
    let gate = BannedListGate::from_config(resources);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal.cancel();
        }
    });

    let engine = DispatchEngine::new(
        &registry,
        &gate,
        &DryRun,
        resources,
        &loaded.bot.identity,
        Pacer::new(shutdown),
    )
    .with_pause(loaded.bot.timing.brief_pause);

    info!(items = items.len(), handlers = registry.len(), "replaying");
    let mut store = MemoryStore::new();
    let mut responded = 0;
    for item in &items {
        let outcome = engine.dispatch(item, &mut store).await?;
        if outcome.responded() {
            responded += 1;
        }
        println!("{}\t{}", item.fullname(), describe(outcome));
    }
    println!("{} of {} items would get a response", responded, items.len());
    Ok(())
}

fn paths() -> Result<(PathBuf, PathBuf)> {
    let mut args = std::env::args_os().skip(1);
    let config_dir = args
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_DIR_ENV).map(PathBuf::from));
    let items = args
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(ITEMS_ENV).map(PathBuf::from));

    match (config_dir, items) {
        (Some(config_dir), Some(items)) => Ok((config_dir, items)),
        _ => bail!("usage: summon-bot <config-dir> <items.json>"),
    }
}

fn registry(resources: &dyn ConfigSource) -> Result<HandlerRegistry> {
    let mut registry = HandlerRegistry::new();
    if resources.group(TRIGGER_GROUP).is_none() {
        warn!("no [{}] group configured; no handlers registered", TRIGGER_GROUP);
        return Ok(registry);
    }
    let trigger = TriggerHandler::from_config(resources)?;
    info!(phrase = trigger.phrase(), "registered trigger handler");
    registry
        .register_comment(trigger.clone())
        .register_link(trigger.clone())
        .register_message(trigger);
    Ok(registry)
}

fn describe(outcome: DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::AlreadySeen => "duplicate",
        DispatchOutcome::OwnItem => "own item",
        DispatchOutcome::Rejected => "banned author",
        DispatchOutcome::NoAuthor => "no author",
        DispatchOutcome::InteractionDenied => "interaction denied",
        DispatchOutcome::Handled { responded: true } => "would respond",
        DispatchOutcome::Handled { responded: false } => "no response",
    }
}
