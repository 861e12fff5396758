use std::sync::Arc;

use keyword_relay::channels::{DiscordForwarder, StdinSource, StdoutForwarder};
use keyword_relay::config::RelayConfig;
use keyword_relay::pipeline::{Dispatcher, Forwarder};
use keyword_relay::relay::Relay;
use keyword_relay::rules::{JsonFilePersistence, RuleStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (stderr, so stdout stays for replies)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = RelayConfig::from_env()?;

    eprintln!("📡 Keyword Relay v{}", env!("CARGO_PKG_VERSION"));

    // ── Rules ───────────────────────────────────────────────────────────
    // A malformed rules file is fatal; a missing one starts empty.
    let persistence = Arc::new(JsonFilePersistence::new(config.rules_file.clone()));
    eprintln!("   Rules file: {}", persistence.path().display());
    let store = Arc::new(RuleStore::load(persistence).await?);
    let rule_count: usize = store.list_rules().await.values().map(Vec::len).sum();
    eprintln!("   Rules: {rule_count} loaded");

    // ── Forwarder ───────────────────────────────────────────────────────
    let mut self_id = config.self_id;
    let forwarder: Arc<dyn Forwarder> = match config.discord_token.clone() {
        Some(token) => {
            let discord = DiscordForwarder::with_api_base(token, config.discord_api_base.clone());
            if self_id.is_none() {
                self_id = Some(discord.fetch_self_id().await?);
            }
            eprintln!("   Forwarder: discord ({})", config.discord_api_base);
            Arc::new(discord)
        }
        None => {
            eprintln!("   Forwarder: stdout (DISCORD_BOT_TOKEN not set)");
            Arc::new(StdoutForwarder::new())
        }
    };

    let mut dispatcher = Dispatcher::new(Arc::clone(&store), forwarder);
    if let Some(id) = self_id {
        eprintln!("   Relay identity: {id}");
        dispatcher = dispatcher.with_self_id(id);
    }

    eprintln!("   Input: stdin (/commands or Discord message JSON per line)\n");

    let relay = Relay::new(Arc::new(dispatcher));
    relay.run(&StdinSource::new()).await?;

    Ok(())
}
