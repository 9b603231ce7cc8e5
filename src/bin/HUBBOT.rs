//! HUBBOT: GitHub links in, summaries out. Optionally a webhook listener too.
#![allow(non_snake_case)]

use anyhow::{Context, Result};
use dotenv::dotenv;

use std::sync::Arc;

use HUBCRAB::hooks::{self, AppState, HookQueue};
use HUBCRAB::{Config, Face, GithubClient, Hubbot, HubbotIrc, MemoryStore, RedisStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    simple_logger::init_with_env().ok();

    let config = Config::from_env().context("unable to load configuration")?;

    let store: Arc<dyn Store> = match &config.redis_url {
        Some(redis_uri) => {
            log::info!("BRAIN @ {}", redis_uri);
            Arc::new(RedisStore::new(redis_uri)?)
        }
        None => {
            log::warn!("REDIS_URL is not set; channel settings will be forgotten on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let settings = Arc::new(config.github.clone());
    let github = GithubClient::new(&settings).context("unable to build the GitHub client")?;
    let brain = Hubbot::new(
        github.clone(),
        Arc::clone(&store),
        Arc::clone(&settings),
        &config.irc.command_prefix,
    );

    let irc = HubbotIrc::connect(&config.irc, brain).await?;

    if settings.webhook {
        let face: Arc<dyn Face> = Arc::new(irc.face());
        let (queue, _workers) =
            HookQueue::start(Arc::clone(&face), settings.hook_workers, settings.hook_queue);
        let state = AppState {
            settings: Arc::clone(&settings),
            store: Arc::clone(&store),
            github,
            face,
            queue,
        };
        tokio::spawn(async move {
            if let Err(e) = hooks::serve(state).await {
                log::error!("webhook listener failed: {e:#}");
            }
        });
    }

    irc.run().await
}
