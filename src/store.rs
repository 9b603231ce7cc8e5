//! HUBCRAB's memory: which repo each channel cares about, which hooks each channel
//! subscribes to (and in what colors), and OAuth handshakes still in flight.
use anyhow::{Context, Result};
use async_once_cell::OnceCell;
use axum::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::refs::RepoRef;

/// Redis key prefix for channel → linked repo.
pub const LINKED: &str = "HC:LINKED";
/// Redis key prefix for repo → hash of channel → subscription.
pub const HOOKS: &str = "HC:HOOKS";
/// Redis key prefix for pending OAuth state tokens.
pub const PENDING: &str = "HC:PENDING";

/// mIRC color indices for the six parts of a hook message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookColors {
    pub repo: u8,
    pub name: u8,
    pub branch: u8,
    pub tag: u8,
    pub hash: u8,
    pub url: u8,
}

impl Default for HookColors {
    fn default() -> Self {
        HookColors {
            repo: 13,
            name: 15,
            branch: 6,
            tag: 6,
            hash: 14,
            url: 2,
        }
    }
}

impl HookColors {
    /// Colors in command order: repo, name, branch, tag, hash, url. Values wrap at 16.
    pub fn from_slice(colors: &[u8]) -> Option<Self> {
        match colors {
            [repo, name, branch, tag, hash, url] => Some(HookColors {
                repo: repo % 16,
                name: name % 16,
                branch: branch % 16,
                tag: tag % 16,
                hash: hash % 16,
                url: url % 16,
            }),
            _ => None,
        }
    }
}

/// A channel's interest in one repo's webhook events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub channel: String,
    pub repo: String,
    pub enabled: bool,
    #[serde(default)]
    pub colors: HookColors,
}

impl Subscription {
    pub fn new(channel: &str, repo: &RepoRef) -> Self {
        Subscription {
            channel: channel.to_lowercase(),
            repo: repo.key(),
            enabled: true,
            colors: HookColors::default(),
        }
    }
}

/// Someone asked for a hook and hasn't finished authorizing it yet.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAuth {
    pub channel: String,
    pub repo: RepoRef,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn linked_repo(&self, channel: &str) -> Result<Option<RepoRef>>;
    async fn link_repo(&self, channel: &str, repo: &RepoRef) -> Result<()>;
    /// Returns whether there was anything to clear.
    async fn unlink_repo(&self, channel: &str) -> Result<bool>;

    async fn subscription(&self, channel: &str, repo: &RepoRef) -> Result<Option<Subscription>>;
    async fn save_subscription(&self, subscription: &Subscription) -> Result<()>;
    /// Enabled subscriptions for a repo, across all channels.
    async fn subscribers(&self, repo: &RepoRef) -> Result<Vec<Subscription>>;

    async fn stash_pending(&self, token: &str, pending: &PendingAuth, ttl: Duration) -> Result<()>;
    /// Pending entries are single-use: taking one removes it.
    async fn take_pending(&self, token: &str) -> Result<Option<PendingAuth>>;
}

/// The store we use in production.
pub struct RedisStore {
    client: redis::Client,
    db: OnceCell<MultiplexedConnection>,
}

impl RedisStore {
    pub fn new(redis_uri: &str) -> Result<Self> {
        let client = redis::Client::open(redis_uri)
            .with_context(|| format!("Unable to create redis client @ {}", redis_uri))?;
        Ok(RedisStore {
            client,
            db: OnceCell::new(),
        })
    }

    /// Our persistent redis connection, made on first use.
    async fn redis(&self) -> Result<MultiplexedConnection> {
        let db = self
            .db
            .get_or_try_init(self.client.get_multiplexed_tokio_connection())
            .await
            .context("Unable to connect to redis")?;
        Ok(db.clone())
    }
}

#[async_trait]
impl Store for RedisStore {
    async fn linked_repo(&self, channel: &str) -> Result<Option<RepoRef>> {
        let mut r = self.redis().await?;
        let key = format!("{LINKED}:{}", channel.to_lowercase());
        let raw: Option<String> = r.get(&key).await?;
        Ok(raw.and_then(|s| s.parse().ok()))
    }

    async fn link_repo(&self, channel: &str, repo: &RepoRef) -> Result<()> {
        let mut r = self.redis().await?;
        let key = format!("{LINKED}:{}", channel.to_lowercase());
        r.set::<_, _, ()>(&key, repo.to_string()).await?;
        Ok(())
    }

    async fn unlink_repo(&self, channel: &str) -> Result<bool> {
        let mut r = self.redis().await?;
        let key = format!("{LINKED}:{}", channel.to_lowercase());
        let removed: u32 = r.del(&key).await?;
        Ok(removed > 0)
    }

    async fn subscription(&self, channel: &str, repo: &RepoRef) -> Result<Option<Subscription>> {
        let mut r = self.redis().await?;
        let key = format!("{HOOKS}:{}", repo.key());
        let raw: Option<String> = r.hget(&key, channel.to_lowercase()).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        let mut r = self.redis().await?;
        let key = format!("{HOOKS}:{}", subscription.repo);
        let json = serde_json::to_string(subscription)?;
        r.hset::<_, _, _, ()>(&key, &subscription.channel, json).await?;
        Ok(())
    }

    async fn subscribers(&self, repo: &RepoRef) -> Result<Vec<Subscription>> {
        let mut r = self.redis().await?;
        let key = format!("{HOOKS}:{}", repo.key());
        let all: HashMap<String, String> = r.hgetall(&key).await?;
        let mut subs: Vec<Subscription> = all
            .values()
            .filter_map(|json| match serde_json::from_str::<Subscription>(json) {
                Ok(sub) => Some(sub),
                Err(e) => {
                    log::warn!("skipping unreadable subscription in {key}: {e}");
                    None
                }
            })
            .filter(|sub| sub.enabled)
            .collect();
        subs.sort_by(|a, b| a.channel.cmp(&b.channel));
        Ok(subs)
    }

    async fn stash_pending(&self, token: &str, pending: &PendingAuth, ttl: Duration) -> Result<()> {
        let mut r = self.redis().await?;
        let key = format!("{PENDING}:{token}");
        let json = serde_json::to_string(pending)?;
        r.set_ex::<_, _, ()>(&key, json, ttl.as_secs().max(1) as usize).await?;
        Ok(())
    }

    async fn take_pending(&self, token: &str) -> Result<Option<PendingAuth>> {
        let mut r = self.redis().await?;
        let key = format!("{PENDING}:{token}");
        let (raw, _): (Option<String>, u32) = redis::pipe()
            .atomic()
            .get(&key)
            .del(&key)
            .query_async(&mut r)
            .await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[derive(Default)]
struct Memory {
    linked: HashMap<String, RepoRef>,
    hooks: HashMap<String, HashMap<String, Subscription>>,
    pending: HashMap<String, (PendingAuth, Instant)>,
}

/// Everything in a mutex. Fine for tests and for running without redis, but forgets on restart.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Memory>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Memory>> {
        self.inner
            .lock()
            .map_err(|_| anyhow::anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn linked_repo(&self, channel: &str) -> Result<Option<RepoRef>> {
        Ok(self.lock()?.linked.get(&channel.to_lowercase()).cloned())
    }

    async fn link_repo(&self, channel: &str, repo: &RepoRef) -> Result<()> {
        self.lock()?.linked.insert(channel.to_lowercase(), repo.clone());
        Ok(())
    }

    async fn unlink_repo(&self, channel: &str) -> Result<bool> {
        Ok(self.lock()?.linked.remove(&channel.to_lowercase()).is_some())
    }

    async fn subscription(&self, channel: &str, repo: &RepoRef) -> Result<Option<Subscription>> {
        Ok(self
            .lock()?
            .hooks
            .get(&repo.key())
            .and_then(|subs| subs.get(&channel.to_lowercase()))
            .cloned())
    }

    async fn save_subscription(&self, subscription: &Subscription) -> Result<()> {
        self.lock()?
            .hooks
            .entry(subscription.repo.clone())
            .or_default()
            .insert(subscription.channel.clone(), subscription.clone());
        Ok(())
    }

    async fn subscribers(&self, repo: &RepoRef) -> Result<Vec<Subscription>> {
        let memory = self.lock()?;
        let mut subs: Vec<Subscription> = memory
            .hooks
            .get(&repo.key())
            .map(|subs| subs.values().filter(|s| s.enabled).cloned().collect())
            .unwrap_or_default();
        subs.sort_by(|a, b| a.channel.cmp(&b.channel));
        Ok(subs)
    }

    async fn stash_pending(&self, token: &str, pending: &PendingAuth, ttl: Duration) -> Result<()> {
        let mut memory = self.lock()?;
        let now = Instant::now();
        memory.pending.retain(|_, (_, expires)| *expires > now);
        memory
            .pending
            .insert(token.to_string(), (pending.clone(), now + ttl));
        Ok(())
    }

    async fn take_pending(&self, token: &str) -> Result<Option<PendingAuth>> {
        let mut memory = self.lock()?;
        Ok(memory
            .pending
            .remove(token)
            .filter(|(_, expires)| *expires > Instant::now())
            .map(|(pending, _)| pending))
    }
}
