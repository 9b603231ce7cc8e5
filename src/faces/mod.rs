use axum::async_trait;

mod irc;
pub use self::irc::{HubbotIrc, IrcFace};

/// Something HUBCRAB can talk through. The brain decides what to say; a face knows how
/// to get it to a channel.
#[async_trait]
pub trait Face: Send + Sync {
    async fn say(&self, channel: &str, text: &str) -> anyhow::Result<()>;
}
