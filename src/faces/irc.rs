use anyhow::{Context, Result};
use axum::async_trait;
use futures::prelude::*;
use irc::client::data::AccessLevel;
use irc::client::prelude::{Client, Command, Config as IrcConfig, Sender};

use super::Face;
use crate::config::IrcSettings;
use crate::formatting::one_line;
use crate::hubbot::{Hubbot, Prompt};

/// Speaks to IRC through a cloned sender, so hook workers can talk while the main loop listens.
#[derive(Clone)]
pub struct IrcFace {
    sender: Sender,
}

#[async_trait]
impl Face for IrcFace {
    async fn say(&self, channel: &str, text: &str) -> Result<()> {
        self.sender
            .send_privmsg(channel, one_line(text))
            .with_context(|| format!("unable to send to {channel}"))
    }
}

/// The IRC front end: a connected client with a HUBCRAB brain behind it.
pub struct HubbotIrc {
    client: Client,
    brain: Hubbot,
    admins: Vec<String>,
}

fn is_channel(target: &str) -> bool {
    target.starts_with(['#', '&', '+', '!'])
}

impl HubbotIrc {
    /// Connect and identify. Nothing is read until [`HubbotIrc::run`].
    pub async fn connect(settings: &IrcSettings, brain: Hubbot) -> Result<Self> {
        let config = IrcConfig {
            nickname: Some(settings.nickname.clone()),
            server: Some(settings.server.clone()),
            port: Some(settings.port),
            use_tls: Some(settings.use_tls),
            password: settings.password.clone(),
            channels: settings.channels.clone(),
            ..IrcConfig::default()
        };
        let client = Client::from_config(config)
            .await
            .with_context(|| format!("unable to connect to {}:{}", settings.server, settings.port))?;
        client.identify().context("unable to identify with the IRC server")?;
        log::info!(
            "HUBCRAB CONNECTED TO {}:{} AS {}",
            settings.server,
            settings.port,
            settings.nickname
        );
        Ok(HubbotIrc {
            client,
            brain,
            admins: settings.admins.iter().map(|a| a.to_lowercase()).collect(),
        })
    }

    pub fn face(&self) -> IrcFace {
        IrcFace {
            sender: self.client.sender(),
        }
    }

    /// Bot admins everywhere; ops, admins and owners in their own channel.
    fn privileged(&self, channel: Option<&str>, nick: &str) -> bool {
        if self.admins.contains(&nick.to_lowercase()) {
            return true;
        }
        let Some(channel) = channel else { return false };
        self.client
            .list_users(channel)
            .map(|users| {
                users.iter().any(|user| {
                    user.get_nickname().eq_ignore_ascii_case(nick)
                        && user.access_levels().iter().any(|level| {
                            matches!(
                                level,
                                AccessLevel::Owner | AccessLevel::Admin | AccessLevel::Oper
                            )
                        })
                })
            })
            .unwrap_or(false)
    }

    /// Read messages one at a time and answer them until the connection drops.
    pub async fn run(mut self) -> Result<()> {
        let face = self.face();
        let mut stream = self.client.stream().context("unable to read from IRC")?;

        while let Some(message) = stream.next().await.transpose()? {
            let Command::PRIVMSG(ref target, ref text) = message.command else {
                continue;
            };
            let Some(nick) = message.source_nickname() else {
                continue;
            };
            let channel = is_channel(target).then(|| target.as_str());
            let Some(reply_to) = message.response_target() else {
                continue;
            };

            let prompt = Prompt {
                channel: channel.map(str::to_string),
                nick: nick.to_string(),
                text: text.clone(),
                privileged: self.privileged(channel, nick),
            };
            for reply in self.brain.process(&prompt).await {
                log::info!("replying in {reply_to}: `{reply}`; prompt: `{text}`");
                if let Err(e) = face.say(reply_to, &reply).await {
                    log::error!("error trying to post message: {e:#}");
                }
            }
        }

        log::warn!("IRC connection closed");
        Ok(())
    }
}
