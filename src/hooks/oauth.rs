//! Installing a hook takes a round trip through GitHub's OAuth consent page. We park the
//! request under a random state token, send the channel op a link, and finish the job when
//! GitHub redirects them back to `/auth`.
use anyhow::Context;
use html_escape::encode_text;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use reqwest::Url;
use serde::Deserialize;

use super::server::AppState;
use crate::config::GithubSettings;
use crate::formatting::bold;
use crate::github::{GithubClient, GithubError};
use crate::store::{PendingAuth, Store};

const STATE_LEN: usize = 32;

pub fn state_token() -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(STATE_LEN)
        .map(char::from)
        .collect()
}

/// Remember who asked for a hook and hand back the consent link for them to follow.
pub async fn begin(
    store: &dyn Store,
    github: &GithubClient,
    settings: &GithubSettings,
    pending: &PendingAuth,
) -> anyhow::Result<Url> {
    let (client_id, _) = settings
        .oauth_app()
        .context("GITHUB_CLIENT_ID and GITHUB_CLIENT_SECRET must be set to create hooks")?;
    let token = state_token();
    store
        .stash_pending(&token, pending, settings.auth_ttl)
        .await
        .context("unable to save the pending authorization")?;
    let url = github.authorize_url(client_id, &token, &settings.redirect_url())?;
    log::info!(
        "authorization for {} hook requested from {}",
        pending.repo,
        pending.channel
    );
    Ok(url)
}

#[derive(Debug, Default, Deserialize)]
pub struct Callback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// What the person who clicked the link sees when GitHub sends them back.
#[derive(Debug, PartialEq, Eq)]
pub struct Page {
    pub success: bool,
    pub title: &'static str,
    pub header: &'static str,
    pub body: String,
    pub flair: String,
}

impl Page {
    fn done(channel: &str) -> Self {
        Page {
            success: true,
            title: "Done!",
            header: "Webhook setup complete!",
            body: format!(
                "That was simple, right?! You should be seeing a completion message in {channel} any second now"
            ),
            flair: "There's no way it was that easy… things are never this easy…".to_string(),
        }
    }

    fn failed(channel: Option<&str>, reason: impl std::fmt::Display) -> Self {
        let body = match channel {
            Some(channel) => format!(
                "Please try using the link in {channel} again, something went wrong!"
            ),
            None => "Please ask for a new link in your channel, something went wrong!".to_string(),
        };
        Page {
            success: false,
            title: "Error!",
            header: "Webhook setup failed!",
            body,
            flair: reason.to_string(),
        }
    }

    pub fn html(&self) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
  <head>
    <title>{title}</title>
    <style>
      body {{
        width: 35em;
        margin: 0 auto;
        font-family: Tahoma, Verdana, Arial, sans-serif;
      }}
    </style>
  </head>
  <body>
    <h1>{header}</h1>
    <p>{body}</p>
    <small><em>{flair}</em></small>
  </body>
</html>
"#,
            title = encode_text(self.title),
            header = encode_text(self.header),
            body = encode_text(&self.body),
            flair = encode_text(&self.flair),
        )
    }
}

/// Exchange the code, create the hook, ping it, and tell the channel how it went.
pub async fn complete(state: &AppState, callback: Callback) -> Page {
    let Some(token) = callback.state.as_deref() else {
        return Page::failed(None, "GitHub didn't send back a state token.");
    };
    let pending = match state.store.take_pending(token).await {
        Ok(Some(pending)) => pending,
        Ok(None) => {
            return Page::failed(None, "That link has expired or was already used.");
        }
        Err(e) => {
            log::error!("unable to look up pending authorization: {e:#}");
            return Page::failed(None, "Something went wrong on our end.");
        }
    };

    let result = match (&callback.error, &callback.code) {
        (Some(error), _) => Err(GithubError::OAuth(format!(
            "{error}: {}",
            callback.error_description.as_deref().unwrap_or("authorization was refused")
        ))),
        (None, Some(code)) => install(state, &pending, code).await,
        (None, None) => Err(GithubError::OAuth("GitHub didn't send back a code.".to_string())),
    };

    let (page, announcement) = match result {
        Ok(()) => {
            log::info!("installed hook on {} for {}", pending.repo, pending.channel);
            (
                Page::done(&pending.channel),
                format!(
                    "{} Webhook for {} is set up. GitHub will ping it shortly.",
                    bold("[GitHub]"),
                    pending.repo
                ),
            )
        }
        Err(e) => {
            log::warn!("hook setup for {} failed: {e}", pending.repo);
            (
                Page::failed(Some(&pending.channel), &e),
                format!(
                    "{} Webhook setup for {} failed: {e}",
                    bold("[GitHub]"),
                    pending.repo
                ),
            )
        }
    };

    if let Err(e) = state.face.say(&pending.channel, &announcement).await {
        log::warn!("unable to report hook setup in {}: {e:#}", pending.channel);
    }
    page
}

async fn install(state: &AppState, pending: &PendingAuth, code: &str) -> Result<(), GithubError> {
    let token = state.github.exchange_code(code).await?;
    let settings = &state.settings;
    let hook = state
        .github
        .create_hook(
            &pending.repo,
            &token,
            &settings.callback_url(),
            settings.webhook_secret.as_deref(),
        )
        .await?;
    state.github.ping_hook(&hook, &token).await
}
