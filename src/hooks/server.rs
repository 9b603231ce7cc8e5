use anyhow::Context;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;

use std::net::SocketAddr;
use std::sync::Arc;

use super::dispatch::{HookJob, HookQueue};
use super::oauth::{self, Callback};
use super::{signature, HookError};
use crate::config::GithubSettings;
use crate::faces::Face;
use crate::github::GithubClient;
use crate::refs::RepoRef;
use crate::store::Store;

/// Everything a request handler can reach.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<GithubSettings>,
    pub store: Arc<dyn Store>,
    pub github: GithubClient,
    pub face: Arc<dyn Face>,
    pub queue: HookQueue,
}

#[derive(Debug, Serialize)]
pub struct Delivered {
    pub channels: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    let path = state.settings.webhook_path.clone();
    Router::new()
        .route(&path, get(listening).post(incoming))
        .route("/auth", get(authorized))
        .with_state(state)
}

/// Listen until the process ends.
pub async fn serve(state: AppState) -> anyhow::Result<()> {
    let addr = SocketAddr::new(state.settings.webhook_host, state.settings.webhook_port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("unable to listen on {addr}"))?;
    log::info!(
        "HUBCRAB LISTENING FOR WEBHOOKS ON {addr}{}",
        state.settings.webhook_path
    );
    axum::serve(listener, router(state))
        .await
        .context("webhook server stopped")?;
    Ok(())
}

async fn listening() -> &'static str {
    "Listening for webhook connections!"
}

async fn incoming(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Delivered>, HookError> {
    if let Some(secret) = &state.settings.webhook_secret {
        let header = headers
            .get("x-hub-signature-256")
            .and_then(|v| v.to_str().ok());
        if let Err(e) = signature::verify(secret, &body, header) {
            log::warn!("rejecting webhook delivery: {e}");
            return Err(e);
        }
    }

    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("ping")
        .to_string();

    let payload: Value = serde_json::from_slice(&body).map_err(HookError::NotJson)?;
    let repo: RepoRef = payload
        .pointer("/repository/full_name")
        .and_then(Value::as_str)
        .and_then(|name| name.parse().ok())
        .ok_or(HookError::NoRepository)?;

    let subscriptions = match state.store.subscribers(&repo).await {
        Ok(subs) => subs,
        Err(e) => {
            log::error!("unable to look up subscribers for {repo}: {e:#}");
            Vec::new()
        }
    };
    let channels: Vec<String> = subscriptions.iter().map(|s| s.channel.clone()).collect();
    log::debug!("{event} delivery for {repo} goes to {channels:?}");

    if !subscriptions.is_empty() {
        state.queue.submit(HookJob {
            event,
            payload,
            subscriptions,
        });
    }

    Ok(Json(Delivered { channels }))
}

async fn authorized(State(state): State<AppState>, Query(callback): Query<Callback>) -> Html<String> {
    Html(oauth::complete(&state, callback).await.html())
}
