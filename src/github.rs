//! A small GitHub REST client: just the handful of endpoints the bot reads, plus
//! what it takes to install a webhook on someone's behalf.
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use std::collections::BTreeMap;

use crate::config::GithubSettings;
use crate::refs::{IssueRef, RepoRef};

pub const API_VERSION: &str = "2022-11-28";
/// The only scope we ask for when installing hooks.
pub const HOOK_SCOPE: &str = "write:repo_hook";

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("not found")]
    NotFound,
    #[error("rate limited or forbidden ({0})")]
    RateLimited(StatusCode),
    #[error("GitHub returned {status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("unexpected response shape: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("bad URL: {0}")]
    Url(String),
    #[error("{0}")]
    OAuth(String),
}

#[derive(Clone, Debug, Deserialize)]
pub struct User {
    pub login: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PullRequestMarker {
    pub merged_at: Option<DateTime<Utc>>,
}

/// An issue, or a pull request seen through the issues endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
    pub state: String,
    pub body: Option<String>,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub html_url: String,
    pub pull_request: Option<PullRequestMarker>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct IssueComment {
    pub body: Option<String>,
    pub user: User,
    pub created_at: DateTime<Utc>,
    pub html_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Signature {
    pub name: String,
    pub date: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitDetail {
    pub message: String,
    pub author: Signature,
    pub committer: Signature,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitStats {
    pub total: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Commit {
    pub sha: String,
    pub commit: CommitDetail,
    pub author: Option<User>,
    pub stats: CommitStats,
    #[serde(default)]
    pub files: Vec<Value>,
}

/// A single file from the contents endpoint. Directories come back as arrays and are
/// filtered out before we get here.
#[derive(Clone, Debug, Deserialize)]
pub struct FileContents {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Repository {
    pub full_name: String,
    pub description: Option<String>,
    pub pushed_at: Option<DateTime<Utc>>,
    pub stargazers_count: u64,
    #[serde(default)]
    pub subscribers_count: u64,
    pub forks_count: u64,
    #[serde(default)]
    pub network_count: u64,
    pub open_issues: u64,
    pub html_url: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RateLimitWindow {
    pub limit: u64,
    pub remaining: u64,
    pub reset: i64,
}

#[derive(Clone, Debug, Deserialize)]
struct RateLimitResponse {
    rate: RateLimitWindow,
}

#[derive(Clone, Debug, Deserialize)]
struct StatusIndicator {
    description: String,
}

#[derive(Clone, Debug, Deserialize)]
struct StatusResponse {
    status: StatusIndicator,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    scope: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
struct HookConfig<'a> {
    url: &'a str,
    content_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    secret: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct NewHook<'a> {
    name: &'static str,
    active: bool,
    events: [&'static str; 1],
    config: HookConfig<'a>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Hook {
    pub id: u64,
    pub ping_url: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Our handle on the GitHub API. Cheap to clone; clones share a connection pool.
#[derive(Clone, Debug)]
pub struct GithubClient {
    http: reqwest::Client,
    api: Url,
    web: Url,
    status: Url,
    credentials: Option<(String, String)>,
}

impl GithubClient {
    pub fn new(settings: &GithubSettings) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let agent = format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&agent).map_err(|e| GithubError::Url(e.to_string()))?,
        );

        let http = reqwest::Client::builder().default_headers(headers).build()?;

        let credentials = settings
            .oauth_app()
            .map(|(id, secret)| (id.to_string(), secret.to_string()));

        Ok(GithubClient {
            http,
            api: parse_base(&settings.api_url)?,
            web: parse_base(&settings.web_url)?,
            status: parse_base(&settings.status_url)?,
            credentials,
        })
    }

    fn endpoint(&self, base: &Url, path: &str) -> Result<Url, GithubError> {
        base.join(path.trim_start_matches('/'))
            .map_err(|e| GithubError::Url(format!("{path}: {e}")))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some((id, secret)) => request.basic_auth(id, Some(secret)),
            None => request,
        }
    }

    /// Fetch and decode. Every read goes through here so error handling stays uniform.
    async fn fetch<T: DeserializeOwned>(&self, url: Url) -> Result<T, GithubError> {
        log::debug!("GET {url}");
        let response = self.authorized(self.http.get(url)).send().await?;
        decode(response).await
    }

    pub async fn issue(&self, issue: &IssueRef) -> Result<Issue, GithubError> {
        let url = self.endpoint(
            &self.api,
            &format!("repos/{}/issues/{}", issue.repo, issue.number),
        )?;
        self.fetch(url).await
    }

    pub async fn issue_comment(&self, repo: &RepoRef, id: u64) -> Result<IssueComment, GithubError> {
        let url = self.endpoint(&self.api, &format!("repos/{repo}/issues/comments/{id}"))?;
        self.fetch(url).await
    }

    pub async fn commit(&self, repo: &RepoRef, sha: &str) -> Result<Commit, GithubError> {
        let url = self.endpoint(&self.api, &format!("repos/{repo}/commits/{sha}"))?;
        self.fetch(url).await
    }

    /// File contents at a ref. `Ok(None)` means the path is a directory or something
    /// else that isn't a plain file.
    pub async fn file(
        &self,
        repo: &RepoRef,
        path: &str,
        git_ref: &str,
    ) -> Result<Option<FileContents>, GithubError> {
        let mut url = self.endpoint(&self.api, &format!("repos/{repo}/contents/{path}"))?;
        url.query_pairs_mut().append_pair("ref", git_ref);
        let value: Value = self.fetch(url).await?;
        if value.get("type").and_then(Value::as_str) != Some("file") {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(value)?))
    }

    pub async fn repository(&self, repo: &RepoRef) -> Result<Repository, GithubError> {
        let url = self.endpoint(&self.api, &format!("repos/{repo}"))?;
        self.fetch(url).await
    }

    /// Bytes of code per language.
    pub async fn languages(&self, repo: &RepoRef) -> Result<BTreeMap<String, u64>, GithubError> {
        let url = self.endpoint(&self.api, &format!("repos/{repo}/languages"))?;
        self.fetch(url).await
    }

    pub async fn rate_limit(&self) -> Result<RateLimitWindow, GithubError> {
        let url = self.endpoint(&self.api, "rate_limit")?;
        let response: RateLimitResponse = self.fetch(url).await?;
        Ok(response.rate)
    }

    /// The one-line summary from githubstatus.com.
    pub async fn service_status(&self) -> Result<String, GithubError> {
        let url = self.endpoint(&self.status, "api/v2/status.json")?;
        let response = self.http.get(url).send().await?;
        let status: StatusResponse = decode(response).await?;
        Ok(status.status.description)
    }

    /// Where to send a channel op so they can let us install a hook.
    pub fn authorize_url(
        &self,
        client_id: &str,
        state: &str,
        redirect: &str,
    ) -> Result<Url, GithubError> {
        let mut url = self.endpoint(&self.web, "login/oauth/authorize")?;
        url.query_pairs_mut()
            .append_pair("client_id", client_id)
            .append_pair("scope", HOOK_SCOPE)
            .append_pair("state", state)
            .append_pair("redirect_uri", redirect);
        Ok(url)
    }

    /// Trade an OAuth callback code for a token that can manage repo hooks.
    pub async fn exchange_code(&self, code: &str) -> Result<String, GithubError> {
        let Some((id, secret)) = &self.credentials else {
            return Err(GithubError::OAuth("no OAuth client is configured".to_string()));
        };
        let url = self.endpoint(&self.web, "login/oauth/access_token")?;
        let params = [("client_id", id.as_str()), ("client_secret", secret.as_str()), ("code", code)];
        let response = self
            .http
            .post(url)
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;
        let token: TokenResponse = decode(response).await?;

        if let Some(error) = token.error {
            let description = token.error_description.unwrap_or_default();
            return Err(GithubError::OAuth(format!("{error}: {description}")));
        }
        let Some(scope) = token.scope else {
            return Err(GithubError::OAuth(
                "You've already completed authorization on this repo".to_string(),
            ));
        };
        if !scope.split(',').any(|s| s.trim() == HOOK_SCOPE) {
            return Err(GithubError::OAuth(
                "You didn't allow read/write on repo hooks!".to_string(),
            ));
        }
        token
            .access_token
            .ok_or_else(|| GithubError::OAuth("GitHub sent no access token".to_string()))
    }

    /// Install a webhook that sends every event to `callback`.
    pub async fn create_hook(
        &self,
        repo: &RepoRef,
        token: &str,
        callback: &str,
        secret: Option<&str>,
    ) -> Result<Hook, GithubError> {
        let url = self.endpoint(&self.api, &format!("repos/{repo}/hooks"))?;
        let hook = NewHook {
            name: "web",
            active: true,
            events: ["*"],
            config: HookConfig {
                url: callback,
                content_type: "json",
                secret,
            },
        };
        let response = self.http.post(url).bearer_auth(token).json(&hook).send().await?;
        decode(response).await
    }

    /// Ask GitHub to send the new hook its ping event.
    pub async fn ping_hook(&self, hook: &Hook, token: &str) -> Result<(), GithubError> {
        let url = Url::parse(&hook.ping_url).map_err(|e| GithubError::Url(e.to_string()))?;
        let response = self.http.post(url).bearer_auth(token).send().await?;
        check(response).await.map(|_| ())
    }
}

fn parse_base(raw: &str) -> Result<Url, GithubError> {
    let with_slash = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    Url::parse(&with_slash).map_err(|e| GithubError::Url(format!("{raw}: {e}")))
}

/// Map non-2xx statuses onto our error kinds, pulling GitHub's message out when it sends one.
async fn check(response: reqwest::Response) -> Result<reqwest::Response, GithubError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match status {
        StatusCode::NOT_FOUND => Err(GithubError::NotFound),
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
            Err(GithubError::RateLimited(status))
        }
        _ => {
            let text = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ErrorBody>(&text) {
                Ok(body) => {
                    let details: Vec<String> =
                        body.errors.into_iter().filter_map(|e| e.message).collect();
                    if details.is_empty() {
                        body.message.unwrap_or_else(|| status.to_string())
                    } else {
                        details.join(", ")
                    }
                }
                Err(_) => status.to_string(),
            };
            Err(GithubError::Api { status, message })
        }
    }
}

async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GithubError> {
    let response = check(response).await?;
    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings(server: &MockServer) -> GithubSettings {
        GithubSettings {
            api_url: server.uri(),
            web_url: server.uri(),
            status_url: server.uri(),
            ..GithubSettings::default()
        }
    }

    fn issue_json() -> Value {
        serde_json::json!({
            "number": 42,
            "title": "Add a thing",
            "state": "closed",
            "body": "It adds the thing.",
            "user": { "login": "dgw" },
            "created_at": "2024-01-02T03:04:05Z",
            "html_url": "https://github.com/sopel-irc/sopel-github/pull/42",
            "pull_request": { "merged_at": "2024-01-03T00:00:00Z" }
        })
    }

    #[tokio::test]
    async fn fetches_issues_with_version_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/sopel-irc/sopel-github/issues/42"))
            .and(header("X-GitHub-Api-Version", API_VERSION))
            .respond_with(ResponseTemplate::new(200).set_body_json(issue_json()))
            .expect(1)
            .mount(&server)
            .await;

        let client = GithubClient::new(&settings(&server)).unwrap();
        let issue = client
            .issue(&IssueRef::new(RepoRef::new("sopel-irc", "sopel-github"), 42))
            .await
            .unwrap();
        assert_eq!(issue.title, "Add a thing");
        assert!(issue.pull_request.and_then(|p| p.merged_at).is_some());
    }

    #[tokio::test]
    async fn uses_basic_auth_when_configured() {
        let server = MockServer::start().await;
        // "id:secret" in base64
        Mock::given(method("GET"))
            .and(path("/repos/o/r/issues/1"))
            .and(header("authorization", "Basic aWQ6c2VjcmV0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(issue_json()))
            .expect(1)
            .mount(&server)
            .await;

        let mut settings = settings(&server);
        settings.client_id = Some("id".to_string());
        settings.client_secret = Some("secret".to_string());
        let client = GithubClient::new(&settings).unwrap();
        assert!(client.issue(&IssueRef::new(RepoRef::new("o", "r"), 1)).await.is_ok());
    }

    #[tokio::test]
    async fn error_statuses_are_classified() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"message": "Not Found"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/limited"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/broken"))
            .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({"message": "oops"})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = GithubClient::new(&settings(&server)).unwrap();
        assert!(matches!(
            client.repository(&RepoRef::new("o", "missing")).await,
            Err(GithubError::NotFound)
        ));
        assert!(matches!(
            client.repository(&RepoRef::new("o", "limited")).await,
            Err(GithubError::RateLimited(_))
        ));
        match client.repository(&RepoRef::new("o", "broken")).await {
            Err(GithubError::Api { message, .. }) => assert_eq!(message, "oops"),
            other => panic!("expected an API error, got {other:?}"),
        }
        assert!(matches!(
            client.repository(&RepoRef::new("o", "garbage")).await,
            Err(GithubError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn directories_are_not_files() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/contents/src"))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([{"type": "file"}])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/contents/README.md"))
            .and(query_param("ref", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "type": "file",
                "path": "README.md",
                "content": "aGVsbG8K"
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(&settings(&server)).unwrap();
        let repo = RepoRef::new("o", "r");
        assert!(client.file(&repo, "src", "main").await.unwrap().is_none());
        let file = client.file(&repo, "README.md", "main").await.unwrap().unwrap();
        assert_eq!(file.path, "README.md");
    }

    #[tokio::test]
    async fn oauth_exchange_checks_scope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=good"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "scope": "write:repo_hook",
                "token_type": "bearer"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=narrow"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "scope": "repo:status",
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/oauth/access_token"))
            .and(body_string_contains("code=stale"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "error": "bad_verification_code",
                "error_description": "The code passed is incorrect or expired.",
            })))
            .mount(&server)
            .await;

        let mut settings = settings(&server);
        settings.client_id = Some("id".to_string());
        settings.client_secret = Some("secret".to_string());
        let client = GithubClient::new(&settings).unwrap();

        assert_eq!(client.exchange_code("good").await.unwrap(), "tok");
        assert!(matches!(client.exchange_code("narrow").await, Err(GithubError::OAuth(_))));
        match client.exchange_code("stale").await {
            Err(GithubError::OAuth(msg)) => assert!(msg.starts_with("bad_verification_code")),
            other => panic!("expected an OAuth error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn hook_creation_reports_github_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/repos/o/r/hooks"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "message": "Validation Failed",
                "errors": [{ "message": "Hook already exists on this repository" }]
            })))
            .mount(&server)
            .await;

        let client = GithubClient::new(&settings(&server)).unwrap();
        match client
            .create_hook(&RepoRef::new("o", "r"), "tok", "https://bot.example/webhook", None)
            .await
        {
            Err(GithubError::Api { message, .. }) => {
                assert_eq!(message, "Hook already exists on this repository")
            }
            other => panic!("expected an API error, got {other:?}"),
        }
    }

    #[test]
    fn authorize_url_carries_state() {
        let settings = GithubSettings::default();
        let client = GithubClient::new(&settings).unwrap();
        let url = client
            .authorize_url("abc", "s3cr3t", "https://bot.example/auth")
            .unwrap();
        assert!(url.as_str().starts_with("https://github.com/login/oauth/authorize?"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("scope".to_string(), HOOK_SCOPE.to_string())));
        assert!(pairs.contains(&("state".to_string(), "s3cr3t".to_string())));
        assert!(pairs.contains(&("redirect_uri".to_string(), "https://bot.example/auth".to_string())));
    }
}
