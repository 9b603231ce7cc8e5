//! Everything HUBCRAB needs to know at startup, read from the environment (and `.env`).
use reqwest::Url;

use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("You must provide {0}.")]
    Missing(&'static str),
    #[error("{key} has an unusable value `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where and how to connect to IRC.
#[derive(Clone, Debug)]
pub struct IrcSettings {
    pub server: String,
    pub port: u16,
    pub use_tls: bool,
    pub nickname: String,
    pub password: Option<String>,
    pub channels: Vec<String>,
    /// Nicks that may use op-only commands anywhere.
    pub admins: Vec<String>,
    pub command_prefix: String,
}

/// The `[github]` section: API credentials and the webhook listener.
#[derive(Clone, Debug)]
pub struct GithubSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub webhook: bool,
    pub webhook_host: IpAddr,
    pub webhook_port: u16,
    pub webhook_path: String,
    pub webhook_secret: Option<String>,
    pub external_url: String,
    pub shortest_bare_number: usize,
    pub api_url: String,
    pub web_url: String,
    pub status_url: String,
    pub auth_ttl: Duration,
    pub hook_workers: usize,
    pub hook_queue: usize,
}

impl Default for GithubSettings {
    fn default() -> Self {
        GithubSettings {
            client_id: None,
            client_secret: None,
            webhook: false,
            webhook_host: IpAddr::from([0, 0, 0, 0]),
            webhook_port: 3333,
            webhook_path: "/webhook".to_string(),
            webhook_secret: None,
            external_url: "http://localhost:3333".to_string(),
            shortest_bare_number: 2,
            api_url: "https://api.github.com".to_string(),
            web_url: "https://github.com".to_string(),
            status_url: "https://www.githubstatus.com".to_string(),
            auth_ttl: Duration::from_secs(600),
            hook_workers: 4,
            hook_queue: 64,
        }
    }
}

impl GithubSettings {
    /// The URL GitHub should deliver hook payloads to.
    pub fn callback_url(&self) -> String {
        format!("{}{}", self.external_url.trim_end_matches('/'), self.webhook_path)
    }

    /// The URL GitHub should send users back to after they authorize us.
    pub fn redirect_url(&self) -> String {
        format!("{}/auth", self.external_url.trim_end_matches('/'))
    }

    /// Both halves of the OAuth app, if we have them.
    pub fn oauth_app(&self) -> Option<(&str, &str)> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) => Some((id.as_str(), secret.as_str())),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub irc: IrcSettings,
    pub github: GithubSettings,
    pub redis_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup; `from_env` is this over the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = GithubSettings::default();

        let irc = IrcSettings {
            server: get("IRC_SERVER").ok_or(ConfigError::Missing("an IRC server in IRC_SERVER"))?,
            port: parsed(&get, "IRC_PORT", 6697)?,
            use_tls: flag(&get, "IRC_TLS", true)?,
            nickname: get("IRC_NICK").unwrap_or_else(|| "HUBCRAB".to_string()),
            password: get("IRC_PASSWORD"),
            channels: list(get("IRC_CHANNELS")),
            admins: list(get("BOT_ADMINS")),
            command_prefix: get("COMMAND_PREFIX").unwrap_or_else(|| ".".to_string()),
        };

        let github = GithubSettings {
            client_id: get("GITHUB_CLIENT_ID"),
            client_secret: get("GITHUB_CLIENT_SECRET"),
            webhook: flag(&get, "GITHUB_WEBHOOK", false)?,
            webhook_host: parsed(&get, "GITHUB_WEBHOOK_HOST", defaults.webhook_host)?,
            webhook_port: parsed(&get, "GITHUB_WEBHOOK_PORT", defaults.webhook_port)?,
            webhook_path: get("GITHUB_WEBHOOK_PATH").unwrap_or(defaults.webhook_path),
            webhook_secret: get("GITHUB_WEBHOOK_SECRET"),
            external_url: get("GITHUB_EXTERNAL_URL").unwrap_or(defaults.external_url),
            shortest_bare_number: parsed(
                &get,
                "GITHUB_SHORTEST_BARE_NUMBER",
                defaults.shortest_bare_number,
            )?,
            api_url: get("GITHUB_API_URL").unwrap_or(defaults.api_url),
            web_url: get("GITHUB_WEB_URL").unwrap_or(defaults.web_url),
            status_url: get("GITHUB_STATUS_URL").unwrap_or(defaults.status_url),
            auth_ttl: Duration::from_secs(parsed(
                &get,
                "GITHUB_AUTH_TTL_SECS",
                defaults.auth_ttl.as_secs(),
            )?),
            hook_workers: parsed(&get, "HOOK_WORKERS", defaults.hook_workers)?,
            hook_queue: parsed(&get, "HOOK_QUEUE", defaults.hook_queue)?,
        };

        let config = Config {
            irc,
            github,
            redis_url: get("REDIS_URL"),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let gh = &self.github;
        let positive = [
            ("GITHUB_SHORTEST_BARE_NUMBER", gh.shortest_bare_number),
            ("HOOK_WORKERS", gh.hook_workers),
            ("HOOK_QUEUE", gh.hook_queue),
        ];
        for (key, value) in positive {
            if value == 0 {
                return Err(invalid(key, "0", "must be at least 1"));
            }
        }
        if !gh.webhook_path.starts_with('/') {
            return Err(invalid(
                "GITHUB_WEBHOOK_PATH",
                &gh.webhook_path,
                "must start with /",
            ));
        }
        if gh.webhook_path == "/auth" {
            return Err(invalid(
                "GITHUB_WEBHOOK_PATH",
                &gh.webhook_path,
                "/auth is the OAuth callback",
            ));
        }
        for (key, value) in [
            ("GITHUB_EXTERNAL_URL", &gh.external_url),
            ("GITHUB_API_URL", &gh.api_url),
            ("GITHUB_WEB_URL", &gh.web_url),
            ("GITHUB_STATUS_URL", &gh.status_url),
        ] {
            Url::parse(value).map_err(|e| invalid(key, value, &e.to_string()))?;
        }
        if self.irc.command_prefix.chars().any(char::is_whitespace) {
            return Err(invalid(
                "COMMAND_PREFIX",
                &self.irc.command_prefix,
                "may not contain whitespace",
            ));
        }
        Ok(())
    }
}

fn invalid(key: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parsed<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse::<T>().map_err(|e| invalid(key, &raw, &e.to_string())),
    }
}

fn flag<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_lowercase()) {
        None => Ok(default),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(invalid(key, &v, "expected true or false")),
        },
    }
}

fn list(raw: Option<String>) -> Vec<String> {
    raw.map(|r| {
        r.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
