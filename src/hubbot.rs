//! THE LOOKING-THINGS-UP ENGINE. This module glues the bot's memory (the store) and
//! the GitHub client to the logic that decides what to say about a chat line. It is
//! expected to be consumed by a front end, such as the IRC face.
use chrono::Utc;

use std::sync::Arc;

use crate::config::GithubSettings;
use crate::formatting::{bold, comment_line, commit_line, file_line, fmt_when, issue_line, repo_line};
use crate::github::{GithubClient, GithubError};
use crate::hooks::messages::color_sample;
use crate::hooks::oauth;
use crate::matcher::{Link, Matcher};
use crate::refs::{RepoParseError, RepoRef};
use crate::store::{HookColors, PendingAuth, Store, Subscription};

const GENERIC_ERROR: &str = "[GitHub] API returned an error.";
const NOT_OP: &str = "You must be a channel operator to use this command!";

/// One chat line, as much as the brain needs to know about it.
#[derive(Clone, Debug)]
pub struct Prompt {
    /// `None` for private messages.
    pub channel: Option<String>,
    pub nick: String,
    pub text: String,
    /// Channel op (or better) in `channel`, or a bot admin.
    pub privileged: bool,
}

/// What a chat line is asking of us, decided without touching the network.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Retort {
    /// Not a command. Might still mention something worth looking up.
    Chatter,
    Github(Option<String>),
    Hook {
        repo: Option<String>,
        toggle: Option<String>,
    },
    HookColor(Vec<String>),
    LinkRepo(Option<String>),
    /// A command that isn't ours.
    Unknown,
}

/// The HUBCRAB brain: app state that lives as long as the process does.
#[derive(Clone)]
pub struct Hubbot {
    github: GithubClient,
    store: Arc<dyn Store>,
    settings: Arc<GithubSettings>,
    matcher: Matcher,
    prefix: String,
}

impl Hubbot {
    pub fn new(
        github: GithubClient,
        store: Arc<dyn Store>,
        settings: Arc<GithubSettings>,
        prefix: &str,
    ) -> Self {
        let matcher = Matcher::new(settings.shortest_bare_number);
        Hubbot {
            github,
            store,
            settings,
            matcher,
            prefix: prefix.to_string(),
        }
    }

    /// Sort a line into a command or chatter.
    pub fn classify(&self, text: &str) -> Retort {
        let Some(command) = text.strip_prefix(self.prefix.as_str()) else {
            return Retort::Chatter;
        };
        let mut words = command.split_whitespace();
        let Some(name) = words.next() else {
            return Retort::Chatter;
        };
        let args: Vec<String> = words.map(str::to_string).collect();
        match name.to_lowercase().as_str() {
            "gh" | "github" => Retort::Github(args.into_iter().next()),
            "gh-hook" => {
                let mut args = args.into_iter();
                Retort::Hook {
                    repo: args.next(),
                    toggle: args.next(),
                }
            }
            "gh-hook-color" => Retort::HookColor(args),
            "gh-repo" => Retort::LinkRepo(args.into_iter().next()),
            _ => Retort::Unknown,
        }
    }

    /// Everything we want to say in response to a line, in order. Usually nothing.
    pub async fn process(&self, prompt: &Prompt) -> Vec<String> {
        match self.classify(&prompt.text) {
            Retort::Chatter => self.lookups(prompt).await,
            Retort::Unknown => Vec::new(),
            Retort::Github(arg) => vec![self.github_command(prompt, arg.as_deref()).await],
            Retort::Hook { repo, toggle } => {
                self.hook_command(prompt, repo.as_deref(), toggle.as_deref())
                    .await
            }
            Retort::HookColor(args) => vec![self.hook_color_command(prompt, &args).await],
            Retort::LinkRepo(arg) => vec![self.link_repo_command(prompt, arg.as_deref()).await],
        }
    }

    /// Summaries of every link in the line, then of every bare issue mention.
    async fn lookups(&self, prompt: &Prompt) -> Vec<String> {
        let mut found = self.matcher.links(&prompt.text);
        if let Some(channel) = &prompt.channel {
            let linked = match self.store.linked_repo(channel).await {
                Ok(linked) => linked,
                Err(e) => {
                    log::warn!("unable to read linked repo for {channel}: {e:#}");
                    None
                }
            };
            found.extend(self.matcher.references(&prompt.text, linked.as_ref()));
        }

        let mut replies = Vec::new();
        for link in found {
            if let Some(reply) = self.describe(&link).await {
                replies.push(reply);
            }
        }
        replies
    }

    /// One line about one link, or `None` if we should stay quiet.
    pub async fn describe(&self, link: &Link) -> Option<String> {
        let now = Utc::now();
        let result = match link {
            Link::Repo(repo) => self.repo_summary(repo, false).await,
            Link::Issue(issue) | Link::PullRequest(issue) | Link::Bare(issue) => self
                .github
                .issue(issue)
                .await
                .map(|data| issue_line(issue, &data, now)),
            Link::Comment { issue, id } => self
                .github
                .issue_comment(&issue.repo, *id)
                .await
                .map(|data| comment_line(issue, &data, now)),
            Link::Commit { repo, sha } => self
                .github
                .commit(repo, sha)
                .await
                .map(|data| commit_line(repo, &data, now)),
            Link::File {
                repo,
                git_ref,
                path,
                lines,
            } => match self.github.file(repo, path, git_ref).await {
                Ok(Some(file)) => Ok(file_line(repo, git_ref, &file, *lines)),
                Ok(None) => return None,
                Err(e) => Err(e),
            },
        };

        match result {
            Ok(line) => Some(line),
            Err(GithubError::NotFound) => {
                log::debug!("{link:?} was not found");
                not_found(link).map(str::to_string)
            }
            Err(e) => {
                log::warn!("lookup of {link:?} failed: {e}");
                Some(GENERIC_ERROR.to_string())
            }
        }
    }

    async fn repo_summary(&self, repo: &RepoRef, with_url: bool) -> Result<String, GithubError> {
        let data = self.github.repository(repo).await?;
        let languages = match self.github.languages(repo).await {
            Ok(languages) => languages,
            Err(e) => {
                log::warn!("unable to fetch languages for {repo}: {e}");
                Default::default()
            }
        };
        Ok(repo_line(&data, &languages, Utc::now(), with_url))
    }

    /// `[user/]repo`, filling in a missing owner with the nick of whoever asked.
    fn qualify(&self, nick: &str, arg: &str) -> Result<RepoRef, RepoParseError> {
        let arg = arg.trim();
        if arg.contains('/') || arg.contains("://") {
            arg.parse()
        } else {
            format!("{}/{}", nick.trim(), arg).parse()
        }
    }

    async fn github_command(&self, prompt: &Prompt, arg: Option<&str>) -> String {
        let nick = &prompt.nick;
        let Some(arg) = arg else {
            return format!("{nick}: I need a repository name, or `user/reponame`.");
        };
        match arg.to_lowercase().as_str() {
            "version" => {
                return format!(
                    "{nick}: {} {}",
                    env!("CARGO_PKG_NAME"),
                    env!("CARGO_PKG_VERSION")
                )
            }
            "status" => {
                return match self.github.service_status().await {
                    Ok(status) => format!("{} Current Status: {status}", bold("[GitHub]")),
                    Err(e) => {
                        log::warn!("status page lookup failed: {e}");
                        GENERIC_ERROR.to_string()
                    }
                }
            }
            "rate-limit" => {
                return match self.github.rate_limit().await {
                    Ok(window) => {
                        let reset = chrono::DateTime::from_timestamp(window.reset, 0)
                            .map(|when| fmt_when(when, Utc::now()))
                            .unwrap_or_else(|| "at some point".to_string());
                        format!(
                            "{} Rate limit: {} of {} requests left, resets {reset}",
                            bold("[GitHub]"),
                            window.remaining,
                            window.limit
                        )
                    }
                    Err(e) => {
                        log::warn!("rate limit lookup failed: {e}");
                        GENERIC_ERROR.to_string()
                    }
                }
            }
            _ => {}
        }

        let repo = match self.qualify(nick, arg) {
            Ok(repo) => repo,
            Err(e) => return format!("{nick}: {e}"),
        };
        match self.repo_summary(&repo, true).await {
            Ok(line) => line,
            Err(GithubError::NotFound) => format!("{} Not Found", bold("[GitHub]")),
            Err(e) => {
                log::warn!("lookup of {repo} failed: {e}");
                GENERIC_ERROR.to_string()
            }
        }
    }

    fn hook_usage(&self) -> String {
        format!(
            "{}gh-hook <repo> [enable|disable] - Enable/disable displaying webhooks from repo in current channel (You must be a channel OP)",
            self.prefix
        )
    }

    fn color_usage(&self) -> String {
        format!(
            "{}gh-hook-color <repo> <repo color> <name color> <branch color> <tag color> <hash color> <url color> - Set custom colors for the webhook messages (Uses mIRC color indices)",
            self.prefix
        )
    }

    async fn hook_command(
        &self,
        prompt: &Prompt,
        repo: Option<&str>,
        toggle: Option<&str>,
    ) -> Vec<String> {
        let Some(channel) = prompt.channel.as_deref() else {
            return vec!["[GitHub] GitHub hooks can only be configured in a channel".to_string()];
        };
        if !prompt.privileged {
            return vec![NOT_OP.to_string()];
        }
        let Some(repo) = repo else {
            return vec![self.hook_usage()];
        };
        let Ok(repo) = self.qualify(&prompt.nick, repo) else {
            return vec![format!(
                "Invalid repo formatting. Usage: {}",
                self.hook_usage()
            )];
        };
        let enabled = match toggle.map(str::to_lowercase).as_deref() {
            None | Some("enable") => true,
            Some("disable") => false,
            Some(_) => return vec![self.hook_usage()],
        };
        let channel = channel.to_lowercase();

        let existing = match self.store.subscription(&channel, &repo).await {
            Ok(existing) => existing,
            Err(e) => {
                log::error!("unable to read subscription for {repo} in {channel}: {e:#}");
                return vec!["[GitHub] I couldn't read my notes on that repo. Try again later.".to_string()];
            }
        };
        let created = existing.is_none();
        let mut subscription = existing.unwrap_or_else(|| Subscription::new(&channel, &repo));
        subscription.enabled = enabled;
        if let Err(e) = self.store.save_subscription(&subscription).await {
            log::error!("unable to save subscription for {repo} in {channel}: {e:#}");
            return vec!["[GitHub] I couldn't save that subscription. Try again later.".to_string()];
        }

        let key = repo.key();
        let mut replies = vec![if created && enabled {
            format!("Successfully enabled listening for {key}'s events in {channel}.")
        } else {
            format!(
                "Successfully {} the subscription to {key}'s events",
                if enabled { "enabled" } else { "disabled" }
            )
        }];
        if !enabled {
            return replies;
        }

        let pending = PendingAuth {
            channel: channel.clone(),
            repo,
        };
        match oauth::begin(self.store.as_ref(), &self.github, &self.settings, &pending).await {
            Ok(url) => {
                replies.push("Great! Please allow me to create my webhook by authorizing via this link:".to_string());
                replies.push(url.to_string());
                replies.push(format!(
                    "Once that webhook is successfully created, I'll post a message in here. Give me about a minute or so to set it up after you authorize. You can configure the colors that I use to display webhooks with {}gh-hook-color",
                    self.prefix
                ));
            }
            Err(e) => {
                log::warn!("unable to start authorization for {key}: {e:#}");
                replies.push(format!("[GitHub] I can't create the webhook myself: {e}"));
            }
        }
        replies
    }

    async fn hook_color_command(&self, prompt: &Prompt, args: &[String]) -> String {
        let Some(channel) = prompt.channel.as_deref() else {
            return "[GitHub] GitHub hooks can only be configured in a channel".to_string();
        };
        if !prompt.privileged {
            return NOT_OP.to_string();
        }
        let Some((repo, colors)) = args.split_first() else {
            return self.color_usage();
        };
        let Ok(repo) = self.qualify(&prompt.nick, repo) else {
            return format!("Invalid repo formatting. Usage: {}", self.color_usage());
        };

        let parsed: Result<Vec<u8>, _> = colors
            .iter()
            .map(|c| c.parse::<i64>().map(|n| n.rem_euclid(16) as u8))
            .collect();
        let Ok(parsed) = parsed else {
            return format!(
                "You must provide exactly 6 colors that are integers and are space separated. Usage: {}",
                self.color_usage()
            );
        };
        let Some(colors) = HookColors::from_slice(&parsed) else {
            return format!("You must provide exactly 6 colors! Usage: {}", self.color_usage());
        };

        let channel = channel.to_lowercase();
        let key = repo.key();
        let mut subscription = match self.store.subscription(&channel, &repo).await {
            Ok(Some(subscription)) => subscription,
            Ok(None) => {
                return format!(
                    "Please use \"{}gh-hook {key} enable\" before attempting to configure colors!",
                    self.prefix
                )
            }
            Err(e) => {
                log::error!("unable to read subscription for {key} in {channel}: {e:#}");
                return "[GitHub] I couldn't read my notes on that repo. Try again later.".to_string();
            }
        };
        subscription.colors = colors;
        if let Err(e) = self.store.save_subscription(&subscription).await {
            log::error!("unable to save colors for {key} in {channel}: {e:#}");
            return "[GitHub] I couldn't save those colors. Try again later.".to_string();
        }
        color_sample(&colors, &key, &prompt.nick)
    }

    async fn link_repo_command(&self, prompt: &Prompt, arg: Option<&str>) -> String {
        let Some(channel) = prompt.channel.as_deref() else {
            return "[GitHub] You can only link a repository to a channel.".to_string();
        };
        if !prompt.privileged {
            return NOT_OP.to_string();
        }

        let outcome = match arg {
            None => self.store.linked_repo(channel).await.map(|linked| match linked {
                Some(repo) => format!("Issue numbers in {channel} will fetch data for {repo}."),
                None => "No repo linked to this channel.".to_string(),
            }),
            Some(arg) if arg.eq_ignore_ascii_case("!clear") => self
                .store
                .unlink_repo(channel)
                .await
                .map(|_| format!("Cleared linked repo for {channel}.")),
            Some(arg) => {
                let repo = match self.qualify(&prompt.nick, arg) {
                    Ok(repo) => repo,
                    Err(e) => return format!("{}: {e}", prompt.nick),
                };
                self.store
                    .link_repo(channel, &repo)
                    .await
                    .map(|_| format!("{}: Set linked repo for {channel} to {repo}.", prompt.nick))
            }
        };
        outcome.unwrap_or_else(|e| {
            log::error!("unable to update linked repo for {channel}: {e:#}");
            "[GitHub] I couldn't update the linked repo. Try again later.".to_string()
        })
    }
}

/// What to say when a link points at nothing. Bare mentions and files stay quiet.
fn not_found(link: &Link) -> Option<&'static str> {
    match link {
        Link::Issue(_) | Link::PullRequest(_) | Link::Comment { .. } => Some(
            "[GitHub] API says this is an invalid issue. Please report this if you know it should work!",
        ),
        Link::Commit { .. } => Some(
            "[GitHub] API says this is an invalid commit. Please report this if you know it's a correct link!",
        ),
        Link::Repo(_) => Some("[GitHub] Not Found"),
        Link::File { .. } | Link::Bare(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn brain(server: &MockServer, store: Arc<MemoryStore>) -> Hubbot {
        let settings = GithubSettings {
            api_url: server.uri(),
            web_url: server.uri(),
            status_url: server.uri(),
            client_id: Some("id".to_string()),
            client_secret: Some("secret".to_string()),
            ..GithubSettings::default()
        };
        let github = GithubClient::new(&settings).unwrap();
        Hubbot::new(github, store, Arc::new(settings), ".")
    }

    fn said(channel: Option<&str>, nick: &str, text: &str, privileged: bool) -> Prompt {
        Prompt {
            channel: channel.map(str::to_string),
            nick: nick.to_string(),
            text: text.to_string(),
            privileged,
        }
    }

    fn pull_42() -> serde_json::Value {
        json!({
            "number": 42,
            "title": "Add webhook colors",
            "state": "open",
            "body": "Colors!",
            "user": {"login": "dgw"},
            "created_at": "2024-01-02T03:04:05Z",
            "html_url": "https://github.com/sopel-irc/sopel-github/pull/42",
            "pull_request": {"merged_at": null}
        })
    }

    #[test]
    fn classify_sorts_commands_from_chatter() {
        let store = Arc::new(MemoryStore::new());
        let settings = GithubSettings::default();
        let bot = Hubbot::new(
            GithubClient::new(&settings).unwrap(),
            store,
            Arc::new(settings),
            ".",
        );
        assert_eq!(bot.classify("hello there"), Retort::Chatter);
        assert_eq!(
            bot.classify(".gh sopel-irc/sopel"),
            Retort::Github(Some("sopel-irc/sopel".to_string()))
        );
        assert_eq!(bot.classify(".GITHUB"), Retort::Github(None));
        assert_eq!(
            bot.classify(".gh-hook o/r disable"),
            Retort::Hook {
                repo: Some("o/r".to_string()),
                toggle: Some("disable".to_string())
            }
        );
        assert_eq!(bot.classify(".gh-repo !clear"), Retort::LinkRepo(Some("!clear".to_string())));
        assert_eq!(bot.classify(".seen dgw"), Retort::Unknown);
    }

    #[tokio::test]
    async fn pull_request_links_get_a_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/sopel-irc/sopel-github/issues/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pull_42()))
            .expect(1)
            .mount(&server)
            .await;

        let bot = brain(&server, Arc::new(MemoryStore::new()));
        let replies = bot
            .process(&said(
                Some("#sopel"),
                "someone",
                "look at https://github.com/sopel-irc/sopel-github/pull/42 please",
                false,
            ))
            .await;
        assert_eq!(replies.len(), 1);
        let line = &replies[0];
        assert!(line.contains("sopel-irc/sopel-github"));
        assert!(line.contains("Add webhook colors"));
        assert!(line.contains("open PR"));
        assert!(line.contains("https://github.com/sopel-irc/sopel-github/pull/42"));
    }

    #[tokio::test]
    async fn bare_references_use_the_linked_repo_and_stay_quiet_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/sopel-irc/sopel-github/issues/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(pull_42()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/sopel-irc/sopel-github/issues/99"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::new());
        store
            .link_repo("#sopel", &RepoRef::new("sopel-irc", "sopel-github"))
            .await
            .unwrap();
        let bot = brain(&server, store);

        let replies = bot
            .process(&said(Some("#sopel"), "someone", "fixed in #42, see also #99 and #7", false))
            .await;
        assert_eq!(replies.len(), 1, "#99 is missing and #7 is too short: {replies:?}");
        assert!(replies[0].contains("#42"));

        let private = bot
            .process(&said(None, "someone", "what about #42", false))
            .await;
        assert!(private.is_empty());
    }

    #[tokio::test]
    async fn rate_limits_get_the_generic_message() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/o/r/commits/abc123"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        let bot = brain(&server, Arc::new(MemoryStore::new()));
        let replies = bot
            .process(&said(Some("#c"), "n", "https://github.com/o/r/commit/abc123", false))
            .await;
        assert_eq!(replies, vec![GENERIC_ERROR.to_string()]);
    }

    #[tokio::test]
    async fn gh_qualifies_bare_repo_names_with_the_nick() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/dgw/dotfiles"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "full_name": "dgw/dotfiles",
                "description": null,
                "pushed_at": "2024-01-02T03:04:05Z",
                "stargazers_count": 3,
                "forks_count": 0,
                "open_issues": 1,
                "html_url": "https://github.com/dgw/dotfiles"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/dgw/dotfiles/languages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Shell": 100})))
            .mount(&server)
            .await;

        let bot = brain(&server, Arc::new(MemoryStore::new()));
        let replies = bot
            .process(&said(Some("#c"), "dgw", ".gh dotfiles", false))
            .await;
        assert_eq!(replies.len(), 1);
        assert!(replies[0].contains("dgw/dotfiles"));
        assert!(replies[0].ends_with("| https://github.com/dgw/dotfiles"));

        let usage = bot.process(&said(Some("#c"), "dgw", ".gh", false)).await;
        assert_eq!(usage, vec!["dgw: I need a repository name, or `user/reponame`."]);
    }

    #[tokio::test]
    async fn channel_repo_needs_an_op() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let bot = brain(&server, store.clone());

        let denied = bot
            .process(&said(Some("#sopel"), "rando", ".gh-repo o/r", false))
            .await;
        assert_eq!(denied, vec![NOT_OP.to_string()]);
        assert!(store.linked_repo("#sopel").await.unwrap().is_none());

        let set = bot
            .process(&said(Some("#sopel"), "op", ".gh-repo sopel-irc/sopel", true))
            .await;
        assert_eq!(set, vec!["op: Set linked repo for #sopel to sopel-irc/sopel.".to_string()]);

        let shown = bot
            .process(&said(Some("#sopel"), "op", ".gh-repo", true))
            .await;
        assert_eq!(
            shown,
            vec!["Issue numbers in #sopel will fetch data for sopel-irc/sopel.".to_string()]
        );

        let cleared = bot
            .process(&said(Some("#sopel"), "op", ".gh-repo !clear", true))
            .await;
        assert_eq!(cleared, vec!["Cleared linked repo for #sopel.".to_string()]);

        let private = bot.process(&said(None, "op", ".gh-repo o/r", true)).await;
        assert_eq!(
            private,
            vec!["[GitHub] You can only link a repository to a channel.".to_string()]
        );
    }

    #[tokio::test]
    async fn enabling_a_hook_hands_out_an_authorization_link() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let bot = brain(&server, store.clone());

        let replies = bot
            .process(&said(Some("#Sopel"), "op", ".gh-hook sopel-irc/sopel", true))
            .await;
        assert_eq!(replies.len(), 4);
        assert_eq!(
            replies[0],
            "Successfully enabled listening for sopel-irc/sopel's events in #sopel."
        );
        assert!(replies[2].contains("/login/oauth/authorize?"));
        assert!(replies[2].contains("scope=write%3Arepo_hook"));

        let sub = store
            .subscription("#sopel", &RepoRef::new("sopel-irc", "sopel"))
            .await
            .unwrap()
            .unwrap();
        assert!(sub.enabled);

        let disabled = bot
            .process(&said(Some("#sopel"), "op", ".gh-hook sopel-irc/sopel disable", true))
            .await;
        assert_eq!(
            disabled,
            vec!["Successfully disabled the subscription to sopel-irc/sopel's events".to_string()]
        );
    }

    #[tokio::test]
    async fn hook_colors_are_validated() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::new());
        let bot = brain(&server, store.clone());
        let ask = |text: &str| said(Some("#sopel"), "op", text, true);

        let missing = bot.process(&ask(".gh-hook-color o/r 1 2 3 4 5 6")).await;
        assert!(missing[0].starts_with("Please use \".gh-hook o/r enable\""));

        store
            .save_subscription(&Subscription::new("#sopel", &RepoRef::new("o", "r")))
            .await
            .unwrap();
        let few = bot.process(&ask(".gh-hook-color o/r 1 2 3")).await;
        assert!(few[0].starts_with("You must provide exactly 6 colors!"));
        let words = bot.process(&ask(".gh-hook-color o/r 1 2 3 4 5 red")).await;
        assert!(words[0].contains("integers"));

        let ok = bot.process(&ask(".gh-hook-color o/r 1 2 3 4 5 22")).await;
        assert!(ok[0].contains("Example name:"));
        let sub = store
            .subscription("#sopel", &RepoRef::new("o", "r"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sub.colors.url, 6);
    }
}
