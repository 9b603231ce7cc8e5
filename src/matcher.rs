use regex::{Captures, Regex};

use crate::refs::{IssueRef, RepoRef};

/// GitHub usernames: alphanumerics, with single hyphens allowed between them.
pub const USERNAME: &str = r"[A-Za-z\d](?:[A-Za-z\d]|-[A-Za-z\d]){0,38}";
/// Repository slugs additionally allow dots and underscores.
pub const REPO_SLUG: &str = r"[A-Za-z0-9.\-_]+";
/// Top-level github.com sections that look like owners but are not.
const SPECIAL_PATHS: &[&str] = &["collections", "events", "sponsors", "topics", "trending"];

fn base_url() -> String {
    format!(r"https?://(?:www\.)?github\.com/(?P<user>{USERNAME})/(?P<repo>{REPO_SLUG})")
}

/// A line span from a `#L10-L20` file anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineSpan {
    pub start: usize,
    pub end: Option<usize>,
}

/// Something in a chat line we know how to look up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Link {
    Repo(RepoRef),
    Issue(IssueRef),
    PullRequest(IssueRef),
    Comment {
        issue: IssueRef,
        id: u64,
    },
    Commit {
        repo: RepoRef,
        sha: String,
    },
    File {
        repo: RepoRef,
        git_ref: String,
        path: String,
        lines: Option<LineSpan>,
    },
    /// A `#123`, `repo#123` or `owner/repo#123` mention, already resolved against the channel.
    Bare(IssueRef),
}

/// Finds GitHub links and issue references in chat text. Compiled once, shared forever.
#[derive(Clone, Debug)]
pub struct Matcher {
    repo: Regex,
    issue: Regex,
    commit: Regex,
    file: Regex,
    bare: Regex,
    /// Bare `#N` mentions need at least this many digits.
    shortest_bare_number: usize,
}

impl Matcher {
    pub fn new(shortest_bare_number: usize) -> Self {
        let base = base_url();
        Matcher {
            repo: Regex::new(&format!(r"{base}/?(?:[?#]\S*)?(?:\s|$)")).unwrap(),
            issue: Regex::new(&format!(
                r"{base}/(?P<kind>issues|pull)/(?P<num>\d+)(?:#issuecomment-(?P<comment>\d+))?"
            ))
            .unwrap(),
            commit: Regex::new(&format!(r"{base}/commit/(?P<sha>[A-Za-z0-9\-]+)")).unwrap(),
            file: Regex::new(&format!(
                r"{base}/(?:blob|raw)/(?P<ref>[^/\s]+)/(?P<path>[^#?\s]+)(?:\?[^#\s]*)?(?:#L(?P<start>\d+)(?:-L(?P<end>\d+))?)?"
            ))
            .unwrap(),
            bare: Regex::new(&format!(
                r"(?:^|[^\w/.#])(?:(?:(?P<user>{USERNAME})/)?(?P<repo>{REPO_SLUG}))?#(?P<num>\d+)\b"
            ))
            .unwrap(),
            shortest_bare_number,
        }
    }

    /// Every GitHub URL in the text, in order of appearance, without duplicates.
    pub fn links(&self, text: &str) -> Vec<Link> {
        let mut found: Vec<(usize, Link)> = Vec::new();

        for caps in self.repo.captures_iter(text) {
            if let Some(repo) = repo_from(&caps) {
                found.push((start_of(&caps), Link::Repo(repo)));
            }
        }

        for caps in self.issue.captures_iter(text) {
            let Some(repo) = repo_from(&caps) else { continue };
            let Some(number) = number_from(&caps, "num") else { continue };
            let issue = IssueRef::new(repo, number);
            let link = match (number_from(&caps, "comment"), &caps["kind"]) {
                (Some(id), _) => Link::Comment { issue, id },
                (None, "pull") => Link::PullRequest(issue),
                (None, _) => Link::Issue(issue),
            };
            found.push((start_of(&caps), link));
        }

        for caps in self.commit.captures_iter(text) {
            if let Some(repo) = repo_from(&caps) {
                let sha = caps["sha"].to_string();
                found.push((start_of(&caps), Link::Commit { repo, sha }));
            }
        }

        for caps in self.file.captures_iter(text) {
            let Some(repo) = repo_from(&caps) else { continue };
            let lines = caps
                .name("start")
                .and_then(|m| m.as_str().parse().ok())
                .map(|start| LineSpan {
                    start,
                    end: caps.name("end").and_then(|m| m.as_str().parse().ok()),
                });
            found.push((
                start_of(&caps),
                Link::File {
                    repo,
                    git_ref: caps["ref"].to_string(),
                    path: caps["path"].to_string(),
                    lines,
                },
            ));
        }

        found.sort_by_key(|(start, _)| *start);
        dedup(found.into_iter().map(|(_, link)| link))
    }

    /// Issue mentions that are not links. Anything missing from the mention is filled in
    /// from the channel's linked repo; without one, only fully-qualified mentions count.
    pub fn references(&self, text: &str, channel_repo: Option<&RepoRef>) -> Vec<Link> {
        let mut found = Vec::new();

        for caps in self.bare.captures_iter(text) {
            let num = &caps["num"];
            let Ok(number) = num.parse::<u64>() else { continue };
            if number == 0 {
                continue;
            }

            let user = caps.name("user").map(|m| m.as_str());
            let repo = caps.name("repo").map(|m| m.as_str());
            if repo.map(|r| r.ends_with('.')).unwrap_or(false) {
                continue;
            }

            let resolved = match (user, repo, channel_repo) {
                (Some(user), Some(repo), _) => RepoRef::new(user, repo),
                (None, Some(repo), Some(bound)) => RepoRef::new(bound.owner.clone(), repo),
                (None, None, Some(bound)) => {
                    if num.len() < self.shortest_bare_number {
                        continue;
                    }
                    bound.clone()
                }
                _ => continue,
            };
            found.push(Link::Bare(IssueRef::new(resolved, number)));
        }

        dedup(found.into_iter())
    }
}

fn start_of(caps: &Captures) -> usize {
    caps.get(0).map(|m| m.start()).unwrap_or(0)
}

fn number_from(caps: &Captures, name: &str) -> Option<u64> {
    caps.name(name).and_then(|m| m.as_str().parse().ok())
}

fn repo_from(caps: &Captures) -> Option<RepoRef> {
    let user = caps.name("user")?.as_str();
    if SPECIAL_PATHS.iter().any(|p| p.eq_ignore_ascii_case(user)) {
        return None;
    }
    let repo = caps.name("repo")?.as_str();
    let repo = repo.trim_end_matches('.');
    let repo = repo.strip_suffix(".git").unwrap_or(repo);
    if repo.is_empty() {
        return None;
    }
    Some(RepoRef::new(user, repo))
}

fn dedup(links: impl Iterator<Item = Link>) -> Vec<Link> {
    let mut out: Vec<Link> = Vec::new();
    for link in links {
        if !out.contains(&link) {
            out.push(link);
        }
    }
    out
}
