//! Turning webhook events into channel lines, painted in each channel's chosen colors.
use std::collections::BTreeMap;

use super::event::{short_sha, HookEvent, Push, PullRequest, PullState, Target};
use crate::formatting::{bold, clip, color, emojize, first_line, short_body};
use crate::store::HookColors;

struct Palette<'a>(&'a HookColors);

impl Palette<'_> {
    fn repo(&self, text: &str) -> String {
        color(text, self.0.repo)
    }

    fn name(&self, text: &str) -> String {
        color(text, self.0.name)
    }

    fn branch(&self, text: &str) -> String {
        color(text, self.0.branch)
    }

    fn tag(&self, text: &str) -> String {
        color(text, self.0.tag)
    }

    fn hash(&self, text: &str) -> String {
        color(text, self.0.hash)
    }

    fn url(&self, text: &str) -> String {
        color(text, self.0.url)
    }
}

fn commits(count: usize) -> &'static str {
    if count == 1 {
        "commit"
    } else {
        "commits"
    }
}

const RED: u8 = 4;

/// Every line this event should produce in a channel using `colors`. Nothing for events we
/// don't announce.
pub fn render(event: &HookEvent, colors: &HookColors) -> Vec<String> {
    let p = Palette(colors);
    let lines = match event {
        HookEvent::Ping { repo, sender, zen } => vec![format!(
            "[{}] {}: {} (Your webhook is now enabled)",
            p.repo(&repo.name),
            p.name(sender),
            zen
        )],
        HookEvent::Push(push) => push_lines(&p, push),
        HookEvent::CommitComment {
            repo,
            sender,
            commit_id,
            body,
            url,
        } => vec![format!(
            "[{}] {} commented on commit {}: {} {}",
            p.repo(&repo.name),
            p.name(sender),
            p.hash(short_sha(commit_id)),
            emojize(&short_body(body.as_deref())),
            p.url(url)
        )],
        HookEvent::PullRequest {
            repo,
            sender,
            pull,
            state,
        } => vec![pull_summary(&p, &repo.name, sender, pull, *state)],
        HookEvent::Issue {
            repo,
            sender,
            target,
            state,
        } => vec![format!(
            "[{}] {} {} issue #{}: {} {}",
            p.repo(&repo.name),
            p.name(sender),
            state.verb(),
            target.number,
            emojize(&target.title),
            p.url(&target.url)
        )],
        HookEvent::TransferredIn {
            repo,
            target,
            from_repo,
            from_number,
        } => vec![format!(
            "[{}] {}#{} by {} was transferred to issue #{}: {} {}",
            p.repo(&repo.name),
            p.repo(from_repo),
            from_number,
            p.name(&target.author),
            target.number,
            emojize(&target.title),
            p.url(&target.url)
        )],
        HookEvent::TransferredOut {
            repo,
            sender,
            target,
            to_repo,
            to_number,
            to_url,
        } => vec![format!(
            "[{}] {} transferred issue #{} by {} to {}#{}: {} {}",
            p.repo(&repo.name),
            p.name(sender),
            target.number,
            p.name(&target.author),
            p.repo(to_repo),
            to_number,
            emojize(&target.title),
            p.url(to_url)
        )],
        HookEvent::Retitled {
            repo,
            sender,
            target,
            from,
        } => vec![format!(
            "[{}] {} retitled {} #{}: \"{}\" ➜ \"{}\" {}",
            p.repo(&repo.name),
            p.name(sender),
            target.kind.short(),
            target.number,
            emojize(from),
            emojize(&target.title),
            p.url(&target.url)
        )],
        HookEvent::Assignment {
            repo,
            sender,
            target,
            assignee,
            assigned,
        } => vec![assignment(&p, &repo.name, sender, target, assignee, *assigned)],
        HookEvent::Label {
            repo,
            sender,
            target,
            label,
            added,
        } => vec![format!(
            "[{}] {} {} the label '{}' {} {} #{} ({}) {}",
            p.repo(&repo.name),
            p.name(sender),
            if *added { "added" } else { "removed" },
            label,
            if *added { "to" } else { "from" },
            target.kind.noun(),
            target.number,
            emojize(&target.title),
            p.url(&target.url)
        )],
        HookEvent::Milestone {
            repo,
            sender,
            target,
            milestone,
            added,
        } => vec![format!(
            "[{}] {} {} {} #{} ({}) {} the {} milestone {}",
            p.repo(&repo.name),
            p.name(sender),
            if *added { "added" } else { "removed" },
            target.kind.noun(),
            target.number,
            emojize(&target.title),
            if *added { "to" } else { "from" },
            milestone,
            p.url(&target.url)
        )],
        HookEvent::IssueComment {
            repo,
            sender,
            target,
            body,
            url,
        } => vec![format!(
            "[{}] {} commented on {} #{}: {} {}",
            p.repo(&repo.name),
            p.name(sender),
            target.kind.noun(),
            target.number,
            emojize(&short_body(body.as_deref())),
            p.url(url)
        )],
        HookEvent::Review {
            repo,
            sender,
            number,
            verdict,
            body,
            url,
        } => {
            let summary = body
                .as_deref()
                .map(|b| format!(": {}", emojize(&short_body(Some(b)))))
                .unwrap_or_default();
            vec![format!(
                "[{}] {} {} pull request #{}{} {}",
                p.repo(&repo.name),
                p.name(sender),
                verdict.verb(),
                number,
                summary,
                p.url(url)
            )]
        }
        HookEvent::ReviewDismissed {
            repo,
            sender,
            number,
            reviewer,
            url,
        } => {
            let whose = if sender == reviewer {
                "their".to_string()
            } else {
                format!("{}'s", p.name(reviewer))
            };
            vec![format!(
                "[{}] {} dismissed {} review on pull request #{} {}",
                p.repo(&repo.name),
                p.name(sender),
                whose,
                number,
                p.url(url)
            )]
        }
        HookEvent::ReviewComment {
            repo,
            sender,
            number,
            commit_id,
            body,
            url,
        } => vec![format!(
            "[{}] {} left a file comment in pull request #{} {}: {} {}",
            p.repo(&repo.name),
            p.name(sender),
            number,
            p.hash(short_sha(commit_id)),
            emojize(&short_body(body.as_deref())),
            p.url(url)
        )],
        HookEvent::Wiki {
            repo,
            sender,
            pages,
        } => {
            let summary = match pages.as_slice() {
                [page] => format!(
                    "[{}] {} {} wiki page {}{}",
                    p.repo(&repo.name),
                    p.name(sender),
                    page.action,
                    page.title,
                    page.summary
                        .as_deref()
                        .filter(|s| !s.is_empty())
                        .map(|s| format!(": {s}"))
                        .unwrap_or_default()
                ),
                _ => {
                    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                    for page in pages {
                        *counts.entry(page.action.as_str()).or_default() += 1;
                    }
                    let actions: Vec<String> = counts
                        .iter()
                        .map(|(action, count)| format!("{action} {count}"))
                        .collect();
                    format!(
                        "[{}] {} {} wiki pages",
                        p.repo(&repo.name),
                        p.name(sender),
                        to_sentence(&actions)
                    )
                }
            };
            let url = pages
                .first()
                .map(|page| page.html_url.clone())
                .unwrap_or_else(|| format!("{}/wiki", repo.html_url));
            vec![format!("{summary} {}", p.url(&url))]
        }
        HookEvent::Star { repo, sender } => vec![format!(
            "[{}] {} starred the project!",
            p.repo(&repo.name),
            p.name(sender)
        )],
        HookEvent::Status {
            repo,
            branch,
            state,
            description,
            target_url,
        } => {
            let place = match branch {
                Some(branch) => format!("{}/{}", p.repo(&repo.name), p.branch(branch)),
                None => p.repo(&repo.name),
            };
            let mut line = format!("[{place}]");
            if let Some(description) = description {
                line.push_str(&format!(" {description}"));
            }
            if let Some(target_url) = target_url {
                line.push_str(&format!(" - {target_url}"));
            }
            line.push_str(&format!(" ({state})"));
            vec![line]
        }
        HookEvent::Release {
            repo,
            author,
            name,
            prerelease,
            url,
        } => vec![format!(
            "[{}] {} released {}{} {}",
            p.repo(&repo.name),
            p.name(author),
            name,
            if *prerelease { " (prerelease)" } else { "" },
            p.url(url)
        )],
        HookEvent::Unhandled { .. } => Vec::new(),
    };
    lines.into_iter().map(clip).collect()
}

/// A made-up line showing off every color a channel picked.
pub fn color_sample(colors: &HookColors, repo: &str, nick: &str) -> String {
    let p = Palette(colors);
    format!(
        "[{}] Example name: {} tag: {} commit: {} branch: {} url: {}",
        p.repo(repo),
        p.name(nick),
        p.tag("tag"),
        p.hash("c0mm17"),
        p.branch("master"),
        p.url("http://git.io/")
    )
}

fn to_sentence(items: &[String]) -> String {
    match items {
        [] => String::new(),
        [one] => one.clone(),
        [first, second] => format!("{first} and {second}"),
        [rest @ .., last] => format!("{}, and {last}", rest.join(", ")),
    }
}

fn assignment(
    p: &Palette,
    repo: &str,
    sender: &str,
    target: &Target,
    assignee: &str,
    assigned: bool,
) -> String {
    let action = if assigned { "assigned" } else { "unassigned" };
    let (prefix, whom) = if assignee == sender {
        ("self-", String::new())
    } else {
        let prep = if assigned { "to" } else { "from" };
        ("", format!(" {prep} {}", p.name(assignee)))
    };
    format!(
        "[{}] {} {prefix}{action} {} #{}{whom} ({}) {}",
        p.repo(repo),
        p.name(sender),
        target.kind.noun(),
        target.number,
        emojize(&target.title),
        p.url(&target.url)
    )
}

fn pull_summary(p: &Palette, repo: &str, actor: &str, pull: &PullRequest, state: PullState) -> String {
    let author = pull.user.login.as_str();
    let possessive = if state == PullState::Merged && actor != author {
        format!("{}'s ", p.name(author))
    } else {
        String::new()
    };

    let mut base = p.branch(&pull.base.git_ref);
    let mut head = p.branch(&pull.head.git_ref);
    if pull.base.owner() != pull.head.owner() {
        base = format!("{}:{base}", p.name(pull.base.owner().unwrap_or("?")));
        head = format!("{}:{head}", p.name(pull.head.owner().unwrap_or("?")));
    }

    format!(
        "[{}] {} {} {possessive}pull request #{}: {} ({base}...{head}) {}",
        p.repo(repo),
        p.name(actor),
        state.verb(),
        pull.number,
        emojize(&pull.title),
        p.url(&pull.html_url)
    )
}

fn push_summary(p: &Palette, push: &Push) -> String {
    let distinct = push.distinct();
    let before = short_sha(&push.before);
    let after = short_sha(&push.after);
    let mut message = vec![format!(
        "[{}] {}",
        p.repo(&push.repository.name),
        p.name(push.pusher())
    )];

    if push.is_creation() {
        if push.is_tag() {
            message.push(format!("tagged {} at", p.tag(push.ref_name())));
            message.push(match push.base_ref_name() {
                Some(base) => p.branch(base),
                None => p.hash(after),
            });
        } else {
            message.push(format!("created {}", p.branch(push.ref_name())));
            if let Some(base) = push.base_ref_name() {
                message.push(format!("from {}", p.branch(base)));
            } else if distinct.is_empty() {
                message.push(format!("at {}", p.hash(after)));
            }
            message.push(format!(
                "(+{} new {})",
                bold(&distinct.len().to_string()),
                commits(distinct.len())
            ));
        }
    } else if push.is_deletion() {
        message.push(format!(
            "{} {} at {}",
            color("deleted", RED),
            p.branch(push.ref_name()),
            p.hash(before)
        ));
    } else if push.forced {
        message.push(format!(
            "{} {} from {} to {}",
            color("force-pushed", RED),
            p.branch(push.ref_name()),
            p.hash(before),
            p.hash(after)
        ));
    } else if !push.commits.is_empty() && distinct.is_empty() {
        match push.base_ref_name() {
            Some(base) => message.push(format!(
                "merged {} into {}",
                p.branch(base),
                p.branch(push.ref_name())
            )),
            None => message.push(format!(
                "fast-forwarded {} from {} to {}",
                p.branch(push.ref_name()),
                p.hash(before),
                p.hash(after)
            )),
        }
    } else {
        message.push(format!(
            "pushed {} new {} to {}",
            bold(&distinct.len().to_string()),
            commits(distinct.len()),
            p.branch(push.ref_name())
        ));
    }

    message.join(" ")
}

fn push_url(push: &Push) -> String {
    let repo_url = &push.repository.html_url;
    if push.is_creation() {
        push.compare.clone()
    } else if push.is_deletion() {
        format!("{repo_url}/commit/{}", short_sha(&push.before))
    } else if push.forced {
        format!("{repo_url}/commits/{}", push.ref_name())
    } else {
        match push.distinct().as_slice() {
            [only] => only.url.clone(),
            _ => push.compare.clone(),
        }
    }
}

fn push_lines(p: &Palette, push: &Push) -> Vec<String> {
    let mut lines = vec![format!("{} {}", push_summary(p, push), p.url(&push_url(push)))];
    for commit in push.distinct() {
        lines.push(format!(
            "{}/{} {} {}: {}",
            p.repo(&push.repository.name),
            p.branch(push.ref_name()),
            p.hash(short_sha(&commit.id)),
            p.name(&commit.author.name),
            first_line(&commit.message)
        ));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::event::HookEvent;
    use serde_json::{json, Value};

    /// Drop color and bold codes so assertions read like what people see.
    fn plain(line: &str) -> String {
        let mut out = String::new();
        let mut chars = line.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '\x02' | '\x0f' => {}
                '\x03' => {
                    for _ in 0..2 {
                        if chars.peek().map_or(false, char::is_ascii_digit) {
                            chars.next();
                        }
                    }
                }
                c => out.push(c),
            }
        }
        out
    }

    fn rendered(event: &str, payload: Value) -> Vec<String> {
        let parsed = HookEvent::parse(event, payload).unwrap();
        render(&parsed, &HookColors::default())
            .iter()
            .map(|l| plain(l))
            .collect()
    }

    fn repository() -> Value {
        json!({
            "name": "sopel-github",
            "full_name": "sopel-irc/sopel-github",
            "html_url": "https://github.com/sopel-irc/sopel-github"
        })
    }

    fn commit(id: &str, message: &str) -> Value {
        json!({
            "id": id,
            "message": message,
            "distinct": true,
            "url": format!("https://github.com/sopel-irc/sopel-github/commit/{id}"),
            "author": {"name": "dgw"}
        })
    }

    #[test]
    fn ping_enables() {
        let lines = rendered(
            "ping",
            json!({
                "zen": "Keep it logically awesome.",
                "repository": repository(),
                "sender": {"login": "dgw"}
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] dgw: Keep it logically awesome. (Your webhook is now enabled)"]
        );
    }

    #[test]
    fn ping_uses_channel_colors() {
        let parsed = HookEvent::parse(
            "ping",
            json!({"zen": "z", "repository": repository(), "sender": {"login": "dgw"}}),
        )
        .unwrap();
        let colors = HookColors::from_slice(&[1, 2, 3, 4, 5, 6]).unwrap();
        let line = &render(&parsed, &colors)[0];
        assert!(line.starts_with("[\x0301sopel-github\x03] \x0302dgw\x03"));
    }

    #[test]
    fn plain_push_lists_its_commits() {
        let lines = rendered(
            "push",
            json!({
                "ref": "refs/heads/master",
                "before": "1111111111111111111111111111111111111111",
                "after": "2222222222222222222222222222222222222222",
                "compare": "https://github.com/sopel-irc/sopel-github/compare/1111111...2222222",
                "repository": repository(),
                "pusher": {"name": "dgw"},
                "commits": [commit("abcdef0123456789", "Fix it\n\nLong story"), commit("0123456789abcdef", "Test it")]
            }),
        );
        assert_eq!(
            lines,
            vec![
                "[sopel-github] dgw pushed 2 new commits to master https://github.com/sopel-irc/sopel-github/compare/1111111...2222222",
                "sopel-github/master abcdef0 dgw: Fix it…",
                "sopel-github/master 0123456 dgw: Test it",
            ]
        );
    }

    #[test]
    fn single_commit_push_links_the_commit() {
        let lines = rendered(
            "push",
            json!({
                "ref": "refs/heads/master",
                "before": "1111111111111111111111111111111111111111",
                "after": "2222222222222222222222222222222222222222",
                "compare": "https://example.com/compare",
                "repository": repository(),
                "pusher": {"name": "dgw"},
                "commits": [commit("abcdef0123456789", "Fix it")]
            }),
        );
        assert_eq!(
            lines[0],
            "[sopel-github] dgw pushed 1 new commit to master https://github.com/sopel-irc/sopel-github/commit/abcdef0123456789"
        );
    }

    #[test]
    fn new_tags_and_deleted_branches() {
        let tagged = rendered(
            "push",
            json!({
                "ref": "refs/tags/v1.0.0",
                "base_ref": "refs/heads/master",
                "before": "0000000000000000000000000000000000000000",
                "after": "2222222222222222222222222222222222222222",
                "created": true,
                "compare": "https://example.com/compare/v1.0.0",
                "repository": repository(),
                "pusher": {"name": "dgw"},
                "commits": []
            }),
        );
        assert_eq!(
            tagged,
            vec!["[sopel-github] dgw tagged v1.0.0 at master https://example.com/compare/v1.0.0"]
        );

        let deleted = rendered(
            "push",
            json!({
                "ref": "refs/heads/old",
                "before": "3333333333333333333333333333333333333333",
                "after": "0000000000000000000000000000000000000000",
                "deleted": true,
                "compare": "https://example.com/compare",
                "repository": repository(),
                "pusher": {"name": "dgw"},
                "commits": []
            }),
        );
        assert_eq!(
            deleted,
            vec!["[sopel-github] dgw deleted old at 3333333 https://github.com/sopel-irc/sopel-github/commit/3333333"]
        );
    }

    #[test]
    fn new_branch_without_commits_counts_zero_as_plural() {
        let lines = rendered(
            "push",
            json!({
                "ref": "refs/heads/topic",
                "before": "0000000000000000000000000000000000000000",
                "after": "2222222222222222222222222222222222222222",
                "created": true,
                "compare": "https://example.com/compare/topic",
                "repository": repository(),
                "pusher": {"name": "dgw"},
                "commits": []
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] dgw created topic at 2222222 (+0 new commits) https://example.com/compare/topic"]
        );
    }

    #[test]
    fn merged_pull_requests_from_forks() {
        let lines = rendered(
            "pull_request",
            json!({
                "action": "closed",
                "repository": repository(),
                "sender": {"login": "maintainer"},
                "pull_request": {
                    "number": 42,
                    "title": "Add webhooks",
                    "html_url": "https://github.com/sopel-irc/sopel-github/pull/42",
                    "user": {"login": "contributor"},
                    "merged": true,
                    "base": {"ref": "master", "user": {"login": "sopel-irc"}},
                    "head": {"ref": "hooks", "user": {"login": "contributor"}}
                }
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] maintainer merged contributor's pull request #42: Add webhooks (sopel-irc:master...contributor:hooks) https://github.com/sopel-irc/sopel-github/pull/42"]
        );
    }

    #[test]
    fn self_assignment_reads_naturally() {
        let lines = rendered(
            "issues",
            json!({
                "action": "assigned",
                "repository": repository(),
                "sender": {"login": "dgw"},
                "assignee": {"login": "dgw"},
                "issue": {
                    "number": 7,
                    "title": "Broken",
                    "html_url": "https://github.com/sopel-irc/sopel-github/issues/7",
                    "user": {"login": "reporter"}
                }
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] dgw self-assigned issue #7 (Broken) https://github.com/sopel-irc/sopel-github/issues/7"]
        );
    }

    #[test]
    fn labels_on_pull_requests() {
        let lines = rendered(
            "pull_request",
            json!({
                "action": "labeled",
                "repository": repository(),
                "sender": {"login": "dgw"},
                "label": {"name": "Bug"},
                "pull_request": {
                    "number": 42,
                    "title": "Add webhooks",
                    "html_url": "https://github.com/sopel-irc/sopel-github/pull/42",
                    "user": {"login": "contributor"},
                    "base": {"ref": "master", "user": {"login": "sopel-irc"}},
                    "head": {"ref": "hooks", "user": {"login": "sopel-irc"}}
                }
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] dgw added the label 'Bug' to pull request #42 (Add webhooks) https://github.com/sopel-irc/sopel-github/pull/42"]
        );
    }

    #[test]
    fn reviews_summarize_their_body() {
        let lines = rendered(
            "pull_request_review",
            json!({
                "action": "submitted",
                "repository": repository(),
                "sender": {"login": "reviewer"},
                "review": {
                    "state": "changes_requested",
                    "body": "> quoted\nPlease add tests.",
                    "html_url": "https://github.com/r/1",
                    "user": {"login": "reviewer"}
                },
                "pull_request": {
                    "number": 42,
                    "title": "t",
                    "html_url": "u",
                    "user": {"login": "contributor"},
                    "base": {"ref": "master"},
                    "head": {"ref": "hooks"}
                }
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] reviewer requested changes on pull request #42: Please add tests. https://github.com/r/1"]
        );
    }

    #[test]
    fn several_wiki_pages_are_summed_up() {
        let page = |title: &str, action: &str| {
            json!({"title": title, "action": action, "html_url": format!("https://wiki/{title}")})
        };
        let lines = rendered(
            "gollum",
            json!({
                "repository": repository(),
                "sender": {"login": "dgw"},
                "pages": [page("Home", "edited"), page("Setup", "created"), page("FAQ", "edited")]
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] dgw created 1 and edited 2 wiki pages https://wiki/Home"]
        );
    }

    #[test]
    fn statuses_find_their_branch() {
        let lines = rendered(
            "status",
            json!({
                "repository": repository(),
                "sha": "abc",
                "state": "success",
                "description": "CI passed",
                "target_url": "https://ci.example.com/1",
                "branches": [
                    {"name": "other", "commit": {"sha": "def"}},
                    {"name": "master", "commit": {"sha": "abc"}}
                ]
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github/master] CI passed - https://ci.example.com/1 (success)"]
        );
    }

    #[test]
    fn newlines_in_payload_text_stay_on_one_line() {
        let parsed = HookEvent::parse(
            "status",
            json!({
                "repository": repository(),
                "sha": "abc",
                "state": "success",
                "description": "ok\nPRIVMSG #victim :pwned",
                "target_url": "https://ci.example.com/1\r\nQUIT",
                "branches": []
            }),
        )
        .unwrap();
        let lines = render(&parsed, &HookColors::default());
        assert_eq!(lines.len(), 1);
        assert!(!lines[0].contains(['\n', '\r']), "{:?}", lines[0]);
        assert_eq!(
            plain(&lines[0]),
            "[sopel-github] ok PRIVMSG #victim :pwned - https://ci.example.com/1  QUIT (success)"
        );
    }

    #[test]
    fn releases_prefer_their_name() {
        let lines = rendered(
            "release",
            json!({
                "action": "published",
                "repository": repository(),
                "release": {
                    "name": "",
                    "tag_name": "v0.4.0",
                    "prerelease": true,
                    "html_url": "https://github.com/r/releases/v0.4.0",
                    "author": {"login": "dgw"}
                }
            }),
        );
        assert_eq!(
            lines,
            vec!["[sopel-github] dgw released v0.4.0 (prerelease) https://github.com/r/releases/v0.4.0"]
        );
    }

    #[test]
    fn unhandled_events_say_nothing() {
        let unhandled = HookEvent::Unhandled {
            event: "fork".to_string(),
            action: None,
        };
        assert!(render(&unhandled, &HookColors::default()).is_empty());
    }
}
