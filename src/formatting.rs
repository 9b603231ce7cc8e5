//! Turning GitHub data into single IRC lines.
use base64::Engine;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use std::collections::BTreeMap;

use crate::github::{Commit, FileContents, Issue, IssueComment, Repository};
use crate::matcher::LineSpan;
use crate::refs::{IssueRef, RepoRef};

pub const BOLD: char = '\x02';
pub const COLOR: char = '\x03';
pub const MONOSPACE: char = '\x11';
pub const RESET: char = '\x0f';

/// Leave room for the PRIVMSG envelope inside IRC's 512-byte limit.
pub const MAX_LINE_BYTES: usize = 400;
/// How much of a comment body we show.
pub const BODY_CHARS: usize = 250;
/// Anything younger than this gets a relative date.
const RECENT_DAYS: i64 = 30;
/// Language breakdown colors, used in rotation.
const LANGUAGE_COLORS: [u8; 4] = [12, 8, 9, 13];

static MARKDOWN_HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"^#+\s+").unwrap());
static COMMIT_SHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([0-9a-f]{7})[0-9a-f]{33}\b").unwrap());

/// Formatting codes IRC clients understand: bold, color, reset, monospace, reverse,
/// italics, strikethrough, underline.
const FORMATTING_CODES: [char; 8] = [BOLD, COLOR, RESET, MONOSPACE, '\x16', '\x1d', '\x1e', '\x1f'];

pub fn bold(text: &str) -> String {
    format!("{BOLD}{text}{BOLD}")
}

pub fn color(text: &str, fg: u8) -> String {
    format!("{COLOR}{fg:02}{text}{COLOR}")
}

pub fn monospace(text: &str) -> String {
    format!("{MONOSPACE}{text}{MONOSPACE}")
}

fn tag() -> String {
    bold("[GitHub]")
}

/// `1 file`, `0 files`, `2 files`.
pub fn pluralize(count: u64, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

/// Replace `:shortcode:` tokens with the emoji they name. Unknown codes are left alone.
#[cfg(feature = "emoji")]
pub fn emojize(text: &str) -> String {
    static SHORTCODE: Lazy<Regex> = Lazy::new(|| Regex::new(r":([a-z0-9_+\-]+):").unwrap());
    SHORTCODE
        .replace_all(text, |caps: &regex::Captures| {
            emojis::get_by_shortcode(&caps[1])
                .map(|e| e.as_str().to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(not(feature = "emoji"))]
pub fn emojize(text: &str) -> String {
    text.to_string()
}

/// Replace line breaks and other control characters with spaces, keeping formatting codes.
///
/// A stray `\r` or `\n` would end the PRIVMSG early and send the rest as a raw command.
pub fn one_line(text: &str) -> String {
    text.chars()
        .map(|c| {
            if c.is_control() && !FORMATTING_CODES.contains(&c) {
                ' '
            } else {
                c
            }
        })
        .collect()
}

/// Flatten a line and cut it down to what one IRC message can carry, on a char boundary.
pub fn clip(line: String) -> String {
    let line = one_line(&line);
    if line.len() <= MAX_LINE_BYTES {
        return line;
    }
    let ellipsis = '…';
    let mut end = MAX_LINE_BYTES - ellipsis.len_utf8();
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{ellipsis}", &line[..end])
}

/// The first chunk of `text` no longer than `width` chars, broken at whitespace when possible.
fn first_chunk(text: &str, width: usize) -> &str {
    let Some((cut, _)) = text.char_indices().nth(width) else {
        return text;
    };
    let head = &text[..cut];
    if text[cut..].starts_with(char::is_whitespace) {
        return head.trim_end();
    }
    match head.rfind(char::is_whitespace) {
        Some(space) if !head[..space].trim_end().is_empty() => head[..space].trim_end(),
        _ => head,
    }
}

/// Squash a Markdown comment body into a short one-line summary.
///
/// Quotes, headings, and HTML comments are dropped, the rest is joined into one line
/// and wrapped at [`BODY_CHARS`]. Full commit SHAs are cut to seven characters.
/// The ellipsis only appears if wrapping cut something off.
pub fn short_body(body: Option<&str>) -> String {
    let Some(body) = body.filter(|b| !b.trim().is_empty()) else {
        return "(empty comment)".to_string();
    };

    let lines: Vec<&str> = body
        .lines()
        .filter(|line| {
            !line.starts_with('>') && !MARKDOWN_HEADING.is_match(line) && !line.starts_with("<!-")
        })
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return "(no body text)".to_string();
    }

    let joined = COMMIT_SHA.replace_all(&lines.join(" "), "$1").into_owned();
    let short = first_chunk(&joined, BODY_CHARS);
    if short.len() < joined.len() {
        format!("{short} …")
    } else {
        joined
    }
}

/// The first line of a commit message, with `…` if there was more.
pub fn first_line(message: &str) -> String {
    let first = message.lines().next().unwrap_or("");
    if first.trim_end() == message.trim_end() {
        first.to_string()
    } else {
        format!("{first}…")
    }
}

/// `3 days, 4 hours ago`, or `in 5 minutes` for the future. Two units at most.
pub fn human_duration(seconds: i64) -> String {
    const UNITS: [(i64, &str, &str); 6] = [
        (365 * 24 * 3600, "year", "years"),
        (30 * 24 * 3600, "month", "months"),
        (24 * 3600, "day", "days"),
        (3600, "hour", "hours"),
        (60, "minute", "minutes"),
        (1, "second", "seconds"),
    ];

    let mut remaining = seconds.abs();
    let mut parts = Vec::new();
    for (size, singular, plural) in UNITS {
        if parts.len() == 2 {
            break;
        }
        let count = remaining / size;
        if count > 0 {
            parts.push(pluralize(count as u64, singular, plural));
            remaining -= count * size;
        } else if !parts.is_empty() {
            // adjacent units only
            break;
        }
    }
    if parts.is_empty() {
        return "just now".to_string();
    }

    let span = parts.join(", ");
    if seconds < 0 {
        format!("in {span}")
    } else {
        format!("{span} ago")
    }
}

/// Relative for recent dates, absolute (and labelled UTC) for old ones.
pub fn fmt_when(when: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let age = now.signed_duration_since(when);
    if age.num_days().abs() < RECENT_DAYS {
        human_duration(age.num_seconds())
    } else {
        when.format("%Y-%m-%d %H:%M:%S UTC").to_string()
    }
}

/// `[GitHub] [owner/repo #42] merged PR by someone, created 2 days ago: Title | body | url`
pub fn issue_line(issue_ref: &IssueRef, issue: &Issue, now: DateTime<Utc>) -> String {
    let (kind, state) = match &issue.pull_request {
        Some(pr) if issue.state == "closed" && pr.merged_at.is_some() => ("PR", "merged"),
        Some(_) => ("PR", issue.state.as_str()),
        None => ("issue", issue.state.as_str()),
    };
    let sep = bold(" | ");
    clip(format!(
        "{} [{} #{}] {state} {kind} by {}, created {}: {}{sep}{}{sep}{}",
        tag(),
        issue_ref.repo,
        issue_ref.number,
        issue.user.login,
        fmt_when(issue.created_at, now),
        emojize(&issue.title),
        emojize(&short_body(issue.body.as_deref())),
        issue.html_url,
    ))
}

pub fn comment_line(issue_ref: &IssueRef, comment: &IssueComment, now: DateTime<Utc>) -> String {
    clip(format!(
        "{} [{} #{}] Comment by {}, created {}: {}",
        tag(),
        issue_ref.repo,
        issue_ref.number,
        comment.user.login,
        fmt_when(comment.created_at, now),
        emojize(&short_body(comment.body.as_deref())),
    ))
}

pub fn commit_line(repo: &RepoRef, commit: &Commit, now: DateTime<Utc>) -> String {
    let mut summary = first_line(&commit.commit.message);
    if summary.trim().is_empty() {
        summary = "No commit message provided.".to_string();
    }
    let who = commit
        .author
        .as_ref()
        .map(|u| u.login.as_str())
        .unwrap_or(commit.commit.author.name.as_str());
    let sep = bold(" | ");
    clip(format!(
        "{} [{repo}] {who}: {}{sep}{} in {}{sep}Authored {}{sep}Committed {}",
        tag(),
        emojize(&summary),
        pluralize(commit.stats.total, "change", "changes"),
        pluralize(commit.files.len() as u64, "file", "files"),
        fmt_when(commit.commit.author.date, now),
        fmt_when(commit.commit.committer.date, now),
    ))
}

/// One line of a file, if the contents decode and the line exists.
fn snippet(file: &FileContents, line: usize) -> Option<String> {
    let packed: String = file.content.split_whitespace().collect();
    let bytes = base64::engine::general_purpose::STANDARD.decode(packed).ok()?;
    let text = String::from_utf8(bytes).ok()?;
    let wanted = text.lines().nth(line.checked_sub(1)?)?.trim_end();
    if wanted.trim().is_empty() {
        None
    } else {
        Some(wanted.to_string())
    }
}

pub fn file_line(repo: &RepoRef, git_ref: &str, file: &FileContents, lines: Option<LineSpan>) -> String {
    let mut out = format!("{} [{repo}] {} @ {git_ref}", tag(), file.path);
    if let Some(span) = lines {
        if let Some(text) = snippet(file, span.start) {
            out.push_str(&format!(" | L{}: {}", span.start, monospace(&text)));
            if let Some(end) = span.end {
                out.push_str(&format!(" […] (to L{end})"));
            }
        }
    }
    clip(out)
}

/// Top three languages by share, everything else lumped into "Other".
pub fn language_summary(languages: &BTreeMap<String, u64>) -> String {
    let total: u64 = languages.values().sum();
    if total == 0 {
        return String::new();
    }
    let mut sorted: Vec<(&String, &u64)> = languages.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    let percent = |bytes: u64| bytes as f64 / total as f64 * 100.0;
    let mut parts: Vec<String> = sorted
        .iter()
        .take(3)
        .enumerate()
        .map(|(i, (name, bytes))| color(&format!("{:.1}% {name}", percent(**bytes)), LANGUAGE_COLORS[i]))
        .collect();
    if sorted.len() > 3 {
        let rest: u64 = sorted.iter().skip(3).map(|(_, b)| **b).sum();
        parts.push(color(&format!("{:.1}% Other", percent(rest)), LANGUAGE_COLORS[3]));
    }
    parts.join(" ")
}

/// The repository summary. Chat-command lookups also get the URL.
pub fn repo_line(
    repo: &Repository,
    languages: &BTreeMap<String, u64>,
    now: DateTime<Utc>,
    with_url: bool,
) -> String {
    let mut out = format!("{} {}", tag(), repo.full_name);
    if let Some(description) = repo.description.as_deref().filter(|d| !d.trim().is_empty()) {
        out.push_str(&format!(" - {}", emojize(description)));
    }
    let languages = language_summary(languages);
    if !languages.is_empty() {
        out.push_str(&format!(" | {languages}"));
    }
    let pushed = repo
        .pushed_at
        .map(|when| fmt_when(when, now))
        .unwrap_or_else(|| "never".to_string());
    out.push_str(&format!(
        " | Last Push: {pushed} | Stargazers: {} | Watchers: {} | Forks: {} | Network: {} | Open Issues: {}",
        repo.stargazers_count,
        repo.subscribers_count,
        repo.forks_count,
        repo.network_count,
        repo.open_issues,
    ));
    if with_url {
        out.push_str(&format!(" | {}", repo.html_url));
    }
    clip(out)
}
