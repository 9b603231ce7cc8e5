//! Webhook payloads, narrowed to the (event, action) pairs we announce.
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Why a delivery was accepted but won't be announced.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("{event} payload is malformed: {source}")]
    Malformed {
        event: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{event}/{action} payload has no {field}")]
    Missing {
        event: String,
        action: String,
        field: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct Account {
    pub login: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HookRepo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueKind {
    Issue,
    PullRequest,
}

impl IssueKind {
    pub fn noun(&self) -> &'static str {
        match self {
            IssueKind::Issue => "issue",
            IssueKind::PullRequest => "pull request",
        }
    }

    pub fn short(&self) -> &'static str {
        match self {
            IssueKind::Issue => "issue",
            IssueKind::PullRequest => "PR",
        }
    }
}

/// The issue or pull request an event happened to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Target {
    pub kind: IssueKind,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub author: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pusher {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PushCommit {
    pub id: String,
    pub message: String,
    #[serde(default = "yes")]
    pub distinct: bool,
    pub url: String,
    pub author: CommitAuthor,
}

fn yes() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct Push {
    pub repository: HookRepo,
    #[serde(default)]
    pub pusher: Option<Pusher>,
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub base_ref: Option<String>,
    pub before: String,
    pub after: String,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub forced: bool,
    pub compare: String,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
    #[serde(default)]
    pub distinct_commits: Option<Vec<PushCommit>>,
}

impl Push {
    /// The commits this push introduced, skipping ones already on another branch.
    pub fn distinct(&self) -> Vec<&PushCommit> {
        match &self.distinct_commits {
            Some(commits) => commits.iter().collect(),
            None => self
                .commits
                .iter()
                .filter(|c| c.distinct && !c.message.trim().is_empty())
                .collect(),
        }
    }

    pub fn pusher(&self) -> &str {
        self.pusher.as_ref().map_or("somebody", |p| p.name.as_str())
    }

    pub fn ref_name(&self) -> &str {
        strip_ref(&self.git_ref)
    }

    pub fn base_ref_name(&self) -> Option<&str> {
        self.base_ref.as_deref().map(strip_ref)
    }

    pub fn is_tag(&self) -> bool {
        self.git_ref.starts_with("refs/tags/")
    }

    pub fn is_creation(&self) -> bool {
        self.created || is_null_sha(&self.before)
    }

    pub fn is_deletion(&self) -> bool {
        self.deleted || is_null_sha(&self.after)
    }
}

fn strip_ref(git_ref: &str) -> &str {
    git_ref
        .strip_prefix("refs/heads/")
        .or_else(|| git_ref.strip_prefix("refs/tags/"))
        .unwrap_or(git_ref)
}

fn is_null_sha(sha: &str) -> bool {
    sha.len() >= 40 && sha.bytes().take(40).all(|b| b == b'0')
}

/// The short form GitHub shows for a commit.
pub fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

#[derive(Clone, Debug, Deserialize)]
pub struct BranchTip {
    #[serde(rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub user: Option<Account>,
}

impl BranchTip {
    pub fn owner(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.login.as_str())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub html_url: String,
    pub user: Account,
    #[serde(default)]
    pub merged: Option<bool>,
    #[serde(default)]
    pub draft: Option<bool>,
    pub base: BranchTip,
    pub head: BranchTip,
}

impl PullRequest {
    fn target(&self) -> Target {
        Target {
            kind: IssueKind::PullRequest,
            number: self.number,
            title: self.title.clone(),
            url: self.html_url.clone(),
            author: self.user.login.clone(),
        }
    }
}

/// What happened to a pull request, in the words we announce it with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PullState {
    Opened,
    Drafted,
    Reopened,
    Closed,
    Merged,
    Readied,
    UnReadied,
}

impl PullState {
    pub fn verb(&self) -> &'static str {
        match self {
            PullState::Opened => "opened",
            PullState::Drafted => "drafted",
            PullState::Reopened => "reopened",
            PullState::Closed => "closed",
            PullState::Merged => "merged",
            PullState::Readied => "readied",
            PullState::UnReadied => "un-readied",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IssueState {
    Opened,
    Reopened,
    Closed,
}

impl IssueState {
    pub fn verb(&self) -> &'static str {
        match self {
            IssueState::Opened => "opened",
            IssueState::Reopened => "reopened",
            IssueState::Closed => "closed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approved,
    ChangesRequested,
    Commented,
}

impl Verdict {
    pub fn verb(&self) -> &'static str {
        match self {
            Verdict::Approved => "approved",
            Verdict::ChangesRequested => "requested changes on",
            Verdict::Commented => "left a review on",
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WikiPage {
    pub title: String,
    pub action: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub html_url: String,
}

#[derive(Clone, Debug)]
pub enum HookEvent {
    Ping {
        repo: HookRepo,
        sender: String,
        zen: String,
    },
    Push(Box<Push>),
    CommitComment {
        repo: HookRepo,
        sender: String,
        commit_id: String,
        body: Option<String>,
        url: String,
    },
    PullRequest {
        repo: HookRepo,
        sender: String,
        pull: Box<PullRequest>,
        state: PullState,
    },
    Issue {
        repo: HookRepo,
        sender: String,
        target: Target,
        state: IssueState,
    },
    /// An issue that arrived here from another repo. GitHub doesn't say who moved it.
    TransferredIn {
        repo: HookRepo,
        target: Target,
        from_repo: String,
        from_number: u64,
    },
    TransferredOut {
        repo: HookRepo,
        sender: String,
        target: Target,
        to_repo: String,
        to_number: u64,
        to_url: String,
    },
    Retitled {
        repo: HookRepo,
        sender: String,
        target: Target,
        from: String,
    },
    Assignment {
        repo: HookRepo,
        sender: String,
        target: Target,
        assignee: String,
        assigned: bool,
    },
    Label {
        repo: HookRepo,
        sender: String,
        target: Target,
        label: String,
        added: bool,
    },
    Milestone {
        repo: HookRepo,
        sender: String,
        target: Target,
        milestone: String,
        added: bool,
    },
    IssueComment {
        repo: HookRepo,
        sender: String,
        target: Target,
        body: Option<String>,
        url: String,
    },
    Review {
        repo: HookRepo,
        sender: String,
        number: u64,
        verdict: Verdict,
        body: Option<String>,
        url: String,
    },
    ReviewDismissed {
        repo: HookRepo,
        sender: String,
        number: u64,
        reviewer: String,
        url: String,
    },
    ReviewComment {
        repo: HookRepo,
        sender: String,
        number: u64,
        commit_id: String,
        body: Option<String>,
        url: String,
    },
    Wiki {
        repo: HookRepo,
        sender: String,
        pages: Vec<WikiPage>,
    },
    Star {
        repo: HookRepo,
        sender: String,
    },
    Status {
        repo: HookRepo,
        branch: Option<String>,
        state: String,
        description: Option<String>,
        target_url: Option<String>,
    },
    Release {
        repo: HookRepo,
        author: String,
        name: String,
        prerelease: bool,
        url: String,
    },
    Unhandled {
        event: String,
        action: Option<String>,
    },
}

#[derive(Deserialize)]
struct Titled {
    from: String,
}

#[derive(Deserialize)]
struct FullName {
    full_name: String,
}

#[derive(Deserialize)]
struct Numbered {
    number: u64,
    #[serde(default)]
    html_url: Option<String>,
}

#[derive(Deserialize, Default)]
struct Changes {
    title: Option<Titled>,
    old_repository: Option<FullName>,
    old_issue: Option<Numbered>,
    new_repository: Option<FullName>,
    new_issue: Option<Numbered>,
}

#[derive(Deserialize)]
struct Named {
    name: String,
}

#[derive(Deserialize)]
struct MilestoneTitle {
    title: String,
}

#[derive(Deserialize)]
struct RawIssue {
    number: u64,
    title: String,
    html_url: String,
    user: Account,
    #[serde(default)]
    pull_request: Option<Value>,
}

impl RawIssue {
    fn target(self) -> Target {
        let kind = if self.pull_request.is_some() || self.html_url.contains("/pull/") {
            IssueKind::PullRequest
        } else {
            IssueKind::Issue
        };
        Target {
            kind,
            number: self.number,
            title: self.title,
            url: self.html_url,
            author: self.user.login,
        }
    }
}

#[derive(Deserialize)]
struct PingPayload {
    repository: HookRepo,
    sender: Account,
    #[serde(default)]
    zen: String,
}

#[derive(Deserialize)]
struct CommentBody {
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    #[serde(default)]
    commit_id: Option<String>,
}

#[derive(Deserialize)]
struct CommitCommentPayload {
    repository: HookRepo,
    sender: Account,
    comment: CommentBody,
}

#[derive(Deserialize)]
struct PullRequestPayload {
    action: String,
    repository: HookRepo,
    sender: Account,
    pull_request: PullRequest,
    changes: Option<Changes>,
    assignee: Option<Account>,
    label: Option<Named>,
}

#[derive(Deserialize)]
struct IssuesPayload {
    action: String,
    repository: HookRepo,
    sender: Account,
    issue: RawIssue,
    changes: Option<Changes>,
    assignee: Option<Account>,
    label: Option<Named>,
    milestone: Option<MilestoneTitle>,
}

#[derive(Deserialize)]
struct IssueCommentPayload {
    action: String,
    repository: HookRepo,
    sender: Account,
    issue: RawIssue,
    comment: CommentBody,
}

#[derive(Deserialize)]
struct RawReview {
    state: String,
    #[serde(default)]
    body: Option<String>,
    html_url: String,
    user: Account,
}

#[derive(Deserialize)]
struct ReviewPayload {
    action: String,
    repository: HookRepo,
    sender: Account,
    review: RawReview,
    pull_request: PullRequest,
}

#[derive(Deserialize)]
struct ReviewCommentPayload {
    action: String,
    repository: HookRepo,
    sender: Account,
    comment: CommentBody,
    pull_request: PullRequest,
}

#[derive(Deserialize)]
struct GollumPayload {
    repository: HookRepo,
    sender: Account,
    #[serde(default)]
    pages: Vec<WikiPage>,
}

#[derive(Deserialize)]
struct WatchPayload {
    action: String,
    repository: HookRepo,
    sender: Account,
}

#[derive(Deserialize)]
struct StatusCommit {
    sha: String,
}

#[derive(Deserialize)]
struct StatusBranch {
    name: String,
    commit: StatusCommit,
}

#[derive(Deserialize)]
struct StatusPayload {
    repository: HookRepo,
    sha: String,
    state: String,
    description: Option<String>,
    target_url: Option<String>,
    #[serde(default)]
    branches: Vec<StatusBranch>,
}

#[derive(Deserialize)]
struct RawRelease {
    #[serde(default)]
    name: Option<String>,
    tag_name: String,
    #[serde(default)]
    prerelease: bool,
    html_url: String,
    author: Account,
}

#[derive(Deserialize)]
struct ReleasePayload {
    action: String,
    repository: HookRepo,
    release: RawRelease,
}

fn decode<T: DeserializeOwned>(event: &str, payload: Value) -> Result<T, PayloadError> {
    serde_json::from_value(payload).map_err(|source| PayloadError::Malformed {
        event: event.to_string(),
        source,
    })
}

fn missing(event: &str, action: &str, field: &'static str) -> PayloadError {
    PayloadError::Missing {
        event: event.to_string(),
        action: action.to_string(),
        field,
    }
}

impl HookEvent {
    /// Narrow a raw payload to the event it describes.
    ///
    /// `event` is the `X-GitHub-Event` header. Pairs we don't announce come back as
    /// [`HookEvent::Unhandled`]; payloads missing something the announcement needs are errors.
    pub fn parse(event: &str, payload: Value) -> Result<HookEvent, PayloadError> {
        let action = payload
            .get("action")
            .and_then(Value::as_str)
            .map(str::to_string);
        let unhandled = || HookEvent::Unhandled {
            event: event.to_string(),
            action: action.clone(),
        };

        let parsed = match event {
            "ping" => {
                let p: PingPayload = decode(event, payload)?;
                HookEvent::Ping {
                    repo: p.repository,
                    sender: p.sender.login,
                    zen: p.zen,
                }
            }
            "push" => HookEvent::Push(Box::new(decode(event, payload)?)),
            "commit_comment" => {
                if action.as_deref().map_or(false, |a| a != "created") {
                    return Ok(unhandled());
                }
                let p: CommitCommentPayload = decode(event, payload)?;
                let commit_id = p
                    .comment
                    .commit_id
                    .ok_or_else(|| missing(event, "created", "comment.commit_id"))?;
                HookEvent::CommitComment {
                    repo: p.repository,
                    sender: p.sender.login,
                    commit_id,
                    body: p.comment.body,
                    url: p.comment.html_url,
                }
            }
            "pull_request" => pull_request(event, decode(event, payload)?)?.unwrap_or_else(unhandled),
            "issues" => issues(event, decode(event, payload)?)?.unwrap_or_else(unhandled),
            "issue_comment" => {
                let p: IssueCommentPayload = decode(event, payload)?;
                if p.action != "created" {
                    return Ok(unhandled());
                }
                HookEvent::IssueComment {
                    repo: p.repository,
                    sender: p.sender.login,
                    target: p.issue.target(),
                    body: p.comment.body,
                    url: p.comment.html_url,
                }
            }
            "pull_request_review" => review(event, decode(event, payload)?)?.unwrap_or_else(unhandled),
            "pull_request_review_comment" => {
                let p: ReviewCommentPayload = decode(event, payload)?;
                if p.action != "created" {
                    return Ok(unhandled());
                }
                let commit_id = p
                    .comment
                    .commit_id
                    .ok_or_else(|| missing(event, "created", "comment.commit_id"))?;
                HookEvent::ReviewComment {
                    repo: p.repository,
                    sender: p.sender.login,
                    number: p.pull_request.number,
                    commit_id,
                    body: p.comment.body,
                    url: p.comment.html_url,
                }
            }
            "gollum" => {
                let p: GollumPayload = decode(event, payload)?;
                if p.pages.is_empty() {
                    return Err(missing(event, "", "pages"));
                }
                HookEvent::Wiki {
                    repo: p.repository,
                    sender: p.sender.login,
                    pages: p.pages,
                }
            }
            "watch" => {
                let p: WatchPayload = decode(event, payload)?;
                if p.action != "started" {
                    return Ok(unhandled());
                }
                HookEvent::Star {
                    repo: p.repository,
                    sender: p.sender.login,
                }
            }
            "status" => {
                let p: StatusPayload = decode(event, payload)?;
                let branch = p
                    .branches
                    .into_iter()
                    .find(|b| b.commit.sha == p.sha)
                    .map(|b| b.name);
                HookEvent::Status {
                    repo: p.repository,
                    branch,
                    state: p.state,
                    description: p.description,
                    target_url: p.target_url,
                }
            }
            "release" => {
                let p: ReleasePayload = decode(event, payload)?;
                if p.action != "published" {
                    return Ok(unhandled());
                }
                let name = match p.release.name {
                    Some(name) if !name.trim().is_empty() => name,
                    _ => p.release.tag_name,
                };
                HookEvent::Release {
                    repo: p.repository,
                    author: p.release.author.login,
                    name,
                    prerelease: p.release.prerelease,
                    url: p.release.html_url,
                }
            }
            _ => unhandled(),
        };
        Ok(parsed)
    }
}

fn pull_request(event: &str, p: PullRequestPayload) -> Result<Option<HookEvent>, PayloadError> {
    let action = p.action.as_str();
    let state = match action {
        "opened" if p.pull_request.draft.unwrap_or(false) => Some(PullState::Drafted),
        "opened" => Some(PullState::Opened),
        "reopened" => Some(PullState::Reopened),
        "closed" if p.pull_request.merged.unwrap_or(false) => Some(PullState::Merged),
        "closed" => Some(PullState::Closed),
        "ready_for_review" => Some(PullState::Readied),
        "converted_to_draft" => Some(PullState::UnReadied),
        _ => None,
    };
    if let Some(state) = state {
        return Ok(Some(HookEvent::PullRequest {
            repo: p.repository,
            sender: p.sender.login,
            pull: Box::new(p.pull_request),
            state,
        }));
    }

    let target = p.pull_request.target();
    let parsed = match action {
        "edited" => {
            let from = p
                .changes
                .and_then(|c| c.title)
                .ok_or_else(|| missing(event, action, "changes.title"))?;
            HookEvent::Retitled {
                repo: p.repository,
                sender: p.sender.login,
                target,
                from: from.from,
            }
        }
        "assigned" | "unassigned" => {
            let assignee = p.assignee.ok_or_else(|| missing(event, action, "assignee"))?;
            HookEvent::Assignment {
                repo: p.repository,
                sender: p.sender.login,
                target,
                assignee: assignee.login,
                assigned: action == "assigned",
            }
        }
        "labeled" | "unlabeled" => {
            let label = p.label.ok_or_else(|| missing(event, action, "label"))?;
            HookEvent::Label {
                repo: p.repository,
                sender: p.sender.login,
                target,
                label: label.name,
                added: action == "labeled",
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(parsed))
}

fn issues(event: &str, p: IssuesPayload) -> Result<Option<HookEvent>, PayloadError> {
    let action = p.action.as_str();
    let target = p.issue.target();
    let sender = p.sender.login;
    let repo = p.repository;
    let changes = p.changes.unwrap_or_default();

    let state = match action {
        "opened" => Some(IssueState::Opened),
        "reopened" => Some(IssueState::Reopened),
        "closed" => Some(IssueState::Closed),
        _ => None,
    };

    let parsed = match (state, action) {
        (Some(state), _) => match (changes.old_repository, changes.old_issue) {
            (Some(from_repo), Some(from_issue)) => HookEvent::TransferredIn {
                repo,
                target,
                from_repo: from_repo.full_name,
                from_number: from_issue.number,
            },
            _ => HookEvent::Issue {
                repo,
                sender,
                target,
                state,
            },
        },
        (None, "edited") => {
            let from = changes
                .title
                .ok_or_else(|| missing(event, action, "changes.title"))?;
            HookEvent::Retitled {
                repo,
                sender,
                target,
                from: from.from,
            }
        }
        (None, "assigned" | "unassigned") => {
            let assignee = p.assignee.ok_or_else(|| missing(event, action, "assignee"))?;
            HookEvent::Assignment {
                repo,
                sender,
                target,
                assignee: assignee.login,
                assigned: action == "assigned",
            }
        }
        (None, "labeled" | "unlabeled") => {
            let label = p.label.ok_or_else(|| missing(event, action, "label"))?;
            HookEvent::Label {
                repo,
                sender,
                target,
                label: label.name,
                added: action == "labeled",
            }
        }
        (None, "milestoned" | "demilestoned") => {
            let milestone = p
                .milestone
                .ok_or_else(|| missing(event, action, "milestone"))?;
            HookEvent::Milestone {
                repo,
                sender,
                target,
                milestone: milestone.title,
                added: action == "milestoned",
            }
        }
        (None, "transferred") => {
            let to_repo = changes
                .new_repository
                .ok_or_else(|| missing(event, action, "changes.new_repository"))?;
            let to_issue = changes
                .new_issue
                .ok_or_else(|| missing(event, action, "changes.new_issue"))?;
            let to_url = to_issue
                .html_url
                .ok_or_else(|| missing(event, action, "changes.new_issue.html_url"))?;
            HookEvent::TransferredOut {
                repo,
                sender,
                target,
                to_repo: to_repo.full_name,
                to_number: to_issue.number,
                to_url,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(parsed))
}

fn review(event: &str, p: ReviewPayload) -> Result<Option<HookEvent>, PayloadError> {
    let parsed = match p.action.as_str() {
        "submitted" => {
            let verdict = match p.review.state.to_lowercase().as_str() {
                "approved" => Verdict::Approved,
                "changes_requested" => Verdict::ChangesRequested,
                "commented" => Verdict::Commented,
                _ => return Ok(None),
            };
            let body = p.review.body.filter(|b| !b.trim().is_empty());
            if verdict == Verdict::Commented && body.is_none() {
                // the review comments arrive as their own deliveries
                return Err(missing(event, "submitted", "review.body"));
            }
            HookEvent::Review {
                repo: p.repository,
                sender: p.sender.login,
                number: p.pull_request.number,
                verdict,
                body,
                url: p.review.html_url,
            }
        }
        "dismissed" => HookEvent::ReviewDismissed {
            repo: p.repository,
            sender: p.sender.login,
            number: p.pull_request.number,
            reviewer: p.review.user.login,
            url: p.review.html_url,
        },
        _ => return Ok(None),
    };
    Ok(Some(parsed))
}
