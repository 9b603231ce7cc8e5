//! Names for things on GitHub: repositories and the issues inside them.
use serde::{Deserialize, Serialize};

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// An `owner/name` pair. GitHub treats both halves case-insensitively and so do we.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// The lowercased `owner/name` form we use as a storage key.
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name).to_lowercase()
    }
}

impl PartialEq for RepoRef {
    fn eq(&self, other: &Self) -> bool {
        self.owner.eq_ignore_ascii_case(&other.owner) && self.name.eq_ignore_ascii_case(&other.name)
    }
}

impl Eq for RepoRef {}

impl Hash for RepoRef {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepoParseError {
    #[error("expected owner/repo, not a URL")]
    LooksLikeUrl,
    #[error("expected owner/repo")]
    MissingSlash,
    #[error("owner and repo must both be non-empty")]
    Empty,
}

impl FromStr for RepoRef {
    type Err = RepoParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains("://") {
            return Err(RepoParseError::LooksLikeUrl);
        }
        let (owner, name) = s.split_once('/').ok_or(RepoParseError::MissingSlash)?;
        if owner.is_empty() || name.is_empty() || name.contains('/') || s.contains(char::is_whitespace)
        {
            return Err(RepoParseError::Empty);
        }
        Ok(RepoRef::new(owner, name))
    }
}

/// A numbered issue or pull request. The REST API serves both from the issues endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IssueRef {
    pub repo: RepoRef,
    pub number: u64,
}

impl IssueRef {
    pub fn new(repo: RepoRef, number: u64) -> Self {
        Self { repo, number }
    }
}

impl fmt::Display for IssueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.repo, self.number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn repo_refs_ignore_case() {
        let a: RepoRef = "Sopel-IRC/Sopel-GitHub".parse().unwrap();
        let b = RepoRef::new("sopel-irc", "sopel-github");
        assert_eq!(a, b);
        assert_eq!(a.key(), "sopel-irc/sopel-github");

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn repo_refs_must_look_like_repos() {
        assert_eq!("sopel".parse::<RepoRef>(), Err(RepoParseError::MissingSlash));
        assert_eq!("/sopel".parse::<RepoRef>(), Err(RepoParseError::Empty));
        assert_eq!("sopel-irc/".parse::<RepoRef>(), Err(RepoParseError::Empty));
        assert_eq!("a/b/c".parse::<RepoRef>(), Err(RepoParseError::Empty));
        assert_eq!(
            "https://github.com/sopel-irc/sopel".parse::<RepoRef>(),
            Err(RepoParseError::LooksLikeUrl)
        );
        assert_eq!(
            "  sopel-irc/sopel ".parse::<RepoRef>().unwrap().to_string(),
            "sopel-irc/sopel"
        );
    }
}
