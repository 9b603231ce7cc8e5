#![allow(non_snake_case)]

pub mod config;
pub use config::{Config, ConfigError, GithubSettings, IrcSettings};

pub mod faces;
pub use faces::*;

pub mod formatting;
pub mod github;
pub use github::{GithubClient, GithubError};

pub mod hooks;

pub mod hubbot;
pub use hubbot::{Hubbot, Prompt};

pub mod matcher;
pub mod refs;
pub use refs::{IssueRef, RepoRef};

pub mod store;
pub use store::{MemoryStore, RedisStore, Store};
