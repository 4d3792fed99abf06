mod client;
mod github_data;
mod provider;

pub use client::{Client, ContributorSummary, User, is_bot_login};
pub use github_data::{GithubStats, RepositoryStats};
pub use provider::{Provider, SNAPSHOT};
