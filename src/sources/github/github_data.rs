use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-repository statistics snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryStats {
    pub name: String,
    pub full_name: String,
    pub stargazers_count: u64,
    pub stars_last_month: u64,
    pub stars_last_year: u64,
    pub forks_count: u64,
    pub open_issues_count: u64,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
    pub contributors_count: u64,
    pub pull_requests_open: u64,
    pub pull_requests_closed: u64,
    pub pull_requests_last_month: u64,
    pub issues_open: u64,
    pub issues_closed: u64,
    pub issues_last_month: u64,
}

/// Organization-wide aggregate over all tracked repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubStats {
    pub organization: String,
    pub total_repositories: u64,
    pub total_stars: u64,
    pub total_stars_last_month: u64,
    pub total_stars_last_year: u64,
    pub unique_contributors: u64,
    pub organization_members: u64,
    pub total_pull_requests_open: u64,
    pub total_pull_requests_closed: u64,
    pub total_issues_open: u64,
    pub total_issues_closed: u64,
    pub timestamp: DateTime<Utc>,
    pub repositories: Vec<RepositoryStats>,
}
