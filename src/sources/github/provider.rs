use super::client::{Client, ContributorSummary, IssueSummary, PullSummary, Repository, STARGAZER_MEDIA_TYPE, Stargazer, count_from_link_header, is_bot_login};
use super::{GithubStats, RepositoryStats};
use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, Months, Utc};
use core::time::Duration;
use std::collections::{HashMap, HashSet};
use tokio::time::sleep;

const LOG_TARGET: &str = "    github";
const DEFAULT_BASE_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

/// Page cap for the created-descending "last month" scans.
const RECENT_PAGE_CAP: u32 = 10;

/// Politeness delay between pagination requests.
const PAGE_DELAY: Duration = Duration::from_millis(100);

/// Politeness delay between repositories.
const REPO_DELAY: Duration = Duration::from_millis(200);

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "github.json";

/// Star counts bucketed by how recently the star was given.
#[derive(Debug, Default, Clone, Copy)]
struct StarWindows {
    last_month: u64,
    last_year: u64,
}

/// Open/closed totals plus a last-month count, for issues or pull requests.
#[derive(Debug, Default, Clone, Copy)]
struct ActivityCounts {
    open: u64,
    closed: u64,
    last_month: u64,
}

/// Aggregates repository statistics across the organization's core packages.
#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    organization: String,
    now: DateTime<Utc>,
}

impl Provider {
    /// Create a provider for an organization. `base_url` overrides the real
    /// API endpoint, for tests.
    pub fn new(token: Option<&str>, organization: impl Into<String>, base_url: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: Client::new(token, base_url.unwrap_or(DEFAULT_BASE_URL))?,
            organization: organization.into(),
            now,
        })
    }

    /// Collect statistics for all core packages and write the aggregate snapshot.
    ///
    /// Sub-statistic failures for one repository (stars, PRs, issues) degrade
    /// to zero defaults; a failure to fetch the repository itself, or the
    /// contributor roster, fails the whole collector.
    pub async fn collect(&self, core_packages: &[String], store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting GitHub stats for organization '{}'", self.organization);

        let one_month_ago = months_back(self.now, 1);
        let one_year_ago = months_back(self.now, 12);

        let mut repositories = Vec::with_capacity(core_packages.len());
        for package in core_packages {
            let repo = self.repo_info(package).await?;

            let (stars, pulls, issues) = tokio::join!(
                self.star_windows(package, one_month_ago, one_year_ago),
                self.pull_request_counts(package, one_month_ago),
                self.issue_counts(package, one_month_ago),
            );

            let stars = stars.unwrap_or_else(|e| {
                log::warn!(target: LOG_TARGET, "Could not fetch star history for '{package}': {e:#}");
                StarWindows::default()
            });

            let pulls = pulls.unwrap_or_else(|e| {
                log::warn!(target: LOG_TARGET, "Could not fetch pull requests for '{package}': {e:#}");
                ActivityCounts::default()
            });

            let issues = issues.unwrap_or_else(|e| {
                log::warn!(target: LOG_TARGET, "Could not fetch issues for '{package}': {e:#}");
                ActivityCounts::default()
            });

            let stargazers_count = repo.stargazers_count.unwrap_or(0);
            repositories.push(RepositoryStats {
                name: repo.name,
                full_name: repo.full_name,
                stargazers_count,
                stars_last_month: stars.last_month,
                stars_last_year: stars.last_year,
                forks_count: repo.forks_count.unwrap_or(0),
                open_issues_count: repo.open_issues_count.unwrap_or(0),
                description: repo.description,
                html_url: repo.html_url,
                language: repo.language,
                updated_at: repo.updated_at,
                contributors_count: 0, // backfilled once the roster is known
                pull_requests_open: pulls.open,
                pull_requests_closed: pulls.closed,
                pull_requests_last_month: pulls.last_month,
                issues_open: issues.open,
                issues_closed: issues.closed,
                issues_last_month: issues.last_month,
            });

            log::info!(target: LOG_TARGET, "  {package} ({stargazers_count} stars)");
            sleep(REPO_DELAY).await;
        }

        let names: Vec<String> = repositories.iter().map(|r| r.name.clone()).collect();
        let (contributors, members) = tokio::join!(self.contributor_sets(&names), self.organization_member_count());

        let (all_contributors, per_repo_counts) = contributors?;
        let organization_members = members.unwrap_or_else(|e| {
            log::warn!(target: LOG_TARGET, "Could not fetch organization member count: {e:#}");
            0
        });

        for repo in &mut repositories {
            repo.contributors_count = per_repo_counts.get(&repo.name).copied().unwrap_or(0);
        }
        repositories.sort_by(|a, b| b.stargazers_count.cmp(&a.stargazers_count));

        let stats = aggregate(&self.organization, repositories, all_contributors.len() as u64, organization_members, self.now);
        store.save(SNAPSHOT, &stats)?;

        log::info!(target: LOG_TARGET, "Total stars: {}, contributors: {}", stats.total_stars, stats.unique_contributors);
        Ok(())
    }

    /// Construct API URL for a repository with optional path suffix
    fn repo_url(&self, repo: &str, suffix: &str) -> String {
        format!("{}/repos/{}/{repo}{suffix}", self.client.base_url(), self.organization)
    }

    async fn repo_info(&self, repo: &str) -> Result<Repository> {
        self.client.get_json(&self.repo_url(repo, "")).await
    }

    /// Total item count taken from the `Link` header of a `per_page=1` probe.
    async fn probe_count(&self, url: &str) -> Result<u64> {
        let resp = self.client.get(url, None).await?;
        Ok(count_from_link_header(resp.headers()))
    }

    /// Paginate stargazer timestamps and bucket them into the two windows.
    async fn star_windows(&self, repo: &str, one_month_ago: DateTime<Utc>, one_year_ago: DateTime<Utc>) -> Result<StarWindows> {
        let mut windows = StarWindows::default();
        let mut page = 1u32;

        loop {
            let url = self.repo_url(repo, &format!("/stargazers?per_page={PAGE_SIZE}&page={page}"));
            let batch: Vec<Stargazer> = self.client.get_json_with_accept(&url, STARGAZER_MEDIA_TYPE).await?;
            if batch.is_empty() {
                break;
            }

            count_star_windows(&batch, &mut windows, one_month_ago, one_year_ago);

            if batch.len() < PAGE_SIZE {
                break;
            }
            page += 1;
            sleep(PAGE_DELAY).await;
        }

        Ok(windows)
    }

    /// Open/closed totals from `Link`-header probes, plus a created-descending
    /// scan for pull requests opened in the last month.
    async fn pull_request_counts(&self, repo: &str, one_month_ago: DateTime<Utc>) -> Result<ActivityCounts> {
        let open = self.probe_count(&self.repo_url(repo, "/pulls?state=open&per_page=1")).await?;
        let closed = self.probe_count(&self.repo_url(repo, "/pulls?state=closed&per_page=1")).await?;

        let mut last_month = 0u64;
        let mut page = 1u32;
        while page <= RECENT_PAGE_CAP {
            let url = self.repo_url(repo, &format!("/pulls?state=all&per_page={PAGE_SIZE}&page={page}&sort=created&direction=desc"));
            let pulls: Vec<PullSummary> = self.client.get_json(&url).await?;
            if pulls.is_empty() {
                break;
            }

            let (counted, done) = count_recent(pulls.iter().map(|p| p.created_at), one_month_ago);
            last_month += counted;
            if done {
                break;
            }
            page += 1;
        }

        Ok(ActivityCounts { open, closed, last_month })
    }

    /// Exact open/closed issue counts plus a last-month count.
    ///
    /// The issues endpoint also returns pull requests; those are excluded
    /// everywhere here.
    async fn issue_counts(&self, repo: &str, one_month_ago: DateTime<Utc>) -> Result<ActivityCounts> {
        let open = self.exact_issue_count(repo, "open").await?;
        let closed = self.exact_issue_count(repo, "closed").await?;

        let mut last_month = 0u64;
        let mut page = 1u32;
        while page <= RECENT_PAGE_CAP {
            let url = self.repo_url(repo, &format!("/issues?state=all&per_page={PAGE_SIZE}&page={page}&sort=created&direction=desc"));
            let issues: Vec<IssueSummary> = self.client.get_json(&url).await?;
            if issues.is_empty() {
                break;
            }

            let (counted, done) = count_recent(
                issues.iter().filter(|i| !i.is_pull_request()).map(|i| i.created_at),
                one_month_ago,
            );
            last_month += counted;
            if done {
                break;
            }
            page += 1;
            sleep(PAGE_DELAY).await;
        }

        Ok(ActivityCounts { open, closed, last_month })
    }

    /// Walk every page of one issue state, counting non-PR items.
    async fn exact_issue_count(&self, repo: &str, state: &str) -> Result<u64> {
        let mut count = 0u64;
        let mut page = 1u32;

        loop {
            let url = self.repo_url(repo, &format!("/issues?state={state}&per_page={PAGE_SIZE}&page={page}"));
            let issues: Vec<IssueSummary> = self.client.get_json(&url).await?;
            if issues.is_empty() {
                break;
            }

            count += issues.iter().filter(|i| !i.is_pull_request()).count() as u64;

            if issues.len() < PAGE_SIZE {
                break;
            }
            page += 1;
            sleep(PAGE_DELAY).await;
        }

        Ok(count)
    }

    /// Per-repository and organization-wide unique contributor sets, bots excluded.
    async fn contributor_sets(&self, repos: &[String]) -> Result<(HashSet<String>, HashMap<String, u64>)> {
        let mut all_contributors = HashSet::new();
        let mut per_repo_counts = HashMap::with_capacity(repos.len());

        for repo in repos {
            let mut repo_contributors = HashSet::new();
            let mut page = 1u32;

            loop {
                let url = self.repo_url(repo, &format!("/contributors?per_page={PAGE_SIZE}&page={page}"));
                let batch: Vec<ContributorSummary> = self.client.get_json(&url).await?;
                if batch.is_empty() {
                    break;
                }

                for contributor in &batch {
                    if let Some(login) = &contributor.login {
                        if !is_bot_login(login) {
                            let _ = all_contributors.insert(login.clone());
                            let _ = repo_contributors.insert(login.clone());
                        }
                    }
                }

                if batch.len() < PAGE_SIZE {
                    break;
                }
                page += 1;
                sleep(PAGE_DELAY).await;
            }

            let _ = per_repo_counts.insert(repo.clone(), repo_contributors.len() as u64);
        }

        Ok((all_contributors, per_repo_counts))
    }

    async fn organization_member_count(&self) -> Result<u64> {
        let url = format!("{}/orgs/{}/members?per_page=1", self.client.base_url(), self.organization);
        self.probe_count(&url).await
    }
}

/// `now` minus a number of calendar months.
fn months_back(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months)).unwrap_or(now)
}

/// Bucket one page of stargazer events into the month/year windows.
fn count_star_windows(batch: &[Stargazer], windows: &mut StarWindows, one_month_ago: DateTime<Utc>, one_year_ago: DateTime<Utc>) {
    for star in batch {
        if let Some(starred_at) = star.starred_at {
            if starred_at >= one_month_ago {
                windows.last_month += 1;
            }
            if starred_at >= one_year_ago {
                windows.last_year += 1;
            }
        }
    }
}

/// Count created-descending items at or after the cutoff. Returns the count
/// for this page and whether the scan is done (an older or timestamp-less
/// item was reached, so later pages cannot contribute).
fn count_recent(created: impl Iterator<Item = Option<DateTime<Utc>>>, cutoff: DateTime<Utc>) -> (u64, bool) {
    let mut count = 0u64;
    for timestamp in created {
        if timestamp.is_some_and(|t| t >= cutoff) {
            count += 1;
        } else {
            return (count, true);
        }
    }
    (count, false)
}

/// Sum per-repository statistics into the organization aggregate.
fn aggregate(
    organization: &str,
    repositories: Vec<RepositoryStats>,
    unique_contributors: u64,
    organization_members: u64,
    timestamp: DateTime<Utc>,
) -> GithubStats {
    GithubStats {
        organization: organization.to_string(),
        total_repositories: repositories.len() as u64,
        total_stars: repositories.iter().map(|r| r.stargazers_count).sum(),
        total_stars_last_month: repositories.iter().map(|r| r.stars_last_month).sum(),
        total_stars_last_year: repositories.iter().map(|r| r.stars_last_year).sum(),
        unique_contributors,
        organization_members,
        total_pull_requests_open: repositories.iter().map(|r| r.pull_requests_open).sum(),
        total_pull_requests_closed: repositories.iter().map(|r| r.pull_requests_closed).sum(),
        total_issues_open: repositories.iter().map(|r| r.issues_open).sum(),
        total_issues_closed: repositories.iter().map(|r| r.issues_closed).sum(),
        timestamp,
        repositories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo_stats(name: &str, stars: u64) -> RepositoryStats {
        RepositoryStats {
            name: name.to_string(),
            full_name: format!("example-org/{name}"),
            stargazers_count: stars,
            stars_last_month: 1,
            stars_last_year: 2,
            forks_count: 0,
            open_issues_count: 0,
            description: None,
            html_url: format!("https://github.com/example-org/{name}"),
            language: None,
            updated_at: None,
            contributors_count: 0,
            pull_requests_open: 3,
            pull_requests_closed: 4,
            pull_requests_last_month: 0,
            issues_open: 5,
            issues_closed: 6,
            issues_last_month: 0,
        }
    }

    #[test]
    fn test_months_back_calendar_arithmetic() {
        let now = DateTime::parse_from_rfc3339("2024-03-31T12:00:00Z").unwrap().to_utc();
        let one_month = months_back(now, 1);
        // February has no 31st; chrono clamps to the last day.
        assert_eq!(one_month.to_rfc3339(), "2024-02-29T12:00:00+00:00");

        let one_year = months_back(now, 12);
        assert_eq!(one_year.to_rfc3339(), "2023-03-31T12:00:00+00:00");
    }

    #[test]
    fn test_count_star_windows() {
        let now = Utc::now();
        let one_month_ago = months_back(now, 1);
        let one_year_ago = months_back(now, 12);

        let batch = vec![
            Stargazer { starred_at: Some(now - chrono::Duration::days(5)) },
            Stargazer { starred_at: Some(now - chrono::Duration::days(100)) },
            Stargazer { starred_at: Some(now - chrono::Duration::days(500)) },
            Stargazer { starred_at: None },
        ];

        let mut windows = StarWindows::default();
        count_star_windows(&batch, &mut windows, one_month_ago, one_year_ago);

        assert_eq!(windows.last_month, 1);
        assert_eq!(windows.last_year, 2);
    }

    #[test]
    fn test_count_recent_all_within_window() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        let items = vec![Some(now), Some(now - chrono::Duration::days(1))];

        let (count, done) = count_recent(items.into_iter(), cutoff);
        assert_eq!(count, 2);
        assert!(!done);
    }

    #[test]
    fn test_count_recent_stops_at_older_item() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        let items = vec![
            Some(now),
            Some(now - chrono::Duration::days(60)),
            Some(now - chrono::Duration::days(1)), // never reached
        ];

        let (count, done) = count_recent(items.into_iter(), cutoff);
        assert_eq!(count, 1);
        assert!(done);
    }

    #[test]
    fn test_count_recent_stops_at_missing_timestamp() {
        let now = Utc::now();
        let cutoff = now - chrono::Duration::days(30);
        let items = vec![Some(now), None];

        let (count, done) = count_recent(items.into_iter(), cutoff);
        assert_eq!(count, 1);
        assert!(done);
    }

    #[test]
    fn test_aggregate_sums_and_counts() {
        let now = Utc::now();
        let stats = aggregate("example-org", vec![repo_stats("a", 10), repo_stats("b", 20)], 42, 7, now);

        assert_eq!(stats.organization, "example-org");
        assert_eq!(stats.total_repositories, 2);
        assert_eq!(stats.total_stars, 30);
        assert_eq!(stats.total_stars_last_month, 2);
        assert_eq!(stats.total_stars_last_year, 4);
        assert_eq!(stats.unique_contributors, 42);
        assert_eq!(stats.organization_members, 7);
        assert_eq!(stats.total_pull_requests_open, 6);
        assert_eq!(stats.total_pull_requests_closed, 8);
        assert_eq!(stats.total_issues_open, 10);
        assert_eq!(stats.total_issues_closed, 12);
    }

    #[test]
    fn test_aggregate_empty() {
        let stats = aggregate("example-org", Vec::new(), 0, 0, Utc::now());
        assert_eq!(stats.total_repositories, 0);
        assert_eq!(stats.total_stars, 0);
        assert!(stats.repositories.is_empty());
    }
}
