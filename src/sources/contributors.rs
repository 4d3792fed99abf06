//! Contributor-roster collector: unique contributors across the core
//! repositories, with display names and merged contribution counts.

use super::github::{Client, ContributorSummary, User, is_bot_login};
use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, Utc};
use core::time::Duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::time::sleep;

const LOG_TARGET: &str = "  contribs";
const DEFAULT_BASE_URL: &str = "https://api.github.com";
const PAGE_SIZE: usize = 100;

/// Page cap per repository, to bound API usage on very large projects.
const PAGE_CAP: u32 = 50;

/// Politeness delay between user-detail lookups.
const DETAIL_DELAY: Duration = Duration::from_millis(100);

/// Politeness delay between contributor pages.
const PAGE_DELAY: Duration = Duration::from_millis(200);

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "contributors.json";

/// One contributor across all tracked repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorProfile {
    pub login: String,
    pub name: String,
    pub avatar_url: String,
    pub html_url: String,
    pub contributions: u64,
}

/// Snapshot record for the contributor roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributorsData {
    pub total_contributors: u64,
    pub contributors: Vec<ContributorProfile>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: Client,
    organization: String,
    now: DateTime<Utc>,
}

impl Provider {
    /// Create a provider. `base_url` overrides the real API endpoint, for tests.
    pub fn new(token: Option<&str>, organization: impl Into<String>, base_url: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: Client::new(token, base_url.unwrap_or(DEFAULT_BASE_URL))?,
            organization: organization.into(),
            now,
        })
    }

    /// Build the merged contributor roster and write the snapshot.
    pub async fn collect(&self, core_packages: &[String], store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting contributors data");

        let mut roster: HashMap<String, ContributorProfile> = HashMap::new();

        for repo in core_packages {
            let mut page = 1u32;

            while page <= PAGE_CAP {
                let url = format!(
                    "{}/repos/{}/{repo}/contributors?per_page={PAGE_SIZE}&page={page}",
                    self.client.base_url(),
                    self.organization
                );
                let batch: Vec<ContributorSummary> = self.client.get_json(&url).await?;
                if batch.is_empty() {
                    break;
                }

                let short_page = batch.len() < PAGE_SIZE;
                for contributor in batch {
                    self.merge_contributor(&mut roster, contributor).await;
                }

                if short_page {
                    break;
                }
                page += 1;
                sleep(PAGE_DELAY).await;
            }

            log::info!(target: LOG_TARGET, "  {repo} ({} unique contributors so far)", roster.len());
        }

        let mut contributors: Vec<ContributorProfile> = roster.into_values().collect();
        contributors.sort_by(|a, b| b.contributions.cmp(&a.contributions));

        let data = ContributorsData {
            total_contributors: contributors.len() as u64,
            contributors,
            timestamp: self.now,
        };
        store.save(SNAPSHOT, &data)?;

        log::info!(target: LOG_TARGET, "Total unique contributors: {}", data.total_contributors);
        Ok(())
    }

    /// Merge one listing entry into the roster. Known logins accumulate their
    /// contribution count; new logins get a detail lookup for their display
    /// name, falling back to the login on failure.
    async fn merge_contributor(&self, roster: &mut HashMap<String, ContributorProfile>, contributor: ContributorSummary) {
        let Some(login) = contributor.login else {
            return;
        };
        if is_bot_login(&login) {
            return;
        }

        if let Some(existing) = roster.get_mut(&login) {
            existing.contributions += contributor.contributions;
            return;
        }

        let name = match self.display_name(&login).await {
            Ok(Some(name)) => {
                sleep(DETAIL_DELAY).await;
                name
            }
            Ok(None) => {
                sleep(DETAIL_DELAY).await;
                login.clone()
            }
            Err(e) => {
                log::debug!(target: LOG_TARGET, "Could not fetch user info for '{login}': {e:#}");
                login.clone()
            }
        };

        let _ = roster.insert(
            login.clone(),
            ContributorProfile {
                html_url: contributor.html_url.unwrap_or_else(|| format!("https://github.com/{login}")),
                avatar_url: contributor.avatar_url.unwrap_or_default(),
                login,
                name,
                contributions: contributor.contributions,
            },
        );
    }

    async fn display_name(&self, login: &str) -> Result<Option<String>> {
        let url = format!("{}/users/{login}", self.client.base_url());
        let user: User = self.client.get_json(&url).await?;
        Ok(user.name)
    }
}
