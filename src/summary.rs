//! Combiner: merges the per-source snapshots into one summary document.
//!
//! Any missing or unreadable snapshot is tolerated; its fields are simply
//! omitted from the merged output.

use crate::Result;
use crate::sources::bluesky::BlueskyData;
use crate::sources::citations::CitationsData;
use crate::sources::downloads::DownloadsData;
use crate::sources::ecosystem::EcosystemData;
use crate::sources::github::GithubStats;
use crate::sources::zulip::ZulipData;
use crate::sources::{SnapshotStore, bluesky, citations, downloads, ecosystem, github, zulip};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "   summary";

/// Merged summary file written by the combiner.
pub const SNAPSHOT: &str = "stats.json";

/// The subset of the GitHub aggregate carried into the summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubSummary {
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
}

impl From<&GithubStats> for GithubSummary {
    fn from(stats: &GithubStats) -> Self {
        Self {
            total_repositories: stats.total_repositories,
            total_stars: stats.total_stars,
            total_stars_last_month: stats.total_stars_last_month,
            total_stars_last_year: stats.total_stars_last_year,
            unique_contributors: stats.unique_contributors,
            organization_members: stats.organization_members,
            total_pull_requests_open: stats.total_pull_requests_open,
            total_pull_requests_closed: stats.total_pull_requests_closed,
            total_issues_open: stats.total_issues_open,
            total_issues_closed: stats.total_issues_closed,
        }
    }
}

/// The combined summary document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedStats {
    pub timestamp: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bluesky_followers: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub zulip_users: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<GithubSummary>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ecosystem_packages: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub citation_count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads_total: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub downloads_avg_daily_30: Option<u64>,
}

/// Build the summary from whichever source records are present.
fn merge(
    github: Option<&GithubStats>,
    zulip: Option<&ZulipData>,
    bluesky: Option<&BlueskyData>,
    ecosystem: Option<&EcosystemData>,
    citations: Option<&CitationsData>,
    downloads: Option<&DownloadsData>,
    timestamp: DateTime<Utc>,
) -> CombinedStats {
    #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss, reason = "rounded non-negative average fits u64")]
    let downloads_avg_daily_30 = downloads.map(|d| d.computed.combined_avg_daily.round().max(0.0) as u64);

    CombinedStats {
        timestamp,
        bluesky_followers: bluesky.map(|b| b.followers_count),
        zulip_users: zulip.map(|z| z.active_users),
        github: github.map(GithubSummary::from),
        ecosystem_packages: ecosystem.map(|e| e.total_packages),
        citation_count: citations.map(|c| c.total_citation_count),
        downloads_total: downloads.map(|d| d.total_downloads),
        downloads_avg_daily_30,
    }
}

/// Read all per-source snapshots, merge them, and write the summary file.
pub fn combine(store: &SnapshotStore, now: DateTime<Utc>) -> Result<CombinedStats> {
    let github: Option<GithubStats> = store.load(github::SNAPSHOT);
    let zulip: Option<ZulipData> = store.load(zulip::SNAPSHOT);
    let bluesky: Option<BlueskyData> = store.load(bluesky::SNAPSHOT);
    let ecosystem: Option<EcosystemData> = store.load(ecosystem::SNAPSHOT);
    let citations: Option<CitationsData> = store.load(citations::SNAPSHOT);
    let downloads: Option<DownloadsData> = store.load(downloads::SNAPSHOT);

    let stats = merge(
        github.as_ref(),
        zulip.as_ref(),
        bluesky.as_ref(),
        ecosystem.as_ref(),
        citations.as_ref(),
        downloads.as_ref(),
        now,
    );

    store.save(SNAPSHOT, &stats)?;
    log::info!(target: LOG_TARGET, "Combined statistics written to '{}'", store.path(SNAPSHOT).display());

    Ok(stats)
}
