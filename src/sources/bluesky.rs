//! Social-network collector: follower count of the organization's account.

use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, Utc};
use ohno::app_err;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "   bluesky";
const DEFAULT_BASE_URL: &str = "https://public.api.bsky.app";

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "bluesky.json";

/// Public profile info with only the fields we need
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    handle: String,
    followers_count: u64,
}

/// Snapshot record for the social network.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyData {
    pub followers_count: u64,
    pub handle: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    base_url: String,
    now: DateTime<Utc>,
}

impl Provider {
    /// Create a provider. `base_url` overrides the public API endpoint, for tests.
    pub fn new(base_url: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: crate::sources::base_client()?,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            now,
        })
    }

    /// Fetch the actor's public profile and write the snapshot.
    pub async fn collect(&self, actor: &str, store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting Bluesky stats");

        let url = format!("{}/xrpc/app.bsky.actor.getProfile?actor={actor}", self.base_url);
        let resp = self.client.get(&url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("GET {url} returned HTTP {status}"));
        }

        let profile: Profile = resp.json().await?;

        let data = BlueskyData {
            followers_count: profile.followers_count,
            handle: profile.handle,
            timestamp: self.now,
        };
        store.save(SNAPSHOT, &data)?;

        log::info!(target: LOG_TARGET, "Followers: {}", data.followers_count);
        Ok(())
    }
}
