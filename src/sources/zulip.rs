//! Chat-platform collector: active user and core-stream subscriber counts.

use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, Utc};
use ohno::app_err;
use serde::{Deserialize, Serialize};

const LOG_TARGET: &str = "     zulip";

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "zulip.json";

/// Member info with only the fields we need
#[derive(Debug, Deserialize)]
struct Member {
    is_bot: bool,
    is_active: bool,
}

#[derive(Debug, Deserialize)]
struct MembersResponse {
    members: Vec<Member>,
}

#[derive(Debug, Deserialize)]
struct Stream {
    name: String,
    #[serde(default)]
    subscriber_count: u64,
}

#[derive(Debug, Deserialize)]
struct StreamsResponse {
    streams: Vec<Stream>,
}

/// Snapshot record for the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZulipData {
    pub active_users: u64,
    pub core_team_size: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    realm: String,
    email: String,
    api_key: String,
    now: DateTime<Utc>,
}

impl Provider {
    pub fn new(realm: impl Into<String>, email: impl Into<String>, api_key: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: crate::sources::base_client()?,
            realm: realm.into().trim_end_matches('/').to_string(),
            email: email.into(),
            api_key: api_key.into(),
            now,
        })
    }

    /// Count active non-bot members and the subscribers of the core stream,
    /// then write the snapshot.
    pub async fn collect(&self, core_stream: &str, store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting Zulip stats");

        let members: MembersResponse = self.get_json("/api/v1/users").await?;
        let active_users = members.members.iter().filter(|m| !m.is_bot && m.is_active).count() as u64;

        let streams: StreamsResponse = self.get_json("/api/v1/streams").await?;
        let core_team_size = streams
            .streams
            .iter()
            .find(|s| s.name == core_stream)
            .map(|s| s.subscriber_count)
            .ok_or_else(|| app_err!("stream '{core_stream}' not found in realm '{}'", self.realm))?;

        let data = ZulipData {
            active_users,
            core_team_size,
            timestamp: self.now,
        };
        store.save(SNAPSHOT, &data)?;

        log::info!(target: LOG_TARGET, "Active users: {active_users}, core team size: {core_team_size}");
        Ok(())
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{path}", self.realm);
        let resp = self
            .client
            .get(&url)
            .basic_auth(&self.email, Some(&self.api_key))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("GET {url} returned HTTP {status}"));
        }

        Ok(resp.json().await?)
    }
}
