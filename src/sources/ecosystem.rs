//! Package-registry collector: the list of ecosystem packages.

use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, Utc};
use ohno::app_err;
use serde::{Deserialize, Serialize};
use url::Url;

const LOG_TARGET: &str = " ecosystem";

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "ecosystem.json";

/// A validated registry entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemPackage {
    pub name: String,
    pub description: Option<String>,
    pub project_home: String,
    pub documentation_home: Option<String>,
}

/// Snapshot record for the package registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemData {
    pub total_packages: u64,
    pub packages: Vec<EcosystemPackage>,
    pub timestamp: DateTime<Utc>,
}

/// Raw registry entry before validation.
#[derive(Debug, Deserialize)]
struct RawPackage {
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    project_home: Option<String>,
    #[serde(default)]
    documentation_home: Option<String>,
}

/// Validate one registry entry; entries with a missing name, a missing or
/// unparseable project URL, or an unparseable documentation URL are dropped.
fn validate(raw: RawPackage) -> Option<EcosystemPackage> {
    let name = raw.name?;
    let project_home = raw.project_home.filter(|url| Url::parse(url).is_ok())?;

    let documentation_home = match raw.documentation_home {
        Some(url) => {
            if Url::parse(&url).is_err() {
                return None;
            }
            Some(url)
        }
        None => None,
    };

    Some(EcosystemPackage {
        name,
        description: raw.description,
        project_home,
        documentation_home,
    })
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    now: DateTime<Utc>,
}

impl Provider {
    pub fn new(now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: crate::sources::base_client()?,
            now,
        })
    }

    /// Fetch the registry document, validate each entry, and write the snapshot.
    pub async fn collect(&self, registry_url: &str, store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting ecosystem packages");

        let resp = self.client.get(registry_url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(app_err!("GET {registry_url} returned HTTP {status}"));
        }

        let entries: Vec<serde_json::Value> = resp.json().await?;
        let total = entries.len();

        let packages: Vec<EcosystemPackage> = entries
            .into_iter()
            .filter_map(|entry| serde_json::from_value::<RawPackage>(entry).ok())
            .filter_map(validate)
            .collect();

        if packages.len() < total {
            log::warn!(target: LOG_TARGET, "Dropped {} invalid registry entries", total - packages.len());
        }

        let data = EcosystemData {
            total_packages: packages.len() as u64,
            packages,
            timestamp: self.now,
        };
        store.save(SNAPSHOT, &data)?;

        log::info!(target: LOG_TARGET, "Total packages: {}", data.total_packages);
        Ok(())
    }
}
