//! Per-source collectors and the snapshot store.
//!
//! Each collector polls one external service, shapes the response into a
//! typed record, and writes one JSON snapshot. Collectors run concurrently
//! and independently; a failing collector is logged and does not block its
//! siblings.

pub mod bluesky;
pub mod citations;
pub mod contributors;
pub mod downloads;
pub mod ecosystem;
pub mod github;
mod snapshot;
pub mod zulip;

pub use snapshot::SnapshotStore;

use crate::config::Config;
use chrono::{DateTime, Utc};
use ohno::app_err;

const LOG_TARGET: &str = "   collect";

/// User agent sent with every outbound request.
pub(crate) const USER_AGENT: &str = "org-pulse";

/// Build the plain HTTP client used by the non-hosting collectors.
pub(crate) fn base_client() -> crate::Result<reqwest::Client> {
    Ok(reqwest::Client::builder().user_agent(USER_AGENT).build()?)
}

/// API credentials supplied through the environment.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub github_token: Option<String>,
    pub zulip_email: Option<String>,
    pub zulip_api_key: Option<String>,
    pub downloads_api_key: Option<String>,
}

/// Run every configured collector concurrently. Failures are logged per
/// collector; the run itself always completes.
pub async fn collect_all(config: &Config, credentials: &Credentials, store: &SnapshotStore, now: DateTime<Utc>) {
    let github = run("GitHub", async {
        github::Provider::new(credentials.github_token.as_deref(), &config.organization, None, now)?
            .collect(&config.core_packages, store)
            .await
    });

    let contributors = run("Contributors", async {
        contributors::Provider::new(credentials.github_token.as_deref(), &config.organization, None, now)?
            .collect(&config.core_packages, store)
            .await
    });

    let zulip = run("Zulip", async {
        let Some(zulip_config) = &config.zulip else {
            log::info!(target: LOG_TARGET, "Zulip realm not configured, skipping");
            return Ok(());
        };
        let email = credentials.zulip_email.as_deref().ok_or_else(|| app_err!("ZULIP_EMAIL is not set"))?;
        let api_key = credentials.zulip_api_key.as_deref().ok_or_else(|| app_err!("ZULIP_API_KEY is not set"))?;

        zulip::Provider::new(&zulip_config.realm, email, api_key, now)?
            .collect(&zulip_config.core_stream, store)
            .await
    });

    let bluesky = run("Bluesky", async {
        let Some(actor) = &config.bluesky_actor else {
            log::info!(target: LOG_TARGET, "Bluesky actor not configured, skipping");
            return Ok(());
        };

        bluesky::Provider::new(None, now)?.collect(actor, store).await
    });

    let ecosystem = run("Ecosystem", async {
        let Some(registry_url) = &config.ecosystem_url else {
            log::info!(target: LOG_TARGET, "Ecosystem registry not configured, skipping");
            return Ok(());
        };

        ecosystem::Provider::new(now)?.collect(registry_url, store).await
    });

    let citations = run("Citations", async {
        if config.papers.is_empty() {
            log::info!(target: LOG_TARGET, "No papers configured, skipping citations");
            return Ok(());
        }

        citations::Provider::new(None, now)?.collect(&config.papers, store).await
    });

    let downloads = run("Downloads", async {
        let Some(api_key) = &credentials.downloads_api_key else {
            log::info!(target: LOG_TARGET, "PEPY_API_KEY not set, skipping download stats");
            return Ok(());
        };

        downloads::Provider::new(api_key, None, now)?.collect(&config.core_packages, store).await
    });

    let ((), (), (), (), (), (), ()) = tokio::join!(github, contributors, zulip, bluesky, ecosystem, citations, downloads);
}

/// Await a collector, logging its failure without propagating it.
async fn run(name: &str, task: impl Future<Output = crate::Result<()>>) {
    if let Err(e) = task.await {
        log::error!(target: LOG_TARGET, "{name} collector failed: {e:#}");
    }
}
