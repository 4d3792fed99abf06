//! Download-tracking collector: per-package download counts and a 30-day window.

use crate::Result;
use crate::sources::SnapshotStore;
use chrono::{DateTime, NaiveDate, Utc};
use core::time::Duration;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::time::sleep;

const LOG_TARGET: &str = " downloads";
const DEFAULT_BASE_URL: &str = "https://api.pepy.tech/api/v2/projects";

/// Free tier allows 10 requests/minute, so wait 6s between packages.
const PACKAGE_DELAY: Duration = Duration::from_secs(6);

/// Number of most recent days combined into the short-term window.
const WINDOW_DAYS: i64 = 30;

/// Characters percent-encoded in a path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'%').add(b'/').add(b'<').add(b'>').add(b'?');

/// Snapshot file written by this collector.
pub const SNAPSHOT: &str = "downloads.json";

/// Per-day, per-version download counts keyed by `YYYY-MM-DD` date.
pub type DownloadMap = BTreeMap<String, BTreeMap<String, u64>>;

/// One package's download statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDownloads {
    pub id: String,
    pub total_downloads: u64,
    pub versions: Vec<String>,
    pub downloads: DownloadMap,
}

impl PackageDownloads {
    /// Zero-valued entry for a package that could not be fetched.
    fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            total_downloads: 0,
            versions: Vec::new(),
            downloads: DownloadMap::new(),
        }
    }
}

/// Raw API response; field shapes are validated, absences default.
#[derive(Debug, Deserialize)]
struct ApiProject {
    id: Option<String>,
    #[serde(default)]
    total_downloads: u64,
    #[serde(default)]
    versions: Vec<String>,
    #[serde(default)]
    downloads: DownloadMap,
}

/// 30-day figures computed for one package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageWindow {
    pub id: String,
    pub total_30_days: u64,
    pub avg_per_day: f64,
}

/// Figures computed across all packages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsComputed {
    pub per_package_30_day: Vec<PackageWindow>,
    pub combined_total_30_days: u64,
    pub combined_avg_daily: f64,
}

/// Snapshot record for the download-tracking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsData {
    pub packages: Vec<PackageDownloads>,
    pub total_downloads: u64,
    pub timestamp: DateTime<Utc>,
    pub computed: DownloadsComputed,
}

/// Normalize a repository name into the registry's package naming.
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace('_', "-")
}

/// Sum the most recent `WINDOW_DAYS` days of downloads, newest first.
/// Future-dated and older buckets are skipped; at most `WINDOW_DAYS` days count.
fn thirty_day_window(downloads: &DownloadMap, today: NaiveDate) -> (u64, f64) {
    let mut total = 0u64;
    let mut counted_days = 0i64;

    for (date_str, per_version) in downloads.iter().rev() {
        if counted_days >= WINDOW_DAYS {
            break;
        }

        let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") else {
            continue;
        };

        let age_days = (today - date).num_days();
        if !(0..WINDOW_DAYS).contains(&age_days) {
            continue;
        }

        total += per_version.values().sum::<u64>();
        counted_days += 1;
    }

    #[expect(clippy::cast_precision_loss, reason = "acceptable for an average")]
    let avg_per_day = if counted_days > 0 { total as f64 / counted_days as f64 } else { 0.0 };

    (total, avg_per_day)
}

/// Outcome of one per-package fetch.
enum FetchOutcome {
    Package(Box<PackageDownloads>),
    Unauthorized,
    RateLimited,
}

#[derive(Debug, Clone)]
pub struct Provider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    now: DateTime<Utc>,
}

impl Provider {
    /// Create a provider. `base_url` overrides the service endpoint, for tests.
    pub fn new(api_key: impl Into<String>, base_url: Option<&str>, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            client: crate::sources::base_client()?,
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
            api_key: api_key.into(),
            now,
        })
    }

    /// Fetch download statistics for every core package and write the snapshot.
    ///
    /// An invalid API key aborts without writing a snapshot; hitting the rate
    /// limit stops early but keeps what was gathered; any other per-package
    /// failure records a zero-valued entry.
    pub async fn collect(&self, core_packages: &[String], store: &SnapshotStore) -> Result<()> {
        log::info!(target: LOG_TARGET, "Collecting download stats");

        let today = self.now.date_naive();
        let mut packages = Vec::with_capacity(core_packages.len());
        let mut per_package_30_day = Vec::with_capacity(core_packages.len());

        for name in core_packages {
            let project = normalize_name(name);

            match self.fetch_package(&project).await {
                FetchOutcome::Unauthorized => {
                    log::warn!(target: LOG_TARGET, "API key rejected (401), skipping download stats");
                    return Ok(());
                }
                FetchOutcome::RateLimited => {
                    log::warn!(target: LOG_TARGET, "Rate limit exceeded (429), stopping early");
                    break;
                }
                FetchOutcome::Package(package) => {
                    let (total_30_days, avg_per_day) = thirty_day_window(&package.downloads, today);
                    per_package_30_day.push(PackageWindow {
                        id: package.id.clone(),
                        total_30_days,
                        avg_per_day,
                    });

                    log::info!(
                        target: LOG_TARGET,
                        "  {project}: {} downloads, 30-day avg {avg_per_day:.1}",
                        package.total_downloads
                    );
                    packages.push(*package);
                }
            }

            sleep(PACKAGE_DELAY).await;
        }

        let total_downloads = packages.iter().map(|p| p.total_downloads).sum();
        let combined_total_30_days = per_package_30_day.iter().map(|w| w.total_30_days).sum();
        let combined_avg_daily = per_package_30_day.iter().map(|w| w.avg_per_day).sum();

        let data = DownloadsData {
            packages,
            total_downloads,
            timestamp: self.now,
            computed: DownloadsComputed {
                per_package_30_day,
                combined_total_30_days,
                combined_avg_daily,
            },
        };
        store.save(SNAPSHOT, &data)?;

        log::info!(
            target: LOG_TARGET,
            "Total downloads: {total_downloads}, combined 30-day avg daily: {combined_avg_daily:.1}"
        );
        Ok(())
    }

    /// Fetch one package, mapping every failure mode to an outcome.
    async fn fetch_package(&self, project: &str) -> FetchOutcome {
        let url = format!("{}/{}", self.base_url, utf8_percent_encode(project, PATH_SEGMENT));

        let resp = match self.client.get(&url).header("X-API-Key", &self.api_key).send().await {
            Ok(resp) => resp,
            Err(e) => {
                log::warn!(target: LOG_TARGET, "  {project}: fetch error: {e}");
                return FetchOutcome::Package(Box::new(PackageDownloads::empty(project)));
            }
        };

        match resp.status().as_u16() {
            401 => FetchOutcome::Unauthorized,
            429 => FetchOutcome::RateLimited,
            404 => {
                log::info!(target: LOG_TARGET, "  {project}: not found");
                FetchOutcome::Package(Box::new(PackageDownloads::empty(project)))
            }
            status if !resp.status().is_success() => {
                log::warn!(target: LOG_TARGET, "  {project}: request failed ({status})");
                FetchOutcome::Package(Box::new(PackageDownloads::empty(project)))
            }
            _ => match resp.json::<ApiProject>().await {
                Ok(body) => FetchOutcome::Package(Box::new(PackageDownloads {
                    id: body.id.unwrap_or_else(|| project.to_string()),
                    total_downloads: body.total_downloads,
                    versions: body.versions,
                    downloads: body.downloads,
                })),
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "  {project}: response validation failed: {e}");
                    FetchOutcome::Package(Box::new(PackageDownloads::empty(project)))
                }
            },
        }
    }
}
