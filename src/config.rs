//! Configuration file handling.
//!
//! The configuration lists the tracked organization, its repositories, and the
//! per-source settings. Credentials never live here; they come from the
//! environment.

use crate::Result;
use ohno::{IntoAppError, app_err};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use url::Url;

/// The default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "pulse.yaml";

/// The default configuration YAML content, embedded from `default_pulse.yml`
pub const DEFAULT_CONFIG_YAML: &str = include_str!("../default_pulse.yml");

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Name of the organization on the code-hosting service.
    pub organization: String,

    /// Repositories tracked by the aggregation, which double as package names
    /// on the download-tracking service.
    pub core_packages: Vec<String>,

    /// Paper ids (PMIDs) whose citation counts are tracked.
    #[serde(default)]
    pub papers: Vec<String>,

    /// Bluesky actor (handle or DID) whose follower count is tracked.
    #[serde(default)]
    pub bluesky_actor: Option<String>,

    /// Zulip realm settings. The collector is skipped when absent.
    #[serde(default)]
    pub zulip: Option<ZulipConfig>,

    /// URL of the ecosystem package registry JSON document.
    #[serde(default)]
    pub ecosystem_url: Option<String>,

    /// Origins allowed to read snapshots through the serve command.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ZulipConfig {
    /// Base URL of the Zulip realm, e.g. `https://example.zulipchat.com`.
    pub realm: String,

    /// Stream whose subscriber count is recorded as the core team size.
    #[serde(default = "default_core_stream")]
    pub core_stream: String,
}

fn default_core_stream() -> String {
    "website".to_string()
}

impl Config {
    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).into_app_err_with(|| format!("reading configuration file '{}'", path.display()))?;
        let config: Self = serde_yaml::from_str(&text).into_app_err_with(|| format!("parsing configuration file '{}'", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check semantic constraints that the serde layer cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.organization.trim().is_empty() {
            return Err(app_err!("'organization' must not be empty"));
        }

        if self.core_packages.is_empty() {
            return Err(app_err!("'core_packages' must list at least one repository"));
        }

        for package in &self.core_packages {
            if package.trim().is_empty() {
                return Err(app_err!("'core_packages' entries must not be empty"));
            }
        }

        if let Some(zulip) = &self.zulip {
            let _ = Url::parse(&zulip.realm).into_app_err_with(|| format!("'zulip.realm' is not a valid URL: '{}'", zulip.realm))?;
            if zulip.core_stream.trim().is_empty() {
                return Err(app_err!("'zulip.core_stream' must not be empty"));
            }
        }

        if let Some(url) = &self.ecosystem_url {
            let _ = Url::parse(url).into_app_err_with(|| format!("'ecosystem_url' is not a valid URL: '{url}'"))?;
        }

        for origin in &self.allowed_origins {
            let parsed = Url::parse(origin).into_app_err_with(|| format!("'allowed_origins' entry is not a valid URL: '{origin}'"))?;
            if parsed.scheme() != "http" && parsed.scheme() != "https" {
                return Err(app_err!("'allowed_origins' entry must use http or https: '{origin}'"));
            }
        }

        Ok(())
    }
}
