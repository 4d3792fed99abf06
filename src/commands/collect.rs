use super::LogLevel;
use chrono::Utc;
use clap::Parser;
use org_pulse::Result;
use org_pulse::config::{Config, DEFAULT_CONFIG_FILE};
use org_pulse::sources::{Credentials, SnapshotStore, collect_all};
use org_pulse::summary;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct CollectArgs {
    /// Path to the configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory where snapshot files are written
    #[arg(long, value_name = "PATH", default_value = "output")]
    pub output_dir: PathBuf,

    /// GitHub personal access token
    #[arg(long, value_name = "TOKEN", env = "GITHUB_TOKEN")]
    pub github_token: Option<String>,

    /// Zulip account email
    #[arg(long, value_name = "EMAIL", env = "ZULIP_EMAIL")]
    pub zulip_email: Option<String>,

    /// Zulip API key
    #[arg(long, value_name = "KEY", env = "ZULIP_API_KEY")]
    pub zulip_api_key: Option<String>,

    /// API key for the download-tracking service
    #[arg(long, value_name = "KEY", env = "PEPY_API_KEY")]
    pub downloads_api_key: Option<String>,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Run every collector, then merge the snapshots into the summary file.
pub async fn collect(args: &CollectArgs) -> Result<()> {
    super::init_logging(args.log_level);

    let config = Config::load(&args.config)?;
    let credentials = Credentials {
        github_token: args.github_token.clone(),
        zulip_email: args.zulip_email.clone(),
        zulip_api_key: args.zulip_api_key.clone(),
        downloads_api_key: args.downloads_api_key.clone(),
    };

    let store = SnapshotStore::new(&args.output_dir);
    let now = Utc::now();

    collect_all(&config, &credentials, &store, now).await;
    let _ = summary::combine(&store, now)?;

    Ok(())
}
