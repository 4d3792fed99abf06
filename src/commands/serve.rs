use super::LogLevel;
use clap::Parser;
use org_pulse::Result;
use org_pulse::config::{Config, DEFAULT_CONFIG_FILE};
use org_pulse::serve::{OriginPolicy, ServeState};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Path to the configuration file (supplies the origin allow-list)
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory holding the snapshot files
    #[arg(long, value_name = "PATH", default_value = "output")]
    pub output_dir: PathBuf,

    /// Address to bind to
    #[arg(long, value_name = "HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, value_name = "PORT", default_value_t = 8787)]
    pub port: u16,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Serve the snapshot files with origin-gated cross-origin access.
pub async fn serve(args: &ServeArgs) -> Result<()> {
    super::init_logging(args.log_level);

    let config = Config::load(&args.config)?;
    let state = ServeState {
        policy: OriginPolicy::new(config.allowed_origins),
        dir: args.output_dir.clone(),
    };

    org_pulse::serve::run(state, &args.host, args.port).await
}
