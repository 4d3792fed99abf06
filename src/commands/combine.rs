use super::LogLevel;
use chrono::Utc;
use clap::Parser;
use org_pulse::Result;
use org_pulse::sources::SnapshotStore;
use org_pulse::summary;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct CombineArgs {
    /// Directory holding the snapshot files
    #[arg(long, value_name = "PATH", default_value = "output")]
    pub output_dir: PathBuf,

    /// Set the logging level for diagnostic output
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: LogLevel,
}

/// Merge whatever snapshots are present into the summary file.
pub fn combine(args: &CombineArgs) -> Result<()> {
    super::init_logging(args.log_level);

    let store = SnapshotStore::new(&args.output_dir);
    let _ = summary::combine(&store, Utc::now())?;

    Ok(())
}
