use clap::Parser;
use ohno::{IntoAppError, app_err};
use org_pulse::Result;
use org_pulse::config::{DEFAULT_CONFIG_FILE, DEFAULT_CONFIG_YAML};
use std::fs;
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Output configuration file path
    #[arg(value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub output: PathBuf,

    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

pub fn init_config(args: &InitArgs) -> Result<()> {
    if args.output.exists() && !args.force {
        return Err(app_err!("'{}' already exists, pass --force to overwrite it", args.output.display()));
    }

    fs::write(&args.output, DEFAULT_CONFIG_YAML)
        .into_app_err_with(|| format!("writing configuration file '{}'", args.output.display()))?;

    println!("Generated default configuration file: {}", args.output.display());
    Ok(())
}
