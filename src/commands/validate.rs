use clap::Parser;
use org_pulse::Result;
use org_pulse::config::{Config, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;

#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to the configuration file
    #[arg(long, short = 'c', value_name = "PATH", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[expect(clippy::unnecessary_wraps, reason = "Consistent interface with other subcommands")]
pub fn validate_config(args: &ValidateArgs) -> Result<()> {
    match Config::load(&args.config) {
        Ok(config) => {
            println!("Configuration validation successful");
            println!("Config file: {}", args.config.display());
            println!("Tracking {} core packages of '{}'", config.core_packages.len(), config.organization);
            Ok(())
        }
        Err(e) => {
            eprintln!("Configuration validation failed: {e:#}");
            std::process::exit(1);
        }
    }
}
