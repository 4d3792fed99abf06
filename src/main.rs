//! A tool to collect community-health statistics for an open-source organization.
//!
//! # Overview
//!
//! `org-pulse` is a cron-style batch tool. One `collect` run polls several
//! public APIs — the code-hosting service, a chat platform, a social network,
//! a citation index, a download-tracking service, and a static package
//! registry — shapes each response into a validated record, writes one JSON
//! snapshot per source, and merges them into a single `stats.json` summary.
//! A companion `serve` command fronts the snapshot directory with an
//! origin-gated CORS layer so a static site can read the numbers.
//!
//! # Quick Start
//!
//! ```bash
//! org-pulse init                 # write pulse.yaml
//! $EDITOR pulse.yaml             # fill in your organization
//! export GITHUB_TOKEN=ghp_xxxx
//! org-pulse collect              # write output/*.json and output/stats.json
//! ```
//!
//! # Commands
//!
//! **Collect all sources and combine them:**
//! ```bash
//! org-pulse collect --config pulse.yaml --output-dir output
//! ```
//!
//! Collectors run concurrently and independently; a failing source is logged
//! and simply leaves no snapshot behind, without disturbing its siblings.
//!
//! **Re-combine existing snapshots without polling:**
//! ```bash
//! org-pulse combine --output-dir output
//! ```
//!
//! The summary omits the fields of any source whose snapshot is absent.
//!
//! **Serve the snapshots to a website:**
//! ```bash
//! org-pulse serve --output-dir output --port 8787
//! ```
//!
//! Cross-origin access is limited to the configured `allowed_origins` plus
//! `http://localhost:<port>` for local development. Preflight `OPTIONS`
//! requests are answered directly: 204 for allowed origins, 403 otherwise.
//!
//! # Configuration
//!
//! ```yaml
//! organization: example-org
//! core_packages:
//!   - example-core
//!   - example-tools
//! papers:
//!   - "12345678"
//! bluesky_actor: did:plc:0000000000000000000000000
//! zulip:
//!   realm: https://example-org.zulipchat.com
//!   core_stream: website
//! ecosystem_url: https://example.org/ecosystem-packages/packages.json
//! allowed_origins:
//!   - https://example.org
//! ```
//!
//! Optional sections switch their collector off when omitted.
//!
//! # Credentials
//!
//! | Variable | Used by |
//! |----------|---------|
//! | `GITHUB_TOKEN` | repository statistics and contributor roster |
//! | `ZULIP_EMAIL`, `ZULIP_API_KEY` | active-user count |
//! | `PEPY_API_KEY` | download counts |
//!
//! The GitHub collectors work without a token, subject to the much stricter
//! anonymous rate limits.
//!
//! # Outputs
//!
//! One snapshot per source under the output directory — `github.json`,
//! `contributors.json`, `zulip.json`, `bluesky.json`, `citations.json`,
//! `downloads.json`, `ecosystem.json` — plus the merged `stats.json`.
//! Snapshots are immutable per run and carry a UTC generation timestamp.

use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use org_pulse::Result;

mod commands;

use crate::commands::{CollectArgs, CombineArgs, InitArgs, ServeArgs, ValidateArgs, collect, combine, init_config, serve, validate_config};

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "org-pulse", version, about, author)]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(subcommand)]
    command: PulseSubcommand,
}

#[derive(Subcommand, Debug)]
enum PulseSubcommand {
    /// Poll every configured source and write the snapshot and summary files
    Collect(CollectArgs),
    /// Merge existing snapshots into the summary file
    Combine(CombineArgs),
    /// Generate a default configuration file
    Init(InitArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
    /// Serve the snapshot files with origin-gated cross-origin access
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    match &Cli::parse().command {
        PulseSubcommand::Collect(args) => collect(args).await,
        PulseSubcommand::Combine(args) => combine(args),
        PulseSubcommand::Init(args) => init_config(args),
        PulseSubcommand::Validate(args) => validate_config(args),
        PulseSubcommand::Serve(args) => serve(args).await,
    }
}
