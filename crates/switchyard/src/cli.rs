//! Clap derive structures for the `swyd` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// swyd -- probe, scan, and configure industrial switch fleets
#[derive(Debug, Parser)]
#[command(
    name = "swyd",
    version,
    about = "Probe, scan, and configure industrial switch fleets",
    long_about = "Identify TSN switches over RESTful, SNMP, and NETCONF, discover\n\
        their capabilities, and converge VLAN tables to a desired state\n\
        without touching reserved VLANs.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (defaults to the platform config dir)
    #[arg(long, env = "SWYD_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Profile store file (overrides `profiles_path`)
    #[arg(long, env = "SWYD_PROFILES", global = true)]
    pub profiles: Option<PathBuf>,

    /// Device account to log in with
    #[arg(long, short = 'a', env = "SWYD_ACCOUNT", global = true)]
    pub account: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "SWYD_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Log line format
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,
}

// ── Output Enums ─────────────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Identify one device and discover its capabilities if unknown
    Probe(ProbeArgs),

    /// Probe every address in a range
    ProbeRange(RangeArgs),

    /// Discover devices and links in an address range
    Scan(ScanArgs),

    /// Diff or apply a desired VLAN configuration
    Vlan(VlanArgs),

    /// Inspect the device profile store
    #[command(alias = "prof")]
    Profiles(ProfilesArgs),

    /// Show configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Probe / scan ─────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProbeArgs {
    /// Device address
    pub address: IpAddr,
}

#[derive(Debug, Args)]
pub struct RangeArgs {
    /// First address
    pub start: IpAddr,

    /// Last address (inclusive)
    pub end: IpAddr,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub range: RangeArgs,

    /// Probe models that match no known profile
    #[arg(long)]
    pub auto_probe: bool,
}

// ── VLAN ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct VlanArgs {
    #[command(subcommand)]
    pub command: VlanCommand,
}

#[derive(Debug, Subcommand)]
pub enum VlanCommand {
    /// Show the changes needed to reach the desired configuration
    Diff(VlanTarget),

    /// Apply the desired configuration
    Apply(VlanTarget),
}

#[derive(Debug, Args)]
pub struct VlanTarget {
    /// Device address
    #[arg(long, short = 'd')]
    pub device: IpAddr,

    /// Desired VLAN configuration (JSON or YAML)
    #[arg(long)]
    pub desired: PathBuf,
}

// ── Profiles ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ProfilesArgs {
    #[command(subcommand)]
    pub command: ProfilesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ProfilesCommand {
    /// List device profiles
    #[command(alias = "ls")]
    List,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current resolved configuration
    Show,

    /// Print the config file path
    Path,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
