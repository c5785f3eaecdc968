//! Command-line interface definitions for memscan
//!
//! # Example
//!
//! ```bash
//! # List readable regions of a process
//! memscan regions --pid 4242
//!
//! # Find every Int32 equal to 100, wait, then keep the ones that grew
//! memscan scan --pid 4242 --type Int32 --value 100 --filter increased --delay-ms 5000
//!
//! # Load a table, run its auto-run scripts and keep frozen values pinned
//! memscan run --pid 4242 --table game.json
//! ```

use crate::core::types::{Address, DataType, ProcessId};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// External process memory scanner.
///
/// Scans a running process for exact values, narrows the matches with
/// filters, and keeps tracked addresses frozen.
#[derive(Debug, Parser)]
#[command(name = "memscan")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ./memscan.toml when present)
    #[arg(short, long, global = true, value_name = "PATH", env = "MEMSCAN_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is unset (trace, debug, info, warn, error, off)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List the scannable regions of a process
    Regions(TargetArgs),
    /// Scan for an exact value, optionally followed by one filter pass
    Scan(ScanArgs),
    /// Read one typed value
    Read(ReadArgs),
    /// Write one typed value
    Write(WriteArgs),
    /// Load a table, run its auto-run scripts and freeze until Ctrl+C
    Run(RunArgs),
    /// Run a script file against a process
    Script(ScriptArgs),
}

#[derive(Debug, Args)]
pub struct TargetArgs {
    /// Target process id
    #[arg(short, long)]
    pub pid: ProcessId,
}

#[derive(Debug, Args)]
pub struct ScanArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Value type (Int8..UInt64, Float, Double, String)
    #[arg(short = 't', long = "type", default_value = "Int32")]
    pub data_type: DataType,

    /// Value to search for
    #[arg(short, long)]
    pub value: String,

    /// Filter applied after the delay (changed, unchanged, increased, decreased, =, !=, >, <)
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Operand for relational filters
    #[arg(long, requires = "filter")]
    pub filter_value: Option<String>,

    /// Wait between the scan and the filter, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub delay_ms: u64,

    /// Maximum number of results to print
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

#[derive(Debug, Args)]
pub struct ReadArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Address (0x1000, $1000 or decimal)
    #[arg(short, long)]
    pub address: Address,

    /// Value type
    #[arg(short = 't', long = "type", default_value = "Int32")]
    pub data_type: DataType,
}

#[derive(Debug, Args)]
pub struct WriteArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Address (0x1000, $1000 or decimal)
    #[arg(short, long)]
    pub address: Address,

    /// Value type
    #[arg(short = 't', long = "type", default_value = "Int32")]
    pub data_type: DataType,

    /// Value to write
    #[arg(short, long)]
    pub value: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Table document to load
    #[arg(long, value_name = "PATH")]
    pub table: PathBuf,
}

#[derive(Debug, Args)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Script file
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,
}
