use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::Format;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Taint-style static analysis for Go and Java sources",
    long_about = "taintscope lowers source files into a per-function control-flow \
graph of three-address instructions, then searches for untrusted input \
flowing into dangerous operations.

Examples:
  taintscope scan vulns.go                 # Scan one file with built-in rules
  taintscope scan a.go b.java --format json
  taintscope scan vulns.go --rules my.yaml # Custom rule file (YAML or JSON)
  taintscope ir vulns.go                   # Dump the lowered IR as JSON",
    subcommand_required = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan source files for taint-style vulnerabilities
    Scan(ScanArgs),
    /// Lower a source file and print its IR as JSON
    Ir(IrArgs),
}

#[derive(ClapArgs)]
pub struct ScanArgs {
    /// Source files to analyze (.go or .java)
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Rule file (YAML or JSON); the built-in rules are used when absent
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    pub format: Format,

    /// Show debug logs
    #[arg(long)]
    pub debug: bool,

    /// Suppress all logs
    #[arg(short, long)]
    pub quiet: bool,
}

#[derive(ClapArgs)]
pub struct IrArgs {
    /// Source file to lower (.go or .java)
    pub path: PathBuf,

    /// Show debug logs
    #[arg(long)]
    pub debug: bool,
}

pub fn parse_cli() -> Cli {
    Cli::parse()
}
