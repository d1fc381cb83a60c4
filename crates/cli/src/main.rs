//! Entry point for the command-line interface.
//! Argument handling, scanning and output formatting live in the
//! library modules.

use taintscope::args::{parse_cli, Commands};
use taintscope::ir_dump::run_ir_dump;
use taintscope::scan::run_scan;

fn main() -> anyhow::Result<()> {
    let cli = parse_cli();
    match cli.command {
        Commands::Scan(args) => run_scan(args),
        Commands::Ir(args) => run_ir_dump(args),
    }
}
