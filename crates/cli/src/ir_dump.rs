use anyhow::Result;

use crate::args::IrArgs;
use crate::init_tracing;

/// Lowers one source file and prints the resulting IR as pretty JSON.
pub fn run_ir_dump(args: IrArgs) -> Result<()> {
    init_tracing(args.debug, false);
    let prog = parsers::generate_ir(&args.path)?;
    println!("{}", serde_json::to_string_pretty(&prog)?);
    Ok(())
}
