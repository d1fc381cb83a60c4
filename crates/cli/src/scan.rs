use anyhow::{bail, Result};
use engine::{analyze_ir, RuleConfig, Vulnerability};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::args::ScanArgs;
use crate::{init_tracing, output};

pub fn run_scan(args: ScanArgs) -> Result<()> {
    init_tracing(args.debug, args.quiet);

    let rules = match &args.rules {
        Some(path) => loader::load_rules(path)?,
        None => loader::default_rules(),
    };
    info!(
        rules = rules.rules.len(),
        files = args.paths.len(),
        "scan started"
    );

    // Analyses share nothing, so files fan out across the rayon pool.
    let results: Vec<(PathBuf, Result<Vec<Vulnerability>>)> = args
        .paths
        .par_iter()
        .map(|path| (path.clone(), scan_file(path, &rules)))
        .collect();

    let mut vulns = Vec::new();
    let mut failed = 0usize;
    for (path, res) in results {
        match res {
            Ok(mut found) => vulns.append(&mut found),
            Err(e) => {
                failed += 1;
                warn!(file = %path.display(), error = %e, "analysis failed");
            }
        }
    }
    info!(findings = vulns.len(), failed, "scan finished");

    output::print_findings(&vulns, args.format)?;
    if failed > 0 {
        bail!("{failed} file(s) failed to analyze");
    }
    Ok(())
}

/// Lowers and scans one file with the given rules.
pub fn scan_file(path: &Path, rules: &RuleConfig) -> Result<Vec<Vulnerability>> {
    let prog = parsers::generate_ir(path)?;
    let mut vulns = analyze_ir(&prog, &path.to_string_lossy(), rules);
    enrich_findings(path, &mut vulns);
    Ok(vulns)
}

/// Replaces each path node's code with the trimmed raw source line and
/// drops consecutive nodes on the same line, so reports read like the
/// original file rather than the IR.
pub fn enrich_findings(path: &Path, vulns: &mut [Vulnerability]) {
    let Ok(content) = fs::read_to_string(path) else {
        return;
    };
    let lines: Vec<&str> = content.lines().collect();

    for v in vulns.iter_mut() {
        let mut deduped = Vec::new();
        let mut last_line = usize::MAX;
        for mut node in v.path.drain(..) {
            if node.line > 0 && node.line <= lines.len() {
                node.code = lines[node.line - 1].trim().to_string();
            }
            if node.line != last_line {
                last_line = node.line;
                deduped.push(node);
            }
        }
        v.path = deduped;

        if v.source.line > 0 && v.source.line <= lines.len() {
            v.source.code = lines[v.source.line - 1].trim().to_string();
        }
        if v.sink.line > 0 && v.sink.line <= lines.len() {
            v.sink.code = lines[v.sink.line - 1].trim().to_string();
        }
    }
}
