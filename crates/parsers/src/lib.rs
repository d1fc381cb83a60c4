//! Lowering front-ends that translate source files into the program IR
//! consumed by the taint engine.
//!
//! The extension picks the front-end: `.go` files go through the
//! structured lowering over a real parse tree, `.java` files through the
//! line-oriented fallback. Both produce the same IR shape.

use anyhow::{bail, Context, Result};
use ir::ProgramIR;
use std::fs;
use std::path::Path;
use tracing::debug;

pub mod languages;
pub use languages::{go, java};

/// Determines the supported file type from the extension.
///
/// # Example
/// ```
/// use parsers::detect_type;
/// assert_eq!(detect_type(std::path::Path::new("vulns.go")), Some("go"));
/// assert_eq!(detect_type(std::path::Path::new("README.md")), None);
/// ```
pub fn detect_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_string_lossy().to_lowercase();
    let detected = match ext.as_str() {
        "go" => Some("go"),
        "java" => Some("java"),
        _ => None,
    };
    if let Some(t) = detected {
        debug!(file = %path.display(), file_type = t, "file type detected");
    } else {
        debug!(file = %path.display(), "unsupported file type");
    }
    detected
}

/// Parses and lowers a source file into a [`ProgramIR`].
///
/// Unsupported extensions, unreadable files and syntax errors are
/// errors. An empty program (a file with no functions) is not.
pub fn generate_ir(path: &Path) -> Result<ProgramIR> {
    let Some(ftype) = detect_type(path) else {
        bail!("unsupported file type: {}", path.display());
    };
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read file: {}", path.display()))?;
    let prog = match ftype {
        "go" => go::lower_source(&content)
            .with_context(|| format!("failed to lower {}", path.display()))?,
        _ => java::lower_source(&content),
    };
    debug!(
        file = %path.display(),
        functions = prog.functions.len(),
        "lowering complete"
    );
    Ok(prog)
}
