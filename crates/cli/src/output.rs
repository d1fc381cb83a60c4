use clap::ValueEnum;
use engine::Vulnerability;

/// Supported output formats for scan results.
#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

/// Returns the severity colored with simple ANSI codes.
fn color_severity(severity: &str) -> String {
    let code = match severity {
        "CRITICAL" | "HIGH" | "ERROR" => "\x1b[31m",
        "MEDIUM" | "WARNING" => "\x1b[33m",
        _ => "\x1b[32m",
    };
    format!("{code}{severity}\x1b[0m")
}

pub fn print_findings(vulns: &[Vulnerability], format: Format) -> anyhow::Result<()> {
    match format {
        Format::Json => {
            println!("{}", serde_json::to_string_pretty(vulns)?);
        }
        Format::Text => {
            if vulns.is_empty() {
                println!("No vulnerabilities found.");
                return Ok(());
            }
            println!("Found {} vulnerabilities:\n", vulns.len());
            for v in vulns {
                println!(
                    "[{}] {} in {}:{}",
                    color_severity(&v.severity),
                    v.kind,
                    v.file,
                    v.line
                );
                println!("  {}", v.description);
                println!("  {} -> {}", v.source.code, v.sink.code);
                for node in &v.path {
                    println!("    {}: {}", node.line, node.code);
                }
                println!();
            }
        }
    }
    Ok(())
}
