//! Loads taint rules from YAML or JSON files and provides the built-in
//! default rule set.
//!
//! A rule pairs a list of *source* patterns (where untrusted data enters)
//! with a list of *sink* patterns (dangerous operations). Patterns are
//! case-sensitive regular expressions matched by the engine against an
//! instruction's `code` string; they are compiled at scan time so a
//! malformed pattern degrades to a skipped pattern, never a failed load.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single source-to-sink detection rule.
pub struct Rule {
    pub name: String,
    pub description: String,
    /// Free-form severity tag (`CRITICAL`, `HIGH`, `MEDIUM`, ...).
    pub severity: String,
    /// Regex patterns marking instructions that introduce tainted data.
    pub sources: Vec<String>,
    /// Regex patterns marking instructions that must not receive it.
    pub sinks: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Rule set supplied to one analysis call.
pub struct RuleConfig {
    pub rules: Vec<Rule>,
}

/// Reads a rule file. `.json` files are parsed as JSON, anything else as
/// YAML (which also accepts JSON input).
///
/// # Example
/// ```
/// use loader::load_rules;
/// let path = std::env::temp_dir().join("rules-doc.yaml");
/// std::fs::write(
///     &path,
///     "rules:\n  - name: demo\n    description: d\n    severity: LOW\n    sources: [\"a\"]\n    sinks: [\"b\"]\n",
/// )
/// .unwrap();
/// let cfg = load_rules(&path).unwrap();
/// assert_eq!(cfg.rules[0].name, "demo");
/// ```
pub fn load_rules(path: &Path) -> Result<RuleConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("failed to read rules file: {}", path.display()))?;
    let cfg: RuleConfig = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON rules file: {}", path.display()))?,
        _ => serde_yaml::from_str(&data)
            .with_context(|| format!("invalid YAML rules file: {}", path.display()))?,
    };
    debug!(count = cfg.rules.len(), file = %path.display(), "rules loaded");
    Ok(cfg)
}

fn rule(name: &str, description: &str, severity: &str, sources: &[&str], sinks: &[&str]) -> Rule {
    Rule {
        name: name.into(),
        description: description.into(),
        severity: severity.into(),
        sources: sources.iter().map(|s| s.to_string()).collect(),
        sinks: sinks.iter().map(|s| s.to_string()).collect(),
    }
}

/// Built-in rules covering command injection, SQL injection, XSS, SSRF
/// and path traversal for Go and Java instruction renderings.
///
/// Source patterns repeat across rules on purpose: rules are independent
/// and sharing would couple them.
pub fn default_rules() -> RuleConfig {
    RuleConfig {
        rules: vec![
            rule(
                "Command Injection (RCE)",
                "User input flows into command execution",
                "CRITICAL",
                &[
                    r"request\.getParameter",
                    r"os\.Args",
                    r"scanner\.nextLine",
                    r"r\.URL\.Query",
                ],
                &[
                    r"Runtime\.getRuntime\(\)\.exec",
                    r"os/exec\.Command",
                    r"exec\.Command",
                    r"syscall\.Exec",
                    r"ProcessBuilder",
                ],
            ),
            rule(
                "SQL Injection",
                "User input flows into SQL query",
                "HIGH",
                &[r"request\.getParameter", r"r\.URL\.Query"],
                &[
                    r"sql\.Exec",
                    r"db\.Query",
                    r"executeQuery",
                    r"execute",
                    r"entityManager\.createQuery",
                    r"session\.createQuery",
                    r"session\.createSQLQuery",
                    r"sqlSession\.selectOne",
                    r"sqlSession\.selectList",
                ],
            ),
            rule(
                "XSS (Cross-Site Scripting)",
                "User input flows into HTML output",
                "MEDIUM",
                &[r"request\.getParameter", r"r\.URL\.Query"],
                &[
                    r"out\.println",
                    r"response\.getWriter\(\)\.write",
                    r"w\.Write",
                    r"fmt\.Fprintf",
                    r"template\.Execute",
                ],
            ),
            rule(
                "SSRF (Server-Side Request Forgery)",
                "User input controls network request target",
                "HIGH",
                &[r"request\.getParameter", r"r\.URL\.Query"],
                &[
                    r"new URL",
                    r"HttpClients\.createDefault",
                    r"httpClient\.execute",
                    r"openConnection",
                    r"http\.Get",
                    r"http\.Post",
                    r"http\.NewRequest",
                ],
            ),
            rule(
                "Path Traversal",
                "User input controls file path",
                "HIGH",
                &[r"request\.getParameter", r"r\.URL\.Query"],
                &[
                    r"new File",
                    r"Paths\.get",
                    r"new FileInputStream",
                    r"new FileReader",
                    r"os\.Open",
                    r"os\.OpenFile",
                    r"ioutil\.ReadFile",
                    r"os\.ReadFile",
                ],
            ),
        ],
    }
}
