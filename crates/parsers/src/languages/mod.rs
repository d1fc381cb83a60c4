//! Per-language lowerings.
//!
//! `go` consumes a real tree-sitter parse tree and is the authoritative
//! path; `java` is a regex-driven line classifier used as a degraded
//! fallback for sources without a bundled grammar.

pub mod go;
pub mod java;
