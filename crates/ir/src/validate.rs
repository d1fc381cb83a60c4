//! Structural checks over a lowered program.
//!
//! The lowerings are responsible for producing well-formed graphs; these
//! checks exist so tests can assert it and so callers ingesting foreign
//! IR can reject broken input early.

use crate::{OpCode, ProgramIR};
use std::collections::HashSet;

/// Returns a description of every structural violation found.
///
/// Checked per function: predecessor/successor lists are mutually
/// consistent, BRANCH operands name two successor blocks that exist,
/// JUMP operands name one. Checked program-wide: instruction IDs are
/// unique and every temporary (`t<n>`) is defined at most once.
pub fn structural_errors(prog: &ProgramIR) -> Vec<String> {
    let mut errors = Vec::new();

    for func in prog.functions.values() {
        for block in func.blocks.values() {
            for succ in &block.successors {
                let linked = func
                    .blocks
                    .get(succ)
                    .is_some_and(|s| s.predecessors.contains(&block.id));
                if !linked {
                    errors.push(format!(
                        "{}: {} -> {} has no matching predecessor link",
                        func.name, block.id, succ
                    ));
                }
            }
            for pred in &block.predecessors {
                let linked = func
                    .blocks
                    .get(pred)
                    .is_some_and(|p| p.successors.contains(&block.id));
                if !linked {
                    errors.push(format!(
                        "{}: {} <- {} has no matching successor link",
                        func.name, block.id, pred
                    ));
                }
            }

            for inst in &block.instructions {
                match inst.op {
                    OpCode::Branch => {
                        let targets: Vec<&String> = inst
                            .operands
                            .iter()
                            .filter(|o| func.blocks.contains_key(*o))
                            .collect();
                        if targets.len() < 2 {
                            errors.push(format!(
                                "{}: BRANCH {} does not name two blocks",
                                func.name, inst.id
                            ));
                        }
                        for t in targets {
                            if !block.successors.contains(t) {
                                errors.push(format!(
                                    "{}: BRANCH {} targets {} outside successors",
                                    func.name, inst.id, t
                                ));
                            }
                        }
                    }
                    OpCode::Jump => {
                        let target = inst.operands.first();
                        match target {
                            Some(t) if func.blocks.contains_key(t) => {
                                if !block.successors.contains(t) {
                                    errors.push(format!(
                                        "{}: JUMP {} targets {} outside successors",
                                        func.name, inst.id, t
                                    ));
                                }
                            }
                            _ => errors.push(format!(
                                "{}: JUMP {} has no block operand",
                                func.name, inst.id
                            )),
                        }
                    }
                    _ => {}
                }
            }
        }

        if !func.entry.is_empty() {
            match func.blocks.get(&func.entry) {
                Some(entry) if !entry.predecessors.is_empty() => {
                    errors.push(format!("{}: entry block has predecessors", func.name));
                }
                None => errors.push(format!("{}: entry block missing", func.name)),
                _ => {}
            }
        }
    }

    let mut inst_ids = HashSet::new();
    let mut temp_defs = HashSet::new();
    for inst in prog.instructions() {
        if !inst_ids.insert(inst.id.as_str()) {
            errors.push(format!("duplicate instruction id {}", inst.id));
        }
        if is_temp(&inst.result) && !temp_defs.insert(inst.result.as_str()) {
            errors.push(format!("temporary {} defined twice", inst.result));
        }
    }

    errors
}

fn is_temp(name: &str) -> bool {
    name.strip_prefix('t')
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}
