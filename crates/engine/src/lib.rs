//! Taint analysis engine evaluating source/sink rules over the program IR.
//!
//! One linear pass indexes the IR (use map, instruction-to-block,
//! instruction-to-function). Each rule then seeds a forward BFS over
//! use-def edges from every source-matching instruction; every candidate
//! path is validated against the CFG (same-block ordering or inter-block
//! reachability) before it is reported.

use ir::{BasicBlock, FunctionIR, Instruction, ProgramIR};
pub use loader::{default_rules, load_rules, Rule, RuleConfig};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Snapshot of an instruction with enough context to render a finding
/// without re-traversing the IR.
pub struct InstructionView {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Line")]
    pub line: usize,
    #[serde(rename = "File")]
    pub file: String,
    /// Enclosing function name.
    #[serde(rename = "Function")]
    pub function: String,
    /// Enclosing basic block ID.
    #[serde(rename = "BlockID")]
    pub block_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
/// A detected source-to-sink flow.
pub struct Vulnerability {
    /// Name of the rule that fired.
    #[serde(rename = "Type")]
    pub kind: String,
    pub severity: String,
    pub file: String,
    /// Line of the source instruction.
    pub line: usize,
    pub description: String,
    pub source: InstructionView,
    pub sink: InstructionView,
    /// Use-def path from source to sink, inclusive.
    pub path: Vec<InstructionView>,
}

/// Borrowed indices over one program, built once per analysis and
/// discarded when it returns.
struct IrIndex<'a> {
    all_insts: Vec<&'a Instruction>,
    /// name -> instructions consuming that name, in encounter order.
    use_map: HashMap<&'a str, Vec<&'a Instruction>>,
    inst_to_block: HashMap<&'a str, &'a str>,
    inst_to_func: HashMap<&'a str, &'a str>,
}

impl<'a> IrIndex<'a> {
    fn build(prog: &'a ProgramIR) -> Self {
        let mut index = Self {
            all_insts: Vec::new(),
            use_map: HashMap::new(),
            inst_to_block: HashMap::new(),
            inst_to_func: HashMap::new(),
        };
        for func in prog.functions.values() {
            for block in func.blocks.values() {
                for inst in &block.instructions {
                    index.all_insts.push(inst);
                    index.inst_to_block.insert(&inst.id, &block.id);
                    index.inst_to_func.insert(&inst.id, &func.name);
                    for operand in &inst.operands {
                        index.use_map.entry(operand.as_str()).or_default().push(inst);
                    }
                }
            }
        }
        index
    }

    fn block_of(&self, inst: &Instruction) -> &'a str {
        self.inst_to_block.get(inst.id.as_str()).copied().unwrap_or_default()
    }

    fn func_of(&self, inst: &Instruction) -> &'a str {
        self.inst_to_func.get(inst.id.as_str()).copied().unwrap_or_default()
    }
}

/// Scans a lowered program against a rule set. Never fails: a program
/// with no matches yields an empty list, and malformed rule patterns are
/// skipped. `file_path` is informational and attached to every finding.
pub fn analyze_ir(prog: &ProgramIR, file_path: &str, config: &RuleConfig) -> Vec<Vulnerability> {
    let index = IrIndex::build(prog);
    let mut vulns = Vec::new();

    for rule in &config.rules {
        let sources = compile_patterns(&rule.sources);
        let sinks = compile_patterns(&rule.sinks);
        debug!(rule = %rule.name, instructions = index.all_insts.len(), "scanning");

        for &inst in &index.all_insts {
            if !matches_any(&inst.code, &sources) {
                continue;
            }
            let Some(path) = find_path_to_sink(inst, &sinks, &index.use_map) else {
                continue;
            };
            if !validate_path(&path, prog, &index) {
                debug!(rule = %rule.name, source = %inst.id, "candidate rejected by CFG validation");
                continue;
            }
            let sink = path[path.len() - 1];
            debug!(rule = %rule.name, source = %inst.id, sink = %sink.id, "flow confirmed");
            vulns.push(Vulnerability {
                kind: rule.name.clone(),
                severity: rule.severity.clone(),
                file: file_path.to_string(),
                line: inst.line,
                description: rule.description.clone(),
                source: view(inst, file_path, &index),
                sink: view(sink, file_path, &index),
                path: path.iter().map(|i| view(i, file_path, &index)).collect(),
            });
        }
    }
    vulns
}

fn compile_patterns(patterns: &[String]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| match Regex::new(p) {
            Ok(re) => Some(re),
            Err(e) => {
                debug!(pattern = %p, error = %e, "skipping malformed rule pattern");
                None
            }
        })
        .collect()
}

fn matches_any(code: &str, regexes: &[Regex]) -> bool {
    regexes.iter().any(|re| re.is_match(code))
}

/// Forward BFS over use-def edges, carrying whole paths in the queue.
/// The visited set is keyed by instruction ID, so each instruction is
/// reached by at most one (shortest) path and each source yields at most
/// one candidate. The length guard keeps an instruction matching both a
/// source and a sink pattern from reporting itself.
fn find_path_to_sink<'a>(
    start: &'a Instruction,
    sinks: &[Regex],
    use_map: &HashMap<&'a str, Vec<&'a Instruction>>,
) -> Option<Vec<&'a Instruction>> {
    let mut queue: VecDeque<Vec<&'a Instruction>> = VecDeque::new();
    let mut visited: HashSet<&'a str> = HashSet::new();
    queue.push_back(vec![start]);
    visited.insert(&start.id);

    while let Some(path) = queue.pop_front() {
        let curr = *path.last().expect("queued paths are non-empty");

        if path.len() > 1 && matches_any(&curr.code, sinks) {
            return Some(path);
        }

        if curr.result.is_empty() {
            continue;
        }
        if let Some(users) = use_map.get(curr.result.as_str()) {
            for &user in users {
                if visited.insert(&user.id) {
                    let mut next = path.clone();
                    next.push(user);
                    queue.push_back(next);
                }
            }
        }
    }
    None
}

/// Accepts a candidate only if every consecutive same-function pair is
/// either ordered within its block or connected by forward reachability
/// over successor edges. Pairs crossing functions are accepted without
/// checking; inter-procedural validation is out of scope. Rejection
/// discards the whole path.
fn validate_path(path: &[&Instruction], prog: &ProgramIR, index: &IrIndex) -> bool {
    for pair in path.windows(2) {
        let (curr, next) = (pair[0], pair[1]);

        let func_name = index.func_of(curr);
        if func_name != index.func_of(next) {
            continue;
        }
        let Some(func) = prog.functions.get(func_name) else {
            continue;
        };

        let b1 = index.block_of(curr);
        let b2 = index.block_of(next);
        if b1 == b2 {
            let Some(block) = func.blocks.get(b1) else {
                continue;
            };
            if !is_ordered_in_block(curr, next, block) {
                return false;
            }
        } else if !is_reachable(b1, b2, func) {
            return false;
        }
    }
    true
}

/// True when `a` appears before `b` in the block's instruction list.
fn is_ordered_in_block(a: &Instruction, b: &Instruction, block: &BasicBlock) -> bool {
    let mut found_a = false;
    for inst in &block.instructions {
        if inst.id == a.id {
            found_a = true;
        }
        if inst.id == b.id {
            return found_a;
        }
    }
    false
}

/// Breadth-first search over successor edges within one function.
fn is_reachable(start: &str, end: &str, func: &FunctionIR) -> bool {
    if start == end {
        return true;
    }
    let mut visited: HashSet<&str> = HashSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();
    visited.insert(start);
    queue.push_back(start);

    while let Some(curr) = queue.pop_front() {
        if curr == end {
            return true;
        }
        let Some(block) = func.blocks.get(curr) else {
            continue;
        };
        for succ in &block.successors {
            if visited.insert(succ) {
                queue.push_back(succ);
            }
        }
    }
    false
}

fn view(inst: &Instruction, file: &str, index: &IrIndex) -> InstructionView {
    InstructionView {
        id: inst.id.clone(),
        code: inst.code.clone(),
        line: inst.line,
        file: file.to_string(),
        function: index.func_of(inst).to_string(),
        block_id: index.block_of(inst).to_string(),
    }
}
