//! Line-oriented fallback lowering for Java sources.
//!
//! No grammar is bundled for Java, so a regex classifier walks the file
//! line by line, tracking open `if`/loop constructs on a stack of control
//! contexts. The whole file lowers into a single `main` function and
//! operands are recovered by tokenizing each line with string literals
//! erased and keywords filtered. The `code` string keeps the original
//! text so rule patterns match naturally.

use ir::{BasicBlock, FunctionIR, Instruction, OpCode, ProgramIR};
use regex::Regex;
use std::sync::OnceLock;

struct LinePatterns {
    if_head: Regex,
    else_head: Regex,
    while_head: Regex,
    for_head: Regex,
    close_brace: Regex,
    assign: Regex,
    call_stmt: Regex,
    ret: Regex,
    quoted: Regex,
    ident: Regex,
}

fn patterns() -> &'static LinePatterns {
    static PATTERNS: OnceLock<LinePatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| LinePatterns {
        if_head: Regex::new(r"^\s*if\s*\((.*)\)\s*\{?").expect("valid if regex"),
        else_head: Regex::new(r"^\s*\}\s*else\s*\{?").expect("valid else regex"),
        while_head: Regex::new(r"^\s*while\s*\((.*)\)\s*\{?").expect("valid while regex"),
        for_head: Regex::new(r"^\s*for\s*\((.*)\)\s*\{?").expect("valid for regex"),
        close_brace: Regex::new(r"^\s*\}\s*$").expect("valid close regex"),
        // `type var = val;` or `var = val;`
        assign: Regex::new(r"^\s*(?:[a-zA-Z0-9_<>\[\]]+\s+)?([a-zA-Z0-9_]+)\s*=\s*(.+);")
            .expect("valid assignment regex"),
        // `obj.method(args);` or `method(args);`
        call_stmt: Regex::new(r"^\s*([a-zA-Z0-9_.]+\s*\(.*\));").expect("valid call regex"),
        ret: Regex::new(r"^\s*return\s*(.*);").expect("valid return regex"),
        quoted: Regex::new(r#""[^"]*""#).expect("valid string regex"),
        ident: Regex::new(r"\b[a-zA-Z_][a-zA-Z0-9_]*\b").expect("valid identifier regex"),
    })
}

/// Identifiers never treated as data operands.
const KEYWORDS: &[&str] = &[
    "new", "null", "true", "false", "if", "else", "return", "while", "for", "int", "boolean",
    "String", "void", "var", "public", "private", "protected", "static", "final", "class",
    "import", "package", "try", "catch",
];

/// Lowers a Java source file line by line into a single-function
/// [`ProgramIR`] of best-effort fidelity.
pub fn lower_source(content: &str) -> ProgramIR {
    let mut lowering = LineLowering::new();
    for (idx, raw) in content.lines().enumerate() {
        lowering.lower_line(idx + 1, raw.trim());
    }
    lowering.finish()
}

enum CtrlKind {
    If,
    Loop,
}

/// Open construct on the control stack; `merge` is where control lands
/// after the construct closes.
struct CtrlContext {
    kind: CtrlKind,
    merge: String,
}

struct LineLowering {
    func: FunctionIR,
    current: String,
    block_count: usize,
    /// Program-scoped instruction counter, shared numbering scheme with
    /// the structured lowering so IDs stay unique.
    inst_count: usize,
    stack: Vec<CtrlContext>,
}

impl LineLowering {
    fn new() -> Self {
        let mut lowering = Self {
            func: FunctionIR::new("main".into()),
            current: String::new(),
            block_count: 0,
            inst_count: 0,
            stack: Vec::new(),
        };
        let entry = lowering.new_block();
        lowering.func.entry = entry.clone();
        lowering.current = entry;
        lowering
    }

    fn lower_line(&mut self, line: usize, text: &str) {
        if text.is_empty()
            || text.starts_with("//")
            || text.starts_with("/*")
            || text.starts_with('*')
        {
            return;
        }
        let pats = patterns();

        if let Some(caps) = pats.if_head.captures(text) {
            let cond = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let then_id = self.new_block();
            let merge_id = self.new_block();
            let mut operands = tokenize(cond, "");
            operands.push(then_id.clone());
            operands.push(merge_id.clone());
            self.emit(
                OpCode::Branch,
                cond,
                String::new(),
                operands,
                &[then_id.clone(), merge_id.clone()],
                line,
            );
            self.stack.push(CtrlContext {
                kind: CtrlKind::If,
                merge: merge_id,
            });
            self.current = then_id;
            return;
        }

        if pats.else_head.is_match(text) {
            if let Some(ctx) = self.stack.last() {
                if matches!(ctx.kind, CtrlKind::If) {
                    // End of the then block; the else block itself jumps
                    // to the merge when its brace closes.
                    let merge = ctx.merge.clone();
                    self.emit_jump(&merge, line);
                    let else_id = self.new_block();
                    self.current = else_id;
                    return;
                }
            }
        }

        if let Some(caps) = pats.while_head.captures(text) {
            let cond = caps.get(1).map(|m| m.as_str()).unwrap_or_default().to_string();
            self.lower_loop(&cond, line);
            return;
        }
        if pats.for_head.is_match(text) {
            self.lower_loop("loop_cond", line);
            return;
        }

        if pats.close_brace.is_match(text) {
            if let Some(ctx) = self.stack.pop() {
                self.emit_jump(&ctx.merge, line);
                self.current = ctx.merge;
            }
            return;
        }

        if let Some(caps) = pats.assign.captures(text) {
            let lhs = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let rhs = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
            let operands = tokenize(rhs, lhs);
            let op = if rhs.contains('(') && rhs.contains(')') {
                OpCode::Call
            } else {
                OpCode::Store
            };
            self.emit(op, rhs, lhs.to_string(), operands, &[], line);
            return;
        }

        if let Some(caps) = pats.call_stmt.captures(text) {
            let call = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let operands = tokenize(call, "");
            self.emit(OpCode::Call, call, String::new(), operands, &[], line);
            return;
        }

        if let Some(caps) = pats.ret.captures(text) {
            let value = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let operands = tokenize(value, "");
            self.emit(OpCode::Ret, value, String::new(), operands, &[], line);
        }
    }

    /// header/body/exit triple; the body falls back to the exit block
    /// when its brace closes (no explicit back edge).
    fn lower_loop(&mut self, cond: &str, line: usize) {
        let header = self.new_block();
        let body = self.new_block();
        let exit = self.new_block();

        self.emit_jump(&header, line);
        self.current = header;
        let mut operands = tokenize(cond, "");
        operands.push(body.clone());
        operands.push(exit.clone());
        self.emit(
            OpCode::Branch,
            cond,
            String::new(),
            operands,
            &[body.clone(), exit.clone()],
            line,
        );
        self.stack.push(CtrlContext {
            kind: CtrlKind::Loop,
            merge: exit,
        });
        self.current = body;
    }

    fn finish(self) -> ProgramIR {
        let mut prog = ProgramIR::new();
        prog.functions.insert("main".into(), self.func);
        prog
    }

    fn new_block(&mut self) -> String {
        let id = format!("b{}", self.block_count);
        self.block_count += 1;
        self.func.blocks.insert(id.clone(), BasicBlock::new(id.clone()));
        id
    }

    fn emit(
        &mut self,
        op: OpCode,
        code: &str,
        result: String,
        operands: Vec<String>,
        successors: &[String],
        line: usize,
    ) {
        let inst = Instruction {
            id: format!("i{}", self.inst_count),
            op,
            result,
            operands,
            line,
            code: code.to_string(),
        };
        self.inst_count += 1;
        let current = self.current.clone();
        if let Some(block) = self.func.blocks.get_mut(&current) {
            block.instructions.push(inst);
        }
        for succ in successors {
            if let Some(block) = self.func.blocks.get_mut(&current) {
                block.successors.push(succ.clone());
            }
            if let Some(block) = self.func.blocks.get_mut(succ) {
                block.predecessors.push(current.clone());
            }
        }
    }

    fn emit_jump(&mut self, target: &str, line: usize) {
        let code = format!("goto {target}");
        self.emit(
            OpCode::Jump,
            &code,
            String::new(),
            vec![target.to_string()],
            &[target.to_string()],
            line,
        );
    }
}

/// Identifier operands of a code fragment: string literals erased first,
/// keywords and the result variable filtered out.
fn tokenize(code: &str, result: &str) -> Vec<String> {
    let pats = patterns();
    let clean = pats.quoted.replace_all(code, "");
    pats.ident
        .find_iter(&clean)
        .map(|m| m.as_str())
        .filter(|id| !KEYWORDS.contains(id) && *id != result)
        .map(|id| id.to_string())
        .collect()
}
