//! Structured lowering for Go sources.
//!
//! Walks the parse tree function by function, serializing nested
//! expressions into fresh single-assignment temporaries and splitting
//! straight-line code into linked basic blocks at `if` boundaries.
//! Statements the walker does not understand are skipped; expressions it
//! does not understand lower to the empty string.

use anyhow::{anyhow, bail, Result};
use ir::{BasicBlock, FunctionIR, Instruction, OpCode, ProgramIR};
use tree_sitter::Node;

/// Lowers a Go source file into a [`ProgramIR`] with one function per
/// top-level `func` declaration (methods included).
pub fn lower_source(content: &str) -> Result<ProgramIR> {
    let mut parser = tree_sitter::Parser::new();
    parser
        .set_language(tree_sitter_go::language())
        .expect("load go grammar");
    let Some(tree) = parser.parse(content, None) else {
        tracing::warn!("failed to parse go source");
        return Err(anyhow!("failed to parse go source"));
    };
    let root = tree.root_node();
    if root.has_error() {
        bail!("go source contains syntax errors");
    }

    let mut lowering = Lowering::new(content);
    let mut cursor = root.walk();
    for child in root.named_children(&mut cursor) {
        if matches!(
            child.kind(),
            "function_declaration" | "method_declaration"
        ) {
            lowering.lower_function(child);
        }
    }
    Ok(lowering.prog)
}

struct Lowering<'a> {
    src: &'a str,
    prog: ProgramIR,
    /// Function under construction; moved into `prog` when finished.
    func: FunctionIR,
    /// Block currently receiving emitted instructions.
    current: String,
    /// Function-scoped block counter (`B0`, `B1`, ...).
    block_count: usize,
    /// Program-scoped instruction counter. Drives both `i<n>` IDs and
    /// `t<n>` temporaries, which keeps temporaries unique program-wide.
    inst_count: usize,
}

impl<'a> Lowering<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            prog: ProgramIR::new(),
            func: FunctionIR::new(String::new()),
            current: String::new(),
            block_count: 0,
            inst_count: 0,
        }
    }

    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.src.as_bytes()).unwrap_or_default()
    }

    fn line(&self, node: Node) -> usize {
        node.start_position().row + 1
    }

    fn lower_function(&mut self, node: Node) {
        let Some(name_node) = node.child_by_field_name("name") else {
            return;
        };
        let name = self.text(name_node).to_string();
        self.func = FunctionIR::new(name.clone());
        self.block_count = 0;
        let entry = self.new_block();
        self.func.entry = entry.clone();
        self.current = entry;

        if let Some(params) = node.child_by_field_name("parameters") {
            let mut decls = params.walk();
            let decl_nodes: Vec<Node> = params.named_children(&mut decls).collect();
            for decl in decl_nodes {
                let mut names = decl.walk();
                let name_nodes: Vec<Node> =
                    decl.children_by_field_name("name", &mut names).collect();
                for pname in name_nodes {
                    let param = self.text(pname).to_string();
                    let line = self.line(pname);
                    self.emit(OpCode::Param, param, Vec::new(), line);
                }
            }
        }

        if let Some(body) = node.child_by_field_name("body") {
            self.lower_block(body);
        }

        let func = std::mem::replace(&mut self.func, FunctionIR::new(String::new()));
        self.prog.functions.insert(name, func);
    }

    fn lower_block(&mut self, node: Node) {
        let mut cursor = node.walk();
        let stmts: Vec<Node> = node.named_children(&mut cursor).collect();
        for stmt in stmts {
            self.lower_stmt(stmt);
        }
    }

    fn lower_stmt(&mut self, node: Node) {
        match node.kind() {
            "short_var_declaration" | "assignment_statement" => self.lower_assignment(node),
            "var_declaration" => {
                let mut cursor = node.walk();
                let specs: Vec<Node> = node.named_children(&mut cursor).collect();
                for spec in specs {
                    if spec.kind() == "var_spec" {
                        self.lower_var_spec(spec);
                    }
                }
            }
            "return_statement" => {
                let mut results = Vec::new();
                if let Some(list) = node.named_child(0) {
                    if list.kind() == "expression_list" {
                        let mut cursor = list.walk();
                        let exprs: Vec<Node> = list.named_children(&mut cursor).collect();
                        for expr in exprs {
                            results.push(self.lower_expr(expr));
                        }
                    }
                }
                let line = self.line(node);
                self.emit(OpCode::Ret, String::new(), results, line);
            }
            "if_statement" => self.lower_if(node),
            "block" => self.lower_block(node),
            // Bare expressions in statement position (calls, mostly).
            _ => {
                self.lower_expr(node);
            }
        }
    }

    /// `lhs_1, ... = rhs_1, ...` — each RHS lowers before its STORE.
    /// A missing RHS lowers to the empty string and the STORE is still
    /// emitted with an empty operand.
    fn lower_assignment(&mut self, node: Node) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let mut lcursor = left.walk();
        let lhs: Vec<Node> = left.named_children(&mut lcursor).collect();
        let rhs: Vec<Node> = match node.child_by_field_name("right") {
            Some(right) => {
                let mut rcursor = right.walk();
                right.named_children(&mut rcursor).collect()
            }
            None => Vec::new(),
        };

        let line = self.line(node);
        for (i, target) in lhs.iter().enumerate() {
            let value = match rhs.get(i) {
                Some(expr) => self.lower_expr(*expr),
                None => String::new(),
            };
            if target.kind() == "identifier" {
                let name = self.text(*target).to_string();
                self.emit(OpCode::Store, name, vec![value], line);
            }
        }
    }

    fn lower_var_spec(&mut self, node: Node) {
        let mut ncursor = node.walk();
        let names: Vec<Node> = node.children_by_field_name("name", &mut ncursor).collect();
        let values: Vec<Node> = match node.child_by_field_name("value") {
            Some(list) => {
                let mut vcursor = list.walk();
                list.named_children(&mut vcursor).collect()
            }
            None => Vec::new(),
        };
        let line = self.line(node);
        for (i, target) in names.iter().enumerate() {
            let value = match values.get(i) {
                Some(expr) => self.lower_expr(*expr),
                None => String::new(),
            };
            let name = self.text(*target).to_string();
            self.emit(OpCode::Store, name, vec![value], line);
        }
    }

    /// Lowers `if`/`else` into the four-block diamond: the condition's
    /// BRANCH in the current block, fresh then/else blocks that each JUMP
    /// into a shared merge block. The else block exists even without an
    /// else clause so the branch always has a well-formed pair of
    /// successors.
    fn lower_if(&mut self, node: Node) {
        if let Some(init) = node.child_by_field_name("initializer") {
            self.lower_stmt(init);
        }
        let cond = match node.child_by_field_name("condition") {
            Some(c) => self.lower_expr(c),
            None => String::new(),
        };

        let then_id = self.new_block();
        let else_id = self.new_block();
        let merge_id = self.new_block();

        let line = self.line(node);
        self.emit(
            OpCode::Branch,
            String::new(),
            vec![cond, then_id.clone(), else_id.clone()],
            line,
        );
        let branch_block = self.current.clone();
        self.link(&branch_block, &then_id);
        self.link(&branch_block, &else_id);

        self.current = then_id;
        let mut jump_line = line;
        if let Some(consequence) = node.child_by_field_name("consequence") {
            self.lower_block(consequence);
            jump_line = consequence.end_position().row + 1;
        }
        self.emit(OpCode::Jump, String::new(), vec![merge_id.clone()], jump_line);
        let then_end = self.current.clone();
        self.link(&then_end, &merge_id);

        self.current = else_id;
        let alternative = node.child_by_field_name("alternative");
        let else_line = alternative.map(|a| self.line(a)).unwrap_or(jump_line);
        if let Some(alt) = alternative {
            // A block for `else { }`, an if_statement for `else if`.
            self.lower_stmt(alt);
        }
        self.emit(OpCode::Jump, String::new(), vec![merge_id.clone()], else_line);
        let else_end = self.current.clone();
        self.link(&else_end, &merge_id);

        self.current = merge_id;
    }

    /// Lowers an expression, returning the name of its result temporary
    /// (empty for expressions the walker does not model).
    fn lower_expr(&mut self, node: Node) -> String {
        match node.kind() {
            "int_literal"
            | "float_literal"
            | "imaginary_literal"
            | "rune_literal"
            | "interpreted_string_literal"
            | "raw_string_literal" => {
                let literal = self.text(node).to_string();
                let line = self.line(node);
                let res = self.temp();
                self.emit(OpCode::Const, res.clone(), vec![literal], line);
                res
            }
            "identifier" | "true" | "false" | "nil" | "iota" => {
                let name = self.text(node).to_string();
                let line = self.line(node);
                let res = self.temp();
                self.emit(OpCode::Load, res.clone(), vec![name], line);
                res
            }
            "call_expression" => self.lower_call(node),
            "binary_expression" => {
                let left = match node.child_by_field_name("left") {
                    Some(l) => self.lower_expr(l),
                    None => String::new(),
                };
                let right = match node.child_by_field_name("right") {
                    Some(r) => self.lower_expr(r),
                    None => String::new(),
                };
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o).to_string())
                    .unwrap_or_default();
                let line = self.line(node);
                let res = self.temp();
                self.emit(OpCode::BinOp, res.clone(), vec![left, operator, right], line);
                res
            }
            "selector_expression" => {
                // Field access in value position, e.g. r.URL.Path.
                let name = self.flatten(node);
                let line = self.line(node);
                let res = self.temp();
                self.emit(OpCode::Load, res.clone(), vec![name], line);
                res
            }
            "index_expression" => {
                // Over-approximated to the container: x[i] taints like x.
                let container = match node.child_by_field_name("operand") {
                    Some(o) => self.lower_expr(o),
                    None => String::new(),
                };
                let line = self.line(node);
                let res = self.temp();
                self.emit(OpCode::Load, res.clone(), vec![container], line);
                res
            }
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.lower_expr(inner),
                None => String::new(),
            },
            "type_conversion_expression" => {
                // []byte(x) and friends behave like a call of the type.
                let callee = node
                    .child_by_field_name("type")
                    .map(|t| self.text(t).to_string())
                    .unwrap_or_else(|| "unknown".into());
                let operand = match node.child_by_field_name("operand") {
                    Some(o) => self.lower_expr(o),
                    None => String::new(),
                };
                let line = self.line(node);
                let res = self.temp();
                self.emit(OpCode::Call, res.clone(), vec![callee, operand], line);
                res
            }
            "unary_expression" => match node.child_by_field_name("operand") {
                Some(o) => self.lower_expr(o),
                None => String::new(),
            },
            _ => String::new(),
        }
    }

    fn lower_call(&mut self, node: Node) -> String {
        let callee = match node.child_by_field_name("function") {
            Some(f) => match f.kind() {
                "identifier" => self.text(f).to_string(),
                "selector_expression" => self.flatten(f),
                _ => "unknown".to_string(),
            },
            None => "unknown".to_string(),
        };
        let mut operands = vec![callee];
        if let Some(list) = node.child_by_field_name("arguments") {
            let mut cursor = list.walk();
            let args: Vec<Node> = list.named_children(&mut cursor).collect();
            for arg in args {
                let lowered = self.lower_expr(arg);
                operands.push(lowered);
            }
        }
        let line = self.line(node);
        let res = self.temp();
        self.emit(OpCode::Call, res.clone(), operands, line);
        res
    }

    /// Flattens a callee or selector chain to its dotted textual name
    /// (`pkg.Type.Method`, `*` prefixed for pointer receivers).
    fn flatten(&self, node: Node) -> String {
        match node.kind() {
            "identifier" | "field_identifier" | "package_identifier" | "type_identifier" => {
                self.text(node).to_string()
            }
            "selector_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.flatten(o))
                    .unwrap_or_else(|| "expr".into());
                let field = node
                    .child_by_field_name("field")
                    .map(|f| self.text(f).to_string())
                    .unwrap_or_default();
                format!("{operand}.{field}")
            }
            "parenthesized_expression" => match node.named_child(0) {
                Some(inner) => self.flatten(inner),
                None => "expr".to_string(),
            },
            "pointer_type" => match node.named_child(0) {
                Some(inner) => format!("*{}", self.flatten(inner)),
                None => "expr".to_string(),
            },
            "unary_expression" => {
                let operand = node
                    .child_by_field_name("operand")
                    .map(|o| self.flatten(o))
                    .unwrap_or_else(|| "expr".into());
                let operator = node
                    .child_by_field_name("operator")
                    .map(|o| self.text(o))
                    .unwrap_or_default();
                if operator == "*" {
                    format!("*{operand}")
                } else {
                    operand
                }
            }
            _ => "expr".to_string(),
        }
    }

    // --- Helpers ---

    fn new_block(&mut self) -> String {
        let id = format!("B{}", self.block_count);
        self.block_count += 1;
        self.func.blocks.insert(id.clone(), BasicBlock::new(id.clone()));
        id
    }

    fn link(&mut self, from: &str, to: &str) {
        if let Some(block) = self.func.blocks.get_mut(from) {
            block.successors.push(to.to_string());
        }
        if let Some(block) = self.func.blocks.get_mut(to) {
            block.predecessors.push(from.to_string());
        }
    }

    fn emit(&mut self, op: OpCode, result: String, operands: Vec<String>, line: usize) {
        let inst = Instruction {
            id: format!("i{}", self.inst_count),
            code: format_code(op, &result, &operands),
            op,
            result,
            operands,
            line,
        };
        self.inst_count += 1;
        if let Some(block) = self.func.blocks.get_mut(&self.current) {
            block.instructions.push(inst);
        }
    }

    /// Name of the temporary the next emitted instruction defines.
    fn temp(&self) -> String {
        format!("t{}", self.inst_count)
    }
}

/// Human-readable rendering stored in `Instruction::code`. Rule patterns
/// match against this string, so the call form embeds the textual callee
/// verbatim.
fn format_code(op: OpCode, result: &str, operands: &[String]) -> String {
    let operand = |i: usize| operands.get(i).map(String::as_str).unwrap_or_default();
    match op {
        OpCode::Store => format!("{result} = {}", operand(0)),
        OpCode::Load => format!("{result} = load {}", operand(0)),
        OpCode::Call => format!(
            "{result} = call {}([{}])",
            operand(0),
            operands.get(1..).unwrap_or_default().join(" ")
        ),
        OpCode::Const => format!("{result} = const {}", operand(0)),
        OpCode::Branch => format!(
            "if {} goto {} else {}",
            operand(0),
            operand(1),
            operand(2)
        ),
        OpCode::Jump => format!("goto {}", operand(0)),
        _ => format!("{result} = {op} [{}]", operands.join(" ")),
    }
}
