//! Main types for the program IR shared by the lowering front-ends and
//! the taint engine.
//!
//! A [`ProgramIR`] maps function names to [`FunctionIR`]s, which map block
//! identifiers to [`BasicBlock`]s of three-address [`Instruction`]s. All
//! cross-references (predecessors, successors, operands, results) are plain
//! strings, so the whole graph serializes to JSON without back-references
//! and can be traversed read-only from any number of threads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub mod validate;

pub use validate::structural_errors;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
/// Operation performed by a single [`Instruction`].
pub enum OpCode {
    /// Load a named variable into a temporary.
    Load,
    /// Assign a value to a named variable.
    Store,
    /// Invoke a named function, producing a result temporary.
    Call,
    /// Binary operator on two operands.
    BinOp,
    /// Return zero or more values.
    Ret,
    /// Declare a function parameter as a named definition.
    Param,
    /// Materialize a literal into a temporary.
    Const,
    /// SSA phi node. Reserved; the lowerings never emit it.
    Phi,
    /// Conditional jump to one of two blocks.
    Branch,
    /// Unconditional jump.
    Jump,
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OpCode::Load => "LOAD",
            OpCode::Store => "STORE",
            OpCode::Call => "CALL",
            OpCode::BinOp => "BINOP",
            OpCode::Ret => "RET",
            OpCode::Param => "PARAM",
            OpCode::Const => "CONST",
            OpCode::Phi => "PHI",
            OpCode::Branch => "BRANCH",
            OpCode::Jump => "JUMP",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// A single three-address operation.
///
/// `result` names the variable or temporary defined here (empty for
/// side-effect-only ops such as RET or JUMP); `operands` are the names
/// consumed. `code` is the human-readable rendering that rule patterns
/// are matched against.
pub struct Instruction {
    /// Identifier, unique across the whole program (`i0`, `i1`, ...).
    pub id: String,
    pub op: OpCode,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub operands: Vec<String>,
    /// Source line the instruction was lowered from.
    pub line: usize,
    pub code: String,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} = {} [{}]",
            self.id,
            self.result,
            self.op,
            self.operands.join(" ")
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// Straight-line instruction sequence with explicit CFG edges.
pub struct BasicBlock {
    /// Identifier, unique within the enclosing function (`B0`, `b0`, ...).
    pub id: String,
    pub instructions: Vec<Instruction>,
    /// Block IDs with an edge into this block.
    pub predecessors: Vec<String>,
    /// Block IDs this block can jump to.
    pub successors: Vec<String>,
}

impl BasicBlock {
    pub fn new(id: String) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// CFG and instructions for a single function.
///
/// Blocks live in a `BTreeMap` so iteration over the IR is deterministic;
/// nothing downstream relies on any particular order beyond that.
pub struct FunctionIR {
    pub name: String,
    pub blocks: BTreeMap<String, BasicBlock>,
    /// Entry block ID. The entry block has no predecessors.
    pub entry: String,
}

impl FunctionIR {
    pub fn new(name: String) -> Self {
        Self {
            name,
            blocks: BTreeMap::new(),
            entry: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
/// IR for an entire source file, keyed by function name.
///
/// # Example
/// ```
/// use ir::{FunctionIR, ProgramIR};
/// let mut prog = ProgramIR::new();
/// prog.functions
///     .insert("main".into(), FunctionIR::new("main".into()));
/// assert_eq!(prog.instructions().count(), 0);
/// ```
pub struct ProgramIR {
    pub functions: BTreeMap<String, FunctionIR>,
}

impl ProgramIR {
    pub fn new() -> Self {
        Self::default()
    }

    /// Iterates every instruction in deterministic order
    /// (functions, then blocks, then block position).
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.functions
            .values()
            .flat_map(|f| f.blocks.values())
            .flat_map(|b| b.instructions.iter())
    }
}

#[cfg(test)]
mod tests;
