use super::*;
use serde_json::Value as JsonValue;
// Tests for the JSON contract and structural checks.

fn inst(id: &str, op: OpCode, result: &str, operands: &[&str], line: usize) -> Instruction {
    Instruction {
        id: id.into(),
        op,
        result: result.into(),
        operands: operands.iter().map(|s| s.to_string()).collect(),
        line,
        code: format!("{result} = ..."),
    }
}

fn two_block_function() -> FunctionIR {
    let mut f = FunctionIR::new("main".into());
    let mut b0 = BasicBlock::new("B0".into());
    b0.instructions
        .push(inst("i0", OpCode::Jump, "", &["B1"], 1));
    b0.successors.push("B1".into());
    let mut b1 = BasicBlock::new("B1".into());
    b1.predecessors.push("B0".into());
    f.blocks.insert("B0".into(), b0);
    f.blocks.insert("B1".into(), b1);
    f.entry = "B0".into();
    f
}

#[test]
fn instruction_serializes_with_contract_names() {
    let i = inst("i0", OpCode::Call, "t0", &["http.Get", "t1"], 7);
    let v: JsonValue = serde_json::to_value(&i).unwrap();
    assert_eq!(v["id"], "i0");
    assert_eq!(v["op"], "CALL");
    assert_eq!(v["result"], "t0");
    assert_eq!(v["operands"][0], "http.Get");
    assert_eq!(v["line"], 7);
    assert!(v.get("code").is_some());
}

#[test]
fn empty_result_and_operands_are_omitted() {
    let i = inst("i1", OpCode::Ret, "", &[], 3);
    let v: JsonValue = serde_json::to_value(&i).unwrap();
    assert!(v.get("result").is_none());
    assert!(v.get("operands").is_none());

    let back: Instruction = serde_json::from_value(v).unwrap();
    assert!(back.result.is_empty());
    assert!(back.operands.is_empty());
}

#[test]
fn program_roundtrips_through_json() {
    let mut prog = ProgramIR::new();
    prog.functions.insert("main".into(), two_block_function());

    let json = serde_json::to_string(&prog).unwrap();
    let v: JsonValue = serde_json::from_str(&json).unwrap();
    assert_eq!(v["functions"]["main"]["entry"], "B0");
    assert_eq!(v["functions"]["main"]["name"], "main");
    assert_eq!(
        v["functions"]["main"]["blocks"]["B0"]["successors"][0],
        "B1"
    );
    assert_eq!(
        v["functions"]["main"]["blocks"]["B1"]["predecessors"][0],
        "B0"
    );

    let back: ProgramIR = serde_json::from_str(&json).unwrap();
    assert_eq!(back, prog);
}

#[test]
fn opcode_display_matches_wire_form() {
    for (op, text) in [
        (OpCode::BinOp, "BINOP"),
        (OpCode::Ret, "RET"),
        (OpCode::Branch, "BRANCH"),
    ] {
        assert_eq!(op.to_string(), text);
        assert_eq!(serde_json::to_value(op).unwrap(), text);
    }
}

#[test]
fn consistent_function_has_no_errors() {
    let mut prog = ProgramIR::new();
    prog.functions.insert("main".into(), two_block_function());
    assert!(structural_errors(&prog).is_empty());
}

#[test]
fn dangling_successor_is_reported() {
    let mut f = two_block_function();
    f.blocks
        .get_mut("B1")
        .unwrap()
        .successors
        .push("B9".into());
    let mut prog = ProgramIR::new();
    prog.functions.insert("main".into(), f);
    let errors = structural_errors(&prog);
    assert!(errors.iter().any(|e| e.contains("B9")), "{errors:?}");
}

#[test]
fn duplicate_temporary_definition_is_reported() {
    let mut f = two_block_function();
    let b1 = f.blocks.get_mut("B1").unwrap();
    b1.instructions
        .push(inst("i2", OpCode::Const, "t0", &["1"], 2));
    b1.instructions
        .push(inst("i3", OpCode::Const, "t0", &["2"], 3));
    let mut prog = ProgramIR::new();
    prog.functions.insert("main".into(), f);
    let errors = structural_errors(&prog);
    assert!(errors.iter().any(|e| e.contains("defined twice")), "{errors:?}");
}

#[test]
fn entry_with_predecessors_is_reported() {
    let mut f = two_block_function();
    f.entry = "B1".into();
    let mut prog = ProgramIR::new();
    prog.functions.insert("main".into(), f);
    let errors = structural_errors(&prog);
    assert!(errors.iter().any(|e| e.contains("entry block")), "{errors:?}");
}

#[test]
fn user_variables_may_be_redefined() {
    // STORE may redefine a user variable; only t<n> names are single-assignment.
    let mut f = two_block_function();
    let b1 = f.blocks.get_mut("B1").unwrap();
    b1.instructions
        .push(inst("i2", OpCode::Store, "x", &["t5"], 2));
    b1.instructions
        .push(inst("i3", OpCode::Store, "x", &["t6"], 3));
    let mut prog = ProgramIR::new();
    prog.functions.insert("main".into(), f);
    assert!(structural_errors(&prog).is_empty());
}
