//! Parser and printer behaviour on whole modules.

use superword::ir::{BlockId, Module, Opcode, Type, Value};
use superword::IrError;

const MODULE: &str = r#"; two functions and a declaration
declare double @sqrt(double)

define double @norm([2 x double]* %V) {
entry:
  %p0 = getelementptr [2 x double]* %V, i64 0, i64 0
  %p1 = getelementptr [2 x double]* %V, i64 0, i64 1
  %x = load double, double* %p0
  %y = load double, double* %p1
  %xx = fmul double %x, %x
  %yy = fmul double %y, %y
  %s = fadd double %xx, %yy
  %r = call double @sqrt(double %s)
  ret double %r
}

define i32 @loop(i32 %n) {
entry:
  br label %head

head:
  %i = phi i32 [ 0, %entry ], [ %next, %body ]
  %done = icmp sge i32 %i, %n
  br i1 %done, label %exit, label %body

body:
  %next = add i32 %i, 1
  br label %head

exit:
  ret i32 %i
}
"#;

#[test]
fn parses_functions_in_order() {
    let module = Module::parse(MODULE).unwrap();
    let names: Vec<&str> = module.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["sqrt", "norm", "loop"]);
    assert!(module.functions[0].declaration);

    let norm = module.function("norm").unwrap();
    assert_eq!(norm.ret_ty, Type::Double);
    let insts = norm.block_insts(BlockId(0));
    assert_eq!(norm.inst(insts[7]).opcode, Opcode::Call);
    assert_eq!(norm.inst(insts[7]).callee.as_deref(), Some("sqrt"));

    let lp = module.function("loop").unwrap();
    assert_eq!(lp.block_count(), 4);
    let phi = lp.inst(lp.block_insts(BlockId(1))[0]);
    assert_eq!(phi.opcode, Opcode::Phi);
    // %next is used before its definition.
    assert!(matches!(phi.operands[1], Value::Inst(_)));
}

#[test]
fn printed_module_round_trips() {
    let module = Module::parse(MODULE).unwrap();
    let printed = module.to_string();
    let reparsed = Module::parse(&printed).unwrap();
    assert_eq!(reparsed.to_string(), printed);
}

#[test]
fn rejects_instruction_after_terminator() {
    let text = "define void @f() {\nentry:\n  ret void\n  ret void\n}\n";
    assert!(matches!(Module::parse(text), Err(IrError::Parse { line: 4, .. })));
}

#[test]
fn rejects_redefinition() {
    let text = "define i32 @f(i32 %a) {\nentry:\n  %x = add i32 %a, 1\n  %x = add i32 %a, 2\n  ret i32 %x\n}\n";
    assert!(matches!(Module::parse(text), Err(IrError::Parse { line: 4, .. })));
}

#[test]
fn rejects_undefined_block() {
    let text = "define void @f() {\nentry:\n  br label %nowhere\n}\n";
    assert_eq!(
        Module::parse(text).unwrap_err(),
        IrError::UndefinedBlock { function: "f".into(), name: "nowhere".into() }
    );
}

#[test]
fn rejects_misplaced_phi() {
    let text = "define i32 @f(i32 %a) {\nentry:\n  %x = add i32 %a, 1\n  %p = phi i32 [ %a, %entry ]\n  ret i32 %p\n}\n";
    assert!(matches!(Module::parse(text), Err(IrError::Parse { .. })));
}

#[test]
fn rejects_empty_vector_type() {
    let text = "define void @f(<0 x i32> %v) {\nentry:\n  ret void\n}\n";
    assert!(matches!(Module::parse(text), Err(IrError::Parse { line: 1, .. })));
}

#[test]
fn rejects_nested_vector_type() {
    let text = "define void @f(<2 x <2 x i32>> %v) {\nentry:\n  ret void\n}\n";
    assert!(matches!(Module::parse(text), Err(IrError::Parse { line: 1, .. })));
}

#[test]
fn rejects_void_allocation() {
    let text = "define void @f() {\nentry:\n  %slot = alloca void\n  ret void\n}\n";
    assert!(matches!(Module::parse(text), Err(IrError::Parse { line: 3, .. })));
}
