//! Full-pipeline integration tests running `gulc_sema::run_pipeline`
//! (P1..P8, in order) over hand-built ASTs, covering six representative
//! end-to-end scenarios. Each pass already carries its own focused
//! `#[cfg(test)]` unit tests exercising it in isolation; these instead
//! check that the passes compose correctly end to end, the way a real
//! compile run would see them.

use gulc_ast::builder::AstBuilder;
use gulc_ast::expr::{AssignOp, LabeledArgument, StructAssignmentKind};
use gulc_ast::{Ast, AstFile, BuiltInKind, DeclId, DeclKind, ExprKind, StmtKind, TypeKind};
use gulc_diagnostics::FatalError;
use gulc_sema::Sess;
use pretty_assertions::assert_eq;

fn single_file(ast: &mut Ast, decls: Vec<DeclId>) {
    ast.files.push(AstFile { source_file_id: 0, path: "a.lang".into(), top_level_decls: decls, imports: Vec::new() });
}

/// Scenario 1: `namespace a { func hello() -> i32 { return 42; } }`.
#[test]
fn hello_function_mangles_and_types_correctly() {
    let mut ast = Ast::new();
    let (ns, hello, ret_stmt) = {
        let mut b = AstBuilder::new(&mut ast, 0);
        let ns = b.namespace("a");
        let i32_ty = b.builtin(BuiltInKind::I32);
        let forty_two = b.int_literal(42);
        let ret = b.return_stmt(Some(forty_two));
        let body = b.compound(vec![ret]);
        let hello = b.function("hello", vec![], Some(i32_ty), Some(body));
        b.add_nested(ns, hello);
        (ns, hello, ret)
    };
    single_file(&mut ast, vec![ns]);

    let mut sess = Sess::new(vec!["a.lang".into()]);
    let globals = gulc_sema::run_pipeline(&mut ast, &mut sess).expect("pipeline should succeed");
    assert_eq!(globals.len(), 1);

    assert_eq!(ast.decl(hello).common.mangled_name, "_ZN1a5helloEv");

    let DeclKind::Function(body) = &ast.decl(hello).kind else { panic!("expected function") };
    let return_ty = body.return_type.expect("return type resolved");
    assert!(matches!(ast.ty(return_ty).kind, TypeKind::BuiltIn(BuiltInKind::I32)));

    let StmtKind::Return { value: Some(value), .. } = &ast.stmt(ret_stmt).kind else { panic!("expected return") };
    let value_ty = ast.expr(*value).common.value_type.expect("P7 invariant: every expression has a value type");
    assert!(matches!(ast.ty(value_ty).kind, TypeKind::BuiltIn(BuiltInKind::I32)));
}

/// Scenario 2: `struct Box<T> { let value: T; }` referenced as `Box<i32>`.
#[test]
fn templated_struct_instantiates_with_substituted_member_type() {
    let mut ast = Ast::new();
    let (box_template, holder) = {
        let mut b = AstBuilder::new(&mut ast, 0);
        let t_param = b.template_parameter_typename("T");
        let box_template = b.template_struct("Box", vec![t_param]);
        let ref_ty = b.ty(TypeKind::TemplateTypenameRef { ref_template_parameter: t_param });
        let field = b.variable("value", Some(ref_ty), None);
        b.add_struct_member(box_template, field);

        let i32_ty = b.builtin(BuiltInKind::I32);
        let arg_expr = b.type_expr(i32_ty);
        let boxed_i32 = b.unresolved_templated_type(&["Box"], vec![arg_expr]);
        let holder = b.variable("boxed", Some(boxed_i32), None);
        (box_template, holder)
    };
    single_file(&mut ast, vec![box_template, holder]);

    let mut sess = Sess::new(vec!["a.lang".into()]);
    gulc_sema::run_pipeline(&mut ast, &mut sess).expect("pipeline should succeed");

    let DeclKind::Variable { var_type: Some(resolved_ty), .. } = &ast.decl(holder).kind else { panic!("expected variable") };
    let TypeKind::Struct { decl: inst } = ast.ty(*resolved_ty).kind else { panic!("expected a concrete struct instantiation") };
    assert_ne!(inst, box_template, "must be a distinct instantiation, not the template itself");

    let DeclKind::TemplateStructInst { body, .. } = &ast.decl(inst).kind else {
        panic!("expected TemplateStructInst")
    };
    assert_eq!(body.members.len(), 1);
    let DeclKind::Variable { var_type: Some(member_ty), .. } = &ast.decl(body.members[0]).kind else {
        panic!("expected member variable")
    };
    assert!(matches!(ast.ty(*member_ty).kind, TypeKind::BuiltIn(BuiltInKind::I32)), "T must have been substituted with i32");

    assert!(!ast.decl(inst).common.mangled_name.is_empty());
    assert_ne!(ast.decl(inst).common.mangled_name, ast.decl(box_template).common.mangled_name);
}

/// Scenario 3: structs `A: B`, `B: A` — fatal `CycleDetected` naming both.
#[test]
fn mutually_inheriting_structs_are_rejected_as_a_cycle() {
    let mut ast = Ast::new();
    let (a, b_struct) = {
        let mut b = AstBuilder::new(&mut ast, 0);
        let a = b.struct_decl("A");
        let b_struct = b.struct_decl("B");
        let base_b = b.unresolved_type(&["B"]);
        b.set_struct_base(a, base_b);
        let base_a = b.unresolved_type(&["A"]);
        b.set_struct_base(b_struct, base_a);
        (a, b_struct)
    };
    single_file(&mut ast, vec![a, b_struct]);

    let mut sess = Sess::new(vec!["a.lang".into()]);
    let err = gulc_sema::run_pipeline(&mut ast, &mut sess).expect_err("cycle must be rejected");

    assert!(matches!(err, FatalError::CycleDetected(_)));
    let message = err.diagnostic().message.clone();
    assert!(message.contains('A') && message.contains('B'), "message should name both structs: {message}");
}

/// Scenario 4: `f(x: i32)` and `f(x: i64)`, called as `f(0)` — the default
/// `i32` literal typing resolves unambiguously to the `i32` overload.
#[test]
fn integer_literal_call_resolves_to_the_i32_overload() {
    let mut ast = Ast::new();
    let mut top = Vec::new();
    let (caller, ret_stmt) = {
        let mut b = AstBuilder::new(&mut ast, 0);
        let i32_ty = b.builtin(BuiltInKind::I32);
        let i64_ty = b.builtin(BuiltInKind::I64);
        let p_i32 = b.parameter(Some("x"), i32_ty);
        let p_i64 = b.parameter(Some("x"), i64_ty);
        let f_i32 = b.function("f", vec![p_i32], Some(i32_ty), None);
        let f_i64 = b.function("f", vec![p_i64], Some(i64_ty), None);
        top.push(f_i32);
        top.push(f_i64);

        let callee = b.identifier_expr(&["f"]);
        let zero = b.int_literal(0);
        let call = b.expr(ExprKind::FunctionCall { callee, arguments: vec![LabeledArgument { label: None, value: zero }] });
        let ret = b.return_stmt(Some(call));
        let body = b.compound(vec![ret]);
        let caller = b.function("caller", vec![], Some(i32_ty), Some(body));
        top.push(caller);
        (caller, ret)
    };
    single_file(&mut ast, top);

    let mut sess = Sess::new(vec!["a.lang".into()]);
    gulc_sema::run_pipeline(&mut ast, &mut sess).expect("pipeline should succeed");

    let DeclKind::Function(body) = &ast.decl(caller).kind else { panic!("expected function") };
    let body_stmt = body.body.expect("has a body");
    let StmtKind::Compound { statements } = &ast.stmt(body_stmt).kind else { panic!("expected compound") };
    assert_eq!(statements[0], ret_stmt);
    let StmtKind::Return { value: Some(call_id), .. } = &ast.stmt(ret_stmt).kind else { panic!("expected return") };
    let ExprKind::FunctionCall { callee, .. } = &ast.expr(*call_id).kind else { panic!("expected function call") };
    let ExprKind::FunctionReference { decl } = &ast.expr(*callee).kind else { panic!("expected resolved function reference") };
    let DeclKind::Function(picked) = &ast.decl(*decl).kind else { panic!("expected function decl") };
    let DeclKind::Parameter { param_type, .. } = &ast.decl(picked.parameters[0]).kind else { panic!("expected parameter") };
    assert!(matches!(ast.ty(*param_type).kind, TypeKind::BuiltIn(BuiltInKind::I32)), "literal `0` must pick the i32 overload");
}

/// Scenario 5: a function with `goto done; ... done:` resolves; a function
/// with `goto missing` in a second program is fatal `LabelError`.
#[test]
fn goto_to_a_defined_label_succeeds_undefined_label_is_fatal() {
    let mut ast = Ast::new();
    let good = {
        let mut b = AstBuilder::new(&mut ast, 0);
        let goto = b.goto_stmt("done");
        let ret = b.return_stmt(None);
        let label = b.labeled("done", ret, 0);
        let body = b.compound(vec![goto, label]);
        b.function("good", vec![], None, Some(body))
    };
    single_file(&mut ast, vec![good]);

    let mut sess = Sess::new(vec!["a.lang".into()]);
    gulc_sema::run_pipeline(&mut ast, &mut sess).expect("a goto to a defined label must resolve");

    let mut ast_bad = Ast::new();
    let bad = {
        let mut b = AstBuilder::new(&mut ast_bad, 0);
        let goto = b.goto_stmt("missing");
        let body = b.compound(vec![goto]);
        b.function("bad", vec![], None, Some(body))
    };
    single_file(&mut ast_bad, vec![bad]);

    let mut sess_bad = Sess::new(vec!["a.lang".into()]);
    let err = gulc_sema::run_pipeline(&mut ast_bad, &mut sess_bad).expect_err("undefined label must be rejected");
    assert!(matches!(err, FatalError::LabelError(_)));
}

/// Scenario 6: `a = b` (struct lvalues) rewrites to `StructAssignmentOperator`
/// tagged Copy; `a = makeB()` (rvalue call result) tags Move.
#[test]
fn struct_assignment_is_tagged_copy_or_move_by_rhs_shape() {
    let mut ast = Ast::new();
    let mut top = Vec::new();
    let (copy_stmt, move_stmt) = {
        let mut b = AstBuilder::new(&mut ast, 0);
        let s = b.struct_decl("Point");
        top.push(s);
        let struct_ty = b.ty(TypeKind::Struct { decl: s });

        let p_a = b.parameter(Some("a"), struct_ty);
        let p_b = b.parameter(Some("b"), struct_ty);
        let target = b.identifier_expr(&["a"]);
        let value = b.identifier_expr(&["b"]);
        let copy_assign = b.expr(ExprKind::AssignmentOperator { op: AssignOp::Assign, target, value });
        let copy_stmt = b.expr_stmt(copy_assign);
        let copy_body = b.compound(vec![copy_stmt]);
        let copy_fn = b.function("copy_it", vec![p_a, p_b], None, Some(copy_body));
        top.push(copy_fn);

        let make_b = b.function("makeB", vec![], Some(struct_ty), None);
        top.push(make_b);

        let p_a2 = b.parameter(Some("a"), struct_ty);
        let target2 = b.identifier_expr(&["a"]);
        let callee = b.identifier_expr(&["makeB"]);
        let call = b.expr(ExprKind::FunctionCall { callee, arguments: vec![] });
        let move_assign = b.expr(ExprKind::AssignmentOperator { op: AssignOp::Assign, target: target2, value: call });
        let move_stmt = b.expr_stmt(move_assign);
        let move_body = b.compound(vec![move_stmt]);
        let move_fn = b.function("move_it", vec![p_a2], None, Some(move_body));
        top.push(move_fn);

        (copy_stmt, move_stmt)
    };
    single_file(&mut ast, top);

    let mut sess = Sess::new(vec!["a.lang".into()]);
    gulc_sema::run_pipeline(&mut ast, &mut sess).expect("pipeline should succeed");

    let StmtKind::Expr(copy_expr) = &ast.stmt(copy_stmt).kind else { panic!("expected expr stmt") };
    assert!(matches!(
        ast.expr(*copy_expr).kind,
        ExprKind::StructAssignmentOperator { kind: StructAssignmentKind::Copy, .. }
    ));

    let StmtKind::Expr(move_expr) = &ast.stmt(move_stmt).kind else { panic!("expected expr stmt") };
    assert!(matches!(
        ast.expr(*move_expr).kind,
        ExprKind::StructAssignmentOperator { kind: StructAssignmentKind::Move, .. }
    ));
}
