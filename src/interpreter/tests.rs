//! Evaluator tests: programs are parsed from source and run against an
//! in-memory console, then the captured output or the runtime error is
//! asserted.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use proptest::prelude::*;

use super::builtins::Console;
use super::{ops, Evaluator, RuntimeError, Value};
use crate::parser::parse_source;

/// Console capturing output in a shared buffer and serving scripted input.
struct TestConsole {
    out: Rc<RefCell<String>>,
    input: VecDeque<String>,
}

impl Console for TestConsole {
    fn print(&mut self, text: &str) {
        self.out.borrow_mut().push_str(text);
    }

    fn println(&mut self, text: &str) {
        self.out.borrow_mut().push_str(text);
        self.out.borrow_mut().push('\n');
    }

    fn read_line(&mut self) -> Option<String> {
        self.input.pop_front()
    }
}

fn run_with_input(source: &str, input: &[&str]) -> Result<String, RuntimeError> {
    let program = parse_source(source).expect("program should parse");
    let out = Rc::new(RefCell::new(String::new()));
    let console = TestConsole {
        out: Rc::clone(&out),
        input: input.iter().map(|s| s.to_string()).collect(),
    };

    let mut evaluator = Evaluator::new(&program, Box::new(console));
    evaluator.run(&program)?;

    let captured = out.borrow().clone();
    Ok(captured)
}

fn run(source: &str) -> Result<String, RuntimeError> {
    run_with_input(source, &[])
}

fn run_err(source: &str) -> RuntimeError {
    run(source).expect_err("program should fail")
}

// ---- Variables and scoping -----------------------------------------------

#[test]
fn declared_variable_is_readable() {
    let out = run("let x = 42; print(x);").unwrap();
    assert_eq!(out, "42\n");
}

#[test]
fn assignment_rebinds_existing_variable() {
    let out = run("let x = 1; x = x + 1; print(x);").unwrap();
    assert_eq!(out, "2\n");
}

#[test]
fn reading_undeclared_variable_fails() {
    let err = run_err("print(x);");
    assert_eq!(err, RuntimeError::UndefinedVariable("x".to_string()));
}

#[test]
fn assigning_undeclared_variable_fails() {
    let err = run_err("x = 1;");
    assert_eq!(err, RuntimeError::UndefinedVariable("x".to_string()));
}

#[test]
fn declaring_a_non_identifier_target_fails() {
    let err = run_err("let a = [1]; let a[0] = 2;");
    assert_eq!(err, RuntimeError::IllegalLvalue);
}

#[test]
fn assigning_to_a_non_lvalue_expression_fails() {
    let err = run_err("let a = 1; let b = 2; (a + b) = 3;");
    assert_eq!(err, RuntimeError::NotAssignable);
}

#[test]
fn redeclaration_in_same_scope_fails() {
    let err = run_err("let x = 1; let x = 2;");
    assert_eq!(err, RuntimeError::AlreadyDeclared("x".to_string()));
}

#[test]
fn inner_block_shadows_outer_binding() {
    let out = run("let x = 1; { let x = 2; print(x); } print(x);").unwrap();
    assert_eq!(out, "2\n1\n");
}

#[test]
fn inner_assignment_writes_through_to_outer_binding() {
    let out = run("let x = 1; { x = 5; } print(x);").unwrap();
    assert_eq!(out, "5\n");
}

#[test]
fn unset_removes_the_binding() {
    let err = run_err("let x = 1; unset x; print(x);");
    assert_eq!(err, RuntimeError::UndefinedVariable("x".to_string()));
}

#[test]
fn unset_of_undeclared_name_is_a_no_op() {
    let out = run("unset nope; print(1);").unwrap();
    assert_eq!(out, "1\n");
}

// ---- Arithmetic and coercion ---------------------------------------------

#[test]
fn integer_division_truncates() {
    let out = run("print(7 / 2);").unwrap();
    assert_eq!(out, "3\n");
}

#[test]
fn division_promotes_to_float_when_either_operand_is_float() {
    let out = run("print(7.0 / 2);").unwrap();
    assert_eq!(out, "3.5\n");
}

#[test]
fn booleans_coerce_to_numbers_in_arithmetic() {
    let out = run("print(true + 1); print(false * 10);").unwrap();
    assert_eq!(out, "2\n0\n");
}

#[test]
fn add_concatenates_when_either_operand_is_string() {
    let out = run(r#"print("n=" + 3); print(1 + "2");"#).unwrap();
    assert_eq!(out, "n=3\n12\n");
}

#[test]
fn add_of_two_arrays_is_an_error() {
    let err = run_err("let a = [1]; let b = [2]; let c = a + b;");
    assert_eq!(
        err,
        RuntimeError::IncompatibleOperands {
            op: "+",
            lhs: "array",
            rhs: "array",
        }
    );
}

#[test]
fn subtracting_a_string_is_an_error() {
    let err = run_err(r#"let x = "a" - 1;"#);
    assert_eq!(
        err,
        RuntimeError::IncompatibleOperands {
            op: "-",
            lhs: "string",
            rhs: "int",
        }
    );
}

#[test]
fn integer_division_by_zero_is_fatal() {
    let err = run_err("let x = 1 / 0;");
    assert_eq!(err, RuntimeError::DivisionByZero);
}

#[test]
fn float_division_by_zero_yields_infinity() {
    let out = run("print(1.0 / 0);").unwrap();
    assert_eq!(out, "inf\n");
}

#[test]
fn modulo_and_power() {
    let out = run("print(7 % 3); print(2 ** 10); print(2.0 ** 0.5);").unwrap();
    assert_eq!(out, "1\n1024\n1.4142135623730951\n");
}

// ---- Comparison and logic ------------------------------------------------

#[test]
fn equality_does_not_coerce_across_tags() {
    let out = run(r#"print(1 == 1.0); print(1 == "1"); print(1 == 1);"#).unwrap();
    assert_eq!(out, "false\nfalse\ntrue\n");
}

#[test]
fn arrays_compare_equal_by_elements() {
    let out = run("print([1, 2] == [1, 2]); print([1] == [1, 2]);").unwrap();
    assert_eq!(out, "true\nfalse\n");
}

#[test]
fn relational_operators_on_numbers_and_strings() {
    let out = run(r#"print(2 < 10); print(2.5 >= 2.5); print("abc" < "abd");"#).unwrap();
    assert_eq!(out, "true\ntrue\ntrue\n");
}

#[test]
fn array_ordering_uses_length_only() {
    let out = run("print([9, 9] < [1, 2, 3]);").unwrap();
    assert_eq!(out, "true\n");
}

#[test]
fn logical_and_short_circuits() {
    let source = r#"
        fn touched() {
            print("evaluated");
            return true;
        }
        let r = false && touched();
        print(r);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "false\n");
}

#[test]
fn logical_or_short_circuits() {
    let source = r#"
        fn touched() {
            print("evaluated");
            return false;
        }
        let r = true || touched();
        print(r);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "true\n");
}

#[test]
fn not_negates_truthiness() {
    let out = run(r#"print(!0); print(!"text"); print(![]);"#).unwrap();
    assert_eq!(out, "true\nfalse\ntrue\n");
}

// ---- Increment / decrement -----------------------------------------------

#[test]
fn pre_increment_yields_the_new_value() {
    let out = run("let x = 1; print(++x); print(x);").unwrap();
    assert_eq!(out, "2\n2\n");
}

#[test]
fn post_increment_yields_the_original_value() {
    let out = run("let x = 1; print(x++); print(x);").unwrap();
    assert_eq!(out, "1\n2\n");
}

#[test]
fn decrement_of_array_element_writes_back() {
    let out = run("let a = [5]; a[0]--; print(a[0]);").unwrap();
    assert_eq!(out, "4\n");
}

#[test]
fn incrementing_a_string_fails() {
    let err = run_err(r#"let s = "a"; s++;"#);
    assert_eq!(err, RuntimeError::NotIncrementable("string"));
}

// ---- Arrays ---------------------------------------------------------------

#[test]
fn array_literal_indexing_and_len() {
    let out = run("let a = [10, 20, 30]; print(a[1]); print(len(a));").unwrap();
    assert_eq!(out, "20\n3\n");
}

#[test]
fn element_assignment_mutates_in_place() {
    let out = run("let a = [1, 2]; a[0] = 9; print(a);").unwrap();
    assert_eq!(out, "[9, 2]\n");
}

#[test]
fn append_adds_a_new_slot_at_the_end() {
    let out = run("let a = [1]; a[] = 2; a[] = 3; print(a); print(len(a));").unwrap();
    assert_eq!(out, "[1, 2, 3]\n3\n");
}

#[test]
fn arrays_are_shared_handles() {
    let out = run("let a = [1]; let b = a; b[] = 2; print(a);").unwrap();
    assert_eq!(out, "[1, 2]\n");
}

#[test]
fn unset_of_element_shifts_the_rest_left() {
    let out = run("let a = [1, 2, 3]; unset a[1]; print(a);").unwrap();
    assert_eq!(out, "[1, 3]\n");
}

#[test]
fn index_out_of_bounds_is_fatal() {
    let err = run_err("let a = [1]; print(a[3]);");
    assert_eq!(err, RuntimeError::IndexOutOfBounds { index: 3, len: 1 });
}

#[test]
fn negative_index_is_fatal() {
    let err = run_err("let a = [1]; print(a[0 - 1]);");
    assert_eq!(err, RuntimeError::IndexOutOfBounds { index: -1, len: 1 });
}

#[test]
fn index_expression_coerces_to_integer() {
    let out = run(r#"let a = [10, 20]; print(a["1"]); print(a[1.9]);"#).unwrap();
    assert_eq!(out, "20\n20\n");
}

#[test]
fn indexing_a_non_array_fails() {
    let err = run_err("let n = 3; print(n[0]);");
    assert_eq!(err, RuntimeError::NotAnArray("int"));
}

#[test]
fn len_of_string_counts_characters() {
    let out = run(r#"print(len("hello"));"#).unwrap();
    assert_eq!(out, "5\n");
}

#[test]
fn len_of_a_number_fails() {
    let err = run_err("print(len(3));");
    assert_eq!(err, RuntimeError::InvalidLenArgument("int"));
}

// ---- Types, casts, checks -------------------------------------------------

#[test]
fn typeof_reports_the_tag_name() {
    let out = run(r#"print(typeof(1)); print(typeof(1.0)); print(typeof("s")); print(typeof([])); print(typeof(true));"#).unwrap();
    assert_eq!(out, "int\nfloat\nstring\narray\nbool\n");
}

#[test]
fn casts_convert_between_scalar_types() {
    let out = run(r#"print("3" as int + 1); print(1 as bool); print(2 as float); print(5 as string + "!");"#)
        .unwrap();
    assert_eq!(out, "4\ntrue\n2.0\n5!\n");
}

#[test]
fn cast_of_unparseable_string_yields_zero() {
    let out = run(r#"print("abc" as int);"#).unwrap();
    assert_eq!(out, "0\n");
}

#[test]
fn cast_to_array_wraps_the_value() {
    let out = run("let a = 7 as array; print(a); print(len(a));").unwrap();
    assert_eq!(out, "[7]\n1\n");
}

#[test]
fn cast_to_object_is_rejected() {
    let err = run_err("let x = 1 as object;");
    assert_eq!(err, RuntimeError::CannotCastToObject);
}

#[test]
fn cast_to_unknown_type_fails() {
    let err = run_err("let x = 1 as widget;");
    assert_eq!(err, RuntimeError::UnknownType("widget".to_string()));
}

#[test]
fn is_checks_the_exact_tag() {
    let out = run(r#"print(1 is int); print(1 is float); print("s" is string); print([] is array);"#)
        .unwrap();
    assert_eq!(out, "true\nfalse\ntrue\ntrue\n");
}

// ---- Control flow ----------------------------------------------------------

#[test]
fn if_runs_the_branch_only_when_true() {
    let out = run(r#"if (1 < 2) { print("yes"); } if (2 < 1) { print("no"); }"#).unwrap();
    assert_eq!(out, "yes\n");
}

#[test]
fn else_runs_when_the_condition_is_false() {
    let out = run(r#"if (false) { print("a"); } else { print("b"); }"#).unwrap();
    assert_eq!(out, "b\n");
}

#[test]
fn else_if_chains() {
    let source = r#"
        let x = 2;
        if (x == 1) { print("one"); }
        else if (x == 2) { print("two"); }
        else { print("many"); }
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "two\n");
}

#[test]
fn while_loop_runs_until_false() {
    let out = run("let i = 0; while (i < 3) { print(i); i = i + 1; }").unwrap();
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn do_while_runs_the_body_at_least_once() {
    let out = run("let i = 10; do { print(i); } while (i < 3);").unwrap();
    assert_eq!(out, "10\n");
}

#[test]
fn for_loop_with_init_condition_step() {
    let out = run("for (let i = 0; i < 3; i++) { print(i); }").unwrap();
    assert_eq!(out, "0\n1\n2\n");
}

#[test]
fn foreach_visits_each_element() {
    let out = run("foreach (x in [1, 2, 3]) { print(x); }").unwrap();
    assert_eq!(out, "1\n2\n3\n");
}

#[test]
fn foreach_variable_stays_bound_after_the_loop() {
    let out = run("foreach (x in [1, 2]) {} print(x);").unwrap();
    assert_eq!(out, "2\n");
}

#[test]
fn foreach_iterates_a_snapshot_while_the_body_mutates() {
    let out = run("let a = [1, 2]; foreach (x in a) { a[] = x; } print(a);").unwrap();
    assert_eq!(out, "[1, 2, 1, 2]\n");
}

#[test]
fn foreach_over_a_non_array_fails() {
    let err = run_err("foreach (x in 5) {}");
    assert_eq!(err, RuntimeError::NotIterable("int"));
}

#[test]
fn loop_body_declarations_do_not_leak_across_iterations() {
    let out = run("let i = 0; while (i < 2) { let t = i; print(t); i++; }").unwrap();
    assert_eq!(out, "0\n1\n");
}

// ---- Functions -------------------------------------------------------------

#[test]
fn function_call_returns_a_value() {
    let source = r#"
        fn double(n) {
            return n * 2;
        }
        print(double(21));
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "42\n");
}

#[test]
fn return_unwinds_through_nested_blocks_and_loops() {
    let source = r#"
        fn first_over(limit, items) {
            foreach (x in items) {
                if (x > limit) {
                    return x;
                }
            }
            return 0 - 1;
        }
        print(first_over(10, [3, 8, 14, 20]));
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "14\n");
}

#[test]
fn function_body_cannot_see_caller_locals() {
    let source = r#"
        fn peek() {
            return hidden;
        }
        let hidden = 1;
        print(peek());
    "#;
    let err = run_err(source);
    assert_eq!(err, RuntimeError::UndefinedVariable("hidden".to_string()));
}

#[test]
fn parameters_shadow_nothing_and_are_local() {
    let source = r#"
        fn bump(n) {
            n = n + 1;
            return n;
        }
        let n = 5;
        print(bump(n));
        print(n);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "6\n5\n");
}

#[test]
fn recursion_gets_a_fresh_frame_per_call() {
    let source = r#"
        fn fib(n) {
            if (n < 2) {
                return n;
            }
            return fib(n - 1) + fib(n - 2);
        }
        print(fib(10));
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "55\n");
}

#[test]
fn too_few_arguments_is_fatal() {
    let err = run_err("fn pair(a, b) { return a; } pair(1);");
    assert_eq!(
        err,
        RuntimeError::TooFewArguments {
            name: "pair".to_string(),
            expected: 2,
            got: 1,
        }
    );
}

#[test]
fn extra_arguments_are_ignored() {
    let out = run("fn one(a) { return a; } print(one(1, 2, 3));").unwrap();
    assert_eq!(out, "1\n");
}

#[test]
fn calling_an_undefined_function_fails() {
    let err = run_err("nope();");
    assert_eq!(err, RuntimeError::UndefinedFunction("nope".to_string()));
}

#[test]
fn return_at_top_level_is_an_error() {
    let err = run_err("return 1;");
    assert_eq!(err, RuntimeError::ReturnOutsideFunction);
}

#[test]
fn returning_a_valueless_expression_fails() {
    let err = run_err("fn f() { return print(1); } f();");
    assert_eq!(err, RuntimeError::NonConstant("return value"));
}

#[test]
fn function_without_return_yields_no_value() {
    let err = run_err("fn noop() {} let x = noop();");
    assert_eq!(err, RuntimeError::NonConstant("initializer"));
}

#[test]
fn arrays_passed_to_functions_share_storage() {
    let source = r#"
        fn push_nine(items) {
            items[] = 9;
        }
        let a = [1];
        push_nine(a);
        print(a);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "[1, 9]\n");
}

// ---- Structs ----------------------------------------------------------------

#[test]
fn struct_members_start_empty_and_are_assignable() {
    let source = r#"
        struct Point { x; y; }
        let p = new Point;
        p.x = 3;
        p.y = 4;
        print(p.x + p.y);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "7\n");
}

#[test]
fn struct_instances_are_shared_handles() {
    let source = r#"
        struct Box { item; }
        let a = new Box;
        let b = a;
        b.item = 42;
        print(a.item);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "42\n");
}

#[test]
fn undefined_member_access_fails() {
    let err = run_err("struct P { x; } let p = new P; print(p.z);");
    assert_eq!(
        err,
        RuntimeError::UndefinedMember("P".to_string(), "z".to_string())
    );
}

#[test]
fn new_of_undeclared_struct_fails() {
    let err = run_err("let p = new Ghost;");
    assert_eq!(err, RuntimeError::UndefinedStruct("Ghost".to_string()));
}

#[test]
fn member_access_on_non_object_fails() {
    let err = run_err("let n = 1; print(n.x);");
    assert_eq!(err, RuntimeError::NotAnObject("int"));
}

#[test]
fn structs_are_always_truthy_and_print_as_empty() {
    let source = r#"
        struct S { a; }
        let s = new S;
        if (s) { print("truthy"); }
        print(s);
        print(typeof(s));
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "truthy\n\nobject\n");
}

#[test]
fn unset_of_struct_member_is_a_no_op() {
    let source = r#"
        struct S { a; }
        let s = new S;
        s.a = 1;
        unset s.a;
        print(s.a);
    "#;
    let out = run(source).unwrap();
    assert_eq!(out, "1\n");
}

// ---- Built-ins --------------------------------------------------------------

#[test]
fn print_requires_an_argument() {
    let err = run_err("print();");
    assert_eq!(
        err,
        RuntimeError::TooFewArguments {
            name: "print".to_string(),
            expected: 1,
            got: 0,
        }
    );
}

#[test]
fn printf_formats_without_implicit_newline() {
    let out = run(r#"printf("%s: %d\n", "count", 3); printf("done");"#).unwrap();
    assert_eq!(out, "count: 3\ndone");
}

#[test]
fn input_returns_a_line_as_string() {
    let out = run_with_input(
        r#"let name = input("who? "); print("hi " + name);"#,
        &["ada"],
    )
    .unwrap();
    assert_eq!(out, "who? hi ada\n");
}

#[test]
fn input_at_end_of_stream_is_fatal() {
    let err = run_err("let line = input();");
    assert_eq!(err, RuntimeError::IoFailure);
}

// ---- Arithmetic properties ---------------------------------------------------

proptest! {
    #[test]
    fn int_addition_wraps_like_i64(a in any::<i64>(), b in any::<i64>()) {
        let result = ops::add(&Value::Int(a), &Value::Int(b)).unwrap();
        prop_assert!(matches!(result, Value::Int(n) if n == a.wrapping_add(b)));
    }

    #[test]
    fn int_division_matches_truncating_division(a in any::<i64>(), b in 1i64..1_000_000) {
        let result = ops::divide(&Value::Int(a), &Value::Int(b)).unwrap();
        prop_assert!(matches!(result, Value::Int(n) if n == a.wrapping_div(b)));
    }

    #[test]
    fn float_promotion_is_symmetric(a in -1.0e9f64..1.0e9, b in any::<i32>()) {
        let left = ops::multiply(&Value::Float(a), &Value::Int(b as i64)).unwrap();
        let right = ops::multiply(&Value::Int(b as i64), &Value::Float(a)).unwrap();
        prop_assert!(matches!(left, Value::Float(_)));
        prop_assert!(matches!(right, Value::Float(_)));
    }

    #[test]
    fn string_concatenation_never_fails(a in any::<i64>(), s in "[a-z]{0,8}") {
        let result = ops::add(&Value::Int(a), &Value::Str(s.clone())).unwrap();
        let expected = format!("{}{}", a, s);
        prop_assert!(matches!(result, Value::Str(out) if out == expected));
    }
}
