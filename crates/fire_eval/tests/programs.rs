//! Whole programs through lexer, parser, binder and evaluator.

use fire_eval::{EvalConfig, Evaluator, MAX_CALL_DEPTH};
use fire_parser::Parser;
use fire_runtime::{BuiltinTable, Output, RuntimeError, RuntimeErrorKind, Value};
use fire_sema::SemaErrorKind;
use pretty_assertions::assert_eq;

#[derive(Debug)]
struct Finished {
    output: String,
    globals: Vec<Value>,
}

fn run_with(source: &str, config: EvalConfig) -> Result<Finished, RuntimeError> {
    let mut program = Parser::parse(source).expect("parse failed");
    let builtins = BuiltinTable::new();
    let bound = match fire_sema::bind(&mut program, &builtins) {
        Ok(bound) => bound,
        Err(errors) => panic!("binding failed: {:#?}", errors),
    };
    let mut evaluator = Evaluator::new(&program, &bound, &builtins)
        .with_config(config)
        .with_output(Output::buffer());
    let result = evaluator.run();
    assert_eq!(evaluator.call_depth(), 0, "call stack not unwound");
    result?;
    let globals = (0..program.body.frame_size)
        .map(|slot| evaluator.global(slot).expect("global slot in range"))
        .collect();
    Ok(Finished { output: evaluator.output().captured().to_string(), globals })
}

fn run(source: &str) -> Result<Finished, RuntimeError> {
    run_with(source, EvalConfig::default())
}

fn output(source: &str) -> String {
    match run(source) {
        Ok(finished) => finished.output,
        Err(err) => panic!("evaluation failed: {:#?}", err),
    }
}

fn runtime_error(source: &str) -> RuntimeError {
    match run(source) {
        Ok(finished) => panic!("expected a runtime error, got output {:?}", finished.output),
        Err(err) => err,
    }
}

fn bind_errors(source: &str) -> Vec<SemaErrorKind> {
    let mut program = Parser::parse(source).expect("parse failed");
    match fire_sema::bind(&mut program, &BuiltinTable::new()) {
        Ok(_) => Vec::new(),
        Err(errors) => errors.into_iter().map(|e| e.kind).collect(),
    }
}

#[test]
fn test_typed_definitions_scenario() {
    let source = "x: int = 2; y: int = x + 3;";
    let mut program = Parser::parse(source).unwrap();
    let bound = fire_sema::bind(&mut program, &BuiltinTable::new()).unwrap();
    let root = bound.scopes.get(bound.scopes.root());
    assert_eq!((root.vars[0].name.as_str(), root.vars[0].depth, root.vars[0].slot()), ("x", 0, 0));
    assert_eq!(root.vars[1].ty, Some(fire_ast::TypeInfo::int()));

    assert_eq!(run(source).unwrap().globals, vec![Value::Int(2), Value::Int(5)]);
}

#[test]
fn test_function_call_scenario() {
    let finished = run("fn f(n: int) -> int { return n * 2; } let r = f(21);").unwrap();
    assert_eq!(finished.globals, vec![Value::Int(42)]);
}

#[test]
fn test_evaluation_is_deterministic() {
    let source = "let v = [3, 1, 2]; let s = 0; let i = 0; while i < len(v) { s = s * 10 + v[i]; i += 1; } print(s, s);";
    assert_eq!(output(source), "312312");
    assert_eq!(output(source), output(source));
}

#[test]
fn test_overload_selected_by_argument_type() {
    let source = "
        fn f1(x: int) -> string { return \"int\"; }
        fn f1(x: string) -> string { return \"string\"; }
        print(f1(\"x\"), \" \", f1(1));
    ";
    assert_eq!(output(source), "string int");

    let kinds = bind_errors("fn f1(x: int) {} fn f1(x: string) {} f1(true);");
    assert_eq!(kinds, vec![SemaErrorKind::NoMatchingOverload]);
}

#[test]
fn test_named_arguments_bind_like_positional() {
    let source = "
        fn f(a: int, b: int) -> int { return a * 10 + b; }
        print(f(1, 2), \" \", f(b: 2, a: 1), \" \", f(1, b: 2));
    ";
    assert_eq!(output(source), "12 12 12");

    let decl = "fn f(a: int, b: int) -> int { return a; }";
    assert_eq!(bind_errors(&format!("{} f(a: 1, a: 2);", decl)), vec![SemaErrorKind::DuplicateArgument]);
    assert_eq!(bind_errors(&format!("{} f(1);", decl)), vec![SemaErrorKind::TooFewArguments]);
}

#[test]
fn test_numeric_coercion() {
    let finished = run("let a = 1 + 2.0; let b = 'a' + 1; let c = \"x\" * 3; let d = 7u - 2;").unwrap();
    assert_eq!(
        finished.globals,
        vec![Value::Float(3.0), Value::Int(98), Value::string("xxx"), Value::Int(5)]
    );
}

#[test]
fn test_break_leaves_one_loop() {
    let source = "
        let i = 0;
        while i < 3 {
            let j = 0;
            while true {
                if j == 2 { break; }
                j += 1;
            }
            print(j);
            i += 1;
        }
    ";
    assert_eq!(output(source), "222");
}

#[test]
fn test_continue_inside_if_resumes_loop() {
    let source = "
        let i = 0;
        let sum = 0;
        while i < 5 {
            i += 1;
            if i % 2 == 0 { continue; }
            sum += i;
        }
        print(sum);
    ";
    assert_eq!(output(source), "9");
}

#[test]
fn test_return_from_inside_loop() {
    let source = "
        fn find(v: vector<int>, x: int) -> int {
            let i = 0;
            while i < len(v) {
                if v[i] == x { return i; }
                i += 1;
            }
            return -1;
        }
        print(find([4, 5, 6], 6), find([4], 9));
    ";
    assert_eq!(output(source), "2-1");
}

#[test]
fn test_recursion_bound() {
    let source = format!(
        "fn depth(n: int) -> int {{ if n == 0 {{ return 0; }} return depth(n - 1) + 1; }} print(depth({}));",
        MAX_CALL_DEPTH - 1
    );
    assert_eq!(output(&source), (MAX_CALL_DEPTH - 1).to_string());

    let err = runtime_error("fn down(n: int) -> int { return down(n + 1); } down(0);");
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
    assert!(err.message.contains("1588"), "{}", err.message);
}

#[test]
fn test_recursion_bound_from_config() {
    let source = "fn down(n: int) -> int { if n == 0 { return 0; } return down(n - 1); } down(10);";
    let err = run_with(source, EvalConfig { max_call_depth: 4 }).unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow);
}

#[test]
fn test_catch_by_type() {
    let source = "try { throw 7; } catch e: string { print(\"s\"); } catch e: int { print(e + 1); }";
    assert_eq!(output(source), "8");
}

#[test]
fn test_throw_unwinds_calls() {
    let source = "
        fn inner() { throw \"deep\"; }
        fn outer() { inner(); print(\"unreachable\"); }
        try { outer(); } catch e { print(\"caught \", e); }
        print(\" after\");
    ";
    assert_eq!(output(source), "caught deep after");
}

#[test]
fn test_uncaught_throw() {
    let err = runtime_error("throw \"boom\";");
    assert_eq!(err.kind, RuntimeErrorKind::UncaughtThrow);
    assert_eq!(err.message, "uncaught exception: boom");
}

#[test]
fn test_runtime_error_lists_calls() {
    let source = "
        fn inner(v: vector<int>) -> int { return v[9]; }
        fn outer() -> int { return inner([1]); }
        outer();
    ";
    let err = runtime_error(source);
    assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
    let notes: Vec<&str> = err.notes.iter().map(|(message, _)| message.as_str()).collect();
    assert_eq!(notes, vec!["in call to 'inner'", "in call to 'outer'"]);
}

#[test]
fn test_classes_with_defaults_and_methods() {
    let source = "
        class Point {
            x: int;
            y: int = 10;
            fn sum(self) -> int { return self.x + self.y; }
            fn shift(self, by: int) { self.x += by; }
        }
        let p = Point(x: 1);
        let q = Point(2, 3);
        q.shift(5);
        print(p.sum(), \" \", q.sum(), \" \", p);
    ";
    assert_eq!(output(source), "11 10 Point { x: 1, y: 10 }");
}

#[test]
fn test_field_default_uses_declaring_scope() {
    let source = "let base = 5; class Box { v: int = base * 2; } fn make() -> Box { let base = 100; return Box(); } print(make().v);";
    assert_eq!(output(source), "10");
}

#[test]
fn test_instances_share_by_reference() {
    let source = "class C { n: int = 0; } let a = C(); let b = a; b.n = 4; print(a.n);";
    assert_eq!(output(source), "4");
}

#[test]
fn test_enumerators() {
    let source = "enum Dir { Up, Down } let d = Dir::Down; if d == Dir::Down { print(\"down \", d); }";
    assert_eq!(output(source), "down Dir::Down");
}

#[test]
fn test_namespace_functions_share_state() {
    let source = "
        namespace util {
            let count = 1;
            fn bump() -> int { count += 1; return count; }
        }
        namespace util {
            print(bump(), bump(), count);
        }
    ";
    assert_eq!(output(source), "233");
}

#[test]
fn test_vector_index_out_of_range() {
    let err = runtime_error("let v = [1, 2, 3]; v[3];");
    assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
    assert_eq!(err.message, "index 3 is out of range for length 3");
}

#[test]
fn test_dict_indexing_not_implemented() {
    let err = runtime_error("let d = dict(); d[0];");
    assert_eq!(err.kind, RuntimeErrorKind::NotImplemented);
}

#[test]
fn test_variadic_arguments() {
    let source = "
        fn sum(xs: int...) -> int {
            let t = 0;
            let i = 0;
            while i < len(xs) { t += xs[i]; i += 1; }
            return t;
        }
        print(sum(), \" \", sum(1, 2, 3));
    ";
    assert_eq!(output(source), "0 6");
}

#[test]
fn test_function_values() {
    let source = "
        fn twice(f: function, x: int) -> int { return f(f(x)); }
        fn inc(n: int) -> int { return n + 1; }
        let g = inc;
        print(twice(inc, 5), \" \", g(0));
    ";
    assert_eq!(output(source), "7 1");
}

#[test]
fn test_argument_types_rechecked_at_runtime() {
    let err = runtime_error("fn g(x: int) -> int { return x; } let h: any = \"s\"; g(h);");
    assert_eq!(err.kind, RuntimeErrorKind::TypeMismatch);
}

#[test]
fn test_builtins() {
    let source = "
        let v = [1];
        push(v, 2);
        let last = pop(v);
        println(len(v), \" \", last, \" \", typeof(v), \" \", to_int(\"41\") + 1);
        assert(len(\"abc\") == 3);
    ";
    assert_eq!(output(source), "1 2 <type vector<int>> 42\n");

    let err = runtime_error("assert(1 == 2);");
    assert_eq!(err.kind, RuntimeErrorKind::AssertionFailed);
}

#[test]
fn test_members_of_builtin_types() {
    let source = r#"
        let v = [1];
        v.push(2);
        let push = v.push;
        push(3);
        print(v.length, " ", v.pop(), " ", "abc".length, " ", dict().length, " ", v);
    "#;
    assert_eq!(output(source), "3 3 3 0 [1, 2]");

    let err = runtime_error("let v = [1]; v.pop(); v.pop();");
    assert_eq!(err.kind, RuntimeErrorKind::IndexOutOfRange);
    assert_eq!(bind_errors(r#""abc".push('d');"#), vec![SemaErrorKind::UnknownMember]);
    assert_eq!(bind_errors("let v = [1]; v.length = 2;"), vec![SemaErrorKind::InvalidAssignTarget]);
}
