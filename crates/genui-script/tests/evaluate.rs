// crates/genui-script/tests/evaluate.rs
// ============================================================================
// Module: Sandbox Evaluation Tests
// Description: End-to-end checks of the transform language and its budgets.
// Purpose: Validate language semantics, builtins, failures, and limits.
// ============================================================================

//! ## Overview
//! Runs transform bodies through [`Sandbox::evaluate`] and checks the JSON
//! they produce, the failures they raise, and the budgets that stop them.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use genui_script::EvalError;
use genui_script::EvalErrorKind;
use genui_script::Sandbox;
use genui_script::SandboxLimits;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Helpers
// ============================================================================

fn eval(source: &str) -> Option<Value> {
    Sandbox::with_defaults().evaluate(source, &[]).expect("script should evaluate")
}

fn eval_with(source: &str, args: &[Value]) -> Option<Value> {
    Sandbox::with_defaults().evaluate(source, args).expect("script should evaluate")
}

fn eval_err(source: &str) -> EvalError {
    Sandbox::with_defaults().evaluate(source, &[]).expect_err("script should fail")
}

fn eval_err_with_limits(source: &str, limits: SandboxLimits) -> EvalError {
    Sandbox::new(limits).evaluate(source, &[]).expect_err("script should fail")
}

// ============================================================================
// SECTION: Results
// ============================================================================

/// Verifies the canonical row-reshaping transform.
#[test]
fn maps_tool_rows_into_component_rows() {
    let rows = json!([{ "symbol": "AAPL", "price": 1 }]);
    let result = eval_with("return arguments[0].map(s=>({sym:s.symbol}))", &[rows]);
    assert_eq!(result, Some(json!([{ "sym": "AAPL" }])));
}

/// Verifies that an undefined result maps to `None`.
#[test]
fn undefined_result_is_none() {
    assert_eq!(eval("return undefined;"), None);
    assert_eq!(eval("const x = 1;"), None);
}

/// Verifies the JSON export rules for undefined members, functions, and non-finite numbers.
#[test]
fn export_drops_undefined_members_and_nulls_non_finite_numbers() {
    assert_eq!(eval("return { f: () => 1, u: undefined, v: 2 };"), Some(json!({ "v": 2 })));
    assert_eq!(eval("return [undefined, 0 / 0, 1 / 0];"), Some(json!([null, null, null])));
}

/// Verifies that arguments are bound positionally.
#[test]
fn arguments_are_bound_positionally() {
    let result = eval_with("return arguments[0] + arguments[1];", &[json!(2), json!(3)]);
    assert_eq!(result, Some(json!(5)));
    let missing = eval_with("return arguments[2] === undefined;", &[json!(1)]);
    assert_eq!(missing, Some(json!(true)));
}

// ============================================================================
// SECTION: Language
// ============================================================================

/// Verifies loops, `break`, and `continue`.
#[test]
fn loops_honor_break_and_continue() {
    let source = r"
        let total = 0;
        for (const x of [1, 2, 3, 4]) {
            if (x === 2) continue;
            if (x === 4) break;
            total += x;
        }
        for (let i = 0; i < 3; i++) { total += i; }
        let n = 0;
        while (n < 5) n++;
        const keys = [];
        for (const k in { b: 1, a: 2 }) keys.push(k);
        return [total, n, keys];
    ";
    assert_eq!(eval(source), Some(json!([7, 5, ["b", "a"]])));
}

/// Verifies that function declarations are hoisted and closures capture scope.
#[test]
fn functions_are_hoisted_and_capture_scope() {
    let source = r"
        const base = 10;
        const addBase = (x) => x + base;
        return [add(2, 3), addBase(1)];
        function add(a, b) { return a + b; }
    ";
    assert_eq!(eval(source), Some(json!([5, 11])));
}

/// Verifies destructuring with defaults and rest elements.
#[test]
fn destructuring_supports_defaults_and_rest() {
    let source = r"
        const { a, b = 5, ...rest } = { a: 1, c: 3, d: 4 };
        const [first, , third = 'z', ...tail] = [1, 2, undefined, 4, 5];
        return [a, b, rest, first, third, tail];
    ";
    assert_eq!(eval(source), Some(json!([1, 5, { "c": 3, "d": 4 }, 1, "z", [4, 5]])));
}

/// Verifies optional chaining and nullish coalescing.
#[test]
fn optional_chaining_short_circuits() {
    let source = "const o = arguments[0]; return [o?.a?.b, o.x ?? 'd', o.list?.[0], o.fn?.()];";
    assert_eq!(eval_with(source, &[json!({ "a": null })]), Some(json!([null, "d", null, null])));
}

/// Verifies template literals and string methods.
#[test]
fn template_literals_interpolate_values() {
    let source = "const n = 'ab'; return `${n.toUpperCase()}-${n.length}-${1 + 1}`;";
    assert_eq!(eval(source), Some(json!("AB-2-2")));
}

/// Verifies equality and `typeof` semantics.
#[test]
fn equality_and_typeof_follow_script_rules() {
    let source = r"
        return [
            null == undefined, 1 == '1', 0 === -0, NaN === NaN,
            typeof undeclared, typeof 1, typeof 's', typeof null, typeof [], typeof (() => 1),
        ];
    ";
    assert_eq!(
        eval(source),
        Some(json!([
            true,
            true,
            true,
            false,
            "undefined",
            "number",
            "string",
            "object",
            "object",
            "function"
        ]))
    );
}

/// Verifies `try`/`catch`/`finally` control flow.
#[test]
fn try_catch_binds_runtime_errors() {
    let source = r"
        const log = [];
        try { null.x; } catch (e) { log.push(e.name); } finally { log.push('done'); }
        try { throw new RangeError('bad'); } catch ({ message }) { log.push(message); }
        return log;
    ";
    assert_eq!(eval(source), Some(json!(["TypeError", "done", "bad"])));
}

// ============================================================================
// SECTION: Builtins
// ============================================================================

/// Verifies the common array pipeline methods.
#[test]
fn array_methods_compose() {
    let source = r"
        const xs = arguments[0];
        return {
            sorted: xs.filter(x => x > 1).sort((a, b) => b - a),
            sum: xs.reduce((acc, x) => acc + x, 0),
            found: xs.find(x => x > 2),
            index: xs.findIndex(x => x === 100),
            flat: [[1, [2]], [3]].flat(),
            joined: xs.slice(-2).join('|'),
            some: xs.some(x => x === 1),
            every: xs.every(x => x > 0),
            includes: xs.includes(2),
            defaultSort: [10, 9, 1].sort(),
        };
    ";
    assert_eq!(
        eval_with(source, &[json!([3, 1, 2])]),
        Some(json!({
            "sorted": [3, 2],
            "sum": 6,
            "found": 3,
            "index": -1,
            "flat": [1, [2], 3],
            "joined": "1|2",
            "some": true,
            "every": true,
            "includes": true,
            "defaultSort": [1, 10, 9]
        }))
    );
}

/// Verifies that sort is stable for equal keys.
#[test]
fn sort_is_stable() {
    let source = r"
        const rows = [{ k: 1, id: 'a' }, { k: 0, id: 'b' }, { k: 1, id: 'c' }, { k: 0, id: 'd' }];
        return rows.sort((x, y) => x.k - y.k).map(r => r.id).join('');
    ";
    assert_eq!(eval(source), Some(json!("bdac")));
}

/// Verifies object statics.
#[test]
fn object_statics_reshape_records() {
    let source = r"
        const scaled = Object.fromEntries(Object.entries({ b: 1, a: 2 }).map(([k, v]) => [k, v * 10]));
        return [scaled, Object.keys(scaled), Object.values(scaled), Object.assign({}, scaled, { c: 1 })];
    ";
    assert_eq!(
        eval(source),
        Some(json!([{ "b": 10, "a": 20 }, ["b", "a"], [10, 20], { "b": 10, "a": 20, "c": 1 }]))
    );
}

/// Verifies objects keep the order their keys were written or imported in.
#[test]
fn object_keys_keep_insertion_order() {
    let source = r"
        const quote = { symbol: 'A', price: 1, change: 2 };
        quote.volume = 3;
        return [Object.keys(quote), Object.keys(arguments[0]), JSON.stringify(arguments[0])];
    ";
    let row = json!({ "zeta": 1, "alpha": 2, "mid": 3 });
    assert_eq!(
        eval_with(source, &[row]),
        Some(json!([
            ["symbol", "price", "change", "volume"],
            ["zeta", "alpha", "mid"],
            "{\"zeta\":1,\"alpha\":2,\"mid\":3}"
        ]))
    );
}

/// Verifies string helpers.
#[test]
fn string_methods_cover_common_formatting() {
    let source = r"
        return [
            'a-b-c'.split('-').join('+'),
            'x.y.z'.replaceAll('.', '/'),
            'abc'.padStart(5, '*'),
            '  hi '.trim(),
            'Hello'.slice(1, -1),
            'Hello'.startsWith('He'),
            'Hello'.indexOf('l'),
            'ab'.repeat(2),
        ];
    ";
    assert_eq!(eval(source), Some(json!(["a+b+c", "x/y/z", "**abc", "hi", "ell", true, 2, "abab"])));
}

/// Verifies number formatting helpers.
#[test]
fn number_formatting_matches_script_output() {
    let source = r"
        return [
            (1.005).toFixed(2), (255).toString(16), (1234.5).toLocaleString(), String(0.1 + 0.2),
            Math.round(2.5), Math.max(...[1, 5, 3]), parseInt('42px'), parseFloat('3.5rem'),
            Number('x'), Number.isInteger(4),
        ];
    ";
    assert_eq!(
        eval(source),
        Some(json!(["1.00", "ff", "1,234.5", "0.30000000000000004", 3, 5, 42, 3.5, null, true]))
    );
}

/// Verifies `toFixed` rounds exact halves away from zero.
#[test]
fn to_fixed_rounds_exact_halves_up() {
    let source = r"
        return [
            (2.5).toFixed(0), (0.5).toFixed(0), (189.125).toFixed(2), (1.25).toFixed(1),
            (10.5).toFixed(0), (-2.5).toFixed(0), (99.995).toFixed(2), (9.5).toFixed(0),
            (0).toFixed(2), (1e21).toFixed(2),
        ];
    ";
    assert_eq!(
        eval(source),
        Some(json!(["3", "1", "189.13", "1.3", "11", "-3", "100.00", "10", "0.00", "1e+21"]))
    );
}

/// Verifies `Math.round` ties toward positive infinity without overshooting.
#[test]
fn math_round_handles_values_just_below_one_half() {
    let source = r"
        return [
            Math.round(0.49999999999999994), Math.round(2.5), Math.round(-2.5),
            Math.round(-2.6), Math.round(4503599627370497),
        ];
    ";
    assert_eq!(eval(source), Some(json!([0, 3, -2, -3, 4_503_599_627_370_497_i64])));
}

/// Verifies JSON helpers.
#[test]
fn json_helpers_round_trip() {
    let source = r"
        const text = JSON.stringify({ a: [1, 'x', null], b: undefined });
        return [text, JSON.parse(text), JSON.stringify({ a: 1 }, null, 2)];
    ";
    assert_eq!(
        eval(source),
        Some(json!(["{\"a\":[1,\"x\",null]}", { "a": [1, "x", null] }, "{\n  \"a\": 1\n}"]))
    );
}

// ============================================================================
// SECTION: Failures
// ============================================================================

/// Verifies syntax errors report a position.
#[test]
fn syntax_error_reports_position() {
    let err = eval_err("const x = 1;\nreturn (;");
    assert_eq!(err.kind, EvalErrorKind::Syntax);
    assert_eq!(err.line_column("const x = 1;\nreturn (;").0, 2);
}

/// Verifies property reads on undefined raise a type error.
#[test]
fn reading_through_undefined_is_a_type_error() {
    let err = Sandbox::with_defaults()
        .evaluate("return arguments[0].foo.bar;", &[json!({})])
        .expect_err("read should fail");
    assert_eq!(err.kind, EvalErrorKind::Runtime);
    assert_eq!(err.name, "TypeError");
    assert!(err.message.contains("Cannot read properties of undefined (reading 'bar')"));
}

/// Verifies undeclared identifiers raise a reference error.
#[test]
fn undeclared_identifier_is_a_reference_error() {
    let err = eval_err("return missing + 1;");
    assert_eq!(err.name, "ReferenceError");
    assert_eq!(err.message, "missing is not defined");
}

/// Verifies const bindings reject reassignment.
#[test]
fn const_reassignment_is_rejected() {
    let err = eval_err("const x = 1; x = 2; return x;");
    assert_eq!(err.name, "TypeError");
    assert_eq!(err.to_string(), "TypeError: Assignment to constant variable.");
}

/// Verifies uncaught throws carry the error name, message, and stack.
#[test]
fn uncaught_throw_carries_stack() {
    let source = r#"
        function inner() { throw new Error("boom"); }
        function outer() { return inner(); }
        return outer();
    "#;
    let err = eval_err(source);
    assert_eq!(err.kind, EvalErrorKind::Runtime);
    assert_eq!(err.to_string(), "Error: boom");
    assert_eq!(err.stack.len(), 3);
    assert!(err.stack[0].starts_with("inner"));
    assert!(err.stack[1].starts_with("outer"));
    assert!(err.stack_trace().unwrap().contains("    at inner"));
}

/// Verifies that calling a non-function names the callee.
#[test]
fn calling_non_function_names_callee() {
    let err = Sandbox::with_defaults()
        .evaluate("return arguments[0].rows.map(x => x);", &[json!({ "rows": { "a": 1 } })])
        .expect_err("call should fail");
    assert_eq!(err.name, "TypeError");
    assert_eq!(err.message, "arguments[...].rows.map is not a function");
}

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Verifies infinite loops exhaust the step budget and cannot be caught.
#[test]
fn step_budget_stops_infinite_loops() {
    let limits = SandboxLimits {
        max_steps: 10_000,
        ..SandboxLimits::default()
    };
    let err = eval_err_with_limits("while (true) {}", limits.clone());
    assert_eq!(err.kind, EvalErrorKind::Limit);
    let err = eval_err_with_limits("try { while (true) {} } catch (e) { return 1; }", limits);
    assert_eq!(err.kind, EvalErrorKind::Limit);
}

/// Verifies unbounded recursion hits a depth limit.
#[test]
fn unbounded_recursion_hits_depth_limit() {
    let err = eval_err("function f(n) { return f(n + 1); } return f(0);");
    assert_eq!(err.kind, EvalErrorKind::Limit);
}

/// Verifies oversized source and deep nesting are rejected before running.
#[test]
fn oversized_or_deeply_nested_source_is_rejected() {
    let limits = SandboxLimits {
        max_source_bytes: 32,
        ..SandboxLimits::default()
    };
    let err = eval_err_with_limits(&format!("return '{}';", "x".repeat(64)), limits);
    assert_eq!(err.kind, EvalErrorKind::Limit);

    let nested = format!("return {}1{};", "(".repeat(200), ")".repeat(200));
    assert_eq!(eval_err(&nested).kind, EvalErrorKind::Limit);
}

/// Verifies array and string growth budgets.
#[test]
fn growth_budgets_stop_runaway_allocation() {
    let limits = SandboxLimits {
        max_array_len: 100,
        max_string_bytes: 1024,
        ..SandboxLimits::default()
    };
    let err =
        eval_err_with_limits("const a = []; for (let i = 0; i < 200; i++) a.push(i); return a;", limits.clone());
    assert_eq!(err.kind, EvalErrorKind::Limit);
    let err = eval_err_with_limits("let s = 'x'; while (true) s += s;", limits);
    assert_eq!(err.kind, EvalErrorKind::Limit);
}

/// Verifies each evaluation starts from fresh globals.
#[test]
fn globals_do_not_leak_between_evaluations() {
    let sandbox = Sandbox::with_defaults();
    assert_eq!(sandbox.evaluate("Math.answer = 42; return Math.answer;", &[]).unwrap(), Some(json!(42)));
    assert_eq!(sandbox.evaluate("return Math.answer;", &[]).unwrap(), None);
}

/// Verifies deeply nested structures built at runtime are released without recursion.
#[test]
fn deeply_nested_runtime_structures_are_released() {
    let source = "let a = []; for (let i = 0; i < 50000; i++) { a = [a]; } const n = a.length; a = null; return n;";
    assert_eq!(eval(source), Some(json!(1)));
}
