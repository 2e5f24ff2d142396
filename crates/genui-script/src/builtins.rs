// crates/genui-script/src/builtins.rs
// ============================================================================
// Module: Script Builtins
// Description: Global objects and prototype methods available to scripts.
// Purpose: Provide the data-shaping library transforms rely on.
// Dependencies: serde, serde_json, crate::{interpreter, value}
// ============================================================================

//! ## Overview
//! Builtins are host functions installed into the global scope of every
//! interpreter. The library covers data shaping only: `Math`, `JSON`,
//! `Object`, `Array`, `Number`, `String`, `Boolean`, the error
//! constructors, and the common array, string, and number methods.
//! There is no clock, randomness, I/O, or network access, so a transform's
//! output depends only on its inputs.
//!
//! Methods that take callbacks iterate over a snapshot of the receiver, so a
//! callback that mutates the array it is iterating cannot invalidate the
//! iteration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cmp::Ordering;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value;
use serde_json::ser::PrettyFormatter;

use crate::interpreter::Interpreter;
use crate::interpreter::MAX_JSON_DEPTH;
use crate::interpreter::Unwind;
use crate::value::ArrayRef;
use crate::value::Entries;
use crate::value::JsonExport;
use crate::value::ObjectRef;
use crate::value::ScriptValue;
use crate::value::export_json;
use crate::value::format_number;
use crate::value::parse_integer_digits;
use crate::value::relative_index;
use crate::value::to_index;
use crate::value::to_integer;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Result of a builtin call.
type NativeResult = Result<ScriptValue, Unwind>;

/// Largest integer a double represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Maximum indentation accepted by `JSON.stringify`.
const MAX_JSON_INDENT: usize = 10;

// ============================================================================
// SECTION: Globals
// ============================================================================

/// Installs the global bindings into a fresh interpreter.
pub(crate) fn install_globals(interp: &mut Interpreter<'_>) {
    let math = namespace(interp, &[
        ("abs", ScriptValue::native("Math.abs", math_abs)),
        ("ceil", ScriptValue::native("Math.ceil", math_ceil)),
        ("floor", ScriptValue::native("Math.floor", math_floor)),
        ("round", ScriptValue::native("Math.round", math_round)),
        ("trunc", ScriptValue::native("Math.trunc", math_trunc)),
        ("sign", ScriptValue::native("Math.sign", math_sign)),
        ("sqrt", ScriptValue::native("Math.sqrt", math_sqrt)),
        ("cbrt", ScriptValue::native("Math.cbrt", math_cbrt)),
        ("log", ScriptValue::native("Math.log", math_log)),
        ("log10", ScriptValue::native("Math.log10", math_log10)),
        ("log2", ScriptValue::native("Math.log2", math_log2)),
        ("exp", ScriptValue::native("Math.exp", math_exp)),
        ("pow", ScriptValue::native("Math.pow", math_pow)),
        ("min", ScriptValue::native("Math.min", math_min)),
        ("max", ScriptValue::native("Math.max", math_max)),
        ("hypot", ScriptValue::native("Math.hypot", math_hypot)),
        ("PI", ScriptValue::Number(std::f64::consts::PI)),
        ("E", ScriptValue::Number(std::f64::consts::E)),
    ]);
    interp.define_global("Math", math);
    let json = namespace(interp, &[
        ("stringify", ScriptValue::native("JSON.stringify", json_stringify)),
        ("parse", ScriptValue::native("JSON.parse", json_parse)),
    ]);
    interp.define_global("JSON", json);
    let console = namespace(interp, &[
        ("log", ScriptValue::native("console.log", console_noop)),
        ("info", ScriptValue::native("console.info", console_noop)),
        ("warn", ScriptValue::native("console.warn", console_noop)),
        ("error", ScriptValue::native("console.error", console_noop)),
    ]);
    interp.define_global("console", console);

    interp.define_global("Object", ScriptValue::native("Object", object_ctor));
    interp.define_global("Array", ScriptValue::native("Array", array_ctor));
    interp.define_global("Number", ScriptValue::native("Number", number_ctor));
    interp.define_global("String", ScriptValue::native("String", string_ctor));
    interp.define_global("Boolean", ScriptValue::native("Boolean", boolean_ctor));
    interp.define_global("Error", ScriptValue::native("Error", error_ctor));
    interp.define_global("TypeError", ScriptValue::native("TypeError", type_error_ctor));
    interp.define_global("RangeError", ScriptValue::native("RangeError", range_error_ctor));
    interp.define_global("SyntaxError", ScriptValue::native("SyntaxError", syntax_error_ctor));
    interp.define_global(
        "ReferenceError",
        ScriptValue::native("ReferenceError", reference_error_ctor),
    );
    interp.define_global("parseFloat", ScriptValue::native("parseFloat", global_parse_float));
    interp.define_global("parseInt", ScriptValue::native("parseInt", global_parse_int));
    interp.define_global("isNaN", ScriptValue::native("isNaN", global_is_nan));
    interp.define_global("isFinite", ScriptValue::native("isFinite", global_is_finite));
    interp.define_global("NaN", ScriptValue::Number(f64::NAN));
    interp.define_global("Infinity", ScriptValue::Number(f64::INFINITY));
}

/// Builds a plain object from named members.
fn namespace(interp: &mut Interpreter<'_>, members: &[(&str, ScriptValue)]) -> ScriptValue {
    let entries =
        members.iter().map(|(key, value)| ((*key).to_string(), value.clone())).collect::<Entries>();
    interp.alloc_object(entries)
}

/// Returns true when a native may be invoked with `new`.
pub(crate) fn is_constructor(name: &str) -> bool {
    matches!(
        name,
        "Object" | "Array" | "Error" | "TypeError" | "RangeError" | "SyntaxError" | "ReferenceError"
    )
}

/// Resolves a static member such as `Object.keys` or `Number.isInteger`.
pub(crate) fn static_member(owner: &str, key: &str) -> Option<ScriptValue> {
    let value = match (owner, key) {
        ("Object", "keys") => ScriptValue::native("Object.keys", object_keys),
        ("Object", "values") => ScriptValue::native("Object.values", object_values),
        ("Object", "entries") => ScriptValue::native("Object.entries", object_entries),
        ("Object", "assign") => ScriptValue::native("Object.assign", object_assign),
        ("Object", "fromEntries") => ScriptValue::native("Object.fromEntries", object_from_entries),
        ("Object", "freeze") => ScriptValue::native("Object.freeze", identity),
        ("Array", "isArray") => ScriptValue::native("Array.isArray", array_is_array),
        ("Array", "from") => ScriptValue::native("Array.from", array_from),
        ("Array", "of") => ScriptValue::native("Array.of", array_of),
        ("Number", "isInteger") => ScriptValue::native("Number.isInteger", number_is_integer),
        ("Number", "isSafeInteger") => {
            ScriptValue::native("Number.isSafeInteger", number_is_safe_integer)
        }
        ("Number", "isFinite") => ScriptValue::native("Number.isFinite", number_is_finite),
        ("Number", "isNaN") => ScriptValue::native("Number.isNaN", number_is_nan),
        ("Number", "parseFloat") => ScriptValue::native("parseFloat", global_parse_float),
        ("Number", "parseInt") => ScriptValue::native("parseInt", global_parse_int),
        ("Number", "MAX_SAFE_INTEGER") => ScriptValue::Number(MAX_SAFE_INTEGER),
        ("Number", "MIN_SAFE_INTEGER") => ScriptValue::Number(-MAX_SAFE_INTEGER),
        ("Number", "EPSILON") => ScriptValue::Number(f64::EPSILON),
        ("Number", "MAX_VALUE") => ScriptValue::Number(f64::MAX),
        ("Number", "POSITIVE_INFINITY") => ScriptValue::Number(f64::INFINITY),
        ("Number", "NEGATIVE_INFINITY") => ScriptValue::Number(f64::NEG_INFINITY),
        ("Number", "NaN") => ScriptValue::Number(f64::NAN),
        ("String", "fromCharCode") => ScriptValue::native("String.fromCharCode", string_from_char_code),
        (_, "name") => ScriptValue::string(owner),
        _ => return None,
    };
    Some(value)
}

// ============================================================================
// SECTION: Argument Helpers
// ============================================================================

/// Returns argument `index` or `undefined`.
fn arg(args: &[ScriptValue], index: usize) -> ScriptValue {
    args.get(index).cloned().unwrap_or(ScriptValue::Undefined)
}

/// Returns argument `index` coerced to a number.
fn number_arg(args: &[ScriptValue], index: usize) -> f64 {
    args.get(index).map_or(f64::NAN, ScriptValue::to_number)
}

/// Returns argument `index` as a number unless it is missing or `undefined`.
fn optional_number(args: &[ScriptValue], index: usize) -> Option<f64> {
    match args.get(index) {
        None | Some(ScriptValue::Undefined) => None,
        Some(value) => Some(value.to_number()),
    }
}

/// Returns argument `index` as a string, or `default` when missing or `undefined`.
fn string_arg(args: &[ScriptValue], index: usize, default: &str) -> String {
    match args.get(index) {
        None | Some(ScriptValue::Undefined) => default.to_string(),
        Some(value) => value.to_display_string(),
    }
}

/// Returns the first argument when it is callable.
fn callback_arg(interp: &Interpreter<'_>, args: &[ScriptValue], position: usize) -> NativeResult {
    match args.first() {
        Some(value @ ScriptValue::Function(_)) => Ok(value.clone()),
        other => Err(interp.type_error(
            format!("{} is not a function", other.map_or_else(|| "undefined".to_string(), ScriptValue::describe)),
            position,
        )),
    }
}

/// Copies the current array contents.
fn snapshot(interp: &Interpreter<'_>, items: &ArrayRef, position: usize) -> Result<Vec<ScriptValue>, Unwind> {
    Ok(interp.array_ref(items, position)?.clone())
}

/// Invokes an array callback with `(item, index, array)`.
fn call_with_item(
    interp: &mut Interpreter<'_>,
    callback: &ScriptValue,
    item: &ScriptValue,
    index: usize,
    items: &ArrayRef,
    position: usize,
) -> NativeResult {
    interp.tick()?;
    let args = [item.clone(), ScriptValue::from_len(index), ScriptValue::Array(Rc::clone(items))];
    interp.call_value(callback, ScriptValue::Undefined, &args, position)
}

/// Converts a count argument to a bounded length.
fn length_arg(value: f64, max: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    to_index(value.min(4_294_967_294.0).trunc()).map_or(max, |len| len.min(max))
}

/// Index of `-1` for "not found" results.
const NOT_FOUND: ScriptValue = ScriptValue::Number(-1.0);

// ============================================================================
// SECTION: Math
// ============================================================================

/// Defines single-argument `Math` functions.
macro_rules! math_unary {
    ($($name:ident => $op:expr),* $(,)?) => {
        $(
            #[doc = concat!("`Math` builtin `", stringify!($name), "`.")]
            fn $name(
                _: &mut Interpreter<'_>,
                _: &ScriptValue,
                args: &[ScriptValue],
                _: usize,
            ) -> NativeResult {
                let op: fn(f64) -> f64 = $op;
                Ok(ScriptValue::Number(op(number_arg(args, 0))))
            }
        )*
    };
}

math_unary! {
    math_abs => f64::abs,
    math_ceil => f64::ceil,
    math_floor => f64::floor,
    math_round => round_half_up,
    math_trunc => f64::trunc,
    math_sign => |value| if value.is_nan() || value == 0.0 { value } else { value.signum() },
    math_sqrt => f64::sqrt,
    math_cbrt => f64::cbrt,
    math_log => f64::ln,
    math_log10 => f64::log10,
    math_log2 => f64::log2,
    math_exp => f64::exp,
}

/// Rounds to the nearest integer, ties toward positive infinity.
///
/// Compares against the floor instead of adding one half, which would round
/// `0.49999999999999994` up.
fn round_half_up(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let floor = value.floor();
    let rounded = if value - floor >= 0.5 { floor + 1.0 } else { floor };
    if rounded == 0.0 && value.is_sign_negative() { -0.0 } else { rounded }
}

/// `Math.pow`
fn math_pow(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Number(number_arg(args, 0).powf(number_arg(args, 1))))
}

/// `Math.min`
fn math_min(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    let mut result = f64::INFINITY;
    for value in args.iter().map(ScriptValue::to_number) {
        if value.is_nan() {
            return Ok(ScriptValue::Number(f64::NAN));
        }
        result = result.min(value);
    }
    Ok(ScriptValue::Number(result))
}

/// `Math.max`
fn math_max(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    let mut result = f64::NEG_INFINITY;
    for value in args.iter().map(ScriptValue::to_number) {
        if value.is_nan() {
            return Ok(ScriptValue::Number(f64::NAN));
        }
        result = result.max(value);
    }
    Ok(ScriptValue::Number(result))
}

/// `Math.hypot`
fn math_hypot(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    let sum = args.iter().map(ScriptValue::to_number).map(|value| value * value).sum::<f64>();
    Ok(ScriptValue::Number(sum.sqrt()))
}

/// `console.*`; output is discarded.
fn console_noop(_: &mut Interpreter<'_>, _: &ScriptValue, _: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Undefined)
}

// ============================================================================
// SECTION: JSON
// ============================================================================

/// `JSON.stringify(value, replacer, indent)`; the replacer is ignored.
fn json_stringify(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let exported = export_json(&arg(args, 0), MAX_JSON_DEPTH)
        .map_err(|_| interp.type_error("Converting circular structure to JSON", position))?;
    let JsonExport::Value(json) = exported else {
        return Ok(ScriptValue::Undefined);
    };
    let indent = match args.get(2) {
        Some(ScriptValue::Number(width)) => " ".repeat(length_arg(*width, MAX_JSON_INDENT)),
        Some(ScriptValue::Str(text)) => text.chars().take(MAX_JSON_INDENT).collect(),
        _ => String::new(),
    };
    let text = if indent.is_empty() {
        serde_json::to_string(&json).map_err(|err| interp.type_error(err.to_string(), position))?
    } else {
        let mut buffer = Vec::new();
        let mut serializer =
            serde_json::Serializer::with_formatter(&mut buffer, PrettyFormatter::with_indent(indent.as_bytes()));
        json.serialize(&mut serializer).map_err(|err| interp.type_error(err.to_string(), position))?;
        String::from_utf8(buffer).map_err(|err| interp.type_error(err.to_string(), position))?
    };
    interp.check_string_len(text.len(), position)?;
    Ok(ScriptValue::string(text))
}

/// `JSON.parse(text)`
fn json_parse(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let text = arg(args, 0).to_display_string();
    let value = serde_json::from_str::<Value>(&text)
        .map_err(|err| interp.error("SyntaxError", format!("JSON.parse: {err}"), position))?;
    Ok(interp.import_json(&value, 0)?)
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

/// `Object(value)`
fn object_ctor(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    match args.first() {
        Some(value @ (ScriptValue::Object(_) | ScriptValue::Array(_) | ScriptValue::Function(_))) => {
            Ok(value.clone())
        }
        _ => Ok(interp.alloc_object(Entries::new())),
    }
}

/// `Array(length)` or `Array(...items)`
fn array_ctor(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    if let [ScriptValue::Number(len)] = args {
        let Some(len) = to_index(*len) else {
            return Err(interp.error("RangeError", "Invalid array length", position));
        };
        interp.check_array_len(len, position)?;
        return interp.alloc_array(vec![ScriptValue::Undefined; len], position);
    }
    interp.alloc_array(args.to_vec(), position)
}

/// `Number(value)`
fn number_ctor(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Number(args.first().map_or(0.0, ScriptValue::to_number)))
}

/// `String(value)`
fn string_ctor(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::string(args.first().map(ScriptValue::to_display_string).unwrap_or_default()))
}

/// `Boolean(value)`
fn boolean_ctor(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(args.first().is_some_and(ScriptValue::truthy)))
}

/// Builds an error object `{ name, message }`.
fn make_error(interp: &mut Interpreter<'_>, name: &str, args: &[ScriptValue]) -> ScriptValue {
    let mut entries = Entries::new();
    entries.insert("name".to_string(), ScriptValue::string(name));
    entries.insert("message".to_string(), ScriptValue::string(string_arg(args, 0, "")));
    interp.alloc_object(entries)
}

/// `Error(message)`
fn error_ctor(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(make_error(interp, "Error", args))
}

/// `TypeError(message)`
fn type_error_ctor(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(make_error(interp, "TypeError", args))
}

/// `RangeError(message)`
fn range_error_ctor(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(make_error(interp, "RangeError", args))
}

/// `SyntaxError(message)`
fn syntax_error_ctor(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(make_error(interp, "SyntaxError", args))
}

/// `ReferenceError(message)`
fn reference_error_ctor(
    interp: &mut Interpreter<'_>,
    _: &ScriptValue,
    args: &[ScriptValue],
    _: usize,
) -> NativeResult {
    Ok(make_error(interp, "ReferenceError", args))
}

/// Returns the first argument unchanged.
fn identity(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(arg(args, 0))
}

// ============================================================================
// SECTION: Global Functions
// ============================================================================

/// `parseFloat(text)`
fn global_parse_float(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Number(parse_float_prefix(&string_arg(args, 0, "undefined"))))
}

/// `parseInt(text, radix)`
fn global_parse_int(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Number(parse_int_prefix(&string_arg(args, 0, "undefined"), optional_number(args, 1))))
}

/// `isNaN(value)`
fn global_is_nan(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(number_arg(args, 0).is_nan()))
}

/// `isFinite(value)`
fn global_is_finite(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(number_arg(args, 0).is_finite()))
}

/// Parses the longest decimal prefix of `text`.
fn parse_float_prefix(text: &str) -> f64 {
    let trimmed = text.trim_start();
    let (negative, body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1 ..]),
        Some(b'+') => (false, &trimmed[1 ..]),
        _ => (false, trimmed),
    };
    if body.starts_with("Infinity") {
        return if negative { f64::NEG_INFINITY } else { f64::INFINITY };
    }
    let bytes = body.as_bytes();
    let mut end = 0;
    let mut digits = 0;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
        digits += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
            digits += 1;
        }
    }
    if digits == 0 {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exponent_end = end + 1;
        if exponent_end < bytes.len() && matches!(bytes[exponent_end], b'+' | b'-') {
            exponent_end += 1;
        }
        let exponent_digits_start = exponent_end;
        while exponent_end < bytes.len() && bytes[exponent_end].is_ascii_digit() {
            exponent_end += 1;
        }
        if exponent_end > exponent_digits_start {
            end = exponent_end;
        }
    }
    let value = body[.. end].parse::<f64>().unwrap_or(f64::NAN);
    if negative { -value } else { value }
}

/// Parses the longest integer prefix of `text` in `radix`.
fn parse_int_prefix(text: &str, radix: Option<f64>) -> f64 {
    let trimmed = text.trim();
    let (negative, mut body) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1 ..]),
        Some(b'+') => (false, &trimmed[1 ..]),
        _ => (false, trimmed),
    };
    let mut radix = radix.map_or(0, to_integer);
    if (radix == 0 || radix == 16)
        && let Some(rest) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X"))
    {
        body = rest;
        radix = 16;
    }
    if radix == 0 {
        radix = 10;
    }
    let Ok(radix) = u32::try_from(radix) else {
        return f64::NAN;
    };
    if !(2 ..= 36).contains(&radix) {
        return f64::NAN;
    }
    let digits = body.chars().take_while(|ch| ch.to_digit(radix).is_some()).collect::<String>();
    match parse_integer_digits(&digits, radix) {
        Some(value) if negative => -value,
        Some(value) => value,
        None => f64::NAN,
    }
}

// ============================================================================
// SECTION: Object Statics
// ============================================================================

/// Own enumerable entries of a value, in key order.
fn own_entries(
    interp: &Interpreter<'_>,
    value: &ScriptValue,
    position: usize,
) -> Result<Vec<(String, ScriptValue)>, Unwind> {
    let entries = match value {
        ScriptValue::Object(entries) => interp
            .object_ref(entries, position)?
            .iter()
            .map(|(key, item)| (key.clone(), item.clone()))
            .collect(),
        ScriptValue::Array(items) => interp
            .array_ref(items, position)?
            .iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item.clone()))
            .collect(),
        ScriptValue::Str(text) => text
            .chars()
            .enumerate()
            .map(|(index, ch)| (index.to_string(), ScriptValue::string(ch.to_string())))
            .collect(),
        ScriptValue::Undefined | ScriptValue::Null => {
            return Err(interp.type_error("Cannot convert undefined or null to object", position));
        }
        _ => Vec::new(),
    };
    Ok(entries)
}

/// `Object.keys(value)`
fn object_keys(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let keys = own_entries(interp, &arg(args, 0), position)?
        .into_iter()
        .map(|(key, _)| ScriptValue::string(key))
        .collect();
    interp.alloc_array(keys, position)
}

/// `Object.values(value)`
fn object_values(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let values = own_entries(interp, &arg(args, 0), position)?.into_iter().map(|(_, item)| item).collect();
    interp.alloc_array(values, position)
}

/// `Object.entries(value)`
fn object_entries(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let entries = own_entries(interp, &arg(args, 0), position)?;
    let mut pairs = Vec::with_capacity(entries.len());
    for (key, item) in entries {
        pairs.push(interp.alloc_array(vec![ScriptValue::string(key), item], position)?);
    }
    interp.alloc_array(pairs, position)
}

/// `Object.assign(target, ...sources)`
fn object_assign(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let target = arg(args, 0);
    let ScriptValue::Object(target_entries) = &target else {
        return Err(interp.type_error(format!("Cannot assign to {}", target.describe()), position));
    };
    for source in args.iter().skip(1) {
        if source.is_nullish() {
            continue;
        }
        let entries = own_entries(interp, source, position)?;
        interp.object_mut(target_entries, position)?.extend(entries);
    }
    Ok(target)
}

/// `Object.fromEntries(pairs)`
fn object_from_entries(
    interp: &mut Interpreter<'_>,
    _: &ScriptValue,
    args: &[ScriptValue],
    position: usize,
) -> NativeResult {
    let pairs = interp.iterate(&arg(args, 0), position)?;
    let mut entries = Entries::new();
    for pair in pairs {
        let ScriptValue::Array(items) = &pair else {
            return Err(interp.type_error(
                format!("Iterator value {} is not an entry object", pair.describe()),
                position,
            ));
        };
        let items = interp.array_ref(items, position)?;
        let key = items.first().map_or_else(|| "undefined".to_string(), ScriptValue::to_property_key);
        let value = items.get(1).cloned().unwrap_or(ScriptValue::Undefined);
        entries.insert(key, value);
    }
    Ok(interp.alloc_object(entries))
}

/// Methods available on plain objects.
pub(crate) fn object_method(
    interp: &mut Interpreter<'_>,
    entries: &ObjectRef,
    name: &str,
    args: &[ScriptValue],
    position: usize,
) -> Option<NativeResult> {
    let result = match name {
        "hasOwnProperty" => {
            let key = arg(args, 0).to_property_key();
            interp.object_ref(entries, position).map(|entries| ScriptValue::Bool(entries.contains_key(&key)))
        }
        "toString" => Ok(ScriptValue::string("[object Object]")),
        "valueOf" => Ok(ScriptValue::Object(Rc::clone(entries))),
        _ => return None,
    };
    Some(result)
}

// ============================================================================
// SECTION: Array Statics
// ============================================================================

/// `Array.isArray(value)`
fn array_is_array(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(matches!(args.first(), Some(ScriptValue::Array(_)))))
}

/// `Array.from(source, mapFn)`
fn array_from(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    let source = arg(args, 0);
    let items = match &source {
        ScriptValue::Array(_) | ScriptValue::Str(_) => interp.iterate(&source, position)?,
        ScriptValue::Object(_) => {
            let len = interp.get_property(&source, "length", position)?.to_number();
            let len = length_arg(len, usize::MAX);
            interp.check_array_len(len, position)?;
            let mut items = Vec::with_capacity(len);
            for index in 0 .. len {
                items.push(interp.get_property(&source, &index.to_string(), position)?);
            }
            items
        }
        _ => Vec::new(),
    };
    let items = match args.get(1) {
        Some(mapper @ ScriptValue::Function(_)) => {
            let mut mapped = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                interp.tick()?;
                mapped.push(interp.call_value(
                    mapper,
                    ScriptValue::Undefined,
                    &[item, ScriptValue::from_len(index)],
                    position,
                )?);
            }
            mapped
        }
        _ => items,
    };
    interp.alloc_array(items, position)
}

/// `Array.of(...items)`
fn array_of(interp: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], position: usize) -> NativeResult {
    interp.alloc_array(args.to_vec(), position)
}

// ============================================================================
// SECTION: Array Methods
// ============================================================================

/// Dispatches an array method; `None` when the name is not a builtin.
pub(crate) fn array_method(
    interp: &mut Interpreter<'_>,
    items: &ArrayRef,
    name: &str,
    args: &[ScriptValue],
    position: usize,
) -> Option<NativeResult> {
    let result = match name {
        "map" => array_map(interp, items, args, position),
        "filter" => array_filter(interp, items, args, position),
        "forEach" => array_for_each(interp, items, args, position),
        "reduce" => array_reduce(interp, items, args, position, false),
        "reduceRight" => array_reduce(interp, items, args, position, true),
        "find" => array_find(interp, items, args, position, false).map(|found| found.map_or(ScriptValue::Undefined, |(_, item)| item)),
        "findLast" => array_find(interp, items, args, position, true).map(|found| found.map_or(ScriptValue::Undefined, |(_, item)| item)),
        "findIndex" => array_find(interp, items, args, position, false).map(|found| found.map_or(NOT_FOUND, |(index, _)| ScriptValue::from_len(index))),
        "findLastIndex" => array_find(interp, items, args, position, true).map(|found| found.map_or(NOT_FOUND, |(index, _)| ScriptValue::from_len(index))),
        "some" => array_find(interp, items, args, position, false).map(|found| ScriptValue::Bool(found.is_some())),
        "every" => array_every(interp, items, args, position),
        "slice" => array_slice(interp, items, args, position),
        "concat" => array_concat(interp, items, args, position),
        "join" => array_join(interp, items, args, position),
        "toString" => array_join(interp, items, &[], position),
        "includes" => array_includes(interp, items, args, position),
        "indexOf" => array_index_of(interp, items, args, position, false),
        "lastIndexOf" => array_index_of(interp, items, args, position, true),
        "sort" => array_sort(interp, items, args, position, true),
        "toSorted" => array_sort(interp, items, args, position, false),
        "reverse" => interp.array_mut(items, position).map(|mut values| {
            values.reverse();
            ScriptValue::Array(Rc::clone(items))
        }),
        "toReversed" => snapshot(interp, items, position).and_then(|mut values| {
            values.reverse();
            interp.alloc_array(values, position)
        }),
        "flat" => array_flat(interp, items, args, position),
        "flatMap" => array_flat_map(interp, items, args, position),
        "push" => array_push(interp, items, args, position),
        "pop" => interp.array_mut(items, position).map(|mut values| values.pop().unwrap_or(ScriptValue::Undefined)),
        "shift" => interp.array_mut(items, position).map(|mut values| {
            if values.is_empty() { ScriptValue::Undefined } else { values.remove(0) }
        }),
        "unshift" => array_unshift(interp, items, args, position),
        "splice" => array_splice(interp, items, args, position),
        "fill" => array_fill(interp, items, args, position),
        "at" => array_at(interp, items, args, position),
        _ => return None,
    };
    Some(result)
}

/// `array.map(fn)`
fn array_map(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    let mut out = Vec::with_capacity(values.len());
    for (index, item) in values.iter().enumerate() {
        out.push(call_with_item(interp, &callback, item, index, items, position)?);
    }
    interp.alloc_array(out, position)
}

/// `array.filter(fn)`
fn array_filter(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    let mut out = Vec::new();
    for (index, item) in values.iter().enumerate() {
        if call_with_item(interp, &callback, item, index, items, position)?.truthy() {
            out.push(item.clone());
        }
    }
    interp.alloc_array(out, position)
}

/// `array.forEach(fn)`
fn array_for_each(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    for (index, item) in values.iter().enumerate() {
        call_with_item(interp, &callback, item, index, items, position)?;
    }
    Ok(ScriptValue::Undefined)
}

/// `array.every(fn)`
fn array_every(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    for (index, item) in values.iter().enumerate() {
        if !call_with_item(interp, &callback, item, index, items, position)?.truthy() {
            return Ok(ScriptValue::Bool(false));
        }
    }
    Ok(ScriptValue::Bool(true))
}

/// Finds the first (or last) element the callback accepts.
fn array_find(
    interp: &mut Interpreter<'_>,
    items: &ArrayRef,
    args: &[ScriptValue],
    position: usize,
    from_end: bool,
) -> Result<Option<(usize, ScriptValue)>, Unwind> {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    let mut order = (0 .. values.len()).collect::<Vec<_>>();
    if from_end {
        order.reverse();
    }
    for index in order {
        let item = &values[index];
        if call_with_item(interp, &callback, item, index, items, position)?.truthy() {
            return Ok(Some((index, item.clone())));
        }
    }
    Ok(None)
}

/// `array.reduce(fn, initial)` and `array.reduceRight(fn, initial)`
fn array_reduce(
    interp: &mut Interpreter<'_>,
    items: &ArrayRef,
    args: &[ScriptValue],
    position: usize,
    from_end: bool,
) -> NativeResult {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    let mut order = (0 .. values.len()).collect::<Vec<_>>();
    if from_end {
        order.reverse();
    }
    let mut indices = order.into_iter();
    let mut accumulator = if args.len() >= 2 {
        arg(args, 1)
    } else {
        let Some(first) = indices.next() else {
            return Err(interp.type_error("Reduce of empty array with no initial value", position));
        };
        values[first].clone()
    };
    for index in indices {
        interp.tick()?;
        let call_args = [
            accumulator,
            values[index].clone(),
            ScriptValue::from_len(index),
            ScriptValue::Array(Rc::clone(items)),
        ];
        accumulator = interp.call_value(&callback, ScriptValue::Undefined, &call_args, position)?;
    }
    Ok(accumulator)
}

/// `array.slice(start, end)`
fn array_slice(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let values = snapshot(interp, items, position)?;
    let len = values.len();
    let start = optional_number(args, 0).map_or(0, |value| relative_index(value, len));
    let end = optional_number(args, 1).map_or(len, |value| relative_index(value, len));
    let out = if start < end { values[start .. end].to_vec() } else { Vec::new() };
    interp.alloc_array(out, position)
}

/// `array.concat(...values)`
fn array_concat(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let mut out = snapshot(interp, items, position)?;
    for value in args {
        match value {
            ScriptValue::Array(other) => out.extend(snapshot(interp, other, position)?),
            other => out.push(other.clone()),
        }
        interp.check_array_len(out.len(), position)?;
    }
    interp.alloc_array(out, position)
}

/// `array.join(separator)`
fn array_join(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let separator = string_arg(args, 0, ",");
    let values = snapshot(interp, items, position)?;
    let mut out = String::new();
    for (index, item) in values.iter().enumerate() {
        if index > 0 {
            out.push_str(&separator);
        }
        if !item.is_nullish() {
            out.push_str(&item.to_display_string());
        }
        interp.check_string_len(out.len(), position)?;
    }
    Ok(ScriptValue::string(out))
}

/// `array.includes(value, fromIndex)`
fn array_includes(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let needle = arg(args, 0);
    let values = interp.array_ref(items, position)?;
    let start = optional_number(args, 1).map_or(0, |value| relative_index(value, values.len()));
    Ok(ScriptValue::Bool(values.iter().skip(start).any(|item| item.same_value_zero(&needle))))
}

/// `array.indexOf(value)` and `array.lastIndexOf(value)`
fn array_index_of(
    interp: &mut Interpreter<'_>,
    items: &ArrayRef,
    args: &[ScriptValue],
    position: usize,
    from_end: bool,
) -> NativeResult {
    let needle = arg(args, 0);
    let values = interp.array_ref(items, position)?;
    let found = if from_end {
        values.iter().rposition(|item| item.strict_equals(&needle))
    } else {
        let start = optional_number(args, 1).map_or(0, |value| relative_index(value, values.len()));
        values.iter().skip(start).position(|item| item.strict_equals(&needle)).map(|index| index + start)
    };
    Ok(found.map_or(NOT_FOUND, ScriptValue::from_len))
}

/// `array.sort(compareFn)` (in place) and `array.toSorted(compareFn)`.
fn array_sort(
    interp: &mut Interpreter<'_>,
    items: &ArrayRef,
    args: &[ScriptValue],
    position: usize,
    in_place: bool,
) -> NativeResult {
    let comparator = match args.first() {
        None | Some(ScriptValue::Undefined) => None,
        Some(value @ ScriptValue::Function(_)) => Some(value.clone()),
        Some(_) => {
            return Err(interp.type_error(
                "The comparison function must be either a function or undefined",
                position,
            ));
        }
    };
    let values = snapshot(interp, items, position)?;
    let sorted = merge_sort(interp, values, comparator.as_ref(), position)?;
    if in_place {
        *interp.array_mut(items, position)? = sorted;
        Ok(ScriptValue::Array(Rc::clone(items)))
    } else {
        interp.alloc_array(sorted, position)
    }
}

/// Stable merge sort with a fallible comparator.
fn merge_sort(
    interp: &mut Interpreter<'_>,
    mut values: Vec<ScriptValue>,
    comparator: Option<&ScriptValue>,
    position: usize,
) -> Result<Vec<ScriptValue>, Unwind> {
    if values.len() <= 1 {
        return Ok(values);
    }
    let right = values.split_off(values.len() / 2);
    let left = merge_sort(interp, values, comparator, position)?;
    let right = merge_sort(interp, right, comparator, position)?;
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        interp.tick()?;
        let take_right = sort_order(interp, a, b, comparator, position)? == Ordering::Greater;
        let next = if take_right { right.next() } else { left.next() };
        merged.extend(next);
    }
    merged.extend(left);
    merged.extend(right);
    Ok(merged)
}

/// Compares two elements for sorting; `undefined` sorts last.
fn sort_order(
    interp: &mut Interpreter<'_>,
    a: &ScriptValue,
    b: &ScriptValue,
    comparator: Option<&ScriptValue>,
    position: usize,
) -> Result<Ordering, Unwind> {
    match (a, b) {
        (ScriptValue::Undefined, ScriptValue::Undefined) => return Ok(Ordering::Equal),
        (ScriptValue::Undefined, _) => return Ok(Ordering::Greater),
        (_, ScriptValue::Undefined) => return Ok(Ordering::Less),
        _ => {}
    }
    let Some(comparator) = comparator else {
        return Ok(a.to_display_string().cmp(&b.to_display_string()));
    };
    let result =
        interp.call_value(comparator, ScriptValue::Undefined, &[a.clone(), b.clone()], position)?.to_number();
    Ok(result.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
}

/// Appends flattened values to `out`.
fn flatten_into(
    interp: &Interpreter<'_>,
    values: &[ScriptValue],
    depth: usize,
    out: &mut Vec<ScriptValue>,
    position: usize,
) -> Result<(), Unwind> {
    for value in values {
        match value {
            ScriptValue::Array(inner) if depth > 0 => {
                let inner = snapshot(interp, inner, position)?;
                flatten_into(interp, &inner, depth - 1, out, position)?;
            }
            other => out.push(other.clone()),
        }
        interp.check_array_len(out.len(), position)?;
    }
    Ok(())
}

/// `array.flat(depth)`
fn array_flat(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let depth = optional_number(args, 0).map_or(1, |value| length_arg(value, MAX_JSON_DEPTH));
    let values = snapshot(interp, items, position)?;
    let mut out = Vec::with_capacity(values.len());
    flatten_into(interp, &values, depth, &mut out, position)?;
    interp.alloc_array(out, position)
}

/// `array.flatMap(fn)`
fn array_flat_map(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let callback = callback_arg(interp, args, position)?;
    let values = snapshot(interp, items, position)?;
    let mut mapped = Vec::with_capacity(values.len());
    for (index, item) in values.iter().enumerate() {
        mapped.push(call_with_item(interp, &callback, item, index, items, position)?);
    }
    let mut out = Vec::with_capacity(mapped.len());
    flatten_into(interp, &mapped, 1, &mut out, position)?;
    interp.alloc_array(out, position)
}

/// `array.push(...values)`
fn array_push(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let mut values = interp.array_mut(items, position)?;
    interp.check_array_len(values.len() + args.len(), position)?;
    values.extend_from_slice(args);
    Ok(ScriptValue::from_len(values.len()))
}

/// `array.unshift(...values)`
fn array_unshift(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let mut values = interp.array_mut(items, position)?;
    interp.check_array_len(values.len() + args.len(), position)?;
    values.splice(0 .. 0, args.iter().cloned());
    Ok(ScriptValue::from_len(values.len()))
}

/// `array.splice(start, deleteCount, ...insert)`
fn array_splice(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let removed = {
        let mut values = interp.array_mut(items, position)?;
        let len = values.len();
        let start = optional_number(args, 0).map_or(0, |value| relative_index(value, len));
        let delete = if args.len() < 2 {
            len - start
        } else {
            length_arg(number_arg(args, 1), len - start)
        };
        let inserted = args.get(2 ..).unwrap_or_default();
        interp.check_array_len(len - delete + inserted.len(), position)?;
        values.splice(start .. start + delete, inserted.iter().cloned()).collect::<Vec<_>>()
    };
    interp.alloc_array(removed, position)
}

/// `array.fill(value, start, end)`
fn array_fill(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let value = arg(args, 0);
    {
        let mut values = interp.array_mut(items, position)?;
        let len = values.len();
        let start = optional_number(args, 1).map_or(0, |index| relative_index(index, len));
        let end = optional_number(args, 2).map_or(len, |index| relative_index(index, len));
        for slot in values.iter_mut().take(end).skip(start) {
            *slot = value.clone();
        }
    }
    Ok(ScriptValue::Array(Rc::clone(items)))
}

/// `array.at(index)`
fn array_at(interp: &mut Interpreter<'_>, items: &ArrayRef, args: &[ScriptValue], position: usize) -> NativeResult {
    let values = interp.array_ref(items, position)?;
    Ok(at_index(number_arg(args, 0), values.len())
        .and_then(|index| values.get(index).cloned())
        .unwrap_or(ScriptValue::Undefined))
}

/// Resolves an `at()` index; negative counts from the end.
fn at_index(value: f64, len: usize) -> Option<usize> {
    let index = to_integer(value);
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { len + index } else { index };
    if (0 .. len).contains(&resolved) { usize::try_from(resolved).ok() } else { None }
}

// ============================================================================
// SECTION: String Methods
// ============================================================================

/// Dispatches a string method; `None` when the name is not a builtin.
///
/// Offsets count Unicode scalar values.
pub(crate) fn string_method(
    interp: &mut Interpreter<'_>,
    text: &str,
    name: &str,
    args: &[ScriptValue],
    position: usize,
) -> Option<NativeResult> {
    let result = match name {
        "toUpperCase" | "toLocaleUpperCase" => Ok(ScriptValue::string(text.to_uppercase())),
        "toLowerCase" | "toLocaleLowerCase" => Ok(ScriptValue::string(text.to_lowercase())),
        "trim" => Ok(ScriptValue::string(text.trim())),
        "trimStart" => Ok(ScriptValue::string(text.trim_start())),
        "trimEnd" => Ok(ScriptValue::string(text.trim_end())),
        "toString" | "valueOf" => Ok(ScriptValue::string(text)),
        "slice" => {
            let chars = text.chars().collect::<Vec<_>>();
            let start = optional_number(args, 0).map_or(0, |value| relative_index(value, chars.len()));
            let end = optional_number(args, 1).map_or(chars.len(), |value| relative_index(value, chars.len()));
            Ok(char_range(&chars, start, end))
        }
        "substring" => {
            let chars = text.chars().collect::<Vec<_>>();
            let clamp = |value: f64| length_arg(value, chars.len());
            let start = optional_number(args, 0).map_or(0, clamp);
            let end = optional_number(args, 1).map_or(chars.len(), clamp);
            Ok(char_range(&chars, start.min(end), start.max(end)))
        }
        "substr" => {
            let chars = text.chars().collect::<Vec<_>>();
            let start = optional_number(args, 0).map_or(0, |value| relative_index(value, chars.len()));
            let count = optional_number(args, 1).map_or(chars.len(), |value| length_arg(value, chars.len()));
            Ok(char_range(&chars, start, start.saturating_add(count).min(chars.len())))
        }
        "split" => string_split(interp, text, args, position),
        "includes" => {
            let needle = string_arg(args, 0, "undefined");
            let from = optional_number(args, 1).map_or(0, |value| length_arg(value, usize::MAX));
            Ok(ScriptValue::Bool(text[byte_offset(text, from) ..].contains(needle.as_str())))
        }
        "startsWith" => {
            let needle = string_arg(args, 0, "undefined");
            let from = optional_number(args, 1).map_or(0, |value| length_arg(value, usize::MAX));
            Ok(ScriptValue::Bool(text[byte_offset(text, from) ..].starts_with(needle.as_str())))
        }
        "endsWith" => {
            let needle = string_arg(args, 0, "undefined");
            let end = optional_number(args, 1).map_or(usize::MAX, |value| length_arg(value, usize::MAX));
            Ok(ScriptValue::Bool(text[.. byte_offset(text, end)].ends_with(needle.as_str())))
        }
        "indexOf" => {
            let needle = string_arg(args, 0, "undefined");
            let from = optional_number(args, 1).map_or(0, |value| length_arg(value, usize::MAX));
            let offset = byte_offset(text, from);
            Ok(text[offset ..]
                .find(needle.as_str())
                .map_or(NOT_FOUND, |found| ScriptValue::from_len(char_count(text, offset + found))))
        }
        "lastIndexOf" => {
            let needle = string_arg(args, 0, "undefined");
            Ok(text
                .rfind(needle.as_str())
                .map_or(NOT_FOUND, |found| ScriptValue::from_len(char_count(text, found))))
        }
        "replace" => string_replace(interp, text, args, position, false),
        "replaceAll" => string_replace(interp, text, args, position, true),
        "padStart" => string_pad(interp, text, args, position, true),
        "padEnd" => string_pad(interp, text, args, position, false),
        "charAt" => Ok(ScriptValue::string(
            to_index(number_arg(args, 0).max(0.0).trunc())
                .and_then(|index| text.chars().nth(index))
                .map(String::from)
                .unwrap_or_default(),
        )),
        "charCodeAt" => {
            let index = optional_number(args, 0).map_or(Some(0), |value| to_index(value.trunc()));
            Ok(ScriptValue::Number(
                index
                    .and_then(|index| text.chars().nth(index))
                    .map_or(f64::NAN, |ch| f64::from(ch.encode_utf16(&mut [0; 2])[0])),
            ))
        }
        "at" => {
            let chars = text.chars().collect::<Vec<_>>();
            Ok(at_index(number_arg(args, 0), chars.len())
                .map_or(ScriptValue::Undefined, |index| ScriptValue::string(chars[index].to_string())))
        }
        "repeat" => string_repeat(interp, text, args, position),
        "concat" => {
            let mut out = text.to_string();
            for value in args {
                out.push_str(&value.to_display_string());
            }
            interp.check_string_len(out.len(), position).map(|()| ScriptValue::string(out))
        }
        "localeCompare" => {
            let other = string_arg(args, 0, "undefined");
            let ordering = match text.cmp(other.as_str()) {
                Ordering::Less => -1.0,
                Ordering::Equal => 0.0,
                Ordering::Greater => 1.0,
            };
            Ok(ScriptValue::Number(ordering))
        }
        _ => return None,
    };
    Some(result)
}

/// Builds a string from a char range.
fn char_range(chars: &[char], start: usize, end: usize) -> ScriptValue {
    if start >= end {
        return ScriptValue::string("");
    }
    ScriptValue::string(chars[start .. end].iter().collect::<String>())
}

/// Byte offset of the char at `index`, clamped to the string length.
fn byte_offset(text: &str, index: usize) -> usize {
    text.char_indices().nth(index).map_or(text.len(), |(offset, _)| offset)
}

/// Number of chars before byte offset `offset`.
fn char_count(text: &str, offset: usize) -> usize {
    text.get(.. offset).map_or(0, |prefix| prefix.chars().count())
}

/// `string.split(separator, limit)`
fn string_split(interp: &mut Interpreter<'_>, text: &str, args: &[ScriptValue], position: usize) -> NativeResult {
    let limit = optional_number(args, 1).map_or(usize::MAX, |value| length_arg(value, usize::MAX));
    let parts = match args.first() {
        None | Some(ScriptValue::Undefined) => vec![ScriptValue::string(text)],
        Some(separator) => {
            let separator = separator.to_display_string();
            if separator.is_empty() {
                text.chars().take(limit).map(|ch| ScriptValue::string(ch.to_string())).collect()
            } else {
                text.split(separator.as_str()).take(limit).map(ScriptValue::string).collect()
            }
        }
    };
    let parts = parts.into_iter().take(limit).collect();
    interp.alloc_array(parts, position)
}

/// `string.replace(pattern, replacement)` and `string.replaceAll(...)`.
///
/// Patterns are literal strings. A function replacement receives
/// `(match, offset, string)`; a string replacement expands `$&` and `$$`.
fn string_replace(
    interp: &mut Interpreter<'_>,
    text: &str,
    args: &[ScriptValue],
    position: usize,
    all: bool,
) -> NativeResult {
    let pattern = string_arg(args, 0, "undefined");
    let replacement = arg(args, 1);
    let matches = text.match_indices(pattern.as_str()).map(|(offset, _)| offset).collect::<Vec<_>>();
    let matches = if all { matches } else { matches.into_iter().take(1).collect() };
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for offset in matches {
        out.push_str(&text[cursor .. offset]);
        let replaced = if matches!(replacement, ScriptValue::Function(_)) {
            interp.tick()?;
            let call_args = [
                ScriptValue::string(&pattern),
                ScriptValue::from_len(char_count(text, offset)),
                ScriptValue::string(text),
            ];
            interp.call_value(&replacement, ScriptValue::Undefined, &call_args, position)?.to_display_string()
        } else {
            replacement.to_display_string().replace("$$", "\u{0}").replace("$&", &pattern).replace('\u{0}', "$")
        };
        out.push_str(&replaced);
        interp.check_string_len(out.len(), position)?;
        cursor = offset + pattern.len();
    }
    out.push_str(&text[cursor ..]);
    interp.check_string_len(out.len(), position)?;
    Ok(ScriptValue::string(out))
}

/// `string.padStart(length, fill)` and `string.padEnd(length, fill)`.
fn string_pad(
    interp: &mut Interpreter<'_>,
    text: &str,
    args: &[ScriptValue],
    position: usize,
    at_start: bool,
) -> NativeResult {
    let target = length_arg(number_arg(args, 0), usize::MAX);
    let fill = string_arg(args, 1, " ");
    let current = text.chars().count();
    if target <= current || fill.is_empty() {
        return Ok(ScriptValue::string(text));
    }
    interp.check_string_len(target, position)?;
    let padding = fill.chars().cycle().take(target - current).collect::<String>();
    let out = if at_start { format!("{padding}{text}") } else { format!("{text}{padding}") };
    Ok(ScriptValue::string(out))
}

/// `string.repeat(count)`
fn string_repeat(interp: &mut Interpreter<'_>, text: &str, args: &[ScriptValue], position: usize) -> NativeResult {
    let count = number_arg(args, 0);
    let count = if count.is_nan() { 0.0 } else { count.trunc() };
    if count < 0.0 || count.is_infinite() {
        return Err(interp.error("RangeError", format!("Invalid count value: {}", format_number(count)), position));
    }
    let count = length_arg(count, usize::MAX);
    let total = text.len().checked_mul(count).unwrap_or(usize::MAX);
    interp.check_string_len(total, position)?;
    Ok(ScriptValue::string(text.repeat(count)))
}

/// `String.fromCharCode(...codes)`
fn string_from_char_code(
    interp: &mut Interpreter<'_>,
    _: &ScriptValue,
    args: &[ScriptValue],
    position: usize,
) -> NativeResult {
    let units = args
        .iter()
        .map(|value| u16::try_from(length_arg(value.to_number(), usize::from(u16::MAX))).unwrap_or(0))
        .collect::<Vec<_>>();
    let text = String::from_utf16_lossy(&units);
    interp.check_string_len(text.len(), position)?;
    Ok(ScriptValue::string(text))
}

// ============================================================================
// SECTION: Number Methods
// ============================================================================

/// Dispatches a number method; `None` when the name is not a builtin.
pub(crate) fn number_method(
    interp: &mut Interpreter<'_>,
    value: f64,
    name: &str,
    args: &[ScriptValue],
    position: usize,
) -> Option<NativeResult> {
    let result = match name {
        "toFixed" => {
            let digits = optional_number(args, 0).unwrap_or(0.0);
            if !(0.0 ..= 100.0).contains(&digits) {
                return Some(Err(interp.error(
                    "RangeError",
                    "toFixed() digits argument must be between 0 and 100",
                    position,
                )));
            }
            let digits = length_arg(digits, 100);
            if !value.is_finite() || value.abs() >= 1e21 {
                Ok(ScriptValue::string(format_number(value)))
            } else {
                Ok(ScriptValue::string(fixed_string(value, digits)))
            }
        }
        "toString" => {
            let radix = optional_number(args, 0).map_or(10, |radix| length_arg(radix, 37));
            if !(2 ..= 36).contains(&radix) {
                return Some(Err(interp.error(
                    "RangeError",
                    "toString() radix must be between 2 and 36",
                    position,
                )));
            }
            Ok(ScriptValue::string(radix_string(value, radix)))
        }
        "toLocaleString" => Ok(ScriptValue::string(locale_string(value))),
        "valueOf" => Ok(ScriptValue::Number(value)),
        _ => return None,
    };
    Some(result)
}

/// Digits of fraction needed to print any finite `f64` exactly.
const EXACT_FRACTION_DIGITS: usize = 1100;

/// Formats `value` with `digits` fraction digits, ties away from zero.
///
/// Rounds the exact binary value, so `1.005` (stored just below) keeps
/// `1.00` while `1.25` becomes `1.3`.
fn fixed_string(value: f64, digits: usize) -> String {
    let exact = format!("{:.*}", EXACT_FRACTION_DIGITS, value.abs());
    let (integer, fraction) = exact.split_once('.').unwrap_or((exact.as_str(), ""));
    let mut kept: Vec<u8> =
        integer.bytes().chain(fraction.bytes().take(digits)).map(|digit| digit - b'0').collect();
    let mut integer_len = integer.len();
    if fraction.as_bytes().get(digits).is_some_and(|digit| *digit >= b'5') {
        let mut carry = true;
        for digit in kept.iter_mut().rev() {
            if *digit == 9 {
                *digit = 0;
            } else {
                *digit += 1;
                carry = false;
                break;
            }
        }
        if carry {
            kept.insert(0, 1);
            integer_len += 1;
        }
    }
    let mut out = String::with_capacity(kept.len() + 2);
    if value < 0.0 {
        out.push('-');
    }
    for (index, digit) in kept.iter().enumerate() {
        if index == integer_len {
            out.push('.');
        }
        out.push(char::from(b'0' + digit));
    }
    out
}

/// `Number.isInteger(value)`
fn number_is_integer(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(matches!(args.first(), Some(ScriptValue::Number(value)) if value.is_finite() && value.fract() == 0.0)))
}

/// `Number.isSafeInteger(value)`
fn number_is_safe_integer(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(matches!(
        args.first(),
        Some(ScriptValue::Number(value)) if value.fract() == 0.0 && value.abs() <= MAX_SAFE_INTEGER
    )))
}

/// `Number.isFinite(value)`; no coercion.
fn number_is_finite(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(matches!(args.first(), Some(ScriptValue::Number(value)) if value.is_finite())))
}

/// `Number.isNaN(value)`; no coercion.
fn number_is_nan(_: &mut Interpreter<'_>, _: &ScriptValue, args: &[ScriptValue], _: usize) -> NativeResult {
    Ok(ScriptValue::Bool(matches!(args.first(), Some(ScriptValue::Number(value)) if value.is_nan())))
}

/// Formats a number in radix 2..=36.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Each digit is a non-negative integer below the radix."
)]
fn radix_string(value: f64, radix: usize) -> String {
    if radix == 10 || !value.is_finite() {
        return format_number(value);
    }
    let base = f64::from(u32::try_from(radix).unwrap_or(10));
    let digit_char = |digit: f64| char::from_digit(digit as u32, 36).unwrap_or('0');
    let mut integer = value.abs().trunc();
    let mut fraction = value.abs().fract();
    let mut digits = Vec::new();
    loop {
        digits.push(digit_char(integer % base));
        integer = (integer / base).trunc();
        if integer < 1.0 {
            break;
        }
    }
    if value < 0.0 {
        digits.push('-');
    }
    let mut out = digits.into_iter().rev().collect::<String>();
    if fraction > 0.0 {
        out.push('.');
        for _ in 0 .. 20 {
            fraction *= base;
            let digit = fraction.trunc();
            out.push(digit_char(digit));
            fraction -= digit;
            if fraction <= 0.0 {
                break;
            }
        }
    }
    out
}

/// Formats a number with en-US digit grouping and at most three decimals.
fn locale_string(value: f64) -> String {
    if !value.is_finite() {
        return format_number(value);
    }
    let fixed = format!("{:.3}", value.abs());
    let fixed = fixed.trim_end_matches('0').trim_end_matches('.');
    let (integer, fraction) = fixed.split_once('.').unwrap_or((fixed, ""));
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (index, digit) in integer.chars().enumerate() {
        if index > 0 && (integer.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && fixed != "0" { "-" } else { "" };
    if fraction.is_empty() { format!("{sign}{grouped}") } else { format!("{sign}{grouped}.{fraction}") }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp, reason = "Parsed values are exact.")]

    use super::*;

    #[test]
    fn parse_float_takes_longest_prefix() {
        assert_eq!(parse_float_prefix("  12.5px"), 12.5);
        assert_eq!(parse_float_prefix("-3e2x"), -300.0);
        assert_eq!(parse_float_prefix("1e"), 1.0);
        assert!(parse_float_prefix("px").is_nan());
    }

    #[test]
    fn parse_int_honors_radix_and_hex_prefix() {
        assert_eq!(parse_int_prefix("42abc", None), 42.0);
        assert_eq!(parse_int_prefix("0x1F", None), 31.0);
        assert_eq!(parse_int_prefix("-101", Some(2.0)), -5.0);
        assert!(parse_int_prefix("z", Some(10.0)).is_nan());
        assert!(parse_int_prefix("1", Some(40.0)).is_nan());
    }

    #[test]
    fn locale_string_groups_digits() {
        assert_eq!(locale_string(1_234_567.891_2), "1,234,567.891");
        assert_eq!(locale_string(-1000.0), "-1,000");
        assert_eq!(locale_string(0.5), "0.5");
        assert_eq!(locale_string(12.0), "12");
    }

    #[test]
    fn radix_string_formats_integers_and_fractions() {
        assert_eq!(radix_string(255.0, 16), "ff");
        assert_eq!(radix_string(-5.0, 2), "-101");
        assert_eq!(radix_string(0.5, 2), "0.1");
    }

    #[test]
    fn at_index_counts_from_end_for_negatives() {
        assert_eq!(at_index(-1.0, 3), Some(2));
        assert_eq!(at_index(3.0, 3), None);
        assert_eq!(at_index(-4.0, 3), None);
    }
}
