// crates/genui-script/src/value.rs
// ============================================================================
// Module: Script Values
// Description: Runtime value model and coercion rules for scripts.
// Purpose: Represent script data and convert between scripts and JSON.
// Dependencies: serde_json, crate::ast, crate::interpreter
// ============================================================================

//! ## Overview
//! Values follow the loose typing rules model-authored data code expects:
//! truthiness, numeric and string coercion, strict and loose equality.
//! Arrays and objects are shared, mutable references; objects keep keys in
//! sorted order, matching how JSON objects are stored on the host side.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Number;
use serde_json::Value;

use crate::ast::FunctionDef;
use crate::interpreter::Interpreter;
use crate::interpreter::ScopeRef;
use crate::interpreter::Unwind;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Shared, mutable array storage.
pub(crate) type ArrayRef = Rc<RefCell<Vec<ScriptValue>>>;
/// Object properties in insertion order.
pub(crate) type Entries = IndexMap<String, ScriptValue>;
/// Shared, mutable object storage.
pub(crate) type ObjectRef = Rc<RefCell<Entries>>;

/// Host-implemented function: interpreter, receiver, arguments, call offset.
pub(crate) type NativeFn =
    fn(&mut Interpreter<'_>, &ScriptValue, &[ScriptValue], usize) -> Result<ScriptValue, Unwind>;

/// Callable value.
pub(crate) enum Callable {
    /// Script-defined function with its captured scope.
    Closure {
        /// Parsed definition.
        def: Arc<FunctionDef>,
        /// Scope captured at creation.
        scope: ScopeRef,
    },
    /// Host builtin.
    Native {
        /// Name shown in errors and `String(fn)`.
        name: &'static str,
        /// Implementation.
        func: NativeFn,
    },
}

impl Callable {
    /// Returns the function name used in diagnostics.
    pub(crate) fn name(&self) -> &str {
        match self {
            Self::Closure {
                def, ..
            } => def.name.as_deref().unwrap_or("<anonymous>"),
            Self::Native {
                name, ..
            } => name,
        }
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Function: {}]", self.name())
    }
}

/// Runtime value.
#[derive(Debug, Clone)]
pub(crate) enum ScriptValue {
    /// `undefined`
    Undefined,
    /// `null`
    Null,
    /// Boolean.
    Bool(bool),
    /// IEEE-754 number.
    Number(f64),
    /// Immutable string.
    Str(Rc<str>),
    /// Array reference.
    Array(ArrayRef),
    /// Object reference.
    Object(ObjectRef),
    /// Function reference.
    Function(Rc<Callable>),
}

// ============================================================================
// SECTION: Constructors
// ============================================================================

impl ScriptValue {
    /// Creates a string value.
    pub(crate) fn string(value: impl AsRef<str>) -> Self {
        Self::Str(Rc::from(value.as_ref()))
    }

    /// Creates a native function value.
    pub(crate) fn native(name: &'static str, func: NativeFn) -> Self {
        Self::Function(Rc::new(Callable::Native {
            name,
            func,
        }))
    }

    /// Creates a number from a length or index.
    #[allow(clippy::cast_precision_loss, reason = "Collection lengths stay far below 2^53.")]
    pub(crate) const fn from_len(len: usize) -> Self {
        Self::Number(len as f64)
    }
}

// ============================================================================
// SECTION: Coercion
// ============================================================================

/// Maximum nesting followed when stringifying nested arrays.
const MAX_STRINGIFY_DEPTH: usize = 32;

impl ScriptValue {
    /// Returns true for `null` and `undefined`.
    pub(crate) const fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    /// Truthiness.
    pub(crate) fn truthy(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Bool(value) => *value,
            Self::Number(value) => *value != 0.0 && !value.is_nan(),
            Self::Str(value) => !value.is_empty(),
            Self::Array(_) | Self::Object(_) | Self::Function(_) => true,
        }
    }

    /// Numeric coercion.
    pub(crate) fn to_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Object(_) | Self::Function(_) => f64::NAN,
            Self::Null => 0.0,
            Self::Bool(value) => f64::from(u8::from(*value)),
            Self::Number(value) => *value,
            Self::Str(value) => parse_numeric_string(value),
            Self::Array(_) => parse_numeric_string(&self.to_display_string()),
        }
    }

    /// String coercion.
    pub(crate) fn to_display_string(&self) -> String {
        self.display_with_depth(0)
    }

    /// String coercion bounded by nesting depth.
    fn display_with_depth(&self, depth: usize) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => format_number(*value),
            Self::Str(value) => value.to_string(),
            Self::Array(items) => {
                if depth >= MAX_STRINGIFY_DEPTH {
                    return String::new();
                }
                let Ok(items) = items.try_borrow() else {
                    return String::new();
                };
                items
                    .iter()
                    .map(|item| {
                        if item.is_nullish() { String::new() } else { item.display_with_depth(depth + 1) }
                    })
                    .collect::<Vec<_>>()
                    .join(",")
            }
            Self::Object(_) => "[object Object]".to_string(),
            Self::Function(callable) => format!("function {}() {{ [native code] }}", callable.name()),
        }
    }

    /// Returns the `typeof` label.
    pub(crate) const fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::Array(_) | Self::Object(_) => "object",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::Str(_) => "string",
            Self::Function(_) => "function",
        }
    }

    /// Describes the value's shape for error messages.
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Undefined => "undefined".to_string(),
            Self::Null => "null".to_string(),
            Self::Array(_) => "array".to_string(),
            Self::Str(value) => format!("\"{value}\""),
            Self::Number(value) => format_number(*value),
            other => other.type_of().to_string(),
        }
    }

    /// Converts to a property key.
    pub(crate) fn to_property_key(&self) -> String {
        self.to_display_string()
    }

    /// Returns true when the value is a string or becomes one under `+`.
    pub(crate) const fn is_string_like(&self) -> bool {
        matches!(self, Self::Str(_) | Self::Array(_) | Self::Object(_) | Self::Function(_))
    }
}

// ============================================================================
// SECTION: Equality
// ============================================================================

impl ScriptValue {
    /// `===` semantics.
    pub(crate) fn strict_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => same_number(*a, *b),
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => Rc::ptr_eq(a, b),
            (Self::Object(a), Self::Object(b)) => Rc::ptr_eq(a, b),
            (Self::Function(a), Self::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// `==` semantics.
    pub(crate) fn loose_equals(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Self::Number(_), Self::Str(_) | Self::Bool(_))
            | (Self::Str(_) | Self::Bool(_), Self::Number(_))
            | (Self::Bool(_), Self::Str(_) | Self::Bool(_))
            | (Self::Str(_), Self::Bool(_)) => same_number(self.to_number(), other.to_number()),
            (Self::Array(_) | Self::Object(_), Self::Str(_) | Self::Number(_) | Self::Bool(_))
            | (Self::Str(_) | Self::Number(_) | Self::Bool(_), Self::Array(_) | Self::Object(_)) => {
                let left = if matches!(self, Self::Array(_) | Self::Object(_)) {
                    Self::string(self.to_display_string())
                } else {
                    self.clone()
                };
                let right = if matches!(other, Self::Array(_) | Self::Object(_)) {
                    Self::string(other.to_display_string())
                } else {
                    other.clone()
                };
                left.loose_equals(&right)
            }
            _ => self.strict_equals(other),
        }
    }

    /// `SameValueZero` semantics (used by `includes`).
    pub(crate) fn same_value_zero(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Number(a), Self::Number(b)) if a.is_nan() && b.is_nan() => true,
            _ => self.strict_equals(other),
        }
    }
}

/// Compares two numbers with IEEE semantics.
#[allow(clippy::float_cmp, reason = "Script equality is exact IEEE comparison.")]
fn same_number(a: f64, b: f64) -> bool {
    a == b
}

// ============================================================================
// SECTION: Number Formatting
// ============================================================================

/// Formats a number the way scripts print it.
#[must_use]
pub(crate) fn format_number(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() };
    }
    if value == 0.0 {
        return "0".to_string();
    }
    let magnitude = value.abs();
    if (1e-6 .. 1e21).contains(&magnitude) {
        if value.fract() == 0.0 {
            return format!("{value:.0}");
        }
        return format!("{value}");
    }
    let exponential = format!("{value:e}");
    match exponential.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exponential,
    }
}

/// Parses a string under numeric coercion rules.
pub(crate) fn parse_numeric_string(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    let lower = trimmed.to_ascii_lowercase();
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        if let Some(digits) = lower.strip_prefix(prefix) {
            return parse_integer_digits(digits, radix).unwrap_or(f64::NAN);
        }
    }
    let valid = trimmed.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !valid {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// Parses integer digits in the given radix; `None` when any digit is invalid.
pub(crate) fn parse_integer_digits(digits: &str, radix: u32) -> Option<f64> {
    if digits.is_empty() {
        return None;
    }
    let mut value = 0.0_f64;
    for ch in digits.chars() {
        let digit = ch.to_digit(radix)?;
        value = value.mul_add(f64::from(radix), f64::from(digit));
    }
    Some(value)
}

/// Converts a number to an array index when it is a non-negative integer.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "Value is checked to be a non-negative integer below 2^32."
)]
pub(crate) fn to_index(value: f64) -> Option<usize> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value < 4_294_967_295.0 {
        Some(value as usize)
    } else {
        None
    }
}

/// Converts a number to a signed integer, truncating toward zero and saturating.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float-to-int casts saturate; NaN maps to zero as integer coercion requires."
)]
pub(crate) fn to_integer(value: f64) -> i64 {
    if value.is_nan() { 0 } else { value.trunc() as i64 }
}

/// Resolves a relative index (negative counts from the end) into `0..=len`.
pub(crate) fn relative_index(value: f64, len: usize) -> usize {
    let len_i = i64::try_from(len).unwrap_or(i64::MAX);
    let raw = if value == f64::NEG_INFINITY { i64::MIN } else { to_integer(value) };
    let resolved = if raw < 0 { len_i.saturating_add(raw).max(0) } else { raw.min(len_i) };
    usize::try_from(resolved).unwrap_or(0)
}

// ============================================================================
// SECTION: JSON Bridge
// ============================================================================

/// Outcome of exporting a script value to JSON.
pub(crate) enum JsonExport {
    /// Exported JSON value.
    Value(Value),
    /// The value has no JSON form (`undefined`, functions).
    Absent,
}

/// Exports a script value to JSON.
///
/// `undefined` and functions become [`JsonExport::Absent`]; inside objects
/// such members are dropped and inside arrays they become `null`. Non-finite
/// numbers become `null`.
///
/// # Errors
///
/// Returns an error message when the value is cyclic or nested deeper than
/// `max_depth`.
pub(crate) fn export_json(value: &ScriptValue, max_depth: usize) -> Result<JsonExport, String> {
    export_with_depth(value, 0, max_depth)
}

/// Recursive JSON export.
fn export_with_depth(
    value: &ScriptValue,
    depth: usize,
    max_depth: usize,
) -> Result<JsonExport, String> {
    if depth > max_depth {
        return Err("value is cyclic or nested too deeply to convert to JSON".to_string());
    }
    let exported = match value {
        ScriptValue::Undefined | ScriptValue::Function(_) => return Ok(JsonExport::Absent),
        ScriptValue::Null => Value::Null,
        ScriptValue::Bool(value) => Value::Bool(*value),
        ScriptValue::Number(value) => number_to_json(*value),
        ScriptValue::Str(value) => Value::String(value.to_string()),
        ScriptValue::Array(items) => {
            let items = items.try_borrow().map_err(|_| "array is being modified".to_string())?;
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                match export_with_depth(item, depth + 1, max_depth)? {
                    JsonExport::Value(value) => out.push(value),
                    JsonExport::Absent => out.push(Value::Null),
                }
            }
            Value::Array(out)
        }
        ScriptValue::Object(entries) => {
            let entries = entries.try_borrow().map_err(|_| "object is being modified".to_string())?;
            let mut out = serde_json::Map::new();
            for (key, item) in entries.iter() {
                if let JsonExport::Value(value) = export_with_depth(item, depth + 1, max_depth)? {
                    out.insert(key.clone(), value);
                }
            }
            Value::Object(out)
        }
    };
    Ok(JsonExport::Value(exported))
}

/// Converts a finite number to the narrowest JSON number; non-finite becomes `null`.
#[allow(
    clippy::cast_possible_truncation,
    reason = "Integral values below 2^53 convert to i64 exactly."
)]
pub(crate) fn number_to_json(value: f64) -> Value {
    if !value.is_finite() {
        return Value::Null;
    }
    if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 {
        return Value::Number(Number::from(value as i64));
    }
    Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Reads a JSON number as a float.
pub(crate) fn json_number(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}
