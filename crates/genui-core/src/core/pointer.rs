// crates/genui-core/src/core/pointer.rs
// ============================================================================
// Module: GenUI Pointer Paths
// Description: RFC 6901 pointer parsing plus get, set, remove, and enumeration.
// Purpose: Address the untyped state model and element document by slash paths.
// Dependencies: serde_json, thiserror
// ============================================================================

//! ## Overview
//! Pointer paths are the only addressing scheme in the pipeline: binding
//! references, transform dependencies, and patch operations all use them.
//! Parsing follows RFC 6901 (`~0` is `~`, `~1` is `/`) with one leniency: a
//! path without a leading slash is read as if it had one, since model output
//! frequently drops it. Array indices must be canonical decimal (`0`, `17`,
//! never `01` or `+1`).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::VecDeque;
use std::fmt;

use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Pointer parsing and mutation errors.
///
/// # Invariants
/// - Variants are stable for programmatic handling.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    /// A `~` escape was not followed by `0` or `1`.
    #[error("invalid escape in pointer: {0}")]
    InvalidEscape(String),
    /// No value exists at the pointer.
    #[error("no value at pointer: {0}")]
    NotFound(String),
    /// An array was addressed with a non-index token.
    #[error("invalid array index '{token}' in pointer {pointer}")]
    InvalidIndex {
        /// Pointer being applied.
        pointer: String,
        /// Offending token.
        token: String,
    },
    /// An array index lies past the end of the array.
    #[error("array index {index} out of bounds in pointer {pointer}")]
    IndexOutOfBounds {
        /// Pointer being applied.
        pointer: String,
        /// Requested index.
        index: usize,
    },
    /// A scalar was found where a container was needed.
    #[error("cannot descend into a scalar at pointer {0}")]
    NotAContainer(String),
    /// The operation cannot target the document root.
    #[error("operation cannot target the document root")]
    RootTarget,
}

// ============================================================================
// SECTION: Pointer
// ============================================================================

/// Parsed pointer path.
///
/// # Invariants
/// - Tokens are stored unescaped; `Display` re-escapes them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct JsonPointer {
    /// Unescaped reference tokens.
    tokens: Vec<String>,
}

impl JsonPointer {
    /// Returns the pointer addressing the whole document.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            tokens: Vec::new(),
        }
    }

    /// Parses a pointer path.
    ///
    /// # Errors
    ///
    /// Returns [`PointerError::InvalidEscape`] when a `~` escape is malformed.
    pub fn parse(path: &str) -> Result<Self, PointerError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        let body = path.strip_prefix('/').unwrap_or(path);
        let tokens = body
            .split('/')
            .map(|raw| unescape_token(raw, path))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            tokens,
        })
    }

    /// Builds a pointer from unescaped tokens.
    #[must_use]
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the unescaped tokens.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Returns true for the root pointer.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Returns a pointer extended by one token.
    #[must_use]
    pub fn child(&self, token: impl Into<String>) -> Self {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self {
            tokens,
        }
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape_token(token))?;
        }
        Ok(())
    }
}

/// Escapes a single reference token (`~` to `~0`, `/` to `~1`).
#[must_use]
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Unescapes a single reference token.
fn unescape_token(raw: &str, pointer: &str) -> Result<String, PointerError> {
    if !raw.contains('~') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return Err(PointerError::InvalidEscape(pointer.to_string())),
        }
    }
    Ok(out)
}

/// Parses a canonical decimal array index.
fn array_index(token: &str) -> Option<usize> {
    let canonical = token == "0"
        || (!token.is_empty() && !token.starts_with('0') && token.bytes().all(|b| b.is_ascii_digit()));
    if canonical { token.parse().ok() } else { None }
}

// ============================================================================
// SECTION: Lookup
// ============================================================================

/// Looks up the value at a pointer; `None` means undefined.
#[must_use]
pub fn get_by_pointer<'a>(value: &'a Value, pointer: &JsonPointer) -> Option<&'a Value> {
    let mut current = value;
    for token in pointer.tokens() {
        current = match current {
            Value::Object(map) => map.get(token)?,
            Value::Array(items) => items.get(array_index(token)?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Looks up the value at a pointer path; malformed paths resolve to `None`.
#[must_use]
pub fn get_by_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let pointer = JsonPointer::parse(path).ok()?;
    get_by_pointer(value, &pointer)
}

// ============================================================================
// SECTION: Mutation
// ============================================================================

/// How a write treats an existing array slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// Insert before the slot, shifting later elements (patch `add`).
    Insert,
    /// Overwrite the slot in place (patch `replace`).
    Overwrite,
}

/// Writes `value` at `pointer`, creating missing intermediate objects.
///
/// Nulls on the way are replaced by objects. The `-` token appends to an
/// array.
///
/// # Errors
///
/// Returns [`PointerError`] when an array index is invalid or out of bounds,
/// or when a scalar blocks the path.
pub fn set_by_path(
    root: &mut Value,
    pointer: &JsonPointer,
    value: Value,
    mode: SetMode,
) -> Result<(), PointerError> {
    let Some((last, parents)) = pointer.tokens().split_last() else {
        *root = value;
        return Ok(());
    };
    let mut current = root;
    for token in parents {
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
        current = match current {
            Value::Object(map) => {
                map.entry(token.clone()).or_insert_with(|| Value::Object(Map::new()))
            }
            Value::Array(items) => {
                let index = array_index(token).ok_or_else(|| PointerError::InvalidIndex {
                    pointer: pointer.to_string(),
                    token: token.clone(),
                })?;
                items.get_mut(index).ok_or_else(|| PointerError::IndexOutOfBounds {
                    pointer: pointer.to_string(),
                    index,
                })?
            }
            _ => return Err(PointerError::NotAContainer(pointer.to_string())),
        };
    }
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    match current {
        Value::Object(map) => {
            map.insert(last.clone(), value);
            Ok(())
        }
        Value::Array(items) => {
            if last == "-" {
                items.push(value);
                return Ok(());
            }
            let index = array_index(last).ok_or_else(|| PointerError::InvalidIndex {
                pointer: pointer.to_string(),
                token: last.clone(),
            })?;
            if index == items.len() {
                items.push(value);
                return Ok(());
            }
            if index > items.len() {
                return Err(PointerError::IndexOutOfBounds {
                    pointer: pointer.to_string(),
                    index,
                });
            }
            match mode {
                SetMode::Insert => items.insert(index, value),
                SetMode::Overwrite => {
                    if let Some(slot) = items.get_mut(index) {
                        *slot = value;
                    }
                }
            }
            Ok(())
        }
        _ => Err(PointerError::NotAContainer(pointer.to_string())),
    }
}

/// Removes and returns the value at `pointer`.
///
/// # Errors
///
/// Returns [`PointerError::NotFound`] when nothing exists at the pointer and
/// [`PointerError::RootTarget`] for the root pointer.
pub fn remove_by_path(root: &mut Value, pointer: &JsonPointer) -> Result<Value, PointerError> {
    let Some((last, parents)) = pointer.tokens().split_last() else {
        return Err(PointerError::RootTarget);
    };
    let not_found = || PointerError::NotFound(pointer.to_string());
    let mut current = root;
    for token in parents {
        current = match current {
            Value::Object(map) => map.get_mut(token).ok_or_else(not_found)?,
            Value::Array(items) => {
                items.get_mut(array_index(token).ok_or_else(not_found)?).ok_or_else(not_found)?
            }
            _ => return Err(not_found()),
        };
    }
    match current {
        Value::Object(map) => map.remove(last).ok_or_else(not_found),
        Value::Array(items) => {
            let index = array_index(last).filter(|index| *index < items.len()).ok_or_else(not_found)?;
            Ok(items.remove(index))
        }
        _ => Err(not_found()),
    }
}

// ============================================================================
// SECTION: Enumeration
// ============================================================================

/// Lists object member paths breadth-first, up to `max_depth` levels and
/// `limit` entries.
///
/// Arrays are listed as paths but not descended into, so a large tool
/// payload does not crowd out sibling namespaces.
#[must_use]
pub fn available_paths(value: &Value, max_depth: usize, limit: usize) -> Vec<String> {
    let mut paths = Vec::new();
    let mut queue = VecDeque::from([(String::new(), value, 0_usize)]);
    while let Some((prefix, node, depth)) = queue.pop_front() {
        let Value::Object(map) = node else {
            continue;
        };
        if depth >= max_depth {
            continue;
        }
        for (key, child) in map {
            if paths.len() >= limit {
                return paths;
            }
            let path = format!("{prefix}/{}", escape_token(key));
            paths.push(path.clone());
            queue.push_back((path, child, depth + 1));
        }
    }
    paths
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, reason = "Test-only assertions.")]

    use serde_json::json;

    use super::*;

    #[test]
    fn array_indices_must_be_canonical() {
        assert_eq!(array_index("0"), Some(0));
        assert_eq!(array_index("12"), Some(12));
        assert_eq!(array_index("01"), None);
        assert_eq!(array_index("+1"), None);
        assert_eq!(array_index(""), None);
        assert_eq!(array_index("-"), None);
    }

    #[test]
    fn leading_slash_is_optional() {
        let value = json!({ "tools": { "c1": [1, 2] } });
        assert_eq!(get_by_path(&value, "tools/c1/1"), Some(&json!(2)));
        assert_eq!(get_by_path(&value, "/tools/c1/1"), Some(&json!(2)));
    }

    #[test]
    fn set_creates_intermediate_objects_and_appends() {
        let mut value = json!({ "elements": { "list": { "children": ["a"] } } });
        let pointer = JsonPointer::parse("/elements/list/children/-").unwrap();
        set_by_path(&mut value, &pointer, json!("b"), SetMode::Insert).unwrap();
        let pointer = JsonPointer::parse("/elements/list/children/5").unwrap();
        let err = set_by_path(&mut value, &pointer, json!("z"), SetMode::Insert).unwrap_err();
        assert!(matches!(err, PointerError::IndexOutOfBounds { index: 5, .. }));
        let pointer = JsonPointer::parse("/state/filters/active").unwrap();
        set_by_path(&mut value, &pointer, json!(true), SetMode::Overwrite).unwrap();
        assert_eq!(value["elements"]["list"]["children"], json!(["a", "b"]));
        assert_eq!(value["state"], json!({ "filters": { "active": true } }));
    }
}
