// crates/genui-cli/src/i18n.rs
// ============================================================================
// Module: CLI Internationalization Helpers
// Description: Message catalog and translation utilities for the CLI.
// Purpose: Centralize user-facing strings so every locale stays in step.
// Dependencies: std
// ============================================================================

//! ## Overview
//! The `genui` CLI stores user-facing strings in a small translation catalog.
//! All runtime output is routed through the [`t!`](crate::t) macro.
//!
//! ## Invariants
//! - The catalog is initialized once and read-only thereafter.
//! - Missing keys fall back to English and then to the key itself.
//! - Placeholder substitutions preserve deterministic order.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Supported CLI locales.
///
/// # Invariants
/// - [`Locale::En`] is the default fallback locale.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Locale {
    /// English (default).
    En,
    /// Catalan.
    Ca,
}

impl Locale {
    /// Returns the canonical locale label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Ca => "ca",
        }
    }

    /// Parses a locale value, ignoring case and region tags.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.split(['-', '_']).next() {
            Some("en") => Some(Self::En),
            Some("ca") => Some(Self::Ca),
            _ => None,
        }
    }
}

/// Ordered list of supported CLI locales.
pub const SUPPORTED_LOCALES: &[Locale] = &[Locale::En, Locale::Ca];

/// A formatted message argument captured by the [`macro@crate::t`] macro.
#[derive(Clone)]
pub struct MessageArg {
    /// Placeholder name without braces.
    pub key: &'static str,
    /// Preformatted substitution value.
    pub value: String,
}

impl MessageArg {
    /// Constructs a new [`MessageArg`].
    pub fn new(key: &'static str, value: impl Into<String>) -> Self {
        Self {
            key,
            value: value.into(),
        }
    }
}

// ============================================================================
// SECTION: Locale Selection
// ============================================================================

/// Global locale selection for CLI output.
static CURRENT_LOCALE: OnceLock<Locale> = OnceLock::new();

/// Sets the CLI locale. Only the first call wins.
pub fn set_locale(locale: Locale) {
    let _ = CURRENT_LOCALE.set(locale);
}

/// Returns the current CLI locale (defaults to English).
#[must_use]
pub fn current_locale() -> Locale {
    CURRENT_LOCALE.get().copied().unwrap_or(Locale::En)
}

// ============================================================================
// SECTION: Catalog
// ============================================================================

/// English catalog entries.
const CATALOG_EN: &[(&str, &str)] = &[
    ("main.version", "genui {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "output"),
    ("output.write_failed", "Failed to write to {stream}: {error}"),
    ("output.json_failed", "Failed to serialize output: {error}"),
    (
        "input.read_too_large",
        "Refusing to read {kind} at {path} because it is {size} bytes (limit {limit}).",
    ),
    ("input.read_failed", "Failed to read {kind} at {path}: {error}"),
    ("input.not_utf8", "The {kind} at {path} is not valid UTF-8."),
    ("input.parse_failed", "Failed to parse {kind} at {path}: {error}"),
    ("input.kind.spec", "UI spec"),
    ("input.kind.parts", "tool parts"),
    ("input.kind.source", "transform source"),
    ("input.parts_not_array", "Tool parts at {path} must be a JSON array."),
    ("input.args_invalid", "Transform arguments must be a JSON array: {error}"),
    ("config.load_failed", "Failed to load config: {error}"),
    ("config.validate.ok", "Config validated successfully."),
    ("resolve.no_spec", "No UI spec found in {path}."),
    ("resolve.pipeline_failed", "Failed to build the resolution pipeline: {error}"),
    ("resolve.audit_failed", "Failed to open the audit log at {path}: {error}"),
    ("resolve.md.title", "## Resolution pass"),
    ("resolve.md.phase", "- Phase: {phase}"),
    ("resolve.md.elements", "- Elements: {count}"),
    ("resolve.md.tools", "- Tool calls: {count} ({active} running)"),
    ("resolve.md.withheld", "- Withheld references: {count}"),
    ("resolve.md.digest", "- Digest: `{digest}`"),
    ("resolve.md.patches", "- Patches: {applied} applied, {rejected} rejected"),
    ("resolve.md.clean", "No diagnostics."),
    ("resolve.md.diagnostics", "### Diagnostics"),
    ("resolve.md.diagnostic", "- `{key}` ({kind}): {message}"),
    ("resolve.md.transforms", "### Transforms"),
    ("resolve.md.transform", "- `{key}`: {status}"),
    ("resolve.md.feedback", "### Correction request"),
    ("resolve.md.feedback_skipped", "No correction request ({decision})."),
    ("resolve.md.spec", "### Resolved spec"),
    ("eval.failed", "{name} at line {line}, column {column}: {message}"),
    ("eval.frame", "    at {frame}"),
    ("i18n.lang.invalid_env", "Invalid value for {env}: {value}. Expected 'en' or 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Note: non-English output is machine-translated and may be inaccurate.",
    ),
];

/// Catalan catalog entries.
const CATALOG_CA: &[(&str, &str)] = &[
    ("main.version", "genui {version}"),
    ("output.stream.stdout", "stdout"),
    ("output.stream.stderr", "stderr"),
    ("output.stream.unknown", "sortida"),
    ("output.write_failed", "No s'ha pogut escriure a {stream}: {error}"),
    ("output.json_failed", "No s'ha pogut serialitzar la sortida: {error}"),
    (
        "input.read_too_large",
        "No es llegirà {kind} a {path} perquè ocupa {size} bytes (límit {limit}).",
    ),
    ("input.read_failed", "No s'ha pogut llegir {kind} a {path}: {error}"),
    ("input.not_utf8", "El fitxer {kind} a {path} no és UTF-8 vàlid."),
    ("input.parse_failed", "No s'ha pogut analitzar {kind} a {path}: {error}"),
    ("input.kind.spec", "especificació d'IU"),
    ("input.kind.parts", "parts d'eines"),
    ("input.kind.source", "codi de transformació"),
    ("input.parts_not_array", "Les parts d'eines a {path} han de ser un array JSON."),
    ("input.args_invalid", "Els arguments de la transformació han de ser un array JSON: {error}"),
    ("config.load_failed", "No s'ha pogut carregar la configuració: {error}"),
    ("config.validate.ok", "La configuració s'ha validat correctament."),
    ("resolve.no_spec", "No s'ha trobat cap especificació d'IU a {path}."),
    ("resolve.pipeline_failed", "No s'ha pogut construir el procés de resolució: {error}"),
    ("resolve.audit_failed", "No s'ha pogut obrir el registre d'auditoria a {path}: {error}"),
    ("resolve.md.title", "## Passada de resolució"),
    ("resolve.md.phase", "- Fase: {phase}"),
    ("resolve.md.elements", "- Elements: {count}"),
    ("resolve.md.tools", "- Crides a eines: {count} ({active} en curs)"),
    ("resolve.md.withheld", "- Referències retingudes: {count}"),
    ("resolve.md.digest", "- Resum: `{digest}`"),
    ("resolve.md.patches", "- Pedaços: {applied} aplicats, {rejected} rebutjats"),
    ("resolve.md.clean", "Cap diagnòstic."),
    ("resolve.md.diagnostics", "### Diagnòstics"),
    ("resolve.md.diagnostic", "- `{key}` ({kind}): {message}"),
    ("resolve.md.transforms", "### Transformacions"),
    ("resolve.md.transform", "- `{key}`: {status}"),
    ("resolve.md.feedback", "### Sol·licitud de correcció"),
    ("resolve.md.feedback_skipped", "Cap sol·licitud de correcció ({decision})."),
    ("resolve.md.spec", "### Especificació resolta"),
    ("eval.failed", "{name} a la línia {line}, columna {column}: {message}"),
    ("eval.frame", "    a {frame}"),
    ("i18n.lang.invalid_env", "Valor no vàlid per a {env}: {value}. S'esperava 'en' o 'ca'."),
    (
        "i18n.disclaimer.machine_translated",
        "Nota: la sortida que no és en anglès està traduïda automàticament i pot ser inexacta.",
    ),
];

/// Returns the raw catalog entries for a locale, in declaration order.
#[must_use]
pub const fn catalog_entries_for(locale: Locale) -> &'static [(&'static str, &'static str)] {
    match locale {
        Locale::En => CATALOG_EN,
        Locale::Ca => CATALOG_CA,
    }
}

/// Returns the message catalog for the requested locale.
pub(crate) fn catalog_for(locale: Locale) -> &'static HashMap<&'static str, &'static str> {
    static CATALOG_EN_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    static CATALOG_CA_MAP: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    match locale {
        Locale::En => CATALOG_EN_MAP.get_or_init(|| CATALOG_EN.iter().copied().collect()),
        Locale::Ca => CATALOG_CA_MAP.get_or_init(|| CATALOG_CA.iter().copied().collect()),
    }
}

// ============================================================================
// SECTION: Translation
// ============================================================================

/// Translates `key` using the selected locale while substituting `args`.
#[must_use]
pub fn translate(key: &str, args: Vec<MessageArg>) -> String {
    let template = catalog_for(current_locale())
        .get(key)
        .copied()
        .or_else(|| catalog_for(Locale::En).get(key).copied())
        .unwrap_or(key);
    let mut result = template.to_string();
    for arg in args {
        result = result.replace(&format!("{{{}}}", arg.key), &arg.value);
    }
    result
}

// ============================================================================
// SECTION: Macro
// ============================================================================

/// Formats a localized message from a key and named arguments.
///
/// Named arguments are substituted into `{placeholder}` positions.
#[macro_export]
macro_rules! t {
    ($key:literal $(, $name:ident = $value:expr )* $(,)?) => {{
        let args = ::std::vec![
            $(
                $crate::i18n::MessageArg::new(stringify!($name), $value.to_string()),
            )*
        ];
        $crate::i18n::translate($key, args)
    }};
}
