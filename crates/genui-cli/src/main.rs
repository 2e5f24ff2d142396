// crates/genui-cli/src/main.rs
// ============================================================================
// Module: GenUI CLI Entry Point
// Description: Command dispatcher for spec resolution and transform tooling.
// Purpose: Provide a safe, localized CLI for offline resolution workflows.
// Dependencies: clap, genui-config, genui-core, genui-script, serde, thiserror.
// ============================================================================

//! ## Overview
//! The `genui` CLI runs single resolution passes over recorded UI specs and
//! tool parts, evaluates transform bodies in the sandbox, and validates
//! configuration. All user-facing strings are routed through the i18n
//! catalog. Inputs are untrusted: files are read with hard size limits and
//! every parse failure is reported rather than skipped.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use genui_cli::i18n::Locale;
use genui_cli::i18n::set_locale;
use genui_cli::t;
use genui_config::AuditSinkKind;
use genui_config::CONFIG_ENV_VAR;
use genui_config::DEFAULT_CONFIG_NAME;
use genui_config::GenuiConfig;
use genui_config::config_toml_example;
use genui_core::AuditSink;
use genui_core::FeedbackOutcome;
use genui_core::FileAuditSink;
use genui_core::NoopAuditSink;
use genui_core::PassOutcome;
use genui_core::ResolutionPipeline;
use genui_core::ResolutionSession;
use genui_core::StderrAuditSink;
use genui_core::StreamPhase;
use genui_core::parse_message_content;
use genui_script::EvalError;
use genui_script::Sandbox;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a spec, JSONL, or message input file.
const MAX_SPEC_BYTES: usize = 4 * 1024 * 1024;
/// Maximum size of a recorded tool parts file.
const MAX_PARTS_BYTES: usize = 16 * 1024 * 1024;
/// Maximum size of a transform source file.
const MAX_SOURCE_BYTES: usize = 1024 * 1024;
/// Environment variable selecting the output language.
const LANG_ENV: &str = "GENUI_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "genui", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `GENUI_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Resolve a UI spec against recorded tool parts.
    Resolve(ResolveCommand),
    /// Evaluate one transform body in the sandbox.
    Eval(EvalCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a genui configuration file.
    Validate(ConfigValidateCommand),
    /// Print the canonical example configuration.
    Example,
}

/// Arguments for `resolve`.
#[derive(Args, Debug)]
struct ResolveCommand {
    /// Spec input: a JSON document, a JSONL patch stream, or message text.
    #[arg(long, value_name = "PATH")]
    spec: PathBuf,
    /// JSON array of message parts carrying tool calls.
    #[arg(long, value_name = "PATH")]
    parts: Option<PathBuf>,
    /// Treat the stream as still open (withholds unresolved references).
    #[arg(long, action = ArgAction::SetTrue)]
    streaming: bool,
    /// Optional config file path (defaults to genui.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    format: OutputFormat,
    /// Also decide whether a correction request should be sent.
    #[arg(long, action = ArgAction::SetTrue)]
    feedback: bool,
}

/// Arguments for `eval`.
#[derive(Args, Debug)]
struct EvalCommand {
    /// Transform body, or `@PATH` to read it from a file.
    #[arg(long, value_name = "SOURCE")]
    source: String,
    /// JSON array of dependency values passed as `arguments`.
    #[arg(long, value_name = "JSON", default_value = "[]")]
    args: String,
    /// Optional config file path supplying sandbox budgets.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to genui.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Output formats for `resolve`.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Canonical JSON output.
    Json,
    /// Human-readable Markdown summary.
    Markdown,
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Resolve(command) => command_resolve(&command),
        Commands::Eval(command) => command_eval(&command),
        Commands::Config {
            command,
        } => command_config(command),
    }
}

/// Picks the output locale from the flag, then the environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Resolve Command
// ============================================================================

/// Spec document recovered from an input file.
#[derive(Debug)]
struct SpecInput {
    /// Element document.
    document: Value,
    /// Prose surrounding the patches, for message inputs.
    text: Option<String>,
    /// Patches applied while rebuilding the document.
    patches_applied: usize,
    /// Well-formed patches that failed to apply.
    patches_rejected: usize,
}

/// Serialized result of `resolve`.
#[derive(Debug, Serialize)]
struct ResolveReport<'a> {
    /// The pass outcome.
    outcome: &'a PassOutcome,
    /// Prose surrounding the patches, when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    /// Patches applied while rebuilding the document.
    patches_applied: usize,
    /// Well-formed patches that failed to apply.
    patches_rejected: usize,
    /// Feedback decision, when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<&'a FeedbackOutcome>,
}

/// Executes the `resolve` command.
fn command_resolve(command: &ResolveCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let content = read_text_input(&command.spec, &t!("input.kind.spec"), MAX_SPEC_BYTES)?;
    let input = parse_spec_input(&content, &command.spec)?;
    let parts = match &command.parts {
        Some(path) => read_parts(path)?,
        None => Vec::new(),
    };

    let pipeline =
        ResolutionPipeline::new(config.pipeline_config(), Sandbox::new(config.sandbox_limits()))
            .map_err(|err| CliError::new(t!("resolve.pipeline_failed", error = err)))?;
    let audit = build_audit_sink(&config)?;
    let mut session = ResolutionSession::new(pipeline, audit, config.feedback_policy());
    let phase = if command.streaming { StreamPhase::Streaming } else { StreamPhase::Settled };
    let outcome = session.resolve(&parts, &input.document, phase).clone();
    let feedback = command.feedback.then(|| session.request_fix());

    let report = ResolveReport {
        outcome: &outcome,
        text: input.text.as_deref(),
        patches_applied: input.patches_applied,
        patches_rejected: input.patches_rejected,
        feedback: feedback.as_ref(),
    };
    match command.format {
        OutputFormat::Json => write_json_value(&report)?,
        OutputFormat::Markdown => write_stdout_line(&render_resolve_markdown(&report)?)
            .map_err(|err| CliError::new(output_error("stdout", &err)))?,
    }
    Ok(ExitCode::SUCCESS)
}

/// Recovers the element document from a spec input.
///
/// A JSON object with `root` or `elements` is taken as the document itself;
/// anything else is parsed as message content carrying patch lines.
fn parse_spec_input(content: &str, path: &Path) -> CliResult<SpecInput> {
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(content)
        && (value.get("root").is_some() || value.get("elements").is_some())
    {
        return Ok(SpecInput {
            document: value,
            text: None,
            patches_applied: 0,
            patches_rejected: 0,
        });
    }
    let message = parse_message_content(content);
    let Some(document) = message.document else {
        return Err(CliError::new(t!("resolve.no_spec", path = path.display())));
    };
    Ok(SpecInput {
        document: document.into_value(),
        text: (!message.text.is_empty()).then_some(message.text),
        patches_applied: message.patches_applied,
        patches_rejected: message.patches_rejected,
    })
}

/// Reads a JSON array of message parts.
fn read_parts(path: &Path) -> CliResult<Vec<Value>> {
    let kind = t!("input.kind.parts");
    let content = read_text_input(path, &kind, MAX_PARTS_BYTES)?;
    let value: Value = serde_json::from_str(&content).map_err(|err| {
        CliError::new(t!("input.parse_failed", kind = kind, path = path.display(), error = err))
    })?;
    match value {
        Value::Array(parts) => Ok(parts),
        _ => Err(CliError::new(t!("input.parts_not_array", path = path.display()))),
    }
}

/// Builds the audit sink selected by configuration.
fn build_audit_sink(config: &GenuiConfig) -> CliResult<Arc<dyn AuditSink>> {
    match config.audit.sink {
        AuditSinkKind::None => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::File => {
            let path = PathBuf::from(config.audit.path.as_deref().unwrap_or_default());
            let sink = FileAuditSink::new(&path).map_err(|err| {
                CliError::new(t!("resolve.audit_failed", path = path.display(), error = err))
            })?;
            Ok(Arc::new(sink))
        }
    }
}

/// Renders a resolve report as Markdown.
fn render_resolve_markdown(report: &ResolveReport<'_>) -> CliResult<String> {
    let outcome = report.outcome;
    let mut lines = vec![
        t!("resolve.md.title"),
        String::new(),
        t!("resolve.md.phase", phase = outcome.phase.as_str()),
        t!("resolve.md.elements", count = outcome.element_count()),
        t!(
            "resolve.md.tools",
            count = outcome.tool_calls.len(),
            active = outcome.active_tool_calls().len()
        ),
        t!("resolve.md.withheld", count = outcome.withheld_references),
    ];
    if let Some(digest) = &outcome.digest {
        lines.push(t!("resolve.md.digest", digest = digest));
    }
    if report.patches_applied + report.patches_rejected > 0 {
        lines.push(t!(
            "resolve.md.patches",
            applied = report.patches_applied,
            rejected = report.patches_rejected
        ));
    }

    lines.push(String::new());
    if outcome.is_clean() {
        lines.push(t!("resolve.md.clean"));
    } else {
        lines.push(t!("resolve.md.diagnostics"));
        for diagnostic in &outcome.diagnostics {
            lines.push(t!(
                "resolve.md.diagnostic",
                key = diagnostic.key,
                kind = diagnostic.kind.as_str(),
                message = diagnostic.message
            ));
        }
    }

    if !outcome.transforms.is_empty() {
        lines.push(String::new());
        lines.push(t!("resolve.md.transforms"));
        for (key, status) in &outcome.transforms {
            lines.push(t!("resolve.md.transform", key = key, status = status.label()));
        }
    }

    if let Some(feedback) = report.feedback {
        lines.push(String::new());
        lines.push(t!("resolve.md.feedback"));
        match feedback.request() {
            Some(request) => {
                lines.push(String::new());
                lines.push("```text".to_string());
                lines.push(request.message.clone());
                lines.push("```".to_string());
            }
            None => lines.push(t!("resolve.md.feedback_skipped", decision = feedback.label())),
        }
    }

    let spec = serde_json::to_string_pretty(&outcome.spec)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    lines.push(String::new());
    lines.push(t!("resolve.md.spec"));
    lines.push(String::new());
    lines.push("```json".to_string());
    lines.push(spec);
    lines.push("```".to_string());
    Ok(lines.join("\n"))
}

// ============================================================================
// SECTION: Eval Command
// ============================================================================

/// Serialized result of `eval`.
#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
enum EvalReport {
    /// The body returned a value.
    Defined {
        /// Returned value.
        value: Value,
    },
    /// The body returned nothing.
    Undefined,
}

/// Executes the `eval` command.
fn command_eval(command: &EvalCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_deref())?;
    let source = match command.source.strip_prefix('@') {
        Some(path) => {
            read_text_input(Path::new(path), &t!("input.kind.source"), MAX_SOURCE_BYTES)?
        }
        None => command.source.clone(),
    };
    let args: Vec<Value> = serde_json::from_str(&command.args)
        .map_err(|err| CliError::new(t!("input.args_invalid", error = err)))?;

    let sandbox = Sandbox::new(config.sandbox_limits());
    let report = match sandbox.evaluate(&source, &args) {
        Ok(Some(value)) => EvalReport::Defined {
            value,
        },
        Ok(None) => EvalReport::Undefined,
        Err(err) => return Err(CliError::new(describe_eval_error(&err, &source))),
    };
    write_json_value(&report)?;
    Ok(ExitCode::SUCCESS)
}

/// Formats a sandbox failure with its position and call frames.
fn describe_eval_error(err: &EvalError, source: &str) -> String {
    let (line, column) = err.line_column(source);
    let mut message = t!(
        "eval.failed",
        name = err.name,
        line = line,
        column = column,
        message = err.message
    );
    for frame in &err.stack {
        message.push('\n');
        message.push_str(&t!("eval.frame", frame = frame));
    }
    message
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_bytes(config_toml_example().as_bytes())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = GenuiConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(t!("config.load_failed", error = err)))?;
    write_stdout_line(&t!("config.validate.ok"))
        .map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration, falling back to defaults when none is present.
///
/// Defaults apply only when no path was given, the environment override is
/// unset, and the default file does not exist.
fn load_config(path: Option<&Path>) -> CliResult<GenuiConfig> {
    let implicit = path.is_none()
        && std::env::var_os(CONFIG_ENV_VAR).is_none()
        && !Path::new(DEFAULT_CONFIG_NAME).exists();
    if implicit {
        return Ok(GenuiConfig::default());
    }
    GenuiConfig::load(path).map_err(|err| CliError::new(t!("config.load_failed", error = err)))
}

// ============================================================================
// SECTION: Input Helpers
// ============================================================================

/// Errors returned by bounded file reads.
#[derive(Debug)]
enum ReadLimitError {
    /// File I/O failure.
    Io(std::io::Error),
    /// File size exceeds the configured limit.
    TooLarge {
        /// Actual size in bytes.
        size: u64,
        /// Allowed limit in bytes.
        limit: usize,
    },
}

/// Reads a file from disk while enforcing a hard size limit.
fn read_bytes_with_limit(path: &Path, max_bytes: usize) -> Result<Vec<u8>, ReadLimitError> {
    let file = File::open(path).map_err(ReadLimitError::Io)?;
    let size = file.metadata().map_err(ReadLimitError::Io)?.len();
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if size > limit {
        return Err(ReadLimitError::TooLarge {
            size,
            limit: max_bytes,
        });
    }

    let mut bytes = Vec::new();
    file.take(limit.saturating_add(1)).read_to_end(&mut bytes).map_err(ReadLimitError::Io)?;
    if bytes.len() > max_bytes {
        return Err(ReadLimitError::TooLarge {
            size: u64::try_from(bytes.len()).unwrap_or(u64::MAX),
            limit: max_bytes,
        });
    }
    Ok(bytes)
}

/// Reads a UTF-8 text input with a size limit and localized errors.
fn read_text_input(path: &Path, kind: &str, max_bytes: usize) -> CliResult<String> {
    let bytes = read_bytes_with_limit(path, max_bytes).map_err(|err| match err {
        ReadLimitError::Io(err) => CliError::new(t!(
            "input.read_failed",
            kind = kind,
            path = path.display(),
            error = err
        )),
        ReadLimitError::TooLarge {
            size,
            limit,
        } => CliError::new(t!(
            "input.read_too_large",
            kind = kind,
            path = path.display(),
            size = size,
            limit = limit
        )),
    })?;
    String::from_utf8(bytes)
        .map_err(|_| CliError::new(t!("input.not_utf8", kind = kind, path = path.display())))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a value as canonical JSON followed by a newline.
fn write_json_value<T: Serialize>(value: &T) -> CliResult<()> {
    let mut bytes = serde_jcs::to_vec(value)
        .map_err(|err| CliError::new(t!("output.json_failed", error = err)))?;
    bytes.push(b'\n');
    write_stdout_bytes(&bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized stream write failure.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = label, error = error)
}

/// Prints an error and returns the failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
