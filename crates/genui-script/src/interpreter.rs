// crates/genui-script/src/interpreter.rs
// ============================================================================
// Module: Script Interpreter
// Description: Tree-walking evaluator for compiled transform programs.
// Purpose: Run untrusted function bodies under step, depth, and size budgets.
// Dependencies: serde_json, smallvec, crate::{ast, builtins, error, value}
// ============================================================================

//! ## Overview
//! An [`Interpreter`] lives for exactly one evaluation. It owns the global
//! scope, the call stack used for stack traces, and a registry of every array,
//! object, and scope it allocated. Dropping the interpreter clears those
//! allocations, which breaks any reference cycles the script created.
//!
//! Budgets:
//! - every statement and expression consumes one step;
//! - evaluator recursion and script call depth are capped;
//! - string and array growth is capped.
//!
//! Exceeding a budget raises a limit error that scripts cannot catch.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::cell::Ref;
use std::cell::RefCell;
use std::cell::RefMut;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;
use smallvec::SmallVec;

use crate::ast::AssignOp;
use crate::ast::BinaryOp;
use crate::ast::DeclKind;
use crate::ast::Element;
use crate::ast::Expr;
use crate::ast::ExprKind;
use crate::ast::FunctionBody;
use crate::ast::FunctionDef;
use crate::ast::LogicalOp;
use crate::ast::Pattern;
use crate::ast::Program;
use crate::ast::PropKey;
use crate::ast::Property;
use crate::ast::Stmt;
use crate::ast::TemplatePart;
use crate::ast::UnaryOp;
use crate::builtins;
use crate::error::EvalError;
use crate::error::EvalErrorKind;
use crate::sandbox::SandboxLimits;
use crate::value::ArrayRef;
use crate::value::Callable;
use crate::value::Entries;
use crate::value::JsonExport;
use crate::value::ObjectRef;
use crate::value::ScriptValue;
use crate::value::export_json;
use crate::value::json_number;
use crate::value::to_index;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum nesting depth accepted when importing or exporting JSON.
pub(crate) const MAX_JSON_DEPTH: usize = 128;

/// Registry size that triggers the first unreachable-allocation sweep.
const MIN_SWEEP_THRESHOLD: usize = 1024;

/// Argument list storage; most calls pass few arguments.
pub(crate) type Args = SmallVec<[ScriptValue; 4]>;

// ============================================================================
// SECTION: Scopes
// ============================================================================

/// Shared scope handle.
pub(crate) type ScopeRef = Rc<Scope>;

/// Variable binding.
struct Binding {
    /// Current value.
    value: ScriptValue,
    /// False for `const` bindings.
    mutable: bool,
}

/// Lexical scope.
pub(crate) struct Scope {
    /// Bindings declared in this scope.
    vars: RefCell<HashMap<String, Binding>>,
    /// Enclosing scope.
    parent: Option<ScopeRef>,
    /// True for function (and program) scopes, which receive `var` bindings.
    function: bool,
}

/// Reasons an assignment to a binding can fail.
enum AssignFailure {
    /// No binding with that name exists.
    Undeclared,
    /// The binding is `const`.
    Constant,
}

impl Scope {
    /// Looks a name up through the scope chain.
    fn lookup(&self, name: &str) -> Option<ScriptValue> {
        if let Some(binding) = self.vars.borrow().get(name) {
            return Some(binding.value.clone());
        }
        let mut current = self.parent.clone();
        while let Some(scope) = current {
            if let Some(binding) = scope.vars.borrow().get(name) {
                return Some(binding.value.clone());
            }
            current = scope.parent.clone();
        }
        None
    }

    /// Declares (or redeclares) a binding in this scope.
    fn declare(&self, name: &str, value: ScriptValue, mutable: bool) {
        self.vars.borrow_mut().insert(
            name.to_string(),
            Binding {
                value,
                mutable,
            },
        );
    }

    /// Assigns to the nearest binding with this name.
    fn assign(&self, name: &str, value: ScriptValue) -> Result<(), AssignFailure> {
        if let Some(binding) = self.vars.borrow_mut().get_mut(name) {
            if !binding.mutable {
                return Err(AssignFailure::Constant);
            }
            binding.value = value;
            return Ok(());
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => Err(AssignFailure::Undeclared),
        }
    }
}

/// Returns the nearest function scope.
fn function_scope(scope: &ScopeRef) -> ScopeRef {
    let mut current = Rc::clone(scope);
    while !current.function {
        let Some(parent) = current.parent.clone() else {
            break;
        };
        current = parent;
    }
    current
}

// ============================================================================
// SECTION: Control Flow
// ============================================================================

/// Non-local exits from evaluation.
pub(crate) enum Unwind {
    /// Host-raised error.
    Error(EvalError),
    /// Script `throw`.
    Throw {
        /// Thrown value.
        value: ScriptValue,
        /// Offset of the throw.
        position: usize,
        /// Call frames at the throw.
        stack: Vec<String>,
    },
    /// Optional chain hit a nullish receiver.
    ShortCircuit,
}

impl From<EvalError> for Unwind {
    fn from(error: EvalError) -> Self {
        Self::Error(error)
    }
}

/// Statement completion.
enum Completion {
    /// Fell through.
    Normal,
    /// `return`
    Return(ScriptValue),
    /// `break`
    Break,
    /// `continue`
    Continue,
}

/// Resolved assignment target.
enum Reference {
    /// Named binding.
    Binding(String),
    /// Property on a value.
    Property(ScriptValue, ScriptValue),
}

/// Call stack entry.
struct Frame {
    /// Function name.
    name: String,
    /// Offset of the call site.
    position: usize,
}

/// Registered allocation.
///
/// The registry owns a strong handle to every container so that releasing a
/// deeply nested structure never recurses: contents are cleared first and
/// each child is released by its own registry entry.
enum HeapRef {
    /// Array allocation.
    Array(ArrayRef),
    /// Object allocation.
    Object(ObjectRef),
    /// Scope allocation.
    Scope(ScopeRef),
}

impl HeapRef {
    /// Returns true when only the registry still holds the allocation.
    fn is_unreachable(&self) -> bool {
        match self {
            Self::Array(array) => Rc::strong_count(array) == 1,
            Self::Object(object) => Rc::strong_count(object) == 1,
            Self::Scope(scope) => Rc::strong_count(scope) == 1,
        }
    }

    /// Empties the allocation; returns false when it is currently borrowed.
    fn clear(&self) -> bool {
        match self {
            Self::Array(array) => array.try_borrow_mut().map(|mut items| items.clear()).is_ok(),
            Self::Object(object) => {
                object.try_borrow_mut().map(|mut entries| entries.clear()).is_ok()
            }
            Self::Scope(scope) => scope.vars.try_borrow_mut().map(|mut vars| vars.clear()).is_ok(),
        }
    }
}

// ============================================================================
// SECTION: Interpreter
// ============================================================================

/// Single-use evaluator.
pub(crate) struct Interpreter<'l> {
    /// Sandbox budgets.
    limits: &'l SandboxLimits,
    /// Steps consumed so far.
    steps: u64,
    /// Current evaluator recursion depth.
    depth: usize,
    /// Offset of the most recently evaluated node.
    position: usize,
    /// Script call stack.
    frames: Vec<Frame>,
    /// Global scope with builtins.
    globals: ScopeRef,
    /// Allocation registry.
    heap: Vec<HeapRef>,
    /// Registry size that triggers the next sweep.
    next_sweep: usize,
}

impl<'l> Interpreter<'l> {
    /// Creates an interpreter with the builtin globals installed.
    pub(crate) fn new(limits: &'l SandboxLimits) -> Self {
        let globals = Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: None,
            function: true,
        });
        let mut interpreter = Self {
            limits,
            steps: 0,
            depth: 0,
            position: 0,
            frames: Vec::new(),
            globals: Rc::clone(&globals),
            heap: vec![HeapRef::Scope(globals)],
            next_sweep: MIN_SWEEP_THRESHOLD,
        };
        builtins::install_globals(&mut interpreter);
        interpreter
    }

    /// Runs a program with positional JSON arguments bound to `arguments`.
    ///
    /// Returns `None` when the program produces `undefined`.
    pub(crate) fn run(
        &mut self,
        program: &Program,
        args: &[Value],
    ) -> Result<Option<Value>, EvalError> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.import_json(arg, 0)?);
        }
        let scope = self.new_scope(&Rc::clone(&self.globals), true);
        let arguments = self.alloc_array(values, 0).map_err(|unwind| self.into_error(unwind))?;
        scope.declare("arguments", arguments, true);
        scope.declare("this", ScriptValue::Undefined, false);
        self.frames.push(Frame {
            name: "<transform>".to_string(),
            position: 0,
        });
        self.hoist(&program.body, &scope);
        let outcome = self.exec_stmts(&program.body, &scope);
        self.frames.pop();
        let value = match outcome {
            Ok(Completion::Return(value)) => value,
            Ok(_) => ScriptValue::Undefined,
            Err(unwind) => return Err(self.into_error(unwind)),
        };
        match export_json(&value, MAX_JSON_DEPTH) {
            Ok(JsonExport::Value(value)) => Ok(Some(value)),
            Ok(JsonExport::Absent) => Ok(None),
            Err(message) => Err(EvalError::runtime("TypeError", message, self.position)),
        }
    }

    // ------------------------------------------------------------------------
    // Globals and allocation
    // ------------------------------------------------------------------------

    /// Declares a global binding.
    pub(crate) fn define_global(&self, name: &str, value: ScriptValue) {
        self.globals.declare(name, value, false);
    }

    /// Creates a child scope and registers it for teardown.
    fn new_scope(&mut self, parent: &ScopeRef, function: bool) -> ScopeRef {
        let scope = Rc::new(Scope {
            vars: RefCell::new(HashMap::new()),
            parent: Some(Rc::clone(parent)),
            function,
        });
        self.register(HeapRef::Scope(Rc::clone(&scope)));
        scope
    }

    /// Adds an allocation to the registry, sweeping when it has doubled.
    fn register(&mut self, entry: HeapRef) {
        if self.heap.len() >= self.next_sweep {
            self.sweep();
            self.next_sweep = (self.heap.len() * 2).max(MIN_SWEEP_THRESHOLD);
        }
        self.heap.push(entry);
    }

    /// Releases allocations nothing but the registry refers to.
    ///
    /// Walks newest first so a chain of containers built in allocation order
    /// is released in a single pass.
    fn sweep(&mut self) {
        let mut kept = Vec::with_capacity(self.heap.len());
        while let Some(entry) = self.heap.pop() {
            if !(entry.is_unreachable() && entry.clear()) {
                kept.push(entry);
            }
        }
        kept.reverse();
        self.heap = kept;
    }

    /// Allocates an array value.
    pub(crate) fn alloc_array(
        &mut self,
        items: Vec<ScriptValue>,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        self.check_array_len(items.len(), position)?;
        let array = Rc::new(RefCell::new(items));
        self.register(HeapRef::Array(Rc::clone(&array)));
        Ok(ScriptValue::Array(array))
    }

    /// Allocates an object value.
    pub(crate) fn alloc_object(&mut self, entries: Entries) -> ScriptValue {
        let object = Rc::new(RefCell::new(entries));
        self.register(HeapRef::Object(Rc::clone(&object)));
        ScriptValue::Object(object)
    }

    /// Converts a JSON value into a script value.
    pub(crate) fn import_json(&mut self, value: &Value, depth: usize) -> Result<ScriptValue, EvalError> {
        if depth > MAX_JSON_DEPTH {
            return Err(EvalError::limit("input nested too deeply", self.position));
        }
        let converted = match value {
            Value::Null => ScriptValue::Null,
            Value::Bool(value) => ScriptValue::Bool(*value),
            Value::Number(number) => ScriptValue::Number(json_number(number)),
            Value::String(text) => ScriptValue::string(text),
            Value::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.import_json(item, depth + 1)?);
                }
                self.alloc_array(out, self.position).map_err(|unwind| self.into_error(unwind))?
            }
            Value::Object(entries) => {
                let mut out = Entries::new();
                for (key, item) in entries {
                    out.insert(key.clone(), self.import_json(item, depth + 1)?);
                }
                self.alloc_object(out)
            }
        };
        Ok(converted)
    }

    // ------------------------------------------------------------------------
    // Budgets
    // ------------------------------------------------------------------------

    /// Consumes one execution step.
    pub(crate) fn tick(&mut self) -> Result<(), Unwind> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(Unwind::Error(EvalError::limit(
                format!("execution exceeded {} steps", self.limits.max_steps),
                self.position,
            )));
        }
        Ok(())
    }

    /// Enters one level of evaluator recursion.
    fn enter(&mut self, position: usize) -> Result<(), Unwind> {
        if self.depth >= self.limits.max_depth {
            return Err(Unwind::Error(EvalError::limit(
                format!("evaluation nested deeper than {} levels", self.limits.max_depth),
                position,
            )));
        }
        self.depth += 1;
        Ok(())
    }

    /// Fails when a string would exceed the size budget.
    pub(crate) fn check_string_len(&self, len: usize, position: usize) -> Result<(), Unwind> {
        if len > self.limits.max_string_bytes {
            return Err(Unwind::Error(EvalError::limit(
                format!("string exceeds {} bytes", self.limits.max_string_bytes),
                position,
            )));
        }
        Ok(())
    }

    /// Fails when an array would exceed the length budget.
    pub(crate) fn check_array_len(&self, len: usize, position: usize) -> Result<(), Unwind> {
        if len > self.limits.max_array_len {
            return Err(Unwind::Error(EvalError::limit(
                format!("array exceeds {} elements", self.limits.max_array_len),
                position,
            )));
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Errors
    // ------------------------------------------------------------------------

    /// Snapshot of the call stack, innermost first.
    fn stack_snapshot(&self, position: usize) -> Vec<String> {
        let mut stack = Vec::with_capacity(self.frames.len());
        let mut at = position;
        for frame in self.frames.iter().rev() {
            stack.push(format!("{} (offset {at})", frame.name));
            at = frame.position;
        }
        stack
    }

    /// Builds a catchable runtime error with the current stack attached.
    pub(crate) fn error(&self, name: &str, message: impl Into<String>, position: usize) -> Unwind {
        let stack = self.stack_snapshot(position);
        Unwind::Error(EvalError::runtime(name, message, position).with_stack(stack))
    }

    /// Builds a `TypeError`.
    pub(crate) fn type_error(&self, message: impl Into<String>, position: usize) -> Unwind {
        self.error("TypeError", message, position)
    }

    /// Converts an unwind that escaped the program into an [`EvalError`].
    fn into_error(&self, unwind: Unwind) -> EvalError {
        match unwind {
            Unwind::Error(error) => error,
            Unwind::Throw {
                value,
                position,
                stack,
            } => {
                let (name, message) = error_parts(&value);
                EvalError::runtime(name, message, position).with_stack(stack)
            }
            Unwind::ShortCircuit => {
                EvalError::runtime("Error", "optional chain escaped its expression", self.position)
            }
        }
    }

    /// Converts a caught unwind into the value bound by `catch`.
    fn caught_value(&mut self, unwind: Unwind) -> Result<ScriptValue, Unwind> {
        match unwind {
            Unwind::Throw {
                value, ..
            } => Ok(value),
            Unwind::Error(error) if error.kind == EvalErrorKind::Runtime => {
                let mut entries = Entries::new();
                entries.insert("name".to_string(), ScriptValue::string(&error.name));
                entries.insert("message".to_string(), ScriptValue::string(&error.message));
                if let Some(trace) = error.stack_trace() {
                    entries.insert("stack".to_string(), ScriptValue::string(trace));
                }
                Ok(self.alloc_object(entries))
            }
            other => Err(other),
        }
    }

    // ------------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------------

    /// Declares hoisted function declarations of a statement list.
    fn hoist(&mut self, stmts: &[Stmt], scope: &ScopeRef) {
        for stmt in stmts {
            if let Stmt::Function {
                name,
                def,
            } = stmt
            {
                let closure = closure_value(def, scope);
                scope.declare(name, closure, true);
            }
        }
    }

    /// Executes statements in order, stopping at abrupt completions.
    fn exec_stmts(&mut self, stmts: &[Stmt], scope: &ScopeRef) -> Result<Completion, Unwind> {
        for stmt in stmts {
            match self.exec(stmt, scope)? {
                Completion::Normal => {}
                abrupt => return Ok(abrupt),
            }
        }
        Ok(Completion::Normal)
    }

    /// Executes a statement list inside a fresh block scope.
    fn exec_block(&mut self, stmts: &[Stmt], scope: &ScopeRef) -> Result<Completion, Unwind> {
        let block = self.new_scope(scope, false);
        self.hoist(stmts, &block);
        self.exec_stmts(stmts, &block)
    }

    /// Executes one statement.
    fn exec(&mut self, stmt: &Stmt, scope: &ScopeRef) -> Result<Completion, Unwind> {
        self.enter(self.position)?;
        let result = self.tick().and_then(|()| self.exec_inner(stmt, scope));
        self.depth -= 1;
        result
    }

    /// Statement dispatch.
    fn exec_inner(&mut self, stmt: &Stmt, scope: &ScopeRef) -> Result<Completion, Unwind> {
        match stmt {
            Stmt::Declare {
                kind,
                declarators,
            } => {
                let target_scope =
                    if *kind == DeclKind::Var { function_scope(scope) } else { Rc::clone(scope) };
                for declarator in declarators {
                    let value = match &declarator.init {
                        Some(init) => self.eval(init, scope)?,
                        None => ScriptValue::Undefined,
                    };
                    self.bind_pattern(
                        &declarator.target,
                        value,
                        &target_scope,
                        *kind != DeclKind::Const,
                    )?;
                }
                Ok(Completion::Normal)
            }
            Stmt::Function {
                ..
            }
            | Stmt::Empty => Ok(Completion::Normal),
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Return(value, position) => {
                self.position = *position;
                let value = match value {
                    Some(expr) => self.eval(expr, scope)?,
                    None => ScriptValue::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.truthy() {
                    self.exec(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec(alternate, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::Block(stmts) => self.exec_block(stmts, scope),
            Stmt::ForEach {
                kind,
                target,
                keys,
                iterable,
                body,
            } => self.exec_for_each(*kind, target, *keys, iterable, body, scope),
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let loop_scope = self.new_scope(scope, false);
                if let Some(init) = init {
                    self.exec(init, &loop_scope)?;
                }
                loop {
                    self.tick()?;
                    if let Some(test) = test
                        && !self.eval(test, &loop_scope)?.truthy()
                    {
                        break;
                    }
                    match self.exec(body, &loop_scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, &loop_scope)?;
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::While {
                test,
                body,
                post_test,
            } => {
                let mut first = *post_test;
                loop {
                    self.tick()?;
                    if !first && !self.eval(test, scope)?.truthy() {
                        break;
                    }
                    first = false;
                    match self.exec(body, scope)? {
                        Completion::Break => break,
                        Completion::Return(value) => return Ok(Completion::Return(value)),
                        Completion::Normal | Completion::Continue => {}
                    }
                }
                Ok(Completion::Normal)
            }
            Stmt::Break(position) => {
                self.position = *position;
                Ok(Completion::Break)
            }
            Stmt::Continue(position) => {
                self.position = *position;
                Ok(Completion::Continue)
            }
            Stmt::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                Err(Unwind::Throw {
                    value,
                    position: expr.position,
                    stack: self.stack_snapshot(expr.position),
                })
            }
            Stmt::Try {
                block,
                param,
                handler,
                finalizer,
            } => {
                let mut result = self.exec_block(block, scope);
                if let Some(handler) = handler {
                    result = match result {
                        Err(unwind) if is_catchable(&unwind) => {
                            let value = self.caught_value(unwind)?;
                            let catch_scope = self.new_scope(scope, false);
                            if let Some(param) = param {
                                self.bind_pattern(param, value, &catch_scope, true)?;
                            }
                            self.exec_block(handler, &catch_scope)
                        }
                        other => other,
                    };
                }
                if let Some(finalizer) = finalizer {
                    let completion = self.exec_block(finalizer, scope)?;
                    if !matches!(completion, Completion::Normal) {
                        return Ok(completion);
                    }
                }
                result
            }
        }
    }

    /// Executes `for...of` and `for...in`.
    fn exec_for_each(
        &mut self,
        kind: Option<DeclKind>,
        target: &Pattern,
        keys: bool,
        iterable: &Expr,
        body: &Stmt,
        scope: &ScopeRef,
    ) -> Result<Completion, Unwind> {
        let source = self.eval(iterable, scope)?;
        let items = if keys { self.enumerate_keys(&source)? } else { self.iterate(&source, iterable.position)? };
        for item in items {
            self.tick()?;
            let iteration = self.new_scope(scope, false);
            match kind {
                Some(kind) => self.bind_pattern(target, item, &iteration, kind != DeclKind::Const)?,
                None => {
                    let Pattern::Ident(name) = target else {
                        return Err(self.error("SyntaxError", "invalid for-loop binding", iterable.position));
                    };
                    self.write_reference(&Reference::Binding(name.clone()), item, &iteration, iterable.position)?;
                }
            }
            match self.exec(body, &iteration)? {
                Completion::Break => break,
                Completion::Return(value) => return Ok(Completion::Return(value)),
                Completion::Normal | Completion::Continue => {}
            }
        }
        Ok(Completion::Normal)
    }

    /// Returns the values produced by iterating a value.
    pub(crate) fn iterate(&mut self, value: &ScriptValue, position: usize) -> Result<Vec<ScriptValue>, Unwind> {
        match value {
            ScriptValue::Array(items) => Ok(self.array_ref(items, position)?.clone()),
            ScriptValue::Str(text) => Ok(text.chars().map(|ch| ScriptValue::string(ch.to_string())).collect()),
            other => Err(self.type_error(format!("{} is not iterable", other.describe()), position)),
        }
    }

    /// Returns the keys visited by `for...in`.
    fn enumerate_keys(&self, value: &ScriptValue) -> Result<Vec<ScriptValue>, Unwind> {
        let keys = match value {
            ScriptValue::Object(entries) => {
                self.object_ref(entries, self.position)?.keys().map(ScriptValue::string).collect()
            }
            ScriptValue::Array(items) => {
                let len = self.array_ref(items, self.position)?.len();
                (0 .. len).map(|index| ScriptValue::string(index.to_string())).collect()
            }
            ScriptValue::Str(text) => {
                (0 .. text.chars().count()).map(|index| ScriptValue::string(index.to_string())).collect()
            }
            _ => Vec::new(),
        };
        Ok(keys)
    }

    // ------------------------------------------------------------------------
    // Patterns
    // ------------------------------------------------------------------------

    /// Binds a pattern to a value in `scope`.
    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: ScriptValue,
        scope: &ScopeRef,
        mutable: bool,
    ) -> Result<(), Unwind> {
        match pattern {
            Pattern::Ident(name) => {
                scope.declare(name, value, mutable);
                Ok(())
            }
            Pattern::Object {
                props,
                rest,
            } => {
                if value.is_nullish() {
                    let label = value.describe();
                    return Err(self.type_error(
                        format!("Cannot destructure '{label}' as it is {label}."),
                        self.position,
                    ));
                }
                let mut used = Vec::with_capacity(props.len());
                for prop in props {
                    let key = match &prop.key {
                        PropKey::Static(key) => key.clone(),
                        PropKey::Computed(expr) => self.eval(expr, scope)?.to_property_key(),
                    };
                    let mut item = self.get_property(&value, &key, self.position)?;
                    if matches!(item, ScriptValue::Undefined)
                        && let Some(default) = &prop.default
                    {
                        item = self.eval(default, scope)?;
                    }
                    self.bind_pattern(&prop.value, item, scope, mutable)?;
                    used.push(key);
                }
                if let Some(rest) = rest {
                    let mut remaining = Entries::new();
                    if let ScriptValue::Object(entries) = &value {
                        for (key, item) in self.object_ref(entries, self.position)?.iter() {
                            if !used.contains(key) {
                                remaining.insert(key.clone(), item.clone());
                            }
                        }
                    }
                    let rest_value = self.alloc_object(remaining);
                    self.bind_pattern(rest, rest_value, scope, mutable)?;
                }
                Ok(())
            }
            Pattern::Array {
                elements,
                rest,
            } => {
                let items = self.iterate(&value, self.position)?;
                for (index, element) in elements.iter().enumerate() {
                    let Some(element) = element else {
                        continue;
                    };
                    let mut item = items.get(index).cloned().unwrap_or(ScriptValue::Undefined);
                    if matches!(item, ScriptValue::Undefined)
                        && let Some(default) = &element.default
                    {
                        item = self.eval(default, scope)?;
                    }
                    self.bind_pattern(&element.target, item, scope, mutable)?;
                }
                if let Some(rest) = rest {
                    let remaining = items.get(elements.len() ..).map(<[ScriptValue]>::to_vec).unwrap_or_default();
                    let rest_value = self.alloc_array(remaining, self.position)?;
                    self.bind_pattern(rest, rest_value, scope, mutable)?;
                }
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------------

    /// Evaluates an expression.
    fn eval(&mut self, expr: &Expr, scope: &ScopeRef) -> Result<ScriptValue, Unwind> {
        self.position = expr.position;
        self.enter(expr.position)?;
        let result = self.tick().and_then(|()| self.eval_inner(expr, scope));
        self.depth -= 1;
        result
    }

    /// Expression dispatch.
    fn eval_inner(&mut self, expr: &Expr, scope: &ScopeRef) -> Result<ScriptValue, Unwind> {
        let position = expr.position;
        match &expr.kind {
            ExprKind::Number(value) => Ok(ScriptValue::Number(*value)),
            ExprKind::Str(value) => Ok(ScriptValue::string(value)),
            ExprKind::Bool(value) => Ok(ScriptValue::Bool(*value)),
            ExprKind::Null => Ok(ScriptValue::Null),
            ExprKind::Undefined => Ok(ScriptValue::Undefined),
            ExprKind::This => Ok(scope.lookup("this").unwrap_or(ScriptValue::Undefined)),
            ExprKind::Template(parts) => {
                let mut out = String::new();
                for part in parts {
                    match part {
                        TemplatePart::Text(text) => out.push_str(text),
                        TemplatePart::Expr(expr) => {
                            let value = self.eval(expr, scope)?;
                            out.push_str(&value.to_display_string());
                        }
                    }
                    self.check_string_len(out.len(), position)?;
                }
                Ok(ScriptValue::string(out))
            }
            ExprKind::Ident(name) => scope
                .lookup(name)
                .ok_or_else(|| self.error("ReferenceError", format!("{name} is not defined"), position)),
            ExprKind::Array(elements) => {
                let items = self.eval_elements(elements, scope)?;
                self.alloc_array(items.into_vec(), position)
            }
            ExprKind::Object(props) => self.eval_object(props, scope),
            ExprKind::Function(def) => Ok(closure_value(def, scope)),
            ExprKind::Unary(op, operand) => self.eval_unary(*op, operand, scope),
            ExprKind::Update {
                increment,
                prefix,
                target,
            } => {
                let reference = self.reference(target, scope)?;
                let old = self.read_reference(&reference, scope, position)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_reference(&reference, ScriptValue::Number(new), scope, position)?;
                Ok(ScriptValue::Number(if *prefix { new } else { old }))
            }
            ExprKind::Binary(op, left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                self.binary(*op, &left, &right, position)
            }
            ExprKind::Logical(op, left, right) => {
                let left = self.eval(left, scope)?;
                let take_left = match op {
                    LogicalOp::And => !left.truthy(),
                    LogicalOp::Or => left.truthy(),
                    LogicalOp::Nullish => !left.is_nullish(),
                };
                if take_left { Ok(left) } else { self.eval(right, scope) }
            }
            ExprKind::Conditional(test, consequent, alternate) => {
                if self.eval(test, scope)?.truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            ExprKind::Assign {
                op,
                target,
                value,
            } => self.eval_assign(*op, target, value, scope, position),
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let receiver = self.eval(object, scope)?;
                if *optional && receiver.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                self.get_property(&receiver, property, position)
            }
            ExprKind::Index {
                object,
                index,
                optional,
            } => {
                let receiver = self.eval(object, scope)?;
                if *optional && receiver.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                let key = self.eval(index, scope)?;
                self.get_index(&receiver, &key, position)
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, scope, position),
            ExprKind::New {
                callee,
                args,
            } => {
                let constructor = self.eval(callee, scope)?;
                let args = self.eval_elements(args, scope)?;
                match &constructor {
                    ScriptValue::Function(callable)
                        if matches!(&**callable, Callable::Native { name, .. } if builtins::is_constructor(name)) =>
                    {
                        self.call_value(&constructor, ScriptValue::Undefined, &args, position)
                    }
                    _ => Err(self.type_error(
                        format!("{} is not a constructor", callee_label(callee)),
                        position,
                    )),
                }
            }
            ExprKind::OptionalChain(inner) => match self.eval(inner, scope) {
                Err(Unwind::ShortCircuit) => Ok(ScriptValue::Undefined),
                other => other,
            },
            ExprKind::Sequence(items) => {
                let mut last = ScriptValue::Undefined;
                for item in items {
                    last = self.eval(item, scope)?;
                }
                Ok(last)
            }
        }
    }

    /// Evaluates array elements or call arguments, expanding spreads.
    fn eval_elements(&mut self, elements: &[Element], scope: &ScopeRef) -> Result<Args, Unwind> {
        let mut out = Args::new();
        for element in elements {
            match element {
                Element::Expr(expr) => out.push(self.eval(expr, scope)?),
                Element::Spread(expr) => {
                    let value = self.eval(expr, scope)?;
                    let items = self.iterate(&value, expr.position)?;
                    self.check_array_len(out.len() + items.len(), expr.position)?;
                    out.extend(items);
                }
                Element::Hole => out.push(ScriptValue::Undefined),
            }
        }
        Ok(out)
    }

    /// Evaluates an object literal.
    fn eval_object(&mut self, props: &[Property], scope: &ScopeRef) -> Result<ScriptValue, Unwind> {
        let mut entries = Entries::new();
        for prop in props {
            match prop {
                Property::KeyValue(key, value) => {
                    let key = match key {
                        PropKey::Static(key) => key.clone(),
                        PropKey::Computed(expr) => self.eval(expr, scope)?.to_property_key(),
                    };
                    let value = self.eval(value, scope)?;
                    entries.insert(key, value);
                }
                Property::Spread(expr) => {
                    let value = self.eval(expr, scope)?;
                    match &value {
                        ScriptValue::Object(source) => {
                            for (key, item) in self.object_ref(source, expr.position)?.iter() {
                                entries.insert(key.clone(), item.clone());
                            }
                        }
                        ScriptValue::Array(source) => {
                            for (index, item) in self.array_ref(source, expr.position)?.iter().enumerate() {
                                entries.insert(index.to_string(), item.clone());
                            }
                        }
                        ScriptValue::Str(text) => {
                            for (index, ch) in text.chars().enumerate() {
                                entries.insert(index.to_string(), ScriptValue::string(ch.to_string()));
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(self.alloc_object(entries))
    }

    /// Evaluates a unary operation.
    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, scope: &ScopeRef) -> Result<ScriptValue, Unwind> {
        if op == UnaryOp::Typeof
            && let ExprKind::Ident(name) = &operand.kind
        {
            let label = scope.lookup(name).map_or("undefined", |value| value.type_of());
            return Ok(ScriptValue::string(label));
        }
        let value = self.eval(operand, scope)?;
        Ok(match op {
            UnaryOp::Not => ScriptValue::Bool(!value.truthy()),
            UnaryOp::Neg => ScriptValue::Number(-value.to_number()),
            UnaryOp::Plus => ScriptValue::Number(value.to_number()),
            UnaryOp::Typeof => ScriptValue::string(value.type_of()),
            UnaryOp::Void => ScriptValue::Undefined,
        })
    }

    /// Evaluates an assignment expression.
    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Expr,
        value: &Expr,
        scope: &ScopeRef,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        let reference = self.reference(target, scope)?;
        let assigned = match op {
            AssignOp::Assign => self.eval(value, scope)?,
            AssignOp::Compound(binary) => {
                let current = self.read_reference(&reference, scope, position)?;
                let operand = self.eval(value, scope)?;
                self.binary(binary, &current, &operand, position)?
            }
            AssignOp::Logical(logical) => {
                let current = self.read_reference(&reference, scope, position)?;
                let assign = match logical {
                    LogicalOp::And => current.truthy(),
                    LogicalOp::Or => !current.truthy(),
                    LogicalOp::Nullish => current.is_nullish(),
                };
                if !assign {
                    return Ok(current);
                }
                self.eval(value, scope)?
            }
        };
        self.write_reference(&reference, assigned.clone(), scope, position)?;
        Ok(assigned)
    }

    /// Evaluates a call expression.
    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Element],
        optional: bool,
        scope: &ScopeRef,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        let (receiver, key) = match &callee.kind {
            ExprKind::Member {
                object,
                property,
                optional: member_optional,
            } => {
                let receiver = self.eval(object, scope)?;
                if *member_optional && receiver.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                (receiver, property.clone())
            }
            ExprKind::Index {
                object,
                index,
                optional: member_optional,
            } => {
                let receiver = self.eval(object, scope)?;
                if *member_optional && receiver.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                let key = self.eval(index, scope)?.to_property_key();
                (receiver, key)
            }
            _ => {
                let function = self.eval(callee, scope)?;
                if optional && function.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                let args = self.eval_elements(args, scope)?;
                if !matches!(function, ScriptValue::Function(_)) {
                    return Err(self.type_error(
                        format!("{} is not a function", callee_label(callee)),
                        position,
                    ));
                }
                return self.call_value(&function, ScriptValue::Undefined, &args, position);
            }
        };
        let args = self.eval_elements(args, scope)?;
        self.call_method(&receiver, &key, &args, optional, callee, position)
    }

    /// Invokes `receiver[key](...args)`, dispatching to builtins first.
    fn call_method(
        &mut self,
        receiver: &ScriptValue,
        key: &str,
        args: &[ScriptValue],
        optional: bool,
        callee: &Expr,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        let builtin = match receiver {
            ScriptValue::Undefined | ScriptValue::Null => {
                return Err(self.type_error(
                    format!("Cannot read properties of {} (reading '{key}')", receiver.describe()),
                    position,
                ));
            }
            ScriptValue::Array(items) => builtins::array_method(self, items, key, args, position),
            ScriptValue::Str(text) => builtins::string_method(self, text, key, args, position),
            ScriptValue::Number(value) => builtins::number_method(self, *value, key, args, position),
            ScriptValue::Bool(value) if key == "toString" => {
                Some(Ok(ScriptValue::string(value.to_string())))
            }
            _ => None,
        };
        if let Some(result) = builtin {
            return result;
        }
        let function = self.get_property(receiver, key, position)?;
        if matches!(function, ScriptValue::Function(_)) {
            return self.call_value(&function, receiver.clone(), args, position);
        }
        if optional && function.is_nullish() {
            return Err(Unwind::ShortCircuit);
        }
        if let ScriptValue::Object(entries) = receiver
            && let Some(result) = builtins::object_method(self, entries, key, args, position)
        {
            return result;
        }
        Err(self.type_error(format!("{} is not a function", callee_label(callee)), position))
    }

    /// Calls a function value.
    pub(crate) fn call_value(
        &mut self,
        function: &ScriptValue,
        this: ScriptValue,
        args: &[ScriptValue],
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        let ScriptValue::Function(callable) = function else {
            return Err(self.type_error(format!("{} is not a function", function.describe()), position));
        };
        match &**callable {
            Callable::Native {
                func, ..
            } => func(self, &this, args, position),
            Callable::Closure {
                def,
                scope,
            } => self.call_closure(def, scope, this, args, position),
        }
    }

    /// Calls a script-defined function.
    fn call_closure(
        &mut self,
        def: &Arc<FunctionDef>,
        captured: &ScopeRef,
        this: ScriptValue,
        args: &[ScriptValue],
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        if self.frames.len() >= self.limits.max_call_depth {
            return Err(Unwind::Error(EvalError::limit(
                format!("maximum call depth of {} exceeded", self.limits.max_call_depth),
                position,
            )));
        }
        let scope = self.new_scope(captured, true);
        if !def.arrow {
            scope.declare("this", this, false);
            let arguments = self.alloc_array(args.to_vec(), position)?;
            scope.declare("arguments", arguments, true);
        }
        self.frames.push(Frame {
            name: def.name.clone().unwrap_or_else(|| "<anonymous>".to_string()),
            position,
        });
        let result = self.call_closure_body(def, &scope, args);
        self.frames.pop();
        result
    }

    /// Binds parameters and runs a closure body.
    fn call_closure_body(
        &mut self,
        def: &FunctionDef,
        scope: &ScopeRef,
        args: &[ScriptValue],
    ) -> Result<ScriptValue, Unwind> {
        self.position = def.position;
        for (index, param) in def.params.iter().enumerate() {
            let mut value = args.get(index).cloned().unwrap_or(ScriptValue::Undefined);
            if matches!(value, ScriptValue::Undefined)
                && let Some(default) = &param.default
            {
                value = self.eval(default, scope)?;
            }
            self.bind_pattern(&param.target, value, scope, true)?;
        }
        if let Some(rest) = &def.rest {
            let remaining = args.get(def.params.len() ..).map(<[ScriptValue]>::to_vec).unwrap_or_default();
            let rest_value = self.alloc_array(remaining, def.position)?;
            self.bind_pattern(rest, rest_value, scope, true)?;
        }
        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, scope),
            FunctionBody::Block(stmts) => {
                self.hoist(stmts, scope);
                match self.exec_stmts(stmts, scope)? {
                    Completion::Return(value) => Ok(value),
                    Completion::Normal | Completion::Break | Completion::Continue => {
                        Ok(ScriptValue::Undefined)
                    }
                }
            }
        }
    }

    // ------------------------------------------------------------------------
    // References and properties
    // ------------------------------------------------------------------------

    /// Resolves an assignment target.
    fn reference(&mut self, target: &Expr, scope: &ScopeRef) -> Result<Reference, Unwind> {
        match &target.kind {
            ExprKind::Ident(name) => Ok(Reference::Binding(name.clone())),
            ExprKind::Member {
                object,
                property,
                ..
            } => {
                let receiver = self.eval(object, scope)?;
                Ok(Reference::Property(receiver, ScriptValue::string(property)))
            }
            ExprKind::Index {
                object,
                index,
                ..
            } => {
                let receiver = self.eval(object, scope)?;
                let key = self.eval(index, scope)?;
                Ok(Reference::Property(receiver, key))
            }
            _ => Err(self.error("SyntaxError", "invalid assignment target", target.position)),
        }
    }

    /// Reads through a reference.
    fn read_reference(
        &self,
        reference: &Reference,
        scope: &ScopeRef,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        match reference {
            Reference::Binding(name) => scope
                .lookup(name)
                .ok_or_else(|| self.error("ReferenceError", format!("{name} is not defined"), position)),
            Reference::Property(receiver, key) => self.get_index(receiver, key, position),
        }
    }

    /// Writes through a reference.
    fn write_reference(
        &self,
        reference: &Reference,
        value: ScriptValue,
        scope: &ScopeRef,
        position: usize,
    ) -> Result<(), Unwind> {
        match reference {
            Reference::Binding(name) => scope.assign(name, value).map_err(|failure| match failure {
                AssignFailure::Undeclared => {
                    self.error("ReferenceError", format!("{name} is not defined"), position)
                }
                AssignFailure::Constant => {
                    self.type_error("Assignment to constant variable.", position)
                }
            }),
            Reference::Property(receiver, key) => self.set_index(receiver, key, value, position),
        }
    }

    /// Reads `receiver[key]` for a computed key.
    pub(crate) fn get_index(
        &self,
        receiver: &ScriptValue,
        key: &ScriptValue,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        if let (ScriptValue::Array(items), ScriptValue::Number(index)) = (receiver, key) {
            let items = self.array_ref(items, position)?;
            return Ok(to_index(*index)
                .and_then(|index| items.get(index).cloned())
                .unwrap_or(ScriptValue::Undefined));
        }
        self.get_property(receiver, &key.to_property_key(), position)
    }

    /// Reads `receiver.key`.
    pub(crate) fn get_property(
        &self,
        receiver: &ScriptValue,
        key: &str,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        let value = match receiver {
            ScriptValue::Undefined | ScriptValue::Null => {
                return Err(self.type_error(
                    format!("Cannot read properties of {} (reading '{key}')", receiver.describe()),
                    position,
                ));
            }
            ScriptValue::Array(items) => {
                let items = self.array_ref(items, position)?;
                if key == "length" {
                    ScriptValue::from_len(items.len())
                } else {
                    key.parse::<usize>()
                        .ok()
                        .and_then(|index| items.get(index).cloned())
                        .unwrap_or(ScriptValue::Undefined)
                }
            }
            ScriptValue::Str(text) => {
                if key == "length" {
                    ScriptValue::from_len(text.encode_utf16().count())
                } else {
                    key.parse::<usize>()
                        .ok()
                        .and_then(|index| text.chars().nth(index))
                        .map_or(ScriptValue::Undefined, |ch| ScriptValue::string(ch.to_string()))
                }
            }
            ScriptValue::Object(entries) => {
                self.object_ref(entries, position)?.get(key).cloned().unwrap_or(ScriptValue::Undefined)
            }
            ScriptValue::Function(callable) => match &**callable {
                Callable::Native {
                    name, ..
                } => builtins::static_member(name, key).unwrap_or(ScriptValue::Undefined),
                Callable::Closure {
                    ..
                } => {
                    if key == "name" {
                        ScriptValue::string(callable.name())
                    } else {
                        ScriptValue::Undefined
                    }
                }
            },
            ScriptValue::Bool(_) | ScriptValue::Number(_) => ScriptValue::Undefined,
        };
        Ok(value)
    }

    /// Writes `receiver[key] = value`.
    fn set_index(
        &self,
        receiver: &ScriptValue,
        key: &ScriptValue,
        value: ScriptValue,
        position: usize,
    ) -> Result<(), Unwind> {
        match receiver {
            ScriptValue::Undefined | ScriptValue::Null => Err(self.type_error(
                format!(
                    "Cannot set properties of {} (setting '{}')",
                    receiver.describe(),
                    key.to_property_key()
                ),
                position,
            )),
            ScriptValue::Array(items) => {
                let index = match key {
                    ScriptValue::Number(number) => to_index(*number),
                    other => other.to_property_key().parse::<usize>().ok(),
                };
                if let Some(index) = index {
                    self.check_array_len(index + 1, position)?;
                    let mut items = self.array_mut(items, position)?;
                    if index >= items.len() {
                        items.resize(index + 1, ScriptValue::Undefined);
                    }
                    items[index] = value;
                } else if key.to_property_key() == "length" {
                    let Some(len) = to_index(value.to_number()) else {
                        return Err(self.error("RangeError", "Invalid array length", position));
                    };
                    self.check_array_len(len, position)?;
                    self.array_mut(items, position)?.resize(len, ScriptValue::Undefined);
                }
                Ok(())
            }
            ScriptValue::Object(entries) => {
                self.object_mut(entries, position)?.insert(key.to_property_key(), value);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Borrows array storage.
    pub(crate) fn array_ref<'v>(
        &self,
        items: &'v ArrayRef,
        position: usize,
    ) -> Result<Ref<'v, Vec<ScriptValue>>, Unwind> {
        items.try_borrow().map_err(|_| self.type_error("array is being modified", position))
    }

    /// Mutably borrows array storage.
    pub(crate) fn array_mut<'v>(
        &self,
        items: &'v ArrayRef,
        position: usize,
    ) -> Result<RefMut<'v, Vec<ScriptValue>>, Unwind> {
        items.try_borrow_mut().map_err(|_| self.type_error("array is being modified", position))
    }

    /// Borrows object storage.
    pub(crate) fn object_ref<'v>(
        &self,
        entries: &'v ObjectRef,
        position: usize,
    ) -> Result<Ref<'v, Entries>, Unwind> {
        entries.try_borrow().map_err(|_| self.type_error("object is being modified", position))
    }

    /// Mutably borrows object storage.
    pub(crate) fn object_mut<'v>(
        &self,
        entries: &'v ObjectRef,
        position: usize,
    ) -> Result<RefMut<'v, Entries>, Unwind> {
        entries.try_borrow_mut().map_err(|_| self.type_error("object is being modified", position))
    }

    // ------------------------------------------------------------------------
    // Operators
    // ------------------------------------------------------------------------

    /// Applies a binary operator.
    pub(crate) fn binary(
        &self,
        op: BinaryOp,
        left: &ScriptValue,
        right: &ScriptValue,
        position: usize,
    ) -> Result<ScriptValue, Unwind> {
        let value = match op {
            BinaryOp::Add => {
                if left.is_string_like() || right.is_string_like() {
                    let mut out = left.to_display_string();
                    out.push_str(&right.to_display_string());
                    self.check_string_len(out.len(), position)?;
                    ScriptValue::string(out)
                } else {
                    ScriptValue::Number(left.to_number() + right.to_number())
                }
            }
            BinaryOp::Sub => ScriptValue::Number(left.to_number() - right.to_number()),
            BinaryOp::Mul => ScriptValue::Number(left.to_number() * right.to_number()),
            BinaryOp::Div => ScriptValue::Number(left.to_number() / right.to_number()),
            BinaryOp::Rem => ScriptValue::Number(left.to_number() % right.to_number()),
            BinaryOp::Pow => ScriptValue::Number(left.to_number().powf(right.to_number())),
            BinaryOp::LooseEq => ScriptValue::Bool(left.loose_equals(right)),
            BinaryOp::LooseNotEq => ScriptValue::Bool(!left.loose_equals(right)),
            BinaryOp::StrictEq => ScriptValue::Bool(left.strict_equals(right)),
            BinaryOp::StrictNotEq => ScriptValue::Bool(!left.strict_equals(right)),
            BinaryOp::Lt => ScriptValue::Bool(compare(left, right) == Some(Ordering::Less)),
            BinaryOp::LtEq => ScriptValue::Bool(matches!(
                compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::Gt => ScriptValue::Bool(compare(left, right) == Some(Ordering::Greater)),
            BinaryOp::GtEq => ScriptValue::Bool(matches!(
                compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::In => {
                let key = left.to_property_key();
                let found = match right {
                    ScriptValue::Object(entries) => self.object_ref(entries, position)?.contains_key(&key),
                    ScriptValue::Array(items) => {
                        key == "length"
                            || key.parse::<usize>().is_ok_and(|index| {
                                self.array_ref(items, position).is_ok_and(|items| index < items.len())
                            })
                    }
                    other => {
                        return Err(self.type_error(
                            format!("Cannot use 'in' operator to search for '{key}' in {}", other.describe()),
                            position,
                        ));
                    }
                };
                ScriptValue::Bool(found)
            }
        };
        Ok(value)
    }
}

impl Drop for Interpreter<'_> {
    fn drop(&mut self) {
        for entry in &self.heap {
            entry.clear();
        }
        while self.heap.pop().is_some() {}
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates a closure value over `scope`.
fn closure_value(def: &Arc<FunctionDef>, scope: &ScopeRef) -> ScriptValue {
    ScriptValue::Function(Rc::new(Callable::Closure {
        def: Arc::clone(def),
        scope: Rc::clone(scope),
    }))
}

/// Returns true for unwinds a `catch` block may handle.
fn is_catchable(unwind: &Unwind) -> bool {
    match unwind {
        Unwind::Throw {
            ..
        } => true,
        Unwind::Error(error) => error.kind == EvalErrorKind::Runtime,
        Unwind::ShortCircuit => false,
    }
}

/// Extracts `(name, message)` from a thrown value.
fn error_parts(value: &ScriptValue) -> (String, String) {
    if let ScriptValue::Object(entries) = value
        && let Ok(entries) = entries.try_borrow()
        && let Some(message) = entries.get("message")
    {
        let name = entries.get("name").map_or_else(|| "Error".to_string(), ScriptValue::to_display_string);
        return (name, message.to_display_string());
    }
    ("Error".to_string(), value.to_display_string())
}

/// Relational comparison; `None` when either side is `NaN`.
pub(crate) fn compare(left: &ScriptValue, right: &ScriptValue) -> Option<Ordering> {
    let left = primitive(left);
    let right = primitive(right);
    if let (ScriptValue::Str(a), ScriptValue::Str(b)) = (&left, &right) {
        return Some(a.cmp(b));
    }
    left.to_number().partial_cmp(&right.to_number())
}

/// Converts arrays, objects, and functions to their string form.
fn primitive(value: &ScriptValue) -> ScriptValue {
    match value {
        ScriptValue::Array(_) | ScriptValue::Object(_) | ScriptValue::Function(_) => {
            ScriptValue::string(value.to_display_string())
        }
        other => other.clone(),
    }
}

/// Renders a callee expression for "is not a function" messages.
fn callee_label(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.clone(),
        ExprKind::Member {
            object,
            property,
            ..
        } => format!("{}.{property}", callee_label(object)),
        ExprKind::Index {
            object, ..
        } => format!("{}[...]", callee_label(object)),
        ExprKind::This => "this".to_string(),
        ExprKind::Call {
            callee, ..
        } => format!("{}(...)", callee_label(callee)),
        _ => "expression".to_string(),
    }
}
