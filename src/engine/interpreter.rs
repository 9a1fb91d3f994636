//! Tree-walking evaluator.
//!
//! One [`Interpreter`] is one realm: a fresh global scope holding the
//! built-ins, plus the program's own top-level scope. Dropping it tears the
//! realm down, including any reference cycles user code created.

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use regex::Regex;

use super::ast::*;
use super::builtins;
use super::builtins::regexp::compile_regex;
use super::error::Pos;
use super::number::{to_int32, to_uint32};
use super::scope::{Assignment, BindingKind, Lookup, Scope};
use super::value::*;

/// Non-local exit of an evaluation.
pub enum Unwind {
    /// A thrown value.
    Throw(Value),
    /// The interrupt flag was raised.
    Interrupted,
    /// `?.` met a nullish base; caught at the enclosing optional chain.
    ShortCircuit,
}

pub type EvalResult<T> = Result<T, Unwind>;

/// Statement completion other than a throw.
pub enum Completion {
    Normal,
    Return(Value),
    Break(Option<Rc<str>>),
    Continue(Option<Rc<str>>),
}

enum Flow {
    Next,
    Break,
    Exit(Completion),
}

fn loop_control(completion: Completion, labels: &[Rc<str>]) -> Flow {
    match completion {
        Completion::Normal | Completion::Continue(None) => Flow::Next,
        Completion::Continue(Some(label)) if labels.contains(&label) => Flow::Next,
        Completion::Break(None) => Flow::Break,
        Completion::Break(Some(label)) if labels.contains(&label) => Flow::Break,
        other => Flow::Exit(other),
    }
}

#[derive(Debug, Clone, Copy)]
enum BindMode {
    Let,
    Const,
    Var,
    Assign,
}

impl BindMode {
    fn for_decl(kind: DeclKind) -> Self {
        match kind {
            DeclKind::Var => BindMode::Var,
            DeclKind::Let => BindMode::Let,
            DeclKind::Const => BindMode::Const,
        }
    }
}

/// Resolved callee of a method call.
enum Callee {
    Native(NativeFn),
    Value(Value),
}

enum IterSource {
    Array(ObjRef),
    List(Vec<Value>),
}

enum StoreError {
    ReadOnly,
    NotExtensible,
    InvalidLength,
}

/// Largest gap an index assignment may open past the end of an array.
const MAX_ARRAY_GAP: usize = 1 << 24;

/// Frames shown in an error's `stack`.
const STACK_TRACE_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub max_call_depth: usize,
    /// File name shown in stack frames.
    pub source_name: String,
    pub interrupt: Option<Arc<AtomicBool>>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            max_call_depth: 2000,
            source_name: "solution.js".to_string(),
            interrupt: None,
        }
    }
}

struct Frame {
    name: Rc<str>,
    pos: Pos,
}

pub struct Interpreter {
    heap: Heap,
    realm: Rc<Scope>,
    global: Rc<Scope>,
    frames: Vec<Frame>,
    options: EvalOptions,
    regex_cache: HashMap<(Rc<str>, Rc<str>), Rc<Regex>>,
    random_state: u64,
    anonymous: Rc<str>,
}

impl Interpreter {
    pub fn new(options: EvalOptions) -> Self {
        let mut heap = Heap::default();
        let realm = Scope::with_this(None, Value::Undefined);
        heap.track_scope(&realm);
        let global = Scope::with_this(Some(realm.clone()), Value::Undefined);
        heap.track_scope(&global);
        let mut interpreter = Self {
            heap,
            realm,
            global,
            frames: Vec::new(),
            options,
            regex_cache: HashMap::new(),
            random_state: 0x9E37_79B9_7F4A_7C15,
            anonymous: Rc::from("<anonymous>"),
        };
        builtins::install(&mut interpreter);
        interpreter
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    /// Define a writable built-in binding.
    pub fn define_global(&mut self, name: &str, value: Value) {
        self.realm.define(Rc::from(name), value, BindingKind::Mutable);
    }

    /// Define a non-writable built-in binding (`undefined`, `NaN`, `Infinity`).
    pub fn define_global_constant(&mut self, name: &str, value: Value) {
        self.realm.define(Rc::from(name), value, BindingKind::ReadOnly);
    }

    /// Execute a program's top-level statements in the global scope.
    pub fn run_program(&mut self, program: &Program) -> EvalResult<()> {
        let global = self.global.clone();
        for name in &program.var_names {
            if !global.has_own(name) {
                global.define(name.clone(), Value::Undefined, BindingKind::Mutable);
            }
        }
        self.hoist(&program.body, &global);
        self.frames.push(Frame {
            name: Rc::from(""),
            pos: Pos::default(),
        });
        let result = self.exec_stmts(&program.body, &global);
        self.frames.pop();
        result.map(|_| ())
    }

    /// Resolve a name the way a reference in the program's top level would.
    pub fn global_binding(&self, name: &str) -> Option<Value> {
        match self.global.lookup(name) {
            Lookup::Found(value) => Some(value),
            _ => None,
        }
    }

    /// Evaluate a standalone expression against the built-ins only, so the
    /// program's own top-level bindings cannot shadow what it refers to.
    pub fn evaluate(&mut self, expr: &Expr) -> EvalResult<Value> {
        let realm = self.realm.clone();
        self.frames.push(Frame {
            name: Rc::from(""),
            pos: expr.pos,
        });
        let result = self.eval(expr, &realm);
        self.frames.pop();
        result
    }

    // -----------------------------------------------------------------------
    // Allocation and errors
    // -----------------------------------------------------------------------

    pub fn alloc(&mut self, object: JsObject) -> ObjRef {
        self.heap.alloc(object)
    }

    pub fn new_object(&mut self) -> Value {
        Value::Object(self.alloc(JsObject::new(ObjectKind::Ordinary)))
    }

    pub fn new_array(&mut self, items: Vec<Value>) -> Value {
        Value::Object(self.alloc(JsObject::new(ObjectKind::Array(items))))
    }

    pub fn native_function(
        &mut self,
        name: &str,
        call: NativeFn,
        construct: Option<NativeFn>,
        length: u32,
    ) -> Value {
        Value::Object(self.native_object(name, call, construct, length))
    }

    pub fn native_object(
        &mut self,
        name: &str,
        call: NativeFn,
        construct: Option<NativeFn>,
        length: u32,
    ) -> ObjRef {
        let function = Function::Native {
            name: Rc::from(name),
            call,
            construct,
            length,
        };
        self.alloc(JsObject::new(ObjectKind::Function(function)))
    }

    fn make_function(&mut self, def: &Rc<FunctionDef>, scope: &Rc<Scope>) -> Value {
        let function = Function::Closure {
            def: def.clone(),
            env: scope.clone(),
        };
        Value::Object(self.alloc(JsObject::new(ObjectKind::Function(function))))
    }

    fn new_scope(&mut self, parent: &Rc<Scope>) -> Rc<Scope> {
        let scope = Scope::new(Some(parent.clone()));
        self.heap.track_scope(&scope);
        scope
    }

    pub fn stack_trace(&self) -> String {
        let source = &self.options.source_name;
        self.frames
            .iter()
            .rev()
            .take(STACK_TRACE_LIMIT)
            .map(|frame| {
                if frame.name.is_empty() {
                    format!("    at {}:{}", source, frame.pos)
                } else {
                    format!("    at {} ({}:{})", frame.name, source, frame.pos)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Build an error object whose stack reflects the current frames.
    pub fn make_error(&mut self, name: &str, message: impl Into<String>) -> Value {
        let message = message.into();
        let header = if message.is_empty() {
            name.to_string()
        } else {
            format!("{}: {}", name, message)
        };
        let trace = self.stack_trace();
        let stack = if trace.is_empty() {
            header
        } else {
            format!("{}\n{}", header, trace)
        };
        let data = ErrorData {
            name: JsString::from(name),
            message: JsString::from(message),
            stack: JsString::from(stack),
        };
        Value::Object(self.alloc(JsObject::new(ObjectKind::Error(data))))
    }

    pub fn throw<T>(&mut self, name: &str, message: impl Into<String>) -> EvalResult<T> {
        Err(Unwind::Throw(self.make_error(name, message)))
    }

    pub fn type_error<T>(&mut self, message: impl Into<String>) -> EvalResult<T> {
        self.throw("TypeError", message)
    }

    pub fn range_error<T>(&mut self, message: impl Into<String>) -> EvalResult<T> {
        self.throw("RangeError", message)
    }

    pub fn reference_error<T>(&mut self, message: impl Into<String>) -> EvalResult<T> {
        self.throw("ReferenceError", message)
    }

    pub fn check_interrupt(&self) -> EvalResult<()> {
        match &self.options.interrupt {
            Some(flag) if flag.load(Ordering::Relaxed) => Err(Unwind::Interrupted),
            _ => Ok(()),
        }
    }

    fn mark(&mut self, pos: Pos) {
        if let Some(frame) = self.frames.last_mut() {
            frame.pos = pos;
        }
    }

    /// Deterministic `Math.random` source (xorshift64*).
    pub fn next_random(&mut self) -> f64 {
        let mut x = self.random_state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.random_state = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Compile a regular expression, reusing earlier compilations.
    pub fn regex(&mut self, pattern: &str, flags: &str) -> EvalResult<Rc<Regex>> {
        let key = (Rc::from(pattern), Rc::from(flags));
        if let Some(regex) = self.regex_cache.get(&key) {
            return Ok(regex.clone());
        }
        match compile_regex(pattern, flags) {
            Ok(regex) => {
                let regex = Rc::new(regex);
                self.regex_cache.insert(key, regex.clone());
                Ok(regex)
            }
            Err(message) => self.throw("SyntaxError", message),
        }
    }

    pub fn new_regexp(&mut self, pattern: &str, flags: &str) -> EvalResult<Value> {
        let regex = self.regex(pattern, flags)?;
        let data = RegExpData {
            source: JsString::from(if pattern.is_empty() { "(?:)" } else { pattern }),
            flags: JsString::from(flags),
            regex,
            last_index: 0,
        };
        Ok(Value::Object(
            self.alloc(JsObject::new(ObjectKind::RegExp(data))),
        ))
    }

    /// Convert parsed JSON into runtime values.
    pub fn from_json(&mut self, json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => {
                let values = items.iter().map(|item| self.from_json(item)).collect();
                self.new_array(values)
            }
            serde_json::Value::Object(map) => {
                let mut object = JsObject::new(ObjectKind::Ordinary);
                for (key, value) in map {
                    let value = self.from_json(value);
                    object.props.insert(JsString::from(key.as_str()), value);
                }
                Value::Object(self.alloc(object))
            }
        }
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    pub fn call(&mut self, callee: &Value, this: &Value, args: &[Value]) -> EvalResult<Value> {
        let Some(function) = callee.as_object().and_then(|o| o.function()) else {
            return self.type_error(format!("{} is not a function", describe_for_error(callee)));
        };
        match function {
            Function::Native { call, .. } => call(self, this, args),
            Function::Closure { def, env } => self.call_closure(&def, &env, this, args),
            Function::Bound {
                target,
                this: bound_this,
                args: mut bound,
            } => {
                bound.extend_from_slice(args);
                self.call(&target, &bound_this, &bound)
            }
        }
    }

    pub fn construct(&mut self, callee: &Value, args: &[Value], what: &str) -> EvalResult<Value> {
        match callee.as_object().and_then(|o| o.function()) {
            Some(Function::Native {
                construct: Some(construct),
                ..
            }) => construct(self, &Value::Undefined, args),
            Some(Function::Closure { def, env }) if !def.is_arrow => {
                let mut object = JsObject::new(ObjectKind::Ordinary);
                object.constructor = Some(callee.clone());
                let this = Value::Object(self.alloc(object));
                let result = self.call_closure(&def, &env, &this, args)?;
                Ok(match result {
                    Value::Object(_) => result,
                    _ => this,
                })
            }
            Some(Function::Bound {
                target,
                args: mut bound,
                ..
            }) => {
                bound.extend_from_slice(args);
                self.construct(&target, &bound, what)
            }
            _ => self.type_error(format!("{} is not a constructor", what)),
        }
    }

    fn call_closure(
        &mut self,
        def: &Rc<FunctionDef>,
        env: &Rc<Scope>,
        this: &Value,
        args: &[Value],
    ) -> EvalResult<Value> {
        self.check_interrupt()?;
        if self.frames.len() >= self.options.max_call_depth {
            return self.range_error("Maximum call stack size exceeded");
        }
        let scope = if def.is_arrow {
            Scope::new(Some(env.clone()))
        } else {
            Scope::with_this(Some(env.clone()), this.clone())
        };
        self.heap.track_scope(&scope);
        let name = if def.name.is_empty() {
            self.anonymous.clone()
        } else {
            def.name.clone()
        };
        self.frames.push(Frame { name, pos: def.pos });
        let result = self.run_function_body(def, &scope, args);
        self.frames.pop();
        result
    }

    fn run_function_body(
        &mut self,
        def: &FunctionDef,
        scope: &Rc<Scope>,
        args: &[Value],
    ) -> EvalResult<Value> {
        for (i, param) in def.params.iter().enumerate() {
            let value = args.get(i).cloned().unwrap_or(Value::Undefined);
            let value = self.apply_default(value, &param.default, scope)?;
            self.bind_pattern(&param.target, value, scope, BindMode::Let)?;
        }
        if let Some(rest) = &def.rest {
            let remaining = args.get(def.params.len()..).unwrap_or(&[]).to_vec();
            let array = self.new_array(remaining);
            self.bind_pattern(rest, array, scope, BindMode::Let)?;
        }
        if def.uses_arguments && !def.is_arrow {
            let array = self.new_array(args.to_vec());
            scope.define(Rc::from("arguments"), array, BindingKind::Mutable);
        }
        for name in &def.var_names {
            if !scope.has_own(name) {
                scope.define(name.clone(), Value::Undefined, BindingKind::Mutable);
            }
        }
        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, scope),
            FunctionBody::Block(body) => {
                self.hoist(body, scope);
                match self.exec_stmts(body, scope)? {
                    Completion::Return(value) => Ok(value),
                    _ => Ok(Value::Undefined),
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    /// Declare the lexical bindings and functions of a statement list.
    fn hoist(&mut self, body: &[Stmt], scope: &Rc<Scope>) {
        for stmt in body {
            match stmt {
                Stmt::Decl { kind, decls } if *kind != DeclKind::Var => {
                    let binding = if *kind == DeclKind::Const {
                        BindingKind::Const
                    } else {
                        BindingKind::Mutable
                    };
                    let mut names = Vec::new();
                    for decl in decls {
                        decl.target.bound_names(&mut names);
                    }
                    for name in names {
                        scope.define_uninitialized(name, binding);
                    }
                }
                Stmt::Function(def) => {
                    let function = self.make_function(def, scope);
                    if let Some(id) = &def.id {
                        scope.define(id.clone(), function, BindingKind::Mutable);
                    }
                }
                _ => {}
            }
        }
    }

    fn exec_stmts(&mut self, body: &[Stmt], scope: &Rc<Scope>) -> EvalResult<Completion> {
        for stmt in body {
            match self.exec_stmt(stmt, scope)? {
                Completion::Normal => {}
                other => return Ok(other),
            }
        }
        Ok(Completion::Normal)
    }

    fn exec_block(&mut self, body: &[Stmt], scope: &Rc<Scope>) -> EvalResult<Completion> {
        if needs_scope(body) {
            let inner = self.new_scope(scope);
            self.hoist(body, &inner);
            self.exec_stmts(body, &inner)
        } else {
            self.exec_stmts(body, scope)
        }
    }

    fn exec_stmt(&mut self, stmt: &Stmt, scope: &Rc<Scope>) -> EvalResult<Completion> {
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Decl { kind, decls } => {
                self.exec_declaration(*kind, decls, scope)?;
                Ok(Completion::Normal)
            }
            Stmt::Function(_) | Stmt::Empty => Ok(Completion::Normal),
            Stmt::Return(arg) => {
                let value = match arg {
                    Some(expr) => self.eval(expr, scope)?,
                    None => Value::Undefined,
                };
                Ok(Completion::Return(value))
            }
            Stmt::If {
                test,
                consequent,
                alternate,
            } => {
                if self.eval(test, scope)?.is_truthy() {
                    self.exec_stmt(consequent, scope)
                } else if let Some(alternate) = alternate {
                    self.exec_stmt(alternate, scope)
                } else {
                    Ok(Completion::Normal)
                }
            }
            Stmt::Block(body) => self.exec_block(body, scope),
            Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. }
            | Stmt::While { .. }
            | Stmt::DoWhile { .. } => self.exec_loop(stmt, scope, &[]),
            Stmt::Break(label) => Ok(Completion::Break(label.clone())),
            Stmt::Continue(label) => Ok(Completion::Continue(label.clone())),
            Stmt::Throw(expr) => {
                let value = self.eval(expr, scope)?;
                Err(Unwind::Throw(value))
            }
            Stmt::Try {
                block,
                handler,
                finalizer,
            } => self.exec_try(block, handler.as_ref(), finalizer.as_deref(), scope),
            Stmt::Switch {
                discriminant,
                cases,
            } => self.exec_switch(discriminant, cases, scope),
            Stmt::Labeled { .. } => {
                let mut labels = Vec::new();
                let mut body = stmt;
                while let Stmt::Labeled { label, body: inner } = body {
                    labels.push(label.clone());
                    body = inner;
                }
                let completion = if is_loop(body) {
                    self.exec_loop(body, scope, &labels)?
                } else {
                    self.exec_stmt(body, scope)?
                };
                match completion {
                    Completion::Break(Some(label)) if labels.contains(&label) => {
                        Ok(Completion::Normal)
                    }
                    other => Ok(other),
                }
            }
        }
    }

    fn exec_declaration(
        &mut self,
        kind: DeclKind,
        decls: &[Declarator],
        scope: &Rc<Scope>,
    ) -> EvalResult<()> {
        for decl in decls {
            let value = match &decl.init {
                Some(init) => self.eval(init, scope)?,
                None if kind == DeclKind::Var => continue,
                None => Value::Undefined,
            };
            self.bind_pattern(&decl.target, value, scope, BindMode::for_decl(kind))?;
        }
        Ok(())
    }

    fn exec_loop(
        &mut self,
        stmt: &Stmt,
        scope: &Rc<Scope>,
        labels: &[Rc<str>],
    ) -> EvalResult<Completion> {
        match stmt {
            Stmt::While { test, body } => loop {
                self.check_interrupt()?;
                if !self.eval(test, scope)?.is_truthy() {
                    return Ok(Completion::Normal);
                }
                match loop_control(self.exec_stmt(body, scope)?, labels) {
                    Flow::Next => {}
                    Flow::Break => return Ok(Completion::Normal),
                    Flow::Exit(completion) => return Ok(completion),
                }
            },
            Stmt::DoWhile { body, test } => loop {
                self.check_interrupt()?;
                match loop_control(self.exec_stmt(body, scope)?, labels) {
                    Flow::Next => {}
                    Flow::Break => return Ok(Completion::Normal),
                    Flow::Exit(completion) => return Ok(completion),
                }
                if !self.eval(test, scope)?.is_truthy() {
                    return Ok(Completion::Normal);
                }
            },
            Stmt::For {
                init,
                test,
                update,
                body,
            } => self.exec_for(init.as_ref(), test.as_ref(), update.as_ref(), body, scope, labels),
            Stmt::ForOf { left, right, body } => {
                let iterable = self.eval(right, scope)?;
                let source = self.iteration_source(&iterable)?;
                self.exec_for_each(left, source, body, scope, labels)
            }
            Stmt::ForIn { left, right, body } => {
                let object = self.eval(right, scope)?;
                let keys = self
                    .own_entries(&object)
                    .into_iter()
                    .map(|(key, _)| Value::String(key))
                    .collect();
                self.exec_for_each(left, IterSource::List(keys), body, scope, labels)
            }
            _ => self.exec_stmt(stmt, scope),
        }
    }

    fn exec_for(
        &mut self,
        init: Option<&ForInit>,
        test: Option<&Expr>,
        update: Option<&Expr>,
        body: &Stmt,
        scope: &Rc<Scope>,
        labels: &[Rc<str>],
    ) -> EvalResult<Completion> {
        let mut iter_scope = scope.clone();
        let mut per_iteration = Vec::new();
        match init {
            Some(ForInit::Decl { kind, decls }) if *kind != DeclKind::Var => {
                let loop_scope = self.new_scope(scope);
                let binding = if *kind == DeclKind::Const {
                    BindingKind::Const
                } else {
                    BindingKind::Mutable
                };
                let mut names = Vec::new();
                for decl in decls {
                    decl.target.bound_names(&mut names);
                }
                for name in &names {
                    loop_scope.define_uninitialized(name.clone(), binding);
                }
                self.exec_declaration(*kind, decls, &loop_scope)?;
                if *kind == DeclKind::Let {
                    per_iteration = names;
                }
                iter_scope = loop_scope;
            }
            Some(ForInit::Decl { kind, decls }) => self.exec_declaration(*kind, decls, scope)?,
            Some(ForInit::Expr(expr)) => {
                self.eval(expr, scope)?;
            }
            None => {}
        }
        if !per_iteration.is_empty() {
            iter_scope = self.copy_iteration_scope(scope, &iter_scope, &per_iteration);
        }
        loop {
            self.check_interrupt()?;
            if let Some(test) = test {
                if !self.eval(test, &iter_scope)?.is_truthy() {
                    break;
                }
            }
            match loop_control(self.exec_stmt(body, &iter_scope)?, labels) {
                Flow::Next => {}
                Flow::Break => break,
                Flow::Exit(completion) => return Ok(completion),
            }
            if !per_iteration.is_empty() {
                iter_scope = self.copy_iteration_scope(scope, &iter_scope, &per_iteration);
            }
            if let Some(update) = update {
                self.eval(update, &iter_scope)?;
            }
        }
        Ok(Completion::Normal)
    }

    /// Fresh copy of a `for (let …)` binding set so closures capture one iteration each.
    fn copy_iteration_scope(
        &mut self,
        parent: &Rc<Scope>,
        from: &Rc<Scope>,
        names: &[Rc<str>],
    ) -> Rc<Scope> {
        let next = self.new_scope(parent);
        for name in names {
            let value = from.get_own(name).unwrap_or(Value::Undefined);
            next.define(name.clone(), value, BindingKind::Mutable);
        }
        next
    }

    fn exec_for_each(
        &mut self,
        left: &ForBinding,
        source: IterSource,
        body: &Stmt,
        scope: &Rc<Scope>,
        labels: &[Rc<str>],
    ) -> EvalResult<Completion> {
        let mut index = 0;
        loop {
            self.check_interrupt()?;
            let item = match &source {
                IterSource::Array(array) => match &array.borrow().kind {
                    ObjectKind::Array(items) => items.get(index).cloned(),
                    _ => None,
                },
                IterSource::List(items) => items.get(index).cloned(),
            };
            let Some(item) = item else {
                return Ok(Completion::Normal);
            };
            index += 1;
            let iter_scope = match left {
                ForBinding::Decl {
                    kind: DeclKind::Var,
                    target,
                } => {
                    self.bind_pattern(target, item, scope, BindMode::Var)?;
                    scope.clone()
                }
                ForBinding::Decl { kind, target } => {
                    let inner = self.new_scope(scope);
                    self.bind_pattern(target, item, &inner, BindMode::for_decl(*kind))?;
                    inner
                }
                ForBinding::Target(target) => {
                    self.bind_pattern(target, item, scope, BindMode::Assign)?;
                    scope.clone()
                }
            };
            match loop_control(self.exec_stmt(body, &iter_scope)?, labels) {
                Flow::Next => {}
                Flow::Break => return Ok(Completion::Normal),
                Flow::Exit(completion) => return Ok(completion),
            }
        }
    }

    fn exec_try(
        &mut self,
        block: &[Stmt],
        handler: Option<&CatchClause>,
        finalizer: Option<&[Stmt]>,
        scope: &Rc<Scope>,
    ) -> EvalResult<Completion> {
        let mut result = self.exec_block(block, scope);
        if let Some(handler) = handler {
            if let Err(Unwind::Throw(exception)) = result {
                let catch_scope = self.new_scope(scope);
                result = match &handler.param {
                    Some(param) => self.bind_pattern(param, exception, &catch_scope, BindMode::Let),
                    None => Ok(()),
                }
                .and_then(|()| {
                    self.hoist(&handler.body, &catch_scope);
                    self.exec_stmts(&handler.body, &catch_scope)
                });
            }
        }
        if matches!(result, Err(Unwind::Interrupted)) {
            return result;
        }
        match finalizer {
            Some(finalizer) => match self.exec_block(finalizer, scope)? {
                Completion::Normal => result,
                abrupt => Ok(abrupt),
            },
            None => result,
        }
    }

    fn exec_switch(
        &mut self,
        discriminant: &Expr,
        cases: &[SwitchCase],
        scope: &Rc<Scope>,
    ) -> EvalResult<Completion> {
        let value = self.eval(discriminant, scope)?;
        let case_scope = if cases.iter().any(|case| needs_scope(&case.body)) {
            let inner = self.new_scope(scope);
            for case in cases {
                self.hoist(&case.body, &inner);
            }
            inner
        } else {
            scope.clone()
        };
        let mut start = None;
        for (i, case) in cases.iter().enumerate() {
            if let Some(test) = &case.test {
                let candidate = self.eval(test, &case_scope)?;
                if strict_equals(&value, &candidate) {
                    start = Some(i);
                    break;
                }
            }
        }
        let start = start.or_else(|| cases.iter().position(|case| case.test.is_none()));
        if let Some(start) = start {
            for case in &cases[start..] {
                match self.exec_stmts(&case.body, &case_scope)? {
                    Completion::Normal => {}
                    Completion::Break(None) => return Ok(Completion::Normal),
                    other => return Ok(other),
                }
            }
        }
        Ok(Completion::Normal)
    }

    // -----------------------------------------------------------------------
    // Bindings
    // -----------------------------------------------------------------------

    fn lookup_ident(&mut self, name: &str, scope: &Rc<Scope>, pos: Pos) -> EvalResult<Value> {
        match scope.lookup(name) {
            Lookup::Found(value) => Ok(value),
            Lookup::Uninitialized => {
                self.mark(pos);
                self.reference_error(format!("Cannot access '{}' before initialization", name))
            }
            Lookup::Missing => {
                self.mark(pos);
                self.reference_error(format!("{} is not defined", name))
            }
        }
    }

    fn assign_ident(
        &mut self,
        name: &str,
        value: Value,
        scope: &Rc<Scope>,
        pos: Pos,
    ) -> EvalResult<()> {
        let outcome = scope.assign(name, value);
        if !matches!(outcome, Assignment::Done) {
            self.mark(pos);
        }
        match outcome {
            Assignment::Done => Ok(()),
            Assignment::Const => self.type_error("Assignment to constant variable."),
            Assignment::ReadOnly => self.type_error(format!(
                "Cannot assign to read only property '{}' of object '#<Object>'",
                name
            )),
            Assignment::Uninitialized => {
                self.reference_error(format!("Cannot access '{}' before initialization", name))
            }
            Assignment::Missing => self.reference_error(format!("{} is not defined", name)),
        }
    }

    fn apply_default(
        &mut self,
        value: Value,
        default: &Option<Expr>,
        scope: &Rc<Scope>,
    ) -> EvalResult<Value> {
        match (value, default) {
            (Value::Undefined, Some(default)) => self.eval(default, scope),
            (value, _) => Ok(value),
        }
    }

    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        value: Value,
        scope: &Rc<Scope>,
        mode: BindMode,
    ) -> EvalResult<()> {
        match pattern {
            Pattern::Ident(name, pos) => match mode {
                BindMode::Let => {
                    scope.define(name.clone(), value, BindingKind::Mutable);
                    Ok(())
                }
                BindMode::Const => {
                    scope.define(name.clone(), value, BindingKind::Const);
                    Ok(())
                }
                BindMode::Var | BindMode::Assign => self.assign_ident(name, value, scope, *pos),
            },
            Pattern::Member(target) => {
                let (object, key) = self.eval_reference(target, scope)?;
                self.set(&object, &key, value)
            }
            Pattern::Array { elements, rest } => {
                let mut items = self.iterate(&value)?.into_iter();
                for element in elements {
                    let item = items.next().unwrap_or(Value::Undefined);
                    if let Some(element) = element {
                        let item = self.apply_default(item, &element.default, scope)?;
                        self.bind_pattern(&element.target, item, scope, mode)?;
                    }
                }
                if let Some(rest) = rest {
                    let remaining = self.new_array(items.collect());
                    self.bind_pattern(rest, remaining, scope, mode)?;
                }
                Ok(())
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    let shown = to_js_string(&value);
                    return self.type_error(format!(
                        "Cannot destructure '{}' as it is {}.",
                        shown, shown
                    ));
                }
                let mut used = Vec::with_capacity(props.len());
                for prop in props {
                    let key = self.member_key(&prop.key, scope)?;
                    let item = self.get(&value, &key)?;
                    used.push(key.to_js_string());
                    let item = self.apply_default(item, &prop.default, scope)?;
                    self.bind_pattern(&prop.target, item, scope, mode)?;
                }
                if let Some(rest) = rest {
                    let mut remaining = JsObject::new(ObjectKind::Ordinary);
                    for (key, item) in self.own_entries(&value) {
                        if !used.contains(&key) {
                            remaining.props.insert(key, item);
                        }
                    }
                    let remaining = Value::Object(self.alloc(remaining));
                    self.bind_pattern(rest, remaining, scope, mode)?;
                }
                Ok(())
            }
        }
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    fn eval(&mut self, expr: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::String(JsString::from(s))),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Template { quasis, exprs } => {
                let mut out = String::new();
                for (i, quasi) in quasis.iter().enumerate() {
                    out.push_str(quasi);
                    if let Some(expr) = exprs.get(i) {
                        let value = self.eval(expr, scope)?;
                        out.push_str(&to_js_string(&value));
                    }
                }
                Ok(Value::string(out))
            }
            ExprKind::Regex { pattern, flags } => {
                self.mark(expr.pos);
                self.new_regexp(pattern, flags)
            }
            ExprKind::Ident(name) => self.lookup_ident(name, scope, expr.pos),
            ExprKind::This => Ok(scope.this_value()),
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ArrayItem::Hole => values.push(Value::Undefined),
                        ArrayItem::Item(expr) => values.push(self.eval(expr, scope)?),
                        ArrayItem::Spread(expr) => {
                            let source = self.eval(expr, scope)?;
                            values.extend(self.iterate(&source)?);
                        }
                    }
                }
                Ok(self.new_array(values))
            }
            ExprKind::Object(props) => self.eval_object_literal(props, scope),
            ExprKind::Function(def) => Ok(self.eval_function_expr(def, scope)),
            ExprKind::Unary(op, operand) => self.eval_unary(*op, operand, scope),
            ExprKind::Update {
                increment,
                prefix,
                target,
            } => self.eval_update(*increment, *prefix, target, scope),
            ExprKind::Binary(op, left, right) => {
                let left = self.eval(left, scope)?;
                let right = self.eval(right, scope)?;
                if matches!(op, BinaryOp::In | BinaryOp::Instanceof) {
                    self.mark(expr.pos);
                }
                self.binary(*op, &left, &right)
            }
            ExprKind::Logical(op, left, right) => {
                let left = self.eval(left, scope)?;
                if logical_short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval(right, scope)
                }
            }
            ExprKind::Assign { op, target, value } => {
                self.eval_assign(*op, target, value, scope, expr.pos)
            }
            ExprKind::Conditional(test, consequent, alternate) => {
                if self.eval(test, scope)?.is_truthy() {
                    self.eval(consequent, scope)
                } else {
                    self.eval(alternate, scope)
                }
            }
            ExprKind::Call {
                callee,
                args,
                optional,
            } => self.eval_call(callee, args, *optional, scope, expr.pos),
            ExprKind::New { callee, args } => {
                let constructor = self.eval(callee, scope)?;
                let args = self.eval_args(args, scope)?;
                self.mark(expr.pos);
                self.construct(&constructor, &args, &callee.describe())
            }
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, scope)?;
                if *optional && object.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                let key = self.member_key(property, scope)?;
                self.mark(expr.pos);
                self.get(&object, &key)
            }
            ExprKind::OptionalChain(inner) => match self.eval(inner, scope) {
                Err(Unwind::ShortCircuit) => Ok(Value::Undefined),
                other => other,
            },
            ExprKind::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, scope)?;
                }
                Ok(last)
            }
        }
    }

    fn eval_function_expr(&mut self, def: &Rc<FunctionDef>, scope: &Rc<Scope>) -> Value {
        match &def.id {
            Some(id) if !def.is_arrow => {
                let inner = self.new_scope(scope);
                let function = self.make_function(def, &inner);
                inner.define(id.clone(), function.clone(), BindingKind::Const);
                function
            }
            _ => self.make_function(def, scope),
        }
    }

    fn eval_object_literal(&mut self, props: &[ObjectProp], scope: &Rc<Scope>) -> EvalResult<Value> {
        let object = self.alloc(JsObject::new(ObjectKind::Ordinary));
        for prop in props {
            match prop {
                ObjectProp::KeyValue(key, value) => {
                    let key = self.member_key(key, scope)?;
                    let value = self.eval(value, scope)?;
                    object.borrow_mut().props.insert(key.to_js_string(), value);
                }
                ObjectProp::Spread(expr) => {
                    let source = self.eval(expr, scope)?;
                    let entries = self.own_entries(&source);
                    let mut inner = object.borrow_mut();
                    for (key, value) in entries {
                        inner.props.insert(key, value);
                    }
                }
            }
        }
        Ok(Value::Object(object))
    }

    fn eval_args(&mut self, args: &[Arg], scope: &Rc<Scope>) -> EvalResult<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Plain(expr) => values.push(self.eval(expr, scope)?),
                Arg::Spread(expr) => {
                    let source = self.eval(expr, scope)?;
                    values.extend(self.iterate(&source)?);
                }
            }
        }
        Ok(values)
    }

    fn member_key(&mut self, key: &PropKey, scope: &Rc<Scope>) -> EvalResult<PropertyKey> {
        match key {
            PropKey::Static(name) => Ok(PropertyKey::from_static(name)),
            PropKey::Computed(expr) => {
                let value = self.eval(expr, scope)?;
                Ok(PropertyKey::from_value(&value))
            }
        }
    }

    /// Base object and key of a member expression used as a target.
    fn eval_reference(&mut self, expr: &Expr, scope: &Rc<Scope>) -> EvalResult<(Value, PropertyKey)> {
        match &expr.kind {
            ExprKind::Member {
                object, property, ..
            } => {
                let object = self.eval(object, scope)?;
                let key = self.member_key(property, scope)?;
                self.mark(expr.pos);
                Ok((object, key))
            }
            _ => self.throw("SyntaxError", "Invalid left-hand side in assignment"),
        }
    }

    fn eval_unary(&mut self, op: UnaryOp, operand: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        match op {
            UnaryOp::Typeof => {
                if let ExprKind::Ident(name) = &operand.kind {
                    if let Lookup::Missing = scope.lookup(name) {
                        return Ok(Value::string("undefined"));
                    }
                }
                let value = self.eval(operand, scope)?;
                Ok(Value::string(value.type_of()))
            }
            UnaryOp::Delete => self.eval_delete(operand, scope),
            UnaryOp::Void => {
                self.eval(operand, scope)?;
                Ok(Value::Undefined)
            }
            UnaryOp::Not => Ok(Value::Bool(!self.eval(operand, scope)?.is_truthy())),
            UnaryOp::Neg => Ok(Value::Number(-to_number(&self.eval(operand, scope)?))),
            UnaryOp::Plus => Ok(Value::Number(to_number(&self.eval(operand, scope)?))),
            UnaryOp::BitNot => {
                let n = to_number(&self.eval(operand, scope)?);
                Ok(Value::Number(!to_int32(n) as f64))
            }
        }
    }

    fn eval_delete(&mut self, operand: &Expr, scope: &Rc<Scope>) -> EvalResult<Value> {
        match &operand.kind {
            ExprKind::Member {
                object,
                property,
                optional,
            } => {
                let object = self.eval(object, scope)?;
                if *optional && object.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                let key = self.member_key(property, scope)?;
                self.mark(operand.pos);
                self.delete(&object, &key).map(Value::Bool)
            }
            ExprKind::OptionalChain(inner) => match self.eval_delete(inner, scope) {
                Err(Unwind::ShortCircuit) => Ok(Value::Bool(true)),
                other => other,
            },
            _ => {
                self.eval(operand, scope)?;
                Ok(Value::Bool(true))
            }
        }
    }

    fn eval_update(
        &mut self,
        increment: bool,
        prefix: bool,
        target: &Expr,
        scope: &Rc<Scope>,
    ) -> EvalResult<Value> {
        let delta = if increment { 1.0 } else { -1.0 };
        let (old, new) = match &target.kind {
            ExprKind::Ident(name) => {
                let old = to_number(&self.lookup_ident(name, scope, target.pos)?);
                let new = old + delta;
                self.assign_ident(name, Value::Number(new), scope, target.pos)?;
                (old, new)
            }
            ExprKind::Member { .. } => {
                let (object, key) = self.eval_reference(target, scope)?;
                let old = to_number(&self.get(&object, &key)?);
                let new = old + delta;
                self.set(&object, &key, Value::Number(new))?;
                (old, new)
            }
            _ => {
                return self.throw(
                    "SyntaxError",
                    "Invalid left-hand side expression in postfix operation",
                )
            }
        };
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn eval_assign(
        &mut self,
        op: AssignOp,
        target: &Pattern,
        value: &Expr,
        scope: &Rc<Scope>,
        pos: Pos,
    ) -> EvalResult<Value> {
        match (op, target) {
            (AssignOp::Assign, Pattern::Ident(name, name_pos)) => {
                let value = self.eval(value, scope)?;
                self.assign_ident(name, value.clone(), scope, *name_pos)?;
                Ok(value)
            }
            (AssignOp::Assign, Pattern::Member(member)) => {
                let (object, key) = self.eval_reference(member, scope)?;
                let value = self.eval(value, scope)?;
                self.mark(pos);
                self.set(&object, &key, value.clone())?;
                Ok(value)
            }
            (AssignOp::Assign, pattern) => {
                let value = self.eval(value, scope)?;
                self.bind_pattern(pattern, value.clone(), scope, BindMode::Assign)?;
                Ok(value)
            }
            (op, Pattern::Ident(name, name_pos)) => {
                let old = self.lookup_ident(name, scope, *name_pos)?;
                let Some(new) = self.combine(op, old.clone(), value, scope)? else {
                    return Ok(old);
                };
                self.assign_ident(name, new.clone(), scope, *name_pos)?;
                Ok(new)
            }
            (op, Pattern::Member(member)) => {
                let (object, key) = self.eval_reference(member, scope)?;
                let old = self.get(&object, &key)?;
                let Some(new) = self.combine(op, old.clone(), value, scope)? else {
                    return Ok(old);
                };
                self.mark(pos);
                self.set(&object, &key, new.clone())?;
                Ok(new)
            }
            _ => self.throw("SyntaxError", "Invalid left-hand side in assignment"),
        }
    }

    /// New value of a compound assignment; `None` when a logical operator short-circuits.
    fn combine(
        &mut self,
        op: AssignOp,
        old: Value,
        value: &Expr,
        scope: &Rc<Scope>,
    ) -> EvalResult<Option<Value>> {
        match op {
            AssignOp::Logical(logical) => {
                if logical_short_circuits(logical, &old) {
                    Ok(None)
                } else {
                    self.eval(value, scope).map(Some)
                }
            }
            AssignOp::Compound(binary) => {
                let right = self.eval(value, scope)?;
                self.binary(binary, &old, &right).map(Some)
            }
            AssignOp::Assign => self.eval(value, scope).map(Some),
        }
    }

    fn eval_call(
        &mut self,
        callee: &Expr,
        args: &[Arg],
        optional: bool,
        scope: &Rc<Scope>,
        pos: Pos,
    ) -> EvalResult<Value> {
        let (function, this) = match &callee.kind {
            ExprKind::Member {
                object,
                property,
                optional: member_optional,
            } => {
                let this = self.eval(object, scope)?;
                if *member_optional && this.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
                let key = self.member_key(property, scope)?;
                self.mark(callee.pos);
                (self.get_method(&this, &key)?, this)
            }
            _ => (Callee::Value(self.eval(callee, scope)?), Value::Undefined),
        };
        if optional {
            if let Callee::Value(value) = &function {
                if value.is_nullish() {
                    return Err(Unwind::ShortCircuit);
                }
            }
        }
        let args = self.eval_args(args, scope)?;
        self.mark(pos);
        match function {
            Callee::Native(native) => native(self, &this, &args),
            Callee::Value(value) if value.is_callable() => self.call(&value, &this, &args),
            Callee::Value(_) => self.type_error(format!("{} is not a function", callee.describe())),
        }
    }

    // -----------------------------------------------------------------------
    // Operators
    // -----------------------------------------------------------------------

    pub fn binary(&mut self, op: BinaryOp, left: &Value, right: &Value) -> EvalResult<Value> {
        let number = |f: fn(f64, f64) -> f64| Value::Number(f(to_number(left), to_number(right)));
        let int32 = |f: fn(i32, i32) -> i32| {
            Value::Number(f(to_int32(to_number(left)), to_int32(to_number(right))) as f64)
        };
        Ok(match op {
            BinaryOp::Add => add(left, right),
            BinaryOp::Sub => number(|a, b| a - b),
            BinaryOp::Mul => number(|a, b| a * b),
            BinaryOp::Div => number(|a, b| a / b),
            BinaryOp::Rem => number(|a, b| a % b),
            BinaryOp::Pow => number(js_pow),
            BinaryOp::Eq => Value::Bool(loose_equals(left, right)),
            BinaryOp::Ne => Value::Bool(!loose_equals(left, right)),
            BinaryOp::StrictEq => Value::Bool(strict_equals(left, right)),
            BinaryOp::StrictNe => Value::Bool(!strict_equals(left, right)),
            BinaryOp::Lt => Value::Bool(less_than(left, right) == Some(true)),
            BinaryOp::Gt => Value::Bool(less_than(right, left) == Some(true)),
            BinaryOp::Le => Value::Bool(less_than(right, left) == Some(false)),
            BinaryOp::Ge => Value::Bool(less_than(left, right) == Some(false)),
            BinaryOp::BitAnd => int32(|a, b| a & b),
            BinaryOp::BitOr => int32(|a, b| a | b),
            BinaryOp::BitXor => int32(|a, b| a ^ b),
            BinaryOp::Shl => int32(|a, b| a.wrapping_shl(b as u32 & 31)),
            BinaryOp::Shr => int32(|a, b| a.wrapping_shr(b as u32 & 31)),
            BinaryOp::UShr => {
                let shift = to_uint32(to_number(right)) & 31;
                Value::Number((to_uint32(to_number(left)) >> shift) as f64)
            }
            BinaryOp::In => {
                let Value::Object(object) = right else {
                    return self.type_error(format!(
                        "Cannot use 'in' operator to search for '{}' in {}",
                        to_js_string(left),
                        to_js_string(right)
                    ));
                };
                let key = PropertyKey::from_value(left);
                Value::Bool(self.has_property(object, &key))
            }
            BinaryOp::Instanceof => Value::Bool(self.instance_of(left, right)?),
        })
    }

    fn instance_of(&mut self, value: &Value, constructor: &Value) -> EvalResult<bool> {
        let Some(function) = constructor.as_object().and_then(|o| o.function()) else {
            return self.type_error("Right-hand side of 'instanceof' is not callable");
        };
        let Value::Object(object) = value else {
            return Ok(false);
        };
        Ok(match function {
            Function::Native { name, .. } => builtins::is_instance(&name, object),
            Function::Closure { .. } => object
                .borrow()
                .constructor
                .as_ref()
                .is_some_and(|c| strict_equals(c, constructor)),
            Function::Bound { target, .. } => return self.instance_of(value, &target),
        })
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    pub fn get(&mut self, target: &Value, key: &PropertyKey) -> EvalResult<Value> {
        match target {
            Value::Undefined | Value::Null => self.type_error(format!(
                "Cannot read properties of {} (reading '{}')",
                to_js_string(target),
                key
            )),
            Value::String(s) => Ok(match key {
                PropertyKey::Index(i) => s
                    .char_at(*i)
                    .map(|c| Value::string(c.to_string()))
                    .unwrap_or(Value::Undefined),
                _ if key.name() == Some("length") => Value::Number(s.char_len() as f64),
                _ => self.method_value(target, key),
            }),
            Value::Number(_) | Value::Bool(_) => Ok(self.method_value(target, key)),
            Value::Object(object) => {
                let own = lookup_own(&object.borrow(), key);
                Ok(match own {
                    Some(value) => value,
                    None => self.method_value(target, key),
                })
            }
        }
    }

    pub fn get_named(&mut self, target: &Value, name: &str) -> EvalResult<Value> {
        self.get(target, &PropertyKey::from_str(name))
    }

    fn method_value(&mut self, target: &Value, key: &PropertyKey) -> Value {
        match key.name().and_then(|name| builtins::lookup_method(target, name).map(|f| (name, f))) {
            Some((name, method)) => {
                let name = name.to_string();
                self.native_function(&name, method, None, 0)
            }
            None => Value::Undefined,
        }
    }

    fn get_method(&mut self, target: &Value, key: &PropertyKey) -> EvalResult<Callee> {
        match target {
            Value::Undefined | Value::Null => {
                return self.get(target, key).map(Callee::Value);
            }
            Value::Object(object) => {
                let own = lookup_own(&object.borrow(), key);
                if let Some(value) = own {
                    return Ok(Callee::Value(value));
                }
            }
            Value::String(_) if key.name().is_none() || key.name() == Some("length") => {
                return self.get(target, key).map(Callee::Value);
            }
            _ => {}
        }
        Ok(
            match key.name().and_then(|name| builtins::lookup_method(target, name)) {
                Some(method) => Callee::Native(method),
                None => Callee::Value(Value::Undefined),
            },
        )
    }

    pub fn set(&mut self, target: &Value, key: &PropertyKey, value: Value) -> EvalResult<()> {
        let object = match target {
            Value::Undefined | Value::Null => {
                return self.type_error(format!(
                    "Cannot set properties of {} (setting '{}')",
                    to_js_string(target),
                    key
                ))
            }
            Value::Object(object) => object,
            primitive => {
                return self.type_error(format!(
                    "Cannot create property '{}' on {}",
                    key,
                    describe_for_error(primitive)
                ))
            }
        };
        let stored = store(&mut object.borrow_mut(), key, value);
        match stored {
            Ok(()) => Ok(()),
            Err(StoreError::ReadOnly) => self.type_error(format!(
                "Cannot assign to read only property '{}' of object '{}'",
                key,
                describe_for_error(target)
            )),
            Err(StoreError::NotExtensible) => self.type_error(format!(
                "Cannot add property {}, object is not extensible",
                key
            )),
            Err(StoreError::InvalidLength) => self.range_error("Invalid array length"),
        }
    }

    pub fn delete(&mut self, target: &Value, key: &PropertyKey) -> EvalResult<bool> {
        let object = match target {
            Value::Undefined | Value::Null => {
                return self.type_error("Cannot convert undefined or null to object")
            }
            Value::Object(object) => object,
            _ => return Ok(true),
        };
        let frozen = object.borrow().frozen;
        if frozen {
            return self.type_error(format!(
                "Cannot delete property '{}' of {}",
                key,
                describe_for_error(target)
            ));
        }
        let mut guard = object.borrow_mut();
        let inner = &mut *guard;
        match (&mut inner.kind, key) {
            (ObjectKind::Array(items), PropertyKey::Index(i)) => {
                if let Some(slot) = items.get_mut(*i) {
                    *slot = Value::Undefined;
                }
            }
            (_, PropertyKey::Index(i)) => {
                inner.props.shift_remove(i.to_string().as_str());
            }
            (_, key) => {
                inner.props.shift_remove(key.name().unwrap_or_default());
            }
        }
        Ok(true)
    }

    pub fn has_property(&self, object: &ObjRef, key: &PropertyKey) -> bool {
        {
            let inner = object.borrow();
            if let (ObjectKind::Array(items), PropertyKey::Index(i)) = (&inner.kind, key) {
                return *i < items.len();
            }
            if lookup_own(&inner, key).is_some() {
                return true;
            }
        }
        key.name()
            .is_some_and(|name| builtins::lookup_method(&Value::Object(object.clone()), name).is_some())
    }

    /// Own enumerable entries: array elements, object properties, string characters.
    pub fn own_entries(&self, value: &Value) -> Vec<(JsString, Value)> {
        match value {
            Value::Object(object) => {
                let inner = object.borrow();
                let items = match &inner.kind {
                    ObjectKind::Array(items) => items.as_slice(),
                    _ => &[],
                };
                let mut entries: Vec<(JsString, Value)> = items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| (JsString::from(i.to_string()), item.clone()))
                    .collect();
                let keys = inner.own_keys();
                for key in keys.into_iter().skip(items.len()) {
                    if let Some(value) = inner.props.get(&key) {
                        entries.push((key, value.clone()));
                    }
                }
                entries
            }
            Value::String(s) => s
                .chars()
                .enumerate()
                .map(|(i, c)| (JsString::from(i.to_string()), Value::string(c.to_string())))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn iteration_source(&mut self, value: &Value) -> EvalResult<IterSource> {
        if let Value::Object(object) = value {
            if object.is_array() {
                return Ok(IterSource::Array(object.clone()));
            }
        }
        self.iterate(value).map(IterSource::List)
    }

    /// Snapshot of the values a `for…of` loop or spread would visit.
    pub fn iterate(&mut self, value: &Value) -> EvalResult<Vec<Value>> {
        enum Shape {
            Items(Vec<Value>),
            Pairs(Vec<(Value, Value)>),
        }
        let shape = match value {
            Value::String(s) => Some(Shape::Items(
                s.chars().map(|c| Value::string(c.to_string())).collect(),
            )),
            Value::Object(object) => match &object.borrow().kind {
                ObjectKind::Array(items) => Some(Shape::Items(items.clone())),
                ObjectKind::Set(entries) => Some(Shape::Items(entries.values().cloned().collect())),
                ObjectKind::Map(entries) => Some(Shape::Pairs(entries.values().cloned().collect())),
                _ => None,
            },
            _ => None,
        };
        match shape {
            Some(Shape::Items(items)) => Ok(items),
            Some(Shape::Pairs(pairs)) => Ok(pairs
                .into_iter()
                .map(|(k, v)| self.new_array(vec![k, v]))
                .collect()),
            None => {
                let shown = match value {
                    Value::Object(_) => "object".to_string(),
                    Value::String(s) => format!("\"{}\"", s),
                    other => to_js_string(other).to_string(),
                };
                self.type_error(format!("{} is not iterable", shown))
            }
        }
    }
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.frames.clear();
        self.regex_cache.clear();
        self.heap.sweep();
    }
}

/// Message and stack of a thrown value. Objects without error data report
/// their own `message`/`stack` properties; primitives their string form.
pub fn describe_thrown(value: &Value) -> (String, String) {
    if let Value::Object(object) = value {
        let inner = object.borrow();
        if let ObjectKind::Error(error) = &inner.kind {
            return (error.message.to_string(), error.stack.to_string());
        }
        if let Some(message) = inner.props.get("message") {
            let stack = match inner.props.get("stack") {
                Some(Value::String(stack)) => stack.to_string(),
                _ => String::new(),
            };
            return (to_js_string(message).to_string(), stack);
        }
    }
    (to_js_string(value).to_string(), String::new())
}

/// Message and stack of any abnormal completion of a call.
pub fn describe_unwind(unwind: &Unwind) -> (String, String) {
    match unwind {
        Unwind::Throw(value) => describe_thrown(value),
        Unwind::Interrupted => ("Execution interrupted".to_string(), String::new()),
        Unwind::ShortCircuit => (
            "Optional chain escaped its expression".to_string(),
            String::new(),
        ),
    }
}

fn needs_scope(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| {
        matches!(
            stmt,
            Stmt::Function(_)
                | Stmt::Decl {
                    kind: DeclKind::Let | DeclKind::Const,
                    ..
                }
        )
    })
}

fn is_loop(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::For { .. }
            | Stmt::ForIn { .. }
            | Stmt::ForOf { .. }
            | Stmt::While { .. }
            | Stmt::DoWhile { .. }
    )
}

fn logical_short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.is_truthy(),
        LogicalOp::Or => left.is_truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

fn to_primitive(value: &Value) -> Value {
    match value {
        Value::Object(_) => Value::String(to_js_string(value)),
        other => other.clone(),
    }
}

fn add(left: &Value, right: &Value) -> Value {
    let left = to_primitive(left);
    let right = to_primitive(right);
    match (&left, &right) {
        (Value::String(a), b) => {
            let b = to_js_string(b);
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(a);
            out.push_str(&b);
            Value::string(out)
        }
        (a, Value::String(b)) => {
            let a = to_js_string(a);
            let mut out = String::with_capacity(a.len() + b.len());
            out.push_str(&a);
            out.push_str(b);
            Value::string(out)
        }
        (a, b) => Value::Number(to_number(a) + to_number(b)),
    }
}

/// Relational comparison; `None` when either side is `NaN`.
fn less_than(left: &Value, right: &Value) -> Option<bool> {
    let left = to_primitive(left);
    let right = to_primitive(right);
    if let (Value::String(a), Value::String(b)) = (&left, &right) {
        return Some(a.encode_utf16().lt(b.encode_utf16()));
    }
    let (a, b) = (to_number(&left), to_number(&right));
    if a.is_nan() || b.is_nan() {
        None
    } else {
        Some(a < b)
    }
}

fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() || (base.abs() == 1.0 && exponent.is_infinite()) {
        f64::NAN
    } else {
        base.powf(exponent)
    }
}

/// Own property value, including properties backed by the object's kind.
fn lookup_own(object: &JsObject, key: &PropertyKey) -> Option<Value> {
    let name = key.name();
    let intrinsic = match (&object.kind, key) {
        (ObjectKind::Array(items), PropertyKey::Index(i)) => {
            return Some(items.get(*i).cloned().unwrap_or(Value::Undefined));
        }
        (ObjectKind::Array(items), _) if name == Some("length") => {
            Some(Value::Number(items.len() as f64))
        }
        (ObjectKind::Function(function), _) => match name {
            Some("name") => Some(Value::string(function.name())),
            Some("length") => Some(Value::Number(function.length() as f64)),
            _ => None,
        },
        (ObjectKind::Error(error), _) => match name {
            Some("name") => Some(Value::String(error.name.clone())),
            Some("message") => Some(Value::String(error.message.clone())),
            Some("stack") => Some(Value::String(error.stack.clone())),
            _ => None,
        },
        (ObjectKind::Map(entries), _) if name == Some("size") => {
            Some(Value::Number(entries.len() as f64))
        }
        (ObjectKind::Set(entries), _) if name == Some("size") => {
            Some(Value::Number(entries.len() as f64))
        }
        (ObjectKind::RegExp(re), _) => match name {
            Some("source") => Some(Value::String(re.source.clone())),
            Some("flags") => Some(Value::String(re.flags.clone())),
            Some("lastIndex") => Some(Value::Number(re.last_index as f64)),
            Some("global") => Some(Value::Bool(re.flags.contains('g'))),
            Some("ignoreCase") => Some(Value::Bool(re.flags.contains('i'))),
            Some("multiline") => Some(Value::Bool(re.flags.contains('m'))),
            Some("dotAll") => Some(Value::Bool(re.flags.contains('s'))),
            Some("sticky") => Some(Value::Bool(re.flags.contains('y'))),
            Some("unicode") => Some(Value::Bool(re.flags.contains('u'))),
            _ => None,
        },
        _ => None,
    };
    if intrinsic.is_some() {
        return intrinsic;
    }
    match key {
        PropertyKey::Index(i) => object.props.get(i.to_string().as_str()).cloned(),
        _ => name.and_then(|name| object.props.get(name).cloned()),
    }
}

fn has_own(object: &JsObject, key: &PropertyKey) -> bool {
    match (&object.kind, key) {
        (ObjectKind::Array(items), PropertyKey::Index(i)) => *i < items.len(),
        _ => lookup_own(object, key).is_some(),
    }
}

fn store(object: &mut JsObject, key: &PropertyKey, value: Value) -> Result<(), StoreError> {
    if object.frozen {
        return Err(if has_own(object, key) {
            StoreError::ReadOnly
        } else {
            StoreError::NotExtensible
        });
    }
    let name = key.name();
    match (&mut object.kind, key) {
        (ObjectKind::Array(items), PropertyKey::Index(i)) => {
            let i = *i;
            if i < items.len() {
                items[i] = value;
            } else if i - items.len() > MAX_ARRAY_GAP {
                return Err(StoreError::InvalidLength);
            } else {
                items.resize(i, Value::Undefined);
                items.push(value);
            }
            return Ok(());
        }
        (ObjectKind::Array(items), _) if name == Some("length") => {
            let n = to_number(&value);
            if n < 0.0 || n.fract() != 0.0 || n >= 4_294_967_296.0 {
                return Err(StoreError::InvalidLength);
            }
            let n = n as usize;
            if n > items.len() + MAX_ARRAY_GAP {
                return Err(StoreError::InvalidLength);
            }
            items.resize(n, Value::Undefined);
            return Ok(());
        }
        (ObjectKind::Error(error), _) => {
            let slot = match name {
                Some("name") => Some(&mut error.name),
                Some("message") => Some(&mut error.message),
                Some("stack") => Some(&mut error.stack),
                _ => None,
            };
            if let Some(slot) = slot {
                *slot = to_js_string(&value);
                return Ok(());
            }
        }
        (ObjectKind::RegExp(re), _) if name == Some("lastIndex") => {
            re.last_index = to_number(&value).max(0.0) as usize;
            return Ok(());
        }
        (ObjectKind::Function(_), _) if matches!(name, Some("name" | "length")) => {
            return Err(StoreError::ReadOnly);
        }
        (ObjectKind::Map(_) | ObjectKind::Set(_), _) if name == Some("size") => {
            return Err(StoreError::ReadOnly);
        }
        _ => {}
    }
    object.props.insert(key.to_js_string(), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::parser::parse_program;

    fn run(src: &str) -> Interpreter {
        let program = parse_program(src).expect("program parses");
        let mut interpreter = Interpreter::new(EvalOptions::default());
        if let Err(Unwind::Throw(value)) = interpreter.run_program(&program) {
            panic!("uncaught: {:?}", describe_thrown(&value));
        }
        interpreter
    }

    fn global_number(interpreter: &Interpreter, name: &str) -> f64 {
        match interpreter.global_binding(name) {
            Some(Value::Number(n)) => n,
            other => panic!("{} is {:?}", name, other),
        }
    }

    fn global_string(interpreter: &Interpreter, name: &str) -> String {
        match interpreter.global_binding(name) {
            Some(Value::String(s)) => s.to_string(),
            other => panic!("{} is {:?}", name, other),
        }
    }

    fn thrown(src: &str) -> (String, String) {
        let program = parse_program(src).expect("program parses");
        let mut interpreter = Interpreter::new(EvalOptions::default());
        match interpreter.run_program(&program) {
            Err(Unwind::Throw(value)) => describe_thrown(&value),
            _ => panic!("expected a throw"),
        }
    }

    #[test]
    fn test_arithmetic_and_closures() {
        let i = run(
            "function counter() { let n = 0; return () => ++n; }
             const next = counter(); next(); next();
             const total = next() * 10 + 2 ** 3;",
        );
        assert_eq!(global_number(&i, "total"), 38.0);
    }

    #[test]
    fn test_per_iteration_let_bindings() {
        let i = run(
            "const fns = [];
             for (let k = 0; k < 3; k++) fns.push(() => k);
             const joined = fns.map(f => f()).join(',');",
        );
        assert_eq!(global_string(&i, "joined"), "0,1,2");
    }

    #[test]
    fn test_labeled_continue_and_switch() {
        let i = run(
            "let hits = 0;
             outer: for (const a of [1, 2, 3]) {
               for (const b of [1, 2, 3]) {
                 if (b === 2) continue outer;
                 hits += a * b;
               }
             }
             let label;
             switch (hits) { case 6: label = 'six'; break; default: label = 'other'; }",
        );
        assert_eq!(global_number(&i, "hits"), 6.0);
        assert_eq!(global_string(&i, "label"), "six");
    }

    #[test]
    fn test_destructuring_defaults_and_rest() {
        let i = run(
            "const { a, b: { c = 5 } = {}, ...others } = { a: 1, x: 2, y: 3 };
             const [first, , third = 9, ...tail] = [1, 2, undefined, 4, 5];
             const summary = `${a}-${c}-${Object.keys(others)}-${first}-${third}-${tail}`;",
        );
        assert_eq!(global_string(&i, "summary"), "1-5-x,y-1-9-4,5");
    }

    #[test]
    fn test_try_finally_ordering() {
        let i = run(
            "const log = [];
             function f() { try { log.push('try'); throw new Error('x'); }
               catch (e) { log.push(e.message); return 'caught'; }
               finally { log.push('finally'); } }
             const result = f() + ':' + log.join('|');",
        );
        assert_eq!(global_string(&i, "result"), "caught:try|x|finally");
    }

    #[test]
    fn test_optional_chaining_and_nullish() {
        let i = run(
            "const o = { inner: null };
             const a = o.inner?.deep.deeper ?? 'fallback';
             const b = o.missing?.();
             const c = typeof b;",
        );
        assert_eq!(global_string(&i, "a"), "fallback");
        assert_eq!(global_string(&i, "c"), "undefined");
    }

    #[test]
    fn test_reference_and_const_errors() {
        let (message, stack) = thrown("function f() { return missing + 1; }\nf();");
        assert_eq!(message, "missing is not defined");
        assert!(stack.starts_with("ReferenceError: missing is not defined\n    at f (solution.js:1:23)"));
        let (message, _) = thrown("const x = 1; x = 2;");
        assert_eq!(message, "Assignment to constant variable.");
        let (message, _) = thrown("{ x; let x = 1; }");
        assert_eq!(message, "Cannot access 'x' before initialization");
    }

    #[test]
    fn test_not_a_function_and_property_errors() {
        let (message, _) = thrown("const o = {}; o.run();");
        assert_eq!(message, "o.run is not a function");
        let (message, _) = thrown("let u; u.length;");
        assert_eq!(message, "Cannot read properties of undefined (reading 'length')");
    }

    #[test]
    fn test_call_depth_limit() {
        let program = parse_program("function r(n) { return r(n + 1); } r(0);").expect("parses");
        let mut interpreter = Interpreter::new(EvalOptions {
            max_call_depth: 50,
            ..EvalOptions::default()
        });
        match interpreter.run_program(&program) {
            Err(Unwind::Throw(value)) => {
                assert_eq!(describe_thrown(&value).0, "Maximum call stack size exceeded")
            }
            _ => panic!("expected RangeError"),
        }
    }

    #[test]
    fn test_interrupt_stops_infinite_loop() {
        let flag = Arc::new(AtomicBool::new(true));
        let program = parse_program("while (true) {}").expect("parses");
        let mut interpreter = Interpreter::new(EvalOptions {
            interrupt: Some(flag),
            ..EvalOptions::default()
        });
        assert!(matches!(
            interpreter.run_program(&program),
            Err(Unwind::Interrupted)
        ));
    }

    #[test]
    fn test_constructor_functions() {
        let i = run(
            "function Point(x, y) { this.x = x; this.y = y; }
             const p = new Point(1, 2);
             const ok = p instanceof Point && !(p instanceof Array);
             const s = ok ? p.x + p.y : -1;",
        );
        assert_eq!(global_number(&i, "s"), 3.0);
    }

    #[test]
    fn test_string_comparison_and_coercion() {
        let i = run(
            "const a = ('b' > 'a') + ('10' < '9') + (1 + '2' === '12');
             const b = [1, 2] + ''; const c = null ?? 'x';",
        );
        assert_eq!(global_number(&i, "a"), 3.0);
        assert_eq!(global_string(&i, "b"), "1,2");
        assert_eq!(global_string(&i, "c"), "x");
    }

    #[test]
    fn test_frozen_object_rejects_writes() {
        let (message, _) = thrown("const o = Object.freeze({ a: 1 }); o.a = 2;");
        assert_eq!(
            message,
            "Cannot assign to read only property 'a' of object '#<Object>'"
        );
    }
}
