//! Core expression evaluation engine.
//!
//! Scope frames ([`Environment`]) chain child-to-parent and hold
//! kind-stamped bindings behind interior mutability, since child frames
//! and closures retain their enclosing frame. [`eval`] walks a value tree
//! directly, consuming it; the four keywords (`if`, `exit`, `lit`, `let`)
//! dispatch by name ahead of the default procedure-call path, and
//! [`apply`] carries the closure application contract. [`Session`]
//! packages a root frame with the primitive library bound together with
//! the exit latch, for drivers that alternate read, evaluate, print.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::{Closure, Kind, Value, chain_into_vec, chain_iter};
use crate::{Error, report};

/// One entry in a frame's binding table.
struct Binding {
    name: String,
    /// Variant stamp from the first present value bound under this name.
    /// Absence never stamps, so a name bound only to absence stays open.
    kind: Option<Kind>,
    value: Option<Value>,
}

/// A scope frame: a binding table plus the link to the enclosing frame.
/// The root frame is the one without a parent.
pub struct Environment {
    bindings: RefCell<Vec<Binding>>,
    parent: Option<Rc<Environment>>,
}

impl Environment {
    /// Create a root frame.
    pub fn new() -> Self {
        Environment {
            bindings: RefCell::new(Vec::new()),
            parent: None,
        }
    }

    /// Create a child frame enclosed by `parent`.
    pub fn with_parent(parent: &Rc<Environment>) -> Self {
        Environment {
            bindings: RefCell::new(Vec::new()),
            parent: Some(Rc::clone(parent)),
        }
    }

    /// Bind `name` in this frame.
    ///
    /// An existing entry rebinds in place when the variants agree. A
    /// variant mismatch is diagnosed, the offered value is dropped, and
    /// the entry keeps its prior value. A new name appends to the table.
    /// Returns whether the bind took effect.
    pub fn bind(&self, name: &str, value: Option<Value>) -> bool {
        let mut bindings = self.bindings.borrow_mut();
        let offered = value.as_ref().map(Value::kind);
        if let Some(entry) = bindings.iter_mut().find(|b| b.name == name) {
            if let (Some(stamped), Some(offered)) = (entry.kind, offered)
                && stamped != offered
            {
                report(&Error::Type(format!(
                    "{name} holds {stamped} values, cannot bind a {offered}"
                )));
                return false;
            }
            if entry.kind.is_none() {
                entry.kind = offered;
            }
            entry.value = value;
            return true;
        }
        bindings.push(Binding {
            name: name.to_owned(),
            kind: offered,
            value,
        });
        true
    }

    /// Silent probe: the bound value if `name` resolves in this frame or
    /// any ancestor, with no diagnostic on a miss. The outer level answers
    /// whether the name is bound at all, since absence itself can be the
    /// bound value.
    pub fn get(&self, name: &str) -> Option<Option<Value>> {
        // Linear scan; frames stay small in practice and the table keeps
        // its insertion order for inspection
        if let Some(entry) = self.bindings.borrow().iter().find(|b| b.name == name) {
            return Some(entry.value.clone());
        }
        match &self.parent {
            Some(parent) => parent.get(name),
            None => None,
        }
    }

    /// Look `name` up through this frame and its ancestors, yielding an
    /// independent copy of the bound value. A miss at the root frame is
    /// diagnosed as an unbound symbol and yields absence.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        match self.get(name) {
            Some(found) => found,
            None => {
                report(&Error::Unbound(name.to_owned()));
                None
            }
        }
    }

    /// Snapshot of every binding in this frame, in insertion order.
    pub fn get_all_bindings(&self) -> Vec<(String, Option<Value>)> {
        self.bindings
            .borrow()
            .iter()
            .map(|b| (b.name.clone(), b.value.clone()))
            .collect()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Evaluation status threaded through a session.
///
/// `exit` is a sticky request latched by the `exit` keyword. It never
/// aborts an evaluation in flight; it only tells the driver to stop
/// asking for more input.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Status {
    pub exit: bool,
}

/// The truth convention: a nonzero byte or a rational with a nonzero
/// numerator. Every other value is not truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Byte(b) => *b != 0,
        Value::Rational(r) => r.num != 0,
        _ => false,
    }
}

/// Evaluate an expression tree in the given frame.
///
/// Takes ownership of the expression: every sub-value is either consumed
/// into the result or dropped here. Diagnostics are reported and absorbed;
/// the documented fallback result is absence.
pub fn eval(exp: Option<Value>, env: &Rc<Environment>, status: &mut Status) -> Option<Value> {
    match exp {
        // Absence is self-evaluating
        None => None,
        // So are the scalar and aggregate data variants
        Some(
            v @ (Value::Byte(_)
            | Value::Rational(_)
            | Value::Array(_)
            | Value::Primitive(_)
            | Value::Closure(_)),
        ) => Some(v),
        // Reserved names resolve to their fixed values; any other bare
        // symbol denotes itself
        Some(Value::Symbol(name)) => match name.as_str() {
            "TRUE" => Some(Value::Byte(1)),
            "FALSE" => Some(Value::Byte(0)),
            "NULL" => None,
            _ => Some(Value::Symbol(name)),
        },
        // A marker forces a scope lookup and yields an independent copy
        Some(Value::Evaluation(name)) => env.lookup(&name),
        Some(Value::Pair { first, rest }) => eval_pair(first, rest, env, status),
    }
}

fn eval_pair(
    first: Option<Box<Value>>,
    rest: Option<Box<Value>>,
    env: &Rc<Environment>,
    status: &mut Status,
) -> Option<Value> {
    let Some(head) = first else {
        // A pair with an absent first is the empty list and yields itself
        return Some(Value::Pair { first: None, rest });
    };
    let args = rest.map(|b| *b);
    match *head {
        Value::Symbol(name) => eval_keyword(&name, args, env, status),
        other => {
            // Operator position: evaluate the head, then apply it
            let proc = eval(Some(other), env, status);
            apply(proc, args, env, status)
        }
    }
}

/// Keyword dispatch for a symbol in operator position, in precedence
/// order. The keywords are fixed reserved words; bindings under the same
/// names never affect this dispatch.
fn eval_keyword(
    name: &str,
    args: Option<Value>,
    env: &Rc<Environment>,
    status: &mut Status,
) -> Option<Value> {
    match name {
        "if" => eval_if(args, env, status),
        "exit" => eval_exit(args, env, status),
        "lit" => eval_lit(args, env, status),
        "let" => eval_let(args, env, status),
        _ => eval_call(name, args, env, status),
    }
}

/// Evaluate each element of an argument chain in place, left to right.
/// The cell structure survives; only the elements are replaced.
fn eval_args(args: Option<Value>, env: &Rc<Environment>, status: &mut Status) -> Option<Value> {
    match args {
        Some(Value::Pair { first, rest }) => {
            let first = eval(first.map(|b| *b), env, status);
            let rest = eval_args(rest.map(|b| *b), env, status);
            Some(Value::Pair {
                first: first.map(Box::new),
                rest: rest.map(Box::new),
            })
        }
        // A lone non-chain tail evaluates as itself
        other => eval(other, env, status),
    }
}

/// Evaluate a body in order, returning the value of its last expression.
/// An empty body yields absence.
fn eval_sequence(
    items: Vec<Option<Value>>,
    env: &Rc<Environment>,
    status: &mut Status,
) -> Option<Value> {
    let mut result = None;
    for item in items {
        result = eval(item, env, status);
    }
    result
}

/// `(if <cond> <then>... else <otherwise>...)`
///
/// The condition is evaluated first; an absent condition is a diagnosed
/// error. On a truthy condition the expressions before the literal `else`
/// symbol evaluate in sequence, otherwise the ones after it; a missing
/// branch yields absence.
fn eval_if(args: Option<Value>, env: &Rc<Environment>, status: &mut Status) -> Option<Value> {
    let mut items = chain_into_vec(args);
    if items.is_empty() {
        report(&Error::Type("if requires a condition".to_owned()));
        return None;
    }
    let cond = eval(items.remove(0), env, status);
    let Some(cond) = cond else {
        report(&Error::Type("if condition is absent".to_owned()));
        return None;
    };

    let else_at = items
        .iter()
        .position(|item| matches!(item, Some(Value::Symbol(name)) if name == "else"));
    let branch = if is_truthy(&cond) {
        if let Some(at) = else_at {
            items.truncate(at);
        }
        items
    } else {
        match else_at {
            Some(at) => items.split_off(at + 1),
            None => Vec::new(),
        }
    };
    eval_sequence(branch, env, status)
}

/// `(exit)`
///
/// Latches the termination request on the session status and yields
/// absence. Evaluation around it continues; the driver acts on the latch.
fn eval_exit(_args: Option<Value>, _env: &Rc<Environment>, status: &mut Status) -> Option<Value> {
    status.exit = true;
    None
}

/// `(lit <expr>...)`
///
/// One argument comes back unevaluated; several come back as the whole
/// unevaluated argument chain; none yields absence.
fn eval_lit(args: Option<Value>, _env: &Rc<Environment>, _status: &mut Status) -> Option<Value> {
    match args {
        Some(Value::Pair { first, rest: None }) => first.map(|b| *b),
        Some(chain @ Value::Pair { .. }) => Some(chain),
        other => other,
    }
}

/// `(let <symbol> <expr>)`
///
/// Evaluates the expression, binds it under the symbol in the current
/// frame, and returns a fresh structural copy of whatever the binding
/// holds afterwards: the new value on success, the surviving prior value
/// when the frame rejects the bind.
fn eval_let(args: Option<Value>, env: &Rc<Environment>, status: &mut Status) -> Option<Value> {
    let mut items = chain_into_vec(args);
    if items.len() != 2 {
        report(&Error::arity_in(2, items.len(), "let".to_owned()));
        return None;
    }
    let expr = items.pop().flatten();
    let target = items.pop().flatten();
    let Some(Value::Symbol(name)) = target else {
        report(&Error::Type("let binds a symbol".to_owned()));
        return None;
    };

    let value = eval(expr, env, status);
    let result = value.clone();
    if env.bind(&name, value) {
        result
    } else {
        env.get(&name).flatten()
    }
}

/// Default dispatch for a symbol in operator position: a bound primitive
/// or closure is invoked on the eagerly evaluated argument chain. Any
/// other resolution is an unknown keyword.
fn eval_call(
    name: &str,
    args: Option<Value>,
    env: &Rc<Environment>,
    status: &mut Status,
) -> Option<Value> {
    match env.get(name).flatten() {
        Some(Value::Primitive(prim)) => {
            let args = eval_args(args, env, status);
            (prim.func)(args)
        }
        Some(Value::Closure(proc)) => {
            let args = eval_args(args, env, status);
            apply_closure(&proc, args, status)
        }
        _ => {
            report(&Error::UnknownKeyword(name.to_owned()));
            None
        }
    }
}

/// Apply a procedure to an argument chain, evaluating the arguments
/// eagerly. Primitives receive the evaluated chain head; closures follow
/// the application contract. Anything else is a diagnosed type error.
pub fn apply(
    proc: Option<Value>,
    args: Option<Value>,
    env: &Rc<Environment>,
    status: &mut Status,
) -> Option<Value> {
    match proc {
        Some(Value::Primitive(prim)) => {
            let args = eval_args(args, env, status);
            (prim.func)(args)
        }
        Some(Value::Closure(proc)) => {
            let args = eval_args(args, env, status);
            apply_closure(&proc, args, status)
        }
        other => {
            let found = crate::ast::kind_name(other.as_ref());
            report(&Error::Type(format!("expected a procedure, found {found}")));
            None
        }
    }
}

/// The closure application contract: bind parameters to the already
/// evaluated arguments in a fresh frame enclosed by the captured one,
/// then evaluate the body as a sequence and return its last result.
fn apply_closure(proc: &Closure, args: Option<Value>, status: &mut Status) -> Option<Value> {
    let mut names = Vec::new();
    for param in chain_iter(proc.params.as_ref()) {
        match param {
            Some(Value::Symbol(name)) => names.push(name.clone()),
            other => {
                let found = crate::ast::kind_name(other);
                report(&Error::Type(format!(
                    "closure parameters must be symbols, found {found}"
                )));
                return None;
            }
        }
    }

    let args = chain_into_vec(args);
    if names.len() != args.len() {
        report(&Error::arity(names.len(), args.len()));
        return None;
    }

    let frame = Rc::new(Environment::with_parent(&proc.env));
    for (name, value) in names.iter().zip(args) {
        frame.bind(name, value);
    }
    // The closure outlives this call, so the body evaluates from a copy
    let body = chain_into_vec(proc.body.clone());
    eval_sequence(body, &frame, status)
}

/// Outcome of one session step.
#[derive(Debug, PartialEq)]
pub enum Step {
    /// The expression's value; the session continues
    Value(Option<Value>),
    /// The expression's value, with termination requested
    Exit(Option<Value>),
}

/// An interactive or scripted run: a root frame with the primitive
/// library bound, plus the accumulated status.
pub struct Session {
    global: Rc<Environment>,
    status: Status,
}

impl Session {
    /// Create a session over a fresh global frame with every primitive
    /// bound.
    pub fn new() -> Self {
        Session {
            global: create_global_env(),
            status: Status::default(),
        }
    }

    /// Evaluate one expression and report whether the session should end.
    pub fn step(&mut self, exp: Option<Value>) -> Step {
        let result = eval(exp, &self.global, &mut self.status);
        if self.status.exit {
            Step::Exit(result)
        } else {
            Step::Value(result)
        }
    }

    /// The root frame, for host-side construction and inspection.
    pub fn global(&self) -> &Rc<Environment> {
        &self.global
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a root frame with the primitive library bound.
pub fn create_global_env() -> Rc<Environment> {
    let global = Rc::new(Environment::new());
    crate::stdlib::bind_stdlib(&global);
    global
}
