//! ratl - Bootstrap interpreter for a small rational-valued symbolic language
//!
//! This crate implements the reader and tree-walking evaluator used while the
//! language is still developing itself: the simplest interpreter that honors
//! the data model, with every structure left inspectable at runtime. Source
//! text is read into a tree of values and the tree is evaluated directly
//! against a chain of scope frames; there is no compilation pass.
//!
//! ## The language
//!
//! ```text
//! (add 1/2 .25)           // exact rational arithmetic -> 3/4
//! (let x (lit (1 2 3)))   // bind x to an unevaluated list
//! $x                      // look x up, producing an independent copy
//! (if (less 1 2) "yes" else "no")
//! (print 'A' "bytes")     // chars and strings are byte values
//! (exit)                  // request session termination
//! ```
//!
//! Values are bytes, exact rationals (always reduced, denominator positive),
//! pair chains, growable arrays, symbols, deferred `$name` lookups, native
//! primitives, and closures. Absence (printed `NULL`) is first class: every
//! operation accepts it and may produce it.
//!
//! ## Diagnostics
//!
//! Runtime problems never unwind. Every diagnostic flows through [`report`]
//! and evaluation continues with a documented fallback value, usually
//! absence. Building with the `strict` feature turns any diagnostic into
//! process termination, which makes corpus smoke runs fail loudly.
//!
//! ## Modules
//!
//! - `ast`: the value model, structural copies, total ordering
//! - `reader`: text to value trees
//! - `evaluator`: scope frames and the eval/apply core
//! - `stdlib`: native primitives bound into the global frame

use std::fmt;

/// Maximum reader nesting depth to prevent stack overflow on hostile input
/// This limits parenthesis nesting; evaluation recursion is not capped
pub const MAX_READ_DEPTH: usize = 32;

/// Categorizes the different kinds of reader failures.
#[derive(Debug, PartialEq, Clone)]
pub enum SyntaxErrorKind {
    /// Invalid or unexpected syntax (bad tokens, malformed expressions)
    InvalidSyntax,
    /// Input ended before the expression was complete (EOF inside a list)
    Incomplete,
    /// Expression nesting exceeded the maximum read depth
    TooDeeplyNested,
}

/// A structured error providing detailed information about a reader failure.
#[derive(Debug, PartialEq, Clone)]
pub struct SyntaxError {
    pub kind: SyntaxErrorKind,
    pub message: String,
    /// Context snippet from the input showing where the error occurred (max 100 chars)
    pub context: Option<String>,
    /// The problematic token or character encountered, if identifiable
    pub found: Option<String>,
}

impl SyntaxError {
    /// Create a SyntaxError with all fields
    pub fn new(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        context: Option<String>,
        found: Option<String>,
    ) -> Self {
        SyntaxError {
            kind,
            message: message.into(),
            context,
            found,
        }
    }

    /// Create a simple SyntaxError with a kind and message but no context
    pub fn from_message(kind: SyntaxErrorKind, message: impl Into<String>) -> Self {
        Self::new(kind, message, None, None)
    }

    /// Create a SyntaxError with context extracted from the input at a
    /// given char offset, plus the offending token when identifiable
    pub fn with_context(
        kind: SyntaxErrorKind,
        message: impl Into<String>,
        input: &str,
        error_offset: usize,
        found: Option<String>,
    ) -> Self {
        const MAX_CONTEXT: usize = 100;

        // Show some context before the error position as well
        let context_start = error_offset.saturating_sub(20);

        let context_str: String = input
            .chars()
            .skip(context_start)
            .take(MAX_CONTEXT)
            .collect();

        let mut display_context = String::new();
        if context_start > 0 {
            display_context.push_str("[...]");
        }
        display_context.push_str(&context_str);
        if context_start + context_str.len() < input.len() {
            display_context.push_str("[...]");
        }

        // Replace newlines with visible markers for better error display
        let display_context = display_context.replace('\n', "\\n").replace('\r', "");

        Self::new(kind, message, Some(display_context), found)
    }
}

/// Error types for the interpreter
///
/// All of these are local diagnostics: the core reports them through
/// [`report`] and continues with a fallback value rather than unwinding.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Syntax(SyntaxError),
    Type(String),
    Unbound(String),
    /// Arithmetic anomalies (zero denominator, overflow); warnings, not
    /// failures, and the operation still yields its documented result
    Arithmetic(String),
    UnknownKeyword(String),
    Arity {
        expected: usize,
        got: usize,
        form: Option<String>, // Optional expression context
    },
}

impl Error {
    /// Create an arity error without expression context
    pub fn arity(expected: usize, got: usize) -> Self {
        Error::Arity {
            expected,
            got,
            form: None,
        }
    }

    /// Create an arity error with expression context
    pub fn arity_in(expected: usize, got: usize, form: String) -> Self {
        Error::Arity {
            expected,
            got,
            form: Some(form),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Syntax(e) => {
                write!(f, "SyntaxError: {}", e.message)?;
                if let Some(found) = &e.found {
                    write!(f, "\nFound: {found}")?;
                }
                if let Some(context) = &e.context {
                    write!(f, "\nContext: {context}")?;
                }
                Ok(())
            }
            Error::Type(msg) => write!(f, "Type error: {msg}"),
            Error::Unbound(name) => write!(f, "Unbound symbol: {name}"),
            Error::Arithmetic(msg) => write!(f, "Arithmetic warning: {msg}"),
            Error::UnknownKeyword(name) => write!(f, "Unknown keyword: {name}"),
            Error::Arity {
                expected,
                got,
                form,
            } => match form {
                Some(form) => write!(
                    f,
                    "ArityError: form {form}: expected {expected} arguments, got {got}"
                ),
                None => write!(
                    f,
                    "ArityError: expected {expected} arguments but got {got}"
                ),
            },
        }
    }
}

impl std::error::Error for Error {}

/// The single diagnostic hook.
///
/// Every runtime diagnostic in the crate funnels through here before the
/// emitting operation continues with its fallback value. Arithmetic
/// anomalies log as warnings, everything else as errors. With the `strict`
/// feature the hook terminates the process instead of returning.
pub fn report(err: &Error) {
    match err {
        Error::Arithmetic(_) => log::warn!("{err}"),
        _ => log::error!("{err}"),
    }

    #[cfg(feature = "strict")]
    std::process::exit(1);
}

pub mod ast;
pub mod evaluator;
pub mod reader;
pub mod stdlib;
