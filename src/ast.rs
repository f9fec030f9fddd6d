//! This module defines the core value types and helper functions for
//! representing programs and data in the interpreter. The main enum,
//! [`Value`], covers every variant the language manipulates: bytes, exact
//! rationals, pair chains, growable arrays, symbols, deferred `$name`
//! lookups, native primitives, and closures. Absence is not a variant; it
//! is an absent `Option<Value>`, which keeps "no value" distinct from every
//! value the language can hold. Ergonomic helper functions such as [`val`],
//! [`sym`], [`rat`], and [`list`] are provided for convenient tree
//! construction in both code and tests. Cloning is the structural copy
//! operation: deep for data variants, identity for closures (which share
//! their captured frame) and primitives (which are never reclaimed). The
//! total order [`compare`] implements the language's comparison semantics,
//! including the diagnosed fallback for operands that have no order.

use std::cmp::Ordering;
use std::rc::Rc;

use crate::evaluator::Environment;
use crate::{Error, report};

/// Type alias for the integer component of rational values
pub(crate) type NumberType = i64;

/// An exact rational number.
///
/// Canonical form is fully reduced with the sign on the numerator and a
/// positive denominator. A zero denominator is a malformed value that only
/// a bad literal can produce (the reader diagnoses it); arithmetic keeps
/// such a value inert instead of crashing on it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Rational {
    pub num: NumberType,
    pub den: NumberType,
}

impl Rational {
    /// Build a rational in canonical form: reduced, denominator positive.
    /// The corner [`Self::checked_new`] rejects keeps its raw fields;
    /// reader literals never reach it, their components arrive
    /// non-negative.
    pub fn new(num: NumberType, den: NumberType) -> Self {
        Self::checked_new(num, den).unwrap_or(Rational { num, den })
    }

    /// Canonicalize, admitting failure: `None` when moving the sign onto
    /// the numerator overflows i64, which only a reduced component of
    /// magnitude 2^63 can cause. The checked arithmetic funnels through
    /// here, so such a result counts as leaving the rational range.
    pub fn checked_new(num: NumberType, den: NumberType) -> Option<Self> {
        if den == 0 {
            return Some(Rational { num, den });
        }
        let g = gcd(num.unsigned_abs(), den.unsigned_abs()) as NumberType;
        let (num, den) = (num / g, den / g);
        if den < 0 {
            Some(Rational {
                num: num.checked_neg()?,
                den: den.checked_neg()?,
            })
        } else {
            Some(Rational { num, den })
        }
    }

    /// A whole number as a rational (denominator 1).
    pub fn whole(num: NumberType) -> Self {
        Rational { num, den: 1 }
    }

    pub fn is_zero(self) -> bool {
        self.num == 0 && self.den != 0
    }

    /// Exact sum in canonical form; `None` on i64 overflow.
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        let num = self
            .num
            .checked_mul(rhs.den)?
            .checked_add(rhs.num.checked_mul(self.den)?)?;
        Rational::checked_new(num, self.den.checked_mul(rhs.den)?)
    }

    /// Exact difference in canonical form; `None` on i64 overflow.
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        let num = self
            .num
            .checked_mul(rhs.den)?
            .checked_sub(rhs.num.checked_mul(self.den)?)?;
        Rational::checked_new(num, self.den.checked_mul(rhs.den)?)
    }

    /// Exact product in canonical form; `None` on i64 overflow.
    pub fn checked_mul(self, rhs: Self) -> Option<Self> {
        Rational::checked_new(
            self.num.checked_mul(rhs.num)?,
            self.den.checked_mul(rhs.den)?,
        )
    }

    /// Exact quotient in canonical form; `None` on division by zero or
    /// i64 overflow. Never fabricates a zero denominator, and never
    /// hands back a negative one.
    pub fn checked_div(self, rhs: Self) -> Option<Self> {
        if rhs.num == 0 {
            return None;
        }
        Rational::checked_new(
            self.num.checked_mul(rhs.den)?,
            self.den.checked_mul(rhs.num)?,
        )
    }
}

/// Euclid on magnitudes. Callers guarantee `b != 0`.
fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    /// Cross-multiplied comparison, widened so canonical i64 components
    /// cannot overflow. Inert zero-denominator values order above every
    /// finite value and by numerator among themselves, keeping the order
    /// total and consistent with equality.
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.den == 0, other.den == 0) {
            (false, false) => {
                let lhs = i128::from(self.num) * i128::from(other.den);
                let rhs = i128::from(other.num) * i128::from(self.den);
                lhs.cmp(&rhs)
            }
            (true, true) => self.num.cmp(&other.num),
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
        }
    }
}

impl std::fmt::Debug for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Rational({}/{})", self.num, self.den)
    }
}

impl std::fmt::Display for Rational {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.den == 1 {
            write!(f, "{}", self.num)
        } else {
            write!(f, "{}/{}", self.num, self.den)
        }
    }
}

/// Signature shared by every native primitive: the head of an already
/// evaluated argument chain in, one possibly absent result out. Primitives
/// do their own arity and type checking.
pub type PrimitiveFn = fn(Option<Value>) -> Option<Value>;

/// Handle to a native procedure.
///
/// Copies all point at the same function; identity is the function
/// address, and a handle is never reclaimed by the value lifecycle.
#[derive(Clone, Copy)]
pub struct Primitive {
    pub name: &'static str,
    pub func: PrimitiveFn,
}

impl PartialEq for Primitive {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::fn_addr_eq(self.func, other.func)
    }
}

/// A user procedure: parameter chain, body sequence, and the scope frame
/// that was active at its creation. Copies of a closure are identity
/// copies sharing the frame, so mutations through one copy are visible
/// through every other.
pub struct Closure {
    pub params: Option<Value>,
    pub body: Option<Value>,
    pub env: Rc<Environment>,
}

/// Variant tag, used for type-stable rebinding and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Byte,
    Rational,
    Pair,
    Array,
    Primitive,
    Closure,
    Symbol,
    Evaluation,
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Kind::Byte => "byte",
            Kind::Rational => "rational",
            Kind::Pair => "pair",
            Kind::Array => "array",
            Kind::Primitive => "primitive",
            Kind::Closure => "closure",
            Kind::Symbol => "symbol",
            Kind::Evaluation => "evaluation",
        };
        write!(f, "{name}")
    }
}

/// Core value type of the interpreter.
///
/// Every value is exclusively owned; dropping one reclaims its children
/// exactly once. The two exceptions the data model calls for are
/// `Primitive` (a never-reclaimed handle) and `Closure` (clones share the
/// captured frame through the `Rc`).
///
/// To build a tree, use the ergonomic helper functions:
/// - `val(42)` for numbers, `sym("name")` for symbols, `byte(b'A')` for bytes
/// - `val("text")` for byte arrays, `val([1, 2, 3])` for numeric arrays
/// - `list([...])` / `list_from([...])` for pair chains
#[derive(Clone)]
pub enum Value {
    /// Character/boolean-like scalar; values below 2 print as digits
    Byte(u8),
    /// Exact rational, always reduced with a positive denominator
    Rational(Rational),
    /// Cons cell. Chains terminated by an absent rest form lists; the
    /// empty list is a cell with both slots absent.
    Pair {
        first: Option<Box<Value>>,
        rest: Option<Box<Value>>,
    },
    /// Growable 0-indexed buffer, distinct from pair chains
    Array(Vec<Value>),
    /// Native procedure handle
    Primitive(Primitive),
    /// User procedure; see [`Closure`]
    Closure(Rc<Closure>),
    /// Identifier, compared by name bytes
    Symbol(String),
    /// Deferred lookup marker, written `$name`
    Evaluation(String),
}

impl Value {
    /// The variant tag of this value.
    pub fn kind(&self) -> Kind {
        match self {
            Value::Byte(_) => Kind::Byte,
            Value::Rational(_) => Kind::Rational,
            Value::Pair { .. } => Kind::Pair,
            Value::Array(_) => Kind::Array,
            Value::Primitive(_) => Kind::Primitive,
            Value::Closure(_) => Kind::Closure,
            Value::Symbol(_) => Kind::Symbol,
            Value::Evaluation(_) => Kind::Evaluation,
        }
    }

    /// Check if a value is the empty list (a pair with both slots absent).
    pub fn is_empty_list(&self) -> bool {
        matches!(
            self,
            Value::Pair {
                first: None,
                rest: None
            }
        )
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Byte(b) => write!(f, "Byte({b})"),
            Value::Rational(r) => write!(f, "{r:?}"),
            Value::Pair { .. } => {
                write!(f, "Pair(")?;
                for (i, elem) in chain_iter(Some(self)).enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    match elem {
                        Some(v) => write!(f, "{v:?}")?,
                        None => write!(f, "_")?,
                    }
                }
                write!(f, ")")
            }
            Value::Array(elements) => {
                write!(f, "Array([")?;
                for (i, v) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{v:?}")?;
                }
                write!(f, "])")
            }
            Value::Primitive(p) => write!(f, "Primitive({})", p.name),
            // The captured frame is skipped: a frame can reach this closure
            // again, and Debug must not loop
            Value::Closure(c) => {
                write!(f, "Closure(params={:?}, body={:?})", c.params, c.body)
            }
            Value::Symbol(s) => write!(f, "Symbol({s})"),
            Value::Evaluation(s) => write!(f, "Evaluation(${s})"),
        }
    }
}

// From trait implementations for Value - enables .into() conversion

impl From<bool> for Value {
    /// Booleans follow the byte convention: true is `Byte(1)`, false `Byte(0)`.
    fn from(b: bool) -> Self {
        Value::Byte(u8::from(b))
    }
}

impl From<Rational> for Value {
    fn from(r: Rational) -> Self {
        Value::Rational(r)
    }
}

macro_rules! impl_from_integer {
    ($int_type:ty) => {
        impl From<$int_type> for Value {
            fn from(n: $int_type) -> Self {
                Value::Rational(Rational::whole(n as NumberType))
            }
        }
    };
}

// Generate From implementations for the integer types.
// u8 is deliberately left out: `byte` constructs Byte values, and a
// blanket u8 conversion would silently make rationals out of them.
impl_from_integer!(i8);
impl_from_integer!(i16);
impl_from_integer!(i32);
impl_from_integer!(NumberType); // Special case - no casting
impl_from_integer!(u16);
impl_from_integer!(u32);

impl From<&str> for Value {
    /// Strings are arrays of bytes, exactly as the string literal syntax
    /// produces them.
    fn from(s: &str) -> Self {
        Value::Array(s.bytes().map(Value::Byte).collect())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::from(s.as_str())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::Array(v.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for Value {
    fn from(arr: [T; N]) -> Self {
        Value::Array(arr.into_iter().map(|x| x.into()).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for Value {
    fn from(slice: &[T]) -> Self {
        Value::Array(slice.iter().cloned().map(|x| x.into()).collect())
    }
}

// Fallible conversions from `Value` back into Rust types.

impl TryFrom<&Value> for Rational {
    type Error = Error;

    /// Numeric view of a value. Bytes promote to whole rationals, which
    /// lets boolean and character results feed arithmetic.
    fn try_from(value: &Value) -> Result<Rational, Error> {
        match value {
            Value::Rational(r) => Ok(*r),
            Value::Byte(b) => Ok(Rational::whole(NumberType::from(*b))),
            other => Err(Error::Type(format!(
                "expected a number, found {}",
                other.kind()
            ))),
        }
    }
}

/// Helper function for creating symbols; accepts both &str and String
pub fn sym<S: AsRef<str>>(name: S) -> Value {
    Value::Symbol(name.as_ref().to_owned())
}

/// Helper function for creating Values from Rust literals
pub fn val<T: Into<Value>>(value: T) -> Value {
    value.into()
}

/// Helper function for creating canonical rationals
pub fn rat(num: NumberType, den: NumberType) -> Value {
    Value::Rational(Rational::new(num, den))
}

/// Helper function for creating byte values
pub fn byte(b: u8) -> Value {
    Value::Byte(b)
}

/// Create a closure capturing the given frame.
pub fn closure(params: Option<Value>, body: Option<Value>, env: &Rc<Environment>) -> Value {
    Value::Closure(Rc::new(Closure {
        params,
        body,
        env: Rc::clone(env),
    }))
}

/// Build a right-nested pair chain from possibly absent elements.
///
/// An empty iterator yields the empty list: a single cell with both slots
/// absent. Absent elements survive anywhere in the chain, including at
/// the end, where the final cell carries the absent element and an absent
/// rest.
pub fn list_from<I>(elements: I) -> Value
where
    I: IntoIterator<Item = Option<Value>>,
{
    let items: Vec<Option<Value>> = elements.into_iter().collect();
    let mut chain: Option<Value> = None;
    for item in items.into_iter().rev() {
        chain = Some(Value::Pair {
            first: item.map(Box::new),
            rest: chain.map(Box::new),
        });
    }
    chain.unwrap_or(Value::Pair {
        first: None,
        rest: None,
    })
}

/// Build a pair chain from present elements.
pub fn list<I>(elements: I) -> Value
where
    I: IntoIterator<Item = Value>,
{
    list_from(elements.into_iter().map(Some))
}

/// Iterate the elements of a pair chain front to back.
///
/// Yields one possibly absent item per cell. The empty list (a head cell
/// with both slots absent) yields nothing; the same cell reached as a
/// rest is an ordinary trailing absent element. A chain whose rest is a
/// non-pair value yields that value as its final item.
pub fn chain_iter(chain: Option<&Value>) -> ChainIter<'_> {
    ChainIter {
        cursor: chain,
        at_head: true,
    }
}

pub struct ChainIter<'a> {
    cursor: Option<&'a Value>,
    at_head: bool,
}

impl<'a> Iterator for ChainIter<'a> {
    type Item = Option<&'a Value>;

    fn next(&mut self) -> Option<Self::Item> {
        let at_head = std::mem::replace(&mut self.at_head, false);
        match self.cursor.take() {
            None => None,
            Some(Value::Pair { first, rest }) => {
                if at_head && first.is_none() && rest.is_none() {
                    // The empty list, not a one-element chain
                    return None;
                }
                self.cursor = rest.as_deref();
                Some(first.as_deref())
            }
            Some(improper_tail) => Some(Some(improper_tail)),
        }
    }
}

/// Number of elements in a pair chain. Absent elements count; a value
/// that is not a chain counts as a single element.
pub fn chain_len(chain: Option<&Value>) -> usize {
    chain_iter(chain).count()
}

/// Consume a pair chain into its owned elements, mirroring [`chain_iter`].
pub fn chain_into_vec(chain: Option<Value>) -> Vec<Option<Value>> {
    let mut items = Vec::new();
    let mut cursor = chain;
    let mut at_head = true;
    loop {
        match cursor {
            None => break,
            Some(Value::Pair { first, rest }) => {
                if at_head && first.is_none() && rest.is_none() {
                    break;
                }
                items.push(first.map(|b| *b));
                cursor = rest.map(|b| *b);
            }
            Some(improper_tail) => {
                items.push(Some(improper_tail));
                break;
            }
        }
        at_head = false;
    }
    items
}

/// Total order over possibly absent values.
///
/// Absence sorts below every value and equal to itself. Mismatched
/// variants have no meaningful order: the comparison is diagnosed as a
/// type error and falls back to treating the left operand as smaller. The
/// same fallback covers procedures with different identities. Rationals
/// compare cross-multiplied; chains and arrays compare element-wise with
/// a shorter equal prefix sorting first.
pub fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => compare_values(x, y),
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Byte(x), Value::Byte(y)) => x.cmp(y),
        (Value::Rational(x), Value::Rational(y)) => x.cmp(y),
        (Value::Symbol(x), Value::Symbol(y)) | (Value::Evaluation(x), Value::Evaluation(y)) => {
            x.as_bytes().cmp(y.as_bytes())
        }
        (Value::Array(x), Value::Array(y)) => {
            for (ex, ey) in x.iter().zip(y.iter()) {
                let ord = compare_values(ex, ey);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Value::Pair { .. }, Value::Pair { .. }) => {
            let mut xs = chain_iter(Some(a));
            let mut ys = chain_iter(Some(b));
            loop {
                match (xs.next(), ys.next()) {
                    (None, None) => return Ordering::Equal,
                    (None, Some(_)) => return Ordering::Less,
                    (Some(_), None) => return Ordering::Greater,
                    (Some(ex), Some(ey)) => {
                        let ord = compare(ex, ey);
                        if ord != Ordering::Equal {
                            return ord;
                        }
                    }
                }
            }
        }
        (Value::Primitive(x), Value::Primitive(y)) => {
            if x == y {
                Ordering::Equal
            } else {
                report(&Error::Type(
                    "primitives with different identities have no order".to_owned(),
                ));
                Ordering::Less
            }
        }
        (Value::Closure(x), Value::Closure(y)) => {
            if Rc::ptr_eq(x, y) {
                Ordering::Equal
            } else {
                report(&Error::Type(
                    "closures with different identities have no order".to_owned(),
                ));
                Ordering::Less
            }
        }
        _ => {
            report(&Error::Type(format!(
                "cannot order {} against {}",
                a.kind(),
                b.kind()
            )));
            Ordering::Less
        }
    }
}

/// Variant name of a possibly absent value, for diagnostics.
pub(crate) fn kind_name(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.kind().to_string(),
        None => "absence".to_owned(),
    }
}

/// Printed form of a possibly absent value. Absence prints as `NULL`.
pub fn print_opt(value: Option<&Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "NULL".to_owned(),
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // Bytes below 2 are the boolean convention and print as digits;
            // everything else prints as a character literal
            Value::Byte(b) if *b < 2 => write!(f, "{b}"),
            Value::Byte(b) => write!(f, "'{}'", *b as char),
            Value::Rational(r) => write!(f, "{r}"),
            Value::Pair { .. } => {
                write!(f, "(")?;
                for (i, elem) in chain_iter(Some(self)).enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    match elem {
                        Some(v) => write!(f, "{v}")?,
                        None => write!(f, "NULL")?,
                    }
                }
                write!(f, ")")
            }
            Value::Array(elements) => {
                // A byte array prints as the string literal that reads back
                // into it; other arrays have no literal syntax
                if elements.iter().all(|e| matches!(e, Value::Byte(_))) {
                    write!(f, "\"")?;
                    for e in elements {
                        if let Value::Byte(b) = e {
                            write!(f, "{}", *b as char)?;
                        }
                    }
                    write!(f, "\"")
                } else {
                    write!(f, "[")?;
                    for (i, elem) in elements.iter().enumerate() {
                        if i > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{elem}")?;
                    }
                    write!(f, "]")
                }
            }
            Value::Primitive(p) => write!(f, "#<primitive:{}>", p.name),
            Value::Closure(_) => write!(f, "#<closure>"),
            Value::Symbol(s) => write!(f, "{s}"),
            Value::Evaluation(s) => write!(f, "${s}"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Byte(a), Value::Byte(b)) => a == b,
            (Value::Rational(a), Value::Rational(b)) => a == b,
            (
                Value::Pair {
                    first: f1,
                    rest: r1,
                },
                Value::Pair {
                    first: f2,
                    rest: r2,
                },
            ) => f1 == f2 && r1 == r2,
            (Value::Array(a), Value::Array(b)) => a == b,
            // Procedures compare by identity, never by content
            (Value::Primitive(a), Value::Primitive(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Evaluation(a), Value::Evaluation(b)) => a == b,
            _ => false, // Different variants are never equal
        }
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod helper_function_tests {
    use super::*;

    #[test]
    fn test_helper_functions_data_driven() {
        // Test cases as (Value, Value) tuples: (helper_result, expected_value)
        let test_cases = vec![
            // Whole numbers from the integer macro
            (val(42), Value::Rational(Rational { num: 42, den: 1 })),
            (val(-17), Value::Rational(Rational { num: -17, den: 1 })),
            (val(-0), Value::Rational(Rational { num: 0, den: 1 })),
            (val(255u16), Value::Rational(Rational { num: 255, den: 1 })),
            (val(-128i8), Value::Rational(Rational { num: -128, den: 1 })),
            (
                val(NumberType::MAX),
                Value::Rational(Rational {
                    num: NumberType::MAX,
                    den: 1,
                }),
            ),
            // Rationals normalize on construction
            (rat(3, 4), Value::Rational(Rational { num: 3, den: 4 })),
            (rat(2, 4), Value::Rational(Rational { num: 1, den: 2 })),
            (rat(25, 100), Value::Rational(Rational { num: 1, den: 4 })),
            (rat(1, -2), Value::Rational(Rational { num: -1, den: 2 })),
            (rat(-6, -4), Value::Rational(Rational { num: 3, den: 2 })),
            (rat(0, 7), Value::Rational(Rational { num: 0, den: 1 })),
            // Booleans follow the byte convention
            (val(true), Value::Byte(1)),
            (val(false), Value::Byte(0)),
            (byte(b'A'), Value::Byte(65)),
            // Strings become byte arrays
            (
                val("hi"),
                Value::Array(vec![Value::Byte(b'h'), Value::Byte(b'i')]),
            ),
            (val(""), Value::Array(vec![])),
            // Sym, from both &str and String
            (sym("counter"), Value::Symbol("counter".to_owned())),
            (sym(String::from("x")), Value::Symbol("x".to_owned())),
            // Arrays from Rust arrays and vecs
            (val([1, 2, 3]), Value::Array(vec![val(1), val(2), val(3)])),
            (
                val(vec![sym("op"), val(42), val("result")]),
                Value::Array(vec![sym("op"), val(42), val("result")]),
            ),
        ];

        run_helper_function_tests(test_cases);
    }

    /// Helper function to run data-driven tests for helper functions
    fn run_helper_function_tests(test_cases: Vec<(Value, Value)>) {
        for (i, (actual, expected)) in test_cases.iter().enumerate() {
            assert_eq!(
                actual,
                expected,
                "Test case {} failed:\n  Expected: {:?}\n  Got: {:?}",
                i + 1,
                expected,
                actual
            );
        }
    }

    #[test]
    fn test_chain_construction_and_iteration() {
        // (1 2 3): three cells, right-nested, terminated by an absent rest
        let chain = list([val(1), val(2), val(3)]);
        let elements: Vec<Option<&Value>> = chain_iter(Some(&chain)).collect();
        assert_eq!(elements.len(), 3);
        assert_eq!(elements[0], Some(&val(1)));
        assert_eq!(elements[2], Some(&val(3)));
        assert_eq!(chain_len(Some(&chain)), 3);

        // The empty list is one cell with both slots absent and no elements
        let empty = list([]);
        assert!(empty.is_empty_list());
        assert_eq!(chain_len(Some(&empty)), 0);

        // An absent element survives construction and iteration, at the
        // end of the chain as well as in the middle
        let gapped = list_from(vec![Some(val(1)), None, Some(val(2))]);
        let elements: Vec<Option<&Value>> = chain_iter(Some(&gapped)).collect();
        assert_eq!(elements, vec![Some(&val(1)), None, Some(&val(2))]);
        let trailing = list_from(vec![Some(val(1)), None]);
        assert_eq!(chain_len(Some(&trailing)), 2);
        assert_eq!(chain_into_vec(Some(trailing)), vec![Some(val(1)), None]);

        // A nested empty list is an element, not a terminator
        let nested = list([val(1), list([])]);
        assert_eq!(chain_len(Some(&nested)), 2);
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod rational_tests {
    use super::*;

    #[test]
    fn test_rational_arithmetic_stays_canonical() {
        // (lhs, rhs, op, expected) where op is one of + - * /
        let test_cases: Vec<(Rational, Rational, char, Option<Rational>)> = vec![
            (
                Rational::new(1, 2),
                Rational::new(1, 4),
                '+',
                Some(Rational::new(3, 4)),
            ),
            (
                Rational::new(1, 2),
                Rational::new(1, 2),
                '+',
                Some(Rational::new(1, 1)),
            ),
            (
                Rational::new(-1, 2),
                Rational::new(1, 2),
                '+',
                Some(Rational::new(0, 1)),
            ),
            (
                Rational::new(1, 2),
                Rational::new(1, 3),
                '-',
                Some(Rational::new(1, 6)),
            ),
            (
                Rational::new(2, 3),
                Rational::new(3, 4),
                '*',
                Some(Rational::new(1, 2)),
            ),
            (
                Rational::new(1, 2),
                Rational::new(1, 4),
                '/',
                Some(Rational::new(2, 1)),
            ),
            (
                Rational::new(5, 1),
                Rational::new(-10, 1),
                '/',
                Some(Rational::new(-1, 2)),
            ),
            // Division by zero never fabricates a zero denominator
            (Rational::new(1, 2), Rational::new(0, 5), '/', None),
            // i64 overflow is detected, not wrapped
            (
                Rational::whole(NumberType::MAX),
                Rational::whole(NumberType::MAX),
                '+',
                None,
            ),
            (
                Rational::whole(NumberType::MAX),
                Rational::whole(2),
                '*',
                None,
            ),
            // A sign cannot move off a denominator of magnitude 2^63
            (
                Rational::whole(3),
                Rational::whole(NumberType::MIN),
                '/',
                None,
            ),
            // Equal magnitudes still cancel at the edge
            (
                Rational::whole(NumberType::MIN),
                Rational::whole(NumberType::MIN),
                '/',
                Some(Rational::whole(1)),
            ),
        ];

        for (i, (lhs, rhs, op, expected)) in test_cases.iter().enumerate() {
            let got = match op {
                '+' => lhs.checked_add(*rhs),
                '-' => lhs.checked_sub(*rhs),
                '*' => lhs.checked_mul(*rhs),
                '/' => lhs.checked_div(*rhs),
                _ => unreachable!(),
            };
            assert_eq!(got, *expected, "Test case {}: {lhs:?} {op} {rhs:?}", i + 1);
            // Every produced value is reduced with a positive denominator
            if let Some(r) = got {
                assert!(r.den > 0, "Test case {}: denominator not positive", i + 1);
                assert_eq!(
                    gcd(r.num.unsigned_abs(), r.den.unsigned_abs()),
                    1,
                    "Test case {}: not reduced",
                    i + 1
                );
            }
        }
    }

    #[test]
    fn test_canonical_form_at_the_i64_edge() {
        // A reduced denominator of -2^63 has no positive counterpart
        assert_eq!(Rational::checked_new(3, NumberType::MIN), None);
        assert_eq!(Rational::checked_new(NumberType::MIN, -3), None);
        // Reduction first can shrink the components back into range
        assert_eq!(
            Rational::checked_new(NumberType::MIN, NumberType::MIN),
            Some(Rational::whole(1))
        );
        assert_eq!(
            Rational::checked_new(0, NumberType::MIN),
            Some(Rational::whole(0))
        );
        // The infallible form keeps the raw fields in the rejected corner
        let raw = Rational::new(3, NumberType::MIN);
        assert_eq!((raw.num, raw.den), (3, NumberType::MIN));
    }

    #[test]
    fn test_rational_ordering() {
        // Cross-multiplied, no reduction needed to compare
        let test_cases = vec![
            (Rational::new(1, 2), Rational::new(2, 3), Ordering::Less),
            (Rational::new(3, 4), Rational::new(3, 4), Ordering::Equal),
            (Rational::new(-1, 2), Rational::new(1, 3), Ordering::Less),
            (Rational::new(7, 1), Rational::new(13, 2), Ordering::Greater),
            // Components near the i64 edge must not overflow the comparison
            (
                Rational::whole(NumberType::MAX),
                Rational::whole(NumberType::MIN),
                Ordering::Greater,
            ),
            // Inert zero-denominator values sort above every finite value
            (
                Rational::whole(NumberType::MAX),
                Rational::new(0, 0),
                Ordering::Less,
            ),
            (Rational::new(-1, 0), Rational::new(5, 1), Ordering::Greater),
            // and by numerator among themselves
            (Rational::new(1, 0), Rational::new(2, 0), Ordering::Less),
            (Rational::new(3, 0), Rational::new(3, 0), Ordering::Equal),
        ];
        for (i, (a, b, expected)) in test_cases.iter().enumerate() {
            assert_eq!(a.cmp(b), *expected, "Test case {}: {a:?} vs {b:?}", i + 1);
            // The order agrees with equality on every pair
            assert_eq!(
                a.cmp(b) == Ordering::Equal,
                a == b,
                "Test case {}: order and equality disagree",
                i + 1
            );
        }
    }
}
