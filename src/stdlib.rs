//! Native primitive library.
//!
//! Every primitive shares the call boundary of [`PrimitiveFn`]: the head
//! of an already evaluated argument chain in, one possibly absent value
//! out. Each primitive does its own arity and type checking, and every
//! problem is diagnosed through [`report`] rather than thrown; the
//! documented fallback result is absence.
//!
//! Absence handling differs by family. The accumulating primitives
//! (`add`, `mul`, `array`) skip absent elements, while the
//! explicit-operand ones (`eq`, `set`, `push`) refuse them with a
//! diagnostic.
//!
//! [`PRIMITIVES`] is the registry; [`bind_stdlib`] installs each entry
//! into a root frame at session start.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::io::BufRead;
use std::rc::Rc;
use std::sync::LazyLock;

use crate::ast::{
    NumberType, Primitive, PrimitiveFn, Rational, Value, chain_into_vec, chain_iter, chain_len,
    compare, kind_name, print_opt,
};
use crate::evaluator::Environment;
use crate::{Error, report};

/// Number of arguments a primitive accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    Range(usize, usize),
}

impl Arity {
    /// Whether `got` arguments satisfy this arity. A mismatch is diagnosed
    /// under the primitive's name.
    pub fn check(self, name: &str, got: usize) -> bool {
        let ok = match self {
            Self::Exact(n) => got == n,
            Self::AtLeast(n) => got >= n,
            Self::Range(lo, hi) => (lo..=hi).contains(&got),
        };
        if !ok {
            report(&Error::arity_in(self.min(), got, name.to_owned()));
        }
        ok
    }

    /// Smallest argument count this arity accepts.
    pub fn min(self) -> usize {
        match self {
            Self::Exact(n) | Self::AtLeast(n) | Self::Range(n, _) => n,
        }
    }
}

/// Decompose an argument chain into exactly `N` operands, diagnosing a
/// mismatch under the primitive's name.
fn take_exact<const N: usize>(name: &str, args: Option<Value>) -> Option<[Option<Value>; N]> {
    let items = chain_into_vec(args);
    if !Arity::Exact(N).check(name, items.len()) {
        return None;
    }
    <[Option<Value>; N]>::try_from(items).ok()
}

/// Numeric view of every present element in an argument chain. Absent
/// elements do not participate; present non-numeric ones are diagnosed
/// and then left out as well.
fn numeric_terms(args: Option<&Value>) -> Vec<Rational> {
    let mut terms = Vec::new();
    for item in chain_iter(args) {
        let Some(value) = item else { continue };
        match Rational::try_from(value) {
            Ok(term) => terms.push(term),
            Err(err) => report(&err),
        }
    }
    terms
}

/// Whole-number view of an index operand.
fn whole_index(value: &Value) -> Option<usize> {
    match value {
        Value::Rational(r) if r.den == 1 && r.num >= 0 => usize::try_from(r.num).ok(),
        Value::Byte(b) => Some(usize::from(*b)),
        other => {
            report(&Error::Type(format!(
                "expected a whole-number index, found {}",
                other.kind()
            )));
            None
        }
    }
}

fn builtin_add(args: Option<Value>) -> Option<Value> {
    let mut acc = Rational::whole(0);
    for term in numeric_terms(args.as_ref()) {
        match acc.checked_add(term) {
            Some(next) => acc = next,
            None => {
                report(&Error::Arithmetic("add left the rational range".to_owned()));
                return None;
            }
        }
    }
    Some(Value::Rational(acc))
}

fn builtin_mul(args: Option<Value>) -> Option<Value> {
    let mut acc = Rational::whole(1);
    for term in numeric_terms(args.as_ref()) {
        match acc.checked_mul(term) {
            Some(next) => acc = next,
            None => {
                report(&Error::Arithmetic("mul left the rational range".to_owned()));
                return None;
            }
        }
    }
    Some(Value::Rational(acc))
}

/// `(sub a b...)` subtracts the later terms from the first; a lone term
/// is negated.
fn builtin_sub(args: Option<Value>) -> Option<Value> {
    if !Arity::AtLeast(1).check("sub", chain_len(args.as_ref())) {
        return None;
    }
    let terms = numeric_terms(args.as_ref());
    let Some((&first, rest)) = terms.split_first() else {
        report(&Error::Type("sub requires a numeric base".to_owned()));
        return None;
    };
    let mut acc = if rest.is_empty() {
        Rational::whole(0).checked_sub(first)
    } else {
        Some(first)
    };
    for &term in rest {
        acc = match acc {
            Some(so_far) => so_far.checked_sub(term),
            None => None,
        };
    }
    match acc {
        Some(result) => Some(Value::Rational(result)),
        None => {
            report(&Error::Arithmetic("sub left the rational range".to_owned()));
            None
        }
    }
}

/// `(div a b...)` divides the first term by the later ones; a lone term
/// is inverted.
fn builtin_div(args: Option<Value>) -> Option<Value> {
    if !Arity::AtLeast(1).check("div", chain_len(args.as_ref())) {
        return None;
    }
    let terms = numeric_terms(args.as_ref());
    let Some((&first, rest)) = terms.split_first() else {
        report(&Error::Type("div requires a numeric base".to_owned()));
        return None;
    };
    let (mut acc, divisors) = if rest.is_empty() {
        (Rational::whole(1), std::slice::from_ref(&first))
    } else {
        (first, rest)
    };
    for &term in divisors {
        if term.is_zero() {
            report(&Error::Arithmetic("division by zero".to_owned()));
            return None;
        }
        match acc.checked_div(term) {
            Some(next) => acc = next,
            None => {
                report(&Error::Arithmetic("div left the rational range".to_owned()));
                return None;
            }
        }
    }
    Some(Value::Rational(acc))
}

/// Equality goes through the total order. Unlike the accumulating
/// primitives, it refuses absent operands outright.
fn builtin_eq(args: Option<Value>) -> Option<Value> {
    let [a, b] = take_exact("eq", args)?;
    if a.is_none() || b.is_none() {
        report(&Error::Type("eq requires present operands".to_owned()));
        return None;
    }
    Some(Value::Byte(u8::from(
        compare(a.as_ref(), b.as_ref()) == Ordering::Equal,
    )))
}

macro_rules! ordering_op {
    ($fn_name:ident, $prim_name:literal, $expected:path) => {
        fn $fn_name(args: Option<Value>) -> Option<Value> {
            let [a, b] = take_exact($prim_name, args)?;
            let ordering = compare(a.as_ref(), b.as_ref());
            Some(Value::Byte(u8::from(ordering == $expected)))
        }
    };
}

ordering_op!(builtin_less, "less", Ordering::Less);
ordering_op!(builtin_greater, "greater", Ordering::Greater);

fn builtin_len(args: Option<Value>) -> Option<Value> {
    let [target] = take_exact("len", args)?;
    let len = match &target {
        None => 0,
        Some(Value::Array(elements)) => elements.len(),
        Some(chain @ Value::Pair { .. }) => chain_len(Some(chain)),
        Some(other) => {
            report(&Error::Type(format!(
                "len requires an array or chain, found {}",
                other.kind()
            )));
            return None;
        }
    };
    let len = NumberType::try_from(len).unwrap_or(NumberType::MAX);
    Some(Value::Rational(Rational::whole(len)))
}

fn builtin_get(args: Option<Value>) -> Option<Value> {
    let [target, index] = take_exact("get", args)?;
    let Some(index) = index else {
        report(&Error::Type("get requires a present index".to_owned()));
        return None;
    };
    let index = whole_index(&index)?;
    match target {
        Some(Value::Array(elements)) => {
            if index >= elements.len() {
                report(&Error::Type(format!(
                    "index {index} is out of bounds for length {}",
                    elements.len()
                )));
                return None;
            }
            elements.into_iter().nth(index)
        }
        Some(chain @ Value::Pair { .. }) => {
            let len = chain_len(Some(&chain));
            if index >= len {
                report(&Error::Type(format!(
                    "index {index} is out of bounds for length {len}"
                )));
                return None;
            }
            chain_iter(Some(&chain)).nth(index).flatten().cloned()
        }
        other => {
            report(&Error::Type(format!(
                "get requires an array or chain, found {}",
                kind_name(other.as_ref())
            )));
            None
        }
    }
}

/// `(set arr i v)` yields a copy of the array with one element replaced.
/// A bad index or an absent replacement is diagnosed and the array comes
/// back unchanged.
fn builtin_set(args: Option<Value>) -> Option<Value> {
    let [target, index, value] = take_exact("set", args)?;
    let Some(Value::Array(mut elements)) = target else {
        report(&Error::Type(format!(
            "set requires an array, found {}",
            kind_name(target.as_ref())
        )));
        return None;
    };
    let Some(value) = value else {
        report(&Error::Type("arrays hold only present values".to_owned()));
        return Some(Value::Array(elements));
    };
    let Some(index) = index else {
        report(&Error::Type("set requires a present index".to_owned()));
        return Some(Value::Array(elements));
    };
    let Some(index) = whole_index(&index) else {
        return Some(Value::Array(elements));
    };
    if index >= elements.len() {
        report(&Error::Type(format!(
            "index {index} is out of bounds for length {}",
            elements.len()
        )));
        return Some(Value::Array(elements));
    }
    elements[index] = value;
    Some(Value::Array(elements))
}

/// `(push arr v)` yields a copy of the array with `v` appended. An absent
/// value is diagnosed and the array comes back unchanged.
fn builtin_push(args: Option<Value>) -> Option<Value> {
    let [target, value] = take_exact("push", args)?;
    let Some(Value::Array(mut elements)) = target else {
        report(&Error::Type(format!(
            "push requires an array, found {}",
            kind_name(target.as_ref())
        )));
        return None;
    };
    match value {
        Some(value) => elements.push(value),
        None => report(&Error::Type("arrays hold only present values".to_owned())),
    }
    Some(Value::Array(elements))
}

/// `(array e...)` collects the present arguments. Absent elements cannot
/// be stored and drop out quietly, the way the accumulating arithmetic
/// skips them.
fn builtin_array(args: Option<Value>) -> Option<Value> {
    let elements: Vec<Value> = chain_into_vec(args).into_iter().flatten().collect();
    Some(Value::Array(elements))
}

fn builtin_pair(args: Option<Value>) -> Option<Value> {
    let [first, rest] = take_exact("pair", args)?;
    Some(Value::Pair {
        first: first.map(Box::new),
        rest: rest.map(Box::new),
    })
}

fn builtin_first(args: Option<Value>) -> Option<Value> {
    let [target] = take_exact("first", args)?;
    match target {
        Some(Value::Pair { first, .. }) => first.map(|b| *b),
        other => {
            report(&Error::Type(format!(
                "first requires a pair, found {}",
                kind_name(other.as_ref())
            )));
            None
        }
    }
}

fn builtin_rest(args: Option<Value>) -> Option<Value> {
    let [target] = take_exact("rest", args)?;
    match target {
        Some(Value::Pair { rest, .. }) => rest.map(|b| *b),
        other => {
            report(&Error::Type(format!(
                "rest requires a pair, found {}",
                kind_name(other.as_ref())
            )));
            None
        }
    }
}

/// `(print e...)` writes the printed form of each argument, separated by
/// spaces, to standard output.
fn builtin_print(args: Option<Value>) -> Option<Value> {
    let rendered: Vec<String> = chain_iter(args.as_ref()).map(print_opt).collect();
    println!("{}", rendered.join(" "));
    None
}

/// `(read)` consumes one line of standard input and reads a single
/// expression from it. End of input and unreadable lines yield absence.
fn builtin_read(args: Option<Value>) -> Option<Value> {
    let [] = take_exact("read", args)?;
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => match crate::reader::read_expr(&line) {
            Ok((value, _)) => value,
            Err(err) => {
                report(&err);
                None
            }
        },
        Err(err) => {
            report(&Error::Type(format!(
                "read could not reach standard input: {err}"
            )));
            None
        }
    }
}

/// Registry entry for one native primitive.
pub struct PrimDef {
    pub name: &'static str,
    pub func: PrimitiveFn,
    pub arity: Arity,
    pub help: &'static str,
}

/// Every native primitive, in presentation order.
static PRIMITIVES: LazyLock<Vec<PrimDef>> = LazyLock::new(|| {
    vec![
        PrimDef {
            name: "add",
            func: builtin_add,
            arity: Arity::AtLeast(0),
            help: "exact sum of the numeric arguments",
        },
        PrimDef {
            name: "sub",
            func: builtin_sub,
            arity: Arity::AtLeast(1),
            help: "first argument minus the later ones; negates a lone argument",
        },
        PrimDef {
            name: "mul",
            func: builtin_mul,
            arity: Arity::AtLeast(0),
            help: "exact product of the numeric arguments",
        },
        PrimDef {
            name: "div",
            func: builtin_div,
            arity: Arity::AtLeast(1),
            help: "first argument divided by the later ones; inverts a lone argument",
        },
        PrimDef {
            name: "eq",
            func: builtin_eq,
            arity: Arity::Exact(2),
            help: "1 if the two arguments compare equal, else 0",
        },
        PrimDef {
            name: "less",
            func: builtin_less,
            arity: Arity::Exact(2),
            help: "1 if the first argument orders below the second, else 0",
        },
        PrimDef {
            name: "greater",
            func: builtin_greater,
            arity: Arity::Exact(2),
            help: "1 if the first argument orders above the second, else 0",
        },
        PrimDef {
            name: "len",
            func: builtin_len,
            arity: Arity::Exact(1),
            help: "element count of an array, chain, or absence",
        },
        PrimDef {
            name: "get",
            func: builtin_get,
            arity: Arity::Exact(2),
            help: "element of an array or chain at a whole-number index",
        },
        PrimDef {
            name: "set",
            func: builtin_set,
            arity: Arity::Exact(3),
            help: "copy of an array with the element at an index replaced",
        },
        PrimDef {
            name: "push",
            func: builtin_push,
            arity: Arity::Exact(2),
            help: "copy of an array with a value appended",
        },
        PrimDef {
            name: "array",
            func: builtin_array,
            arity: Arity::AtLeast(0),
            help: "array of the present arguments",
        },
        PrimDef {
            name: "pair",
            func: builtin_pair,
            arity: Arity::Exact(2),
            help: "a fresh pair cell from a first and a rest",
        },
        PrimDef {
            name: "first",
            func: builtin_first,
            arity: Arity::Exact(1),
            help: "first slot of a pair",
        },
        PrimDef {
            name: "rest",
            func: builtin_rest,
            arity: Arity::Exact(1),
            help: "rest slot of a pair",
        },
        PrimDef {
            name: "print",
            func: builtin_print,
            arity: Arity::AtLeast(0),
            help: "write the printed form of each argument to standard output",
        },
        PrimDef {
            name: "read",
            func: builtin_read,
            arity: Arity::Exact(0),
            help: "read one expression from a line of standard input",
        },
    ]
});

static PRIMITIVES_BY_NAME: LazyLock<HashMap<&'static str, &'static PrimDef>> =
    LazyLock::new(|| PRIMITIVES.iter().map(|def| (def.name, def)).collect());

/// All native primitives, in presentation order.
pub fn get_primitives() -> &'static [PrimDef] {
    &PRIMITIVES
}

/// Look up a primitive by name.
pub fn find_primitive(name: &str) -> Option<&'static PrimDef> {
    PRIMITIVES_BY_NAME.get(name).copied()
}

/// Install every primitive into `env`. The names arrive kind-stamped as
/// procedures, so later attempts to shadow them with data are refused.
pub fn bind_stdlib(env: &Rc<Environment>) {
    for def in get_primitives() {
        env.bind(
            def.name,
            Some(Value::Primitive(Primitive {
                name: def.name,
                func: def.func,
            })),
        );
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::ast::{byte, list, list_from, rat, sym, val};

    /// Call a primitive by registry name on already evaluated arguments.
    fn call_prim(name: &str, args: Vec<Option<Value>>) -> Option<Value> {
        let def = find_primitive(name).unwrap();
        (def.func)(Some(list_from(args)))
    }

    #[test]
    fn test_arity_check() {
        assert!(Arity::Exact(2).check("t", 2));
        assert!(!Arity::Exact(2).check("t", 3));
        assert!(Arity::AtLeast(1).check("t", 5));
        assert!(!Arity::AtLeast(1).check("t", 0));
        assert!(Arity::Range(1, 3).check("t", 1));
        assert!(Arity::Range(1, 3).check("t", 3));
        assert!(!Arity::Range(1, 3).check("t", 4));
        assert_eq!(Arity::Range(2, 4).min(), 2);
    }

    #[test]
    #[expect(clippy::too_many_lines)]
    fn test_primitive_table() {
        let test_cases: Vec<(&str, Vec<Option<Value>>, Option<Value>)> = vec![
            // === Arithmetic ===
            ("add", vec![], Some(val(0))),
            ("add", vec![Some(val(1)), Some(val(2)), Some(val(3))], Some(val(6))),
            ("add", vec![Some(rat(1, 2)), Some(rat(1, 3))], Some(rat(5, 6))),
            ("add", vec![Some(byte(65)), Some(val(1))], Some(val(66))),
            // Absent elements do not participate
            ("add", vec![Some(val(1)), None, Some(val(2))], Some(val(3))),
            // Non-numeric elements are diagnosed, then left out
            ("add", vec![Some(val(1)), Some(sym("x")), Some(val(2))], Some(val(3))),
            ("mul", vec![], Some(val(1))),
            ("mul", vec![Some(val(2)), Some(val(3)), Some(val(4))], Some(val(24))),
            ("mul", vec![Some(rat(1, 2)), Some(rat(2, 3))], Some(rat(1, 3))),
            ("sub", vec![Some(val(10)), Some(val(1)), Some(val(2))], Some(val(7))),
            ("sub", vec![Some(val(5))], Some(val(-5))),
            ("sub", vec![Some(val(10)), None, Some(val(1))], Some(val(9))),
            ("sub", vec![], None),
            ("div", vec![Some(val(8)), Some(val(2)), Some(val(2))], Some(val(2))),
            ("div", vec![Some(val(2))], Some(rat(1, 2))),
            ("div", vec![Some(val(1)), Some(val(3))], Some(rat(1, 3))),
            ("div", vec![Some(val(1)), Some(val(0))], None),
            // A divisor of magnitude 2^63 leaves no room for the sign flip
            ("div", vec![Some(val(3)), Some(val(NumberType::MIN))], None),
            ("div", vec![], None),
            // === Comparison ===
            ("eq", vec![Some(val(1)), Some(val(1))], Some(byte(1))),
            ("eq", vec![Some(val(1)), Some(val(2))], Some(byte(0))),
            ("eq", vec![Some(rat(2, 4)), Some(rat(1, 2))], Some(byte(1))),
            // Bytes and rationals are different variants, so their
            // comparison is a diagnosed mismatch, never a promotion
            ("eq", vec![Some(byte(65)), Some(val(65))], Some(byte(0))),
            ("eq", vec![Some(val("hi")), Some(val("hi"))], Some(byte(1))),
            // Equality refuses absent operands
            ("eq", vec![None, None], None),
            ("eq", vec![None, Some(val(1))], None),
            ("eq", vec![Some(val(1))], None),
            ("less", vec![Some(val(1)), Some(val(2))], Some(byte(1))),
            ("less", vec![Some(val(2)), Some(val(1))], Some(byte(0))),
            // Absence orders below everything
            ("less", vec![None, Some(val(1))], Some(byte(1))),
            ("less", vec![Some(sym("apple")), Some(sym("banana"))], Some(byte(1))),
            ("greater", vec![Some(val(2)), Some(val(1))], Some(byte(1))),
            ("greater", vec![Some(rat(1, 3)), Some(rat(1, 2))], Some(byte(0))),
            // === Sequences ===
            (
                "len",
                vec![Some(Value::Array(vec![val(1), val(2), val(3)]))],
                Some(val(3)),
            ),
            ("len", vec![Some(list(vec![val(1), val(2)]))], Some(val(2))),
            ("len", vec![None], Some(val(0))),
            ("len", vec![Some(val(5))], None),
            (
                "get",
                vec![Some(Value::Array(vec![val(1), val(2), val(3)])), Some(val(0))],
                Some(val(1)),
            ),
            (
                "get",
                vec![Some(Value::Array(vec![val(1), val(2), val(3)])), Some(byte(1))],
                Some(val(2)),
            ),
            (
                "get",
                vec![Some(Value::Array(vec![val(1), val(2), val(3)])), Some(val(5))],
                None,
            ),
            (
                "get",
                vec![Some(Value::Array(vec![val(1)])), Some(rat(1, 2))],
                None,
            ),
            (
                "get",
                vec![Some(list(vec![val(10), val(20)])), Some(val(1))],
                Some(val(20)),
            ),
            ("get", vec![Some(Value::Array(vec![val(1)]))], None),
            (
                "set",
                vec![
                    Some(Value::Array(vec![val(1), val(2), val(3)])),
                    Some(val(1)),
                    Some(val(9)),
                ],
                Some(Value::Array(vec![val(1), val(9), val(3)])),
            ),
            // A bad index is diagnosed and the array comes back unchanged
            (
                "set",
                vec![
                    Some(Value::Array(vec![val(1), val(2)])),
                    Some(val(9)),
                    Some(val(9)),
                ],
                Some(Value::Array(vec![val(1), val(2)])),
            ),
            // Arrays cannot hold absence
            (
                "set",
                vec![Some(Value::Array(vec![val(1), val(2)])), Some(val(0)), None],
                Some(Value::Array(vec![val(1), val(2)])),
            ),
            ("set", vec![Some(val(1)), Some(val(0)), Some(val(2))], None),
            (
                "push",
                vec![Some(Value::Array(vec![val(1)])), Some(val(2))],
                Some(Value::Array(vec![val(1), val(2)])),
            ),
            (
                "push",
                vec![Some(Value::Array(vec![val(1)])), None],
                Some(Value::Array(vec![val(1)])),
            ),
            // === Construction ===
            (
                "array",
                vec![Some(val(1)), None, Some(val(2))],
                Some(Value::Array(vec![val(1), val(2)])),
            ),
            ("array", vec![], Some(Value::Array(vec![]))),
            (
                "pair",
                vec![Some(val(1)), None],
                Some(Value::Pair {
                    first: Some(Box::new(val(1))),
                    rest: None,
                }),
            ),
            (
                "pair",
                vec![Some(val(1)), Some(val(2))],
                Some(Value::Pair {
                    first: Some(Box::new(val(1))),
                    rest: Some(Box::new(val(2))),
                }),
            ),
            ("pair", vec![Some(val(1))], None),
            ("first", vec![Some(list(vec![val(1), val(2)]))], Some(val(1))),
            ("first", vec![Some(list(vec![]))], None),
            ("first", vec![Some(val(1))], None),
            ("rest", vec![Some(list(vec![val(1), val(2)]))], Some(list(vec![val(2)]))),
            ("rest", vec![Some(list(vec![val(1)]))], None),
            ("rest", vec![None], None),
        ];

        for (i, (name, args, expected)) in test_cases.into_iter().enumerate() {
            let result = call_prim(name, args);
            assert_eq!(result, expected, "Test case {} failed: {name}", i + 1);
        }
    }

    #[test]
    fn test_print_yields_absence() {
        assert_eq!(call_prim("print", vec![Some(val(1)), None]), None);
    }

    #[test]
    fn test_read_rejects_arguments() {
        // Arity fails before standard input is touched
        assert_eq!(call_prim("read", vec![Some(val(1))]), None);
    }

    #[test]
    fn test_registry_consistency() {
        let mut seen = std::collections::HashSet::new();
        for def in get_primitives() {
            assert!(seen.insert(def.name), "duplicate primitive name {}", def.name);
            assert!(!def.help.is_empty(), "{} has no help text", def.name);
            let found = find_primitive(def.name).unwrap();
            assert!(std::ptr::eq(found, def));
        }
        assert!(find_primitive("no-such-primitive").is_none());
    }

    #[test]
    fn test_bind_stdlib_populates_root_frame() {
        let env = Rc::new(Environment::new());
        bind_stdlib(&env);
        for def in get_primitives() {
            match env.lookup(def.name) {
                Some(Value::Primitive(prim)) => assert_eq!(prim.name, def.name),
                other => panic!("{} bound to {other:?}", def.name),
            }
        }
        // Procedure bindings are kind-stamped, so data cannot shadow them
        assert!(!env.bind("add", Some(val(1))));
        assert!(matches!(env.lookup("add"), Some(Value::Primitive(_))));
    }
}
