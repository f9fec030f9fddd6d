//! Text to value reader.
//!
//! One pass, no separate token stream: the reader walks the input with
//! [`nom`] and produces values directly. Lists nest up to
//! [`MAX_READ_DEPTH`]. Number literals are scanned digit by digit into
//! exact rationals. Strings read as byte arrays and character literals
//! as single bytes, and a token that does not scan as a number is a
//! symbol, so the reader never rejects a bare word.
//!
//! Malformed literals that still carry usable content, like a zero
//! denominator or an unterminated string, are diagnosed through
//! [`report`] and produce their best-effort value. Structural failures
//! surface as [`SyntaxError`]s with context extracted from the input.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::take_while1,
    character::complete::char,
    error::{Error as NomError, ErrorKind},
};

use crate::ast::{NumberType, Rational, Value, list_from};
use crate::{Error, MAX_READ_DEPTH, SyntaxError, SyntaxErrorKind, report};

/// Read one expression from the front of `input`.
///
/// Returns the value and the unconsumed remainder. The value slot is
/// present for every successful read; the option mirrors the value
/// channel the evaluator consumes. Leading whitespace and `//` comments
/// are skipped, and input with nothing left to read is an incomplete
/// read, not an empty value.
pub fn read_expr(input: &str) -> Result<(Option<Value>, &str), Error> {
    let start = skip_trivia(input);
    if start.is_empty() {
        return Err(Error::Syntax(SyntaxError::from_message(
            SyntaxErrorKind::Incomplete,
            "input ended before an expression",
        )));
    }
    match parse_expr_at(start, 0) {
        Ok((rest, value)) => Ok((Some(value), rest)),
        Err(nom::Err::Incomplete(_)) => Err(Error::Syntax(SyntaxError::from_message(
            SyntaxErrorKind::Incomplete,
            "input ended before the expression was complete",
        ))),
        Err(nom::Err::Error(failure) | nom::Err::Failure(failure)) => {
            Err(Error::Syntax(syntax_error_at(input, &failure)))
        }
    }
}

/// Read every expression in `input`, in order. Trailing whitespace and
/// comments are fine; anything unreadable fails the whole batch.
pub fn read_all(input: &str) -> Result<Vec<Option<Value>>, Error> {
    let mut expressions = Vec::new();
    let mut rest = input;
    loop {
        rest = skip_trivia(rest);
        if rest.is_empty() {
            return Ok(expressions);
        }
        let (value, next) = read_expr(rest)?;
        expressions.push(value);
        rest = next;
    }
}

/// Skip whitespace and `//` line comments.
fn skip_trivia(input: &str) -> &str {
    let mut rest = input;
    loop {
        let trimmed = rest.trim_start();
        if let Some(comment) = trimmed.strip_prefix("//") {
            rest = match comment.find('\n') {
                Some(end) => &comment[end + 1..],
                None => "",
            };
        } else {
            return trimmed;
        }
    }
}

/// Parse one expression starting exactly at `input`. `depth` counts list
/// nesting; crossing [`MAX_READ_DEPTH`] fails the parse outright.
fn parse_expr_at(input: &str, depth: usize) -> IResult<&str, Value> {
    if depth > MAX_READ_DEPTH {
        // TooLarge is the sentinel the error conversion maps to the
        // nesting diagnostic
        return Err(nom::Err::Failure(NomError::new(input, ErrorKind::TooLarge)));
    }
    alt((
        |i| parse_list(i, depth),
        parse_string,
        parse_char,
        parse_token,
    ))
    .parse(input)
}

/// `(` elements `)` as a right-nested pair chain. Elements read by the
/// reader are always present; `()` is the empty list cell.
fn parse_list(input: &str, depth: usize) -> IResult<&str, Value> {
    let (mut rest, _) = char('(').parse(input)?;
    let mut elements: Vec<Option<Value>> = Vec::new();
    loop {
        rest = skip_trivia(rest);
        if let Some(tail) = rest.strip_prefix(')') {
            return Ok((tail, list_from(elements)));
        }
        if rest.is_empty() {
            return Err(nom::Err::Failure(NomError::new(rest, ErrorKind::Eof)));
        }
        let (next, element) = parse_expr_at(rest, depth + 1)?;
        elements.push(Some(element));
        rest = next;
    }
}

/// `"..."` as an array of bytes. There are no escapes; the literal runs
/// to the next quote. An unterminated literal is diagnosed and yields
/// the bytes it did collect.
fn parse_string(input: &str) -> IResult<&str, Value> {
    let (rest, _) = char('"').parse(input)?;
    match rest.find('"') {
        Some(end) => Ok((&rest[end + 1..], Value::from(&rest[..end]))),
        None => {
            report(&Error::Syntax(SyntaxError::from_message(
                SyntaxErrorKind::Incomplete,
                "unterminated string literal",
            )));
            Ok(("", Value::from(rest)))
        }
    }
}

/// `'c'` as a single byte. The character after the opening quote is the
/// literal, whatever it is; a missing or misplaced closing quote is
/// diagnosed, the byte is produced anyway, and nothing past the literal
/// is consumed.
fn parse_char(input: &str) -> IResult<&str, Value> {
    let (rest, _) = char('\'').parse(input)?;
    let Some(literal) = rest.chars().next() else {
        return Err(nom::Err::Failure(NomError::new(rest, ErrorKind::Eof)));
    };
    if literal.len_utf8() > 1 {
        report(&Error::Syntax(SyntaxError::from_message(
            SyntaxErrorKind::InvalidSyntax,
            format!("character literal '{literal}' holds more than one byte, keeping the first"),
        )));
    }
    let byte = rest.as_bytes()[0];
    let after = &rest[literal.len_utf8()..];
    match after.strip_prefix('\'') {
        Some(tail) => Ok((tail, Value::Byte(byte))),
        None => {
            report(&Error::Syntax(SyntaxError::from_message(
                SyntaxErrorKind::Incomplete,
                format!("character literal '{literal}' has no closing quote"),
            )));
            Ok((after, Value::Byte(byte)))
        }
    }
}

/// One bare token, classified after the fact. `$name` is an evaluation
/// marker, a token that scans fully as a number is a number, and
/// everything else is a symbol.
fn parse_token(input: &str) -> IResult<&str, Value> {
    let (rest, token) = take_while1(is_token_char).parse(input)?;
    Ok((rest, classify_token(token)))
}

/// Tokens run to whitespace or `)`. Every other character, quotes and
/// `(` included, carries meaning only token-initially.
fn is_token_char(c: char) -> bool {
    !c.is_whitespace() && c != ')'
}

fn classify_token(token: &str) -> Value {
    if let Some(name) = token.strip_prefix('$')
        && !name.is_empty()
    {
        return Value::Evaluation(name.to_owned());
    }
    match scan_number(token) {
        Some(number) => number,
        None => Value::Symbol(token.to_owned()),
    }
}

/// Digit-by-digit scan of a number token.
///
/// A leading `-` negates. A `.` switches to decimal mode, where every
/// further digit also scales the denominator by ten. A `/` switches to
/// denominator mode, resetting the denominator to the digits that
/// follow, which is how a literal like `1/0` arrives malformed: the
/// zero denominator is diagnosed and the value produced anyway.
/// Literals beyond the i64 range are diagnosed and clip to the largest
/// representable magnitude. Returns `None` for a token that is not a
/// number at all.
fn scan_number(token: &str) -> Option<Value> {
    #[derive(PartialEq)]
    enum Mode {
        Whole,
        Decimal,
        Denominator,
    }

    let (negative, body) = match token.strip_prefix('-') {
        Some(body) => (true, body),
        None => (false, token),
    };
    // Dispatch rule: a digit or a dot opens a number, and a minus only
    // when a digit follows it directly
    let opens_number = body.chars().next().is_some_and(|c| {
        if negative {
            c.is_ascii_digit()
        } else {
            c.is_ascii_digit() || c == '.'
        }
    });
    if !opens_number {
        return None;
    }

    let mut mode = Mode::Whole;
    let mut num: NumberType = 0;
    let mut den: NumberType = 1;
    let mut saw_digit = false;
    let mut clipped = false;
    for c in body.chars() {
        match c {
            '0'..='9' => {
                saw_digit = true;
                match mode {
                    Mode::Whole => num = push_digit(num, c, &mut clipped),
                    Mode::Decimal => {
                        num = push_digit(num, c, &mut clipped);
                        den = match den.checked_mul(10) {
                            Some(next) => next,
                            None => {
                                clipped = true;
                                NumberType::MAX
                            }
                        };
                    }
                    Mode::Denominator => den = push_digit(den, c, &mut clipped),
                }
            }
            '.' if mode == Mode::Whole => mode = Mode::Decimal,
            '/' if mode != Mode::Denominator => {
                mode = Mode::Denominator;
                den = 0;
            }
            _ => return None,
        }
    }
    if !saw_digit {
        return None;
    }

    if clipped {
        report(&Error::Arithmetic(format!(
            "number literal {token} exceeds the rational range"
        )));
    }
    if den == 0 {
        report(&Error::Arithmetic(format!(
            "number literal {token} has a zero denominator"
        )));
    }
    let num = if negative { -num } else { num };
    Some(Value::Rational(Rational::new(num, den)))
}

fn push_digit(acc: NumberType, digit: char, clipped: &mut bool) -> NumberType {
    let d = NumberType::from(digit.to_digit(10).unwrap_or(0));
    match acc.checked_mul(10).and_then(|v| v.checked_add(d)) {
        Some(next) => next,
        None => {
            *clipped = true;
            NumberType::MAX
        }
    }
}

/// Map a nom failure to a [`SyntaxError`] with context at the failure
/// offset within the original input.
fn syntax_error_at(input: &str, failure: &NomError<&str>) -> SyntaxError {
    let byte_offset = input.len().saturating_sub(failure.input.len());
    let char_offset = input[..byte_offset].chars().count();
    let (kind, message) = match failure.code {
        ErrorKind::TooLarge => (
            SyntaxErrorKind::TooDeeplyNested,
            format!("expression nesting exceeds the depth limit of {MAX_READ_DEPTH}"),
        ),
        ErrorKind::Eof => (
            SyntaxErrorKind::Incomplete,
            "input ended before the expression was complete".to_owned(),
        ),
        _ => (
            SyntaxErrorKind::InvalidSyntax,
            "expected an expression".to_owned(),
        ),
    };
    let found = failure
        .input
        .split_whitespace()
        .next()
        .map(|token| token.chars().take(20).collect());
    SyntaxError::with_context(kind, message, input, char_offset, found)
}
