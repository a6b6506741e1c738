//! String literal decoding and literal-only evaluation.
//!
//! [`decode_string_literal`] turns one string token (prefix, quotes, body)
//! into its value. [`literal_eval`] evaluates a node that consists purely of
//! literals, the way Python's `ast.literal_eval` does, and refuses everything
//! else.

use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use tugblock_core::{BlockError, BlockResult};

use crate::nodes::{Ast, NodeId, NodeKind};

// ============================================================================
// String tokens
// ============================================================================

/// The decoded form of one string token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedString {
    pub value: String,
    pub is_bytes: bool,
    pub is_fstring: bool,
}

/// Decode a single string token such as `r'''a\nb'''` or `b"\x00"`.
///
/// Prefix letters may appear in any case and combination. Raw bodies are
/// kept verbatim. `\N{...}` escapes are kept verbatim as well.
pub fn decode_string_literal(token: &str) -> BlockResult<DecodedString> {
    let prefix_len = token
        .find(|c: char| !matches!(c, 'r' | 'R' | 'b' | 'B' | 'u' | 'U' | 'f' | 'F'))
        .unwrap_or(token.len());
    let (prefix, rest) = token.split_at(prefix_len);
    let prefix = prefix.to_ascii_lowercase();

    let quote_len = if rest.starts_with("\"\"\"") || rest.starts_with("'''") {
        3
    } else if rest.starts_with('"') || rest.starts_with('\'') {
        1
    } else {
        return Err(BlockError::internal(format!(
            "malformed string token: {}",
            token
        )));
    };
    if rest.len() < 2 * quote_len || !rest.ends_with(&rest[..quote_len]) {
        return Err(BlockError::internal(format!(
            "unterminated string token: {}",
            token
        )));
    }
    let body = &rest[quote_len..rest.len() - quote_len];

    let is_bytes = prefix.contains('b');
    let is_fstring = prefix.contains('f');
    let value = if prefix.contains('r') {
        body.to_string()
    } else {
        unescape(body, is_bytes)
    };
    Ok(DecodedString {
        value,
        is_bytes,
        is_fstring,
    })
}

fn unescape(body: &str, is_bytes: bool) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(e) = chars.next() else {
            out.push('\\');
            break;
        };
        match e {
            '\n' => {}
            '\\' | '\'' | '"' => out.push(e),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut code = e.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            code = code * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
            }
            'x' => push_hex_escape(&mut out, &mut chars, 'x', 2),
            'u' if !is_bytes => push_hex_escape(&mut out, &mut chars, 'u', 4),
            'U' if !is_bytes => push_hex_escape(&mut out, &mut chars, 'U', 8),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Consume exactly `width` hex digits and push the char they encode. When
/// the digits are missing the escape is kept as written.
fn push_hex_escape(out: &mut String, chars: &mut Peekable<Chars<'_>>, marker: char, width: usize) {
    let digits: String = chars.clone().take(width).collect();
    if digits.len() == width && digits.chars().all(|c| c.is_ascii_hexdigit()) {
        for _ in 0..width {
            chars.next();
        }
        let code = u32::from_str_radix(&digits, 16).unwrap_or(0xFFFD);
        out.push(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
    } else {
        out.push('\\');
        out.push(marker);
    }
}

// ============================================================================
// Python-style repr
// ============================================================================

/// Quote `s` the way Python's `repr` does.
pub fn repr_str(s: &str) -> String {
    let quote = if s.contains('\'') && !s.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c if (c as u32) < 0x20 || c as u32 == 0x7f => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}

fn repr_bytes(bytes: &[u8]) -> String {
    let quote = if bytes.contains(&b'\'') && !bytes.contains(&b'"') {
        b'"'
    } else {
        b'\''
    };
    let mut out = String::from("b");
    out.push(quote as char);
    for &b in bytes {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            b if b == quote => {
                out.push('\\');
                out.push(b as char);
            }
            0x20..=0x7e => out.push(b as char),
            b => out.push_str(&format!("\\x{:02x}", b)),
        }
    }
    out.push(quote as char);
    out
}

fn repr_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let magnitude = v.abs();
    if magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        let formatted = format!("{:e}", v);
        if let Some((mantissa, exp)) = formatted.split_once('e') {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            return format!("{}e{}{:02}", mantissa, sign, exp.abs());
        }
        return formatted;
    }
    if v.fract() == 0.0 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

fn repr_complex_part(v: f64) -> String {
    let s = repr_float(v);
    match s.strip_suffix(".0") {
        Some(trimmed) => trimmed.to_string(),
        None => s,
    }
}

// ============================================================================
// Literal values
// ============================================================================

/// A value produced by [`literal_eval`].
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    None,
    Bool(bool),
    Int(i128),
    Float(f64),
    Complex { real: f64, imag: f64 },
    Str(String),
    Bytes(Vec<u8>),
    Tuple(Vec<LiteralValue>),
    List(Vec<LiteralValue>),
    Set(Vec<LiteralValue>),
    /// Entries in source order.
    Dict(Vec<(LiteralValue, LiteralValue)>),
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[LiteralValue]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

/// Python `repr` of the value.
impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::None => f.write_str("None"),
            LiteralValue::Bool(true) => f.write_str("True"),
            LiteralValue::Bool(false) => f.write_str("False"),
            LiteralValue::Int(n) => write!(f, "{}", n),
            LiteralValue::Float(v) => f.write_str(&repr_float(*v)),
            LiteralValue::Complex { real, imag } => {
                if *real == 0.0 && real.is_sign_positive() {
                    write!(f, "{}j", repr_complex_part(*imag))
                } else {
                    let sign = if *imag < 0.0 || (*imag == 0.0 && imag.is_sign_negative()) {
                        "-"
                    } else {
                        "+"
                    };
                    write!(
                        f,
                        "({}{}{}j)",
                        repr_complex_part(*real),
                        sign,
                        repr_complex_part(imag.abs())
                    )
                }
            }
            LiteralValue::Str(s) => f.write_str(&repr_str(s)),
            LiteralValue::Bytes(b) => f.write_str(&repr_bytes(b)),
            LiteralValue::Tuple(items) => {
                f.write_str("(")?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            LiteralValue::List(items) => {
                f.write_str("[")?;
                write_seq(f, items)?;
                f.write_str("]")
            }
            LiteralValue::Set(items) if items.is_empty() => f.write_str("set()"),
            LiteralValue::Set(items) => {
                f.write_str("{")?;
                write_seq(f, items)?;
                f.write_str("}")
            }
            LiteralValue::Dict(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                f.write_str("}")
            }
        }
    }
}

// ============================================================================
// Evaluation
// ============================================================================

fn malformed(kind: &NodeKind) -> BlockError {
    BlockError::literal(format!("malformed node or string: {}", kind.name()))
}

/// Evaluate a numeric literal as written (`0x1F`, `0777`, `10L`, `1e3`, `2j`).
pub fn eval_number(text: &str) -> BlockResult<LiteralValue> {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    let bad = || BlockError::literal(format!("invalid numeric literal: {}", text));

    if let Some(imag) = cleaned.strip_suffix('j') {
        let imag: f64 = imag.parse().map_err(|_| bad())?;
        return Ok(LiteralValue::Complex { real: 0.0, imag });
    }

    let digits = cleaned.strip_suffix('l').unwrap_or(&cleaned);
    let radix_digits = if let Some(hex) = digits.strip_prefix("0x") {
        Some((hex, 16))
    } else if let Some(oct) = digits.strip_prefix("0o") {
        Some((oct, 8))
    } else if let Some(bin) = digits.strip_prefix("0b") {
        Some((bin, 2))
    } else if digits.len() > 1
        && digits.starts_with('0')
        && digits.bytes().all(|b| b.is_ascii_digit())
    {
        // legacy octal
        Some((&digits[1..], 8))
    } else if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        Some((digits, 10))
    } else {
        None
    };

    match radix_digits {
        Some((body, radix)) => i128::from_str_radix(body, radix)
            .map(LiteralValue::Int)
            .map_err(|_| bad()),
        None => digits.parse::<f64>().map(LiteralValue::Float).map_err(|_| bad()),
    }
}

fn eval_signed_number(ast: &Ast, id: NodeId) -> BlockResult<LiteralValue> {
    match ast.kind(id) {
        NodeKind::Num { n } => eval_number(n),
        NodeKind::UnaryOp { op, operand } if op == "+" || op == "-" => {
            let NodeKind::Num { n } = ast.kind(*operand) else {
                return Err(malformed(ast.kind(*operand)));
            };
            let value = eval_number(n)?;
            if op == "+" {
                return Ok(value);
            }
            match value {
                LiteralValue::Int(v) => Ok(LiteralValue::Int(-v)),
                LiteralValue::Float(v) => Ok(LiteralValue::Float(-v)),
                LiteralValue::Complex { real, imag } => Ok(LiteralValue::Complex {
                    real: -real,
                    imag: -imag,
                }),
                _ => Err(malformed(ast.kind(id))),
            }
        }
        other => Err(malformed(other)),
    }
}

/// Evaluate a node built only from literals.
///
/// Accepts strings, bytes, numbers, `True`/`False`/`None`, tuples, lists,
/// sets, dicts, unary `+`/`-` on numbers, and `real +/- imaginary`.
pub fn literal_eval(ast: &Ast, id: NodeId) -> BlockResult<LiteralValue> {
    let kind = ast.kind(id);
    match kind {
        NodeKind::Str { s, is_bytes: false } => Ok(LiteralValue::Str(s.clone())),
        NodeKind::Str { s, is_bytes: true } => Ok(LiteralValue::Bytes(
            s.chars()
                .map(|c| u8::try_from(c as u32).unwrap_or(b'?'))
                .collect(),
        )),
        NodeKind::Num { n } => eval_number(n),
        NodeKind::NameConstant { value } => match value.as_str() {
            "True" => Ok(LiteralValue::Bool(true)),
            "False" => Ok(LiteralValue::Bool(false)),
            "None" => Ok(LiteralValue::None),
            _ => Err(malformed(kind)),
        },
        NodeKind::Tuple { elts } => Ok(LiteralValue::Tuple(eval_all(ast, elts)?)),
        NodeKind::List { elts } => Ok(LiteralValue::List(eval_all(ast, elts)?)),
        NodeKind::Set { elts } => Ok(LiteralValue::Set(eval_all(ast, elts)?)),
        NodeKind::Dict { keys, values } => {
            let mut entries = Vec::with_capacity(values.len());
            for (key, value) in keys.iter().zip(values) {
                let Some(key) = key else {
                    return Err(malformed(kind));
                };
                entries.push((literal_eval(ast, *key)?, literal_eval(ast, *value)?));
            }
            Ok(LiteralValue::Dict(entries))
        }
        NodeKind::UnaryOp { .. } => eval_signed_number(ast, id),
        NodeKind::BinOp { left, op, right } if op == "+" || op == "-" => {
            let real = match eval_signed_number(ast, *left)? {
                LiteralValue::Int(v) => v as f64,
                LiteralValue::Float(v) => v,
                _ => return Err(malformed(kind)),
            };
            let imag = match ast.kind(*right) {
                NodeKind::Num { n } => match eval_number(n)? {
                    LiteralValue::Complex { imag, .. } => imag,
                    _ => return Err(malformed(kind)),
                },
                other => return Err(malformed(other)),
            };
            let imag = if op == "-" { -imag } else { imag };
            Ok(LiteralValue::Complex { real, imag })
        }
        other => Err(malformed(other)),
    }
}

fn eval_all(ast: &Ast, ids: &[NodeId]) -> BlockResult<Vec<LiteralValue>> {
    ids.iter().map(|id| literal_eval(ast, *id)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    mod decoding {
        use super::*;

        fn value(token: &str) -> String {
            decode_string_literal(token).unwrap().value
        }

        #[test]
        fn simple_escapes() {
            assert_eq!(value(r#"'a\nb\t\\'"#), "a\nb\t\\");
            assert_eq!(value(r#""it\'s""#), "it's");
        }

        #[test]
        fn triple_quoted_keeps_newlines() {
            assert_eq!(value("'''foo\nbar'''"), "foo\nbar");
            assert_eq!(value("\"\"\"a\\\nb\"\"\""), "ab");
        }

        #[test]
        fn raw_is_verbatim() {
            assert_eq!(value(r#"r'\nbar'"#), "\\nbar");
            assert_eq!(value(r#"Rb'\x00'"#), "\\x00");
        }

        #[test]
        fn numeric_escapes() {
            assert_eq!(value(r#"'\x41\101é'"#), "AAé");
            assert_eq!(value(r#"'\0'"#), "\0");
        }

        #[test]
        fn bytes_do_not_decode_unicode_escapes() {
            let decoded = decode_string_literal(r#"b'\u1234'"#).unwrap();
            assert!(decoded.is_bytes);
            assert_eq!(decoded.value, "\\u1234");
        }

        #[test]
        fn named_escape_kept_verbatim() {
            assert_eq!(value(r#"'\N{DASH}'"#), "\\N{DASH}");
        }

        #[test]
        fn fstring_prefix_detected() {
            assert!(decode_string_literal("F'{x}'").unwrap().is_fstring);
            assert!(!decode_string_literal("u'x'").unwrap().is_fstring);
        }

        #[test]
        fn malformed_token_rejected() {
            assert!(decode_string_literal("abc").is_err());
            assert!(decode_string_literal("'abc").is_err());
        }
    }

    mod numbers {
        use super::*;

        #[test]
        fn integer_forms() {
            assert_eq!(eval_number("42").unwrap(), LiteralValue::Int(42));
            assert_eq!(eval_number("0x1F").unwrap(), LiteralValue::Int(31));
            assert_eq!(eval_number("0o17").unwrap(), LiteralValue::Int(15));
            assert_eq!(eval_number("0b101").unwrap(), LiteralValue::Int(5));
            assert_eq!(eval_number("0777").unwrap(), LiteralValue::Int(511));
            assert_eq!(eval_number("10L").unwrap(), LiteralValue::Int(10));
            assert_eq!(eval_number("1_000").unwrap(), LiteralValue::Int(1000));
            assert_eq!(eval_number("0").unwrap(), LiteralValue::Int(0));
        }

        #[test]
        fn float_and_imaginary() {
            assert_eq!(eval_number("1.5").unwrap(), LiteralValue::Float(1.5));
            assert_eq!(eval_number("1e3").unwrap(), LiteralValue::Float(1000.0));
            assert_eq!(
                eval_number("2j").unwrap(),
                LiteralValue::Complex {
                    real: 0.0,
                    imag: 2.0
                }
            );
        }
    }

    mod repr {
        use super::*;

        #[test]
        fn str_quote_choice() {
            assert_eq!(repr_str("abc"), "'abc'");
            assert_eq!(repr_str("it's"), "\"it's\"");
            assert_eq!(repr_str("a\nb"), "'a\\nb'");
        }

        #[test]
        fn containers() {
            let value = LiteralValue::Dict(vec![(
                LiteralValue::Int(1),
                LiteralValue::Dict(vec![(LiteralValue::Int(2), LiteralValue::Int(3))]),
            )]);
            assert_eq!(value.to_string(), "{1: {2: 3}}");
            assert_eq!(
                LiteralValue::Tuple(vec![LiteralValue::Str("a".into())]).to_string(),
                "('a',)"
            );
            assert_eq!(LiteralValue::Set(vec![]).to_string(), "set()");
        }

        #[test]
        fn floats_and_complex() {
            assert_eq!(LiteralValue::Float(1.0).to_string(), "1.0");
            assert_eq!(LiteralValue::Float(0.1).to_string(), "0.1");
            assert_eq!(LiteralValue::Float(1e20).to_string(), "1e+20");
            assert_eq!(
                LiteralValue::Complex {
                    real: 0.0,
                    imag: 2.0
                }
                .to_string(),
                "2j"
            );
            assert_eq!(
                LiteralValue::Complex {
                    real: 1.0,
                    imag: -2.0
                }
                .to_string(),
                "(1-2j)"
            );
        }

        #[test]
        fn bytes() {
            assert_eq!(LiteralValue::Bytes(b"a\x00".to_vec()).to_string(), "b'a\\x00'");
        }
    }
}
