//! Constant values and their arithmetic.
//!
//! Arithmetic is exact, as in Go: integers are arbitrary precision (up to
//! 512 bits, the limit Go compilers enforce) and floating-point constants
//! are rationals. Values print as integers in decimal, floats as a decimal
//! when their expansion terminates and as `num/den` otherwise, strings
//! quoted, booleans as `true`/`false`.

use std::fmt;

use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};
use thiserror::Error;

use crate::ast::{BinaryOp, UnaryOp};

/// Integer constants wider than this overflow.
const MAX_INT_BITS: u64 = 512;

/// Largest shift count accepted for constant shifts.
const MAX_SHIFT: u64 = 1074;

/// Largest decimal or binary exponent accepted in a float literal.
const MAX_LITERAL_EXPONENT: i64 = 10_000;

/// Fractions with a terminating expansion longer than this print as `num/den`.
const MAX_DECIMAL_PLACES: u32 = 64;

/// A constant value.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Bool(bool),
    Int(BigInt),
    Float(BigRational),
    Complex(BigRational, BigRational),
    Str(String),
    /// A value that cannot be computed from this package alone, kept as its
    /// expression text (`5 * time.Second`).
    Opaque(String),
}

/// Kinds of untyped constants, in promotion order for numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConstKind {
    Bool,
    String,
    Int,
    Rune,
    Float,
    Complex,
}

impl ConstKind {
    pub fn is_numeric(self) -> bool {
        self >= Self::Int
    }
}

impl fmt::Display for ConstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::String => "string",
            Self::Int => "int",
            Self::Rune => "rune",
            Self::Float => "float",
            Self::Complex => "complex",
        };
        f.write_str(name)
    }
}

/// Errors from constant arithmetic and conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConstError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("constant overflow")]
    Overflow,

    #[error("invalid shift count {0}")]
    InvalidShift(String),

    #[error("constant {value} overflows {target}")]
    NotRepresentable { value: String, target: String },

    #[error("constant {0} truncated to integer")]
    Truncated(String),

    #[error("operator {op} not defined on {operand}")]
    UndefinedOperator { op: String, operand: String },

    #[error("cannot convert {value} to type {target}")]
    InvalidConversion { value: String, target: String },

    #[error("malformed literal {0}")]
    MalformedLiteral(String),
}

impl ConstValue {
    /// An integer constant, failing when it is wider than Go allows.
    pub fn int(value: BigInt) -> Result<Self, ConstError> {
        if value.bits() > MAX_INT_BITS {
            return Err(ConstError::Overflow);
        }
        Ok(Self::Int(value))
    }

    fn describe(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Complex(..) => "complex",
            Self::Str(_) => "string",
            Self::Opaque(_) => "non-constant value",
        }
    }

    fn as_rational(&self) -> Option<BigRational> {
        match self {
            Self::Int(v) => Some(BigRational::from_integer(v.clone())),
            Self::Float(v) => Some(v.clone()),
            _ => None,
        }
    }

    fn as_complex(&self) -> Option<(BigRational, BigRational)> {
        match self {
            Self::Complex(re, im) => Some((re.clone(), im.clone())),
            other => other.as_rational().map(|re| (re, BigRational::zero())),
        }
    }

    /// The exact integer a numeric constant denotes, if it denotes one.
    fn as_integer(&self) -> Option<BigInt> {
        match self.as_complex()? {
            (re, im) if im.is_zero() && re.is_integer() => Some(re.to_integer()),
            _ => None,
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, Self::Opaque(_))
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write_rational(f, v),
            Self::Complex(re, im) => {
                f.write_str("(")?;
                write_rational(f, re)?;
                f.write_str(" + ")?;
                write_rational(f, im)?;
                f.write_str("i)")
            }
            Self::Str(v) => f.write_str(&quote(v)),
            Self::Opaque(text) => f.write_str(text),
        }
    }
}

fn write_rational(f: &mut fmt::Formatter<'_>, value: &BigRational) -> fmt::Result {
    if value.is_integer() {
        return write!(f, "{}", value.numer());
    }

    let places = match decimal_places(value.denom()) {
        Some(places) if places <= MAX_DECIMAL_PLACES => places,
        _ => return write!(f, "{}/{}", value.numer(), value.denom()),
    };

    let scaled = value.numer() * BigInt::from(10u32).pow(places) / value.denom();
    let digits = scaled.abs().to_string();
    let places = places as usize;
    let digits = if digits.len() <= places {
        format!("{}{digits}", "0".repeat(places + 1 - digits.len()))
    } else {
        digits
    };
    let (whole, fraction) = digits.split_at(digits.len() - places);
    let sign = if scaled.is_negative() { "-" } else { "" };
    write!(f, "{sign}{whole}.{fraction}")
}

/// Number of decimal places of `1/denom` when that expansion terminates.
fn decimal_places(denom: &BigInt) -> Option<u32> {
    let mut rest = denom.clone();
    let mut count = |factor: u32| {
        let factor = BigInt::from(factor);
        let mut times = 0;
        while (&rest % &factor).is_zero() {
            rest /= &factor;
            times += 1;
        }
        times
    };
    let (twos, fives) = (count(2), count(5));
    rest.is_one().then_some(twos.max(fives))
}

/// Quote a string the way Go's `strconv.Quote` does.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{b}' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\u{7f}' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c if c.is_control() => {
                if (c as u32) < 0x10000 {
                    out.push_str(&format!("\\u{:04x}", c as u32));
                } else {
                    out.push_str(&format!("\\U{:08x}", c as u32));
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Apply a unary operator.
pub fn unary(op: UnaryOp, value: ConstValue) -> Result<ConstValue, ConstError> {
    let undefined = |value: &ConstValue| ConstError::UndefinedOperator {
        op: op.to_string(),
        operand: value.describe().to_string(),
    };

    match (op, value) {
        (UnaryOp::Plus, value @ (ConstValue::Int(_) | ConstValue::Float(_) | ConstValue::Complex(..))) => {
            Ok(value)
        }
        (UnaryOp::Neg, ConstValue::Int(v)) => Ok(ConstValue::Int(-v)),
        (UnaryOp::Neg, ConstValue::Float(v)) => Ok(ConstValue::Float(-v)),
        (UnaryOp::Neg, ConstValue::Complex(re, im)) => Ok(ConstValue::Complex(-re, -im)),
        (UnaryOp::Not, ConstValue::Bool(v)) => Ok(ConstValue::Bool(!v)),
        (UnaryOp::Complement, ConstValue::Int(v)) => Ok(ConstValue::Int(!v)),
        (_, value) => Err(undefined(&value)),
    }
}

/// Apply a binary operator to two constant values.
///
/// Division of two integers truncates toward zero; as soon as one operand is
/// a float the quotient is exact.
pub fn binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> Result<ConstValue, ConstError> {
    use ConstValue::{Bool, Complex, Float, Int, Str};

    let undefined = |value: &ConstValue| ConstError::UndefinedOperator {
        op: op.to_string(),
        operand: value.describe().to_string(),
    };

    if op.is_shift() {
        let Some(value) = lhs.as_integer() else {
            return Err(undefined(&lhs));
        };
        let count = rhs
            .as_integer()
            .ok_or_else(|| ConstError::InvalidShift(rhs.to_string()))?;
        let count = count
            .to_u64()
            .filter(|count| *count <= MAX_SHIFT)
            .ok_or_else(|| ConstError::InvalidShift(count.to_string()))?;
        return match op {
            BinaryOp::Shl => ConstValue::int(value << count),
            _ => Ok(Int(value >> count)),
        };
    }

    match (lhs, rhs) {
        (Int(l), Int(r)) => int_binary(op, l, r),
        (Str(l), Str(r)) => match op {
            BinaryOp::Add => Ok(Str(l + &r)),
            _ => compare(op, &l, &r).ok_or_else(|| undefined(&Str(l))),
        },
        (Bool(l), Bool(r)) => match op {
            BinaryOp::LogicalAnd => Ok(Bool(l && r)),
            BinaryOp::LogicalOr => Ok(Bool(l || r)),
            BinaryOp::Eq => Ok(Bool(l == r)),
            BinaryOp::Ne => Ok(Bool(l != r)),
            _ => Err(undefined(&Bool(l))),
        },
        (l @ (Complex(..) | Int(_) | Float(_)), r @ Complex(..))
        | (l @ Complex(..), r @ (Int(_) | Float(_))) => {
            match (l.as_complex(), r.as_complex()) {
                (Some(a), Some(b)) => complex_binary(op, a, b).unwrap_or_else(|| Err(undefined(&l))),
                _ => Err(undefined(&l)),
            }
        }
        (l @ (Int(_) | Float(_)), r @ (Int(_) | Float(_))) => match (l.as_rational(), r.as_rational()) {
            (Some(a), Some(b)) => float_binary(op, a, b).unwrap_or_else(|| Err(undefined(&l))),
            _ => Err(undefined(&l)),
        },
        (l, _) => Err(undefined(&l)),
    }
}

fn compare<T: PartialOrd + ?Sized>(op: BinaryOp, l: &T, r: &T) -> Option<ConstValue> {
    let result = match op {
        BinaryOp::Eq => l == r,
        BinaryOp::Ne => l != r,
        BinaryOp::Lt => l < r,
        BinaryOp::Le => l <= r,
        BinaryOp::Gt => l > r,
        BinaryOp::Ge => l >= r,
        _ => return None,
    };
    Some(ConstValue::Bool(result))
}

fn int_binary(op: BinaryOp, l: BigInt, r: BigInt) -> Result<ConstValue, ConstError> {
    let value = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div | BinaryOp::Rem if r.is_zero() => return Err(ConstError::DivisionByZero),
        BinaryOp::Div => l / r,
        BinaryOp::Rem => l % r,
        BinaryOp::And => l & r,
        BinaryOp::Or => l | r,
        BinaryOp::Xor => l ^ r,
        BinaryOp::AndNot => l & !r,
        _ => {
            return compare(op, &l, &r).ok_or_else(|| ConstError::UndefinedOperator {
                op: op.to_string(),
                operand: "integer".to_string(),
            });
        }
    };
    ConstValue::int(value)
}

fn float_binary(op: BinaryOp, l: BigRational, r: BigRational) -> Option<Result<ConstValue, ConstError>> {
    let value = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div if r.is_zero() => return Some(Err(ConstError::DivisionByZero)),
        BinaryOp::Div => l / r,
        _ => return compare(op, &l, &r).map(Ok),
    };
    Some(Ok(ConstValue::Float(value)))
}

fn complex_binary(
    op: BinaryOp,
    (a, b): (BigRational, BigRational),
    (c, d): (BigRational, BigRational),
) -> Option<Result<ConstValue, ConstError>> {
    let (re, im) = match op {
        BinaryOp::Add => (a + c, b + d),
        BinaryOp::Sub => (a - c, b - d),
        BinaryOp::Mul => (&a * &c - &b * &d, &a * &d + &b * &c),
        BinaryOp::Div => {
            let denominator = &c * &c + &d * &d;
            if denominator.is_zero() {
                return Some(Err(ConstError::DivisionByZero));
            }
            (
                (&a * &c + &b * &d) / &denominator,
                (&b * &c - &a * &d) / &denominator,
            )
        }
        BinaryOp::Eq => return Some(Ok(ConstValue::Bool(a == c && b == d))),
        BinaryOp::Ne => return Some(Ok(ConstValue::Bool(a != c || b != d))),
        _ => return None,
    };
    Some(Ok(ConstValue::Complex(re, im)))
}

/// Inclusive value range of a sized integer type.
pub fn int_range(type_name: &str) -> Option<(BigInt, BigInt)> {
    let (min, max): (BigInt, BigInt) = match type_name {
        "int8" => (i8::MIN.into(), i8::MAX.into()),
        "int16" => (i16::MIN.into(), i16::MAX.into()),
        "int32" | "rune" => (i32::MIN.into(), i32::MAX.into()),
        "int" | "int64" => (i64::MIN.into(), i64::MAX.into()),
        "uint8" | "byte" => (BigInt::zero(), u8::MAX.into()),
        "uint16" => (BigInt::zero(), u16::MAX.into()),
        "uint32" => (BigInt::zero(), u32::MAX.into()),
        "uint" | "uint64" | "uintptr" => (BigInt::zero(), u64::MAX.into()),
        _ => return None,
    };
    Some((min, max))
}

/// Largest finite magnitude of a float type.
fn float_max(type_name: &str) -> Option<BigRational> {
    match type_name {
        "float32" | "complex64" => BigRational::from_float(f32::MAX),
        "float64" | "complex128" => BigRational::from_float(f64::MAX),
        _ => None,
    }
}

/// Convert a constant to a predeclared scalar type, checking that it is
/// representable.
///
/// Float values stay exact; only their magnitude is checked against the
/// type's range.
pub fn convert(value: ConstValue, type_name: &str) -> Result<ConstValue, ConstError> {
    let invalid = |value: &ConstValue| ConstError::InvalidConversion {
        value: value.to_string(),
        target: type_name.to_string(),
    };
    let overflows = |value: &dyn fmt::Display| ConstError::NotRepresentable {
        value: value.to_string(),
        target: type_name.to_string(),
    };

    if let Some((min, max)) = int_range(type_name) {
        let int = match &value {
            ConstValue::Int(v) => v.clone(),
            ConstValue::Float(_) | ConstValue::Complex(..) => match value.as_integer() {
                Some(int) => int,
                None if matches!(value, ConstValue::Float(_)) => {
                    return Err(ConstError::Truncated(value.to_string()));
                }
                None => return Err(invalid(&value)),
            },
            _ => return Err(invalid(&value)),
        };
        if int < min || int > max {
            return Err(overflows(&int));
        }
        return Ok(ConstValue::Int(int));
    }

    match type_name {
        "float32" | "float64" => {
            let real = value.as_complex().filter(|(_, im)| im.is_zero());
            let Some((re, _)) = real else {
                return Err(invalid(&value));
            };
            match float_max(type_name) {
                Some(max) if re.abs() > max => Err(overflows(&ConstValue::Float(re))),
                _ => Ok(ConstValue::Float(re)),
            }
        }
        "complex64" | "complex128" => {
            let Some((re, im)) = value.as_complex() else {
                return Err(invalid(&value));
            };
            match float_max(type_name) {
                Some(max) if re.abs() > max || im.abs() > max => {
                    Err(overflows(&ConstValue::Complex(re, im)))
                }
                _ => Ok(ConstValue::Complex(re, im)),
            }
        }
        "string" => match value {
            ConstValue::Str(v) => Ok(ConstValue::Str(v)),
            ConstValue::Int(v) => {
                let c = v
                    .to_u32()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                Ok(ConstValue::Str(c.to_string()))
            }
            other => Err(invalid(&other)),
        },
        "bool" => match value {
            ConstValue::Bool(v) => Ok(ConstValue::Bool(v)),
            other => Err(invalid(&other)),
        },
        "any" => Ok(value),
        _ => Err(invalid(&value)),
    }
}

/// Parse an integer literal (`42`, `0x2A`, `0o52`, `052`, `0b101010`, `1_000`).
pub fn parse_int(text: &str) -> Result<BigInt, ConstError> {
    let digits = text.replace('_', "").to_ascii_lowercase();
    let (radix, body) = if let Some(body) = digits.strip_prefix("0x") {
        (16, body)
    } else if let Some(body) = digits.strip_prefix("0b") {
        (2, body)
    } else if let Some(body) = digits.strip_prefix("0o") {
        (8, body)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits.as_str())
    };

    if body.is_empty() || !body.chars().all(|c| c.is_digit(radix)) {
        return Err(ConstError::MalformedLiteral(text.to_string()));
    }
    let value = BigInt::parse_bytes(body.as_bytes(), radix)
        .ok_or_else(|| ConstError::MalformedLiteral(text.to_string()))?;
    if value.bits() > MAX_INT_BITS {
        return Err(ConstError::Overflow);
    }
    Ok(value)
}

/// Parse a decimal or hexadecimal floating-point literal exactly.
pub fn parse_float(text: &str) -> Result<BigRational, ConstError> {
    let malformed = || ConstError::MalformedLiteral(text.to_string());
    let digits = text.replace('_', "").to_ascii_lowercase();

    let (mantissa, exponent, radix, base) = match digits.strip_prefix("0x") {
        Some(hex) => {
            let (mantissa, exponent) = hex.split_once('p').unwrap_or((hex, "0"));
            (mantissa, exponent, 16, 2u32)
        }
        None => {
            let (mantissa, exponent) = digits.split_once('e').unwrap_or((digits.as_str(), "0"));
            (mantissa, exponent, 10, 10u32)
        }
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let all_digits = format!("{whole}{fraction}");
    if all_digits.is_empty() || !all_digits.chars().all(|c| c.is_digit(radix)) {
        return Err(malformed());
    }
    let significand = BigInt::parse_bytes(all_digits.as_bytes(), radix).ok_or_else(malformed)?;

    let exponent: i64 = exponent.parse().map_err(|_| malformed())?;
    // Each hex fraction digit is four binary places
    let places = fraction.len() as i64 * if radix == 16 { 4 } else { 1 };
    let exponent = exponent - places;
    if exponent.abs() > MAX_LITERAL_EXPONENT {
        return Err(ConstError::Overflow);
    }

    let scale = BigInt::from(base).pow(exponent.unsigned_abs() as u32);
    Ok(if exponent >= 0 {
        BigRational::from_integer(significand * scale)
    } else {
        BigRational::new(significand, scale)
    })
}

/// Decode the escapes of an interpreted string or rune body into bytes.
fn unescape(body: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(body.len());
    let mut chars = body.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }

        let escaped = chars.next()?;
        let simple = match escaped {
            'a' => Some(0x07),
            'b' => Some(0x08),
            'f' => Some(0x0c),
            'n' => Some(b'\n'),
            'r' => Some(b'\r'),
            't' => Some(b'\t'),
            'v' => Some(0x0b),
            '\\' => Some(b'\\'),
            '\'' => Some(b'\''),
            '"' => Some(b'"'),
            _ => None,
        };
        if let Some(byte) = simple {
            out.push(byte);
            continue;
        }

        match escaped {
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                out.push(u8::from_str_radix(&hex, 16).ok()?);
            }
            'u' | 'U' => {
                let len = if escaped == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(len).collect();
                let c = char::from_u32(u32::from_str_radix(&hex, 16).ok()?)?;
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
            '0'..='7' => {
                let rest: String = chars.by_ref().take(2).collect();
                let octal = format!("{escaped}{rest}");
                out.push(u8::from_str_radix(&octal, 8).ok()?);
            }
            _ => return None,
        }
    }
    Some(out)
}

/// Decode a string literal, quotes included.
pub fn parse_string(text: &str) -> Result<String, ConstError> {
    if let Some(raw) = text.strip_prefix('`').and_then(|t| t.strip_suffix('`')) {
        return Ok(raw.replace('\r', ""));
    }

    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .and_then(unescape)
        .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
        .ok_or_else(|| ConstError::MalformedLiteral(text.to_string()))
}

/// Decode a rune literal to its code point.
pub fn parse_rune(text: &str) -> Result<u32, ConstError> {
    let malformed = || ConstError::MalformedLiteral(text.to_string());
    let body = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .ok_or_else(malformed)?;

    // Byte escapes denote the byte value itself, not a UTF-8 sequence
    let byte_escape = body
        .strip_prefix('\\')
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c == 'x' || c.is_digit(8));
    if byte_escape {
        let bytes = unescape(body).ok_or_else(malformed)?;
        return match bytes.as_slice() {
            [byte] => Ok(u32::from(*byte)),
            _ => Err(malformed()),
        };
    }

    let bytes = unescape(body).ok_or_else(malformed)?;
    let decoded = String::from_utf8(bytes).map_err(|_| malformed())?;
    let mut chars = decoded.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(u32::from(c)),
        _ => Err(malformed()),
    }
}
