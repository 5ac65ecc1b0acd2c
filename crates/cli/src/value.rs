//! String → DocValue and predicate parsing.
//!
//! User input is parsed into `DocValue` using auto-detect logic:
//! 1. JSON structures (`{`, `[`, `"`) → parse as JSON
//! 2. `null` → DocValue::Null
//! 3. `true` / `false` → DocValue::Bool
//! 4. Integer pattern → DocValue::Int
//! 5. Float pattern → DocValue::Float
//! 6. Everything else → DocValue::String

use docmeta_core::DocValue;
use docmeta_engine::Predicate;

/// Auto-detect value type from a user-supplied string.
pub fn parse_value(s: &str) -> DocValue {
    if s.starts_with('{') || s.starts_with('[') || s.starts_with('"') {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(s) {
            return DocValue::from(json);
        }
    }

    match s {
        "null" => return DocValue::Null,
        "true" => return DocValue::Bool(true),
        "false" => return DocValue::Bool(false),
        _ => {}
    }

    if is_integer(s) {
        if let Ok(i) = s.parse::<i64>() {
            return DocValue::Int(i);
        }
    }

    if is_float(s) {
        if let Ok(f) = s.parse::<f64>() {
            return DocValue::Float(f);
        }
    }

    DocValue::String(s.to_string())
}

/// Parse a predicate expression: `any`, or an operator followed by a value.
///
/// Operators: `>`, `>=`, `<`, `<=`, `==`, `!=`. Ordering operators need a
/// number; equality operators take any value (see [`parse_value`]).
pub fn parse_predicate(expr: &str) -> Result<Predicate, String> {
    let expr = expr.trim();
    if expr == "any" {
        return Ok(Predicate::any());
    }

    // Two-character operators first so `>=` is not read as `>`.
    let (op, operand) = [">=", "<=", "==", "!=", ">", "<"]
        .iter()
        .find_map(|op| expr.strip_prefix(op).map(|rest| (*op, rest.trim())))
        .ok_or_else(|| format!("Invalid predicate '{}': expected an operator or 'any'", expr))?;
    if operand.is_empty() {
        return Err(format!("Invalid predicate '{}': missing value", expr));
    }

    let number = || {
        operand
            .parse::<f64>()
            .map_err(|_| format!("Invalid predicate '{}': '{}' is not a number", expr, operand))
    };
    match op {
        ">" => Ok(Predicate::greater_than(number()?)),
        ">=" => Ok(Predicate::at_least(number()?)),
        "<" => Ok(Predicate::less_than(number()?)),
        "<=" => Ok(Predicate::at_most(number()?)),
        "==" => Ok(Predicate::equals(parse_value(operand))),
        _ => Ok(Predicate::not_equals(parse_value(operand))),
    }
}

fn is_integer(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_float(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    if s.is_empty() {
        return false;
    }
    // Must contain a dot or exponent
    if !s.contains('.') && !s.contains('e') && !s.contains('E') {
        return false;
    }
    s.bytes().all(|b| {
        b.is_ascii_digit() || b == b'.' || b == b'e' || b == b'E' || b == b'+' || b == b'-'
    })
}
