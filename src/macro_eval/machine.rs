//! Postfix stack machine

use super::postfix::{Item, Operator};
use super::{parse_hex, MacroTable, SkipReason};
use crate::error::{Error, Result};
use crate::ir::Value;

/// Raw values nest at most this deep before a reference is considered unresolved
const MAX_ALIAS_DEPTH: usize = 16;

/// Intermediate numeric result. Integers ride in the f64 mantissa; `float`
/// records whether any floating literal contributed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Number {
    pub value: f64,
    pub float: bool,
}

impl Number {
    fn int(value: f64) -> Self {
        Number {
            value,
            float: false,
        }
    }

    fn as_bits(self) -> Option<u64> {
        if self.float || self.value.fract() != 0.0 {
            return None;
        }
        Some(self.value as i64 as u64)
    }
}

/// Final value of an expression
#[derive(Debug, Clone, PartialEq)]
pub enum Computed {
    Number(Number),
    Str(String),
    Skipped(SkipReason),
}

enum Slot {
    Text(String),
    Num(Number),
    Str(String),
}

enum Resolved {
    Num(Number),
    Str(String),
}

/// Evaluates postfix `items`, resolving identifiers through `table`.
/// `name` is only used in error messages.
pub fn run(name: &str, items: &[Item], table: &MacroTable) -> Result<Computed> {
    let mut stack: Vec<Slot> = Vec::new();

    for item in items {
        match item {
            Item::Operand(text) => stack.push(Slot::Text(text.clone())),
            Item::Str(s) => stack.push(Slot::Str(s.clone())),
            Item::Op(op) => {
                let (Some(rhs), Some(lhs)) = (stack.pop(), stack.pop()) else {
                    return Err(Error::macro_eval(
                        name,
                        format!("operator `{}` needs two operands", op.symbol()),
                    ));
                };
                let lhs = match resolve_number(name, lhs, table)? {
                    Ok(n) => n,
                    Err(reason) => return Ok(Computed::Skipped(reason)),
                };
                let rhs = match resolve_number(name, rhs, table)? {
                    Ok(n) => n,
                    Err(reason) => return Ok(Computed::Skipped(reason)),
                };
                match apply(*op, lhs, rhs) {
                    Some(n) => stack.push(Slot::Num(n)),
                    None => {
                        return Ok(Computed::Skipped(SkipReason::InvalidArithmetic(format!(
                            "{} {} {}",
                            lhs.value,
                            op.symbol(),
                            rhs.value
                        ))))
                    }
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(Error::macro_eval(
            name,
            format!("expression left {} values on the stack", stack.len()),
        ));
    }

    let Some(last) = stack.pop() else {
        return Err(Error::macro_eval(name, "empty expression"));
    };
    let ident = match &last {
        Slot::Text(text) => describe(text),
        _ => String::new(),
    };
    Ok(match resolve(name, last, table, 0)? {
        Some(Resolved::Num(n)) => Computed::Number(n),
        Some(Resolved::Str(s)) => Computed::Str(s),
        None => Computed::Skipped(SkipReason::Unresolved { ident }),
    })
}

fn describe(text: &str) -> String {
    text.trim_start_matches(['-', '+', '~', '!']).to_string()
}

fn resolve_number(
    name: &str,
    slot: Slot,
    table: &MacroTable,
) -> Result<std::result::Result<Number, SkipReason>> {
    let text = match &slot {
        Slot::Text(t) => describe(t),
        _ => String::new(),
    };
    Ok(match resolve(name, slot, table, 0)? {
        Some(Resolved::Num(n)) => Ok(n),
        Some(Resolved::Str(_)) => Err(SkipReason::StringOperand),
        None => Err(SkipReason::Unresolved { ident: text }),
    })
}

fn resolve(name: &str, slot: Slot, table: &MacroTable, depth: usize) -> Result<Option<Resolved>> {
    match slot {
        Slot::Num(n) => Ok(Some(Resolved::Num(n))),
        Slot::Str(s) => Ok(Some(Resolved::Str(s))),
        Slot::Text(text) => resolve_text(name, text.trim(), table, depth),
    }
}

fn resolve_text(name: &str, text: &str, table: &MacroTable, depth: usize) -> Result<Option<Resolved>> {
    if depth > MAX_ALIAS_DEPTH {
        return Ok(None);
    }

    if let Some(rest) = text.strip_prefix('-') {
        return Ok(number_of(resolve_text(name, rest, table, depth)?).map(|n| {
            Resolved::Num(Number {
                value: -n.value,
                float: n.float,
            })
        }));
    }
    if let Some(rest) = text.strip_prefix('+') {
        return resolve_text(name, rest, table, depth);
    }
    if let Some(rest) = text.strip_prefix('~') {
        let inner = number_of(resolve_text(name, rest, table, depth)?);
        return Ok(inner
            .and_then(Number::as_bits)
            .map(|bits| Resolved::Num(Number::int(f64::from(!(bits as u32))))));
    }
    if let Some(rest) = text.strip_prefix('!') {
        let inner = number_of(resolve_text(name, rest, table, depth)?);
        return Ok(inner.map(|n| Resolved::Num(Number::int(bool_value(n.value == 0.0)))));
    }

    let Some(first) = text.chars().next() else {
        return Ok(None);
    };

    if text.starts_with("0x") || text.starts_with("0X") {
        let value = parse_hex(name, text)?;
        return Ok(Some(Resolved::Num(Number::int(f64::from(value)))));
    }

    if first.is_ascii_digit() || first == '.' {
        let literal = text.trim_end_matches(|c: char| matches!(c, 'L' | 'l' | 'U' | 'u' | 'f' | 'F'));
        let float = literal.contains(['.', 'e', 'E']);
        return Ok(literal
            .parse::<f64>()
            .ok()
            .map(|value| Resolved::Num(Number { value, float })));
    }

    match table.get(text) {
        Some(Value::U32(v)) => Ok(Some(Resolved::Num(Number::int(f64::from(*v))))),
        Some(Value::Str(s)) => Ok(Some(Resolved::Str(s.clone()))),
        Some(Value::Raw(raw)) => resolve_text(name, raw.trim(), table, depth + 1),
        None => Ok(None),
    }
}

fn number_of(resolved: Option<Resolved>) -> Option<Number> {
    match resolved {
        Some(Resolved::Num(n)) => Some(n),
        _ => None,
    }
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Applies a binary operator. Returns `None` for operations with no defined
/// result (division by zero, oversized shifts, bit operations on floats).
fn apply(op: Operator, lhs: Number, rhs: Number) -> Option<Number> {
    let float = lhs.float || rhs.float;
    let (a, b) = (lhs.value, rhs.value);

    let arithmetic = |value: f64| Some(Number { value, float });
    let bits = |f: fn(u64, u64) -> Option<u64>| {
        let value = f(lhs.as_bits()?, rhs.as_bits()?)?;
        Some(Number::int(value as f64))
    };
    let compare = |b: bool| Some(Number::int(bool_value(b)));

    match op {
        Operator::Add => arithmetic(a + b),
        Operator::Sub => arithmetic(a - b),
        Operator::Mul => arithmetic(a * b),
        Operator::Div => {
            if b == 0.0 {
                None
            } else if float {
                arithmetic(a / b)
            } else {
                arithmetic((a / b).trunc())
            }
        }
        Operator::Shl => bits(|x, y| if y < 64 { Some(x << y) } else { None }),
        Operator::Shr => bits(|x, y| if y < 64 { Some(x >> y) } else { None }),
        Operator::BitOr => bits(|x, y| Some(x | y)),
        Operator::BitAnd => bits(|x, y| Some(x & y)),
        Operator::Eq => compare(a == b),
        Operator::Ne => compare(a != b),
        Operator::Lt => compare(a < b),
        Operator::Le => compare(a <= b),
        Operator::Gt => compare(a > b),
        Operator::Ge => compare(a >= b),
        Operator::And => compare(a != 0.0 && b != 0.0),
        Operator::Or => compare(a != 0.0 || b != 0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(text: &str) -> Item {
        Item::Operand(text.to_string())
    }

    fn number(items: &[Item], table: &MacroTable) -> f64 {
        match run("TEST", items, table).unwrap() {
            Computed::Number(n) => n.value,
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn test_shift_and_or() {
        let items = vec![item("1"), item("4"), Item::Op(Operator::Shl), item("3"), Item::Op(Operator::BitOr)];
        assert_eq!(number(&items, &MacroTable::new()), 19.0);
    }

    #[test]
    fn test_identifier_lookup() {
        let table: MacroTable = vec![("FOO", Value::U32(8))].into_iter().collect();
        let items = vec![item("FOO"), item("2"), Item::Op(Operator::Add)];
        assert_eq!(number(&items, &table), 10.0);
    }

    #[test]
    fn test_unresolved_identifier_skips() {
        let items = vec![item("MISSING"), item("2"), Item::Op(Operator::Add)];
        assert_eq!(
            run("TEST", &items, &MacroTable::new()).unwrap(),
            Computed::Skipped(SkipReason::Unresolved {
                ident: "MISSING".to_string()
            })
        );
    }

    #[test]
    fn test_missing_operand_is_fatal() {
        let items = vec![item("1"), Item::Op(Operator::Add)];
        assert!(run("TEST", &items, &MacroTable::new()).is_err());
    }

    #[test]
    fn test_leftover_stack_is_fatal() {
        let items = vec![item("1"), item("2")];
        assert!(run("TEST", &items, &MacroTable::new()).is_err());
    }

    #[test]
    fn test_integer_division_truncates() {
        let items = vec![item("7"), item("2"), Item::Op(Operator::Div)];
        assert_eq!(number(&items, &MacroTable::new()), 3.0);
    }

    #[test]
    fn test_division_by_zero_skips() {
        let items = vec![item("7"), item("0"), Item::Op(Operator::Div)];
        assert!(matches!(
            run("TEST", &items, &MacroTable::new()).unwrap(),
            Computed::Skipped(SkipReason::InvalidArithmetic(_))
        ));
    }

    #[test]
    fn test_float_literal_is_flagged() {
        match run("TEST", &[item("-1.5")], &MacroTable::new()).unwrap() {
            Computed::Number(n) => {
                assert!(n.float);
                assert_eq!(n.value, -1.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_string_alias() {
        let table: MacroTable = vec![("DLL_A", Value::Str("d3dcompiler_43.dll".into()))]
            .into_iter()
            .collect();
        assert_eq!(
            run("TEST", &[item("DLL_A")], &table).unwrap(),
            Computed::Str("d3dcompiler_43.dll".to_string())
        );
    }

    #[test]
    fn test_bitwise_not() {
        assert_eq!(number(&[item("~0")], &MacroTable::new()), f64::from(u32::MAX));
    }
}
