//! Tests for `#define` and enum initializer evaluation

use sdkbind::ir::Value;
use sdkbind::lexer::{HeaderScanner, ScanMode, Token};
use sdkbind::macro_eval::{Evaluation, MacroEvaluator, MacroTable, SkipReason, ValueContext};
use sdkbind::{parse_header, Error};

/// Value of `name` after parsing `source`, `None` if the macro was skipped
fn macro_value(source: &str, name: &str) -> Option<Value> {
    let file = parse_header("test.h", source).expect("header parses");
    file.macros
        .into_iter()
        .find(|m| m.ident == name)
        .map(|m| m.value)
}

fn expression(source: &str, table: &MacroTable) -> Evaluation {
    let mut scanner = HeaderScanner::new("expr.h", source);
    let mut tokens: Vec<Token> = scanner.scan_tokens(ScanMode::Tokens).unwrap();
    tokens.pop(); // Eof
    MacroEvaluator::new(table)
        .evaluate_expression("EXPR", &tokens, ValueContext::Macro)
        .unwrap()
}

#[test]
fn test_shift_binds_tighter_than_or() {
    let source = "#define A 1\n#define B 4\n#define C 3\n#define X A << B | C\n";
    assert_eq!(macro_value(source, "X"), Some(Value::U32(19)));
}

#[test]
fn test_arithmetic_is_left_associative() {
    let table = MacroTable::new();
    assert_eq!(expression("10 - 4 - 3", &table), Evaluation::Resolved(Value::U32(3)));
    assert_eq!(expression("2 + 3 * 4", &table), Evaluation::Resolved(Value::U32(20)));
    assert_eq!(expression("2 + ( 3 * 4 )", &table), Evaluation::Resolved(Value::U32(14)));
}

#[test]
fn test_comparisons_and_logic() {
    let table = MacroTable::new();
    assert_eq!(expression("( 3 > 2 ) && ( 1 == 1 )", &table), Evaluation::Resolved(Value::U32(1)));
    assert_eq!(expression("( 3 < 2 ) || 0", &table), Evaluation::Resolved(Value::U32(0)));
    assert_eq!(expression("0xF0 & 0x3C", &table), Evaluation::Resolved(Value::U32(0x30)));
}

#[test]
fn test_unary_operators() {
    let table = MacroTable::new();
    assert_eq!(expression("~0", &table), Evaluation::Resolved(Value::U32(u32::MAX)));
    assert_eq!(expression("!5", &table), Evaluation::Resolved(Value::U32(0)));
    assert_eq!(expression("-1", &table), Evaluation::Resolved(Value::Raw("-1".into())));
}

#[test]
fn test_hex_width_limits() {
    assert_eq!(macro_value("#define B 0xff\n", "B"), Some(Value::U32(0xff)));
    assert_eq!(macro_value("#define H 0xbeef\n", "H"), Some(Value::U32(0xbeef)));
    assert_eq!(macro_value("#define W 0x887a0001\n", "W"), Some(Value::U32(0x887a0001)));

    let err = parse_header("test.h", "#define WIDE 0x123456789\n").unwrap_err();
    assert!(matches!(err, Error::MacroEvaluation { .. }));
}

#[test]
fn test_forward_reference_is_skipped() {
    let source = "#define LATER_SUM ( EARLIER + 1 )\n#define EARLIER 2\n";
    assert_eq!(macro_value(source, "LATER_SUM"), None);
    assert_eq!(macro_value(source, "EARLIER"), Some(Value::U32(2)));
}

#[test]
fn test_skip_reasons() {
    let table = MacroTable::new();
    assert_eq!(
        expression("UNKNOWN_NAME", &table),
        Evaluation::Skipped(SkipReason::Unresolved {
            ident: "UNKNOWN_NAME".into()
        })
    );
    assert!(matches!(
        expression("( 1 + 2", &table),
        Evaluation::Skipped(SkipReason::Unbalanced)
    ));
    assert!(matches!(
        expression("1 / 0", &table),
        Evaluation::Skipped(SkipReason::InvalidArithmetic(_))
    ));
    assert!(matches!(
        expression("\"a\" + 1", &table),
        Evaluation::Skipped(SkipReason::StringOperand)
    ));
}

#[test]
fn test_alias_chain_resolves() {
    let source = "#define BASE ( 16 )\n#define ALIAS BASE\n#define DERIVED ( ALIAS * 2 )\n";
    assert_eq!(macro_value(source, "ALIAS"), Some(Value::U32(16)));
    assert_eq!(macro_value(source, "DERIVED"), Some(Value::U32(32)));
}

#[test]
fn test_line_continuation() {
    let source = "#define SPLIT ( 1 << 3 ) | \\\n    ( 1 )\n#define NEXT 5\n";
    assert_eq!(macro_value(source, "SPLIT"), Some(Value::U32(9)));
    assert_eq!(macro_value(source, "NEXT"), Some(Value::U32(5)));
}

#[test]
fn test_enum_initializers_see_macros_and_fields() {
    let source = r#"
#define D3D11_SHIFT ( 2 )
typedef enum D3D11_BIND_FLAG
    {	D3D11_BIND_VERTEX_BUFFER	= 0x1L,
	D3D11_BIND_INDEX_BUFFER	= ( D3D11_BIND_VERTEX_BUFFER << 1 ),
	D3D11_BIND_CONSTANT_BUFFER	= ( 1 << D3D11_SHIFT ),
	D3D11_BIND_SHADER_RESOURCE
    } 	D3D11_BIND_FLAG;
"#;
    let file = parse_header("test.h", source).unwrap();
    let values: Vec<Value> = file.enums[0].fields.iter().map(|f| f.value.clone()).collect();
    assert_eq!(
        values,
        vec![Value::U32(1), Value::U32(2), Value::U32(4), Value::U32(5)]
    );
}

#[test]
fn test_negative_enum_constant_wraps() {
    let source = "typedef enum D3D11_E { D3D11_E_NEG = -1, D3D11_E_NEXT } D3D11_E;";
    let file = parse_header("test.h", source).unwrap();
    assert_eq!(file.enums[0].fields[0].value, Value::U32(u32::MAX));
    assert_eq!(file.enums[0].fields[1].value, Value::U32(0));
}
