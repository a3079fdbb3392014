//! Infix to postfix conversion (shunting-yard)

use super::SkipReason;
use crate::lexer::{Token, TokenKind};

/// Binary operators understood by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Or,
    And,
    Eq,
    Ne,
    BitOr,
    BitAnd,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    /// Precedence level; a lower number binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            Operator::Or => 1,
            Operator::And => 2,
            Operator::Eq | Operator::Ne => 3,
            Operator::BitOr | Operator::BitAnd | Operator::Shl | Operator::Shr => 4,
            Operator::Add | Operator::Sub | Operator::Mul | Operator::Div => 5,
            Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge => 9,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Or => "||",
            Operator::And => "&&",
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::BitOr => "|",
            Operator::BitAnd => "&",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::Add => "+",
            Operator::Sub => "-",
            Operator::Mul => "*",
            Operator::Div => "/",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let op = match symbol {
            "||" => Operator::Or,
            "&&" => Operator::And,
            "==" => Operator::Eq,
            "!=" => Operator::Ne,
            "|" => Operator::BitOr,
            "&" => Operator::BitAnd,
            "<<" => Operator::Shl,
            ">>" => Operator::Shr,
            "+" => Operator::Add,
            "-" => Operator::Sub,
            "*" => Operator::Mul,
            "/" => Operator::Div,
            "<" => Operator::Lt,
            "<=" => Operator::Le,
            ">" => Operator::Gt,
            ">=" => Operator::Ge,
            _ => return None,
        };
        Some(op)
    }
}

/// Element of a postfix expression
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    /// Numeric literal or identifier, with any unary prefix concatenated
    Operand(String),
    /// String literal contents
    Str(String),
    Op(Operator),
}

#[derive(Debug, Clone, Copy)]
enum Pending {
    Op(Operator),
    LeftParen,
}

/// C literal-type suffixes that follow a number without whitespace
const LITERAL_SUFFIXES: &[&str] = &["L", "l", "U", "u", "UL", "ul", "LL", "ULL", "f", "F"];

/// Characters that fold with an adjacent copy of themselves (`<` `<` is `<<`)
const DOUBLING: &[char] = &['<', '>', '|', '&', '='];

/// Characters that fold with an adjacent `=` (`<` `=` is `<=`)
const WITH_EQUALS: &[char] = &['<', '>', '!', '='];

/// Characters accepted as unary prefixes
const UNARY: &[&str] = &["-", "+", "~", "!"];

/// Converts an infix token sequence into postfix order
pub fn to_postfix(tokens: &[Token]) -> std::result::Result<Vec<Item>, SkipReason> {
    let mut output = Vec::new();
    let mut pending: Vec<Pending> = Vec::new();
    let mut prefix = String::new();
    let mut expect_operand = true;
    let mut i = 0;

    while i < tokens.len() {
        let token = &tokens[i];
        match &token.kind {
            TokenKind::Number | TokenKind::Identifier => {
                if !expect_operand {
                    return Err(SkipReason::Malformed(format!(
                        "operand `{}` where an operator was expected",
                        token.lexeme
                    )));
                }
                output.push(Item::Operand(format!("{}{}", prefix, token.lexeme)));
                prefix.clear();
                expect_operand = false;

                if matches!(token.kind, TokenKind::Number) {
                    while let Some(next) = tokens.get(i + 1) {
                        let is_suffix = next.is_identifier()
                            && LITERAL_SUFFIXES.contains(&next.lexeme.as_str())
                            && next.is_adjacent_to(&tokens[i]);
                        if !is_suffix {
                            break;
                        }
                        i += 1;
                    }
                }
            }
            TokenKind::String(value) => {
                if !expect_operand || !prefix.is_empty() {
                    return Err(SkipReason::Malformed("misplaced string literal".to_string()));
                }
                output.push(Item::Str(value.clone()));
                expect_operand = false;
            }
            TokenKind::Newline | TokenKind::Eof => {}
            TokenKind::Char => {
                return Err(SkipReason::Unsupported {
                    token: token.lexeme.clone(),
                })
            }
            TokenKind::Punct => match token.lexeme.as_str() {
                "(" => {
                    if !expect_operand || !prefix.is_empty() {
                        return Err(SkipReason::Malformed(
                            "parenthesis where an operator was expected".to_string(),
                        ));
                    }
                    pending.push(Pending::LeftParen);
                }
                ")" => {
                    if expect_operand {
                        return Err(SkipReason::Malformed("empty parenthesis".to_string()));
                    }
                    loop {
                        match pending.pop() {
                            Some(Pending::Op(op)) => output.push(Item::Op(op)),
                            Some(Pending::LeftParen) => break,
                            None => return Err(SkipReason::Unbalanced),
                        }
                    }
                }
                _ => {
                    let (symbol, width) = fold_operator(tokens, i);
                    i += width - 1;

                    if expect_operand {
                        if !UNARY.contains(&symbol.as_str()) {
                            return Err(SkipReason::Unsupported { token: symbol });
                        }
                        prefix.push_str(&symbol);
                    } else {
                        let op = Operator::from_symbol(&symbol)
                            .ok_or(SkipReason::Unsupported { token: symbol })?;
                        while let Some(Pending::Op(top)) = pending.last().copied() {
                            if top.precedence() > op.precedence() {
                                break;
                            }
                            output.push(Item::Op(top));
                            pending.pop();
                        }
                        pending.push(Pending::Op(op));
                        expect_operand = true;
                    }
                }
            },
        }
        i += 1;
    }

    if !prefix.is_empty() {
        return Err(SkipReason::Malformed(format!("dangling unary `{}`", prefix)));
    }
    while let Some(entry) = pending.pop() {
        match entry {
            Pending::Op(op) => output.push(Item::Op(op)),
            Pending::LeftParen => return Err(SkipReason::Unbalanced),
        }
    }

    Ok(output)
}

/// Joins an operator character with an adjacent partner. Returns the operator
/// text and the number of tokens it spans.
fn fold_operator(tokens: &[Token], i: usize) -> (String, usize) {
    let token = &tokens[i];
    let mut chars = token.lexeme.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return (token.lexeme.clone(), 1);
    };

    if let Some(next) = tokens.get(i + 1) {
        if next.is_adjacent_to(token) && matches!(next.kind, TokenKind::Punct) {
            let doubled = DOUBLING.contains(&c) && next.lexeme.starts_with(c);
            let with_equals = WITH_EQUALS.contains(&c) && next.is("=");
            if doubled || with_equals {
                return (format!("{}{}", c, next.lexeme), 2);
            }
        }
    }

    (token.lexeme.clone(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::{HeaderScanner, ScanMode};

    fn postfix(source: &str) -> std::result::Result<Vec<Item>, SkipReason> {
        let mut scanner = HeaderScanner::new("test.h", source);
        let mut tokens = scanner.scan_tokens(ScanMode::Tokens).unwrap();
        tokens.pop(); // Eof
        to_postfix(&tokens)
    }

    fn rendered(source: &str) -> String {
        postfix(source)
            .unwrap()
            .iter()
            .map(|item| match item {
                Item::Operand(text) => text.clone(),
                Item::Str(s) => format!("{:?}", s),
                Item::Op(op) => op.symbol().to_string(),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_doubled_operators_fold() {
        assert_eq!(rendered("1 << 4"), "1 4 <<");
        assert_eq!(rendered("A || B"), "A B ||");
        assert_eq!(rendered("A <= B"), "A B <=");
    }

    #[test]
    fn test_spaced_characters_do_not_fold() {
        assert!(postfix("1 < < 4").is_err());
    }

    #[test]
    fn test_equal_precedence_is_left_associative() {
        assert_eq!(rendered("A << B | C"), "A B << C |");
        assert_eq!(rendered("8 - 2 - 1"), "8 2 - 1 -");
    }

    #[test]
    fn test_tighter_operator_pops_first() {
        // `|` (4) binds tighter than `+` (5)
        assert_eq!(rendered("1 + 2 | 4"), "1 2 4 | +");
    }

    #[test]
    fn test_parentheses_group() {
        assert_eq!(rendered("( 1 + 2 ) | 4"), "1 2 + 4 |");
    }

    #[test]
    fn test_unary_prefix_concatenates() {
        assert_eq!(rendered("-1"), "-1");
        assert_eq!(rendered("( -3.402823466e+38f )"), "-3.402823466e+38");
        assert_eq!(rendered("2 * -X"), "2 -X *");
    }

    #[test]
    fn test_literal_suffixes_are_ignored() {
        assert_eq!(rendered("0xffffffffUL"), "0xffffffff");
        assert_eq!(rendered("1.0f"), "1.0");
    }

    #[test]
    fn test_unbalanced_parenthesis() {
        assert_eq!(postfix("( 1 + 2"), Err(SkipReason::Unbalanced));
        assert_eq!(postfix("1 + 2 )"), Err(SkipReason::Unbalanced));
    }

    #[test]
    fn test_unsupported_punctuation() {
        assert!(matches!(
            postfix("A ? B : C"),
            Err(SkipReason::Unsupported { .. })
        ));
    }
}
