use std::iter;

use log::trace;

use crate::token::{Associativity, Category, Token};
use crate::utils::{RegGenError, Result};

const MISMATCHED: &str = "mismatched parenthesis";

/// Reorder an infix token sequence into postfix order.
///
/// Operands and postfix operators go straight to the output, since a postfix
/// operator applies to whatever the output already ends with. Binary
/// operators first pop the stacked operators that bind at least as tightly
/// (strictly tighter for right-associative ones). An `End` sentinel is
/// appended to the input and flushes the stack like a closing parenthesis
/// for the outermost group.
pub fn to_postfix(tokens: &[Token]) -> Result<Vec<Token>> {
    let mut output: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut operators: Vec<Token> = Vec::new();

    for token in tokens.iter().cloned().chain(iter::once(Token::End)) {
        match token.category() {
            Category::Operand | Category::PostfixOperator => output.push(token),
            Category::BinaryOperator => {
                let kind = token.kind();
                while let Some(top) = operators.last() {
                    if top.category() == Category::GroupOpen {
                        break;
                    }
                    let top_precedence = top.kind().precedence();
                    let pops = match kind.associativity() {
                        Associativity::Left => top_precedence >= kind.precedence(),
                        Associativity::Right => top_precedence > kind.precedence(),
                    };
                    if !pops {
                        break;
                    }
                    if let Some(op) = operators.pop() {
                        output.push(op);
                    }
                }
                operators.push(token);
            }
            Category::GroupOpen => operators.push(token),
            Category::GroupClose => {
                let closes_input = token == Token::End;
                loop {
                    match operators.pop() {
                        Some(op) if op.category() == Category::GroupOpen => {
                            if closes_input {
                                return Err(RegGenError::Parse(MISMATCHED.to_string()));
                            }
                            break;
                        }
                        Some(op) => output.push(op),
                        None if closes_input => break,
                        None => return Err(RegGenError::Parse(MISMATCHED.to_string())),
                    }
                }
            }
        }
    }

    trace!(
        "postfix: {}",
        output
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use crate::token::Repeat;
    use pretty_assertions::assert_eq;

    fn postfix(pattern: &str) -> Vec<String> {
        let tokens = tokenize(pattern).unwrap();
        to_postfix(&tokens)
            .unwrap()
            .iter()
            .map(|t| t.to_string())
            .collect()
    }

    #[test]
    fn test_concatenation() {
        assert_eq!(postfix("ab"), vec!["char:a", "char:b", "concat"]);
        assert_eq!(
            postfix("abc"),
            vec!["char:a", "char:b", "concat", "char:c", "concat"]
        );
    }

    #[test]
    fn test_alternation() {
        assert_eq!(postfix("a|b"), vec!["char:a", "char:b", "or"]);
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            postfix("a|bc*"),
            vec!["char:a", "char:b", "char:c", "star", "concat", "or"]
        );
        assert_eq!(
            postfix("(a|b)c"),
            vec!["char:a", "char:b", "or", "char:c", "concat"]
        );
        assert_eq!(
            postfix("ab+|c?"),
            vec!["char:a", "char:b", "plus", "concat", "char:c", "optional", "or"]
        );
    }

    #[test]
    fn test_repeat_follows_its_operand() {
        let tokens = tokenize("(ab){2,3}").unwrap();
        assert_eq!(
            to_postfix(&tokens).unwrap(),
            vec![
                Token::Char('a'),
                Token::Char('b'),
                Token::Concatenation,
                Token::Repeat(Repeat {
                    min: 2,
                    max: Some(3)
                }),
            ]
        );
    }

    #[test]
    fn test_mismatched_parenthesis() {
        for pattern in ["(a", "a)", "((a)", "a)(b"] {
            let tokens = tokenize(pattern).unwrap();
            match to_postfix(&tokens) {
                Err(RegGenError::Parse(msg)) => assert_eq!(msg, "mismatched parenthesis"),
                other => panic!("Expected Parse error for {}, got {:?}", pattern, other),
            }
        }
    }
}
