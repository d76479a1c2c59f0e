use log::trace;

use crate::token::{Category, CharSet, ClassKind, Repeat, Token};
use crate::utils::{RegGenError, Result};

/// Largest bound accepted in a `{m,n}` quantifier
pub const MAX_REPEAT: u32 = 1000;

/// Characters that may be escaped to stand for themselves
const ESCAPABLE: &[char] = &[
    '.', '*', '+', '?', '(', ')', '[', ']', '{', '}', '|', '^', '$', '/', '-',
];

/// True for characters accepted as literals and set members: ASCII word
/// characters and the space
pub fn is_literal_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == ' '
}

/// A read position over a borrowed character slice
#[derive(Debug, Clone, Copy)]
pub struct Cursor<'a> {
    chars: &'a [char],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(chars: &'a [char]) -> Self {
        Cursor { chars, pos: 0 }
    }

    /// Index of the next character to be consumed
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// The next character, without consuming it
    pub fn peek(&self) -> Option<char> {
        self.peek_nth(0)
    }

    /// The character `n` places after the next one
    pub fn peek_nth(&self, n: usize) -> Option<char> {
        self.chars.get(self.pos + n).copied()
    }

    /// The most recently consumed character
    pub fn previous(&self) -> Option<char> {
        self.pos.checked_sub(1).and_then(|i| self.chars.get(i).copied())
    }

    /// Consume and return the next character
    pub fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }
}

/// Turns a pattern into the token sequence consumed by the postfix converter
#[derive(Debug, Clone)]
pub struct Lexer {
    chars: Vec<char>,
}

impl Lexer {
    pub fn new(pattern: &str) -> Self {
        Lexer {
            chars: pattern.chars().collect(),
        }
    }

    /// Tokenize the whole pattern, inserting implicit concatenations and
    /// empty operands
    pub fn tokenize(&self) -> Result<Vec<Token>> {
        let mut cursor = Cursor::new(&self.chars);
        let mut raw = Vec::new();

        loop {
            let position = cursor.position();
            match Self::next_token(&mut cursor)? {
                Some(token) => raw.push((position, token)),
                None => break,
            }
        }

        let tokens = Self::insert_implicit(raw)?;
        trace!(
            "tokenized {} chars into {} tokens",
            self.chars.len(),
            tokens.len()
        );
        Ok(tokens)
    }

    /// Scan the next raw token; `None` at end of input. Anchors are consumed
    /// without producing a token.
    fn next_token(cursor: &mut Cursor<'_>) -> Result<Option<Token>> {
        while let Some(c) = cursor.bump() {
            let start = cursor.position() - 1;
            let token = match c {
                '(' => Self::scan_group_open(cursor)?,
                ')' => Token::GroupClose,
                '[' => Token::Set(Self::scan_set(cursor, start)?),
                '{' => Token::Repeat(Self::scan_repeat(cursor, start)?),
                '^' | '$' => continue,
                '*' => Token::Star,
                '+' => Token::Plus,
                '?' => Token::Optional,
                '|' => Token::Alternation,
                '.' => Token::Dot,
                '\\' => Self::scan_escape(cursor, start)?,
                c if is_literal_char(c) => Token::Char(c),
                c => {
                    return Err(RegGenError::lex(
                        start,
                        format!("unrecognized character '{}'", c.escape_default()),
                    ));
                }
            };
            return Ok(Some(token));
        }
        Ok(None)
    }

    /// Called after `(`; handles `(?:` and rejects lookaround
    fn scan_group_open(cursor: &mut Cursor<'_>) -> Result<Token> {
        if cursor.peek() != Some('?') {
            return Ok(Token::GroupOpen);
        }

        let position = cursor.position();
        match (cursor.peek_nth(1), cursor.peek_nth(2)) {
            (Some(':'), _) => {
                cursor.bump();
                cursor.bump();
                Ok(Token::GroupOpen)
            }
            (Some('='), _) => Err(RegGenError::unsupported(position, "lookahead (?=")),
            (Some('!'), _) => Err(RegGenError::unsupported(
                position,
                "negative lookahead (?!",
            )),
            (Some('<'), Some('=')) => Err(RegGenError::unsupported(position, "lookbehind (?<=")),
            (Some('<'), Some('!')) => Err(RegGenError::unsupported(
                position,
                "negative lookbehind (?<!",
            )),
            _ => Err(RegGenError::lex(position, "unsupported group syntax after '(?'")),
        }
    }

    /// Called after `\`
    fn scan_escape(cursor: &mut Cursor<'_>, start: usize) -> Result<Token> {
        let token = match cursor.bump() {
            Some('n') => Token::Char('\n'),
            Some('t') => Token::Char('\t'),
            Some('r') => Token::Char('\r'),
            Some('\\') => Token::Char('\\'),
            Some('d') => Token::Class(ClassKind::Digit),
            Some('D') => Token::Class(ClassKind::NotDigit),
            Some('w') => Token::Class(ClassKind::Word),
            Some('W') => Token::Class(ClassKind::NotWord),
            Some(c) if ESCAPABLE.contains(&c) => Token::Char(c),
            Some(c) => {
                return Err(RegGenError::lex(
                    start,
                    format!("unsupported escape sequence '\\{}'", c.escape_default()),
                ));
            }
            None => return Err(RegGenError::lex(start, "expected a character after '\\'")),
        };
        Ok(token)
    }

    /// Called after `[`. Members are validated one character at a time: a
    /// member may follow the opening bracket or another member, `-` may only
    /// follow a member, and the member after `-` closes a range that must not
    /// descend.
    fn scan_set(cursor: &mut Cursor<'_>, start: usize) -> Result<CharSet> {
        let mut ranges: Vec<(char, char)> = Vec::new();
        let mut last_member: Option<char> = None;
        let mut range_start: Option<char> = None;

        loop {
            let position = cursor.position();
            match cursor.bump() {
                None => return Err(RegGenError::lex(start, "unterminated character set")),
                Some(']') => {
                    if range_start.is_some() {
                        return Err(RegGenError::lex(position, "unterminated range in character set"));
                    }
                    if ranges.is_empty() {
                        return Err(RegGenError::lex(start, "empty character set"));
                    }
                    return Ok(CharSet::new(ranges));
                }
                Some('-') => match (last_member, range_start) {
                    (Some(member), None) => {
                        range_start = Some(member);
                        last_member = None;
                    }
                    _ => {
                        return Err(RegGenError::lex(
                            position,
                            "'-' must follow a member of the character set",
                        ));
                    }
                },
                Some(c) if is_literal_char(c) => {
                    if let Some(lo) = range_start.take() {
                        if c < lo {
                            return Err(RegGenError::lex(
                                position,
                                format!("descending range {}-{}", lo, c),
                            ));
                        }
                        ranges.push((lo, c));
                    } else {
                        ranges.push((c, c));
                    }
                    last_member = Some(c);
                }
                Some(c) => {
                    return Err(RegGenError::lex(
                        position,
                        format!("invalid character '{}' in character set", c.escape_default()),
                    ));
                }
            }
        }
    }

    /// Called after `{`. Digits accumulate into the current bound and `,`
    /// moves to the next one; anything else is rejected.
    fn scan_repeat(cursor: &mut Cursor<'_>, start: usize) -> Result<Repeat> {
        let mut bounds: Vec<Option<u32>> = vec![None];

        loop {
            let position = cursor.position();
            match cursor.bump() {
                None => return Err(RegGenError::lex(start, "unterminated repetition")),
                Some('}') => break,
                Some(',') => {
                    if bounds.len() == 2 {
                        return Err(RegGenError::lex(position, "too many bounds in repetition"));
                    }
                    bounds.push(None);
                }
                Some(c) => {
                    let digit = c.to_digit(10).ok_or_else(|| {
                        RegGenError::lex(
                            position,
                            format!("invalid character '{}' in repetition", c.escape_default()),
                        )
                    })?;
                    let slot = bounds.last_mut().ok_or_else(|| {
                        RegGenError::lex(position, "repetition has no bound slot")
                    })?;
                    let value = slot.unwrap_or(0) * 10 + digit;
                    if value > MAX_REPEAT {
                        return Err(RegGenError::lex(
                            start,
                            format!("repetition bound exceeds {}", MAX_REPEAT),
                        ));
                    }
                    *slot = Some(value);
                }
            }
        }

        let repeat = match bounds.as_slice() {
            [Some(n)] => Repeat {
                min: *n,
                max: Some(*n),
            },
            [Some(min), None] => Repeat {
                min: *min,
                max: None,
            },
            [min, Some(max)] => Repeat {
                min: min.unwrap_or(0),
                max: Some(*max),
            },
            _ => return Err(RegGenError::lex(start, "repetition requires a bound")),
        };

        if let Some(max) = repeat.max {
            if repeat.min > max {
                return Err(RegGenError::lex(
                    start,
                    format!("repetition minimum {} exceeds maximum {}", repeat.min, max),
                ));
            }
        }
        Ok(repeat)
    }

    /// Make every juxtaposition explicit and fill missing operands.
    ///
    /// A concatenation goes between a token that ends an operand (operand,
    /// group-close, postfix operator) and one that starts an operand (operand,
    /// group-open). Where an operand is expected but a binary operator,
    /// group-close or the end of input follows, an `Empty` operand is
    /// inserted.
    fn insert_implicit(raw: Vec<(usize, Token)>) -> Result<Vec<Token>> {
        let mut tokens = Vec::with_capacity(raw.len() * 2);
        let mut expects_operand = true;

        for (position, token) in raw {
            let category = token.category();
            match category {
                Category::Operand | Category::GroupOpen => {
                    if !expects_operand {
                        tokens.push(Token::Concatenation);
                    }
                }
                Category::BinaryOperator | Category::GroupClose => {
                    if expects_operand {
                        tokens.push(Token::Empty);
                    }
                }
                Category::PostfixOperator => {
                    if expects_operand {
                        return Err(RegGenError::lex(
                            position,
                            format!("nothing to repeat before {}", token),
                        ));
                    }
                }
            }
            expects_operand = matches!(
                category,
                Category::BinaryOperator | Category::GroupOpen
            );
            tokens.push(token);
        }

        if expects_operand {
            tokens.push(Token::Empty);
        }
        Ok(tokens)
    }
}

/// Tokenize a pattern
pub fn tokenize(pattern: &str) -> Result<Vec<Token>> {
    Lexer::new(pattern).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lex_position(pattern: &str) -> usize {
        match tokenize(pattern) {
            Err(RegGenError::Lex { position, .. }) => position,
            other => panic!("Expected Lex error for {:?}, got {:?}", pattern, other),
        }
    }

    #[test]
    fn test_cursor() {
        let chars: Vec<char> = "ab".chars().collect();
        let mut cursor = Cursor::new(&chars);
        assert_eq!(cursor.previous(), None);
        assert_eq!(cursor.peek(), Some('a'));
        assert_eq!(cursor.peek_nth(1), Some('b'));
        assert_eq!(cursor.bump(), Some('a'));
        assert_eq!(cursor.previous(), Some('a'));
        assert_eq!(cursor.bump(), Some('b'));
        assert!(cursor.is_eof());
        assert_eq!(cursor.bump(), None);
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn test_implicit_concatenation() {
        assert_eq!(
            tokenize("ab").unwrap(),
            vec![Token::Char('a'), Token::Concatenation, Token::Char('b')]
        );
        assert_eq!(
            tokenize("a*b").unwrap(),
            vec![
                Token::Char('a'),
                Token::Star,
                Token::Concatenation,
                Token::Char('b')
            ]
        );
        assert_eq!(
            tokenize("(a)(b)").unwrap(),
            vec![
                Token::GroupOpen,
                Token::Char('a'),
                Token::GroupClose,
                Token::Concatenation,
                Token::GroupOpen,
                Token::Char('b'),
                Token::GroupClose,
            ]
        );
        assert_eq!(
            tokenize("a|(b)").unwrap(),
            vec![
                Token::Char('a'),
                Token::Alternation,
                Token::GroupOpen,
                Token::Char('b'),
                Token::GroupClose,
            ]
        );
    }

    #[test]
    fn test_empty_operands() {
        assert_eq!(tokenize("").unwrap(), vec![Token::Empty]);
        assert_eq!(
            tokenize("a|").unwrap(),
            vec![Token::Char('a'), Token::Alternation, Token::Empty]
        );
        assert_eq!(
            tokenize("()").unwrap(),
            vec![Token::GroupOpen, Token::Empty, Token::GroupClose]
        );
    }

    #[test]
    fn test_escapes_and_classes() {
        assert_eq!(
            tokenize(r"\d\n\.").unwrap(),
            vec![
                Token::Class(ClassKind::Digit),
                Token::Concatenation,
                Token::Char('\n'),
                Token::Concatenation,
                Token::Char('.'),
            ]
        );
        assert_eq!(tokenize(r"\W").unwrap(), vec![Token::Class(ClassKind::NotWord)]);
        assert_eq!(lex_position(r"a\q"), 1);
        assert_eq!(lex_position("a\\"), 1);
    }

    #[test]
    fn test_non_capturing_group_and_anchors() {
        assert_eq!(
            tokenize("^(?:a)$").unwrap(),
            vec![Token::GroupOpen, Token::Char('a'), Token::GroupClose]
        );
    }

    #[test]
    fn test_lookaround_is_unsupported() {
        for pattern in ["a(?=b)", "a(?!b)", "(?<=a)b", "(?<!a)b"] {
            match tokenize(pattern) {
                Err(RegGenError::UnsupportedFeature { .. }) => {}
                other => panic!("Expected UnsupportedFeature for {}, got {:?}", pattern, other),
            }
        }
        assert_eq!(lex_position("(?x)"), 1);
    }

    #[test]
    fn test_character_sets() {
        assert_eq!(
            tokenize("[a-cx_]").unwrap(),
            vec![Token::Set(CharSet::new(vec![('a', 'c'), ('x', 'x'), ('_', '_')]))]
        );
        assert_eq!(
            tokenize("[a-c-e]").unwrap(),
            vec![Token::Set(CharSet::new(vec![('a', 'e')]))]
        );
        assert_eq!(lex_position("[z-a]"), 3);
        assert_eq!(lex_position("[-a]"), 1);
        assert_eq!(lex_position("[a--b]"), 3);
        assert_eq!(lex_position("[a-]"), 3);
        assert_eq!(lex_position("[]"), 0);
        assert_eq!(lex_position("[ab"), 0);
        assert_eq!(lex_position("[a.]"), 2);
    }

    #[test]
    fn test_bounded_repeat() {
        let repeat = |pattern: &str| match tokenize(pattern).unwrap().pop() {
            Some(Token::Repeat(repeat)) => repeat,
            other => panic!("Expected repeat, got {:?}", other),
        };
        assert_eq!(repeat("a{3}"), Repeat { min: 3, max: Some(3) });
        assert_eq!(repeat("a{2,}"), Repeat { min: 2, max: None });
        assert_eq!(repeat("a{2,5}"), Repeat { min: 2, max: Some(5) });
        assert_eq!(repeat("a{,4}"), Repeat { min: 0, max: Some(4) });
    }

    #[test]
    fn test_invalid_bounded_repeat_is_a_lex_error() {
        assert_eq!(lex_position("a{1,e}"), 4);
        assert_eq!(lex_position("a{1,2,3}"), 5);
        assert_eq!(lex_position("a{}"), 1);
        assert_eq!(lex_position("a{,}"), 1);
        assert_eq!(lex_position("a{5,2}"), 1);
        assert_eq!(lex_position("a{2"), 1);
        assert_eq!(lex_position("a{1001}"), 1);
    }

    #[test]
    fn test_nothing_to_repeat() {
        assert_eq!(lex_position("*a"), 0);
        assert_eq!(lex_position("a|+"), 2);
        assert_eq!(lex_position("({2})"), 1);
    }

    #[test]
    fn test_unrecognized_character() {
        assert_eq!(lex_position("a@b"), 1);
        assert_eq!(lex_position("a]"), 1);
    }
}
