//! Token model shared by the lexer, the postfix converter and the builder.
//!
//! A [`Token`] is a closed sum type: the payload shape is fixed by the
//! variant. Everything the postfix converter needs to know about a token
//! (its category, precedence and associativity) is derived from its
//! [`TokenKind`] through pure lookup functions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shorthand character classes (`\d \D \w \W`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassKind {
    Digit,
    NotDigit,
    Word,
    NotWord,
}

impl ClassKind {
    /// Check whether `c` belongs to the class
    pub fn contains(self, c: char) -> bool {
        match self {
            ClassKind::Digit => c.is_ascii_digit(),
            ClassKind::NotDigit => !c.is_ascii_digit(),
            ClassKind::Word => is_word_char(c),
            ClassKind::NotWord => !is_word_char(c),
        }
    }

    /// The escape sequence naming this class
    pub fn as_str(self) -> &'static str {
        match self {
            ClassKind::Digit => r"\d",
            ClassKind::NotDigit => r"\D",
            ClassKind::Word => r"\w",
            ClassKind::NotWord => r"\W",
        }
    }
}

/// ASCII word characters, as matched by `\w`
pub fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// An ordered set of inclusive character ranges
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<(char, char)>", into = "Vec<(char, char)>")]
pub struct CharSet {
    ranges: Vec<(char, char)>,
}

impl CharSet {
    /// Build a set from arbitrary ranges; ranges are sorted and merged
    pub fn new(mut ranges: Vec<(char, char)>) -> Self {
        ranges.retain(|&(lo, hi)| lo <= hi);
        ranges.sort_unstable();

        let mut merged: Vec<(char, char)> = Vec::with_capacity(ranges.len());
        for (lo, hi) in ranges {
            match merged.last_mut() {
                Some(last) if (lo as u32) <= (last.1 as u32).saturating_add(1) => {
                    if hi > last.1 {
                        last.1 = hi;
                    }
                }
                _ => merged.push((lo, hi)),
            }
        }

        CharSet { ranges: merged }
    }

    pub fn ranges(&self) -> &[(char, char)] {
        &self.ranges
    }

    pub fn contains(&self, c: char) -> bool {
        self.ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi)
    }

    /// Number of characters in the set
    pub fn len(&self) -> usize {
        self.ranges
            .iter()
            .map(|&(lo, hi)| (hi as usize) - (lo as usize) + 1)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The `index`-th character of the set in ascending order.
    ///
    /// Ranges never straddle the surrogate gap because they come from ASCII
    /// set members, so `char::from_u32` only fails for out-of-range indexes.
    pub fn nth(&self, mut index: usize) -> Option<char> {
        for &(lo, hi) in &self.ranges {
            let width = (hi as usize) - (lo as usize) + 1;
            if index < width {
                return char::from_u32(lo as u32 + index as u32);
            }
            index -= width;
        }
        None
    }
}

impl From<Vec<(char, char)>> for CharSet {
    fn from(ranges: Vec<(char, char)>) -> Self {
        CharSet::new(ranges)
    }
}

impl From<CharSet> for Vec<(char, char)> {
    fn from(set: CharSet) -> Self {
        set.ranges
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for &(lo, hi) in &self.ranges {
            if lo == hi {
                write!(f, "{}", lo)?;
            } else {
                write!(f, "{}-{}", lo, hi)?;
            }
        }
        write!(f, "]")
    }
}

/// Bounds of a `{m}`, `{m,}` or `{m,n}` quantifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Repeat {
    pub min: u32,
    /// `None` means unbounded
    pub max: Option<u32>,
}

impl fmt::Display for Repeat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{{{}}}", self.min),
            Some(max) => write!(f, "{{{},{}}}", self.min, max),
            None => write!(f, "{{{},}}", self.min),
        }
    }
}

/// A lexical token of a pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A literal character
    Char(char),
    /// A shorthand class such as `\d`
    Class(ClassKind),
    /// A bracketed character set such as `[a-z_]`
    Set(CharSet),
    /// `.`
    Dot,
    /// `|`
    Alternation,
    /// Implicit juxtaposition, inserted by the lexer
    Concatenation,
    GroupOpen,
    GroupClose,
    Star,
    Plus,
    Optional,
    Repeat(Repeat),
    /// Sentinel closing the implicit outermost group
    End,
    /// An empty operand, matching the empty string
    Empty,
}

/// Payload-free mirror of [`Token`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Char,
    Class,
    Set,
    Dot,
    Alternation,
    Concatenation,
    GroupOpen,
    GroupClose,
    Star,
    Plus,
    Optional,
    Repeat,
    End,
    Empty,
}

/// The syntactic role of a token kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Operand,
    BinaryOperator,
    PostfixOperator,
    GroupOpen,
    GroupClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

impl TokenKind {
    pub fn category(self) -> Category {
        match self {
            TokenKind::Char
            | TokenKind::Class
            | TokenKind::Set
            | TokenKind::Dot
            | TokenKind::Empty => Category::Operand,
            TokenKind::Alternation | TokenKind::Concatenation => Category::BinaryOperator,
            TokenKind::Star | TokenKind::Plus | TokenKind::Optional | TokenKind::Repeat => {
                Category::PostfixOperator
            }
            TokenKind::GroupOpen => Category::GroupOpen,
            TokenKind::GroupClose | TokenKind::End => Category::GroupClose,
        }
    }

    /// Binding strength; operands bind tightest of all
    pub fn precedence(self) -> u8 {
        match self.category() {
            Category::BinaryOperator if self == TokenKind::Alternation => 1,
            Category::BinaryOperator => 2,
            Category::PostfixOperator => 3,
            Category::GroupOpen | Category::GroupClose => 4,
            Category::Operand => 5,
        }
    }

    pub fn associativity(self) -> Associativity {
        match self.category() {
            Category::PostfixOperator => Associativity::Right,
            _ => Associativity::Left,
        }
    }
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Char(_) => TokenKind::Char,
            Token::Class(_) => TokenKind::Class,
            Token::Set(_) => TokenKind::Set,
            Token::Dot => TokenKind::Dot,
            Token::Alternation => TokenKind::Alternation,
            Token::Concatenation => TokenKind::Concatenation,
            Token::GroupOpen => TokenKind::GroupOpen,
            Token::GroupClose => TokenKind::GroupClose,
            Token::Star => TokenKind::Star,
            Token::Plus => TokenKind::Plus,
            Token::Optional => TokenKind::Optional,
            Token::Repeat(_) => TokenKind::Repeat,
            Token::End => TokenKind::End,
            Token::Empty => TokenKind::Empty,
        }
    }

    pub fn category(&self) -> Category {
        self.kind().category()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Char(c) => write!(f, "char:{}", c.escape_default()),
            Token::Class(class) => write!(f, "class:{}", class.as_str()),
            Token::Set(set) => write!(f, "set:{}", set),
            Token::Dot => write!(f, "dot"),
            Token::Alternation => write!(f, "or"),
            Token::Concatenation => write!(f, "concat"),
            Token::GroupOpen => write!(f, "("),
            Token::GroupClose => write!(f, ")"),
            Token::Star => write!(f, "star"),
            Token::Plus => write!(f, "plus"),
            Token::Optional => write!(f, "optional"),
            Token::Repeat(repeat) => write!(f, "repeat{}", repeat),
            Token::End => write!(f, "end"),
            Token::Empty => write!(f, "empty"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_order() {
        assert!(TokenKind::Alternation.precedence() < TokenKind::Concatenation.precedence());
        assert!(TokenKind::Concatenation.precedence() < TokenKind::Star.precedence());
        assert!(TokenKind::Star.precedence() < TokenKind::GroupOpen.precedence());
        assert_eq!(TokenKind::Repeat.precedence(), TokenKind::Optional.precedence());
    }

    #[test]
    fn test_categories() {
        assert_eq!(TokenKind::Empty.category(), Category::Operand);
        assert_eq!(TokenKind::End.category(), Category::GroupClose);
        assert_eq!(TokenKind::Plus.category(), Category::PostfixOperator);
        assert_eq!(TokenKind::Alternation.associativity(), Associativity::Left);
        assert_eq!(TokenKind::Star.associativity(), Associativity::Right);
    }

    #[test]
    fn test_charset_normalization() {
        let set = CharSet::new(vec![('x', 'z'), ('a', 'c'), ('b', 'd'), ('e', 'e')]);
        assert_eq!(set.ranges(), &[('a', 'e'), ('x', 'z')]);
        assert_eq!(set.len(), 8);
        assert_eq!(set.nth(0), Some('a'));
        assert_eq!(set.nth(5), Some('x'));
        assert_eq!(set.nth(8), None);
        assert!(set.contains('y'));
        assert!(!set.contains('f'));
    }

    #[test]
    fn test_display() {
        let tokens = vec![
            Token::Char('a'),
            Token::Concatenation,
            Token::Class(ClassKind::Digit),
            Token::Repeat(Repeat { min: 2, max: None }),
        ];
        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(rendered, vec!["char:a", "concat", r"class:\d", "repeat{2,}"]);
    }
}
