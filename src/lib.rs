//! Reg-Gen generates random strings matching a regular expression.
//!
//! A pattern is tokenized, reordered into postfix form and compiled into a
//! nondeterministic automaton by Thompson construction. Words are then drawn
//! by a random walk over the automaton that only takes transitions from
//! which an accepting state is still reachable within the remaining length,
//! so every word has the requested length and belongs to the language.
//!
//! # Example
//!
//! ```rust
//! use reg_gen::{compile, generate};
//!
//! let automaton = compile("[a-c]+x").unwrap();
//!
//! // Same seed, same word
//! let word = generate(&automaton, 4, Some(42)).unwrap();
//! assert_eq!(word.text, generate(&automaton, 4, Some(42)).unwrap().text);
//!
//! assert_eq!(word.text.len(), 4);
//! assert!(word.text.ends_with('x'));
//! assert!(automaton.accepts(&word.text));
//! ```

pub mod automaton;
pub mod builder;
pub mod generator;
pub mod lexer;
pub mod postfix;
pub mod token;
pub mod utils;

use log::debug;

pub use automaton::{is_automaton, Automaton, StateId, Symbol, Transition};
pub use builder::{Builder, BuilderConfig};
pub use generator::{
    generate, GeneratedWord, Generator, GeneratorConfig, LengthPolicy, Source,
};
pub use lexer::tokenize;
pub use postfix::to_postfix;
pub use token::{CharSet, ClassKind, Repeat, Token, TokenKind};
pub use utils::{RegGenError, Result};

/// Compile a pattern into an automaton with the default builder configuration
pub fn compile(pattern: &str) -> Result<Automaton> {
    compile_with_config(pattern, BuilderConfig::default())
}

/// Compile a pattern into an automaton
pub fn compile_with_config(pattern: &str, config: BuilderConfig) -> Result<Automaton> {
    let tokens = tokenize(pattern)?;
    let postfix = to_postfix(&tokens)?;
    let automaton = Builder::with_config(config).build(&postfix)?;
    debug!(
        "compiled {:?} into {} states",
        pattern,
        automaton.state_count()
    );
    Ok(automaton)
}
