use std::collections::BTreeSet;
use std::ops::Range;

use log::debug;

use crate::automaton::{Automaton, MAX_STATES, StateId, Symbol, Transition};
use crate::token::{Repeat, Token};
use crate::utils::{OptionExt, RegGenError, Result};

/// Configuration options for automaton construction
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// Maximum number of states before the pattern is rejected as too complex
    pub max_states: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        BuilderConfig {
            max_states: MAX_STATES,
        }
    }
}

/// Entry and exit state of a partially built sub-automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fragment {
    start: StateId,
    accept: StateId,
}

/// A fragment on the operand stack, with the postfix tokens it was built from
#[derive(Debug)]
struct Entry {
    fragment: Fragment,
    span: Range<usize>,
}

/// Thompson construction over a postfix token sequence.
///
/// A builder is consumed by [`Builder::build`]; the states and transitions it
/// accumulates are never visible until the finished automaton is returned.
#[derive(Debug, Default)]
pub struct Builder {
    config: BuilderConfig,
    state_count: usize,
    transitions: Vec<Transition>,
}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Builder {
            config,
            ..Builder::default()
        }
    }

    /// Build the automaton for a postfix sequence. States unreachable from
    /// the start (left behind by `{0}` repeats) are pruned.
    pub fn build(mut self, postfix: &[Token]) -> Result<Automaton> {
        let fragment = self.evaluate(postfix)?;
        let built = self.state_count;

        let automaton = Automaton::new(
            self.state_count,
            fragment.start,
            BTreeSet::from([fragment.accept]),
            self.transitions,
        )?
        .retain_accessible()?;

        debug!(
            "built automaton: {} states ({} before pruning), {} transitions",
            automaton.state_count(),
            built,
            automaton.transitions().len()
        );
        Ok(automaton)
    }

    /// Evaluate a postfix sequence on a fresh operand stack
    fn evaluate(&mut self, postfix: &[Token]) -> Result<Fragment> {
        let mut stack: Vec<Entry> = Vec::new();

        for (i, token) in postfix.iter().enumerate() {
            let entry = match token {
                Token::Concatenation => {
                    let (a, b) = Self::pop_pair(&mut stack, token)?;
                    Entry {
                        fragment: self.concatenate(a.fragment, b.fragment),
                        span: a.span.start..i + 1,
                    }
                }
                Token::Alternation => {
                    let (a, b) = Self::pop_pair(&mut stack, token)?;
                    Entry {
                        fragment: self.alternate(a.fragment, b.fragment)?,
                        span: a.span.start..i + 1,
                    }
                }
                Token::Star => {
                    let a = Self::pop(&mut stack, token)?;
                    Entry {
                        fragment: self.star(a.fragment)?,
                        span: a.span.start..i + 1,
                    }
                }
                Token::Plus => {
                    let a = Self::pop(&mut stack, token)?;
                    Entry {
                        fragment: self.plus(a.fragment)?,
                        span: a.span.start..i + 1,
                    }
                }
                Token::Optional => {
                    let a = Self::pop(&mut stack, token)?;
                    Entry {
                        fragment: self.optional(a.fragment)?,
                        span: a.span.start..i + 1,
                    }
                }
                Token::Repeat(repeat) => {
                    let a = Self::pop(&mut stack, token)?;
                    let operand = &postfix[a.span.clone()];
                    Entry {
                        fragment: self.repeat(a.fragment, operand, *repeat)?,
                        span: a.span.start..i + 1,
                    }
                }
                Token::Empty => Entry {
                    fragment: self.empty()?,
                    span: i..i + 1,
                },
                Token::GroupOpen | Token::GroupClose | Token::End => {
                    return Err(RegGenError::Build(format!(
                        "unexpected {} in postfix sequence",
                        token
                    )));
                }
                Token::Char(_) | Token::Class(_) | Token::Set(_) | Token::Dot => {
                    let symbol = Symbol::from_token(token)
                        .ok_or_build_err(|| format!("{} is not an operand", token))?;
                    Entry {
                        fragment: self.symbol(symbol)?,
                        span: i..i + 1,
                    }
                }
            };
            stack.push(entry);
        }

        let top = stack
            .pop()
            .ok_or_build_err(|| "empty postfix sequence".to_string())?;
        if !stack.is_empty() {
            return Err(RegGenError::Build(format!(
                "{} fragments left unconnected",
                stack.len()
            )));
        }
        Ok(top.fragment)
    }

    fn pop(stack: &mut Vec<Entry>, token: &Token) -> Result<Entry> {
        stack
            .pop()
            .ok_or_build_err(|| format!("operand stack underflow at {}", token))
    }

    /// Pop the two topmost fragments as `(a, b)`, `b` having been pushed last
    fn pop_pair(stack: &mut Vec<Entry>, token: &Token) -> Result<(Entry, Entry)> {
        let b = Self::pop(stack, token)?;
        let a = Self::pop(stack, token)?;
        Ok((a, b))
    }

    fn new_state(&mut self) -> Result<StateId> {
        if self.state_count >= self.config.max_states {
            return Err(RegGenError::TooComplex(self.config.max_states));
        }
        let id = StateId(self.state_count);
        self.state_count += 1;
        Ok(id)
    }

    fn epsilon(&mut self, from: StateId, to: StateId) {
        self.transitions.push(Transition::epsilon(from, to));
    }

    fn symbol(&mut self, symbol: Symbol) -> Result<Fragment> {
        let start = self.new_state()?;
        let accept = self.new_state()?;
        self.transitions
            .push(Transition::symbol(start, symbol, accept));
        Ok(Fragment { start, accept })
    }

    fn empty(&mut self) -> Result<Fragment> {
        let start = self.new_state()?;
        let accept = self.new_state()?;
        self.epsilon(start, accept);
        Ok(Fragment { start, accept })
    }

    fn concatenate(&mut self, a: Fragment, b: Fragment) -> Fragment {
        self.epsilon(a.accept, b.start);
        Fragment {
            start: a.start,
            accept: b.accept,
        }
    }

    fn alternate(&mut self, a: Fragment, b: Fragment) -> Result<Fragment> {
        let start = self.new_state()?;
        let accept = self.new_state()?;
        self.epsilon(start, a.start);
        self.epsilon(start, b.start);
        self.epsilon(a.accept, accept);
        self.epsilon(b.accept, accept);
        Ok(Fragment { start, accept })
    }

    /// Shared shape of `*`, `+` and `?`
    fn loop_fragment(&mut self, a: Fragment, loop_back: bool, bypass: bool) -> Result<Fragment> {
        let start = self.new_state()?;
        let accept = self.new_state()?;
        self.epsilon(start, a.start);
        if loop_back {
            self.epsilon(a.accept, a.start);
        }
        if bypass {
            self.epsilon(start, accept);
        }
        self.epsilon(a.accept, accept);
        Ok(Fragment { start, accept })
    }

    fn star(&mut self, a: Fragment) -> Result<Fragment> {
        self.loop_fragment(a, true, true)
    }

    fn plus(&mut self, a: Fragment) -> Result<Fragment> {
        self.loop_fragment(a, true, false)
    }

    fn optional(&mut self, a: Fragment) -> Result<Fragment> {
        self.loop_fragment(a, false, true)
    }

    /// Expand `{min,max}` into `min` mandatory copies followed by either
    /// `max - min` optional copies or, when unbounded, one starred copy.
    /// `first` is the already built operand and serves as the first copy;
    /// further copies are built by evaluating `operand` again.
    fn repeat(&mut self, first: Fragment, operand: &[Token], repeat: Repeat) -> Result<Fragment> {
        let mandatory = repeat.min as usize;
        let tail = match repeat.max {
            Some(max) => max.saturating_sub(repeat.min) as usize,
            None => 1,
        };
        let copies = mandatory + tail;
        if copies == 0 {
            return self.empty();
        }

        let mut result: Option<Fragment> = None;
        for k in 0..copies {
            let copy = if k == 0 {
                first
            } else {
                self.evaluate(operand)?
            };
            let piece = if k < mandatory {
                copy
            } else if repeat.max.is_none() {
                self.star(copy)?
            } else {
                self.optional(copy)?
            };
            result = Some(match result {
                Some(acc) => self.concatenate(acc, piece),
                None => piece,
            });
        }

        result.ok_or_build_err(|| format!("repetition {} produced no fragment", repeat))
    }
}

/// Build an automaton from postfix tokens with the default configuration
pub fn build(postfix: &[Token]) -> Result<Automaton> {
    Builder::new().build(postfix)
}
