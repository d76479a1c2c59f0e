//! The automaton produced by the builder, and the reachability analyses the
//! generator relies on.
//!
//! States are dense indexes `0..state_count`. Transitions are kept in
//! insertion order and indexed per state in both directions, so forward
//! reachability walks `outgoing` and reverse reachability walks `incoming`
//! (the transposed view) without copying the transition table.

use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::token::{CharSet, ClassKind, Token};
use crate::utils::{RegGenError, Result};

/// Most states an automaton read from JSON may declare
pub const MAX_STATES: usize = 100_000;

/// Identifier of an automaton state
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct StateId(pub usize);

impl StateId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s{}", self.0)
    }
}

/// What a non-epsilon transition consumes
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Symbol {
    Char(char),
    Class(ClassKind),
    /// `.`: anything but a newline
    Any,
    Set(CharSet),
}

impl Symbol {
    /// The symbol consumed by an operand token, `None` for other tokens
    pub fn from_token(token: &Token) -> Option<Symbol> {
        match token {
            Token::Char(c) => Some(Symbol::Char(*c)),
            Token::Class(class) => Some(Symbol::Class(*class)),
            Token::Set(set) => Some(Symbol::Set(set.clone())),
            Token::Dot => Some(Symbol::Any),
            _ => None,
        }
    }

    pub fn matches(&self, c: char) -> bool {
        match self {
            Symbol::Char(expected) => *expected == c,
            Symbol::Class(class) => class.contains(c),
            Symbol::Any => c != '\n',
            Symbol::Set(set) => set.contains(c),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Char(c) => write!(f, "{}", c.escape_default()),
            Symbol::Class(class) => write!(f, "{}", class.as_str()),
            Symbol::Any => write!(f, "."),
            Symbol::Set(set) => write!(f, "{}", set),
        }
    }
}

/// A directed edge; a `None` label is an epsilon transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: StateId,
    pub label: Option<Symbol>,
    pub to: StateId,
}

impl Transition {
    pub fn epsilon(from: StateId, to: StateId) -> Self {
        Transition {
            from,
            label: None,
            to,
        }
    }

    pub fn symbol(from: StateId, symbol: Symbol, to: StateId) -> Self {
        Transition {
            from,
            label: Some(symbol),
            to,
        }
    }

    pub fn is_epsilon(&self) -> bool {
        self.label.is_none()
    }
}

/// Serialized form of an [`Automaton`]
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AutomatonRepr {
    states: usize,
    start: StateId,
    accepting: BTreeSet<StateId>,
    transitions: Vec<Transition>,
}

/// An immutable nondeterministic finite automaton
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AutomatonRepr", into = "AutomatonRepr")]
pub struct Automaton {
    state_count: usize,
    start: StateId,
    accepting: BTreeSet<StateId>,
    transitions: Vec<Transition>,
    /// Per state, indexes into `transitions` leaving it
    outgoing: Vec<Vec<usize>>,
    /// Per state, indexes into `transitions` entering it
    incoming: Vec<Vec<usize>>,
}

impl Automaton {
    /// Assemble an automaton, checking that every referenced state exists
    pub fn new(
        state_count: usize,
        start: StateId,
        accepting: BTreeSet<StateId>,
        transitions: Vec<Transition>,
    ) -> Result<Self> {
        let check = |state: StateId, what: &str| {
            if state.index() < state_count {
                Ok(())
            } else {
                Err(RegGenError::Build(format!(
                    "{} {} does not exist in an automaton of {} states",
                    what, state, state_count
                )))
            }
        };

        check(start, "start state")?;
        for &state in &accepting {
            check(state, "accepting state")?;
        }

        let mut outgoing = vec![Vec::new(); state_count];
        let mut incoming = vec![Vec::new(); state_count];
        for (i, transition) in transitions.iter().enumerate() {
            check(transition.from, "transition source")?;
            check(transition.to, "transition target")?;
            outgoing[transition.from.index()].push(i);
            incoming[transition.to.index()].push(i);
        }

        Ok(Automaton {
            state_count,
            start,
            accepting,
            transitions,
            outgoing,
            incoming,
        })
    }

    pub fn state_count(&self) -> usize {
        self.state_count
    }

    pub fn states(&self) -> impl Iterator<Item = StateId> {
        (0..self.state_count).map(StateId)
    }

    pub fn start(&self) -> StateId {
        self.start
    }

    pub fn accepting(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting.contains(&state)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Transitions leaving `state`, in insertion order
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.outgoing
            .get(state.index())
            .into_iter()
            .flatten()
            .map(move |&i| &self.transitions[i])
    }

    /// Indexes into [`Automaton::transitions`] of the transitions leaving
    /// `state`
    pub fn outgoing_indices(&self, state: StateId) -> &[usize] {
        self.outgoing
            .get(state.index())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Transitions entering `state`, in insertion order
    pub fn incoming(&self, state: StateId) -> impl Iterator<Item = &Transition> + '_ {
        self.incoming
            .get(state.index())
            .into_iter()
            .flatten()
            .map(move |&i| &self.transitions[i])
    }

    /// States reachable from `state` through epsilon transitions only,
    /// including `state` itself
    pub fn epsilon_closure(&self, state: StateId) -> BTreeSet<StateId> {
        self.epsilon_closure_of([state])
    }

    /// Union of the epsilon closures of `states`
    pub fn epsilon_closure_of<I>(&self, states: I) -> BTreeSet<StateId>
    where
        I: IntoIterator<Item = StateId>,
    {
        let mut closure = BTreeSet::new();
        let mut stack = Vec::new();
        for state in states {
            if closure.insert(state) {
                stack.push(state);
            }
        }

        while let Some(state) = stack.pop() {
            for transition in self.outgoing(state).filter(|t| t.is_epsilon()) {
                if closure.insert(transition.to) {
                    stack.push(transition.to);
                }
            }
        }

        closure
    }

    /// States reachable from `state` through any transitions
    pub fn accessible_from(&self, state: StateId) -> BTreeSet<StateId> {
        self.reach([state], |s| self.outgoing(s).map(|t| t.to).collect())
    }

    /// States from which some accepting state is reachable, found by walking
    /// the transposed transitions back from the accepting set
    pub fn co_accessible(&self) -> BTreeSet<StateId> {
        self.reach(self.accepting.iter().copied(), |s| {
            self.incoming(s).map(|t| t.from).collect()
        })
    }

    /// States that can never reach an accepting state
    pub fn dead_states(&self) -> BTreeSet<StateId> {
        let live = self.co_accessible();
        self.states().filter(|s| !live.contains(s)).collect()
    }

    fn reach<I, F>(&self, seeds: I, next: F) -> BTreeSet<StateId>
    where
        I: IntoIterator<Item = StateId>,
        F: Fn(StateId) -> Vec<StateId>,
    {
        let mut seen = BTreeSet::new();
        let mut stack = Vec::new();
        for seed in seeds {
            if seed.index() < self.state_count && seen.insert(seed) {
                stack.push(seed);
            }
        }

        while let Some(state) = stack.pop() {
            for target in next(state) {
                if seen.insert(target) {
                    stack.push(target);
                }
            }
        }

        seen
    }

    /// Drop every state unreachable from the start state and renumber the
    /// rest densely, preserving their relative order
    pub fn retain_accessible(self) -> Result<Self> {
        let keep = self.accessible_from(self.start);
        if keep.len() == self.state_count {
            return Ok(self);
        }

        let mut renumber: Vec<Option<StateId>> = vec![None; self.state_count];
        for (new_index, state) in keep.iter().enumerate() {
            renumber[state.index()] = Some(StateId(new_index));
        }
        let map = |state: StateId| renumber[state.index()];

        let start = map(self.start).ok_or_else(|| {
            RegGenError::Build("start state was pruned from the automaton".to_string())
        })?;
        let accepting = self.accepting.iter().filter_map(|&s| map(s)).collect();
        let transitions = self
            .transitions
            .into_iter()
            .filter_map(|t| {
                Some(Transition {
                    from: map(t.from)?,
                    label: t.label,
                    to: map(t.to)?,
                })
            })
            .collect();

        Automaton::new(keep.len(), start, accepting, transitions)
    }

    /// Check whether the automaton accepts `word` in full
    pub fn accepts(&self, word: &str) -> bool {
        let mut current = self.epsilon_closure(self.start);

        for c in word.chars() {
            let next: Vec<StateId> = current
                .iter()
                .flat_map(|&s| self.outgoing(s))
                .filter(|t| t.label.as_ref().is_some_and(|symbol| symbol.matches(c)))
                .map(|t| t.to)
                .collect();
            if next.is_empty() {
                return false;
            }
            current = self.epsilon_closure_of(next);
        }

        current.iter().any(|&s| self.is_accepting(s))
    }

    /// Serialize to pretty-printed JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse an automaton; states unreachable from the start are dropped
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read an automaton written by [`Automaton::save`]
    pub fn load(path: &Path) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(path)?)?;
        if !is_automaton(&value) {
            return Err(RegGenError::Build(format!(
                "{} does not contain an automaton",
                path.display()
            )));
        }
        Ok(serde_json::from_value(value)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

impl TryFrom<AutomatonRepr> for Automaton {
    type Error = RegGenError;

    fn try_from(repr: AutomatonRepr) -> Result<Self> {
        if repr.states > MAX_STATES {
            return Err(RegGenError::Build(format!(
                "automaton declares {} states, more than the limit of {}",
                repr.states, MAX_STATES
            )));
        }

        let declared = repr.states;
        let automaton = Automaton::new(repr.states, repr.start, repr.accepting, repr.transitions)?
            .retain_accessible()?;
        if automaton.state_count < declared {
            debug!(
                "dropped {} unreachable states from a loaded automaton",
                declared - automaton.state_count
            );
        }
        Ok(automaton)
    }
}

impl From<Automaton> for AutomatonRepr {
    fn from(automaton: Automaton) -> Self {
        AutomatonRepr {
            states: automaton.state_count,
            start: automaton.start,
            accepting: automaton.accepting,
            transitions: automaton.transitions,
        }
    }
}

impl fmt::Display for Automaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "start: {}, accepting: {:?}",
            self.start,
            self.accepting.iter().map(|s| s.index()).collect::<Vec<_>>()
        )?;
        for t in &self.transitions {
            match &t.label {
                Some(symbol) => writeln!(f, "  {} --{}--> {}", t.from, symbol, t.to)?,
                None => writeln!(f, "  {} --ε--> {}", t.from, t.to)?,
            }
        }
        Ok(())
    }
}

/// Structural check for a serialized automaton: a JSON object carrying a
/// state count, a start state, an accepting set and a transition table
pub fn is_automaton(value: &serde_json::Value) -> bool {
    let Some(object) = value.as_object() else {
        return false;
    };

    object.get("states").is_some_and(|v| v.is_u64())
        && object.get("start").is_some_and(|v| v.is_u64())
        && object.get("accepting").is_some_and(|v| v.is_array())
        && object.get("transitions").is_some_and(|v| v.is_array())
}
