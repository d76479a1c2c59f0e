//! Random word generation over a compiled automaton.
//!
//! Generation first tabulates, for every remaining budget `k` up to the
//! target length, which states can still reach an accepting state by
//! consuming exactly `k` symbols. The walk then only ever takes a symbol
//! transition whose target is viable for the budget left after it, so it
//! finishes in exactly `length` steps and never needs to backtrack.
//!
//! Row `k` of the table is derived from row `k - 1` by marking the source of
//! every symbol transition into it and spreading those marks back over
//! epsilon transitions, so each row costs `O(states + transitions)`. Rows are
//! bitsets, tabulation stops at the first empty row, and the table is capped
//! at [`GeneratorConfig::max_table_cells`].

use std::borrow::Cow;

use log::{debug, trace};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::automaton::{Automaton, StateId, Symbol, Transition};
use crate::utils::{RegGenError, Result};

/// Characters sampled for `.` and the shorthand classes: printable ASCII
pub const SAMPLE_RANGE: (char, char) = (' ', '~');

/// What to do when no word of exactly the requested length exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Fail with a generation error
    #[default]
    Exact,
    /// Use the feasible length nearest to the request, preferring the
    /// shorter one on ties
    Closest,
}

/// Configuration options for word generation
#[derive(Debug, Clone)]
pub struct GeneratorConfig {
    pub length_policy: LengthPolicy,
    /// Longest word that may be requested
    pub max_length: usize,
    /// Upper bound on rows × states of the viability table of one call
    pub max_table_cells: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            length_policy: LengthPolicy::Exact,
            max_length: 100_000,
            max_table_cells: 1 << 30,
        }
    }
}

/// Input to generation: a pattern still to be compiled, or a built automaton
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    Pattern(&'a str),
    Automaton(&'a Automaton),
}

impl<'a> Source<'a> {
    pub fn is_automaton(&self) -> bool {
        matches!(self, Source::Automaton(_))
    }

    /// Compile the pattern if needed
    pub fn resolve(self) -> Result<Cow<'a, Automaton>> {
        match self {
            Source::Pattern(pattern) => crate::compile(pattern).map(Cow::Owned),
            Source::Automaton(automaton) => Ok(Cow::Borrowed(automaton)),
        }
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(pattern: &'a str) -> Self {
        Source::Pattern(pattern)
    }
}

impl<'a> From<&'a String> for Source<'a> {
    fn from(pattern: &'a String) -> Self {
        Source::Pattern(pattern.as_str())
    }
}

impl<'a> From<&'a Automaton> for Source<'a> {
    fn from(automaton: &'a Automaton) -> Self {
        Source::Automaton(automaton)
    }
}

/// The result of one generation call
#[derive(Debug, Clone)]
pub struct GeneratedWord<'a> {
    pub automaton: Cow<'a, Automaton>,
    /// The length that was asked for; `text` may differ under
    /// [`LengthPolicy::Closest`]
    pub requested_length: usize,
    /// `None` when the word came from an unseeded generator
    pub seed: Option<u64>,
    pub text: String,
}

/// One row of the viability table, a bit per state
#[derive(Debug, Clone, PartialEq, Eq)]
struct StateSet {
    words: Vec<u64>,
}

impl StateSet {
    fn new(state_count: usize) -> Self {
        StateSet {
            words: vec![0; state_count.div_ceil(64)],
        }
    }

    fn contains(&self, state: usize) -> bool {
        self.words[state / 64] & (1 << (state % 64)) != 0
    }

    /// Returns `true` if `state` was not yet in the set
    fn insert(&mut self, state: usize) -> bool {
        let word = &mut self.words[state / 64];
        let bit = 1 << (state % 64);
        let added = *word & bit == 0;
        *word |= bit;
        added
    }

    fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }
}

/// Samples words from an automaton
#[derive(Debug, Clone)]
pub struct Generator<'a> {
    automaton: Cow<'a, Automaton>,
    config: GeneratorConfig,
    /// States whose epsilon closure holds an accepting state
    accepts_now: StateSet,
    /// Indexes of the symbol transitions that have something to sample
    symbol_edges: Vec<usize>,
}

impl<'a> Generator<'a> {
    pub fn new(source: impl Into<Source<'a>>) -> Result<Self> {
        Self::with_config(source, GeneratorConfig::default())
    }

    pub fn with_config(source: impl Into<Source<'a>>, config: GeneratorConfig) -> Result<Self> {
        let automaton = source.into().resolve()?;

        let symbol_edges = automaton
            .transitions()
            .iter()
            .enumerate()
            .filter(|(_, t)| t.label.as_ref().is_some_and(can_sample))
            .map(|(i, _)| i)
            .collect();

        let mut accepts_now = StateSet::new(automaton.state_count());
        let seeds: Vec<usize> = automaton
            .accepting()
            .iter()
            .map(|s| s.index())
            .filter(|&s| accepts_now.insert(s))
            .collect();
        spread_back(&automaton, &mut accepts_now, seeds);

        Ok(Generator {
            automaton,
            config,
            accepts_now,
            symbol_edges,
        })
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generate a word of `length` symbols; a seed makes the result
    /// reproducible
    pub fn generate(&self, length: usize, seed: Option<u64>) -> Result<GeneratedWord<'_>> {
        let text = self.sample(length, seed)?;
        Ok(GeneratedWord {
            automaton: Cow::Borrowed(&*self.automaton),
            requested_length: length,
            seed,
            text,
        })
    }

    /// Like [`Generator::generate`], handing over the automaton to the word
    pub fn into_word(self, length: usize, seed: Option<u64>) -> Result<GeneratedWord<'a>> {
        let text = self.sample(length, seed)?;
        Ok(GeneratedWord {
            automaton: self.automaton,
            requested_length: length,
            seed,
            text,
        })
    }

    fn sample(&self, length: usize, seed: Option<u64>) -> Result<String> {
        if length > self.config.max_length {
            return Err(RegGenError::Generation(format!(
                "requested length {} exceeds the maximum of {}",
                length, self.config.max_length
            )));
        }

        let horizon = match self.config.length_policy {
            LengthPolicy::Exact => length,
            LengthPolicy::Closest => length + self.automaton.state_count(),
        };
        let viable = self.viability(horizon)?;
        let start = self.automaton.start().index();
        let is_viable =
            |k: usize, state: usize| viable.get(k).is_some_and(|row| row.contains(state));

        let target = self
            .pick_length(length, horizon, |k| is_viable(k, start))
            .ok_or_else(|| {
                RegGenError::Generation(format!(
                    "no accepting path within length bound (requested {})",
                    length
                ))
            })?;
        debug!(
            "generating a word of length {} (requested {}, seed {:?})",
            target, length, seed
        );

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut state = start;
        let mut text = String::with_capacity(target);
        for remaining in (1..=target).rev() {
            let closure = self.automaton.epsilon_closure(StateId(state));
            let candidates: Vec<&Transition> = closure
                .iter()
                .flat_map(|&s| self.automaton.outgoing(s))
                .filter(|t| t.label.as_ref().is_some_and(can_sample))
                .filter(|t| is_viable(remaining - 1, t.to.index()))
                .collect();
            let transition = candidates.choose(&mut rng).ok_or_else(|| {
                RegGenError::Generation(format!(
                    "walk stalled in {} with {} symbols left",
                    StateId(state),
                    remaining
                ))
            })?;
            let c = transition
                .label
                .as_ref()
                .and_then(|symbol| sample_char(symbol, &mut rng))
                .ok_or_else(|| {
                    RegGenError::Generation(format!(
                        "transition out of {} has nothing to sample",
                        transition.from
                    ))
                })?;
            trace!("{} --{:?}--> {}", transition.from, c, transition.to);
            text.push(c);
            state = transition.to.index();
        }

        Ok(text)
    }

    /// `viable[k]` holds the states from which an accepting state is
    /// reachable consuming exactly `k` symbols. Rows past the first empty one
    /// are empty too and are left out.
    fn viability(&self, horizon: usize) -> Result<Vec<StateSet>> {
        let state_count = self.automaton.state_count();
        let transitions = self.automaton.transitions();
        let mut viable = vec![self.accepts_now.clone()];

        for k in 1..=horizon {
            let previous = &viable[k - 1];
            if previous.is_empty() {
                break;
            }
            if (k + 1).saturating_mul(state_count) > self.config.max_table_cells {
                return Err(RegGenError::Generation(format!(
                    "length {} over {} states exceeds the table limit of {} cells",
                    horizon, state_count, self.config.max_table_cells
                )));
            }

            let mut row = StateSet::new(state_count);
            let mut seeds = Vec::new();
            for &i in &self.symbol_edges {
                let transition = &transitions[i];
                if previous.contains(transition.to.index())
                    && row.insert(transition.from.index())
                {
                    seeds.push(transition.from.index());
                }
            }
            spread_back(&self.automaton, &mut row, seeds);
            viable.push(row);
        }

        Ok(viable)
    }

    fn pick_length<F>(&self, length: usize, horizon: usize, feasible: F) -> Option<usize>
    where
        F: Fn(usize) -> bool,
    {
        match self.config.length_policy {
            LengthPolicy::Exact => feasible(length).then_some(length),
            LengthPolicy::Closest => (0..=horizon).find_map(|distance| {
                let shorter = length.checked_sub(distance).filter(|&k| feasible(k));
                let longer = Some(length + distance).filter(|&k| k <= horizon && feasible(k));
                shorter.or(longer)
            }),
        }
    }
}

/// Add to `set` every state with an epsilon path into `seeds`, which must
/// already be in it
fn spread_back(automaton: &Automaton, set: &mut StateSet, mut seeds: Vec<usize>) {
    while let Some(state) = seeds.pop() {
        for transition in automaton.incoming(StateId(state)).filter(|t| t.is_epsilon()) {
            if set.insert(transition.from.index()) {
                seeds.push(transition.from.index());
            }
        }
    }
}

fn can_sample(symbol: &Symbol) -> bool {
    match symbol {
        Symbol::Set(set) => !set.is_empty(),
        _ => true,
    }
}

/// Pick a character matched by `symbol` uniformly at random
fn sample_char<R: Rng>(symbol: &Symbol, rng: &mut R) -> Option<char> {
    match symbol {
        Symbol::Char(c) => Some(*c),
        Symbol::Set(set) if set.is_empty() => None,
        Symbol::Set(set) => set.nth(rng.gen_range(0..set.len())),
        Symbol::Class(_) | Symbol::Any => {
            let (lo, hi) = SAMPLE_RANGE;
            let pool: Vec<char> = (lo..=hi).filter(|&c| symbol.matches(c)).collect();
            pool.choose(rng).copied()
        }
    }
}

/// Generate one word from a pattern or an automaton
pub fn generate<'a>(
    source: impl Into<Source<'a>>,
    length: usize,
    seed: Option<u64>,
) -> Result<GeneratedWord<'a>> {
    Generator::new(source)?.into_word(length, seed)
}
