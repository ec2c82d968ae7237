//! This module defines the transition table: a pure mapping from (state,
//! read-vector) to (next state, actions). Missing keys are not errors; looking
//! one up yields the implicit default of rejecting in place. The implicit
//! entries are never materialized, which keeps tables small and the compiler
//! tractable.

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::types::{
    Action, Direction, EndState, MachineError, State, Symbol, TransitionIn, TransitionOut,
    BLANK_SYMBOL, START_SYMBOL,
};

/// A transition table for a machine with a fixed tape count and alphabet.
///
/// Entries iterate in insertion order, which the serializer relies on;
/// algorithms must not depend on that order for anything else.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionTable {
    n_states: usize,
    n_tapes: usize,
    alphabet: Vec<Symbol>,
    /// Alphabet plus the two distinguished symbols, for membership checks.
    known: HashSet<Symbol>,
    entries: Vec<(TransitionIn, TransitionOut)>,
    index: HashMap<(usize, Vec<Symbol>), usize>,
}

impl TransitionTable {
    /// Creates an empty table.
    ///
    /// `n_states` is the declared number of distinct non-terminal states; the
    /// parser checks it against the entries it reads, and the compiler calls
    /// [`TransitionTable::recount_states`] once its entries are final.
    pub fn new(
        n_states: usize,
        n_tapes: usize,
        alphabet: Vec<Symbol>,
    ) -> Result<Self, MachineError> {
        if n_tapes == 0 {
            return Err(MachineError::Validation(
                "a machine needs at least one tape".to_string(),
            ));
        }
        let mut known: HashSet<Symbol> = alphabet.iter().cloned().collect();
        if known.len() != alphabet.len() {
            return Err(MachineError::Validation(format!(
                "alphabet {alphabet:?} contains duplicate symbols"
            )));
        }
        known.insert(START_SYMBOL.to_string());
        known.insert(BLANK_SYMBOL.to_string());
        Ok(Self {
            n_states,
            n_tapes,
            alphabet,
            known,
            entries: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// The declared number of distinct non-terminal states.
    pub fn n_states(&self) -> usize {
        self.n_states
    }

    /// The number of tapes every transition covers.
    pub fn n_tapes(&self) -> usize {
        self.n_tapes
    }

    /// The declared alphabet, without the implicit `S` and `_`.
    pub fn alphabet(&self) -> &[Symbol] {
        &self.alphabet
    }

    /// The number of stored transitions.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `symbol` is in the alphabet or is one of `S` / `_`.
    pub fn is_known_symbol(&self, symbol: &Symbol) -> bool {
        self.known.contains(symbol)
    }

    /// Inserts a transition, replacing any earlier entry with the same key.
    ///
    /// Fails if the read or action vectors do not have one element per tape or
    /// mention symbols outside the alphabet.
    pub fn insert(
        &mut self,
        input: TransitionIn,
        output: TransitionOut,
    ) -> Result<(), MachineError> {
        if input.reads.len() != self.n_tapes {
            return Err(MachineError::Validation(format!(
                "transition for state {} reads {} symbols, expected one per tape ({})",
                input.state,
                input.reads.len(),
                self.n_tapes
            )));
        }
        if output.actions.len() != self.n_tapes {
            return Err(MachineError::Validation(format!(
                "transition for state {} has {} actions, expected one per tape ({})",
                input.state,
                output.actions.len(),
                self.n_tapes
            )));
        }
        for symbol in input
            .reads
            .iter()
            .chain(output.actions.iter().map(|action| &action.write))
        {
            if !self.is_known_symbol(symbol) {
                return Err(MachineError::Validation(format!(
                    "observed symbol ({symbol}) not in alphabet ({:?})",
                    self.alphabet
                )));
            }
        }

        let key = (input.state, input.reads.clone());
        match self.index.get(&key) {
            Some(&slot) => self.entries[slot] = (input, output),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push((input, output));
            }
        }
        Ok(())
    }

    /// Looks up the transition for `state` reading `reads`.
    ///
    /// Never fails: a missing key yields the implicit default of rejecting
    /// while leaving every tape untouched.
    pub fn lookup(&self, state: usize, reads: &[Symbol]) -> TransitionOut {
        match self.index.get(&(state, reads.to_vec())) {
            Some(&slot) => self.entries[slot].1.clone(),
            None => TransitionOut {
                state: State::End(EndState::Reject),
                actions: reads
                    .iter()
                    .map(|read| Action::new(read.clone(), Direction::Neutral))
                    .collect(),
            },
        }
    }

    /// Returns the stored entry for a key, if any. Unlike [`lookup`], this does
    /// not fall back to the implicit default.
    ///
    /// [`lookup`]: TransitionTable::lookup
    pub fn get(&self, state: usize, reads: &[Symbol]) -> Option<&TransitionOut> {
        self.index
            .get(&(state, reads.to_vec()))
            .map(|&slot| &self.entries[slot].1)
    }

    /// Iterates over the entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(TransitionIn, TransitionOut)> {
        self.entries.iter()
    }

    /// Every non-terminal state mentioned by any key or value.
    pub fn observed_states(&self) -> BTreeSet<usize> {
        let mut states = BTreeSet::new();
        for (input, output) in &self.entries {
            states.insert(input.state);
            if let State::Active(id) = output.state {
                states.insert(id);
            }
        }
        states
    }

    /// Sets the declared state count to the observed one. The compiler calls
    /// this after generation so its output always satisfies the parser's
    /// declared-equals-observed assertion.
    pub fn recount_states(&mut self) {
        self.n_states = self.observed_states().len();
    }

    /// Renders the table as aligned columns for diagnostics.
    pub fn render(&self) -> String {
        let mut rows = vec![[
            "state in".to_string(),
            "chars in".to_string(),
            "state out".to_string(),
            "chars out".to_string(),
            "directions".to_string(),
        ]];
        for (input, output) in &self.entries {
            rows.push([
                input.state.to_string(),
                input.reads.join(","),
                match output.state {
                    State::Active(id) => id.to_string(),
                    State::End(end) => end.code().to_string(),
                },
                output
                    .actions
                    .iter()
                    .map(|action| action.write.clone())
                    .collect::<Vec<_>>()
                    .join(","),
                output
                    .actions
                    .iter()
                    .map(|action| action.direction.code().to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ]);
        }

        let mut widths = [0usize; 5];
        for row in &rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.len());
            }
        }
        rows.iter()
            .map(|row| {
                row.iter()
                    .zip(widths)
                    .map(|(cell, width)| format!("{cell:width$}"))
                    .collect::<Vec<_>>()
                    .join("  ")
                    .trim_end()
                    .to_string()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unary_counter() -> TransitionTable {
        let mut table =
            TransitionTable::new(1, 1, vec!["0".to_string(), "1".to_string()]).unwrap();
        for read in ["0", "1"] {
            table
                .insert(
                    TransitionIn {
                        state: 0,
                        reads: vec![read.to_string()],
                    },
                    TransitionOut {
                        state: State::Active(0),
                        actions: vec![Action::new("1", Direction::Right)],
                    },
                )
                .unwrap();
        }
        table
            .insert(
                TransitionIn {
                    state: 0,
                    reads: vec!["_".to_string()],
                },
                TransitionOut {
                    state: State::End(EndState::Halt),
                    actions: vec![Action::new("_", Direction::Neutral)],
                },
            )
            .unwrap();
        table
    }

    #[test]
    fn test_lookup_returns_stored_entry() {
        let table = unary_counter();
        let out = table.lookup(0, &["0".to_string()]);
        assert_eq!(out.state, State::Active(0));
        assert_eq!(out.actions, vec![Action::new("1", Direction::Right)]);
    }

    #[test]
    fn test_missing_key_rejects_in_place() {
        let table = unary_counter();
        let out = table.lookup(7, &["0".to_string()]);
        assert_eq!(out.state, State::End(EndState::Reject));
        assert_eq!(out.actions, vec![Action::new("0", Direction::Neutral)]);

        // the default writes back whatever was read, per tape
        let out = table.lookup(0, &["S".to_string()]);
        assert_eq!(out.actions, vec![Action::new("S", Direction::Neutral)]);

        assert!(table.get(7, &["0".to_string()]).is_none());
    }

    #[test]
    fn test_insert_replaces_same_key() {
        let mut table = unary_counter();
        let before = table.len();
        table
            .insert(
                TransitionIn {
                    state: 0,
                    reads: vec!["0".to_string()],
                },
                TransitionOut {
                    state: State::End(EndState::Accept),
                    actions: vec![Action::new("0", Direction::Neutral)],
                },
            )
            .unwrap();
        assert_eq!(table.len(), before);
        assert_eq!(
            table.lookup(0, &["0".to_string()]).state,
            State::End(EndState::Accept)
        );
    }

    #[test]
    fn test_insert_rejects_wrong_arity() {
        let mut table = unary_counter();
        let result = table.insert(
            TransitionIn {
                state: 0,
                reads: vec!["0".to_string(), "1".to_string()],
            },
            TransitionOut {
                state: State::Active(0),
                actions: vec![Action::new("0", Direction::Neutral)],
            },
        );
        assert!(matches!(result, Err(MachineError::Validation(_))));
    }

    #[test]
    fn test_insert_rejects_unknown_symbol() {
        let mut table = unary_counter();
        let result = table.insert(
            TransitionIn {
                state: 0,
                reads: vec!["x".to_string()],
            },
            TransitionOut {
                state: State::Active(0),
                actions: vec![Action::new("0", Direction::Neutral)],
            },
        );
        assert!(matches!(result, Err(MachineError::Validation(_))));
    }

    #[test]
    fn test_distinguished_symbols_are_implicit() {
        let table = unary_counter();
        assert!(table.is_known_symbol(&"S".to_string()));
        assert!(table.is_known_symbol(&"_".to_string()));
        assert!(!table.is_known_symbol(&"x".to_string()));
    }

    #[test]
    fn test_zero_tapes_is_invalid() {
        assert!(TransitionTable::new(0, 0, vec![]).is_err());
    }

    #[test]
    fn test_duplicate_alphabet_is_invalid() {
        let result = TransitionTable::new(1, 1, vec!["0".to_string(), "0".to_string()]);
        assert!(matches!(result, Err(MachineError::Validation(_))));
    }

    #[test]
    fn test_observed_states_and_recount() {
        let mut table = unary_counter();
        assert_eq!(table.observed_states().into_iter().collect::<Vec<_>>(), [0]);
        table
            .insert(
                TransitionIn {
                    state: 3,
                    reads: vec!["1".to_string()],
                },
                TransitionOut {
                    state: State::Active(5),
                    actions: vec![Action::new("1", Direction::Neutral)],
                },
            )
            .unwrap();
        table.recount_states();
        assert_eq!(table.n_states(), 3);
    }

    #[test]
    fn test_iteration_follows_insertion_order() {
        let table = unary_counter();
        let reads: Vec<&Symbol> = table.iter().map(|(input, _)| &input.reads[0]).collect();
        assert_eq!(reads, ["0", "1", "_"]);
    }

    #[test]
    fn test_render_aligns_columns() {
        let rendered = unary_counter().render();
        let mut lines = rendered.lines();
        assert_eq!(
            lines.next(),
            Some("state in  chars in  state out  chars out  directions")
        );
        assert_eq!(lines.next(), Some("0         0         0          1          R"));
        assert_eq!(rendered.lines().count(), 4);
        assert!(rendered.contains('h'));
    }
}
