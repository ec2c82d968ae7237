//! This module parses the textual transition-table encoding, using a `pest`
//! grammar for the line/field structure and a builder pass for the semantic
//! checks: the header counts must match what is actually in the file, and every
//! symbol must be declared (or be one of the implicit `S` / `_`).
//!
//! The format, in order: any number of `#` comment lines anywhere, a header
//! line `n_states n_tapes alphabet_size n_transitions`, a comma-separated
//! alphabet line, and one comma-separated transition line per transition with
//! `2 + 3 * n_tapes` fields:
//! `state_in, read_1, .., read_k, state_out, write_1, dir_1, .., write_k, dir_k`.

use pest::iterators::Pair;
use pest::Parser as PestParser;
use pest_derive::Parser as PestParser;

use crate::transitions::TransitionTable;
use crate::types::{
    Action, Direction, EndState, MachineError, State, Symbol, TransitionIn, TransitionOut,
};

/// Derives the pest parser for the encoded-table grammar in `grammar.pest`.
#[derive(PestParser)]
#[grammar = "grammar.pest"]
pub struct TableParser;

/// Parses encoded transition-table text into a [`TransitionTable`].
///
/// # Errors
///
/// * [`MachineError::Syntax`] when the text does not match the grammar.
/// * [`MachineError::Format`] when it does but breaks a promise: wrong field
///   counts, unknown symbols, or header counts that do not match the content.
pub fn parse(input: &str) -> Result<TransitionTable, MachineError> {
    let root = TableParser::parse(Rule::table, input.trim())
        .map_err(|e| MachineError::Syntax(Box::new(e)))? //
        .next()
        .unwrap();

    build_table(root)
}

/// Builds and checks a table from a parsed `Rule::table` pair.
fn build_table(pair: Pair<Rule>) -> Result<TransitionTable, MachineError> {
    let mut header: Option<[usize; 4]> = None;
    let mut rows: Vec<(Vec<String>, String)> = Vec::new();

    for part in pair.into_inner() {
        match part.as_rule() {
            Rule::header => header = Some(parse_header(part)?),
            Rule::row => {
                let text = part.as_str().to_string();
                let entries = part
                    .into_inner()
                    .map(|entry| entry.as_str().to_string())
                    .collect();
                rows.push((entries, text));
            }
            _ => {} // EOI
        }
    }

    let [n_states, n_tapes, alphabet_size, n_transitions] =
        header.ok_or_else(|| MachineError::Format("missing header line".to_string()))?;

    let mut rows = rows.into_iter();
    let (alphabet, alphabet_text) = rows
        .next()
        .ok_or_else(|| MachineError::Format("missing alphabet line".to_string()))?;
    if alphabet.len() != alphabet_size {
        return Err(MachineError::Format(format!(
            "alphabet line {alphabet_text:?} has {} symbols, header promised {alphabet_size}",
            alphabet.len()
        )));
    }

    let mut table = TransitionTable::new(n_states, n_tapes, alphabet)?;
    let mut observed_lines = 0;
    for (entries, text) in rows {
        let (input, output) = parse_transition(&entries, &text, &table)?;
        table.insert(input, output)?;
        observed_lines += 1;
    }

    if observed_lines != n_transitions {
        return Err(MachineError::Format(format!(
            "observed line count ({observed_lines}) does not equal promised line count ({n_transitions})"
        )));
    }
    let observed_states = table.observed_states();
    if observed_states.len() != n_states {
        return Err(MachineError::Format(format!(
            "observed state count ({observed_states:?}, {} states) does not equal promised state count ({n_states})",
            observed_states.len()
        )));
    }

    Ok(table)
}

/// Reads the four header counts.
fn parse_header(pair: Pair<Rule>) -> Result<[usize; 4], MachineError> {
    let text = pair.as_str().to_string();
    let mut counts = [0usize; 4];
    let mut values = pair.into_inner();
    for slot in &mut counts {
        let value = values
            .next()
            .ok_or_else(|| MachineError::Format(format!("header {text:?} is missing a count")))?;
        *slot = value.as_str().parse::<usize>().map_err(|_| {
            MachineError::Format(format!("header {text:?} holds an unrepresentable count"))
        })?;
    }
    Ok(counts)
}

/// Parses one transition line that has already been split into fields.
fn parse_transition(
    entries: &[String],
    text: &str,
    table: &TransitionTable,
) -> Result<(TransitionIn, TransitionOut), MachineError> {
    let n_tapes = table.n_tapes();
    // 1 state_in, n reads, 1 state_out, n write/direction pairs
    let expected = 2 + 3 * n_tapes;
    if entries.len() != expected {
        return Err(MachineError::Format(format!(
            "error in processing line {text:?}: expected {expected} comma-separated fields, found {}",
            entries.len()
        )));
    }

    let state = entries[0].parse::<usize>().map_err(|_| {
        MachineError::Format(format!(
            "error in processing line {text:?}: state {:?} is not a non-negative number",
            entries[0]
        ))
    })?;
    let reads: Vec<Symbol> = entries[1..=n_tapes].to_vec();

    let state_out = &entries[n_tapes + 1];
    let next = match EndState::decode(state_out) {
        Some(end) => State::End(end),
        None => State::Active(state_out.parse::<usize>().map_err(|_| {
            MachineError::Format(format!(
                "error in processing line {text:?}: next state {state_out:?} is not a number or one of y/n/h"
            ))
        })?),
    };

    let mut actions = Vec::with_capacity(n_tapes);
    for i in 0..n_tapes {
        let write = entries[n_tapes + 2 + 2 * i].clone();
        let direction_text = &entries[n_tapes + 3 + 2 * i];
        let direction = Direction::decode(direction_text).ok_or_else(|| {
            MachineError::Format(format!(
                "error in processing line {text:?}: direction {direction_text:?} is not one of L/N/R"
            ))
        })?;
        actions.push(Action { write, direction });
    }

    for symbol in reads.iter().chain(actions.iter().map(|action| &action.write)) {
        if !table.is_known_symbol(symbol) {
            return Err(MachineError::Format(format!(
                "error in processing line {text:?}: observed symbol ({symbol}) not in alphabet ({:?})",
                table.alphabet()
            )));
        }
    }

    Ok((
        TransitionIn { state, reads },
        TransitionOut {
            state: next,
            actions,
        },
    ))
}
