//! This module serializes a [`TransitionTable`] back into the textual encoding
//! the parser reads. Entries are written in insertion order, so
//! `parse(encode(table))` reproduces the table exactly.

use crate::transitions::TransitionTable;
use crate::types::{State, TransitionIn, TransitionOut};

/// Serializes a table into the encoded text format.
///
/// The output starts with a comment line, then the header, the alphabet line,
/// and one line per transition.
///
/// # Arguments
///
/// * `table` - The table to serialize.
///
/// # Returns
///
/// * `String` - The encoded table text.
pub fn encode(table: &TransitionTable) -> String {
    let mut lines = Vec::with_capacity(table.len() + 3);
    lines.push("# Saved automatically from a transition table.".to_string());
    lines.push(format!(
        "{} {} {} {}",
        table.n_states(),
        table.n_tapes(),
        table.alphabet().len(),
        table.len()
    ));
    lines.push(table.alphabet().join(","));
    for (input, output) in table.iter() {
        lines.push(encode_transition(input, output));
    }
    lines.join("\n") + "\n"
}

/// Renders one transition line: `state,reads..,next,write,dir,..`.
fn encode_transition(input: &TransitionIn, output: &TransitionOut) -> String {
    let next = match output.state {
        State::Active(id) => id.to_string(),
        State::End(end) => end.code().to_string(),
    };
    let actions = output
        .actions
        .iter()
        .map(|action| format!("{},{}", action.write, action.direction.code()))
        .collect::<Vec<_>>()
        .join(",");
    format!("{},{},{next},{actions}", input.state, input.reads.join(","))
}
