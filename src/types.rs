//! This module defines the core vocabulary of the simulator: movement directions,
//! end states, execution states, transition records, and the error types shared by
//! the parser, the executor, and the compiler.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Rule;

/// The left tape sentinel. It occupies cell 0 of every tape and is never
/// overwritten by anything else.
pub const START_SYMBOL: &str = "S";
/// The blank symbol. Fresh tape cells hold it, and it terminates machine output.
pub const BLANK_SYMBOL: &str = "_";

/// A tape symbol.
///
/// Symbols are owned strings rather than single characters because the compiler
/// produces "compressed" symbols that pack one marker/symbol pair per source
/// tape into a single cell.
pub type Symbol = String;

/// A head movement produced by a transition, one per tape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one cell to the left.
    Left,
    /// Keep the head where it is.
    Neutral,
    /// Move the head one cell to the right.
    Right,
}

impl Direction {
    /// The single-letter encoding used by the table format.
    pub fn code(self) -> char {
        match self {
            Direction::Left => 'L',
            Direction::Neutral => 'N',
            Direction::Right => 'R',
        }
    }

    /// Parses the single-letter encoding used by the table format.
    pub fn decode(text: &str) -> Option<Direction> {
        match text {
            "L" => Some(Direction::Left),
            "N" => Some(Direction::Neutral),
            "R" => Some(Direction::Right),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// A terminal machine state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EndState {
    /// The machine accepted its input.
    Accept,
    /// The machine rejected its input.
    Reject,
    /// The machine halted with an output on its last tape.
    Halt,
}

impl EndState {
    /// The single-letter encoding used by the table format.
    pub fn code(self) -> char {
        match self {
            EndState::Accept => 'y',
            EndState::Reject => 'n',
            EndState::Halt => 'h',
        }
    }

    /// Parses the single-letter encoding used by the table format.
    pub fn decode(text: &str) -> Option<EndState> {
        match text {
            "y" => Some(EndState::Accept),
            "n" => Some(EndState::Reject),
            "h" => Some(EndState::Halt),
            _ => None,
        }
    }
}

impl std::fmt::Display for EndState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EndState::Accept => "accept",
            EndState::Reject => "reject",
            EndState::Halt => "halt",
        };
        write!(f, "{name}")
    }
}

/// An execution state: either an active (numbered) state or a terminal one.
///
/// Keeping the terminal states in a tagged variant instead of reserving magic
/// integers makes the executor's loop condition unambiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum State {
    /// A non-terminal state, identified by a non-negative number.
    Active(usize),
    /// One of the three terminal states.
    End(EndState),
}

impl State {
    /// Returns `true` if this is a terminal state.
    pub fn is_end(self) -> bool {
        matches!(self, State::End(_))
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Active(id) => write!(f, "{id}"),
            State::End(end) => write!(f, "{end}"),
        }
    }
}

/// What a transition does to a single tape: write a symbol, then move the head.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Action {
    /// The symbol written over the cell under the head.
    pub write: Symbol,
    /// The head movement applied after writing.
    pub direction: Direction,
}

impl Action {
    pub fn new(write: impl Into<Symbol>, direction: Direction) -> Self {
        Self {
            write: write.into(),
            direction,
        }
    }
}

/// The input half of a transition: the current state and the symbols read from
/// all tapes, in tape order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionIn {
    pub state: usize,
    pub reads: Vec<Symbol>,
}

/// The output half of a transition: the next state and one [`Action`] per tape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransitionOut {
    pub state: State,
    pub actions: Vec<Action>,
}

/// A tape-level rule violation. The executor wraps it with the tape index and
/// step count before surfacing it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TapeViolation {
    /// A non-sentinel symbol was written over the sentinel in cell 0.
    #[error("start symbol can't be overwritten with {0:?}")]
    SentinelOverwritten(Symbol),
    /// The sentinel was written somewhere other than cell 0.
    #[error("start symbol can't be written outside cell 0")]
    SentinelMisplaced,
    /// The head was asked to move left of cell 0.
    #[error("head can't move left of the start of the tape")]
    HeadUnderflow,
}

/// Errors produced while parsing, validating, or running machines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MachineError {
    /// The encoded table text did not match the grammar.
    #[error("syntax error: {0}")]
    Syntax(#[from] Box<pest::error::Error<Rule>>),
    /// The encoded table text parsed but did not have the promised shape.
    #[error("malformed table: {0}")]
    Format(String),
    /// A table or machine failed a structural invariant.
    #[error("validation error: {0}")]
    Validation(String),
    /// A running machine violated a tape rule. This indicates a broken source
    /// machine; the offending step is aborted before any tape is mutated.
    #[error("tape {tape} at step {step}: {violation}")]
    Tape {
        tape: usize,
        step: usize,
        violation: TapeViolation,
    },
    /// A file could not be read or written.
    #[error("file error: {0}")]
    File(String),
}
