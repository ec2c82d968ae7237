//! This crate provides a deterministic multi-tape Turing machine simulator and
//! a compiler that lowers any k-tape machine to an observationally equivalent
//! single-tape machine. It includes a parser and serializer for the textual
//! transition-table encoding, a catalog of embedded example machines, and
//! helpers for loading and saving encoded tables on disk.

pub mod compress;
pub mod encoder;
pub mod loader;
pub mod machine;
pub mod parser;
pub mod programs;
pub mod tape;
pub mod transitions;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the k-tape to single-tape compiler entry point.
pub use compress::compress;
/// Re-exports the encoded-table serializer.
pub use encoder::encode;
/// Re-exports the machine executor.
pub use machine::TuringMachine;
/// Re-exports the encoded-table parser.
pub use parser::parse;
/// Re-exports the embedded machine catalog.
pub use programs::{catalog, MachineInfo, MACHINES};
/// Re-exports the tape trait and its two cell granularities.
pub use tape::{MultiTape, SingleTape, Tape};
/// Re-exports the transition table.
pub use transitions::TransitionTable;
/// Re-exports the core vocabulary types.
pub use types::{
    Action, Direction, EndState, MachineError, State, Symbol, TapeViolation, TransitionIn,
    TransitionOut, BLANK_SYMBOL, START_SYMBOL,
};
