//! This module implements the machine executor. A [`TuringMachine`] drives all
//! of its tapes in lockstep, one transition per step: it snapshots the symbols
//! under every head, looks the vector up in the transition table, validates the
//! resulting writes and moves against every tape, and only then applies them and
//! commits the next state. A step that would violate a tape rule aborts with no
//! tape mutated.
//!
//! The executor is generic over the tape flavor so compiled machines, whose
//! cells hold multi-character compressed symbols, run through the same loop.

use crate::tape::{SingleTape, Tape};
use crate::transitions::TransitionTable;
use crate::types::{EndState, MachineError, State, Symbol};

/// A deterministic multi-tape Turing machine.
///
/// The machine owns its transition table and `k` tapes. [`run`] resets it to
/// state 0 with fresh tapes, places the input on tape 0, and steps until a
/// terminal state is reached; a machine that never reaches one loops forever by
/// design. Use [`run_bounded`] for a step-limited run.
///
/// [`run`]: TuringMachine::run
/// [`run_bounded`]: TuringMachine::run_bounded
pub struct TuringMachine<T: Tape = SingleTape> {
    table: TransitionTable,
    tapes: Vec<T>,
    state: State,
    time: usize,
}

impl<T: Tape> TuringMachine<T> {
    /// Creates a machine for the given table, with fresh tapes and state 0.
    pub fn new(table: TransitionTable) -> Self {
        let tapes = (0..table.n_tapes()).map(|_| T::empty()).collect();
        Self {
            table,
            tapes,
            state: State::Active(0),
            time: 0,
        }
    }

    /// Creates a machine from an encoded table file.
    pub fn from_file(path: &std::path::Path) -> Result<Self, MachineError> {
        Ok(Self::new(crate::loader::load(path)?))
    }

    /// The current execution state.
    pub fn state(&self) -> State {
        self.state
    }

    /// The number of steps taken since the last reset.
    pub fn time(&self) -> usize {
        self.time
    }

    /// The machine's tapes.
    pub fn tapes(&self) -> &[T] {
        &self.tapes
    }

    /// The machine's transition table.
    pub fn table(&self) -> &TransitionTable {
        &self.table
    }

    fn reset(&mut self, input: &str) {
        self.state = State::Active(0);
        self.time = 0;
        self.tapes = (0..self.table.n_tapes()).map(|_| T::empty()).collect();
        self.tapes[0] = T::with_input(input);
    }

    /// Performs one step: read all tapes, look up the transition, write and
    /// move every tape, commit the next state, and count the step.
    ///
    /// Reads are snapshotted before any write, so a tape's read and write
    /// within one step never interfere. All writes and moves are validated
    /// before the first one is applied; on a violation the step is aborted
    /// with every tape untouched. Stepping a machine that already reached a
    /// terminal state does nothing.
    pub fn step(&mut self) -> Result<(), MachineError> {
        let state = match self.state {
            State::Active(state) => state,
            State::End(_) => return Ok(()),
        };

        let reads: Vec<Symbol> = self.tapes.iter().map(|tape| tape.read().clone()).collect();
        let out = self.table.lookup(state, &reads);
        let step = self.time;

        for (i, (tape, action)) in self.tapes.iter().zip(&out.actions).enumerate() {
            tape.check(&action.write, action.direction)
                .map_err(|violation| MachineError::Tape {
                    tape: i,
                    step,
                    violation,
                })?;
        }
        for (i, (tape, action)) in self.tapes.iter_mut().zip(&out.actions).enumerate() {
            tape.write(action.write.clone())
                .map_err(|violation| MachineError::Tape {
                    tape: i,
                    step,
                    violation,
                })?;
        }
        for (i, (tape, action)) in self.tapes.iter_mut().zip(&out.actions).enumerate() {
            tape.move_head(action.direction)
                .map_err(|violation| MachineError::Tape {
                    tape: i,
                    step,
                    violation,
                })?;
        }

        self.state = out.state;
        self.time += 1;
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.render());
        }
        Ok(())
    }

    /// Runs the machine on `input` until it reaches a terminal state.
    ///
    /// The input is a line of alphabet symbols; it must not contain `S` or `_`.
    /// A machine without a reachable terminal state does not return.
    pub fn run(&mut self, input: &str) -> Result<EndState, MachineError> {
        self.reset(input);
        log::debug!("running on input {input:?}");
        if log::log_enabled!(log::Level::Trace) {
            log::trace!("{}", self.render());
        }
        loop {
            if let State::End(end) = self.state {
                log::debug!("reached {end} after {} steps", self.time);
                return Ok(end);
            }
            self.step()?;
        }
    }

    /// Runs the machine on `input` for at most `max_steps` steps.
    ///
    /// Returns the terminal state if one was reached in time, `None` otherwise.
    pub fn run_bounded(
        &mut self,
        input: &str,
        max_steps: usize,
    ) -> Result<Option<EndState>, MachineError> {
        self.reset(input);
        loop {
            if let State::End(end) = self.state {
                return Ok(Some(end));
            }
            if self.time >= max_steps {
                return Ok(None);
            }
            self.step()?;
        }
    }

    /// The machine's output, available once it has halted: the contents of the
    /// last tape with trailing blanks stripped. Accepting or rejecting machines
    /// have no output.
    pub fn output(&self) -> Option<String> {
        match self.state {
            State::End(EndState::Halt) => self.tapes.last().map(|tape| tape.output()),
            _ => None,
        }
    }

    /// Runs the machine and returns whether it accepted the input.
    pub fn accepts(&mut self, input: &str) -> Result<bool, MachineError> {
        Ok(self.run(input)? == EndState::Accept)
    }

    /// Runs the machine and returns whether it rejected the input.
    pub fn rejects(&mut self, input: &str) -> Result<bool, MachineError> {
        Ok(self.run(input)? == EndState::Reject)
    }

    /// Runs the machine and returns its output if it halted, or an empty
    /// string if it accepted or rejected.
    pub fn result(&mut self, input: &str) -> Result<String, MachineError> {
        if self.run(input)? != EndState::Halt {
            return Ok(String::new());
        }
        Ok(self.output().unwrap_or_default())
    }

    /// Runs the machine and returns the number of steps it took.
    pub fn runtime(&mut self, input: &str) -> Result<usize, MachineError> {
        self.run(input)?;
        Ok(self.time)
    }

    /// A diagnostic snapshot: step count, state, and every tape with its head.
    pub fn render(&self) -> String {
        let tapes = self
            .tapes
            .iter()
            .map(|tape| tape.render())
            .collect::<Vec<_>>()
            .join("\n");
        format!("time: {},\tstate: {}\ntapes:\n{tapes}", self.time, self.state)
    }
}

impl<T: Tape> std::fmt::Display for TuringMachine<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Direction, TransitionIn, TransitionOut};

    fn entry(
        state: usize,
        reads: &[&str],
        next: State,
        actions: &[(&str, Direction)],
    ) -> (TransitionIn, TransitionOut) {
        (
            TransitionIn {
                state,
                reads: reads.iter().map(|read| read.to_string()).collect(),
            },
            TransitionOut {
                state: next,
                actions: actions
                    .iter()
                    .map(|(write, direction)| Action::new(*write, *direction))
                    .collect(),
            },
        )
    }

    fn table(
        n_tapes: usize,
        alphabet: &[&str],
        entries: Vec<(TransitionIn, TransitionOut)>,
    ) -> TransitionTable {
        let mut table = TransitionTable::new(
            0,
            n_tapes,
            alphabet.iter().map(|symbol| symbol.to_string()).collect(),
        )
        .unwrap();
        for (input, output) in entries {
            table.insert(input, output).unwrap();
        }
        table.recount_states();
        table
    }

    /// The unary counter: rewrite every input symbol to 1, halt at the blank.
    fn unary_counter() -> TransitionTable {
        table(
            1,
            &["0", "1"],
            vec![
                entry(0, &["0"], State::Active(0), &[("1", Direction::Right)]),
                entry(0, &["1"], State::Active(0), &[("1", Direction::Right)]),
                entry(0, &["_"], State::End(EndState::Halt), &[("_", Direction::Neutral)]),
            ],
        )
    }

    #[test]
    fn test_unary_counter_halts_with_output() {
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        assert_eq!(machine.run("010010").unwrap(), EndState::Halt);
        assert_eq!(machine.output(), Some("111111".to_string()));
        assert_eq!(machine.time(), 7);
    }

    #[test]
    fn test_result_and_runtime_queries() {
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        assert_eq!(machine.result("010010").unwrap(), "111111");
        assert_eq!(machine.runtime("010010").unwrap(), 7);
        assert!(!machine.accepts("010010").unwrap());
        assert!(!machine.rejects("010010").unwrap());
    }

    #[test]
    fn test_empty_input_halts_immediately() {
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        assert_eq!(machine.result("").unwrap(), "");
        assert_eq!(machine.time(), 1);
    }

    #[test]
    fn test_missing_transition_rejects() {
        // the table has no rule for reading a 2, so the default applies
        let mut machine = TuringMachine::<SingleTape>::new(table(
            1,
            &["0", "1", "2"],
            vec![entry(0, &["0"], State::Active(0), &[("0", Direction::Right)])],
        ));
        assert!(machine.rejects("2").unwrap());
        assert_eq!(machine.time(), 1);
        // rejecting in place leaves the tape as it was
        assert_eq!(machine.tapes()[0].cells(), &["S", "2", "_"]);
    }

    #[test]
    fn test_determinism() {
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        let first = machine.run("0101").unwrap();
        let first_cells = machine.tapes()[0].cells().to_vec();
        let first_time = machine.time();

        let second = machine.run("0101").unwrap();
        assert_eq!(first, second);
        assert_eq!(first_cells, machine.tapes()[0].cells());
        assert_eq!(first_time, machine.time());
    }

    #[test]
    fn test_sentinel_survives_runs() {
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        machine.run("0110").unwrap();
        for tape in machine.tapes() {
            assert_eq!(tape.cells()[0], "S");
        }
    }

    #[test]
    fn test_growing_tape_run() {
        let input = "0".repeat(1000);
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        let output = machine.result(&input).unwrap();
        assert_eq!(output, "1".repeat(1000));
        assert_eq!(machine.time(), 1001);
    }

    #[test]
    fn test_two_tape_copy_machine() {
        let copy = table(
            2,
            &["0", "1"],
            vec![
                entry(
                    0,
                    &["0", "_"],
                    State::Active(0),
                    &[("0", Direction::Right), ("0", Direction::Right)],
                ),
                entry(
                    0,
                    &["1", "_"],
                    State::Active(0),
                    &[("1", Direction::Right), ("1", Direction::Right)],
                ),
                entry(
                    0,
                    &["_", "_"],
                    State::End(EndState::Halt),
                    &[("_", Direction::Neutral), ("_", Direction::Neutral)],
                ),
            ],
        );
        let mut machine = TuringMachine::<SingleTape>::new(copy);
        assert_eq!(machine.result("10110").unwrap(), "10110");
        assert_eq!(machine.tapes().len(), 2);
    }

    #[test]
    fn test_left_underflow_is_fatal() {
        let runaway = table(
            1,
            &["0"],
            vec![
                entry(0, &["_"], State::Active(0), &[("_", Direction::Left)]),
                entry(0, &["S"], State::Active(0), &[("S", Direction::Left)]),
            ],
        );
        let mut machine = TuringMachine::<SingleTape>::new(runaway);
        let error = machine.run("").unwrap_err();
        assert!(matches!(
            error,
            MachineError::Tape {
                tape: 0,
                step: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_violating_step_mutates_nothing() {
        // tape 0 would be rewritten while tape 1 underflows; neither may happen
        let broken = table(
            2,
            &["a", "x"],
            vec![
                entry(
                    0,
                    &["a", "_"],
                    State::Active(0),
                    &[("x", Direction::Neutral), ("_", Direction::Left)],
                ),
                entry(
                    0,
                    &["x", "S"],
                    State::Active(1),
                    &[("a", Direction::Neutral), ("S", Direction::Left)],
                ),
            ],
        );
        let mut machine = TuringMachine::<SingleTape>::new(broken);
        let error = machine.run("a").unwrap_err();
        assert!(matches!(error, MachineError::Tape { tape: 1, step: 1, .. }));
        // the first step committed, the violating one did not
        assert_eq!(machine.tapes()[0].read(), "x");
        assert_eq!(machine.time(), 1);
    }

    #[test]
    fn test_run_bounded_stops_divergence() {
        let spinner = table(
            1,
            &["0"],
            vec![entry(0, &["_"], State::Active(0), &[("_", Direction::Neutral)])],
        );
        let mut machine = TuringMachine::<SingleTape>::new(spinner);
        assert_eq!(machine.run_bounded("", 100).unwrap(), None);
        assert_eq!(machine.time(), 100);

        let mut counter = TuringMachine::<SingleTape>::new(unary_counter());
        assert_eq!(
            counter.run_bounded("01", 100).unwrap(),
            Some(EndState::Halt)
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counter.tm");
        std::fs::write(&path, crate::encoder::encode(&unary_counter())).unwrap();

        let mut machine = TuringMachine::<SingleTape>::from_file(&path).unwrap();
        assert_eq!(machine.result("01").unwrap(), "11");

        assert!(TuringMachine::<SingleTape>::from_file(&dir.path().join("gone.tm")).is_err());
    }

    #[test]
    fn test_render_snapshot() {
        let mut machine = TuringMachine::<SingleTape>::new(unary_counter());
        machine.run("01").unwrap();
        let snapshot = machine.render();
        assert!(snapshot.contains("time: 3"));
        assert!(snapshot.contains("state: halt"));
        assert!(snapshot.contains("S11_"));
    }
}
