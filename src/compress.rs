//! This module compiles a k-tape machine into a single-tape machine with the
//! same external behavior: same accept/reject verdict on every input, and on
//! halting the same output (on tape 0 of the compiled machine, where the source
//! leaves it on its last tape).
//!
//! The single tape packs all k tapes into "compressed" symbols. A compressed
//! symbol concatenates k marker/symbol pairs, one per source tape: `*` marks
//! the tape's head on this cell, `-` its absence, and the symbol is the tape's
//! cell content. Cell 1 of the compiled tape holds a compressed start symbol
//! whose every track is `S`; the raw sentinel stays in cell 0 and is never
//! visited after setup.
//!
//! One source step becomes one macro-cycle of four sweeps across the tape:
//!
//! * **Read** walks right from the start symbol, copying the cell symbol of
//!   every marked track into a partial save, and looks the completed save up
//!   in the source table at the terminating blank.
//! * **Write** walks back left, replacing the cell symbol of every marked
//!   track with the looked-up write for that tape.
//! * **Move-Right** walks right from the start symbol carrying the heads of
//!   right-moving tapes one cell along, appending a fresh compressed blank if
//!   one runs off the end.
//! * **Move-Left** walks back left doing the same for left-moving tapes, and
//!   ends the cycle at the start symbol: terminal source states become
//!   terminal compiled states, and `Halt` detours through a **Cleanup** pass
//!   that rewrites the tape with the last track's raw contents.
//!
//! Before the first cycle, a one-shot **Init-Copy** pass shifts the raw input
//! one cell right into compressed form and plants all k heads on the first
//! compressed cell.
//!
//! Every stage state is enumerated up front: one Read state per (source state,
//! partial save), one Write state per observed (next state, actions), one
//! Move state per (next state, direction vector, picked-up set), and so on.
//! Combinations that cannot occur on a well-formed tape (a second head for a
//! tape already accounted for, a left move off the sentinel, a write that
//! would create or destroy a sentinel) are simply omitted; the compiled
//! table's implicit Reject covers them, exactly as the source's implicit
//! Reject covers unlisted read vectors. State IDs come from a counter in a
//! fixed enumeration order, so compiling the same table twice yields the same
//! machine.

use std::collections::BTreeMap;

use crate::transitions::TransitionTable;
use crate::types::{
    Action, Direction, EndState, MachineError, State, Symbol, TransitionIn, TransitionOut,
    BLANK_SYMBOL, START_SYMBOL,
};

/// A partial save: one slot per source tape, filled in as the Read sweep
/// passes the tape's head marker.
type Save = Vec<Option<Symbol>>;

/// Compiles `source` into an equivalent single-tape table.
///
/// The compiled machine's alphabet is the source alphabet plus every
/// compressed symbol; run it on a [`MultiTape`](crate::tape::MultiTape)
/// machine. Step counts are not preserved, only end states and halt outputs.
///
/// # Errors
///
/// Fails only on malformed sources (zero or more than 16 tapes); unreachable
/// symbol/state combinations inside a well-formed source are omitted, not
/// errors.
pub fn compress(source: &TransitionTable) -> Result<TransitionTable, MachineError> {
    let mut compressor = Compressor::new(source)?;
    compressor.allocate();
    compressor.generate()?;
    compressor.finish()
}

/// One compressed symbol: a head marker and a cell symbol per source tape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Packed {
    tracks: Vec<(bool, Symbol)>,
}

impl Packed {
    /// The start symbol variant carrying the given head markers.
    fn start(n_tapes: usize, markers: usize) -> Self {
        Self {
            tracks: (0..n_tapes)
                .map(|i| (markers >> i & 1 == 1, START_SYMBOL.to_string()))
                .collect(),
        }
    }

    /// An all-blank cell carrying the given head markers.
    fn blank(n_tapes: usize, markers: usize) -> Self {
        Self {
            tracks: (0..n_tapes)
                .map(|i| (markers >> i & 1 == 1, BLANK_SYMBOL.to_string()))
                .collect(),
        }
    }

    /// The Init-Copy payload: the remembered raw symbol on track 0, blanks on
    /// the other tracks, markers either everywhere or nowhere.
    fn payload(n_tapes: usize, symbol: &Symbol, marked: bool) -> Self {
        Self {
            tracks: (0..n_tapes)
                .map(|i| {
                    let cell = if i == 0 { symbol.clone() } else { BLANK_SYMBOL.to_string() };
                    (marked, cell)
                })
                .collect(),
        }
    }

    /// The textual form used as a tape symbol, e.g. `*0-_` for two tapes.
    fn render(&self) -> Symbol {
        let mut text = String::new();
        for (marked, symbol) in &self.tracks {
            text.push(if *marked { '*' } else { '-' });
            text.push_str(symbol);
        }
        text
    }

    fn is_start(&self) -> bool {
        self.tracks.iter().all(|(_, symbol)| symbol == START_SYMBOL)
    }

    /// The head markers as a bit set, tape i at bit i.
    fn markers(&self) -> usize {
        self.tracks
            .iter()
            .enumerate()
            .filter(|(_, (marked, _))| *marked)
            .fold(0, |mask, (i, _)| mask | 1 << i)
    }

    /// This symbol with its markers replaced.
    fn with_markers(&self, markers: usize) -> Self {
        Self {
            tracks: self
                .tracks
                .iter()
                .enumerate()
                .map(|(i, (_, symbol))| (markers >> i & 1 == 1, symbol.clone()))
                .collect(),
        }
    }

    fn symbol(&self, tape: usize) -> &Symbol {
        &self.tracks[tape].1
    }
}

/// The compile pass: observed sets, state maps, and the table being built.
struct Compressor<'a> {
    source: &'a TransitionTable,
    n_tapes: usize,
    /// What a track cell may hold: the raw alphabet plus the blank.
    cell_symbols: Vec<Symbol>,
    /// The full compressed alphabet, start symbols first.
    packed: Vec<Packed>,
    table: TransitionTable,
    next_id: usize,
    /// Init-Copy states: (remembered raw symbol, placed the heads yet?).
    copying: BTreeMap<(Symbol, bool), usize>,
    /// The Init-Copy return sweep back to the start symbol.
    sweep: usize,
    /// Read states: (source state, partial save).
    reading: BTreeMap<(usize, Save), usize>,
    /// Write states: (source next state, actions).
    writing: BTreeMap<(State, Vec<Action>), usize>,
    /// Move-Right states: (source next state, directions, picked-up set).
    moving_right: BTreeMap<(State, Vec<Direction>, usize), usize>,
    /// Move-Left states: same, with Right directions already retired.
    moving_left: BTreeMap<(State, Vec<Direction>, usize), usize>,
    /// The Cleanup right-seek state, allocated only when the source can halt.
    seek: Option<usize>,
    /// Cleanup copy-back states: remembered last-track symbol.
    cleanup: BTreeMap<Symbol, usize>,
}

/// The compiled machine's initial state: Init-Copy at the first raw cell.
const INIT: usize = 0;

impl<'a> Compressor<'a> {
    fn new(source: &'a TransitionTable) -> Result<Self, MachineError> {
        let n_tapes = source.n_tapes();
        if n_tapes > 16 {
            return Err(MachineError::Validation(format!(
                "compressing a machine with {n_tapes} tapes is not supported (limit 16)"
            )));
        }

        let mut cell_symbols: Vec<Symbol> = source
            .alphabet()
            .iter()
            .filter(|symbol| *symbol != START_SYMBOL && *symbol != BLANK_SYMBOL)
            .cloned()
            .collect();
        cell_symbols.push(BLANK_SYMBOL.to_string());

        // start symbols first, then every marker/symbol combination
        let mut packed = Vec::new();
        for markers in 0..1usize << n_tapes {
            packed.push(Packed::start(n_tapes, markers));
        }
        let mut symbols = vec![0usize; n_tapes];
        loop {
            for markers in 0..1usize << n_tapes {
                packed.push(Packed {
                    tracks: (0..n_tapes)
                        .map(|i| (markers >> i & 1 == 1, cell_symbols[symbols[i]].clone()))
                        .collect(),
                });
            }
            // odometer over the cell symbols, last tape fastest
            let mut tape = n_tapes;
            loop {
                if tape == 0 {
                    break;
                }
                tape -= 1;
                symbols[tape] += 1;
                if symbols[tape] < cell_symbols.len() {
                    break;
                }
                symbols[tape] = 0;
            }
            if symbols.iter().all(|&index| index == 0) {
                break;
            }
        }

        let mut alphabet: Vec<Symbol> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for symbol in cell_symbols
            .iter()
            .take(cell_symbols.len() - 1)
            .cloned()
            .chain(packed.iter().map(Packed::render))
        {
            if seen.insert(symbol.clone()) {
                alphabet.push(symbol);
            }
        }

        let table = TransitionTable::new(0, 1, alphabet)?;
        Ok(Self {
            source,
            n_tapes,
            cell_symbols,
            packed,
            table,
            next_id: 0,
            copying: BTreeMap::new(),
            sweep: 0,
            reading: BTreeMap::new(),
            writing: BTreeMap::new(),
            moving_right: BTreeMap::new(),
            moving_left: BTreeMap::new(),
            seek: None,
            cleanup: BTreeMap::new(),
        })
    }

    fn alloc(&mut self) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Enumerates every stage state and gives it a fresh ID, in a fixed order.
    fn allocate(&mut self) {
        let init = self.alloc();
        debug_assert_eq!(init, INIT);

        for symbol in self.cell_symbols.clone() {
            for placed in [false, true] {
                let id = self.alloc();
                self.copying.insert((symbol.clone(), placed), id);
            }
        }
        self.sweep = self.alloc();

        // every masked variant of every read vector the source can consult
        let mut states = self.source.observed_states();
        states.insert(0);
        for state in states {
            let mut saves: Vec<Save> = vec![vec![None; self.n_tapes]];
            for (t_in, _) in self.source.iter() {
                if t_in.state != state {
                    continue;
                }
                for mask in 0..1usize << self.n_tapes {
                    let save: Save = t_in
                        .reads
                        .iter()
                        .enumerate()
                        .map(|(i, read)| (mask >> i & 1 == 1).then(|| read.clone()))
                        .collect();
                    if !saves.contains(&save) {
                        saves.push(save);
                    }
                }
            }
            for save in saves {
                let id = self.alloc();
                self.reading.insert((state, save), id);
            }
        }

        for (_, t_out) in self.source.iter() {
            let key = (t_out.state, t_out.actions.clone());
            if !self.writing.contains_key(&key) {
                let id = self.alloc();
                self.writing.insert(key, id);
            }
        }

        for (_, t_out) in self.source.iter() {
            let directions: Vec<Direction> =
                t_out.actions.iter().map(|action| action.direction).collect();
            if self
                .moving_right
                .contains_key(&(t_out.state, directions.clone(), 0))
            {
                continue;
            }
            let rights = direction_mask(&directions, Direction::Right);
            for found in submasks(rights) {
                let id = self.alloc();
                self.moving_right
                    .insert((t_out.state, directions.clone(), found), id);
            }
        }

        for (_, t_out) in self.source.iter() {
            let directions: Vec<Direction> = t_out
                .actions
                .iter()
                .map(|action| retire_right(action.direction))
                .collect();
            if self
                .moving_left
                .contains_key(&(t_out.state, directions.clone(), 0))
            {
                continue;
            }
            let lefts = direction_mask(&directions, Direction::Left);
            for found in submasks(lefts) {
                let id = self.alloc();
                self.moving_left
                    .insert((t_out.state, directions.clone(), found), id);
            }
        }

        if self
            .source
            .iter()
            .any(|(_, t_out)| t_out.state == State::End(EndState::Halt))
        {
            self.seek = Some(self.alloc());
            for symbol in self.cell_symbols.clone() {
                let id = self.alloc();
                self.cleanup.insert(symbol, id);
            }
        }

        log::debug!(
            "allocated {} states: {} copying, {} reading, {} writing, {} moving right, {} moving left, {} cleanup",
            self.next_id,
            self.copying.len(),
            self.reading.len(),
            self.writing.len(),
            self.moving_right.len(),
            self.moving_left.len(),
            self.cleanup.len() + self.seek.iter().len(),
        );
    }

    fn generate(&mut self) -> Result<(), MachineError> {
        self.generate_init_copy()?;
        self.generate_reading()?;
        self.generate_writing()?;
        self.generate_moving_right()?;
        self.generate_moving_left()?;
        self.generate_cleanup()?;
        log::debug!("generated {} transitions", self.table.len());
        Ok(())
    }

    /// Init-Copy: overwrite the first raw cell with the start symbol, shift
    /// every raw symbol one cell right in compressed form, plant all heads on
    /// the first compressed cell, and sweep back to the start symbol.
    fn generate_init_copy(&mut self) -> Result<(), MachineError> {
        let clear_start = Packed::start(self.n_tapes, 0).render();
        for symbol in &self.cell_symbols {
            let target = expect_state(&self.copying, &(symbol.clone(), false), "copying")?;
            add(
                &mut self.table,
                INIT,
                symbol.clone(),
                State::Active(target),
                clear_start.clone(),
                Direction::Right,
            )?;
        }

        for ((remembered, placed), &id) in &self.copying {
            let payload = Packed::payload(self.n_tapes, remembered, !placed).render();
            for symbol in &self.cell_symbols {
                if symbol == BLANK_SYMBOL {
                    // the input ends here: place the last symbol and turn back
                    add(
                        &mut self.table,
                        id,
                        symbol.clone(),
                        State::Active(self.sweep),
                        payload.clone(),
                        Direction::Left,
                    )?;
                } else {
                    let target = expect_state(&self.copying, &(symbol.clone(), true), "copying")?;
                    add(
                        &mut self.table,
                        id,
                        symbol.clone(),
                        State::Active(target),
                        payload.clone(),
                        Direction::Right,
                    )?;
                }
            }
        }

        let ready = expect_state(&self.reading, &(0, vec![None; self.n_tapes]), "reading")?;
        for pack in &self.packed {
            let rendered = pack.render();
            if pack.is_start() {
                if pack.markers() == 0 {
                    add(
                        &mut self.table,
                        self.sweep,
                        rendered.clone(),
                        State::Active(ready),
                        rendered,
                        Direction::Neutral,
                    )?;
                }
            } else {
                add(
                    &mut self.table,
                    self.sweep,
                    rendered.clone(),
                    State::Active(self.sweep),
                    rendered,
                    Direction::Left,
                )?;
            }
        }
        Ok(())
    }

    /// Read: walk right, collecting the cell symbol of every marked track into
    /// the save; at the terminating blank, look the completed save up in the
    /// source table and turn back into the Write stage for its outcome.
    fn generate_reading(&mut self) -> Result<(), MachineError> {
        for ((state, save), &id) in &self.reading {
            for pack in &self.packed {
                let markers = pack.markers();
                // a second head for an already-saved tape can't happen
                if bits(markers, self.n_tapes).any(|tape| save[tape].is_some()) {
                    continue;
                }
                let mut next_save = save.clone();
                for tape in bits(markers, self.n_tapes) {
                    next_save[tape] = Some(pack.symbol(tape).clone());
                }
                // saves inconsistent with every source read vector are dead
                // ends; leaving them out lets the implicit Reject take over
                let Some(&target) = self.reading.get(&(*state, next_save)) else {
                    continue;
                };
                add(
                    &mut self.table,
                    id,
                    pack.render(),
                    State::Active(target),
                    pack.render(),
                    Direction::Right,
                )?;
            }

            let complete: Option<Vec<Symbol>> = save.iter().cloned().collect();
            if let Some(reads) = complete {
                let out = self.source.lookup(*state, &reads);
                let target = expect_state(&self.writing, &(out.state, out.actions), "writing")?;
                add(
                    &mut self.table,
                    id,
                    BLANK_SYMBOL.to_string(),
                    State::Active(target),
                    BLANK_SYMBOL.to_string(),
                    Direction::Left,
                )?;
            }
        }
        Ok(())
    }

    /// Write: walk left, replacing the cell symbol of every marked track with
    /// that tape's write; hand over to Move-Right at the start symbol.
    fn generate_writing(&mut self) -> Result<(), MachineError> {
        for ((state, actions), &id) in &self.writing {
            let directions: Vec<Direction> =
                actions.iter().map(|action| action.direction).collect();
            for pack in &self.packed {
                let markers = pack.markers();
                if pack.is_start() {
                    // the sentinel tracks only ever take the sentinel back
                    if bits(markers, self.n_tapes).any(|tape| actions[tape].write != START_SYMBOL)
                    {
                        continue;
                    }
                    let target = expect_state(
                        &self.moving_right,
                        &(*state, directions.clone(), 0),
                        "moving right",
                    )?;
                    add(
                        &mut self.table,
                        id,
                        pack.render(),
                        State::Active(target),
                        pack.render(),
                        Direction::Neutral,
                    )?;
                } else {
                    // a sentinel may never appear outside the start symbol
                    if bits(markers, self.n_tapes).any(|tape| actions[tape].write == START_SYMBOL)
                    {
                        continue;
                    }
                    let mut written = pack.clone();
                    for tape in bits(markers, self.n_tapes) {
                        written.tracks[tape].1 = actions[tape].write.clone();
                    }
                    add(
                        &mut self.table,
                        id,
                        pack.render(),
                        State::Active(id),
                        written.render(),
                        Direction::Left,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Move-Right: walk right from the start symbol, picking up marked heads
    /// whose tape moves right and dropping them one cell along; append a fresh
    /// compressed blank when heads run off the end.
    fn generate_moving_right(&mut self) -> Result<(), MachineError> {
        for ((state, directions, found), &id) in &self.moving_right {
            let rights = direction_mask(directions, Direction::Right);
            for pack in &self.packed {
                let markers = pack.markers();
                // the carried head would collide with another for the same tape
                if markers & found != 0 {
                    continue;
                }
                let picked = markers & rights;
                let updated = pack.with_markers(markers & !picked | found);
                let target = expect_state(
                    &self.moving_right,
                    &(*state, directions.clone(), picked),
                    "moving right",
                )?;
                add(
                    &mut self.table,
                    id,
                    pack.render(),
                    State::Active(target),
                    updated.render(),
                    Direction::Right,
                )?;
            }

            if *found != 0 {
                // tape expansion: drop the carried heads on a fresh blank cell
                let target = expect_state(
                    &self.moving_right,
                    &(*state, directions.clone(), 0),
                    "moving right",
                )?;
                add(
                    &mut self.table,
                    id,
                    BLANK_SYMBOL.to_string(),
                    State::Active(target),
                    Packed::blank(self.n_tapes, *found).render(),
                    Direction::Right,
                )?;
            } else {
                let retired: Vec<Direction> = directions
                    .iter()
                    .map(|&direction| retire_right(direction))
                    .collect();
                let target =
                    expect_state(&self.moving_left, &(*state, retired, 0), "moving left")?;
                add(
                    &mut self.table,
                    id,
                    BLANK_SYMBOL.to_string(),
                    State::Active(target),
                    BLANK_SYMBOL.to_string(),
                    Direction::Left,
                )?;
            }
        }
        Ok(())
    }

    /// Move-Left: the mirror sweep. The cycle ends at the start symbol: end
    /// states pass through, Halt detours into Cleanup, and anything else
    /// re-enters the Read stage for the next source state.
    fn generate_moving_left(&mut self) -> Result<(), MachineError> {
        for ((state, directions, found), &id) in &self.moving_left {
            let lefts = direction_mask(directions, Direction::Left);
            for pack in &self.packed {
                let markers = pack.markers();
                if markers & found != 0 {
                    continue;
                }
                if pack.is_start() {
                    // a head on the sentinel can't move further left
                    if markers & lefts != 0 {
                        continue;
                    }
                    let updated = pack.with_markers(markers | found);
                    let next = match state {
                        State::End(EndState::Halt) => match self.seek {
                            Some(seek) => State::Active(seek),
                            None => continue,
                        },
                        State::End(end) => State::End(*end),
                        State::Active(source_state) => {
                            let ready = expect_state(
                                &self.reading,
                                &(*source_state, vec![None; self.n_tapes]),
                                "reading",
                            )?;
                            State::Active(ready)
                        }
                    };
                    add(
                        &mut self.table,
                        id,
                        pack.render(),
                        next,
                        updated.render(),
                        Direction::Neutral,
                    )?;
                } else {
                    let picked = markers & lefts;
                    let updated = pack.with_markers(markers & !picked | found);
                    let target = expect_state(
                        &self.moving_left,
                        &(*state, directions.clone(), picked),
                        "moving left",
                    )?;
                    add(
                        &mut self.table,
                        id,
                        pack.render(),
                        State::Active(target),
                        updated.render(),
                        Direction::Left,
                    )?;
                }
            }
        }
        Ok(())
    }

    /// Cleanup: seek the terminating blank, then walk left writing the last
    /// track's raw symbol shifted one cell leftward, erasing the artificial
    /// start cell last.
    fn generate_cleanup(&mut self) -> Result<(), MachineError> {
        let Some(seek) = self.seek else {
            return Ok(());
        };

        for pack in &self.packed {
            let rendered = pack.render();
            add(
                &mut self.table,
                seek,
                rendered.clone(),
                State::Active(seek),
                rendered,
                Direction::Right,
            )?;
        }
        let blank = BLANK_SYMBOL.to_string();
        let start_copy = expect_state(&self.cleanup, &blank, "cleanup")?;
        add(
            &mut self.table,
            seek,
            blank.clone(),
            State::Active(start_copy),
            blank,
            Direction::Left,
        )?;

        let last = self.n_tapes - 1;
        for (remembered, &id) in &self.cleanup {
            for pack in &self.packed {
                if pack.is_start() {
                    add(
                        &mut self.table,
                        id,
                        pack.render(),
                        State::End(EndState::Halt),
                        remembered.clone(),
                        Direction::Neutral,
                    )?;
                } else {
                    let target = expect_state(&self.cleanup, pack.symbol(last), "cleanup")?;
                    add(
                        &mut self.table,
                        id,
                        pack.render(),
                        State::Active(target),
                        remembered.clone(),
                        Direction::Left,
                    )?;
                }
            }
        }
        Ok(())
    }

    fn finish(mut self) -> Result<TransitionTable, MachineError> {
        self.table.recount_states();
        log::debug!(
            "compiled {} tapes down to 1: {} states, {} transitions, {} symbols",
            self.n_tapes,
            self.table.n_states(),
            self.table.len(),
            self.table.alphabet().len(),
        );
        Ok(self.table)
    }
}

/// Inserts a single-tape transition.
fn add(
    table: &mut TransitionTable,
    state: usize,
    read: Symbol,
    next: State,
    write: Symbol,
    direction: Direction,
) -> Result<(), MachineError> {
    table.insert(
        TransitionIn {
            state,
            reads: vec![read],
        },
        TransitionOut {
            state: next,
            actions: vec![Action { write, direction }],
        },
    )
}

/// Looks up a state the allocation pass is guaranteed to have created.
fn expect_state<K: Ord + std::fmt::Debug>(
    map: &BTreeMap<K, usize>,
    key: &K,
    stage: &str,
) -> Result<usize, MachineError> {
    map.get(key).copied().ok_or_else(|| {
        MachineError::Validation(format!("no {stage} state was allocated for {key:?}"))
    })
}

/// The tapes moving in `direction`, as a bit set.
fn direction_mask(directions: &[Direction], direction: Direction) -> usize {
    directions
        .iter()
        .enumerate()
        .filter(|(_, &d)| d == direction)
        .fold(0, |mask, (i, _)| mask | 1 << i)
}

/// Right moves are done after the Move-Right sweep; they become neutral for
/// the Move-Left stage's direction vector.
fn retire_right(direction: Direction) -> Direction {
    match direction {
        Direction::Right => Direction::Neutral,
        other => other,
    }
}

/// All subsets of a bit set, ascending.
fn submasks(mask: usize) -> impl Iterator<Item = usize> {
    (0..=mask).filter(move |m| m & !mask == 0)
}

/// The indices of the set bits.
fn bits(mask: usize, width: usize) -> impl Iterator<Item = usize> {
    (0..width).filter(move |i| mask >> i & 1 == 1)
}
