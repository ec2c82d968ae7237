//! This module implements the semi-infinite machine tape. A tape starts with the
//! sentinel `S` in cell 0, the machine input in cells 1.., and a single trailing
//! blank; it grows by one blank cell whenever the head runs off the right edge.
//!
//! There are two cell granularities behind one trait: [`SingleTape`] treats every
//! character of the input as one cell, while [`MultiTape`] allows multi-character
//! cell symbols (used to display and run compiled machines, whose "compressed"
//! symbols pack one marker/symbol pair per source tape).

use crate::types::{Direction, Symbol, TapeViolation, BLANK_SYMBOL, START_SYMBOL};

/// The operations shared by both tape flavors.
pub trait Tape {
    /// Creates a tape holding only the sentinel and one blank, head on the blank.
    fn empty() -> Self
    where
        Self: Sized;

    /// Creates a tape holding the sentinel, the input, and one trailing blank,
    /// head on the first input cell.
    fn with_input(input: &str) -> Self
    where
        Self: Sized;

    /// The symbol under the head.
    fn read(&self) -> &Symbol;

    /// Checks whether writing `symbol` and then moving in `direction` would be
    /// legal, without touching the tape. The executor uses this to validate a
    /// whole step before mutating anything.
    fn check(&self, symbol: &Symbol, direction: Direction) -> Result<(), TapeViolation>;

    /// Writes `symbol` over the cell under the head.
    fn write(&mut self, symbol: Symbol) -> Result<(), TapeViolation>;

    /// Moves the head one cell, growing the tape with a blank when the head
    /// passes the right edge.
    fn move_head(&mut self, direction: Direction) -> Result<(), TapeViolation>;

    /// The tape contents from cell 1 through the last non-blank cell, with
    /// trailing blanks stripped and interior blanks preserved.
    fn output(&self) -> String;

    /// A diagnostic rendering of the tape with a caret under the head.
    fn render(&self) -> String;

    /// All cells, including the sentinel.
    fn cells(&self) -> &[Symbol];

    /// The head position.
    fn head(&self) -> usize;
}

/// Cell storage and the rules shared by both tape flavors.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Cells {
    cells: Vec<Symbol>,
    head: usize,
}

impl Cells {
    fn new(mut inner: Vec<Symbol>) -> Self {
        let mut cells = vec![START_SYMBOL.to_string()];
        cells.append(&mut inner);
        cells.push(BLANK_SYMBOL.to_string());
        Self { cells, head: 1 }
    }

    fn read(&self) -> &Symbol {
        &self.cells[self.head]
    }

    fn check_write(&self, symbol: &Symbol) -> Result<(), TapeViolation> {
        if self.read() == START_SYMBOL && symbol != START_SYMBOL {
            return Err(TapeViolation::SentinelOverwritten(symbol.clone()));
        }
        if self.read() != START_SYMBOL && symbol == START_SYMBOL {
            return Err(TapeViolation::SentinelMisplaced);
        }
        Ok(())
    }

    fn check_move(&self, direction: Direction) -> Result<(), TapeViolation> {
        if direction == Direction::Left && self.head == 0 {
            return Err(TapeViolation::HeadUnderflow);
        }
        Ok(())
    }

    fn write(&mut self, symbol: Symbol) -> Result<(), TapeViolation> {
        self.check_write(&symbol)?;
        self.cells[self.head] = symbol;
        Ok(())
    }

    fn move_head(&mut self, direction: Direction) -> Result<(), TapeViolation> {
        self.check_move(direction)?;
        match direction {
            Direction::Left => self.head -= 1,
            Direction::Right => self.head += 1,
            Direction::Neutral => {}
        }
        // we don't actually have infinite memory; grow on demand
        if self.head >= self.cells.len() {
            self.cells.push(BLANK_SYMBOL.to_string());
        }
        Ok(())
    }

    fn output(&self) -> String {
        let mut end = self.cells.len();
        while end > 1 && self.cells[end - 1] == BLANK_SYMBOL {
            end -= 1;
        }
        self.cells[1..end].concat()
    }

    /// Renders the cells with the given separator and puts a caret under the
    /// first character of the cell the head is on.
    fn render_with(&self, separator: &str) -> String {
        let line = self
            .cells
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(separator);
        let offset: usize = self.cells[..self.head]
            .iter()
            .map(|cell| cell.len() + separator.len())
            .sum();
        format!("{line}\n{}^", " ".repeat(offset))
    }
}

/// A tape whose cells each hold a single character.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SingleTape(Cells);

impl Tape for SingleTape {
    fn empty() -> Self {
        Self(Cells::new(Vec::new()))
    }

    fn with_input(input: &str) -> Self {
        Self(Cells::new(input.chars().map(|c| c.to_string()).collect()))
    }

    fn read(&self) -> &Symbol {
        self.0.read()
    }

    fn check(&self, symbol: &Symbol, direction: Direction) -> Result<(), TapeViolation> {
        self.0.check_write(symbol)?;
        self.0.check_move(direction)
    }

    fn write(&mut self, symbol: Symbol) -> Result<(), TapeViolation> {
        self.0.write(symbol)
    }

    fn move_head(&mut self, direction: Direction) -> Result<(), TapeViolation> {
        self.0.move_head(direction)
    }

    fn output(&self) -> String {
        self.0.output()
    }

    fn render(&self) -> String {
        self.0.render_with("")
    }

    fn cells(&self) -> &[Symbol] {
        &self.0.cells
    }

    fn head(&self) -> usize {
        self.0.head
    }
}

/// A tape whose cells hold non-empty strings.
///
/// Inputs containing `|` are split on it, one part per cell; anything else is
/// split per character like [`SingleTape`]. Rendering joins cells with `|` so
/// multi-character cells stay readable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiTape(Cells);

impl Tape for MultiTape {
    fn empty() -> Self {
        Self(Cells::new(Vec::new()))
    }

    fn with_input(input: &str) -> Self {
        let cells = if input.contains('|') {
            input
                .split('|')
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        } else {
            input.chars().map(|c| c.to_string()).collect()
        };
        Self(Cells::new(cells))
    }

    fn read(&self) -> &Symbol {
        self.0.read()
    }

    fn check(&self, symbol: &Symbol, direction: Direction) -> Result<(), TapeViolation> {
        self.0.check_write(symbol)?;
        self.0.check_move(direction)
    }

    fn write(&mut self, symbol: Symbol) -> Result<(), TapeViolation> {
        self.0.write(symbol)
    }

    fn move_head(&mut self, direction: Direction) -> Result<(), TapeViolation> {
        self.0.move_head(direction)
    }

    fn output(&self) -> String {
        self.0.output()
    }

    fn render(&self) -> String {
        self.0.render_with("|")
    }

    fn cells(&self) -> &[Symbol] {
        &self.0.cells
    }

    fn head(&self) -> usize {
        self.0.head
    }
}
