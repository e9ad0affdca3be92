//! This module defines the core data structures shared by the execution engine and the
//! compiler passes: symbols, states, transitions, step outcomes, programs and error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::table::Table;
use crate::Rule;

/// A single tape symbol.
pub type Symbol = char;
/// A state identifier.
pub type State = String;

/// The default empty symbol used to fill unwritten tape cells.
pub const DEFAULT_BLANK_SYMBOL: Symbol = '0';
/// The canonical name of the halt state.
pub const HALT_STATE: &str = "0";
/// The canonical name of the start state.
pub const START_STATE: &str = "1";
/// The alphabet every canonical table is written over.
pub const BINARY_ALPHABET: [Symbol; 2] = ['0', '1'];

/// Represents the possible directions a Turing Machine head can move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    /// Move the head one position to the left.
    Left,
    /// Move the head one position to the right.
    Right,
    /// Keep the head in the same position.
    Stay,
}

impl Direction {
    /// Returns the opposite direction. `Stay` is its own reverse.
    pub fn reverse(self) -> Self {
        match self {
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
            Direction::Stay => Direction::Stay,
        }
    }
}

/// A primitive transition.
///
/// `write: None` leaves the read symbol untouched and `Direction::Stay` keeps the
/// head in place. A transition doing both a real write and a move is a quintuple;
/// one doing at most one of the two is a quadruple; one doing neither is null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// The state the machine enters after this transition.
    pub next_state: State,
    /// The symbol to write, if any.
    pub write: Option<Symbol>,
    /// The head movement applied after writing.
    pub direction: Direction,
}

impl Transition {
    pub fn new(next_state: impl Into<State>, write: Option<Symbol>, direction: Direction) -> Self {
        Self {
            next_state: next_state.into(),
            write,
            direction,
        }
    }

    /// A pure control transfer: no write, no move.
    pub fn null(next_state: impl Into<State>) -> Self {
        Self::new(next_state, None, Direction::Stay)
    }

    /// A write-only transition.
    pub fn write(next_state: impl Into<State>, symbol: Symbol) -> Self {
        Self::new(next_state, Some(symbol), Direction::Stay)
    }

    /// A move-only transition.
    pub fn shift(next_state: impl Into<State>, direction: Direction) -> Self {
        Self::new(next_state, None, direction)
    }

    /// Returns `true` if the transition neither writes nor moves.
    pub fn is_null(&self) -> bool {
        self.write.is_none() && self.direction == Direction::Stay
    }

    /// Returns `true` if, when taken on `read`, the transition both changes the
    /// cell and moves the head.
    pub fn is_quintuple(&self, read: Symbol) -> bool {
        matches!(self.write, Some(w) if w != read) && self.direction != Direction::Stay
    }
}

/// Represents the outcome of a Turing Machine execution step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// The machine performed a step and continues execution.
    Continue,
    /// No transition is defined for the current state and symbol.
    Halt,
}

/// A machine description: a transition table plus its initial configuration.
///
/// The table may still contain macro entries; `Machine::new` only accepts programs
/// whose tables have been expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    /// The name of the program.
    pub name: String,
    /// The state the machine starts in.
    pub initial_state: State,
    /// The initial tape contents.
    pub tape: Vec<Symbol>,
    /// The initial head offset into `tape`.
    pub head: usize,
    /// The empty symbol filling unwritten cells.
    pub blank: Symbol,
    /// The transition table.
    pub table: Table,
}

impl Program {
    pub fn new(name: impl Into<String>, initial_state: impl Into<State>, table: Table) -> Self {
        Self {
            name: name.into(),
            initial_state: initial_state.into(),
            tape: Vec::new(),
            head: 0,
            blank: DEFAULT_BLANK_SYMBOL,
            table,
        }
    }

    /// Replaces the initial tape and head offset.
    pub fn with_tape(mut self, tape: impl IntoIterator<Item = Symbol>, head: usize) -> Self {
        self.tape = tape.into_iter().collect();
        self.head = head;
        self
    }

    pub fn with_blank(mut self, blank: Symbol) -> Self {
        self.blank = blank;
        self
    }

    /// Returns a copy of this program running `table` instead.
    pub fn with_table(&self, table: Table) -> Self {
        Self {
            table,
            ..self.clone()
        }
    }

    /// Every symbol the program can observe: the table's alphabet, the initial tape
    /// and the blank symbol, sorted.
    pub fn alphabet(&self) -> Vec<Symbol> {
        let mut symbols = self.table.alphabet();
        symbols.extend(self.tape.iter().copied());
        symbols.insert(self.blank);
        symbols.into_iter().collect()
    }
}

/// Represents the errors raised while building, compiling or encoding machines.
///
/// Halting is not an error; see [`Step::Halt`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TuringMachineError {
    /// A macro was instantiated with an unusable parameter.
    #[error("Invalid macro parameter: {0}")]
    InvalidParameter(String),
    /// A table does not have the shape the current pass requires.
    #[error("Malformed table at state {state}: {reason}")]
    MalformedTable { state: State, reason: String },
    /// A transition has a shape the current pass cannot handle.
    #[error("Unsupported transition at state {state} on {symbol:?}: {reason}")]
    UnsupportedTransition {
        state: State,
        symbol: Symbol,
        reason: String,
    },
    /// A symbol is missing from the alphabet or binary code in use.
    #[error("Unknown symbol {symbol:?} in {location}")]
    UnknownSymbol { symbol: Symbol, location: String },
    /// Indicates an error during the parsing of a machine description.
    #[error("Program parsing error: {0}")]
    ParseError(#[from] Box<pest::error::Error<Rule>>),
    /// Indicates an error during the validation of a machine description.
    #[error("Program validation error: {0}")]
    ValidationError(String),
    /// Indicates an error related to file system operations.
    #[error("File error: {0}")]
    FileError(String),
    /// Indicates a malformed interchange encoding.
    #[error("Encoding error: {0}")]
    EncodingError(String),
}

impl TuringMachineError {
    pub(crate) fn unexpanded(state: &str, symbol: Symbol) -> Self {
        TuringMachineError::MalformedTable {
            state: state.to_string(),
            reason: format!("unexpanded macro on symbol {symbol:?}"),
        }
    }
}
