//! The two-sided unbounded tape.
//!
//! The tape is kept as two stacks meeting at the head. `left` holds the cells left of
//! the head in positional order; `right` holds the head cell and everything right of
//! it in reverse order, so its top is the head cell. Moving and reading are O(1), and
//! cells that were never touched are not stored at all.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Symbol;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tape {
    left: Vec<Symbol>,
    right: Vec<Symbol>,
    blank: Symbol,
}

impl Tape {
    /// Creates a tape holding `cells` with the head at offset `head`.
    ///
    /// A head past the end of `cells` is padded with blanks up to its position.
    pub fn new(cells: &[Symbol], head: usize, blank: Symbol) -> Self {
        let split = head.min(cells.len());
        let mut left = cells[..split].to_vec();
        left.resize(head, blank);
        let right = cells[split..].iter().rev().copied().collect();

        Self { left, right, blank }
    }

    /// Creates an empty tape.
    pub fn blank(blank: Symbol) -> Self {
        Self::new(&[], 0, blank)
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> Symbol {
        self.right.last().copied().unwrap_or(self.blank)
    }

    /// Overwrites the cell under the head, materializing it if needed.
    pub fn write(&mut self, symbol: Symbol) {
        match self.right.last_mut() {
            Some(cell) => *cell = symbol,
            None => self.right.push(symbol),
        }
    }

    pub fn move_right(&mut self) {
        let symbol = self.right.pop().unwrap_or(self.blank);
        self.left.push(symbol);
    }

    pub fn move_left(&mut self) {
        let symbol = self.left.pop().unwrap_or(self.blank);
        self.right.push(symbol);
    }

    /// The head's index into [`Tape::cells`].
    pub fn head(&self) -> usize {
        self.left.len()
    }

    /// The materialized cells, leftmost first.
    pub fn cells(&self) -> Vec<Symbol> {
        self.left
            .iter()
            .chain(self.right.iter().rev())
            .copied()
            .collect()
    }

    /// Cells left of the head, in positional order.
    pub fn left(&self) -> &[Symbol] {
        &self.left
    }

    /// The head cell and everything right of it, head last.
    pub fn right(&self) -> &[Symbol] {
        &self.right
    }

    pub fn blank_symbol(&self) -> Symbol {
        self.blank
    }
}

/// Writes the materialized cells, left to right.
impl fmt::Display for Tape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.left
            .iter()
            .chain(self.right.iter().rev())
            .try_for_each(|symbol| write!(f, "{symbol}"))
    }
}
