//! This module defines the `Machine` struct, which executes a fully expanded transition
//! table over a [`Tape`]. It handles the machine's state, head movements and the
//! halting condition.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::tape::Tape;
use crate::types::{Direction, Program, State, Step, Symbol, Transition, TuringMachineError};

type Rules = BTreeMap<State, BTreeMap<Symbol, Transition>>;

/// Represents a single-tape Turing Machine.
///
/// The machine owns its table and tape exclusively. It halts when no transition is
/// defined for the current state and symbol; there is no step limit, so a machine
/// that never reaches such a pair runs forever under [`Machine::run`].
#[derive(Debug, Clone)]
pub struct Machine {
    state: State,
    rules: Rules,
    tape: Tape,
    program: Program,
    step_count: usize,
}

/// A serializable view of a machine's configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    pub state: State,
    pub left: Vec<Symbol>,
    pub right: Vec<Symbol>,
    pub tape: String,
    pub head: usize,
    pub steps: usize,
}

impl Machine {
    /// Creates a new `Machine` from a `Program`.
    ///
    /// # Returns
    ///
    /// * `Ok(Machine)` if every entry of the program's table is a primitive transition.
    /// * `Err(TuringMachineError::MalformedTable)` if a macro entry is left unexpanded.
    pub fn new(program: &Program) -> Result<Self, TuringMachineError> {
        let mut rules = Rules::new();
        for (state, symbol, entry) in program.table.entries() {
            let transition = entry
                .as_transition()
                .ok_or_else(|| TuringMachineError::unexpanded(state, symbol))?;
            rules
                .entry(state.clone())
                .or_default()
                .insert(symbol, transition.clone());
        }

        Ok(Self {
            state: program.initial_state.clone(),
            rules,
            tape: Tape::new(&program.tape, program.head, program.blank),
            program: program.clone(),
            step_count: 0,
        })
    }

    /// Executes a single step.
    ///
    /// # Returns
    ///
    /// * `Step::Continue` if a transition was applied.
    /// * `Step::Halt` if no transition is defined for the current state and symbol.
    pub fn step(&mut self) -> Step {
        let Some(transition) = self.transition().cloned() else {
            return Step::Halt;
        };

        if let Some(symbol) = transition.write {
            self.tape.write(symbol);
        }

        match transition.direction {
            Direction::Left => self.tape.move_left(),
            Direction::Right => self.tape.move_right(),
            Direction::Stay => {}
        }

        self.state = transition.next_state;
        self.step_count += 1;

        Step::Continue
    }

    /// Runs until the machine halts and returns the number of steps taken by this call.
    pub fn run(&mut self) -> usize {
        let start = self.step_count;
        while self.step() == Step::Continue {}
        self.step_count - start
    }

    /// Returns the transition that the next step would apply.
    pub fn transition(&self) -> Option<&Transition> {
        self.rules
            .get(&self.state)
            .and_then(|row| row.get(&self.tape.read()))
    }

    /// Checks whether the next step would halt.
    pub fn is_halted(&self) -> bool {
        self.transition().is_none()
    }

    /// Returns the current state.
    pub fn state(&self) -> &str {
        &self.state
    }

    /// Returns the symbol under the head.
    pub fn read(&self) -> Symbol {
        self.tape.read()
    }

    pub fn write(&mut self, symbol: Symbol) {
        self.tape.write(symbol);
    }

    pub fn move_left(&mut self) {
        self.tape.move_left();
    }

    pub fn move_right(&mut self) {
        self.tape.move_right();
    }

    /// Returns the materialized tape, leftmost cell first.
    pub fn cells(&self) -> Vec<Symbol> {
        self.tape.cells()
    }

    /// Returns the head's index into [`Machine::cells`].
    pub fn head(&self) -> usize {
        self.tape.head()
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    /// Returns the total number of steps executed since creation or the last reset.
    pub fn step_count(&self) -> usize {
        self.step_count
    }

    /// Returns the program this machine was built from.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Replaces the tape, keeping the current state.
    pub fn set_tape(&mut self, cells: &[Symbol], head: usize) {
        self.tape = Tape::new(cells, head, self.program.blank);
    }

    /// Resets the state, tape and step count to the program's initial configuration.
    pub fn reset(&mut self) {
        self.state = self.program.initial_state.clone();
        self.tape = Tape::new(&self.program.tape, self.program.head, self.program.blank);
        self.step_count = 0;
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            state: self.state.clone(),
            left: self.tape.left().to_vec(),
            right: self.tape.right().to_vec(),
            tape: self.tape.to_string(),
            head: self.tape.head(),
            steps: self.step_count,
        }
    }
}
