//! Transition tables: a mapping from `(state, symbol)` to either a primitive
//! transition or a macro reference awaiting expansion.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::macros::Macro;
use crate::types::{State, Symbol, Transition};

/// The value stored for a `(state, symbol)` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Transition(Transition),
    Macro(Macro),
}

impl Entry {
    /// Returns the primitive transition, or `None` for a macro reference.
    pub fn as_transition(&self) -> Option<&Transition> {
        match self {
            Entry::Transition(t) => Some(t),
            Entry::Macro(_) => None,
        }
    }

    pub fn is_macro(&self) -> bool {
        matches!(self, Entry::Macro(_))
    }
}

impl From<Transition> for Entry {
    fn from(transition: Transition) -> Self {
        Entry::Transition(transition)
    }
}

impl From<Macro> for Entry {
    fn from(call: Macro) -> Self {
        Entry::Macro(call)
    }
}

/// The entries of a single state, keyed by the symbol under the head.
pub type Row = BTreeMap<Symbol, Entry>;

/// A transition table.
///
/// States may own an empty row, which makes them explicit halting states. Iteration
/// order is the sorted order of state names, so every pass over a table is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    rows: BTreeMap<State, Row>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensures `state` owns a row, leaving existing entries untouched.
    pub fn insert_state(&mut self, state: &str) {
        if !self.rows.contains_key(state) {
            self.rows.insert(state.to_string(), Row::new());
        }
    }

    /// Sets the entry for `(state, symbol)`, returning the previous one.
    pub fn insert(&mut self, state: &str, symbol: Symbol, entry: impl Into<Entry>) -> Option<Entry> {
        self.insert_state(state);
        self.rows
            .get_mut(state)
            .and_then(|row| row.insert(symbol, entry.into()))
    }

    pub fn remove(&mut self, state: &str, symbol: Symbol) -> Option<Entry> {
        self.rows.get_mut(state).and_then(|row| row.remove(&symbol))
    }

    pub fn get(&self, state: &str, symbol: Symbol) -> Option<&Entry> {
        self.rows.get(state).and_then(|row| row.get(&symbol))
    }

    /// Returns the primitive transition for `(state, symbol)`, if one is defined.
    pub fn transition(&self, state: &str, symbol: Symbol) -> Option<&Transition> {
        self.get(state, symbol).and_then(Entry::as_transition)
    }

    pub fn row(&self, state: &str) -> Option<&Row> {
        self.rows.get(state)
    }

    pub fn contains_state(&self, state: &str) -> bool {
        self.rows.contains_key(state)
    }

    /// Iterates over the states owning a row.
    pub fn states(&self) -> impl Iterator<Item = &State> {
        self.rows.keys()
    }

    /// Iterates over rows in state order.
    pub fn rows(&self) -> impl Iterator<Item = (&State, &Row)> {
        self.rows.iter()
    }

    /// Iterates over every `(state, symbol, entry)` triple.
    pub fn entries(&self) -> impl Iterator<Item = (&State, Symbol, &Entry)> {
        self.rows
            .iter()
            .flat_map(|(state, row)| row.iter().map(move |(symbol, entry)| (state, *symbol, entry)))
    }

    /// Returns the number of `(state, symbol)` entries.
    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every state the table mentions: row owners, transition targets and macro
    /// return states.
    pub fn all_states(&self) -> BTreeSet<State> {
        let mut states: BTreeSet<State> = self.rows.keys().cloned().collect();
        for (_, _, entry) in self.entries() {
            states.insert(entry_target(entry).clone());
        }
        states
    }

    /// Returns the states reachable in one step from `state`.
    pub fn successors(&self, state: &str) -> Vec<&State> {
        self.rows
            .get(state)
            .map(|row| row.values().map(entry_target).collect())
            .unwrap_or_default()
    }

    /// Returns `true` if `state` has no outgoing entries.
    pub fn is_halting(&self, state: &str) -> bool {
        self.rows.get(state).is_none_or(BTreeMap::is_empty)
    }

    pub fn has_macros(&self) -> bool {
        self.entries().any(|(_, _, entry)| entry.is_macro())
    }

    /// Returns the first macro entry in iteration order.
    pub fn first_macro(&self) -> Option<(State, Symbol, Macro)> {
        self.entries().find_map(|(state, symbol, entry)| match entry {
            Entry::Macro(call) => Some((state.clone(), symbol, call.clone())),
            Entry::Transition(_) => None,
        })
    }

    /// Every symbol the table reads, writes, or hands to a macro.
    pub fn alphabet(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        for (_, symbol, entry) in self.entries() {
            symbols.insert(symbol);
            match entry {
                Entry::Transition(t) => symbols.extend(t.write),
                Entry::Macro(call) => symbols.extend(call.kind.alphabet()),
            }
        }
        symbols
    }

    /// Union of two tables. Keys defined by both keep `self`'s entry; rows that only
    /// `other` owns (including empty ones) are added.
    pub fn merge(mut self, other: Table) -> Table {
        for (state, row) in other.rows {
            let target = self.rows.entry(state).or_default();
            for (symbol, entry) in row {
                target.entry(symbol).or_insert(entry);
            }
        }
        self
    }

    /// Derives a state name from `base` that the table does not mention yet.
    pub fn fresh_state(&self, base: &str) -> State {
        let taken = self.all_states();
        let mut name = base.to_string();
        while taken.contains(&name) {
            name.push('\'');
        }
        name
    }

    /// Returns a copy with every state name passed through `rename`.
    pub fn rename_states(&self, mut rename: impl FnMut(&str) -> State) -> Table {
        let mut out = Table::new();
        for (state, row) in &self.rows {
            let renamed = rename(state);
            out.insert_state(&renamed);
            for (symbol, entry) in row {
                let entry = match entry {
                    Entry::Transition(t) => Entry::Transition(Transition {
                        next_state: rename(&t.next_state),
                        ..t.clone()
                    }),
                    Entry::Macro(call) => Entry::Macro(Macro {
                        return_state: rename(&call.return_state),
                        ..call.clone()
                    }),
                };
                out.insert(&renamed, *symbol, entry);
            }
        }
        out
    }
}

fn entry_target(entry: &Entry) -> &State {
    match entry {
        Entry::Transition(t) => &t.next_state,
        Entry::Macro(call) => &call.return_state,
    }
}

impl<S: Into<State>> FromIterator<(S, Symbol, Transition)> for Table {
    fn from_iter<I: IntoIterator<Item = (S, Symbol, Transition)>>(iter: I) -> Self {
        let mut table = Table::new();
        for (state, symbol, transition) in iter {
            let state: State = state.into();
            table.insert(&state, symbol, transition);
        }
        table
    }
}
