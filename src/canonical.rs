//! State canonicalization: renumbering states into the `"0"`/`"1"`/`"2"`... convention
//! expected by the interchange encoder.

use log::debug;
use std::collections::BTreeMap;

use crate::analyzer::reachable_states;
use crate::table::Table;
use crate::types::{State, HALT_STATE, START_STATE};

/// Renames the states reachable from `start` to canonical numbers.
///
/// `start` becomes `"1"`. A reachable state already named `"0"` with no outgoing
/// entries keeps its name as the halt state. Every other reachable state gets the
/// next number from `2` up: numeric names first in numeric order, then the rest by
/// name. Renumbering a canonical table is therefore the identity. Unreachable rows are
/// dropped and every mapped state owns a row in the result.
///
/// Returns the new table together with the old-to-new name map, which is a bijection
/// from the reachable states onto the new names.
pub fn canonicalize(table: &Table, start: &str) -> (Table, BTreeMap<State, State>) {
    let reachable = reachable_states(table, start);

    let mut mapping = BTreeMap::new();
    mapping.insert(start.to_string(), START_STATE.to_string());
    if start != HALT_STATE && reachable.contains(HALT_STATE) && table.is_halting(HALT_STATE) {
        mapping.insert(HALT_STATE.to_string(), HALT_STATE.to_string());
    }

    let mut rest: Vec<&State> = reachable
        .iter()
        .filter(|s| !mapping.contains_key(*s))
        .collect();
    rest.sort_by(|a, b| order_key(a).cmp(&order_key(b)));
    for (state, id) in rest.into_iter().zip(2..) {
        mapping.insert(state.clone(), id.to_string());
    }

    let mut reduced = Table::new();
    for (state, row) in table.rows().filter(|(state, _)| mapping.contains_key(*state)) {
        reduced.insert_state(state);
        for (&symbol, entry) in row {
            reduced.insert(state, symbol, entry.clone());
        }
    }

    let mut canonical =
        reduced.rename_states(|state| mapping.get(state).cloned().unwrap_or_else(|| state.to_string()));
    for name in mapping.values() {
        canonical.insert_state(name);
    }

    debug!(
        "canonicalized {} reachable states ({} dropped)",
        mapping.len(),
        table.states().filter(|s| !mapping.contains_key(*s)).count()
    );
    (canonical, mapping)
}

/// Sorts plain numerals by value ahead of every other name.
fn order_key(state: &str) -> (bool, u64, &str) {
    match state.parse::<u64>() {
        Ok(n) if n.to_string() == state => (false, n, ""),
        _ => (true, 0, state),
    }
}
