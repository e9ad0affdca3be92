//! Behaviour-preserving rewrites of primitive tables: quintuple splitting, null
//! transition elimination, halt unification and completion.
//!
//! Every pass takes a table by reference and builds a new one. Tables that still
//! carry macro entries are rejected with `MalformedTable`.

use log::{debug, warn};
use std::collections::BTreeSet;

use crate::table::{Entry, Table};
use crate::types::{Direction, State, Symbol, Transition, TuringMachineError, HALT_STATE};

fn primitive<'a>(
    state: &str,
    symbol: Symbol,
    entry: &'a Entry,
) -> Result<&'a Transition, TuringMachineError> {
    entry
        .as_transition()
        .ok_or_else(|| TuringMachineError::unexpanded(state, symbol))
}

/// Splits every quintuple transition into a write followed by a move.
///
/// A write of the symbol already under the head is dropped first, so only real
/// writes are split. The intermediate state is named `{state}.{symbol}`, primed until
/// it clashes with nothing in the input or the output.
pub fn to_quadruples(table: &Table) -> Result<Table, TuringMachineError> {
    let mut taken = table.all_states();
    let mut out = Table::new();
    let mut split = 0;

    for (state, row) in table.rows() {
        out.insert_state(state);
        for (&symbol, entry) in row {
            let mut transition = primitive(state, symbol, entry)?.clone();
            if transition.write == Some(symbol) {
                transition.write = None;
            }

            match transition.write {
                Some(written) if transition.direction != Direction::Stay => {
                    let mut mid = format!("{state}.{symbol}");
                    while taken.contains(&mid) {
                        mid.push('\'');
                    }
                    taken.insert(mid.clone());

                    out.insert(state, symbol, Transition::write(mid.clone(), written));
                    out.insert(
                        &mid,
                        written,
                        Transition::shift(transition.next_state, transition.direction),
                    );
                    split += 1;
                }
                _ => {
                    out.insert(state, symbol, transition);
                }
            }
        }
    }

    debug!("split {split} quintuple transitions");
    Ok(out)
}

enum Chain {
    Resolved(Transition),
    DeadEnd,
    Cycle,
}

/// Collapses every null transition into the transition its destination defines for
/// the same symbol, following chains of nulls transitively.
///
/// A chain ending where no entry exists deletes the entry, so the machine halts
/// there without side effects. A chain that loops back onto itself never halts; it
/// becomes a self-loop on the originating state that rewrites the symbol it reads,
/// which keeps the table free of nulls.
pub fn eliminate_nulls(table: &Table) -> Result<Table, TuringMachineError> {
    let mut out = Table::new();
    let mut removed = 0;

    for (state, row) in table.rows() {
        out.insert_state(state);
        for (&symbol, entry) in row {
            let transition = primitive(state, symbol, entry)?;
            if !transition.is_null() {
                out.insert(state, symbol, transition.clone());
                continue;
            }

            match follow_nulls(table, state, symbol, &transition.next_state)? {
                Chain::Resolved(target) => {
                    out.insert(state, symbol, target);
                }
                Chain::DeadEnd => {}
                Chain::Cycle => {
                    warn!("null transitions loop forever from state {state} on {symbol:?}");
                    out.insert(state, symbol, Transition::write(state.clone(), symbol));
                }
            }
            removed += 1;
        }
    }

    debug!("eliminated {removed} null transitions");
    Ok(out)
}

fn follow_nulls(
    table: &Table,
    origin: &str,
    symbol: Symbol,
    first: &str,
) -> Result<Chain, TuringMachineError> {
    let mut seen = BTreeSet::from([origin.to_string()]);
    let mut current = first;

    loop {
        if !seen.insert(current.to_string()) {
            return Ok(Chain::Cycle);
        }
        match table.get(current, symbol) {
            None => return Ok(Chain::DeadEnd),
            Some(entry) => {
                let next = primitive(current, symbol, entry)?;
                if !next.is_null() {
                    return Ok(Chain::Resolved(next.clone()));
                }
                current = &next.next_state;
            }
        }
    }
}

/// Merges every halting state other than `start` into the single halt state `"0"`.
///
/// A pre-existing `"0"` that has transitions, or that is the start state, is renamed
/// out of the way first. Returns the new table and the (possibly renamed) start.
pub fn unify_halts(table: &Table, start: &str) -> (Table, State) {
    let mut table = table.clone();
    let mut start = start.to_string();

    let halt_taken = table.all_states().contains(HALT_STATE);
    if halt_taken && (start == HALT_STATE || !table.is_halting(HALT_STATE)) {
        let moved = table.fresh_state(HALT_STATE);
        debug!("renaming state {HALT_STATE} to {moved}");
        table = table.rename_states(|s| {
            if s == HALT_STATE {
                moved.clone()
            } else {
                s.to_string()
            }
        });
        if start == HALT_STATE {
            start = moved;
        }
    }

    let halts: BTreeSet<State> = table
        .all_states()
        .into_iter()
        .filter(|s| *s != start && table.is_halting(s))
        .collect();
    if halts.is_empty() {
        return (table, start);
    }

    debug!("unifying {} halting states", halts.len());
    let mut unified = table.rename_states(|s| {
        if halts.contains(s) {
            HALT_STATE.to_string()
        } else {
            s.to_string()
        }
    });
    unified.insert_state(HALT_STATE);
    (unified, start)
}

/// Gives every non-halt state an entry for every symbol of `alphabet`.
///
/// A missing entry becomes "rewrite the read symbol, stay, go to `halt`": the
/// machine stops on the same cell with the same contents as before.
pub fn complete(table: &Table, alphabet: &[Symbol], halt: &str) -> Table {
    let mut out = table.clone();
    let mut added = 0;

    for (state, row) in table.rows() {
        if state == halt {
            continue;
        }
        for &symbol in alphabet {
            if !row.contains_key(&symbol) {
                out.insert(state, symbol, Transition::write(halt, symbol));
                added += 1;
            }
        }
    }

    debug!("completed table with {added} halting entries");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::{Macro, Overshoot};

    #[test]
    fn test_quintuple_is_split() {
        let table: Table = [("a", '0', Transition::new("b", Some('1'), Direction::Right))]
            .into_iter()
            .collect();
        let out = to_quadruples(&table).unwrap();

        assert_eq!(out.transition("a", '0'), Some(&Transition::write("a.0", '1')));
        assert_eq!(
            out.transition("a.0", '1'),
            Some(&Transition::shift("b", Direction::Right))
        );
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn test_identity_write_becomes_move() {
        let table: Table = [
            ("a", '1', Transition::new("b", Some('1'), Direction::Left)),
            ("a", '0', Transition::new("b", Some('0'), Direction::Stay)),
        ]
        .into_iter()
        .collect();
        let out = to_quadruples(&table).unwrap();

        assert_eq!(
            out.transition("a", '1'),
            Some(&Transition::shift("b", Direction::Left))
        );
        assert!(out.transition("a", '0').unwrap().is_null());
    }

    #[test]
    fn test_split_state_avoids_existing_names() {
        let table: Table = [
            ("a", '0', Transition::new("b", Some('1'), Direction::Right)),
            ("b", '0', Transition::null("a.0")),
        ]
        .into_iter()
        .collect();
        let out = to_quadruples(&table).unwrap();

        assert_eq!(out.transition("a", '0'), Some(&Transition::write("a.0'", '1')));
    }

    #[test]
    fn test_unexpanded_macro_is_rejected() {
        let mut table = Table::new();
        table.insert(
            "a",
            '0',
            Macro::move_until("b", '1', Direction::Right, Overshoot::At, vec!['0', '1']),
        );

        assert!(matches!(
            to_quadruples(&table),
            Err(TuringMachineError::MalformedTable { .. })
        ));
        assert!(matches!(
            eliminate_nulls(&table),
            Err(TuringMachineError::MalformedTable { .. })
        ));
    }

    #[test]
    fn test_null_chain_is_collapsed() {
        let table: Table = [
            ("a", '0', Transition::null("b")),
            ("b", '0', Transition::null("c")),
            ("c", '0', Transition::write("d", '1')),
            ("a", '1', Transition::null("b")),
        ]
        .into_iter()
        .collect();
        let out = eliminate_nulls(&table).unwrap();

        assert_eq!(out.transition("a", '0'), Some(&Transition::write("d", '1')));
        assert_eq!(out.transition("b", '0'), Some(&Transition::write("d", '1')));
        // b has no entry for '1', so the machine halts in place.
        assert_eq!(out.get("a", '1'), None);
        assert!(out.contains_state("a"));
    }

    #[test]
    fn test_null_cycle_becomes_rewriting_self_loop() {
        let table: Table = [
            ("a", '0', Transition::null("b")),
            ("b", '0', Transition::null("a")),
        ]
        .into_iter()
        .collect();
        let out = eliminate_nulls(&table).unwrap();

        assert_eq!(out.transition("a", '0'), Some(&Transition::write("a", '0')));
        assert_eq!(out.transition("b", '0'), Some(&Transition::write("b", '0')));
        assert!(!out.entries().any(|(_, _, entry)| entry.as_transition().is_some_and(Transition::is_null)));
        assert_eq!(eliminate_nulls(&out).unwrap(), out);
        assert_eq!(eliminate_nulls(&to_quadruples(&out).unwrap()).unwrap(), out);
    }

    #[test]
    fn test_unify_halts() {
        let mut table: Table = [
            ("s", '0', Transition::write("x", '1')),
            ("s", '1', Transition::shift("y", Direction::Right)),
            ("0", '0', Transition::shift("s", Direction::Left)),
        ]
        .into_iter()
        .collect();
        table.insert_state("x");

        let (out, start) = unify_halts(&table, "s");

        assert_eq!(start, "s");
        assert!(out.is_halting("0"));
        assert_eq!(out.transition("s", '0').unwrap().next_state, "0");
        assert_eq!(out.transition("s", '1').unwrap().next_state, "0");
        assert_eq!(
            out.transition("0'", '0'),
            Some(&Transition::shift("s", Direction::Left))
        );
        assert!(!out.contains_state("x"));
    }

    #[test]
    fn test_unify_halts_moves_start_named_zero() {
        let table: Table = [("0", '1', Transition::shift("h", Direction::Right))]
            .into_iter()
            .collect();
        let (out, start) = unify_halts(&table, "0");

        assert_eq!(start, "0'");
        assert_eq!(out.transition("0'", '1').unwrap().next_state, "0");
    }

    #[test]
    fn test_complete_fills_missing_symbols() {
        let mut table: Table = [("a", '0', Transition::shift("a", Direction::Right))]
            .into_iter()
            .collect();
        table.insert_state("0");
        let out = complete(&table, &['0', '1'], "0");

        assert_eq!(out.transition("a", '1'), Some(&Transition::write("0", '1')));
        assert!(out.is_halting("0"));
        assert_eq!(out.len(), 2);
    }
}
