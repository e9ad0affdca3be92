//! The macro expansion engine.

use log::debug;

use crate::macros::Hygiene;
use crate::table::Table;
use crate::types::{Transition, TuringMachineError};

/// Rewrites every macro entry of `table` into primitive transitions.
///
/// Each macro is assembled into a fragment that is merged into the table, and the
/// macro's own slot becomes a null transition to the fragment's entry state. Merged
/// fragments may carry further macros, so the loop runs until none remain anywhere.
/// The input table is left untouched. Prefixes already present in `table` are
/// reserved first, so a partly expanded table can be expanded again.
pub fn expand(table: &Table, hygiene: &mut Hygiene) -> Result<Table, TuringMachineError> {
    hygiene.reserve(table);
    let mut table = table.clone();
    let mut expanded = 0;

    while let Some((state, symbol, call)) = table.first_macro() {
        let (fragment, entry) = call.assemble(hygiene)?;
        table.insert(&state, symbol, Transition::null(entry));
        table = table.merge(fragment);
        expanded += 1;
    }

    debug!("expanded {expanded} macros into {} entries", table.len());
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::Machine;
    use crate::macros::{Macro, Overshoot};
    use crate::types::{Direction, Program};

    fn nested_table() -> Table {
        let mut inner = Table::new();
        inner.insert(
            "go",
            '0',
            Macro::move_fixed("done", 2, Direction::Right, vec!['0', '1']),
        );
        inner.insert(
            "go",
            '1',
            Macro::move_until("done", '0', Direction::Left, Overshoot::Past, vec!['0', '1']),
        );
        inner.insert_state("done");

        let mut table = Table::new();
        table.insert("start", '0', Macro::fragment("end", inner, "go"));
        table.insert("start", '1', Transition::shift("start", Direction::Right));
        table.insert_state("end");
        table
    }

    #[test]
    fn test_expansion_reaches_fixpoint() {
        let mut hygiene = Hygiene::new();
        let table = expand(&nested_table(), &mut hygiene).unwrap();

        assert!(!table.has_macros());
        assert!(table.transition("start", '0').unwrap().is_null());
        assert_eq!(
            table.transition("start", '1'),
            Some(&Transition::shift("start", Direction::Right))
        );

        let again = expand(&table, &mut hygiene).unwrap();
        assert_eq!(again, table);
    }

    #[test]
    fn test_expansion_leaves_input_untouched() {
        let table = nested_table();
        let before = table.clone();
        expand(&table, &mut Hygiene::new()).unwrap();

        assert_eq!(table, before);
    }

    #[test]
    fn test_every_path_returns() {
        let table = expand(&nested_table(), &mut Hygiene::new()).unwrap();

        // All states created by expansion lead somewhere defined or back to "end".
        for state in table.all_states() {
            assert!(
                table.contains_state(&state) || state == "end",
                "dangling state {state}"
            );
        }
    }

    #[test]
    fn test_expanding_twice_keeps_fragments_apart() {
        let alphabet = vec!['0', '1'];
        let mut table = Table::new();
        table.insert("a", '1', Macro::move_fixed("b", 3, Direction::Right, alphabet.clone()));
        let first = expand(&table, &mut Hygiene::new()).unwrap();

        let mut table = first.clone();
        table.insert(
            "b",
            '0',
            Macro::move_until("c", '1', Direction::Left, Overshoot::At, alphabet),
        );
        table.insert_state("c");
        let second = expand(&table, &mut Hygiene::new()).unwrap();

        let into_fixed = &second.transition("a", '1').unwrap().next_state;
        let into_until = &second.transition("b", '0').unwrap().next_state;
        assert_ne!(into_fixed, into_until);
        for (state, row) in first.rows() {
            assert_eq!(second.row(state), Some(row));
        }

        let program = Program::new("twice", "a", second).with_tape("1000".chars(), 0);
        let mut machine = Machine::new(&program).unwrap();
        machine.run();
        assert_eq!(machine.state(), "c");
        assert_eq!(machine.head(), 0);
    }

    #[test]
    fn test_invalid_macro_fails_expansion() {
        let mut table = Table::new();
        table.insert(
            "a",
            '0',
            Macro::move_fixed("b", 0, Direction::Right, vec!['0']),
        );

        assert!(matches!(
            expand(&table, &mut Hygiene::new()),
            Err(TuringMachineError::InvalidParameter(_))
        ));
    }
}
