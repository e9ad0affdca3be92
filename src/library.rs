//! The embedded sub-machine library.
//!
//! Each entry is a machine description compiled into the binary and parsed once, on
//! first use. `MacroKind::Library` instantiates an entry as a fragment: its halting
//! states continue at the macro's return state. Entries must not `call()` other
//! entries.
//!
//! `two_to_four` and `four_to_two` convert between one symbol per cell and the
//! two-cell code where `1` is `11` and `0` is `01`. Both expect the head on the
//! leftmost `1` of data that ends at the first `00`, and both finish back on the
//! leftmost cell of their output.

use log::error;
use std::collections::BTreeMap;

use crate::types::{Program, TuringMachineError};

const LIBRARY_TEXTS: [(&str, &str); 4] = [
    ("shift_right", include_str!("../library/shift-right.tm")),
    ("unary_add", include_str!("../library/unary-add.tm")),
    ("two_to_four", include_str!("../library/two-to-four.tm")),
    ("four_to_two", include_str!("../library/four-to-two.tm")),
];

lazy_static::lazy_static! {
    static ref LIBRARY: BTreeMap<&'static str, Program> = {
        let mut library = BTreeMap::new();
        for (name, text) in LIBRARY_TEXTS {
            match crate::parser::parse(text) {
                Ok(program) => {
                    library.insert(name, program);
                }
                Err(e) => error!("Failed to parse library machine {name}: {e}"),
            }
        }
        library
    };
}

/// Looks up a library machine by name.
pub fn get(name: &str) -> Result<&'static Program, TuringMachineError> {
    LIBRARY.get(name).ok_or_else(|| {
        TuringMachineError::InvalidParameter(format!("no library machine named '{name}'"))
    })
}

/// Returns the names of the available library machines, sorted.
pub fn names() -> Vec<&'static str> {
    LIBRARY.keys().copied().collect()
}

/// Returns the description text of a library machine.
pub fn text(name: &str) -> Option<&'static str> {
    LIBRARY_TEXTS
        .iter()
        .find(|(entry, _)| *entry == name)
        .map(|(_, text)| *text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::expand;
    use crate::machine::Machine;
    use crate::macros::{Hygiene, Macro};
    use crate::table::Table;
    use crate::types::Transition;

    #[test]
    fn test_all_library_machines_parse() {
        assert_eq!(
            names(),
            vec!["four_to_two", "shift_right", "two_to_four", "unary_add"]
        );
        for name in names() {
            assert!(text(name).is_some());
            assert!(!get(name).unwrap().table.has_macros());
        }
    }

    #[test]
    fn test_unknown_machine() {
        assert!(matches!(
            get("busy_beaver"),
            Err(TuringMachineError::InvalidParameter(_))
        ));
        assert_eq!(text("busy_beaver"), None);
    }

    #[test]
    fn test_shift_right() {
        let mut machine = Machine::new(get("shift_right").unwrap()).unwrap();
        machine.run();

        assert_eq!(machine.cells(), vec!['0', '0', '1', '1', '0', '1']);
        assert_eq!(machine.head(), 2);
    }

    #[test]
    fn test_unary_add() {
        let mut machine = Machine::new(get("unary_add").unwrap()).unwrap();
        machine.run();

        assert_eq!(machine.cells().into_iter().collect::<String>(), "0111110");
        assert_eq!(machine.head(), 1);
    }

    fn run_on(name: &str, tape: &str) -> Machine {
        let program = get(name).unwrap().clone().with_tape(tape.chars(), 0);
        let mut machine = Machine::new(&program).unwrap();
        machine.run();
        machine
    }

    fn text_of(machine: &Machine) -> String {
        machine.cells().into_iter().collect()
    }

    fn data_from_head(machine: &Machine) -> String {
        let cells: String = machine.cells()[machine.head()..].iter().collect();
        cells.trim_end_matches('0').to_string()
    }

    #[test]
    fn test_two_to_four() {
        let machine = run_on("two_to_four", "101");

        assert_eq!(machine.state(), "done");
        assert!(text_of(&machine).contains("110111"));
        assert_eq!(data_from_head(&machine), "110111");
    }

    #[test]
    fn test_four_to_two() {
        let machine = run_on("four_to_two", "110111");

        assert_eq!(machine.state(), "done");
        assert!(text_of(&machine).contains("101"));
        assert_eq!(data_from_head(&machine), "101");
    }

    #[test]
    fn test_symbol_codecs_undo_each_other() {
        let mut table = Table::new();
        table.insert("main", '1', Macro::library("decode", "two_to_four"));
        table.insert("decode", '1', Macro::library("end", "four_to_two"));
        table.insert_state("end");

        let table = expand(&table, &mut Hygiene::new()).unwrap();
        let program = Program::new("codecs", "main", table).with_tape("10101".chars(), 0);
        let mut machine = Machine::new(&program).unwrap();
        machine.run();

        assert_eq!(machine.state(), "end");
        assert_eq!(data_from_head(&machine), "10101");
        assert_eq!(text_of(&machine).trim_matches('0'), "10101");
    }

    #[test]
    fn test_library_fragment_returns_to_caller() {
        let mut table = Table::new();
        table.insert("main", '1', Macro::library("after", "unary_add"));
        table.insert("after", '1', Transition::write("end", '#'));
        table.insert_state("end");

        let table = expand(&table, &mut Hygiene::new()).unwrap();
        let program = Program::new("caller", "main", table).with_tape("1101".chars(), 0);
        let mut machine = Machine::new(&program).unwrap();
        machine.run();

        assert_eq!(machine.state(), "end");
        assert_eq!(machine.cells().into_iter().collect::<String>(), "0#110");
        assert_eq!(machine.head(), 1);
    }
}
