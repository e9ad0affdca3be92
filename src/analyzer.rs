//! This module provides functions for analyzing machine descriptions before they are
//! compiled or executed: valid head positions, defined start states, reachable states,
//! handled tape symbols, and the shape checks of the canonical form.

use log::warn;
use std::collections::{BTreeSet, VecDeque};

use crate::table::{Entry, Table};
use crate::types::{
    Program, State, TuringMachineError, BINARY_ALPHABET, DEFAULT_BLANK_SYMBOL, HALT_STATE,
    START_STATE,
};

/// Represents various errors that can be found during the analysis of a program.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum AnalysisError {
    /// Indicates an invalid head position, out of bounds for the initial tape.
    InvalidHead(usize),
    /// Indicates that the initial state does not own a row in the table.
    InvalidStartState(String),
    /// Indicates states that own a row but cannot be reached from the initial state.
    UnreachableStates(Vec<String>),
    /// Indicates that the initial tape contains symbols the table never mentions.
    InvalidTapeSymbols(Vec<char>),
}

impl From<AnalysisError> for TuringMachineError {
    /// Converts an `AnalysisError` into a `TuringMachineError::ValidationError`.
    fn from(error: AnalysisError) -> Self {
        match error {
            AnalysisError::InvalidHead(pos) => {
                TuringMachineError::ValidationError(format!("Invalid head position: {}", pos))
            }
            AnalysisError::InvalidStartState(state) => {
                TuringMachineError::ValidationError(format!("Invalid start state: {}", state))
            }
            AnalysisError::UnreachableStates(states) => TuringMachineError::ValidationError(
                format!("Unreachable states detected: {:?}", states),
            ),
            AnalysisError::InvalidTapeSymbols(symbols) => {
                TuringMachineError::ValidationError(format!(
                    "Initial tape contains symbols not handled by any transition: {:?}",
                    symbols
                ))
            }
        }
    }
}

/// Analyzes a `Program` for errors that would make it meaningless to run or compile.
///
/// Unreachable states are legal (the compiler drops them) and are only reported
/// through the log.
///
/// # Returns
///
/// * `Ok(())` if no errors are found.
/// * `Err(TuringMachineError::ValidationError)` for the first violated check.
pub fn analyze(program: &Program) -> Result<(), TuringMachineError> {
    if let Err(AnalysisError::UnreachableStates(states)) = check_unreachable_states(program) {
        warn!("Program '{}' has unreachable states: {:?}", program.name, states);
    }

    let errors = [check_head, check_valid_start_state, check_tape_symbols]
        .iter()
        .filter_map(|f| f(program).err())
        .collect::<Vec<_>>();

    match errors.into_iter().next() {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

/// Returns every state reachable from `start`, including targets without a row.
pub fn reachable_states(table: &Table, start: &str) -> BTreeSet<State> {
    let mut visited = BTreeSet::new();
    let mut queue = VecDeque::from([start.to_string()]);

    while let Some(state) = queue.pop_front() {
        if !visited.insert(state.clone()) {
            continue;
        }
        for next in table.successors(&state) {
            if !visited.contains(next) {
                queue.push_back(next.clone());
            }
        }
    }

    visited
}

/// Checks if the initial head position is within the initial tape.
///
/// An empty tape accepts any head position.
fn check_head(program: &Program) -> Result<(), AnalysisError> {
    if program.head >= program.tape.len() && !program.tape.is_empty() {
        return Err(AnalysisError::InvalidHead(program.head));
    }

    Ok(())
}

/// Checks whether the initial state owns a row in the table.
fn check_valid_start_state(program: &Program) -> Result<(), AnalysisError> {
    if !program.table.contains_state(&program.initial_state) {
        return Err(AnalysisError::InvalidStartState(
            program.initial_state.clone(),
        ));
    }

    Ok(())
}

fn check_unreachable_states(program: &Program) -> Result<(), AnalysisError> {
    let visited = reachable_states(&program.table, &program.initial_state);
    let unreachable: Vec<String> = program
        .table
        .states()
        .filter(|state| !visited.contains(*state))
        .cloned()
        .collect();

    if !unreachable.is_empty() {
        return Err(AnalysisError::UnreachableStates(unreachable));
    }

    Ok(())
}

/// Checks that every symbol of the initial tape is the blank or appears somewhere in
/// the table.
fn check_tape_symbols(program: &Program) -> Result<(), AnalysisError> {
    let mut handled = program.table.alphabet();
    handled.insert(program.blank);

    let unhandled: BTreeSet<char> = program
        .tape
        .iter()
        .filter(|c| !handled.contains(*c))
        .copied()
        .collect();

    if !unhandled.is_empty() {
        return Err(AnalysisError::InvalidTapeSymbols(unhandled.into_iter().collect()));
    }

    Ok(())
}

/// Checks that a program is in canonical form: binary alphabet with blank `0`, start
/// state `"1"`, numeric state names, `"0"` as the only halting state, and exactly one
/// single-effect transition per non-halt state and symbol.
pub fn check_canonical(program: &Program) -> Result<(), TuringMachineError> {
    let malformed = |state: &str, reason: String| TuringMachineError::MalformedTable {
        state: state.to_string(),
        reason,
    };

    if program.blank != DEFAULT_BLANK_SYMBOL {
        return Err(TuringMachineError::UnknownSymbol {
            symbol: program.blank,
            location: "blank of a canonical program".to_string(),
        });
    }
    if program.initial_state != START_STATE {
        return Err(malformed(
            &program.initial_state,
            format!("canonical programs start in state {START_STATE}"),
        ));
    }
    if let Some(&symbol) = program.tape.iter().find(|s| !BINARY_ALPHABET.contains(s)) {
        return Err(TuringMachineError::UnknownSymbol {
            symbol,
            location: "initial tape".to_string(),
        });
    }

    let mut ids = BTreeSet::new();
    for state in program.table.all_states() {
        let id: usize = state
            .parse()
            .map_err(|_| malformed(&state, "state names must be numbers".to_string()))?;
        if id.to_string() != state {
            return Err(malformed(&state, "state numbers must not be padded".to_string()));
        }
        ids.insert(id);
    }
    let count = ids.last().map_or(0, |max| max + 1);
    if let Some(gap) = (1..count).find(|id| !ids.contains(id)) {
        return Err(malformed(&gap.to_string(), "state numbers must be contiguous".to_string()));
    }

    for (state, row) in program.table.rows() {
        if state == HALT_STATE {
            if !row.is_empty() {
                return Err(malformed(state, "the halt state has transitions".to_string()));
            }
            continue;
        }
        if row.len() != BINARY_ALPHABET.len() {
            return Err(malformed(
                state,
                format!("expected entries for 0 and 1, found {}", row.len()),
            ));
        }
        for (&symbol, entry) in row {
            if !BINARY_ALPHABET.contains(&symbol) {
                return Err(TuringMachineError::UnknownSymbol {
                    symbol,
                    location: format!("state {state}"),
                });
            }
            let transition = match entry {
                Entry::Transition(t) => t,
                Entry::Macro(_) => return Err(TuringMachineError::unexpanded(state, symbol)),
            };
            let shape = if transition.is_quintuple(symbol) {
                Some("quintuple")
            } else if transition.is_null() {
                Some("null")
            } else {
                None
            };
            if let Some(shape) = shape {
                return Err(TuringMachineError::UnsupportedTransition {
                    state: state.clone(),
                    symbol,
                    reason: format!("{shape} transition in canonical form"),
                });
            }
            if let Some(w) = transition.write {
                if !BINARY_ALPHABET.contains(&w) {
                    return Err(TuringMachineError::UnknownSymbol {
                        symbol: w,
                        location: format!("state {state}"),
                    });
                }
            }
        }
    }

    // States only ever mentioned as targets have no row and therefore halt too.
    if let Some(state) = program
        .table
        .all_states()
        .into_iter()
        .find(|s| s != HALT_STATE && !program.table.contains_state(s))
    {
        return Err(malformed(&state, "state has no transitions".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Transition};

    fn create_test_program(initial_state: &str, initial_tape: &str, table: Table) -> Program {
        Program::new("Test Program", initial_state, table)
            .with_tape(initial_tape.chars(), 0)
            .with_blank('-')
    }

    fn canonical_table() -> Table {
        let mut table: Table = [
            ("1", '0', Transition::write("2", '1')),
            ("1", '1', Transition::shift("1", Direction::Right)),
            ("2", '0', Transition::shift("0", Direction::Left)),
            ("2", '1', Transition::write("0", '1')),
        ]
        .into_iter()
        .collect();
        table.insert_state("0");
        table
    }

    #[test]
    fn test_valid_program() {
        let mut table = Table::new();
        table.insert("start", 'a', Transition::new("halt", Some('b'), Direction::Right));
        table.insert_state("halt");

        let program = create_test_program("start", "a", table);
        assert!(analyze(&program).is_ok());
    }

    #[test]
    fn test_empty_tape_accepts_any_head() {
        let mut table = Table::new();
        table.insert_state("start");

        let program = create_test_program("start", "", table);
        assert!(check_head(&program).is_ok());
    }

    #[test]
    fn test_invalid_head_position() {
        let mut table = Table::new();
        table.insert_state("start");

        let mut program = create_test_program("start", "ab", table);
        program.head = 2;
        assert_eq!(check_head(&program), Err(AnalysisError::InvalidHead(2)));
    }

    #[test]
    fn test_analysis_error_conversion() {
        let error = AnalysisError::InvalidHead(5);
        let tm_error: TuringMachineError = error.into();

        match tm_error {
            TuringMachineError::ValidationError(msg) => {
                assert!(msg.contains("Invalid head position: 5"));
            }
            _ => panic!("Expected ValidationError"),
        }
    }

    #[test]
    fn test_invalid_start_state() {
        let mut table = Table::new();
        table.insert("other", 'a', Transition::null("other"));

        let program = create_test_program("start", "a", table);
        assert!(matches!(
            analyze(&program),
            Err(TuringMachineError::ValidationError(msg)) if msg.contains("start")
        ));
    }

    #[test]
    fn test_unreachable_states_are_not_fatal() {
        let mut table = Table::new();
        table.insert("start", 'a', Transition::shift("middle", Direction::Right));
        table.insert("middle", 'a', Transition::shift("start", Direction::Left));
        table.insert("island", 'a', Transition::null("island"));

        let program = create_test_program("start", "a", table);
        assert_eq!(
            check_unreachable_states(&program),
            Err(AnalysisError::UnreachableStates(vec!["island".to_string()]))
        );
        assert!(analyze(&program).is_ok());
    }

    #[test]
    fn test_reachable_states_include_row_less_targets() {
        let table = canonical_table();
        let reachable = reachable_states(&table, "1");

        assert_eq!(reachable.into_iter().collect::<Vec<_>>(), vec!["0", "1", "2"]);
    }

    #[test]
    fn test_tape_symbols() {
        let mut table = Table::new();
        table.insert("start", 'a', Transition::shift("start", Direction::Right));

        let program = create_test_program("start", "a-x", table);
        assert_eq!(
            check_tape_symbols(&program),
            Err(AnalysisError::InvalidTapeSymbols(vec!['x']))
        );
    }

    #[test]
    fn test_canonical_program_passes() {
        let program = Program::new("canonical", "1", canonical_table()).with_tape("101".chars(), 0);
        assert!(check_canonical(&program).is_ok());
    }

    #[test]
    fn test_canonical_violations() {
        let base = Program::new("canonical", "1", canonical_table());

        let mut missing = canonical_table();
        missing.remove("2", '1');
        assert!(matches!(
            check_canonical(&base.with_table(missing)),
            Err(TuringMachineError::MalformedTable { ref state, .. }) if state == "2"
        ));

        let mut quintuple = canonical_table();
        quintuple.insert("2", '1', Transition::new("0", Some('0'), Direction::Right));
        assert!(matches!(
            check_canonical(&base.with_table(quintuple)),
            Err(TuringMachineError::UnsupportedTransition { .. })
        ));

        let mut named = canonical_table();
        named.insert("1", '1', Transition::shift("x", Direction::Right));
        assert!(matches!(
            check_canonical(&base.with_table(named)),
            Err(TuringMachineError::MalformedTable { ref state, .. }) if state == "x"
        ));

        let mut halting = canonical_table();
        halting.insert("0", '0', Transition::write("1", '1'));
        assert!(check_canonical(&base.with_table(halting)).is_err());
    }
}
