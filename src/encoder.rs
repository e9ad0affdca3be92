//! This module provides the unary interchange encoding of canonical programs, the
//! format consumed by universal machines.
//!
//! Format, for a program whose states are `"0"..="n-1"`:
//! - `1^n 0`: the number of states, counting the halt state `"0"`.
//! - For each state `1..n-1`, for each symbol `0` then `1`:
//!   - the action in unary followed by `0`: `1` write 0, `11` write 1, `111` move
//!     left, `1111` move right;
//!   - the destination `d` as `1^(d+1)` followed by `0`.
//! - The initial tape, verbatim.

use crate::analyzer::check_canonical;
use crate::table::Table;
use crate::types::{
    Direction, Program, Symbol, Transition, TuringMachineError, BINARY_ALPHABET, HALT_STATE,
    START_STATE,
};

/// Encodes a canonical program.
///
/// # Returns
///
/// * `Ok(String)` - The encoded program.
/// * `Err(TuringMachineError)` - If the program is not in canonical form, or its head
///   is not on the first tape cell (the format has no place for a head position).
pub fn encode(program: &Program) -> Result<String, TuringMachineError> {
    check_canonical(program)?;
    if program.head != 0 {
        return Err(TuringMachineError::EncodingError(format!(
            "the head must start on the first tape cell, found it at {}",
            program.head
        )));
    }

    let count = program
        .table
        .all_states()
        .iter()
        .filter_map(|state| state.parse::<usize>().ok())
        .max()
        .map_or(1, |max| max + 1);

    let mut encoded = unary(count);
    for id in 1..count {
        let state = id.to_string();
        for symbol in BINARY_ALPHABET {
            let transition = program.table.transition(&state, symbol).ok_or_else(|| {
                TuringMachineError::MalformedTable {
                    state: state.clone(),
                    reason: format!("no transition on {symbol:?}"),
                }
            })?;
            encoded.push_str(&unary(action_code(transition)));
            encoded.push_str(&unary(destination(&state, symbol, transition)? + 1));
        }
    }
    encoded.extend(program.tape.iter());

    Ok(encoded)
}

fn unary(n: usize) -> String {
    let mut s = "1".repeat(n);
    s.push('0');
    s
}

fn action_code(transition: &Transition) -> usize {
    match (transition.direction, transition.write) {
        (Direction::Left, _) => 3,
        (Direction::Right, _) => 4,
        (Direction::Stay, Some('1')) => 2,
        (Direction::Stay, _) => 1,
    }
}

fn destination(
    state: &str,
    symbol: Symbol,
    transition: &Transition,
) -> Result<usize, TuringMachineError> {
    transition
        .next_state
        .parse()
        .map_err(|_| TuringMachineError::UnsupportedTransition {
            state: state.to_string(),
            symbol,
            reason: format!("destination {} is not a number", transition.next_state),
        })
}

/// Decodes an encoded program.
///
/// The decoded program is named `decoded`, starts in `"1"`, uses blank `0` and owns a
/// row for every state it mentions.
pub fn decode(encoded: &str) -> Result<Program, TuringMachineError> {
    let mut reader = UnaryReader {
        symbols: encoded.chars().collect(),
        pos: 0,
    };

    let count = reader.next_count("state count")?;
    if count < 2 {
        return Err(TuringMachineError::EncodingError(format!(
            "expected at least 2 states, found {count}"
        )));
    }

    let mut table = Table::new();
    table.insert_state(HALT_STATE);
    for id in 1..count {
        let state = id.to_string();
        for symbol in BINARY_ALPHABET {
            let location = format!("state {state} on {symbol}");
            let action = reader.next_count(&location)?;
            let next = reader.next_count(&location)? - 1;
            if next >= count {
                return Err(TuringMachineError::EncodingError(format!(
                    "destination {next} of {location} is out of range"
                )));
            }

            let transition = match action {
                1 => Transition::write(next.to_string(), '0'),
                2 => Transition::write(next.to_string(), '1'),
                3 => Transition::shift(next.to_string(), Direction::Left),
                4 => Transition::shift(next.to_string(), Direction::Right),
                _ => {
                    return Err(TuringMachineError::EncodingError(format!(
                        "unknown action code {action} for {location}"
                    )))
                }
            };
            table.insert(&state, symbol, transition);
        }
    }

    let tape = reader.rest();
    if let Some(symbol) = tape.iter().find(|s| !BINARY_ALPHABET.contains(s)) {
        return Err(TuringMachineError::EncodingError(format!(
            "tape contains non-binary symbol {symbol:?}"
        )));
    }

    Ok(Program::new("decoded", START_STATE, table).with_tape(tape, 0))
}

struct UnaryReader {
    symbols: Vec<Symbol>,
    pos: usize,
}

impl UnaryReader {
    /// Reads `1^k 0` and returns `k`, which must be at least 1.
    fn next_count(&mut self, what: &str) -> Result<usize, TuringMachineError> {
        let start = self.pos;
        while self.symbols.get(self.pos) == Some(&'1') {
            self.pos += 1;
        }
        let count = self.pos - start;

        match self.symbols.get(self.pos) {
            Some('0') if count > 0 => {
                self.pos += 1;
                Ok(count)
            }
            Some('0') => Err(TuringMachineError::EncodingError(format!(
                "empty unary number for {what} at offset {start}"
            ))),
            Some(other) => Err(TuringMachineError::EncodingError(format!(
                "unexpected symbol {other:?} for {what} at offset {}",
                self.pos
            ))),
            None => Err(TuringMachineError::EncodingError(format!(
                "input ends inside {what}"
            ))),
        }
    }

    fn rest(&self) -> Vec<Symbol> {
        self.symbols[self.pos..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_program() -> Program {
        let mut table: Table = [
            ("1", '0', Transition::write("2", '1')),
            ("1", '1', Transition::shift("1", Direction::Right)),
            ("2", '0', Transition::shift("0", Direction::Left)),
            ("2", '1', Transition::write("0", '1')),
        ]
        .into_iter()
        .collect();
        table.insert_state("0");

        Program::new("example", "1", table).with_tape("101".chars(), 0)
    }

    #[test]
    fn test_encode_program() {
        let encoded = encode(&create_test_program()).unwrap();
        assert_eq!(encoded, "111011011101111011011101011010101");
    }

    #[test]
    fn test_round_trip_encoding() {
        let program = create_test_program();
        let decoded = decode(&encode(&program).unwrap()).unwrap();

        assert_eq!(decoded.table, program.table);
        assert_eq!(decoded.tape, program.tape);
        assert_eq!(decoded.initial_state, "1");
    }

    #[test]
    fn test_identity_write_with_move_encodes_as_move() {
        let mut program = create_test_program();
        program
            .table
            .insert("1", '1', Transition::new("1", Some('1'), Direction::Right));

        assert_eq!(
            encode(&program).unwrap(),
            encode(&create_test_program()).unwrap()
        );
    }

    #[test]
    fn test_non_canonical_programs_are_rejected() {
        let mut program = create_test_program();
        program.table.insert("2", '1', Transition::null("0"));
        assert!(matches!(
            encode(&program),
            Err(TuringMachineError::UnsupportedTransition { .. })
        ));

        let mut program = create_test_program();
        program.initial_state = "2".to_string();
        assert!(encode(&program).is_err());
    }

    #[test]
    fn test_head_off_the_first_cell_is_rejected() {
        let program = create_test_program().with_tape("0110".chars(), 1);

        match encode(&program) {
            Err(TuringMachineError::EncodingError(message)) => assert!(message.contains("at 1")),
            other => panic!("expected an encoding error, got {other:?}"),
        }
        assert!(encode(&program.with_tape("0110".chars(), 0)).is_ok());
    }

    #[test]
    fn test_decode_invalid_input() {
        assert!(matches!(decode(""), Err(TuringMachineError::EncodingError(_))));
        assert!(matches!(decode("10"), Err(TuringMachineError::EncodingError(_))));
        // Action code 5 does not exist.
        assert!(matches!(
            decode("110111110110"),
            Err(TuringMachineError::EncodingError(_))
        ));
        assert!(matches!(
            decode("11010110101102"),
            Err(TuringMachineError::EncodingError(_))
        ));
    }
}
