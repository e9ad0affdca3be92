//! Fixed-width binary codes and the alphabet-width compiler.
//!
//! A [`BinaryCode`] assigns every logical symbol a bit string of the same width. The
//! compiler turns a table over the logical alphabet into one over `{0, 1}` where every
//! logical cell occupies `width` physical cells and, between logical steps, the head
//! sits on the leftmost bit of the logical cell it is on.
//!
//! Each logical state `s` becomes a cluster of states:
//!
//! * `s` and `s~{prefix}`: read the cell's bits left to right,
//! * `s={code}b{j}`: walk back to the cell's first bit once the code is known,
//! * `s={code}` and `s={code}w{i}`: rewrite the cell bit by bit,
//! * `s={code}r{k}`: walk left after the rewrite for `Stay` and `Left` moves,
//! * `s~h{j}` and `s~h`: walk back and halt on codes the state has no entry for.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::table::Table;
use crate::types::{
    Direction, Program, State, Symbol, Transition, TuringMachineError, BINARY_ALPHABET,
};

/// A fixed-width assignment of bit strings to symbols.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryCode {
    width: usize,
    codes: BTreeMap<Symbol, Vec<Symbol>>,
}

impl BinaryCode {
    /// Builds a code from `(symbol, bits)` pairs.
    ///
    /// All bit strings must be non-empty, made of `0` and `1`, of equal length and
    /// pairwise distinct.
    pub fn new<S: AsRef<str>>(
        pairs: impl IntoIterator<Item = (Symbol, S)>,
    ) -> Result<Self, TuringMachineError> {
        let mut codes = BTreeMap::new();
        let mut seen = BTreeSet::new();
        let mut width = None;

        for (symbol, bits) in pairs {
            let bits: Vec<Symbol> = bits.as_ref().chars().collect();
            if bits.is_empty() || bits.iter().any(|b| !BINARY_ALPHABET.contains(b)) {
                return Err(TuringMachineError::InvalidParameter(format!(
                    "code for {symbol:?} must be a non-empty string of 0 and 1"
                )));
            }
            if *width.get_or_insert(bits.len()) != bits.len() {
                return Err(TuringMachineError::InvalidParameter(format!(
                    "code for {symbol:?} does not have the common width"
                )));
            }
            if !seen.insert(bits.clone()) {
                return Err(TuringMachineError::InvalidParameter(format!(
                    "code {} is assigned twice",
                    label(&bits)
                )));
            }
            if codes.insert(symbol, bits).is_some() {
                return Err(TuringMachineError::InvalidParameter(format!(
                    "symbol {symbol:?} is coded twice"
                )));
            }
        }

        let width = width.ok_or_else(|| {
            TuringMachineError::InvalidParameter("a binary code needs at least one symbol".to_string())
        })?;
        Ok(Self { width, codes })
    }

    /// The densest code for `alphabet`: `max(1, ceil(log2 k))` bits, with `blank`
    /// first so it is coded as all zeros.
    pub fn dense(alphabet: &[Symbol], blank: Symbol) -> Self {
        let mut symbols = vec![blank];
        for &symbol in alphabet {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }

        let mut width = 1;
        while (1usize << width) < symbols.len() {
            width += 1;
        }

        let codes = symbols
            .into_iter()
            .enumerate()
            .map(|(index, symbol)| {
                let bits = (0..width)
                    .rev()
                    .map(|bit| if (index >> bit) & 1 == 1 { '1' } else { '0' })
                    .collect();
                (symbol, bits)
            })
            .collect();

        Self { width, codes }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// The coded symbols, sorted.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.codes.keys().copied()
    }

    pub fn encode(&self, symbol: Symbol) -> Result<&[Symbol], TuringMachineError> {
        self.codes
            .get(&symbol)
            .map(Vec::as_slice)
            .ok_or_else(|| TuringMachineError::UnknownSymbol {
                symbol,
                location: "binary code".to_string(),
            })
    }

    pub fn decode(&self, bits: &[Symbol]) -> Option<Symbol> {
        self.codes
            .iter()
            .find_map(|(symbol, code)| (code.as_slice() == bits).then_some(*symbol))
    }

    pub fn encode_tape(&self, tape: &[Symbol]) -> Result<Vec<Symbol>, TuringMachineError> {
        let mut bits = Vec::with_capacity(tape.len() * self.width);
        for &symbol in tape {
            bits.extend_from_slice(self.encode(symbol)?);
        }
        Ok(bits)
    }

    /// Decodes a physical tape. A partial final chunk is padded with `0`, the physical
    /// blank.
    pub fn decode_tape(&self, bits: &[Symbol]) -> Result<Vec<Symbol>, TuringMachineError> {
        bits.chunks(self.width)
            .map(|chunk| {
                let mut chunk = chunk.to_vec();
                chunk.resize(self.width, '0');
                self.decode(&chunk).ok_or_else(|| {
                    TuringMachineError::EncodingError(format!(
                        "{} is not the code of any symbol",
                        label(&chunk)
                    ))
                })
            })
            .collect()
    }

    /// Returns `true` if `{0, 1}` coded as themselves with width 1.
    pub fn is_identity(&self) -> bool {
        self.width == 1
            && self.codes.len() == 2
            && BINARY_ALPHABET
                .iter()
                .all(|b| self.codes.get(b).map(Vec::as_slice) == Some(&[*b][..]))
    }
}

fn label(bits: &[Symbol]) -> String {
    bits.iter().collect()
}

/// The rewrite a logical transition performs on one coded cell.
struct Action {
    written: Vec<Symbol>,
    direction: Direction,
    next: State,
}

/// Lowers a quadruple table to the binary alphabet under `code`.
///
/// The whole table must be lowered at once: destination states keep their names and
/// are expected to be lowered alongside. The output may contain quintuples (the
/// bit-writing steps) and null transitions; run the normalization passes on it.
pub fn lower_to_binary(table: &Table, code: &BinaryCode) -> Result<Table, TuringMachineError> {
    let mut out = Table::new();

    for (state, row) in table.rows() {
        let mut actions = BTreeMap::new();
        for (&symbol, entry) in row {
            let transition = entry
                .as_transition()
                .ok_or_else(|| TuringMachineError::unexpanded(state, symbol))?;
            if transition.is_quintuple(symbol) {
                return Err(TuringMachineError::UnsupportedTransition {
                    state: state.clone(),
                    symbol,
                    reason: "quintuple transitions must be split before binary lowering"
                        .to_string(),
                });
            }

            let read = code.encode(symbol)?.to_vec();
            let written = match transition.write {
                Some(w) => code.encode(w)?.to_vec(),
                None => read.clone(),
            };
            actions.insert(
                read,
                Action {
                    written,
                    direction: transition.direction,
                    next: transition.next_state.clone(),
                },
            );
        }

        lower_state(&mut out, state, &actions, code.width());
    }

    debug!(
        "lowered {} entries to {} binary entries at width {}",
        table.len(),
        out.len(),
        code.width()
    );
    Ok(out)
}

/// Lowers a whole program: its table, its tape (bit-packed) and its head offset.
pub fn lower_program(program: &Program, code: &BinaryCode) -> Result<Program, TuringMachineError> {
    match code.encode(program.blank) {
        Ok(bits) if bits.iter().all(|&b| b == '0') => {}
        _ => warn!(
            "blank symbol {:?} is not coded as all zeros; untouched cells will read differently",
            program.blank
        ),
    }

    Ok(Program {
        table: lower_to_binary(&program.table, code)?,
        tape: code.encode_tape(&program.tape)?,
        head: program.head * code.width(),
        blank: '0',
        ..program.clone()
    })
}

fn all_bit_strings(len: usize) -> Vec<Vec<Symbol>> {
    (0..len).fold(vec![Vec::new()], |strings, _| {
        strings
            .into_iter()
            .flat_map(|prefix| {
                BINARY_ALPHABET.into_iter().map(move |bit| {
                    let mut next = prefix.clone();
                    next.push(bit);
                    next
                })
            })
            .collect()
    })
}

fn lower_state(out: &mut Table, state: &str, actions: &BTreeMap<Vec<Symbol>, Action>, width: usize) {
    if actions.is_empty() {
        out.insert_state(state);
        return;
    }

    if width == 1 {
        for (read, action) in actions {
            write_cell(out, state, state, read, action, width);
        }
        return;
    }

    let read_node = |prefix: &[Symbol]| -> State {
        if prefix.is_empty() {
            state.to_string()
        } else {
            format!("{state}~{}", label(prefix))
        }
    };
    let halt = format!("{state}~h");
    let mut needs_halt = false;

    for len in 0..width {
        for prefix in all_bit_strings(len) {
            let node = read_node(&prefix);
            for bit in BINARY_ALPHABET {
                let mut bits = prefix.clone();
                bits.push(bit);

                let transition = if bits.len() < width {
                    Transition::shift(read_node(&bits), Direction::Right)
                } else if actions.contains_key(&bits) {
                    Transition::shift(back_relay(state, &bits, 1, width), Direction::Left)
                } else {
                    needs_halt = true;
                    let target = if width == 2 {
                        halt.clone()
                    } else {
                        format!("{halt}1")
                    };
                    Transition::shift(target, Direction::Left)
                };
                out.insert(&node, bit, transition);
            }
        }
    }

    if needs_halt {
        for j in 1..width - 1 {
            let next = if j + 1 < width - 1 {
                format!("{halt}{}", j + 1)
            } else {
                halt.clone()
            };
            for bit in BINARY_ALPHABET {
                out.insert(&format!("{halt}{j}"), bit, Transition::shift(next.clone(), Direction::Left));
            }
        }
        out.insert_state(&halt);
    }

    for (read, action) in actions {
        // Back relay j sits on bit `width - 1 - j`, which is known from the read.
        for j in 1..width - 1 {
            out.insert(
                &back_relay(state, read, j, width),
                read[width - 1 - j],
                Transition::shift(back_relay(state, read, j + 1, width), Direction::Left),
            );
        }
        write_cell(out, state, &format!("{state}={}", label(read)), read, action, width);
    }
}

/// Relay `j` of the walk back from the last bit; the walk ends on the cell's leaf.
fn back_relay(state: &str, read: &[Symbol], j: usize, width: usize) -> State {
    if j + 1 >= width {
        format!("{state}={}", label(read))
    } else {
        format!("{state}={}b{j}", label(read))
    }
}

/// Emits the write chain starting at `leaf` on the cell's first bit, followed by the
/// head movement of the logical transition.
fn write_cell(out: &mut Table, state: &str, leaf: &str, read: &[Symbol], action: &Action, width: usize) {
    let cell = format!("{state}={}", label(read));
    let node = |i: usize| -> State {
        if i == 0 {
            leaf.to_string()
        } else {
            format!("{cell}w{i}")
        }
    };
    let bit_write = |i: usize| (action.written[i] != read[i]).then_some(action.written[i]);

    for i in 0..width - 1 {
        out.insert(
            &node(i),
            read[i],
            Transition::new(node(i + 1), bit_write(i), Direction::Right),
        );
    }

    let last = width - 1;
    let moves = match action.direction {
        Direction::Right => {
            out.insert(
                &node(last),
                read[last],
                Transition::new(action.next.clone(), bit_write(last), Direction::Right),
            );
            return;
        }
        Direction::Stay if width == 1 => {
            out.insert(
                &node(last),
                read[last],
                Transition::new(action.next.clone(), bit_write(last), Direction::Stay),
            );
            return;
        }
        Direction::Stay => width - 1,
        Direction::Left => 2 * width - 1,
    };

    let relay = |k: usize| -> State {
        if k == moves {
            action.next.clone()
        } else {
            format!("{cell}r{k}")
        }
    };

    out.insert(
        &node(last),
        read[last],
        Transition::new(relay(1), bit_write(last), Direction::Left),
    );
    for k in 1..moves {
        // Relay k sits on bit `last - k` of this cell, or inside the cell to its left.
        let reads: Vec<Symbol> = match last.checked_sub(k) {
            Some(offset) => vec![action.written[offset]],
            None => BINARY_ALPHABET.to_vec(),
        };
        for bit in reads {
            out.insert(&relay(k), bit, Transition::shift(relay(k + 1), Direction::Left));
        }
    }
}
