//! This crate compiles Turing machines down to a minimal canonical form.
//! It includes modules for parsing machine descriptions, expanding macros into plain
//! transitions, normalizing tables to quadruple form, lowering wide alphabets to binary,
//! numbering states canonically, and encoding the result for universal machines.

pub mod analyzer;
pub mod binary;
pub mod canonical;
pub mod compiler;
pub mod encoder;
pub mod expand;
pub mod library;
pub mod loader;
pub mod machine;
pub mod macros;
pub mod normalize;
pub mod parser;
pub mod table;
pub mod tape;
pub mod types;

/// Re-exports the `Rule` enum from the parser module, used by the `pest` grammar.
pub use crate::parser::Rule;
/// Re-exports the program checks from the analyzer module.
pub use analyzer::{analyze, check_canonical, reachable_states, AnalysisError};
/// Re-exports binary lowering.
pub use binary::{lower_program, lower_to_binary, BinaryCode};
pub use canonical::canonicalize;
/// Re-exports the pipeline driver.
pub use compiler::{Compiler, Options};
/// Re-exports the encoding functions from the encoder module.
pub use encoder::{decode, encode};
pub use expand::expand;
/// Re-exports the `ProgramLoader` struct from the loader module.
pub use loader::ProgramLoader;
/// Re-exports the reference machine.
pub use machine::{Machine, Snapshot};
pub use macros::{Hygiene, Macro, MacroKind, Overshoot};
pub use normalize::{complete, eliminate_nulls, to_quadruples, unify_halts};
/// Re-exports the `parse` function from the parser module.
pub use parser::parse;
pub use table::{Entry, Row, Table};
pub use tape::Tape;
/// Re-exports the core definitions from the types module.
pub use types::{
    Direction, Program, State, Step, Symbol, Transition, TuringMachineError, BINARY_ALPHABET,
    DEFAULT_BLANK_SYMBOL, HALT_STATE, START_STATE,
};
