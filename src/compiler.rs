//! The pipeline driver: expansion, normalization, binary lowering and canonical form.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::binary::{lower_program, BinaryCode};
use crate::canonical::canonicalize;
use crate::expand::expand;
use crate::macros::Hygiene;
use crate::normalize::{complete, eliminate_nulls, to_quadruples, unify_halts};
use crate::table::Table;
use crate::types::{
    Program, TuringMachineError, BINARY_ALPHABET, DEFAULT_BLANK_SYMBOL, HALT_STATE, START_STATE,
};

/// Configures a [`Compiler`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// The code used to lower wider alphabets. When absent, programs that are not
    /// already over `{0, 1}` with blank `0` get [`BinaryCode::dense`].
    pub binary_code: Option<BinaryCode>,
    /// Whether to finish with halt unification, completion and canonical numbering.
    pub canonical: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            binary_code: None,
            canonical: true,
        }
    }
}

/// Compiles programs down to quadruple, binary, canonically numbered form.
///
/// Every compilation starts a fresh [`Hygiene`] counter, so the compiler itself holds
/// no state between calls.
#[derive(Debug, Clone, Default)]
pub struct Compiler {
    options: Options,
}

impl Compiler {
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The code [`Compiler::compile`] lowers `program` with, or `None` if the program
    /// is already binary.
    pub fn binary_code(&self, program: &Program) -> Option<BinaryCode> {
        if let Some(code) = &self.options.binary_code {
            return Some(code.clone());
        }

        let alphabet = program.alphabet();
        let binary = program.blank == DEFAULT_BLANK_SYMBOL
            && alphabet.iter().all(|s| BINARY_ALPHABET.contains(s));
        (!binary).then(|| BinaryCode::dense(&alphabet, program.blank))
    }

    /// Runs the whole pipeline on `program` and returns the compiled program.
    ///
    /// The tape and head of the result are bit-packed when the program is lowered;
    /// decode them with [`Compiler::binary_code`].
    pub fn compile(&self, program: &Program) -> Result<Program, TuringMachineError> {
        let code = self.binary_code(program);

        let table = expand(&program.table, &mut Hygiene::new())?;
        let mut compiled = program.with_table(normalize(&table)?);

        if let Some(code) = &code {
            compiled = lower_program(&compiled, code)?;
            compiled.table = normalize(&compiled.table)?;
        }

        if self.options.canonical {
            let (table, start) = unify_halts(&compiled.table, &compiled.initial_state);
            let table = complete(&table, &BINARY_ALPHABET, HALT_STATE);
            let (table, _) = canonicalize(&table, &start);
            compiled.table = table;
            compiled.initial_state = START_STATE.to_string();
        }

        debug!(
            "compiled '{}': {} entries in, {} entries out",
            program.name,
            program.table.len(),
            compiled.table.len()
        );
        Ok(compiled)
    }
}

fn normalize(table: &Table) -> Result<Table, TuringMachineError> {
    eliminate_nulls(&to_quadruples(table)?)
}
