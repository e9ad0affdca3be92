//! This module provides the `ProgramLoader` struct, responsible for loading machine
//! descriptions from various sources: `.tm` description files, JSON snapshots of a
//! `Program`, and strings.

use crate::parser::parse;
use crate::types::{Program, TuringMachineError};
use std::fs;
use std::path::{Path, PathBuf};

/// File extension of machine descriptions.
pub const DESCRIPTION_EXTENSION: &str = "tm";

/// `ProgramLoader` is a utility struct for loading machine descriptions.
/// It provides methods to load programs from individual files, from string content,
/// and to discover and load all `.tm` files within a specified directory.
pub struct ProgramLoader;

impl ProgramLoader {
    /// Loads a single program from the specified file path.
    ///
    /// Files ending in `.json` are read as serialized `Program`s; everything else is
    /// parsed as a description.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the file is successfully read and parsed into a `Program`.
    /// * `Err(TuringMachineError::FileError)` if the file cannot be read or is invalid JSON.
    /// * `Err(TuringMachineError::ParseError)` if the file content is not a valid description.
    pub fn load_program(path: &Path) -> Result<Program, TuringMachineError> {
        let content = fs::read_to_string(path).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            return serde_json::from_str(&content).map_err(|e| {
                TuringMachineError::FileError(format!(
                    "Invalid program JSON in {}: {}",
                    path.display(),
                    e
                ))
            });
        }

        parse(&content)
    }

    /// Writes `program` as pretty-printed JSON to `path`.
    pub fn save_program_json(program: &Program, path: &Path) -> Result<(), TuringMachineError> {
        let json = serde_json::to_string_pretty(program).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to serialize program: {}", e))
        })?;

        fs::write(path, json).map_err(|e| {
            TuringMachineError::FileError(format!("Failed to write file {}: {}", path.display(), e))
        })
    }

    /// Loads a single program from the provided description text.
    ///
    /// # Returns
    ///
    /// * `Ok(Program)` if the content is successfully parsed into a `Program`.
    /// * `Err(TuringMachineError::ParseError)` if the content is not a valid program.
    pub fn load_program_from_string(content: &str) -> Result<Program, TuringMachineError> {
        parse(content)
    }

    /// Loads every description file (`.tm` extension) of a given directory.
    ///
    /// Directories and other files are skipped. Results are sorted by path.
    ///
    /// # Returns
    ///
    /// * `Vec<Result<(PathBuf, Program), TuringMachineError>>` - A vector where each element
    ///   is a `Result` indicating whether a program was successfully loaded (containing its
    ///   path and the `Program` itself) or if an error occurred during loading (containing
    ///   a `TuringMachineError`).
    pub fn load_programs(directory: &Path) -> Vec<Result<(PathBuf, Program), TuringMachineError>> {
        if !directory.exists() {
            return vec![Err(TuringMachineError::FileError(format!(
                "Directory {} does not exist",
                directory.display()
            )))];
        }

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) => {
                return vec![Err(TuringMachineError::FileError(format!(
                    "Failed to read directory {}: {}",
                    directory.display(),
                    e
                )))]
            }
        };

        let mut results: Vec<_> = entries
            .filter_map(|entry| {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(e) => {
                        return Some(Err(TuringMachineError::FileError(format!(
                            "Failed to read directory entry: {}",
                            e
                        ))))
                    }
                };

                let path = entry.path();

                if path.is_dir() || path.extension().is_none_or(|ext| ext != DESCRIPTION_EXTENSION) {
                    return None;
                }

                match Self::load_program(&path) {
                    Ok(program) => Some(Ok((path, program))),
                    Err(e) => Some(Err(TuringMachineError::FileError(format!(
                        "Failed to load program from {}: {}",
                        path.display(),
                        e
                    )))),
                }
            })
            .collect();

        results.sort_by_key(|result| result.as_ref().map(|(path, _)| path.clone()).ok());
        results
    }
}
