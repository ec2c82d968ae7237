//! This module reads and writes encoded transition tables on disk. Encoding and
//! decoding files is a distinct phase outside the simulator's and compiler's
//! hot paths; nothing here is touched during a run.

use std::fs;
use std::path::{Path, PathBuf};

use crate::encoder::encode;
use crate::parser::parse;
use crate::transitions::TransitionTable;
use crate::types::MachineError;

/// The file extension for encoded transition tables.
pub const TABLE_EXTENSION: &str = "tm";

/// Loads and parses an encoded table file.
///
/// # Arguments
///
/// * `path` - The path of the encoded table file to load.
///
/// # Returns
///
/// * `Ok(TransitionTable)` if the file is read and parsed successfully.
/// * `Err(MachineError::File)` if the file cannot be read.
/// * `Err(MachineError::Syntax)` or `Err(MachineError::Format)` if its content
///   is not a valid table.
pub fn load(path: &Path) -> Result<TransitionTable, MachineError> {
    let content = fs::read_to_string(path).map_err(|e| {
        MachineError::File(format!("failed to read {}: {e}", path.display()))
    })?;
    parse(&content)
}

/// Serializes a table into an encoded table file.
pub fn save(path: &Path, table: &TransitionTable) -> Result<(), MachineError> {
    fs::write(path, encode(table)).map_err(|e| {
        MachineError::File(format!("failed to write {}: {e}", path.display()))
    })
}

/// Loads every `.tm` file in a directory.
///
/// Directories and files with other extensions are skipped; a file that fails
/// to read or parse contributes an error to the result instead of aborting the
/// scan.
pub fn load_dir(directory: &Path) -> Vec<Result<(PathBuf, TransitionTable), MachineError>> {
    let entries = match fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(e) => {
            return vec![Err(MachineError::File(format!(
                "failed to read directory {}: {e}",
                directory.display()
            )))]
        }
    };

    entries
        .filter_map(|entry| {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    return Some(Err(MachineError::File(format!(
                        "failed to read directory entry: {e}"
                    ))))
                }
            };

            let path = entry.path();
            if path.is_dir() || path.extension().is_none_or(|ext| ext != TABLE_EXTENSION) {
                return None;
            }

            match load(&path) {
                Ok(table) => Some(Ok((path, table))),
                Err(e) => Some(Err(e)),
            }
        })
        .collect()
}
