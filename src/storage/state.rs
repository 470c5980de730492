//! Restart state: `data/state.bin` (spec.md §4.7).
//!
//! Layout: int `currentDay`, int `oldestCleanedDay`. The loader tolerates a
//! missing trailing integer (an older file format) by reconstructing it
//! from `currentDay` and the retention window `D`.

use crate::error::Error;
use crate::protocol::codec::{read_int, write_int};
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetentionState {
    pub current_day: i64,
    pub oldest_cleaned_day: i64,
}

fn state_file_path(data_dir: &Path) -> PathBuf {
    data_dir.join("state.bin")
}

/// Loads the state file, or the zeroed default if it doesn't exist. Any
/// other read or decode failure is logged and treated as a corrupt state
/// file — the caller continues with the default (spec.md §7, "State-file
/// corruption ... log, continue with default state").
pub fn load(data_dir: &Path, retention_window: i64) -> RetentionState {
    let path = state_file_path(data_dir);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => return RetentionState::default(),
        Err(e) => {
            log::warn!("failed to open state file {}: {e}", path.display());
            return RetentionState::default();
        }
    };
    let mut reader = BufReader::new(file);
    let current_day = match read_int(&mut reader) {
        Ok(v) => v as i64,
        Err(e) => {
            log::warn!("corrupt state file {}: {e}", path.display());
            return RetentionState::default();
        }
    };
    let oldest_cleaned_day = match read_int(&mut reader) {
        Ok(v) => v as i64,
        Err(_) => (current_day - retention_window).max(0),
    };
    RetentionState {
        current_day,
        oldest_cleaned_day,
    }
}

/// Writes both integers. Not made atomic with the day-file write; a crash
/// between them leaves the state one day stale, which simply re-persists
/// the same day file on the next close (spec.md §4.7).
pub fn save(data_dir: &Path, state: RetentionState) -> Result<(), Error> {
    let path = state_file_path(data_dir);
    let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
    let mut writer = BufWriter::new(file);
    write_int(&mut writer, state.current_day as i32).map_err(|e| Error::io(&path, e))?;
    write_int(&mut writer, state.oldest_cleaned_day as i32).map_err(|e| Error::io(&path, e))?;
    Ok(())
}
