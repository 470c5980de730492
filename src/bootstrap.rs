//! Argument validation, split out from the `clap` parsing in the binary so
//! it's unit-testable without going through a CLI parser (spec.md §6).

use crate::constants::MIN_PORT;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerArgs {
    pub port: u16,
    pub loaded_series_capacity: usize,
    pub retention_window: i64,
    pub threads: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgsError {
    #[error("port must be in [{MIN_PORT}, 65535], got {0}")]
    InvalidPort(i64),
    #[error("S must be a positive integer, got {0}")]
    InvalidS(i64),
    #[error("D must be a positive integer, got {0}")]
    InvalidD(i64),
    #[error("threads must be a positive integer, got {0}")]
    InvalidThreads(i64),
}

/// Validates the four positional arguments. `clap` handles parsing
/// strings into integers and printing `--help`; this only enforces the
/// semantic ranges from spec.md §6.
pub fn validate(port: i64, s: i64, d: i64, threads: i64) -> Result<ServerArgs, ArgsError> {
    if port < i64::from(MIN_PORT) || port > 65535 {
        return Err(ArgsError::InvalidPort(port));
    }
    if s <= 0 {
        return Err(ArgsError::InvalidS(s));
    }
    if d <= 0 {
        return Err(ArgsError::InvalidD(d));
    }
    if threads <= 0 {
        return Err(ArgsError::InvalidThreads(threads));
    }

    Ok(ServerArgs {
        port: port as u16,
        loaded_series_capacity: s as usize,
        retention_window: d,
        threads: threads as usize,
    })
}
