//! Crate-wide magic numbers, grouped by domain and documented at the
//! point of definition rather than inlined at each call site.

use std::time::Duration;

// ============================================================================
// Wire protocol
// ============================================================================

/// Maximum accepted frame payload length. Guards against a corrupt or
/// hostile length field parking a reader on an unbounded allocation.
pub const MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

// ============================================================================
// Client demultiplexer timeouts
// ============================================================================

/// Timeout for ordinary request/response operations (REGISTER, LOGIN,
/// ADD_EVENT, NEW_DAY, AGGR_*, FILTER, GET_CURRENT_DAY).
pub const NORMAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for WAIT_SIMUL / WAIT_CONSEC, which legitimately block until the
/// predicate is satisfied or the day ends.
pub const WAIT_TIMEOUT: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// Server bootstrap defaults (spec.md §6)
// ============================================================================

pub const DEFAULT_PORT: u16 = 12345;
pub const DEFAULT_S: usize = 10;
pub const DEFAULT_D: i64 = 365;
pub const DEFAULT_THREADS: usize = 100;

pub const MIN_PORT: u16 = 1024;

/// TCP read timeout used to detect dead peers (spec.md §6).
pub const SOCKET_READ_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Validation bounds (spec.md §4.4)
// ============================================================================

pub const MAX_FILTER_PRODUCTS: usize = 10_000;
pub const MIN_WAIT_CONSEC_N: i64 = 1;
pub const MAX_WAIT_CONSEC_N: i64 = 100_000;
