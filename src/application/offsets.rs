//! Page boundary arithmetic for offset-based listing.

use crate::domain::{StopOffset, PAGE_SIZE};

/// Offsets still needing a listing call after the first page at `start`.
///
/// Yields `start + 20, start + 40, ...` up to and including `total`.
#[must_use]
pub fn generate_offsets(start: u64, total: u64) -> Vec<u64> {
    (1..)
        .map(|step| start + step * PAGE_SIZE)
        .take_while(|offset| *offset <= total)
        .collect()
}

/// Offsets actually listed, halting at (and excluding) the stop offset.
#[must_use]
pub fn offsets_until(offsets: &[u64], stop: StopOffset) -> &[u64] {
    let end = offsets
        .iter()
        .position(|offset| stop.reached(*offset))
        .unwrap_or(offsets.len());
    &offsets[..end]
}

/// Number of conversations the caller asked for.
#[must_use]
pub const fn request_count(total: u64, start: u64, stop: StopOffset) -> u64 {
    match stop {
        StopOffset::Unlimited => total,
        StopOffset::Limit(limit) => limit.saturating_sub(start),
    }
}

/// Offset reported with the final progress event.
#[must_use]
pub fn last_offset(start: u64, offsets: &[u64], stop: StopOffset) -> u64 {
    match stop {
        StopOffset::Limit(limit) => limit,
        StopOffset::Unlimited => offsets.last().copied().unwrap_or(start),
    }
}
