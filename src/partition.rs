// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Windowed batch selection over the peer population.
//!
//! Querying every peer every round would melt the transport, so rounds walk
//! the population in fixed-size windows. The cursor lives in validator state
//! and survives restarts; the math here is pure.

/// Outcome of one window selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowSelection {
    /// Uids inside the window, in ascending order.
    pub uids: Vec<u16>,
    /// Cursor value the caller must store for the next round.
    pub next_group: usize,
}

impl WindowSelection {
    fn empty() -> Self {
        Self {
            uids: Vec::new(),
            next_group: 0,
        }
    }
}

/// Selects the half-open window `[max_batch * group, max_batch * (group + 1))`
/// clipped to the population.
///
/// Rules:
/// - `max_batch >= population`: the whole population is returned and the
///   cursor is left untouched. Batching is a no-op at that size.
/// - The window reaching the end of the population wraps the cursor to 0.
/// - A stale cursor (window start at or past the end, after the population
///   shrank) yields an empty batch and resets the cursor. The skipped round
///   is the price of never querying uids that no longer exist.
pub fn select_window(population: usize, max_batch: usize, group: usize) -> WindowSelection {
    debug_assert!(population <= u16::MAX as usize + 1, "population exceeds uid range");
    if population == 0 || max_batch == 0 {
        return WindowSelection::empty();
    }
    if max_batch >= population {
        return WindowSelection {
            uids: (0..population as u16).collect(),
            next_group: group,
        };
    }

    let start = max_batch.saturating_mul(group);
    if start >= population {
        // Stale cursor from a shrunken population.
        return WindowSelection::empty();
    }

    let end = usize::min(start + max_batch, population);
    let uids = (start as u16..end as u16).collect();
    let next_group = if end == population { 0 } else { group + 1 };
    WindowSelection { uids, next_group }
}
