//! # Worker Scaling Policy
//!
//! Evaluated on every control tick.
//!
//! | Condition | Action |
//! |-----------|--------|
//! | depth < 2 and live > min | shrink to min, minus shutdowns already queued |
//! | depth < max and live < min | grow to min |
//! | depth > max and live < max | grow to max |

/// What the scheduler should do with the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleAction {
    /// Queue this many shutdown messages.
    Shrink(usize),
    /// Spawn this many workers.
    Grow(usize),
    Hold,
}

pub fn plan_scaling(
    depth: usize,
    live: usize,
    pending_shutdowns: usize,
    min_workers: usize,
    max_workers: usize,
) -> ScaleAction {
    if depth < 2 && live > min_workers {
        let excess = (live - min_workers).saturating_sub(pending_shutdowns);
        return if excess > 0 {
            ScaleAction::Shrink(excess)
        } else {
            ScaleAction::Hold
        };
    }

    if depth < max_workers && live < min_workers {
        return ScaleAction::Grow(min_workers - live);
    }

    if depth > max_workers && live < max_workers {
        return ScaleAction::Grow(max_workers - live);
    }

    ScaleAction::Hold
}
