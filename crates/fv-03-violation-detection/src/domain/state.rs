//! # Replay State
//!
//! Power state machine of one node while its events are replayed in
//! ledger order.
//!
//! ## Watermarks
//!
//! | Field | Set when | Cleared when |
//! |-------|----------|--------------|
//! | `power_managed` | node first confirmed asleep after a `Down` target | a boot after it is proven |
//! | `power_manage_boot` | wake-up requested while asleep | a boot after `power_managed` is proven |

use shared_types::{
    Power, PowerStateChanged, PowerStateSnapshot, PowerTargetChanged, Timestamp,
};

/// Time past the period end during which a late boot can still be proven.
pub const POST_PERIOD_SECS: u64 = 27 * 60 * 60;

/// Tolerance when matching a snapshot to the period start.
pub const PERIOD_CATCH_SECS: u64 = 30;

/// Time a node has to boot after a wake-up request.
pub const MAX_BOOT_TIME_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayState {
    pub state: Power,
    pub target: Power,
    /// When the node went to sleep under power management.
    pub power_managed: Option<Timestamp>,
    /// When the pending wake-up was requested.
    pub power_manage_boot: Option<Timestamp>,
}

impl Default for ReplayState {
    fn default() -> Self {
        Self {
            state: Power::Up,
            target: Power::Up,
            power_managed: None,
            power_manage_boot: None,
        }
    }
}

impl ReplayState {
    /// Initial condition from the snapshot at the period start.
    ///
    /// A sleeping node starts power managed since its `down_time`. If its
    /// target is already `Up`, the wake-up counts as requested at the
    /// snapshot's block time.
    pub fn from_snapshot(snapshot: Option<&PowerStateSnapshot>) -> Self {
        let Some(snapshot) = snapshot else {
            return Self::default();
        };
        let mut replay = Self {
            state: snapshot.state,
            target: snapshot.target,
            ..Self::default()
        };
        if snapshot.state.is_down() {
            replay.power_managed = snapshot.down_time;
            if snapshot.target == Power::Up {
                replay.power_manage_boot = Some(snapshot.timestamp);
            }
        }
        replay
    }

    /// Both watermarks armed: an uptime report can settle the wake-up.
    pub fn awaiting_boot(&self) -> Option<(Timestamp, Timestamp)> {
        self.power_managed.zip(self.power_manage_boot)
    }

    pub fn on_target(&mut self, event: &PowerTargetChanged) {
        if event.target == Power::Up && self.state.is_down() && self.power_manage_boot.is_none() {
            self.power_manage_boot = Some(event.timestamp);
        }
        self.target = event.target;
    }

    /// Only the first sleep counts; later `Down` confirmations keep the
    /// original watermark.
    pub fn on_state(&mut self, event: &PowerStateChanged) {
        if self.state == Power::Up
            && self.target.is_down()
            && event.state.is_down()
            && self.power_managed.is_none()
        {
            self.power_managed = Some(event.timestamp);
        }
        self.state = event.state;
    }

    pub fn clear_watermarks(&mut self) {
        self.power_managed = None;
        self.power_manage_boot = None;
    }
}
