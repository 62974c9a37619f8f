//! # Boot Violation Replay
//!
//! Replays one node's events over a minting period and reports every
//! wake-up that took longer than the allowed boot time.
//!
//! ## Algorithm
//!
//! 1. `end_time = min(checkpoint_time, period.end + post_period)`
//! 2. Load uptime, target and state events in `[period.start, end_time]`
//! 3. Seed the state machine from the snapshot at the period start
//! 4. Replay in `(timestamp, event_index)` order
//! 5. A wake-up still pending at `end_time` past the boot limit is
//!    reported without a boot time

use tracing::debug;

use shared_types::{ChainEvent, NodeId, Period, Timestamp, Violation};

use crate::config::DetectionConfig;
use crate::domain::{ReplayState, ViolationError};
use crate::ports::EventSource;

/// Observation horizon of a period given the ingestion checkpoint.
pub fn observation_end(checkpoint_time: Timestamp, period: &Period, post_period: Timestamp) -> Timestamp {
    checkpoint_time.min(period.end + post_period)
}

/// Run the state machine over `events`. The input order does not matter.
pub fn replay(
    node_id: NodeId,
    initial: ReplayState,
    mut events: Vec<ChainEvent>,
    end_time: Timestamp,
    max_boot_time: Timestamp,
) -> Vec<Violation> {
    events.sort_by(ChainEvent::replay_cmp);

    let mut replay = initial;
    let mut violations = Vec::new();
    for event in &events {
        debug!("[fv-03] node {} event {:?}", node_id, event);
        match event {
            ChainEvent::Uptime(uptime) => {
                if let Some((power_managed, boot_requested)) = replay.awaiting_boot() {
                    let boot_time = uptime.timestamp - uptime.uptime as Timestamp;
                    if boot_time > power_managed {
                        debug!("[fv-03] node {} booted at {}", node_id, boot_time);
                        if boot_time > boot_requested + max_boot_time {
                            violations.push(Violation {
                                boot_requested,
                                booted_at: Some(boot_time),
                                end_time,
                            });
                        }
                        replay.clear_watermarks();
                    }
                }
            }
            ChainEvent::Target(target) => replay.on_target(target),
            ChainEvent::State(state) => replay.on_state(state),
        }
        debug!(
            "[fv-03] node {} power_managed={:?} power_manage_boot={:?}",
            node_id, replay.power_managed, replay.power_manage_boot
        );
    }

    if let Some(boot_requested) = replay.power_manage_boot {
        if end_time > boot_requested + max_boot_time {
            violations.push(Violation {
                boot_requested,
                booted_at: None,
                end_time,
            });
        }
    }
    violations
}

/// Violations of `node_id` during `period`. Reads only.
pub fn check_node<E: EventSource + ?Sized>(
    source: &E,
    node_id: NodeId,
    period: &Period,
    config: &DetectionConfig,
) -> Result<Vec<Violation>, ViolationError> {
    let checkpoint_time = source
        .checkpoint_time()?
        .ok_or(ViolationError::MissingCheckpoint)?;
    let end_time = observation_end(checkpoint_time, period, config.post_period());

    let mut events = Vec::new();
    events.extend(
        source
            .uptime_events(node_id, period.start, end_time)?
            .into_iter()
            .map(ChainEvent::Uptime),
    );
    events.extend(
        source
            .state_events(node_id, period.start, end_time)?
            .into_iter()
            .map(ChainEvent::State),
    );
    events.extend(
        source
            .target_events(node_id, period.start, end_time)?
            .into_iter()
            .map(ChainEvent::Target),
    );

    let snapshot = source.power_snapshot_near(node_id, period.start, config.period_catch())?;
    let initial = ReplayState::from_snapshot(snapshot.as_ref());
    debug!(
        "[fv-03] Checking node {} in period {} up to {} ({} events)",
        node_id,
        period.offset,
        end_time,
        events.len()
    );

    Ok(replay(node_id, initial, events, end_time, config.max_boot_time()))
}
