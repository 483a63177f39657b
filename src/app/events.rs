//! Outbound application events.
//!
//! The [`FeederController`](super::controller::FeederController) emits
//! these through the [`EventSink`](super::ports::EventSink) port.
//! Adapters on the other side decide what to do with them — log to
//! serial, publish over the network, etc.

use super::controller::{CalibrationTable, Slot};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEvent {
    /// The controller restored its state and snapped the servo into
    /// position (carries the restored slot and its angle).
    Started { slot: Slot, angle: u8 },

    /// A completed slot change.
    SlotChanged { from: Slot, to: Slot },

    /// The calibration table was replaced.
    CalibrationUpdated { slot_a: u8, slot_b: u8 },
}

/// A point-in-time snapshot of controller state, suitable for logging
/// or transmission.  Returned by `query_state` without side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeederState {
    pub selection: Slot,
    pub calibration: CalibrationTable,
}
