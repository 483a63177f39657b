//! Inbound commands to the application core.
//!
//! These represent actions requested by the outside world (HTTP surface,
//! future button or MQTT adapters) that the
//! [`FeederController`](super::controller::FeederController) interprets
//! and acts upon.  Parameters arrive as raw wire integers; range and slot
//! validation happens when the command is executed.

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeederCommand {
    /// Command the servo to a raw absolute angle, bypassing slot logic.
    /// Used for bench alignment before writing a calibration.
    MoveServo { position: i32 },

    /// Replace both calibrated slot angles and persist them.
    SetCalibration { slot_a: i32, slot_b: i32 },

    /// Move the dispenser over the container with the given wire id
    /// (1 = A, 2 = B) and persist the selection.
    SelectContainer { id: i32 },

    /// Dispense: swing to the other container.
    Feed,
}
