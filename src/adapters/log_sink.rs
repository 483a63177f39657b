//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! A future MQTT or display adapter would implement the same trait.

use log::info;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { slot, angle } => {
                info!("START | slot={:?} angle={}\u{00b0}", slot, angle);
            }
            AppEvent::SlotChanged { from, to } => {
                info!("SLOT  | {:?} -> {:?}", from, to);
            }
            AppEvent::CalibrationUpdated { slot_a, slot_b } => {
                info!(
                    "CAL   | A={}\u{00b0} B={}\u{00b0}",
                    slot_a, slot_b
                );
            }
        }
    }
}
