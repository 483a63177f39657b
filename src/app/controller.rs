//! Container position controller — the hexagonal core.
//!
//! [`FeederController`] owns the calibration table and the selected
//! slot, and is the only component that commands the servo during a
//! slot change.  All I/O flows through port traits injected at call
//! sites, making the entire controller testable with mock adapters.
//!
//! ```text
//!  FeederStore ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                  │    FeederController       │
//!    ServoPort ◀───│  selection · calibration  │
//!    DelayPort ◀───│  MotionPlan execution     │
//!                  └──────────────────────────┘
//! ```
//!
//! Persistence happens before motion: a crash after a reported slot
//! change never leaves a stale selection on reboot.

use log::{info, warn};

use crate::app::commands::FeederCommand;
use crate::app::events::{AppEvent, FeederState};
use crate::app::motion::{ANGLE_MAX, MotionPlan};
use crate::app::ports::{DelayPort, EventSink, FeederStore, ServoPort};
use crate::config::FeederConfig;
use crate::error::{Error, Result};

// ───────────────────────────────────────────────────────────────
// Slot identity
// ───────────────────────────────────────────────────────────────

/// One of the two fixed dispensing positions.
///
/// The discriminant doubles as the wire id (`/container?container=1|2`)
/// and the persisted record byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Slot {
    A = 1,
    B = 2,
}

impl Slot {
    /// Wire / record representation (1 = A, 2 = B).
    pub const fn wire_id(self) -> u8 {
        self as u8
    }

    /// Parse a wire id, rejecting anything outside the defined set.
    pub fn from_wire(id: i32) -> Result<Self> {
        match id {
            1 => Ok(Self::A),
            2 => Ok(Self::B),
            other => Err(Error::InvalidSlot(other)),
        }
    }

    /// Parse a persisted record byte.  `None` marks a corrupt record.
    pub fn from_record_byte(b: u8) -> Option<Self> {
        match b {
            1 => Some(Self::A),
            2 => Some(Self::B),
            _ => None,
        }
    }

    /// The other slot.
    pub const fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Calibration table
// ───────────────────────────────────────────────────────────────

/// Fixed-size mapping from slot to calibrated servo angle.
///
/// Invariant: both angles are within 0..=180.  Construction goes through
/// [`CalibrationTable::try_new`] or starts zeroed, so an out-of-range
/// angle can never reach the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationTable {
    slot_a: u8,
    slot_b: u8,
}

impl CalibrationTable {
    /// First-boot table: both slots at 0°.
    pub const fn zeroed() -> Self {
        Self {
            slot_a: 0,
            slot_b: 0,
        }
    }

    /// Build a table from raw wire integers, validating the range.
    pub fn try_new(slot_a: i32, slot_b: i32) -> Result<Self> {
        Ok(Self {
            slot_a: validate_angle(slot_a)?,
            slot_b: validate_angle(slot_b)?,
        })
    }

    /// Rebuild from persisted record bytes.  `None` marks a corrupt
    /// record (angle beyond the physical range).
    pub fn from_record_bytes(slot_a: u8, slot_b: u8) -> Option<Self> {
        if slot_a > ANGLE_MAX || slot_b > ANGLE_MAX {
            return None;
        }
        Some(Self { slot_a, slot_b })
    }

    /// The calibrated angle for `slot`.
    pub const fn angle_for(self, slot: Slot) -> u8 {
        match slot {
            Slot::A => self.slot_a,
            Slot::B => self.slot_b,
        }
    }

    /// Record representation: one angle byte per slot.
    pub const fn record_bytes(self) -> [u8; 2] {
        [self.slot_a, self.slot_b]
    }
}

fn validate_angle(v: i32) -> Result<u8> {
    if (0..=i32::from(ANGLE_MAX)).contains(&v) {
        Ok(v as u8)
    } else {
        Err(Error::InvalidAngle(v))
    }
}

// ───────────────────────────────────────────────────────────────
// FeederController
// ───────────────────────────────────────────────────────────────

/// The container position controller.
pub struct FeederController {
    calibration: CalibrationTable,
    selection: Slot,
    step_size_deg: u8,
    step_delay_ms: u32,
}

impl FeederController {
    /// Construct the controller from configuration.
    ///
    /// Does **not** restore persisted state — call [`initialize`] next.
    ///
    /// [`initialize`]: Self::initialize
    pub fn new(config: &FeederConfig) -> Self {
        Self {
            calibration: CalibrationTable::zeroed(),
            selection: Slot::A,
            step_size_deg: config.step_size_deg,
            step_delay_ms: config.step_delay_ms,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Restore calibration and selection from the store, then snap the
    /// servo straight to the restored slot's angle.  This is a
    /// cold-start positioning, not a transition: no smoothing.
    ///
    /// Load failures are logged and fall back to the zeroed table and
    /// [`Slot::A`] — first boot and unreadable storage look the same.
    pub fn initialize(
        &mut self,
        store: &impl FeederStore,
        servo: &mut impl ServoPort,
        sink: &mut impl EventSink,
    ) {
        self.calibration = store.load_calibration().unwrap_or_else(|e| {
            warn!("calibration load failed ({e}), using zeroed table");
            CalibrationTable::zeroed()
        });
        self.selection = store.load_selection().unwrap_or_else(|e| {
            warn!("selection load failed ({e}), defaulting to slot A");
            Slot::A
        });

        let angle = self.calibration.angle_for(self.selection);
        servo.command(angle);
        sink.emit(&AppEvent::Started {
            slot: self.selection,
            angle,
        });
        info!(
            "controller ready: slot {:?} at {}°, calibration A={}° B={}°",
            self.selection,
            angle,
            self.calibration.angle_for(Slot::A),
            self.calibration.angle_for(Slot::B),
        );
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (from the HTTP surface or a future
    /// button / MQTT adapter).
    pub fn handle_command(
        &mut self,
        cmd: FeederCommand,
        hw: &mut (impl ServoPort + DelayPort),
        store: &mut impl FeederStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        match cmd {
            FeederCommand::MoveServo { position } => self.command_raw(position, hw),
            FeederCommand::SetCalibration { slot_a, slot_b } => {
                self.set_calibration(slot_a, slot_b, store, sink)
            }
            FeederCommand::SelectContainer { id } => {
                let slot = Slot::from_wire(id)?;
                self.select(slot, hw, store, sink)
            }
            FeederCommand::Feed => self.toggle(hw, store, sink),
        }
    }

    // ── Operations ────────────────────────────────────────────

    /// Command the servo to a raw angle, bypassing slot logic entirely.
    /// No persistence, no selection change.
    pub fn command_raw(&mut self, position: i32, servo: &mut impl ServoPort) -> Result<()> {
        let angle = validate_angle(position)?;
        info!("raw servo move to {angle}°");
        servo.command(angle);
        Ok(())
    }

    /// Replace both calibrated angles and persist the table before
    /// returning.  Rejects out-of-range values without touching state.
    /// Does not move the servo.
    pub fn set_calibration(
        &mut self,
        slot_a: i32,
        slot_b: i32,
        store: &mut impl FeederStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let table = CalibrationTable::try_new(slot_a, slot_b)?;
        self.calibration = table;
        if let Err(e) = store.save_calibration(&table) {
            // Detectable but non-fatal: the in-memory table is already
            // updated and the next successful save re-converges storage.
            warn!("calibration save failed: {e}");
        }
        sink.emit(&AppEvent::CalibrationUpdated {
            slot_a: table.angle_for(Slot::A),
            slot_b: table.angle_for(Slot::B),
        });
        info!(
            "calibration updated: A={}° B={}°",
            table.angle_for(Slot::A),
            table.angle_for(Slot::B)
        );
        Ok(())
    }

    /// Move the dispenser over `slot`.
    ///
    /// Selecting the current slot is a success no-op: no motion, no
    /// persistence write.  Otherwise the new selection is persisted
    /// first, then the smooth transition runs to completion before this
    /// returns — the call blocks for the whole step sequence.
    pub fn select(
        &mut self,
        slot: Slot,
        hw: &mut (impl ServoPort + DelayPort),
        store: &mut impl FeederStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        if slot == self.selection {
            return Ok(());
        }

        if let Err(e) = store.save_selection(slot) {
            warn!("selection save failed: {e}");
        }

        let from = self.selection;
        let start = self.calibration.angle_for(from);
        let target = self.calibration.angle_for(slot);
        self.run_transition(start, target, hw);

        self.selection = slot;
        sink.emit(&AppEvent::SlotChanged { from, to: slot });
        info!("slot change complete: {from:?} -> {slot:?} ({start}° -> {target}°)");
        Ok(())
    }

    /// Swing to the other container.  Always causes motion, since by
    /// construction the target differs from the current selection.
    pub fn toggle(
        &mut self,
        hw: &mut (impl ServoPort + DelayPort),
        store: &mut impl FeederStore,
        sink: &mut impl EventSink,
    ) -> Result<()> {
        self.select(self.selection.other(), hw, store, sink)
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot of the current selection and calibration, no side effects.
    pub fn query_state(&self) -> FeederState {
        FeederState {
            selection: self.selection,
            calibration: self.calibration,
        }
    }

    // ── Internal ──────────────────────────────────────────────

    /// Execute one smooth transition: paced intermediate commands, then
    /// the exact target.  Equal angles perform no motion at all.
    fn run_transition(&self, start: u8, target: u8, hw: &mut (impl ServoPort + DelayPort)) {
        let plan = MotionPlan::between(start, target, self.step_size_deg, self.step_delay_ms);
        if plan.is_stationary() {
            return;
        }
        info!(
            "transition {start}° -> {target}° ({} steps, ~{} ms)",
            plan.step_count(),
            plan.duration_ms()
        );
        for angle in plan.intermediates() {
            hw.command(angle);
            hw.delay_ms(plan.step_delay_ms());
        }
        hw.command(plan.target());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::StorageError;

    // ── Mock ports ────────────────────────────────────────────

    /// Records every commanded angle; delays are no-ops.
    #[derive(Default)]
    struct MockServo {
        commands: Vec<u8>,
    }

    impl ServoPort for MockServo {
        fn command(&mut self, angle: u8) {
            self.commands.push(angle);
        }
    }

    impl DelayPort for MockServo {
        fn delay_ms(&mut self, _ms: u32) {}
    }

    /// In-memory store counting writes, optionally failing them.
    #[derive(Default)]
    struct MockStore {
        calibration: Option<[u8; 2]>,
        selection: Option<u8>,
        cal_writes: usize,
        sel_writes: usize,
        fail_writes: bool,
    }

    impl FeederStore for MockStore {
        fn load_calibration(&self) -> core::result::Result<CalibrationTable, StorageError> {
            Ok(self
                .calibration
                .and_then(|[a, b]| CalibrationTable::from_record_bytes(a, b))
                .unwrap_or(CalibrationTable::zeroed()))
        }

        fn load_selection(&self) -> core::result::Result<Slot, StorageError> {
            Ok(self
                .selection
                .and_then(Slot::from_record_byte)
                .unwrap_or(Slot::A))
        }

        fn save_calibration(
            &mut self,
            table: &CalibrationTable,
        ) -> core::result::Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::IoError);
            }
            self.cal_writes += 1;
            self.calibration = Some(table.record_bytes());
            Ok(())
        }

        fn save_selection(&mut self, slot: Slot) -> core::result::Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::IoError);
            }
            self.sel_writes += 1;
            self.selection = Some(slot.wire_id());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<AppEvent>,
    }

    impl EventSink for RecordingSink {
        fn emit(&mut self, event: &AppEvent) {
            self.events.push(*event);
        }
    }

    fn make_controller() -> FeederController {
        FeederController::new(&FeederConfig::default())
    }

    fn calibrated(a: u8, b: u8) -> (FeederController, MockStore) {
        let mut ctl = make_controller();
        let mut store = MockStore::default();
        let mut sink = RecordingSink::default();
        ctl.set_calibration(i32::from(a), i32::from(b), &mut store, &mut sink)
            .unwrap();
        (ctl, store)
    }

    // ── Calibration ───────────────────────────────────────────

    #[test]
    fn accepts_full_angle_range() {
        let mut ctl = make_controller();
        let mut store = MockStore::default();
        let mut sink = RecordingSink::default();
        for angle in 0..=180 {
            assert!(ctl.set_calibration(angle, 180 - angle, &mut store, &mut sink).is_ok());
        }
    }

    #[test]
    fn rejects_out_of_range_without_mutation() {
        let (mut ctl, mut store) = calibrated(20, 160);
        let mut sink = RecordingSink::default();
        let before = ctl.query_state();
        let writes_before = store.cal_writes;

        assert_eq!(
            ctl.set_calibration(200, 50, &mut store, &mut sink),
            Err(Error::InvalidAngle(200))
        );
        assert_eq!(
            ctl.set_calibration(90, -1, &mut store, &mut sink),
            Err(Error::InvalidAngle(-1))
        );
        assert_eq!(
            ctl.set_calibration(181, 181, &mut store, &mut sink),
            Err(Error::InvalidAngle(181))
        );

        assert_eq!(ctl.query_state(), before);
        assert_eq!(store.cal_writes, writes_before);
        assert!(sink.events.is_empty());
    }

    #[test]
    fn calibration_persists_before_returning() {
        let (_, store) = calibrated(20, 160);
        assert_eq!(store.calibration, Some([20, 160]));
        assert_eq!(store.cal_writes, 1);
    }

    #[test]
    fn calibration_does_not_move_the_servo() {
        let mut ctl = make_controller();
        let mut store = MockStore::default();
        let mut sink = RecordingSink::default();
        let servo = MockServo::default();
        ctl.set_calibration(20, 160, &mut store, &mut sink).unwrap();
        assert!(servo.commands.is_empty());
    }

    // ── Selection ─────────────────────────────────────────────

    #[test]
    fn select_current_slot_is_a_silent_no_op() {
        let (mut ctl, mut store) = calibrated(20, 160);
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();

        ctl.select(Slot::A, &mut hw, &mut store, &mut sink).unwrap();

        assert!(hw.commands.is_empty(), "no servo command on re-select");
        assert_eq!(store.sel_writes, 0, "no persistence write on re-select");
        assert!(sink.events.is_empty());
    }

    #[test]
    fn select_other_slot_persists_before_motion_and_lands_exactly() {
        let (mut ctl, mut store) = calibrated(20, 160);
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();

        ctl.select(Slot::B, &mut hw, &mut store, &mut sink).unwrap();

        assert_eq!(store.selection, Some(2), "selection persisted as B");
        assert_eq!(*hw.commands.last().unwrap(), 160);
        assert!(
            hw.commands.windows(2).all(|w| w[1] > w[0]),
            "monotonically increasing sweep: {:?}",
            hw.commands
        );
        assert!(hw.commands.iter().all(|&a| (20..=160).contains(&a)));
        assert_eq!(ctl.query_state().selection, Slot::B);
        assert_eq!(
            sink.events,
            vec![AppEvent::SlotChanged {
                from: Slot::A,
                to: Slot::B
            }]
        );
    }

    #[test]
    fn sub_step_distance_still_lands_on_target() {
        let (mut ctl, mut store) = calibrated(90, 93);
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();

        ctl.select(Slot::B, &mut hw, &mut store, &mut sink).unwrap();
        assert_eq!(hw.commands, vec![93]);
    }

    #[test]
    fn equal_calibrated_angles_change_selection_without_motion() {
        let (mut ctl, mut store) = calibrated(90, 90);
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();

        ctl.select(Slot::B, &mut hw, &mut store, &mut sink).unwrap();
        assert!(hw.commands.is_empty());
        assert_eq!(ctl.query_state().selection, Slot::B);
        assert_eq!(store.selection, Some(2));
    }

    #[test]
    fn failed_selection_save_is_tolerated() {
        let (mut ctl, mut store) = calibrated(20, 160);
        store.fail_writes = true;
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();

        ctl.select(Slot::B, &mut hw, &mut store, &mut sink).unwrap();
        assert_eq!(ctl.query_state().selection, Slot::B);
        assert_eq!(*hw.commands.last().unwrap(), 160);
    }

    // ── Toggle ────────────────────────────────────────────────

    #[test]
    fn toggle_always_moves_and_double_toggle_returns_home() {
        let (mut ctl, mut store) = calibrated(20, 160);
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();

        ctl.toggle(&mut hw, &mut store, &mut sink).unwrap();
        assert_eq!(ctl.query_state().selection, Slot::B);
        assert_eq!(*hw.commands.last().unwrap(), 160);

        ctl.toggle(&mut hw, &mut store, &mut sink).unwrap();
        assert_eq!(ctl.query_state().selection, Slot::A);
        assert_eq!(*hw.commands.last().unwrap(), 20);
        assert_eq!(store.sel_writes, 2);
    }

    // ── Raw moves ─────────────────────────────────────────────

    #[test]
    fn raw_move_bypasses_selection_and_persistence() {
        let (mut ctl, store) = calibrated(20, 160);
        let mut servo = MockServo::default();

        ctl.command_raw(77, &mut servo).unwrap();
        assert_eq!(servo.commands, vec![77]);
        assert_eq!(ctl.query_state().selection, Slot::A);
        assert_eq!(store.sel_writes, 0);
    }

    #[test]
    fn raw_move_rejects_out_of_range() {
        let mut ctl = make_controller();
        let mut servo = MockServo::default();
        assert_eq!(ctl.command_raw(181, &mut servo), Err(Error::InvalidAngle(181)));
        assert_eq!(ctl.command_raw(-3, &mut servo), Err(Error::InvalidAngle(-3)));
        assert!(servo.commands.is_empty());
    }

    // ── Startup ───────────────────────────────────────────────

    #[test]
    fn initialize_snaps_to_restored_slot_without_smoothing() {
        let mut store = MockStore::default();
        store.calibration = Some([20, 160]);
        store.selection = Some(2);

        let mut ctl = make_controller();
        let mut servo = MockServo::default();
        let mut sink = RecordingSink::default();
        ctl.initialize(&store, &mut servo, &mut sink);

        assert_eq!(servo.commands, vec![160], "single direct command");
        assert_eq!(ctl.query_state().selection, Slot::B);
        assert_eq!(
            sink.events,
            vec![AppEvent::Started {
                slot: Slot::B,
                angle: 160
            }]
        );
    }

    #[test]
    fn initialize_defaults_on_empty_store() {
        let store = MockStore::default();
        let mut ctl = make_controller();
        let mut servo = MockServo::default();
        let mut sink = RecordingSink::default();
        ctl.initialize(&store, &mut servo, &mut sink);

        assert_eq!(ctl.query_state().selection, Slot::A);
        assert_eq!(servo.commands, vec![0]);
    }

    #[test]
    fn restart_reproduces_persisted_selection() {
        let (mut ctl, mut store) = calibrated(20, 160);
        let mut hw = MockServo::default();
        let mut sink = RecordingSink::default();
        ctl.toggle(&mut hw, &mut store, &mut sink).unwrap();

        // Simulated power cycle: fresh controller, same store.
        let mut rebooted = make_controller();
        let mut servo = MockServo::default();
        rebooted.initialize(&store, &mut servo, &mut sink);
        assert_eq!(rebooted.query_state().selection, Slot::B);
        assert_eq!(servo.commands, vec![160]);
    }

    // ── Wire parsing ──────────────────────────────────────────

    #[test]
    fn slot_wire_ids_round_trip() {
        assert_eq!(Slot::from_wire(1), Ok(Slot::A));
        assert_eq!(Slot::from_wire(2), Ok(Slot::B));
        assert_eq!(Slot::from_wire(0), Err(Error::InvalidSlot(0)));
        assert_eq!(Slot::from_wire(3), Err(Error::InvalidSlot(3)));
        assert_eq!(Slot::from_wire(-1), Err(Error::InvalidSlot(-1)));
    }

    #[test]
    fn corrupt_records_read_as_none() {
        assert_eq!(Slot::from_record_byte(0), None);
        assert_eq!(Slot::from_record_byte(255), None);
        assert!(CalibrationTable::from_record_bytes(181, 0).is_none());
        assert!(CalibrationTable::from_record_bytes(0, 200).is_none());
        assert!(CalibrationTable::from_record_bytes(180, 180).is_some());
    }
}
