//! Integration tests: HTTP router → FeederController → store → servo.
//!
//! Exercises the full command surface against the simulation NVS
//! backend, including a simulated power cycle (fresh controller, same
//! store) and the persist-before-motion ordering guarantee.

#![cfg(not(target_os = "espidf"))]

use std::cell::RefCell;
use std::rc::Rc;

use catfeeder::adapters::nvs::NvsAdapter;
use catfeeder::app::controller::{CalibrationTable, FeederController, Slot};
use catfeeder::app::events::AppEvent;
use catfeeder::app::ports::{DelayPort, EventSink, FeederStore, ServoPort, StorageError};
use catfeeder::config::FeederConfig;
use catfeeder::http::router::{route, Request, Response};

// ── Mock implementations ──────────────────────────────────────

/// Records every commanded angle; delays are no-ops so motion runs
/// instantly.
#[derive(Default)]
struct MockHw {
    commands: Vec<u8>,
}

impl ServoPort for MockHw {
    fn command(&mut self, angle: u8) {
        self.commands.push(angle);
    }
}

impl DelayPort for MockHw {
    fn delay_ms(&mut self, _ms: u32) {}
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &AppEvent) {}
}

/// One entry per externally visible side effect, in wall-clock order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Trace {
    SavedSelection(u8),
    SavedCalibration([u8; 2]),
    Servo(u8),
}

type TraceLog = Rc<RefCell<Vec<Trace>>>;

/// Store and servo sharing one trace log, for ordering assertions.
struct TracingStore {
    log: TraceLog,
    calibration: Option<[u8; 2]>,
    selection: Option<u8>,
}

impl TracingStore {
    fn new(log: TraceLog) -> Self {
        Self {
            log,
            calibration: None,
            selection: None,
        }
    }
}

impl FeederStore for TracingStore {
    fn load_calibration(&self) -> Result<CalibrationTable, StorageError> {
        Ok(self
            .calibration
            .and_then(|[a, b]| CalibrationTable::from_record_bytes(a, b))
            .unwrap_or(CalibrationTable::zeroed()))
    }

    fn load_selection(&self) -> Result<Slot, StorageError> {
        Ok(self
            .selection
            .and_then(Slot::from_record_byte)
            .unwrap_or(Slot::A))
    }

    fn save_calibration(&mut self, table: &CalibrationTable) -> Result<(), StorageError> {
        self.calibration = Some(table.record_bytes());
        self.log
            .borrow_mut()
            .push(Trace::SavedCalibration(table.record_bytes()));
        Ok(())
    }

    fn save_selection(&mut self, slot: Slot) -> Result<(), StorageError> {
        self.selection = Some(slot.wire_id());
        self.log
            .borrow_mut()
            .push(Trace::SavedSelection(slot.wire_id()));
        Ok(())
    }
}

struct TracingHw {
    log: TraceLog,
}

impl ServoPort for TracingHw {
    fn command(&mut self, angle: u8) {
        self.log.borrow_mut().push(Trace::Servo(angle));
    }
}

impl DelayPort for TracingHw {
    fn delay_ms(&mut self, _ms: u32) {}
}

// ── Helpers ───────────────────────────────────────────────────

fn get(
    target: &str,
    controller: &mut FeederController,
    hw: &mut MockHw,
    store: &mut NvsAdapter,
) -> Response {
    route(&Request::get(target), controller, hw, store, &mut NullSink)
}

// ── Full-surface scenario ─────────────────────────────────────

#[test]
fn calibrate_select_restart_and_feed() {
    let mut store = NvsAdapter::new().unwrap();
    let mut hw = MockHw::default();
    let mut controller = FeederController::new(&FeederConfig::default());
    controller.initialize(&store, &mut hw, &mut NullSink);
    assert_eq!(hw.commands, vec![0], "first boot snaps to 0° on slot A");
    hw.commands.clear();

    // Identity check.
    let resp = get("/", &mut controller, &mut hw, &mut store);
    assert_eq!((resp.status, resp.body.as_str()), (200, "Cat Feeder"));

    // Calibrate both slots.
    let resp = get("/servo/pos?c1=20&c2=160", &mut controller, &mut hw, &mut store);
    assert_eq!(resp.body, "{success: true}");
    assert!(hw.commands.is_empty(), "calibration must not move the servo");

    // Select container 2: monotonic climb, exact landing.
    let resp = get("/container?container=2", &mut controller, &mut hw, &mut store);
    assert_eq!(resp.body, "{success: true}");
    assert!(
        hw.commands.windows(2).all(|w| w[1] > w[0]),
        "sweep must climb monotonically: {:?}",
        hw.commands
    );
    assert_eq!(*hw.commands.last().unwrap(), 160);
    assert_eq!(controller.query_state().selection, Slot::B);

    // Simulated power cycle: fresh controller, same store.
    let mut rebooted = FeederController::new(&FeederConfig::default());
    let mut servo = MockHw::default();
    rebooted.initialize(&store, &mut servo, &mut NullSink);
    assert_eq!(rebooted.query_state().selection, Slot::B);
    assert_eq!(servo.commands, vec![160], "cold-start snap, no smoothing");

    // Feed swings back to slot A.
    servo.commands.clear();
    let resp = get("/feed", &mut rebooted, &mut servo, &mut store);
    assert_eq!(resp.body, "{success: true}");
    assert_eq!(rebooted.query_state().selection, Slot::A);
    assert_eq!(*servo.commands.last().unwrap(), 20);
    assert!(
        servo.commands.windows(2).all(|w| w[1] < w[0]),
        "return sweep must descend: {:?}",
        servo.commands
    );
}

#[test]
fn double_feed_returns_to_the_original_slot() {
    let mut store = NvsAdapter::new().unwrap();
    let mut hw = MockHw::default();
    let mut controller = FeederController::new(&FeederConfig::default());
    controller.initialize(&store, &mut hw, &mut NullSink);
    get("/servo/pos?c1=20&c2=160", &mut controller, &mut hw, &mut store);

    get("/feed", &mut controller, &mut hw, &mut store);
    get("/feed", &mut controller, &mut hw, &mut store);

    assert_eq!(controller.query_state().selection, Slot::A);
    assert_eq!(*hw.commands.last().unwrap(), 20);

    // The store agrees after a reload.
    let mut rebooted = FeederController::new(&FeederConfig::default());
    let mut servo = MockHw::default();
    rebooted.initialize(&store, &mut servo, &mut NullSink);
    assert_eq!(rebooted.query_state().selection, Slot::A);
}

// ── Ordering guarantee ────────────────────────────────────────

#[test]
fn selection_is_persisted_before_motion_begins() {
    let log: TraceLog = Rc::new(RefCell::new(Vec::new()));
    let mut store = TracingStore::new(Rc::clone(&log));
    let mut hw = TracingHw {
        log: Rc::clone(&log),
    };
    let mut controller = FeederController::new(&FeederConfig::default());
    controller
        .set_calibration(20, 160, &mut store, &mut NullSink)
        .unwrap();

    controller
        .toggle(&mut hw, &mut store, &mut NullSink)
        .unwrap();

    let entries = log.borrow();
    let save_at = entries
        .iter()
        .position(|t| *t == Trace::SavedSelection(2))
        .expect("selection write missing");
    let first_servo = entries
        .iter()
        .position(|t| matches!(t, Trace::Servo(_)))
        .expect("no servo motion");
    assert!(
        save_at < first_servo,
        "selection must be durable before the first servo command: {:?}",
        *entries
    );
}

#[test]
fn reselecting_the_current_slot_writes_and_moves_nothing() {
    let log: TraceLog = Rc::new(RefCell::new(Vec::new()));
    let mut store = TracingStore::new(Rc::clone(&log));
    let mut hw = TracingHw {
        log: Rc::clone(&log),
    };
    let mut controller = FeederController::new(&FeederConfig::default());
    controller
        .set_calibration(20, 160, &mut store, &mut NullSink)
        .unwrap();
    log.borrow_mut().clear();

    let resp = route(
        &Request::get("/container?container=1"),
        &mut controller,
        &mut hw,
        &mut store,
        &mut NullSink,
    );
    assert_eq!(resp.body, "{success: true}");
    assert!(log.borrow().is_empty(), "idempotent re-select must be silent");
}

// ── Validation failures ───────────────────────────────────────

#[test]
fn invalid_params_answer_http_200_with_failure_body() {
    let mut store = NvsAdapter::new().unwrap();
    let mut hw = MockHw::default();
    let mut controller = FeederController::new(&FeederConfig::default());
    controller.initialize(&store, &mut hw, &mut NullSink);
    hw.commands.clear();

    for target in [
        "/servo?position=181",
        "/servo?position=-1",
        "/servo/pos?c1=200&c2=50",
        "/container?container=5",
        "/container",
    ] {
        let resp = get(target, &mut controller, &mut hw, &mut store);
        assert_eq!(resp.status, 200, "{target}");
        assert_eq!(resp.body, "{success: false, message: Invalid params}", "{target}");
    }
    assert!(hw.commands.is_empty(), "rejected requests never move the servo");
    assert_eq!(
        controller.query_state().calibration,
        CalibrationTable::zeroed(),
        "rejected calibration left the table untouched"
    );
}

#[test]
fn unmatched_route_returns_404_diagnostic() {
    let mut store = NvsAdapter::new().unwrap();
    let mut hw = MockHw::default();
    let mut controller = FeederController::new(&FeederConfig::default());

    let resp = get("/unknown?x=1", &mut controller, &mut hw, &mut store);
    assert_eq!(resp.status, 404);
    assert!(resp.body.contains("x: 1"), "body: {}", resp.body);
}
