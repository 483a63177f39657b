//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ FeederController (domain)
//! ```
//!
//! Driven adapters (servo, storage, event sinks) implement these traits.
//! The [`FeederController`](super::controller::FeederController) consumes
//! them via generics, so the domain core never touches hardware directly.

use crate::app::controller::{CalibrationTable, Slot};
use crate::config::FeederConfig;

// ───────────────────────────────────────────────────────────────
// Servo port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to command the dispenser servo.
///
/// Callers guarantee `angle` is within 0..=180 — the port is a
/// side-effecting primitive with no validation or feedback of its own.
pub trait ServoPort {
    /// Command the servo to an absolute angle in degrees.
    fn command(&mut self, angle: u8);
}

// ───────────────────────────────────────────────────────────────
// Delay port (motion pacing)
// ───────────────────────────────────────────────────────────────

/// Blocking pause between intermediate motion steps.
///
/// The transition loop is synchronous by design: a slot change occupies
/// its caller for the whole step sequence.  Tests implement this as a
/// no-op so motion runs instantly.
pub trait DelayPort {
    fn delay_ms(&mut self, ms: u32);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go (serial log, mDNS
/// TXT update, future MQTT).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Feeder store port (domain ↔ persistent slot records)
// ───────────────────────────────────────────────────────────────

/// Durable backing for the calibration table and the selected slot.
///
/// Writes MUST be committed synchronously: when `save_*` returns `Ok`,
/// the record survives power loss.  The two records are independent and
/// never co-written; recovery from a record corrupted mid-write is out
/// of scope (implementations load such a record as the default).
pub trait FeederStore {
    /// Load the calibration table.  A missing or unreadable record loads
    /// as the zeroed table.
    fn load_calibration(&self) -> Result<CalibrationTable, StorageError>;

    /// Load the selected slot.  A missing or unreadable record loads as
    /// [`Slot::A`].
    fn load_selection(&self) -> Result<Slot, StorageError>;

    /// Persist the calibration table.
    fn save_calibration(&mut self, table: &CalibrationTable) -> Result<(), StorageError>;

    /// Persist the selected slot.
    fn save_selection(&mut self, slot: Slot) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`FeederConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<FeederConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &FeederConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`FeederStore`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested record does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "record not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
