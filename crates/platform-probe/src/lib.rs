//! Capability-querying layer over OS-specific process introspection
//! primitives.
//!
//! Every operation is a single, synchronous, best-effort query. The result
//! contract is uniform: `Ok(Some(_))` is evidence, `Ok(None)` means the
//! capability is unsupported or its data source is absent, and `Err(_)` is
//! a backend fault. Callers must never treat `Ok(None)` as either a clean
//! or a positive finding.

mod posix;
mod scripted;
mod windows;

use std::fmt;
use std::time::Duration;

#[cfg(unix)]
pub use posix::PosixProbe;
pub use posix::{parse_module_paths, parse_status_field};
pub use scripted::{ProbeCallCounts, ScriptedProbe};
pub use windows::WindowsProbe;

/// Outcome of the self-attach debug probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The trace slot was free; it was acquired and released again before
    /// the probe returned.
    Exclusive,
    /// Another tracer already holds debug control over this process.
    AlreadyTraced,
}

/// One vendor/product identity source and its content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityRecord {
    pub source: String,
    pub content: String,
}

/// Firmware tables a backend may expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirmwareTableKind {
    Smbios,
}

/// Paired wall/monotonic clock reading.
///
/// `wall` is the duration since the Unix epoch and may be adjusted by an
/// operator (or an adversary). `monotonic` counts from an arbitrary
/// process-local origin and is non-decreasing by platform contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPair {
    pub wall: Duration,
    pub monotonic: Duration,
}

#[derive(Debug)]
pub enum ProbeError {
    Io(std::io::Error),
    Clock(String),
    Malformed(String),
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Clock(msg) => write!(f, "clock error: {}", msg),
            Self::Malformed(msg) => write!(f, "malformed probe data: {}", msg),
        }
    }
}

impl std::error::Error for ProbeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

/// `Ok(Some(v))` evidence, `Ok(None)` capability/data absent, `Err` fault.
pub type ProbeResult<T> = std::result::Result<Option<T>, ProbeError>;

/// Synchronous OS capability surface consumed by the detectors.
///
/// Implementations must complete each call in bounded, short time (the
/// detectors probe under an adversarial-timing threat model) and must not
/// retain handles beyond the call.
pub trait ProbeBackend {
    /// Attempt to self-attach as this process's own tracer. A held trace
    /// slot is evidence of an attached debugger. A successful acquisition
    /// is released before the call returns.
    fn attempt_debug_attach(&self) -> ProbeResult<AttachOutcome>;

    /// Read a named field from process-introspection data (tracer
    /// identity, parent linkage).
    fn read_process_status_field(&self, name: &str) -> ProbeResult<String>;

    /// Finite, one-shot list of loaded image/library pathnames.
    fn enumerate_loaded_modules(&self) -> ProbeResult<Vec<String>>;

    /// Finite, one-shot list of running process names.
    fn enumerate_running_processes(&self) -> ProbeResult<Vec<String>>;

    fn read_environment_variable(&self, name: &str) -> ProbeResult<String>;

    /// Vendor/product identity sources (DMI files, BIOS registry keys).
    fn read_hardware_identity(&self) -> ProbeResult<Vec<IdentityRecord>>;

    /// Raw firmware table bytes. Platform-gated; absent entirely on
    /// platforms without the concept.
    fn read_firmware_table(&self, kind: FirmwareTableKind) -> ProbeResult<Vec<u8>>;

    /// Registered service names. Platform-gated.
    fn enumerate_service_registry_keys(&self) -> ProbeResult<Vec<String>>;

    /// Read both clocks together. Not optional: a backend that cannot
    /// read time cannot support the engine at all.
    fn read_clocks(&self) -> Result<ClockPair, ProbeError>;
}

// Shared by the OS backends: wall clock from the system time, monotonic
// clock as elapsed time against a process-local anchor.
pub(crate) fn read_system_clocks() -> Result<ClockPair, ProbeError> {
    use std::sync::OnceLock;
    use std::time::{Instant, SystemTime, UNIX_EPOCH};

    static ANCHOR: OnceLock<Instant> = OnceLock::new();

    let wall = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|err| ProbeError::Clock(format!("wall clock precedes Unix epoch: {}", err)))?;
    let monotonic = ANCHOR.get_or_init(Instant::now).elapsed();
    Ok(ClockPair { wall, monotonic })
}
