//! Deterministic probe backend for controlled environments and tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::{
    AttachOutcome, ClockPair, FirmwareTableKind, IdentityRecord, ProbeBackend, ProbeError,
    ProbeResult,
};

const AUTO_CLOCK_STEP: Duration = Duration::from_micros(1);

/// Per-operation invocation counts, snapshot via
/// [`ScriptedProbe::call_counts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProbeCallCounts {
    pub attach: usize,
    pub status_fields: usize,
    pub modules: usize,
    pub processes: usize,
    pub environment: usize,
    pub identity: usize,
    pub firmware: usize,
    pub services: usize,
    pub clocks: usize,
}

#[derive(Debug, Default)]
struct Counters {
    attach: AtomicUsize,
    status_fields: AtomicUsize,
    modules: AtomicUsize,
    processes: AtomicUsize,
    environment: AtomicUsize,
    identity: AtomicUsize,
    firmware: AtomicUsize,
    services: AtomicUsize,
    clocks: AtomicUsize,
}

/// Probe backend whose every answer is scripted up front.
///
/// Unscripted capabilities report absent evidence. Clock reads consume a
/// scripted sequence first and then auto-advance both clocks by a fixed
/// sub-threshold step, so unscripted runs stay deterministic and clean.
#[derive(Debug)]
pub struct ScriptedProbe {
    attach_outcome: Option<AttachOutcome>,
    status_fields: HashMap<String, String>,
    modules: Option<Vec<String>>,
    processes: Option<Vec<String>>,
    environment: HashMap<String, String>,
    identity: Vec<IdentityRecord>,
    firmware: Option<Vec<u8>>,
    services: Option<Vec<String>>,
    failures: HashMap<&'static str, String>,
    clock_script: Mutex<VecDeque<ClockPair>>,
    clock_state: Mutex<ClockPair>,
    counters: Counters,
}

impl Default for ScriptedProbe {
    fn default() -> Self {
        Self {
            attach_outcome: None,
            status_fields: HashMap::new(),
            modules: None,
            processes: None,
            environment: HashMap::new(),
            identity: Vec::new(),
            firmware: None,
            services: None,
            failures: HashMap::new(),
            clock_script: Mutex::new(VecDeque::new()),
            clock_state: Mutex::new(ClockPair {
                wall: Duration::from_secs(1_700_000_000),
                monotonic: Duration::from_secs(1_000),
            }),
            counters: Counters::default(),
        }
    }
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attach_outcome(mut self, outcome: AttachOutcome) -> Self {
        self.attach_outcome = Some(outcome);
        self
    }

    pub fn with_status_field(mut self, name: &str, value: &str) -> Self {
        self.status_fields.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_modules(mut self, modules: &[&str]) -> Self {
        self.modules = Some(modules.iter().map(|m| m.to_string()).collect());
        self
    }

    pub fn with_processes(mut self, processes: &[&str]) -> Self {
        self.processes = Some(processes.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn with_environment_variable(mut self, name: &str, value: &str) -> Self {
        self.environment.insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_identity(mut self, source: &str, content: &str) -> Self {
        self.identity.push(IdentityRecord {
            source: source.to_string(),
            content: content.to_string(),
        });
        self
    }

    pub fn with_firmware(mut self, bytes: &[u8]) -> Self {
        self.firmware = Some(bytes.to_vec());
        self
    }

    pub fn with_services(mut self, services: &[&str]) -> Self {
        self.services = Some(services.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Make the named operation fail. Operation names: `attach`,
    /// `status_fields`, `modules`, `processes`, `identity`, `firmware`,
    /// `services`, `clocks`.
    pub fn with_probe_failure(mut self, operation: &'static str, detail: &str) -> Self {
        self.failures.insert(operation, detail.to_string());
        self
    }

    /// Queue exact clock readings, consumed in order before the
    /// auto-advancing fallback resumes.
    pub fn with_clock_sequence(self, readings: &[(u64, u64)]) -> Self {
        {
            let mut script = self.clock_script.lock().expect("clock script lock");
            for (wall_secs, mono_secs) in readings {
                script.push_back(ClockPair {
                    wall: Duration::from_secs(*wall_secs),
                    monotonic: Duration::from_secs(*mono_secs),
                });
            }
        }
        self
    }

    pub fn call_counts(&self) -> ProbeCallCounts {
        ProbeCallCounts {
            attach: self.counters.attach.load(Ordering::Relaxed),
            status_fields: self.counters.status_fields.load(Ordering::Relaxed),
            modules: self.counters.modules.load(Ordering::Relaxed),
            processes: self.counters.processes.load(Ordering::Relaxed),
            environment: self.counters.environment.load(Ordering::Relaxed),
            identity: self.counters.identity.load(Ordering::Relaxed),
            firmware: self.counters.firmware.load(Ordering::Relaxed),
            services: self.counters.services.load(Ordering::Relaxed),
            clocks: self.counters.clocks.load(Ordering::Relaxed),
        }
    }

    fn scripted_failure(&self, operation: &'static str) -> Option<ProbeError> {
        self.failures
            .get(operation)
            .map(|detail| ProbeError::Malformed(detail.clone()))
    }
}

impl ProbeBackend for ScriptedProbe {
    fn attempt_debug_attach(&self) -> ProbeResult<AttachOutcome> {
        self.counters.attach.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("attach") {
            return Err(err);
        }
        Ok(self.attach_outcome)
    }

    fn read_process_status_field(&self, name: &str) -> ProbeResult<String> {
        self.counters.status_fields.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("status_fields") {
            return Err(err);
        }
        Ok(self.status_fields.get(name).cloned())
    }

    fn enumerate_loaded_modules(&self) -> ProbeResult<Vec<String>> {
        self.counters.modules.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("modules") {
            return Err(err);
        }
        Ok(self.modules.clone())
    }

    fn enumerate_running_processes(&self) -> ProbeResult<Vec<String>> {
        self.counters.processes.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("processes") {
            return Err(err);
        }
        Ok(self.processes.clone())
    }

    fn read_environment_variable(&self, name: &str) -> ProbeResult<String> {
        self.counters.environment.fetch_add(1, Ordering::Relaxed);
        Ok(self.environment.get(name).cloned())
    }

    fn read_hardware_identity(&self) -> ProbeResult<Vec<IdentityRecord>> {
        self.counters.identity.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("identity") {
            return Err(err);
        }
        if self.identity.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.identity.clone()))
        }
    }

    fn read_firmware_table(&self, _kind: FirmwareTableKind) -> ProbeResult<Vec<u8>> {
        self.counters.firmware.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("firmware") {
            return Err(err);
        }
        Ok(self.firmware.clone())
    }

    fn enumerate_service_registry_keys(&self) -> ProbeResult<Vec<String>> {
        self.counters.services.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("services") {
            return Err(err);
        }
        Ok(self.services.clone())
    }

    fn read_clocks(&self) -> Result<ClockPair, ProbeError> {
        self.counters.clocks.fetch_add(1, Ordering::Relaxed);
        if let Some(err) = self.scripted_failure("clocks") {
            return Err(err);
        }
        if let Some(scripted) = self
            .clock_script
            .lock()
            .expect("clock script lock")
            .pop_front()
        {
            *self.clock_state.lock().expect("clock state lock") = scripted;
            return Ok(scripted);
        }
        let mut state = self.clock_state.lock().expect("clock state lock");
        state.wall += AUTO_CLOCK_STEP;
        state.monotonic += AUTO_CLOCK_STEP;
        Ok(*state)
    }
}
