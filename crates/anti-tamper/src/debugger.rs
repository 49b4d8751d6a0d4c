use std::fmt;
use std::time::Duration;

use platform_probe::{AttachOutcome, ProbeBackend};

use crate::env::{env_bool, env_u32, env_u64};
use crate::fault::ProbeFault;

/// Elapsed-time ceiling for the timing probe. Deployment-adjustable:
/// coarse CPUs and virtualized hosts inflate legitimate timings.
pub const DEFAULT_TIMING_THRESHOLD_MICROS: u64 = 1_000;
pub const DEFAULT_TIMING_PROBE_ITERATIONS: u32 = 1_000;

#[derive(Debug, Clone)]
pub struct DebuggerCheckConfig {
    pub timing_threshold: Duration,
    pub timing_probe_iterations: u32,
    pub enable_attach_probe: bool,
    pub enable_tracer_field_probe: bool,
    pub enable_timing_probe: bool,
}

impl Default for DebuggerCheckConfig {
    fn default() -> Self {
        Self {
            timing_threshold: Duration::from_micros(env_u64(
                "GATEGUARD_TIMING_THRESHOLD_MICROS",
                DEFAULT_TIMING_THRESHOLD_MICROS,
            )),
            timing_probe_iterations: env_u32(
                "GATEGUARD_TIMING_ITERATIONS",
                DEFAULT_TIMING_PROBE_ITERATIONS,
            ),
            enable_attach_probe: env_bool("GATEGUARD_ENABLE_ATTACH_PROBE", true),
            enable_tracer_field_probe: env_bool("GATEGUARD_ENABLE_TRACER_FIELD", true),
            enable_timing_probe: env_bool("GATEGUARD_ENABLE_TIMING", true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerSignal {
    /// The self-attach probe found the trace slot already held.
    TraceSlotHeld,
    TracerAttached {
        tracer_pid: u32,
    },
    TimingAnomaly {
        elapsed: Duration,
        threshold: Duration,
    },
}

impl DebuggerSignal {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TraceSlotHeld => "trace_slot_held",
            Self::TracerAttached { .. } => "tracer_attached",
            Self::TimingAnomaly { .. } => "timing_anomaly",
        }
    }
}

impl fmt::Display for DebuggerSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TraceSlotHeld => write!(f, "trace slot already held by another debugger"),
            Self::TracerAttached { tracer_pid } => {
                write!(f, "tracer field indicates debugger attached ({})", tracer_pid)
            }
            Self::TimingAnomaly { elapsed, threshold } => write!(
                f,
                "timing probe exceeded threshold (elapsed={:?} threshold={:?})",
                elapsed, threshold
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DebuggerObservation {
    pub signals: Vec<DebuggerSignal>,
    pub faults: Vec<ProbeFault>,
    pub sources_attempted: usize,
    pub sources_faulted: usize,
}

impl DebuggerObservation {
    pub fn detected(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Every attempted evidence source faulted: the detector is blind,
    /// not clean.
    pub fn fully_faulted(&self) -> bool {
        self.sources_attempted > 0 && self.sources_faulted == self.sources_attempted
    }

    pub fn signal_codes(&self) -> Vec<&'static str> {
        self.signals.iter().map(DebuggerSignal::code).collect()
    }
}

/// Three independent, cheap evidence sources OR-combined: any one positive
/// is a detection.
pub fn probe_debugger<B: ProbeBackend>(
    backend: &B,
    config: &DebuggerCheckConfig,
) -> DebuggerObservation {
    let mut observation = DebuggerObservation::default();

    if config.enable_attach_probe {
        observation.sources_attempted += 1;
        match backend.attempt_debug_attach() {
            Ok(Some(AttachOutcome::AlreadyTraced)) => {
                observation.signals.push(DebuggerSignal::TraceSlotHeld);
            }
            Ok(Some(AttachOutcome::Exclusive)) | Ok(None) => {}
            Err(err) => {
                observation.sources_faulted += 1;
                observation
                    .faults
                    .push(ProbeFault::from_probe("debug_attach", err));
            }
        }
    }

    if config.enable_tracer_field_probe {
        observation.sources_attempted += 1;
        match backend.read_process_status_field("TracerPid") {
            Ok(Some(raw)) => match raw.trim().parse::<u32>() {
                Ok(tracer_pid) if tracer_pid > 0 => {
                    observation
                        .signals
                        .push(DebuggerSignal::TracerAttached { tracer_pid });
                }
                Ok(_) => {}
                Err(_) => {
                    observation.sources_faulted += 1;
                    observation.faults.push(ProbeFault::new(
                        "tracer_field",
                        format!("unparseable tracer field value '{}'", raw.trim()),
                    ));
                }
            },
            Ok(None) => {}
            Err(err) => {
                observation.sources_faulted += 1;
                observation
                    .faults
                    .push(ProbeFault::from_probe("tracer_field", err));
            }
        }
    }

    if config.enable_timing_probe {
        observation.sources_attempted += 1;
        run_timing_probe(backend, config, &mut observation);
    }

    observation
}

fn run_timing_probe<B: ProbeBackend>(
    backend: &B,
    config: &DebuggerCheckConfig,
    observation: &mut DebuggerObservation,
) {
    let start = match backend.read_clocks() {
        Ok(pair) => pair,
        Err(err) => {
            observation.sources_faulted += 1;
            observation
                .faults
                .push(ProbeFault::from_probe("timing_probe", err));
            return;
        }
    };

    // Trivial bounded work; single-step or breakpoint overhead inflates
    // its elapsed time by orders of magnitude.
    let mut state = 0u64;
    for i in 0..config.timing_probe_iterations {
        state = state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(i as u64);
        std::hint::black_box(state);
    }

    let end = match backend.read_clocks() {
        Ok(pair) => pair,
        Err(err) => {
            observation.sources_faulted += 1;
            observation
                .faults
                .push(ProbeFault::from_probe("timing_probe", err));
            return;
        }
    };

    let elapsed = end.monotonic.saturating_sub(start.monotonic);
    if elapsed > config.timing_threshold {
        observation.signals.push(DebuggerSignal::TimingAnomaly {
            elapsed,
            threshold: config.timing_threshold,
        });
    }
}
