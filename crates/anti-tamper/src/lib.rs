mod clock;
mod debugger;
mod engine;
mod env;
mod fault;
mod hooks;
mod vm;

pub use clock::{
    ClockBaseline, ClockObservation, ClockSignal, ClockTamperConfig, ClockTamperDetector,
    DEFAULT_MAX_FORWARD_SKEW_SECS,
};
pub use debugger::{
    probe_debugger, DebuggerCheckConfig, DebuggerObservation, DebuggerSignal,
    DEFAULT_TIMING_PROBE_ITERATIONS, DEFAULT_TIMING_THRESHOLD_MICROS,
};
pub use engine::{DetectorKind, TamperConfig, TamperEngine, Verdict};
pub use fault::ProbeFault;
pub use hooks::{
    probe_hooks, HookCheckConfig, HookObservation, HookSignal, DEFAULT_MODULE_MARKERS,
    DEFAULT_PRELOAD_VARIABLES,
};
pub use vm::{
    probe_virtualization, VirtualizationCheckConfig, VirtualizationObservation, VmSignal,
    DEFAULT_GUEST_PROCESS_MARKERS, DEFAULT_HYPERVISOR_MARKERS, DEFAULT_SERVICE_MARKERS,
};
