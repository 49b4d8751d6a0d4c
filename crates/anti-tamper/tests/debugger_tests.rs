use std::time::Duration;

use anti_tamper::{probe_debugger, DebuggerCheckConfig, DebuggerSignal};
use platform_probe::{AttachOutcome, ScriptedProbe};

fn config() -> DebuggerCheckConfig {
    DebuggerCheckConfig {
        timing_threshold: Duration::from_micros(1_000),
        timing_probe_iterations: 1_000,
        enable_attach_probe: true,
        enable_tracer_field_probe: true,
        enable_timing_probe: true,
    }
}

#[test]
fn zero_evidence_reports_clean() {
    let probe = ScriptedProbe::new();
    let observation = probe_debugger(&probe, &config());
    assert!(!observation.detected());
    assert!(observation.faults.is_empty());
}

#[test]
fn held_trace_slot_is_detected() {
    let probe = ScriptedProbe::new().with_attach_outcome(AttachOutcome::AlreadyTraced);
    let observation = probe_debugger(&probe, &config());
    assert!(observation.detected());
    assert!(observation
        .signals
        .iter()
        .any(|signal| matches!(signal, DebuggerSignal::TraceSlotHeld)));
}

#[test]
fn tracer_field_detects_independently_of_attach_outcome() {
    let probe = ScriptedProbe::new()
        .with_attach_outcome(AttachOutcome::Exclusive)
        .with_status_field("TracerPid", "42");
    let observation = probe_debugger(&probe, &config());
    assert!(observation.detected());
    assert!(observation
        .signals
        .iter()
        .any(|signal| matches!(signal, DebuggerSignal::TracerAttached { tracer_pid: 42 })));
}

#[test]
fn zero_tracer_pid_is_clean() {
    let probe = ScriptedProbe::new().with_status_field("TracerPid", "0");
    let observation = probe_debugger(&probe, &config());
    assert!(!observation.detected());
    assert!(observation.faults.is_empty());
}

#[test]
fn malformed_tracer_field_is_a_fault_not_a_signal() {
    let probe = ScriptedProbe::new().with_status_field("TracerPid", "not-a-pid");
    let observation = probe_debugger(&probe, &config());
    assert!(!observation.detected());
    assert_eq!(observation.faults.len(), 1);
    assert_eq!(observation.faults[0].probe, "tracer_field");
}

#[test]
fn slow_timing_bracket_flags_anomaly() {
    // Monotonic clock advances two full seconds across the bracket.
    let probe = ScriptedProbe::new().with_clock_sequence(&[(1_000, 10), (1_000, 12)]);
    let cfg = DebuggerCheckConfig {
        enable_attach_probe: false,
        enable_tracer_field_probe: false,
        ..config()
    };
    let observation = probe_debugger(&probe, &cfg);
    assert!(observation.detected());
    assert_eq!(observation.signal_codes(), vec!["timing_anomaly"]);
}

#[test]
fn all_sources_faulted_marks_the_detector_fully_faulted() {
    let probe = ScriptedProbe::new().with_probe_failure("status_fields", "status unreadable");
    let cfg = DebuggerCheckConfig {
        enable_attach_probe: false,
        enable_timing_probe: false,
        ..config()
    };
    let observation = probe_debugger(&probe, &cfg);
    assert!(!observation.detected());
    assert!(observation.fully_faulted());
}

#[test]
fn disabled_probes_read_nothing() {
    let probe = ScriptedProbe::new()
        .with_attach_outcome(AttachOutcome::AlreadyTraced)
        .with_status_field("TracerPid", "42");
    let cfg = DebuggerCheckConfig {
        enable_attach_probe: false,
        enable_tracer_field_probe: false,
        enable_timing_probe: false,
        ..config()
    };
    let observation = probe_debugger(&probe, &cfg);
    assert!(!observation.detected());
    let counts = probe.call_counts();
    assert_eq!(counts.attach, 0);
    assert_eq!(counts.status_fields, 0);
    assert_eq!(counts.clocks, 0);
}
