use std::time::Duration;

use anti_tamper::{
    ClockTamperConfig, DebuggerCheckConfig, DetectorKind, HookCheckConfig, TamperConfig,
    TamperEngine, VirtualizationCheckConfig,
};
use platform_probe::{AttachOutcome, ScriptedProbe};

fn config() -> TamperConfig {
    TamperConfig {
        enabled: true,
        debugger: DebuggerCheckConfig {
            timing_threshold: Duration::from_micros(1_000),
            timing_probe_iterations: 1_000,
            enable_attach_probe: true,
            enable_tracer_field_probe: true,
            enable_timing_probe: false,
        },
        hooks: HookCheckConfig {
            preload_variables: vec!["LD_PRELOAD".to_string()],
            module_markers: vec!["inject".to_string(), "hook".to_string()],
        },
        clock: ClockTamperConfig {
            max_forward_skew: Duration::from_secs(60),
        },
        virtualization: VirtualizationCheckConfig {
            hypervisor_markers: vec!["vmware".to_string(), "qemu".to_string()],
            guest_process_markers: vec!["vmtoolsd".to_string(), "vboxservice".to_string()],
            service_markers: vec!["vmware".to_string(), "vbox".to_string()],
        },
    }
}

#[test]
fn clean_environment_yields_clean_verdict_and_probes_everything() {
    let mut engine = TamperEngine::new(config(), ScriptedProbe::new());
    let verdict = engine.evaluate();
    assert!(!verdict.compromised());
    assert!(verdict.trigger.is_none());
    assert_eq!(verdict.summary(), "clean");

    let counts = engine.backend().call_counts();
    assert_eq!(counts.attach, 1);
    assert_eq!(counts.modules, 1);
    assert_eq!(counts.clocks, 1);
    assert_eq!(counts.processes, 1);
    assert_eq!(counts.identity, 1);
    assert_eq!(counts.firmware, 1);
    assert_eq!(counts.services, 1);
}

#[test]
fn debugger_detection_short_circuits_every_later_detector() {
    let probe = ScriptedProbe::new()
        .with_attach_outcome(AttachOutcome::AlreadyTraced)
        .with_modules(&["/usr/lib/libhook.so"])
        .with_firmware(b"VMware");
    let mut engine = TamperEngine::new(config(), probe);

    let verdict = engine.evaluate();
    assert_eq!(verdict.trigger, Some(DetectorKind::Debugger));
    assert!(verdict
        .signal_codes
        .contains(&"debugger:trace_slot_held".to_string()));

    let counts = engine.backend().call_counts();
    assert_eq!(counts.modules, 0);
    assert_eq!(counts.environment, 0);
    assert_eq!(counts.clocks, 0);
    assert_eq!(counts.processes, 0);
    assert_eq!(counts.identity, 0);
    assert_eq!(counts.firmware, 0);
    assert_eq!(counts.services, 0);
}

#[test]
fn hook_detection_precedes_virtualization() {
    let probe = ScriptedProbe::new()
        .with_modules(&["/usr/lib/libhook.so"])
        .with_firmware(b"VMware");
    let mut engine = TamperEngine::new(config(), probe);

    let verdict = engine.evaluate();
    assert_eq!(verdict.trigger, Some(DetectorKind::Hook));
    assert_eq!(engine.backend().call_counts().firmware, 0);
}

#[test]
fn clock_rollback_triggers_on_the_second_run() {
    let probe = ScriptedProbe::new().with_clock_sequence(&[(1_000, 100), (999, 101)]);
    let mut engine = TamperEngine::new(config(), probe);

    let first = engine.evaluate();
    assert!(!first.compromised());

    let second = engine.evaluate();
    assert_eq!(second.trigger, Some(DetectorKind::ClockTamper));
    assert_eq!(second.signal_codes, vec!["clock_tamper:clock_rollback"]);
}

#[test]
fn virtualization_triggers_when_everything_else_is_clean() {
    let probe = ScriptedProbe::new().with_processes(&["vmtoolsd"]);
    let mut engine = TamperEngine::new(config(), probe);

    let verdict = engine.evaluate();
    assert_eq!(verdict.trigger, Some(DetectorKind::VirtualMachine));
    assert_eq!(
        verdict.signal_codes,
        vec!["virtual_machine:guest_process_match"]
    );
}

#[test]
fn disabled_detection_skips_all_probing() {
    let probe = ScriptedProbe::new()
        .with_attach_outcome(AttachOutcome::AlreadyTraced)
        .with_modules(&["/usr/lib/libhook.so"]);
    let mut engine = TamperEngine::new(
        TamperConfig {
            enabled: false,
            ..config()
        },
        probe,
    );

    let verdict = engine.evaluate();
    assert!(!verdict.compromised());
    assert_eq!(engine.backend().call_counts(), Default::default());
}

#[test]
fn faults_ride_a_clean_verdict_without_blocking_it() {
    let probe = ScriptedProbe::new().with_status_field("TracerPid", "garbage");
    let mut engine = TamperEngine::new(config(), probe);

    let verdict = engine.evaluate();
    assert!(!verdict.compromised());
    assert_eq!(verdict.faults.len(), 1);
    assert_eq!(verdict.faults[0].probe, "tracer_field");
    // One of two debugger sources still answered, so the detector is not
    // degraded.
    assert!(verdict.degraded.is_empty());
}

#[test]
fn detector_with_every_source_faulted_is_reported_degraded() {
    let probe = ScriptedProbe::new().with_probe_failure("clocks", "scripted clock failure");
    let mut engine = TamperEngine::new(config(), probe);

    let verdict = engine.evaluate();
    assert!(!verdict.compromised());
    assert_eq!(verdict.degraded, vec![DetectorKind::ClockTamper]);
}
