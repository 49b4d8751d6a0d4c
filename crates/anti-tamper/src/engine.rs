use std::fmt;

use platform_probe::ProbeBackend;

use crate::clock::{ClockTamperConfig, ClockTamperDetector};
use crate::debugger::{probe_debugger, DebuggerCheckConfig};
use crate::env::env_bool;
use crate::fault::ProbeFault;
use crate::hooks::{probe_hooks, HookCheckConfig};
use crate::vm::{probe_virtualization, VirtualizationCheckConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorKind {
    Debugger,
    Hook,
    ClockTamper,
    VirtualMachine,
}

impl DetectorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Debugger => "debugger",
            Self::Hook => "hooks",
            Self::ClockTamper => "clock_tamper",
            Self::VirtualMachine => "virtual_machine",
        }
    }
}

impl fmt::Display for DetectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Debug, Clone)]
pub struct TamperConfig {
    /// Detection off turns the engine into a pass-through: the alternate
    /// no-detection deployment, same orchestrator.
    pub enabled: bool,
    pub debugger: DebuggerCheckConfig,
    pub hooks: HookCheckConfig,
    pub clock: ClockTamperConfig,
    pub virtualization: VirtualizationCheckConfig,
}

impl Default for TamperConfig {
    fn default() -> Self {
        Self {
            enabled: env_bool("GATEGUARD_DETECTION_ENABLED", true),
            debugger: DebuggerCheckConfig::default(),
            hooks: HookCheckConfig::default(),
            clock: ClockTamperConfig::default(),
            virtualization: VirtualizationCheckConfig::default(),
        }
    }
}

/// Aggregate result of one engine run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Verdict {
    pub trigger: Option<DetectorKind>,
    pub signal_codes: Vec<String>,
    pub faults: Vec<ProbeFault>,
    /// Detectors whose every evidence source faulted. Blind, not clean;
    /// the caller decides whether that blocks startup.
    pub degraded: Vec<DetectorKind>,
}

impl Verdict {
    pub fn compromised(&self) -> bool {
        self.trigger.is_some()
    }

    pub fn summary(&self) -> String {
        match self.trigger {
            Some(kind) => format!("compromised: {} [{}]", kind, self.signal_codes.join(", ")),
            None => "clean".to_string(),
        }
    }
}

/// Runs the detectors in a fixed order and aggregates to one verdict.
///
/// Ordering is a policy choice (cheapest, most reliable checks first) and
/// is preserved for fixture determinism: Debugger, Hook, ClockTamper,
/// VirtualMachine, with fail-fast short-circuiting on the first positive
/// signal.
#[derive(Debug)]
pub struct TamperEngine<B: ProbeBackend> {
    config: TamperConfig,
    backend: B,
    clock_detector: ClockTamperDetector,
}

impl<B: ProbeBackend> TamperEngine<B> {
    pub fn new(config: TamperConfig, backend: B) -> Self {
        let clock_detector = ClockTamperDetector::new(config.clock.clone());
        Self {
            config,
            backend,
            clock_detector,
        }
    }

    pub fn config(&self) -> &TamperConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn evaluate(&mut self) -> Verdict {
        let mut verdict = Verdict::default();
        if !self.config.enabled {
            return verdict;
        }

        let debugger = probe_debugger(&self.backend, &self.config.debugger);
        verdict.faults.extend(debugger.faults.iter().cloned());
        if debugger.detected() {
            return triggered(verdict, DetectorKind::Debugger, &debugger.signal_codes());
        }
        if debugger.fully_faulted() {
            verdict.degraded.push(DetectorKind::Debugger);
        }

        let hooks = probe_hooks(&self.backend, &self.config.hooks);
        verdict.faults.extend(hooks.faults.iter().cloned());
        if hooks.detected() {
            return triggered(verdict, DetectorKind::Hook, &hooks.signal_codes());
        }
        if hooks.fully_faulted() {
            verdict.degraded.push(DetectorKind::Hook);
        }

        let clock = self.clock_detector.observe(&self.backend);
        verdict.faults.extend(clock.faults.iter().cloned());
        if clock.detected() {
            return triggered(verdict, DetectorKind::ClockTamper, &clock.signal_codes());
        }
        if clock.fully_faulted() {
            verdict.degraded.push(DetectorKind::ClockTamper);
        }

        let vm = probe_virtualization(&self.backend, &self.config.virtualization);
        verdict.faults.extend(vm.faults.iter().cloned());
        if vm.detected() {
            return triggered(verdict, DetectorKind::VirtualMachine, &vm.signal_codes());
        }
        if vm.fully_faulted() {
            verdict.degraded.push(DetectorKind::VirtualMachine);
        }

        verdict
    }
}

fn triggered(mut verdict: Verdict, kind: DetectorKind, codes: &[&'static str]) -> Verdict {
    verdict.trigger = Some(kind);
    verdict.signal_codes = codes
        .iter()
        .map(|code| format!("{}:{}", kind.code(), code))
        .collect();
    verdict
}
