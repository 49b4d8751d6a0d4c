use std::fmt;

use platform_probe::ProbeBackend;

use crate::env::env_list;
use crate::fault::ProbeFault;

pub const DEFAULT_PRELOAD_VARIABLES: &[&str] = &["LD_PRELOAD", "DYLD_INSERT_LIBRARIES"];
pub const DEFAULT_MODULE_MARKERS: &[&str] = &["inject", "hook"];

/// Static string matching against the loaded-code inventory. Legitimately
/// named modules can false-positive; the markers are configuration, not
/// code.
#[derive(Debug, Clone)]
pub struct HookCheckConfig {
    pub preload_variables: Vec<String>,
    pub module_markers: Vec<String>,
}

impl Default for HookCheckConfig {
    fn default() -> Self {
        Self {
            preload_variables: env_list("GATEGUARD_PRELOAD_VARIABLES", DEFAULT_PRELOAD_VARIABLES),
            module_markers: env_list("GATEGUARD_MODULE_MARKERS", DEFAULT_MODULE_MARKERS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookSignal {
    PreloadVariableSet { variable: String },
    SuspiciousModuleName { module: String, marker: String },
}

impl HookSignal {
    pub fn code(&self) -> &'static str {
        match self {
            Self::PreloadVariableSet { .. } => "preload_variable_set",
            Self::SuspiciousModuleName { .. } => "suspicious_module_name",
        }
    }
}

impl fmt::Display for HookSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PreloadVariableSet { variable } => {
                write!(f, "preload variable {} is set", variable)
            }
            Self::SuspiciousModuleName { module, marker } => {
                write!(f, "loaded module {} matches marker '{}'", module, marker)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookObservation {
    pub signals: Vec<HookSignal>,
    pub faults: Vec<ProbeFault>,
    pub sources_attempted: usize,
    pub sources_faulted: usize,
}

impl HookObservation {
    pub fn detected(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Every attempted evidence source faulted: the detector is blind,
    /// not clean.
    pub fn fully_faulted(&self) -> bool {
        self.sources_attempted > 0 && self.sources_faulted == self.sources_attempted
    }

    pub fn signal_codes(&self) -> Vec<&'static str> {
        self.signals.iter().map(HookSignal::code).collect()
    }
}

pub fn probe_hooks<B: ProbeBackend>(backend: &B, config: &HookCheckConfig) -> HookObservation {
    let mut observation = HookObservation::default();

    if !config.preload_variables.is_empty() {
        observation.sources_attempted += 1;
        let mut faulted = false;
        let mut matched = false;
        for variable in &config.preload_variables {
            match backend.read_environment_variable(variable) {
                Ok(Some(_)) => {
                    matched = true;
                    observation.signals.push(HookSignal::PreloadVariableSet {
                        variable: variable.clone(),
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    faulted = true;
                    observation
                        .faults
                        .push(ProbeFault::from_probe("preload_variable", err));
                }
            }
        }
        if faulted && !matched {
            observation.sources_faulted += 1;
        }
    }

    let markers: Vec<String> = config
        .module_markers
        .iter()
        .map(|m| m.to_ascii_lowercase())
        .collect();
    observation.sources_attempted += 1;
    match backend.enumerate_loaded_modules() {
        Ok(Some(modules)) => {
            for module in modules {
                let lowered = module.to_ascii_lowercase();
                for marker in &markers {
                    if lowered.contains(marker.as_str()) {
                        observation.signals.push(HookSignal::SuspiciousModuleName {
                            module: module.clone(),
                            marker: marker.clone(),
                        });
                    }
                }
            }
        }
        Ok(None) => {}
        Err(err) => {
            observation.sources_faulted += 1;
            observation
                .faults
                .push(ProbeFault::from_probe("module_scan", err));
        }
    }

    observation
}
