use std::time::Duration;

use anyhow::Result;

use anti_tamper::TamperConfig;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/gateguard/guard.conf";

/// Layered startup configuration: compiled defaults, then the optional
/// TOML file, then `GATEGUARD_*` environment overrides. Unset fields fall
/// through to the detector defaults.
#[derive(Debug, Clone, Default)]
pub struct GuardConfig {
    pub detection_enabled: Option<bool>,
    pub payload_path: Option<String>,
    pub timing_threshold_micros: Option<u64>,
    pub timing_probe_iterations: Option<u32>,
    pub max_forward_skew_secs: Option<u64>,
    pub preload_variables: Option<Vec<String>>,
    pub module_markers: Option<Vec<String>>,
    pub hypervisor_markers: Option<Vec<String>>,
    pub guest_process_markers: Option<Vec<String>>,
    pub service_markers: Option<Vec<String>>,
}

impl GuardConfig {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        config.apply_file_config()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Resolve into the engine configuration. Fields left unset keep the
    /// detector defaults (which honor the same `GATEGUARD_*` variables).
    pub fn tamper_config(&self) -> TamperConfig {
        let mut cfg = TamperConfig::default();
        if let Some(v) = self.detection_enabled {
            cfg.enabled = v;
        }
        if let Some(v) = self.timing_threshold_micros {
            cfg.debugger.timing_threshold = Duration::from_micros(v);
        }
        if let Some(v) = self.timing_probe_iterations {
            cfg.debugger.timing_probe_iterations = v;
        }
        if let Some(v) = self.max_forward_skew_secs {
            cfg.clock.max_forward_skew = Duration::from_secs(v);
        }
        if let Some(v) = &self.preload_variables {
            cfg.hooks.preload_variables = v.clone();
        }
        if let Some(v) = &self.module_markers {
            cfg.hooks.module_markers = v.clone();
        }
        if let Some(v) = &self.hypervisor_markers {
            cfg.virtualization.hypervisor_markers = v.clone();
        }
        if let Some(v) = &self.guest_process_markers {
            cfg.virtualization.guest_process_markers = v.clone();
        }
        if let Some(v) = &self.service_markers {
            cfg.virtualization.service_markers = v.clone();
        }
        cfg
    }
}
