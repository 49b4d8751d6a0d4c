use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::types::{GuardConfig, DEFAULT_CONFIG_PATH};
use super::util::{env_non_empty, non_empty};

impl GuardConfig {
    pub(super) fn apply_file_config(&mut self) -> Result<bool> {
        let Some(path) = resolve_config_path() else {
            return Ok(false);
        };

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed reading config file {}", path.display()))?;
        let file_cfg: FileConfig = toml::from_str(&raw)
            .with_context(|| format!("failed parsing TOML config {}", path.display()))?;

        self.apply_file_detection(file_cfg.detection);
        self.apply_file_payload(file_cfg.payload);
        self.apply_file_debugger(file_cfg.debugger);
        self.apply_file_hooks(file_cfg.hooks);
        self.apply_file_clock(file_cfg.clock);
        self.apply_file_virtualization(file_cfg.virtualization);

        Ok(true)
    }

    fn apply_file_detection(&mut self, detection: Option<FileDetectionConfig>) {
        let Some(detection) = detection else {
            return;
        };
        if let Some(v) = detection.enabled {
            self.detection_enabled = Some(v);
        }
    }

    fn apply_file_payload(&mut self, payload: Option<FilePayloadConfig>) {
        let Some(payload) = payload else {
            return;
        };
        if let Some(v) = non_empty(payload.path) {
            self.payload_path = Some(v);
        }
    }

    fn apply_file_debugger(&mut self, debugger: Option<FileDebuggerConfig>) {
        let Some(debugger) = debugger else {
            return;
        };
        if let Some(v) = debugger.timing_threshold_micros {
            self.timing_threshold_micros = Some(v);
        }
        if let Some(v) = debugger.timing_probe_iterations {
            self.timing_probe_iterations = Some(v);
        }
    }

    fn apply_file_hooks(&mut self, hooks: Option<FileHookConfig>) {
        let Some(hooks) = hooks else {
            return;
        };
        if let Some(v) = hooks.preload_variables {
            self.preload_variables = Some(v);
        }
        if let Some(v) = hooks.module_markers {
            self.module_markers = Some(v);
        }
    }

    fn apply_file_clock(&mut self, clock: Option<FileClockConfig>) {
        let Some(clock) = clock else {
            return;
        };
        if let Some(v) = clock.max_forward_skew_secs {
            self.max_forward_skew_secs = Some(v);
        }
    }

    fn apply_file_virtualization(&mut self, virtualization: Option<FileVirtualizationConfig>) {
        let Some(virtualization) = virtualization else {
            return;
        };
        if let Some(v) = virtualization.hypervisor_markers {
            self.hypervisor_markers = Some(v);
        }
        if let Some(v) = virtualization.guest_process_markers {
            self.guest_process_markers = Some(v);
        }
        if let Some(v) = virtualization.service_markers {
            self.service_markers = Some(v);
        }
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Some(explicit) = env_non_empty("GATEGUARD_CONFIG") {
        return Some(PathBuf::from(explicit));
    }
    let default = Path::new(DEFAULT_CONFIG_PATH);
    if default.is_file() {
        return Some(default.to_path_buf());
    }
    None
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    detection: Option<FileDetectionConfig>,
    payload: Option<FilePayloadConfig>,
    debugger: Option<FileDebuggerConfig>,
    hooks: Option<FileHookConfig>,
    clock: Option<FileClockConfig>,
    virtualization: Option<FileVirtualizationConfig>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDetectionConfig {
    enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct FilePayloadConfig {
    path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileDebuggerConfig {
    timing_threshold_micros: Option<u64>,
    timing_probe_iterations: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct FileHookConfig {
    preload_variables: Option<Vec<String>>,
    module_markers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct FileClockConfig {
    max_forward_skew_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct FileVirtualizationConfig {
    hypervisor_markers: Option<Vec<String>>,
    guest_process_markers: Option<Vec<String>>,
    service_markers: Option<Vec<String>>,
}
