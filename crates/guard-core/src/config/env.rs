use super::types::GuardConfig;
use super::util::{env_non_empty, parse_bool, split_csv};

impl GuardConfig {
    pub(super) fn apply_env_overrides(&mut self) {
        if let Some(v) = env_non_empty("GATEGUARD_DETECTION_ENABLED") {
            self.detection_enabled = Some(parse_bool(&v));
        }
        if let Some(v) = env_non_empty("GATEGUARD_PAYLOAD_PATH") {
            self.payload_path = Some(v);
        }
        if let Some(v) = env_non_empty("GATEGUARD_TIMING_THRESHOLD_MICROS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.timing_threshold_micros = Some(parsed);
            }
        }
        if let Some(v) = env_non_empty("GATEGUARD_TIMING_ITERATIONS") {
            if let Ok(parsed) = v.trim().parse::<u32>() {
                self.timing_probe_iterations = Some(parsed);
            }
        }
        if let Some(v) = env_non_empty("GATEGUARD_MAX_FORWARD_SKEW_SECS") {
            if let Ok(parsed) = v.trim().parse::<u64>() {
                self.max_forward_skew_secs = Some(parsed);
            }
        }
        if let Some(v) = env_non_empty("GATEGUARD_PRELOAD_VARIABLES") {
            self.preload_variables = Some(split_csv(&v));
        }
        if let Some(v) = env_non_empty("GATEGUARD_MODULE_MARKERS") {
            self.module_markers = Some(split_csv(&v));
        }
        if let Some(v) = env_non_empty("GATEGUARD_HYPERVISOR_MARKERS") {
            self.hypervisor_markers = Some(split_csv(&v));
        }
        if let Some(v) = env_non_empty("GATEGUARD_GUEST_PROCESS_MARKERS") {
            self.guest_process_markers = Some(split_csv(&v));
        }
        if let Some(v) = env_non_empty("GATEGUARD_SERVICE_MARKERS") {
            self.service_markers = Some(split_csv(&v));
        }
    }
}
