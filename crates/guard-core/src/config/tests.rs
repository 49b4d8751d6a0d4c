use std::sync::{Mutex, OnceLock};
use std::time::Duration;

use super::types::GuardConfig;
use super::{parse_bool, split_csv};

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

const GUARD_VARS: &[&str] = &[
    "GATEGUARD_CONFIG",
    "GATEGUARD_DETECTION_ENABLED",
    "GATEGUARD_PAYLOAD_PATH",
    "GATEGUARD_TIMING_THRESHOLD_MICROS",
    "GATEGUARD_TIMING_ITERATIONS",
    "GATEGUARD_MAX_FORWARD_SKEW_SECS",
    "GATEGUARD_PRELOAD_VARIABLES",
    "GATEGUARD_MODULE_MARKERS",
    "GATEGUARD_HYPERVISOR_MARKERS",
    "GATEGUARD_GUEST_PROCESS_MARKERS",
    "GATEGUARD_SERVICE_MARKERS",
    "GATEGUARD_ENABLE_ATTACH_PROBE",
    "GATEGUARD_ENABLE_TRACER_FIELD",
    "GATEGUARD_ENABLE_TIMING",
];

fn clear_guard_env() {
    for var in GUARD_VARS {
        std::env::remove_var(var);
    }
}

fn temp_config_file(contents: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(format!(
        "gateguard-config-{}.toml",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or_default()
    ));
    std::fs::write(&path, contents).expect("write config file");
    path
}

#[test]
fn unset_fields_fall_through_to_detector_defaults() {
    let _guard = env_lock().lock().expect("env lock");
    clear_guard_env();

    let cfg = GuardConfig::default().tamper_config();
    assert!(cfg.enabled);
    assert_eq!(cfg.debugger.timing_probe_iterations, 1_000);
    assert_eq!(cfg.debugger.timing_threshold, Duration::from_micros(1_000));
    assert_eq!(cfg.clock.max_forward_skew, Duration::from_secs(60));
    assert_eq!(cfg.hooks.module_markers, vec!["inject", "hook"]);
}

#[test]
fn file_sections_apply_to_resolved_config() {
    let _guard = env_lock().lock().expect("env lock");
    clear_guard_env();

    let path = temp_config_file(
        r#"
[detection]
enabled = false

[payload]
path = "/opt/product/payload.bin"

[debugger]
timing_threshold_micros = 5000

[hooks]
module_markers = ["intercept"]

[clock]
max_forward_skew_secs = 120

[virtualization]
hypervisor_markers = ["bhyve"]
"#,
    );
    std::env::set_var("GATEGUARD_CONFIG", &path);

    let config = GuardConfig::load().expect("load config");
    let cfg = config.tamper_config();
    assert!(!cfg.enabled);
    assert_eq!(config.payload_path.as_deref(), Some("/opt/product/payload.bin"));
    assert_eq!(cfg.debugger.timing_threshold, Duration::from_micros(5_000));
    assert_eq!(cfg.hooks.module_markers, vec!["intercept"]);
    assert_eq!(cfg.clock.max_forward_skew, Duration::from_secs(120));
    assert_eq!(cfg.virtualization.hypervisor_markers, vec!["bhyve"]);

    clear_guard_env();
    let _ = std::fs::remove_file(path);
}

#[test]
fn env_overrides_win_over_the_file() {
    let _guard = env_lock().lock().expect("env lock");
    clear_guard_env();

    let path = temp_config_file("[clock]\nmax_forward_skew_secs = 120\n");
    std::env::set_var("GATEGUARD_CONFIG", &path);
    std::env::set_var("GATEGUARD_MAX_FORWARD_SKEW_SECS", "30");
    std::env::set_var("GATEGUARD_SERVICE_MARKERS", "vmware, vbox , xen");

    let config = GuardConfig::load().expect("load config");
    let cfg = config.tamper_config();
    assert_eq!(cfg.clock.max_forward_skew, Duration::from_secs(30));
    assert_eq!(
        cfg.virtualization.service_markers,
        vec!["vmware", "vbox", "xen"]
    );

    clear_guard_env();
    let _ = std::fs::remove_file(path);
}

#[test]
fn malformed_config_file_is_an_error() {
    let _guard = env_lock().lock().expect("env lock");
    clear_guard_env();

    let path = temp_config_file("[detection\nenabled = maybe");
    std::env::set_var("GATEGUARD_CONFIG", &path);

    assert!(GuardConfig::load().is_err());

    clear_guard_env();
    let _ = std::fs::remove_file(path);
}

#[test]
fn csv_and_bool_parsing() {
    assert_eq!(split_csv("a, b ,,c"), vec!["a", "b", "c"]);
    assert!(parse_bool("TrUe"));
    assert!(parse_bool(" on "));
    assert!(!parse_bool("off"));
    assert!(!parse_bool("0"));
}
