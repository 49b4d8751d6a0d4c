use serde_json::json;
use tracing::{debug, error, warn};

use anti_tamper::{TamperEngine, Verdict};
use platform_probe::ProbeBackend;

use crate::config::GuardConfig;
use crate::payload::{LoadOutcome, PayloadLoader};

/// Clean verdict, payload up.
pub const EXIT_CLEAN: i32 = 0;
/// Payload initialization or load failure.
pub const EXIT_PAYLOAD_FAILURE: i32 = 1;
/// Detected compromise. Deliberately identical to [`EXIT_CLEAN`]: a
/// defensive exit must not signal detection to an observer.
pub const EXIT_DEFENSIVE_SILENT: i32 = 0;
/// A detector lost every one of its evidence sources to backend faults.
/// Individual faults are fail-open; a fully blind detector is not.
pub const EXIT_BACKEND_FAULT: i32 = 2;

/// Run the engine, then the payload boundary, and map the outcome to a
/// process exit status.
pub fn run_startup<B: ProbeBackend>(
    engine: &mut TamperEngine<B>,
    payload: &mut dyn PayloadLoader,
    config: &GuardConfig,
) -> i32 {
    let verdict = engine.evaluate();
    for fault in &verdict.faults {
        warn!(probe = fault.probe, detail = %fault.detail, "probe backend fault");
    }

    if verdict.compromised() {
        if debug_verdict_log_enabled() {
            debug!(payload = %verdict_payload(&verdict), "tamper verdict");
        }
        return EXIT_DEFENSIVE_SILENT;
    }

    if !verdict.degraded.is_empty() {
        let detectors: Vec<&'static str> =
            verdict.degraded.iter().map(|kind| kind.code()).collect();
        error!(?detectors, "detector lost all evidence sources; refusing startup");
        return EXIT_BACKEND_FAULT;
    }

    if payload.initialize() != LoadOutcome::Success {
        error!("payload initialization failed");
        return EXIT_PAYLOAD_FAILURE;
    }

    if let Some(path) = config.payload_path.as_deref() {
        if payload.load(path) != LoadOutcome::Success {
            error!(path, "payload load failed");
            return EXIT_PAYLOAD_FAILURE;
        }
    }

    EXIT_CLEAN
}

fn debug_verdict_log_enabled() -> bool {
    std::env::var("GATEGUARD_DEBUG_VERDICT_LOG")
        .ok()
        .filter(|v| !v.trim().is_empty())
        .is_some()
}

fn verdict_payload(verdict: &Verdict) -> String {
    json!({
        "trigger": verdict.trigger.map(|kind| kind.code()),
        "signals": verdict.signal_codes,
        "faults": verdict
            .faults
            .iter()
            .map(|fault| fault.to_string())
            .collect::<Vec<_>>(),
        "summary": verdict.summary(),
    })
    .to_string()
}
