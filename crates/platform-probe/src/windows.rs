use crate::{
    AttachOutcome, ClockPair, FirmwareTableKind, IdentityRecord, ProbeBackend, ProbeError,
    ProbeResult,
};

/// Windows-family probe backend.
///
/// Clock and environment capabilities are native. Native API integration
/// for the snapshot, firmware-table and service-registry capabilities
/// remains TODO (wire CreateToolhelp32Snapshot, GetSystemFirmwareTable and
/// the Services key enumeration); until then those capabilities report
/// unsupported, and operators and tests can force debugger-detected
/// behavior in controlled environments with `GATEGUARD_DEBUGGER_PRESENT=1`
/// (or similar truthy values).
#[derive(Debug, Default)]
pub struct WindowsProbe;

impl WindowsProbe {
    pub fn new() -> Self {
        Self
    }
}

impl ProbeBackend for WindowsProbe {
    fn attempt_debug_attach(&self) -> ProbeResult<AttachOutcome> {
        if env_truthy("GATEGUARD_DEBUGGER_PRESENT") {
            return Ok(Some(AttachOutcome::AlreadyTraced));
        }
        Ok(None)
    }

    fn read_process_status_field(&self, _name: &str) -> ProbeResult<String> {
        Ok(None)
    }

    fn enumerate_loaded_modules(&self) -> ProbeResult<Vec<String>> {
        Ok(None)
    }

    fn enumerate_running_processes(&self) -> ProbeResult<Vec<String>> {
        Ok(None)
    }

    fn read_environment_variable(&self, name: &str) -> ProbeResult<String> {
        match std::env::var(name) {
            Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
            Ok(_) | Err(std::env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(ProbeError::Malformed(format!(
                "environment variable {}: {}",
                name, err
            ))),
        }
    }

    fn read_hardware_identity(&self) -> ProbeResult<Vec<IdentityRecord>> {
        Ok(None)
    }

    fn read_firmware_table(&self, _kind: FirmwareTableKind) -> ProbeResult<Vec<u8>> {
        Ok(None)
    }

    fn enumerate_service_registry_keys(&self) -> ProbeResult<Vec<String>> {
        Ok(None)
    }

    fn read_clocks(&self) -> Result<ClockPair, ProbeError> {
        crate::read_system_clocks()
    }
}

fn env_truthy(name: &str) -> bool {
    std::env::var(name)
        .ok()
        .map(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            )
        })
        .unwrap_or(false)
}
