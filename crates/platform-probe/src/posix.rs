#[cfg(unix)]
use crate::{
    AttachOutcome, ClockPair, FirmwareTableKind, IdentityRecord, ProbeBackend, ProbeError,
    ProbeResult,
};

#[cfg(target_os = "linux")]
const IDENTITY_SOURCES: &[&str] = &[
    "/sys/devices/virtual/dmi/id/product_name",
    "/sys/devices/virtual/dmi/id/sys_vendor",
    "/proc/scsi/scsi",
];

/// POSIX probe backend.
///
/// Complete on Linux; on other Unix targets the `/proc`-shaped
/// capabilities report unsupported rather than guessing.
#[cfg(unix)]
#[derive(Debug, Default)]
pub struct PosixProbe;

#[cfg(unix)]
impl PosixProbe {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl ProbeBackend for PosixProbe {
    #[cfg(target_os = "linux")]
    fn attempt_debug_attach(&self) -> ProbeResult<AttachOutcome> {
        // Releases the trace slot on every exit path once acquired.
        struct TraceSlot;

        impl Drop for TraceSlot {
            fn drop(&mut self) {
                // SAFETY: detaching our own traceme request has no memory
                // safety implications.
                unsafe {
                    libc::ptrace(
                        libc::PTRACE_DETACH,
                        0,
                        std::ptr::null_mut::<libc::c_void>(),
                        0,
                    );
                }
            }
        }

        // SAFETY: PTRACE_TRACEME takes no pointers into our address space.
        let rc = unsafe {
            libc::ptrace(
                libc::PTRACE_TRACEME,
                0,
                std::ptr::null_mut::<libc::c_void>(),
                0,
            )
        };
        if rc == -1 {
            return Ok(Some(AttachOutcome::AlreadyTraced));
        }
        let _slot = TraceSlot;
        Ok(Some(AttachOutcome::Exclusive))
    }

    #[cfg(not(target_os = "linux"))]
    fn attempt_debug_attach(&self) -> ProbeResult<AttachOutcome> {
        Ok(None)
    }

    #[cfg(target_os = "linux")]
    fn read_process_status_field(&self, name: &str) -> ProbeResult<String> {
        let status = std::fs::read_to_string("/proc/self/status")?;
        Ok(parse_status_field(&status, name))
    }

    #[cfg(not(target_os = "linux"))]
    fn read_process_status_field(&self, _name: &str) -> ProbeResult<String> {
        Ok(None)
    }

    #[cfg(target_os = "linux")]
    fn enumerate_loaded_modules(&self) -> ProbeResult<Vec<String>> {
        let maps = std::fs::read_to_string("/proc/self/maps")?;
        Ok(Some(parse_module_paths(&maps)))
    }

    #[cfg(not(target_os = "linux"))]
    fn enumerate_loaded_modules(&self) -> ProbeResult<Vec<String>> {
        Ok(None)
    }

    #[cfg(target_os = "linux")]
    fn enumerate_running_processes(&self) -> ProbeResult<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir("/proc")? {
            let Ok(entry) = entry else {
                continue;
            };
            let file_name = entry.file_name();
            let Some(pid) = file_name.to_str() else {
                continue;
            };
            if !pid.chars().all(|ch| ch.is_ascii_digit()) {
                continue;
            }
            // Processes may exit mid-walk; a vanished entry is absent
            // evidence, not a fault.
            if let Ok(comm) = std::fs::read_to_string(format!("/proc/{}/comm", pid)) {
                let comm = comm.trim();
                if !comm.is_empty() {
                    names.push(comm.to_string());
                }
            }
        }
        Ok(Some(names))
    }

    #[cfg(not(target_os = "linux"))]
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

    #[cfg(target_os = "linux")]
    fn read_hardware_identity(&self) -> ProbeResult<Vec<IdentityRecord>> {
        let mut records = Vec::new();
        for source in IDENTITY_SOURCES {
            if let Ok(content) = std::fs::read_to_string(source) {
                let content = content.trim();
                if !content.is_empty() {
                    records.push(IdentityRecord {
                        source: (*source).to_string(),
                        content: content.to_string(),
                    });
                }
            }
        }
        if records.is_empty() {
            Ok(None)
        } else {
            Ok(Some(records))
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn read_hardware_identity(&self) -> ProbeResult<Vec<IdentityRecord>> {
        Ok(None)
    }

    fn read_firmware_table(&self, _kind: FirmwareTableKind) -> ProbeResult<Vec<u8>> {
        // No raw firmware table concept here; vendor strings surface
        // through the DMI identity sources instead.
        Ok(None)
    }

    fn enumerate_service_registry_keys(&self) -> ProbeResult<Vec<String>> {
        Ok(None)
    }

    fn read_clocks(&self) -> Result<ClockPair, ProbeError> {
        crate::read_system_clocks()
    }
}

/// Extract the value of a named `key:\tvalue` field from
/// process-status-shaped text.
pub fn parse_status_field(status: &str, name: &str) -> Option<String> {
    for line in status.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        if key.trim() == name {
            let value = value.trim();
            if value.is_empty() {
                return None;
            }
            return Some(value.to_string());
        }
    }
    None
}

/// Extract unique file-backed mapping pathnames from maps-shaped text.
pub fn parse_module_paths(maps: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut paths = Vec::new();
    for line in maps.lines() {
        let Some(path) = line.split_whitespace().nth(5) else {
            continue;
        };
        if !path.starts_with('/') {
            continue;
        }
        if seen.insert(path.to_string()) {
            paths.push(path.to_string());
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_field_parses_named_value() {
        let status = "Name:\tgateguard\nState:\tR (running)\nTracerPid:\t42\nUid:\t0\n";
        assert_eq!(parse_status_field(status, "TracerPid").as_deref(), Some("42"));
        assert_eq!(parse_status_field(status, "PPid"), None);
    }

    #[test]
    fn status_field_empty_value_is_absent() {
        assert_eq!(parse_status_field("TracerPid:\t\n", "TracerPid"), None);
    }

    #[test]
    fn module_paths_are_deduplicated_and_file_backed() {
        let maps = "\
7f0000000000-7f0000001000 r-xp 00000000 08:01 123 /usr/lib/libc.so.6
7f0000001000-7f0000002000 r--p 00001000 08:01 123 /usr/lib/libc.so.6
7f0000002000-7f0000003000 rw-p 00000000 00:00 0 [heap]
7f0000003000-7f0000004000 r-xp 00000000 08:01 456 /usr/lib/libhook.so
";
        let paths = parse_module_paths(maps);
        assert_eq!(
            paths,
            vec![
                "/usr/lib/libc.so.6".to_string(),
                "/usr/lib/libhook.so".to_string()
            ]
        );
    }
}
