use std::fmt;

use platform_probe::{FirmwareTableKind, ProbeBackend};

use crate::env::env_list;
use crate::fault::ProbeFault;

pub const DEFAULT_HYPERVISOR_MARKERS: &[&str] = &["vmware", "virtualbox", "qemu", "kvm"];
pub const DEFAULT_GUEST_PROCESS_MARKERS: &[&str] = &["vmtoolsd", "vboxservice"];
pub const DEFAULT_SERVICE_MARKERS: &[&str] = &["vmware", "vbox"];

/// Breadth over precision: several heterogeneous evidence sources,
/// OR-combined, none individually necessary.
#[derive(Debug, Clone)]
pub struct VirtualizationCheckConfig {
    pub hypervisor_markers: Vec<String>,
    pub guest_process_markers: Vec<String>,
    pub service_markers: Vec<String>,
}

impl Default for VirtualizationCheckConfig {
    fn default() -> Self {
        Self {
            hypervisor_markers: env_list(
                "GATEGUARD_HYPERVISOR_MARKERS",
                DEFAULT_HYPERVISOR_MARKERS,
            ),
            guest_process_markers: env_list(
                "GATEGUARD_GUEST_PROCESS_MARKERS",
                DEFAULT_GUEST_PROCESS_MARKERS,
            ),
            service_markers: env_list("GATEGUARD_SERVICE_MARKERS", DEFAULT_SERVICE_MARKERS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmSignal {
    IdentityVendorMatch { source: String, marker: String },
    GuestProcessMatch { process: String, marker: String },
    ServiceNameMatch { key: String, marker: String },
    FirmwareVendorMatch { marker: String },
}

impl VmSignal {
    pub fn code(&self) -> &'static str {
        match self {
            Self::IdentityVendorMatch { .. } => "identity_vendor_match",
            Self::GuestProcessMatch { .. } => "guest_process_match",
            Self::ServiceNameMatch { .. } => "service_name_match",
            Self::FirmwareVendorMatch { .. } => "firmware_vendor_match",
        }
    }
}

impl fmt::Display for VmSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IdentityVendorMatch { source, marker } => {
                write!(f, "identity source {} matches marker '{}'", source, marker)
            }
            Self::GuestProcessMatch { process, marker } => {
                write!(f, "running process {} matches marker '{}'", process, marker)
            }
            Self::ServiceNameMatch { key, marker } => {
                write!(f, "service key {} matches marker '{}'", key, marker)
            }
            Self::FirmwareVendorMatch { marker } => {
                write!(f, "firmware table matches marker '{}'", marker)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualizationObservation {
    pub signals: Vec<VmSignal>,
    pub faults: Vec<ProbeFault>,
    pub sources_attempted: usize,
    pub sources_faulted: usize,
}

impl VirtualizationObservation {
    pub fn detected(&self) -> bool {
        !self.signals.is_empty()
    }

    /// Every attempted evidence source faulted: the detector is blind,
    /// not clean.
    pub fn fully_faulted(&self) -> bool {
        self.sources_attempted > 0 && self.sources_faulted == self.sources_attempted
    }

    pub fn signal_codes(&self) -> Vec<&'static str> {
        self.signals.iter().map(VmSignal::code).collect()
    }
}

pub fn probe_virtualization<B: ProbeBackend>(
    backend: &B,
    config: &VirtualizationCheckConfig,
) -> VirtualizationObservation {
    let mut observation = VirtualizationObservation::default();
    let hypervisor_markers = lowered(&config.hypervisor_markers);
    let process_markers = lowered(&config.guest_process_markers);
    let service_markers = lowered(&config.service_markers);

    observation.sources_attempted += 1;
    match backend.read_hardware_identity() {
        Ok(Some(records)) => {
            for record in records {
                let content = record.content.to_ascii_lowercase();
                for marker in &hypervisor_markers {
                    if content.contains(marker.as_str()) {
                        observation.signals.push(VmSignal::IdentityVendorMatch {
                            source: record.source.clone(),
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
                .push(ProbeFault::from_probe("hardware_identity", err));
        }
    }

    observation.sources_attempted += 1;
    match backend.enumerate_running_processes() {
        Ok(Some(processes)) => {
            for process in processes {
                let name = process.to_ascii_lowercase();
                for marker in &process_markers {
                    if name.contains(marker.as_str()) {
                        observation.signals.push(VmSignal::GuestProcessMatch {
                            process: process.clone(),
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
                .push(ProbeFault::from_probe("process_scan", err));
        }
    }

    observation.sources_attempted += 1;
    match backend.enumerate_service_registry_keys() {
        Ok(Some(keys)) => {
            for key in keys {
                let name = key.to_ascii_lowercase();
                for marker in &service_markers {
                    if name.contains(marker.as_str()) {
                        observation.signals.push(VmSignal::ServiceNameMatch {
                            key: key.clone(),
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
                .push(ProbeFault::from_probe("service_scan", err));
        }
    }

    observation.sources_attempted += 1;
    match backend.read_firmware_table(FirmwareTableKind::Smbios) {
        Ok(Some(bytes)) => {
            let text = String::from_utf8_lossy(&bytes).to_ascii_lowercase();
            for marker in &hypervisor_markers {
                if text.contains(marker.as_str()) {
                    observation.signals.push(VmSignal::FirmwareVendorMatch {
                        marker: marker.clone(),
                    });
                }
            }
        }
        Ok(None) => {}
        Err(err) => {
            observation.sources_faulted += 1;
            observation
                .faults
                .push(ProbeFault::from_probe("firmware_table", err));
        }
    }

    observation
}

fn lowered(markers: &[String]) -> Vec<String> {
    markers.iter().map(|m| m.to_ascii_lowercase()).collect()
}
