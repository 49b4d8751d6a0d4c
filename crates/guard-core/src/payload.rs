use std::path::Path;

use tracing::debug;

/// Result of a payload boundary operation. Anything but `Success` is
/// fatal to startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Success,
    Failure,
}

/// The protected product behind the gate. Invoked only after a clean
/// verdict; integrators substitute their own loader at this boundary.
pub trait PayloadLoader {
    fn initialize(&mut self) -> LoadOutcome;
    fn load(&mut self, path: &str) -> LoadOutcome;
}

#[derive(Debug, Default)]
pub struct BuiltinPayload {
    initialized: bool,
}

impl PayloadLoader for BuiltinPayload {
    fn initialize(&mut self) -> LoadOutcome {
        self.initialized = true;
        debug!("builtin payload initialized");
        LoadOutcome::Success
    }

    fn load(&mut self, path: &str) -> LoadOutcome {
        if !self.initialized {
            return LoadOutcome::Failure;
        }
        if !Path::new(path).is_file() {
            return LoadOutcome::Failure;
        }
        debug!(path, "payload image staged");
        LoadOutcome::Success
    }
}
