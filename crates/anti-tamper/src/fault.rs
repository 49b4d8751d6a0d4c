use std::fmt;

use platform_probe::ProbeError;

/// A probe call that failed unexpectedly. Distinct from both absent
/// evidence and a positive detection; never folded into a verdict on its
/// own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeFault {
    pub probe: &'static str,
    pub detail: String,
}

impl ProbeFault {
    pub(crate) fn new(probe: &'static str, detail: impl Into<String>) -> Self {
        Self {
            probe,
            detail: detail.into(),
        }
    }

    pub(crate) fn from_probe(probe: &'static str, err: ProbeError) -> Self {
        Self::new(probe, err.to_string())
    }
}

impl fmt::Display for ProbeFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "probe '{}' failed: {}", self.probe, self.detail)
    }
}
