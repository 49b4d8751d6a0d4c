use std::fmt;
use std::time::Duration;

use platform_probe::ProbeBackend;

use crate::env::env_u64;
use crate::fault::ProbeFault;

/// Forward wall-clock jumps beyond this window, unmatched by monotonic
/// time, count as tampering.
pub const DEFAULT_MAX_FORWARD_SKEW_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct ClockTamperConfig {
    pub max_forward_skew: Duration,
}

impl Default for ClockTamperConfig {
    fn default() -> Self {
        Self {
            max_forward_skew: Duration::from_secs(env_u64(
                "GATEGUARD_MAX_FORWARD_SKEW_SECS",
                DEFAULT_MAX_FORWARD_SKEW_SECS,
            )),
        }
    }
}

/// Last-observed clock pair. Owned exclusively by the detector; no other
/// component reads or writes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockBaseline {
    pub wall: Duration,
    pub monotonic: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClockSignal {
    Rollback {
        observed: Duration,
        baseline: Duration,
    },
    ForwardJump {
        wall_delta: Duration,
        mono_delta: Duration,
    },
}

impl ClockSignal {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Rollback { .. } => "clock_rollback",
            Self::ForwardJump { .. } => "clock_forward_jump",
        }
    }
}

impl fmt::Display for ClockSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rollback { observed, baseline } => write!(
                f,
                "wall clock moved backward (observed={:?} baseline={:?})",
                observed, baseline
            ),
            Self::ForwardJump {
                wall_delta,
                mono_delta,
            } => write!(
                f,
                "wall clock jumped ahead of monotonic time (wall={:?} monotonic={:?})",
                wall_delta, mono_delta
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClockObservation {
    pub signals: Vec<ClockSignal>,
    pub faults: Vec<ProbeFault>,
}

impl ClockObservation {
    pub fn detected(&self) -> bool {
        !self.signals.is_empty()
    }

    /// The single evidence source (the paired clock read) faulted.
    pub fn fully_faulted(&self) -> bool {
        !self.faults.is_empty() && self.signals.is_empty()
    }

    pub fn signal_codes(&self) -> Vec<&'static str> {
        self.signals.iter().map(ClockSignal::code).collect()
    }
}

/// Stateful detector comparing successive dual-clock readings.
///
/// Unseeded until the first observation: that call captures the baseline
/// and reports clean. Every later call compares against the last observed
/// pair and then overwrites it regardless of verdict, so each verdict is
/// relative to the previous call, not cumulative since process start.
#[derive(Debug)]
pub struct ClockTamperDetector {
    config: ClockTamperConfig,
    baseline: Option<ClockBaseline>,
}

impl ClockTamperDetector {
    pub fn new(config: ClockTamperConfig) -> Self {
        Self {
            config,
            baseline: None,
        }
    }

    pub fn baseline(&self) -> Option<&ClockBaseline> {
        self.baseline.as_ref()
    }

    pub fn observe<B: ProbeBackend>(&mut self, backend: &B) -> ClockObservation {
        let mut observation = ClockObservation::default();

        let current = match backend.read_clocks() {
            Ok(pair) => pair,
            Err(err) => {
                // Nothing observed; the baseline keeps its last reading.
                observation
                    .faults
                    .push(ProbeFault::from_probe("clock_read", err));
                return observation;
            }
        };

        let Some(last) = self.baseline else {
            self.baseline = Some(ClockBaseline {
                wall: current.wall,
                monotonic: current.monotonic,
            });
            return observation;
        };

        if current.monotonic < last.monotonic {
            // Violates the platform contract: a backend fault, not a
            // tamper signal.
            observation.faults.push(ProbeFault::new(
                "clock_read",
                format!(
                    "monotonic clock regressed (observed={:?} baseline={:?})",
                    current.monotonic, last.monotonic
                ),
            ));
        } else if current.wall < last.wall {
            observation.signals.push(ClockSignal::Rollback {
                observed: current.wall,
                baseline: last.wall,
            });
        } else {
            let wall_delta = current.wall - last.wall;
            let mono_delta = current.monotonic - last.monotonic;
            if wall_delta > self.config.max_forward_skew
                && mono_delta <= self.config.max_forward_skew
            {
                observation.signals.push(ClockSignal::ForwardJump {
                    wall_delta,
                    mono_delta,
                });
            }
        }

        self.baseline = Some(ClockBaseline {
            wall: current.wall,
            monotonic: current.monotonic,
        });
        observation
    }
}
