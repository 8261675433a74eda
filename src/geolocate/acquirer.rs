//! Progressive-accuracy acquisition — orchestrates the attempt chain.
//!
//! Attempt 1: high-accuracy fix, long timeout, always fresh.
//! Attempt 2: high-accuracy fix, shorter timeout, accepts a 30s-old cached fix.
//! A permission refusal short-circuits the chain.

use super::types::{AccuracyTier, FixError, FixOptions, Location};
use std::time::Duration;

/// The device geolocation capability. One call issues one fix request;
/// once issued it cannot be revoked, only waited out.
pub trait PositionSource {
    fn current_position(&self, options: &FixOptions) -> Result<Location, FixError>;
}

/// The attempt schedule, in order.
pub const FIX_ATTEMPTS: [FixOptions; 2] = [
    FixOptions {
        high_accuracy: true,
        timeout: Duration::from_secs(25),
        maximum_age: Duration::ZERO,
    },
    FixOptions {
        high_accuracy: true,
        timeout: Duration::from_secs(20),
        maximum_age: Duration::from_secs(30),
    },
];

/// Multi-attempt device location fetch with escalating tolerances.
pub struct GeolocationAcquirer<'a> {
    source: &'a dyn PositionSource,
}

impl<'a> GeolocationAcquirer<'a> {
    pub fn new(source: &'a dyn PositionSource) -> Self {
        Self { source }
    }

    /// Run the attempt chain. `progress` is invoked after every raw fix,
    /// success or failure, with `(accuracy, attempt_number)`; failures
    /// report accuracy 0.0.
    pub fn acquire<F>(&self, mut progress: F) -> Result<Location, FixError>
    where
        F: FnMut(f64, u32),
    {
        let mut last_error: Option<FixError> = None;

        for (index, options) in FIX_ATTEMPTS.iter().enumerate() {
            let attempt = index as u32 + 1;
            match self.source.current_position(options) {
                Ok(fix) => {
                    let accuracy = fix.accuracy.unwrap_or(0.0);
                    progress(accuracy, attempt);

                    let tier = AccuracyTier::classify(accuracy);
                    log::info!(
                        "location fix on attempt {}: {} (±{:.1}m)",
                        attempt,
                        tier,
                        accuracy
                    );
                    if tier == AccuracyTier::Unreliable {
                        log::warn!(
                            "accuracy ±{:.1}m is unreliable; a manual map selection may be needed",
                            accuracy
                        );
                    }
                    return Ok(fix);
                }
                Err(e) => {
                    progress(0.0, attempt);
                    log::warn!("fix attempt {} failed: {}", attempt, e);
                    let terminal = e.is_terminal();
                    last_error = Some(e);
                    if terminal {
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| FixError::Unknown("no fix attempt was issued".into())))
    }
}
