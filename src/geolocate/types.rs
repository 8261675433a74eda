//! Core types for the geolocation subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A coordinate with an optional device-reported accuracy radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
}

impl Location {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng, accuracy: None }
    }

    pub fn with_accuracy(lat: f64, lng: f64, accuracy: f64) -> Self {
        Self { lat, lng, accuracy: Some(accuracy) }
    }

    /// Valid WGS84 ranges: lat -90..90, lng -180..180.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lng)
    }
}

/// Quality tier of an accuracy radius. Larger radius never yields a better tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AccuracyTier {
    Excellent,
    Good,
    Acceptable,
    Poor,
    Unreliable,
}

impl AccuracyTier {
    /// Classify a non-negative accuracy radius in meters.
    pub fn classify(accuracy_m: f64) -> Self {
        if accuracy_m <= 3.0 {
            Self::Excellent
        } else if accuracy_m <= 8.0 {
            Self::Good
        } else if accuracy_m <= 15.0 {
            Self::Acceptable
        } else if accuracy_m <= 25.0 {
            Self::Poor
        } else {
            Self::Unreliable
        }
    }

    /// User-facing Arabic label shown next to the accuracy readout.
    pub fn arabic_label(&self) -> &'static str {
        match self {
            Self::Excellent => "دقة ممتازة",
            Self::Good => "دقة جيدة",
            Self::Acceptable => "دقة مقبولة",
            Self::Poor => "دقة ضعيفة",
            Self::Unreliable => "دقة غير موثوقة",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Excellent => "\u{1F3AF}",
            Self::Good => "\u{1F4CD}",
            Self::Acceptable => "\u{1F4CC}",
            Self::Poor => "\u{26A0}\u{FE0F}",
            Self::Unreliable => "\u{274C}",
        }
    }
}

impl fmt::Display for AccuracyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Excellent => write!(f, "EXCELLENT"),
            Self::Good => write!(f, "GOOD"),
            Self::Acceptable => write!(f, "ACCEPTABLE"),
            Self::Poor => write!(f, "POOR"),
            Self::Unreliable => write!(f, "UNRELIABLE"),
        }
    }
}

/// Options for a single device fix request, mirroring the device capability's
/// `{enableHighAccuracy, timeout, maximumAge}` contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest acceptable cached fix. Zero means always fresh.
    pub maximum_age: Duration,
}

/// Geolocation failure, classified per the device error codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixError {
    PermissionDenied(String),
    PositionUnavailable(String),
    Timeout(String),
    Unknown(String),
}

impl FixError {
    /// Permission refusals are terminal — replaying the prompt the user just
    /// refused has no benefit.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

impl fmt::Display for FixError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PermissionDenied(msg) => write!(f, "Geolocation permission denied: {}", msg),
            Self::PositionUnavailable(msg) => write!(f, "Position unavailable: {}", msg),
            Self::Timeout(msg) => write!(f, "Geolocation request timed out: {}", msg),
            Self::Unknown(msg) => write!(f, "Geolocation error: {}", msg),
        }
    }
}

impl std::error::Error for FixError {}

/// Number of underlying device attempts per acquisition sequence.
pub const MAX_FIX_ATTEMPTS: u32 = 2;

/// Ephemeral acquisition progress. Exists only while an acquisition sequence
/// is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationProgress {
    pub accuracy: f64,
    pub attempts: u32,
    pub is_searching: bool,
    pub message: String,
}

impl LocationProgress {
    pub fn begin() -> Self {
        Self {
            accuracy: 0.0,
            attempts: 0,
            is_searching: true,
            message: "جاري البحث عن موقعك...".into(),
        }
    }

    pub fn begin_recenter() -> Self {
        Self {
            accuracy: 0.0,
            attempts: 0,
            is_searching: true,
            message: "جاري إعادة تحديد موقعك...".into(),
        }
    }

    pub fn attempt(accuracy: f64, attempts: u32) -> Self {
        Self {
            accuracy,
            attempts,
            is_searching: true,
            message: format!(
                "المحاولة {}/{} - الدقة: ±{:.1}م",
                attempts, MAX_FIX_ATTEMPTS, accuracy
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_tiers() {
        assert_eq!(AccuracyTier::classify(2.0), AccuracyTier::Excellent);
        assert_eq!(AccuracyTier::classify(5.0), AccuracyTier::Good);
        assert_eq!(AccuracyTier::classify(10.0), AccuracyTier::Acceptable);
        assert_eq!(AccuracyTier::classify(20.0), AccuracyTier::Poor);
        assert_eq!(AccuracyTier::classify(30.0), AccuracyTier::Unreliable);
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(AccuracyTier::classify(0.0), AccuracyTier::Excellent);
        assert_eq!(AccuracyTier::classify(3.0), AccuracyTier::Excellent);
        assert_eq!(AccuracyTier::classify(8.0), AccuracyTier::Good);
        assert_eq!(AccuracyTier::classify(15.0), AccuracyTier::Acceptable);
        assert_eq!(AccuracyTier::classify(25.0), AccuracyTier::Poor);
        assert_eq!(AccuracyTier::classify(25.001), AccuracyTier::Unreliable);
        assert_eq!(AccuracyTier::classify(f64::INFINITY), AccuracyTier::Unreliable);
    }

    #[test]
    fn test_classify_monotonic() {
        // Quality never improves as the radius grows.
        let radii = [0.0, 1.0, 3.0, 5.0, 8.0, 12.0, 15.0, 20.0, 25.0, 40.0, 1000.0];
        for pair in radii.windows(2) {
            assert!(AccuracyTier::classify(pair[0]) <= AccuracyTier::classify(pair[1]));
        }
    }

    #[test]
    fn test_location_validity() {
        assert!(Location::new(24.7136, 46.6753).is_valid());
        assert!(!Location::new(91.0, 0.0).is_valid());
        assert!(!Location::new(0.0, -181.0).is_valid());
    }

    #[test]
    fn test_progress_message_caps_at_real_attempt_count() {
        let p = LocationProgress::attempt(12.5, 2);
        assert!(p.message.contains("2/2"));
        assert!(p.is_searching);
    }

    #[test]
    fn test_fix_error_terminal() {
        assert!(FixError::PermissionDenied("user refused".into()).is_terminal());
        assert!(!FixError::Timeout("25s elapsed".into()).is_terminal());
    }
}
