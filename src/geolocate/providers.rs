//! Position sources backed by network providers.
//!
//! Hosts without a device fix (CLI, server) use IP geolocation as their
//! `PositionSource`. The fix is coarse; the reported accuracy radius is a
//! nominal city-block-scale estimate so it classifies as unreliable.

use super::acquirer::PositionSource;
use super::types::{FixError, FixOptions, Location};
use serde::Deserialize;

/// Nominal accuracy radius for an IP-derived fix, in meters.
pub const IP_FIX_ACCURACY_M: f64 = 5000.0;

const USER_AGENT: &str = "Mawqii/0.3 (delivery-location-picker)";

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// IP-based `PositionSource` via ipapi.co.
#[derive(Debug, Default, Clone)]
pub struct IpApiSource;

impl IpApiSource {
    pub fn new() -> Self {
        Self
    }
}

impl PositionSource for IpApiSource {
    fn current_position(&self, options: &FixOptions) -> Result<Location, FixError> {
        let response = ureq::get("https://ipapi.co/json/")
            .set("User-Agent", USER_AGENT)
            .timeout(options.timeout)
            .call()
            .map_err(classify_transport_error)?;

        let r: IpApiResult = response
            .into_json()
            .map_err(|e| FixError::Unknown(format!("invalid IP API response: {}", e)))?;

        let lat = r
            .latitude
            .ok_or_else(|| FixError::PositionUnavailable("no latitude in IP fix".into()))?;
        let lng = r
            .longitude
            .ok_or_else(|| FixError::PositionUnavailable("no longitude in IP fix".into()))?;

        Ok(Location::with_accuracy(lat, lng, IP_FIX_ACCURACY_M))
    }
}

fn classify_transport_error(e: ureq::Error) -> FixError {
    let msg = e.to_string();
    if msg.contains("timed out") || msg.contains("timeout") {
        FixError::Timeout(msg)
    } else {
        FixError::PositionUnavailable(msg)
    }
}
