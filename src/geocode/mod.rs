//! Reverse geocoding: coordinate → human-readable address.
//!
//! The external capability sits behind [`GeocodeGateway`] so different
//! providers can be adapted to the same component model. [`ReverseGeocoder`]
//! never fails — any gateway error degrades to a fixed sentinel string.

pub mod nominatim;

pub use nominatim::NominatimGateway;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Sentinel address returned whenever resolution is impossible.
pub const ADDRESS_UNAVAILABLE: &str = "العنوان غير متوفر";

/// Locale requested from the geocoding capability.
pub const GEOCODE_LANGUAGE: &str = "ar";

/// One named piece of an address, tagged with the component types it
/// satisfies (street_number, route, neighborhood, sublocality_level_1,
/// locality, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressComponent {
    pub long_name: String,
    pub types: Vec<String>,
}

impl AddressComponent {
    pub fn new(long_name: impl Into<String>, types: &[&str]) -> Self {
        Self {
            long_name: long_name.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// A single geocoding result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeocodeEntry {
    pub address_components: Vec<AddressComponent>,
}

/// Geocoding failures. All of them are non-fatal for callers of
/// [`ReverseGeocoder::resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    Network(String),
    InvalidResponse(String),
    NoResult,
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "Geocoding network error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "Invalid geocoder response: {}", msg),
            Self::NoResult => write!(f, "Geocoder returned no result"),
        }
    }
}

impl std::error::Error for GeocodeError {}

/// The external geocoding capability, narrowed to the one call in use.
pub trait GeocodeGateway {
    fn geocode(&self, lat: f64, lng: f64, language: &str)
        -> Result<Vec<GeocodeEntry>, GeocodeError>;
}

fn component<'a>(entry: &'a GeocodeEntry, types: &[&str]) -> &'a str {
    entry
        .address_components
        .iter()
        .find(|c| types.iter().any(|t| c.types.iter().any(|ct| ct == t)))
        .map(|c| c.long_name.as_str())
        .unwrap_or("")
}

/// Join the street-number+route, neighborhood, and locality components of
/// the first entry with commas. Empty when nothing usable is present.
pub fn format_address(entry: &GeocodeEntry) -> String {
    let street_number = component(entry, &["street_number"]);
    let route = component(entry, &["route"]);
    let neighborhood = component(entry, &["neighborhood", "sublocality_level_1"]);
    let locality = component(entry, &["locality"]);

    let street = if !street_number.is_empty() && !route.is_empty() {
        format!("{} {}", street_number, route)
    } else {
        route.to_string()
    };

    [street, neighborhood.to_string(), locality.to_string()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolve a coordinate through a gateway, degrading every failure to the
/// sentinel. This is the free-function form used where the gateway is held
/// by value (the HTTP server); [`ReverseGeocoder`] wraps it for the session.
pub fn resolve_with(gateway: &dyn GeocodeGateway, lat: f64, lng: f64, language: &str) -> String {
    match gateway.geocode(lat, lng, language) {
        Ok(entries) => {
            let formatted = entries.first().map(format_address).unwrap_or_default();
            if formatted.is_empty() {
                ADDRESS_UNAVAILABLE.to_string()
            } else {
                formatted
            }
        }
        Err(e) => {
            log::warn!("reverse geocoding failed for {:.4},{:.4}: {}", lat, lng, e);
            ADDRESS_UNAVAILABLE.to_string()
        }
    }
}

/// Coordinate → address in the configured locale. Never fails.
pub struct ReverseGeocoder {
    gateway: Rc<dyn GeocodeGateway>,
    language: String,
}

impl ReverseGeocoder {
    pub fn new(gateway: Rc<dyn GeocodeGateway>) -> Self {
        Self {
            gateway,
            language: GEOCODE_LANGUAGE.into(),
        }
    }

    pub fn resolve(&self, lat: f64, lng: f64) -> String {
        resolve_with(self.gateway.as_ref(), lat, lng, &self.language)
    }
}
