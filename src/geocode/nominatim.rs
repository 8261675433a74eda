//! Nominatim-backed geocoding gateway.
//!
//! Adapts the OpenStreetMap reverse endpoint to the component model the
//! address formatter expects: OSM address fields are re-tagged with the
//! component types (`street_number`, `route`, `sublocality_level_1`,
//! `locality`) the rest of the subsystem keys on.

use super::{AddressComponent, GeocodeEntry, GeocodeError, GeocodeGateway};
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = "Mawqii/0.3 (delivery-location-picker)";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Deserialize, Debug)]
struct NominatimReverseResult {
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Deserialize, Debug, Default)]
struct NominatimAddress {
    #[serde(default)]
    house_number: Option<String>,
    #[serde(default)]
    road: Option<String>,
    #[serde(default)]
    neighbourhood: Option<String>,
    #[serde(default)]
    suburb: Option<String>,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    town: Option<String>,
    #[serde(default)]
    village: Option<String>,
}

/// Reverse geocoding via OpenStreetMap Nominatim.
#[derive(Debug, Default, Clone)]
pub struct NominatimGateway;

impl NominatimGateway {
    pub fn new() -> Self {
        Self
    }
}

impl GeocodeGateway for NominatimGateway {
    fn geocode(
        &self,
        lat: f64,
        lng: f64,
        language: &str,
    ) -> Result<Vec<GeocodeEntry>, GeocodeError> {
        let url = format!(
            "https://nominatim.openstreetmap.org/reverse?lat={}&lon={}&format=jsonv2&addressdetails=1&accept-language={}",
            lat, lng, language
        );

        let response = ureq::get(&url)
            .set("User-Agent", USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .call()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        let result: NominatimReverseResult = response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        let Some(address) = result.address else {
            return Err(GeocodeError::NoResult);
        };

        Ok(vec![to_entry(address)])
    }
}

fn to_entry(address: NominatimAddress) -> GeocodeEntry {
    let mut components = Vec::new();

    let mut push = |value: Option<String>, types: &[&str]| {
        if let Some(v) = value {
            if !v.is_empty() {
                components.push(AddressComponent::new(v, types));
            }
        }
    };

    push(address.house_number, &["street_number"]);
    push(address.road, &["route"]);
    // Nominatim reports either a named neighbourhood or a broader suburb.
    push(address.neighbourhood, &["neighborhood"]);
    push(address.suburb, &["sublocality_level_1"]);
    push(address.city, &["locality"]);
    push(address.town, &["locality"]);
    push(address.village, &["locality"]);

    GeocodeEntry {
        address_components: components,
    }
}
