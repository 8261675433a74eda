//! Mawqii — delivery location picker engine.
//!
//! Acquires the device position through a progressive-accuracy retry
//! strategy, reverse-geocodes coordinates into Arabic street addresses,
//! manages the user/selected marker pair on an interactive map surface,
//! and keeps a delivery-details form in sync with the picked location.
//!
//! The map engine, the geocoder, and the device positioner are consumed
//! through narrow traits ([`map::MapSurface`], [`geocode::GeocodeGateway`],
//! [`geolocate::PositionSource`]), so hosts adapt their provider of choice
//! behind them.

pub mod form;
pub mod geocode;
pub mod geolocate;
pub mod map;
pub mod server;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

pub use form::{ChangePayload, LocationData, LocationFormSync};
pub use geolocate::{AccuracyTier, GeolocationAcquirer, Location};
pub use session::{MapSession, SessionCapabilities, SessionConfig, SessionError, SessionState};
