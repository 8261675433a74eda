//! Geolocation subsystem.
//!
//! Provides the progressive-accuracy acquisition chain over a pluggable
//! device capability, accuracy classification, an IP-based position source
//! for hosts without a device fix, and a local last-fix cache.

pub mod acquirer;
pub mod cache;
pub mod providers;
pub mod types;

pub use acquirer::{GeolocationAcquirer, PositionSource, FIX_ATTEMPTS};
pub use cache::LastFixCache;
pub use providers::IpApiSource;
pub use types::{
    AccuracyTier, FixError, FixOptions, Location, LocationProgress, MAX_FIX_ATTEMPTS,
};
