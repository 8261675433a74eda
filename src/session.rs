//! Map session orchestration.
//!
//! Owns the map-surface lifecycle, wires click and drag events, drives the
//! acquisition chain, the reverse geocoder, and the marker controller, and
//! keeps the delivery form in sync.
//!
//! Everything runs on a single cooperative event loop: the session core
//! lives in an `Rc<RefCell<…>>` shared with the surface and marker
//! listeners. Click- and drag-triggered address resolutions are queued and
//! carried out by `pump`, each tagged with the action sequence number that
//! spawned it; a resolution whose action has since been superseded is
//! dropped instead of overwriting state for a replaced marker.

use crate::form::{ChangeListener, LocationData, LocationFormSync, SaveListener};
use crate::geocode::{GeocodeGateway, ReverseGeocoder};
use crate::geolocate::{
    FixError, GeolocationAcquirer, Location, LocationProgress, PositionSource,
};
use crate::map::markers::MarkerController;
use crate::map::{ListenerId, MapSurface, SharedLoader, FOCUS_ZOOM, WORLD_CENTER, WORLD_ZOOM};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Instant;

/// Initialization configuration, the upward contract of the session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub map_capability_key: Option<String>,
    pub session_label: String,
    pub initial_coordinate: Option<Location>,
    pub initial_address: Option<String>,
    pub initial_landmark: Option<String>,
    pub initial_note: Option<String>,
    pub disable_auto_location: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            map_capability_key: None,
            session_label: "Mawqii".into(),
            initial_coordinate: None,
            initial_address: None,
            initial_landmark: None,
            initial_note: None,
            disable_auto_location: false,
        }
    }
}

/// The capabilities the session consumes.
pub struct SessionCapabilities {
    pub loader: Rc<SharedLoader>,
    pub positioner: Rc<dyn PositionSource>,
    pub geocode_gateway: Rc<dyn GeocodeGateway>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    LoadingMap,
    MapReady,
    Locating,
    Idle,
    TornDown,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Missing or unusable configuration. Terminal for the session.
    Config(String),
    /// The map capability failed to load. Terminal for the session.
    Load(String),
    /// The acquisition chain failed. The session stays usable.
    Geolocation(FixError),
    /// An interaction arrived in a state that cannot serve it.
    Interaction(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "Configuration error: {}", msg),
            Self::Load(msg) => write!(f, "Map load error: {}", msg),
            Self::Geolocation(e) => write!(f, "{}", e),
            Self::Interaction(msg) => write!(f, "Map interaction error: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {}

/// A queued address resolution for a placed coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeocodeRequest {
    pub seq: u64,
    pub coordinate: Location,
}

struct SessionCore {
    config: SessionConfig,
    state: SessionState,
    loader: Rc<SharedLoader>,
    positioner: Rc<dyn PositionSource>,
    geocoder: ReverseGeocoder,
    surface: Option<Rc<dyn MapSurface>>,
    click_listener: Option<ListenerId>,
    markers: MarkerController,
    form: LocationFormSync,
    user_location: Option<Location>,
    user_address: Option<String>,
    progress: Option<LocationProgress>,
    action_seq: u64,
    pending: VecDeque<GeocodeRequest>,
    last_error: Option<SessionError>,
    on_save: Option<SaveListener>,
    weak_self: Weak<RefCell<SessionCore>>,
}

/// The interactive location-picking session.
pub struct MapSession {
    core: Rc<RefCell<SessionCore>>,
}

impl MapSession {
    pub fn new(config: SessionConfig, capabilities: SessionCapabilities) -> Self {
        let form = LocationFormSync::new(
            config.initial_address.clone(),
            config.initial_landmark.clone(),
            config.initial_note.clone(),
        );
        let core = Rc::new(RefCell::new(SessionCore {
            config,
            state: SessionState::Uninitialized,
            loader: capabilities.loader,
            positioner: capabilities.positioner,
            geocoder: ReverseGeocoder::new(capabilities.geocode_gateway),
            surface: None,
            click_listener: None,
            markers: MarkerController::new(),
            form,
            user_location: None,
            user_address: None,
            progress: None,
            action_seq: 0,
            pending: VecDeque::new(),
            last_error: None,
            on_save: None,
            weak_self: Weak::new(),
        }));
        core.borrow_mut().weak_self = Rc::downgrade(&core);
        Self { core }
    }

    /// Register the change listener. Must not call back into the session.
    pub fn on_change(&self, listener: ChangeListener) {
        self.core.borrow_mut().form.set_on_change(listener);
    }

    /// Register the save listener. Must not call back into the session.
    pub fn on_save(&self, listener: SaveListener) {
        self.core.borrow_mut().on_save = Some(listener);
    }

    /// Load the map capability, register the click listener, and — unless
    /// disabled — run the initial auto-location. Configuration and load
    /// failures are terminal; a geolocation failure is surfaced through
    /// `last_error` and leaves the session idle and usable.
    pub fn mount(&self, now: Instant) -> Result<(), SessionError> {
        let mut core = self.core.borrow_mut();
        if core.state != SessionState::Uninitialized {
            return Err(SessionError::Interaction("session already mounted".into()));
        }
        core.state = SessionState::LoadingMap;

        let key = match core.config.map_capability_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_string(),
            _ => {
                let err = SessionError::Config("map capability key missing".into());
                core.fail_terminal(err.clone());
                return Err(err);
            }
        };

        let surface = match core.loader.load(&key) {
            Ok(surface) => surface,
            Err(e) => {
                let err = SessionError::Load(e.to_string());
                core.fail_terminal(err.clone());
                return Err(err);
            }
        };

        surface.set_center(WORLD_CENTER);
        surface.set_zoom(WORLD_ZOOM);

        let weak = core.weak_self.clone();
        let listener = surface.add_click_listener(Box::new(move |location| {
            if let Some(core) = weak.upgrade() {
                core.borrow_mut().handle_click(location, Instant::now());
            }
        }));
        core.click_listener = Some(listener);
        core.surface = Some(Rc::clone(&surface));
        core.state = SessionState::MapReady;

        if let Some(initial) = core.config.initial_coordinate.filter(Location::is_valid) {
            surface.set_center(initial);
            surface.set_zoom(FOCUS_ZOOM);
            core.form.set_coordinate(initial);
        }

        if core.config.disable_auto_location {
            core.state = SessionState::Idle;
        } else if let Err(e) = core.locate(now, false) {
            log::warn!("auto-location failed: {}", e);
        }
        Ok(())
    }

    /// Drive scheduled marker restyles and queued address resolutions.
    pub fn pump(&self, now: Instant) {
        let mut core = self.core.borrow_mut();
        core.markers.pump_animations(now);

        let requests: Vec<GeocodeRequest> = core.pending.drain(..).collect();
        for request in requests {
            if request.seq != core.action_seq {
                log::debug!(
                    "skipping address resolution for superseded action {} (now {})",
                    request.seq,
                    core.action_seq
                );
                continue;
            }
            let address = core
                .geocoder
                .resolve(request.coordinate.lat, request.coordinate.lng);
            core.apply_geocode(request.seq, address);
        }
    }

    /// Requests queued since the last pump, for hosts resolving externally.
    pub fn take_pending_geocodes(&self) -> Vec<GeocodeRequest> {
        self.core.borrow_mut().pending.drain(..).collect()
    }

    /// Deliver an address resolution for the action `seq`. Stale results —
    /// the action has been superseded — are dropped.
    pub fn apply_geocode(&self, seq: u64, address: String) -> bool {
        self.core.borrow_mut().apply_geocode(seq, address)
    }

    /// Destroy the selected marker and re-run the acquisition chain.
    pub fn recenter(&self, now: Instant) -> Result<(), SessionError> {
        let mut core = self.core.borrow_mut();
        if core.state != SessionState::Idle {
            return Err(SessionError::Interaction(
                "recenter requires an idle session".into(),
            ));
        }
        core.markers.destroy_selected();
        core.locate(now, true)
    }

    /// Assemble and forward the save payload. No-op while no coordinate is
    /// selected.
    pub fn save(&self) -> Option<LocationData> {
        let core = self.core.borrow();
        let payload = core.form.payload()?;
        if let Some(listener) = &core.on_save {
            listener(&payload);
        }
        Some(payload)
    }

    /// Reset landmark and delivery note.
    pub fn clear(&self) {
        self.core.borrow_mut().form.clear();
    }

    /// Manual edit of the address field.
    pub fn set_address(&self, value: impl Into<String>) {
        let mut core = self.core.borrow_mut();
        let seq = core.action_seq;
        core.form.edit_address(value, seq);
    }

    pub fn set_landmark(&self, value: impl Into<String>) {
        self.core.borrow_mut().form.set_landmark(value);
    }

    pub fn set_delivery_note(&self, value: impl Into<String>) {
        self.core.borrow_mut().form.set_delivery_note(value);
    }

    /// Destroy all markers and listeners and end the session.
    pub fn teardown(&self) {
        let mut core = self.core.borrow_mut();
        if core.state == SessionState::TornDown {
            return;
        }
        core.markers.destroy_all();
        if let (Some(surface), Some(listener)) = (core.surface.take(), core.click_listener.take())
        {
            surface.remove_listener(listener);
        }
        core.pending.clear();
        core.progress = None;
        core.state = SessionState::TornDown;
    }

    pub fn state(&self) -> SessionState {
        self.core.borrow().state
    }

    pub fn progress(&self) -> Option<LocationProgress> {
        self.core.borrow().progress.clone()
    }

    pub fn last_error(&self) -> Option<SessionError> {
        self.core.borrow().last_error.clone()
    }

    pub fn user_location(&self) -> Option<Location> {
        self.core.borrow().user_location
    }

    pub fn user_address(&self) -> Option<String> {
        self.core.borrow().user_address.clone()
    }

    pub fn selected_location(&self) -> Option<Location> {
        self.core.borrow().form.coordinate()
    }

    pub fn address(&self) -> String {
        self.core.borrow().form.address().to_string()
    }

    pub fn landmark(&self) -> String {
        self.core.borrow().form.landmark().to_string()
    }

    pub fn delivery_note(&self) -> String {
        self.core.borrow().form.delivery_note().to_string()
    }
}

impl Drop for MapSession {
    fn drop(&mut self) {
        // Skip cleanup when the core is still borrowed (unwinding mid-event).
        if self.core.try_borrow_mut().is_ok() {
            self.teardown();
        }
    }
}

impl SessionCore {
    fn fail_terminal(&mut self, error: SessionError) {
        log::error!("{}", error);
        self.last_error = Some(error);
        self.state = SessionState::TornDown;
    }

    fn drag_end_observer(&self) -> Rc<dyn Fn(Location)> {
        let weak = self.weak_self.clone();
        Rc::new(move |location| {
            if let Some(core) = weak.upgrade() {
                core.borrow_mut().handle_drag_end(location);
            }
        })
    }

    /// Run the acquisition chain and, on success, recreate both markers at
    /// the fix, resolve its address, and commit the result as one change.
    fn locate(&mut self, now: Instant, recentering: bool) -> Result<(), SessionError> {
        let Some(surface) = self.surface.clone() else {
            return Err(SessionError::Interaction("no map surface".into()));
        };
        self.state = SessionState::Locating;
        self.progress = Some(if recentering {
            LocationProgress::begin_recenter()
        } else {
            LocationProgress::begin()
        });

        let outcome = {
            let progress = &mut self.progress;
            GeolocationAcquirer::new(self.positioner.as_ref()).acquire(|accuracy, attempts| {
                *progress = Some(LocationProgress::attempt(accuracy, attempts));
            })
        };
        self.progress = None;

        match outcome {
            Ok(location) => {
                self.action_seq += 1;
                surface.set_center(location);
                surface.set_zoom(FOCUS_ZOOM);

                let address = self.geocoder.resolve(location.lat, location.lng);
                let observer = self.drag_end_observer();
                self.markers.create_user(surface.as_ref(), location, now);
                self.markers.create_selected(
                    surface.as_ref(),
                    location,
                    &self.config.session_label,
                    observer,
                    now,
                );

                self.user_location = Some(location);
                self.user_address = Some(address.clone());
                self.form.commit_location(location, address);
                self.last_error = None;
                self.state = SessionState::Idle;
                Ok(())
            }
            Err(e) => {
                // The chain failed; the session stays usable via manual
                // clicks.
                let err = SessionError::Geolocation(e);
                self.last_error = Some(err.clone());
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    fn handle_click(&mut self, location: Location, now: Instant) {
        if self.state != SessionState::Idle {
            log::debug!("map click ignored in state {:?}", self.state);
            return;
        }
        let Some(surface) = self.surface.clone() else {
            return;
        };
        self.action_seq += 1;
        let observer = self.drag_end_observer();
        self.markers.create_selected(
            surface.as_ref(),
            location,
            &self.config.session_label,
            observer,
            now,
        );
        self.form.set_coordinate(location);
        self.pending.push_back(GeocodeRequest {
            seq: self.action_seq,
            coordinate: location,
        });
    }

    fn handle_drag_end(&mut self, location: Location) {
        if self.state != SessionState::Idle {
            return;
        }
        self.action_seq += 1;
        log::debug!("selected marker dragged to {}", location);
        self.form.set_coordinate(location);
        self.pending.push_back(GeocodeRequest {
            seq: self.action_seq,
            coordinate: location,
        });
    }

    fn apply_geocode(&mut self, seq: u64, address: String) -> bool {
        if self.state == SessionState::TornDown {
            return false;
        }
        if seq != self.action_seq {
            log::debug!(
                "dropping stale address resolution for action {} (now {})",
                seq,
                self.action_seq
            );
            return false;
        }
        self.form.apply_resolved_address(address, seq)
    }
}
