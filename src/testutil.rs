//! Shared fakes for unit tests: an in-memory map surface and marker, a
//! scripted position source, a counting capability loader, and a canned
//! geocoding gateway.

use crate::geocode::{AddressComponent, GeocodeEntry, GeocodeError, GeocodeGateway};
use crate::geolocate::{FixError, FixOptions, Location, PositionSource};
use crate::map::{
    DragEvent, ListenerId, LoadError, MapSurface, MarkerAnimation, MarkerHandle, MarkerIcon,
    MarkerOptions, PointerHandler, SurfaceLoader,
};
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

/// In-memory map surface recording every interaction in a shared event log.
pub struct FakeSurface {
    pub center: Cell<Option<Location>>,
    pub zoom: Cell<Option<u8>>,
    pub log: Rc<RefCell<Vec<String>>>,
    next_listener: Cell<ListenerId>,
    click_handlers: RefCell<Vec<(ListenerId, PointerHandler)>>,
    markers: RefCell<Vec<Rc<FakeMarker>>>,
}

impl FakeSurface {
    pub fn shared() -> Rc<Self> {
        Rc::new(Self {
            center: Cell::new(None),
            zoom: Cell::new(None),
            log: Rc::new(RefCell::new(Vec::new())),
            next_listener: Cell::new(1),
            click_handlers: RefCell::new(Vec::new()),
            markers: RefCell::new(Vec::new()),
        })
    }

    /// The n-th marker ever created on this surface.
    pub fn marker(&self, index: usize) -> Rc<FakeMarker> {
        Rc::clone(&self.markers.borrow()[index])
    }

    pub fn marker_count(&self) -> usize {
        self.markers.borrow().len()
    }

    pub fn attached_count(&self) -> usize {
        self.markers.borrow().iter().filter(|m| m.attached.get()).count()
    }

    pub fn click_listener_count(&self) -> usize {
        self.click_handlers.borrow().len()
    }

    /// Fire a map click at the given coordinate.
    pub fn click(&self, location: Location) {
        for (_, handler) in self.click_handlers.borrow().iter() {
            handler(location);
        }
    }
}

impl MapSurface for FakeSurface {
    fn set_center(&self, center: Location) {
        self.center.set(Some(center));
    }

    fn set_zoom(&self, zoom: u8) {
        self.zoom.set(Some(zoom));
    }

    fn add_click_listener(&self, handler: PointerHandler) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.click_handlers.borrow_mut().push((id, handler));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.click_handlers.borrow_mut().retain(|(lid, _)| *lid != id);
    }

    fn create_marker(&self, options: MarkerOptions) -> Rc<dyn MarkerHandle> {
        let id = self.markers.borrow().len();
        let marker = Rc::new(FakeMarker {
            id,
            options: RefCell::new(options),
            attached: Cell::new(true),
            icons: RefCell::new(Vec::new()),
            animations: RefCell::new(Vec::new()),
            listeners: RefCell::new(Vec::new()),
            next_listener: Cell::new(1),
            log: Rc::clone(&self.log),
        });
        self.log.borrow_mut().push(format!("marker{}:attach", id));
        self.markers.borrow_mut().push(Rc::clone(&marker));
        marker
    }
}

/// In-memory marker recording styling and listener traffic.
pub struct FakeMarker {
    pub id: usize,
    pub options: RefCell<MarkerOptions>,
    pub attached: Cell<bool>,
    pub icons: RefCell<Vec<MarkerIcon>>,
    pub animations: RefCell<Vec<Option<MarkerAnimation>>>,
    listeners: RefCell<Vec<(ListenerId, DragEvent, PointerHandler)>>,
    next_listener: Cell<ListenerId>,
    log: Rc<RefCell<Vec<String>>>,
}

impl FakeMarker {
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    pub fn fire_drag_start(&self) {
        let position = self.options.borrow().position;
        for (_, event, handler) in self.listeners.borrow().iter() {
            if *event == DragEvent::Start {
                handler(position);
            }
        }
    }

    pub fn fire_drag_end(&self, location: Location) {
        self.options.borrow_mut().position = location;
        for (_, event, handler) in self.listeners.borrow().iter() {
            if *event == DragEvent::End {
                handler(location);
            }
        }
    }
}

impl MarkerHandle for FakeMarker {
    fn position(&self) -> Location {
        self.options.borrow().position
    }

    fn set_icon(&self, icon: MarkerIcon) {
        self.icons.borrow_mut().push(icon);
    }

    fn set_animation(&self, animation: Option<MarkerAnimation>) {
        self.animations.borrow_mut().push(animation);
    }

    fn add_drag_listener(&self, event: DragEvent, handler: PointerHandler) -> ListenerId {
        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().push((id, event, handler));
        id
    }

    fn remove_listener(&self, id: ListenerId) {
        self.listeners.borrow_mut().retain(|(lid, _, _)| *lid != id);
        self.log
            .borrow_mut()
            .push(format!("marker{}:remove_listener", self.id));
    }

    fn detach(&self) {
        self.attached.set(false);
        self.log.borrow_mut().push(format!("marker{}:detach", self.id));
    }
}

/// Counting loader that either serves a fixed surface or always fails.
pub struct FakeLoader {
    surface: Option<Rc<FakeSurface>>,
    fail: Option<String>,
    loads: Rc<Cell<u32>>,
}

impl FakeLoader {
    pub fn new(surface: Rc<FakeSurface>) -> Self {
        Self {
            surface: Some(surface),
            fail: None,
            loads: Rc::new(Cell::new(0)),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            surface: None,
            fail: Some(message.to_string()),
            loads: Rc::new(Cell::new(0)),
        }
    }

    /// Handle to the load counter, usable after the loader is moved.
    pub fn loads(&self) -> Rc<Cell<u32>> {
        Rc::clone(&self.loads)
    }
}

impl SurfaceLoader for FakeLoader {
    fn load(&self, _api_key: &str) -> Result<Rc<dyn MapSurface>, LoadError> {
        self.loads.set(self.loads.get() + 1);
        if let Some(message) = &self.fail {
            return Err(LoadError::Failed(message.clone()));
        }
        match &self.surface {
            Some(surface) => Ok(Rc::clone(surface) as Rc<dyn MapSurface>),
            None => Err(LoadError::Failed("no surface configured".into())),
        }
    }
}

/// Replays a scripted sequence of fix outcomes.
pub struct ScriptedPositioner {
    script: RefCell<VecDeque<Result<Location, FixError>>>,
    pub calls: Cell<u32>,
}

impl ScriptedPositioner {
    pub fn new(script: Vec<Result<Location, FixError>>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            calls: Cell::new(0),
        }
    }
}

impl PositionSource for ScriptedPositioner {
    fn current_position(&self, _options: &FixOptions) -> Result<Location, FixError> {
        self.calls.set(self.calls.get() + 1);
        self.script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err(FixError::Unknown("script exhausted".into())))
    }
}

/// Canned geocoding gateway returning a fixed result.
pub struct FakeGeocodeGateway {
    result: RefCell<Result<Vec<GeocodeEntry>, GeocodeError>>,
    pub calls: Cell<u32>,
}

impl FakeGeocodeGateway {
    /// Gateway resolving every coordinate to a single-locality address.
    pub fn locality(name: &str) -> Self {
        Self {
            result: RefCell::new(Ok(vec![GeocodeEntry {
                address_components: vec![AddressComponent::new(name, &["locality"])],
            }])),
            calls: Cell::new(0),
        }
    }

    pub fn empty() -> Self {
        Self {
            result: RefCell::new(Ok(Vec::new())),
            calls: Cell::new(0),
        }
    }

    /// Change what subsequent resolutions return.
    pub fn set_locality(&self, name: &str) {
        *self.result.borrow_mut() = Ok(vec![GeocodeEntry {
            address_components: vec![AddressComponent::new(name, &["locality"])],
        }]);
    }
}

impl GeocodeGateway for FakeGeocodeGateway {
    fn geocode(
        &self,
        _lat: f64,
        _lng: f64,
        _language: &str,
    ) -> Result<Vec<GeocodeEntry>, GeocodeError> {
        self.calls.set(self.calls.get() + 1);
        self.result.borrow().clone()
    }
}
