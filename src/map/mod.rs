//! Map capability surface.
//!
//! The external map engine is consumed through narrow traits exposing only
//! the calls this subsystem uses, so different providers can be adapted
//! behind them. Capability loading goes through [`SharedLoader`], whose
//! loading-state token guards against duplicate SDK injection when several
//! mounts race.

pub mod markers;

use crate::geolocate::Location;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Initial view before any location is known.
pub const WORLD_CENTER: Location = Location {
    lat: 20.0,
    lng: 0.0,
    accuracy: None,
};
pub const WORLD_ZOOM: u8 = 2;

/// Zoom applied once a concrete coordinate is centered.
pub const FOCUS_ZOOM: u8 = 15;

/// Handle to a registered listener, used for removal.
pub type ListenerId = u64;

/// Callback receiving the coordinate of a click or drag event.
pub type PointerHandler = Box<dyn Fn(Location)>;

/// Theme color tokens the host resolves to concrete colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeColor {
    Primary,
    Destructive,
    Warning,
    Foreground,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarkerIcon {
    pub fill_color: ThemeColor,
    pub fill_opacity: f32,
    pub stroke_color: ThemeColor,
    pub stroke_weight: u8,
    pub scale: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerLabel {
    pub text: &'static str,
    pub color: ThemeColor,
    pub font_size_px: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerAnimation {
    Drop,
    Bounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragEvent {
    Start,
    End,
}

/// Everything a marker is created with.
#[derive(Debug, Clone)]
pub struct MarkerOptions {
    pub position: Location,
    pub title: String,
    pub label: MarkerLabel,
    pub icon: MarkerIcon,
    pub draggable: bool,
    pub z_index: i32,
    pub animation: Option<MarkerAnimation>,
}

/// The rendered interactive map instance.
pub trait MapSurface {
    fn set_center(&self, center: Location);
    fn set_zoom(&self, zoom: u8);
    fn add_click_listener(&self, handler: PointerHandler) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
    fn create_marker(&self, options: MarkerOptions) -> Rc<dyn MarkerHandle>;
}

/// A visual pin bound to a coordinate on the map surface.
pub trait MarkerHandle {
    fn position(&self) -> Location;
    fn set_icon(&self, icon: MarkerIcon);
    fn set_animation(&self, animation: Option<MarkerAnimation>);
    fn add_drag_listener(&self, event: DragEvent, handler: PointerHandler) -> ListenerId;
    fn remove_listener(&self, id: ListenerId);
    /// Detach from the surface. Listeners must already be removed.
    fn detach(&self);
}

/// Capability load failures. Terminal for the requesting session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    Failed(String),
    InProgress,
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(msg) => write!(f, "Map capability load failed: {}", msg),
            Self::InProgress => write!(f, "Map capability load already in progress"),
        }
    }
}

impl std::error::Error for LoadError {}

/// Loads the external map capability and hands back a surface.
pub trait SurfaceLoader {
    fn load(&self, api_key: &str) -> Result<Rc<dyn MapSurface>, LoadError>;
}

enum LoadState {
    Idle,
    Loading,
    Ready(Rc<dyn MapSurface>),
    Failed(LoadError),
}

/// Per-capability-instance loader. The underlying load runs at most once;
/// later callers share the surface, and a failure is cached — a failed
/// capability is not retried.
pub struct SharedLoader {
    inner: Box<dyn SurfaceLoader>,
    state: RefCell<LoadState>,
}

impl SharedLoader {
    pub fn new(inner: Box<dyn SurfaceLoader>) -> Self {
        Self {
            inner,
            state: RefCell::new(LoadState::Idle),
        }
    }

    pub fn load(&self, api_key: &str) -> Result<Rc<dyn MapSurface>, LoadError> {
        {
            let state = self.state.borrow();
            match &*state {
                LoadState::Ready(surface) => return Ok(Rc::clone(surface)),
                LoadState::Failed(e) => return Err(e.clone()),
                LoadState::Loading => return Err(LoadError::InProgress),
                LoadState::Idle => {}
            }
        }

        *self.state.borrow_mut() = LoadState::Loading;
        match self.inner.load(api_key) {
            Ok(surface) => {
                *self.state.borrow_mut() = LoadState::Ready(Rc::clone(&surface));
                Ok(surface)
            }
            Err(e) => {
                *self.state.borrow_mut() = LoadState::Failed(e.clone());
                Err(e)
            }
        }
    }
}
