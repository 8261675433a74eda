//! Marker lifecycle: creation, kind-specific styling, animation timeline,
//! drag wiring, and destruction.
//!
//! The controller owns at most one live marker per kind. A marker's drag
//! listeners are held as an explicit record alongside its handle and are
//! removed as a unit before the handle is detached. Scheduled restyles are
//! applied by `pump_animations`, driven by the host event loop.

use super::{
    DragEvent, MapSurface, MarkerAnimation, MarkerHandle, MarkerIcon, MarkerLabel, MarkerOptions,
    ListenerId, ThemeColor,
};
use crate::geolocate::Location;
use std::rc::{Rc, Weak};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    User,
    Selected,
}

pub const USER_Z_INDEX: i32 = 1000;
pub const SELECTED_Z_INDEX: i32 = 999;

pub const USER_MARKER_TITLE: &str = "موقعك الحالي";

pub fn selected_marker_title(session_label: &str) -> String {
    format!("{} - الموقع المحدد", session_label)
}

fn user_icon_scaled(scale: u8) -> MarkerIcon {
    MarkerIcon {
        fill_color: ThemeColor::Primary,
        fill_opacity: 0.3,
        stroke_color: ThemeColor::Primary,
        stroke_weight: 4,
        scale,
    }
}

pub fn user_icon() -> MarkerIcon {
    user_icon_scaled(20)
}

pub fn selected_icon() -> MarkerIcon {
    MarkerIcon {
        fill_color: ThemeColor::Destructive,
        fill_opacity: 0.3,
        stroke_color: ThemeColor::Destructive,
        stroke_weight: 3,
        scale: 18,
    }
}

/// Style applied to the selected marker while it is being dragged.
pub fn dragging_icon() -> MarkerIcon {
    MarkerIcon {
        fill_color: ThemeColor::Warning,
        fill_opacity: 0.3,
        stroke_color: ThemeColor::Warning,
        stroke_weight: 3,
        scale: 22,
    }
}

const USER_LABEL: MarkerLabel = MarkerLabel {
    text: "\u{1F3AF}",
    color: ThemeColor::Foreground,
    font_size_px: 18,
};

const SELECTED_LABEL: MarkerLabel = MarkerLabel {
    text: "\u{2764}\u{FE0F}",
    color: ThemeColor::Foreground,
    font_size_px: 16,
};

/// A live marker with its listener registrations.
pub struct MarkerRecord {
    pub kind: MarkerKind,
    pub handle: Rc<dyn MarkerHandle>,
    drag_start: Option<ListenerId>,
    drag_end: Option<ListenerId>,
}

enum StyleAction {
    Animate(Option<MarkerAnimation>),
    Restyle(MarkerIcon),
}

struct StyleStep {
    due: Instant,
    target: Weak<dyn MarkerHandle>,
    action: StyleAction,
}

/// Invoked with the drop coordinate when a drag gesture completes.
pub type DragEndObserver = Rc<dyn Fn(Location)>;

/// Creates, restyles, animates, and destroys the session's marker entities.
#[derive(Default)]
pub struct MarkerController {
    user: Option<MarkerRecord>,
    selected: Option<MarkerRecord>,
    timeline: Vec<StyleStep>,
}

impl MarkerController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn user(&self) -> Option<&MarkerRecord> {
        self.user.as_ref()
    }

    pub fn selected(&self) -> Option<&MarkerRecord> {
        self.selected.as_ref()
    }

    /// (Re)create the auto-detected position marker. Any previous user
    /// marker is fully destroyed first.
    pub fn create_user(&mut self, surface: &dyn MapSurface, location: Location, now: Instant) {
        self.destroy_user();

        let handle = surface.create_marker(MarkerOptions {
            position: location,
            title: USER_MARKER_TITLE.to_string(),
            label: USER_LABEL,
            icon: user_icon(),
            draggable: false,
            z_index: USER_Z_INDEX,
            animation: Some(MarkerAnimation::Drop),
        });

        // Drop, bounce, settle, then three slow pulses.
        self.schedule(&handle, now + Duration::from_millis(300), StyleAction::Animate(Some(MarkerAnimation::Bounce)));
        self.schedule(&handle, now + Duration::from_millis(2300), StyleAction::Animate(None));
        self.schedule(&handle, now + Duration::from_millis(3100), StyleAction::Restyle(user_icon_scaled(20)));
        self.schedule(&handle, now + Duration::from_millis(3900), StyleAction::Restyle(user_icon_scaled(22)));
        self.schedule(&handle, now + Duration::from_millis(4700), StyleAction::Restyle(user_icon_scaled(20)));

        self.user = Some(MarkerRecord {
            kind: MarkerKind::User,
            handle,
            drag_start: None,
            drag_end: None,
        });
    }

    /// (Re)create the adjustable delivery marker. Any previous selected
    /// marker is fully destroyed first; drag-end reports the new coordinate
    /// to `on_drag_end` after the style reverts.
    pub fn create_selected(
        &mut self,
        surface: &dyn MapSurface,
        location: Location,
        session_label: &str,
        on_drag_end: DragEndObserver,
        now: Instant,
    ) {
        self.destroy_selected();

        let handle = surface.create_marker(MarkerOptions {
            position: location,
            title: selected_marker_title(session_label),
            label: SELECTED_LABEL,
            icon: selected_icon(),
            draggable: true,
            z_index: SELECTED_Z_INDEX,
            animation: Some(MarkerAnimation::Drop),
        });

        let start_handle = Rc::clone(&handle);
        let drag_start = handle.add_drag_listener(
            DragEvent::Start,
            Box::new(move |_| {
                start_handle.set_icon(dragging_icon());
                start_handle.set_animation(Some(MarkerAnimation::Bounce));
            }),
        );

        let end_handle = Rc::clone(&handle);
        let drag_end = handle.add_drag_listener(
            DragEvent::End,
            Box::new(move |position| {
                end_handle.set_icon(selected_icon());
                end_handle.set_animation(None);
                on_drag_end(position);
            }),
        );

        self.schedule(&handle, now + Duration::from_millis(500), StyleAction::Animate(Some(MarkerAnimation::Bounce)));
        self.schedule(&handle, now + Duration::from_millis(2500), StyleAction::Animate(None));

        self.selected = Some(MarkerRecord {
            kind: MarkerKind::Selected,
            handle,
            drag_start: Some(drag_start),
            drag_end: Some(drag_end),
        });
    }

    pub fn destroy_user(&mut self) {
        let record = self.user.take();
        self.destroy_record(record);
    }

    pub fn destroy_selected(&mut self) {
        let record = self.selected.take();
        self.destroy_record(record);
    }

    pub fn destroy_all(&mut self) {
        self.destroy_user();
        self.destroy_selected();
        self.timeline.clear();
    }

    /// Idempotent: a missing record is a no-op. Listeners are removed and
    /// scheduled restyles cancelled before the handle is detached.
    fn destroy_record(&mut self, record: Option<MarkerRecord>) {
        let Some(record) = record else {
            return;
        };
        self.timeline.retain(|step| match step.target.upgrade() {
            Some(handle) => !Rc::ptr_eq(&handle, &record.handle),
            None => false,
        });
        if let Some(id) = record.drag_start {
            record.handle.remove_listener(id);
        }
        if let Some(id) = record.drag_end {
            record.handle.remove_listener(id);
        }
        record.handle.detach();
    }

    fn schedule(&mut self, handle: &Rc<dyn MarkerHandle>, due: Instant, action: StyleAction) {
        self.timeline.push(StyleStep {
            due,
            target: Rc::downgrade(handle),
            action,
        });
    }

    /// Apply every scheduled style step that has come due.
    pub fn pump_animations(&mut self, now: Instant) {
        let steps = std::mem::take(&mut self.timeline);
        for step in steps {
            if step.due <= now {
                if let Some(handle) = step.target.upgrade() {
                    match &step.action {
                        StyleAction::Animate(animation) => handle.set_animation(*animation),
                        StyleAction::Restyle(icon) => handle.set_icon(*icon),
                    }
                }
            } else if step.target.strong_count() > 0 {
                self.timeline.push(step);
            }
        }
    }
}
