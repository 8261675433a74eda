//! Delivery-details form state, kept in sync with the map session.
//!
//! Holds the editable mirrors of address, landmark, and delivery note plus
//! the selected coordinate, and emits a composite change event on every
//! committed value change. A manual address edit records the action it
//! happened under; automatic resolutions only overwrite the field when they
//! belong to a newer action.

use crate::geolocate::Location;
use serde::{Deserialize, Serialize};

/// Composite change event, string-encoded for the upward contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangePayload {
    pub latitude: String,
    pub longitude: String,
    pub address: String,
    pub landmark: String,
    #[serde(rename = "deliveryNote")]
    pub delivery_note: String,
}

/// The save payload handed to the external persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationData {
    pub coordinates: Location,
    pub address: String,
    pub landmark: String,
    #[serde(rename = "deliveryNote")]
    pub delivery_note: String,
}

pub type ChangeListener = Box<dyn Fn(&ChangePayload)>;
pub type SaveListener = Box<dyn Fn(&LocationData)>;

/// Editable mirrors of the resolved location details.
///
/// Change listeners must not call back into the owning session
/// synchronously; they run while the session is mid-update.
#[derive(Default)]
pub struct LocationFormSync {
    coordinate: Option<Location>,
    address: String,
    landmark: String,
    delivery_note: String,
    manual_address_seq: Option<u64>,
    on_change: Option<ChangeListener>,
}

impl LocationFormSync {
    pub fn new(
        initial_address: Option<String>,
        initial_landmark: Option<String>,
        initial_note: Option<String>,
    ) -> Self {
        Self {
            coordinate: None,
            address: initial_address.unwrap_or_default(),
            landmark: initial_landmark.unwrap_or_default(),
            delivery_note: initial_note.unwrap_or_default(),
            manual_address_seq: None,
            on_change: None,
        }
    }

    pub fn set_on_change(&mut self, listener: ChangeListener) {
        self.on_change = Some(listener);
    }

    pub fn coordinate(&self) -> Option<Location> {
        self.coordinate
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn landmark(&self) -> &str {
        &self.landmark
    }

    pub fn delivery_note(&self) -> &str {
        &self.delivery_note
    }

    /// Commit a newly selected coordinate. The address stays as-is until a
    /// resolution for the triggering action lands.
    pub fn set_coordinate(&mut self, coordinate: Location) {
        if self.coordinate == Some(coordinate) {
            return;
        }
        self.coordinate = Some(coordinate);
        self.emit();
    }

    /// Commit a coordinate together with its resolved address as one change.
    pub fn commit_location(&mut self, coordinate: Location, address: String) {
        let unchanged = self.coordinate == Some(coordinate) && self.address == address;
        self.coordinate = Some(coordinate);
        self.address = address;
        self.manual_address_seq = None;
        if !unchanged {
            self.emit();
        }
    }

    /// Apply an automatically resolved address for the action `seq`.
    /// Returns false when a manual edit from the same or a newer action
    /// takes precedence.
    pub fn apply_resolved_address(&mut self, address: String, seq: u64) -> bool {
        if let Some(manual) = self.manual_address_seq {
            if seq <= manual {
                log::debug!("manual address edit outranks resolution for action {}", seq);
                return false;
            }
        }
        self.manual_address_seq = None;
        if self.address != address {
            self.address = address;
            self.emit();
        }
        true
    }

    /// Manual edit of the address field under the current action `seq`.
    pub fn edit_address(&mut self, value: impl Into<String>, seq: u64) {
        let value = value.into();
        self.manual_address_seq = Some(seq);
        if self.address != value {
            self.address = value;
            self.emit();
        }
    }

    pub fn set_landmark(&mut self, value: impl Into<String>) {
        let value = value.into();
        if self.landmark != value {
            self.landmark = value;
            self.emit();
        }
    }

    pub fn set_delivery_note(&mut self, value: impl Into<String>) {
        let value = value.into();
        if self.delivery_note != value {
            self.delivery_note = value;
            self.emit();
        }
    }

    /// Reset landmark and delivery note only. Emits at most one change.
    pub fn clear(&mut self) {
        if self.landmark.is_empty() && self.delivery_note.is_empty() {
            return;
        }
        self.landmark.clear();
        self.delivery_note.clear();
        self.emit();
    }

    /// Assemble the save payload. None while no coordinate is selected.
    pub fn payload(&self) -> Option<LocationData> {
        let coordinates = self.coordinate?;
        Some(LocationData {
            coordinates,
            address: self.address.clone(),
            landmark: self.landmark.clone(),
            delivery_note: self.delivery_note.clone(),
        })
    }

    pub fn change_payload(&self) -> ChangePayload {
        ChangePayload {
            latitude: self.coordinate.map(|c| c.lat.to_string()).unwrap_or_default(),
            longitude: self.coordinate.map(|c| c.lng.to_string()).unwrap_or_default(),
            address: self.address.clone(),
            landmark: self.landmark.clone(),
            delivery_note: self.delivery_note.clone(),
        }
    }

    fn emit(&self) {
        if let Some(listener) = &self.on_change {
            listener(&self.change_payload());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn recording_form() -> (LocationFormSync, Rc<RefCell<Vec<ChangePayload>>>) {
        let mut form = LocationFormSync::new(None, None, None);
        let changes: Rc<RefCell<Vec<ChangePayload>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&changes);
        form.set_on_change(Box::new(move |payload| sink.borrow_mut().push(payload.clone())));
        (form, changes)
    }

    #[test]
    fn test_change_event_is_string_encoded() {
        let (mut form, changes) = recording_form();
        form.commit_location(Location::new(24.7136, 46.6753), "الرياض".into());

        let events = changes.borrow();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].latitude, "24.7136");
        assert_eq!(events[0].longitude, "46.6753");
        assert_eq!(events[0].address, "الرياض");
    }

    #[test]
    fn test_save_disabled_without_coordinate() {
        let (mut form, _changes) = recording_form();
        form.set_landmark("بجانب المسجد");
        assert!(form.payload().is_none());
    }

    #[test]
    fn test_payload_bundles_all_fields() {
        let (mut form, _changes) = recording_form();
        form.commit_location(Location::new(24.7, 46.6), "العنوان".into());
        form.set_landmark("بجانب المسجد");
        form.set_delivery_note("اتصل عند الوصول");

        let payload = form.payload().unwrap();
        assert_eq!(payload.address, "العنوان");
        assert_eq!(payload.landmark, "بجانب المسجد");
        assert_eq!(payload.delivery_note, "اتصل عند الوصول");
    }

    #[test]
    fn test_clear_resets_only_landmark_and_note() {
        let (mut form, changes) = recording_form();
        form.commit_location(Location::new(24.7, 46.6), "العنوان".into());
        form.set_landmark("معلم");
        form.set_delivery_note("ملاحظة");
        changes.borrow_mut().clear();

        form.clear();
        assert_eq!(form.landmark(), "");
        assert_eq!(form.delivery_note(), "");
        assert_eq!(form.address(), "العنوان");
        assert_eq!(form.coordinate(), Some(Location::new(24.7, 46.6)));
        assert_eq!(changes.borrow().len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (mut form, changes) = recording_form();
        form.set_landmark("معلم");
        changes.borrow_mut().clear();

        form.clear();
        form.clear();
        assert_eq!(changes.borrow().len(), 1);
    }

    #[test]
    fn test_manual_edit_outranks_same_action_resolution() {
        let (mut form, _changes) = recording_form();
        form.set_coordinate(Location::new(24.7, 46.6));
        form.edit_address("بيتنا خلف البقالة", 3);

        assert!(!form.apply_resolved_address("العنوان الآلي".into(), 3));
        assert_eq!(form.address(), "بيتنا خلف البقالة");
    }

    #[test]
    fn test_newer_action_resolution_overwrites_manual_edit() {
        let (mut form, _changes) = recording_form();
        form.edit_address("بيتنا خلف البقالة", 3);

        assert!(form.apply_resolved_address("العنوان الآلي".into(), 4));
        assert_eq!(form.address(), "العنوان الآلي");
    }

    #[test]
    fn test_unchanged_values_do_not_emit() {
        let (mut form, changes) = recording_form();
        form.set_landmark("معلم");
        form.set_landmark("معلم");
        form.set_coordinate(Location::new(1.0, 2.0));
        form.set_coordinate(Location::new(1.0, 2.0));
        assert_eq!(changes.borrow().len(), 2);
    }
}
