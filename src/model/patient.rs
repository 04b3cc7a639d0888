use super::text;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use store_framework::Searchable;

/// A patient record as listed and updated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Patient {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub age: i64,
    pub gender: String,
    pub total_required: i64,
    pub allergies: String,
    pub current_medications: String,
    pub medical_conditions: String,
    pub smoking_status: bool,
    pub pregnancy_status: bool,
    pub dental_history: String,
    pub special_notes: String,
}

/// Data needed to register a patient.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientForm {
    pub name: String,
    pub phone: String,
    pub age: i64,
    pub gender: String,
    pub allergies: String,
    pub current_medications: String,
    pub medical_conditions: String,
    pub smoking_status: bool,
    pub pregnancy_status: bool,
    pub dental_history: String,
    pub special_notes: String,
}

impl Searchable for Patient {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![text(&self.name), text(&self.phone)]
    }
}

/// A scheduled visit. `datetime` is RFC 3339, `duration` in minutes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub datetime: String,
    pub duration: i64,
    pub notes: String,
}

impl Searchable for Appointment {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![text(&self.datetime), text(&self.notes)]
    }
}
