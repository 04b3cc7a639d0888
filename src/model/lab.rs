//! Lab work: orders, the labs that fulfil them and their reference lists.

use super::text;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use store_framework::{CompositeFilter, RpcArgs, Searchable};

/// One row of the lab orders table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabOrder {
    pub id: i64,
    pub order_number: String,
    pub patient_name: String,
    pub lab_name: String,
    pub work_type_name: String,
    pub status: String,
    pub lab_cost: i64,
    pub order_date: String,
}

/// Everything known about one lab order, as shown on its detail screen.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabOrderDetail {
    pub id: i64,
    pub order_number: String,
    pub patient_id: i64,
    pub patient_name: String,
    pub lab_id: i64,
    pub lab_name: String,
    pub created_by: i64,
    pub dentist_name: String,
    pub work_type_id: i64,
    pub work_type_name: String,
    pub description: String,
    pub upper_left: String,
    pub upper_right: String,
    pub lower_left: String,
    pub lower_right: String,
    pub quantity: i64,
    pub color_shade_id: Option<i64>,
    pub color_shade_name: String,
    pub lab_cost: i64,
    pub order_date: String,
    pub status: String,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Data needed to place a lab order. Teeth are given per quadrant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabOrderForm {
    pub patient_id: i64,
    pub lab_id: i64,
    pub work_type_id: i64,
    pub color_shade_id: Option<i64>,
    pub description: String,
    pub upper_left: String,
    pub upper_right: String,
    pub lower_left: String,
    pub lower_right: String,
    pub quantity: i64,
    pub lab_cost: i64,
    pub order_date: String,
    pub status: String,
    pub notes: String,
}

impl Searchable for LabOrder {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![
            text(&self.order_number),
            text(&self.patient_name),
            text(&self.lab_name),
        ]
    }
}

/// Server-side lab order search. Each field travels as its own list argument; empty means
/// "any".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabOrderFilter {
    pub order_number: String,
    pub patient_name: String,
    pub lab_name: String,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabOrderFilterKind {
    OrderNumber,
    Patient,
    Lab,
    Status,
}

impl CompositeFilter for LabOrderFilter {
    type Kind = LabOrderFilterKind;
    type Value = String;

    fn remove(&mut self, kind: LabOrderFilterKind, _value: Option<&String>) {
        match kind {
            LabOrderFilterKind::OrderNumber => self.order_number.clear(),
            LabOrderFilterKind::Patient => self.patient_name.clear(),
            LabOrderFilterKind::Lab => self.lab_name.clear(),
            LabOrderFilterKind::Status => self.status.clear(),
        }
    }

    fn is_empty(&self) -> bool {
        self.order_number.is_empty()
            && self.patient_name.is_empty()
            && self.lab_name.is_empty()
            && self.status.is_empty()
    }
}

impl RpcArgs for LabOrderFilter {
    fn to_args(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok([
            &self.order_number,
            &self.patient_name,
            &self.lab_name,
            &self.status,
        ]
        .into_iter()
        .map(|field| Value::String(field.trim().to_string()))
        .collect())
    }
}

/// A dental lab vendor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DentalLab {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub contact_person: String,
    pub phone_primary: String,
    pub phone_secondary: String,
    pub email: String,
    pub specialties: String,
    pub is_active: bool,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DentalLabForm {
    pub name: String,
    pub contact_person: String,
    pub phone_primary: String,
    pub phone_secondary: String,
    pub email: String,
    pub specialties: String,
    pub is_active: bool,
    pub notes: String,
}

impl Searchable for DentalLab {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![
            text(&self.name),
            text(&self.contact_person),
            text(&self.phone_primary),
            text(&self.phone_secondary),
        ]
    }
}

/// A kind of lab work (crown, bridge, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkType {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkTypeForm {
    pub name: String,
    pub description: String,
}

impl Searchable for WorkType {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![text(&self.name), text(&self.description)]
    }
}

/// A tooth color shade.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorShade {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub hex_color: String,
    pub is_active: bool,
    pub sort_order: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorShadeForm {
    pub name: String,
    pub description: String,
    pub hex_color: String,
    pub is_active: bool,
}

impl Searchable for ColorShade {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![
            text(&self.name),
            text(&self.description),
            text(&self.hex_color),
        ]
    }
}
