use super::text;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use store_framework::{CompositeFilter, RpcArgs, Searchable};

/// A treatment session with its line items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Session {
    pub id: i64,
    pub patient_id: i64,
    pub dentist_id: i64,
    pub session_date: String,
    pub total_amount: i64,
    /// `"completed"` or `"in-progress"`.
    pub status: String,
    pub notes: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub patient_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub dentist_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub invoice_number: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<SessionItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionItem {
    pub id: i64,
    pub session_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure_id: Option<i64>,
    pub item_name: String,
    pub amount: i64,
}

/// Data needed to open a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionForm {
    pub patient_id: i64,
    pub dentist_id: i64,
    pub session_date: String,
    pub status: String,
    pub notes: String,
    pub items: Vec<SessionItemForm>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionItemForm {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure_id: Option<i64>,
    pub item_name: String,
    pub amount: i64,
}

/// Update payload: the session header and its replacement items, sent as two arguments.
pub type SessionUpdate = (Session, Vec<SessionItemForm>);

impl Searchable for Session {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![
            text(&self.patient_name),
            text(&self.dentist_name),
            text(&self.invoice_number),
            text(&self.status),
        ]
    }
}

/// Server-side session filter.
///
/// Serialized complete on every call: unset scalars as `null`, no procedures as `[]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionFilter {
    pub patient_id: Option<i64>,
    pub status: Option<String>,
    pub dentist_id: Option<i64>,
    /// `YYYY-MM-DD`.
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`.
    pub date_to: Option<String>,
    /// Any of these procedures (OR).
    #[serde(default)]
    pub procedure_ids: Vec<i64>,
}

/// The removable parts of a [`SessionFilter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFilterKind {
    Patient,
    Status,
    Dentist,
    /// Both ends of the date range.
    Date,
    Procedure,
}

impl SessionFilter {
    pub fn by_status(status: impl Into<String>) -> Self {
        Self {
            status: Some(status.into()),
            ..Self::default()
        }
    }

    /// Zero ids and blank strings are treated as unset.
    pub fn normalized(&self) -> Self {
        fn id(value: Option<i64>) -> Option<i64> {
            value.filter(|v| *v != 0)
        }
        fn string(value: &Option<String>) -> Option<String> {
            value.clone().filter(|v| !v.trim().is_empty())
        }
        Self {
            patient_id: id(self.patient_id),
            status: string(&self.status),
            dentist_id: id(self.dentist_id),
            date_from: string(&self.date_from),
            date_to: string(&self.date_to),
            procedure_ids: self.procedure_ids.clone(),
        }
    }
}

impl CompositeFilter for SessionFilter {
    type Kind = SessionFilterKind;
    type Value = i64;

    fn remove(&mut self, kind: SessionFilterKind, value: Option<&i64>) {
        match kind {
            SessionFilterKind::Patient => self.patient_id = None,
            SessionFilterKind::Status => self.status = None,
            SessionFilterKind::Dentist => self.dentist_id = None,
            SessionFilterKind::Date => {
                self.date_from = None;
                self.date_to = None;
            }
            SessionFilterKind::Procedure => match value {
                Some(id) => self.procedure_ids.retain(|p| p != id),
                None => self.procedure_ids.clear(),
            },
        }
    }

    fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }
}

impl RpcArgs for SessionFilter {
    fn to_args(&self) -> Result<Vec<Value>, serde_json::Error> {
        Ok(vec![serde_json::to_value(self.normalized())?])
    }
}
