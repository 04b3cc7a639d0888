//! Invoices and payments: the read-only lists plus the per-invoice records.

use super::{text, SessionItem};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use store_framework::Searchable;

/// One row of the invoices table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceListItem {
    pub id: i64,
    pub invoice_number: String,
    pub patient_name: String,
    pub session_id: i64,
    pub invoice_date: String,
    pub total_amount: i64,
    /// `"issued"`, `"paid"` or `"cancelled"`.
    pub status: String,
}

impl Searchable for InvoiceListItem {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![
            text(&self.invoice_number),
            text(&self.patient_name),
            text(&self.status),
        ]
    }
}

/// One row of the payments table, joined with its invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaymentListItem {
    pub id: i64,
    pub payment_code: String,
    pub payment_amount: i64,
    pub payment_date: String,
    pub note: String,
    pub invoice_id: i64,
    pub invoice_number: String,
    pub invoice_amount: i64,
    pub invoice_status: String,
    pub invoice_date: String,
    pub patient_name: String,
}

impl Searchable for PaymentListItem {
    fn search_fields(&self) -> Vec<Option<Cow<'_, str>>> {
        vec![
            text(&self.payment_code),
            text(&self.invoice_number),
            text(&self.patient_name),
        ]
    }
}

/// An invoice issued for one session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Invoice {
    pub id: i64,
    pub session_id: i64,
    pub patient_id: i64,
    pub invoice_number: String,
    pub invoice_date: String,
    pub total_amount: i64,
    /// `"issued"`, `"partially_paid"`, `"paid"` or `"cancelled"`.
    pub status: String,
    pub notes: String,
}

impl Invoice {
    /// Whether the invoice still accepts payments.
    pub fn accepts_payments(&self) -> bool {
        matches!(self.status.as_str(), "issued" | "partially_paid")
    }
}

/// What an invoice would look like, shown before confirming it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicePreview {
    pub patient_name: String,
    pub session_date: String,
    pub invoice_number: String,
    pub procedures: Vec<SessionItem>,
    pub total_amount: i64,
}

/// Invoice totals and counts for today, this week (from Monday) and this month.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoiceOverview {
    pub today_total: i64,
    pub today_count: i64,
    pub week_total: i64,
    pub week_count: i64,
    pub month_total: i64,
    pub month_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Payment {
    pub id: i64,
    pub invoice_id: i64,
    pub patient_id: i64,
    pub payment_code: String,
    pub amount: i64,
    pub payment_date: String,
    pub note: String,
    pub payment_method: String,
    pub created_at: String,
    pub updated_at: String,
}

/// An invoice with its payment history and balance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InvoicePaymentDetails {
    pub invoice: Invoice,
    pub patient_name: String,
    pub status: String,
    pub total_amount: i64,
    pub payments: Vec<Payment>,
    pub total_paid: i64,
    pub remaining: i64,
    pub allow_payments: bool,
}

/// A payment to record against an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewPayment {
    pub invoice_id: i64,
    pub amount: i64,
    pub payment_date: String,
    pub note: String,
}
