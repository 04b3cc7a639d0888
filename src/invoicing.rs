//! # Invoicing
//!
//! The invoice flows that work on one record at a time: the dashboard overview, turning a
//! session into an invoice and taking payments against it. Each answer lives in its own
//! [`RecordStore`] so screens can observe exactly the part they render.

use crate::bindings;
use crate::model::{Invoice, InvoiceOverview, InvoicePaymentDetails, InvoicePreview, NewPayment};
use serde_json::Value;
use store_framework::{LicensedCaller, RecordStore};
use tracing::{info, instrument};

/// Reported when payments are requested without an invoice.
pub const MISSING_INVOICE_ID: &str = "Missing invoice id";

pub struct InvoiceDesk {
    overview: RecordStore<InvoiceOverview>,
    invoice: RecordStore<Invoice>,
    preview: RecordStore<InvoicePreview>,
    payments: RecordStore<InvoicePaymentDetails>,
}

impl InvoiceDesk {
    pub fn new(caller: LicensedCaller) -> Self {
        Self {
            overview: RecordStore::new("invoice overview", caller.clone())
                .with_fallback(InvoiceOverview::default()),
            invoice: RecordStore::new("invoice", caller.clone()),
            preview: RecordStore::new("invoice preview", caller.clone()),
            payments: RecordStore::new("invoice payments", caller),
        }
    }

    pub fn overview(&self) -> &RecordStore<InvoiceOverview> {
        &self.overview
    }

    /// The invoice of the session last looked up or invoiced.
    pub fn invoice(&self) -> &RecordStore<Invoice> {
        &self.invoice
    }

    pub fn preview(&self) -> &RecordStore<InvoicePreview> {
        &self.preview
    }

    pub fn payments(&self) -> &RecordStore<InvoicePaymentDetails> {
        &self.payments
    }

    /// Loads the overview. Any failure shows zeroes.
    pub async fn load_overview(&self) -> InvoiceOverview {
        self.overview
            .fetch(bindings::GET_INVOICE_OVERVIEW, Vec::new())
            .await
            .unwrap_or_default()
    }

    /// The session's invoice, or `None` when it has not been invoiced yet.
    pub async fn invoice_for_session(&self, session_id: i64) -> Option<Invoice> {
        self.invoice
            .fetch(bindings::GET_INVOICE_BY_SESSION, vec![Value::from(session_id)])
            .await
    }

    pub async fn preview_invoice(&self, session_id: i64) -> Option<InvoicePreview> {
        self.preview
            .fetch(bindings::PREVIEW_INVOICE, vec![Value::from(session_id)])
            .await
    }

    /// Issues the session's invoice. The backend refuses a second invoice for one session.
    #[instrument(skip(self))]
    pub async fn create_invoice(&self, session_id: i64) -> Option<Invoice> {
        let invoice = self
            .invoice
            .submit(
                bindings::CREATE_INVOICE,
                vec![Value::from(session_id)],
                "Invoice created successfully",
            )
            .await
            .ok()?;
        info!(invoice_number = %invoice.invoice_number, "Invoice issued");
        self.preview.reset();
        Some(invoice)
    }

    /// Loads the payment history of `invoice_id`. Ids below 1 are rejected without a call.
    pub async fn load_payments(&self, invoice_id: i64) -> Option<InvoicePaymentDetails> {
        if invoice_id <= 0 {
            self.payments.reject(MISSING_INVOICE_ID);
            return None;
        }
        self.payments
            .fetch(
                bindings::GET_INVOICE_PAYMENT_DETAILS,
                vec![Value::from(invoice_id)],
            )
            .await
    }

    /// Records a payment. On success the payment details are replaced by the backend's
    /// updated ones.
    #[instrument(skip(self, payment), fields(invoice_id = payment.invoice_id))]
    pub async fn add_payment(&self, payment: NewPayment) -> bool {
        if payment.invoice_id <= 0 {
            self.payments.reject(MISSING_INVOICE_ID);
            return false;
        }
        let args = vec![
            Value::from(payment.invoice_id),
            Value::from(payment.amount),
            Value::from(payment.payment_date),
            Value::from(payment.note),
        ];
        self.payments
            .submit(
                bindings::CREATE_INVOICE_PAYMENT,
                args,
                "Payment added successfully",
            )
            .await
            .is_ok()
    }

    pub fn reset(&self) {
        self.overview.reset();
        self.invoice.reset();
        self.preview.reset();
        self.payments.reset();
    }
}
