//! Procedure tables for every clinic resource.
//!
//! Each constant names the backend procedures a resource uses and how their arguments are laid
//! out; the credential is always appended last by the gateway. Procedures outside the list
//! stores are named at the bottom.

use store_framework::{ListShape, ResourceBinding, ResourceLabels, UpdateShape};

const PAGED: ListShape = ListShape::Paged {
    sends_page_size: true,
};

pub const PATIENTS: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Patient", "patients"), "patients")
        .list("GetPatients", ListShape::Unpaged)
        .create("AddPatient")
        .update("UpdatePatient", UpdateShape::Payload)
        .delete("DeletePatient");

pub const APPOINTMENTS: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Appointment", "appointments"), "appointments")
        .list("GetAppointments", ListShape::Unpaged)
        .create("AddAppointment")
        .update("UpdateAppointment", UpdateShape::Payload)
        .delete("DeleteAppointment");

/// Sessions send the filter object instead of a page size.
pub const SESSIONS: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Session", "sessions"), "sessions")
        .list(
            "GetSessions",
            ListShape::Paged {
                sends_page_size: false,
            },
        )
        .get("GetSession")
        .create("CreateSession")
        .update("UpdateSession", UpdateShape::Spread)
        .delete("DeleteSession");

pub const INVOICES: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Invoice", "invoices"), "invoices")
        .list("GetInvoices", PAGED);

pub const PAYMENTS: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Payment", "payments"), "payments")
        .list("GetInvoicePayments", PAGED);

/// Lab orders are placed and listed here; edits happen in the order detail flow.
pub const LAB_ORDERS: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Lab order", "lab orders"), "orders")
        .list("GetLabOrdersPaginated", PAGED)
        .create("CreateLabOrder")
        .stamped();

pub const PROCEDURES: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Procedure", "procedures"), "procedures")
        .list("GetProceduresPaginated", PAGED)
        .create("CreateProcedure")
        .update("UpdateProcedure", UpdateShape::Payload)
        .delete("DeleteProcedure");

pub const WORK_TYPES: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Work type", "work types"), "work_types")
        .list("GetWorkTypesPaginated", PAGED)
        .create("CreateWorkType")
        .update("UpdateWorkType", UpdateShape::IdThenPayload)
        .delete("DeleteWorkType")
        .stamped();

pub const COLOR_SHADES: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Color shade", "color shades"), "color_shades")
        .list("GetColorShadesPaginated", PAGED)
        .create("CreateColorShade")
        .update("UpdateColorShade", UpdateShape::IdThenPayload)
        .delete("DeleteColorShade")
        .stamped();

pub const DENTAL_LABS: ResourceBinding =
    ResourceBinding::new(ResourceLabels::new("Dental lab", "dental labs"), "labs")
        .list("GetDentalLabsPaginated", PAGED)
        .get("GetDentalLab")
        .create("CreateDentalLab")
        .update("UpdateDentalLab", UpdateShape::IdThenPayload)
        .delete("DeleteDentalLab");

pub const EXPENSE_CATEGORIES: ResourceBinding = ResourceBinding::new(
    ResourceLabels::new("Expense category", "expense categories"),
    "categories",
)
.list("GetExpenseCategoriesPaginated", PAGED)
.create("CreateExpenseCategory")
.update("UpdateExpenseCategory", UpdateShape::IdThenPayload)
.delete("DeleteExpenseCategory")
.stamped();

/// `(license_key)`. The key travels in the credential slot.
pub const VALIDATE_LICENSE: &str = "ValidateLicense";
/// `(id)`. Answers a [`LabOrderDetail`](crate::model::LabOrderDetail).
pub const GET_LAB_ORDER: &str = "GetLabOrder";
pub const GET_INVOICE_OVERVIEW: &str = "GetInvoiceOverview";
/// `(session_id)`. Answers `null` when the session has no invoice yet.
pub const GET_INVOICE_BY_SESSION: &str = "GetInvoiceBySession";
pub const PREVIEW_INVOICE: &str = "PreviewInvoice";
pub const CREATE_INVOICE: &str = "CreateInvoice";
pub const GET_INVOICE_PAYMENT_DETAILS: &str = "GetInvoicePaymentDetails";
/// `(invoice_id, amount, payment_date, note)`. Answers the updated payment details.
pub const CREATE_INVOICE_PAYMENT: &str = "CreateInvoicePayment";
