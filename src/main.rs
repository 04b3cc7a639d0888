//! # Clinic Stores Demo
//!
//! Runs the clinic's stores against the in-process backend:
//! 1. Installs a license and signs a user in through the [`LicenseManager`].
//! 2. Registers patients and procedures, then opens sessions for them.
//! 3. Filters sessions on the server and searches patients on the client.
//! 4. Invoices a session and takes a payment against it.
//! 5. Clears the license and shows every store back to empty.

use clinic_stores::backend::InMemoryBackend;
use clinic_stores::config::ClinicConfig;
use clinic_stores::license::LicenseManager;
use clinic_stores::lifecycle::ClinicStores;
use clinic_stores::model::{
    NewPayment, PatientForm, ProcedureForm, SessionFilter, SessionFilterKind, SessionForm,
    SessionItemForm, User, WorkTypeForm,
};
use std::error::Error;
use std::sync::Arc;
use store_framework::telemetry::setup_tracing_with;
use store_framework::{FilteredView, SearchText};
use tracing::{info, warn, Instrument};

const DEMO_LICENSE: &str = "DEMO-LICENSE-0001";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let config = ClinicConfig::from_env()?;
    setup_tracing_with(&config.log_filter);

    info!(?config, "Starting clinic stores demo");

    let license = Arc::new(LicenseManager::new(config.open_storage()?));
    let backend = Arc::new(InMemoryBackend::new(DEMO_LICENSE));
    let stores = ClinicStores::new(backend, license.clone(), &config);

    // Without a license nothing reaches the backend.
    stores.patients.load_page(1).await;
    if let Some(error) = stores.patients.snapshot().error {
        warn!(%error, "Expected failure before licensing");
    }

    if !stores.install_license(DEMO_LICENSE, None).await? {
        warn!(status = ?license.status(), "Demo license rejected");
    }
    if license.restore_identity()?.is_none() {
        license.sign_in(User::new(1, "dr.sara", "dentist"), "demo-session")?;
    }

    let span = tracing::info_span!("registration");
    async {
        for (name, phone) in [("Sara Haddad", "0550"), ("Omar Nasser", "0551")] {
            let form = PatientForm {
                name: name.to_string(),
                phone: phone.to_string(),
                ..PatientForm::default()
            };
            stores.patients.create(form).await;
        }
        for (name, price) in [("Filling", 3000), ("Extraction", 2000)] {
            let form = ProcedureForm {
                name: name.to_string(),
                price,
            };
            stores.procedures.create(form).await;
        }
        let crown = WorkTypeForm {
            name: "Zirconia crown".to_string(),
            ..WorkTypeForm::default()
        };
        stores.work_types.create(crown).await;
    }
    .instrument(span)
    .await;

    let span = tracing::info_span!("sessions");
    async {
        let visits = [
            (1, "2024-03-01", "completed", 1, 3000),
            (2, "2024-03-04", "in-progress", 2, 2000),
            (1, "2024-03-09", "completed", 2, 2000),
        ];
        for (patient_id, date, status, procedure_id, amount) in visits {
            let form = SessionForm {
                patient_id,
                dentist_id: 1,
                session_date: date.to_string(),
                status: status.to_string(),
                notes: String::new(),
                items: vec![SessionItemForm {
                    procedure_id: Some(procedure_id),
                    item_name: "Treatment".to_string(),
                    amount,
                }],
            };
            stores.sessions.create(form).await;
        }

        stores
            .sessions
            .apply_filters(SessionFilter {
                status: Some("completed".to_string()),
                procedure_ids: vec![2],
                ..SessionFilter::default()
            })
            .await;
        let state = stores.sessions.snapshot();
        info!(matching = state.items.len(), "Completed extraction sessions");

        stores
            .sessions
            .remove_filter(SessionFilterKind::Procedure, Some(2))
            .await;
        info!(
            matching = stores.sessions.snapshot().items.len(),
            "Completed sessions"
        );
        stores.sessions.clear_all_filters().await;
    }
    .instrument(span)
    .await;

    let span = tracing::info_span!("invoicing");
    async {
        let Some(session) = stores.sessions.snapshot().items.first().cloned() else {
            return;
        };
        let desk = &stores.invoicing;
        let Some(invoice) = desk.create_invoice(session.id).await else {
            warn!(error = ?desk.invoice().snapshot().error, "Invoice not issued");
            return;
        };
        let payment = NewPayment {
            invoice_id: invoice.id,
            amount: invoice.total_amount / 2,
            payment_date: session.session_date.clone(),
            note: "Deposit".to_string(),
        };
        desk.add_payment(payment).await;
        if let Some(details) = desk.payments().value() {
            info!(
                invoice = %invoice.invoice_number,
                status = %details.status,
                remaining = details.remaining,
                "Payment recorded"
            );
        }
        let overview = desk.load_overview().await;
        info!(month_total = overview.month_total, "Invoice overview");
    }
    .instrument(span)
    .await;

    let search = SearchText::new();
    let view = FilteredView::new(stores.patients.subscribe(), search.subscribe());
    search.set("omar");
    for patient in view.items() {
        info!(id = patient.id, name = %patient.name, "Search hit");
    }

    stores.load_all().await;
    for (name, count) in [
        ("patients", stores.patients.snapshot().items.len()),
        ("procedures", stores.procedures.snapshot().items.len()),
        ("work types", stores.work_types.snapshot().items.len()),
        ("sessions", stores.sessions.snapshot().items.len()),
    ] {
        info!(resource = name, count, "Loaded");
    }

    stores.clear_license()?;
    info!(
        patients = stores.patients.snapshot().items.len(),
        has_license = license.has_license(),
        "Demo completed"
    );
    Ok(())
}
